/// A finished reply waiting to be posted. Discarded after posting.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyDraft {
    pub text: String,
    /// URI of the notification this reply answers
    pub target: String,
    /// True if the first generation collided with a recent reply and was redone
    pub regenerated: bool,
}
