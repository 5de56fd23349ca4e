use super::record::StrongRef;

/// Where a reply attaches in the conversation tree
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadContext {
    /// Top-level post of the conversation
    pub root: StrongRef,
    /// Record the reply answers (the triggering notification's record)
    pub parent: StrongRef,
    /// Text of the post the notification itself replied to, when retrievable.
    /// Only used as prompt context.
    pub parent_text: Option<String>,
}

impl ThreadContext {
    /// Context for a post that starts its own thread
    pub fn standalone(own: StrongRef) -> Self {
        Self {
            root: own.clone(),
            parent: own,
            parent_text: None,
        }
    }

    pub fn is_standalone(&self) -> bool {
        self.root == self.parent
    }
}
