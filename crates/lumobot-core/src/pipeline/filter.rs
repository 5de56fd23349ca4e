use std::fmt;

use crate::constants::nsid;
use crate::models::{timestamp, AtUri, Notification, Reason};

/// Why a notification was not selected for a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// At or before the cursor
    AlreadySeen,
    NotFromOwner,
    UnsupportedReason(String),
    NotAPost,
    EmptyText,
    MissingUri,
    /// A reply whose parent post was not written by the bot
    ParentNotOwnedByBot,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::AlreadySeen => write!(f, "not newer than cursor"),
            Rejection::NotFromOwner => write!(f, "author is not the owner"),
            Rejection::UnsupportedReason(reason) => write!(f, "unsupported reason '{}'", reason),
            Rejection::NotAPost => write!(f, "record is not a post"),
            Rejection::EmptyText => write!(f, "post has no text"),
            Rejection::MissingUri => write!(f, "notification has no uri"),
            Rejection::ParentNotOwnedByBot => write!(f, "reply to a post the bot did not write"),
        }
    }
}

/// Selects the notifications the bot should answer.
///
/// All of these must hold:
/// - strictly newer than the cursor (no cursor admits everything)
/// - authored by the owner
/// - a mention, or a reply whose parent lives in the bot's repository
/// - the record is a post with non-blank text and a uri
pub struct NotificationFilter {
    owner_did: String,
    bot_did: String,
}

impl NotificationFilter {
    pub fn new(owner_did: impl Into<String>, bot_did: impl Into<String>) -> Self {
        Self {
            owner_did: owner_did.into(),
            bot_did: bot_did.into(),
        }
    }

    pub fn check(&self, notification: &Notification, cursor: Option<&str>) -> Result<(), Rejection> {
        if !timestamp::is_after_cursor(&notification.indexed_at, cursor) {
            return Err(Rejection::AlreadySeen);
        }
        if notification.author_did.is_empty() || notification.author_did != self.owner_did {
            return Err(Rejection::NotFromOwner);
        }
        match &notification.reason {
            Reason::Mention => {}
            Reason::Reply => {
                if !self.parent_is_bot_post(notification) {
                    return Err(Rejection::ParentNotOwnedByBot);
                }
            }
            Reason::Other(raw) => return Err(Rejection::UnsupportedReason(raw.clone())),
        }
        if notification.record_type != nsid::FEED_POST {
            return Err(Rejection::NotAPost);
        }
        if notification.text.trim().is_empty() {
            return Err(Rejection::EmptyText);
        }
        if notification.uri.is_empty() {
            return Err(Rejection::MissingUri);
        }
        Ok(())
    }

    fn parent_is_bot_post(&self, notification: &Notification) -> bool {
        let Some(reply) = &notification.reply else {
            return false;
        };
        AtUri::parse(&reply.parent.uri).is_ok_and(|uri| uri.is_owned_by(&self.bot_did))
    }

    /// Eligible notifications, oldest first. Equal timestamps keep their
    /// listing order.
    pub fn select(&self, notifications: &[Notification], cursor: Option<&str>) -> Vec<Notification> {
        let mut eligible: Vec<Notification> = notifications
            .iter()
            .filter(|n| match self.check(n, cursor) {
                Ok(()) => true,
                Err(rejection) => {
                    tracing::debug!(
                        uri = %n.uri,
                        reason = n.reason.as_str(),
                        "Skipping notification: {}",
                        rejection
                    );
                    false
                }
            })
            .cloned()
            .collect();

        eligible.sort_by(|a, b| timestamp::compare(&a.indexed_at, &b.indexed_at));
        eligible
    }
}
