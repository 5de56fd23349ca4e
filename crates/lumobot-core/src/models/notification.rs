use serde_json::Value;

use super::record::{PostRecord, ReplyRef, StrongRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    Mention,
    Reply,
    /// like, repost, follow, quote, ... kept verbatim for logging
    Other(String),
}

impl Reason {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "mention" => Reason::Mention,
            "reply" => Reason::Reply,
            other => Reason::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Reason::Mention => "mention",
            Reason::Reply => "reply",
            Reason::Other(raw) => raw,
        }
    }
}

/// One entry of the account's notification list
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub uri: String,
    pub cid: String,
    pub author_did: String,
    pub author_handle: String,
    pub reason: Reason,
    pub indexed_at: String,
    pub record_type: String,
    pub text: String,
    /// Reply relationship as declared by the notification's record
    pub reply: Option<ReplyRef>,
}

impl Notification {
    /// Build from a `listNotifications` entry.
    ///
    /// Missing or mistyped fields become empty values so that the filter can
    /// reject the notification; only a non-object entry yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }

        let str_at = |path: &[&str]| {
            path.iter()
                .try_fold(value, |v, key| v.get(key))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let record = value
            .get("record")
            .map(PostRecord::from_value)
            .unwrap_or_default();

        Some(Notification {
            uri: str_at(&["uri"]),
            cid: str_at(&["cid"]),
            author_did: str_at(&["author", "did"]),
            author_handle: str_at(&["author", "handle"]),
            reason: Reason::parse(&str_at(&["reason"])),
            indexed_at: str_at(&["indexedAt"]),
            record_type: record.record_type,
            text: record.text,
            reply: record.reply,
        })
    }

    pub fn strong_ref(&self) -> StrongRef {
        StrongRef::new(&self.uri, &self.cid)
    }
}
