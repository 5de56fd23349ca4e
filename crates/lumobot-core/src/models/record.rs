use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::PLACEHOLDER_CID;

/// Identifier + content hash pair. The protocol requires both whenever a
/// record is referenced from another record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongRef {
    pub uri: String,
    pub cid: String,
}

impl StrongRef {
    pub fn new(uri: impl Into<String>, cid: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            cid: cid.into(),
        }
    }

    /// Known identifier whose hash could not be obtained
    pub fn placeholder(uri: impl Into<String>) -> Self {
        Self::new(uri, PLACEHOLDER_CID)
    }

    pub fn is_placeholder(&self) -> bool {
        self.cid == PLACEHOLDER_CID
    }
}

/// `reply` block of a post record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRef {
    pub root: StrongRef,
    pub parent: StrongRef,
}

/// The fields of a post record the pipeline reads.
///
/// Extracted field by field so a malformed `reply` block does not hide the
/// text, and an unexpected shape degrades to empty values instead of failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostRecord {
    pub record_type: String,
    pub text: String,
    pub reply: Option<ReplyRef>,
}

impl PostRecord {
    pub fn from_value(value: &Value) -> Self {
        let str_field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            record_type: str_field("$type"),
            text: str_field("text"),
            reply: value
                .get("reply")
                .cloned()
                .and_then(|r| serde_json::from_value(r).ok()),
        }
    }
}

/// A dereferenced record
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecord {
    pub uri: String,
    pub cid: String,
    pub text: String,
    pub reply: Option<ReplyRef>,
}

impl ResolvedRecord {
    pub fn strong_ref(&self) -> StrongRef {
        StrongRef::new(&self.uri, &self.cid)
    }
}

/// Outcome of dereferencing an identifier. Lookups never raise; an
/// unreachable or deleted record is reported as `Unavailable`.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordLookup {
    Found(ResolvedRecord),
    Unavailable { uri: String, reason: String },
}

impl RecordLookup {
    pub fn unavailable(uri: impl Into<String>, reason: impl ToString) -> Self {
        RecordLookup::Unavailable {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    pub fn found(&self) -> Option<&ResolvedRecord> {
        match self {
            RecordLookup::Found(record) => Some(record),
            RecordLookup::Unavailable { .. } => None,
        }
    }

    /// Identifier + hash, with the placeholder hash for an unavailable record
    pub fn strong_ref(&self) -> StrongRef {
        match self {
            RecordLookup::Found(record) => record.strong_ref(),
            RecordLookup::Unavailable { uri, .. } => StrongRef::placeholder(uri.as_str()),
        }
    }

    /// Collapse to a record, substituting placeholder hash and empty text
    pub fn into_record(self) -> ResolvedRecord {
        match self {
            RecordLookup::Found(record) => record,
            RecordLookup::Unavailable { uri, .. } => ResolvedRecord {
                uri,
                cid: PLACEHOLDER_CID.to_string(),
                text: String::new(),
                reply: None,
            },
        }
    }
}
