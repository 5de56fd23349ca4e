use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::RECENT_REPLIES_CAP;
use crate::models::timestamp;

/// Language-model calls made in one calendar month
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounter {
    #[serde(default)]
    pub count: u32,
    /// `YYYY-MM`
    #[serde(default)]
    pub month: String,
}

impl UsageCounter {
    pub fn month_of(now: DateTime<Utc>) -> String {
        now.format("%Y-%m").to_string()
    }

    /// Reset the count when the month changed. Returns true on reset.
    pub fn roll_over(&mut self, current_month: &str) -> bool {
        if self.month == current_month {
            return false;
        }
        self.month = current_month.to_string();
        self.count = 0;
        true
    }

    pub fn record_call(&mut self) {
        self.count = self.count.saturating_add(1);
    }
}

/// Everything carried from one run to the next.
///
/// The cursor only ever moves forward and `recent_replies` never holds more
/// than `RECENT_REPLIES_CAP` entries (oldest evicted first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    /// `indexedAt` of the last processed notification
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub recent_replies: VecDeque<String>,
    #[serde(default)]
    pub usage: UsageCounter,
}

impl PipelineState {
    /// Re-establish the invariants after loading a file written by hand or
    /// by an older build: the history bound, and a cursor that compares as
    /// an instant. A cursor that does not parse would sort after every real
    /// timestamp and stall the bot, so it is dropped.
    pub fn normalized(mut self) -> Self {
        if let Some(cursor) = self.cursor.as_deref() {
            if !timestamp::is_valid(cursor) {
                tracing::warn!(cursor = %cursor, "Discarding unparseable cursor from state");
                self.cursor = None;
            }
        }
        while self.recent_replies.len() > RECENT_REPLIES_CAP {
            self.recent_replies.pop_front();
        }
        self
    }

    /// Move the cursor to `ts` if it is strictly later. Returns true if moved.
    pub fn advance_cursor(&mut self, ts: &str) -> bool {
        if ts.is_empty() || !timestamp::is_after_cursor(ts, self.cursor.as_deref()) {
            return false;
        }
        self.cursor = Some(ts.to_string());
        true
    }

    pub fn remember_reply(&mut self, text: &str) {
        self.recent_replies.push_back(text.to_string());
        while self.recent_replies.len() > RECENT_REPLIES_CAP {
            self.recent_replies.pop_front();
        }
    }

    /// Case-insensitive match against the remembered replies
    pub fn is_recent_reply(&self, text: &str) -> bool {
        let needle = text.to_lowercase();
        self.recent_replies
            .iter()
            .any(|r| r.to_lowercase() == needle)
    }
}
