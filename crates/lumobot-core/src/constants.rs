//! Application-wide constants
//!
//! Centralized location for protocol identifiers, limits and fixed strings
//! that are used across multiple modules.

use std::time::Duration;

/// Default PDS / entryway for XRPC calls
pub const DEFAULT_SERVICE_URL: &str = "https://bsky.social";

/// Hugging Face serverless inference endpoint prefix
pub const HF_INFERENCE_BASE: &str = "https://api-inference.huggingface.co/models";

/// Default text-generation model for the Hugging Face backend
pub const DEFAULT_HF_MODEL: &str = "microsoft/Phi-3-mini-4k-instruct";

/// Default base URL and model for the OpenAI-compatible chat backend
pub const DEFAULT_CHAT_BASE_URL: &str = "https://api.lumo.proton.me/v1";
pub const DEFAULT_CHAT_MODEL: &str = "lumo-1.2";

/// Ceiling applied to every outbound network call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// Reply limits
/// Maximum length of a posted reply, in characters
pub const MAX_REPLY_CHARS: usize = 300;
/// Appended when a reply had to be truncated
pub const ELLIPSIS: &str = "…";
/// Number of recent reply texts kept for duplicate suppression
pub const RECENT_REPLIES_CAP: usize = 100;

/// Stand-in CID used when a record cannot be dereferenced, so that posting
/// does not hard-fail on an unreachable ancestor.
pub const PLACEHOLDER_CID: &str =
    "bafyreihjdbd4zq4f4a5v6w5z5g5q5j5j5j5j5j5j5j5j5j5j5j5j5j5j5j5j5j";

/// Default page size for notification listing
pub const DEFAULT_NOTIFICATION_LIMIT: u32 = 50;

// Inter-reply pacing defaults (seconds)
pub const DEFAULT_DELAY_MIN_SECS: u64 = 60;
pub const DEFAULT_DELAY_MAX_SECS: u64 = 120;

/// File name of the persisted pipeline state inside the data dir
pub const STATE_FILE_NAME: &str = "state.json";

/// Presence of this file in the data dir makes every run a no-op
pub const PAUSE_MARKER: &str = ".paused";

// Generation parameters
pub const GENERATION_MAX_NEW_TOKENS: u32 = 100;
pub const GENERATION_TEMPERATURE: f32 = 0.3;
/// End-of-turn marker for Phi-3 style chat templates
pub const END_OF_TURN: &str = "<|end|>";

/// Character budgets for the user message and the replied-to context in a prompt
pub const PROMPT_MESSAGE_CHARS: usize = 1000;
pub const PROMPT_CONTEXT_CHARS: usize = 500;

/// Sent instead of a low-confidence answer
pub const CLARIFICATION_REPLY: &str =
    "Could you share a bit more detail about what you'd like to know?";

/// Phrases that mark a model answer as low-confidence (matched case-insensitively)
pub const LOW_CONFIDENCE_PHRASES: &[&str] =
    &["don't know", "unclear", "provide more", "doesn't seem"];

// AT Protocol collections and record types
pub mod nsid {
    /// Post record collection and `$type`
    pub const FEED_POST: &str = "app.bsky.feed.post";
    pub const LIST_NOTIFICATIONS: &str = "app.bsky.notification.listNotifications";
    pub const UPDATE_SEEN: &str = "app.bsky.notification.updateSeen";
    pub const GET_RECORD: &str = "com.atproto.repo.getRecord";
    pub const CREATE_RECORD: &str = "com.atproto.repo.createRecord";
    pub const CREATE_SESSION: &str = "com.atproto.server.createSession";
}
