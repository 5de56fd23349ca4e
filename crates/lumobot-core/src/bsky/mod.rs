pub mod auth;
pub mod client;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Notification, RecordLookup, StrongRef};

pub use auth::{create_session, session_from_config, Session};
pub use client::BskyClient;

/// Remote side of the pipeline: notification listing, record lookups and
/// posting. One call is in flight at a time.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// One bounded page of the most recent notifications
    async fn fetch_notifications(&self) -> Result<Vec<Notification>>;

    /// Never fails; unreachable records come back as `Unavailable`
    async fn resolve_record(&self, uri: &str) -> RecordLookup;

    /// Create a reply in the bot's repository. Not retried.
    async fn post_reply(&self, text: &str, root: &StrongRef, parent: &StrongRef)
        -> Result<StrongRef>;

    /// Advance the server-side "seen up to" marker
    async fn update_seen(&self, seen_at: &str) -> Result<()>;
}
