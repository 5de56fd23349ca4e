use crate::store::StoreError;

/// Errors that abort a run.
///
/// Everything else in the pipeline degrades in place (placeholder CIDs,
/// filtered notifications, logged post failures) and never reaches this type.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Failed to fetch notifications: {0:#}")]
    Fetch(anyhow::Error),

    #[error("State store error: {0}")]
    Store(#[from] StoreError),
}
