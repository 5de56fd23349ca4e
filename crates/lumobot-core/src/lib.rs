pub mod ai;
pub mod bsky;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod tracing_setup;

pub use config::BotConfig;
pub use error::BotError;
pub use pipeline::{DispatchOptions, Dispatcher, RunReport};
