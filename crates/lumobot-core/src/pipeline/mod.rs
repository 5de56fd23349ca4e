pub mod dispatch;
pub mod filter;
pub mod generator;
pub mod resolver;
pub mod text;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::{DispatchOptions, Dispatcher, RunReport};
pub use filter::{NotificationFilter, Rejection};
pub use generator::ReplyGenerator;
pub use resolver::resolve_thread;
pub use text::{finalize_reply, normalize_mention, NormalizedText};
