pub mod at_uri;
pub mod draft;
pub mod notification;
pub mod record;
pub mod thread;
pub mod timestamp;

pub use at_uri::{AtUri, AtUriError};
pub use draft::ReplyDraft;
pub use notification::{Notification, Reason};
pub use record::{PostRecord, RecordLookup, ReplyRef, ResolvedRecord, StrongRef};
pub use thread::ThreadContext;
