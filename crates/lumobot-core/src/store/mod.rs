pub mod pipeline_state;
pub mod state_store;

pub use pipeline_state::{PipelineState, UsageCounter};
pub use state_store::{JsonStateStore, MemoryStateStore, StateStore, StoreError};
