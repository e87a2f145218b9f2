pub mod color;
pub mod details;
pub mod dictionary;
pub mod metrics;
pub mod model;
pub mod search;
pub mod slot;
pub mod state;
pub mod viewport;

pub use details::DetailSlot;
pub use state::SyncState;
