pub mod backend;
pub mod protocol;
pub mod sse;
pub mod tasks;

pub use backend::BackendClient;
pub use protocol::{Incoming, Request};
pub use tasks::{spawn_config_stream, spawn_request};
