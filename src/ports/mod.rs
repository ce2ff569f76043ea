//! Ports - interfaces between the conversation core and the outside world.

mod generation_backend;

pub use generation_backend::{BackendInfo, GenerationBackend, GenerationError};
