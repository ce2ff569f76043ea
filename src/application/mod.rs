//! Application layer - the engine façade consumed by the external
//! request-routing layer.

mod engine;
mod error;

pub use engine::{CreatedSession, EngineHealth, PatientEngine, TurnReply};
pub use error::EngineError;
