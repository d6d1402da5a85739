//! Core abstractions for the distributed hub session
//!
//! This crate provides the identifiers, graph model, parameter values and
//! error types shared by the session layer and the workflow capture/replay
//! machinery, plus the broadcast event bus both of them report through.

mod error;
pub mod events;
mod ids;
mod model;
mod value;

pub use error::{ControlError, ScriptError, SessionError};
pub use ids::{
    is_module, is_slave_hub, HubId, HubRole, ModuleId, SpawnToken, MASTER_HUB, MODULE_BASE,
    SESSION,
};
pub use model::{Connection, ConnectionKind, Endpoint, ModuleInstance, Parameter, Port, PortDirection};
pub use value::{ParamType, ParamValue};
pub use events::*;

/// Result type for workflow control operations
pub type Result<T, E = ControlError> = std::result::Result<T, E>;
