//! Session command surface
//!
//! This crate defines the query/command primitives the workflow layer talks
//! to, the registry of module types a hub can spawn, and an in-memory
//! session that hosts a master hub plus any number of slave hubs.

mod config;
mod control;
mod registry;
mod session;

pub use config::SessionConfig;
pub use control::SessionControl;
pub use registry::{ModuleFactory, ModuleMetadata, ModuleRegistry, ParameterDefinition, PortDefinition};
pub use session::LocalSession;
