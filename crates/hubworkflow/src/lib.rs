//! Workflow capture and replay
//!
//! Walks the live distributed module graph into a deterministic script and
//! rebuilds that graph from such a script against a freshly reset session,
//! waiting for slave hubs that attach after the script has started.

mod manager;
mod naming;
mod replay;
pub mod script;
mod serializer;
mod snapshot;
mod topology;

pub use manager::WorkflowManager;
pub use naming::{
    module_var, token_var, Naming, MASTER_HUB_VAR, SESSION_VAR, SINGLE_SLAVE_VAR, SLAVE_LIST_VAR,
};
pub use replay::{ReplayEngine, ReplayReport};
pub use script::{Script, ScriptSummary, Statement};
pub use serializer::Serializer;
pub use snapshot::{EdgeLabel, ModuleSnapshot, NodeLabel, Snapshot};
pub use topology::TopologyRegistry;
