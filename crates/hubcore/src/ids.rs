use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type ModuleId = i32;
pub type HubId = i32;

/// Handle returned by an asynchronous spawn request
pub type SpawnToken = Uuid;

/// Pseudo-module holding the session-global parameters
pub const SESSION: ModuleId = -1;

/// Id of the master hub; slave hubs are allocated below it
pub const MASTER_HUB: HubId = -8;

/// First id handed out to a spawned module
pub const MODULE_BASE: ModuleId = 1;

pub fn is_module(id: ModuleId) -> bool {
    id >= MODULE_BASE
}

pub fn is_slave_hub(id: HubId) -> bool {
    id < MASTER_HUB
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HubRole {
    Master,
    Slave,
}

impl fmt::Display for HubRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HubRole::Master => write!(f, "master"),
            HubRole::Slave => write!(f, "slave"),
        }
    }
}
