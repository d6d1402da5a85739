use crate::{HubId, ModuleId, ParamType, SpawnToken};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("No file loaded and no file specified")]
    NoFileName,

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("Replay failed at line {line}: {source}")]
    Replay {
        line: usize,
        #[source]
        source: SessionError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Unknown module: {0}")]
    UnknownModule(ModuleId),

    #[error("Unknown hub: {0}")]
    UnknownHub(HubId),

    #[error("Unknown spawn token: {0}")]
    UnknownSpawnToken(SpawnToken),

    #[error("Module {module} has no port '{name}'")]
    UnknownPort { module: ModuleId, name: String },

    #[error("Module {module} has no parameter '{name}'")]
    UnknownParameter { module: ModuleId, name: String },

    #[error("Spawning '{type_name}' on hub {hub} failed: {reason}")]
    SpawnFailed {
        type_name: String,
        hub: HubId,
        reason: String,
    },

    #[error("Parameter '{name}' of module {module} is {expected}, got {actual}")]
    TypeMismatch {
        module: ModuleId,
        name: String,
        expected: ParamType,
        actual: ParamType,
    },

    #[error("Cannot connect {from} to {to}")]
    IncompatibleEndpoints { from: String, to: String },

    #[error("Cannot connect {0} to itself")]
    SelfConnection(String),

    #[error("Timed out waiting for {expected} slave hubs, {attached} attached")]
    HubWaitTimeout { expected: usize, attached: usize },

    #[error("Timed out waiting for spawn {0}")]
    SpawnTimeout(SpawnToken),

    #[error("Session closed")]
    Closed,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: '{name}' is used before it is bound")]
    UnboundVariable { line: usize, name: String },

    #[error("line {line}: '{name}' is not a {expected}")]
    WrongBinding {
        line: usize,
        name: String,
        expected: &'static str,
    },

    #[error("line {line}: '{name}' is already bound")]
    AlreadyBound { line: usize, name: String },

    #[error("line {line}: '{name}' has no hub at index {index}")]
    HubIndexOutOfRange {
        line: usize,
        name: String,
        index: usize,
    },
}
