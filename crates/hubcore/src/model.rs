use crate::{HubId, ModuleId, ParamValue};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// One side of a connection: a port or a parameter on a module
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    pub module: ModuleId,
    pub name: String,
}

impl Endpoint {
    pub fn new(module: ModuleId, name: impl Into<String>) -> Self {
        Self {
            module,
            name: name.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.name)
    }
}

/// Named data-connection point on a module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub direction: PortDirection,
    /// Peers in connection order
    pub connections: Vec<Endpoint>,
}

impl Port {
    pub fn new(name: impl Into<String>, direction: PortDirection) -> Self {
        Self {
            name: name.into(),
            direction,
            connections: Vec::new(),
        }
    }
}

/// Named, typed and linkable configuration value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: ParamValue,
    pub default: ParamValue,
    /// Linked parameters in connection order
    pub connections: Vec<Endpoint>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, default: ParamValue) -> Self {
        Self {
            name: name.into(),
            value: default.clone(),
            default,
            connections: Vec::new(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.value == self.default
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConnectionKind {
    Port,
    Parameter,
}

/// Edge between two endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: Endpoint,
    pub to: Endpoint,
    pub kind: ConnectionKind,
}

impl Connection {
    pub fn new(from: Endpoint, to: Endpoint, kind: ConnectionKind) -> Self {
        Self { from, to, kind }
    }

    /// Identity of the logical edge.
    ///
    /// Port connections are directional. Parameter links are symmetric, so
    /// their endpoints are ordered before comparison.
    pub fn key(&self) -> (ConnectionKind, Endpoint, Endpoint) {
        match self.kind {
            ConnectionKind::Port => (self.kind, self.from.clone(), self.to.clone()),
            ConnectionKind::Parameter => {
                if self.from <= self.to {
                    (self.kind, self.from.clone(), self.to.clone())
                } else {
                    (self.kind, self.to.clone(), self.from.clone())
                }
            }
        }
    }
}

/// Running pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleInstance {
    pub id: ModuleId,
    pub type_name: String,
    pub hub: HubId,
    /// Ports in declaration order
    pub ports: Vec<Port>,
    /// Parameters in declaration order
    pub parameters: Vec<Parameter>,
}

impl ModuleInstance {
    pub fn new(id: ModuleId, type_name: impl Into<String>, hub: HubId) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            hub,
            ports: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn port_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.name == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.name == name)
    }

    pub fn ports_in(&self, direction: PortDirection) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(move |p| p.direction == direction)
    }

    /// Connection list of a port or parameter
    pub fn connections_mut(&mut self, name: &str) -> Option<&mut Vec<Endpoint>> {
        if let Some(idx) = self.ports.iter().position(|p| p.name == name) {
            return Some(&mut self.ports[idx].connections);
        }
        self.parameter_mut(name).map(|p| &mut p.connections)
    }

    /// Drop every connection to `module`
    pub fn forget(&mut self, module: ModuleId) {
        for port in &mut self.ports {
            port.connections.retain(|e| e.module != module);
        }
        for param in &mut self.parameters {
            param.connections.retain(|e| e.module != module);
        }
    }
}
