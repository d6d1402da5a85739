use hubcore::{HubId, ModuleId, ModuleInstance, ParamValue, Parameter, Port, PortDirection, SessionError};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory trait for module types a hub can spawn
pub trait ModuleFactory: Send + Sync {
    /// Type identifier used in spawn requests (e.g., "Reader", "IsoSurface")
    fn type_name(&self) -> &str;

    /// Ports and parameters of the module type
    fn metadata(&self) -> ModuleMetadata;

    /// Instantiate the module with every parameter at its default
    fn create(&self, id: ModuleId, hub: HubId) -> ModuleInstance {
        let metadata = self.metadata();
        let mut module = ModuleInstance::new(id, self.type_name(), hub);
        module.ports.extend(
            metadata
                .inputs
                .iter()
                .map(|p| Port::new(p.name.clone(), PortDirection::Input)),
        );
        module.ports.extend(
            metadata
                .outputs
                .iter()
                .map(|p| Port::new(p.name.clone(), PortDirection::Output)),
        );
        module.parameters.extend(
            metadata
                .parameters
                .iter()
                .map(|p| Parameter::new(p.name.clone(), p.default.clone())),
        );
        module
    }
}

/// Metadata about a module type
#[derive(Debug, Clone)]
pub struct ModuleMetadata {
    pub description: String,
    pub category: String,
    pub inputs: Vec<PortDefinition>,
    pub outputs: Vec<PortDefinition>,
    pub parameters: Vec<ParameterDefinition>,
}

impl Default for ModuleMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortDefinition {
    pub name: String,
    pub description: String,
}

impl PortDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    pub name: String,
    pub default: ParamValue,
    pub description: String,
}

impl ParameterDefinition {
    pub fn new(
        name: impl Into<String>,
        default: impl Into<ParamValue>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            description: description.into(),
        }
    }
}

/// Module types available on one hub
pub struct ModuleRegistry {
    factories: HashMap<String, Arc<dyn ModuleFactory>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a module factory
    pub fn register(&mut self, factory: Arc<dyn ModuleFactory>) {
        let type_name = factory.type_name().to_string();
        tracing::debug!("Registering module type: {}", type_name);
        self.factories.insert(type_name, factory);
    }

    /// Instantiate a module of `type_name` hosted on `hub`
    pub fn create_module(
        &self,
        id: ModuleId,
        type_name: &str,
        hub: HubId,
    ) -> Result<ModuleInstance, SessionError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| SessionError::SpawnFailed {
                type_name: type_name.to_string(),
                hub,
                reason: "module type not available on hub".to_string(),
            })?;

        Ok(factory.create(id, hub))
    }

    /// All registered module types, sorted by name
    pub fn list_module_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn get_metadata(&self, type_name: &str) -> Option<ModuleMetadata> {
        self.factories.get(type_name).map(|f| f.metadata())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
