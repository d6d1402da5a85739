use async_trait::async_trait;
use hubcore::{Endpoint, HubId, ModuleId, ParamValue, SessionError, SpawnToken, SESSION};

/// Command and query surface of a running session.
///
/// Commands such as spawn and hub attachment complete on remote hubs; the
/// issuing side only observes their effect once the matching wait returns.
#[async_trait]
pub trait SessionControl: Send + Sync {
    /// Ask `hub` to start a module of `type_name`
    async fn spawn_async(&self, hub: HubId, type_name: &str) -> Result<SpawnToken, SessionError>;

    /// Block until the spawn behind `token` resolves to a module id
    async fn wait_for_spawn(&self, token: SpawnToken) -> Result<ModuleId, SessionError>;

    async fn spawn(&self, hub: HubId, type_name: &str) -> Result<ModuleId, SessionError> {
        let token = self.spawn_async(hub, type_name).await?;
        self.wait_for_spawn(token).await
    }

    /// Stop a running module, or cancel a spawn that has not landed yet
    async fn kill(&self, module: ModuleId) -> Result<(), SessionError>;

    /// Returns once every hub has processed all previously issued commands,
    /// including spawns still in flight
    async fn barrier(&self) -> Result<(), SessionError>;

    async fn connect(&self, from: &Endpoint, to: &Endpoint) -> Result<(), SessionError>;

    async fn disconnect(&self, from: &Endpoint, to: &Endpoint) -> Result<(), SessionError>;

    /// Set a parameter; a `delayed` change is held back until `apply_parameters`
    async fn set_parameter(
        &self,
        module: ModuleId,
        name: &str,
        value: ParamValue,
        delayed: bool,
    ) -> Result<(), SessionError>;

    async fn apply_parameters(&self, module: ModuleId) -> Result<(), SessionError>;

    /// Modules currently running, ascending by id
    async fn running(&self) -> Vec<ModuleId>;

    /// Ids of spawns requested but not yet running, ascending
    async fn spawning(&self) -> Vec<ModuleId>;

    async fn hub_of(&self, module: ModuleId) -> Result<HubId, SessionError>;

    async fn master_hub(&self) -> HubId;

    fn session_id(&self) -> ModuleId {
        SESSION
    }

    async fn all_hubs(&self) -> Vec<HubId>;

    /// Block until at least `count` slave hubs are attached; returns all of
    /// them in attach order
    async fn wait_for_hubs(&self, count: usize) -> Result<Vec<HubId>, SessionError>;

    async fn module_type(&self, module: ModuleId) -> Result<String, SessionError>;

    /// Parameter names in declaration order
    async fn parameters(&self, module: ModuleId) -> Result<Vec<String>, SessionError>;

    async fn parameter(&self, module: ModuleId, name: &str) -> Result<ParamValue, SessionError>;

    async fn is_parameter_default(&self, module: ModuleId, name: &str) -> Result<bool, SessionError>;

    async fn input_ports(&self, module: ModuleId) -> Result<Vec<String>, SessionError>;

    async fn output_ports(&self, module: ModuleId) -> Result<Vec<String>, SessionError>;

    /// Peers of a port or parameter in connection order
    async fn connections(&self, module: ModuleId, name: &str) -> Result<Vec<Endpoint>, SessionError>;
}
