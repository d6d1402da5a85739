// crates/hubworkflow/tests/serialize_test.rs

use async_trait::async_trait;
use hubcore::{
    ConnectionKind, Endpoint, HubId, ModuleId, ParamValue, SessionError, SpawnToken, MASTER_HUB,
    SESSION,
};
use hubsession::{
    LocalSession, ModuleFactory, ModuleMetadata, ModuleRegistry, ParameterDefinition,
    PortDefinition, SessionConfig, SessionControl,
};
use hubworkflow::{Script, Serializer, Snapshot, Statement, WorkflowManager};
use std::sync::Arc;

struct Reader;

impl ModuleFactory for Reader {
    fn type_name(&self) -> &str {
        "Reader"
    }

    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            outputs: vec![PortDefinition::new("out0", "")],
            parameters: vec![
                ParameterDefinition::new("filename", "", ""),
                ParameterDefinition::new("scale", 1.0, ""),
            ],
            ..Default::default()
        }
    }
}

struct Writer;

impl ModuleFactory for Writer {
    fn type_name(&self) -> &str {
        "Writer"
    }

    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            inputs: vec![PortDefinition::new("in0", "")],
            parameters: vec![ParameterDefinition::new("scale", 1.0, "")],
            ..Default::default()
        }
    }
}

/// Pass-through module with one input and one output
struct Relay(&'static str);

impl ModuleFactory for Relay {
    fn type_name(&self) -> &str {
        self.0
    }

    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            inputs: vec![PortDefinition::new("in0", "")],
            outputs: vec![PortDefinition::new("out0", "")],
            ..Default::default()
        }
    }
}

fn registry() -> Arc<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(Reader));
    registry.register(Arc::new(Writer));
    for name in ["A", "A1", "Filler"] {
        registry.register(Arc::new(Relay(name)));
    }
    Arc::new(registry)
}

/// Session whose `gone` module disappears once its type is queried
struct Vanishing {
    inner: LocalSession,
    gone: ModuleId,
}

#[async_trait]
impl SessionControl for Vanishing {
    async fn spawn_async(&self, hub: HubId, type_name: &str) -> Result<SpawnToken, SessionError> {
        self.inner.spawn_async(hub, type_name).await
    }

    async fn wait_for_spawn(&self, token: SpawnToken) -> Result<ModuleId, SessionError> {
        self.inner.wait_for_spawn(token).await
    }

    async fn kill(&self, module: ModuleId) -> Result<(), SessionError> {
        self.inner.kill(module).await
    }

    async fn barrier(&self) -> Result<(), SessionError> {
        self.inner.barrier().await
    }

    async fn connect(&self, from: &Endpoint, to: &Endpoint) -> Result<(), SessionError> {
        self.inner.connect(from, to).await
    }

    async fn disconnect(&self, from: &Endpoint, to: &Endpoint) -> Result<(), SessionError> {
        self.inner.disconnect(from, to).await
    }

    async fn set_parameter(
        &self,
        module: ModuleId,
        name: &str,
        value: ParamValue,
        delayed: bool,
    ) -> Result<(), SessionError> {
        self.inner.set_parameter(module, name, value, delayed).await
    }

    async fn apply_parameters(&self, module: ModuleId) -> Result<(), SessionError> {
        self.inner.apply_parameters(module).await
    }

    async fn running(&self) -> Vec<ModuleId> {
        self.inner.running().await
    }

    async fn spawning(&self) -> Vec<ModuleId> {
        self.inner.spawning().await
    }

    async fn hub_of(&self, module: ModuleId) -> Result<HubId, SessionError> {
        self.inner.hub_of(module).await
    }

    async fn master_hub(&self) -> HubId {
        self.inner.master_hub().await
    }

    async fn all_hubs(&self) -> Vec<HubId> {
        self.inner.all_hubs().await
    }

    async fn wait_for_hubs(&self, count: usize) -> Result<Vec<HubId>, SessionError> {
        self.inner.wait_for_hubs(count).await
    }

    async fn module_type(&self, module: ModuleId) -> Result<String, SessionError> {
        if module == self.gone {
            return Err(SessionError::UnknownModule(module));
        }
        self.inner.module_type(module).await
    }

    async fn parameters(&self, module: ModuleId) -> Result<Vec<String>, SessionError> {
        self.inner.parameters(module).await
    }

    async fn parameter(&self, module: ModuleId, name: &str) -> Result<ParamValue, SessionError> {
        self.inner.parameter(module, name).await
    }

    async fn is_parameter_default(&self, module: ModuleId, name: &str) -> Result<bool, SessionError> {
        self.inner.is_parameter_default(module, name).await
    }

    async fn input_ports(&self, module: ModuleId) -> Result<Vec<String>, SessionError> {
        self.inner.input_ports(module).await
    }

    async fn output_ports(&self, module: ModuleId) -> Result<Vec<String>, SessionError> {
        self.inner.output_ports(module).await
    }

    async fn connections(&self, module: ModuleId, name: &str) -> Result<Vec<Endpoint>, SessionError> {
        self.inner.connections(module, name).await
    }
}

fn setup() -> (Arc<LocalSession>, WorkflowManager) {
    let session = Arc::new(LocalSession::new(SessionConfig::default(), registry()));
    let manager = WorkflowManager::new(session.clone());
    (session, manager)
}

const SINGLE_SLAVE_SCRIPT: &str = "\
MasterHub = getMasterHub()
VistleSession = getVistleSession()

# spawn all local modules
umReader1 = spawnAsync(MasterHub, 'Reader')

mReader1 = waitForSpawn(umReader1)
setStringParam(mReader1, 'filename', 'x.vtk', True)
applyParameters(mReader1)

# all local connections

printInfo('waiting for a slave hub to connect...')
SlaveHub = waitForHub()

# spawn all remote modules
umWriter2 = spawnAsync(SlaveHub, 'Writer')

mWriter2 = waitForSpawn(umWriter2)

# connections between local and remote
connect(mReader1,'out0', mWriter2,'in0')
";

async fn single_slave_workflow(session: &LocalSession) {
    let reader = session.spawn(MASTER_HUB, "Reader").await.unwrap();
    let slave = session.attach_slave(registry()).await;
    let writer = session.spawn(slave, "Writer").await.unwrap();

    session
        .set_parameter(reader, "filename", ParamValue::from("x.vtk"), false)
        .await
        .unwrap();
    session
        .connect(&Endpoint::new(reader, "out0"), &Endpoint::new(writer, "in0"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_single_slave_workflow_script() {
    let (session, manager) = setup();
    single_slave_workflow(&session).await;

    let script = manager.script().await.unwrap();

    assert_eq!(script.to_string(), SINGLE_SLAVE_SCRIPT);
}

#[tokio::test]
async fn test_serialization_is_deterministic() {
    let (session, manager) = setup();
    single_slave_workflow(&session).await;

    let first = manager.script().await.unwrap().to_string();
    let second = manager.script().await.unwrap().to_string();

    assert_eq!(first, second);
    assert_eq!(first.parse::<Script>().unwrap().to_string(), first);
}

#[tokio::test]
async fn test_local_only_workflow_has_no_hub_wait() {
    let (session, manager) = setup();
    let reader = session.spawn(MASTER_HUB, "Reader").await.unwrap();
    let writer = session.spawn(MASTER_HUB, "Writer").await.unwrap();
    session
        .connect(&Endpoint::new(writer, "in0"), &Endpoint::new(reader, "out0"))
        .await
        .unwrap();

    let script = manager.script().await.unwrap();
    let text = script.to_string();

    assert!(text.ends_with("# all local connections\nconnect(mReader1,'out0', mWriter2,'in0')\n"));
    assert!(!text.contains("waitForHub"));
    assert!(!text.contains("remote"));
}

#[tokio::test]
async fn test_parameter_link_written_once() {
    let (session, manager) = setup();
    let reader = session.spawn(MASTER_HUB, "Reader").await.unwrap();
    let writer = session.spawn(MASTER_HUB, "Writer").await.unwrap();
    session
        .connect(&Endpoint::new(writer, "scale"), &Endpoint::new(reader, "scale"))
        .await
        .unwrap();

    let snapshot = manager.capture().await.unwrap();
    assert_eq!(snapshot.connections.len(), 1);
    assert_eq!(snapshot.connections[0].kind, ConnectionKind::Parameter);

    let script = Serializer::new(&snapshot).serialize();
    let connects = script
        .statements()
        .iter()
        .filter(|s| matches!(s, Statement::Connect { .. }))
        .count();
    assert_eq!(connects, 1);
}

#[tokio::test]
async fn test_default_parameters_are_omitted() {
    let (session, manager) = setup();
    let reader = session.spawn(MASTER_HUB, "Reader").await.unwrap();
    session
        .set_parameter(reader, "filename", ParamValue::from(""), false)
        .await
        .unwrap();
    session
        .set_parameter(reader, "scale", ParamValue::Float(2.5), false)
        .await
        .unwrap();

    let script = manager.script().await.unwrap();
    let sets: Vec<String> = script
        .statements()
        .iter()
        .filter(|s| matches!(s, Statement::SetParameter { .. }))
        .map(|s| s.to_string())
        .collect();

    assert_eq!(sets, vec!["setFloatParam(mReader1, 'scale', 2.5, True)"]);
}

#[tokio::test]
async fn test_session_parameters_come_first() {
    let (session, manager) = setup();
    session.spawn(MASTER_HUB, "Reader").await.unwrap();
    session
        .set_parameter(SESSION, "archive_compression", ParamValue::Int(3), false)
        .await
        .unwrap();

    let script = manager.script().await.unwrap();
    let lines: Vec<String> = script.statements().iter().map(|s| s.to_string()).collect();

    assert_eq!(
        lines[2],
        "setIntParam(VistleSession, 'archive_compression', 3, True)"
    );
    assert_eq!(lines[3], "applyParameters(VistleSession)");
    assert_eq!(lines[5], "# spawn all local modules");
}

#[tokio::test]
async fn test_multiple_slaves_are_named_in_attach_order() {
    let (session, manager) = setup();
    let reader = session.spawn(MASTER_HUB, "Reader").await.unwrap();
    let first = session.attach_slave(registry()).await;
    let idle = session.attach_slave(registry()).await;
    let second = session.attach_slave(registry()).await;
    assert!(first > idle && idle > second);

    let near = session.spawn(first, "Writer").await.unwrap();
    let far = session.spawn(second, "Writer").await.unwrap();
    for writer in [near, far] {
        session
            .connect(&Endpoint::new(reader, "out0"), &Endpoint::new(writer, "in0"))
            .await
            .unwrap();
    }

    let script = manager.script().await.unwrap();
    let text = script.to_string();

    assert!(text.contains(
        "printInfo('waiting for 2 slave hubs to connect...')\n\
         slavehubs = waitForHubs(2)\n\
         Slave0 = slavehubs[0]\n\
         Slave1 = slavehubs[1]\n"
    ));
    assert!(text.contains("umWriter2 = spawnAsync(Slave0, 'Writer')"));
    assert!(text.contains("umWriter3 = spawnAsync(Slave1, 'Writer')"));

    let summary = script.validate().unwrap();
    assert_eq!(summary.local_spawns, 1);
    assert_eq!(summary.remote_spawns, 2);
    assert_eq!(summary.connections, 2);
    assert_eq!(summary.slave_hubs, 2);
}

#[tokio::test]
async fn test_generated_scripts_validate() {
    let (session, manager) = setup();
    single_slave_workflow(&session).await;
    let extra = session.spawn(MASTER_HUB, "Writer").await.unwrap();
    session
        .connect(&Endpoint::new(1, "out0"), &Endpoint::new(extra, "in0"))
        .await
        .unwrap();

    let summary = manager.script().await.unwrap().validate().unwrap();

    assert_eq!(summary.local_spawns, 2);
    assert_eq!(summary.remote_spawns, 1);
    assert_eq!(summary.parameter_sets, 1);
    assert_eq!(summary.connections, 2);
}

#[tokio::test]
async fn test_capture_skips_connections_leaving_the_selection() {
    let session = LocalSession::new(SessionConfig::default(), registry());
    let reader = session.spawn(MASTER_HUB, "Reader").await.unwrap();
    let writer = session.spawn(MASTER_HUB, "Writer").await.unwrap();
    session
        .connect(&Endpoint::new(reader, "out0"), &Endpoint::new(writer, "in0"))
        .await
        .unwrap();

    let snapshot = Snapshot::capture(&session, &[reader, reader, 42]).await.unwrap();

    assert_eq!(snapshot.modules.len(), 1);
    assert_eq!(snapshot.modules[0].id, reader);
    assert!(snapshot.connections.is_empty());
}

#[tokio::test]
async fn test_module_vanishing_mid_capture_releases_its_hub() {
    let inner = LocalSession::new(SessionConfig::default(), registry());
    let reader = inner.spawn(MASTER_HUB, "Reader").await.unwrap();
    let slave = inner.attach_slave(registry()).await;
    let writer = inner.spawn(slave, "Writer").await.unwrap();
    inner
        .connect(&Endpoint::new(reader, "out0"), &Endpoint::new(writer, "in0"))
        .await
        .unwrap();
    let session = Vanishing {
        inner,
        gone: writer,
    };

    let snapshot = Snapshot::capture(&session, &[reader, writer]).await.unwrap();

    assert_eq!(snapshot.modules.len(), 1);
    assert!(snapshot.connections.is_empty());
    assert!(snapshot.topology.slave_hubs().is_empty());
    assert_eq!(snapshot.topology.hub_of(writer), None);

    let text = Serializer::new(&snapshot).serialize().to_string();
    assert!(!text.contains("waitForHub"));
    assert!(!text.contains("Writer"));
}

#[tokio::test]
async fn test_type_names_ending_in_digits_keep_distinct_variables() {
    let (session, manager) = setup();
    session.spawn(MASTER_HUB, "Filler").await.unwrap();
    let a1 = session.spawn(MASTER_HUB, "A1").await.unwrap();
    for _ in 3..12 {
        session.spawn(MASTER_HUB, "Filler").await.unwrap();
    }
    let a = session.spawn(MASTER_HUB, "A").await.unwrap();
    assert_eq!((a1, a), (2, 12));
    for filler in (1..12).filter(|id| *id != a1) {
        session.kill(filler).await.unwrap();
    }
    session
        .connect(&Endpoint::new(a1, "out0"), &Endpoint::new(a, "in0"))
        .await
        .unwrap();

    let script = manager.script().await.unwrap();
    let text = script.to_string();

    assert!(text.contains("umA1_2 = spawnAsync(MasterHub, 'A1')"));
    assert!(text.contains("umA12 = spawnAsync(MasterHub, 'A')"));
    assert!(text.contains("connect(mA1_2,'out0', mA12,'in0')"));
    assert_eq!(script.validate().unwrap().local_spawns, 2);

    let target = Arc::new(LocalSession::new(SessionConfig::default(), registry()));
    let replayed = WorkflowManager::new(target.clone());
    let report = replayed.engine().replay(&script).await.unwrap();
    assert_eq!(report.modules.len(), 2);
    assert_eq!(report.connections, 1);
    assert!(manager
        .capture()
        .await
        .unwrap()
        .is_isomorphic(&replayed.capture().await.unwrap()));
}
