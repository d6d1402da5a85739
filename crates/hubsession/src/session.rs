use crate::{ModuleRegistry, SessionConfig, SessionControl};
use async_trait::async_trait;
use chrono::Utc;
use hubcore::{
    is_module, Endpoint, EventBus, HubId, HubRole, ModuleId, ModuleInstance, ParamValue, Parameter,
    PortDirection, SessionError, SessionEvent, SpawnToken, MASTER_HUB, MODULE_BASE, SESSION,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot, watch, Mutex, Notify, RwLock};
use tokio::time::{sleep, timeout};

type SpawnResult = Result<ModuleId, SessionError>;

struct HubEntry {
    role: HubRole,
    registry: Arc<ModuleRegistry>,
}

struct SessionState {
    master: HubId,
    hubs: BTreeMap<HubId, HubEntry>,
    /// Running modules plus the session pseudo-module
    modules: BTreeMap<ModuleId, ModuleInstance>,
    /// Delayed parameter changes waiting for `apply_parameters`
    pending_values: BTreeMap<(ModuleId, String), ParamValue>,
    /// Ids handed out to spawns that have not landed yet
    spawning: BTreeSet<ModuleId>,
    next_module_id: ModuleId,
    next_hub_id: HubId,
}

enum EndpointKind {
    Port(PortDirection),
    Parameter,
}

/// In-memory session hosting a master hub and dynamically attached slaves
pub struct LocalSession {
    config: SessionConfig,
    state: Arc<RwLock<SessionState>>,
    events: Arc<EventBus>,
    /// Attached slave hubs in attach order
    slaves: watch::Sender<Vec<HubId>>,
    pending_spawns: Mutex<HashMap<SpawnToken, (ModuleId, oneshot::Receiver<SpawnResult>)>>,
    /// Woken whenever an in-flight spawn lands or is cancelled
    settled: Arc<Notify>,
}

impl LocalSession {
    /// Create a session whose master hub can spawn the types in `registry`
    pub fn new(config: SessionConfig, registry: Arc<ModuleRegistry>) -> Self {
        let mut session_module = ModuleInstance::new(SESSION, "Session", MASTER_HUB);
        session_module.parameters.extend(
            config
                .session_parameters
                .iter()
                .map(|p| Parameter::new(p.name.clone(), p.default.clone())),
        );

        let mut hubs = BTreeMap::new();
        hubs.insert(
            MASTER_HUB,
            HubEntry {
                role: HubRole::Master,
                registry,
            },
        );
        let mut modules = BTreeMap::new();
        modules.insert(SESSION, session_module);

        let state = SessionState {
            master: MASTER_HUB,
            hubs,
            modules,
            pending_values: BTreeMap::new(),
            spawning: BTreeSet::new(),
            next_module_id: MODULE_BASE,
            next_hub_id: MASTER_HUB - 1,
        };
        let (slaves, _) = watch::channel(Vec::new());

        Self {
            events: Arc::new(EventBus::new(config.event_buffer_size)),
            config,
            state: Arc::new(RwLock::new(state)),
            slaves,
            pending_spawns: Mutex::new(HashMap::new()),
            settled: Arc::new(Notify::new()),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Attach a slave hub able to spawn the types in `registry`
    pub async fn attach_slave(&self, registry: Arc<ModuleRegistry>) -> HubId {
        let hub = {
            let mut st = self.state.write().await;
            let hub = st.next_hub_id;
            st.next_hub_id -= 1;
            st.hubs.insert(
                hub,
                HubEntry {
                    role: HubRole::Slave,
                    registry,
                },
            );
            hub
        };

        self.slaves.send_modify(|slaves| slaves.push(hub));
        tracing::info!("Slave hub {} attached", hub);
        self.events.emit(SessionEvent::HubAttached {
            hub,
            role: HubRole::Slave,
            timestamp: Utc::now(),
        });
        hub
    }

    /// Detach a slave hub, killing every module it hosts
    pub async fn detach_hub(&self, hub: HubId) -> Result<(), SessionError> {
        let killed = {
            let mut st = self.state.write().await;
            match st.hubs.get(&hub) {
                Some(entry) if entry.role == HubRole::Slave => {}
                _ => return Err(SessionError::UnknownHub(hub)),
            }
            st.hubs.remove(&hub);
            let hosted: Vec<ModuleId> = st
                .modules
                .values()
                .filter(|m| m.hub == hub && is_module(m.id))
                .map(|m| m.id)
                .collect();
            for id in &hosted {
                remove_module(&mut st, *id);
            }
            hosted
        };

        self.slaves.send_modify(|slaves| slaves.retain(|h| *h != hub));
        for module in killed {
            self.events.emit(SessionEvent::ModuleKilled {
                module,
                timestamp: Utc::now(),
            });
        }
        tracing::info!("Slave hub {} detached", hub);
        self.events.emit(SessionEvent::HubDetached {
            hub,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn read_module<T>(
        &self,
        module: ModuleId,
        f: impl FnOnce(&ModuleInstance) -> T,
    ) -> Result<T, SessionError> {
        let st = self.state.read().await;
        st.modules
            .get(&module)
            .map(f)
            .ok_or(SessionError::UnknownModule(module))
    }

    /// Order two endpoints as (source, target) and classify the edge
    fn orient(
        st: &SessionState,
        a: &Endpoint,
        b: &Endpoint,
    ) -> Result<(Endpoint, Endpoint), SessionError> {
        match (endpoint_kind(st, a)?, endpoint_kind(st, b)?) {
            (EndpointKind::Port(PortDirection::Output), EndpointKind::Port(PortDirection::Input)) => {
                Ok((a.clone(), b.clone()))
            }
            (EndpointKind::Port(PortDirection::Input), EndpointKind::Port(PortDirection::Output)) => {
                Ok((b.clone(), a.clone()))
            }
            (EndpointKind::Parameter, EndpointKind::Parameter) => Ok((a.clone(), b.clone())),
            _ => Err(SessionError::IncompatibleEndpoints {
                from: a.to_string(),
                to: b.to_string(),
            }),
        }
    }
}

fn endpoint_kind(st: &SessionState, endpoint: &Endpoint) -> Result<EndpointKind, SessionError> {
    let module = st
        .modules
        .get(&endpoint.module)
        .ok_or(SessionError::UnknownModule(endpoint.module))?;
    if let Some(port) = module.port(&endpoint.name) {
        return Ok(EndpointKind::Port(port.direction));
    }
    if module.parameter(&endpoint.name).is_some() {
        return Ok(EndpointKind::Parameter);
    }
    Err(SessionError::UnknownPort {
        module: endpoint.module,
        name: endpoint.name.clone(),
    })
}

fn connections_of<'a>(module: &'a ModuleInstance, name: &str) -> Option<&'a Vec<Endpoint>> {
    module
        .port(name)
        .map(|p| &p.connections)
        .or_else(|| module.parameter(name).map(|p| &p.connections))
}

fn is_linked(st: &SessionState, from: &Endpoint, to: &Endpoint) -> bool {
    st.modules
        .get(&from.module)
        .and_then(|m| connections_of(m, &from.name))
        .map(|peers| peers.contains(to))
        .unwrap_or(false)
}

fn link(st: &mut SessionState, from: &Endpoint, to: &Endpoint) {
    if let Some(peers) = st
        .modules
        .get_mut(&from.module)
        .and_then(|m| m.connections_mut(&from.name))
    {
        peers.push(to.clone());
    }
}

fn unlink(st: &mut SessionState, from: &Endpoint, to: &Endpoint) {
    if let Some(peers) = st
        .modules
        .get_mut(&from.module)
        .and_then(|m| m.connections_mut(&from.name))
    {
        peers.retain(|e| e != to);
    }
}

fn remove_module(st: &mut SessionState, id: ModuleId) {
    st.modules.remove(&id);
    for module in st.modules.values_mut() {
        module.forget(id);
    }
    st.pending_values.retain(|(m, _), _| *m != id);
}

#[async_trait]
impl SessionControl for LocalSession {
    async fn spawn_async(&self, hub: HubId, type_name: &str) -> Result<SpawnToken, SessionError> {
        let token = SpawnToken::new_v4();
        let (tx, rx) = oneshot::channel();

        let (id, created) = {
            let mut st = self.state.write().await;
            let registry = st
                .hubs
                .get(&hub)
                .map(|entry| entry.registry.clone())
                .ok_or(SessionError::UnknownHub(hub))?;
            let id = st.next_module_id;
            st.next_module_id += 1;
            let created = registry.create_module(id, type_name, hub);
            if created.is_ok() {
                st.spawning.insert(id);
            }
            (id, created)
        };
        self.pending_spawns.lock().await.insert(token, (id, rx));

        let instance = match created {
            Ok(instance) => instance,
            Err(e) => {
                tracing::error!("Spawn of '{}' on hub {} failed: {}", type_name, hub, e);
                self.events.emit(SessionEvent::SpawnFailed {
                    token,
                    type_name: type_name.to_string(),
                    hub,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                let _ = tx.send(Err(e));
                return Ok(token);
            }
        };

        tracing::debug!("Spawn request {} for '{}' on hub {}", token, type_name, hub);
        let state = self.state.clone();
        let events = self.events.clone();
        let settled = self.settled.clone();
        let latency = self.config.spawn_latency;
        let type_name = type_name.to_string();

        tokio::spawn(async move {
            if !latency.is_zero() {
                sleep(latency).await;
            }

            let mut st = state.write().await;
            if !st.spawning.remove(&id) {
                drop(st);
                tracing::debug!("Spawn {} of '{}' was killed before it started", token, type_name);
                let _ = tx.send(Err(SessionError::SpawnFailed {
                    type_name,
                    hub,
                    reason: "killed before start".to_string(),
                }));
                return;
            }
            if !st.hubs.contains_key(&hub) {
                drop(st);
                settled.notify_waiters();
                let _ = tx.send(Err(SessionError::SpawnFailed {
                    type_name,
                    hub,
                    reason: "hub detached".to_string(),
                }));
                return;
            }
            st.modules.insert(id, instance);
            drop(st);
            settled.notify_waiters();

            events.emit(SessionEvent::ModuleSpawned {
                module: id,
                type_name,
                hub,
                token,
                timestamp: Utc::now(),
            });
            let _ = tx.send(Ok(id));
        });

        Ok(token)
    }

    async fn wait_for_spawn(&self, token: SpawnToken) -> Result<ModuleId, SessionError> {
        let (_, rx) = self
            .pending_spawns
            .lock()
            .await
            .remove(&token)
            .ok_or(SessionError::UnknownSpawnToken(token))?;

        let received = match self.config.spawn_timeout {
            Some(limit) => timeout(limit, rx)
                .await
                .map_err(|_| SessionError::SpawnTimeout(token))?,
            None => rx.await,
        };

        match received {
            Ok(result) => result,
            Err(_) => Err(SessionError::Closed),
        }
    }

    async fn kill(&self, module: ModuleId) -> Result<(), SessionError> {
        let cancelled = {
            let mut st = self.state.write().await;
            if st.spawning.remove(&module) {
                true
            } else if !is_module(module) || !st.modules.contains_key(&module) {
                return Err(SessionError::UnknownModule(module));
            } else {
                remove_module(&mut st, module);
                false
            }
        };
        if cancelled {
            self.settled.notify_waiters();
        }

        tracing::debug!("Killed module {}", module);
        self.events.emit(SessionEvent::ModuleKilled {
            module,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn barrier(&self) -> Result<(), SessionError> {
        loop {
            // Registered before the check so a spawn landing right after it still wakes us
            let settled = self.settled.notified();
            {
                let st = self.state.write().await;
                if st.spawning.is_empty() {
                    // Tokens of failed or killed spawns can never be redeemed
                    self.pending_spawns
                        .lock()
                        .await
                        .retain(|_, entry| st.modules.contains_key(&entry.0));
                    break;
                }
                tracing::debug!("Barrier waiting for {} spawns in flight", st.spawning.len());
            }
            settled.await;
        }

        tracing::debug!("Barrier reached");
        self.events.emit(SessionEvent::Barrier {
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn connect(&self, from: &Endpoint, to: &Endpoint) -> Result<(), SessionError> {
        if from == to {
            return Err(SessionError::SelfConnection(from.to_string()));
        }

        let (source, target) = {
            let mut st = self.state.write().await;
            let (source, target) = Self::orient(&st, from, to)?;
            if is_linked(&st, &source, &target) {
                tracing::debug!("{} -> {} already connected", source, target);
                return Ok(());
            }
            link(&mut st, &source, &target);
            link(&mut st, &target, &source);
            (source, target)
        };

        self.events.emit(SessionEvent::Connected {
            from: source,
            to: target,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn disconnect(&self, from: &Endpoint, to: &Endpoint) -> Result<(), SessionError> {
        let (source, target) = {
            let mut st = self.state.write().await;
            let (source, target) = Self::orient(&st, from, to)?;
            if !is_linked(&st, &source, &target) {
                return Ok(());
            }
            unlink(&mut st, &source, &target);
            unlink(&mut st, &target, &source);
            (source, target)
        };

        self.events.emit(SessionEvent::Disconnected {
            from: source,
            to: target,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn set_parameter(
        &self,
        module: ModuleId,
        name: &str,
        value: ParamValue,
        delayed: bool,
    ) -> Result<(), SessionError> {
        {
            let mut guard = self.state.write().await;
            let st = &mut *guard;
            let instance = st
                .modules
                .get_mut(&module)
                .ok_or(SessionError::UnknownModule(module))?;
            let param = instance
                .parameter_mut(name)
                .ok_or_else(|| SessionError::UnknownParameter {
                    module,
                    name: name.to_string(),
                })?;

            let expected = param.default.param_type();
            if value.param_type() != expected {
                return Err(SessionError::TypeMismatch {
                    module,
                    name: name.to_string(),
                    expected,
                    actual: value.param_type(),
                });
            }

            if delayed {
                st.pending_values.insert((module, name.to_string()), value);
                return Ok(());
            }
            param.value = value.clone();
        }

        self.events.emit(SessionEvent::ParameterChanged {
            module,
            name: name.to_string(),
            value,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn apply_parameters(&self, module: ModuleId) -> Result<(), SessionError> {
        let applied = {
            let mut guard = self.state.write().await;
            let st = &mut *guard;
            let instance = st
                .modules
                .get_mut(&module)
                .ok_or(SessionError::UnknownModule(module))?;

            let mut applied = Vec::new();
            st.pending_values.retain(|(m, name), value| {
                if *m == module {
                    applied.push((name.clone(), value.clone()));
                    false
                } else {
                    true
                }
            });
            for (name, value) in &applied {
                if let Some(param) = instance.parameter_mut(name) {
                    param.value = value.clone();
                }
            }
            applied
        };

        for (name, value) in applied {
            self.events.emit(SessionEvent::ParameterChanged {
                module,
                name,
                value,
                timestamp: Utc::now(),
            });
        }
        self.events.emit(SessionEvent::ParametersApplied {
            module,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn running(&self) -> Vec<ModuleId> {
        let st = self.state.read().await;
        st.modules.keys().copied().filter(|id| is_module(*id)).collect()
    }

    async fn spawning(&self) -> Vec<ModuleId> {
        let st = self.state.read().await;
        st.spawning.iter().copied().collect()
    }

    async fn hub_of(&self, module: ModuleId) -> Result<HubId, SessionError> {
        self.read_module(module, |m| m.hub).await
    }

    async fn master_hub(&self) -> HubId {
        self.state.read().await.master
    }

    async fn all_hubs(&self) -> Vec<HubId> {
        let st = self.state.read().await;
        st.hubs.keys().copied().collect()
    }

    async fn wait_for_hubs(&self, count: usize) -> Result<Vec<HubId>, SessionError> {
        let mut rx = self.slaves.subscribe();
        let wait = async move {
            loop {
                {
                    let attached = rx.borrow_and_update();
                    if attached.len() >= count {
                        return Ok((*attached).clone());
                    }
                    tracing::debug!("Waiting for {} slave hubs, {} attached", count, attached.len());
                }
                if rx.changed().await.is_err() {
                    return Err(SessionError::Closed);
                }
            }
        };

        match self.config.hub_wait_timeout {
            Some(limit) => match timeout(limit, wait).await {
                Ok(result) => result,
                Err(_) => Err(SessionError::HubWaitTimeout {
                    expected: count,
                    attached: self.slaves.borrow().len(),
                }),
            },
            None => wait.await,
        }
    }

    async fn module_type(&self, module: ModuleId) -> Result<String, SessionError> {
        self.read_module(module, |m| m.type_name.clone()).await
    }

    async fn parameters(&self, module: ModuleId) -> Result<Vec<String>, SessionError> {
        self.read_module(module, |m| m.parameters.iter().map(|p| p.name.clone()).collect())
            .await
    }

    async fn parameter(&self, module: ModuleId, name: &str) -> Result<ParamValue, SessionError> {
        self.read_module(module, |m| m.parameter(name).map(|p| p.value.clone()))
            .await?
            .ok_or_else(|| SessionError::UnknownParameter {
                module,
                name: name.to_string(),
            })
    }

    async fn is_parameter_default(&self, module: ModuleId, name: &str) -> Result<bool, SessionError> {
        self.read_module(module, |m| m.parameter(name).map(|p| p.is_default()))
            .await?
            .ok_or_else(|| SessionError::UnknownParameter {
                module,
                name: name.to_string(),
            })
    }

    async fn input_ports(&self, module: ModuleId) -> Result<Vec<String>, SessionError> {
        self.read_module(module, |m| {
            m.ports_in(PortDirection::Input).map(|p| p.name.clone()).collect()
        })
        .await
    }

    async fn output_ports(&self, module: ModuleId) -> Result<Vec<String>, SessionError> {
        self.read_module(module, |m| {
            m.ports_in(PortDirection::Output).map(|p| p.name.clone()).collect()
        })
        .await
    }

    async fn connections(&self, module: ModuleId, name: &str) -> Result<Vec<Endpoint>, SessionError> {
        self.read_module(module, |m| connections_of(m, name).cloned())
            .await?
            .ok_or_else(|| SessionError::UnknownPort {
                module,
                name: name.to_string(),
            })
    }
}
