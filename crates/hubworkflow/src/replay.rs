use crate::{Script, Statement};
use futures::future::try_join_all;
use hubcore::{
    ControlError, Endpoint, HubId, ModuleId, Result, ScriptError, SessionError, SpawnToken,
};
use hubsession::SessionControl;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a successful replay
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayReport {
    /// Script variable to the module id it was bound to
    pub modules: BTreeMap<String, ModuleId>,
    /// Slave hubs the script waited for, in attach order
    pub slave_hubs: Vec<HubId>,
    pub parameters: usize,
    pub connections: usize,
}

#[derive(Debug, Clone)]
enum Binding {
    Hub(HubId),
    Module(ModuleId),
    Token(SpawnToken),
    HubList(Vec<HubId>),
}

#[derive(Default)]
struct Environment {
    bindings: HashMap<String, Binding>,
}

impl Environment {
    fn bind(&mut self, name: &str, binding: Binding) {
        self.bindings.insert(name.to_string(), binding);
    }

    fn lookup(&self, line: usize, name: &str) -> Result<&Binding, ScriptError> {
        self.bindings
            .get(name)
            .ok_or_else(|| ScriptError::UnboundVariable {
                line,
                name: name.to_string(),
            })
    }

    fn wrong(line: usize, name: &str, expected: &'static str) -> ScriptError {
        ScriptError::WrongBinding {
            line,
            name: name.to_string(),
            expected,
        }
    }

    fn hub(&self, line: usize, name: &str) -> Result<HubId, ScriptError> {
        match self.lookup(line, name)? {
            Binding::Hub(hub) => Ok(*hub),
            _ => Err(Self::wrong(line, name, "hub")),
        }
    }

    fn module(&self, line: usize, name: &str) -> Result<ModuleId, ScriptError> {
        match self.lookup(line, name)? {
            Binding::Module(module) => Ok(*module),
            _ => Err(Self::wrong(line, name, "module")),
        }
    }

    fn token(&self, line: usize, name: &str) -> Result<SpawnToken, ScriptError> {
        match self.lookup(line, name)? {
            Binding::Token(token) => Ok(*token),
            _ => Err(Self::wrong(line, name, "spawn token")),
        }
    }

    fn hub_list(&self, line: usize, name: &str) -> Result<&[HubId], ScriptError> {
        match self.lookup(line, name)? {
            Binding::HubList(hubs) => Ok(hubs),
            _ => Err(Self::wrong(line, name, "hub list")),
        }
    }
}

fn at(line: usize) -> impl Fn(SessionError) -> ControlError {
    move |source| ControlError::Replay { line, source }
}

/// Drives a [`SessionControl`] through a [`Script`]
pub struct ReplayEngine {
    session: Arc<dyn SessionControl>,
}

impl ReplayEngine {
    pub fn new(session: Arc<dyn SessionControl>) -> Self {
        Self { session }
    }

    /// Kill every running module and cancel every spawn still in flight,
    /// then wait once for all kills to settle.
    ///
    /// Returns the number of modules killed.
    pub async fn reset(&self) -> Result<usize> {
        // In-flight ids first: one landing in between then shows up as running
        let mut doomed: BTreeSet<ModuleId> = self.session.spawning().await.into_iter().collect();
        doomed.extend(self.session.running().await);

        try_join_all(doomed.iter().map(|module| self.session.kill(*module))).await?;
        self.session.barrier().await?;

        info!("Workflow cleared, {} modules killed", doomed.len());
        Ok(doomed.len())
    }

    /// Validate, reset the session, then execute.
    ///
    /// A script that fails validation leaves the session untouched.
    pub async fn replay(&self, script: &Script) -> Result<ReplayReport> {
        script.validate()?;
        self.reset().await?;
        self.execute(script).await
    }

    /// Execute statements in order against the current session.
    ///
    /// Stops at the first failing statement; modules created before it stay.
    pub async fn execute(&self, script: &Script) -> Result<ReplayReport> {
        let mut env = Environment::default();
        let mut report = ReplayReport::default();

        for (line, statement) in script.lines() {
            if !statement.is_trivia() {
                debug!("line {}: {}", line, statement);
            }
            self.step(line, statement, &mut env, &mut report).await?;
        }

        info!(
            "Replay finished: {} modules, {} parameters, {} connections",
            report.modules.len(),
            report.parameters,
            report.connections
        );
        Ok(report)
    }

    async fn step(
        &self,
        line: usize,
        statement: &Statement,
        env: &mut Environment,
        report: &mut ReplayReport,
    ) -> Result<()> {
        let session = &self.session;

        match statement {
            Statement::Blank | Statement::Comment(_) => {}
            Statement::PrintInfo(text) => info!("{}", text),
            Statement::MasterHub { var } => {
                env.bind(var, Binding::Hub(session.master_hub().await));
            }
            Statement::Session { var } => {
                env.bind(var, Binding::Module(session.session_id()));
            }
            Statement::SpawnAsync {
                token,
                hub,
                type_name,
            } => {
                let hub = env.hub(line, hub)?;
                let spawned = session.spawn_async(hub, type_name).await.map_err(at(line))?;
                env.bind(token, Binding::Token(spawned));
            }
            Statement::WaitForSpawn { var, token } => {
                let token = env.token(line, token)?;
                let module = session.wait_for_spawn(token).await.map_err(at(line))?;
                env.bind(var, Binding::Module(module));
                report.modules.insert(var.clone(), module);
            }
            Statement::SetParameter {
                module,
                name,
                value,
                delayed,
            } => {
                let module = env.module(line, module)?;
                session
                    .set_parameter(module, name, value.clone(), *delayed)
                    .await
                    .map_err(at(line))?;
                report.parameters += 1;
            }
            Statement::ApplyParameters { module } => {
                let module = env.module(line, module)?;
                session.apply_parameters(module).await.map_err(at(line))?;
            }
            Statement::WaitForHub { var } => {
                let hubs = session.wait_for_hubs(1).await.map_err(at(line))?;
                let Some(&hub) = hubs.first() else {
                    return Err(at(line)(SessionError::HubWaitTimeout {
                        expected: 1,
                        attached: 0,
                    }));
                };
                env.bind(var, Binding::Hub(hub));
                report.slave_hubs = vec![hub];
            }
            Statement::WaitForHubs { var, count } => {
                let mut hubs = session.wait_for_hubs(*count).await.map_err(at(line))?;
                hubs.truncate(*count);
                report.slave_hubs = hubs.clone();
                env.bind(var, Binding::HubList(hubs));
            }
            Statement::SelectHub { var, list, index } => {
                let hub = env
                    .hub_list(line, list)?
                    .get(*index)
                    .copied()
                    .ok_or_else(|| ScriptError::HubIndexOutOfRange {
                        line,
                        name: list.clone(),
                        index: *index,
                    })?;
                env.bind(var, Binding::Hub(hub));
            }
            Statement::Connect {
                from_module,
                from_port,
                to_module,
                to_port,
            } => {
                let from = Endpoint::new(env.module(line, from_module)?, from_port.clone());
                let to = Endpoint::new(env.module(line, to_module)?, to_port.clone());
                session.connect(&from, &to).await.map_err(at(line))?;
                report.connections += 1;
            }
        }

        Ok(())
    }
}
