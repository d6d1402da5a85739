use crate::naming::{module_var, token_var, Naming, MASTER_HUB_VAR, SESSION_VAR};
use crate::naming::{SINGLE_SLAVE_VAR, SLAVE_LIST_VAR};
use crate::{ModuleSnapshot, Script, Snapshot, Statement};
use hubcore::Connection;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Local,
    Remote,
}

impl Pass {
    fn spawn_comment(self) -> &'static str {
        match self {
            Pass::Local => "spawn all local modules",
            Pass::Remote => "spawn all remote modules",
        }
    }

    fn connection_comment(self) -> &'static str {
        match self {
            Pass::Local => "all local connections",
            Pass::Remote => "connections between local and remote",
        }
    }
}

/// Turns a [`Snapshot`] into a replayable [`Script`].
///
/// Local modules and the connections among them come first, so a replay
/// rebuilds the master's part of the workflow before it blocks on slave
/// hubs. Everything touching a slave hub follows the hub wait.
pub struct Serializer<'a> {
    snapshot: &'a Snapshot,
    naming: Naming,
}

impl<'a> Serializer<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            naming: Naming::new(&snapshot.topology),
        }
    }

    pub fn serialize(&self) -> Script {
        let mut script = Script::new();
        script.push(Statement::MasterHub {
            var: MASTER_HUB_VAR.to_string(),
        });
        script.push(Statement::Session {
            var: SESSION_VAR.to_string(),
        });
        write_parameters(&mut script, &self.snapshot.session);

        self.write_pass(&mut script, Pass::Local);
        if !self.naming.slaves().is_empty() {
            self.write_hub_wait(&mut script);
            self.write_pass(&mut script, Pass::Remote);
        }

        script
    }

    fn write_pass(&self, script: &mut Script, pass: Pass) {
        let topology = &self.snapshot.topology;
        let modules: Vec<(&ModuleSnapshot, &str)> = self
            .snapshot
            .modules
            .iter()
            .filter(|m| (m.hub == topology.master_hub()) == (pass == Pass::Local))
            .filter_map(|m| match self.naming.hub_var(m.hub) {
                Some(hub) => Some((m, hub)),
                None => {
                    warn!("Module {} sits on unnamed hub {}, skipping", m.id, m.hub);
                    None
                }
            })
            .collect();

        script.push(Statement::Blank);
        script.push(Statement::comment(pass.spawn_comment()));
        for (module, hub) in &modules {
            script.push(Statement::SpawnAsync {
                token: token_var(&module_var(module.id, &module.type_name)),
                hub: hub.to_string(),
                type_name: module.type_name.clone(),
            });
        }

        for (module, _) in &modules {
            let var = module_var(module.id, &module.type_name);
            script.push(Statement::Blank);
            script.push(Statement::WaitForSpawn {
                token: token_var(&var),
                var,
            });
            write_parameters(script, module);
        }

        script.push(Statement::Blank);
        script.push(Statement::comment(pass.connection_comment()));
        for connection in &self.snapshot.connections {
            if self.pass_of(connection) != Some(pass) {
                continue;
            }
            if let Some(statement) = self.connect(connection) {
                script.push(statement);
            }
        }
    }

    fn write_hub_wait(&self, script: &mut Script) {
        let slaves = self.naming.slaves();
        script.push(Statement::Blank);
        if slaves.len() == 1 {
            script.push(Statement::PrintInfo(
                "waiting for a slave hub to connect...".to_string(),
            ));
            script.push(Statement::WaitForHub {
                var: SINGLE_SLAVE_VAR.to_string(),
            });
            return;
        }

        script.push(Statement::PrintInfo(format!(
            "waiting for {} slave hubs to connect...",
            slaves.len()
        )));
        script.push(Statement::WaitForHubs {
            var: SLAVE_LIST_VAR.to_string(),
            count: slaves.len(),
        });
        for (index, (_, var)) in slaves.iter().enumerate() {
            script.push(Statement::SelectHub {
                var: var.clone(),
                list: SLAVE_LIST_VAR.to_string(),
                index,
            });
        }
    }

    /// Local when both ends sit on the master hub
    fn pass_of(&self, connection: &Connection) -> Option<Pass> {
        let topology = &self.snapshot.topology;
        match (
            topology.is_local(connection.from.module),
            topology.is_local(connection.to.module),
        ) {
            (Some(true), Some(true)) => Some(Pass::Local),
            (Some(_), Some(_)) => Some(Pass::Remote),
            _ => {
                warn!(
                    "Skipping connection {} -> {}: endpoint not captured",
                    connection.from, connection.to
                );
                None
            }
        }
    }

    fn connect(&self, connection: &Connection) -> Option<Statement> {
        let from = self.snapshot.module(connection.from.module)?;
        let to = self.snapshot.module(connection.to.module)?;
        Some(Statement::Connect {
            from_module: module_var(from.id, &from.type_name),
            from_port: connection.from.name.clone(),
            to_module: module_var(to.id, &to.type_name),
            to_port: connection.to.name.clone(),
        })
    }
}

/// Delayed sets for every non-default parameter, then one commit
fn write_parameters(script: &mut Script, module: &ModuleSnapshot) {
    if module.parameters.is_empty() {
        return;
    }
    let var = module_var(module.id, &module.type_name);
    for (name, value) in &module.parameters {
        script.push(Statement::SetParameter {
            module: var.clone(),
            name: name.clone(),
            value: value.clone(),
            delayed: true,
        });
    }
    script.push(Statement::ApplyParameters { module: var });
}
