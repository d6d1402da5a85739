use super::{Script, Statement};
use hubcore::ScriptError;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// What a script will do once replayed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptSummary {
    pub local_spawns: usize,
    pub remote_spawns: usize,
    pub parameter_sets: usize,
    pub connections: usize,
    pub slave_hubs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Hub,
    Module,
    Token,
    HubList(usize),
}

impl Kind {
    fn describe(self) -> &'static str {
        match self {
            Kind::Hub => "hub",
            Kind::Module => "module",
            Kind::Token => "spawn token",
            Kind::HubList(_) => "hub list",
        }
    }
}

#[derive(Default)]
struct Scope {
    bindings: HashMap<String, Kind>,
    masters: HashSet<String>,
}

impl Scope {
    fn bind(&mut self, name: &str, kind: Kind) {
        self.masters.remove(name);
        self.bindings.insert(name.to_string(), kind);
    }

    /// Module and spawn-token names must be fresh, or a later statement
    /// would silently address the wrong module.
    fn bind_fresh(&mut self, line: usize, name: &str, kind: Kind) -> Result<(), ScriptError> {
        if self.bindings.contains_key(name) {
            return Err(ScriptError::AlreadyBound {
                line,
                name: name.to_string(),
            });
        }
        self.bind(name, kind);
        Ok(())
    }

    fn expect(&self, line: usize, name: &str, expected: Kind) -> Result<Kind, ScriptError> {
        let Some(&kind) = self.bindings.get(name) else {
            return Err(ScriptError::UnboundVariable {
                line,
                name: name.to_string(),
            });
        };
        let matches = match (expected, kind) {
            (Kind::HubList(_), Kind::HubList(_)) => true,
            (expected, kind) => expected == kind,
        };
        if !matches {
            return Err(ScriptError::WrongBinding {
                line,
                name: name.to_string(),
                expected: expected.describe(),
            });
        }
        Ok(kind)
    }
}

impl Script {
    /// Check that every variable is bound before use and bound to the right
    /// kind of value, without touching a session.
    pub fn validate(&self) -> Result<ScriptSummary, ScriptError> {
        let mut scope = Scope::default();
        let mut summary = ScriptSummary::default();

        for (line, statement) in self.lines() {
            match statement {
                Statement::Blank | Statement::Comment(_) | Statement::PrintInfo(_) => {}
                Statement::MasterHub { var } => {
                    scope.bind(var, Kind::Hub);
                    scope.masters.insert(var.clone());
                }
                Statement::Session { var } => scope.bind_fresh(line, var, Kind::Module)?,
                Statement::SpawnAsync { token, hub, .. } => {
                    scope.expect(line, hub, Kind::Hub)?;
                    if scope.masters.contains(hub) {
                        summary.local_spawns += 1;
                    } else {
                        summary.remote_spawns += 1;
                    }
                    scope.bind_fresh(line, token, Kind::Token)?;
                }
                Statement::WaitForSpawn { var, token } => {
                    scope.expect(line, token, Kind::Token)?;
                    scope.bind_fresh(line, var, Kind::Module)?;
                }
                Statement::SetParameter { module, .. } => {
                    scope.expect(line, module, Kind::Module)?;
                    summary.parameter_sets += 1;
                }
                Statement::ApplyParameters { module } => {
                    scope.expect(line, module, Kind::Module)?;
                }
                Statement::WaitForHub { var } => {
                    scope.bind(var, Kind::Hub);
                    summary.slave_hubs = summary.slave_hubs.max(1);
                }
                Statement::WaitForHubs { var, count } => {
                    scope.bind(var, Kind::HubList(*count));
                    summary.slave_hubs = summary.slave_hubs.max(*count);
                }
                Statement::SelectHub { var, list, index } => {
                    if let Kind::HubList(count) = scope.expect(line, list, Kind::HubList(0))? {
                        if *index >= count {
                            return Err(ScriptError::HubIndexOutOfRange {
                                line,
                                name: list.clone(),
                                index: *index,
                            });
                        }
                    }
                    scope.bind(var, Kind::Hub);
                }
                Statement::Connect {
                    from_module,
                    to_module,
                    ..
                } => {
                    scope.expect(line, from_module, Kind::Module)?;
                    scope.expect(line, to_module, Kind::Module)?;
                    summary.connections += 1;
                }
            }
        }

        Ok(summary)
    }
}
