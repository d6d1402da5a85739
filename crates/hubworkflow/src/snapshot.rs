use crate::{Naming, TopologyRegistry};
use hubcore::{
    is_module, Connection, ConnectionKind, Endpoint, HubId, ModuleId, ParamValue, SessionError,
};
use hubsession::SessionControl;
use petgraph::algo::is_isomorphic_matching;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

/// One module as captured: identity, placement and non-default parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSnapshot {
    pub id: ModuleId,
    pub type_name: String,
    pub hub: HubId,
    /// Parameters that differ from their default, in declaration order
    pub parameters: Vec<(String, ParamValue)>,
}

/// Point-in-time copy of a running workflow
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub topology: TopologyRegistry,
    pub session: ModuleSnapshot,
    /// Captured modules, ascending by id
    pub modules: Vec<ModuleSnapshot>,
    /// Every connection once, in discovery order
    pub connections: Vec<Connection>,
}

/// Node weight used for structural comparison
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLabel {
    pub type_name: String,
    pub hub: String,
    pub parameters: Vec<(String, ParamValue)>,
}

/// Edge weight used for structural comparison
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EdgeLabel {
    pub kind: ConnectionKind,
    pub from: String,
    pub to: String,
}

impl Snapshot {
    /// Capture `modules` together with the session pseudo-module.
    ///
    /// Ids are sorted and deduplicated first. Modules that vanish while the
    /// capture runs are skipped, as are connections to modules outside the
    /// captured set.
    pub async fn capture(
        session: &dyn SessionControl,
        modules: &[ModuleId],
    ) -> Result<Self, SessionError> {
        let mut ids: Vec<ModuleId> = modules.iter().copied().filter(|id| is_module(*id)).collect();
        ids.sort_unstable();
        ids.dedup();

        let mut topology = TopologyRegistry::capture(session, &ids).await?;
        let session_id = session.session_id();
        let session_snapshot = capture_module(session, session_id, topology.master_hub()).await?;

        let mut captured = Vec::new();
        let placed: Vec<ModuleId> = topology.modules().collect();
        for id in placed {
            let Some(hub) = topology.hub_of(id) else {
                continue;
            };
            match skip_vanished(id, capture_module(session, id, hub).await)? {
                Some(module) => captured.push(module),
                // A vanished module no longer pins its hub in the slave list
                None => topology.forget(id),
            }
        }

        let present: BTreeSet<ModuleId> = std::iter::once(session_id)
            .chain(captured.iter().map(|m| m.id))
            .collect();
        let connections = capture_connections(session, &present).await?;

        debug!(
            "Captured {} modules and {} connections",
            captured.len(),
            connections.len()
        );

        Ok(Self {
            topology,
            session: session_snapshot,
            modules: captured,
            connections,
        })
    }

    pub fn module(&self, id: ModuleId) -> Option<&ModuleSnapshot> {
        if id == self.session.id {
            return Some(&self.session);
        }
        self.modules
            .binary_search_by_key(&id, |m| m.id)
            .ok()
            .map(|index| &self.modules[index])
    }

    /// Graph of the workflow with ids replaced by structural labels
    pub fn to_graph(&self) -> DiGraph<NodeLabel, Vec<EdgeLabel>> {
        let naming = Naming::new(&self.topology);
        let mut graph = DiGraph::new();
        let mut index = BTreeMap::new();

        for module in std::iter::once(&self.session).chain(self.modules.iter()) {
            let node = graph.add_node(NodeLabel {
                type_name: module.type_name.clone(),
                hub: naming.hub_var(module.hub).unwrap_or_default().to_string(),
                parameters: module.parameters.clone(),
            });
            index.insert(module.id, node);
        }

        // Parallel edges are folded into one so labels compare as a set
        let mut edges: BTreeMap<(NodeIndex, NodeIndex), Vec<EdgeLabel>> = BTreeMap::new();
        for connection in &self.connections {
            let (Some(&from), Some(&to)) = (
                index.get(&connection.from.module),
                index.get(&connection.to.module),
            ) else {
                continue;
            };
            edges.entry((from, to)).or_default().push(EdgeLabel {
                kind: connection.kind,
                from: connection.from.name.clone(),
                to: connection.to.name.clone(),
            });
            if connection.kind == ConnectionKind::Parameter {
                edges.entry((to, from)).or_default().push(EdgeLabel {
                    kind: connection.kind,
                    from: connection.to.name.clone(),
                    to: connection.from.name.clone(),
                });
            }
        }

        for ((from, to), mut labels) in edges {
            labels.sort();
            graph.add_edge(from, to, labels);
        }

        graph
    }

    /// Same module types, hub roles, parameters and connections up to a
    /// renumbering of module ids
    pub fn is_isomorphic(&self, other: &Snapshot) -> bool {
        let ours = self.to_graph();
        let theirs = other.to_graph();
        is_isomorphic_matching(&ours, &theirs, |a, b| a == b, |a, b| a == b)
    }
}

/// Running modules with hub and type, then every connection
impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let naming = Naming::new(&self.topology);

        writeln!(f, "Running modules:")?;
        for module in &self.modules {
            writeln!(
                f,
                "  {:>4}  {:<16} on {} ({})",
                module.id,
                module.type_name,
                naming.hub_var(module.hub).unwrap_or("?"),
                module.hub
            )?;
        }

        writeln!(f, "Connections:")?;
        for connection in &self.connections {
            let arrow = match connection.kind {
                ConnectionKind::Port => "->",
                ConnectionKind::Parameter => "<->",
            };
            writeln!(f, "  {} {} {}", connection.from, arrow, connection.to)?;
        }
        Ok(())
    }
}

async fn capture_module(
    session: &dyn SessionControl,
    id: ModuleId,
    hub: HubId,
) -> Result<ModuleSnapshot, SessionError> {
    let type_name = session.module_type(id).await?;

    let mut parameters = Vec::new();
    for name in session.parameters(id).await? {
        if session.is_parameter_default(id, &name).await? {
            continue;
        }
        let value = session.parameter(id, &name).await?;
        parameters.push((name, value));
    }

    Ok(ModuleSnapshot {
        id,
        type_name,
        hub,
        parameters,
    })
}

/// Walk output ports, then parameters, of every present module.
///
/// Both ends of a connection report it, so keys already seen are dropped.
async fn capture_connections(
    session: &dyn SessionControl,
    present: &BTreeSet<ModuleId>,
) -> Result<Vec<Connection>, SessionError> {
    let mut seen = BTreeSet::new();
    let mut connections = Vec::new();

    for &module in present {
        let Some(outputs) = skip_vanished(module, session.output_ports(module).await)? else {
            continue;
        };
        let Some(parameters) = skip_vanished(module, session.parameters(module).await)? else {
            continue;
        };

        let endpoints = outputs
            .into_iter()
            .map(|name| (name, ConnectionKind::Port))
            .chain(parameters.into_iter().map(|name| (name, ConnectionKind::Parameter)));

        for (name, kind) in endpoints {
            let Some(peers) = skip_vanished(module, session.connections(module, &name).await)?
            else {
                break;
            };
            for peer in peers {
                if !present.contains(&peer.module) {
                    warn!(
                        "Skipping connection {}:{} -> {}: peer is not part of the capture",
                        module, name, peer
                    );
                    continue;
                }
                let connection = Connection::new(Endpoint::new(module, name.clone()), peer, kind);
                if seen.insert(connection.key()) {
                    connections.push(connection);
                }
            }
        }
    }

    Ok(connections)
}

fn skip_vanished<T>(
    module: ModuleId,
    result: Result<T, SessionError>,
) -> Result<Option<T>, SessionError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(SessionError::UnknownModule(id)) if id == module => {
            warn!("Module {} vanished during capture, skipping", module);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
