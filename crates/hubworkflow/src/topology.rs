use hubcore::{is_module, HubId, HubRole, ModuleId, SessionError};
use hubsession::SessionControl;
use serde::Serialize;
use std::collections::BTreeMap;

/// Point-in-time view of the hubs and of which hub hosts which module
#[derive(Debug, Clone, Serialize)]
pub struct TopologyRegistry {
    master: HubId,
    hubs: BTreeMap<HubId, HubRole>,
    placement: BTreeMap<ModuleId, HubId>,
}

impl TopologyRegistry {
    pub fn new(master: HubId) -> Self {
        let mut hubs = BTreeMap::new();
        hubs.insert(master, HubRole::Master);
        Self {
            master,
            hubs,
            placement: BTreeMap::new(),
        }
    }

    /// Mirror the session's hubs and the placement of `modules`.
    ///
    /// A module that disappears while the view is taken is left out.
    pub async fn capture(
        session: &dyn SessionControl,
        modules: &[ModuleId],
    ) -> Result<Self, SessionError> {
        let mut topology = Self::new(session.master_hub().await);
        for hub in session.all_hubs().await {
            topology.add_hub(hub);
        }
        topology.place(session.session_id(), topology.master);

        for &module in modules {
            match session.hub_of(module).await {
                Ok(hub) => topology.place(module, hub),
                Err(SessionError::UnknownModule(_)) => {
                    tracing::warn!("Module {} vanished before capture, skipping", module);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(topology)
    }

    pub fn add_hub(&mut self, hub: HubId) {
        let role = if hub == self.master {
            HubRole::Master
        } else {
            HubRole::Slave
        };
        self.hubs.insert(hub, role);
    }

    pub fn place(&mut self, module: ModuleId, hub: HubId) {
        if !self.hubs.contains_key(&hub) {
            self.add_hub(hub);
        }
        self.placement.insert(module, hub);
    }

    /// Drop a module that turned out to be gone; its hub stays known
    pub fn forget(&mut self, module: ModuleId) {
        self.placement.remove(&module);
    }

    pub fn hub_of(&self, module: ModuleId) -> Option<HubId> {
        self.placement.get(&module).copied()
    }

    pub fn role(&self, hub: HubId) -> Option<HubRole> {
        self.hubs.get(&hub).copied()
    }

    pub fn master_hub(&self) -> HubId {
        self.master
    }

    pub fn all_hubs(&self) -> Vec<HubId> {
        self.hubs.keys().copied().collect()
    }

    /// Placed modules, ascending by id
    pub fn modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.placement.keys().copied().filter(|id| is_module(*id))
    }

    pub fn is_local(&self, module: ModuleId) -> Option<bool> {
        self.hub_of(module).map(|hub| hub == self.master)
    }

    /// Slave hubs hosting at least one placed module.
    ///
    /// Slave ids are handed out downwards from the master's, so descending
    /// id order is attach order.
    pub fn slave_hubs(&self) -> Vec<HubId> {
        let mut slaves: Vec<HubId> = self
            .placement
            .iter()
            .filter(|(module, _)| is_module(**module))
            .map(|(_, hub)| *hub)
            .filter(|hub| *hub != self.master)
            .collect();
        slaves.sort_unstable_by(|a, b| b.cmp(a));
        slaves.dedup();
        slaves
    }
}
