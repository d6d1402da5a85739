use crate::TopologyRegistry;
use hubcore::{HubId, ModuleId, SESSION};

pub const MASTER_HUB_VAR: &str = "MasterHub";
pub const SESSION_VAR: &str = "VistleSession";
pub const SINGLE_SLAVE_VAR: &str = "SlaveHub";
pub const SLAVE_LIST_VAR: &str = "slavehubs";

/// Script variable naming a module.
///
/// The id always forms the whole trailing digit run, so distinct ids never
/// share a name: a type ending in a digit or `_` is split from the id by `_`.
pub fn module_var(id: ModuleId, type_name: &str) -> String {
    if id == SESSION {
        return SESSION_VAR.to_string();
    }
    if id < 0 {
        return format!("v{}", id.unsigned_abs());
    }

    let type_name: String = type_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    match type_name.chars().last() {
        Some(c) if c.is_ascii_digit() || c == '_' => format!("m{}_{}", type_name, id),
        _ => format!("m{}{}", type_name, id),
    }
}

/// Script variable holding the spawn token of `module_var`
pub fn token_var(module_var: &str) -> String {
    format!("u{}", module_var)
}

/// Hub variable names for one serialization
#[derive(Debug, Clone)]
pub struct Naming {
    master: HubId,
    /// Slave hubs in attach order with their variable names
    slaves: Vec<(HubId, String)>,
}

impl Naming {
    pub fn new(topology: &TopologyRegistry) -> Self {
        let hubs = topology.slave_hubs();
        let single = hubs.len() == 1;
        let slaves = hubs
            .into_iter()
            .enumerate()
            .map(|(index, hub)| {
                let var = if single {
                    SINGLE_SLAVE_VAR.to_string()
                } else {
                    format!("Slave{}", index)
                };
                (hub, var)
            })
            .collect();

        Self {
            master: topology.master_hub(),
            slaves,
        }
    }

    pub fn hub_var(&self, hub: HubId) -> Option<&str> {
        if hub == self.master {
            return Some(MASTER_HUB_VAR);
        }
        self.slaves
            .iter()
            .find(|(id, _)| *id == hub)
            .map(|(_, var)| var.as_str())
    }

    pub fn slaves(&self) -> &[(HubId, String)] {
        &self.slaves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_var_keeps_ids_apart() {
        assert_eq!(module_var(1, "Reader"), "mReader1");
        assert_eq!(module_var(2, "A1"), "mA1_2");
        assert_eq!(module_var(12, "A"), "mA12");
        assert_eq!(module_var(12, "A1_"), "mA1__12");
        assert_eq!(module_var(3, "Iso-Surface"), "mIso_Surface3");
        assert_eq!(module_var(4, "Color 2"), "mColor_2_4");
        assert_eq!(module_var(SESSION, "Session"), SESSION_VAR);
        assert_eq!(module_var(-9, "Hub"), "v9");
    }

    #[test]
    fn test_module_var_is_unique_per_id() {
        let types = ["A", "A1", "A12", "A_", "A_1", "1", ""];
        let mut seen = std::collections::HashMap::new();
        for id in 1..=40 {
            for type_name in types {
                let var = module_var(id, type_name);
                if let Some(previous) = seen.insert(var.clone(), id) {
                    assert_eq!(previous, id, "{} names both {} and {}", var, previous, id);
                }
            }
        }
    }

    #[test]
    fn test_token_var() {
        assert_eq!(token_var("mReader1"), "umReader1");
    }
}
