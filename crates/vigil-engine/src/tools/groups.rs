//! Problem-group ownership.
//!
//! Built once per run from the tool set. The first tool to claim a group
//! owns it; later claims are ignored.

use vigil_core::types::FxHashMap;

use super::descriptor::ToolId;

#[derive(Debug, Clone, Default)]
pub struct GroupRegistry {
    owners: FxHashMap<String, ToolId>,
}

impl GroupRegistry {
    /// Claim `group` for `tool`. Returns false if another tool owns it.
    pub fn register(&mut self, group: impl Into<String>, tool: &ToolId) -> bool {
        let group = group.into();
        match self.owners.get(&group) {
            Some(owner) if owner == tool => true,
            Some(owner) => {
                tracing::debug!(group = %group, owner = %owner, claimant = %tool, "group already owned");
                false
            }
            None => {
                self.owners.insert(group, tool.clone());
                true
            }
        }
    }

    pub fn owner(&self, group: &str) -> Option<&ToolId> {
        self.owners.get(group)
    }

    /// The tool whose presentation receives a record with `group` reported
    /// by `origin`.
    pub fn resolve<'a>(&'a self, group: Option<&str>, origin: &'a ToolId) -> &'a ToolId {
        group.and_then(|g| self.owner(g)).unwrap_or(origin)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registrant_wins() {
        let mut groups = GroupRegistry::default();
        let a = ToolId::from("a");
        let b = ToolId::from("b");
        assert!(groups.register("shared", &a));
        assert!(!groups.register("shared", &b));
        assert!(groups.register("shared", &a));
        assert_eq!(groups.owner("shared"), Some(&a));
    }

    #[test]
    fn unowned_group_falls_back_to_origin() {
        let groups = GroupRegistry::default();
        let origin = ToolId::from("origin");
        assert_eq!(groups.resolve(Some("nobody"), &origin), &origin);
        assert_eq!(groups.resolve(None, &origin), &origin);
    }
}
