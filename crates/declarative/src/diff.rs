//! Diff computation for resources

use crate::resource::Resource;
use crate::types::Action;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A planned change to one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Resource address, e.g. `survey.deploy`
    pub address: String,
    /// Type of the resource
    pub resource_type: String,
    /// What will happen
    pub action: Action,
    /// Current attributes, `None` when absent
    pub before: Option<Value>,
    /// Desired attributes, `None` when being deleted
    pub after: Option<Value>,
}

impl ResourceDiff {
    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        self.action == Action::Create
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        self.action == Action::Delete
    }

    /// Check if this diff represents a modification
    pub fn is_modification(&self) -> bool {
        self.action == Action::Update
    }

    /// Check if this diff destroys and recreates the resource
    pub fn is_replacement(&self) -> bool {
        self.action == Action::Replace
    }

    /// Top-level attribute names whose values differ
    pub fn changed_attributes(&self) -> Vec<String> {
        let empty = serde_json::Map::new();
        let before = self.before.as_ref().and_then(Value::as_object).unwrap_or(&empty);
        let after = self.after.as_ref().and_then(Value::as_object).unwrap_or(&empty);

        let mut keys: Vec<String> = before
            .keys()
            .chain(after.keys())
            .filter(|k| before.get(*k) != after.get(*k))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

/// Compute diffs for a list of resources
///
/// Returns only resources whose planned action is a change.
pub fn compute_diffs<C: ?Sized>(resources: &[Box<dyn Resource<C>>]) -> Vec<ResourceDiff> {
    resources.iter().filter_map(|r| r.diff()).collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify in place
    pub modifications: usize,
    /// Number of resources to destroy and recreate
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::Create => summary.additions += 1,
                Action::Delete => summary.removals += 1,
                Action::Update => summary.modifications += 1,
                Action::Replace => summary.replacements += 1,
                Action::NoOp => {}
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications + self.replacements
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diff(resource_type: &str, action: Action, before: Option<Value>, after: Option<Value>) -> ResourceDiff {
        ResourceDiff {
            address: format!("{resource_type}.x"),
            resource_type: resource_type.to_string(),
            action,
            before,
            after,
        }
    }

    #[test]
    fn test_changed_attributes() {
        let d = diff(
            "credential",
            Action::Update,
            Some(json!({"name": "a", "kind": "ssh", "old": 1})),
            Some(json!({"name": "b", "kind": "ssh", "new": 2})),
        );
        assert_eq!(d.changed_attributes(), vec!["name", "new", "old"]);

        let created = diff("credential", Action::Create, None, Some(json!({"name": "a"})));
        assert_eq!(created.changed_attributes(), vec!["name"]);
    }

    #[test]
    fn test_summary_and_grouping() {
        let diffs = vec![
            diff("credential", Action::Create, None, None),
            diff("credential", Action::Replace, None, None),
            diff("survey", Action::Update, None, None),
            diff("survey", Action::Delete, None, None),
        ];
        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.replacements, 1);
        assert_eq!(summary.modifications, 1);
        assert_eq!(summary.removals, 1);
        assert_eq!(summary.total(), 4);

        let groups = group_by_type(&diffs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["survey"].len(), 2);
    }
}
