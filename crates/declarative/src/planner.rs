//! Execution planner - holds the resources of one run

use crate::diff::{ResourceDiff, compute_diffs};
use crate::resource::{BoxedResource, Resource};

/// An execution plan over resources sharing one client type
pub struct ExecutionPlan<C: ?Sized> {
    /// Resources in configuration order
    pub resources: Vec<BoxedResource<C>>,
}

impl<C: ?Sized> ExecutionPlan<C> {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
        }
    }

    /// Add a resource to the plan
    pub fn push(&mut self, resource: BoxedResource<C>) {
        self.resources.push(resource);
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource<C>) -> bool,
    {
        Self {
            resources: self
                .resources
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type", "type.name", "data.type" or "data.type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|r| matches_filter(r, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// Find a resource by address
    pub fn find_mut(&mut self, address: &str) -> Option<&mut BoxedResource<C>> {
        self.resources.iter_mut().find(|r| r.address() == address)
    }

    /// Diffs of every resource with a pending change
    pub fn diffs(&self) -> Vec<ResourceDiff> {
        compute_diffs(&self.resources)
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.resources.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl<C: ?Sized> Default for ExecutionPlan<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let (prefix, rest) = match target.strip_prefix("data.") {
        Some(rest) => ("data.", rest),
        None => ("", target),
    };
    let parts: Vec<&str> = rest.split('.').collect();
    match parts.len() {
        1 => (Some(format!("{prefix}{}", parts[0])), None),
        2 => (
            Some(format!("{prefix}{}", parts[0])),
            Some(parts[1].to_string()),
        ),
        _ => (None, Some(target.to_string())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter<C: ?Sized>(
    resource: &dyn Resource<C>,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(rt) = resource_type {
        // Allow common aliases
        let matches_type = match rt {
            "data" => resource.resource_type().starts_with("data."),
            "credentials" => resource.resource_type() == "credential",
            "surveys" => resource.resource_type() == "survey",
            _ => resource.resource_type() == rt,
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && resource.name() != n
    {
        return false;
    }

    true
}
