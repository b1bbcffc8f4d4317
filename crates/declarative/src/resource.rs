//! Resource trait for declarative state management
//!
//! A [`Resource`] is one addressable entry of a plan: a reconciler plus the
//! prior record loaded from the state file and the desired state from
//! configuration. [`Managed`] is the only implementation most callers need.

use crate::context::ApplyContext;
use crate::diagnostics::Diagnostics;
use crate::diff::ResourceDiff;
use crate::lifecycle;
use crate::reconciler::{LocalState, Reconciler, ResourceData};
use crate::types::{Action, ApplyResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persisted form of a present resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Resource type name
    pub resource_type: String,
    /// Identity as stored by the reconciler
    pub id: String,
    /// Serialized local state
    pub attributes: Value,
}

/// Object-safe view of a planned resource
///
/// `C` is the remote client type shared by every resource in a plan.
pub trait Resource<C: ?Sized>: Send + Sync {
    /// Address of the resource, e.g. `credential.deploy`
    fn address(&self) -> String;

    /// Resource type category, used for grouping and filtering
    fn resource_type(&self) -> &'static str;

    /// Configuration name of this resource
    fn name(&self) -> &str;

    /// Refresh the prior record from remote state
    fn refresh(&mut self, ctx: &ApplyContext<'_, C>) -> Diagnostics;

    /// What applying this resource would do right now
    fn planned_action(&self) -> Action;

    /// Attribute-level diff for display, `None` when nothing changes
    fn diff(&self) -> Option<ResourceDiff>;

    /// Converge remote state toward the desired state
    fn apply(&mut self, ctx: &ApplyContext<'_, C>) -> (ApplyResult, Diagnostics);

    /// Adopt an existing remote object under this address
    fn import(&mut self, ctx: &ApplyContext<'_, C>, id: &str) -> Diagnostics;

    /// Persisted form, `None` while absent
    fn snapshot(&self) -> serde_json::Result<Option<Snapshot>>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource<C> = Box<dyn Resource<C>>;

/// A resource driven by a [`Reconciler`]
pub struct Managed<R: Reconciler> {
    reconciler: R,
    name: String,
    data: ResourceData<R::State>,
    desired: Option<R::State>,
}

impl<R: Reconciler> Managed<R> {
    /// A resource with no prior record and no desired state
    pub fn new(reconciler: R, name: impl Into<String>) -> Self {
        Self {
            reconciler,
            name: name.into(),
            data: ResourceData::new(),
            desired: None,
        }
    }

    /// Set the prior record, usually loaded from the state file
    pub fn with_prior(mut self, id: impl Into<String>, state: R::State) -> Self {
        self.data = ResourceData::present(id, state);
        self
    }

    /// Set the prior record from a persisted snapshot
    pub fn with_snapshot(self, snapshot: &Snapshot) -> serde_json::Result<Self> {
        let state: R::State = serde_json::from_value(snapshot.attributes.clone())?;
        Ok(self.with_prior(snapshot.id.clone(), state))
    }

    /// Set the desired state; without one the resource is planned for deletion
    pub fn with_desired(mut self, desired: R::State) -> Self {
        self.desired = Some(desired);
        self
    }

    /// The local record
    pub fn data(&self) -> &ResourceData<R::State> {
        &self.data
    }

    /// Desired state with server-computed fields carried over from the record
    fn effective_desired(&self) -> Option<R::State> {
        self.desired.as_ref().map(|desired| {
            let mut effective = desired.clone();
            if self.data.is_present() {
                effective.carry_computed(self.data.state());
            }
            effective
        })
    }

    fn replace(&mut self, ctx: &ApplyContext<'_, R::Client>, desired: &R::State) -> Diagnostics {
        let diags = lifecycle::delete(&self.reconciler, ctx, &mut self.data);
        if diags.has_errors() {
            return diags;
        }
        let mut all = diags;
        all.extend(lifecycle::create(&self.reconciler, ctx, &mut self.data, desired));
        all
    }
}

fn to_value<S: LocalState>(state: &S) -> Option<Value> {
    serde_json::to_value(state).ok()
}

impl<R: Reconciler> Resource<R::Client> for Managed<R> {
    fn address(&self) -> String {
        format!("{}.{}", self.reconciler.type_name(), self.name)
    }

    fn resource_type(&self) -> &'static str {
        self.reconciler.type_name()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn refresh(&mut self, ctx: &ApplyContext<'_, R::Client>) -> Diagnostics {
        lifecycle::read(&self.reconciler, ctx, &mut self.data)
    }

    fn planned_action(&self) -> Action {
        match (self.effective_desired(), self.data.is_present()) {
            (None, false) => Action::NoOp,
            (None, true) => Action::Delete,
            (Some(_), false) => Action::Create,
            (Some(desired), true) => {
                let current = self.data.state();
                if desired == *current {
                    Action::NoOp
                } else if self.reconciler.force_new(current, &desired) {
                    Action::Replace
                } else {
                    Action::Update
                }
            }
        }
    }

    fn diff(&self) -> Option<ResourceDiff> {
        let action = self.planned_action();
        if !action.is_change() {
            return None;
        }
        let before = if self.data.is_present() {
            to_value(self.data.state())
        } else {
            None
        };
        let after = match action {
            Action::Delete => None,
            _ => self.effective_desired().as_ref().and_then(to_value),
        };
        Some(ResourceDiff {
            address: self.address(),
            resource_type: self.resource_type().to_string(),
            action,
            before,
            after,
        })
    }

    fn apply(&mut self, ctx: &ApplyContext<'_, R::Client>) -> (ApplyResult, Diagnostics) {
        let action = self.planned_action();
        if ctx.dry_run && action.is_change() {
            return (
                ApplyResult::Skipped {
                    reason: format!("dry run: would {action}"),
                },
                Diagnostics::new(),
            );
        }

        let desired = self.desired.clone();
        let (diags, success) = match (action, desired) {
            (Action::NoOp, _) => return (ApplyResult::NoChange, Diagnostics::new()),
            (Action::Create, Some(desired)) => (
                lifecycle::create(&self.reconciler, ctx, &mut self.data, &desired),
                ApplyResult::Created,
            ),
            (Action::Update, Some(desired)) => (
                lifecycle::update(&self.reconciler, ctx, &mut self.data, &desired),
                ApplyResult::Updated,
            ),
            (Action::Replace, Some(desired)) => (self.replace(ctx, &desired), ApplyResult::Replaced),
            (Action::Delete, _) => (
                lifecycle::delete(&self.reconciler, ctx, &mut self.data),
                ApplyResult::Removed,
            ),
            (_, None) => return (ApplyResult::NoChange, Diagnostics::new()),
        };

        match diags.first_error() {
            Some(first) => (
                ApplyResult::Failed {
                    error: first.to_string(),
                },
                diags,
            ),
            None => (success, diags),
        }
    }

    fn import(&mut self, ctx: &ApplyContext<'_, R::Client>, id: &str) -> Diagnostics {
        match lifecycle::import(&self.reconciler, ctx, id) {
            Ok(data) => {
                self.data = data;
                Diagnostics::new()
            }
            Err(diags) => diags,
        }
    }

    fn snapshot(&self) -> serde_json::Result<Option<Snapshot>> {
        let Some(id) = self.data.id() else {
            return Ok(None);
        };
        Ok(Some(Snapshot {
            resource_type: self.resource_type().to_string(),
            id: id.to_string(),
            attributes: serde_json::to_value(self.data.state())?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::tests::{NoteStore, Notes, note};

    #[test]
    fn test_planned_actions() {
        let fresh = Managed::new(Notes, "a").with_desired(note("x", "g"));
        assert_eq!(fresh.planned_action(), Action::Create);

        let unchanged = Managed::new(Notes, "a")
            .with_prior("1", note("x", "g"))
            .with_desired(note("x", "g"));
        assert_eq!(unchanged.planned_action(), Action::NoOp);

        let edited = Managed::new(Notes, "a")
            .with_prior("1", note("x", "g"))
            .with_desired(note("y", "g"));
        assert_eq!(edited.planned_action(), Action::Update);

        let moved = Managed::new(Notes, "a")
            .with_prior("1", note("x", "g"))
            .with_desired(note("x", "h"));
        assert_eq!(moved.planned_action(), Action::Replace);

        let orphan = Managed::new(Notes, "a").with_prior("1", note("x", "g"));
        assert_eq!(orphan.planned_action(), Action::Delete);

        let nothing = Managed::new(Notes, "a");
        assert_eq!(nothing.planned_action(), Action::NoOp);
    }

    #[test]
    fn test_computed_fields_are_not_drift() {
        let mut prior = note("x", "g");
        prior.revision = 7;
        let resource = Managed::new(Notes, "a")
            .with_prior("1", prior)
            .with_desired(note("x", "g"));
        assert_eq!(resource.planned_action(), Action::NoOp);
        assert!(resource.diff().is_none());
    }

    #[test]
    fn test_apply_create_and_snapshot() {
        let store = NoteStore::default();
        let ctx = ApplyContext::new(&store);
        let mut resource = Managed::new(Notes, "greeting").with_desired(note("hi", "g"));

        let (result, diags) = resource.apply(&ctx);
        assert_eq!(result, ApplyResult::Created);
        assert!(diags.is_empty());

        let snapshot = resource.snapshot().unwrap().unwrap();
        assert_eq!(snapshot.id, "1");
        assert_eq!(snapshot.resource_type, "note");
        assert_eq!(snapshot.attributes["text"], "hi");
        assert_eq!(resource.address(), "note.greeting");

        let restored = Managed::new(Notes, "greeting")
            .with_snapshot(&snapshot)
            .unwrap()
            .with_desired(note("hi", "g"));
        assert_eq!(restored.planned_action(), Action::NoOp);
    }

    #[test]
    fn test_apply_replace_recreates() {
        let store = NoteStore::default();
        let ctx = ApplyContext::new(&store);
        let mut resource = Managed::new(Notes, "a").with_desired(note("x", "g"));
        resource.apply(&ctx);

        let mut moved = Managed::new(Notes, "a")
            .with_prior("1", resource.data().state().clone())
            .with_desired(note("x", "h"));
        let (result, _) = moved.apply(&ctx);
        assert_eq!(result, ApplyResult::Replaced);
        assert_eq!(moved.data().id(), Some("2"));
        assert!(!store.notes.lock().unwrap().contains_key("1"));
    }

    #[test]
    fn test_apply_failure_reports_first_error() {
        let store = NoteStore::default();
        store.reject_writes();
        let ctx = ApplyContext::new(&store);
        let mut resource = Managed::new(Notes, "a").with_desired(note("x", "g"));

        let (result, diags) = resource.apply(&ctx);
        assert!(matches!(result, ApplyResult::Failed { ref error } if error.contains("Rejected")));
        assert!(diags.has_errors());
        assert!(resource.snapshot().unwrap().is_none());
    }

    #[test]
    fn test_dry_run_skips_changes() {
        let store = NoteStore::default();
        let ctx = ApplyContext::new(&store).dry_run(true);
        let mut resource = Managed::new(Notes, "a").with_desired(note("x", "g"));

        let (result, _) = resource.apply(&ctx);
        assert!(matches!(result, ApplyResult::Skipped { .. }));
        assert!(store.notes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_diff_carries_before_and_after() {
        let resource = Managed::new(Notes, "a")
            .with_prior("1", note("x", "g"))
            .with_desired(note("y", "g"));
        let diff = resource.diff().unwrap();
        assert_eq!(diff.action, Action::Update);
        assert_eq!(diff.before.unwrap()["text"], "x");
        assert_eq!(diff.after.unwrap()["text"], "y");
    }
}
