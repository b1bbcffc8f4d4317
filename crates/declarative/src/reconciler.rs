//! Reconciler trait and the local record it operates on
//!
//! A [`Reconciler`] knows how to move one kind of remote object between
//! Absent and Present. It never touches [`ResourceData`] directly; the
//! [`lifecycle`](crate::lifecycle) functions commit identity and state only
//! after an operation succeeds.

use crate::context::ApplyContext;
use crate::diagnostics::Diagnose;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// Typed local state of one resource kind
pub trait LocalState:
    Clone + PartialEq + Default + fmt::Debug + Serialize + DeserializeOwned + Send + Sync
{
    /// Copy server-computed attributes from `observed` into `self`
    ///
    /// Called on the desired state before comparing it with the refreshed
    /// state, so computed fields never show up as drift.
    fn carry_computed(&mut self, _observed: &Self) {}

    /// Blank the attributes that describe the remote object
    ///
    /// Called when the object is found gone or has been deleted.
    fn vacate(&mut self) {
        *self = Self::default();
    }
}

/// Result of reading remote state
#[derive(Debug, Clone, PartialEq)]
pub enum Observed<S> {
    /// The object exists; this is its current state
    Present(S),
    /// The object no longer exists
    Absent,
}

/// Local record of a resource: identity plus attributes
///
/// `id` is `None` while the resource is Absent. It only changes through
/// [`mark_present`](Self::mark_present) and [`mark_absent`](Self::mark_absent).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData<S> {
    id: Option<String>,
    state: S,
}

impl<S: LocalState> ResourceData<S> {
    /// An absent record
    pub fn new() -> Self {
        Self::default()
    }

    /// A present record with a known identity
    pub fn present(id: impl Into<String>, state: S) -> Self {
        Self {
            id: Some(id.into()),
            state,
        }
    }

    /// Identity, if the resource is Present
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn is_present(&self) -> bool {
        self.id.is_some()
    }

    /// Transition to Present with the given identity and state
    pub fn mark_present(&mut self, id: impl Into<String>, state: S) {
        self.id = Some(id.into());
        self.state = state;
    }

    /// Replace the attributes of a Present record
    pub fn refresh(&mut self, state: S) {
        self.state = state;
    }

    /// Transition to Absent: identity cleared, remote attributes blanked
    pub fn mark_absent(&mut self) {
        self.id = None;
        self.state.vacate();
    }
}

/// Per-resource-kind CRUD logic against a remote API
///
/// Every operation is synchronous. Errors are returned as-is and converted
/// to diagnostics by the lifecycle functions.
pub trait Reconciler: Send + Sync {
    /// Local state of this resource kind
    type State: LocalState;
    /// Remote API client handed in through [`ApplyContext`]
    type Client: ?Sized + Sync;
    /// Error type of every operation
    type Error: Diagnose + Send + Sync + 'static;

    /// Resource type name, e.g. `"credential"` or `"data.credential"`
    fn type_name(&self) -> &'static str;

    /// Create the remote object; returns its identity and refreshed state
    fn create(
        &self,
        ctx: &ApplyContext<'_, Self::Client>,
        desired: &Self::State,
    ) -> Result<(String, Self::State), Self::Error>;

    /// Read the remote object behind `id`
    fn read(
        &self,
        ctx: &ApplyContext<'_, Self::Client>,
        id: &str,
        current: &Self::State,
    ) -> Result<Observed<Self::State>, Self::Error>;

    /// Update mutable attributes in place; returns the refreshed state
    fn update(
        &self,
        ctx: &ApplyContext<'_, Self::Client>,
        id: &str,
        current: &Self::State,
        desired: &Self::State,
    ) -> Result<Self::State, Self::Error>;

    /// Delete the remote object
    fn delete(
        &self,
        ctx: &ApplyContext<'_, Self::Client>,
        id: &str,
        current: &Self::State,
    ) -> Result<(), Self::Error>;

    /// Seed local state from an externally supplied identity
    fn import(&self, id: &str) -> Result<Self::State, Self::Error>;

    /// Whether moving from `old` to `new` requires destroy-then-create
    fn force_new(&self, _old: &Self::State, _new: &Self::State) -> bool {
        false
    }
}
