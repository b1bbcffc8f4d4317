//! # Declarative
//!
//! A framework for reconciling declared state with a remote API.
//!
//! This crate provides the core abstractions for declaring desired state,
//! reading current remote state, and converging the two.
//!
//! ## Core Concepts
//!
//! - **Reconciler**: CRUD logic for one resource kind against a remote client
//! - **ResourceData**: Local record (identity + attributes) with explicit
//!   Present/Absent transitions
//! - **Lifecycle**: Runs one operation and commits identity only on success
//! - **Managed**: A reconciler bound to a name, a prior record and a desired state
//! - **ExecutionPlan / Executor**: Refresh, diff and apply many resources,
//!   optionally in parallel
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecuteOptions, ExecutionPlan, Managed, execute_simple, refresh};
//!
//! let mut plan = ExecutionPlan::new();
//! plan.push(Box::new(
//!     Managed::new(CredentialReconciler, "deploy").with_desired(desired),
//! ));
//!
//! refresh(&mut plan, &client, 4)?;
//! let report = execute_simple(&mut plan, &client, &ExecuteOptions::default())?;
//! println!("{} change(s)", report.summary.total_changes());
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on a
//! specific UI framework.

pub mod context;
pub mod diagnostics;
pub mod diff;
pub mod executor;
pub mod lifecycle;
pub mod planner;
pub mod reconciler;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diagnostics::{Diagnose, Diagnostic, Diagnostics, Severity};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs, group_by_type};
pub use executor::{execute, execute_simple, refresh};
pub use planner::ExecutionPlan;
pub use reconciler::{LocalState, Observed, Reconciler, ResourceData};
pub use resource::{BoxedResource, Managed, Resource, Snapshot};
pub use types::{Action, ApplyResult, ExecuteOptions, ExecuteReport, ExecuteSummary, Outcome};
