//! Execution engine for awxform
//!
//! The engine orchestrates:
//! 1. Building - Turn config plus state file into an execution plan
//! 2. Diffing - Show current vs desired state
//! 3. Executing - Apply changes with parallelism and record the outcome

pub mod builder;
pub mod differ;
pub mod executor;

pub use builder::{AwxPlan, build_destroy_plan, build_plan};
pub use executor::{ApplyOptions, apply, record_state, refresh};
