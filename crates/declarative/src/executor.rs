//! Execution engine - refreshes and applies resources with parallelism

use crate::context::{ApplyContext, AutoConfirm, ConfirmCallback, NoProgress, ProgressCallback};
use crate::diagnostics::Diagnostics;
use crate::planner::ExecutionPlan;
use crate::resource::BoxedResource;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteReport, Outcome};
use anyhow::Result;
use rayon::prelude::*;
use std::sync::{Arc, Mutex, PoisonError};

/// Refresh every resource in the plan from remote state
///
/// Returns the diagnostics of resources whose read failed, keyed by address.
pub fn refresh<C: ?Sized + Sync>(
    plan: &mut ExecutionPlan<C>,
    client: &C,
    jobs: usize,
) -> Result<Vec<(String, Diagnostics)>> {
    let ctx = ApplyContext::new(client);
    let failures: Arc<Mutex<Vec<(String, Diagnostics)>>> = Arc::new(Mutex::new(Vec::new()));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {e}"))?;

    pool.install(|| {
        plan.resources.par_iter_mut().for_each(|resource| {
            let diags = resource.refresh(&ctx);
            if !diags.is_empty() {
                failures
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((resource.address(), diags));
            }
        });
    });

    let mut failures = into_inner(failures)?;
    failures.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(failures)
}

/// Execute a plan with the given options and callbacks
///
/// Only resources with a pending change are applied. Each resource is
/// exclusively borrowed while it is applied; distinct resources may run
/// concurrently when `opts.jobs > 1`.
pub fn execute<C, P, F>(
    plan: &mut ExecutionPlan<C>,
    client: &C,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut F,
) -> Result<ExecuteReport>
where
    C: ?Sized + Sync,
    P: ProgressCallback,
    F: ConfirmCallback,
{
    let diffs = plan.diffs();
    if diffs.is_empty() {
        return Ok(ExecuteReport::default());
    }

    let mut report = ExecuteReport::default();

    if opts.dry_run {
        for diff in diffs {
            report.push(Outcome {
                address: diff.address,
                action: diff.action,
                result: ApplyResult::Skipped {
                    reason: "Dry run".into(),
                },
                diagnostics: Diagnostics::new(),
            });
        }
        return Ok(report);
    }

    if !confirm.confirm("Apply changes?")? {
        for diff in diffs {
            report.push(Outcome {
                address: diff.address,
                action: diff.action,
                result: ApplyResult::Skipped {
                    reason: "Declined".into(),
                },
                diagnostics: Diagnostics::new(),
            });
        }
        return Ok(report);
    }

    let ctx = ApplyContext::new(client).verbose(opts.verbose);
    let mut pending: Vec<&mut BoxedResource<C>> = plan
        .resources
        .iter_mut()
        .filter(|r| r.planned_action().is_change())
        .collect();

    progress.on_batch_start(pending.len());
    let outcomes = if opts.jobs <= 1 || pending.len() == 1 {
        execute_sequential(&mut pending, &ctx, progress)
    } else {
        execute_parallel(&mut pending, &ctx, opts.jobs, progress)?
    };
    progress.on_batch_complete();

    for outcome in outcomes {
        report.push(outcome);
    }
    Ok(report)
}

fn apply_one<C: ?Sized>(resource: &mut BoxedResource<C>, ctx: &ApplyContext<'_, C>) -> Outcome {
    let action = resource.planned_action();
    let (result, diagnostics) = resource.apply(ctx);
    Outcome {
        address: resource.address(),
        action,
        result,
        diagnostics,
    }
}

fn execute_sequential<C: ?Sized, P: ProgressCallback>(
    pending: &mut [&mut BoxedResource<C>],
    ctx: &ApplyContext<'_, C>,
    progress: &mut P,
) -> Vec<Outcome> {
    let mut outcomes = Vec::with_capacity(pending.len());
    for resource in pending.iter_mut() {
        progress.on_resource_start(&resource.address(), resource.planned_action());
        let outcome = apply_one(resource, ctx);
        progress.on_resource_complete(&outcome.address, &outcome.result);
        outcomes.push(outcome);
    }
    outcomes
}

/// Execute resources in parallel using rayon
fn execute_parallel<C: ?Sized + Sync, P: ProgressCallback>(
    pending: &mut [&mut BoxedResource<C>],
    ctx: &ApplyContext<'_, C>,
    jobs: usize,
    progress: &mut P,
) -> Result<Vec<Outcome>> {
    // The progress callback is not thread-safe, so results are collected
    // and reported after the pool finishes.
    let results: Arc<Mutex<Vec<Outcome>>> = Arc::new(Mutex::new(Vec::new()));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {e}"))?;

    pool.install(|| {
        pending.par_iter_mut().for_each(|resource| {
            let outcome = apply_one(resource, ctx);
            results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(outcome);
        });
    });

    let mut outcomes = into_inner(results)?;
    outcomes.sort_by(|a, b| a.address.cmp(&b.address));

    for outcome in &outcomes {
        progress.on_resource_complete(&outcome.address, &outcome.result);
    }
    Ok(outcomes)
}

fn into_inner<T>(shared: Arc<Mutex<Vec<T>>>) -> Result<Vec<T>> {
    Ok(Arc::try_unwrap(shared)
        .map_err(|_| anyhow::anyhow!("Failed to unwrap results"))?
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner))
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple<C: ?Sized + Sync>(
    plan: &mut ExecutionPlan<C>,
    client: &C,
    opts: &ExecuteOptions,
) -> Result<ExecuteReport> {
    execute(plan, client, opts, &mut NoProgress, &mut AutoConfirm)
}
