//! `plan`, `apply` and `destroy`

use anyhow::Result;

use crate::Context;
use crate::cli::{ApplyArgs, DestroyArgs, PlanArgs};
use crate::engine::{self, ApplyOptions, AwxPlan, build_destroy_plan, build_plan, differ};
use crate::ui;

fn refresh_or_bail(plan: &mut AwxPlan, client: &awxkit::Client, jobs: usize) -> Result<()> {
    if engine::refresh(plan, client, jobs)? {
        anyhow::bail!(
            "Refresh failed for some resources. Fix the errors above, or run \
             `awxform state rm <address>` to stop tracking an object that has to be recreated"
        );
    }
    Ok(())
}

fn warn_if_empty(plan: &AwxPlan, target: Option<&str>) -> bool {
    if !plan.is_empty() {
        return false;
    }
    match target {
        Some(t) => ui::warn(&format!("No resources match '{t}'")),
        None => ui::info("Nothing declared or tracked"),
    }
    true
}

/// Refresh and show what apply would do
pub fn plan(ctx: &Context, args: PlanArgs) -> Result<()> {
    let config = super::load_config(ctx)?;
    config.validate()?;
    let state = super::load_state(ctx)?;
    let client = super::connect(ctx, &config)?;

    let mut plan = build_plan(&config, &state)?.filter_by_target(args.target.as_deref());
    if warn_if_empty(&plan, args.target.as_deref()) {
        return Ok(());
    }

    refresh_or_bail(&mut plan, &client, args.jobs)?;
    differ::display_plan(&plan.diffs(), ctx.verbose > 0);
    Ok(())
}

/// Converge the server toward the configuration
pub fn apply(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let config = super::load_config(ctx)?;
    config.validate()?;
    let mut state = super::load_state(ctx)?;
    let client = super::connect(ctx, &config)?;

    let mut plan = build_plan(&config, &state)?.filter_by_target(args.target.as_deref());
    if warn_if_empty(&plan, args.target.as_deref()) {
        return Ok(());
    }
    refresh_or_bail(&mut plan, &client, args.jobs)?;

    let opts = ApplyOptions {
        dry_run: args.dry_run,
        jobs: args.jobs,
        yes: args.yes,
        verbose: ctx.verbose > 0,
        quiet: ctx.quiet,
    };
    execute(ctx, &mut plan, &client, &opts, &mut state)
}

/// Delete everything the state file tracks
pub fn destroy(ctx: &Context, args: DestroyArgs) -> Result<()> {
    let config = super::load_config(ctx)?;
    let mut state = super::load_state(ctx)?;
    let client = super::connect(ctx, &config)?;

    let mut plan = build_destroy_plan(&state)?.filter_by_target(args.target.as_deref());
    if warn_if_empty(&plan, args.target.as_deref()) {
        return Ok(());
    }
    refresh_or_bail(&mut plan, &client, args.jobs)?;

    let opts = ApplyOptions {
        dry_run: false,
        jobs: args.jobs,
        yes: args.yes,
        verbose: ctx.verbose > 0,
        quiet: ctx.quiet,
    };
    execute(ctx, &mut plan, &client, &opts, &mut state)
}

fn execute(
    ctx: &Context,
    plan: &mut AwxPlan,
    client: &awxkit::Client,
    opts: &ApplyOptions,
    state: &mut crate::state::AwxformState,
) -> Result<()> {
    let report = engine::apply(plan, client, opts)?;

    if !opts.dry_run {
        // Refresh alone may have found objects gone; record that too.
        engine::record_state(plan, state)?;
        state.touch(&ctx.state_path)?;
    }

    if report.summary.failed > 0 {
        anyhow::bail!("{} resource(s) failed", report.summary.failed);
    }
    Ok(())
}
