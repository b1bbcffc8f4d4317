//! Execution engine - awxform executor with UI integration

use anyhow::Result;
use awxkit::Client;
use colored::Colorize;
use declarative::{ConfirmCallback, ExecuteOptions, ExecuteReport, ExecuteSummary};

use super::builder::AwxPlan;
use super::differ::display_plan;
use crate::progress::ApplyProgress;
use crate::state::AwxformState;
use crate::ui;

/// Options for apply and destroy (includes `yes` for confirmation skip)
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs
    pub jobs: usize,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Verbose output
    pub verbose: bool,
    /// Suppress the progress bar
    pub quiet: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            yes: false,
            verbose: false,
            quiet: false,
        }
    }
}

/// Confirmation through an interactive prompt, unless `--yes`
struct PromptConfirm {
    assume_yes: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        confirm_proceed()
    }
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

/// Refresh every resource; prints read failures and reports whether any occurred
pub fn refresh(plan: &mut AwxPlan, client: &Client, jobs: usize) -> Result<bool> {
    let failures = declarative::refresh(plan, client, jobs)?;
    let mut failed = false;
    for (address, diags) in &failures {
        failed |= diags.has_errors();
        ui::diagnostics(address, diags);
    }
    Ok(failed)
}

/// Show the plan, confirm and execute it
pub fn apply(plan: &mut AwxPlan, client: &Client, opts: &ApplyOptions) -> Result<ExecuteReport> {
    let diffs = plan.diffs();
    display_plan(&diffs, opts.verbose);

    if diffs.is_empty() {
        return Ok(ExecuteReport::default());
    }

    let execute_opts = ExecuteOptions {
        dry_run: opts.dry_run,
        jobs: opts.jobs.max(1),
        verbose: opts.verbose,
    };
    let mut progress = ApplyProgress::new(opts.quiet)?;
    let mut confirm = PromptConfirm {
        assume_yes: opts.yes,
    };

    let report = declarative::execute(plan, client, &execute_opts, &mut progress, &mut confirm)?;

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(report);
    }

    if report.summary.skipped == report.summary.total() {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(report);
    }

    for outcome in report.failures() {
        ui::diagnostics(&outcome.address, &outcome.diagnostics);
    }
    print_summary(&report.summary);

    Ok(report)
}

/// Write every resource's identity back into the state
///
/// Absent resources are dropped from the state.
pub fn record_state(plan: &AwxPlan, state: &mut AwxformState) -> Result<()> {
    for resource in &plan.resources {
        let snapshot = resource.snapshot()?;
        state.record(&resource.address(), snapshot);
    }
    Ok(())
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!(
            "  {} Configuration applied successfully!",
            "✓".green().bold()
        );
    } else {
        println!(
            "  {} Configuration applied with errors",
            "⚠".yellow().bold()
        );
    }

    for line in summary_lines(summary) {
        println!("    • {line}");
    }
}

fn summary_lines(summary: &ExecuteSummary) -> Vec<String> {
    let counts = [
        (summary.created, "created"),
        (summary.updated, "updated"),
        (summary.replaced, "replaced"),
        (summary.removed, "removed"),
        (summary.skipped, "skipped"),
        (summary.failed, "failed"),
    ];
    counts
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, verb)| format!("{count} resources {verb}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{JobTemplateCredential, JobTemplateCredentialState};
    use crate::resource::testing::client;
    use awxkit::MockBackend;
    use declarative::{Managed, Resource};

    fn link_plan() -> AwxPlan {
        let mut plan = AwxPlan::new();
        plan.push(Box::new(
            Managed::new(JobTemplateCredential, "deploy").with_desired(JobTemplateCredentialState {
                job_template_id: 7,
                credential_id: 9,
            }),
        ));
        plan
    }

    fn server() -> MockBackend {
        let mock = MockBackend::new();
        mock.add_job_template(7, "deploy-app");
        mock.add_credential(9, "deploy", "ssh", None);
        mock
    }

    #[test]
    fn test_apply_with_yes_and_record() {
        let mock = server();
        let client = client(&mock);
        let mut plan = link_plan();
        let opts = ApplyOptions {
            yes: true,
            quiet: true,
            ..Default::default()
        };

        let report = apply(&mut plan, &client, &opts).unwrap();
        assert_eq!(report.summary.created, 1);
        assert_eq!(mock.links(), vec![(7, 9)]);

        let mut state = AwxformState::default();
        record_state(&plan, &mut state).unwrap();
        assert_eq!(state.get("job_template_credential.deploy").unwrap().id, "7-9");
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let mock = server();
        let client = client(&mock);
        let mut plan = link_plan();
        let opts = ApplyOptions {
            dry_run: true,
            quiet: true,
            ..Default::default()
        };

        let report = apply(&mut plan, &client, &opts).unwrap();
        assert_eq!(report.summary.skipped, 1);
        assert!(mock.links().is_empty());

        let mut state = AwxformState::default();
        record_state(&plan, &mut state).unwrap();
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_failures_are_reported() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let mut plan = link_plan();
        let opts = ApplyOptions {
            yes: true,
            quiet: true,
            jobs: 1,
            ..Default::default()
        };

        let report = apply(&mut plan, &client, &opts).unwrap();
        assert_eq!(report.summary.failed, 1);
        let failure = report.failures().next().unwrap();
        assert_eq!(
            failure.diagnostics.first_error().unwrap().summary,
            "Job template not found"
        );
        assert!(plan.resources[0].snapshot().unwrap().is_none());
    }

    #[test]
    fn test_refresh_reports_read_errors() {
        let mock = server();
        mock.fail_on("list_job_template_credentials", awxkit::Error::http(500, "boom"));
        let client = client(&mock);
        let mut plan = AwxPlan::new();
        plan.push(Box::new(
            Managed::new(JobTemplateCredential, "deploy").with_prior(
                "7-9",
                JobTemplateCredentialState {
                    job_template_id: 7,
                    credential_id: 9,
                },
            ),
        ));
        assert!(refresh(&mut plan, &client, 2).unwrap());
    }

    #[test]
    fn test_summary_lines() {
        let summary = ExecuteSummary {
            created: 2,
            failed: 1,
            ..Default::default()
        };
        assert_eq!(
            summary_lines(&summary),
            vec!["2 resources created", "1 resources failed"]
        );
    }
}
