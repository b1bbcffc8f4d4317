//! Progress reporting for apply and destroy

use anyhow::Result;
use colored::Colorize;
use declarative::{Action, ApplyResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}";

/// Progress bar driven by the executor callbacks
pub struct ApplyProgress {
    bar: ProgressBar,
    style: ProgressStyle,
    quiet: bool,
}

impl ApplyProgress {
    pub fn new(quiet: bool) -> Result<Self> {
        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)?
            .progress_chars("=>-");
        Ok(Self {
            bar: ProgressBar::hidden(),
            style,
            quiet,
        })
    }
}

fn result_symbol(result: &ApplyResult) -> colored::ColoredString {
    match result {
        ApplyResult::NoChange => "○".dimmed(),
        ApplyResult::Failed { .. } => "✗".red(),
        ApplyResult::Skipped { .. } => "⊘".yellow(),
        _ => "✓".green(),
    }
}

impl ProgressCallback for ApplyProgress {
    fn on_batch_start(&mut self, count: usize) {
        if self.quiet {
            return;
        }
        self.bar = ProgressBar::new(count as u64);
        self.bar.set_style(self.style.clone());
    }

    fn on_resource_start(&mut self, address: &str, action: Action) {
        self.bar.set_message(format!("{} {address}", action.symbol().trim()));
    }

    fn on_resource_complete(&mut self, address: &str, result: &ApplyResult) {
        self.bar.set_message(format!("{} {address}", result_symbol(result)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}
