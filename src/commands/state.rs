use anyhow::{Context as AnyhowContext, Result};

use crate::Context;
use crate::cli::StateCommand;
use crate::engine::differ::redact;
use crate::ui;

pub fn run(ctx: &Context, cmd: StateCommand) -> Result<()> {
    match cmd {
        StateCommand::List => list(ctx),
        StateCommand::Show { address } => show(ctx, &address),
        StateCommand::Rm { address } => rm(ctx, &address),
    }
}

fn list(ctx: &Context) -> Result<()> {
    let state = super::load_state(ctx)?;
    if state.resources.is_empty() {
        ui::info(&format!("No resources tracked in {}", ctx.state_path.display()));
        return Ok(());
    }
    for (address, snapshot) in &state.resources {
        println!("{address:<50} {}", snapshot.id);
    }
    Ok(())
}

fn show(ctx: &Context, address: &str) -> Result<()> {
    let state = super::load_state(ctx)?;
    let snapshot = state
        .get(address)
        .with_context(|| format!("{address} is not tracked"))?;

    ui::header(address);
    ui::kv("type", &snapshot.resource_type);
    ui::kv("id", &snapshot.id);
    ui::section("Attributes");
    let attributes = serde_json::to_string_pretty(&redact(&snapshot.attributes))?;
    for line in attributes.lines() {
        println!("  {line}");
    }
    Ok(())
}

fn rm(ctx: &Context, address: &str) -> Result<()> {
    let mut state = super::load_state(ctx)?;
    if !state.remove(address) {
        anyhow::bail!("{} is not tracked", address);
    }
    state.touch(&ctx.state_path)?;
    if !ctx.quiet {
        ui::success(&format!("{address} is no longer tracked; the server object was left as is"));
    }
    Ok(())
}
