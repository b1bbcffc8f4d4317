use anyhow::Result;
use declarative::ApplyContext;

use crate::Context;
use crate::cli::ImportArgs;
use crate::engine::{build_plan, builder::parse_address};
use crate::ui;

/// Adopt an existing object under a declared address
pub fn run(ctx: &Context, args: ImportArgs) -> Result<()> {
    let ImportArgs { address, id } = args;
    parse_address(&address)?;

    let config = super::load_config(ctx)?;
    config.validate()?;
    let mut state = super::load_state(ctx)?;

    if let Some(existing) = state.get(&address) {
        anyhow::bail!(
            "{} is already tracked with id {}; run `awxform state rm {}` first",
            address,
            existing.id,
            address
        );
    }

    let client = super::connect(ctx, &config)?;
    let mut plan = build_plan(&config, &state)?;
    let Some(resource) = plan.find_mut(&address) else {
        anyhow::bail!(
            "{} is not declared in {}; add it before importing",
            address,
            ctx.config_path.display()
        );
    };

    let diags = resource.import(&ApplyContext::new(&client), &id);
    ui::diagnostics(&address, &diags);
    if diags.has_errors() {
        anyhow::bail!("Import of {} failed", address);
    }

    let Some(snapshot) = resource.snapshot()? else {
        anyhow::bail!("No object with id {} exists for {}", id, address);
    };
    state.record(&address, Some(snapshot));
    state.touch(&ctx.state_path)?;

    if !ctx.quiet {
        ui::success(&format!("Imported {address} (id {id})"));
        ui::dim("Run `awxform plan` to see any drift from the configuration");
    }
    Ok(())
}
