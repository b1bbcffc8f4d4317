use anyhow::Result;

use crate::Context;
use crate::engine::build_plan;
use crate::ui;

/// Check config and state without contacting the server
pub fn run(ctx: &Context) -> Result<()> {
    let config = super::load_config(ctx)?;
    config.validate()?;

    let state = super::load_state(ctx)?;
    let plan = build_plan(&config, &state)?;

    if !ctx.quiet {
        ui::success(&format!(
            "{} is valid: {} declared, {} tracked",
            ctx.config_path.display(),
            config.total_resources(),
            state.resources.len()
        ));
        let orphans = plan.total_resources().saturating_sub(config.total_resources());
        if orphans > 0 {
            ui::warn(&format!(
                "{orphans} tracked resource(s) are no longer declared and will be removed on apply"
            ));
        }
    }
    Ok(())
}
