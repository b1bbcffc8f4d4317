pub mod apply;
pub mod import;
pub mod state;
pub mod validate;

use anyhow::Result;
use awxkit::{CancelToken, Client};

use crate::Context;
use crate::schema::AwxformConfig;
use crate::state::AwxformState;

/// Load the config file with command-line and environment overrides applied
pub fn load_config(ctx: &Context) -> Result<AwxformConfig> {
    let mut config = AwxformConfig::load(&ctx.config_path)?;
    config.connection.merge(ctx.connection.clone());
    Ok(config)
}

pub fn load_state(ctx: &Context) -> Result<AwxformState> {
    AwxformState::load(&ctx.state_path)
}

/// Build the AWX client, bounded by `--timeout` when given
pub fn connect(ctx: &Context, config: &AwxformConfig) -> Result<Client> {
    let connection = config.connection.to_config()?;
    let mut client = Client::new(&connection)?.with_retry(config.retry.to_config());
    if let Some(timeout) = ctx.timeout {
        log::debug!("Remote calls cancelled after {}s", timeout.as_secs());
        client = client.with_cancel_token(CancelToken::with_timeout(timeout));
    }
    Ok(client)
}
