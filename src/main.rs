mod cli;
mod commands;
mod config;
mod engine;
mod error;
mod identity;
mod lookup;
mod progress;
mod resource;
mod schema;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, ConnectionArgs};
use schema::ConnectionOverrides;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_path: PathBuf,
    pub state_path: PathBuf,
    pub timeout: Option<Duration>,
    pub connection: ConnectionOverrides,
}

impl From<ConnectionArgs> for ConnectionOverrides {
    fn from(args: ConnectionArgs) -> Self {
        Self {
            url: args.url,
            token: args.token,
            username: args.username,
            password: args.password,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "awxform", &mut io::stdout());
        return Ok(());
    }

    let state_path = match cli.state.as_deref() {
        Some(path) => config::expand_path(path)?,
        None => config::default_state_file()?,
    };

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config_path: config::expand_path(&cli.config)?,
        state_path,
        timeout: cli.timeout.map(Duration::from_secs),
        connection: cli.connection.into(),
    };
    log::debug!(
        "config: {}, state: {}",
        ctx.config_path.display(),
        ctx.state_path.display()
    );

    match cli.command {
        Command::Validate => commands::validate::run(&ctx),
        Command::Plan(args) => commands::apply::plan(&ctx, args),
        Command::Apply(args) => commands::apply::apply(&ctx, args),
        Command::Destroy(args) => commands::apply::destroy(&ctx, args),
        Command::Import(args) => commands::import::run(&ctx, args),
        Command::State(cmd) => commands::state::run(&ctx, cmd),
        Command::Completions { .. } => Ok(()),
    }
}
