//! Command-line inspection and maintenance of stale invalidation records

mod cli;
mod commands;
mod logging;

use crate::cli::Cli;
use crate::commands::{Command, CommandExecutor};
use stale_invalidation::InvalidationConfig;

#[allow(clippy::print_stderr)]
fn main() {
    if let Err(error) = run() {
        eprintln!("{error:?}");
        std::process::exit(1);
    }
}

fn run() -> miette::Result<()> {
    let cli = cli::parse();
    logging::init_tracing(cli.level, cli.json)?;

    let config = resolve_config(&cli)?;
    tracing::debug!(?config, scope = ?cli.scope, "Resolved configuration");

    let executor = CommandExecutor::new(config, cli.scope.clone());
    let output = executor.execute(Command::from(cli.command))?;
    let rendered = if cli.json {
        output.render_json()?
    } else {
        output.render_text()
    };
    print_output(&rendered);
    Ok(())
}

/// Layer configuration: file, then environment, then command-line flags.
fn resolve_config(cli: &Cli) -> miette::Result<InvalidationConfig> {
    let base = match &cli.config {
        Some(path) => InvalidationConfig::load(path)?,
        None => InvalidationConfig::default(),
    };
    let mut config = base.with_env(|name| std::env::var(name).ok());
    if let Some(workdir) = &cli.workdir {
        config.workdir = Some(workdir.clone());
    }
    if let Some(version) = &cli.schema_version {
        config.schema_version.clone_from(version);
    }
    config.validate()?;
    Ok(config)
}

#[allow(clippy::print_stdout)]
fn print_output(rendered: &str) {
    if !rendered.is_empty() {
        println!("{rendered}");
    }
}
