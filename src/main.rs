mod cli;
mod commands;
mod config;
mod logging;
mod model;
mod notice;
mod pending;
mod popup;
mod registry;
mod scene;
mod storage;
mod tick;
mod timeline;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let config = config::load(args.config.as_deref())?;
    let data_dir =
        storage::resolve_data_dir(args.data_dir.as_deref().or(config.data_dir.as_deref()))?;
    let _log_guard = logging::init(&config.log_level, &data_dir.join("logs"))?;
    let env = commands::Env { config, data_dir };

    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Add { title, day, at } => commands::add(&env, title, day, at),
        cli::Command::List => commands::list(&env),
        cli::Command::History => commands::history(&env),
        cli::Command::Delete { snail_number } => commands::delete(&env, snail_number),
        cli::Command::Tick => commands::tick(&env),
        cli::Command::Now => commands::now(&env),
        cli::Command::Tui => commands::tui(&env),
    }
}
