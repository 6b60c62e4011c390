use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "snailtrack",
    version,
    about = "Deadlines crawl toward you along a week-long track"
)]
pub struct Cli {
    /// Path to config.yml (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Directory holding the task and history files
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task right away
    Add {
        /// Title of the task
        title: String,
        /// Day of the week: 0..6 (Monday = 0) or a name such as `wed`
        #[arg(long, default_value = "mon")]
        day: String,
        /// Due time in HH:MM (defaults to 23:59)
        #[arg(long)]
        at: Option<String>,
    },
    /// List active tasks
    List,
    /// Show completed and deleted tasks, newest first
    History,
    /// Archive a task as deleted
    Delete {
        /// Snail number of the task
        snail_number: u32,
    },
    /// Run a single tick and complete every task "now" has passed
    Tick,
    /// Show the current time and position of "me"
    Now,
    /// Launch the interactive track
    Tui,
}
