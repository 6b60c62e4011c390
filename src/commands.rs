use crate::config::Config;
use crate::model::{day_name, hour_text, parse_clock_time, parse_day, seed_tasks, ArchiveEntry};
use crate::model::{Task, TaskDraft};
use crate::popup::me_popup;
use crate::registry::Registry;
use crate::scene::Scene;
use crate::storage::FileStore;
use crate::tick::tick as run_tick;
use crate::timeline::{self, now_position, tracker_offset, Clock, SystemClock};
use crate::ui;
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

/// Resolved settings shared by every subcommand.
pub struct Env {
    pub config: Config,
    pub data_dir: PathBuf,
}

impl Env {
    fn open_registry(&self, clock: &dyn Clock) -> Result<Registry<FileStore>> {
        Registry::load_or_seed(
            FileStore::new(&self.data_dir),
            seed_tasks(),
            clock.now(),
            self.config.history_ttl(),
        )
        .with_context(|| format!("opening task store in {}", self.data_dir.display()))
    }
}

pub fn add(env: &Env, title: String, day: String, at: Option<String>) -> Result<()> {
    let day_index =
        parse_day(&day).ok_or_else(|| anyhow!("invalid day (use 0..6 or a weekday name): {}", day))?;
    let time = match at.as_deref() {
        Some(raw) => Some(
            parse_clock_time(raw).ok_or_else(|| anyhow!("invalid time (use HH:MM): {}", raw))?,
        ),
        None => None,
    };
    if title.trim().is_empty() {
        return Err(anyhow!("title is required"));
    }
    let mut registry = env.open_registry(&SystemClock)?;
    let task = registry
        .add(TaskDraft {
            title: title.trim().to_string(),
            day_index,
            time,
        })
        .context("adding task")?;
    println!(
        "Snail #{} ({}) was added for {} {}",
        task.snail_number,
        task.title,
        day_name(task.day_index),
        hour_text(task.due_hour)
    );
    Ok(())
}

pub fn list(env: &Env) -> Result<()> {
    let registry = env.open_registry(&SystemClock)?;
    if registry.active().is_empty() {
        println!("No snails on the track");
        return Ok(());
    }
    for task in registry.active() {
        print_task(task);
    }
    Ok(())
}

pub fn history(env: &Env) -> Result<()> {
    let registry = env.open_registry(&SystemClock)?;
    if registry.archive().is_empty() {
        println!("No snail has gone home yet..");
        return Ok(());
    }
    for entry in registry.archive().iter().rev() {
        print_entry(entry);
    }
    Ok(())
}

pub fn delete(env: &Env, snail_number: u32) -> Result<()> {
    let clock = SystemClock;
    let mut registry = env.open_registry(&clock)?;
    match registry
        .delete(snail_number, clock.now())
        .with_context(|| format!("deleting snail #{}", snail_number))?
    {
        Some(entry) => println!(
            "Snail #{} ({}) was deleted.",
            entry.task.snail_number, entry.task.title
        ),
        None => println!("No active snail #{}", snail_number),
    }
    Ok(())
}

pub fn tick(env: &Env) -> Result<()> {
    let clock = SystemClock;
    let mut registry = env.open_registry(&clock)?;
    let mut scene = Scene::from_tasks(registry.active());
    let report = run_tick(
        &mut registry,
        &mut scene,
        clock.now(),
        tracker_offset(env.config.utc_offset_hours),
        &mut rand::thread_rng(),
    )
    .context("running tick")?;
    println!("me at {:.2}", report.now_position);
    if report.completed.is_empty() {
        println!("No snail arrived");
    }
    for entry in &report.completed {
        println!("{}", entry.completed_message);
    }
    Ok(())
}

pub fn now(env: &Env) -> Result<()> {
    let clock = SystemClock;
    let offset = tracker_offset(env.config.utc_offset_hours);
    let popup = me_popup(clock.now(), offset);
    println!("{}", popup.heading);
    for line in popup.lines {
        println!("  {}", line);
    }
    println!("  position {:.2}", now_position(&clock, offset));
    Ok(())
}

pub fn tui(env: &Env) -> Result<()> {
    let registry = env.open_registry(&SystemClock)?;
    ui::run(registry, &env.config, Box::new(SystemClock))
}

fn print_task(task: &Task) {
    println!(
        "  - #{}: {} ({} {}) at {:.2}",
        task.snail_number,
        task.title,
        day_name(task.day_index),
        hour_text(task.due_hour),
        timeline::position(task.day_index as i32, task.due_hour)
    );
}

fn print_entry(entry: &ArchiveEntry) {
    println!("  - {} ({})", entry.task.title, entry.status.label());
    println!("    {}", entry.completed_message);
}
