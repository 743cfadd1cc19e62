//! `daymark` command-line host for the core engine.
//!
//! # Responsibility
//! - Resolve config/data locations and start logging.
//! - Map subcommands onto `Journal` operations and print the results.

mod cli;

use chrono::Local;
use clap::Parser;
use cli::{frequency_from_flags, Cli, Command};
use daymark_core::{
    default_log_level, init_logging, DayKey, EngineConfig, Entry, EntryKind, Journal, NewTask,
    ResetOutcome, ResetScheduler, SystemClock,
};
use directories::ProjectDirs;
use log::info;
use std::error::Error;
use std::sync::Arc;

type CliResult<T> = Result<T, Box<dyn Error>>;

const DB_FILE_NAME: &str = "journal.sqlite3";
const CONFIG_FILE_NAME: &str = "config.toml";

fn main() {
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let dirs = ProjectDirs::from("app", "daymark", "daymark");
    let data_dir = match (cli.data_dir, &dirs) {
        (Some(dir), _) => dir,
        (None, Some(dirs)) => dirs.data_dir().to_path_buf(),
        (None, None) => return Err("no home directory; pass --data-dir".into()),
    };
    let config_path = match (cli.config, &dirs) {
        (Some(path), _) => Some(path),
        (None, Some(dirs)) => Some(dirs.config_dir().join(CONFIG_FILE_NAME)),
        (None, None) => None,
    };

    let config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    std::fs::create_dir_all(&data_dir)?;
    let data_dir = std::path::absolute(&data_dir)?;
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    init_logging(level, data_dir.join("logs"))?;

    let journal = Journal::open(data_dir.join(DB_FILE_NAME), config)?;
    dispatch(journal, cli.command)
}

fn dispatch(journal: Journal, command: Command) -> CliResult<()> {
    let now = Local::now();
    match command {
        Command::AddTask {
            content,
            priority,
            quantity,
            unit,
            daily,
            weekly,
            monthly,
        } => {
            let entry = journal.create_task(
                NewTask {
                    content,
                    priority: priority.into(),
                    quantity,
                    unit,
                    frequency: frequency_from_flags(daily, weekly, monthly),
                },
                now,
            )?;
            println!("added task {}", entry.id);
        }
        Command::AddMood { content, score } => {
            let (entry, award) = journal.log_mood(content, score, now)?;
            println!("logged mood {} (+{} points)", entry.id, award.points);
        }
        Command::Focus { id } => {
            journal.promote(id, now)?;
            println!(
                "focused {id} ({} slots left)",
                journal.available_focus_slots()?
            );
        }
        Command::Unfocus { id } => {
            journal.demote(id, now)?;
            println!("unfocused {id}");
        }
        Command::Done { id } => {
            let done = journal.complete_and_award(id, now)?;
            let Some(award) = done.award else {
                println!("{id} was already done");
                return Ok(());
            };
            println!(
                "done {id} (+{} points, streak {})",
                award.points, done.entry.streak.current
            );
            if award.leveled_up {
                println!("level up: {}", award.state.level);
            }
        }
        Command::Undo { id } => {
            journal.undo_completion(id, now)?;
            println!("reopened {id}");
        }
        Command::Progress { id, amount } => {
            let entry = journal.record_progress(id, amount, now)?;
            println!(
                "{id}: {}/{}{}",
                entry.progress.unwrap_or(0),
                entry.quantity.unwrap_or(0),
                entry
                    .unit
                    .as_deref()
                    .map(|unit| format!(" {unit}"))
                    .unwrap_or_default()
            );
        }
        Command::Delete { id } => {
            journal.soft_delete(id, now)?;
            println!("deleted {id}");
        }
        Command::Award { category } => {
            let award = journal.award(category.into(), now)?;
            println!(
                "+{} points (total {}, level {})",
                award.points, award.state.total_points, award.state.level
            );
        }
        Command::Today => print_today(&journal, now)?,
        Command::List { status } => {
            for entry in journal.list_by_status(status.into())? {
                println!("{}", describe(&journal, &entry, now)?);
            }
        }
        Command::Score => {
            let state = journal.score_state()?;
            println!("total {} points, level {}", state.total_points, state.level);
        }
        Command::Reset => match journal.maybe_run_reset(now)? {
            ResetOutcome::AlreadyRan(day) => println!("reset already ran for {day}"),
            ResetOutcome::Ran(summary) => println!(
                "reset for {}: {} unfocused, {} archived",
                summary.day,
                summary.demoted.len(),
                summary.archived.len()
            ),
        },
        Command::Watch => watch(journal),
        Command::Config => print!("{}", journal.config().to_toml_string()?),
    }
    Ok(())
}

fn print_today(journal: &Journal, now: chrono::DateTime<Local>) -> CliResult<()> {
    let focused = journal.list_focused()?;
    println!("focus ({}/{}):", focused.len(), journal.config().focus.capacity);
    for entry in &focused {
        println!("  {}", describe(journal, entry, now)?);
    }

    let today = DayKey::from_local(&now);
    println!("{today}:");
    for entry in journal.list_day(today)? {
        println!("  {}", describe(journal, &entry, now)?);
    }
    Ok(())
}

fn describe(journal: &Journal, entry: &Entry, now: chrono::DateTime<Local>) -> CliResult<String> {
    let mut line = format!("{} [{}] {}", entry.id, entry.status.as_str(), entry.content);
    match entry.kind {
        EntryKind::Mood => {
            line.push_str(&format!(" (mood {})", entry.mood_score.unwrap_or(0)));
        }
        EntryKind::Task if entry.is_recurring() => {
            let streak = journal.streak_display(entry.id, now)?;
            if streak.value > 0 {
                line.push_str(&format!(" (streak {})", streak.value));
            }
        }
        EntryKind::Task => {}
    }
    Ok(line)
}

fn watch(journal: Journal) -> ! {
    let interval = journal.config().reset.interval();
    let _scheduler = ResetScheduler::spawn(Arc::new(journal), Arc::new(SystemClock), interval);
    info!("event=cli_watch module=cli status=start");
    println!("running daily reset every {}s; Ctrl-C to stop", interval.as_secs());
    loop {
        std::thread::park();
    }
}

