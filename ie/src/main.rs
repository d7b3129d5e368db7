//! ie - Itinerary reconciliation and editing
//!
//! CLI entry point for normalizing generated plans and editing stored ones.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use itinerary::cli::{Cli, Command, OutputFormat, TripArgs};
use itinerary::config::Config;
use itinerary::domain::{Entry, EntryDraft, EntryKind, EntryPatch, Plan};
use itinerary::events::EventBus;
use itinerary::feasibility::SolverProblem;
use itinerary::normalizer::normalize;
use itinerary::ordering::Mutation;
use itinerary::script::EditScript;
use itinerary::session::{PlanView, SeedMode, SessionManager, SessionSettings, spawn_reload_loop};
use itinerary::sync::{FileItineraryStore, ItineraryStore};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("itinerary")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = if let Some(s) = level_str {
        match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        }
    } else {
        tracing::Level::INFO
    };

    let log_file = fs::File::create(log_dir.join("itinerary.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("ie loaded config: storage={}", config.storage.path.display());

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Normalize { file, days, format } => {
            debug!(?file, ?days, "main: matched Normalize command");
            cmd_normalize(&config, &file, days, format)
        }
        Command::Import { file, trip } => {
            debug!(?file, "main: matched Import command");
            cmd_import(&config, &file, trip).await
        }
        Command::Plans { format } => {
            debug!("main: matched Plans command");
            cmd_plans(&config, format)
        }
        Command::Show { plan, format } => {
            debug!(%plan, "main: matched Show command");
            cmd_show(&config, &plan, format).await
        }
        Command::Add {
            plan,
            day,
            at,
            kind,
            name,
            description,
            location,
            time,
            cost,
        } => {
            debug!(%plan, day, ?at, %kind, "main: matched Add command");
            let draft = EntryDraft {
                description,
                location,
                time,
                cost,
                ..EntryDraft::new(kind, name)
            };
            cmd_add(&config, &plan, draft, day, at).await
        }
        Command::Move {
            plan,
            entry,
            from_day,
            to_day,
            to_order,
        } => {
            debug!(%plan, %entry, from_day, to_day, to_order, "main: matched Move command");
            cmd_move(&config, &plan, &entry, from_day, to_day, to_order).await
        }
        Command::Delete { plan, entry } => {
            debug!(%plan, %entry, "main: matched Delete command");
            cmd_delete(&config, &plan, &entry).await
        }
        Command::Update { plan, entry, fields } => {
            debug!(%plan, %entry, "main: matched Update command");
            cmd_update(&config, &plan, &entry, fields.into_patch()).await
        }
        Command::Edit {
            plan,
            script,
            events,
            format,
        } => {
            debug!(%plan, ?script, events, "main: matched Edit command");
            cmd_edit(&config, &plan, &script, events, format).await
        }
        Command::Feasibility { plan } => {
            debug!(%plan, "main: matched Feasibility command");
            cmd_feasibility(&config, &plan).await
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).context(format!("Failed to parse JSON in {}", path.display()))
}

fn open_store(config: &Config) -> Result<FileItineraryStore> {
    FileItineraryStore::open(&config.storage.path)
        .context(format!("Failed to open plan store at {}", config.storage.path.display()))
}

/// Start a session over the configured store and open `plan_id`
async fn open_session(config: &Config, plan_id: &str) -> Result<(SessionManager, PlanView)> {
    debug!(%plan_id, "open_session: called");
    let store: Arc<dyn ItineraryStore> = Arc::new(open_store(config)?);
    let events = Arc::new(EventBus::new(config.events.channel_capacity));
    let session = SessionManager::spawn(
        store,
        events,
        SessionSettings {
            max_snapshots: config.history.max_snapshots,
        },
    );
    let view = session
        .open(plan_id, SeedMode::Resume)
        .await
        .context(format!("Failed to open plan {}", plan_id))?;
    Ok((session, view))
}

/// Wait for queued writes, then stop the session
async fn finish_session(session: &SessionManager) -> Result<()> {
    session.flush().await.context("Failed to flush pending writes")?;
    session.shutdown().await.context("Failed to shut down session")?;
    Ok(())
}

fn print_entries(entries: &[Entry], days: u32) {
    for day in 1..=days {
        println!("{}", format!("Day {}", day).bold());
        let mut any = false;
        for entry in entries.iter().filter(|e| e.day == day) {
            any = true;
            let mut line = format!(
                "  {:>2}. {} {}",
                entry.order,
                format!("[{}]", entry.kind).cyan(),
                entry.name
            );
            if let Some(time) = &entry.time {
                line.push_str(&format!(" {}", time.yellow()));
            }
            if let Some(cost) = &entry.cost {
                line.push_str(&format!(" ({})", cost));
            }
            println!("{}", line);
            println!("      {}", entry.id.dimmed());
        }
        if !any {
            println!("  {}", "(nothing planned)".dimmed());
        }
    }
}

fn print_mutation(verb: &str, mutation: &Mutation) {
    if mutation.is_noop() {
        println!("{} Nothing changed for {}", "-".yellow(), mutation.entry_id);
    } else {
        println!("{} {} {}", "✓".green(), verb, mutation.entry_id.cyan());
    }
}

fn cmd_normalize(config: &Config, file: &Path, days: Option<u32>, format: OutputFormat) -> Result<()> {
    debug!(?file, ?days, ?format, "cmd_normalize: called");
    let document = read_json(file)?;
    let days = days.unwrap_or(config.normalizer.default_duration_days).max(1);
    let entries = normalize(&document, days);
    info!(count = entries.len(), days, "cmd_normalize: normalized document");

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No entries found in {}", file.display());
            } else {
                print_entries(&entries, days);
            }
        }
    }
    Ok(())
}

/// Plan from a file that is either a stored-plan JSON or a bare document
fn plan_from_file(config: &Config, document: Value, trip: TripArgs) -> Plan {
    let mut plan = match serde_json::from_value::<Plan>(document.clone()) {
        Ok(plan) => {
            debug!(plan_id = %plan.id, "plan_from_file: file is a plan");
            plan
        }
        Err(_) => {
            debug!("plan_from_file: file is a bare document");
            let destination = trip
                .destination
                .clone()
                .or_else(|| document.get("destination").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| "Trip".to_string());
            let days = trip.days.unwrap_or(config.normalizer.default_duration_days);
            Plan::new(destination, days).with_document(document)
        }
    };

    if let Some(id) = trip.id {
        plan.id = id;
    }
    if let Some(destination) = trip.destination {
        plan.destination = destination;
    }
    if let Some(days) = trip.days {
        plan.duration_days = days.max(1);
    }
    if trip.budget.is_some() {
        plan.budget = trip.budget;
    }
    if !trip.preferences.is_empty() {
        plan.preferences = trip.preferences;
    }
    plan
}

async fn cmd_import(config: &Config, file: &Path, trip: TripArgs) -> Result<()> {
    debug!(?file, "cmd_import: called");
    let document = read_json(file)?;
    let plan = plan_from_file(config, document, trip);
    let entries = normalize(&plan.raw_generated_document, plan.days());

    let store = open_store(config)?;
    store.save_plan(&plan).await.context("Failed to save plan")?;
    store
        .replace_entries(&plan.id, &entries)
        .context("Failed to save entries")?;
    info!(plan_id = %plan.id, count = entries.len(), "cmd_import: stored plan");

    println!(
        "{} Imported {} ({} entries over {} days)",
        "✓".green(),
        plan.id.cyan(),
        entries.len(),
        plan.days()
    );
    Ok(())
}

fn cmd_plans(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_plans: called");
    let plans = open_store(config)?.list_plans().context("Failed to list plans")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plans)?),
        OutputFormat::Text => {
            if plans.is_empty() {
                println!("No plans stored in {}", config.storage.path.display());
                return Ok(());
            }
            for summary in &plans {
                let updated = summary
                    .updated_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                let doc = if summary.has_plan_document { "" } else { " (no plan document)" };
                println!(
                    "{}  {} entries  {}{}",
                    summary.plan_id.cyan(),
                    summary.entry_count,
                    updated.dimmed(),
                    doc.yellow()
                );
            }
        }
    }
    Ok(())
}

fn print_view(view: &PlanView, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "plan": view.plan,
                "source": view.source.to_string(),
                "entries": view.entries,
                "canUndo": view.can_undo,
                "canRedo": view.can_redo,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!(
                "{} - {} ({} days, from {})",
                view.plan.destination.bold(),
                view.plan.id.cyan(),
                view.plan.days(),
                view.source
            );
            print_entries(&view.entries, view.plan.days());
        }
    }
    Ok(())
}

async fn cmd_show(config: &Config, plan_id: &str, format: OutputFormat) -> Result<()> {
    debug!(%plan_id, ?format, "cmd_show: called");
    let (session, view) = open_session(config, plan_id).await?;
    print_view(&view, format)?;
    finish_session(&session).await
}

async fn cmd_add(config: &Config, plan_id: &str, draft: EntryDraft, day: u32, at: Option<u32>) -> Result<()> {
    debug!(%plan_id, day, ?at, "cmd_add: called");
    let (session, _) = open_session(config, plan_id).await?;
    let entry = session.add(draft, day, at).await.context("Failed to add entry")?;
    finish_session(&session).await?;
    println!(
        "{} Added {} to day {} at position {}",
        "✓".green(),
        entry.id.cyan(),
        entry.day,
        entry.order
    );
    Ok(())
}

async fn cmd_move(
    config: &Config,
    plan_id: &str,
    entry_id: &str,
    from_day: u32,
    to_day: u32,
    to_order: u32,
) -> Result<()> {
    debug!(%plan_id, %entry_id, from_day, to_day, to_order, "cmd_move: called");
    let (session, _) = open_session(config, plan_id).await?;
    let mutation = session
        .move_entry(entry_id, from_day, to_day, to_order)
        .await
        .context("Failed to move entry")?;
    finish_session(&session).await?;
    print_mutation("Moved", &mutation);
    Ok(())
}

async fn cmd_delete(config: &Config, plan_id: &str, entry_id: &str) -> Result<()> {
    debug!(%plan_id, %entry_id, "cmd_delete: called");
    let (session, _) = open_session(config, plan_id).await?;
    let mutation = session.delete(entry_id).await.context("Failed to delete entry")?;
    finish_session(&session).await?;
    print_mutation("Deleted", &mutation);
    Ok(())
}

async fn cmd_update(config: &Config, plan_id: &str, entry_id: &str, patch: EntryPatch) -> Result<()> {
    debug!(%plan_id, %entry_id, "cmd_update: called");
    if patch.is_empty() {
        println!("{} No fields given", "-".yellow());
        return Ok(());
    }
    let (session, _) = open_session(config, plan_id).await?;
    let mutation = session.update(entry_id, patch).await.context("Failed to update entry")?;
    finish_session(&session).await?;
    print_mutation("Updated", &mutation);
    Ok(())
}

async fn cmd_edit(config: &Config, plan_id: &str, path: &Path, events: bool, format: OutputFormat) -> Result<()> {
    debug!(%plan_id, ?path, events, ?format, "cmd_edit: called");
    let script = EditScript::load(path)?;
    let (session, _) = open_session(config, plan_id).await?;
    let mut rx = session.events().subscribe();

    let reload = if config.reload.enabled {
        debug!(interval_ms = config.reload.interval_ms, "cmd_edit: starting reload loop");
        Some(spawn_reload_loop(
            session.clone(),
            Duration::from_millis(config.reload.interval_ms),
        ))
    } else {
        None
    };

    let reports = script.run(&session).await.context("Edit script aborted")?;
    let view = session.view().await.context("Failed to read plan")?;
    finish_session(&session).await?;
    if let Some(handle) = reload {
        handle.abort();
    }

    if events {
        while let Ok(event) = rx.try_recv() {
            println!("{}", serde_json::to_string(&event)?);
        }
    }

    let rejected = reports.iter().filter(|r| !r.applied).count();
    if rejected > 0 {
        warn!(rejected, "cmd_edit: some operations were rejected");
    }

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({ "steps": reports, "entries": view.entries });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            for report in &reports {
                let mark = if report.applied { "✓".green() } else { "✗".red() };
                println!("{} {:>3} {:<8} {}", mark, report.index, report.op, report.detail.dimmed());
            }
            println!();
            print_view(&view, format)?;
        }
    }
    Ok(())
}

async fn cmd_feasibility(config: &Config, plan_id: &str) -> Result<()> {
    debug!(%plan_id, "cmd_feasibility: called");
    let (session, view) = open_session(config, plan_id).await?;
    finish_session(&session).await?;

    let problem = SolverProblem::from_plan(&view.plan, &view.entries);
    debug!(
        hotels = problem.hotels.len(),
        attractions = problem.attractions.len(),
        "cmd_feasibility: built problem"
    );
    println!("{}", serde_json::to_string_pretty(&problem)?);
    Ok(())
}
