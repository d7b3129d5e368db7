//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::domain::{EntryKind, EntryPatch};

/// ie - reconcile and edit generated trip itineraries
#[derive(Parser)]
#[command(
    name = "ie",
    about = "Reconcile and edit generated trip itineraries",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Normalize a generated plan document without storing it
    Normalize {
        /// JSON document produced by the generation service
        file: PathBuf,

        /// Trip length in days (default: normalizer.default-duration-days)
        #[arg(short, long)]
        days: Option<u32>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Store a plan and its normalized entries
    Import {
        /// Plan JSON, or a bare generated document
        file: PathBuf,

        #[command(flatten)]
        trip: TripArgs,
    },

    /// List stored plans
    Plans {
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a plan's itinerary
    Show {
        plan: String,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Add an entry to a day
    Add {
        plan: String,

        /// Day to add to (1-based)
        #[arg(short, long)]
        day: u32,

        /// Position within the day (default: append)
        #[arg(short, long)]
        at: Option<u32>,

        /// hotel, attraction, restaurant or activity
        #[arg(short, long, default_value = "activity")]
        kind: EntryKind,

        #[arg(short, long)]
        name: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        time: Option<String>,

        #[arg(long)]
        cost: Option<String>,
    },

    /// Move an entry within or across days
    Move {
        plan: String,

        entry: String,

        #[arg(long)]
        from_day: u32,

        #[arg(long)]
        to_day: u32,

        #[arg(long, default_value = "0")]
        to_order: u32,
    },

    /// Delete an entry
    Delete { plan: String, entry: String },

    /// Change an entry's display fields
    Update {
        plan: String,

        entry: String,

        #[command(flatten)]
        fields: UpdateArgs,
    },

    /// Apply a YAML script of edits (add, move, delete, update, undo, redo)
    Edit {
        plan: String,

        script: PathBuf,

        /// Print editor events as JSON lines
        #[arg(long)]
        events: bool,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the constraint-solver request for a plan
    Feasibility { plan: String },
}

/// Trip parameters for `import` when the file is a bare document
#[derive(Debug, Clone, Args)]
pub struct TripArgs {
    /// Plan id (default: generated from destination)
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub destination: Option<String>,

    #[arg(short, long)]
    pub days: Option<u32>,

    /// Total budget
    #[arg(long)]
    pub budget: Option<f64>,

    /// Traveller preference, repeatable
    #[arg(long = "preference")]
    pub preferences: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct UpdateArgs {
    #[arg(long)]
    pub kind: Option<EntryKind>,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub time: Option<String>,

    #[arg(long)]
    pub duration: Option<String>,

    #[arg(long)]
    pub cost: Option<String>,
}

impl UpdateArgs {
    pub fn into_patch(self) -> EntryPatch {
        EntryPatch {
            kind: self.kind,
            name: self.name,
            description: self.description,
            location: self.location,
            time: self.time,
            duration: self.duration,
            cost: self.cost,
            ..Default::default()
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("itinerary")
        .join("logs")
        .join("itinerary.log")
}

/// Output format for listing commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
