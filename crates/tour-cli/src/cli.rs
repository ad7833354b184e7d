//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Tour scheduling engine driver.
///
/// Runs availability checks, team calendars and draft sessions against a
/// calendar feed snapshot stored as JSON.
#[derive(Debug, Parser)]
#[command(name = "tour", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// The calendar a command works against.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct Target {
    /// Book against a single agent's calendar.
    #[arg(long)]
    pub agent: Option<String>,

    /// Book against a team's calendar.
    #[arg(long)]
    pub team: Option<String>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check whether a slot can be booked.
    Evaluate {
        /// Calendar feed snapshot (JSON).
        #[arg(long)]
        feed: PathBuf,

        #[command(flatten)]
        target: Target,

        /// Team member that can take the appointment (repeatable).
        #[arg(long = "member")]
        members: Vec<String>,

        /// Slot start: RFC 3339, "YYYY-MM-DD HH:MM" or "in N hours".
        #[arg(long)]
        start: String,

        /// Slot length in minutes. Defaults to the resource's slot size.
        #[arg(long)]
        minutes: Option<u32>,

        /// Reference instant for past/future tagging. Defaults to now.
        #[arg(long)]
        now: Option<String>,

        /// Print the decision as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the merged all-agents-busy blocks of a team.
    Busy {
        /// Calendar feed snapshot (JSON).
        #[arg(long)]
        feed: PathBuf,

        /// Team whose calendar is listed.
        #[arg(long)]
        team: String,

        /// Team member (repeatable); used when the feed has no team slots.
        #[arg(long = "member")]
        members: Vec<String>,

        /// Reference instant; the calendar starts on its local day.
        #[arg(long)]
        now: Option<String>,

        /// Print the blocks as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Floor a minute offset to the slot grid.
    Round {
        /// Raw offset in minutes from the start of the block.
        #[arg(long, allow_negative_numbers = true)]
        offset: i64,

        /// Slot length in minutes.
        #[arg(long, default_value_t = tour_core::AGENT_SLOT_MINUTES)]
        slot: u32,
    },

    /// Replay a scripted draft session.
    Draft {
        /// Calendar feed snapshot (JSON).
        #[arg(long)]
        feed: PathBuf,

        /// JSON list of draft actions.
        #[arg(long)]
        script: PathBuf,

        #[command(flatten)]
        target: Target,

        /// Team member that can take the appointment (repeatable).
        #[arg(long = "member")]
        members: Vec<String>,

        /// Stored appointment to edit (JSON).
        #[arg(long)]
        edit: Option<PathBuf>,

        /// Reference instant. Defaults to now.
        #[arg(long)]
        now: Option<String>,
    },

    /// Print the effective configuration.
    Config,
}
