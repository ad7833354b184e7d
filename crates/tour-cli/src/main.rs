use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tour_cli::commands::{busy, draft, evaluate, round, show_config, util};
use tour_cli::{Cli, Commands, Config};
use tour_core::TeamId;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so command output stays parseable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    let mut out = std::io::stdout().lock();

    match &cli.command {
        Commands::Evaluate {
            feed,
            target,
            members,
            start,
            minutes,
            now,
            json,
        } => {
            let tz = config.tz().context("invalid timezone")?;
            let now = util::reference_now(now.as_deref(), tz)?;
            let start = util::parse_time(start, tz, now).context("invalid --start")?;
            let args = evaluate::EvaluateArgs {
                feed,
                resource: util::resource(target)?,
                members: util::agent_ids(members)?,
                start,
                minutes: *minutes,
                now,
                json: *json,
            };
            evaluate::run(&mut out, &config, &args)?;
        }
        Commands::Busy {
            feed,
            team,
            members,
            now,
            json,
        } => {
            let tz = config.tz().context("invalid timezone")?;
            let now = util::reference_now(now.as_deref(), tz)?;
            let team = TeamId::new(team.as_str()).context("invalid --team")?;
            let members = util::agent_ids(members)?;
            busy::run(&mut out, &config, feed, &team, &members, now, *json)?;
        }
        Commands::Round { offset, slot } => {
            round::run(&mut out, *offset, *slot)?;
        }
        Commands::Draft {
            feed,
            script,
            target,
            members,
            edit,
            now,
        } => {
            let tz = config.tz().context("invalid timezone")?;
            let args = draft::DraftArgs {
                feed,
                script,
                resource: util::resource(target)?,
                members: util::agent_ids(members)?,
                edit: edit.as_deref(),
                now: util::reference_now(now.as_deref(), tz)?,
            };
            draft::run(&mut out, &config, &args)?;
        }
        Commands::Config => {
            show_config::run(&mut out, &config)?;
        }
    }

    Ok(())
}
