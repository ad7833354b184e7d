//! Evaluate command: checks one slot against a feed snapshot.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tour_core::{
    AgentId, AgentSuggestion, AvailabilityEngine, CalendarFeed, Interval, LeastBookedResolver,
    Resource, SlotDecision, SlotRequest, day_window, round_down,
};

use crate::Config;
use crate::commands::util;
use crate::feed_file::JsonFileFeed;

/// Parsed arguments of `tour evaluate`.
#[derive(Debug, Clone)]
pub struct EvaluateArgs<'a> {
    pub feed: &'a Path,
    pub resource: Resource,
    pub members: Vec<AgentId>,
    pub start: DateTime<Utc>,
    pub minutes: Option<u32>,
    pub now: DateTime<Utc>,
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, config: &Config, args: &EvaluateArgs<'_>) -> Result<()> {
    let decision = decide(config, args)?;
    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&decision)?)?;
    } else {
        render(writer, &decision)?;
    }
    Ok(())
}

/// Computes the decision for the requested slot.
pub fn decide(config: &Config, args: &EvaluateArgs<'_>) -> Result<SlotDecision> {
    let tz = config.tz().context("invalid timezone")?;
    let settings = config.engine_settings().context("invalid team_slot_minutes")?;
    let granularity = args.resource.granularity(&settings);

    let start = round_down(args.start, granularity, tz);
    if start != args.start {
        tracing::debug!(requested = %args.start, %start, "snapped start to slot grid");
    }
    let minutes = args.minutes.unwrap_or_else(|| granularity.minutes());
    let interval = Interval::starting_at(start, i64::from(minutes), tz)
        .context("invalid slot length")?;
    let day = day_window(start, tz);

    let snapshot = JsonFileFeed::new(args.feed)
        .load(&args.resource, &day, tz)
        .with_context(|| format!("failed to load feed {}", args.feed.display()))?;
    let request = SlotRequest::new(interval, args.resource.clone());

    let decision = match &args.resource {
        Resource::Agent(agent) => {
            let events = snapshot.agent_events(agent, &day, None, args.now)?;
            AvailabilityEngine::new(LeastBookedResolver::default()).evaluate(&request, &events)
        }
        Resource::Team(team) => {
            let calendar = util::team_calendar(
                &snapshot,
                team,
                &args.members,
                config,
                day.local_start(),
                args.now,
            )?;
            let member_events = snapshot.member_events(tz, args.now)?;
            let engine = AvailabilityEngine::new(LeastBookedResolver::from_events(&member_events))
                .with_roster(team.clone(), args.members.clone());

            let mut events = calendar.busy_events(team, args.now);
            events.extend(member_events);
            if snapshot.team_slots.is_empty() {
                engine.evaluate(&request, &events)
            } else {
                let pool = calendar.available_agents_at(interval.start());
                engine.evaluate_with_candidates(&request, &events, pool)
            }
        }
    };
    Ok(decision)
}

/// Human-readable decision.
pub fn render<W: Write>(writer: &mut W, decision: &SlotDecision) -> Result<()> {
    writeln!(writer, "Slot: {}", decision.interval)?;
    if decision.has_overlap {
        writeln!(writer, "Overlap: yes")?;
        for event in &decision.overlapping_events {
            writeln!(
                writer,
                "  - {} [{}] {}: {}",
                event.id, event.kind, event.interval, event.title
            )?;
        }
    } else {
        writeln!(writer, "Overlap: no")?;
    }

    if let Some(suggestion) = &decision.agent_suggestion {
        let pool = decision
            .candidate_agents
            .iter()
            .map(AgentId::as_str)
            .collect::<Vec<_>>();
        if pool.is_empty() {
            writeln!(writer, "Free agents: none")?;
        } else {
            writeln!(writer, "Free agents: {}", pool.join(", "))?;
        }
        match suggestion {
            AgentSuggestion::Suggested(agent) => writeln!(writer, "Suggested agent: {agent}")?,
            AgentSuggestion::ManualSelectionRequired => {
                writeln!(writer, "Suggested agent: none, choose one manually")?;
            }
        }
    }
    Ok(())
}
