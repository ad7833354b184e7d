//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tour_core::{AgentId, FeedSnapshot, Resource, TeamCalendar, TeamId};

use crate::{Config, Target};

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^in\s+(\d+)\s+(minute|hour|day)s?$").expect("relative time regex is valid")
});

/// Naive input format, read in the property time zone.
const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parse a time argument.
///
/// Supports:
/// - RFC 3339: "2025-01-15T09:15:00Z"
/// - Naive local time in `timezone`: "2025-01-15 09:15"
/// - Relative to `now`: "in 30 minutes", "in 2 hours", "in 1 day"
pub fn parse_time(s: &str, timezone: Tz, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, NAIVE_FORMAT) {
        let Some(local) = timezone.from_local_datetime(&naive).earliest() else {
            anyhow::bail!("{s} does not exist in {}", timezone.name());
        };
        return Ok(local.with_timezone(&Utc));
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid time: {s}. Use RFC 3339 (e.g., 2025-01-15T09:15:00Z), local time (e.g., '2025-01-15 09:15') or relative (e.g., 'in 2 hours')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now + Duration::minutes(n * minutes_per_unit))
}

/// Resolves `--now`, falling back to the wall clock.
pub fn reference_now(now: Option<&str>, timezone: Tz) -> anyhow::Result<DateTime<Utc>> {
    let wall = Utc::now();
    now.map_or(Ok(wall), |s| parse_time(s, timezone, wall))
        .context("invalid --now")
}

/// Turns `--agent`/`--team` into a resource.
pub fn resource(target: &Target) -> anyhow::Result<Resource> {
    match (&target.agent, &target.team) {
        (Some(agent), None) => Ok(Resource::Agent(AgentId::new(agent.as_str())?)),
        (None, Some(team)) => Ok(Resource::Team(TeamId::new(team.as_str())?)),
        _ => anyhow::bail!("exactly one of --agent or --team is required"),
    }
}

pub fn agent_ids(raw: &[String]) -> anyhow::Result<Vec<AgentId>> {
    raw.iter()
        .map(|id| AgentId::new(id.as_str()).with_context(|| format!("invalid member id {id:?}")))
        .collect()
}

/// The team calendar for `team`.
///
/// Precomputed slots in the feed win; otherwise the grid is built from the
/// feed's team and member events, starting on `first_day`.
pub fn team_calendar(
    snapshot: &FeedSnapshot,
    team: &TeamId,
    members: &[AgentId],
    config: &Config,
    first_day: DateTime<Tz>,
    now: DateTime<Utc>,
) -> anyhow::Result<TeamCalendar> {
    let granularity = config.team_slot().context("invalid team_slot_minutes")?;
    let tz = first_day.timezone();
    if !snapshot.team_slots.is_empty() {
        return snapshot
            .team_calendar(granularity, tz)
            .context("failed to read team slots");
    }

    let team_events = snapshot.team_events(team, tz, now)?;
    let member_events = snapshot.member_events(tz, now)?;
    TeamCalendar::build(
        first_day,
        config.team_calendar_days,
        granularity,
        members,
        &team_events,
        &member_events,
    )
    .context("invalid team_calendar_days")
}
