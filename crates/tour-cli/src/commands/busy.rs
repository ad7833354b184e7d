//! Busy command: lists the merged all-agents-busy blocks of a team.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tour_core::{AgentId, CalendarEvent, CalendarFeed, Resource, TeamId, day_window};

use crate::Config;
use crate::commands::util;
use crate::feed_file::JsonFileFeed;

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    feed: &Path,
    team: &TeamId,
    members: &[AgentId],
    now: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    let busy = busy_blocks(config, feed, team, members, now)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&busy)?)?;
        return Ok(());
    }

    if busy.is_empty() {
        writeln!(writer, "No busy blocks.")?;
        return Ok(());
    }
    for event in &busy {
        let marker = if event.is_past { " (past)" } else { "" };
        writeln!(writer, "{}  {}{marker}", event.interval, event.title)?;
    }
    Ok(())
}

/// Blocked team slots, merged, from the local day of `now` onwards.
pub fn busy_blocks(
    config: &Config,
    feed: &Path,
    team: &TeamId,
    members: &[AgentId],
    now: DateTime<Utc>,
) -> Result<Vec<CalendarEvent>> {
    let tz = config.tz().context("invalid timezone")?;
    let day = day_window(now, tz);
    let snapshot = JsonFileFeed::new(feed)
        .load(&Resource::Team(team.clone()), &day, tz)
        .with_context(|| format!("failed to load feed {}", feed.display()))?;
    let calendar = util::team_calendar(&snapshot, team, members, config, day.local_start(), now)?;
    Ok(calendar.busy_events(team, now))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use chrono::TimeZone;
    use insta::assert_snapshot;

    const SLOTS_FEED: &str = r#"{
        "teamSlots": [
            {"startDate": "2025-01-15T09:00:00Z", "endDate": "2025-01-15T10:00:00Z", "availableAgents": []},
            {"startDate": "2025-01-15T10:00:00Z", "endDate": "2025-01-15T11:00:00Z", "isTeam": true},
            {"startDate": "2025-01-15T11:00:00Z", "endDate": "2025-01-15T12:00:00Z", "isTeam": true},
            {"startDate": "2025-01-15T12:00:00Z", "endDate": "2025-01-15T13:00:00Z", "availableAgents": ["ann"]},
            {"startDate": "2025-01-15T13:00:00Z", "endDate": "2025-01-15T14:00:00Z", "availableAgents": []}
        ]
    }"#;

    fn team() -> TeamId {
        TeamId::new("leasing").unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, hour, 0, 0).unwrap()
    }

    fn run_with(feed: &str, now: DateTime<Utc>) -> String {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        fs::write(&path, feed).unwrap();
        let mut output = Vec::new();
        run(&mut output, &Config::default(), &path, &team(), &[], now, false).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn merges_blocks_but_not_across_now() {
        let output = run_with(SLOTS_FEED, at(10));
        assert_snapshot!(output, @r"
        2025-01-15 09:00-10:00 UTC  All agents busy (past)
        2025-01-15 10:00-12:00 UTC  All agents busy
        2025-01-15 13:00-14:00 UTC  All agents busy
        ");
    }

    #[test]
    fn builds_grid_from_events_without_slots() {
        let feed = r#"{
            "userEvents": [
                {"id": "p1", "userId": "ann", "startDate": "2025-01-15T12:00:00Z", "endDate": "2025-01-15T13:30:00Z"}
            ]
        }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        fs::write(&path, feed).unwrap();
        let ann = [AgentId::new("ann").unwrap()];
        let config = Config {
            team_calendar_days: 1,
            ..Config::default()
        };

        let busy = busy_blocks(&config, &path, &team(), &ann, at(6)).unwrap();
        assert_eq!(busy.len(), 1);
        assert_eq!(busy[0].interval.start(), at(12));
        assert_eq!(busy[0].interval.end(), at(14));
    }

    #[test]
    fn empty_feed_has_no_blocks() {
        let output = run_with(r#"{"teamSlots": [
            {"startDate": "2025-01-15T09:00:00Z", "endDate": "2025-01-15T10:00:00Z", "availableAgents": ["ann"]}
        ]}"#, at(6));
        assert_snapshot!(output, @"No busy blocks.");
    }
}
