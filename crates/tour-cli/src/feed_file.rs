//! Calendar feed backed by a JSON snapshot on disk.

use std::fs;
use std::path::PathBuf;

use chrono_tz::Tz;
use tour_core::{CalendarFeed, FeedError, FeedSnapshot, Interval, Resource};

/// Reads the whole snapshot on every load; range filtering is left to the
/// conversion helpers.
#[derive(Debug, Clone)]
pub struct JsonFileFeed {
    path: PathBuf,
}

impl JsonFileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CalendarFeed for JsonFileFeed {
    fn load(
        &self,
        resource: &Resource,
        range: &Interval,
        _timezone: Tz,
    ) -> Result<FeedSnapshot, FeedError> {
        let json = fs::read_to_string(&self.path).map_err(|source| FeedError::Io {
            path: self.path.clone(),
            source,
        })?;
        let snapshot = FeedSnapshot::from_json(&json)?;
        tracing::debug!(
            path = %self.path.display(),
            ?resource,
            %range,
            appointments = snapshot.appointments.len(),
            team_slots = snapshot.team_slots.len(),
            "loaded feed snapshot"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use tour_core::{AgentId, day_window};

    fn load(feed: &JsonFileFeed) -> Result<FeedSnapshot, FeedError> {
        let instant = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let resource = Resource::Agent(AgentId::new("ann").unwrap());
        feed.load(&resource, &day_window(instant, chrono_tz::UTC), chrono_tz::UTC)
    }

    #[test]
    fn reads_snapshot_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        fs::write(&path, r#"{"appointments": []}"#).unwrap();

        let snapshot = load(&JsonFileFeed::new(&path)).unwrap();
        assert_eq!(snapshot, FeedSnapshot::default());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&JsonFileFeed::new(dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, FeedError::Io { .. }));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(load(&JsonFileFeed::new(&path)), Err(FeedError::Parse(_))));
    }
}
