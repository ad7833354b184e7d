//! Configuration loading and management.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tour_core::{
    DEFAULT_TEAM_SLOT_MINUTES, EngineSettings, IntervalError, SlotError, SlotGranularity, TourType,
    parse_timezone,
};

/// Per-property scheduling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// IANA time zone of the property.
    pub timezone: String,
    /// Team-mode slot length in minutes.
    pub team_slot_minutes: u32,
    /// Days covered by a team calendar.
    pub team_calendar_days: u32,
    /// Whether a tour type is required before submitting.
    pub require_tour_type: bool,
    /// Tour types enabled for the property.
    pub tour_types: Vec<TourType>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            team_slot_minutes: DEFAULT_TEAM_SLOT_MINUTES,
            team_calendar_days: 3,
            require_tour_type: true,
            tour_types: TourType::SELECTABLE.to_vec(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("TOUR_"));

        figment.extract()
    }

    pub fn tz(&self) -> Result<Tz, IntervalError> {
        parse_timezone(&self.timezone)
    }

    pub fn team_slot(&self) -> Result<SlotGranularity, SlotError> {
        SlotGranularity::new(self.team_slot_minutes)
    }

    pub fn engine_settings(&self) -> Result<EngineSettings, SlotError> {
        Ok(EngineSettings {
            team_slot: self.team_slot()?,
            require_tour_type: self.require_tour_type,
        })
    }
}

/// Returns the platform-specific config directory for tour.
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tour"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.tz().unwrap(), chrono_tz::UTC);
        assert_eq!(config.team_slot().unwrap().minutes(), 60);
        assert!(config.engine_settings().unwrap().require_tour_type);
        assert!(!config.tour_types.contains(&TourType::ImportedTour));
    }

    #[test]
    fn config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "timezone = \"America/Chicago\"\nteam_slot_minutes = 30\ntour_types = [\"virtualTour\"]"
        )
        .unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.tz().unwrap(), chrono_tz::America::Chicago);
        assert_eq!(config.team_slot().unwrap().minutes(), 30);
        assert_eq!(config.tour_types, vec![TourType::VirtualTour]);
        assert_eq!(config.team_calendar_days, 3);
    }

    #[test]
    fn invalid_values_surface_as_errors() {
        let config = Config {
            timezone: "Mars/Olympus".to_string(),
            team_slot_minutes: 0,
            ..Config::default()
        };
        assert!(config.tz().is_err());
        assert!(config.engine_settings().is_err());
    }

    #[test]
    fn dirs_config_path_ends_with_tour() {
        let path = dirs_config_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "tour");
    }
}
