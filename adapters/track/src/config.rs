use std::{
    fs,
    path::{Path, PathBuf},
};

use arcade_racer_core::{LevelInfo, Modifiers, RaceRules};
use serde::Deserialize;
use thiserror::Error;

use crate::LevelList;

/// Errors raised while loading or validating a race configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read race configuration at {}", path.display())]
    Io {
        /// Location of the file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or does not match the expected layout.
    #[error("failed to parse race configuration")]
    Parse(#[from] toml::de::Error),
    /// The level table is empty.
    #[error("race configuration defines no levels")]
    NoLevels,
    /// A level declares zero lanes.
    #[error("level {level} has no lanes")]
    NoLanes {
        /// Position of the offending level.
        level: usize,
    },
    /// A level declares a negative or non-finite traffic density.
    #[error("level {level} has invalid traffic density {density}")]
    InvalidDensity {
        /// Position of the offending level.
        level: usize,
        /// Declared density.
        density: f32,
    },
    /// A length or duration that must be strictly positive is not.
    #[error("`{field}` must be positive, got {value}")]
    NotPositive {
        /// Name of the offending field.
        field: &'static str,
        /// Declared value.
        value: f32,
    },
}

/// Shape of the procedurally generated track.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Seed of the object placement generator.
    pub seed: u64,
    /// Number of segments.
    pub segment_count: u32,
    /// Longitudinal length of a single segment.
    pub segment_length: f32,
    /// Minimum drivable half-width of the road.
    pub road_width: f32,
    /// Peak lateral curvature.
    pub curve_amplitude: f32,
    /// Segments per full curve cycle.
    pub curve_wavelength: f32,
    /// Peak hill height.
    pub hill_amplitude: f32,
    /// Segments per full hill cycle.
    pub hill_wavelength: f32,
    /// Segments between track objects; zero places none.
    pub object_spacing: u32,
    /// Segments between side streets; zero places none.
    pub side_street_spacing: u32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            seed: 0x7ac4,
            segment_count: 32_000,
            segment_length: 100.0,
            road_width: 2_400.0,
            curve_amplitude: 0.3,
            curve_wavelength: 420.0,
            hill_amplitude: 300.0,
            hill_wavelength: 400.0,
            object_spacing: 35,
            side_street_spacing: 1_500,
        }
    }
}

/// Everything needed to set up a race, as stored on disk.
///
/// Every field has a default, so an empty document describes a playable race.
///
/// ```toml
/// enhanced = true
///
/// [rules]
/// checkpoint_distance = 250000.0
///
/// [[levels]]
/// lane_count = 3
/// traffic_density = 0.7
///
/// [track]
/// curve_amplitude = 2.0
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Numeric race rules.
    pub rules: RaceRules,
    /// Caps the checkpoint time bank.
    pub enhanced: bool,
    /// Level table indexed by checkpoints crossed.
    pub levels: Vec<LevelInfo>,
    /// Procedural track shape.
    pub track: TrackConfig,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            rules: RaceRules::default(),
            enhanced: false,
            levels: default_levels(),
            track: TrackConfig::default(),
        }
    }
}

fn default_levels() -> Vec<LevelInfo> {
    [
        (3, 0.7),
        (2, 1.0),
        (3, 1.0),
        (4, 1.2),
        (3, 1.4),
        (2, 0.8),
        (4, 1.5),
        (5, 1.6),
        (3, 1.2),
        (4, 1.8),
    ]
    .into_iter()
    .map(|(lane_count, traffic_density)| LevelInfo {
        lane_count,
        traffic_density,
    })
    .collect()
}

impl RaceConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the configuration stored at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Checks the invariants the simulation relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.levels.is_empty() {
            return Err(ConfigError::NoLevels);
        }
        for (level, info) in self.levels.iter().enumerate() {
            if info.lane_count == 0 {
                return Err(ConfigError::NoLanes { level });
            }
            if !info.traffic_density.is_finite() || info.traffic_density < 0.0 {
                return Err(ConfigError::InvalidDensity {
                    level,
                    density: info.traffic_density,
                });
            }
        }

        let positive = [
            ("rules.lane_width", self.rules.lane_width),
            ("rules.checkpoint_distance", self.rules.checkpoint_distance),
            ("rules.starting_time", self.rules.starting_time),
            ("track.segment_length", self.track.segment_length),
            ("track.road_width", self.track.road_width),
            ("track.curve_wavelength", self.track.curve_wavelength),
            ("track.hill_wavelength", self.track.hill_wavelength),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        Ok(())
    }

    /// Level lookup built from the configured table.
    #[must_use]
    pub fn level_list(&self) -> LevelList {
        LevelList::new(self.levels.clone())
    }

    /// Race modifiers implied by the configuration.
    #[must_use]
    pub fn modifiers(&self) -> Modifiers {
        Modifiers {
            enhanced: self.enhanced,
            ..Modifiers::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = RaceConfig::from_toml_str("").expect("empty config parses");
        assert_eq!(config, RaceConfig::default());
        assert_eq!(config.levels.len(), 10);
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let config = RaceConfig::from_toml_str(
            r#"
            enhanced = true

            [rules]
            checkpoint_distance = 1000.0

            [track]
            hill_amplitude = 0.0
            "#,
        )
        .expect("config parses");

        assert!(config.modifiers().enhanced);
        assert_eq!(config.rules.checkpoint_distance, 1_000.0);
        assert_eq!(config.rules.lane_width, RaceRules::default().lane_width);
        assert_eq!(config.track.hill_amplitude, 0.0);
        assert_eq!(config.track.segment_length, 100.0);
    }

    #[test]
    fn zero_lane_levels_are_rejected() {
        let error = RaceConfig::from_toml_str(
            r#"
            [[levels]]
            lane_count = 2
            traffic_density = 1.0

            [[levels]]
            lane_count = 0
            traffic_density = 1.0
            "#,
        )
        .expect_err("zero lanes must be rejected");
        assert!(matches!(error, ConfigError::NoLanes { level: 1 }));
    }

    #[test]
    fn non_positive_lengths_are_rejected() {
        let error = RaceConfig::from_toml_str("[track]\nsegment_length = 0.0\n")
            .expect_err("zero segment length must be rejected");
        assert!(matches!(
            error,
            ConfigError::NotPositive {
                field: "track.segment_length",
                ..
            }
        ));
        assert_eq!(
            error.to_string(),
            "`track.segment_length` must be positive, got 0"
        );
    }

    #[test]
    fn malformed_documents_report_parse_errors() {
        let error = RaceConfig::from_toml_str("levels = 3").expect_err("wrong type");
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn explicit_empty_level_table_is_rejected() {
        let error = RaceConfig::from_toml_str("levels = []").expect_err("no levels");
        assert!(matches!(error, ConfigError::NoLevels));
    }
}
