/// Service configuration.
///
/// Loaded from a TOML file (default `profile.toml`). Every key has a
/// default, so an empty file, or no file at all, yields a working setup:
/// 15 m proximity threshold, 1 m depth buckets, mean reducer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogLevel;
use crate::model::ProfileError;

/// Default radius for merging readings into one site. Handheld GPS units
/// used on the pond wander by roughly this much between visits.
pub const DEFAULT_PROXIMITY_THRESHOLD_M: f64 = 15.0;

pub const DEFAULT_BUCKET_WIDTH_M: f64 = 1.0;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// How readings in one depth bucket are collapsed into a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    #[default]
    Mean,
    /// Robust against single-sample spikes (bubbles, sediment contact).
    Median,
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Mean => write!(f, "mean"),
            Reducer::Median => write!(f, "median"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub proximity_threshold_m: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_m: DEFAULT_PROXIMITY_THRESHOLD_M,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilesConfig {
    pub bucket_width_m: f64,
    pub reducer: Reducer,
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            bucket_width_m: DEFAULT_BUCKET_WIDTH_M,
            reducer: Reducer::Mean,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// debug | info | warning | error
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: false,
        }
    }
}

impl LoggingConfig {
    pub fn log_level(&self) -> Result<LogLevel, ProfileError> {
        self.level
            .parse()
            .map_err(ProfileError::InvalidConfiguration)
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the raw sonde CSV exports.
    pub data_dir: Option<PathBuf>,
    pub clustering: ClusteringConfig,
    pub profiles: ProfilesConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ProfileError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| ProfileError::InvalidConfiguration(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ProfileError::InvalidConfiguration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Rejects values the resolver and aggregator cannot work with.
    pub fn validate(&self) -> Result<(), ProfileError> {
        validate_positive("clustering.proximity_threshold_m", self.clustering.proximity_threshold_m)?;
        validate_positive("profiles.bucket_width_m", self.profiles.bucket_width_m)?;
        self.logging.log_level()?;
        Ok(())
    }
}

/// Shared by `Config::validate` and the resolver/aggregator constructors.
pub(crate) fn validate_positive(name: &str, value: f64) -> Result<(), ProfileError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ProfileError::InvalidConfiguration(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.clustering.proximity_threshold_m, 15.0);
        assert_eq!(config.profiles.bucket_width_m, 1.0);
        assert_eq!(config.profiles.reducer, Reducer::Mean);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = Config::from_toml_str("").expect("empty TOML is valid");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_full_document_is_parsed() {
        let toml = r#"
            data_dir = "Webber Pond/Raw"

            [clustering]
            proximity_threshold_m = 50.0

            [profiles]
            bucket_width_m = 0.5
            reducer = "median"

            [logging]
            level = "debug"
            file = "profile.log"
            timestamps = true
        "#;
        let config = Config::from_toml_str(toml).expect("valid config");
        assert_eq!(config.data_dir, Some(PathBuf::from("Webber Pond/Raw")));
        assert_eq!(config.clustering.proximity_threshold_m, 50.0);
        assert_eq!(config.profiles.bucket_width_m, 0.5);
        assert_eq!(config.profiles.reducer, Reducer::Median);
        assert_eq!(config.logging.log_level(), Ok(LogLevel::Debug));
        assert_eq!(config.logging.file.as_deref(), Some("profile.log"));
    }

    #[test]
    fn test_non_positive_threshold_is_rejected() {
        let err = Config::from_toml_str("[clustering]\nproximity_threshold_m = 0.0\n").unwrap_err();
        assert!(matches!(err, ProfileError::InvalidConfiguration(_)), "got {:?}", err);

        let err = Config::from_toml_str("[clustering]\nproximity_threshold_m = -5.0\n").unwrap_err();
        assert!(matches!(err, ProfileError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_non_positive_bucket_width_is_rejected() {
        let err = Config::from_toml_str("[profiles]\nbucket_width_m = 0.0\n").unwrap_err();
        assert!(matches!(err, ProfileError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_unknown_reducer_is_rejected() {
        let err = Config::from_toml_str("[profiles]\nreducer = \"mode\"\n").unwrap_err();
        assert!(matches!(err, ProfileError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let err = Config::from_toml_str("[logging]\nlevel = \"chatty\"\n").unwrap_err();
        assert!(matches!(err, ProfileError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.toml");
        std::fs::write(&path, "[profiles]\nreducer = \"median\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.profiles.reducer, Reducer::Median);
    }

    #[test]
    fn test_nan_is_not_positive() {
        assert!(validate_positive("x", f64::NAN).is_err());
        assert!(validate_positive("x", f64::INFINITY).is_err());
        assert!(validate_positive("x", 0.001).is_ok());
    }
}
