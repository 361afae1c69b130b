//! INI configuration file.
//!
//! The configuration file lives at `~/.wayline/config.ini` by default:
//!
//! ```ini
//! [navigation]
//! snap_to_route = true
//! step_completion_radius_meters = 5
//!
//! [off_route]
//! tolerance_meters = 20
//! moving_away_threshold = 5
//!
//! [faster_route]
//! enabled = true
//! min_check_interval_millis = 300000
//!
//! [location]
//! acceptable_accuracy_meters = 100
//!
//! [logging]
//! filter = wayline=debug
//! directory = /var/log/wayline
//! ```
//!
//! Missing sections and keys keep their defaults.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::{Ini, Properties};
use thiserror::Error;

use crate::logging::LoggingConfig;
use crate::options::NavigationOptions;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("malformed config: {0}")]
    Syntax(#[from] ini::ParseError),

    #[error("invalid value '{value}' for [{section}] {key}: {reason}")]
    Parse {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Parsed contents of a configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    navigation: NavigationOptions,
    logging: LoggingConfig,
}

impl ConfigFile {
    /// `~/.wayline/config.ini`, or `None` when no home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".wayline").join("config.ini"))
    }

    /// Load from the default path, falling back to defaults if the file is absent.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ini(&ini)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Parse from INI text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut navigation = NavigationOptions::default();
        let mut logging = LoggingConfig::default();

        if let Some(props) = ini.section(Some("navigation")) {
            let section = "navigation";
            set(&mut navigation.snap_to_route, read_bool(props, section, "snap_to_route")?);
            set(
                &mut navigation.step_completion_radius_meters,
                read(props, section, "step_completion_radius_meters")?,
            );
        }

        if let Some(props) = ini.section(Some("off_route")) {
            let section = "off_route";
            let off_route = &mut navigation.off_route;
            set(&mut off_route.tolerance_meters, read(props, section, "tolerance_meters")?);
            set(
                &mut off_route.max_accuracy_bonus_meters,
                read(props, section, "max_accuracy_bonus_meters")?,
            );
            set(
                &mut off_route.maneuver_zone_radius_meters,
                read(props, section, "maneuver_zone_radius_meters")?,
            );
            set(
                &mut off_route.moving_away_threshold,
                read(props, section, "moving_away_threshold")?,
            );
            set(
                &mut off_route.minimum_distance_meters,
                read(props, section, "minimum_distance_meters")?,
            );
            set(&mut off_route.radius_growth_rate, read(props, section, "radius_growth_rate")?);
        }

        if let Some(props) = ini.section(Some("faster_route")) {
            let section = "faster_route";
            let faster = &mut navigation.faster_route;
            set(&mut faster.enabled, read_bool(props, section, "enabled")?);
            set(
                &mut faster.min_check_interval_millis,
                read(props, section, "min_check_interval_millis")?,
            );
            set(&mut faster.min_distance_meters, read(props, section, "min_distance_meters")?);
        }

        if let Some(props) = ini.section(Some("location")) {
            let section = "location";
            let location = &mut navigation.location;
            set(
                &mut location.acceptable_accuracy_meters,
                read(props, section, "acceptable_accuracy_meters")?,
            );
            set(
                &mut location.accuracy_percent_threshold,
                read(props, section, "accuracy_percent_threshold")?,
            );
            set(&mut location.stale_after_millis, read(props, section, "stale_after_millis")?);
            set(&mut location.max_velocity_mps, read(props, section, "max_velocity_mps")?);
            set(
                &mut location.off_route_accuracy_ceiling_meters,
                read(props, section, "off_route_accuracy_ceiling_meters")?,
            );
        }

        if let Some(props) = ini.section(Some("logging")) {
            let section = "logging";
            if let Some(filter) = read_string(props, "filter") {
                logging.filter = filter;
            }
            if let Some(directory) = read_string(props, "directory") {
                logging.directory = Some(PathBuf::from(directory));
            }
            if let Some(prefix) = read_string(props, "file_prefix") {
                logging.file_prefix = prefix;
            }
            set(&mut logging.ansi, read_bool(props, section, "ansi")?);
            if let Some(trace) = read_string(props, "chrome_trace") {
                logging.chrome_trace = Some(PathBuf::from(trace));
            }
        }

        Ok(Self {
            navigation,
            logging,
        })
    }

    /// Validated navigation options.
    pub fn navigation_options(&self) -> Result<NavigationOptions, ConfigError> {
        self.navigation.validate()?;
        Ok(self.navigation.clone())
    }

    /// Validated logging configuration.
    pub fn logging_config(&self) -> Result<LoggingConfig, ConfigError> {
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::invalid("logging.filter", "must not be empty"));
        }
        if self.logging.file_prefix.trim().is_empty() {
            return Err(ConfigError::invalid("logging.file_prefix", "must not be empty"));
        }
        Ok(self.logging.clone())
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn read_string(props: &Properties, key: &str) -> Option<String> {
    props
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn read<T>(props: &Properties, section: &'static str, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = props.get(key).map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<T>().map(Some).map_err(|e| ConfigError::Parse {
        section,
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn read_bool(
    props: &Properties,
    section: &'static str,
    key: &'static str,
) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = props.get(key).map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(Some(true)),
        "false" | "no" | "off" | "0" => Ok(Some(false)),
        _ => Err(ConfigError::Parse {
            section,
            key,
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ConfigFile::parse("").unwrap();
        assert_eq!(config.navigation_options().unwrap(), NavigationOptions::default());
        assert_eq!(config.logging_config().unwrap(), LoggingConfig::default());
    }

    #[test]
    fn test_parse_all_sections() {
        let content = r#"
[navigation]
snap_to_route = false
step_completion_radius_meters = 8

[off_route]
tolerance_meters = 25
moving_away_threshold = 3
radius_growth_rate = 2.0

[faster_route]
enabled = yes
min_check_interval_millis = 60000
min_distance_meters = 250

[location]
max_velocity_mps = 70
stale_after_millis = 2000

[logging]
filter = wayline=trace
directory = /tmp/wayline-logs
ansi = off
"#;
        let config = ConfigFile::parse(content).unwrap();
        let options = config.navigation_options().unwrap();

        assert!(!options.snap_to_route);
        assert_eq!(options.step_completion_radius_meters, 8.0);
        assert_eq!(options.off_route.tolerance_meters, 25.0);
        assert_eq!(options.off_route.moving_away_threshold, 3);
        assert_eq!(options.off_route.radius_growth_rate, 2.0);
        assert_eq!(options.off_route.minimum_distance_meters, 50.0);
        assert!(options.faster_route.enabled);
        assert_eq!(options.faster_route.min_check_interval_millis, 60_000);
        assert_eq!(options.faster_route.min_distance_meters, 250.0);
        assert_eq!(options.location.max_velocity_mps, 70.0);
        assert_eq!(options.location.stale_after_millis, 2_000);

        let logging = config.logging_config().unwrap();
        assert_eq!(logging.filter, "wayline=trace");
        assert_eq!(logging.directory, Some(PathBuf::from("/tmp/wayline-logs")));
        assert!(!logging.ansi);
    }

    #[test]
    fn test_unparsable_value() {
        let err = ConfigFile::parse("[off_route]\ntolerance_meters = wide\n").unwrap_err();
        match err {
            ConfigError::Parse {
                section, key, value, ..
            } => {
                assert_eq!(section, "off_route");
                assert_eq!(key, "tolerance_meters");
                assert_eq!(value, "wide");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_boolean() {
        let err = ConfigFile::parse("[navigation]\nsnap_to_route = maybe\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { key: "snap_to_route", .. }));
    }

    #[test]
    fn test_invalid_value_surfaces_on_validation() {
        let config = ConfigFile::parse("[off_route]\nmoving_away_threshold = 0\n").unwrap();
        assert!(matches!(
            config.navigation_options(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[faster_route]\nenabled = true").unwrap();

        let config = ConfigFile::load_from(file.path()).unwrap();
        assert!(config.navigation_options().unwrap().faster_route.enabled);
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_default_path_under_home() {
        if let Some(path) = ConfigFile::default_path() {
            assert!(path.ends_with(".wayline/config.ini"));
        }
    }
}
