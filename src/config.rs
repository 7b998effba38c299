// config.rs

use log::info;
use serde::Deserialize;
use std::{
    env,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::{Error, Result};
use crate::navigator::Timeouts;

pub const DEFAULT_CONFIG_PATH: &str = "./nav_through_poses.toml";

/// Runtime settings, loaded from TOML. Every field has a default so the node
/// runs without a config file.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NavConfig {
    pub node_name: String,
    pub waypoints_file: PathBuf,
    pub frame_id: String,
    // Topic and action names
    pub action_name: String,
    pub marker_topic: String,
    // Waits, unbounded when unset
    pub server_timeout_secs: Option<f64>,
    pub goal_timeout_secs: Option<f64>,
    pub server_poll_ms: u64,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            node_name: "navigate_through_poses_example".to_string(),
            waypoints_file: PathBuf::from("cycle.yaml"),
            frame_id: "map".to_string(),
            action_name: "/navigate_through_poses".to_string(),
            marker_topic: "/waypoints".to_string(),
            server_timeout_secs: None,
            goal_timeout_secs: None,
            server_poll_ms: 100,
        }
    }
}

impl NavConfig {
    /// Loads `$CONFIG_PATH`, or `./nav_through_poses.toml` when present, or
    /// falls back to defaults.
    pub fn load() -> Result<Self> {
        let source = config_source(
            env::var_os("CONFIG_PATH"),
            Path::new(DEFAULT_CONFIG_PATH).exists(),
        );
        match source {
            Some(path) => Self::load_from(path),
            None => {
                info!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&config_str).map_err(|e| match e {
            Error::Config { source, .. } => Error::Config {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(config_str).map_err(|source| Error::Config {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn timeouts(&self) -> Result<Timeouts> {
        Ok(Timeouts {
            server: to_duration("server_timeout_secs", self.server_timeout_secs)?,
            goal: to_duration("goal_timeout_secs", self.goal_timeout_secs)?,
        })
    }

    pub fn server_poll_interval(&self) -> Duration {
        Duration::from_millis(self.server_poll_ms)
    }

    fn validate(&self) -> Result<()> {
        self.timeouts()?;

        if self.server_poll_ms == 0 {
            return Err(Error::ConfigValue {
                field: "server_poll_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.action_name.is_empty() {
            return Err(Error::ConfigValue {
                field: "action_name",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Config file to read: `$CONFIG_PATH` wins, then the default path if it
/// exists. `None` means run on defaults.
fn config_source(env_path: Option<OsString>, default_exists: bool) -> Option<PathBuf> {
    match env_path {
        Some(path) => Some(PathBuf::from(path)),
        None if default_exists => Some(PathBuf::from(DEFAULT_CONFIG_PATH)),
        None => None,
    }
}

fn to_duration(field: &'static str, secs: Option<f64>) -> Result<Option<Duration>> {
    secs.map(|s| {
        Duration::try_from_secs_f64(s).map_err(|_| Error::ConfigValue {
            field,
            reason: format!("{} is not a valid number of seconds", s),
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    #[test]
    fn empty_file_gives_defaults() {
        let config = NavConfig::from_toml("").unwrap();
        assert_eq!(config, NavConfig::default());
        assert_eq!(config.timeouts().unwrap(), Timeouts::default());
        assert_eq!(config.waypoints_file, PathBuf::from("cycle.yaml"));
    }

    #[test]
    fn overrides_and_timeouts() {
        let config = NavConfig::from_toml(
            r#"
            waypoints_file = "loops/figure8.yaml"
            frame_id = "odom"
            server_timeout_secs = 5.0
            goal_timeout_secs = 120
            server_poll_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.frame_id, "odom");
        assert_eq!(config.action_name, "/navigate_through_poses");
        assert_eq!(
            config.timeouts().unwrap(),
            Timeouts {
                server: Some(Duration::from_secs(5)),
                goal: Some(Duration::from_secs(120)),
            }
        );
        assert_eq!(config.server_poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn rejects_negative_timeout() {
        let err = NavConfig::from_toml("goal_timeout_secs = -1.0").unwrap_err();
        assert!(matches!(
            err,
            Error::ConfigValue {
                field: "goal_timeout_secs",
                ..
            }
        ));
    }

    #[test]
    fn rejects_overflowing_timeout() {
        let err = NavConfig::from_toml("goal_timeout_secs = 1e20").unwrap_err();
        assert!(matches!(
            err,
            Error::ConfigValue {
                field: "goal_timeout_secs",
                ..
            }
        ));

        let config = NavConfig {
            server_timeout_secs: Some(f64::MAX),
            ..NavConfig::default()
        };
        assert!(config.timeouts().is_err());
    }

    #[test]
    fn config_path_env_wins() {
        let source = config_source(Some(OsString::from("/etc/nav/run.toml")), true);
        assert_eq!(source, Some(PathBuf::from("/etc/nav/run.toml")));
    }

    #[test]
    fn falls_back_to_default_file_when_present() {
        assert_eq!(
            config_source(None, true),
            Some(PathBuf::from(DEFAULT_CONFIG_PATH))
        );
    }

    #[test]
    fn no_env_and_no_file_means_defaults() {
        assert_eq!(config_source(None, false), None);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = NavConfig::from_toml("waypoint_file = \"typo.yaml\"").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn load_from_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nav.toml");
        fs::write(&path, "server_poll_ms = \"fast\"").unwrap();

        match NavConfig::load_from(&path).unwrap_err() {
            Error::Config { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nav.toml");
        fs::write(&path, "marker_topic = \"/cycle_markers\"\n").unwrap();

        let config = NavConfig::load_from(&path).unwrap();
        assert_eq!(config.marker_topic, "/cycle_markers");
    }
}
