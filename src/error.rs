use std::{io, path::PathBuf, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid waypoint file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid waypoint '{label}': {source}")]
    Waypoint {
        label: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("waypoint file must be a mapping of label -> pose")]
    NotAMapping,

    #[error("invalid config at {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value for {field}: {reason}")]
    ConfigValue { field: &'static str, reason: String },

    #[error("action server {action} not available after {waited:?}")]
    ServerUnavailable { action: String, waited: Duration },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("interrupted before the goal resolved")]
    Interrupted,
}

pub type Result<T> = core::result::Result<T, Error>;
