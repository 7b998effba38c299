//! Waypoint file loading.
//!
//! The file is a YAML mapping of label -> `{position: {x, y}, orientation: {w, z}}`.
//! Entries come back in file order; everything the file does not carry
//! (position z, orientation x and y) stays zero.

use std::{fs, path::Path, time::Duration};

use log::info;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

/// Time stamp in the `builtin_interfaces/Time` layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stamp {
    pub sec: i32,
    pub nanosec: u32,
}

impl Stamp {
    /// Splits a nanosecond clock reading. Seconds saturate at the `i32` range.
    pub fn from_nanos(nanos: i64) -> Self {
        let secs = nanos.div_euclid(1_000_000_000);
        let sec = i32::try_from(secs).unwrap_or(if secs < 0 { i32::MIN } else { i32::MAX });
        Self {
            sec,
            nanosec: nanos.rem_euclid(1_000_000_000) as u32,
        }
    }

    /// Same layout for `builtin_interfaces/Duration`.
    pub fn from_duration(duration: Duration) -> Self {
        Self {
            sec: i32::try_from(duration.as_secs()).unwrap_or(i32::MAX),
            nanosec: duration.subsec_nanos(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub stamp: Stamp,
    pub frame_id: String,
}

impl Header {
    pub fn new(frame_id: impl Into<String>, stamp: Stamp) -> Self {
        Self {
            stamp,
            frame_id: frame_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StampedPose {
    pub header: Header,
    pub pose: Pose,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub label: String,
    pub pose: Pose,
}

impl Waypoint {
    pub fn stamped(&self, header: &Header) -> StampedPose {
        StampedPose {
            header: header.clone(),
            pose: self.pose,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WaypointEntry {
    position: PlanarPosition,
    orientation: PlanarOrientation,
}

#[derive(Debug, Deserialize)]
struct PlanarPosition {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct PlanarOrientation {
    w: f64,
    z: f64,
}

impl WaypointEntry {
    fn into_pose(self) -> Pose {
        Pose {
            position: Point {
                x: self.position.x,
                y: self.position.y,
                ..Point::default()
            },
            orientation: Quaternion {
                w: self.orientation.w,
                z: self.orientation.z,
                ..Quaternion::default()
            },
        }
    }
}

/// Reads and parses the waypoint file at `path`.
pub fn load_waypoints(path: impl AsRef<Path>) -> Result<Vec<Waypoint>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let waypoints = parse_waypoints(&text)?;
    info!("Loaded {} waypoints from {}", waypoints.len(), path.display());
    Ok(waypoints)
}

pub fn parse_waypoints(text: &str) -> Result<Vec<Waypoint>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    // Repeated labels are rejected by the YAML parser as a duplicate key.
    let mapping = match serde_yaml::from_str::<Value>(text)? {
        Value::Null => return Ok(Vec::new()),
        Value::Mapping(mapping) => mapping,
        _ => return Err(Error::NotAMapping),
    };

    mapping
        .into_iter()
        .map(|(key, value)| -> Result<Waypoint> {
            let label = label_of(&key)?;
            let entry: WaypointEntry =
                serde_yaml::from_value(value).map_err(|source| Error::Waypoint {
                    label: label.clone(),
                    source,
                })?;
            info!("{}: {:?}", label, entry);

            Ok(Waypoint {
                label,
                pose: entry.into_pose(),
            })
        })
        .collect()
}

fn label_of(key: &Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        other => Ok(serde_yaml::to_string(other)?.trim_end().to_string()),
    }
}
