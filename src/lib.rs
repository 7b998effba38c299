// ================================
// src/lib.rs
// ================================
pub mod config;
pub mod error;
pub mod markers;
pub mod mission;
pub mod navigator;
pub mod waypoints;

pub use config::NavConfig;
pub use error::{Error, Result};
pub use markers::{MarkerSink, WaypointMarker};
pub use navigator::{GoalClient, GoalStatus, NavigationOutcome, NavigationServer};
pub use waypoints::{load_waypoints, Waypoint};
