//! RViz markers for the waypoint list.
//!
//! Every waypoint gets an arrow, a sphere and a `wp_<i>` label. Ids run
//! from 0 across the whole set so a later run replaces the same markers.

use std::time::Duration;

use log::debug;

use crate::error::Result;
use crate::waypoints::{Header, Pose, Waypoint};

const GREEN: ColorRgba = ColorRgba::new(0.0, 1.0, 0.0, 1.0);
const RED: ColorRgba = ColorRgba::new(1.0, 0.0, 0.0, 1.0);

/// `visualization_msgs/Marker` type codes used here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(i32)]
pub enum MarkerKind {
    #[default]
    Arrow = 0,
    Sphere = 2,
    TextViewFacing = 9,
}

/// `visualization_msgs/Marker` action codes used here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(i32)]
pub enum MarkerAction {
    #[default]
    Add = 0,
    DeleteAll = 3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Scale {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn uniform(s: f64) -> Self {
        Self::new(s, s, s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointMarker {
    pub header: Header,
    pub ns: String,
    pub id: i32,
    pub kind: MarkerKind,
    pub action: MarkerAction,
    pub pose: Pose,
    pub scale: Scale,
    pub color: ColorRgba,
    /// Zero keeps the marker until it is deleted.
    pub lifetime: Duration,
    pub frame_locked: bool,
    pub text: String,
}

/// Anything that can put a marker array on the wire.
pub trait MarkerSink {
    fn publish(&self, markers: &[WaypointMarker]) -> Result<()>;
}

pub fn build_waypoint_markers(header: &Header, waypoints: &[Waypoint]) -> Vec<WaypointMarker> {
    let mut markers = Vec::with_capacity(waypoints.len() * 3);
    let mut next_id: i32 = 0;

    for (i, waypoint) in waypoints.iter().enumerate() {
        let mut marker = |kind, scale, color, text: String| {
            let id = next_id;
            next_id += 1;
            WaypointMarker {
                header: header.clone(),
                id,
                kind,
                action: MarkerAction::Add,
                pose: waypoint.pose,
                scale,
                color,
                text,
                ..WaypointMarker::default()
            }
        };

        markers.push(marker(
            MarkerKind::Arrow,
            Scale::new(0.3, 0.05, 0.02),
            GREEN,
            String::new(),
        ));
        markers.push(marker(
            MarkerKind::Sphere,
            Scale::uniform(0.05),
            RED,
            String::new(),
        ));
        markers.push(marker(
            MarkerKind::TextViewFacing,
            Scale::uniform(0.07),
            GREEN,
            format!("wp_{}", i),
        ));
    }

    markers
}

pub fn clear_all_marker() -> WaypointMarker {
    WaypointMarker {
        action: MarkerAction::DeleteAll,
        ..WaypointMarker::default()
    }
}

/// Arrays to publish, in order. Stale markers are only cleared when there
/// is something new to draw.
pub fn marker_batches(markers: Vec<WaypointMarker>) -> Vec<Vec<WaypointMarker>> {
    if markers.is_empty() {
        vec![markers]
    } else {
        vec![vec![clear_all_marker()], markers]
    }
}

/// Publishes the marker set for `waypoints`. Returns the number of markers drawn.
pub fn publish_waypoint_markers<S: MarkerSink>(
    sink: &S,
    header: &Header,
    waypoints: &[Waypoint],
) -> Result<usize> {
    let markers = build_waypoint_markers(header, waypoints);
    let count = markers.len();

    for batch in marker_batches(markers) {
        sink.publish(&batch)?;
    }

    debug!("Published {} waypoint markers", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;

    use crate::waypoints::{Point, Quaternion, Stamp};

    #[derive(Default)]
    struct RecordingSink {
        published: RefCell<Vec<Vec<WaypointMarker>>>,
    }

    impl MarkerSink for RecordingSink {
        fn publish(&self, markers: &[WaypointMarker]) -> Result<()> {
            self.published.borrow_mut().push(markers.to_vec());
            Ok(())
        }
    }

    fn waypoint(label: &str, x: f64, y: f64) -> Waypoint {
        Waypoint {
            label: label.to_string(),
            pose: Pose {
                position: Point { x, y, z: 0.0 },
                orientation: Quaternion {
                    w: 1.0,
                    ..Quaternion::default()
                },
            },
        }
    }

    fn map_header() -> Header {
        Header::new("map", Stamp { sec: 12, nanosec: 0 })
    }

    #[test]
    fn three_markers_per_waypoint_with_increasing_ids() {
        let waypoints = vec![
            waypoint("a", 0.0, 0.0),
            waypoint("b", 1.0, 0.0),
            waypoint("c", 2.0, 1.0),
        ];
        let markers = build_waypoint_markers(&map_header(), &waypoints);

        assert_eq!(markers.len(), 9);
        let ids: Vec<i32> = markers.iter().map(|m| m.id).collect();
        assert_eq!(ids, (0..9).collect::<Vec<_>>());

        for (i, chunk) in markers.chunks(3).enumerate() {
            assert_eq!(chunk[0].kind, MarkerKind::Arrow);
            assert_eq!(chunk[1].kind, MarkerKind::Sphere);
            assert_eq!(chunk[2].kind, MarkerKind::TextViewFacing);
            assert_eq!(chunk[2].text, format!("wp_{}", i));
            assert!(chunk.iter().all(|m| m.pose == waypoints[i].pose));
        }
    }

    #[test]
    fn markers_share_header_and_are_persistent() {
        let markers = build_waypoint_markers(&map_header(), &[waypoint("a", 1.0, 2.0)]);

        for marker in &markers {
            assert_eq!(marker.header, map_header());
            assert_eq!(marker.action, MarkerAction::Add);
            assert_eq!(marker.lifetime, Duration::ZERO);
            assert!(!marker.frame_locked);
            assert!(marker.ns.is_empty());
        }
        assert_eq!(markers[0].scale, Scale::new(0.3, 0.05, 0.02));
        assert_eq!(markers[0].color, GREEN);
        assert_eq!(markers[1].scale, Scale::uniform(0.05));
        assert_eq!(markers[1].color, RED);
        assert_eq!(markers[2].scale, Scale::uniform(0.07));
    }

    #[test]
    fn marker_codes_match_visualization_msgs() {
        assert_eq!(MarkerKind::Arrow as i32, 0);
        assert_eq!(MarkerKind::Sphere as i32, 2);
        assert_eq!(MarkerKind::TextViewFacing as i32, 9);
        assert_eq!(MarkerAction::Add as i32, 0);
        assert_eq!(MarkerAction::DeleteAll as i32, 3);
    }

    #[test]
    fn clears_before_drawing() {
        let sink = RecordingSink::default();
        let drawn =
            publish_waypoint_markers(&sink, &map_header(), &[waypoint("a", 1.0, 2.0)]).unwrap();

        assert_eq!(drawn, 3);
        let published = sink.published.borrow();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0], vec![clear_all_marker()]);
        assert_eq!(published[1].len(), 3);
    }

    #[test]
    fn no_waypoints_skips_clear() {
        let sink = RecordingSink::default();
        let drawn = publish_waypoint_markers(&sink, &map_header(), &[]).unwrap();

        assert_eq!(drawn, 0);
        let published = sink.published.borrow();
        assert_eq!(published.len(), 1);
        assert!(published[0].is_empty());
    }
}
