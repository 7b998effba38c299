// ================================
// src/ros.rs - rclrs side of the node
// ================================
use std::{
    future::Future,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use geometry_msgs::msg::{Pose as PoseMsg, PoseStamped};
use log::{error, info, warn};
use nav2_msgs::action::NavigateThroughPoses;
use rclrs::*;
use rosidl_runtime_rs::Action;
use std_msgs::msg::Header as HeaderMsg;
use tokio::sync::mpsc;
use visualization_msgs::msg::{Marker, MarkerArray};

use nav_through_poses::{
    markers::{MarkerSink, WaypointMarker},
    navigator::{GoalStatus, NavigationFeedback, NavigationGoal, NavigationServer},
    waypoints::{Header, Pose, Stamp, StampedPose},
    Error as NavError, Result as NavResult,
};

type NavigateGoal = <NavigateThroughPoses as Action>::Goal;

/// Owns the rclrs context for the lifetime of the run. Dropping it halts
/// the executor and joins its thread, whichever way `main` exits.
pub struct RosSession {
    node: Node,
    commands: Arc<ExecutorCommands>,
    executor: Option<Executor>,
    spin_thread: Option<JoinHandle<Vec<RclrsError>>>,
}

impl RosSession {
    pub fn new(node_name: &str) -> Result<Self, RclrsError> {
        let executor = Context::default_from_env()?.create_basic_executor();
        let node = executor.create_node(node_name)?;
        let commands = executor.commands().clone();

        Ok(Self {
            node,
            commands,
            executor: Some(executor),
            spin_thread: None,
        })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn stamp(&self) -> Stamp {
        Stamp::from_nanos(self.node.get_clock().now().nsec)
    }

    /// Feedback and results are only delivered while this runs.
    pub fn spin_in_background(&mut self) {
        if let Some(mut executor) = self.executor.take() {
            self.spin_thread = Some(thread::spawn(move || executor.spin(SpinOptions::default())));
        }
    }
}

impl Drop for RosSession {
    fn drop(&mut self) {
        self.commands.halt_spinning();

        if let Some(handle) = self.spin_thread.take() {
            match handle.join() {
                Ok(errors) => {
                    if let Err(e) = errors.first_error() {
                        warn!("Executor stopped with error: {}", e);
                    }
                }
                Err(_) => error!("Executor thread panicked"),
            }
        }
        info!("ROS session shut down");
    }
}

pub struct RosMarkerPublisher {
    publisher: Publisher<MarkerArray>,
}

impl RosMarkerPublisher {
    /// Latched so RViz instances started later still get the last set.
    pub fn new(node: &Node, topic: &str) -> Result<Self, RclrsError> {
        let publisher = node.create_publisher::<MarkerArray>(
            topic.reliable().transient_local().keep_last(1),
        )?;
        Ok(Self { publisher })
    }
}

impl MarkerSink for RosMarkerPublisher {
    fn publish(&self, markers: &[WaypointMarker]) -> NavResult<()> {
        let mut marker_array = MarkerArray::default();
        marker_array.markers = markers.iter().map(marker_msg).collect();

        self.publisher.publish(&marker_array).map_err(transport)
    }
}

pub struct RosNavigationServer {
    client: ActionClient<NavigateThroughPoses>,
    poll_interval: Duration,
}

impl RosNavigationServer {
    pub fn new(node: &Node, action_name: &str, poll_interval: Duration) -> Result<Self, RclrsError> {
        let client = node.create_action_client::<NavigateThroughPoses>(action_name)?;
        Ok(Self {
            client,
            poll_interval,
        })
    }
}

impl NavigationServer for RosNavigationServer {
    fn wait_for_server(&self) -> impl Future<Output = NavResult<()>> {
        async move {
            while !self.client.server_is_ready().map_err(transport)? {
                tokio::time::sleep(self.poll_interval).await;
            }
            Ok(())
        }
    }

    fn navigate_through_poses(
        &self,
        goal: NavigationGoal,
        feedback_tx: mpsc::UnboundedSender<NavigationFeedback>,
    ) -> impl Future<Output = NavResult<Option<GoalStatus>>> {
        let mut goal_msg = NavigateGoal::default();
        goal_msg.poses = goal.poses.iter().map(pose_stamped_msg).collect();

        async move {
            let Some(goal_client) = self.client.request_goal(goal_msg).await else {
                warn!("Goal was rejected by the server");
                return Ok(Some(GoalStatus::Unknown));
            };

            let mut feedback = goal_client.feedback;
            let result = goal_client.result;
            tokio::pin!(result);

            loop {
                tokio::select! {
                    biased;
                    Some(msg) = feedback.recv() => {
                        let _ = feedback_tx.send(NavigationFeedback {
                            number_of_poses_remaining: msg.number_of_poses_remaining,
                        });
                    }
                    (status, _) = &mut result => {
                        return Ok(Some(GoalStatus::from_code(status as i8)));
                    }
                }
            }
        }
    }
}

fn transport(e: RclrsError) -> NavError {
    NavError::Transport(e.to_string())
}

fn header_msg(header: &Header) -> HeaderMsg {
    let mut msg = HeaderMsg::default();
    msg.frame_id = header.frame_id.clone();
    msg.stamp.sec = header.stamp.sec;
    msg.stamp.nanosec = header.stamp.nanosec;
    msg
}

fn pose_msg(pose: &Pose) -> PoseMsg {
    let mut msg = PoseMsg::default();
    msg.position.x = pose.position.x;
    msg.position.y = pose.position.y;
    msg.position.z = pose.position.z;
    msg.orientation.x = pose.orientation.x;
    msg.orientation.y = pose.orientation.y;
    msg.orientation.z = pose.orientation.z;
    msg.orientation.w = pose.orientation.w;
    msg
}

fn pose_stamped_msg(pose: &StampedPose) -> PoseStamped {
    let mut msg = PoseStamped::default();
    msg.header = header_msg(&pose.header);
    msg.pose = pose_msg(&pose.pose);
    msg
}

fn marker_msg(marker: &WaypointMarker) -> Marker {
    let mut msg = Marker::default();

    msg.header = header_msg(&marker.header);
    msg.ns = marker.ns.clone();
    msg.id = marker.id;
    msg.type_ = marker.kind as i32;
    msg.action = marker.action as i32;
    msg.pose = pose_msg(&marker.pose);

    msg.scale.x = marker.scale.x;
    msg.scale.y = marker.scale.y;
    msg.scale.z = marker.scale.z;

    msg.color.r = marker.color.r;
    msg.color.g = marker.color.g;
    msg.color.b = marker.color.b;
    msg.color.a = marker.color.a;

    let lifetime = Stamp::from_duration(marker.lifetime);
    msg.lifetime.sec = lifetime.sec;
    msg.lifetime.nanosec = lifetime.nanosec;
    msg.frame_locked = marker.frame_locked;
    msg.text = marker.text.clone();

    msg
}
