//! Client side of the `NavigateThroughPoses` action.
//!
//! The action itself is served by the navigation stack. [`NavigationServer`]
//! is the seam to it: the ROS node implements it with an rclrs action client,
//! tests implement it with a scripted fake.

use std::{fmt, future::Future, time::Duration};

use log::{debug, info, log, warn, Level};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::waypoints::{Header, StampedPose, Waypoint};

/// Goal status codes from `action_msgs/msg/GoalStatus`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum GoalStatus {
    #[default]
    Unknown = 0,
    Accepted = 1,
    Executing = 2,
    Canceling = 3,
    Succeeded = 4,
    Canceled = 5,
    Aborted = 6,
}

impl GoalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GoalStatus::Succeeded | GoalStatus::Canceled | GoalStatus::Aborted
        )
    }

    pub fn from_i8(value: i8) -> Option<Self> {
        match value {
            0 => Some(GoalStatus::Unknown),
            1 => Some(GoalStatus::Accepted),
            2 => Some(GoalStatus::Executing),
            3 => Some(GoalStatus::Canceling),
            4 => Some(GoalStatus::Succeeded),
            5 => Some(GoalStatus::Canceled),
            6 => Some(GoalStatus::Aborted),
            _ => None,
        }
    }

    /// Status reported on the wire. Codes outside the known range are a
    /// generic failure, not a missing result.
    pub fn from_code(code: i8) -> Self {
        Self::from_i8(code).unwrap_or(GoalStatus::Unknown)
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GoalStatus::Unknown => "UNKNOWN",
            GoalStatus::Accepted => "ACCEPTED",
            GoalStatus::Executing => "EXECUTING",
            GoalStatus::Canceling => "CANCELING",
            GoalStatus::Succeeded => "SUCCEEDED",
            GoalStatus::Canceled => "CANCELED",
            GoalStatus::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavigationGoal {
    pub poses: Vec<StampedPose>,
}

impl NavigationGoal {
    pub fn from_waypoints(header: &Header, waypoints: &[Waypoint]) -> Self {
        Self {
            poses: waypoints.iter().map(|w| w.stamped(header)).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationFeedback {
    pub number_of_poses_remaining: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    Succeeded,
    /// The server answered with anything but SUCCEEDED.
    Failed(GoalStatus),
    /// No result could be obtained.
    NoResponse,
}

impl NavigationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, NavigationOutcome::Succeeded)
    }

    pub fn level(&self) -> Level {
        match self {
            NavigationOutcome::Succeeded => Level::Info,
            _ => Level::Error,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            NavigationOutcome::Succeeded => "Hooray, reached the desired pose",
            NavigationOutcome::Failed(_) => "The base failed to reach the desired pose",
            NavigationOutcome::NoResponse => "Failed to get response from server",
        }
    }

    pub fn log(&self) {
        log!(self.level(), "{}", self.message());
    }
}

pub fn classify(status: Option<GoalStatus>) -> NavigationOutcome {
    match status {
        Some(GoalStatus::Succeeded) => NavigationOutcome::Succeeded,
        Some(other) => NavigationOutcome::Failed(other),
        None => NavigationOutcome::NoResponse,
    }
}

/// Remote end of the action.
pub trait NavigationServer {
    /// Resolves once the action server can take goals.
    fn wait_for_server(&self) -> impl Future<Output = Result<()>>;

    /// Sends `goal` and resolves with its final status. Feedback goes to
    /// `feedback` while the goal runs. `None` means no result was obtainable;
    /// a rejected goal resolves to `Some(GoalStatus::Unknown)`.
    fn navigate_through_poses(
        &self,
        goal: NavigationGoal,
        feedback: mpsc::UnboundedSender<NavigationFeedback>,
    ) -> impl Future<Output = Result<Option<GoalStatus>>>;
}

/// Limits on the two blocking waits. `None` waits forever.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timeouts {
    pub server: Option<Duration>,
    pub goal: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    WaitingForServer,
    ServerReady,
    GoalSent,
    Resolved(NavigationOutcome),
}

pub struct GoalClient<S> {
    server: S,
    action_name: String,
    timeouts: Timeouts,
    state: ClientState,
    feedback_count: usize,
}

impl<S: NavigationServer> GoalClient<S> {
    pub fn new(server: S, action_name: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            server,
            action_name: action_name.into(),
            timeouts,
            state: ClientState::Idle,
            feedback_count: 0,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn feedback_count(&self) -> usize {
        self.feedback_count
    }

    #[cfg(test)]
    fn server(&self) -> &S {
        &self.server
    }

    pub async fn wait_for_server(&mut self) -> Result<()> {
        self.state = ClientState::WaitingForServer;
        info!("wait for server {}", self.action_name);

        match within(self.timeouts.server, self.server.wait_for_server()).await {
            Some(ready) => ready?,
            None => {
                return Err(Error::ServerUnavailable {
                    action: self.action_name.clone(),
                    waited: self.timeouts.server.unwrap_or_default(),
                })
            }
        }

        info!("Server is ready");
        self.state = ClientState::ServerReady;
        Ok(())
    }

    /// Sends the whole pose sequence as one goal and blocks until it resolves.
    pub async fn send_goal(&mut self, goal: NavigationGoal) -> Result<NavigationOutcome> {
        if goal.poses.is_empty() {
            warn!("Sending a goal with no poses");
        }
        info!("Sending Goals ({} poses)", goal.poses.len());

        let (feedback_tx, mut feedback_rx) = mpsc::unbounded_channel();
        self.state = ClientState::GoalSent;

        let request = self.server.navigate_through_poses(goal, feedback_tx);
        let resolved = within(
            self.timeouts.goal,
            resolve_with_feedback(request, &mut feedback_rx, &mut self.feedback_count),
        )
        .await;

        let status = match resolved {
            Some(status) => status?,
            None => {
                warn!(
                    "Gave up waiting for the goal after {:?}",
                    self.timeouts.goal.unwrap_or_default()
                );
                None
            }
        };

        while let Ok(feedback) = feedback_rx.try_recv() {
            log_feedback(feedback, &mut self.feedback_count);
        }
        info!("Done");

        match status {
            Some(status) if !status.is_terminal() => {
                warn!("Goal resolved with non-terminal status {}", status)
            }
            Some(status) => debug!("Goal finished with status {}", status),
            None => {}
        }
        let outcome = classify(status);
        self.state = ClientState::Resolved(outcome);
        Ok(outcome)
    }
}

async fn resolve_with_feedback<F>(
    request: F,
    feedback_rx: &mut mpsc::UnboundedReceiver<NavigationFeedback>,
    feedback_count: &mut usize,
) -> Result<Option<GoalStatus>>
where
    F: Future<Output = Result<Option<GoalStatus>>>,
{
    tokio::pin!(request);

    loop {
        tokio::select! {
            biased;
            Some(feedback) = feedback_rx.recv() => log_feedback(feedback, feedback_count),
            status = &mut request => return status,
        }
    }
}

fn log_feedback(feedback: NavigationFeedback, feedback_count: &mut usize) {
    *feedback_count += 1;
    info!(
        "Received feedback--> number_of_poses_remaining: {}",
        feedback.number_of_poses_remaining
    );
}

async fn within<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}
