//! The whole run: wait for the server, draw the waypoints, send them as one
//! goal and report how it ended.

use std::future::Future;

use log::warn;
use tokio::sync::Notify;

use crate::{
    config::NavConfig,
    error::{Error, Result},
    markers::{publish_waypoint_markers, MarkerSink},
    navigator::{GoalClient, NavigationGoal, NavigationOutcome, NavigationServer},
    waypoints::{Header, Waypoint},
};

pub async fn navigate_through_poses<S, M>(
    config: &NavConfig,
    header: &Header,
    waypoints: &[Waypoint],
    server: S,
    markers: &M,
) -> Result<NavigationOutcome>
where
    S: NavigationServer,
    M: MarkerSink,
{
    let mut client = GoalClient::new(server, config.action_name.as_str(), config.timeouts()?);
    client.wait_for_server().await?;

    publish_waypoint_markers(markers, header, waypoints)?;

    let goal = NavigationGoal::from_waypoints(header, waypoints);
    let outcome = client.send_goal(goal).await?;
    outcome.log();

    Ok(outcome)
}

/// Runs `fut` unless `interrupt` fires first.
pub async fn until_interrupted<F, T>(fut: F, interrupt: &Notify) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        result = fut => result,
        _ = interrupt.notified() => {
            warn!("Interrupted, abandoning navigation");
            Err(Error::Interrupted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::future;

    #[tokio::test]
    async fn interrupt_wins_over_pending_work() {
        let interrupt = Notify::new();
        interrupt.notify_one();

        let result = until_interrupted(future::pending::<Result<()>>(), &interrupt).await;
        assert!(matches!(result, Err(Error::Interrupted)));
    }

    #[tokio::test]
    async fn finished_work_passes_through() {
        let interrupt = Notify::new();

        let result = until_interrupted(async { Ok(7) }, &interrupt).await;
        assert_eq!(result.unwrap(), 7);
    }
}
