// ================================
// src/main.rs
// ================================
use std::sync::Arc;

use anyhow::Result;
use env_logger::Env;
use log::{info, warn};
use tokio::sync::Notify;

use nav_through_poses::{load_waypoints, mission, waypoints::Header, NavConfig};

mod ros;
use ros::{RosMarkerPublisher, RosNavigationServer, RosSession};

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Navigate Through Poses example with Rust");

    let config = NavConfig::load()?;

    let interrupt = Arc::new(Notify::new());
    let interrupt_clone = interrupt.clone();
    ctrlc::set_handler(move || interrupt_clone.notify_one())?;

    // Dropped last: tears down the executor on every exit path below.
    let mut session = RosSession::new(&config.node_name)?;
    let marker_publisher = RosMarkerPublisher::new(session.node(), &config.marker_topic)?;
    let server = RosNavigationServer::new(
        session.node(),
        &config.action_name,
        config.server_poll_interval(),
    )?;

    let header = Header::new(config.frame_id.as_str(), session.stamp());
    let waypoints = load_waypoints(&config.waypoints_file)?;

    session.spin_in_background();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(mission::until_interrupted(
        mission::navigate_through_poses(&config, &header, &waypoints, server, &marker_publisher),
        &interrupt,
    ))?;

    if outcome.is_success() {
        info!("Navigation finished");
    } else {
        warn!("Navigation finished without reaching the goal: {:?}", outcome);
    }
    Ok(())
}
