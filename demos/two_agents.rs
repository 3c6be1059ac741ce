//! Minimal example — builds two trajectories in memory and prints the live
//! positions the scheduler emits for a few seconds.
//!
//! Run with: cargo run --example two_agents

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use trajectory_playback::{
    config::PlaybackConfig,
    engine::{AgentTrajectory, TrajectorySet},
    scheduler,
    types::{Category, PlaybackFrame, Sample},
};

fn main() -> anyhow::Result<()> {
    // ── Threat: straight descent, sampled every second ──────────────
    let threat = AgentTrajectory::new(
        "Threat_1",
        Category::Threat,
        (0..=6)
            .map(|i| {
                let t = i as f64;
                Sample::new(t, 1000.0 - 150.0 * t, 800.0 - 100.0 * t, 0.0)
            })
            .collect(),
    )?;

    // ── Interceptor: launched at t=2, irregular samples ──────────────
    let interceptor = AgentTrajectory::new(
        "Interceptor_1",
        Category::Interceptor,
        vec![
            Sample::new(2.0, 0.0, 0.0, 0.0),
            Sample::new(2.4, 40.0, 90.0, 0.0),
            Sample::new(3.5, 150.0, 260.0, 0.0),
            Sample::new(5.0, 300.0, 310.0, 0.0),
        ],
    )?;

    let store = Arc::new(TrajectorySet::new(vec![threat, interceptor])?);
    let config = PlaybackConfig {
        fps: 4.0,
        restart_delay_ms: 500,
        ..Default::default()
    };

    let handle = scheduler::start(store, &config, |frame: PlaybackFrame| -> anyhow::Result<()> {
        let positions: Vec<String> = frame
            .agents
            .iter()
            .map(|agent| match agent.current() {
                Some(p) => format!("{} ({:.0}, {:.0})", agent.id, p.x, p.y),
                None => format!("{} (not yet visible)", agent.id),
            })
            .collect();
        println!("t={:5.2}  {}", frame.virtual_time, positions.join("  "));
        Ok(())
    })?;

    thread::sleep(Duration::from_secs(4));
    handle.stop()
}
