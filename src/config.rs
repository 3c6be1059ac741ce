use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Frames per virtual second. Each tick advances virtual time by `1/fps`
    /// and waits `1/fps` wall-clock seconds.
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Wall-clock pause between the end of a pass and the restart.
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
    #[serde(default)]
    pub projection: Projection,
}

/// Which plane the terminal player draws.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// x across, altitude (y) up.
    #[default]
    Side,
    /// x across, z up: looking down on the ground plane.
    Top,
}

impl Projection {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "side" => Ok(Projection::Side),
            "top" => Ok(Projection::Top),
            other => bail!("Unknown projection {other:?}, expected side or top"),
        }
    }
}

fn default_fps() -> f64 { 30.0 }
fn default_restart_delay_ms() -> u64 { 2000 }

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            fps: default_fps(),
            restart_delay_ms: default_restart_delay_ms(),
            projection: Projection::default(),
        }
    }
}

impl PlaybackConfig {
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match std::fs::read_to_string(&config_path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Invalid playback config {} ({e}), using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        let mut path = PathBuf::from(home);
        path.push(".config");
        path.push("trajectory-playback");
        path.push("config.json");
        path
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            bail!("Frame rate must be positive, got {}", self.fps);
        }
        Ok(())
    }

    /// Virtual seconds per tick, also the wall-clock wait between ticks.
    pub fn frame_interval(&self) -> f64 {
        1.0 / self.fps
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }
}
