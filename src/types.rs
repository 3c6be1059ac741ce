//! Shared boundary types for the trajectory playback engine.
//!
//! This module defines the two key data contracts:
//! - Loader → Engine: `Sample`s grouped per agent, tagged with a `Category`
//! - Engine → Presenter: `PlaybackFrame` containing one `AgentFrame` per agent

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Geometry primitives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Linear interpolation towards `other`; `fraction` 0 yields `self`.
    pub fn lerp(&self, other: &Position, fraction: f64) -> Position {
        Position {
            x: self.x + (other.x - self.x) * fraction,
            y: self.y + (other.y - self.y) * fraction,
            z: self.z + (other.z - self.z) * fraction,
        }
    }
}

/// One raw telemetry record of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Sample {
    pub fn new(time: f64, x: f64, y: f64, z: f64) -> Self {
        Self { time, x, y, z }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Agent metadata
// ---------------------------------------------------------------------------

/// What kind of agent a trajectory belongs to. Only the presenter looks at it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Interceptor,
    Threat,
    #[default]
    Other,
}

impl Category {
    /// Build from the two mutually exclusive telemetry flags.
    pub fn from_flags(is_interceptor: bool, is_threat: bool) -> Option<Self> {
        match (is_interceptor, is_threat) {
            (true, true) => None,
            (true, false) => Some(Category::Interceptor),
            (false, true) => Some(Category::Threat),
            (false, false) => Some(Category::Other),
        }
    }

    pub fn is_interceptor(&self) -> bool {
        *self == Category::Interceptor
    }

    pub fn is_threat(&self) -> bool {
        *self == Category::Threat
    }
}

// ---------------------------------------------------------------------------
// Engine → Presenter boundary
// ---------------------------------------------------------------------------

/// Virtual time span covered by a trajectory set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRange {
    pub min_time: f64,
    pub max_time: f64,
}

impl PlaybackRange {
    pub const EMPTY: PlaybackRange = PlaybackRange {
        min_time: 0.0,
        max_time: 0.0,
    };

    pub fn duration(&self) -> f64 {
        self.max_time - self.min_time
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFrame {
    pub id: String,
    pub category: Category,
    /// `None` while the agent has not spawned yet. Otherwise the committed
    /// samples followed by the interpolated current position.
    pub trail: Option<Vec<Position>>,
}

impl AgentFrame {
    pub fn is_visible(&self) -> bool {
        self.trail.is_some()
    }

    /// The live marker position, i.e. the last trail point.
    pub fn current(&self) -> Option<Position> {
        self.trail.as_ref().and_then(|trail| trail.last().copied())
    }
}

/// Everything emitted for a single tick, all at one `virtual_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackFrame {
    pub virtual_time: f64,
    pub agents: Vec<AgentFrame>,
}

impl PlaybackFrame {
    pub fn agent(&self, id: &str) -> Option<&AgentFrame> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    pub fn visible_count(&self) -> usize {
        self.agents.iter().filter(|agent| agent.is_visible()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_flags_are_exclusive() {
        assert_eq!(Category::from_flags(true, false), Some(Category::Interceptor));
        assert_eq!(Category::from_flags(false, true), Some(Category::Threat));
        assert_eq!(Category::from_flags(false, false), Some(Category::Other));
        assert_eq!(Category::from_flags(true, true), None);
        assert!(Category::Threat.is_threat());
        assert!(!Category::Threat.is_interceptor());
    }

    #[test]
    fn position_lerp_endpoints() {
        let a = Position::new(0.0, 10.0, -4.0);
        let b = Position::new(2.0, 20.0, 4.0);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        assert_eq!(a.lerp(&b, 0.5), Position::new(1.0, 15.0, 0.0));
    }
}
