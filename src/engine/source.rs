//! Source trajectories — the immutable sample store.
//!
//! Trajectories arrive already grouped per agent, either built in memory or
//! read from a JSON document in the columnar layout the simulator's animation
//! tooling emits. Everything is validated here so the locator can assume
//! ascending, finite time columns.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::interpolate::Span;
use crate::types::{Category, PlaybackRange, Position, Sample};

// ---------------------------------------------------------------------------
// Serialized layout
// ---------------------------------------------------------------------------

/// One agent as stored on disk: parallel columns plus category flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceAgent {
    #[serde(rename = "Time")]
    pub time: Vec<f64>,
    #[serde(rename = "PositionX")]
    pub position_x: Vec<f64>,
    #[serde(rename = "PositionY")]
    pub position_y: Vec<f64>,
    #[serde(rename = "PositionZ")]
    pub position_z: Vec<f64>,
    #[serde(rename = "IsInterceptor", default)]
    pub is_interceptor: bool,
    #[serde(rename = "IsThreat", default)]
    pub is_threat: bool,
}

/// Agent id → columns.
pub type SourceTrajectories = BTreeMap<String, SourceAgent>;

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AgentTrajectory {
    id: String,
    category: Category,
    times: Vec<f64>,
    positions: Vec<Position>,
}

impl AgentTrajectory {
    /// Times must be finite and non-decreasing; repeated times are fine.
    pub fn new(id: impl Into<String>, category: Category, samples: Vec<Sample>) -> Result<Self> {
        let id = id.into();
        for sample in &samples {
            if ![sample.time, sample.x, sample.y, sample.z]
                .iter()
                .all(|v| v.is_finite())
            {
                bail!("Agent {id}: non-finite sample {sample:?}");
            }
        }
        for pair in samples.windows(2) {
            if pair[0].time > pair[1].time {
                bail!(
                    "Agent {id}: samples out of order: {} then {}",
                    pair[0].time,
                    pair[1].time
                );
            }
        }

        Ok(Self {
            id,
            category,
            times: samples.iter().map(|s| s.time).collect(),
            positions: samples.iter().map(Sample::position).collect(),
        })
    }

    fn from_source(id: &str, source: &SourceAgent) -> Result<Self> {
        let n = source.time.len();
        if source.position_x.len() != n
            || source.position_y.len() != n
            || source.position_z.len() != n
        {
            bail!(
                "Agent {id}: column lengths differ (Time {n}, PositionX {}, PositionY {}, PositionZ {})",
                source.position_x.len(),
                source.position_y.len(),
                source.position_z.len(),
            );
        }
        let Some(category) = Category::from_flags(source.is_interceptor, source.is_threat) else {
            bail!("Agent {id}: flagged as both interceptor and threat");
        };

        let samples = (0..n)
            .map(|i| {
                Sample::new(
                    source.time[i],
                    source.position_x[i],
                    source.position_y[i],
                    source.position_z[i],
                )
            })
            .collect();
        Self::new(id, category, samples)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.times
            .iter()
            .zip(&self.positions)
            .map(|(&time, p)| Sample::new(time, p.x, p.y, p.z))
    }

    /// Position at virtual time `t`, `None` before the first sample.
    ///
    /// The bracket is located once and shared by all three axes.
    pub fn position_at(&self, t: f64) -> Option<Position> {
        match Span::locate(&self.times, t) {
            Span::NotPresent => None,
            Span::Frozen(index) => Some(self.positions[index]),
            Span::Between {
                left,
                right,
                fraction,
            } => Some(self.positions[left].lerp(&self.positions[right], fraction)),
        }
    }
}

/// The sample store: every agent of one recording, ordered by id.
#[derive(Debug, Clone)]
pub struct TrajectorySet {
    agents: Vec<AgentTrajectory>,
    range: PlaybackRange,
}

impl TrajectorySet {
    pub fn new(mut agents: Vec<AgentTrajectory>) -> Result<Self> {
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        for pair in agents.windows(2) {
            if pair[0].id == pair[1].id {
                bail!("Duplicate agent id {}", pair[0].id);
            }
        }

        let mut range: Option<PlaybackRange> = None;
        for agent in &agents {
            let (Some(&first), Some(&last)) = (agent.times.first(), agent.times.last()) else {
                continue;
            };
            range = Some(match range {
                None => PlaybackRange {
                    min_time: first,
                    max_time: last,
                },
                Some(r) => PlaybackRange {
                    min_time: r.min_time.min(first),
                    max_time: r.max_time.max(last),
                },
            });
        }

        Ok(Self {
            agents,
            range: range.unwrap_or(PlaybackRange::EMPTY),
        })
    }

    pub fn from_source(source: &SourceTrajectories) -> Result<Self> {
        let agents = source
            .iter()
            .map(|(id, agent)| AgentTrajectory::from_source(id, agent))
            .collect::<Result<Vec<_>>>()?;
        Self::new(agents)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let source: SourceTrajectories = serde_json::from_str(json)?;
        Self::from_source(&source)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn agents(&self) -> &[AgentTrajectory] {
        &self.agents
    }

    pub fn agent(&self, id: &str) -> Option<&AgentTrajectory> {
        self.agents
            .binary_search_by(|agent| agent.id.as_str().cmp(id))
            .ok()
            .map(|index| &self.agents[index])
    }

    pub fn range(&self) -> PlaybackRange {
        self.range
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Axis-aligned bounds of every sample, `None` without samples.
    pub fn bounds(&self) -> Option<(Position, Position)> {
        let mut points = self.agents.iter().flat_map(|agent| agent.positions.iter());
        let first = *points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| {
            (
                Position::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Position::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(times: &[f64]) -> Vec<Sample> {
        times
            .iter()
            .map(|&t| Sample::new(t, t * 10.0, t * 20.0, -t))
            .collect()
    }

    #[test]
    fn range_spans_all_agents() {
        let set = TrajectorySet::new(vec![
            AgentTrajectory::new("b", Category::Threat, samples(&[5.0, 6.0, 9.5])).unwrap(),
            AgentTrajectory::new("a", Category::Interceptor, samples(&[1.0, 2.0])).unwrap(),
            AgentTrajectory::new("c", Category::Other, Vec::new()).unwrap(),
        ])
        .unwrap();
        assert_eq!(
            set.range(),
            PlaybackRange {
                min_time: 1.0,
                max_time: 9.5
            }
        );
        let ids: Vec<_> = set.agents().iter().map(|a| a.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(set.agent("b").map(|a| a.len()), Some(3));
        assert!(set.agent("zz").is_none());
    }

    #[test]
    fn empty_set_has_zero_range() {
        let set = TrajectorySet::new(Vec::new()).unwrap();
        assert_eq!(set.range(), PlaybackRange::EMPTY);
        assert!(set.bounds().is_none());
    }

    #[test]
    fn rejects_decreasing_times() {
        let err = AgentTrajectory::new("m1", Category::Other, samples(&[0.0, 2.0, 1.0]))
            .unwrap_err();
        assert!(err.to_string().contains("out of order"), "{err}");
    }

    #[test]
    fn rejects_non_finite_values() {
        let err = AgentTrajectory::new("m1", Category::Other, vec![Sample::new(0.0, f64::NAN, 0.0, 0.0)])
            .unwrap_err();
        assert!(err.to_string().contains("non-finite"), "{err}");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let agents = vec![
            AgentTrajectory::new("x", Category::Other, samples(&[0.0])).unwrap(),
            AgentTrajectory::new("x", Category::Other, samples(&[1.0])).unwrap(),
        ];
        assert!(TrajectorySet::new(agents).is_err());
    }

    #[test]
    fn samples_round_back_from_columns() {
        let input = samples(&[0.0, 1.0, 1.0, 4.5]);
        let agent = AgentTrajectory::new("a", Category::Other, input.clone()).unwrap();
        assert_eq!(agent.samples().collect::<Vec<_>>(), input);
        assert_eq!(agent.times(), &[0.0, 1.0, 1.0, 4.5]);
    }

    #[test]
    fn position_at_shares_one_bracket() {
        let agent = AgentTrajectory::new("a", Category::Other, samples(&[0.0, 1.0, 2.0])).unwrap();
        assert_eq!(agent.position_at(-0.5), None);
        assert_eq!(agent.position_at(0.5), Some(Position::new(5.0, 10.0, -0.5)));
        assert_eq!(agent.position_at(7.0), Some(Position::new(20.0, 40.0, -2.0)));
    }

    #[test]
    fn parses_columnar_json() {
        let json = r#"{
            "Interceptor_1": {
                "Time": [0.0, 1.0],
                "PositionX": [0.0, 1.0],
                "PositionY": [0.0, 2.0],
                "PositionZ": [0.0, 3.0],
                "IsInterceptor": true,
                "IsThreat": false
            },
            "Threat_1": {
                "Time": [0.5],
                "PositionX": [9.0],
                "PositionY": [9.0],
                "PositionZ": [9.0],
                "IsThreat": true
            }
        }"#;
        let set = TrajectorySet::from_json_str(json).unwrap();
        assert_eq!(set.agents().len(), 2);
        assert!(set.agent("Interceptor_1").unwrap().category().is_interceptor());
        assert!(set.agent("Threat_1").unwrap().category().is_threat());
        assert_eq!(set.range().max_time, 1.0);
        let (lo, hi) = set.bounds().unwrap();
        assert_eq!(lo, Position::new(0.0, 0.0, 0.0));
        assert_eq!(hi, Position::new(9.0, 9.0, 9.0));
    }

    #[test]
    fn rejects_mismatched_columns() {
        let json = r#"{ "a": { "Time": [0, 1], "PositionX": [0], "PositionY": [0, 1], "PositionZ": [0, 1] } }"#;
        let err = TrajectorySet::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("column lengths differ"), "{err}");
    }

    #[test]
    fn rejects_both_flags() {
        let json = r#"{ "a": { "Time": [], "PositionX": [], "PositionY": [], "PositionZ": [],
            "IsInterceptor": true, "IsThreat": true } }"#;
        assert!(TrajectorySet::from_json_str(json).is_err());
    }
}
