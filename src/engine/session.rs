//! Playback session — the mutable half of the engine.
//!
//! Holds the global virtual time and one growing trail per agent. The session
//! keeps a shared handle on the store it was built from, so trails can never be
//! paired with another store's agents. The store itself is never touched; a
//! session only remembers how many raw samples each trail has already committed.

use std::sync::Arc;

use super::locate::first_index_greater_than;
use super::source::TrajectorySet;
use crate::types::{AgentFrame, PlaybackFrame, Position};

#[derive(Debug, Clone, Default)]
struct Trail {
    /// Raw samples followed by one provisional interpolated point.
    points: Vec<Position>,
    /// Number of raw samples at the front of `points`.
    committed: usize,
}

impl Trail {
    fn is_visible(&self) -> bool {
        !self.points.is_empty()
    }

    fn clear(&mut self) {
        self.points.clear();
        self.committed = 0;
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackSession {
    store: Arc<TrajectorySet>,
    virtual_time: f64,
    /// Parallel to `TrajectorySet::agents`.
    trails: Vec<Trail>,
}

impl PlaybackSession {
    pub fn new(store: Arc<TrajectorySet>) -> Self {
        Self {
            virtual_time: store.range().min_time,
            trails: vec![Trail::default(); store.agents().len()],
            store,
        }
    }

    pub fn store(&self) -> &TrajectorySet {
        &self.store
    }

    pub fn virtual_time(&self) -> f64 {
        self.virtual_time
    }

    /// Move every agent to `virtual_time`.
    ///
    /// Per agent, the provisional point of the previous tick is dropped, newly
    /// passed raw samples are committed and the interpolated position is pushed
    /// as the new provisional point. Afterwards each visible trail is the raw
    /// samples with `time <= virtual_time` followed by the live position.
    ///
    /// Agents not yet spawned at `virtual_time` have an empty trail. Within a
    /// pass that trail was never filled; when rewinding to before an agent's
    /// first sample its trail is cleared.
    pub fn advance(&mut self, virtual_time: f64) {
        self.virtual_time = virtual_time;

        for (agent, trail) in self.store.agents().iter().zip(self.trails.iter_mut()) {
            let current = first_index_greater_than(agent.times(), virtual_time);
            if current == 0 {
                trail.clear();
                continue;
            }
            let Some(live) = agent.position_at(virtual_time) else {
                continue;
            };

            let keep = trail.committed.min(current);
            trail.points.truncate(keep);
            trail.points.extend_from_slice(&agent.positions()[keep..current]);
            trail.points.push(live);
            trail.committed = current;
        }
    }

    /// Empty every trail and rewind to `min_time`. Allocations are kept.
    pub fn reset(&mut self, min_time: f64) {
        self.virtual_time = min_time;
        for trail in &mut self.trails {
            trail.clear();
        }
    }

    /// Trail of the agent at `index` in store order, `None` while hidden.
    pub fn trail(&self, index: usize) -> Option<&[Position]> {
        self.trails
            .get(index)
            .filter(|trail| trail.is_visible())
            .map(|trail| trail.points.as_slice())
    }

    pub fn frame(&self) -> PlaybackFrame {
        let agents = self
            .store
            .agents()
            .iter()
            .zip(&self.trails)
            .map(|(agent, trail)| AgentFrame {
                id: agent.id().to_string(),
                category: agent.category(),
                trail: trail.is_visible().then(|| trail.points.clone()),
            })
            .collect();

        PlaybackFrame {
            virtual_time: self.virtual_time,
            agents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::source::AgentTrajectory;
    use crate::types::{Category, Sample};

    fn store() -> Arc<TrajectorySet> {
        let a = AgentTrajectory::new(
            "a",
            Category::Interceptor,
            vec![
                Sample::new(0.0, 0.0, 0.0, 0.0),
                Sample::new(1.0, 10.0, 0.0, 0.0),
                Sample::new(2.0, 20.0, 0.0, 0.0),
                Sample::new(3.0, 30.0, 0.0, 0.0),
            ],
        )
        .unwrap();
        let b = AgentTrajectory::new(
            "b",
            Category::Threat,
            vec![Sample::new(1.5, 0.0, 5.0, 0.0), Sample::new(2.5, 0.0, 15.0, 0.0)],
        )
        .unwrap();
        let empty = AgentTrajectory::new("c", Category::Other, Vec::new()).unwrap();
        Arc::new(TrajectorySet::new(vec![a, b, empty]).unwrap())
    }

    /// Trail minus its last point equals the raw prefix; the last point is live.
    fn assert_trail_invariant(session: &PlaybackSession) {
        let t = session.virtual_time();
        for (index, agent) in session.store().agents().iter().enumerate() {
            let passed = first_index_greater_than(agent.times(), t);
            match session.trail(index) {
                None => assert_eq!(passed, 0, "{} hidden at t={t}", agent.id()),
                Some(trail) => {
                    let (live, committed) = trail.split_last().unwrap();
                    assert_eq!(committed, &agent.positions()[..passed]);
                    assert_eq!(Some(*live), agent.position_at(t));
                }
            }
        }
    }

    #[test]
    fn trail_keeps_committed_prefix_and_live_tail() {
        let mut session = PlaybackSession::new(store());
        let mut t = 0.0;
        while t <= 3.5 {
            session.advance(t);
            assert_trail_invariant(&session);
            t += 0.1;
        }
    }

    #[test]
    fn hidden_until_first_sample() {
        let mut session = PlaybackSession::new(store());
        session.advance(1.0);
        assert!(session.trail(0).is_some());
        assert!(session.trail(1).is_none());
        assert!(session.trail(2).is_none());

        session.advance(1.5);
        assert_eq!(session.trail(1), Some(&[Position::new(0.0, 5.0, 0.0); 2][..]));
    }

    #[test]
    fn trail_lengths_never_shrink_within_a_pass() {
        let mut session = PlaybackSession::new(store());
        let mut previous = vec![0; session.store().agents().len()];
        for step in 1..=40 {
            session.advance(step as f64 * 0.1);
            for (index, prev) in previous.iter_mut().enumerate() {
                let len = session.trail(index).map_or(0, <[Position]>::len);
                assert!(len >= *prev);
                *prev = len;
            }
        }
    }

    #[test]
    fn reset_empties_trails_and_rewinds() {
        let mut session = PlaybackSession::new(store());
        session.advance(2.7);
        session.reset(0.0);
        assert_eq!(session.virtual_time(), 0.0);
        let frame = session.frame();
        assert!(frame.agents.iter().all(|agent| agent.trail.is_none()));

        session.advance(0.5);
        assert_trail_invariant(&session);
    }

    #[test]
    fn rewinding_truncates_committed_samples() {
        let mut session = PlaybackSession::new(store());
        session.advance(2.9);
        session.advance(1.2);
        assert_trail_invariant(&session);
    }

    #[test]
    fn rewinding_before_spawn_clears_the_trail() {
        let mut session = PlaybackSession::new(store());
        session.advance(2.0);
        assert!(session.trail(1).is_some());

        session.advance(1.0);
        assert!(session.trail(1).is_none());
        assert!(session.frame().agent("b").is_some_and(|b| b.trail.is_none()));

        session.advance(2.0);
        assert_trail_invariant(&session);
    }

    #[test]
    fn frame_reports_every_agent_at_one_time() {
        let mut session = PlaybackSession::new(store());
        session.advance(2.0);
        let frame = session.frame();
        assert_eq!(frame.virtual_time, 2.0);
        assert_eq!(frame.agents.len(), 3);
        assert_eq!(frame.visible_count(), 2);
        assert_eq!(
            frame.agent("a").and_then(|a| a.current()),
            Some(Position::new(20.0, 0.0, 0.0))
        );
        assert_eq!(frame.agent("b").unwrap().category, Category::Threat);
    }

    #[test]
    fn sessions_on_different_stores_cover_their_own_agents() {
        let small = Arc::new(
            TrajectorySet::new(vec![
                AgentTrajectory::new("a", Category::Other, vec![Sample::new(0.0, 1.0, 1.0, 1.0)])
                    .unwrap(),
            ])
            .unwrap(),
        );
        let big = store();
        let mut on_small = PlaybackSession::new(small.clone());
        let mut on_big = PlaybackSession::new(big.clone());
        on_small.advance(2.0);
        on_big.advance(2.0);

        let ids = |frame: &PlaybackFrame| frame.agents.iter().map(|a| a.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&on_small.frame()), vec!["a"]);
        assert_eq!(ids(&on_big.frame()), vec!["a", "b", "c"]);
        assert_eq!(on_big.frame().agents.len(), big.agents().len());
    }
}
