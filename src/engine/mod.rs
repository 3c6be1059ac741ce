//! Engine — the playback core.
//!
//! Turns irregularly sampled trajectories (`source`) into per-tick trails
//! (`session`), using binary-search time lookup (`locate`) and linear
//! interpolation (`interpolate`).
//!
//! The engine understands virtual time only. It never deals with wall-clock
//! scheduling, terminals or colours.

pub mod interpolate;
pub mod locate;
pub mod session;
pub mod source;

pub use interpolate::{interpolate, Span};
pub use locate::{bracket, first_index_greater_than};
pub use session::PlaybackSession;
pub use source::{AgentTrajectory, SourceAgent, SourceTrajectories, TrajectorySet};
