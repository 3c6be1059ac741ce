//! Linear interpolation over non-uniformly sampled series.
//!
//! An agent is absent before its first sample and frozen at its last sample
//! afterwards; nothing is ever extrapolated.

use super::locate::bracket;

/// Where a query time falls relative to a time column. Computed once per
/// query and then applied to every value channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Span {
    /// Before the first sample (or no samples at all).
    NotPresent,
    /// At or past the last sample.
    Frozen(usize),
    Between {
        left: usize,
        right: usize,
        fraction: f64,
    },
}

impl Span {
    pub fn locate(times: &[f64], t: f64) -> Span {
        let Some(&last) = times.last() else {
            return Span::NotPresent;
        };
        if t < times[0] {
            return Span::NotPresent;
        }
        if t >= last {
            return Span::Frozen(times.len() - 1);
        }

        let (left, right) = bracket(times, t);
        let (t0, t1) = (times[left], times[right]);
        let fraction = if t1 == t0 { 0.0 } else { (t - t0) / (t1 - t0) };
        Span::Between {
            left,
            right,
            fraction,
        }
    }

    /// Evaluate one channel. `values` must be parallel to the located times.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        match *self {
            Span::NotPresent => None,
            Span::Frozen(index) => Some(values[index]),
            Span::Between {
                left,
                right,
                fraction,
            } => {
                let (v0, v1) = (values[left], values[right]);
                Some(v0 + (v1 - v0) * fraction)
            }
        }
    }
}

/// Value of the series `(times, values)` at time `t`, `None` before it starts.
pub fn interpolate(times: &[f64], values: &[f64], t: f64) -> Option<f64> {
    Span::locate(times, t).apply(values)
}
