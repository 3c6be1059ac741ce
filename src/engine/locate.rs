//! Binary-search lookups over an agent's ascending time column.

/// Smallest index `i` with `times[i] > t`, or `times.len()` if there is none.
///
/// Equivalently, the number of samples already in the past at time `t`.
pub fn first_index_greater_than(times: &[f64], t: f64) -> usize {
    let mut left = 0;
    let mut right = times.len();
    while left < right {
        let mid = (left + right) / 2;
        if times[mid] > t {
            right = mid;
        } else {
            left = mid + 1;
        }
    }
    left
}

/// Indices `(left, left + 1)` with `times[left] <= t < times[left + 1]`.
///
/// Callers must ensure `times[0] <= t < times[len - 1]`; anything outside that
/// window is handled by the interpolator before it gets here.
pub fn bracket(times: &[f64], t: f64) -> (usize, usize) {
    debug_assert!(times.len() >= 2);
    let mut left = 0;
    let mut right = times.len() - 1;
    while right - left > 1 {
        let mid = (left + right) / 2;
        if times[mid] <= t {
            left = mid;
        } else {
            right = mid;
        }
    }
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_index_greater_than_examples() {
        let times = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(first_index_greater_than(&times, 1.5), 2);
        assert_eq!(first_index_greater_than(&times, -1.0), 0);
        assert_eq!(first_index_greater_than(&times, 0.0), 1);
        assert_eq!(first_index_greater_than(&times, 3.0), 4);
        assert_eq!(first_index_greater_than(&times, 99.0), 4);
        assert_eq!(first_index_greater_than(&[], 1.0), 0);
    }

    #[test]
    fn first_index_skips_ties() {
        let times = [0.0, 1.0, 1.0, 2.0];
        assert_eq!(first_index_greater_than(&times, 1.0), 3);
        assert_eq!(first_index_greater_than(&times, 0.999), 1);
    }

    #[test]
    fn bracket_straddles_query() {
        let times = [0.0, 0.5, 2.0, 2.1, 7.0];
        for &t in &[0.0, 0.25, 0.5, 1.9, 2.0, 2.05, 6.99] {
            let (left, right) = bracket(&times, t);
            assert_eq!(right, left + 1);
            assert!(times[left] <= t && t < times[right], "t={t} -> ({left}, {right})");
        }
    }

    #[test]
    fn bracket_with_duplicate_times() {
        let times = [0.0, 1.0, 1.0, 2.0];
        assert_eq!(bracket(&times, 1.0), (2, 3));
        assert_eq!(bracket(&times, 0.5), (0, 1));
    }
}
