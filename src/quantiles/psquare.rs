//! P² (P-square) streaming quantile estimator
//!
//! Implementation of the P² algorithm (Jain & Chlamtac) for estimating a
//! single quantile of a stream without storing observations. Five marker
//! points approximate the cumulative distribution; each arriving value
//! shifts marker ranks and re-estimates the interior marker heights with
//! a piecewise-parabolic fit, falling back to linear interpolation when
//! the parabolic estimate would break the height ordering.
//!
//! # Thread Safety
//!
//! `PSquare` is plain data (`Send + Sync`), but one update is a
//! multi-step read-modify-write across the marker array. Serialize calls
//! externally for concurrent ingestion: one estimator per worker, or a
//! mutex around the whole estimator.

use crate::traits::{EstimateError, QuantileEstimator, Sketch};

/// Number of tracked markers
///
/// The seeding tables and adjustment rules are derived specifically for
/// five points; the algorithm is not generic over other counts.
const POINTS: usize = 5;

/// One of the five tracked points approximating the distribution
///
/// A marker pairs an estimated value (`height`) with the integer rank it
/// currently occupies among all observations (`position`) and the
/// fractional rank it should occupy for the configured quantile
/// (`desired_position`).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Marker {
    /// Estimated value at this marker
    pub height: f64,
    /// Current rank among all observations seen
    pub position: i64,
    /// Ideal (possibly fractional) rank for this marker
    pub desired_position: f64,
    /// Amount `desired_position` advances per observation
    pub increment: f64,
}

/// P² single-quantile estimator
///
/// Estimates one fixed quantile of an unbounded stream using five marker
/// points and a running count — constant memory, no allocation, no
/// stored observations.
///
/// The estimator warms up on its first five values: they are collected,
/// sorted, and become the initial marker heights. From the sixth value
/// onward each arrival shifts marker ranks and re-estimates the interior
/// marker heights. Readout reports the center marker's height and fails
/// until warm-up completes.
///
/// # Target Quantile
///
/// Fixed at construction and must lie in the open interval (0, 1). One
/// instance tracks one quantile; track p50 and p99 with two instances.
///
/// # Example
///
/// ```
/// use streamquant::quantiles::PSquare;
/// use streamquant::traits::QuantileEstimator;
///
/// let mut median = PSquare::new(0.5);
///
/// for value in [3.0, 5.0, 1.0, 4.0, 2.0, 6.0, 7.0, 8.0, 9.0, 10.0] {
///     median.add(value);
/// }
///
/// let estimate = median.quantile().unwrap();
/// assert!(estimate > 4.0 && estimate < 7.0);
/// ```
#[derive(Clone, Debug)]
pub struct PSquare {
    /// The five tracked markers, heights non-decreasing by index
    markers: [Marker; POINTS],
    /// Finite values ingested
    observations: u64,
    /// Quantile this estimator tracks, in (0, 1)
    target: f64,
}

impl PSquare {
    /// Create an estimator for the given target quantile
    ///
    /// # Arguments
    ///
    /// * `target` - Quantile to track, e.g. 0.5 for the median or 0.99
    ///   for the 99th percentile. Must lie in the open interval (0, 1).
    ///
    /// # Panics
    ///
    /// Panics if `target` is not in (0, 1).
    pub fn new(target: f64) -> Self {
        assert!(
            target > 0.0 && target < 1.0,
            "target quantile must lie in (0, 1), got {}",
            target
        );

        Self {
            markers: [Marker::default(); POINTS],
            observations: 0,
            target,
        }
    }

    /// Number of finite values ingested
    pub fn len(&self) -> u64 {
        self.observations
    }

    /// Check if no values have been ingested
    pub fn is_empty(&self) -> bool {
        self.observations == 0
    }

    /// Read-only view of the five tracked markers
    ///
    /// Marker state is only meaningful once five values have been
    /// ingested; before that the slots hold the raw warm-up values in
    /// arrival order.
    pub fn markers(&self) -> &[Marker; POINTS] {
        &self.markers
    }

    /// Ingest a single value (internal)
    ///
    /// Non-finite values are ignored and not counted: a NaN or infinite
    /// marker height would corrupt the height ordering the adjustment
    /// step relies on.
    fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }

        if self.observations < POINTS as u64 {
            let slot = self.observations as usize;
            self.markers[slot].height = value;
            self.markers[slot].position = slot as i64 + 1;
            self.observations += 1;
            if self.observations == POINTS as u64 {
                self.seed_markers();
            }
        } else {
            self.adjust(value);
            self.observations += 1;
        }
    }

    /// Seal the warm-up phase: sort the five collected values and seed
    /// the rank bookkeeping for the target quantile.
    ///
    /// The adjustment step requires markers ordered by height, so the
    /// collected values are sorted before they become marker heights.
    fn seed_markers(&mut self) {
        let mut heights = [0.0_f64; POINTS];
        for (h, marker) in heights.iter_mut().zip(self.markers.iter()) {
            *h = marker.height;
        }
        heights.sort_unstable_by(f64::total_cmp);

        let q = self.target;
        let desired = [1.0, 1.0 + 2.0 * q, 1.0 + 4.0 * q, 3.0 + 2.0 * q, 5.0];
        let increments = [0.0, q / 2.0, q, (1.0 + q) / 2.0, 1.0];

        for (i, marker) in self.markers.iter_mut().enumerate() {
            *marker = Marker {
                height: heights[i],
                position: i as i64 + 1,
                desired_position: desired[i],
                increment: increments[i],
            };
        }
    }

    /// Steady-state update: locate the cell the value falls into, shift
    /// marker ranks, and nudge the interior markers toward their ideal
    /// ranks.
    fn adjust(&mut self, value: f64) {
        // New extremes replace the end markers and count toward the
        // outermost cells.
        let cell = if value < self.markers[0].height {
            self.markers[0].height = value;
            1
        } else if value < self.markers[1].height {
            1
        } else if value < self.markers[2].height {
            2
        } else if value < self.markers[3].height {
            3
        } else if value <= self.markers[4].height {
            4
        } else {
            self.markers[4].height = value;
            4
        };

        for marker in &mut self.markers[cell..] {
            marker.position += 1;
        }
        for marker in &mut self.markers {
            marker.desired_position += marker.increment;
        }

        // Interior markers, left to right. Marker i sees marker i-1's
        // just-updated state; the published algorithm evaluates in this
        // order and the estimates depend on it.
        for i in 1..POINTS - 1 {
            let offset = self.markers[i].desired_position - self.markers[i].position as f64;

            // Move only if a full rank closer to the ideal and the
            // neighbor's rank leaves room.
            let d: i64 = if offset >= 1.0
                && self.markers[i + 1].position - self.markers[i].position > 1
            {
                1
            } else if offset <= -1.0
                && self.markers[i - 1].position - self.markers[i].position < -1
            {
                -1
            } else {
                continue;
            };

            let candidate = self.parabolic(i, d);
            let height = if self.markers[i - 1].height < candidate
                && candidate < self.markers[i + 1].height
            {
                candidate
            } else {
                self.linear(i, d)
            };

            self.markers[i].height = height;
            self.markers[i].position += d;
        }
    }

    /// Piecewise-parabolic height estimate for marker `i` moved one rank
    /// in direction `d`
    fn parabolic(&self, i: usize, d: i64) -> f64 {
        let prev = &self.markers[i - 1];
        let cur = &self.markers[i];
        let next = &self.markers[i + 1];

        let d = d as f64;
        let (np, nc, nn) = (
            prev.position as f64,
            cur.position as f64,
            next.position as f64,
        );

        cur.height
            + d / (nn - np)
                * ((nc - np + d) * (next.height - cur.height) / (nn - nc)
                    + (nn - nc - d) * (cur.height - prev.height) / (nc - np))
    }

    /// Linear height estimate between marker `i` and its neighbor in
    /// direction `d`
    fn linear(&self, i: usize, d: i64) -> f64 {
        let cur = &self.markers[i];
        let neighbor = &self.markers[(i as i64 + d) as usize];

        cur.height
            + d as f64 * (neighbor.height - cur.height)
                / (neighbor.position - cur.position) as f64
    }
}

impl Default for PSquare {
    /// Median estimator
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl Sketch for PSquare {
    type Item = f64;

    fn update(&mut self, item: &f64) {
        self.push(*item);
    }

    fn clear(&mut self) {
        *self = Self::new(self.target);
    }

    fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
    }

    fn count(&self) -> u64 {
        self.observations
    }
}

impl QuantileEstimator for PSquare {
    fn add(&mut self, value: f64) {
        self.push(value);
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn quantile(&self) -> Result<f64, EstimateError> {
        if self.observations < POINTS as u64 {
            return Err(EstimateError::NotEnoughData {
                required: POINTS as u64,
                observed: self.observations,
            });
        }
        Ok(self.markers[2].height)
    }

    fn min(&self) -> Option<f64> {
        match self.observations {
            0 => None,
            n if n < POINTS as u64 => self.markers[..n as usize]
                .iter()
                .map(|m| m.height)
                .reduce(f64::min),
            _ => Some(self.markers[0].height),
        }
    }

    fn max(&self) -> Option<f64> {
        match self.observations {
            0 => None,
            n if n < POINTS as u64 => self.markers[..n as usize]
                .iter()
                .map(|m| m.height)
                .reduce(f64::max),
            _ => Some(self.markers[4].height),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for PSquare {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("PSquare", 3)?;
        state.serialize_field("target", &self.target)?;
        state.serialize_field("markers", &self.markers)?;
        state.serialize_field("observations", &self.observations)?;
        state.end()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Marker {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeTuple;
        let mut tuple = serializer.serialize_tuple(4)?;
        tuple.serialize_element(&self.height)?;
        tuple.serialize_element(&self.position)?;
        tuple.serialize_element(&self.desired_position)?;
        tuple.serialize_element(&self.increment)?;
        tuple.end()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Warm-up ----

    #[test]
    fn test_seed_values_are_sorted() {
        let mut est = PSquare::new(0.5);
        for v in [3.0, 5.0, 1.0, 4.0, 2.0] {
            est.add(v);
        }

        let heights: [f64; 5] = core::array::from_fn(|i| est.markers()[i].height);
        assert_eq!(heights, [1.0, 2.0, 3.0, 4.0, 5.0]);

        let positions: [i64; 5] = core::array::from_fn(|i| est.markers()[i].position);
        assert_eq!(positions, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_not_enough_data() {
        let mut est = PSquare::new(0.5);

        for i in 0..5u64 {
            assert_eq!(
                est.quantile(),
                Err(EstimateError::NotEnoughData {
                    required: 5,
                    observed: i,
                }),
                "quantile() should be gated at {} observations",
                i
            );
            est.add(i as f64);
        }

        assert!(est.quantile().is_ok());
    }

    #[test]
    fn test_empty() {
        let est = PSquare::new(0.5);
        assert!(est.is_empty());
        assert_eq!(est.len(), 0);
        assert_eq!(est.min(), None);
        assert_eq!(est.max(), None);
        assert!(est.quantile().is_err());
    }

    // ---- Parameter validation ----

    #[test]
    #[should_panic(expected = "target quantile must lie in (0, 1)")]
    fn test_zero_target_panics() {
        PSquare::new(0.0);
    }

    #[test]
    #[should_panic(expected = "target quantile must lie in (0, 1)")]
    fn test_one_target_panics() {
        PSquare::new(1.0);
    }

    #[test]
    #[should_panic(expected = "target quantile must lie in (0, 1)")]
    fn test_negative_target_panics() {
        PSquare::new(-0.5);
    }

    #[test]
    #[should_panic(expected = "target quantile must lie in (0, 1)")]
    fn test_nan_target_panics() {
        PSquare::new(f64::NAN);
    }

    // ---- Basic estimation ----

    #[test]
    fn test_median_of_one_to_ten() {
        // Seeds arrive shuffled; the remaining values ascend.
        let mut est = PSquare::new(0.5);
        for v in [3.0, 5.0, 1.0, 4.0, 2.0] {
            est.add(v);
        }
        for v in [6.0, 7.0, 8.0, 9.0, 10.0] {
            est.add(v);
        }

        let q = est.quantile().unwrap();
        assert!(
            q > 4.0 && q < 7.0,
            "median of 1..=10 should be near 5.5, got {}",
            q
        );
    }

    #[test]
    fn test_median_of_ascending_sequence() {
        let mut est = PSquare::new(0.5);
        for i in 1..=1000 {
            est.add(i as f64);
        }

        let q = est.quantile().unwrap();
        assert!(
            (q - 500.0).abs() < 25.0,
            "median of 1..=1000 should be near 500, got {}",
            q
        );
    }

    #[test]
    fn test_all_values_equal() {
        let mut est = PSquare::new(0.5);
        for _ in 0..100 {
            est.add(42.0);
        }

        assert_eq!(est.quantile().unwrap(), 42.0);
        assert_eq!(est.min(), Some(42.0));
        assert_eq!(est.max(), Some(42.0));
    }

    #[test]
    fn test_extremes_tracked() {
        let mut est = PSquare::new(0.5);
        for i in 1..=20 {
            est.add(i as f64);
        }

        est.add(-5.0);
        assert_eq!(est.min(), Some(-5.0));

        est.add(99.0);
        assert_eq!(est.max(), Some(99.0));
    }

    #[test]
    fn test_order_invariant_on_oscillating_stream() {
        let mut est = PSquare::new(0.9);
        for i in 0..2000u64 {
            est.add((i.wrapping_mul(37) % 101) as f64);
            if est.len() >= 5 {
                let m = est.markers();
                for w in 0..4 {
                    assert!(
                        m[w].height <= m[w + 1].height,
                        "height ordering broken at index {} after {} values: {:?}",
                        w,
                        i + 1,
                        m
                    );
                }
            }
        }
    }

    // ---- Non-finite input ----

    #[test]
    fn test_nan_ignored() {
        let mut est = PSquare::new(0.5);
        est.add(1.0);
        est.add(f64::NAN);
        est.add(2.0);
        est.add(f64::NAN);
        est.add(3.0);

        assert_eq!(est.len(), 3);
        assert_eq!(est.min(), Some(1.0));
        assert_eq!(est.max(), Some(3.0));
    }

    #[test]
    fn test_infinity_ignored() {
        let mut est = PSquare::new(0.5);
        for v in [1.0, f64::INFINITY, 2.0, f64::NEG_INFINITY, 3.0, 4.0, 5.0] {
            est.add(v);
        }

        assert_eq!(est.len(), 5);
        assert_eq!(est.min(), Some(1.0));
        assert_eq!(est.max(), Some(5.0));
        assert_eq!(est.quantile(), Ok(3.0));
    }

    // ---- Determinism ----

    #[test]
    fn test_determinism() {
        let mut a = PSquare::new(0.75);
        let mut b = PSquare::new(0.75);

        for i in 0..1000u64 {
            let v = (i.wrapping_mul(2654435761) % 10007) as f64;
            a.add(v);
            b.add(v);
        }

        assert_eq!(a.markers(), b.markers());
        assert_eq!(a.quantile(), b.quantile());
    }

    #[test]
    fn test_update_matches_add() {
        let mut a = PSquare::new(0.5);
        let mut b = PSquare::new(0.5);

        for i in 0..200u64 {
            let v = (i % 17) as f64;
            a.add(v);
            b.update(&v);
        }

        assert_eq!(a.markers(), b.markers());
        assert_eq!(a.len(), b.count());
    }

    // ---- Clear / Default ----

    #[test]
    fn test_clear() {
        let mut est = PSquare::new(0.9);
        for i in 0..100 {
            est.add(i as f64);
        }

        est.clear();

        assert!(est.is_empty());
        assert!(est.quantile().is_err());
        let diff = est.target() - 0.9;
        assert!(diff < f64::EPSILON && diff > -f64::EPSILON);
    }

    #[test]
    fn test_default_is_median() {
        let est = PSquare::default();
        let diff = est.target() - 0.5;
        assert!(diff < f64::EPSILON && diff > -f64::EPSILON);
    }
}
