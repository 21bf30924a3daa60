use serde::{Deserialize, Serialize};

/// A delay rounded to an integer number of samples.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CoarseDelay {
    /// The delay in samples.
    pub samples: i64,

    /// The delay in seconds, recomputed from the rounded sample count.
    pub seconds: f64,
}

impl CoarseDelay {
    /// Round `delay` (in seconds) to the nearest sample, ties are rounded away from zero.
    pub fn new(delay: f64, sample_rate: f64) -> Self {
        let samples = (delay * sample_rate).round() as i64;

        Self {
            samples,
            seconds: samples as f64 / sample_rate,
        }
    }

    /// Returns the coarse delay of a block from the total delays at its begin and end.
    pub fn from_bracket(delay_at_begin: f64, delay_after_end: f64, sample_rate: f64) -> Self {
        Self::new(0.5 * (delay_at_begin + delay_after_end), sample_rate)
    }

    /// Returns the shift of the read window that compensates this delay.
    ///
    /// A positive delay means that the station recorded the wavefront before the reference did,
    /// so the samples belonging to an epoch are read starting earlier.
    pub fn read_offset(&self) -> i64 {
        -self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::ulps_eq;

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(CoarseDelay::new(2.5, 1.0).samples, 3);
        assert_eq!(CoarseDelay::new(-2.5, 1.0).samples, -3);
        assert_eq!(CoarseDelay::new(2.49, 1.0).samples, 2);
        assert_eq!(CoarseDelay::new(-0.4, 1.0).samples, 0);
    }

    #[test]
    fn test_seconds_from_samples() {
        let coarse = CoarseDelay::new(1e-3, 195312.5);

        assert_eq!(coarse.samples, 195);
        assert!(ulps_eq!(coarse.seconds, 195.0 / 195312.5));
        assert_eq!(coarse.read_offset(), -195);
    }
}
