use crate::base::ConfigError;
use chrono::{DateTime, TimeDelta, Utc};
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Number of station clock ticks per subband sample (the width of the station polyphase filter).
pub const CLOCK_TICKS_PER_SAMPLE: f64 = 1024.0;

/// A point in time, counted in subband samples since the start of the observation.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct Epoch(u64);

impl Epoch {
    /// Create a new [`Epoch`] from a sample count.
    pub const fn new(samples: u64) -> Self {
        Self(samples)
    }

    /// Returns the sample count.
    pub fn samples(&self) -> u64 {
        self.0
    }

    /// Returns the sample count shifted by a signed offset, which may reach before the origin.
    pub fn shifted(&self, offset: i64) -> i64 {
        self.0 as i64 + offset
    }
}

impl Add<u64> for Epoch {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for Epoch {
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

/// Converts between sample based [`Epoch`] values and absolute UTC time stamps.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct SampleClock {
    origin: DateTime<Utc>,
    sample_rate: f64,
}

impl SampleClock {
    /// Create a new [`SampleClock`] with the time of epoch zero and the subband sample rate.
    pub fn new(origin: DateTime<Utc>, sample_rate: f64) -> Result<Self, ConfigError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }

        Ok(Self {
            origin,
            sample_rate,
        })
    }

    /// Create a new [`SampleClock`] from the station clock frequency (e.g. 200 MHz).
    pub fn from_station_clock(origin: DateTime<Utc>, clock_hz: f64) -> Result<Self, ConfigError> {
        Self::new(origin, clock_hz / CLOCK_TICKS_PER_SAMPLE)
    }

    /// Returns the epoch that contains the time stamp `time`, or `None` if `time` lies before
    /// the origin.
    pub fn epoch_at(&self, time: DateTime<Utc>) -> Option<Epoch> {
        let elapsed = (time - self.origin).num_nanoseconds()?;

        if elapsed < 0 {
            return None;
        }

        Some(Epoch((elapsed as f64 * 1e-9 * self.sample_rate).floor() as u64))
    }

    /// Returns the time of epoch zero.
    pub fn origin(&self) -> DateTime<Utc> {
        self.origin
    }

    /// Returns the subband sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Returns the number of seconds between the origin and `epoch`.
    pub fn seconds_since_origin(&self, epoch: Epoch) -> f64 {
        epoch.0 as f64 / self.sample_rate
    }

    /// Returns the duration of `samples` samples.
    pub fn samples_to_seconds(&self, samples: u64) -> f64 {
        samples as f64 / self.sample_rate
    }

    /// Returns the absolute time stamp of `epoch`.
    pub fn to_utc(&self, epoch: Epoch) -> DateTime<Utc> {
        self.origin + seconds_to_delta(self.seconds_since_origin(epoch))
    }
}

/// Converts (fractional) seconds into a [`TimeDelta`] with nanosecond resolution.
pub(crate) fn seconds_to_delta(seconds: f64) -> TimeDelta {
    TimeDelta::nanoseconds((seconds * 1e9).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::ulps_eq;
    use chrono::TimeZone;

    #[test]
    fn test_sample_clock() {
        let origin = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let clock = SampleClock::from_station_clock(origin, 200e6).unwrap();

        assert!(ulps_eq!(clock.sample_rate(), 195312.5));
        assert_eq!(clock.to_utc(Epoch::new(0)), origin);
        assert_eq!(
            clock.to_utc(Epoch::new(195312 * 2 + 1)),
            origin + TimeDelta::seconds(2)
        );
        assert_eq!(
            clock.epoch_at(origin + TimeDelta::milliseconds(1500)),
            Some(Epoch::new(292968))
        );
        assert_eq!(clock.epoch_at(origin - TimeDelta::seconds(1)), None);
    }

    #[test]
    fn test_invalid_sample_rate() {
        let origin = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        assert!(SampleClock::new(origin, 0.0).is_err());
        assert!(SampleClock::new(origin, f64::NAN).is_err());
        assert!(SampleClock::new(origin, -1.0).is_err());
    }

    #[test]
    fn test_epoch_arithmetic() {
        let mut epoch = Epoch::new(10);

        epoch += 5;

        assert_eq!(epoch + 1, Epoch::new(16));
        assert_eq!(epoch.shifted(-20), -5);
        assert!(Epoch::new(3) < epoch);
    }
}
