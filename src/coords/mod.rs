//! Direction conversion and geometric delays.
//!
//! The [`DirectionConverter`] trait abstracts the astronomical coordinate conversion that turns a
//! [`SkyDirection`] into an Earth-fixed unit direction vector, together with the geometric delay of
//! the wavefront arriving at an observer position relative to a reference position. The delay
//! engine only ever talks to this trait, so that the ephemeris dependency stays pluggable.
//!
//! Implemented converters:
//! - [`J2000Converter`] Rotates J2000 (RA, Dec) directions into the Earth-fixed frame using the
//!   Greenwich mean sidereal time. Also accepts directions that are already Earth-fixed
//!   (`"ITRF"`).
//! - [`NullConverter`] Returns a fixed direction and zero delay for any input, used whenever the
//!   actual geometry is irrelevant.
//!
//! Angles in sexagesimal notation can be parsed with [`parse_ra`] and [`parse_dec`].

mod angles;
mod j2000;
mod null;

pub use angles::{parse_dec, parse_ra};
pub use j2000::{J2000Converter, mjd_to_gmst, utc_to_mjd};
pub use null::NullConverter;

use crate::base::SkyDirection;
use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use thiserror::Error;

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Errors associated with the [`coords`](crate::coords) module.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConvertError {
    #[error("conversion failed at {time}: {msg}")]
    Failed { time: DateTime<Utc>, msg: String },
    #[error("invalid angle \"{0}\"")]
    InvalidAngle(String),
    #[error("conversion at {time} produced non-finite values")]
    NonFinite { time: DateTime<Utc> },
    #[error("unsupported reference frame \"{0}\"")]
    UnsupportedFrame(String),
}

/// The result of a single direction conversion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Conversion {
    /// Unit direction vector in the Earth-fixed frame.
    pub direction: Vector3<f64>,

    /// Geometric delay (in seconds) of the observer relative to the reference position.
    pub geometric_delay: f64,
}

impl Conversion {
    /// Create a [`Conversion`] from a direction vector, computing the geometric delay of the
    /// baseline `observer - reference`.
    ///
    /// A wavefront from `direction` reaches positions further along `direction` earlier, so their
    /// samples must be held back by `(direction · baseline) / c` to line up with the reference.
    pub fn from_baseline(
        direction: Vector3<f64>,
        observer: &Vector3<f64>,
        reference: &Vector3<f64>,
    ) -> Self {
        Self {
            direction,
            geometric_delay: direction.dot(&(observer - reference)) / SPEED_OF_LIGHT,
        }
    }

    /// Returns `true` if all values are finite.
    pub fn is_finite(&self) -> bool {
        self.geometric_delay.is_finite() && self.direction.iter().all(|x| x.is_finite())
    }
}

/// A trait that is shared by all direction converters.
///
/// Implementations are not required to be reentrant, the delay engine serializes all calls.
pub trait DirectionConverter: Send {
    /// Returns `true` if directions in the reference frame `frame` can be converted.
    ///
    /// Unsupported frames are rejected when the engine is configured, not per call.
    fn supports(&self, frame: &str) -> bool;

    /// Initialize any conversion context (frame, reference epoch) once before the first call to
    /// [`DirectionConverter::convert`].
    fn prepare(&mut self, _start: DateTime<Utc>) -> Result<(), ConvertError> {
        Ok(())
    }

    /// Convert `direction` at time `time` into an Earth-fixed unit vector and compute the
    /// geometric delay of `observer` w.r.t. `reference` (both ITRF, in meters).
    fn convert(
        &mut self,
        observer: &Vector3<f64>,
        reference: &Vector3<f64>,
        time: DateTime<Utc>,
        direction: &SkyDirection,
    ) -> Result<Conversion, ConvertError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::ulps_eq;

    #[test]
    fn test_baseline_delay_sign() {
        let reference = Vector3::zeros();

        // An observer 300 m closer to the source sees the wavefront ~1 µs earlier.
        let closer = Conversion::from_baseline(Vector3::x(), &Vector3::new(300.0, 0.0, 0.0), &reference);

        assert!(closer.geometric_delay > 0.0);
        assert!(ulps_eq!(closer.geometric_delay, 300.0 / SPEED_OF_LIGHT));

        let further = Conversion::from_baseline(Vector3::x(), &Vector3::new(-300.0, 0.0, 0.0), &reference);

        assert!(ulps_eq!(further.geometric_delay, -300.0 / SPEED_OF_LIGHT));

        // Perpendicular baselines have no delay.
        let perpendicular =
            Conversion::from_baseline(Vector3::z(), &Vector3::new(300.0, 0.0, 0.0), &reference);

        assert_eq!(perpendicular.geometric_delay, 0.0);
        assert!(perpendicular.is_finite());
    }
}
