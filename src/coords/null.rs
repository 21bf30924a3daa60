use crate::{
    base::SkyDirection,
    coords::{Conversion, ConvertError, DirectionConverter},
};
use chrono::{DateTime, Utc};
use nalgebra::Vector3;

/// A direction converter that does nothing.
///
/// Every conversion returns the same direction vector (the zenith axis by default) and zero
/// geometric delay, regardless of the reference frame.
#[derive(Clone, Debug)]
pub struct NullConverter {
    direction: Vector3<f64>,
}

impl Default for NullConverter {
    fn default() -> Self {
        Self {
            direction: Vector3::z(),
        }
    }
}

impl NullConverter {
    /// Create a new [`NullConverter`] returning `direction`.
    pub fn new(direction: Vector3<f64>) -> Self {
        Self { direction }
    }
}

impl DirectionConverter for NullConverter {
    fn supports(&self, _frame: &str) -> bool {
        true
    }

    fn convert(
        &mut self,
        _observer: &Vector3<f64>,
        _reference: &Vector3<f64>,
        _time: DateTime<Utc>,
        _direction: &SkyDirection,
    ) -> Result<Conversion, ConvertError> {
        Ok(Conversion {
            direction: self.direction,
            geometric_delay: 0.0,
        })
    }
}
