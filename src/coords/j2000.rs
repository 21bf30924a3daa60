use crate::{
    base::SkyDirection,
    coords::{Conversion, ConvertError, DirectionConverter},
};
use chrono::{DateTime, Utc};
use log::debug;
use nalgebra::Vector3;
use std::f64::consts::{PI, TAU};

/// Modified Julian date of the unix epoch (1970-01-01T00:00:00Z).
const MJD_UNIX_EPOCH: f64 = 40587.0;

/// Rate of the mean sidereal time w.r.t. UTC (rad/s), the linear term of [`mjd_to_gmst`].
const EARTH_ROTATION_RATE: f64 = 7.292_115_855_306_592e-5;

/// Returns the modified Julian date of `time`.
pub fn utc_to_mjd(time: DateTime<Utc>) -> f64 {
    let seconds = time.timestamp() as f64 + time.timestamp_subsec_nanos() as f64 * 1e-9;

    MJD_UNIX_EPOCH + seconds / 86400.0
}

/// Greenwich mean sidereal time (in radians, within [0, 2π)) at the modified Julian date `mjd`.
pub fn mjd_to_gmst(mjd: f64) -> f64 {
    // T in Julian centuries since J2000.0 (JD 2451545.0).
    let t = (mjd + 2400000.5 - 2451545.0) / 36525.0;

    // GMST at J2000.0 is 18h 41m 50.54841s, the linear term includes the daily rotation.
    let gmst_sec = 67310.54841 + (876600.0 * 3600.0 + 8640184.812866) * t + 0.093104 * t.powi(2)
        - 6.2e-6 * t.powi(3);

    (gmst_sec * PI / 43200.0).rem_euclid(TAU)
}

/// Sidereal angle at the start of the observation, computed once by [`J2000Converter::prepare`].
#[derive(Clone, Copy, Debug)]
struct FrameContext {
    start: DateTime<Utc>,
    gmst: f64,
}

/// Converts J2000 directions into the Earth-fixed frame.
///
/// The conversion rotates the J2000 direction about the polar axis by the Greenwich mean sidereal
/// time. Precession, nutation and polar motion are ignored, which limits the accuracy to the arc
/// minute level for current epochs; the geometric delay is computed from the rotated direction.
///
/// Directions in the `"ITRF"` frame are interpreted as Earth-fixed (longitude, latitude) and are
/// not rotated.
#[derive(Clone, Debug, Default)]
pub struct J2000Converter {
    context: Option<FrameContext>,
}

impl J2000Converter {
    /// Create a new [`J2000Converter`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the Greenwich mean sidereal time at `time`.
    ///
    /// After [`DirectionConverter::prepare`] the sidereal time is extrapolated from the prepared
    /// start time instead of being evaluated from scratch.
    fn gmst(&self, time: DateTime<Utc>) -> f64 {
        match self.context {
            Some(context) => {
                let elapsed = (time - context.start)
                    .num_nanoseconds()
                    .map(|ns| ns as f64 * 1e-9);

                match elapsed {
                    Some(elapsed) => (context.gmst + EARTH_ROTATION_RATE * elapsed).rem_euclid(TAU),
                    None => mjd_to_gmst(utc_to_mjd(time)),
                }
            }
            None => mjd_to_gmst(utc_to_mjd(time)),
        }
    }
}

impl DirectionConverter for J2000Converter {
    fn supports(&self, frame: &str) -> bool {
        matches!(frame, "J2000" | "ITRF")
    }

    fn prepare(&mut self, start: DateTime<Utc>) -> Result<(), ConvertError> {
        let gmst = mjd_to_gmst(utc_to_mjd(start));

        debug!("j2000 converter prepared at {start} (gmst = {gmst:.6} rad)");

        self.context = Some(FrameContext { start, gmst });

        Ok(())
    }

    fn convert(
        &mut self,
        observer: &Vector3<f64>,
        reference: &Vector3<f64>,
        time: DateTime<Utc>,
        direction: &SkyDirection,
    ) -> Result<Conversion, ConvertError> {
        let (lon, lat) = match direction.frame.as_str() {
            // The Earth-fixed longitude of the source is the negative Greenwich hour angle.
            "J2000" => (direction.angle1 - self.gmst(time), direction.angle2),
            "ITRF" => (direction.angle1, direction.angle2),
            frame => return Err(ConvertError::UnsupportedFrame(frame.to_string())),
        };

        let unit = Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin());
        let conversion = Conversion::from_baseline(unit, observer, reference);

        if !conversion.is_finite() {
            return Err(ConvertError::NonFinite { time });
        }

        Ok(conversion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::SPEED_OF_LIGHT;
    use approx::{abs_diff_eq, ulps_eq};
    use chrono::{TimeDelta, TimeZone};

    #[test]
    fn test_utc_to_mjd() {
        let time = Utc.with_ymd_and_hms(2025, 9, 29, 8, 38, 0).unwrap();

        assert!(abs_diff_eq!(utc_to_mjd(time), 60947.35972222222, epsilon = 1e-9));
    }

    #[test]
    fn test_gmst_rate() {
        let mjd = 60352.66111;
        let delta = (mjd_to_gmst(mjd + 1.0 / 86400.0) - mjd_to_gmst(mjd)).rem_euclid(TAU);

        assert!(delta > 7.2e-5 && delta < 7.4e-5);
    }

    #[test]
    fn test_prepared_gmst_matches() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let later = start + TimeDelta::seconds(3600);

        let mut converter = J2000Converter::new();
        let unprepared = converter.gmst(later);

        converter.prepare(start).unwrap();

        assert!(abs_diff_eq!(converter.gmst(later), unprepared, epsilon = 1e-7));
    }

    #[test]
    fn test_convert_unit_vector() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let reference = Vector3::new(3826577.066, 461022.948, 5064892.786);
        let observer = Vector3::new(3829205.598, 469142.533, 5062181.002);

        let mut converter = J2000Converter::new();
        let conversion = converter
            .convert(&observer, &reference, time, &SkyDirection::j2000(5.2336, 0.7109))
            .unwrap();

        assert!(abs_diff_eq!(conversion.direction.norm(), 1.0, epsilon = 1e-12));

        // The delay can never exceed the light travel time along the baseline.
        let limit = (observer - reference).norm() / SPEED_OF_LIGHT;

        assert!(conversion.geometric_delay.abs() <= limit);

        // The reference position itself has no geometric delay.
        let zero = converter
            .convert(&reference, &reference, time, &SkyDirection::j2000(5.2336, 0.7109))
            .unwrap();

        assert_eq!(zero.geometric_delay.abs(), 0.0);
    }

    #[test]
    fn test_convert_itrf() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut converter = J2000Converter::new();

        let conversion = converter
            .convert(
                &Vector3::new(0.0, 0.0, 100.0),
                &Vector3::zeros(),
                time,
                &SkyDirection::new("ITRF", 0.0, PI / 2.0),
            )
            .unwrap();

        assert!(abs_diff_eq!(conversion.direction, Vector3::z(), epsilon = 1e-12));
        assert!(ulps_eq!(conversion.geometric_delay, 100.0 / SPEED_OF_LIGHT));
    }

    #[test]
    fn test_unsupported_frame() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut converter = J2000Converter::new();

        assert!(!converter.supports("SUN"));
        assert_eq!(
            converter.convert(
                &Vector3::zeros(),
                &Vector3::zeros(),
                time,
                &SkyDirection::new("SUN", 0.0, 0.0)
            ),
            Err(ConvertError::UnsupportedFrame("SUN".to_string()))
        );
    }
}
