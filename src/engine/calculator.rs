use crate::{
    base::{AllDelays, ConfigError, Delay, Epoch, ObservationSettings, SampleClock, SkyDirection},
    coords::{ConvertError, DirectionConverter},
};
use chrono::{DateTime, Utc};
use itertools::zip_eq;
use log::info;
use nalgebra::Vector3;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Absolute directions of the station beam and the coherent TABs of a single SAP.
#[derive(Clone, Debug)]
struct SapDirections {
    sap: SkyDirection,
    tabs: Vec<SkyDirection>,
}

/// Computes [`AllDelays`] snapshots for a single station.
///
/// The calculator captures the observation geometry at construction and is a pure function of the
/// epoch afterwards. All calls into the [`DirectionConverter`] go through an exclusive lock owned
/// by the calculator, see [`DelayCalculator::session`].
pub struct DelayCalculator<C> {
    clock: SampleClock,
    clock_correction: f64,
    converter: Mutex<C>,
    delay_compensation: bool,
    directions: Vec<SapDirections>,
    phase_center: Vector3<f64>,
    reference_phase_center: Vector3<f64>,
}

impl<C> DelayCalculator<C>
where
    C: DirectionConverter,
{
    /// Create a new [`DelayCalculator`] for the station `station`.
    ///
    /// Fails if the settings are invalid, the station is unknown, or if delay compensation is
    /// enabled and the converter does not support the reference frame of any SAP.
    pub fn new(
        settings: &ObservationSettings,
        station: &str,
        converter: C,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let station = settings.station(station)?;

        if settings.delay_compensation {
            if let Some((sap, frame)) = settings
                .saps
                .iter()
                .map(|sap| &sap.direction.frame)
                .enumerate()
                .find(|(_, frame)| !converter.supports(frame))
            {
                return Err(ConfigError::UnsupportedFrame {
                    frame: frame.clone(),
                    sap,
                });
            }
        }

        let directions = settings
            .saps
            .iter()
            .map(|sap| SapDirections {
                sap: sap.direction.clone(),
                tabs: sap
                    .coherent_tabs()
                    .map(|tab| sap.direction.offset(&tab.direction_delta))
                    .collect(),
            })
            .collect::<Vec<SapDirections>>();

        let clock_correction = if settings.correct_clocks {
            station.clock_correction
        } else {
            0.0
        };

        info!(
            "delay calculator for {}: {} sap(s), {} coherent tab(s), compensation {}, clock correction {:.3e} s",
            station.name,
            directions.len(),
            directions.iter().map(|sap| sap.tabs.len()).sum::<usize>(),
            if settings.delay_compensation { "on" } else { "off" },
            clock_correction
        );

        Ok(Self {
            clock: settings.sample_clock()?,
            clock_correction,
            converter: Mutex::new(converter),
            delay_compensation: settings.delay_compensation,
            directions,
            phase_center: station.phase_center,
            reference_phase_center: settings.reference_phase_center,
        })
    }

    /// Compute the snapshot at `epoch`.
    pub fn calc_delays(&self, epoch: Epoch) -> Result<AllDelays, ConvertError> {
        let mut snapshot = self.template();

        self.session().compute(epoch, &mut snapshot)?;

        Ok(snapshot)
    }

    /// Returns the [`SampleClock`] used to convert epochs into time stamps.
    pub fn clock(&self) -> &SampleClock {
        &self.clock
    }

    /// Lock the converter for a sequence of computations.
    pub fn session(&self) -> CalcSession<'_, C> {
        CalcSession {
            calculator: self,
            converter: self
                .converter
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Returns a zero'd snapshot with the shape of the snapshots produced by this calculator.
    pub fn template(&self) -> AllDelays {
        AllDelays::new(
            &self
                .directions
                .iter()
                .map(|sap| sap.tabs.len())
                .collect::<Vec<usize>>(),
        )
    }
}

/// Exclusive access to the converter of a [`DelayCalculator`].
///
/// The converter lock is held for the lifetime of the session, so that a whole batch of snapshots
/// is computed with a single lock acquisition.
pub struct CalcSession<'a, C> {
    calculator: &'a DelayCalculator<C>,
    converter: MutexGuard<'a, C>,
}

impl<C> CalcSession<'_, C>
where
    C: DirectionConverter,
{
    /// Compute the snapshot at `epoch` in place.
    ///
    /// Panics if `snapshot` does not have the shape of [`DelayCalculator::template`]. On error the
    /// snapshot is left partially overwritten and must not be used.
    pub fn compute(&mut self, epoch: Epoch, snapshot: &mut AllDelays) -> Result<(), ConvertError> {
        let calculator = self.calculator;
        let time = calculator.clock.to_utc(epoch);

        assert_eq!(
            snapshot.len(),
            calculator.directions.len(),
            "snapshot has the wrong number of saps"
        );

        snapshot.set_epoch(epoch);

        for (directions, delays) in zip_eq(&calculator.directions, snapshot.saps_mut()) {
            assert_eq!(
                directions.tabs.len(),
                delays.tabs.len(),
                "snapshot has the wrong number of tabs"
            );

            delays.sap = self.delay(time, &directions.sap)?;

            for (direction, delay) in directions.tabs.iter().zip(delays.tabs.iter_mut()) {
                *delay = self.delay(time, direction)?;
            }
        }

        Ok(())
    }

    /// Initialize the converter context at the observation start.
    pub fn prepare(&mut self) -> Result<(), ConvertError> {
        let origin = self.calculator.clock.origin();

        self.converter.prepare(origin)
    }

    fn delay(&mut self, time: DateTime<Utc>, direction: &SkyDirection) -> Result<Delay, ConvertError> {
        let calculator = self.calculator;

        if !calculator.delay_compensation {
            return Ok(Delay {
                direction: Vector3::zeros(),
                geometric_delay: 0.0,
                clock_correction: calculator.clock_correction,
            });
        }

        let conversion = self.converter.convert(
            &calculator.phase_center,
            &calculator.reference_phase_center,
            time,
            direction,
        )?;

        Ok(Delay {
            direction: conversion.direction,
            geometric_delay: conversion.geometric_delay,
            clock_correction: calculator.clock_correction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        coords::{J2000Converter, SPEED_OF_LIGHT},
        testing::{RampConverter, example_settings},
    };
    use approx::ulps_eq;

    #[test]
    fn test_coherent_tabs_only() {
        let settings = example_settings();
        let converter = RampConverter::new(settings.start_time, 0.0, 0.0);
        let calculator = DelayCalculator::new(&settings, "RS106", converter.clone()).unwrap();

        let snapshot = calculator.calc_delays(Epoch::new(0)).unwrap();

        assert_eq!(snapshot.tab_counts(), vec![2, 0]);

        // The incoherent TAB in between is skipped.
        assert!(ulps_eq!(snapshot[0].tabs[1].direction[0], 5.2336 + 0.02));
        assert!(ulps_eq!(snapshot[0].tabs[1].direction[1], 0.7109 + 0.01));

        // One conversion per beam: 3 for SAP 0, 1 for SAP 1.
        assert_eq!(converter.nr_calls(), 4);
    }

    #[test]
    fn test_clock_correction() {
        let mut settings = example_settings();
        let converter = RampConverter::new(settings.start_time, 1e-3, 0.0);

        let snapshot = DelayCalculator::new(&settings, "RS106", converter.clone())
            .unwrap()
            .calc_delays(Epoch::new(0))
            .unwrap();

        assert!(
            snapshot
                .iter()
                .flat_map(|sap| sap.beams())
                .all(|delay| delay.clock_correction == 7.5e-6 && delay.total_delay() == 1e-3 + 7.5e-6)
        );

        settings.correct_clocks = false;

        let snapshot = DelayCalculator::new(&settings, "RS106", converter)
            .unwrap()
            .calc_delays(Epoch::new(0))
            .unwrap();

        assert!(
            snapshot
                .iter()
                .flat_map(|sap| sap.beams())
                .all(|delay| delay.clock_correction == 0.0)
        );
    }

    #[test]
    fn test_disabled_compensation() {
        let mut settings = example_settings();

        settings.delay_compensation = false;

        let converter = RampConverter::new(settings.start_time, 1e-3, 1e-6);
        let calculator = DelayCalculator::new(&settings, "RS106", converter.clone()).unwrap();

        for epoch in [0, 1000, 1_000_000] {
            let snapshot = calculator.calc_delays(Epoch::new(epoch)).unwrap();

            for delay in snapshot.iter().flat_map(|sap| sap.beams()) {
                assert_eq!(delay.geometric_delay, 0.0);
                assert_eq!(delay.clock_correction, 7.5e-6);
            }
        }

        assert_eq!(converter.nr_calls(), 0);
    }

    #[test]
    fn test_unsupported_frame() {
        let mut settings = example_settings();

        settings.saps[1].direction.frame = "SUN".to_string();

        let result = DelayCalculator::new(&settings, "CS002", J2000Converter::new());

        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedFrame { sap: 1, .. })
        ));

        // Frames are irrelevant without delay compensation.
        settings.delay_compensation = false;

        assert!(DelayCalculator::new(&settings, "CS002", J2000Converter::new()).is_ok());
    }

    #[test]
    fn test_unknown_station() {
        assert!(matches!(
            DelayCalculator::new(&example_settings(), "DE601", J2000Converter::new()),
            Err(ConfigError::UnknownStation(_))
        ));
    }

    #[test]
    fn test_converter_failure() {
        let settings = example_settings();
        let mut converter = RampConverter::new(settings.start_time, 0.0, 0.0);

        converter.fail_after = Some(2);

        let calculator = DelayCalculator::new(&settings, "RS106", converter).unwrap();

        assert!(matches!(
            calculator.calc_delays(Epoch::new(0)),
            Err(ConvertError::Failed { .. })
        ));
    }

    #[test]
    fn test_j2000_geometry() {
        let settings = example_settings();

        let remote = DelayCalculator::new(&settings, "RS106", J2000Converter::new()).unwrap();
        let core = DelayCalculator::new(&settings, "CS002", J2000Converter::new()).unwrap();

        let baseline = (settings.stations[1].phase_center - settings.stations[0].phase_center).norm();

        for epoch in [0, 195312, 10 * 195312] {
            let remote_delays = remote.calc_delays(Epoch::new(epoch)).unwrap();
            let core_delays = core.calc_delays(Epoch::new(epoch)).unwrap();

            for delay in remote_delays.iter().flat_map(|sap| sap.beams()) {
                assert!(delay.geometric_delay.abs() <= baseline / SPEED_OF_LIGHT);
                assert!(delay.geometric_delay != 0.0);
            }

            // The core station coincides with the reference phase centre.
            for delay in core_delays.iter().flat_map(|sap| sap.beams()) {
                assert_eq!(delay.geometric_delay.abs(), 0.0);
            }
        }
    }
}
