//! Shared test fixtures.

use crate::{
    base::{ObservationSettings, SapSettings, SkyDirection, StationGeometry, TabSettings},
    coords::{Conversion, ConvertError, DirectionConverter},
};
use chrono::{DateTime, TimeZone, Utc};
use nalgebra::Vector3;
use std::{
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

/// A two SAP observation: SAP 0 with 2 coherent and 1 incoherent TAB, SAP 1 without TABs.
pub(crate) fn example_settings() -> ObservationSettings {
    ObservationSettings {
        block_size: 16,
        correct_clocks: true,
        delay_compensation: true,
        max_network_delay: 0,
        real_time: false,
        reference_phase_center: Vector3::new(3826577.066, 461022.948, 5064892.786),
        saps: vec![
            SapSettings {
                direction: SkyDirection::j2000(5.2336, 0.7109),
                tabs: vec![
                    TabSettings {
                        direction_delta: [0.0, 0.0],
                        coherent: true,
                        dispersion_measure: 0.0,
                    },
                    TabSettings {
                        direction_delta: [0.01, -0.01],
                        coherent: false,
                        dispersion_measure: 0.0,
                    },
                    TabSettings {
                        direction_delta: [0.02, 0.01],
                        coherent: true,
                        dispersion_measure: 26.8,
                    },
                ],
            },
            SapSettings {
                direction: SkyDirection::j2000(1.4596, 0.3842),
                tabs: vec![],
            },
        ],
        start_time: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        stations: vec![
            StationGeometry {
                name: "CS002".to_string(),
                phase_center: Vector3::new(3826577.066, 461022.948, 5064892.786),
                clock_correction: 0.0,
            },
            StationGeometry {
                name: "RS106".to_string(),
                phase_center: Vector3::new(3829205.598, 469142.533, 5062181.002),
                clock_correction: 7.5e-6,
            },
        ],
        subband_sample_rate: 195312.5,
        subband_to_sap: vec![0, 0, 1],
    }
}

/// A converter whose geometric delay grows linearly with time, recording every call.
///
/// The delay is `offset + rate * seconds since the observation start`, independent of the
/// direction, and the direction vector encodes the requested angles.
#[derive(Clone, Debug)]
pub(crate) struct RampConverter {
    pub(crate) start: DateTime<Utc>,
    pub(crate) offset: f64,
    pub(crate) rate: f64,
    pub(crate) calls: Arc<Mutex<Vec<DateTime<Utc>>>>,
    pub(crate) fail_after: Option<usize>,
    pub(crate) latency: Option<Duration>,
}

impl RampConverter {
    pub(crate) fn new(start: DateTime<Utc>, offset: f64, rate: f64) -> Self {
        Self {
            start,
            offset,
            rate,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_after: None,
            latency: None,
        }
    }

    pub(crate) fn nr_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl DirectionConverter for RampConverter {
    fn supports(&self, frame: &str) -> bool {
        frame == "J2000"
    }

    fn convert(
        &mut self,
        _observer: &Vector3<f64>,
        _reference: &Vector3<f64>,
        time: DateTime<Utc>,
        direction: &SkyDirection,
    ) -> Result<Conversion, ConvertError> {
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }

        let mut calls = self.calls.lock().unwrap();

        if self.fail_after.is_some_and(|limit| calls.len() >= limit) {
            return Err(ConvertError::Failed {
                time,
                msg: "ephemeris data unavailable".to_string(),
            });
        }

        calls.push(time);

        let elapsed = (time - self.start).num_nanoseconds().unwrap() as f64 * 1e-9;

        Ok(Conversion {
            direction: Vector3::new(direction.angle1, direction.angle2, 0.0),
            geometric_delay: self.offset + self.rate * elapsed,
        })
    }
}
