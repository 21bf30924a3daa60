use crate::base::{ConfigError, SampleClock};
use chrono::{DateTime, Utc};
use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

/// A direction on the sky, given by two angles (in radians) in a named reference frame.
///
/// For the `"J2000"` frame the angles are the right ascension and the declination.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SkyDirection {
    /// Reference frame tag, e.g. `"J2000"`.
    pub frame: String,

    /// Longitude-like angle (e.g. right ascension).
    pub angle1: f64,

    /// Latitude-like angle (e.g. declination).
    pub angle2: f64,
}

impl SkyDirection {
    /// Returns `true` if both angles are finite.
    pub fn is_finite(&self) -> bool {
        self.angle1.is_finite() && self.angle2.is_finite()
    }

    /// Create a new [`SkyDirection`].
    pub fn new(frame: impl Into<String>, angle1: f64, angle2: f64) -> Self {
        Self {
            frame: frame.into(),
            angle1,
            angle2,
        }
    }

    /// Create a new [`SkyDirection`] in the J2000 frame.
    pub fn j2000(ra: f64, dec: f64) -> Self {
        Self::new("J2000", ra, dec)
    }

    /// Returns the direction offset by `delta` = (Δangle1, Δangle2), in the same frame.
    pub fn offset(&self, delta: &[f64; 2]) -> Self {
        Self {
            frame: self.frame.clone(),
            angle1: self.angle1 + delta[0],
            angle2: self.angle2 + delta[1],
        }
    }
}

/// Configuration of a single tied-array beam.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TabSettings {
    /// Direction offset w.r.t. the SAP direction (in radians).
    pub direction_delta: [f64; 2],

    /// Coherent TABs require full delay tracking, incoherent ones do not.
    pub coherent: bool,

    /// Dispersion measure (pc/cm³), carried through for downstream dedispersion.
    #[serde(default)]
    pub dispersion_measure: f64,
}

/// Configuration of a single sub-array pointing (station beam).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SapSettings {
    /// Direction of the station beam.
    pub direction: SkyDirection,

    /// Tied-array beams formed within this SAP.
    #[serde(default)]
    pub tabs: Vec<TabSettings>,
}

impl SapSettings {
    /// Iterate over the coherent tied-array beams, in configuration order.
    pub fn coherent_tabs(&self) -> impl Iterator<Item = &TabSettings> {
        self.tabs.iter().filter(|tab| tab.coherent)
    }

    /// Returns the number of coherent tied-array beams.
    pub fn nr_coherent_tabs(&self) -> usize {
        self.coherent_tabs().count()
    }
}

/// Position and clock correction of a single station.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StationGeometry {
    /// Station name, e.g. `"CS002LBA"`.
    pub name: String,

    /// Phase centre of the station (ITRF, in meters).
    pub phase_center: Vector3<f64>,

    /// Fixed instrumental delay of the station (in seconds).
    #[serde(default)]
    pub clock_correction: f64,
}

/// The observation settings consumed by the delay engine.
///
/// This is the pre-validated subset of an observation configuration that is relevant for delay
/// compensation, typically loaded from JSON using [`ObservationSettings::from_json_file`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ObservationSettings {
    /// Number of samples per processing block.
    pub block_size: u64,

    /// Apply clock corrections.
    #[serde(default)]
    pub correct_clocks: bool,

    /// Apply geometric delay compensation.
    #[serde(default = "default_true")]
    pub delay_compensation: bool,

    /// Maximum tolerated network delay, in samples.
    #[serde(default)]
    pub max_network_delay: u64,

    /// Wait for the wall clock before sending each block.
    #[serde(default)]
    pub real_time: bool,

    /// Shared reference phase centre (ITRF, in meters).
    pub reference_phase_center: Vector3<f64>,

    /// Sub-array pointings, in configuration order.
    pub saps: Vec<SapSettings>,

    /// Time of the first sample.
    pub start_time: DateTime<Utc>,

    /// Station table.
    pub stations: Vec<StationGeometry>,

    /// Subband sample rate in Hz.
    pub subband_sample_rate: f64,

    /// The SAP index of every subband that is sent, in output order.
    pub subband_to_sap: Vec<usize>,
}

fn default_true() -> bool {
    true
}

impl ObservationSettings {
    /// Returns `true` if delays must be tracked.
    ///
    /// Tracking is required if delay compensation or clock corrections are enabled, or if more
    /// than one tied-array beam is configured.
    pub fn delay_tracking_needed(&self) -> bool {
        let nr_tabs = self.saps.iter().map(|sap| sap.tabs.len()).sum::<usize>();

        self.delay_compensation || self.correct_clocks || nr_tabs > 1
    }

    /// Load and validate settings from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let settings: Self = serde_json::from_reader(reader)?;

        debug!("loaded observation settings from {}", path.as_ref().display());

        settings.validate()?;

        Ok(settings)
    }

    /// Parse and validate settings from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;

        settings.validate()?;

        Ok(settings)
    }

    /// Returns the [`SampleClock`] of the observation.
    pub fn sample_clock(&self) -> Result<SampleClock, ConfigError> {
        SampleClock::new(self.start_time, self.subband_sample_rate)
    }

    /// Look up a station by name.
    pub fn station(&self, name: &str) -> Result<&StationGeometry, ConfigError> {
        self.stations
            .iter()
            .find(|station| station.name == name)
            .ok_or_else(|| ConfigError::UnknownStation(name.to_string()))
    }

    /// Returns the number of coherent TABs for each SAP.
    pub fn tab_counts(&self) -> Vec<usize> {
        self.saps.iter().map(SapSettings::nr_coherent_tabs).collect()
    }

    /// Check the settings for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::InvalidBlockSize);
        }

        if self.saps.is_empty() {
            return Err(ConfigError::NoSaps);
        }

        if self.stations.is_empty() {
            return Err(ConfigError::NoStations);
        }

        self.sample_clock()?;

        if !self.reference_phase_center.iter().all(|x| x.is_finite()) {
            return Err(ConfigError::InvalidPosition {
                what: "reference phase centre".to_string(),
            });
        }

        if let Some(station) = self
            .stations
            .iter()
            .find(|station| !station.phase_center.iter().all(|x| x.is_finite()))
        {
            return Err(ConfigError::InvalidPosition {
                what: format!("phase centre of station {}", station.name),
            });
        }

        for (sdx, sap) in self.saps.iter().enumerate() {
            let tabs_finite = sap
                .tabs
                .iter()
                .all(|tab| tab.direction_delta.iter().all(|x| x.is_finite()));

            if !sap.direction.is_finite() || !tabs_finite {
                return Err(ConfigError::InvalidDirection { sap: sdx });
            }
        }

        if let Some((subband, sap)) = self
            .subband_to_sap
            .iter()
            .enumerate()
            .find(|(_, sap)| **sap >= self.saps.len())
        {
            return Err(ConfigError::SubbandSap {
                subband,
                sap: *sap,
                nr_saps: self.saps.len(),
            });
        }

        Ok(())
    }
}
