//! # Core building blocks of the **delaycomp** crate.
//!
//! # Epochs
//!
//! Time is counted in samples since the observation start, represented by the [`Epoch`] type.
//! A [`SampleClock`] converts epochs into absolute UTC time stamps and back.
//!
//! # Delay Snapshots
//!
//! A single computed delay is represented by the [`Delay`] type, storing the direction cosines, the
//! geometric delay and the clock correction of one beam. All delays of one epoch are gathered in an
//! [`AllDelays`] snapshot, which is implemented as a wrapper around `Vec<SapDelays>`. Each
//! [`SapDelays`] entry holds the delay of the station beam and one delay per coherent tied-array
//! beam.
//!
//! # Observation Settings
//!
//! The observation geometry and the global toggles are read from an [`ObservationSettings`]
//! object, which can be deserialized from JSON:
//! - [`StationGeometry`] phase centre and clock correction of a single station.
//! - [`SapSettings`] the direction of a station beam and its tied-array beams ([`TabSettings`]).
//! - [`SkyDirection`] two angles and a reference frame tag.

mod delay;
mod epoch;
mod settings;

pub use delay::*;
pub use epoch::*;
pub use settings::*;

use thiserror::Error;

/// Errors associated with invalid observation or engine settings.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("buffer capacity {capacity} is not a multiple of the batch size {batch_size}")]
    BatchCapacity { batch_size: usize, capacity: usize },
    #[error("block size must be positive")]
    InvalidBlockSize,
    #[error("direction of sap {sap} contains non-finite angles")]
    InvalidDirection { sap: usize },
    #[error("{what} contains non-finite coordinates")]
    InvalidPosition { what: String },
    #[error("invalid sample rate {0} Hz")]
    InvalidSampleRate(f64),
    #[error("failed to read settings")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings")]
    Json(#[from] serde_json::Error),
    #[error("observation contains no sub-array pointings")]
    NoSaps,
    #[error("observation contains no stations")]
    NoStations,
    #[error("subband {subband} refers to sap {sap}, but only {nr_saps} saps are configured")]
    SubbandSap {
        subband: usize,
        sap: usize,
        nr_saps: usize,
    },
    #[error("unknown station \"{0}\"")]
    UnknownStation(String),
    #[error("reference frame \"{frame}\" of sap {sap} is not supported")]
    UnsupportedFrame { frame: String, sap: usize },
}
