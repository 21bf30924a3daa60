//! The delay engine.
//!
//! The engine consists of two parts:
//! - [`DelayCalculator`] A pure function of the epoch that produces one [`AllDelays`](crate::base::AllDelays)
//!   snapshot, using a [`DirectionConverter`](crate::coords::DirectionConverter) behind an
//!   exclusive lock.
//! - [`DelayProducer`] A background thread that computes snapshots in batches of
//!   [`EngineSettings::batch_size`] and publishes them into a bounded circular buffer of
//!   [`EngineSettings::capacity`] pre-allocated slots. The consumer obtains the snapshots in strict
//!   epoch order using [`DelayProducer::next_delays`].
//!
//! Flow control uses two counting semaphores (free and used slots). Stopping the engine closes both
//! semaphores, which releases every blocked waiter on either side.

mod buffer;
mod calculator;
mod producer;
mod semaphore;

pub use calculator::{CalcSession, DelayCalculator};
pub use producer::{DelayProducer, EngineState, StopHandle};

use crate::{base::ConfigError, coords::ConvertError};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors associated with the [`engine`](crate::engine) module.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine has already been started")]
    AlreadyStarted,
    #[error("invalid engine settings")]
    Config(#[from] ConfigError),
    #[error("delay computation failed")]
    Convert(#[from] ConvertError),
    #[error("cannot obtain delays: engine not started")]
    NotStarted,
    #[error("cannot obtain delays: delay computation failed")]
    ProducerFailed(#[source] ConvertError),
    #[error("failed to spawn the producer thread")]
    Spawn(#[source] std::io::Error),
    #[error("cannot obtain delays: engine stopped")]
    Stopped,
    #[error("producer thread panicked")]
    WorkerPanicked,
}

/// Sizing of the delay buffer.
///
/// The capacity must be an exact multiple of the batch size, so that a batch never wraps around
/// the end of the buffer.
#[derive(Builder, Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EngineSettings {
    /// Number of snapshots computed per batch.
    #[builder(default = 16)]
    pub batch_size: usize,

    /// Number of snapshot slots in the circular buffer.
    #[builder(default = 128)]
    pub capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            batch_size: 16,
            capacity: 128,
        }
    }
}

impl EngineSettings {
    /// Check the buffer sizing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 || self.capacity == 0 || self.capacity % self.batch_size != 0 {
            return Err(ConfigError::BatchCapacity {
                batch_size: self.batch_size,
                capacity: self.capacity,
            });
        }

        Ok(())
    }
}
