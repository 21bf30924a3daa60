//! # Block-wise forwarding of delay compensated beamlet data.
//!
//! The [`BeamletForwarder`] processes the observation in fixed-size blocks of samples. For every
//! block it
//! 1. pulls the next delay snapshot from the [`DelayProducer`](crate::engine::DelayProducer) and
//!    decomposes the delays bracketing the block into per subband metadata,
//! 2. optionally waits for the wall clock to pass the block deadline (real-time mode),
//! 3. reads the coarse shifted window of samples of every subband from a [`BeamletSource`] and
//!    hands the block, together with the fine delays, to a [`BlockSink`],
//! 4. advances the current epoch by the block size.
//!
//! Supporting types:
//! - [`MemoryBeamletBuffer`] An in-memory, epoch-addressed [`BeamletSource`].
//! - [`OutgoingBlock`] / [`SubbandBlock`] The data handed to a [`BlockSink`].
//! - [`BlockStats`] Counters over the forwarded blocks.

mod forwarder;
mod sink;
mod source;
mod stats;

pub use forwarder::*;
pub use sink::*;
pub use source::*;
pub use stats::*;

use crate::{base::ConfigError, engine::EngineError};
use thiserror::Error;

/// Errors associated with the [`pipeline`](crate::pipeline) module.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid observation settings")]
    Config(#[from] ConfigError),
    #[error("failed to obtain delays")]
    Engine(#[from] EngineError),
    #[error("failed to send block")]
    Sink(#[from] SinkError),
    #[error("failed to read samples")]
    Source(#[from] SourceError),
}
