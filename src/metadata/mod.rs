//! # Coarse/fine delay decomposition.
//!
//! The delay of a beam over one block is split into two parts:
//! - A coarse delay, an integer number of samples that is compensated by shifting the window of
//!   samples that is read for a subband ([`SubbandMetaData::read_offset`]).
//! - A fine delay, the residual sub-sample delay at the begin and at the end of the block
//!   ([`FineDelay`]), which is compensated downstream by a phase rotation.
//!
//! The coarse delay is derived once per SAP from the mean station beam delay over the block, see
//! [`CoarseDelay`], and is shared by the station beam and all coherent TABs of that SAP. The
//! [`MetaDataGenerator`] produces one [`SubbandMetaData`] record per subband from the two delay
//! snapshots bracketing a block.

mod coarse;
mod generator;

pub use coarse::*;
pub use generator::*;

use serde::{Deserialize, Serialize};

/// The residual delay (in seconds) of one beam after coarse compensation.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FineDelay {
    /// Residual delay at the first sample of the block.
    pub delay_at_begin: f64,

    /// Residual delay just after the last sample of the block.
    pub delay_after_end: f64,
}

/// The delay compensation metadata of one subband for one block.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SubbandMetaData {
    /// Shift of the read window in samples, negative for positive delays.
    pub read_offset: i64,

    /// Fine delays in beam order: the station beam first, followed by the coherent TABs.
    pub beams: Vec<FineDelay>,
}

impl SubbandMetaData {
    /// Create a new zero'd [`SubbandMetaData`] for `nr_beams` beams.
    pub fn new(nr_beams: usize) -> Self {
        Self {
            read_offset: 0,
            beams: vec![FineDelay::default(); nr_beams],
        }
    }

    /// Reset the read offset and all fine delays to zero.
    pub fn clear(&mut self) {
        self.read_offset = 0;
        self.beams.fill(FineDelay::default());
    }
}
