use crate::metadata::SubbandMetaData;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters over the blocks forwarded by a [`BeamletForwarder`](crate::pipeline::BeamletForwarder).
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct BlockStats {
    /// Number of blocks sent.
    pub blocks: u64,

    /// Number of blocks whose real-time deadline had already passed.
    pub late_blocks: u64,

    /// Largest observed lateness (in seconds).
    pub max_lateness: f64,

    /// Smallest and largest read offset over all subbands and blocks.
    pub read_offset_range: Option<(i64, i64)>,
}

impl BlockStats {
    /// Record one sent block.
    pub fn record(&mut self, metadata: &[SubbandMetaData], lateness: Option<f64>) {
        self.blocks += 1;

        if let Some(lateness) = lateness {
            self.late_blocks += 1;
            self.max_lateness = self.max_lateness.max(lateness);
        }

        for read_offset in metadata.iter().map(|subband| subband.read_offset) {
            self.read_offset_range = Some(match self.read_offset_range {
                Some((min, max)) => (min.min(read_offset), max.max(read_offset)),
                None => (read_offset, read_offset),
            });
        }
    }
}

impl fmt::Display for BlockStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} blocks sent", self.blocks)?;

        if self.late_blocks > 0 {
            write!(
                f,
                ", {} late (max {:.3} ms)",
                self.late_blocks,
                self.max_lateness * 1e3
            )?;
        }

        if let Some((min, max)) = self.read_offset_range {
            write!(f, ", read offsets {min}..={max}")?;
        }

        Ok(())
    }
}
