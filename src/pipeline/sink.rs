use crate::{base::Epoch, metadata::FineDelay};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors associated with a [`BlockSink`].
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink is closed")]
    Closed,
    #[error("failed to write block")]
    Io(#[from] std::io::Error),
}

/// The samples and delay compensation metadata of one subband for one block.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SubbandBlock<S> {
    /// Output subband index.
    pub subband: usize,

    /// The shift of the read window (in samples) that was applied to `samples`.
    pub read_offset: i64,

    /// Fine delays in beam order: the station beam first, followed by the coherent TABs.
    pub fine_delays: Vec<FineDelay>,

    /// The coarse delay compensated samples.
    pub samples: Vec<S>,
}

/// One block of delay compensated data of all subbands.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct OutgoingBlock<S> {
    /// Epoch of the first sample of the block (before the read offset is applied).
    pub epoch: Epoch,

    /// Per subband data, in output order.
    pub subbands: Vec<SubbandBlock<S>>,
}

/// A trait that is shared by all consumers of [`OutgoingBlock`]s.
///
/// The block is lent to the sink, its buffers are reused for the next block.
pub trait BlockSink<S> {
    /// Send one block.
    fn send(&mut self, block: &OutgoingBlock<S>) -> Result<(), SinkError>;
}

impl<S> BlockSink<S> for Vec<OutgoingBlock<S>>
where
    S: Clone,
{
    fn send(&mut self, block: &OutgoingBlock<S>) -> Result<(), SinkError> {
        self.push(block.clone());

        Ok(())
    }
}
