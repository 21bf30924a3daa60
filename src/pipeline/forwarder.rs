use crate::{
    base::{AllDelays, Epoch, ObservationSettings, SampleClock},
    coords::DirectionConverter,
    engine::{DelayCalculator, DelayProducer, EngineSettings, StopHandle},
    metadata::{MetaDataGenerator, SubbandMetaData},
    pipeline::{BeamletSource, BlockSink, BlockStats, OutgoingBlock, PipelineError, SubbandBlock},
};
use chrono::{TimeDelta, Utc};
use itertools::zip_eq;
use log::{error, info, warn};
use std::{mem, thread};

/// Safety margin (in seconds) on top of the maximum network delay before a block is sent in
/// real-time mode, covering the largest geometric delay that can occur.
pub const MAX_PLAUSIBLE_DELAY: f64 = 0.05;

/// The producer and the two snapshots bracketing the current block.
///
/// `pending` is set while `end` holds the snapshot of a block that has not been sent yet.
struct DelayTracking<C> {
    begin: AllDelays,
    end: AllDelays,
    pending: bool,
    producer: DelayProducer<C>,
}

/// Forwards delay compensated blocks of beamlet data from a [`BeamletSource`] to a [`BlockSink`].
///
/// Every call to [`BeamletForwarder::process_block`] handles one block of `block_size` samples
/// starting at [`BeamletForwarder::current_epoch`]. If delay tracking is needed, the forwarder owns
/// a running [`DelayProducer`] and pulls exactly one snapshot per block. The snapshot for the begin
/// of the first block is pulled on construction.
pub struct BeamletForwarder<C, B, K>
where
    B: BeamletSource,
{
    block: OutgoingBlock<B::Sample>,
    block_size: u64,
    clock: SampleClock,
    current_epoch: Epoch,
    generator: MetaDataGenerator,
    max_network_delay: u64,
    metadata: Vec<SubbandMetaData>,
    real_time: bool,
    sink: K,
    source: B,
    stats: BlockStats,
    tracking: Option<DelayTracking<C>>,
}

impl<C, B, K> BeamletForwarder<C, B, K>
where
    C: DirectionConverter + 'static,
    B: BeamletSource,
    K: BlockSink<B::Sample>,
{
    /// Create a new [`BeamletForwarder`] whose first block starts at `first`.
    ///
    /// If delay tracking is needed, a [`DelayProducer`] is created from `calculator` and
    /// `engine`, started at `first`, and the first snapshot is awaited.
    pub fn new(
        settings: &ObservationSettings,
        calculator: DelayCalculator<C>,
        engine: EngineSettings,
        first: Epoch,
        source: B,
        sink: K,
    ) -> Result<Self, PipelineError> {
        let generator = MetaDataGenerator::from_settings(settings)?;
        let metadata = generator.template();

        let tracking = if settings.delay_tracking_needed() {
            let mut producer = DelayProducer::new(calculator, engine, settings.block_size)?;

            producer.start(first)?;

            let begin = producer.next_delays()?;

            Some(DelayTracking {
                end: begin.clone(),
                begin,
                pending: false,
                producer,
            })
        } else {
            info!("delay tracking disabled, forwarding without delay compensation");

            None
        };

        let block = OutgoingBlock {
            epoch: first,
            subbands: metadata
                .iter()
                .enumerate()
                .map(|(subband, metadata)| SubbandBlock {
                    subband,
                    read_offset: 0,
                    fine_delays: metadata.beams.clone(),
                    samples: vec![Default::default(); settings.block_size as usize],
                })
                .collect(),
        };

        info!(
            "forwarding {} subband(s) in blocks of {} samples from epoch {}{}",
            generator.nr_subbands(),
            settings.block_size,
            first,
            if settings.real_time { " (real-time)" } else { "" }
        );

        Ok(Self {
            block,
            block_size: settings.block_size,
            clock: settings.sample_clock()?,
            current_epoch: first,
            generator,
            max_network_delay: settings.max_network_delay,
            metadata,
            real_time: settings.real_time,
            sink,
            source,
            stats: BlockStats::default(),
            tracking,
        })
    }

    /// Returns the epoch of the first sample of the next block.
    pub fn current_epoch(&self) -> Epoch {
        self.current_epoch
    }

    /// Process a single block.
    ///
    /// If the block fails after its delays were pulled, the next call retries the same block with
    /// the same snapshots.
    pub fn process_block(&mut self) -> Result<(), PipelineError> {
        if let Some(tracking) = &mut self.tracking {
            if !tracking.pending {
                tracking.producer.next_delays_into(&mut tracking.end)?;
                tracking.pending = true;
            }

            self.generator
                .generate(&tracking.begin, &tracking.end, &mut self.metadata);
        }

        let lateness = if self.real_time {
            self.wait_for_deadline()
        } else {
            None
        };

        self.block.epoch = self.current_epoch;

        for (metadata, subband) in zip_eq(&self.metadata, &mut self.block.subbands) {
            subband.read_offset = metadata.read_offset;
            subband.fine_delays.copy_from_slice(&metadata.beams);

            self.source.read(
                subband.subband,
                self.current_epoch.shifted(metadata.read_offset),
                &mut subband.samples,
            )?;
        }

        self.sink.send(&self.block)?;
        self.stats.record(&self.metadata, lateness);

        if let Some(tracking) = &mut self.tracking {
            mem::swap(&mut tracking.begin, &mut tracking.end);
            tracking.pending = false;
        }

        self.current_epoch += self.block_size;

        Ok(())
    }

    /// Process `nr_blocks` blocks, stopping at the first error.
    ///
    /// On error the delay producer is stopped as well.
    pub fn run(&mut self, nr_blocks: u64) -> Result<(), PipelineError> {
        for _ in 0..nr_blocks {
            if let Err(err) = self.process_block() {
                error!("block at epoch {} failed: {err}", self.current_epoch);

                if let Some(handle) = self.stop_handle() {
                    handle.stop();
                }

                return Err(err);
            }
        }

        Ok(())
    }

    /// Stop the delay producer and return the block statistics.
    pub fn shutdown(mut self) -> Result<BlockStats, PipelineError> {
        let result = match &mut self.tracking {
            Some(tracking) => tracking.producer.stop(),
            None => Ok(()),
        };

        info!("forwarder shut down at epoch {}: {}", self.current_epoch, self.stats);

        result?;

        Ok(self.stats)
    }

    /// Returns a reference to the sink.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Returns the statistics of all blocks sent so far.
    pub fn stats(&self) -> &BlockStats {
        &self.stats
    }

    /// Returns a [`StopHandle`] of the delay producer, if delays are tracked.
    pub fn stop_handle(&self) -> Option<StopHandle> {
        self.tracking
            .as_ref()
            .map(|tracking| tracking.producer.stop_handle())
    }

    /// Block until the deadline of the current block has passed.
    ///
    /// Returns the lateness (in seconds) if the deadline had already passed.
    fn wait_for_deadline(&self) -> Option<f64> {
        let deadline = self
            .clock
            .to_utc(self.current_epoch + self.block_size + self.max_network_delay)
            + TimeDelta::microseconds((MAX_PLAUSIBLE_DELAY * 1e6).round() as i64);

        let now = Utc::now();

        match (deadline - now).to_std() {
            Ok(wait) => {
                thread::sleep(wait);

                None
            }
            Err(_) => {
                let lateness = (now - deadline)
                    .num_microseconds()
                    .map_or(f64::INFINITY, |us| us as f64 * 1e-6);

                warn!(
                    "block at epoch {} is {:.3} ms late",
                    self.current_epoch,
                    lateness * 1e3
                );

                Some(lateness)
            }
        }
    }
}
