use crate::{
    base::{AllDelays, ConfigError, Epoch},
    coords::{ConvertError, DirectionConverter},
    engine::{DelayCalculator, EngineError, EngineSettings, buffer::DelayBuffer},
};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU8, Ordering},
    },
    thread::{self, JoinHandle},
    time::Instant,
};

/// Life cycle of a [`DelayProducer`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[repr(u8)]
pub enum EngineState {
    /// Created, the producer thread has not been started.
    Idle = 0,
    /// The producer thread is computing delays.
    Running = 1,
    /// A stop was requested (or the producer failed), the thread is winding down.
    Stopping = 2,
    /// The producer thread has been joined.
    Stopped = 3,
}

impl From<u8> for EngineState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// State shared between the producer thread, the consumer and any [`StopHandle`].
#[derive(Debug)]
struct Shared {
    buffer: DelayBuffer,
    failure: Mutex<Option<ConvertError>>,
    state: AtomicU8,
}

impl Shared {
    /// Record a producer failure and halt the engine.
    fn fail(&self, err: ConvertError) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);

        self.halt();
    }

    /// Request a stop and release every blocked waiter.
    fn halt(&self) {
        let _ = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |state| {
                match EngineState::from(state) {
                    EngineState::Idle | EngineState::Running => Some(EngineState::Stopping as u8),
                    _ => None,
                }
            });

        self.buffer.close();
    }

    fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    fn set_state(&self, state: EngineState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn state(&self) -> EngineState {
        EngineState::from(self.state.load(Ordering::SeqCst))
    }

    /// The error returned to a consumer that can no longer obtain delays.
    ///
    /// A producer failure is reported exactly once, afterwards the engine reports as stopped.
    fn stopped_error(&self) -> EngineError {
        match self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            Some(err) => EngineError::ProducerFailed(err),
            None => EngineError::Stopped,
        }
    }
}

/// Computes delays ahead of time on a background thread.
///
/// The producer thread computes snapshots for the epochs `first`, `first + increment`, ... in
/// batches and stores them in a bounded circular buffer. The consumer obtains them in strict epoch
/// order with [`DelayProducer::next_delays`] or [`DelayProducer::next_delays_into`]. If the buffer
/// is full the producer blocks, if it is empty the consumer blocks.
///
/// Dropping the producer stops and joins the producer thread.
pub struct DelayProducer<C> {
    calculator: Option<DelayCalculator<C>>,
    increment: u64,
    read_cursor: usize,
    settings: EngineSettings,
    shared: Arc<Shared>,
    template: AllDelays,
    worker: Option<JoinHandle<Result<(), ConvertError>>>,
}

impl<C> DelayProducer<C>
where
    C: DirectionConverter + 'static,
{
    /// Create a new [`DelayProducer`] that advances by `increment` samples per snapshot.
    pub fn new(
        calculator: DelayCalculator<C>,
        settings: EngineSettings,
        increment: u64,
    ) -> Result<Self, EngineError> {
        settings.validate()?;

        if increment == 0 {
            return Err(ConfigError::InvalidBlockSize.into());
        }

        let template = calculator.template();

        Ok(Self {
            calculator: Some(calculator),
            increment,
            read_cursor: 0,
            shared: Arc::new(Shared {
                buffer: DelayBuffer::new(&template, &settings),
                failure: Mutex::new(None),
                state: AtomicU8::new(EngineState::Idle as u8),
            }),
            settings,
            template,
            worker: None,
        })
    }

    /// Returns the number of computed snapshots that have not yet been consumed.
    pub fn buffered(&self) -> usize {
        self.shared.buffer.ready()
    }

    /// Returns the buffer sizing.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Start the producer thread, the first snapshot is computed for `first`.
    pub fn start(&mut self, first: Epoch) -> Result<(), EngineError> {
        match self.shared.state.compare_exchange(
            EngineState::Idle as u8,
            EngineState::Running as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => (),
            Err(state) if EngineState::from(state) == EngineState::Running => {
                return Err(EngineError::AlreadyStarted);
            }
            Err(_) => return Err(EngineError::Stopped),
        }

        let calculator = self.calculator.take().ok_or(EngineError::AlreadyStarted)?;
        let shared = self.shared.clone();
        let settings = self.settings.clone();
        let increment = self.increment;

        let worker = thread::Builder::new()
            .name("delay-producer".to_string())
            .spawn(move || {
                let result = produce(&calculator, &shared, &settings, first, increment);

                if let Err(err) = &result {
                    error!("delay producer failed: {err}");

                    shared.fail(err.clone());
                }

                result
            })
            .map_err(|err| {
                self.shared.set_state(EngineState::Stopped);

                EngineError::Spawn(err)
            })?;

        info!(
            "delay producer started at epoch {} (batch size = {}, capacity = {}, increment = {})",
            first, self.settings.batch_size, self.settings.capacity, self.increment
        );

        self.worker = Some(worker);

        Ok(())
    }

    /// Returns the current [`EngineState`].
    pub fn state(&self) -> EngineState {
        self.shared.state()
    }

    /// Stop the producer thread and wait for it to finish.
    ///
    /// Returns the error the producer thread failed with, if any. Calling this function more than
    /// once has no further effect.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.shared.halt();

        let result = match self.worker.take() {
            Some(worker) => {
                let result = match worker.join() {
                    Ok(result) => result.map_err(EngineError::from),
                    Err(_) => Err(EngineError::WorkerPanicked),
                };

                info!("delay producer stopped");

                result
            }
            None => Ok(()),
        };

        self.shared.set_state(EngineState::Stopped);

        result
    }

    /// Returns a [`StopHandle`] that can stop the engine from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: self.shared.clone(),
        }
    }
}

impl<C> DelayProducer<C> {
    /// Obtain the next snapshot, blocking until it is available.
    pub fn next_delays(&mut self) -> Result<AllDelays, EngineError> {
        let mut snapshot = self.template.clone();

        self.next_delays_into(&mut snapshot)?;

        Ok(snapshot)
    }

    /// Copy the next snapshot into `snapshot`, blocking until it is available.
    ///
    /// Fails with [`EngineError::NotStarted`] before [`DelayProducer::start`] was called. Once the
    /// engine is stopped every call fails, even if computed snapshots are still buffered. A
    /// producer failure is reported once as [`EngineError::ProducerFailed`], subsequent calls
    /// return [`EngineError::Stopped`].
    ///
    /// Panics if `snapshot` does not have the shape of the producer's snapshots.
    pub fn next_delays_into(&mut self, snapshot: &mut AllDelays) -> Result<(), EngineError> {
        if self.shared.state() == EngineState::Idle {
            return Err(EngineError::NotStarted);
        }

        if self.shared.buffer.take().is_err() || !self.shared.is_running() {
            return Err(self.shared.stopped_error());
        }

        snapshot.copy_from(&self.shared.buffer.slot(self.read_cursor));

        self.read_cursor = (self.read_cursor + 1) % self.shared.buffer.capacity();
        self.shared.buffer.recycle();

        Ok(())
    }
}

impl<C> Drop for DelayProducer<C> {
    fn drop(&mut self) {
        self.shared.halt();

        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(Err(err)) => error!("delay producer exited with an error: {err}"),
                Err(_) => error!("delay producer panicked"),
                _ => (),
            }
        }

        self.shared.set_state(EngineState::Stopped);
    }
}

/// Stops a [`DelayProducer`] from any thread.
///
/// Stopping releases a producer blocked on a full buffer and a consumer blocked on an empty one.
/// The producer thread is joined by [`DelayProducer::stop`] or when the producer is dropped.
#[derive(Clone, Debug)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Returns the current [`EngineState`].
    pub fn state(&self) -> EngineState {
        self.shared.state()
    }

    /// Request the engine to stop, has no effect if the engine is already stopping.
    pub fn stop(&self) {
        self.shared.halt();
    }
}

/// The producer loop.
///
/// Every iteration reserves a whole batch of free slots, fills them under a single converter
/// session and publishes them at once. A stop request discards a partially computed batch.
fn produce<C>(
    calculator: &DelayCalculator<C>,
    shared: &Shared,
    settings: &EngineSettings,
    first: Epoch,
    increment: u64,
) -> Result<(), ConvertError>
where
    C: DirectionConverter,
{
    calculator.session().prepare()?;

    let batch_size = settings.batch_size;
    let capacity = shared.buffer.capacity();

    let mut epoch = first;
    let mut write_cursor = 0;

    loop {
        if shared.buffer.reserve(batch_size).is_err() || !shared.is_running() {
            break;
        }

        let start = Instant::now();

        {
            let mut session = calculator.session();

            for offset in 0..batch_size {
                if !shared.is_running() {
                    return Ok(());
                }

                session.compute(
                    epoch + offset as u64 * increment,
                    &mut shared.buffer.slot(write_cursor + offset),
                )?;
            }
        }

        if !shared.is_running() {
            break;
        }

        shared.buffer.publish(batch_size);

        debug!(
            "computed delays for epochs {}..{} in {:.3} ms",
            epoch,
            epoch + batch_size as u64 * increment,
            start.elapsed().as_secs_f64() * 1e3
        );

        write_cursor = (write_cursor + batch_size) % capacity;
        epoch += batch_size as u64 * increment;
    }

    Ok(())
}
