use crate::{
    base::AllDelays,
    engine::{
        EngineSettings,
        semaphore::{Closed, Semaphore},
    },
};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Fixed-size arena of snapshot slots shared between the producer and the consumer.
///
/// Access to a slot is granted by the semaphores: the producer only touches slots it acquired
/// from `free`, the consumer only touches slots it acquired from `used`. The per slot mutexes are
/// therefore never contended.
#[derive(Debug)]
pub(crate) struct DelayBuffer {
    slots: Box<[Mutex<AllDelays>]>,
    free: Semaphore,
    used: Semaphore,
}

impl DelayBuffer {
    /// Allocate `settings.capacity` slots shaped like `template`.
    pub(crate) fn new(template: &AllDelays, settings: &EngineSettings) -> Self {
        assert!(
            settings.capacity % settings.batch_size == 0,
            "buffer capacity must be a multiple of the batch size"
        );

        Self {
            slots: (0..settings.capacity)
                .map(|_| Mutex::new(template.clone()))
                .collect(),
            free: Semaphore::new(settings.capacity),
            used: Semaphore::new(0),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Close both semaphores, releasing any blocked producer or consumer.
    pub(crate) fn close(&self) {
        self.free.close();
        self.used.close();
    }

    /// Wait until `count` slots are free (producer side).
    pub(crate) fn reserve(&self, count: usize) -> Result<(), Closed> {
        self.free.acquire(count)
    }

    /// Mark `count` slots as filled (producer side).
    pub(crate) fn publish(&self, count: usize) {
        self.used.release(count);
    }

    /// Wait until one slot is filled (consumer side).
    pub(crate) fn take(&self) -> Result<(), Closed> {
        self.used.acquire(1)
    }

    /// Return one consumed slot to the producer (consumer side).
    pub(crate) fn recycle(&self) {
        self.free.release(1);
    }

    /// Returns the number of filled slots that have not yet been consumed.
    pub(crate) fn ready(&self) -> usize {
        self.used.available()
    }

    pub(crate) fn slot(&self, index: usize) -> MutexGuard<'_, AllDelays> {
        self.slots[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
