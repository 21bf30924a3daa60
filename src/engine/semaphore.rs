use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Returned by [`Semaphore::acquire`] once the semaphore has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Closed;

#[derive(Debug)]
struct Permits {
    available: usize,
    closed: bool,
}

/// A closable counting semaphore.
///
/// Closing the semaphore wakes every waiter; all current and future acquisitions fail, even if
/// permits are still available.
#[derive(Debug)]
pub(crate) struct Semaphore {
    permits: Mutex<Permits>,
    changed: Condvar,
}

impl Semaphore {
    pub(crate) fn new(available: usize) -> Self {
        Self {
            permits: Mutex::new(Permits {
                available,
                closed: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// Block until `count` permits are available and take them.
    pub(crate) fn acquire(&self, count: usize) -> Result<(), Closed> {
        let mut permits = self.lock();

        loop {
            if permits.closed {
                return Err(Closed);
            }

            if permits.available >= count {
                permits.available -= count;

                return Ok(());
            }

            permits = self
                .changed
                .wait(permits)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Returns the number of available permits.
    pub(crate) fn available(&self) -> usize {
        self.lock().available
    }

    pub(crate) fn close(&self) {
        self.lock().closed = true;
        self.changed.notify_all();
    }

    pub(crate) fn release(&self, count: usize) {
        self.lock().available += count;
        self.changed.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, Permits> {
        self.permits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread, time::Duration};

    #[test]
    fn test_acquire_release() {
        let semaphore = Semaphore::new(3);

        assert_eq!(semaphore.acquire(2), Ok(()));
        assert_eq!(semaphore.available(), 1);

        semaphore.release(4);

        assert_eq!(semaphore.acquire(5), Ok(()));
        assert_eq!(semaphore.available(), 0);
    }

    #[test]
    fn test_blocking_acquire() {
        let semaphore = Arc::new(Semaphore::new(0));
        let waiter = {
            let semaphore = semaphore.clone();

            thread::spawn(move || semaphore.acquire(2))
        };

        semaphore.release(1);
        thread::sleep(Duration::from_millis(20));

        assert!(!waiter.is_finished());

        semaphore.release(1);

        assert_eq!(waiter.join().unwrap(), Ok(()));
    }

    #[test]
    fn test_close_wakes_waiters() {
        let semaphore = Arc::new(Semaphore::new(0));
        let waiter = {
            let semaphore = semaphore.clone();

            thread::spawn(move || semaphore.acquire(1))
        };

        thread::sleep(Duration::from_millis(20));
        semaphore.close();

        assert_eq!(waiter.join().unwrap(), Err(Closed));

        // Permits do not reopen a closed semaphore.
        semaphore.release(1);

        assert_eq!(semaphore.acquire(1), Err(Closed));
    }
}
