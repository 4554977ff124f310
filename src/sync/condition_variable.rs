//! # Condition variable
//!
//! The interface is the wait method that unlocks the mutex, waits for a signal then locks the mutex again.
//! There are 2 notification modes:
//! - "notify one" / signal
//! - "notify all" / broadcast
//!
//! The futex's atomic is used as a counter of notifications, so a notification arriving between
//! the unlock and the wait isn't lost: the wait only sleeps if the counter didn't move.
//! The counter overflowing exactly 2^32 times between the load and the wait is considered negligible.
//!
//! Waiters are counted too, so notifying nobody doesn't make a syscall.
//!
//! Wake-ups can be spurious, the caller re-checks its condition in a loop.
//!
//! Waiting is an interruption point: an interrupt bumps the counter of the condition variable
//! the thread is blocked on, so it wakes up, relocks and reports [Interrupted].

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering::Relaxed};

use atomic_wait::{wait, wake_all, wake_one};

use crate::error::Interrupted;
use crate::sync::{RawLock, ScopedLock};
use crate::thread::interrupt::ThreadContext;

/// A lock a condition variable can wait with: it exposes the mutex it owns.
pub trait WaitableLock {
    type Mutex: RawLock + ?Sized;

    fn mutex(&self) -> &Self::Mutex;
    fn is_owner(&self) -> bool;
}

impl<M: RawLock + ?Sized> WaitableLock for ScopedLock<'_, M> {
    type Mutex = M;

    fn mutex(&self) -> &M {
        ScopedLock::mutex(self)
    }

    fn is_owner(&self) -> bool {
        ScopedLock::is_owner(self)
    }
}

pub struct ConditionVariable {
    counter: AtomicU32,
    // no worries about overflows, it can count all the threads there are
    num_waiters: AtomicUsize,
}

impl ConditionVariable {
    pub const fn new() -> Self {
        Self {
            counter: AtomicU32::new(0),
            num_waiters: AtomicUsize::new(0),
        }
    }

    /// Unlocks the lock's mutex, sleeps until notified (or spuriously woken up), locks it again.
    ///
    /// The mutex is owned again when this returns, [Interrupted] included.
    pub fn wait<L: WaitableLock>(&self, lock: &mut L) -> Result<(), Interrupted> {
        precondition!(
            lock.is_owner(),
            "The lock must own its mutex before waiting on a condition variable."
        );
        let context = ThreadContext::current();

        // let the notifiers know we're about to start waiting
        self.num_waiters.fetch_add(1, Relaxed);
        let observed = self.counter.load(Relaxed);

        let result = {
            let _blocking = context.blocking_on(&self.counter);
            if context.is_interrupt_requested() {
                Err(Interrupted)
            } else {
                lock.mutex().unlock();
                wait(&self.counter, observed);
                Ok(())
            }
        };

        self.num_waiters.fetch_sub(1, Relaxed);
        if result.is_ok() {
            lock.mutex().lock();
        }
        result.and_then(|_| context.check_interrupt())
    }

    pub fn notify_one(&self) {
        if self.num_waiters.load(Relaxed) > 0 {
            self.counter.fetch_add(1, Relaxed);
            wake_one(&self.counter);
        }
    }

    pub fn notify_all(&self) {
        if self.num_waiters.load(Relaxed) > 0 {
            self.counter.fetch_add(1, Relaxed);
            wake_all(&self.counter);
        }
    }
}

impl Default for ConditionVariable {
    fn default() -> Self {
        Self::new()
    }
}
