//! # Mutex
//!
//! A plain exclusive lock. There's no data inside: the caller decides what the lock protects,
//! which is the only way to get explicit `lock` / `try_lock` / `unlock` calls out of a Rust mutex.
//!
//! The state is a u32 so it works with the futex-like wait and wake:
//! - 0 - unlocked
//! - 1 - locked, no other threads
//! - 2 - locked, other threads are waiting
//!
//! Uncontended locking and unlocking never make a syscall. Contended locking spins for a short while first,
//! as mutexes are mostly held for brief moments, and only then goes to [wait].
//!
//! The owner is tracked (a per-thread token, see [this_thread::token]) to catch unlocking by a non-owner
//! and re-locking by the owner, which would deadlock forever otherwise.

use std::sync::atomic::{
    AtomicU32, AtomicU64,
    Ordering::{Acquire, Relaxed, Release},
};

use atomic_wait::{wait, wake_one};

use crate::sync::RawLock;
use crate::thread::this_thread;

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;
const CONTENDED: u32 = 2;

/// no thread has the token 0
pub(crate) const NO_OWNER: u64 = 0;

pub struct Mutex {
    state: AtomicU32,
    owner: AtomicU64,
}

impl Mutex {
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(UNLOCKED),
            owner: AtomicU64::new(NO_OWNER),
        }
    }

    /// Blocks until the calling thread gets the lock.
    pub fn lock(&self) {
        let me = this_thread::token();
        precondition!(
            self.owner.load(Relaxed) != me,
            "The mutex is already locked by the calling thread, locking it again would dead-lock."
        );
        acquire(&self.state);
        self.owner.store(me, Relaxed);
    }

    /// Takes the lock if it's free right now, never blocks.
    pub fn try_lock(&self) -> bool {
        if try_acquire(&self.state) {
            self.owner.store(this_thread::token(), Relaxed);
            true
        } else {
            false
        }
    }

    pub fn unlock(&self) {
        precondition!(
            self.owner.load(Relaxed) == this_thread::token(),
            "The mutex can't be unlocked by a thread that doesn't own it."
        );
        self.owner.store(NO_OWNER, Relaxed);
        release(&self.state);
    }

    /// Whether someone holds the lock at the moment of the call.
    pub fn is_locked(&self) -> bool {
        self.state.load(Relaxed) != UNLOCKED
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Mutex {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            precondition!(
                *self.state.get_mut() == UNLOCKED,
                "The mutex was destroyed while it was still locked."
            );
        }
    }
}

impl RawLock for Mutex {
    fn lock(&self) {
        Mutex::lock(self)
    }

    fn try_lock(&self) -> bool {
        Mutex::try_lock(self)
    }

    fn unlock(&self) {
        Mutex::unlock(self)
    }
}

/// The futex protocol itself, shared with the recursive mutex.
pub(crate) fn acquire(state: &AtomicU32) {
    if state
        .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
        .is_err()
    {
        // the lock is taken => do the logic to wait
        acquire_contended(state);
    }
}

pub(crate) fn try_acquire(state: &AtomicU32) -> bool {
    state
        .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
        .is_ok()
}

/// Wakes a waiter only if someone switched the state to 2.
pub(crate) fn release(state: &AtomicU32) {
    if state.swap(UNLOCKED, Release) == CONTENDED {
        wake_one(state);
    }
}

/// - spin for some cycles
/// - engage wait syscall if still locked
#[cold]
fn acquire_contended(state: &AtomicU32) {
    let mut spin_count = 0;

    // load only, compare_exchange in a loop is bad for the cache
    // 2 means other threads already gave up spinning, no point to join them
    while state.load(Relaxed) == LOCKED && spin_count < 100 {
        spin_count += 1;
        std::hint::spin_loop();
    }

    if state
        .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
        .is_ok()
    {
        return;
    }

    // leaves 2 behind, there may be other waiters we don't know about
    while state.swap(CONTENDED, Acquire) != UNLOCKED {
        wait(state, CONTENDED);
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::atomic::{AtomicBool, AtomicI32},
        thread::{scope, sleep},
        time::Duration,
    };

    use super::*;

    #[test]
    fn test_only_one_thread_at_a_time() {
        let mutex = Mutex::new();
        let counter = AtomicI32::new(0);
        let only_one = AtomicBool::new(true);

        scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..20 {
                        mutex.lock();
                        counter.fetch_add(1, Relaxed);
                        sleep(Duration::from_micros(200));
                        counter.fetch_sub(1, Relaxed);
                        if counter.load(Relaxed) != 0 {
                            only_one.store(false, Relaxed);
                        }
                        mutex.unlock();
                    }
                });
            }
        });

        assert!(only_one.load(Relaxed));
        assert!(!mutex.is_locked());
    }

    #[test]
    fn test_try_lock_doesnt_block() {
        let mutex = Mutex::new();
        mutex.lock();

        scope(|s| {
            s.spawn(|| {
                // fails immediately and doesn't change anything
                assert!(!mutex.try_lock());
                assert!(mutex.is_locked());
            });
        });

        mutex.unlock();
        assert!(mutex.try_lock());
        mutex.unlock();
    }

    #[test]
    #[should_panic(expected = "doesn't own it")]
    fn test_unlock_without_lock() {
        let mutex = Mutex::new();
        mutex.unlock();
    }

    #[test]
    fn test_unlock_by_other_thread() {
        let mutex = Mutex::new();
        mutex.lock();
        let result = scope(|s| s.spawn(|| mutex.unlock()).join());
        assert!(result.is_err());
        mutex.unlock();
    }

    #[test]
    #[should_panic(expected = "would dead-lock")]
    fn test_relock_by_owner() {
        let mutex = Mutex::new();
        mutex.lock();
        mutex.lock();
    }
}
