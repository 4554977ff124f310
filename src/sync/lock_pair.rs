//! # Scoped lock pair
//!
//! Locks two different mutexes as one, in whatever order the arguments come.
//!
//! Two threads locking `(a, b)` and `(b, a)` one by one is the textbook deadlock.
//! The pair never blocks on the second mutex while holding the first: it blocks on one,
//! only *tries* the other one and backs off completely if that fails.
//! The next round starts by blocking on the mutex that failed, so the waiting
//! happens on the contended one instead of spinning over the free one.

use crate::sync::{Mutex, RawLock};
use crate::thread::this_thread;

pub struct ScopedLockPair<'a, M1: RawLock + ?Sized = Mutex, M2: RawLock + ?Sized = Mutex> {
    first: &'a M1,
    second: &'a M2,
    owner: bool,
}

impl<'a, M1: RawLock + ?Sized, M2: RawLock + ?Sized> ScopedLockPair<'a, M1, M2> {
    /// Locks both right away.
    pub fn new(first: &'a M1, second: &'a M2) -> Self {
        Self::with_lock(first, second, true)
    }

    pub fn with_lock(first: &'a M1, second: &'a M2, lock: bool) -> Self {
        precondition!(
            !std::ptr::addr_eq(first as *const M1, second as *const M2),
            "Both input mutexes are the same."
        );
        let mut pair = Self {
            first,
            second,
            owner: false,
        };
        if lock {
            pair.lock();
        }
        pair
    }

    pub fn lock(&mut self) {
        precondition!(
            !self.owner,
            "The lock already owns the mutexes. This operation could lead to a dead-lock."
        );
        loop {
            self.first.lock();
            if self.second.try_lock() {
                break;
            }
            self.first.unlock();
            this_thread::yield_now();

            self.second.lock();
            if self.first.try_lock() {
                break;
            }
            self.second.unlock();
            this_thread::yield_now();
        }
        self.owner = true;
    }

    /// Either both get locked or none of them stays locked.
    pub fn try_lock(&mut self) -> bool {
        precondition!(
            !self.owner,
            "The lock already owns the mutexes. This operation could lead to a dead-lock."
        );
        if self.first.try_lock() {
            if self.second.try_lock() {
                self.owner = true;
            } else {
                self.first.unlock();
            }
        }
        self.owner
    }

    pub fn unlock(&mut self) {
        precondition!(
            self.owner,
            "The lock does not own the mutexes. Locks can only unlock mutexes they locked before."
        );
        self.first.unlock();
        self.second.unlock();
        self.owner = false;
    }

    pub fn is_owner(&self) -> bool {
        self.owner
    }
}

impl<M1: RawLock + ?Sized, M2: RawLock + ?Sized> Drop for ScopedLockPair<'_, M1, M2> {
    fn drop(&mut self) {
        if self.owner {
            self.first.unlock();
            self.second.unlock();
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        panic::{catch_unwind, AssertUnwindSafe},
        sync::atomic::{AtomicUsize, Ordering::Relaxed},
        thread::scope,
    };

    use super::*;
    use crate::sync::{RecursiveMutex, SharedMutex};

    #[test]
    fn test_opposite_order_doesnt_deadlock() {
        let a = Mutex::new();
        let b = Mutex::new();
        let rounds = AtomicUsize::new(0);

        for _ in 0..20 {
            scope(|s| {
                s.spawn(|| {
                    for _ in 0..100 {
                        let _pair = ScopedLockPair::new(&a, &b);
                        rounds.fetch_add(1, Relaxed);
                    }
                });
                s.spawn(|| {
                    for _ in 0..100 {
                        let _pair = ScopedLockPair::new(&b, &a);
                        rounds.fetch_add(1, Relaxed);
                    }
                });
            });
        }

        assert_eq!(rounds.load(Relaxed), 20 * 2 * 100);
    }

    #[test]
    fn test_unlocks_on_scope_exit() {
        let a = Mutex::new();
        let b = RecursiveMutex::new();

        fn early_return(a: &Mutex, b: &RecursiveMutex, bail: bool) -> bool {
            let pair = ScopedLockPair::new(a, b);
            if bail {
                return pair.is_owner();
            }
            false
        }
        assert!(early_return(&a, &b, true));

        // another party can take both independently
        scope(|s| {
            s.spawn(|| {
                assert!(a.try_lock());
                assert!(b.try_lock());
                a.unlock();
                b.unlock();
            });
        });
    }

    #[test]
    fn test_unlocks_on_panic() {
        let a = Mutex::new();
        let b = Mutex::new();

        let result = catch_unwind(AssertUnwindSafe(|| {
            let pair = ScopedLockPair::new(&a, &b);
            assert!(pair.is_owner() && a.is_locked() && b.is_locked());
            panic!("failed while holding both");
        }));
        assert!(result.is_err());
        assert!(!a.is_locked() && !b.is_locked());

        // and nothing is left owned by this thread either
        scope(|s| {
            s.spawn(|| {
                let mut pair = ScopedLockPair::with_lock(&b, &a, false);
                assert!(pair.try_lock());
            });
        });
    }

    #[test]
    fn test_try_lock_leaves_nothing_locked_on_failure() {
        let a = Mutex::new();
        let b = Mutex::new();

        b.lock();
        scope(|s| {
            s.spawn(|| {
                let mut pair = ScopedLockPair::with_lock(&a, &b, false);
                assert!(!pair.try_lock());
                assert!(!pair.is_owner());
                // a was released after b turned out to be taken
                assert!(!a.is_locked());
            });
        });
        b.unlock();

        let mut pair = ScopedLockPair::with_lock(&a, &b, false);
        assert!(pair.try_lock());
        assert!(a.is_locked() && b.is_locked());
        pair.unlock();
        assert!(!a.is_locked() && !b.is_locked());
    }

    #[test]
    fn test_mixed_mutex_kinds() {
        let a = SharedMutex::new();
        let b = RecursiveMutex::new();
        let mut pair = ScopedLockPair::new(&a, &b);
        assert!(pair.is_owner());
        assert!(!a.try_lock_shared());
        pair.unlock();
        assert!(a.try_lock_shared());
        a.unlock_shared();
    }

    #[test]
    #[should_panic(expected = "Both input mutexes are the same")]
    fn test_same_mutex_twice() {
        let a = Mutex::new();
        let _pair = ScopedLockPair::new(&a, &a);
    }

    #[test]
    #[should_panic(expected = "already owns the mutexes")]
    fn test_lock_twice() {
        let a = Mutex::new();
        let b = Mutex::new();
        let mut pair = ScopedLockPair::new(&a, &b);
        pair.lock();
    }
}
