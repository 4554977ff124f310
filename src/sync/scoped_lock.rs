//! # Scoped locks
//!
//! Guards that remember whether they own the lock and release it on drop.
//! Unlike the usual Rust guards they can be created unlocked and locked / unlocked many times,
//! a condition variable needs exactly that to release the mutex while waiting.

use crate::sync::{RawLock, SharedMutex};

/// Exclusive guard over any [RawLock].
pub struct ScopedLock<'a, M: RawLock + ?Sized> {
    mutex: &'a M,
    owner: bool,
}

impl<'a, M: RawLock + ?Sized> ScopedLock<'a, M> {
    /// Locks right away.
    pub fn new(mutex: &'a M) -> Self {
        mutex.lock();
        Self { mutex, owner: true }
    }

    /// Leaves the mutex alone until [ScopedLock::lock] or [ScopedLock::try_lock].
    pub fn deferred(mutex: &'a M) -> Self {
        Self {
            mutex,
            owner: false,
        }
    }

    pub fn lock(&mut self) {
        precondition!(
            !self.owner,
            "The lock already owns the mutex. This operation could lead to a dead-lock."
        );
        self.mutex.lock();
        self.owner = true;
    }

    pub fn try_lock(&mut self) -> bool {
        precondition!(
            !self.owner,
            "The lock already owns the mutex. This operation could lead to a dead-lock."
        );
        self.owner = self.mutex.try_lock();
        self.owner
    }

    pub fn unlock(&mut self) {
        precondition!(
            self.owner,
            "The lock does not own the mutex. Locks can only unlock mutexes they locked before."
        );
        self.mutex.unlock();
        self.owner = false;
    }

    pub fn is_owner(&self) -> bool {
        self.owner
    }

    pub fn mutex(&self) -> &'a M {
        self.mutex
    }
}

impl<M: RawLock + ?Sized> Drop for ScopedLock<'_, M> {
    fn drop(&mut self) {
        if self.owner {
            self.mutex.unlock();
        }
    }
}

/// Shared guard over a [SharedMutex].
pub struct ScopedSharedLock<'a> {
    mutex: &'a SharedMutex,
    owner: bool,
}

impl<'a> ScopedSharedLock<'a> {
    pub fn new(mutex: &'a SharedMutex) -> Self {
        mutex.lock_shared();
        Self { mutex, owner: true }
    }

    pub fn deferred(mutex: &'a SharedMutex) -> Self {
        Self {
            mutex,
            owner: false,
        }
    }

    pub fn lock(&mut self) {
        precondition!(
            !self.owner,
            "The lock already owns the mutex. This operation could lead to a dead-lock."
        );
        self.mutex.lock_shared();
        self.owner = true;
    }

    pub fn try_lock(&mut self) -> bool {
        precondition!(
            !self.owner,
            "The lock already owns the mutex. This operation could lead to a dead-lock."
        );
        self.owner = self.mutex.try_lock_shared();
        self.owner
    }

    pub fn unlock(&mut self) {
        precondition!(
            self.owner,
            "The lock does not own the mutex. Locks can only unlock mutexes they locked before."
        );
        self.mutex.unlock_shared();
        self.owner = false;
    }

    pub fn is_owner(&self) -> bool {
        self.owner
    }
}

impl Drop for ScopedSharedLock<'_> {
    fn drop(&mut self) {
        if self.owner {
            self.mutex.unlock_shared();
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        panic::{catch_unwind, AssertUnwindSafe},
        thread::scope,
    };

    use super::*;
    use crate::sync::{Mutex, RecursiveMutex};

    #[test]
    fn test_unlocks_on_drop() {
        let mutex = Mutex::new();
        {
            let lock = ScopedLock::new(&mutex);
            assert!(lock.is_owner());
            assert!(mutex.is_locked());
        }
        assert!(!mutex.is_locked());
    }

    #[test]
    fn test_deferred() {
        let mutex = RecursiveMutex::new();
        let mut lock = ScopedLock::deferred(&mutex);
        assert!(!lock.is_owner());
        assert_eq!(mutex.depth(), 0);

        assert!(lock.try_lock());
        assert_eq!(mutex.depth(), 1);
        lock.unlock();
        assert_eq!(mutex.depth(), 0);

        lock.lock();
        drop(lock);
        assert_eq!(mutex.depth(), 0);
    }

    #[test]
    fn test_try_lock_on_taken_mutex() {
        let mutex = Mutex::new();
        let _held = ScopedLock::new(&mutex);
        scope(|s| {
            s.spawn(|| {
                let mut lock = ScopedLock::deferred(&mutex);
                assert!(!lock.try_lock());
                assert!(!lock.is_owner());
            });
        });
    }

    #[test]
    fn test_shared_lock() {
        let mutex = SharedMutex::new();
        {
            let _first = ScopedSharedLock::new(&mutex);
            let mut second = ScopedSharedLock::deferred(&mutex);
            assert!(second.try_lock());
            assert_eq!(mutex.shared_count(), 2);
        }
        assert_eq!(mutex.shared_count(), 0);

        // and the exclusive one over the same mutex
        let _exclusive = ScopedLock::new(&mutex);
        let mut shared = ScopedSharedLock::deferred(&mutex);
        assert!(!shared.try_lock());
    }

    #[test]
    fn test_unlocks_on_panic() {
        let mutex = Mutex::new();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _lock = ScopedLock::new(&mutex);
            panic!("failed while holding the lock");
        }));
        assert!(result.is_err());
        assert!(!mutex.is_locked());

        let shared = SharedMutex::new();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _first = ScopedSharedLock::new(&shared);
            let _second = ScopedSharedLock::new(&shared);
            assert_eq!(shared.shared_count(), 2);
            panic!("failed while reading");
        }));
        assert!(result.is_err());
        assert_eq!(shared.shared_count(), 0);
        assert!(shared.try_lock());
        shared.unlock();
    }

    #[test]
    #[should_panic(expected = "does not own the mutex")]
    fn test_unlock_when_not_owner() {
        let mutex = Mutex::new();
        ScopedLock::deferred(&mutex).unlock();
    }
}
