//! # Shared mutex
//! It works similarly to the [Mutex](super::Mutex), but allows 2 types of locking
//! - exclusive - completely identical to the Mutex
//! - shared - there can be many holders at once
//!
//! Plus, there could be only one type of locks at a given moment of time.
//!
//! A single state tracks everything:
//! - 0 - not locked
//! - N - number of shared holders
//! - u32::MAX - exclusively locked
//!
//! All the memory ordering below is for the external users: Release on unlocking and Acquire on locking.
//!
//! Writers are only woken up when the last reader leaves, readers keep coming in while there are readers,
//! so a steady stream of readers can keep a writer waiting.

use std::sync::atomic::{
    AtomicU32, AtomicU64,
    Ordering::{Acquire, Relaxed, Release},
};

use atomic_wait::{wait, wake_all, wake_one};

use crate::sync::mutex::NO_OWNER;
use crate::sync::RawLock;
use crate::thread::this_thread;

const EXCLUSIVE: u32 = u32::MAX;

pub struct SharedMutex {
    state: AtomicU32,
    /// only for the exclusive mode, readers aren't tracked one by one
    owner: AtomicU64,
}

impl SharedMutex {
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(0),
            owner: AtomicU64::new(NO_OWNER),
        }
    }

    /// lock for writes
    pub fn lock(&self) {
        let me = this_thread::token();
        precondition!(
            self.owner.load(Relaxed) != me,
            "The shared mutex is already exclusively locked by the calling thread, \
             locking it again would dead-lock."
        );
        while let Err(s) = self
            .state
            .compare_exchange(0, EXCLUSIVE, Acquire, Relaxed)
        {
            // hang on the current value until it changes
            wait(&self.state, s);
        }
        self.owner.store(me, Relaxed);
    }

    pub fn try_lock(&self) -> bool {
        if self
            .state
            .compare_exchange(0, EXCLUSIVE, Acquire, Relaxed)
            .is_ok()
        {
            self.owner.store(this_thread::token(), Relaxed);
            true
        } else {
            false
        }
    }

    /// we can't tell who and how many are waiting for the lock, so tell 'em all
    pub fn unlock(&self) {
        precondition!(
            self.owner.load(Relaxed) == this_thread::token(),
            "The shared mutex can't be unlocked by a thread that doesn't own it exclusively."
        );
        self.owner.store(NO_OWNER, Relaxed);
        self.state.store(0, Release);
        wake_all(&self.state);
    }

    /// lock for reads, probably not for the 1st time
    pub fn lock_shared(&self) {
        let mut s = self.state.load(Relaxed);
        loop {
            if s < EXCLUSIVE {
                // don't allow MAX-1 shared locks to look like an exclusive one
                assert!(s < EXCLUSIVE - 2, "too many readers!");
                // weak is fine, we're in a loop anyway
                match self.state.compare_exchange_weak(s, s + 1, Acquire, Relaxed) {
                    Ok(_) => return,
                    Err(e) => s = e,
                }
            }
            if s == EXCLUSIVE {
                // wait for the exclusive lock to disappear
                wait(&self.state, EXCLUSIVE);
                s = self.state.load(Relaxed);
            }
        }
    }

    pub fn try_lock_shared(&self) -> bool {
        let mut s = self.state.load(Relaxed);
        while s < EXCLUSIVE - 2 {
            match self.state.compare_exchange_weak(s, s + 1, Acquire, Relaxed) {
                Ok(_) => return true,
                Err(e) => s = e,
            }
        }
        false
    }

    /// decrement by 1 and, if it reaches 0, notify one (any) of the writers
    pub fn unlock_shared(&self) {
        let s = self.state.load(Relaxed);
        precondition!(
            s != 0 && s != EXCLUSIVE,
            "The shared mutex isn't locked in shared mode, there's nothing to unlock."
        );
        if self.state.fetch_sub(1, Release) == 1 {
            wake_one(&self.state);
        }
    }

    /// How many shared holders are there right now, 0 when unlocked or exclusively locked.
    pub fn shared_count(&self) -> u32 {
        match self.state.load(Relaxed) {
            EXCLUSIVE => 0,
            n => n,
        }
    }
}

impl Default for SharedMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SharedMutex {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            precondition!(
                *self.state.get_mut() == 0,
                "The shared mutex was destroyed while it was still locked."
            );
        }
    }
}

impl RawLock for SharedMutex {
    fn lock(&self) {
        SharedMutex::lock(self)
    }

    fn try_lock(&self) -> bool {
        SharedMutex::try_lock(self)
    }

    fn unlock(&self) {
        SharedMutex::unlock(self)
    }
}
