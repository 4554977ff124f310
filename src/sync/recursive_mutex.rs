//! # Recursive mutex
//!
//! Same futex protocol as [Mutex](super::Mutex), plus a depth counter.
//! The owner may lock it again and again, each lock needs its own unlock.
//! The depth is only ever touched by the owner, so Relaxed is enough for it.

use std::sync::atomic::{
    AtomicU32, AtomicU64,
    Ordering::Relaxed,
};

use crate::sync::mutex::{acquire, release, try_acquire, NO_OWNER};
use crate::sync::RawLock;
use crate::thread::this_thread;

pub struct RecursiveMutex {
    state: AtomicU32,
    owner: AtomicU64,
    depth: AtomicU32,
}

impl RecursiveMutex {
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(0),
            owner: AtomicU64::new(NO_OWNER),
            depth: AtomicU32::new(0),
        }
    }

    pub fn lock(&self) {
        let me = this_thread::token();
        if self.owner.load(Relaxed) == me {
            self.depth.fetch_add(1, Relaxed);
            return;
        }
        acquire(&self.state);
        self.owner.store(me, Relaxed);
        self.depth.store(1, Relaxed);
    }

    pub fn try_lock(&self) -> bool {
        let me = this_thread::token();
        if self.owner.load(Relaxed) == me {
            self.depth.fetch_add(1, Relaxed);
            true
        } else if try_acquire(&self.state) {
            self.owner.store(me, Relaxed);
            self.depth.store(1, Relaxed);
            true
        } else {
            false
        }
    }

    /// Releases one level, the lock itself goes away with the last one.
    pub fn unlock(&self) {
        precondition!(
            self.owner.load(Relaxed) == this_thread::token(),
            "The recursive mutex can't be unlocked by a thread that doesn't own it."
        );
        if self.depth.fetch_sub(1, Relaxed) == 1 {
            self.owner.store(NO_OWNER, Relaxed);
            release(&self.state);
        }
    }

    /// How many times the owner has locked it, 0 when unlocked.
    pub fn depth(&self) -> u32 {
        self.depth.load(Relaxed)
    }
}

impl Default for RecursiveMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RecursiveMutex {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            precondition!(
                *self.state.get_mut() == 0,
                "The recursive mutex was destroyed while it was still locked."
            );
        }
    }
}

impl RawLock for RecursiveMutex {
    fn lock(&self) {
        RecursiveMutex::lock(self)
    }

    fn try_lock(&self) -> bool {
        RecursiveMutex::try_lock(self)
    }

    fn unlock(&self) {
        RecursiveMutex::unlock(self)
    }
}
