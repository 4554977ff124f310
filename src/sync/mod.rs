//! # Synchronization primitives
//!
//! Mutex, recursive mutex, shared (read-write) mutex, a pair lock and a condition variable.
//! They're built on the futex-like wait and wake from the [atomic-wait](https://crates.io/crates/atomic-wait) crate,
//! so there's no OS-specific code here. Just 3 functions:
//! - `wait(&AtomicU32, u32)` - waits until woken up, blocks only if the atomic variable has the specified value, may wake up spuriously
//! - `wake_one(&AtomicU32)` - wakes a single thread that waits on the same atomic variable
//! - `wake_all(&AtomicU32)` - wakes all the threads waiting on the atomic variable
//!
//! None of the mutexes hold data. They expose explicit lock / try_lock / unlock, which
//! makes them usable from the scoped locks below and by code that locks in one place and unlocks in another.
//! Breaking the contract (unlocking a mutex you don't hold, destroying a locked one) panics.

mod condition_variable;
mod lock_pair;
pub(crate) mod mutex;
mod recursive_mutex;
mod scoped_lock;
mod shared_mutex;

pub use condition_variable::{ConditionVariable, WaitableLock};
pub use lock_pair::ScopedLockPair;
pub use mutex::Mutex;
pub use recursive_mutex::RecursiveMutex;
pub use scoped_lock::{ScopedLock, ScopedSharedLock};
pub use shared_mutex::SharedMutex;

/// The exclusive part every mutex here has in common.
pub trait RawLock {
    /// blocks until the lock is acquired
    fn lock(&self);
    /// never blocks
    fn try_lock(&self) -> bool;
    /// only the holder may call it
    fn unlock(&self);
}
