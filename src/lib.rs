//! Threads with cooperative interruption, futex-based locks and a per-thread call stack tracer.
//!
//! - [sync] - mutexes, scoped locks, a deadlock-free pair lock, a condition variable
//! - [thread] - OS threads that must be joined or detached, portable priorities, the calling thread's utilities
//! - [diagnosis] - call stacks reported by the traced functions themselves, dumped on demand
//! - [error] - what can go wrong, and the contract checks

#[macro_use]
pub mod error;
pub mod diagnosis;
pub mod sync;
pub mod thread;

#[cfg(test)]
mod log_capture;
