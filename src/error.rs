//! # Errors
//!
//! Two kinds of failures live in this crate.
//!
//! Broken contracts (unlocking a mutex the thread doesn't own, joining yourself, dropping a live thread...)
//! are bugs in the caller. They go through [precondition!] which logs the violation and panics on the spot,
//! so the report always comes from the violating thread.
//!
//! Everything else is a regular error value:
//! - [Interrupted] comes out of every interruption point
//! - [JoinError] is what [Thread::join](crate::thread::Thread::join) can end up with
//! - [SpawnError] when the OS refuses to give us a thread
//! - [PriorityError] never reaches the caller, it's only logged as a warning

use thiserror::Error;

use crate::thread::priority::ThreadPriority;

/// Checks a contract of the API, panics with the message if it's broken.
macro_rules! precondition {
    ($cond:expr, $($msg:tt)+) => {
        if !$cond {
            let message = format!($($msg)+);
            tracing::error!(%message, "precondition violated");
            panic!("{message}");
        }
    };
}

/// Returned by an interruption point (sleep, join, condition wait) once somebody
/// called [Thread::interrupt](crate::thread::Thread::interrupt) on the current thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the thread was interrupted")]
pub struct Interrupted;

#[derive(Debug, Error)]
pub enum JoinError {
    /// the joining thread got interrupted while waiting
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
    /// the joined thread's function panicked, the payload is turned into text
    #[error("the thread panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Error)]
#[error("the operating system refused to create a thread")]
pub struct SpawnError(#[from] std::io::Error);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriorityError {
    #[error("the operating system rejected the priority operation, error code {code}")]
    Os { code: i32 },
    #[error("priority {requested} can't be expressed within the native range {range}")]
    Unrepresentable {
        requested: ThreadPriority,
        range: String,
    },
}

/// Makes a readable message out of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    #[should_panic(expected = "two is not one")]
    fn test_precondition_panics_with_message() {
        precondition!(1 + 1 == 1, "{} is not one", "two");
    }

    #[test]
    fn test_precondition_passes() {
        precondition!(1 + 1 == 2, "math is broken");
    }

    #[test]
    fn test_panic_message() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(&*payload), "boom");

        let payload = std::panic::catch_unwind(|| panic!("{} {}", "formatted", 1)).unwrap_err();
        assert_eq!(panic_message(&*payload), "formatted 1");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(42)).unwrap_err();
        assert_eq!(panic_message(&*payload), "unknown panic payload");
    }
}
