//! # The calling thread
//!
//! Everything that only makes sense for the thread that runs it: yielding, sleeping,
//! its own id / handle / priority, exit functions.

use std::{
    cell::RefCell,
    sync::atomic::{AtomicU64, Ordering::Relaxed},
    thread::ThreadId,
    time::Duration,
};

use tracing::{debug, warn};

use crate::error::Interrupted;
use crate::thread::interrupt::ThreadContext;
use crate::thread::native::{self, NativeHandle};
use crate::thread::priority::{self, ThreadPriority};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // no destructor => readable even while the other thread-locals are being torn down
    static TOKEN: u64 = NEXT_TOKEN.fetch_add(1, Relaxed);
    static EXIT_FUNCTIONS: ExitFunctions = const { ExitFunctions(RefCell::new(Vec::new())) };
}

/// A process-unique nonzero number of the calling thread, cheaper to compare than a [ThreadId].
pub(crate) fn token() -> u64 {
    TOKEN.with(|token| *token)
}

/// Gives the rest of the time slice away, any ready thread may run next.
pub fn yield_now() {
    std::thread::yield_now();
}

/// Sleeps for at least `duration`. An interruption point.
pub fn sleep(duration: Duration) -> Result<(), Interrupted> {
    ThreadContext::current().sleep(duration)
}

/// Just an interruption point, returns [Interrupted] if the thread was asked to stop.
pub fn interruption_point() -> Result<(), Interrupted> {
    ThreadContext::current().check_interrupt()
}

pub fn id() -> ThreadId {
    std::thread::current().id()
}

pub fn native_handle() -> NativeHandle {
    native::current_handle()
}

pub fn is_interrupted() -> bool {
    ThreadContext::current().is_interrupt_requested()
}

/// `Thread(<number>)` where the number is the native handle (the thread id on Windows).
pub fn to_string() -> String {
    format!("Thread({})", native::handle_number(native_handle()))
}

pub fn priority() -> ThreadPriority {
    priority::query(native_handle(), &to_string())
}

/// Best effort: if the OS refuses, a warning is logged and the priority stays as it was.
pub fn set_priority(priority: ThreadPriority) {
    priority::apply(native_handle(), priority, &to_string())
}

struct ExitFunctions(RefCell<Vec<Box<dyn FnOnce()>>>);

impl Drop for ExitFunctions {
    fn drop(&mut self) {
        let functions = std::mem::take(self.0.get_mut());
        for function in functions.into_iter().rev() {
            function();
        }
    }
}

/// Registers `function` to run when the calling thread ends, the last registered runs first.
///
/// They run while the thread-locals of the thread are being destroyed, so they shouldn't
/// register more exit functions. Threads not started by this crate get them too, except the main one:
/// the process may end before its thread-locals are destroyed.
pub fn set_exit_function<F: FnOnce() + 'static>(function: F) {
    let registered = EXIT_FUNCTIONS.try_with(|functions| {
        functions.0.borrow_mut().push(Box::new(function));
    });
    match registered {
        Ok(()) => debug!(thread = %to_string(), "exit function registered"),
        Err(_) => warn!(
            thread = %to_string(),
            "the thread is already exiting, the exit function is ignored"
        ),
    }
}
