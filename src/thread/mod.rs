//! # Threads
//!
//! [Thread] owns exactly one OS thread. It starts running as soon as the handle is created
//! and the handle has to be joined or detached before it's dropped: dropping a live handle is a bug and panics.
//!
//! ```text
//! spawn ──> alive ──join()──> not alive
//!             └────detach()──> not alive (the OS thread carries on)
//! ```
//!
//! "Alive" means "joinable": a thread whose function already returned is still alive until it's joined.
//!
//! Arguments are bound the Rust way, by moving them into the closure.
//!
//! Interruption is cooperative, see [interrupt].

pub(crate) mod interrupt;
mod native;
pub mod priority;
pub mod this_thread;

use std::{
    fmt,
    sync::Arc,
    thread::{Builder, JoinHandle},
};

use tracing::{debug, error};

use crate::error::{panic_message, JoinError, SpawnError};
use interrupt::{Completion, ThreadContext};
use priority::ThreadPriority;

pub use native::NativeHandle;
pub use std::thread::ThreadId;

pub struct Thread {
    /// None once joined or detached
    handle: Option<JoinHandle<()>>,
    context: Arc<ThreadContext>,
}

/// Optional settings of the OS thread, see [Thread::builder].
#[derive(Debug)]
pub struct ThreadBuilder {
    builder: Builder,
}

impl ThreadBuilder {
    pub fn new() -> Self {
        Self {
            builder: Builder::new(),
        }
    }

    /// will be in panic messages and debuggers
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            builder: self.builder.name(name.into()),
        }
    }

    pub fn stack_size(self, size: usize) -> Self {
        Self {
            builder: self.builder.stack_size(size),
        }
    }

    /// Starts the thread right away.
    pub fn spawn<F>(self, function: F) -> Result<Thread, SpawnError>
    where
        F: FnOnce() + Send + 'static,
    {
        let context = ThreadContext::new();
        let thread_context = context.clone();

        let handle = self.builder.spawn(move || {
            ThreadContext::install(thread_context.clone());
            // marks the thread finished even if the function panics
            let _completion = Completion(thread_context);
            debug!(thread = %this_thread::to_string(), "thread started");
            function();
            debug!(thread = %this_thread::to_string(), "thread function returned");
        })?;

        Ok(Thread {
            handle: Some(handle),
            context,
        })
    }
}

impl Default for ThreadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Thread {
    /// Starts `function` on a new OS thread.
    ///
    /// # Panics
    /// If the OS can't create a thread, see [Thread::try_spawn] to handle that.
    pub fn spawn<F>(function: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        match Self::try_spawn(function) {
            Ok(thread) => thread,
            Err(e) => {
                error!(error = %e, "failed to spawn a thread");
                panic!("{e}");
            }
        }
    }

    pub fn try_spawn<F>(function: F) -> Result<Self, SpawnError>
    where
        F: FnOnce() + Send + 'static,
    {
        ThreadBuilder::new().spawn(function)
    }

    pub fn builder() -> ThreadBuilder {
        ThreadBuilder::new()
    }

    /// Asks the thread to stop at its next interruption point. It doesn't stop anything by force.
    pub fn interrupt(&self) {
        precondition!(
            self.is_alive(),
            "The thread cannot be interrupted, it is not running."
        );
        debug!(thread = %self, "interruption requested");
        self.context.interrupt();
    }

    /// Waits for the thread to end. An interruption point for the calling thread.
    ///
    /// After an `Ok` or a `Panicked` the thread isn't alive anymore, after `Interrupted` it still is.
    pub fn join(&mut self) -> Result<(), JoinError> {
        precondition!(
            self.is_alive(),
            "The thread cannot be joined, it is not running."
        );
        precondition!(
            this_thread::id() != self.id(),
            "Deadlock detected: The thread is trying to wait for itself to finish."
        );
        precondition!(
            !this_thread::is_interrupted(),
            "The thread that is calling this method of this instance was interrupted."
        );

        self.context
            .wait_for_completion(&ThreadContext::current())?;

        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|payload| JoinError::Panicked(panic_message(&*payload)))?;
        }
        Ok(())
    }

    /// Lets the OS thread run on its own, the handle can be dropped afterwards.
    pub fn detach(&mut self) {
        precondition!(
            self.is_alive(),
            "The thread cannot be detached, it is not running."
        );
        debug!(thread = %self, "thread detached");
        self.handle = None;
    }

    pub fn is_alive(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether the thread's function is over, it may still be alive until joined.
    pub fn is_finished(&self) -> bool {
        self.context.is_finished()
    }

    pub fn is_interrupted(&self) -> bool {
        self.context.is_interrupt_requested()
    }

    pub fn id(&self) -> ThreadId {
        self.alive_handle("It is not possible to get the Id of a not-running thread.")
            .thread()
            .id()
    }

    pub fn native_handle(&self) -> NativeHandle {
        let message = "It is not possible to get the native handle of a not-running thread.";
        let handle = self.alive_handle(message);
        #[cfg(unix)]
        {
            use std::os::unix::thread::JoinHandleExt;
            handle.as_pthread_t()
        }
        #[cfg(windows)]
        {
            use std::os::windows::io::AsRawHandle;
            handle.as_raw_handle()
        }
    }

    pub fn priority(&self) -> ThreadPriority {
        precondition!(
            self.is_alive(),
            "It is not possible to get the priority of a not-running thread."
        );
        priority::query(self.native_handle(), &self.to_string())
    }

    /// Best effort: if the OS refuses, a warning is logged and the priority stays as it was.
    pub fn set_priority(&self, priority: ThreadPriority) {
        precondition!(
            self.is_alive(),
            "It is not possible to set the priority of a not-running thread."
        );
        priority::apply(self.native_handle(), priority, &self.to_string())
    }

    fn alive_handle(&self, message: &str) -> &JoinHandle<()> {
        precondition!(self.handle.is_some(), "{message}");
        match &self.handle {
            Some(handle) => handle,
            None => unreachable!(),
        }
    }
}

/// `Thread(<number>)`, same as [this_thread::to_string] gives inside the thread.
impl fmt::Display for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread({})", native::handle_number(self.native_handle()))
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("alive", &self.is_alive())
            .field("finished", &self.is_finished())
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        // don't turn a failing test into an abort
        if !std::thread::panicking() {
            precondition!(
                !self.is_alive(),
                "The thread handler was destroyed while the thread was still alive."
            );
        }
    }
}
