use std::{
    cell::UnsafeCell,
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use crate::diagnosis::{CallStackTrace, CallStackTracePrinter, CallTrace};
use crate::sync::{ScopedLock, ScopedSharedLock, SharedMutex};
use crate::thread::{this_thread, ThreadId};

/// Keeps a call stack per thread and dumps them through a printer.
///
/// There are 2 locks: one for the stacks, one for the printer. Threads push and pop all the time,
/// the printer is swapped once in a while, they shouldn't wait for each other.
///
/// A stack stays in the map after its thread ends, it can still be dumped with [CallStackTracer::dump_thread].
/// Nothing is ever evicted, a process spawning lots of traced short-lived threads grows accordingly.
pub struct CallStackTracer {
    traces_lock: SharedMutex,
    traces: UnsafeCell<HashMap<ThreadId, CallStackTrace>>,
    printer_lock: SharedMutex,
    printer: UnsafeCell<Option<Arc<dyn CallStackTracePrinter>>>,
}

// SAFETY: `traces` is only touched under `traces_lock`, `printer` only under `printer_lock`
unsafe impl Sync for CallStackTracer {}

static INSTANCE: OnceLock<CallStackTracer> = OnceLock::new();

impl CallStackTracer {
    /// A standalone tracer, most code wants the process-wide one from [CallStackTracer::get].
    pub fn new() -> Self {
        Self {
            traces_lock: SharedMutex::new(),
            traces: UnsafeCell::new(HashMap::new()),
            printer_lock: SharedMutex::new(),
            printer: UnsafeCell::new(None),
        }
    }

    /// The process-wide tracer, created on first use.
    pub fn get() -> &'static Self {
        INSTANCE.get_or_init(Self::new)
    }

    /// Puts `trace` on top of the calling thread's stack.
    pub fn add_trace(&self, trace: CallTrace) {
        let id = this_thread::id();
        let _lock = ScopedLock::new(&self.traces_lock);
        // SAFETY: exclusively locked
        let traces = unsafe { &mut *self.traces.get() };
        traces
            .entry(id)
            .or_insert_with(|| CallStackTrace::new(this_thread::to_string()))
            .push(trace);
    }

    /// Removes the top of the calling thread's stack.
    pub fn remove_last_trace(&self) {
        let id = this_thread::id();
        let removed = {
            let _lock = ScopedLock::new(&self.traces_lock);
            // SAFETY: exclusively locked
            let traces = unsafe { &mut *self.traces.get() };
            match traces.get_mut(&id) {
                Some(stack) if !stack.is_empty() => {
                    stack.pop();
                    true
                }
                _ => false,
            }
        };
        precondition!(
            removed,
            "There are no call traces to remove for the current thread ({}).",
            this_thread::to_string()
        );
    }

    /// Prints the calling thread's stack, or a notice that there's nothing to print.
    /// Does nothing without a printer.
    pub fn dump(&self) {
        let notice = |_: Option<&str>| {
            format!(
                "There are no call stack traces for the current thread ({}).",
                this_thread::to_string()
            )
        };
        self.print(this_thread::id(), notice);
    }

    /// Prints the stack of any thread, finished ones included.
    ///
    /// The notice names the thread the way its stack does when the tracer has seen it,
    /// otherwise all there is to go by is the Rust [ThreadId].
    pub fn dump_thread(&self, id: ThreadId) {
        let notice = |label: Option<&str>| match label {
            Some(label) => format!("There are no call stack traces for the thread {label}."),
            None => format!(
                "There are no call stack traces for the thread with the Rust id {id:?}."
            ),
        };
        self.print(id, notice);
    }

    pub fn printer(&self) -> Option<Arc<dyn CallStackTracePrinter>> {
        let _lock = ScopedSharedLock::new(&self.printer_lock);
        // SAFETY: nobody writes under a shared lock
        unsafe { (*self.printer.get()).clone() }
    }

    /// None turns dumping off.
    pub fn set_printer(&self, printer: Option<Arc<dyn CallStackTracePrinter>>) {
        let previous = {
            let _lock = ScopedLock::new(&self.printer_lock);
            // SAFETY: exclusively locked
            unsafe { std::mem::replace(&mut *self.printer.get(), printer) }
        };
        // the old printer's drop runs outside of the lock
        drop(previous);
    }

    /// The threads that have a stack, empty or not.
    pub fn thread_ids(&self) -> Vec<ThreadId> {
        let _lock = ScopedSharedLock::new(&self.traces_lock);
        // SAFETY: nobody writes under a shared lock
        let traces = unsafe { &*self.traces.get() };
        traces.keys().copied().collect()
    }

    /// Copies the stack under the lock, prints outside of it, so a printer may trace calls itself.
    /// `notice` gets the thread's label if it has an emptied stack.
    fn print(&self, id: ThreadId, notice: impl FnOnce(Option<&str>) -> String) {
        let Some(printer) = self.printer() else {
            return;
        };

        let stack = {
            let _lock = ScopedSharedLock::new(&self.traces_lock);
            // SAFETY: nobody writes under a shared lock
            let traces = unsafe { &*self.traces.get() };
            traces.get(&id).cloned()
        };

        match stack {
            Some(stack) if !stack.is_empty() => printer.print_call_stack_trace(&stack),
            Some(stack) => printer.print_string(&notice(Some(stack.thread_id()))),
            None => printer.print_string(&notice(None)),
        }
    }
}

impl Default for CallStackTracer {
    fn default() -> Self {
        Self::new()
    }
}
