//! # Cooperative interruption
//!
//! Nothing stops a thread from the outside. [Thread::interrupt](super::Thread::interrupt) raises a flag,
//! the target notices it only at an interruption point:
//! - [this_thread::sleep](super::this_thread::sleep)
//! - [Thread::join](super::Thread::join) while waiting for the other thread
//! - [ConditionVariable::wait](crate::sync::ConditionVariable::wait)
//!
//! The flag alone isn't enough, the target may already be asleep. So every blocked thread
//! publishes what it's blocked on and the interrupter wakes it up:
//! - sleeping happens on a per-thread condvar, the interrupter notifies it
//! - futex waits register their atomic, the interrupter bumps it by [INTERRUPT_BUMP] then wakes everyone on it
//!
//! The bump is 2 so bit 0 of a word is never touched. The completion word of a thread uses
//! bit 0 as "finished" and is bumped the same way when a joiner gets interrupted.

use std::{
    cell::RefCell,
    sync::{
        atomic::{
            AtomicBool, AtomicU32,
            Ordering::{Acquire, Relaxed, Release, SeqCst},
        },
        Arc,
    },
    time::{Duration, Instant},
};

use atomic_wait::{wait, wake_all};
use parking_lot::{Condvar, Mutex};

use crate::error::Interrupted;

pub(crate) const INTERRUPT_BUMP: u32 = 2;
const FINISHED: u32 = 1;

thread_local! {
    static CURRENT: RefCell<Option<Arc<ThreadContext>>> = const { RefCell::new(None) };
}

/// A pointer to the futex word a thread is blocked on.
struct BlockedOn(*const AtomicU32);

// SAFETY: the pointer is only dereferenced under the `blocked_on` lock,
// and the `Blocking` guard that put it there clears it under the same lock before the word can go away
unsafe impl Send for BlockedOn {}

/// Shared between a [Thread](super::Thread) handle and the OS thread it runs.
pub(crate) struct ThreadContext {
    interrupt_requested: AtomicBool,
    blocked_on: Mutex<Option<BlockedOn>>,
    sleep_lock: Mutex<()>,
    sleep_signal: Condvar,
    /// bit 0 - the thread's function is over, the rest is bumped by interrupts of a joiner
    completion: AtomicU32,
}

impl ThreadContext {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            interrupt_requested: AtomicBool::new(false),
            blocked_on: Mutex::new(None),
            sleep_lock: Mutex::new(()),
            sleep_signal: Condvar::new(),
            completion: AtomicU32::new(0),
        })
    }

    /// The context of the calling thread. Threads not started by [Thread](super::Thread)
    /// get one on first use, nobody holds a handle to interrupt them though.
    pub(crate) fn current() -> Arc<Self> {
        CURRENT
            .try_with(|current| current.borrow_mut().get_or_insert_with(Self::new).clone())
            // the thread-locals are being torn down (e.g. from an exit function)
            .unwrap_or_else(|_| Self::new())
    }

    /// Binds the context to the calling thread, done first thing by a freshly started thread.
    pub(crate) fn install(context: Arc<Self>) {
        CURRENT.with(|current| *current.borrow_mut() = Some(context));
    }

    pub(crate) fn interrupt(&self) {
        self.interrupt_requested.store(true, SeqCst);

        // a sleeper checks the flag under this lock, so it's either about to see it or already waiting
        {
            let _sleeping = self.sleep_lock.lock();
            self.sleep_signal.notify_all();
        }

        if let Some(BlockedOn(word)) = *self.blocked_on.lock() {
            // SAFETY: see BlockedOn
            let word = unsafe { &*word };
            word.fetch_add(INTERRUPT_BUMP, Relaxed);
            wake_all(word);
        }
    }

    pub(crate) fn is_interrupt_requested(&self) -> bool {
        self.interrupt_requested.load(SeqCst)
    }

    pub(crate) fn check_interrupt(&self) -> Result<(), Interrupted> {
        if self.is_interrupt_requested() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// Publishes the futex word the thread is about to wait on.
    /// The flag has to be checked *after* this, otherwise an interrupt can slip in between.
    pub(crate) fn blocking_on<'a>(&'a self, word: &'a AtomicU32) -> Blocking<'a> {
        *self.blocked_on.lock() = Some(BlockedOn(word));
        Blocking { context: self }
    }

    pub(crate) fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let deadline = Instant::now().checked_add(duration);
        let mut sleeping = self.sleep_lock.lock();
        loop {
            self.check_interrupt()?;
            match deadline {
                Some(deadline) => {
                    if self
                        .sleep_signal
                        .wait_until(&mut sleeping, deadline)
                        .timed_out()
                    {
                        return self.check_interrupt();
                    }
                }
                // too far away to represent, it's a sleep until interrupted
                None => self.sleep_signal.wait(&mut sleeping),
            }
        }
    }

    /// Called by the thread itself once its function is over, panicking or not.
    pub(crate) fn finish(&self) {
        self.completion.fetch_or(FINISHED, Release);
        wake_all(&self.completion);
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.completion.load(Acquire) & FINISHED != 0
    }

    /// Blocks `waiter` until this thread finishes, an interruption point for the waiter.
    pub(crate) fn wait_for_completion(&self, waiter: &ThreadContext) -> Result<(), Interrupted> {
        let _blocking = waiter.blocking_on(&self.completion);
        loop {
            let observed = self.completion.load(Acquire);
            if observed & FINISHED != 0 {
                return Ok(());
            }
            waiter.check_interrupt()?;
            wait(&self.completion, observed);
        }
    }
}

/// Unpublishes the futex word on drop.
pub(crate) struct Blocking<'a> {
    context: &'a ThreadContext,
}

impl Drop for Blocking<'_> {
    fn drop(&mut self) {
        *self.context.blocked_on.lock() = None;
    }
}

/// Marks the context finished when dropped, so a panicking function still releases its joiners.
pub(crate) struct Completion(pub(crate) Arc<ThreadContext>);

impl Drop for Completion {
    fn drop(&mut self) {
        self.0.finish();
    }
}

#[cfg(test)]
mod test {
    use std::thread::{scope, sleep};

    use super::*;

    #[test]
    fn test_current_is_stable() {
        let first = ThreadContext::current();
        let second = ThreadContext::current();
        assert!(Arc::ptr_eq(&first, &second));

        let other = scope(|s| s.spawn(ThreadContext::current).join().unwrap());
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn test_sleep_is_interrupted() {
        let context = ThreadContext::new();
        scope(|s| {
            let sleeper = s.spawn(|| {
                ThreadContext::install(context.clone());
                let started = Instant::now();
                let result = ThreadContext::current().sleep(Duration::from_secs(30));
                (result, started.elapsed())
            });
            sleep(Duration::from_millis(50));
            context.interrupt();

            let (result, elapsed) = sleeper.join().unwrap();
            assert_eq!(result, Err(Interrupted));
            assert!(elapsed < Duration::from_secs(10));
        });
    }

    #[test]
    fn test_sleep_runs_out() {
        let context = ThreadContext::new();
        let started = Instant::now();
        assert_eq!(context.sleep(Duration::from_millis(20)), Ok(()));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_bump_keeps_finished_bit() {
        let target = ThreadContext::new();
        let waiter = ThreadContext::new();
        {
            let _blocking = waiter.blocking_on(&target.completion);
            waiter.interrupt();
        }
        assert!(!target.is_finished());
        assert_eq!(target.wait_for_completion(&waiter), Err(Interrupted));

        target.finish();
        assert!(target.is_finished());
        waiter.interrupt();
        assert!(target.is_finished());
    }

    #[test]
    fn test_wait_for_completion() {
        let target = ThreadContext::new();
        scope(|s| {
            s.spawn(|| {
                sleep(Duration::from_millis(50));
                target.finish();
            });
            let waiter = ThreadContext::new();
            assert_eq!(target.wait_for_completion(&waiter), Ok(()));
        });
    }
}
