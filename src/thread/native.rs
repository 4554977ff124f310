//! The OS calls behind thread handles and priorities.
//!
//! POSIX goes through the `libc` crate (`pthread_*`), Windows through a handful of kernel32 functions.

use crate::error::PriorityError;
use crate::thread::priority::ThreadPriority;

#[cfg(unix)]
pub use unix::*;
#[cfg(windows)]
pub use windows::*;

#[cfg(unix)]
mod unix {
    use super::*;
    use crate::thread::priority::{PosixPriorityRange, PriorityMapping};

    pub type NativeHandle = libc::pthread_t;

    pub(crate) fn current_handle() -> NativeHandle {
        // SAFETY: always succeeds
        unsafe { libc::pthread_self() }
    }

    /// pthread_t is an integer on Linux and a pointer on macOS, either way it's the handle's value
    #[allow(clippy::unnecessary_cast)]
    pub(crate) fn handle_number(handle: NativeHandle) -> u64 {
        handle as usize as u64
    }

    pub(crate) fn read_priority(handle: NativeHandle) -> Result<ThreadPriority, PriorityError> {
        let mut policy: libc::c_int = 0;
        // SAFETY: sched_param is plain data
        let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
        // SAFETY: both out-pointers are valid, the handle belongs to a joinable or the current thread
        let code = unsafe { libc::pthread_getschedparam(handle, &mut policy, &mut param) };
        if code != 0 {
            return Err(PriorityError::Os { code });
        }
        Ok(PosixPriorityRange::of_policy(policy).from_native(param.sched_priority))
    }

    pub(crate) fn write_priority(
        handle: NativeHandle,
        priority: ThreadPriority,
    ) -> Result<(), PriorityError> {
        write_priority_within(handle, PosixPriorityRange::of_policy(libc::SCHED_OTHER), priority)
    }

    /// Sets a SCHED_OTHER priority, `range` being what the OS reports for the policy.
    pub(crate) fn write_priority_within(
        handle: NativeHandle,
        range: PosixPriorityRange,
        priority: ThreadPriority,
    ) -> Result<(), PriorityError> {
        if !range.represents(priority) {
            return Err(PriorityError::Unrepresentable {
                requested: priority,
                range: range.to_string(),
            });
        }

        // SAFETY: sched_param is plain data
        let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
        param.sched_priority = range.to_native(priority);
        // SAFETY: param is valid for the call, the handle belongs to a joinable or the current thread
        let code = unsafe { libc::pthread_setschedparam(handle, libc::SCHED_OTHER, &param) };
        if code != 0 {
            return Err(PriorityError::Os { code });
        }
        Ok(())
    }
}

#[cfg(windows)]
mod windows {
    use std::os::raw::c_void;

    use super::*;
    use crate::thread::priority::{PriorityMapping, WindowsPriorities};

    pub type NativeHandle = std::os::windows::io::RawHandle;

    const THREAD_PRIORITY_ERROR_RETURN: i32 = 0x7fff_ffff;

    #[link(name = "kernel32")]
    extern "system" {
        fn GetCurrentThread() -> *mut c_void;
        fn GetThreadId(thread: *mut c_void) -> u32;
        fn GetThreadPriority(thread: *mut c_void) -> i32;
        fn SetThreadPriority(thread: *mut c_void, priority: i32) -> i32;
        fn GetLastError() -> u32;
    }

    pub(crate) fn current_handle() -> NativeHandle {
        // SAFETY: returns a pseudo handle, always succeeds
        unsafe { GetCurrentThread() }
    }

    /// the thread id, the handle value itself is meaningless for a pseudo handle
    pub(crate) fn handle_number(handle: NativeHandle) -> u64 {
        // SAFETY: the handle belongs to a live thread object
        unsafe { GetThreadId(handle) as u64 }
    }

    pub(crate) fn read_priority(handle: NativeHandle) -> Result<ThreadPriority, PriorityError> {
        // SAFETY: the handle belongs to a live thread object
        let native = unsafe { GetThreadPriority(handle) };
        if native == THREAD_PRIORITY_ERROR_RETURN {
            // SAFETY: no preconditions
            let code = unsafe { GetLastError() } as i32;
            return Err(PriorityError::Os { code });
        }
        Ok(WindowsPriorities.from_native(native))
    }

    pub(crate) fn write_priority(
        handle: NativeHandle,
        priority: ThreadPriority,
    ) -> Result<(), PriorityError> {
        // SAFETY: the handle belongs to a live thread object
        let done = unsafe { SetThreadPriority(handle, WindowsPriorities.to_native(priority)) };
        if done == 0 {
            // SAFETY: no preconditions
            let code = unsafe { GetLastError() } as i32;
            return Err(PriorityError::Os { code });
        }
        Ok(())
    }
}
