//! # Thread priorities
//!
//! The portable side is 5 levels, [ThreadPriority]. The native side differs per OS:
//!
//! Windows: there are 5 named priorities, it's a 1:1 mapping, see [WindowsPriorities].
//!
//! POSIX: every scheduling policy has its own range, asked from the OS with
//! `sched_get_priority_min` / `sched_get_priority_max`. Only SCHED_OTHER is used to set priorities.
//! The range is split into thirds, see [PosixPriorityRange]:
//! - exactly max - Highest
//! - the top third - High
//! - the middle third - Normal
//! - the bottom third - Low
//! - exactly min - Lowest
//!
//! Nothing guarantees max >= min, an inverted range is split the same way mirrored.
//! Some ranges are too narrow for all 5 levels (Linux gives SCHED_OTHER `[0, 0]`),
//! a level that wouldn't read back as itself is refused with a warning instead of being silently changed.

use std::fmt;

use strum_macros::{Display, EnumIter, EnumString};
use tracing::warn;

use crate::error::PriorityError;
use crate::thread::native::{self, NativeHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ThreadPriority {
    Lowest,
    Low,
    Normal,
    High,
    Highest,
}

/// Conversion between the portable levels and the numbers an OS understands.
pub trait PriorityMapping {
    fn to_native(&self, priority: ThreadPriority) -> i32;
    fn from_native(&self, native: i32) -> ThreadPriority;

    /// Whether `priority` survives the trip to the native side and back.
    fn represents(&self, priority: ThreadPriority) -> bool {
        self.from_native(self.to_native(priority)) == priority
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosixPriorityRange {
    pub min: i32,
    pub max: i32,
}

impl PosixPriorityRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// The range the OS reports for a scheduling policy.
    #[cfg(unix)]
    pub fn of_policy(policy: libc::c_int) -> Self {
        // SAFETY: plain queries, an unknown policy just gives -1
        unsafe {
            Self {
                min: libc::sched_get_priority_min(policy),
                max: libc::sched_get_priority_max(policy),
            }
        }
    }

    /// (low limit, high limit) - where the bottom third ends and the top third starts.
    fn limits(&self) -> (i32, i32) {
        if self.max >= self.min {
            let part = (self.max - self.min) / 3;
            (self.min + part, self.max - part)
        } else {
            let part = (self.min - self.max) / 3;
            (self.min - part, self.max + part)
        }
    }
}

impl fmt::Display for PosixPriorityRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

impl PriorityMapping for PosixPriorityRange {
    fn to_native(&self, priority: ThreadPriority) -> i32 {
        let (low, high) = self.limits();
        match priority {
            ThreadPriority::Highest => self.max,
            ThreadPriority::High => high,
            ThreadPriority::Normal => 0,
            ThreadPriority::Low => low,
            ThreadPriority::Lowest => self.min,
        }
    }

    fn from_native(&self, native: i32) -> ThreadPriority {
        let (low, high) = self.limits();
        let (min, max) = (self.min, self.max);

        if min == max {
            // nothing to choose from
            ThreadPriority::Normal
        } else if native == max {
            ThreadPriority::Highest
        } else if native == min {
            ThreadPriority::Lowest
        } else if max > min {
            if native > low && native < high {
                ThreadPriority::Normal
            } else if native >= high && native < max {
                ThreadPriority::High
            } else if native > min && native <= low {
                ThreadPriority::Low
            } else {
                // out of the range
                ThreadPriority::Normal
            }
        } else if native < low && native > high {
            ThreadPriority::Normal
        } else if native <= high && native > max {
            ThreadPriority::High
        } else if native < min && native >= low {
            ThreadPriority::Low
        } else {
            ThreadPriority::Normal
        }
    }
}

/// THREAD_PRIORITY_LOWEST ..= THREAD_PRIORITY_HIGHEST
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsPriorities;

impl WindowsPriorities {
    pub const LOWEST: i32 = -2;
    pub const BELOW_NORMAL: i32 = -1;
    pub const NORMAL: i32 = 0;
    pub const ABOVE_NORMAL: i32 = 1;
    pub const HIGHEST: i32 = 2;
}

impl PriorityMapping for WindowsPriorities {
    fn to_native(&self, priority: ThreadPriority) -> i32 {
        match priority {
            ThreadPriority::Lowest => Self::LOWEST,
            ThreadPriority::Low => Self::BELOW_NORMAL,
            ThreadPriority::Normal => Self::NORMAL,
            ThreadPriority::High => Self::ABOVE_NORMAL,
            ThreadPriority::Highest => Self::HIGHEST,
        }
    }

    fn from_native(&self, native: i32) -> ThreadPriority {
        match native {
            Self::LOWEST => ThreadPriority::Lowest,
            Self::BELOW_NORMAL => ThreadPriority::Low,
            Self::ABOVE_NORMAL => ThreadPriority::High,
            Self::HIGHEST => ThreadPriority::Highest,
            // NORMAL, and the idle / time critical extremes there's no portable level for
            _ => ThreadPriority::Normal,
        }
    }
}

/// Reads the priority of a thread, a failure is logged and reads as Normal.
pub(crate) fn query(handle: NativeHandle, thread: &str) -> ThreadPriority {
    native::read_priority(handle).unwrap_or_else(|e| {
        warn!(%thread, error = %e, "couldn't get the thread priority");
        ThreadPriority::Normal
    })
}

/// Changes the priority of a thread, a failure is only logged and the old priority stays.
pub(crate) fn apply(handle: NativeHandle, priority: ThreadPriority, thread: &str) {
    if let Err(e) = native::write_priority(handle, priority) {
        warn!(%thread, %priority, error = %e, "couldn't set the thread priority");
    }
}
