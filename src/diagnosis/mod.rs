//! # Call stack tracing
//!
//! Functions report themselves to a [CallStackTracer] on entry and exit, so at any point a thread
//! can dump the calls it's in, with their arguments. Nothing is collected from the real stack,
//! only what was reported: the usual way is [trace_callstack!](crate::trace_callstack) at the top of a function.
//!
//! ```text
//! CallStackTracer
//!   ├─ ThreadId -> CallStackTrace -> [CallTrace -> [ArgumentTrace]]
//!   └─ printer: CallStackTracePrinter ── formatter: CallStackTraceFormatter
//! ```
//!
//! A dump is formatted by the printer's formatter (plain text by default) and goes out as one string.

mod call_stack_trace;
mod call_trace;
mod formatter;
mod notifier;
mod printer;
mod tracer;

pub use call_stack_trace::CallStackTrace;
pub use call_trace::{ArgumentTrace, CallTrace};
pub use formatter::{CallStackTraceFormatter, PlainTextFormatter};
pub use notifier::ScopedCallTraceNotifier;
pub use printer::{CallStackTracePrinter, ConsolePrinter, LogPrinter, MemoryPrinter};
pub use tracer::CallStackTracer;
