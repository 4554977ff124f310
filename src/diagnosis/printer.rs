use std::{
    io::{stdout, Write},
    sync::Arc,
};

use tracing::{info, warn};

use crate::diagnosis::{CallStackTrace, CallStackTraceFormatter, PlainTextFormatter};

/// Where dumped call stacks end up.
pub trait CallStackTracePrinter: Send + Sync {
    /// Outputs text as is.
    fn print_string(&self, text: &str);

    fn formatter(&self) -> &dyn CallStackTraceFormatter;

    /// Formats the stack with [Self::formatter] and prints it in one piece.
    fn print_call_stack_trace(&self, stack: &CallStackTrace) {
        match self.formatter().format(stack) {
            Ok(text) => self.print_string(&text),
            Err(_) => warn!(
                thread = stack.thread_id(),
                "the call stack trace couldn't be formatted"
            ),
        }
    }
}

fn plain_text() -> Arc<dyn CallStackTraceFormatter> {
    Arc::new(PlainTextFormatter)
}

/// Prints to stdout.
pub struct ConsolePrinter {
    formatter: Arc<dyn CallStackTraceFormatter>,
}

impl ConsolePrinter {
    pub fn new() -> Self {
        Self::with_formatter(plain_text())
    }

    pub fn with_formatter(formatter: Arc<dyn CallStackTraceFormatter>) -> Self {
        Self { formatter }
    }
}

impl Default for ConsolePrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStackTracePrinter for ConsolePrinter {
    fn print_string(&self, text: &str) {
        let mut out = stdout().lock();
        // nobody to report a broken stdout to
        let _ = writeln!(out, "{}", text.trim_end_matches('\n'));
    }

    fn formatter(&self) -> &dyn CallStackTraceFormatter {
        self.formatter.as_ref()
    }
}

/// Sends every dump as one `info` event of the `call_stack` target.
pub struct LogPrinter {
    formatter: Arc<dyn CallStackTraceFormatter>,
}

impl LogPrinter {
    pub fn new() -> Self {
        Self::with_formatter(plain_text())
    }

    pub fn with_formatter(formatter: Arc<dyn CallStackTraceFormatter>) -> Self {
        Self { formatter }
    }
}

impl Default for LogPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStackTracePrinter for LogPrinter {
    fn print_string(&self, text: &str) {
        info!(target: "call_stack", "{}", text.trim_end_matches('\n'));
    }

    fn formatter(&self) -> &dyn CallStackTraceFormatter {
        self.formatter.as_ref()
    }
}

/// Keeps everything printed, in order.
pub struct MemoryPrinter {
    formatter: Arc<dyn CallStackTraceFormatter>,
    printed: parking_lot::Mutex<Vec<String>>,
}

impl MemoryPrinter {
    pub fn new() -> Self {
        Self::with_formatter(plain_text())
    }

    pub fn with_formatter(formatter: Arc<dyn CallStackTraceFormatter>) -> Self {
        Self {
            formatter,
            printed: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn printed(&self) -> Vec<String> {
        self.printed.lock().clone()
    }

    /// Gives away what was printed so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.printed.lock())
    }
}

impl Default for MemoryPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStackTracePrinter for MemoryPrinter {
    fn print_string(&self, text: &str) {
        self.printed.lock().push(text.to_string());
    }

    fn formatter(&self) -> &dyn CallStackTraceFormatter {
        self.formatter.as_ref()
    }
}

#[cfg(test)]
mod test {
    use std::fmt;

    use super::*;
    use crate::diagnosis::CallTrace;

    /// only the signatures, one per line
    struct SignaturesOnly;

    impl CallStackTraceFormatter for SignaturesOnly {
        fn format_call_stack_trace_header(
            &self,
            _: &CallStackTrace,
            _: &mut dyn fmt::Write,
        ) -> fmt::Result {
            Ok(())
        }

        fn format_call_stack_trace_footer(
            &self,
            _: &CallStackTrace,
            _: &mut dyn fmt::Write,
        ) -> fmt::Result {
            Ok(())
        }

        fn format_call_trace_header(
            &self,
            _: &CallTrace,
            _: usize,
            _: &mut dyn fmt::Write,
        ) -> fmt::Result {
            Ok(())
        }

        fn format_call_trace(
            &self,
            trace: &CallTrace,
            _: usize,
            out: &mut dyn fmt::Write,
        ) -> fmt::Result {
            writeln!(out, "{}", trace.signature())
        }
    }

    fn stack() -> CallStackTrace {
        let mut stack = CallStackTrace::new("Thread(3)");
        stack.push(CallTrace::new("first()", vec![]));
        stack.push(CallTrace::new("second()", vec![]));
        stack
    }

    #[test]
    fn test_memory_printer() {
        let printer = MemoryPrinter::new();
        printer.print_string("hello");
        printer.print_call_stack_trace(&stack());

        let printed = printer.take();
        assert_eq!(printed.len(), 2);
        assert_eq!(printed[0], "hello");
        assert!(printed[1]
            .starts_with("Call stack trace for Thread(3)\n-->first()\n  -->second()\n"));
        assert!(printer.printed().is_empty());
    }

    #[test]
    fn test_custom_formatter() {
        let printer = MemoryPrinter::with_formatter(Arc::new(SignaturesOnly));
        printer.print_call_stack_trace(&stack());
        assert_eq!(printer.printed(), ["first()\nsecond()\n"]);
    }

    #[test]
    fn test_console_and_log_printers() {
        // nothing to check but that they don't choke
        ConsolePrinter::new().print_call_stack_trace(&stack());
        LogPrinter::new().print_call_stack_trace(&stack());
    }
}
