use std::fmt::{self, Write};

use crate::diagnosis::{CallStackTrace, CallTrace};

/// Turns a call stack into text, piece by piece.
///
/// A printer calls the stack header, then header / body / footer of every call with its depth
/// (0 for the outermost), then the stack footer.
pub trait CallStackTraceFormatter: Send + Sync {
    fn format_call_stack_trace_header(
        &self,
        stack: &CallStackTrace,
        out: &mut dyn Write,
    ) -> fmt::Result;
    fn format_call_stack_trace_footer(
        &self,
        stack: &CallStackTrace,
        out: &mut dyn Write,
    ) -> fmt::Result;
    fn format_call_trace_header(
        &self,
        trace: &CallTrace,
        depth: usize,
        out: &mut dyn Write,
    ) -> fmt::Result;
    fn format_call_trace(
        &self,
        trace: &CallTrace,
        depth: usize,
        out: &mut dyn Write,
    ) -> fmt::Result;

    fn format_call_trace_footer(
        &self,
        _trace: &CallTrace,
        _depth: usize,
        _out: &mut dyn Write,
    ) -> fmt::Result {
        Ok(())
    }

    /// The whole stack in one go.
    fn format(&self, stack: &CallStackTrace) -> Result<String, fmt::Error> {
        let mut text = String::new();
        self.format_call_stack_trace_header(stack, &mut text)?;
        for (depth, trace) in stack.iter().enumerate() {
            self.format_call_trace_header(trace, depth, &mut text)?;
            self.format_call_trace(trace, depth, &mut text)?;
            self.format_call_trace_footer(trace, depth, &mut text)?;
        }
        self.format_call_stack_trace_footer(stack, &mut text)?;
        Ok(text)
    }
}

/// ```text
/// Call stack trace for Thread(140037411784256)
/// -->fn main()
///   -->fn add(i32, i32)
///     | -{0}i32=1
///     | -{1}i32=2
/// End of call stack trace information.
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextFormatter;

fn indent(depth: usize, out: &mut dyn Write) -> fmt::Result {
    write!(out, "{:width$}", "", width = depth * 2)
}

impl CallStackTraceFormatter for PlainTextFormatter {
    fn format_call_stack_trace_header(
        &self,
        stack: &CallStackTrace,
        out: &mut dyn Write,
    ) -> fmt::Result {
        writeln!(out, "Call stack trace for {}", stack.thread_id())
    }

    fn format_call_stack_trace_footer(
        &self,
        _stack: &CallStackTrace,
        out: &mut dyn Write,
    ) -> fmt::Result {
        writeln!(out, "End of call stack trace information.")
    }

    fn format_call_trace_header(
        &self,
        _trace: &CallTrace,
        depth: usize,
        out: &mut dyn Write,
    ) -> fmt::Result {
        indent(depth, out)?;
        write!(out, "-->")
    }

    fn format_call_trace(
        &self,
        trace: &CallTrace,
        depth: usize,
        out: &mut dyn Write,
    ) -> fmt::Result {
        writeln!(out, "{}", trace.signature())?;
        for (i, argument) in trace.arguments().iter().enumerate() {
            indent(depth, out)?;
            writeln!(out, "  | -{{{i}}}{}={}", argument.type_name(), argument.value())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diagnosis::ArgumentTrace;

    #[test]
    fn test_plain_text() {
        let mut stack = CallStackTrace::new("Thread(42)");
        stack.push(CallTrace::new("fn main()", vec![]));
        stack.push(CallTrace::new(
            "fn add(i32, i32)",
            vec![ArgumentTrace::new(&1), ArgumentTrace::new(&2)],
        ));
        stack.push(CallTrace::new("fn log(&str)", vec![ArgumentTrace::with_display("sum")]));

        assert_eq!(
            PlainTextFormatter.format(&stack).unwrap(),
            "Call stack trace for Thread(42)\n\
             -->fn main()\n  \
             -->fn add(i32, i32)\n    \
             | -{0}i32=1\n    \
             | -{1}i32=2\n    \
             -->fn log(&str)\n      \
             | -{0}str=sum\n\
             End of call stack trace information.\n"
        );
    }

    #[test]
    fn test_plain_text_empty_stack() {
        let stack = CallStackTrace::new("Thread(7)");
        assert_eq!(
            PlainTextFormatter.format(&stack).unwrap(),
            "Call stack trace for Thread(7)\nEnd of call stack trace information.\n"
        );
    }
}
