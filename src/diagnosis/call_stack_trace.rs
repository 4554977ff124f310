use std::slice;

use crate::diagnosis::CallTrace;

/// The calls a thread is currently in, the outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStackTrace {
    /// what the thread's `to_string` gave, e.g. `Thread(140037411784256)`
    thread_id: String,
    traces: Vec<CallTrace>,
}

impl CallStackTrace {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            traces: Vec::new(),
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn push(&mut self, trace: CallTrace) {
        self.traces.push(trace);
    }

    pub fn pop(&mut self) -> CallTrace {
        match self.traces.pop() {
            Some(trace) => trace,
            None => {
                precondition!(false, "There are no call traces to remove.");
                unreachable!()
            }
        }
    }

    pub fn count(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// 0 is the outermost call.
    pub fn trace(&self, index: usize) -> &CallTrace {
        precondition!(
            index < self.traces.len(),
            "The index ({index}) must be lower than the number of traces ({}).",
            self.traces.len()
        );
        &self.traces[index]
    }

    pub fn iter(&self) -> slice::Iter<'_, CallTrace> {
        self.traces.iter()
    }
}

impl<'a> IntoIterator for &'a CallStackTrace {
    type Item = &'a CallTrace;
    type IntoIter = slice::Iter<'a, CallTrace>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut stack = CallStackTrace::new("Thread(1)");
        assert!(stack.is_empty());

        stack.push(CallTrace::new("outer()", vec![]));
        stack.push(CallTrace::new("inner()", vec![]));
        assert_eq!(stack.count(), 2);
        assert_eq!(stack.trace(0).signature(), "outer()");

        assert_eq!(stack.pop().signature(), "inner()");
        let left: Vec<&str> = stack.iter().map(CallTrace::signature).collect();
        assert_eq!(left, ["outer()"]);
        assert_eq!(stack.thread_id(), "Thread(1)");
    }

    #[test]
    #[should_panic(expected = "no call traces to remove")]
    fn test_pop_empty() {
        CallStackTrace::new("Thread(1)").pop();
    }

    #[test]
    #[should_panic(expected = "must be lower")]
    fn test_trace_out_of_bounds() {
        CallStackTrace::new("Thread(1)").trace(0);
    }
}
