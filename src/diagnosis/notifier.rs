use crate::diagnosis::{CallStackTracer, CallTrace};

/// Adds a call trace to a tracer, removes it when dropped, unwinding included.
///
/// Usually made by [trace_callstack!](crate::trace_callstack) or [trace_method!](crate::trace_method).
#[must_use = "the trace is removed as soon as the notifier is dropped"]
pub struct ScopedCallTraceNotifier<'a> {
    tracer: &'a CallStackTracer,
}

impl ScopedCallTraceNotifier<'static> {
    /// Traces into the process-wide tracer.
    pub fn new(trace: CallTrace) -> Self {
        Self::with_tracer(CallStackTracer::get(), trace)
    }
}

impl<'a> ScopedCallTraceNotifier<'a> {
    pub fn with_tracer(tracer: &'a CallStackTracer, trace: CallTrace) -> Self {
        tracer.add_trace(trace);
        Self { tracer }
    }
}

impl Drop for ScopedCallTraceNotifier<'_> {
    fn drop(&mut self) {
        self.tracer.remove_last_trace();
    }
}

/// The path of the enclosing function, closures stripped, e.g. `my_crate::parser::parse`.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let mut name = name.strip_suffix("::f").unwrap_or(name);
        while let Some(outer) = name.strip_suffix("::{{closure}}") {
            name = outer;
        }
        name
    }};
}

/// Traces the enclosing function into the process-wide tracer until the end of the block.
///
/// ```
/// use threads_n_traces::{diagnosis::CallStackTracer, trace_callstack};
///
/// fn add(a: i32, b: i32) -> i32 {
///     trace_callstack!(a, b);
///     CallStackTracer::get().dump();
///     a + b
/// }
/// # assert_eq!(add(1, 2), 3);
/// ```
#[macro_export]
macro_rules! trace_callstack {
    ($($argument:expr),* $(,)?) => {
        let _call_trace_notifier = $crate::diagnosis::ScopedCallTraceNotifier::new(
            $crate::diagnosis::CallTrace::new(
                $crate::function_name!(),
                ::std::vec![$($crate::diagnosis::ArgumentTrace::new(&$argument)),*],
            ),
        );
    };
}

/// Same as [trace_callstack!](crate::trace_callstack) for a method, with the name of its type.
///
/// `state = ...` right after the type records the object's state, anything `Display`.
///
/// ```
/// use threads_n_traces::trace_method;
///
/// struct Counter(u32);
///
/// impl Counter {
///     fn bump(&mut self, by: u32) {
///         trace_method!(Counter, state = self.0, by);
///         self.0 += by;
///     }
/// }
/// # Counter(0).bump(1);
/// ```
#[macro_export]
macro_rules! trace_method {
    ($class:ty, state = $state:expr $(, $argument:expr)* $(,)?) => {
        let _call_trace_notifier = $crate::diagnosis::ScopedCallTraceNotifier::new(
            $crate::diagnosis::CallTrace::new(
                $crate::function_name!(),
                ::std::vec![$($crate::diagnosis::ArgumentTrace::new(&$argument)),*],
            )
            .with_class_name(::std::stringify!($class))
            .with_object_state(::std::string::ToString::to_string(&$state)),
        );
    };
    ($class:ty $(, $argument:expr)* $(,)?) => {
        let _call_trace_notifier = $crate::diagnosis::ScopedCallTraceNotifier::new(
            $crate::diagnosis::CallTrace::new(
                $crate::function_name!(),
                ::std::vec![$($crate::diagnosis::ArgumentTrace::new(&$argument)),*],
            )
            .with_class_name(::std::stringify!($class)),
        );
    };
}
