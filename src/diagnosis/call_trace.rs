use std::{
    borrow::Cow,
    fmt::{Debug, Display},
};

/// One argument of a traced call: the name of its type and its value as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentTrace {
    type_name: Cow<'static, str>,
    value: String,
}

impl ArgumentTrace {
    /// Takes the value's `Debug` form, strings come out quoted.
    pub fn new<T: Debug + ?Sized>(value: &T) -> Self {
        Self {
            type_name: Cow::Borrowed(std::any::type_name::<T>()),
            value: format!("{value:?}"),
        }
    }

    /// Takes the value's `Display` form.
    pub fn with_display<T: Display + ?Sized>(value: &T) -> Self {
        Self {
            type_name: Cow::Borrowed(std::any::type_name::<T>()),
            value: value.to_string(),
        }
    }

    pub fn from_parts(type_name: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            value: value.into(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A function call: its signature and arguments, optionally the type it's a method of
/// and the state of the object it was called on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTrace {
    signature: Cow<'static, str>,
    arguments: Vec<ArgumentTrace>,
    class_name: Option<Cow<'static, str>>,
    object_state: Option<String>,
}

impl CallTrace {
    pub fn new(signature: impl Into<Cow<'static, str>>, arguments: Vec<ArgumentTrace>) -> Self {
        Self {
            signature: signature.into(),
            arguments,
            class_name: None,
            object_state: None,
        }
    }

    pub fn with_class_name(self, class_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            ..self
        }
    }

    pub fn with_object_state(self, object_state: impl Into<String>) -> Self {
        Self {
            object_state: Some(object_state.into()),
            ..self
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn arguments(&self) -> &[ArgumentTrace] {
        &self.arguments
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn object_state(&self) -> Option<&str> {
        self.object_state.as_deref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_argument_from_debug() {
        let argument = ArgumentTrace::new(&5);
        assert_eq!(argument.type_name(), "i32");
        assert_eq!(argument.value(), "5");

        let argument = ArgumentTrace::new("text");
        assert_eq!(argument.type_name(), "str");
        assert_eq!(argument.value(), "\"text\"");
    }

    #[test]
    fn test_argument_from_display() {
        let argument = ArgumentTrace::with_display("text");
        assert_eq!(argument.type_name(), "str");
        assert_eq!(argument.value(), "text");
    }

    #[test]
    fn test_call_trace() {
        let trace = CallTrace::new(
            "fn add(i32, i32)",
            vec![ArgumentTrace::new(&1), ArgumentTrace::new(&2)],
        );
        assert_eq!(trace.signature(), "fn add(i32, i32)");
        assert_eq!(trace.arguments().len(), 2);
        assert_eq!(trace.arguments()[1].value(), "2");
        assert_eq!(trace.class_name(), None);
        assert_eq!(trace.object_state(), None);

        let trace = trace.with_class_name("Calculator").with_object_state("total=3");
        assert_eq!(trace.class_name(), Some("Calculator"));
        assert_eq!(trace.object_state(), Some("total=3"));
    }
}
