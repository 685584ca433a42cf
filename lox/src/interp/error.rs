//! Runtime faults for the interpreter

use std::fmt;

/// Runtime fault raised during evaluation
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of runtime faults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Variable read before definition, or assignment to a never-defined name
    UndefinedName,
    /// Call expression whose callee value is not callable
    NotCallable,
    /// Call with the wrong argument count for the resolved callable
    ArityMismatch,
    /// Attribute access or assignment on a non-instance value
    NotAnObject,
    /// Attribute the instance's class hierarchy does not define
    NoSuchAttribute,
    /// Operator applied to operand types it does not support
    TypeMismatch,
    /// `super` used in a class with no superclass, or outside a class
    NoSuperclass,
    /// Recursion too deep
    StackOverflow,
}

impl RuntimeError {
    pub fn undefined_name(name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::UndefinedName,
            message: format!("undefined name: {name}"),
        }
    }

    pub fn not_callable(type_name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::NotCallable,
            message: format!("can only call functions and classes, got {type_name}"),
        }
    }

    pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> Self {
        RuntimeError {
            kind: ErrorKind::ArityMismatch,
            message: format!("{name} expects {expected} argument(s), got {got}"),
        }
    }

    pub fn not_an_object(type_name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::NotAnObject,
            message: format!("only instances have attributes, got {type_name}"),
        }
    }

    pub fn no_such_attribute(name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::NoSuchAttribute,
            message: format!("undefined attribute: {name}"),
        }
    }

    pub fn type_mismatch(expected: &str, got: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::TypeMismatch,
            message: format!("type mismatch: expected {expected}, got {got}"),
        }
    }

    pub fn no_superclass(message: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::NoSuperclass,
            message: message.to_string(),
        }
    }

    pub fn stack_overflow() -> Self {
        RuntimeError {
            kind: ErrorKind::StackOverflow,
            message: "stack overflow: too deep recursion".to_string(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime error: {}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_name() {
        let err = RuntimeError::undefined_name("foo");
        assert_eq!(err.kind, ErrorKind::UndefinedName);
        assert!(err.message.contains("foo"));
    }

    #[test]
    fn test_not_callable() {
        let err = RuntimeError::not_callable("number");
        assert_eq!(err.kind, ErrorKind::NotCallable);
        assert!(err.message.contains("number"));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = RuntimeError::arity_mismatch("f", 2, 1);
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
        assert!(err.message.contains('2'));
        assert!(err.message.contains('1'));
    }

    #[test]
    fn test_not_an_object() {
        let err = RuntimeError::not_an_object("string");
        assert_eq!(err.kind, ErrorKind::NotAnObject);
        assert!(err.message.contains("string"));
    }

    #[test]
    fn test_no_such_attribute() {
        let err = RuntimeError::no_such_attribute("width");
        assert_eq!(err.kind, ErrorKind::NoSuchAttribute);
        assert!(err.message.contains("width"));
    }

    #[test]
    fn test_type_mismatch() {
        let err = RuntimeError::type_mismatch("number", "string");
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert!(err.message.contains("number"));
        assert!(err.message.contains("string"));
    }

    #[test]
    fn test_no_superclass() {
        let err = RuntimeError::no_superclass("cannot use 'super' here");
        assert_eq!(err.kind, ErrorKind::NoSuperclass);
    }

    #[test]
    fn test_stack_overflow() {
        let err = RuntimeError::stack_overflow();
        assert_eq!(err.kind, ErrorKind::StackOverflow);
        assert!(err.message.contains("stack overflow"));
    }

    #[test]
    fn test_display() {
        let err = RuntimeError::undefined_name("x");
        let display = format!("{err}");
        assert!(display.starts_with("Runtime error:"));
        assert!(display.contains('x'));
    }

    #[test]
    fn test_kind_equality() {
        assert_eq!(ErrorKind::UndefinedName, ErrorKind::UndefinedName);
        assert_ne!(ErrorKind::UndefinedName, ErrorKind::TypeMismatch);
        assert_ne!(ErrorKind::NotCallable, ErrorKind::ArityMismatch);
    }

    #[test]
    fn test_error_clone() {
        let err = RuntimeError::type_mismatch("number", "nil");
        let cloned = err.clone();
        assert_eq!(err.kind, cloned.kind);
        assert_eq!(err.message, cloned.message);
    }

    #[test]
    fn test_error_is_std_error() {
        let err = RuntimeError::stack_overflow();
        let _: &dyn std::error::Error = &err;
    }

    #[test]
    fn test_undefined_name_message_format() {
        let err = RuntimeError::undefined_name("my_var");
        assert_eq!(err.message, "undefined name: my_var");
    }

    #[test]
    fn test_arity_mismatch_message_format() {
        let err = RuntimeError::arity_mismatch("add", 2, 3);
        assert_eq!(err.message, "add expects 2 argument(s), got 3");
    }
}
