//! Tree-walking interpreter: values, environments, evaluator

mod env;
mod error;
mod eval;
mod output;
mod value;

pub use env::{EnvRef, Environment, child_env};
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::{Flow, Interpreter};
pub use output::OutputSink;
pub use value::{Class, Function, Instance, InstanceRef, Native, NativeFn, Value};
