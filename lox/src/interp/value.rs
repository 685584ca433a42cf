//! Runtime values for the interpreter

use super::env::EnvRef;
use super::error::InterpResult;
use crate::ast::{Spanned, Stmt};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Native function type
pub type NativeFn = fn(&[Value]) -> InterpResult<Value>;

/// Shared reference to an instance
pub type InstanceRef = Rc<RefCell<Instance>>;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    /// Nil
    Nil,
    /// Boolean
    Bool(bool),
    /// Double-precision number
    Number(f64),
    /// Immutable string, shared between bindings
    Str(Rc<String>),
    /// User-defined function with its captured environment
    Function(Rc<Function>),
    /// Method bound to its receiver
    BoundMethod(Rc<Function>, InstanceRef),
    /// Host-provided function
    Native(Rc<Native>),
    /// Class, callable as a constructor
    Class(Rc<Class>),
    /// Class instance with mutable fields
    Instance(InstanceRef),
}

impl Value {
    /// Nil and false are falsy; everything else is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) | Value::BoundMethod(_, _) => "function",
            Value::Native(_) => "native function",
            Value::Class(c) => &c.name,
            Value::Instance(_) => "instance",
        }
    }

    /// Try to convert to f64
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to convert to bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Format a number the way the language prints it: integer values
/// lose the trailing ".0"
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{s}"),
            Value::Function(func) => write!(f, "<fn {}>", func.name),
            Value::BoundMethod(func, _) => write!(f, "<fn {}>", func.name),
            Value::Native(native) => write!(f, "<native fn {}>", native.name),
            Value::Class(class) => write!(f, "{}", class.name),
            Value::Instance(instance) => {
                write!(f, "{} instance", instance.borrow().class.name)
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::BoundMethod(f1, i1), Value::BoundMethod(f2, i2)) => {
                Rc::ptr_eq(f1, f2) && Rc::ptr_eq(i1, i2)
            }
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// User-defined function
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    /// Shared with the declaring AST node
    pub body: Rc<Vec<Spanned<Stmt>>>,
    /// The environment in effect at the declaration site
    pub closure: EnvRef,
    /// `init` methods return the receiver on fall-through
    pub is_initializer: bool,
}

impl Function {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

// The captured environment can reach this function again through its own
// binding, so Debug must not descend into it
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Host-provided function
#[derive(Debug)]
pub struct Native {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

/// Class metadata: name, optional superclass, method table
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<String, Rc<Function>>,
}

impl Class {
    /// Resolve a method on this class or up the superclass chain
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            Some(Rc::clone(method))
        } else if let Some(superclass) = &self.superclass {
            superclass.find_method(name)
        } else {
            None
        }
    }

    /// Arity of the constructor: the `init` method's, or zero
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

/// Class instance: class reference plus mutable field mapping
pub struct Instance {
    pub class: Rc<Class>,
    pub fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> InstanceRef {
        Rc::new(RefCell::new(Instance {
            class,
            fields: HashMap::new(),
        }))
    }
}

// Fields may hold the instance itself, so Debug must not descend into them
impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .finish_non_exhaustive()
    }
}
