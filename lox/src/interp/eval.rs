//! Tree-walking evaluator

use super::env::{child_env, EnvRef, Environment};
use super::error::{InterpResult, RuntimeError};
use super::output::OutputSink;
use super::value::{Class, Function, Instance, InstanceRef, Native, Value};
use crate::ast::{BinOp, Expr, FunDecl, LogicalOp, Program, Spanned, Stmt, UnOp};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum call depth before a StackOverflow fault
const MAX_RECURSION_DEPTH: usize = 10_000;

/// Stack growth parameters for deep recursion
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// Result of executing a statement.
///
/// `Return` is the language's only non-local transfer; it is threaded
/// through statement execution as a value so it cannot be confused with
/// a fault.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

/// The interpreter
pub struct Interpreter {
    /// Global environment, shared for the whole run
    global_env: EnvRef,
    /// Destination for `print`
    output: OutputSink,
    /// Current call depth
    recursion_depth: usize,
}

impl Interpreter {
    /// Create a new interpreter printing to stdout
    pub fn new() -> Self {
        Self::with_output(OutputSink::Stdout)
    }

    /// Create an interpreter that captures `print` output
    pub fn with_capture() -> Self {
        Self::with_output(OutputSink::buffer())
    }

    /// Create an interpreter with an explicit output sink
    pub fn with_output(output: OutputSink) -> Self {
        let interp = Interpreter {
            global_env: Environment::new().into_ref(),
            output,
            recursion_depth: 0,
        };
        interp.register_natives();
        interp
    }

    /// Register native functions in the global environment
    fn register_natives(&self) {
        let clock = Native {
            name: "clock",
            arity: 0,
            func: native_clock,
        };
        self.global_env
            .borrow_mut()
            .define("clock".to_string(), Value::Native(Rc::new(clock)));
    }

    /// The global environment
    pub fn globals(&self) -> EnvRef {
        Rc::clone(&self.global_env)
    }

    /// Output captured so far; empty unless constructed with a buffer sink
    pub fn captured_output(&self) -> String {
        self.output.captured()
    }

    /// Execute a program's top-level statements in order against the
    /// global environment
    pub fn interpret(&mut self, program: &Program) -> InterpResult<()> {
        let env = self.globals();
        for stmt in &program.stmts {
            if let Flow::Return(_) = self.exec(stmt, &env)? {
                // A top-level return stops the program
                break;
            }
        }
        Ok(())
    }

    /// Evaluate a single expression against the global environment (REPL)
    pub fn eval_expr(&mut self, expr: &Spanned<Expr>) -> InterpResult<Value> {
        let env = self.globals();
        self.eval(expr, &env)
    }

    /// Evaluate an expression with automatic stack growth for deep recursion
    fn eval(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr, env))
    }

    fn eval_inner(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        match &expr.node {
            Expr::NumberLit(n) => Ok(Value::Number(*n)),
            Expr::StringLit(s) => Ok(Value::Str(Rc::new(s.clone()))),
            Expr::BoolLit(b) => Ok(Value::Bool(*b)),
            Expr::Nil => Ok(Value::Nil),

            Expr::Var(name) => env
                .borrow()
                .get(name)
                .ok_or_else(|| RuntimeError::undefined_name(name)),

            Expr::Assign { name, value } => {
                let value = self.eval(value, env)?;
                if env.borrow_mut().assign(name, value.clone()) {
                    Ok(value)
                } else {
                    Err(RuntimeError::undefined_name(name))
                }
            }

            Expr::Binary { left, op, right } => {
                // Both operands always evaluate, left first
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                self.eval_binary(*op, left, right)
            }

            Expr::Logical { left, op, right } => {
                let left = self.eval(left, env)?;
                // The deciding operand is returned unconverted
                match op {
                    LogicalOp::And if !left.is_truthy() => Ok(left),
                    LogicalOp::Or if left.is_truthy() => Ok(left),
                    _ => self.eval(right, env),
                }
            }

            Expr::Unary { op, expr: operand } => {
                let value = self.eval(operand, env)?;
                match op {
                    UnOp::Neg => match value.as_number() {
                        Some(n) => Ok(Value::Number(-n)),
                        None => Err(RuntimeError::type_mismatch("number", value.type_name())),
                    },
                    UnOp::Not => Ok(Value::Bool(!value.is_truthy())),
                }
            }

            Expr::Call { callee, args } => {
                let callee = self.eval(callee, env)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval(arg, env)?);
                }
                self.call_value(callee, arg_values)
            }

            Expr::Get { object, name } => {
                let object = self.eval(object, env)?;
                match object {
                    Value::Instance(instance) => {
                        let field = instance.borrow().fields.get(name).cloned();
                        if let Some(value) = field {
                            return Ok(value);
                        }
                        let method = instance.borrow().class.find_method(name);
                        match method {
                            Some(method) => Ok(Value::BoundMethod(method, instance)),
                            None => Err(RuntimeError::no_such_attribute(name)),
                        }
                    }
                    other => Err(RuntimeError::not_an_object(other.type_name())),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                // Value first, then receiver
                let value = self.eval(value, env)?;
                let object = self.eval(object, env)?;
                match object {
                    Value::Instance(instance) => {
                        instance
                            .borrow_mut()
                            .fields
                            .insert(name.clone(), value.clone());
                        Ok(value)
                    }
                    other => Err(RuntimeError::not_an_object(other.type_name())),
                }
            }

            Expr::This => env
                .borrow()
                .get("this")
                .ok_or_else(|| RuntimeError::undefined_name("this")),

            Expr::Super { method } => {
                let superclass = match env.borrow().get("super") {
                    Some(Value::Class(class)) => class,
                    _ => {
                        return Err(RuntimeError::no_superclass(
                            "cannot use 'super' in a class with no superclass",
                        ));
                    }
                };
                let receiver = match env.borrow().get("this") {
                    Some(Value::Instance(instance)) => instance,
                    _ => return Err(RuntimeError::undefined_name("this")),
                };
                match superclass.find_method(method) {
                    Some(method) => Ok(Value::BoundMethod(method, receiver)),
                    None => Err(RuntimeError::no_such_attribute(method)),
                }
            }
        }
    }

    /// Execute a statement
    pub fn exec(&mut self, stmt: &Spanned<Stmt>, env: &EnvRef) -> InterpResult<Flow> {
        match &stmt.node {
            Stmt::Expression(expr) => {
                self.eval(expr, env)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.eval(expr, env)?;
                self.output.writeln(&value.to_string());
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Nil,
                };
                env.borrow_mut().define(name.clone(), value);
                Ok(Flow::Normal)
            }

            Stmt::Block(stmts) => {
                let block_env = child_env(env);
                self.exec_block(stmts, &block_env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition, env)?.is_truthy() {
                    self.exec(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.exec(else_branch, env)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.eval(condition, env)?.is_truthy() {
                    if let Flow::Return(value) = self.exec(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                // The loop variable lives in the statement's own scope,
                // shared across iterations; the body block re-scopes each
                // iteration
                let loop_env = child_env(env);
                if let Some(initializer) = initializer {
                    self.exec(initializer, &loop_env)?;
                }
                loop {
                    if let Some(condition) = condition {
                        if !self.eval(condition, &loop_env)?.is_truthy() {
                            break;
                        }
                    }
                    if let Flow::Return(value) = self.exec(body, &loop_env)? {
                        return Ok(Flow::Return(value));
                    }
                    if let Some(increment) = increment {
                        self.eval(increment, &loop_env)?;
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Function(decl) => {
                let function = Function {
                    name: decl.name.clone(),
                    params: decl.params.clone(),
                    body: Rc::new(decl.body.clone()),
                    closure: Rc::clone(env),
                    is_initializer: false,
                };
                env.borrow_mut()
                    .define(decl.name.clone(), Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.exec_class(name, superclass, methods, env),
        }
    }

    /// Execute statements in sequence, propagating the first `Return`
    fn exec_block(&mut self, stmts: &[Spanned<Stmt>], env: &EnvRef) -> InterpResult<Flow> {
        for stmt in stmts {
            if let Flow::Return(value) = self.exec(stmt, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_class(
        &mut self,
        name: &str,
        superclass: &Option<Spanned<String>>,
        methods: &[FunDecl],
        env: &EnvRef,
    ) -> InterpResult<Flow> {
        let superclass = match superclass {
            Some(super_name) => match env.borrow().get(&super_name.node) {
                Some(Value::Class(class)) => Some(class),
                Some(other) => {
                    return Err(RuntimeError::type_mismatch("class", other.type_name()));
                }
                None => return Err(RuntimeError::undefined_name(&super_name.node)),
            },
            None => None,
        };

        // Methods close over an environment binding `super` to the
        // superclass, so super dispatch starts one level above the class
        // that textually contains the method
        let method_env = match &superclass {
            Some(superclass) => {
                let method_env = child_env(env);
                method_env
                    .borrow_mut()
                    .define("super".to_string(), Value::Class(Rc::clone(superclass)));
                method_env
            }
            None => Rc::clone(env),
        };

        let mut method_table = HashMap::new();
        for decl in methods {
            let function = Function {
                name: decl.name.clone(),
                params: decl.params.clone(),
                body: Rc::new(decl.body.clone()),
                closure: Rc::clone(&method_env),
                is_initializer: decl.name == "init",
            };
            method_table.insert(decl.name.clone(), Rc::new(function));
        }

        let class = Class {
            name: name.to_string(),
            superclass,
            methods: method_table,
        };
        env.borrow_mut()
            .define(name.to_string(), Value::Class(Rc::new(class)));
        Ok(Flow::Normal)
    }

    /// Uniform invocation over every callable value kind
    pub fn call_value(&mut self, callee: Value, args: Vec<Value>) -> InterpResult<Value> {
        match callee {
            Value::Function(function) => self.call_function(&function, None, args),
            Value::BoundMethod(function, receiver) => {
                self.call_function(&function, Some(receiver), args)
            }
            Value::Native(native) => {
                if args.len() != native.arity {
                    return Err(RuntimeError::arity_mismatch(
                        native.name,
                        native.arity,
                        args.len(),
                    ));
                }
                (native.func)(&args)
            }
            Value::Class(class) => self.instantiate(class, args),
            other => Err(RuntimeError::not_callable(other.type_name())),
        }
    }

    fn call_function(
        &mut self,
        function: &Rc<Function>,
        receiver: Option<InstanceRef>,
        args: Vec<Value>,
    ) -> InterpResult<Value> {
        if args.len() != function.arity() {
            return Err(RuntimeError::arity_mismatch(
                &function.name,
                function.arity(),
                args.len(),
            ));
        }

        self.recursion_depth += 1;
        if self.recursion_depth > MAX_RECURSION_DEPTH {
            self.recursion_depth -= 1;
            return Err(RuntimeError::stack_overflow());
        }

        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.call_function_inner(function, receiver, args)
        });
        self.recursion_depth -= 1;
        result
    }

    fn call_function_inner(
        &mut self,
        function: &Rc<Function>,
        receiver: Option<InstanceRef>,
        args: Vec<Value>,
    ) -> InterpResult<Value> {
        // The call frame's parent is the captured environment, never the
        // caller's
        let call_env = child_env(&function.closure);

        if let Some(receiver) = &receiver {
            call_env
                .borrow_mut()
                .define("this".to_string(), Value::Instance(Rc::clone(receiver)));
        }
        for (param, arg) in function.params.iter().zip(args) {
            call_env.borrow_mut().define(param.clone(), arg);
        }

        let flow = self.exec_block(&function.body, &call_env)?;
        if function.is_initializer {
            // Initializers always yield the receiver; any returned value
            // is discarded
            return Ok(receiver.map(Value::Instance).unwrap_or(Value::Nil));
        }
        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }

    /// Call a class as a constructor: allocate, run `init` if the chain
    /// defines one, always yield the instance
    fn instantiate(&mut self, class: Rc<Class>, args: Vec<Value>) -> InterpResult<Value> {
        let instance = Instance::new(Rc::clone(&class));
        if let Some(init) = class.find_method("init") {
            self.call_function(&init, Some(Rc::clone(&instance)), args)?;
        } else if !args.is_empty() {
            return Err(RuntimeError::arity_mismatch(&class.name, 0, args.len()));
        }
        Ok(Value::Instance(instance))
    }

    /// Evaluate a binary operation
    fn eval_binary(&self, op: BinOp, left: Value, right: Value) -> InterpResult<Value> {
        match op {
            BinOp::Add => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => {
                    Ok(Value::Str(Rc::new(format!("{a}{b}"))))
                }
                _ => Err(RuntimeError::type_mismatch(
                    "two numbers or two strings",
                    &format!("{} + {}", left.type_name(), right.type_name()),
                )),
            },
            BinOp::Sub => {
                let (a, b) = self.numeric_operands(op, &left, &right)?;
                Ok(Value::Number(a - b))
            }
            BinOp::Mul => {
                let (a, b) = self.numeric_operands(op, &left, &right)?;
                Ok(Value::Number(a * b))
            }
            BinOp::Div => {
                // IEEE semantics: division by zero yields inf/nan
                let (a, b) = self.numeric_operands(op, &left, &right)?;
                Ok(Value::Number(a / b))
            }
            BinOp::Eq => Ok(Value::Bool(left == right)),
            BinOp::Ne => Ok(Value::Bool(left != right)),
            BinOp::Lt => {
                let (a, b) = self.numeric_operands(op, &left, &right)?;
                Ok(Value::Bool(a < b))
            }
            BinOp::Gt => {
                let (a, b) = self.numeric_operands(op, &left, &right)?;
                Ok(Value::Bool(a > b))
            }
            BinOp::Le => {
                let (a, b) = self.numeric_operands(op, &left, &right)?;
                Ok(Value::Bool(a <= b))
            }
            BinOp::Ge => {
                let (a, b) = self.numeric_operands(op, &left, &right)?;
                Ok(Value::Bool(a >= b))
            }
        }
    }

    fn numeric_operands(
        &self,
        op: BinOp,
        left: &Value,
        right: &Value,
    ) -> InterpResult<(f64, f64)> {
        match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(RuntimeError::type_mismatch(
                "numbers",
                &format!("{} {op} {}", left.type_name(), right.type_name()),
            )),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn native_clock(_args: &[Value]) -> InterpResult<Value> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Ok(Value::Number(now.as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    /// Run a source program with a capturing sink and return its output
    fn run(source: &str) -> InterpResult<String> {
        let tokens = tokenize(source).expect("lex");
        let program = parse("test.lox", source, tokens).expect("parse");
        let mut interp = Interpreter::with_capture();
        interp.interpret(&program)?;
        Ok(interp.captured_output())
    }

    fn run_ok(source: &str) -> String {
        run(source).expect("program should run")
    }

    fn run_err(source: &str) -> RuntimeError {
        run(source).expect_err("program should fault")
    }

    // ============================================
    // Literals, operators, printing
    // ============================================

    #[test]
    fn test_print_literals() {
        assert_eq!(run_ok("print 42;"), "42\n");
        assert_eq!(run_ok("print 1.5;"), "1.5\n");
        assert_eq!(run_ok("print \"hi\";"), "hi\n");
        assert_eq!(run_ok("print true;"), "true\n");
        assert_eq!(run_ok("print nil;"), "nil\n");
    }

    #[test]
    fn test_print_order_matches_execution_order() {
        assert_eq!(run_ok("print 1; print 2; print 3;"), "1\n2\n3\n");
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
        assert_eq!(run_ok("print (1 + 2) * 3;"), "9\n");
        assert_eq!(run_ok("print 10 - 4 / 2;"), "8\n");
        assert_eq!(run_ok("print -3 + 1;"), "-2\n");
    }

    #[test]
    fn test_string_concat() {
        assert_eq!(run_ok("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn test_add_string_and_number_faults() {
        let err = run_err("print \"a\" + 1;");
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_arithmetic_on_nil_faults() {
        let err = run_err("print nil * 2;");
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_comparison() {
        assert_eq!(run_ok("print 1 < 2;"), "true\n");
        assert_eq!(run_ok("print 2 <= 2;"), "true\n");
        assert_eq!(run_ok("print 3 > 4;"), "false\n");
        assert_eq!(run_ok("print 4 >= 5;"), "false\n");
    }

    #[test]
    fn test_comparison_on_strings_faults() {
        let err = run_err("print \"a\" < \"b\";");
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_equality_across_kinds_is_false() {
        assert_eq!(run_ok("print 1 == \"1\";"), "false\n");
        assert_eq!(run_ok("print nil == false;"), "false\n");
        assert_eq!(run_ok("print nil == nil;"), "true\n");
        assert_eq!(run_ok("print \"a\" != \"b\";"), "true\n");
    }

    #[test]
    fn test_unary() {
        assert_eq!(run_ok("print -(1 + 2);"), "-3\n");
        assert_eq!(run_ok("print !true;"), "false\n");
        assert_eq!(run_ok("print !nil;"), "true\n");
        assert_eq!(run_ok("print !0;"), "false\n");
    }

    #[test]
    fn test_negate_non_number_faults() {
        let err = run_err("print -\"x\";");
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_division_by_zero_is_ieee() {
        assert_eq!(run_ok("print 1 / 0;"), "inf\n");
    }

    #[test]
    fn test_truthiness() {
        // Only nil and false are falsy
        assert_eq!(run_ok("if (0) print \"yes\";"), "yes\n");
        assert_eq!(run_ok("if (\"\") print \"yes\";"), "yes\n");
        assert_eq!(run_ok("if (nil) print \"yes\"; else print \"no\";"), "no\n");
        assert_eq!(
            run_ok("if (false) print \"yes\"; else print \"no\";"),
            "no\n"
        );
    }

    // ============================================
    // Variables and scoping
    // ============================================

    #[test]
    fn test_var_default_nil() {
        assert_eq!(run_ok("var x; print x;"), "nil\n");
    }

    #[test]
    fn test_var_initializer() {
        assert_eq!(run_ok("var x = 1 + 2; print x;"), "3\n");
    }

    #[test]
    fn test_undefined_variable_read_faults() {
        let err = run_err("print missing;");
        assert_eq!(err.kind, ErrorKind::UndefinedName);
    }

    #[test]
    fn test_assignment_is_expression() {
        assert_eq!(run_ok("var x = 1; print x = 2; print x;"), "2\n2\n");
    }

    #[test]
    fn test_assignment_to_undefined_name_faults() {
        // Assignment never auto-creates a binding
        let err = run_err("missing = 1;");
        assert_eq!(err.kind, ErrorKind::UndefinedName);
    }

    #[test]
    fn test_inner_var_shadows_without_touching_outer() {
        assert_eq!(run_ok("var x = 1; { var x = 2; } print x;"), "1\n");
    }

    #[test]
    fn test_inner_assignment_updates_outer() {
        assert_eq!(run_ok("var x = 1; { x = 2; } print x;"), "2\n");
    }

    #[test]
    fn test_block_locals_do_not_leak() {
        let err = run_err("{ var x = 1; } print x;");
        assert_eq!(err.kind, ErrorKind::UndefinedName);
    }

    // ============================================
    // Short-circuit logic
    // ============================================

    #[test]
    fn test_and_short_circuits() {
        let out = run_ok(
            "var called = false;\n\
             fun sideEffect() { called = true; return true; }\n\
             print false and sideEffect();\n\
             print called;",
        );
        assert_eq!(out, "false\nfalse\n");
    }

    #[test]
    fn test_or_short_circuits() {
        let out = run_ok(
            "var called = false;\n\
             fun sideEffect() { called = true; return true; }\n\
             print true or sideEffect();\n\
             print called;",
        );
        assert_eq!(out, "true\nfalse\n");
    }

    #[test]
    fn test_logical_returns_deciding_operand() {
        assert_eq!(run_ok("print nil and 1;"), "nil\n");
        assert_eq!(run_ok("print 1 and 2;"), "2\n");
        assert_eq!(run_ok("print nil or \"x\";"), "x\n");
        assert_eq!(run_ok("print 1 or 2;"), "1\n");
    }

    // ============================================
    // Control flow
    // ============================================

    #[test]
    fn test_if_else() {
        assert_eq!(
            run_ok("if (1 < 2) print \"then\"; else print \"else\";"),
            "then\n"
        );
        assert_eq!(
            run_ok("if (1 > 2) print \"then\"; else print \"else\";"),
            "else\n"
        );
    }

    #[test]
    fn test_dangling_else_binds_to_nearest_if() {
        let out = run_ok("if (true) if (false) print \"inner\"; else print \"nearest\";");
        assert_eq!(out, "nearest\n");
    }

    #[test]
    fn test_while_loop() {
        let out = run_ok("var i = 3; while (i > 0) { print i; i = i - 1; }");
        assert_eq!(out, "3\n2\n1\n");
    }

    #[test]
    fn test_while_false_never_runs() {
        assert_eq!(run_ok("while (false) print \"never\";"), "");
    }

    #[test]
    fn test_for_loop() {
        let out = run_ok("for (var i = 0; i < 3; i = i + 1) print i;");
        assert_eq!(out, "0\n1\n2\n");
    }

    #[test]
    fn test_for_loop_variable_scoped_to_statement() {
        let err = run_err("for (var i = 0; i < 1; i = i + 1) {} print i;");
        assert_eq!(err.kind, ErrorKind::UndefinedName);
    }

    #[test]
    fn test_for_without_clauses() {
        // Missing condition is an infinite loop; return unwinds out of it
        let out = run_ok(
            "fun f() {\n\
             var i = 0;\n\
             for (;;) { i = i + 1; if (i == 3) return i; }\n\
             }\n\
             print f();",
        );
        assert_eq!(out, "3\n");
    }

    // ============================================
    // Functions and closures
    // ============================================

    #[test]
    fn test_function_call_and_return() {
        let out = run_ok("fun add(a, b) { return a + b; } print add(1, 2);");
        assert_eq!(out, "3\n");
    }

    #[test]
    fn test_function_falls_through_to_nil() {
        assert_eq!(run_ok("fun noop() {} print noop();"), "nil\n");
    }

    #[test]
    fn test_return_unwinds_nested_blocks_and_loops() {
        let out = run_ok(
            "fun f() { while (true) { { return \"done\"; } } } print f();",
        );
        assert_eq!(out, "done\n");
    }

    #[test]
    fn test_function_prints_as_value() {
        assert_eq!(run_ok("fun f() {} print f;"), "<fn f>\n");
    }

    #[test]
    fn test_arity_mismatch_faults() {
        // Never silently binds missing parameters to nil
        let err = run_err("fun f(a, b) {} f(1);");
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
    }

    #[test]
    fn test_too_many_arguments_faults() {
        let err = run_err("fun f() {} f(1);");
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
    }

    #[test]
    fn test_calling_non_callable_faults() {
        let err = run_err("var x = 1; x();");
        assert_eq!(err.kind, ErrorKind::NotCallable);
    }

    #[test]
    fn test_recursion() {
        let out = run_ok(
            "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }\n\
             print fib(10);",
        );
        assert_eq!(out, "55\n");
    }

    #[test]
    fn test_counter_closure_keeps_state() {
        let out = run_ok(
            "fun makeCounter() {\n\
             var count = 0;\n\
             fun increment() { count = count + 1; return count; }\n\
             return increment;\n\
             }\n\
             var counter = makeCounter();\n\
             print counter();\n\
             print counter();\n\
             print counter();",
        );
        assert_eq!(out, "1\n2\n3\n");
    }

    #[test]
    fn test_two_closures_share_one_environment() {
        let out = run_ok(
            "fun makePair() {\n\
             var n = 0;\n\
             fun bump() { n = n + 1; return n; }\n\
             fun read() { return n; }\n\
             bump(); bump();\n\
             return read;\n\
             }\n\
             print makePair()();",
        );
        assert_eq!(out, "2\n");
    }

    #[test]
    fn test_closure_captures_defining_scope_not_callers() {
        let out = run_ok(
            "var x = \"global\";\n\
             fun outer() {\n\
             var x = \"outer\";\n\
             fun inner() { print x; }\n\
             inner();\n\
             }\n\
             outer();",
        );
        assert_eq!(out, "outer\n");
    }

    #[test]
    fn test_closure_survives_block_exit() {
        let out = run_ok(
            "var get;\n\
             { var local = \"kept alive\"; fun read() { return local; } get = read; }\n\
             print get();",
        );
        assert_eq!(out, "kept alive\n");
    }

    #[test]
    fn test_function_may_reference_later_definitions() {
        // Lookup is deferred to call time against the captured environment
        let out = run_ok(
            "fun early() { return later(); }\n\
             fun later() { return 7; }\n\
             print early();",
        );
        assert_eq!(out, "7\n");
    }

    #[test]
    fn test_deep_recursion_faults_with_stack_overflow() {
        let err = run_err("fun f() { return f(); } f();");
        assert_eq!(err.kind, ErrorKind::StackOverflow);
    }

    #[test]
    fn test_native_clock() {
        assert_eq!(run_ok("print clock() > 0;"), "true\n");
    }

    #[test]
    fn test_native_arity_checked() {
        let err = run_err("clock(1);");
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
    }

    // ============================================
    // Classes and instances
    // ============================================

    #[test]
    fn test_class_prints_its_name() {
        assert_eq!(run_ok("class Foo {} print Foo;"), "Foo\n");
    }

    #[test]
    fn test_instance_prints_class_name() {
        assert_eq!(run_ok("class Foo {} print Foo();"), "Foo instance\n");
    }

    #[test]
    fn test_field_set_and_get() {
        let out = run_ok(
            "class Box {}\n\
             var b = Box();\n\
             b.contents = 42;\n\
             print b.contents;",
        );
        assert_eq!(out, "42\n");
    }

    #[test]
    fn test_set_is_an_expression() {
        let out = run_ok("class Box {} var b = Box(); print b.x = 9;");
        assert_eq!(out, "9\n");
    }

    #[test]
    fn test_missing_attribute_faults() {
        let err = run_err("class Foo {} print Foo().missing;");
        assert_eq!(err.kind, ErrorKind::NoSuchAttribute);
    }

    #[test]
    fn test_get_on_non_instance_faults() {
        let err = run_err("var x = 1; print x.field;");
        assert_eq!(err.kind, ErrorKind::NotAnObject);
    }

    #[test]
    fn test_set_on_non_instance_faults() {
        let err = run_err("var x = \"s\"; x.field = 1;");
        assert_eq!(err.kind, ErrorKind::NotAnObject);
    }

    #[test]
    fn test_method_call_with_this() {
        let out = run_ok(
            "class Greeter {\n\
             greet() { return \"hello, \" + this.name; }\n\
             }\n\
             var g = Greeter();\n\
             g.name = \"world\";\n\
             print g.greet();",
        );
        assert_eq!(out, "hello, world\n");
    }

    #[test]
    fn test_field_shadows_method() {
        let out = run_ok(
            "class C { m() { return \"method\"; } }\n\
             var c = C();\n\
             fun replacement() { return \"field\"; }\n\
             c.m = replacement;\n\
             print c.m();",
        );
        assert_eq!(out, "field\n");
    }

    #[test]
    fn test_bound_method_retains_receiver() {
        let out = run_ok(
            "class Counter {\n\
             init() { this.n = 0; }\n\
             increment() { this.n = this.n + 1; return this.n; }\n\
             }\n\
             var c = Counter();\n\
             var bump = c.increment;\n\
             bump();\n\
             print bump();",
        );
        assert_eq!(out, "2\n");
    }

    #[test]
    fn test_this_outside_method_faults() {
        let err = run_err("print this;");
        assert_eq!(err.kind, ErrorKind::UndefinedName);
    }

    #[test]
    fn test_init_receives_constructor_arguments() {
        let out = run_ok(
            "class Point {\n\
             init(x, y) { this.x = x; this.y = y; }\n\
             }\n\
             var p = Point(3, 4);\n\
             print p.x + p.y;",
        );
        assert_eq!(out, "7\n");
    }

    #[test]
    fn test_class_call_always_yields_instance() {
        // An early return inside init does not change the constructor result
        let out = run_ok(
            "class Foo { init() { return; } }\n\
             print Foo();",
        );
        assert_eq!(out, "Foo instance\n");
    }

    #[test]
    fn test_constructor_arity_checked() {
        let err = run_err("class P { init(x) {} } P();");
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
    }

    #[test]
    fn test_class_without_init_takes_no_arguments() {
        let err = run_err("class Foo {} Foo(1);");
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
    }

    // ============================================
    // Inheritance and super
    // ============================================

    #[test]
    fn test_inherited_method() {
        let out = run_ok(
            "class A { greet() { return \"A\"; } }\n\
             class B < A {}\n\
             print B().greet();",
        );
        assert_eq!(out, "A\n");
    }

    #[test]
    fn test_override_wins_over_superclass() {
        let out = run_ok(
            "class A { greet() { return \"A\"; } }\n\
             class B < A { greet() { return \"B\"; } }\n\
             print B().greet();",
        );
        assert_eq!(out, "B\n");
    }

    #[test]
    fn test_super_reaches_immediate_superclass() {
        let out = run_ok(
            "class A { greet() { return \"A\"; } }\n\
             class B < A { greet() { return super.greet() + \"B\"; } }\n\
             print B().greet();",
        );
        assert_eq!(out, "AB\n");
    }

    #[test]
    fn test_super_is_static_to_defining_class() {
        // super in B::test resolves above B, not above the dynamic class C
        let out = run_ok(
            "class A { method() { print \"A method\"; } }\n\
             class B < A {\n\
             method() { print \"B method\"; }\n\
             test() { super.method(); }\n\
             }\n\
             class C < B {}\n\
             C().test();",
        );
        assert_eq!(out, "A method\n");
    }

    #[test]
    fn test_inherited_init_runs_for_subclass() {
        let out = run_ok(
            "class A { init(x) { this.x = x; } }\n\
             class B < A {}\n\
             print B(5).x;",
        );
        assert_eq!(out, "5\n");
    }

    #[test]
    fn test_super_init_chains() {
        let out = run_ok(
            "class A { init() { this.tag = \"a\"; } }\n\
             class B < A { init() { super.init(); this.tag = this.tag + \"b\"; } }\n\
             print B().tag;",
        );
        assert_eq!(out, "ab\n");
    }

    #[test]
    fn test_super_without_superclass_faults() {
        let err = run_err("class A { m() { return super.m(); } } A().m();");
        assert_eq!(err.kind, ErrorKind::NoSuperclass);
    }

    #[test]
    fn test_super_method_missing_faults() {
        let err = run_err(
            "class A {}\n\
             class B < A { m() { return super.missing(); } }\n\
             B().m();",
        );
        assert_eq!(err.kind, ErrorKind::NoSuchAttribute);
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        let err = run_err("var NotAClass = 1; class B < NotAClass {}");
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_undefined_superclass_faults() {
        let err = run_err("class B < Missing {}");
        assert_eq!(err.kind, ErrorKind::UndefinedName);
    }

    #[test]
    fn test_methods_are_not_global_functions() {
        let err = run_err("class C { m() {} } m();");
        assert_eq!(err.kind, ErrorKind::UndefinedName);
    }

    // ============================================
    // Evaluation order
    // ============================================

    #[test]
    fn test_binary_operands_evaluate_left_to_right() {
        let out = run_ok(
            "fun a() { print \"a\"; return 1; }\n\
             fun b() { print \"b\"; return 2; }\n\
             print a() + b();",
        );
        assert_eq!(out, "a\nb\n3\n");
    }

    #[test]
    fn test_call_arguments_evaluate_left_to_right() {
        let out = run_ok(
            "fun trace(tag) { print tag; return tag; }\n\
             fun pair(x, y) { return x + y; }\n\
             print pair(trace(\"first\"), trace(\"second\"));",
        );
        assert_eq!(out, "first\nsecond\nfirstsecond\n");
    }

    #[test]
    fn test_set_evaluates_value_before_object() {
        let out = run_ok(
            "class Box {}\n\
             var b = Box();\n\
             fun value() { print \"value\"; return 1; }\n\
             fun object() { print \"object\"; return b; }\n\
             object().x = value();",
        );
        // Value first, then receiver
        assert_eq!(out, "value\nobject\n");
    }

    #[test]
    fn test_fault_aborts_remaining_statements() {
        let tokens = tokenize("print 1; missing; print 2;").unwrap();
        let program = parse("test.lox", "print 1; missing; print 2;", tokens).unwrap();
        let mut interp = Interpreter::with_capture();
        let result = interp.interpret(&program);
        assert!(result.is_err());
        assert_eq!(interp.captured_output(), "1\n");
    }
}
