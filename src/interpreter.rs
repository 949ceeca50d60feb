use crate::node::{Node, RuntimeError, Signal};
use crate::parser::{Parser, SyntaxError};
use crate::scanner::{scan, strip_comments};
use crate::scope::{Scope, ScopeLink};
use crate::value::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpretErr {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Source text to AST. Lexical diagnostics are logged and the degraded tokens parsed anyway.
pub fn compile(code: &str) -> Result<Node, SyntaxError> {
    let (mut tokens, errors) = scan(code);
    strip_comments(&mut tokens);
    debug!(tokens = tokens.len(), diagnostics = errors.len(), "scanned");
    Parser::new(&tokens).parse()
}

/// Runs `program` in a fresh global scope, passing every printed value to `out`.
pub fn execute(program: &Node, mut out: impl FnMut(&Value)) -> Result<Value, RuntimeError> {
    debug!("execute in fresh scope");
    let global_scope = Scope::global();
    program.eval(&global_scope, &mut out).map(Signal::into_value)
}

/// A global scope that outlives single runs, for the REPL and for tests.
pub struct Interpreter<'o> {
    global_scope: ScopeLink,
    output: Box<dyn FnMut(&Value) + 'o>,
}

impl Default for Interpreter<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter<'static> {
    /// Prints to stdout.
    pub fn new() -> Self {
        Self::with_output(|value| println!("{value}"))
    }
}

impl<'o> Interpreter<'o> {
    pub fn with_output(output: impl FnMut(&Value) + 'o) -> Self {
        Interpreter {
            global_scope: Scope::global(),
            output: Box::new(output),
        }
    }

    pub fn run(&mut self, code: &str) -> Result<Value, InterpretErr> {
        let program = compile(code)?;
        Ok(self.execute(&program)?)
    }

    pub fn execute(&mut self, program: &Node) -> Result<Value, RuntimeError> {
        debug!("execute in persistent scope");
        program
            .eval(&self.global_scope, &mut *self.output)
            .map(Signal::into_value)
    }

    pub fn get_global(&self, id: &str) -> Option<Value> {
        (*self.global_scope).borrow().get(id)
    }
}
