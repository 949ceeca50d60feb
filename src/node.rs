use crate::ops::{BinaryOp, Fixity, UnaryOp};
use crate::scope::{Scope, ScopeLink};
use crate::value::{parse_number, Function, ObjectRef, Value};
use rustc_hash::FxHashMap;
use std::{cell::RefCell, rc::Rc};
use thiserror::Error;
use tracing::trace;

pub type NodeRef = Box<Node>;

/// Calls nested deeper than this fail instead of exhausting memory.
pub const MAX_CALL_DEPTH: usize = 1000;

// Grow the stack by `STACK_PER_GROWTH` once less than `RED_ZONE` is left.
const RED_ZONE: usize = 100 * 1024;
const STACK_PER_GROWTH: usize = 1024 * 1024;

/// A `case` label. Numbers are keyed by their bit pattern with `-0` folded into `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CaseLabel {
    Bool(bool),
    Num(u64),
    Str(Rc<str>),
}

impl CaseLabel {
    pub fn number(n: f64) -> Self {
        let n = if n == 0.0 { 0.0 } else { n };
        Self::Num(n.to_bits())
    }

    /// The label a runtime value would match, if any.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Num(n) => Some(Self::number(*n)),
            Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }
}

/// Where each `case` of a switch enters its flattened body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arms {
    pub cases: FxHashMap<CaseLabel, usize>,
    pub default: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Program(Vec<Node>),
    /// Member access is `Binary(BinaryOp::Member, target, Identifier(name))`.
    Binary(BinaryOp, NodeRef, NodeRef),
    Unary(UnaryOp, Fixity, NodeRef),
    Number(f64),
    String(Rc<str>),
    Boolean(bool),
    Null,
    Undefined,
    Identifier(Rc<str>),
    Declaration(Vec<(Rc<str>, Option<Node>)>),
    Return(NodeRef),
    Break,
    Continue,
    Function(Option<Rc<str>>, Rc<[Rc<str>]>, Rc<Node>),
    Call(NodeRef, Vec<Node>),
    IfElse(NodeRef, NodeRef, Option<NodeRef>),
    Switch(NodeRef, Arms, Vec<Node>),
    For(NodeRef, NodeRef, NodeRef, NodeRef),
    While(NodeRef, NodeRef),
    DoWhile(NodeRef, NodeRef),
    New(NodeRef),
    Index(NodeRef, NodeRef),
}

/// Outcome of evaluating a node. Anything but `Value` unwinds to the nearest
/// construct that handles it.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Value(Value),
    Return(Value),
    Break,
    Continue,
}

impl Signal {
    pub fn into_value(self) -> Value {
        match self {
            Self::Value(v) | Self::Return(v) => v,
            Self::Break | Self::Continue => Value::Undefined,
        }
    }

    fn is_transfer(&self) -> bool {
        !matches!(self, Self::Value(_))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("`{0}` is not defined")]
    UndefinedVariable(Rc<str>),
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("{0} is not a function")]
    NotAFunction(String),
    #[error("expected {expected} arguments but got {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("`{0}` needs a variable as its operand")]
    NonIdentifierIncrementDecrement(UnaryOp),
    #[error("cannot read property `{property}` of {target}")]
    PropertyOfNonObject {
        property: String,
        target: &'static str,
    },
    #[error("maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),
}

pub type EvalResult = Result<Signal, RuntimeError>;

impl Node {
    /// Builds a number literal. `0x` and `0b` prefixes select the base.
    pub fn number(text: &str) -> Option<Node> {
        parse_number(text).map(Node::Number)
    }

    /// Builds a string literal from its quoted source text.
    pub fn string(text: &str) -> Node {
        let mut chars = text.chars();
        let quote = chars.next();
        let mut value = String::with_capacity(text.len());
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some(other) => value.push(other),
                    None => break,
                },
                c if Some(c) == quote => break,
                c => value.push(c),
            }
        }
        Node::String(value.into())
    }

    pub fn eval(&self, scope: &ScopeLink, out: &mut dyn FnMut(&Value)) -> EvalResult {
        stacker::maybe_grow(RED_ZONE, STACK_PER_GROWTH, || self.eval_node(scope, out))
    }

    fn eval_node(&self, scope: &ScopeLink, out: &mut dyn FnMut(&Value)) -> EvalResult {
        let value = match self {
            Self::Program(children) => {
                let mut result = Signal::Value(Value::Undefined);
                for child in children {
                    result = child.eval(scope, out)?;
                    if result.is_transfer() {
                        break;
                    }
                }
                return Ok(result);
            }
            Self::Number(n) => Value::Num(*n),
            Self::String(s) => Value::String(s.clone()),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Null => Value::Null,
            Self::Undefined => Value::Undefined,
            Self::Identifier(id) => lookup(scope, id)?,
            Self::Binary(op, l, r) => binary(*op, l, r, scope, out)?,
            Self::Unary(op, fixity, operand) => unary(*op, *fixity, operand, scope, out)?,
            Self::Declaration(decls) => {
                // All names exist before any initializer runs.
                for (id, _) in decls {
                    scope.borrow_mut().declare(id.clone(), Value::Null);
                }
                for (id, init) in decls {
                    if let Some(init) = init {
                        let val = init.value(scope, out)?;
                        scope.borrow_mut().declare(id.clone(), val);
                    }
                }
                Value::Undefined
            }
            Self::Return(expr) => return Ok(Signal::Return(expr.value(scope, out)?)),
            Self::Break => return Ok(Signal::Break),
            Self::Continue => return Ok(Signal::Continue),
            Self::Function(name, params, body) => {
                let func = Value::Function(Rc::new(Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    closure: scope.clone(),
                }));
                if let Some(name) = name {
                    scope.borrow_mut().declare(name.clone(), func.clone());
                }
                func
            }
            Self::Call(callee, args) => call(callee, args, scope, out)?,
            Self::IfElse(cond, then, otherwise) => {
                if cond.value(scope, out)?.truthy() {
                    return then.eval(scope, out);
                }
                match otherwise {
                    Some(otherwise) => return otherwise.eval(scope, out),
                    None => Value::Undefined,
                }
            }
            Self::Switch(subject, arms, body) => {
                let key = subject.value(scope, out)?;
                let start = CaseLabel::of(&key)
                    .and_then(|label| arms.cases.get(&label).copied())
                    .or(arms.default);
                if let Some(start) = start {
                    for stmt in body.iter().skip(start) {
                        match stmt.eval(scope, out)? {
                            Signal::Value(_) => {}
                            Signal::Break => break,
                            signal @ (Signal::Return(_) | Signal::Continue) => return Ok(signal),
                        }
                    }
                }
                Value::Undefined
            }
            Self::For(init, cond, step, body) => {
                init.eval(scope, out)?;
                while cond.value(scope, out)?.truthy() {
                    match body.eval(scope, out)? {
                        Signal::Break => break,
                        signal @ Signal::Return(_) => return Ok(signal),
                        Signal::Value(_) | Signal::Continue => {}
                    }
                    step.eval(scope, out)?;
                }
                Value::Undefined
            }
            Self::While(cond, body) => {
                while cond.value(scope, out)?.truthy() {
                    match body.eval(scope, out)? {
                        Signal::Break => break,
                        signal @ Signal::Return(_) => return Ok(signal),
                        Signal::Value(_) | Signal::Continue => {}
                    }
                }
                Value::Undefined
            }
            Self::DoWhile(body, cond) => {
                loop {
                    match body.eval(scope, out)? {
                        Signal::Break => break,
                        signal @ Signal::Return(_) => return Ok(signal),
                        Signal::Value(_) | Signal::Continue => {}
                    }
                    if !cond.value(scope, out)?.truthy() {
                        break;
                    }
                }
                Value::Undefined
            }
            Self::New(expr) => expr.value(scope, out)?,
            Self::Index(target, key) => {
                let target = target.value(scope, out)?;
                let key = key.value(scope, out)?;
                target.index(&key)?
            }
        };
        Ok(Signal::Value(value))
    }

    /// Evaluates in expression position, where a control transfer only contributes its payload.
    fn value(&self, scope: &ScopeLink, out: &mut dyn FnMut(&Value)) -> Result<Value, RuntimeError> {
        self.eval(scope, out).map(Signal::into_value)
    }
}

fn lookup(scope: &ScopeLink, id: &Rc<str>) -> Result<Value, RuntimeError> {
    scope
        .borrow()
        .get(id)
        .ok_or_else(|| RuntimeError::UndefinedVariable(id.clone()))
}

fn member_name(
    name: &Node,
    scope: &ScopeLink,
    out: &mut dyn FnMut(&Value),
) -> Result<Rc<str>, RuntimeError> {
    match name {
        Node::Identifier(name) => Ok(name.clone()),
        other => Ok(other.value(scope, out)?.to_string().into()),
    }
}

fn binary(
    op: BinaryOp,
    lhs: &Node,
    rhs: &Node,
    scope: &ScopeLink,
    out: &mut dyn FnMut(&Value),
) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Or => {
            let l = lhs.value(scope, out)?;
            if l.truthy() {
                Ok(l)
            } else {
                rhs.value(scope, out)
            }
        }
        BinaryOp::And => {
            let l = lhs.value(scope, out)?;
            if l.truthy() {
                rhs.value(scope, out)
            } else {
                Ok(l)
            }
        }
        BinaryOp::Member => {
            let target = lhs.value(scope, out)?;
            let name = member_name(rhs, scope, out)?;
            target.property(&name)
        }
        op if op.is_assignment() => assign(op, lhs, rhs, scope, out),
        op => {
            let l = lhs.value(scope, out)?;
            let r = rhs.value(scope, out)?;
            Ok(op.apply(&l, &r))
        }
    }
}

/// A resolved assignment target.
enum Place {
    Variable(Rc<str>),
    Property(ObjectRef, Rc<str>),
}

impl Place {
    fn resolve(
        target: &Node,
        scope: &ScopeLink,
        out: &mut dyn FnMut(&Value),
    ) -> Result<Place, RuntimeError> {
        match target {
            Node::Identifier(id) => Ok(Place::Variable(id.clone())),
            Node::Binary(BinaryOp::Member, obj, name) => {
                let obj = obj.value(scope, out)?;
                let name = member_name(name, scope, out)?;
                Place::property(obj, name)
            }
            Node::Index(obj, key) => {
                let obj = obj.value(scope, out)?;
                let key = key.value(scope, out)?.to_string().into();
                Place::property(obj, key)
            }
            _ => Err(RuntimeError::InvalidAssignmentTarget),
        }
    }

    fn property(target: Value, key: Rc<str>) -> Result<Place, RuntimeError> {
        match target {
            Value::Object(obj) => Ok(Place::Property(obj, key)),
            other => Err(RuntimeError::PropertyOfNonObject {
                property: key.to_string(),
                target: other.type_name(),
            }),
        }
    }

    fn get(&self, scope: &ScopeLink) -> Result<Value, RuntimeError> {
        match self {
            Place::Variable(id) => lookup(scope, id),
            Place::Property(obj, key) => Ok(obj.borrow().get(key).unwrap_or(Value::Undefined)),
        }
    }

    fn set(&self, scope: &ScopeLink, val: Value) -> Result<(), RuntimeError> {
        match self {
            Place::Variable(id) => scope.borrow_mut().assign(id, val),
            Place::Property(obj, key) => {
                obj.borrow_mut().set(key.clone(), val);
                Ok(())
            }
        }
    }
}

fn assign(
    op: BinaryOp,
    target: &Node,
    rhs: &Node,
    scope: &ScopeLink,
    out: &mut dyn FnMut(&Value),
) -> Result<Value, RuntimeError> {
    let place = Place::resolve(target, scope, out)?;
    let val = match op.compound() {
        None => rhs.value(scope, out)?,
        Some(combine) => {
            let current = place.get(scope)?;
            let r = rhs.value(scope, out)?;
            combine.apply(&current, &r)
        }
    };
    place.set(scope, val.clone())?;
    Ok(val)
}

fn unary(
    op: UnaryOp,
    fixity: Fixity,
    operand: &Node,
    scope: &ScopeLink,
    out: &mut dyn FnMut(&Value),
) -> Result<Value, RuntimeError> {
    match op {
        UnaryOp::Inc | UnaryOp::Dec => {
            let Node::Identifier(id) = operand else {
                return Err(RuntimeError::NonIdentifierIncrementDecrement(op));
            };
            let old = lookup(scope, id)?;
            let new = op.apply(&old);
            scope.borrow_mut().assign(id, new.clone())?;
            Ok(match fixity {
                Fixity::Prefix => new,
                Fixity::Postfix => Value::Num(old.to_number()),
            })
        }
        op => Ok(op.apply(&operand.value(scope, out)?)),
    }
}

fn call(
    callee: &Node,
    args: &[Node],
    scope: &ScopeLink,
    out: &mut dyn FnMut(&Value),
) -> Result<Value, RuntimeError> {
    match callee.value(scope, out)? {
        Value::Function(func) => {
            let args = arguments(args, func.params.len(), scope, out)?;
            let depth = scope.borrow().depth() + 1;
            invoke(&func, args, depth, out)
        }
        Value::Builtin(builtin) => {
            let args = arguments(args, builtin.arity(), scope, out)?;
            builtin.call(&args, out)
        }
        other => Err(RuntimeError::NotAFunction(match callee {
            Node::Identifier(id) => format!("`{id}`"),
            _ => format!("`{other}`"),
        })),
    }
}

/// Checks the argument count, then evaluates the arguments left to right.
fn arguments(
    args: &[Node],
    expected: usize,
    scope: &ScopeLink,
    out: &mut dyn FnMut(&Value),
) -> Result<Vec<Value>, RuntimeError> {
    if args.len() != expected {
        return Err(RuntimeError::ArityMismatch {
            expected,
            found: args.len(),
        });
    }
    let mut evaluated = Vec::with_capacity(args.len());
    for arg in args {
        evaluated.push(arg.value(scope, out)?);
    }
    Ok(evaluated)
}

fn invoke(
    func: &Function,
    args: Vec<Value>,
    depth: usize,
    out: &mut dyn FnMut(&Value),
) -> Result<Value, RuntimeError> {
    trace!(
        name = func.name.as_deref().unwrap_or("<anonymous>"),
        args = args.len(),
        depth,
        "call"
    );
    if depth > MAX_CALL_DEPTH {
        return Err(RuntimeError::CallDepthExceeded(MAX_CALL_DEPTH));
    }
    let child = Rc::new(RefCell::new(Scope::call_frame(func.closure.clone(), depth)));
    let mut bor = (*child).borrow_mut();
    for (param, arg) in func.params.iter().zip(args) {
        bor.declare(param.clone(), arg);
    }
    // The body looks names up through `child`.
    drop(bor);

    match func.body.eval(&child, out)? {
        Signal::Return(val) => Ok(val),
        Signal::Value(_) => {
            // A body that fills `this` without returning acts as a constructor.
            let receiver = child.borrow().receiver();
            let constructed = matches!(&receiver, Value::Object(obj) if !obj.borrow().is_empty());
            Ok(if constructed { receiver } else { Value::Undefined })
        }
        Signal::Break | Signal::Continue => Ok(Value::Undefined),
    }
}
