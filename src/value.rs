use crate::node::{Node, RuntimeError};
use crate::scope::ScopeLink;
use num_traits::Num;
use std::{cell::RefCell, collections::BTreeMap, fmt, rc::Rc};

pub type ObjectRef = Rc<RefCell<Object>>;

/// Reads a number the way literals are written: `0x`/`0b` prefixed integers or decimals
/// with an optional fraction and exponent.
pub fn parse_number(text: &str) -> Option<f64> {
    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (hex, 16)
    } else if let Some(bin) = text
        .strip_prefix("0b")
        .or_else(|| text.strip_prefix("0B"))
    {
        (bin, 2)
    } else {
        // `f64::from_str` would also take `inf` and `nan`.
        let decimal = text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
        return if decimal { text.parse().ok() } else { None };
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    f64::from_str_radix(digits, radix).ok()
}

/// Property bag shared by reference between every value that points at it.
#[derive(Debug, Default)]
pub struct Object {
    props: BTreeMap<Rc<str>, Value>,
}

impl Object {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.props.get(key).cloned()
    }

    pub fn set(&mut self, key: Rc<str>, value: Value) {
        self.props.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }
}

pub struct Function {
    pub name: Option<Rc<str>>,
    pub params: Rc<[Rc<str>]>,
    pub body: Rc<Node>,
    pub closure: ScopeLink,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Print => "print",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Print => 1,
        }
    }

    pub fn call(&self, args: &[Value], out: &mut dyn FnMut(&Value)) -> Result<Value, RuntimeError> {
        if args.len() != self.arity() {
            return Err(RuntimeError::ArityMismatch {
                expected: self.arity(),
                found: args.len(),
            });
        }
        match self {
            Self::Print => {
                for arg in args {
                    out(arg);
                }
                Ok(Value::Undefined)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    String(Rc<str>),
    Object(ObjectRef),
    Function(Rc<Function>),
    Builtin(Builtin),
}

/// Strict equality: primitives by value, objects and functions by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Num(a), Self::Num(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    pub fn new_object() -> Self {
        Self::Object(ObjectRef::default())
    }

    pub fn truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Num(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Object(_) | Self::Function(_) | Self::Builtin(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Num(n) => *n,
            Self::String(s) => match s.trim() {
                "" => 0.0,
                "Infinity" | "+Infinity" => f64::INFINITY,
                "-Infinity" => f64::NEG_INFINITY,
                s => parse_number(s).unwrap_or(f64::NAN),
            },
            Self::Undefined | Self::Object(_) | Self::Function(_) | Self::Builtin(_) => f64::NAN,
        }
    }

    pub fn to_int32(&self) -> i32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        let wrapped = n.trunc().rem_euclid(4294967296.0);
        if wrapped >= 2147483648.0 {
            (wrapped - 4294967296.0) as i32
        } else {
            wrapped as i32
        }
    }

    pub fn to_uint32(&self) -> u32 {
        self.to_int32() as u32
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Num(_) => "number",
            Self::String(_) => "string",
            Self::Object(_) => "object",
            Self::Function(_) | Self::Builtin(_) => "function",
        }
    }

    /// `==`: `null` and `undefined` only equal each other, primitives compare numerically
    /// unless both are strings.
    pub fn loose_eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Undefined | Null, Undefined | Null) => true,
            (Undefined | Null, _) | (_, Undefined | Null) => false,
            (String(a), String(b)) => a == b,
            (Num(_) | Bool(_) | String(_), Num(_) | Bool(_) | String(_)) => {
                self.to_number() == other.to_number()
            }
            _ => self == other,
        }
    }

    /// `target.name`
    pub fn property(&self, name: &str) -> Result<Value, RuntimeError> {
        match self {
            Self::Object(obj) => Ok(obj.borrow().get(name).unwrap_or(Value::Undefined)),
            Self::String(s) if name == "length" => Ok(Value::Num(s.chars().count() as f64)),
            Self::Undefined | Self::Null => Err(RuntimeError::PropertyOfNonObject {
                property: name.to_string(),
                target: self.type_name(),
            }),
            _ => Ok(Value::Undefined),
        }
    }

    /// `target[key]`. Strings index by character, everything else by the key's string form.
    pub fn index(&self, key: &Value) -> Result<Value, RuntimeError> {
        if let (Self::String(s), Self::Num(n)) = (self, key) {
            let ch = if n.fract() == 0.0 && *n >= 0.0 {
                s.chars().nth(*n as usize)
            } else {
                None
            };
            return Ok(ch.map_or(Value::Undefined, |c| Value::String(c.to_string().into())));
        }
        self.property(&key.to_string())
    }
}

fn format_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == 0.0 {
        f.write_str("0")
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let exp = format!("{n:e}");
        match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => write!(f, "{mantissa}e+{power}"),
            _ => f.write_str(&exp),
        }
    } else {
        write!(f, "{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Num(n) => format_number(*n, f),
            Self::String(s) => f.write_str(s),
            Self::Object(_) => f.write_str("[object Object]"),
            Self::Function(func) => match &func.name {
                Some(name) => write!(f, "[function {name}]"),
                None => f.write_str("[function]"),
            },
            Self::Builtin(b) => write!(f, "[builtin {}]", b.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Num(0.0).truthy());
        assert!(!Value::Num(f64::NAN).truthy());
        assert!(!Value::String("".into()).truthy());
        assert!(Value::String("0".into()).truthy());
        assert!(Value::new_object().truthy());
        assert!(!Value::Undefined.truthy());
    }

    #[test]
    fn number_coercion() {
        assert_eq!(Value::String(" 42 ".into()).to_number(), 42.0);
        assert_eq!(Value::String("".into()).to_number(), 0.0);
        assert!(Value::String("4x".into()).to_number().is_nan());
        assert_eq!(Value::Bool(true).to_number(), 1.0);
        assert!(Value::Undefined.to_number().is_nan());
        assert_eq!(Value::Num(-1.5).to_int32(), -1);
        assert_eq!(Value::Num(2147483648.0).to_int32(), -2147483648);
    }

    #[test]
    fn strings_convert_like_literals() {
        assert_eq!(Value::String("0x10".into()).to_number(), 16.0);
        assert_eq!(Value::String("0b101".into()).to_number(), 5.0);
        assert_eq!(Value::String("-2.5e1".into()).to_number(), -25.0);
        assert_eq!(Value::String(" Infinity".into()).to_number(), f64::INFINITY);
        assert_eq!(Value::String("-Infinity".into()).to_number(), f64::NEG_INFINITY);
        assert!(Value::String("inf".into()).to_number().is_nan());
        assert!(Value::String("infinity".into()).to_number().is_nan());
        assert!(Value::String("NaN".into()).to_number().is_nan());
        assert!(Value::String("0x".into()).to_number().is_nan());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Num(3.0).to_string(), "3");
        assert_eq!(Value::Num(0.5).to_string(), "0.5");
        assert_eq!(Value::Num(-0.0).to_string(), "0");
        assert_eq!(Value::Num(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::new_object().to_string(), "[object Object]");
        assert_eq!(Value::Builtin(Builtin::Print).to_string(), "[builtin print]");
    }

    #[test]
    fn large_and_tiny_numbers_use_exponents() {
        assert_eq!(Value::Num(1e21).to_string(), "1e+21");
        assert_eq!(Value::Num(-2.5e30).to_string(), "-2.5e+30");
        assert_eq!(Value::Num(1e-7).to_string(), "1e-7");
        assert_eq!(Value::Num(1e20).to_string(), "100000000000000000000");
        assert_eq!(Value::Num(0.000001).to_string(), "0.000001");
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = Value::new_object();
        let b = Value::new_object();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert!(!a.loose_eq(&b));
    }

    #[test]
    fn property_access() {
        let obj = ObjectRef::default();
        obj.borrow_mut().set("x".into(), Value::Num(1.0));
        let value = Value::Object(obj);
        assert_eq!(value.property("x"), Ok(Value::Num(1.0)));
        assert_eq!(value.property("y"), Ok(Value::Undefined));
        assert_eq!(value.index(&Value::String("x".into())), Ok(Value::Num(1.0)));

        let s = Value::String("héllo".into());
        assert_eq!(s.property("length"), Ok(Value::Num(5.0)));
        assert_eq!(s.index(&Value::Num(1.0)), Ok(Value::String("é".into())));
        assert_eq!(s.index(&Value::Num(9.0)), Ok(Value::Undefined));

        assert!(matches!(
            Value::Null.property("x"),
            Err(RuntimeError::PropertyOfNonObject { target: "null", .. })
        ));
    }
}
