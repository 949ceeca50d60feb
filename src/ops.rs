use crate::value::Value;
use std::{cmp::Ordering, fmt};

/// Binding power of `.`, the tightest binary operator.
pub const MEMBER_PRECEDENCE: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    Or,
    And,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    StrictEqual,
    NotEqual,
    StrictNotEqual,
    Add,
    Sub,
    Mul,
    Pow,
    Div,
    Rem,
    BitOr,
    BitAnd,
    BitXor,
    Shl,
    Shr,
    UShr,
    Member,
}

impl BinaryOp {
    pub fn from_spelling(spelling: &str) -> Option<Self> {
        Some(match spelling {
            "=" => Self::Assign,
            "+=" => Self::AddAssign,
            "-=" => Self::SubAssign,
            "*=" => Self::MulAssign,
            "/=" => Self::DivAssign,
            "%=" => Self::RemAssign,
            "||" => Self::Or,
            "&&" => Self::And,
            "<" => Self::Less,
            ">" => Self::Greater,
            "<=" => Self::LessEqual,
            ">=" => Self::GreaterEqual,
            "==" => Self::Equal,
            "===" => Self::StrictEqual,
            "!=" => Self::NotEqual,
            "!==" => Self::StrictNotEqual,
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "**" => Self::Pow,
            "/" => Self::Div,
            "%" => Self::Rem,
            "|" => Self::BitOr,
            "&" => Self::BitAnd,
            "^" => Self::BitXor,
            "<<" => Self::Shl,
            ">>" => Self::Shr,
            ">>>" => Self::UShr,
            "." => Self::Member,
            _ => return None,
        })
    }

    pub fn spelling(self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
            Self::RemAssign => "%=",
            Self::Or => "||",
            Self::And => "&&",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Equal => "==",
            Self::StrictEqual => "===",
            Self::NotEqual => "!=",
            Self::StrictNotEqual => "!==",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Pow => "**",
            Self::Div => "/",
            Self::Rem => "%",
            Self::BitOr => "|",
            Self::BitAnd => "&",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::UShr => ">>>",
            Self::Member => ".",
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            Self::Assign
            | Self::AddAssign
            | Self::SubAssign
            | Self::MulAssign
            | Self::DivAssign
            | Self::RemAssign => 1,
            Self::Or => 2,
            Self::And => 3,
            Self::Less
            | Self::Greater
            | Self::LessEqual
            | Self::GreaterEqual
            | Self::Equal
            | Self::StrictEqual
            | Self::NotEqual
            | Self::StrictNotEqual => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul
            | Self::Pow
            | Self::Div
            | Self::Rem
            | Self::BitOr
            | Self::BitAnd
            | Self::BitXor
            | Self::Shl
            | Self::Shr
            | Self::UShr => 6,
            Self::Member => MEMBER_PRECEDENCE,
        }
    }

    pub fn is_assignment(self) -> bool {
        self.precedence() == 1
    }

    /// The operator a compound assignment combines with, `None` for plain `=`.
    pub fn compound(self) -> Option<BinaryOp> {
        match self {
            Self::AddAssign => Some(Self::Add),
            Self::SubAssign => Some(Self::Sub),
            Self::MulAssign => Some(Self::Mul),
            Self::DivAssign => Some(Self::Div),
            Self::RemAssign => Some(Self::Rem),
            _ => None,
        }
    }

    /// Applies an operator to two evaluated operands.
    ///
    /// Assignment, `||`, `&&` and `.` need the unevaluated operands and are handled by the
    /// evaluator; here they yield `undefined`.
    pub fn apply(self, l: &Value, r: &Value) -> Value {
        match self {
            Self::Add => match (l, r) {
                (Value::Num(_) | Value::Bool(_) | Value::Null | Value::Undefined, _)
                    if is_numeric(r) =>
                {
                    Value::Num(l.to_number() + r.to_number())
                }
                _ => Value::String(format!("{l}{r}").into()),
            },
            Self::Sub => Value::Num(l.to_number() - r.to_number()),
            Self::Mul => Value::Num(l.to_number() * r.to_number()),
            Self::Div => Value::Num(l.to_number() / r.to_number()),
            Self::Rem => Value::Num(l.to_number() % r.to_number()),
            Self::Pow => Value::Num(l.to_number().powf(r.to_number())),

            Self::Less => Value::Bool(compare(l, r) == Some(Ordering::Less)),
            Self::Greater => Value::Bool(compare(l, r) == Some(Ordering::Greater)),
            Self::LessEqual => Value::Bool(matches!(
                compare(l, r),
                Some(Ordering::Less | Ordering::Equal)
            )),
            Self::GreaterEqual => Value::Bool(matches!(
                compare(l, r),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            Self::Equal => Value::Bool(l.loose_eq(r)),
            Self::NotEqual => Value::Bool(!l.loose_eq(r)),
            Self::StrictEqual => Value::Bool(l == r),
            Self::StrictNotEqual => Value::Bool(l != r),

            Self::BitOr => Value::Num((l.to_int32() | r.to_int32()).into()),
            Self::BitAnd => Value::Num((l.to_int32() & r.to_int32()).into()),
            Self::BitXor => Value::Num((l.to_int32() ^ r.to_int32()).into()),
            Self::Shl => Value::Num(l.to_int32().wrapping_shl(r.to_uint32() & 31).into()),
            Self::Shr => Value::Num((l.to_int32() >> (r.to_uint32() & 31)).into()),
            Self::UShr => Value::Num((l.to_uint32() >> (r.to_uint32() & 31)).into()),

            Self::Assign
            | Self::AddAssign
            | Self::SubAssign
            | Self::MulAssign
            | Self::DivAssign
            | Self::RemAssign
            | Self::Or
            | Self::And
            | Self::Member => Value::Undefined,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelling())
    }
}

fn is_numeric(v: &Value) -> bool {
    matches!(
        v,
        Value::Num(_) | Value::Bool(_) | Value::Null | Value::Undefined
    )
}

fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => l.to_number().partial_cmp(&r.to_number()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    Inc,
    Dec,
}

impl UnaryOp {
    pub fn from_spelling(spelling: &str) -> Option<Self> {
        Some(match spelling {
            "-" => Self::Neg,
            "+" => Self::Plus,
            "!" => Self::Not,
            "~" => Self::BitNot,
            "++" => Self::Inc,
            "--" => Self::Dec,
            _ => return None,
        })
    }

    pub fn spelling(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Plus => "+",
            Self::Not => "!",
            Self::BitNot => "~",
            Self::Inc => "++",
            Self::Dec => "--",
        }
    }

    /// `++` and `--` write back to a variable and are handled by the evaluator.
    pub fn apply(self, v: &Value) -> Value {
        match self {
            Self::Neg => Value::Num(-v.to_number()),
            Self::Plus => Value::Num(v.to_number()),
            Self::Not => Value::Bool(!v.truthy()),
            Self::BitNot => Value::Num((!v.to_int32()).into()),
            Self::Inc => Value::Num(v.to_number() + 1.0),
            Self::Dec => Value::Num(v.to_number() - 1.0),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelling())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fixity {
    Prefix,
    Postfix,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Num(n)
    }

    fn string(s: &str) -> Value {
        Value::String(s.into())
    }

    #[test]
    fn plus_concatenates_when_a_string_is_involved() {
        assert_eq!(BinaryOp::Add.apply(&num(1.0), &num(2.0)), num(3.0));
        assert_eq!(BinaryOp::Add.apply(&num(1.0), &string("2")), string("12"));
        assert_eq!(BinaryOp::Add.apply(&string("a"), &Value::Bool(true)), string("atrue"));
        assert_eq!(BinaryOp::Add.apply(&Value::Bool(true), &num(1.0)), num(2.0));
    }

    #[test]
    fn arithmetic_follows_float_rules() {
        assert_eq!(BinaryOp::Rem.apply(&num(7.0), &num(-3.0)), num(1.0));
        assert_eq!(BinaryOp::Pow.apply(&num(2.0), &num(10.0)), num(1024.0));
        assert_eq!(BinaryOp::Div.apply(&num(1.0), &num(0.0)), num(f64::INFINITY));
        assert_eq!(BinaryOp::Sub.apply(&string("5"), &num(2.0)), num(3.0));
    }

    #[test]
    fn bitwise_uses_32_bit_integers() {
        assert_eq!(BinaryOp::UShr.apply(&num(-1.0), &num(28.0)), num(15.0));
        assert_eq!(BinaryOp::Shr.apply(&num(-8.0), &num(1.0)), num(-4.0));
        assert_eq!(BinaryOp::Shl.apply(&num(1.0), &num(33.0)), num(2.0));
        assert_eq!(BinaryOp::BitOr.apply(&num(4294967297.0), &num(0.0)), num(1.0));
        assert_eq!(BinaryOp::BitXor.apply(&num(5.0), &num(3.0)), num(6.0));
        assert_eq!(UnaryOp::BitNot.apply(&num(0.0)), num(-1.0));
    }

    #[test]
    fn equality_and_ordering() {
        assert_eq!(BinaryOp::Equal.apply(&num(1.0), &string("1")), Value::Bool(true));
        assert_eq!(BinaryOp::StrictEqual.apply(&num(1.0), &string("1")), Value::Bool(false));
        assert_eq!(BinaryOp::Equal.apply(&Value::Null, &Value::Undefined), Value::Bool(true));
        assert_eq!(BinaryOp::NotEqual.apply(&Value::Null, &num(0.0)), Value::Bool(true));
        assert_eq!(BinaryOp::StrictNotEqual.apply(&num(2.0), &num(2.0)), Value::Bool(false));
        assert_eq!(BinaryOp::Less.apply(&string("apple"), &string("b")), Value::Bool(true));
        assert_eq!(BinaryOp::GreaterEqual.apply(&num(f64::NAN), &num(1.0)), Value::Bool(false));
    }

    #[test]
    fn precedence_table_order() {
        let ladder = ["=", "||", "&&", "==", "+", "*", "."];
        let levels = ladder
            .iter()
            .filter_map(|s| BinaryOp::from_spelling(s))
            .map(BinaryOp::precedence)
            .collect::<Vec<_>>();
        assert_eq!(levels, vec![1, 2, 3, 4, 5, 6, 7]);
        assert!(BinaryOp::RemAssign.is_assignment());
        assert_eq!(BinaryOp::MulAssign.compound(), Some(BinaryOp::Mul));
    }
}
