//! Runtime values

use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;
use rust_decimal::Decimal;

use crate::ast::{BinOp, Ident, Literal, UnaryOp};
use crate::eval::EvalError;
use crate::function::Function;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    BigInt(Rc<BigInt>),
    Complex(Complex),
    Char(char),
    Str(Rc<str>),
    /// Ordered sequence, produced by list catch-all parameters
    Seq(Rc<Vec<Value>>),
    /// Keyword mapping, produced by map catch-all parameters
    Map(Rc<Mapping>),
    Function(Function),
    /// Operand supplied by the host
    Object(Rc<dyn HostObject>),
}

impl Value {
    pub fn str(text: &str) -> Value {
        Value::Str(Rc::from(text))
    }

    pub fn seq(items: Vec<Value>) -> Value {
        Value::Seq(Rc::new(items))
    }

    pub fn bigint(n: impl Into<BigInt>) -> Value {
        Value::BigInt(Rc::new(n.into()))
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::BigInt(_) => "bigint",
            Value::Complex(_) => "complex",
            Value::Char(_) => "char",
            Value::Str(_) => "str",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::Function(_) => "function",
            Value::Object(obj) => obj.type_name(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::I8(n) => *n != 0,
            Value::I16(n) => *n != 0,
            Value::I32(n) => *n != 0,
            Value::I64(n) => *n != 0,
            Value::U8(n) => *n != 0,
            Value::U16(n) => *n != 0,
            Value::U32(n) => *n != 0,
            Value::U64(n) => *n != 0,
            Value::F32(n) => *n != 0.0,
            Value::F64(n) => *n != 0.0,
            Value::Decimal(n) => !n.is_zero(),
            Value::BigInt(n) => n.sign() != num_bigint::Sign::NoSign,
            Value::Complex(c) => !c.is_zero(),
            Value::Char(_) => true,
            Value::Str(s) => !s.is_empty(),
            Value::Seq(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Function(_) | Value::Object(_) => true,
        }
    }

    /// Display form used inside containers: strings and chars are quoted
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{:?}", &**s),
            Value::Char(c) => format!("{c:?}"),
            other => other.to_string(),
        }
    }
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Self {
        match lit {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(n) => Value::I64(*n),
            Literal::BigInt(n) => Value::BigInt(n.clone()),
            Literal::Single(n) => Value::F32(*n),
            Literal::Float(n) => Value::F64(*n),
            Literal::Decimal(n) => Value::Decimal(*n),
            Literal::Char(c) => Value::Char(*c),
            Literal::Str(s) => Value::Str(s.clone()),
        }
    }
}

/// Structural equality: same kind and same payload. Reference kinds
/// compare by identity. Language-level `==` lives in `numeric`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Complex(a), Value::Complex(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(_) | Value::Char(_) => write!(f, "{}", self.repr()),
            Value::Object(obj) => write!(f, "{obj:?}"),
            other => write!(f, "{}({})", other.type_name(), other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::I8(n) => write!(f, "{n}"),
            Value::I16(n) => write!(f, "{n}"),
            Value::I32(n) => write!(f, "{n}"),
            Value::I64(n) => write!(f, "{n}"),
            Value::U8(n) => write!(f, "{n}"),
            Value::U16(n) => write!(f, "{n}"),
            Value::U32(n) => write!(f, "{n}"),
            Value::U64(n) => write!(f, "{n}"),
            Value::F32(n) => write_float(f, f64::from(*n)),
            Value::F64(n) => write_float(f, *n),
            Value::Decimal(n) => write!(f, "{n}"),
            Value::BigInt(n) => write!(f, "{n}"),
            Value::Complex(c) => write!(f, "{c}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.repr())?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {}", value.repr())?;
                }
                write!(f, "}}")
            }
            Value::Function(func) => write!(f, "<function {}>", func.name()),
            Value::Object(obj) => write!(f, "<{} object>", obj.type_name()),
        }
    }
}

/// Integral floats keep a trailing `.0` so they read back as floats
fn write_float(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        write!(f, "nan")
    } else if n.is_infinite() {
        write!(f, "{}", if n > 0.0 { "inf" } else { "-inf" })
    } else if n.fract() == 0.0 && n.abs() < 1e16 {
        write!(f, "{n:.1}")
    } else {
        write!(f, "{n}")
    }
}

// ============================================================================
// Complex numbers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const ZERO: Complex = Complex::new(0.0, 0.0);
    pub const ONE: Complex = Complex::new(1.0, 0.0);

    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    pub fn is_zero(&self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }

    pub fn abs(&self) -> f64 {
        self.re.hypot(self.im)
    }

    pub fn arg(&self) -> f64 {
        self.im.atan2(self.re)
    }

    pub fn add(self, other: Complex) -> Complex {
        Complex::new(self.re + other.re, self.im + other.im)
    }

    pub fn sub(self, other: Complex) -> Complex {
        Complex::new(self.re - other.re, self.im - other.im)
    }

    pub fn mul(self, other: Complex) -> Complex {
        Complex::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }

    pub fn div(self, other: Complex) -> Complex {
        let denom = other.re * other.re + other.im * other.im;
        Complex::new(
            (self.re * other.re + self.im * other.im) / denom,
            (self.im * other.re - self.re * other.im) / denom,
        )
    }

    pub fn neg(self) -> Complex {
        Complex::new(-self.re, -self.im)
    }

    /// Principal value of `self ** exponent`
    pub fn pow(self, exponent: Complex) -> Complex {
        if exponent.is_zero() {
            return Complex::ONE;
        }
        if self.is_zero() {
            return Complex::ZERO;
        }
        let (r, theta) = (self.abs(), self.arg());
        let ln_r = r.ln();
        let magnitude = (exponent.re * ln_r - exponent.im * theta).exp();
        let angle = exponent.im * ln_r + exponent.re * theta;
        Complex::new(magnitude * angle.cos(), magnitude * angle.sin())
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.re == 0.0 && self.re.is_sign_positive() {
            write!(f, "{}j", self.im)
        } else if self.im < 0.0 {
            write!(f, "({}-{}j)", self.re, -self.im)
        } else {
            write!(f, "({}+{}j)", self.re, self.im)
        }
    }
}

// ============================================================================
// Keyword mappings
// ============================================================================

/// Insertion-ordered string-keyed mapping; inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(Ident, Value)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: Ident, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| &**k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ident, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

// ============================================================================
// Host objects
// ============================================================================

/// Capabilities a host-provided operand may expose to operator dispatch.
/// Every capability defaults to "not supported" (`None`).
pub trait HostObject: fmt::Debug {
    fn type_name(&self) -> &str;

    /// Generic conversion to a numeric value
    fn to_number(&self) -> Option<Value> {
        None
    }

    /// `self op rhs`
    fn binary(&self, _op: BinOp, _rhs: &Value) -> Option<Result<Value, EvalError>> {
        None
    }

    /// `lhs op self`, tried when the left operand cannot handle `self`
    fn reverse_binary(&self, _op: BinOp, _lhs: &Value) -> Option<Result<Value, EvalError>> {
        None
    }

    /// Three-way comparison of `self` against `other`: -1, 0 or 1
    fn compare(&self, _other: &Value) -> Option<Result<i32, EvalError>> {
        None
    }

    fn unary(&self, _op: UnaryOp) -> Option<Result<Value, EvalError>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_display_keeps_point() {
        assert_eq!(Value::F64(3.0).to_string(), "3.0");
        assert_eq!(Value::F64(3.5).to_string(), "3.5");
        assert_eq!(Value::F32(0.5).to_string(), "0.5");
        assert_eq!(Value::F64(f64::INFINITY).to_string(), "inf");
    }

    #[test]
    fn containers_quote_strings() {
        let seq = Value::seq(vec![Value::I64(1), Value::str("a"), Value::Char('b')]);
        assert_eq!(seq.to_string(), "[1, \"a\", 'b']");
    }

    #[test]
    fn mapping_last_write_wins() {
        let mut map = Mapping::new();
        map.insert("a".into(), Value::I64(1));
        map.insert("b".into(), Value::I64(2));
        map.insert("a".into(), Value::I64(3));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(&Value::I64(3)));
        assert_eq!(Value::Map(Rc::new(map)).to_string(), "{a: 3, b: 2}");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::U8(0).is_truthy());
        assert!(!Value::str("").is_truthy());
        assert!(!Value::seq(vec![]).is_truthy());
        assert!(Value::Decimal(Decimal::ONE).is_truthy());
        assert!(Value::Char('\0').is_truthy());
    }

    #[test]
    fn complex_arithmetic() {
        let a = Complex::new(1.0, 2.0);
        let b = Complex::new(3.0, -1.0);
        assert_eq!(a.mul(b), Complex::new(5.0, 5.0));
        assert_eq!(a.div(a), Complex::new(1.0, 0.0));
        assert_eq!(Complex::new(0.0, 2.0).to_string(), "2j");
        assert_eq!(Complex::new(1.0, -2.0).to_string(), "(1-2j)");
        let squared = Complex::new(0.0, 1.0).pow(Complex::new(2.0, 0.0));
        assert!((squared.re + 1.0).abs() < 1e-12 && squared.im.abs() < 1e-12);
    }
}
