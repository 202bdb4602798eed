//! Operand coercion and operator dispatch
//!
//! Binary operators on two numbers pick a common kind and compute in it.
//! For `op(a, b)` with a numeric `a`:
//!
//! 1. same kind: apply directly (two bools act as `i64`)
//! 2. other fixed-width kind or bool: both widen per [`widen`]
//! 3. `b` is a bigint: compute in `f64`
//! 4. `b` is complex: compute in complex
//! 5. `b` converts to a number: convert, then dispatch again
//! 6. `b`'s reverse operator, or a type error naming both operands
//!
//! `/`, `//` and `%` reject a zero right operand before any of that.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::rc::Rc;

use num_bigint::{BigInt, Sign};
use num_traits::{Float, FromPrimitive, One, ToPrimitive, Zero};
use rust_decimal::Decimal;

use crate::ast::{BinOp, CmpOp, UnaryOp};
use crate::eval::EvalError;
use crate::value::{Complex, Value};

/// Numeric kinds of the promotion tower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal,
    BigInt,
    Complex,
}

impl NumKind {
    pub const ALL: [NumKind; 14] = [
        NumKind::Bool,
        NumKind::I8,
        NumKind::I16,
        NumKind::I32,
        NumKind::I64,
        NumKind::U8,
        NumKind::U16,
        NumKind::U32,
        NumKind::U64,
        NumKind::F32,
        NumKind::F64,
        NumKind::Decimal,
        NumKind::BigInt,
        NumKind::Complex,
    ];

    pub fn of(value: &Value) -> Option<NumKind> {
        Some(match value {
            Value::Bool(_) => NumKind::Bool,
            Value::I8(_) => NumKind::I8,
            Value::I16(_) => NumKind::I16,
            Value::I32(_) => NumKind::I32,
            Value::I64(_) => NumKind::I64,
            Value::U8(_) => NumKind::U8,
            Value::U16(_) => NumKind::U16,
            Value::U32(_) => NumKind::U32,
            Value::U64(_) => NumKind::U64,
            Value::F32(_) => NumKind::F32,
            Value::F64(_) => NumKind::F64,
            Value::Decimal(_) => NumKind::Decimal,
            Value::BigInt(_) => NumKind::BigInt,
            Value::Complex(_) => NumKind::Complex,
            _ => return None,
        })
    }

    /// Signedness and width of the fixed-width integer kinds
    fn int_shape(self) -> Option<(bool, u32)> {
        Some(match self {
            NumKind::I8 => (true, 8),
            NumKind::I16 => (true, 16),
            NumKind::I32 => (true, 32),
            NumKind::I64 => (true, 64),
            NumKind::U8 => (false, 8),
            NumKind::U16 => (false, 16),
            NumKind::U32 => (false, 32),
            NumKind::U64 => (false, 64),
            _ => return None,
        })
    }

    fn from_shape(signed: bool, bits: u32) -> NumKind {
        match (signed, bits) {
            (true, 8) => NumKind::I8,
            (true, 16) => NumKind::I16,
            (true, 32) => NumKind::I32,
            (true, _) => NumKind::I64,
            (false, 8) => NumKind::U8,
            (false, 16) => NumKind::U16,
            (false, 32) => NumKind::U32,
            (false, _) => NumKind::U64,
        }
    }

    pub fn is_int(self) -> bool {
        self.int_shape().is_some()
    }

    /// Bool, fixed-width integers and bigint
    pub fn is_integral(self) -> bool {
        self.is_int() || matches!(self, NumKind::Bool | NumKind::BigInt)
    }

    pub fn is_float(self) -> bool {
        matches!(self, NumKind::F32 | NumKind::F64)
    }
}

// ============================================================================
// Promotion
// ============================================================================

/// Widening table for two primitive kinds (step 2)
pub fn widen(a: NumKind, b: NumKind) -> NumKind {
    use NumKind::*;
    match (a, b) {
        (Bool, Bool) => I64,
        (Bool, k) | (k, Bool) => k,
        _ if a == b => a,
        (F64, _) | (_, F64) => F64,
        (Decimal, F32) | (F32, Decimal) => F64,
        (Decimal, _) | (_, Decimal) => Decimal,
        (F32, _) | (_, F32) => F32,
        _ => widen_ints(a, b),
    }
}

fn widen_ints(a: NumKind, b: NumKind) -> NumKind {
    let (Some((a_signed, a_bits)), Some((b_signed, b_bits))) = (a.int_shape(), b.int_shape()) else {
        return NumKind::F64;
    };
    if a_signed == b_signed {
        return NumKind::from_shape(a_signed, a_bits.max(b_bits));
    }
    let (signed_bits, unsigned_bits) = if a_signed { (a_bits, b_bits) } else { (b_bits, a_bits) };
    if signed_bits > unsigned_bits {
        NumKind::from_shape(true, signed_bits)
    } else if unsigned_bits < 64 {
        NumKind::from_shape(true, unsigned_bits * 2)
    } else {
        NumKind::Decimal
    }
}

/// Kind an arithmetic operator computes in for `a op b`
pub fn result_kind(a: NumKind, b: NumKind) -> NumKind {
    use NumKind::*;
    if a == b {
        return if a == Bool { I64 } else { a };
    }
    match (a, b) {
        (Complex, _) | (_, Complex) => Complex,
        (BigInt, k) if k.is_integral() => BigInt,
        (BigInt, _) | (_, BigInt) => F64,
        _ => widen(a, b),
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn to_i128(value: &Value) -> Option<i128> {
    Some(match value {
        Value::Bool(b) => i128::from(*b),
        Value::I8(n) => i128::from(*n),
        Value::I16(n) => i128::from(*n),
        Value::I32(n) => i128::from(*n),
        Value::I64(n) => i128::from(*n),
        Value::U8(n) => i128::from(*n),
        Value::U16(n) => i128::from(*n),
        Value::U32(n) => i128::from(*n),
        Value::U64(n) => i128::from(*n),
        _ => return None,
    })
}

fn to_f64(value: &Value) -> f64 {
    match value {
        Value::F32(n) => f64::from(*n),
        Value::F64(n) => *n,
        Value::Decimal(n) => n.to_f64().unwrap_or(f64::NAN),
        Value::BigInt(n) => n.to_f64().unwrap_or(f64::NAN),
        Value::Complex(c) => c.re,
        other => to_i128(other).map_or(f64::NAN, |n| n as f64),
    }
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Decimal(n) => Some(*n),
        Value::F32(n) => Decimal::from_f32(*n),
        Value::F64(n) => Decimal::from_f64(*n),
        other => to_i128(other).and_then(Decimal::from_i128),
    }
}

fn to_bigint(value: &Value) -> Option<BigInt> {
    match value {
        Value::BigInt(n) => Some((**n).clone()),
        other => to_i128(other).map(BigInt::from),
    }
}

fn to_complex(value: &Value) -> Complex {
    match value {
        Value::Complex(c) => *c,
        other => Complex::new(to_f64(other), 0.0),
    }
}

/// An integer result in `kind` if it fits, else `i64`, else bigint
fn fit_int(kind: NumKind, n: i128) -> Value {
    let exact = match kind {
        NumKind::I8 => i8::try_from(n).ok().map(Value::I8),
        NumKind::I16 => i16::try_from(n).ok().map(Value::I16),
        NumKind::I32 => i32::try_from(n).ok().map(Value::I32),
        NumKind::U8 => u8::try_from(n).ok().map(Value::U8),
        NumKind::U16 => u16::try_from(n).ok().map(Value::U16),
        NumKind::U32 => u32::try_from(n).ok().map(Value::U32),
        NumKind::U64 => u64::try_from(n).ok().map(Value::U64),
        _ => None,
    };
    exact
        .or_else(|| i64::try_from(n).ok().map(Value::I64))
        .unwrap_or_else(|| Value::bigint(n))
}

fn fit_big(kind: NumKind, n: BigInt) -> Value {
    if kind == NumKind::BigInt {
        return Value::BigInt(Rc::new(n));
    }
    match n.to_i128() {
        Some(small) => fit_int(kind, small),
        None => Value::BigInt(Rc::new(n)),
    }
}

fn is_zero(value: &Value) -> bool {
    NumKind::of(value).is_some() && !value.is_truthy()
}

fn conversion_failed() -> EvalError {
    EvalError::Internal("numeric conversion")
}

pub fn type_error(op: &str, a: &Value, b: &Value) -> EvalError {
    EvalError::Type(format!(
        "invalid operand types for {op}: '{}' and '{}'",
        a.type_name(),
        b.type_name()
    ))
}

// ============================================================================
// Binary operators
// ============================================================================

pub fn binary(op: BinOp, a: &Value, b: &Value) -> Result<Value, EvalError> {
    let zero_message = match op {
        BinOp::Div | BinOp::FloorDiv => Some("float division by zero"),
        BinOp::Mod => Some("float modulus by zero"),
        _ => None,
    };
    if let Some(message) = zero_message {
        if is_zero(b) {
            return Err(EvalError::DivideByZero(message));
        }
    }

    match (NumKind::of(a), NumKind::of(b)) {
        (Some(ka), Some(kb)) => numeric_binary(op, ka, kb, a, b),
        (Some(_), None) => fallback(op, a, b),
        (None, _) => non_numeric_binary(op, a, b),
    }
}

pub fn add(a: &Value, b: &Value) -> Result<Value, EvalError> {
    binary(BinOp::Add, a, b)
}

pub fn subtract(a: &Value, b: &Value) -> Result<Value, EvalError> {
    binary(BinOp::Sub, a, b)
}

pub fn multiply(a: &Value, b: &Value) -> Result<Value, EvalError> {
    binary(BinOp::Mul, a, b)
}

pub fn divide(a: &Value, b: &Value) -> Result<Value, EvalError> {
    binary(BinOp::Div, a, b)
}

pub fn floor_divide(a: &Value, b: &Value) -> Result<Value, EvalError> {
    binary(BinOp::FloorDiv, a, b)
}

pub fn modulo(a: &Value, b: &Value) -> Result<Value, EvalError> {
    binary(BinOp::Mod, a, b)
}

pub fn power(a: &Value, b: &Value) -> Result<Value, EvalError> {
    binary(BinOp::Pow, a, b)
}

fn numeric_binary(op: BinOp, ka: NumKind, kb: NumKind, a: &Value, b: &Value) -> Result<Value, EvalError> {
    match op {
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => bitwise(op, ka, kb, a, b),
        BinOp::Shl | BinOp::Shr => shift(op, ka, kb, a, b),
        _ => arithmetic(op, result_kind(ka, kb), a, b),
    }
}

/// Steps 5 and 6: host conversion, then the right operand's reverse operator
fn fallback(op: BinOp, a: &Value, b: &Value) -> Result<Value, EvalError> {
    if let Value::Object(obj) = b {
        if let Some(number) = obj.to_number() {
            return binary(op, a, &number);
        }
        if let Some(result) = obj.reverse_binary(op, a) {
            return result;
        }
    }
    Err(type_error(op.symbol(), a, b))
}

fn non_numeric_binary(op: BinOp, a: &Value, b: &Value) -> Result<Value, EvalError> {
    match (op, a, b) {
        (BinOp::Add, Value::Str(_) | Value::Char(_), Value::Str(_) | Value::Char(_)) => {
            let mut joined = text_of(a).into_owned();
            joined.push_str(&text_of(b));
            return Ok(Value::Str(Rc::from(joined)));
        }
        (BinOp::Mul, Value::Str(s), count) => {
            if let Some(n) = to_i128(count) {
                let times = usize::try_from(n.max(0)).unwrap_or(usize::MAX);
                return repeat_text(s, times).map(|text| Value::Str(Rc::from(text)));
            }
        }
        (BinOp::Add, Value::Seq(x), Value::Seq(y)) => {
            let joined = x.iter().chain(y.iter()).cloned().collect();
            return Ok(Value::seq(joined));
        }
        _ => {}
    }

    if let Value::Object(obj) = a {
        if let Some(result) = obj.binary(op, b) {
            return result;
        }
        if let Some(number) = obj.to_number() {
            return binary(op, &number, b);
        }
    }
    fallback(op, a, b)
}

fn arithmetic(op: BinOp, kind: NumKind, a: &Value, b: &Value) -> Result<Value, EvalError> {
    match kind {
        NumKind::F32 => Ok(Value::F32(float_arith(op, to_f64(a) as f32, to_f64(b) as f32))),
        NumKind::F64 => Ok(Value::F64(float_arith(op, to_f64(a), to_f64(b)))),
        NumKind::Decimal => {
            let (x, y) = to_decimal(a).zip(to_decimal(b)).ok_or_else(conversion_failed)?;
            Ok(match decimal_arith(op, x, y) {
                Some(n) => Value::Decimal(n),
                None => Value::F64(float_arith(op, to_f64(a), to_f64(b))),
            })
        }
        NumKind::BigInt => {
            let (x, y) = to_bigint(a).zip(to_bigint(b)).ok_or_else(conversion_failed)?;
            big_arith(op, x, y, a, b)
        }
        NumKind::Complex => complex_arith(op, to_complex(a), to_complex(b), a, b),
        int_kind => {
            let (x, y) = to_i128(a).zip(to_i128(b)).ok_or_else(conversion_failed)?;
            int_arith(op, int_kind, x, y, a, b)
        }
    }
}

fn int_arith(op: BinOp, kind: NumKind, x: i128, y: i128, a: &Value, b: &Value) -> Result<Value, EvalError> {
    let exact = match op {
        BinOp::Add => x.checked_add(y),
        BinOp::Sub => x.checked_sub(y),
        BinOp::Mul => x.checked_mul(y),
        BinOp::Div => return Ok(Value::F64(x as f64 / y as f64)),
        BinOp::FloorDiv => Some(floor_div(x, y)),
        BinOp::Mod => Some(floor_mod(x, y)),
        BinOp::Pow if y < 0 => return Ok(Value::F64((x as f64).powf(y as f64))),
        BinOp::Pow => u32::try_from(y).ok().and_then(|e| x.checked_pow(e)),
        _ => return Err(type_error(op.symbol(), a, b)),
    };
    match exact {
        Some(n) => Ok(fit_int(kind, n)),
        None => match big_arith(op, BigInt::from(x), BigInt::from(y), a, b)? {
            Value::BigInt(n) => Ok(fit_big(kind, (*n).clone())),
            other => Ok(other),
        },
    }
}

/// Largest string `str * n` may build, in bytes
pub const MAX_REPEAT_LEN: usize = 1 << 26;

fn repeat_text(s: &str, times: usize) -> Result<String, EvalError> {
    match s.len().checked_mul(times) {
        Some(len) if len <= MAX_REPEAT_LEN => Ok(s.repeat(times)),
        _ => Err(EvalError::Type(format!(
            "*: repeated string would exceed {MAX_REPEAT_LEN} bytes"
        ))),
    }
}

fn floor_div(x: i128, y: i128) -> i128 {
    let q = x / y;
    if x % y != 0 && ((x < 0) != (y < 0)) {
        q - 1
    } else {
        q
    }
}

fn floor_mod(x: i128, y: i128) -> i128 {
    let r = x % y;
    if r != 0 && ((r < 0) != (y < 0)) {
        r + y
    } else {
        r
    }
}

fn float_arith<F: Float>(op: BinOp, x: F, y: F) -> F {
    match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => x / y,
        BinOp::FloorDiv => (x / y).floor(),
        BinOp::Mod => {
            let r = x % y;
            if r != F::zero() && ((r < F::zero()) != (y < F::zero())) {
                r + y
            } else {
                r
            }
        }
        BinOp::Pow => x.powf(y),
        _ => F::nan(),
    }
}

/// `None` on overflow, and for powers, which are computed in `f64`
fn decimal_arith(op: BinOp, x: Decimal, y: Decimal) -> Option<Decimal> {
    match op {
        BinOp::Add => x.checked_add(y),
        BinOp::Sub => x.checked_sub(y),
        BinOp::Mul => x.checked_mul(y),
        BinOp::Div => x.checked_div(y),
        BinOp::FloorDiv => x.checked_div(y).map(|q| q.floor()),
        BinOp::Mod => x.checked_rem(y).map(|r| {
            if !r.is_zero() && (r.is_sign_negative() != y.is_sign_negative()) {
                r + y
            } else {
                r
            }
        }),
        _ => None,
    }
}

fn big_arith(op: BinOp, x: BigInt, y: BigInt, a: &Value, b: &Value) -> Result<Value, EvalError> {
    let big = |n: BigInt| Ok(Value::BigInt(Rc::new(n)));
    match op {
        BinOp::Add => big(x + y),
        BinOp::Sub => big(x - y),
        BinOp::Mul => big(x * y),
        BinOp::Div => Ok(Value::F64(
            x.to_f64().unwrap_or(f64::NAN) / y.to_f64().unwrap_or(f64::NAN),
        )),
        BinOp::FloorDiv => {
            let (q, r) = (&x / &y, &x % &y);
            if !r.is_zero() && (r.sign() == Sign::Minus) != (y.sign() == Sign::Minus) {
                big(q - 1)
            } else {
                big(q)
            }
        }
        BinOp::Mod => {
            let r = &x % &y;
            if !r.is_zero() && (r.sign() == Sign::Minus) != (y.sign() == Sign::Minus) {
                big(r + y)
            } else {
                big(r)
            }
        }
        BinOp::Pow if y.sign() == Sign::Minus => Ok(Value::F64(
            x.to_f64().unwrap_or(f64::NAN).powf(y.to_f64().unwrap_or(f64::NAN)),
        )),
        BinOp::Pow => match y.to_u32() {
            Some(e) => big(x.pow(e)),
            // 0, 1 and -1 stay small under any exponent
            None if x.is_zero() || x.is_one() => big(x),
            None if x == -BigInt::one() => big(if (&y % 2u8).is_zero() { BigInt::one() } else { x }),
            None => Err(EvalError::Type("**: exponent too large".to_string())),
        },
        _ => Err(type_error(op.symbol(), a, b)),
    }
}

fn complex_arith(op: BinOp, x: Complex, y: Complex, a: &Value, b: &Value) -> Result<Value, EvalError> {
    let result = match op {
        BinOp::Add => x.add(y),
        BinOp::Sub => x.sub(y),
        BinOp::Mul => x.mul(y),
        BinOp::Div => x.div(y),
        BinOp::Pow => x.pow(y),
        _ => return Err(type_error(op.symbol(), a, b)),
    };
    Ok(Value::Complex(result))
}

fn bitwise(op: BinOp, ka: NumKind, kb: NumKind, a: &Value, b: &Value) -> Result<Value, EvalError> {
    if let (Value::Bool(x), Value::Bool(y)) = (a, b) {
        return Ok(Value::Bool(match op {
            BinOp::BitAnd => x & y,
            BinOp::BitOr => x | y,
            _ => x ^ y,
        }));
    }
    if !ka.is_integral() || !kb.is_integral() {
        return Err(type_error(op.symbol(), a, b));
    }

    let apply_small = |x: i128, y: i128| match op {
        BinOp::BitAnd => x & y,
        BinOp::BitOr => x | y,
        _ => x ^ y,
    };
    if ka != NumKind::BigInt && kb != NumKind::BigInt {
        let (x, y) = to_i128(a).zip(to_i128(b)).ok_or_else(conversion_failed)?;
        return Ok(fit_int(widen(ka, kb), apply_small(x, y)));
    }

    let (x, y) = to_bigint(a).zip(to_bigint(b)).ok_or_else(conversion_failed)?;
    let n = match op {
        BinOp::BitAnd => x & y,
        BinOp::BitOr => x | y,
        _ => x ^ y,
    };
    Ok(fit_big(NumKind::BigInt, n))
}

/// The result keeps the left operand's kind, widening on overflow
fn shift(op: BinOp, ka: NumKind, kb: NumKind, a: &Value, b: &Value) -> Result<Value, EvalError> {
    if !ka.is_integral() || !kb.is_integral() {
        return Err(type_error(op.symbol(), a, b));
    }
    let count = to_bigint(b).ok_or_else(conversion_failed)?;
    if count.sign() == Sign::Minus {
        return Err(EvalError::Type(format!("{}: negative shift count", op.symbol())));
    }
    let count = count
        .to_usize()
        .filter(|&n| n <= 1 << 16)
        .ok_or_else(|| EvalError::Type(format!("{}: shift count too large", op.symbol())))?;

    let kind = if ka == NumKind::Bool { NumKind::I64 } else { ka };
    let x = to_bigint(a).ok_or_else(conversion_failed)?;
    let n = match op {
        BinOp::Shl => x << count,
        _ => x >> count,
    };
    Ok(fit_big(kind, n))
}

// ============================================================================
// Unary operators
// ============================================================================

pub fn unary(op: UnaryOp, value: &Value) -> Result<Value, EvalError> {
    if op == UnaryOp::Not {
        return Ok(Value::Bool(!value.is_truthy()));
    }
    if let Value::Object(obj) = value {
        if let Some(result) = obj.unary(op) {
            return result;
        }
        if let Some(number) = obj.to_number() {
            return unary(op, &number);
        }
    }

    let bad_operand = || {
        EvalError::Type(format!(
            "invalid operand type for unary {}: '{}'",
            op.symbol(),
            value.type_name()
        ))
    };
    let kind = NumKind::of(value).ok_or_else(bad_operand)?;
    let int_kind = if kind == NumKind::Bool { NumKind::I64 } else { kind };

    match (op, value) {
        (UnaryOp::Pos, Value::Bool(b)) => Ok(Value::I64(i64::from(*b))),
        (UnaryOp::Pos, _) => Ok(value.clone()),
        (UnaryOp::Neg, Value::F32(n)) => Ok(Value::F32(-n)),
        (UnaryOp::Neg, Value::F64(n)) => Ok(Value::F64(-n)),
        (UnaryOp::Neg, Value::Decimal(n)) => Ok(Value::Decimal(-n)),
        (UnaryOp::Neg, Value::BigInt(n)) => Ok(Value::BigInt(Rc::new(-(**n).clone()))),
        (UnaryOp::Neg, Value::Complex(c)) => Ok(Value::Complex(c.neg())),
        (UnaryOp::BitNot, Value::BigInt(n)) => Ok(Value::BigInt(Rc::new(-(**n).clone() - 1))),
        (UnaryOp::Neg | UnaryOp::BitNot, _) => {
            let n = to_i128(value).ok_or_else(bad_operand)?;
            Ok(fit_int(int_kind, if op == UnaryOp::Neg { -n } else { !n }))
        }
        (UnaryOp::Not, _) => Ok(Value::Bool(!value.is_truthy())),
    }
}

// ============================================================================
// Comparison
// ============================================================================

/// Three-way comparison: -1, 0 or 1.
///
/// Numbers order below strings and chars; null orders above both.
/// Anything else asks the right operand's reflected comparison (negated),
/// then the left operand's own.
pub fn compare(a: &Value, b: &Value) -> Result<i32, EvalError> {
    order(a, b, "<=>")
}

fn order(a: &Value, b: &Value, symbol: &str) -> Result<i32, EvalError> {
    if let (Some(ka), Some(kb)) = (NumKind::of(a), NumKind::of(b)) {
        return Ok(numeric_order(ka, kb, a, b) as i32);
    }

    match (a, b) {
        (Value::Null, Value::Null) => return Ok(0),
        (Value::Str(_) | Value::Char(_), Value::Str(_) | Value::Char(_)) => {
            return Ok(text_of(a).cmp(&text_of(b)) as i32);
        }
        (Value::Seq(x), Value::Seq(y)) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let c = order(left, right, symbol)?;
                if c != 0 {
                    return Ok(c);
                }
            }
            return Ok(x.len().cmp(&y.len()) as i32);
        }
        _ => {}
    }

    if let (Some(ra), Some(rb)) = (rank(a), rank(b)) {
        return Ok(ra.cmp(&rb) as i32);
    }

    if let Value::Object(obj) = b {
        if let Some(result) = obj.compare(a) {
            return result.map(|c| -c.signum());
        }
    }
    if let Value::Object(obj) = a {
        if let Some(result) = obj.compare(b) {
            return result.map(i32::signum);
        }
    }
    if let Value::Object(obj) = b {
        if let Some(number) = obj.to_number() {
            return order(a, &number, symbol);
        }
    }
    if let Value::Object(obj) = a {
        if let Some(number) = obj.to_number() {
            return order(&number, b, symbol);
        }
    }
    Err(type_error(symbol, a, b))
}

/// Tie-break ranks between numbers, text and null
fn rank(value: &Value) -> Option<u8> {
    match value {
        Value::Str(_) | Value::Char(_) => Some(1),
        Value::Null => Some(2),
        other => NumKind::of(other).map(|_| 0),
    }
}

fn text_of(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Str(s) => Cow::Borrowed(&**s),
        Value::Char(c) => Cow::Owned(c.to_string()),
        _ => Cow::Borrowed(""),
    }
}

fn numeric_order(ka: NumKind, kb: NumKind, a: &Value, b: &Value) -> Ordering {
    use NumKind::*;
    if ka == Complex || kb == Complex {
        let (x, y) = (to_complex(a), to_complex(b));
        return float_order(x.re, y.re).then(float_order(x.im, y.im));
    }
    if ka.is_float() || kb.is_float() {
        return float_order(to_f64(a), to_f64(b));
    }
    if ka == Decimal || kb == Decimal {
        return match to_decimal(a).zip(to_decimal(b)) {
            Some((x, y)) => x.cmp(&y),
            None => float_order(to_f64(a), to_f64(b)),
        };
    }
    if ka == BigInt || kb == BigInt {
        return to_bigint(a).cmp(&to_bigint(b));
    }
    to_i128(a).cmp(&to_i128(b))
}

/// NaN sorts above every other float and equal to itself
fn float_order(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// `===`: same scalar kind and value, or the same allocation
pub fn identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Seq(x), Value::Seq(y)) => Rc::ptr_eq(x, y),
        (Value::Map(x), Value::Map(y)) => Rc::ptr_eq(x, y),
        _ => a == b,
    }
}

/// `==`: identical, or three-way equal; incomparable kinds are unequal
pub fn equals(a: &Value, b: &Value) -> bool {
    identical(a, b) || order(a, b, "==").is_ok_and(|c| c == 0)
}

pub fn compare_op(op: CmpOp, a: &Value, b: &Value) -> Result<bool, EvalError> {
    Ok(match op {
        CmpOp::Is => identical(a, b),
        CmpOp::IsNot => !identical(a, b),
        CmpOp::Eq => equals(a, b),
        CmpOp::Ne => !equals(a, b),
        CmpOp::Lt => order(a, b, op.symbol())? < 0,
        CmpOp::Gt => order(a, b, op.symbol())? > 0,
        CmpOp::Le => order(a, b, op.symbol())? <= 0,
        CmpOp::Ge => order(a, b, op.symbol())? >= 0,
    })
}
