//! Operator semantics: pure functions reproducing the guest language's
//! coercion rules.
//!
//! Nothing in here touches interpreter state. Short-circuiting operators
//! (`&&`, `||`, `??`), `typeof` on unresolved names, and `delete` need
//! evaluation order or store access and live in the evaluator instead.

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::Error;
use crate::value::{JsString, PropertyKey, RuntimeValue};

/// ToInt32: truncate, wrap modulo 2^32, reinterpret as signed.
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ToUint32.
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let m = n.trunc() % 4_294_967_296.0;
    let m = if m < 0.0 { m + 4_294_967_296.0 } else { m };
    m as u32
}

fn number(n: f64) -> RuntimeValue {
    RuntimeValue::Number(n)
}

fn boolean(b: bool) -> RuntimeValue {
    RuntimeValue::Boolean(b)
}

/// Apply a binary operator. Both operands are already evaluated; the caller
/// handles short-circuit forms before reaching here.
pub fn binary(
    op: BinaryOp,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<RuntimeValue, Error> {
    Ok(match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => number(left.to_number() - right.to_number()),
        BinaryOp::Mul => number(left.to_number() * right.to_number()),
        BinaryOp::Div => number(left.to_number() / right.to_number()),
        BinaryOp::Mod => number(left.to_number() % right.to_number()),
        BinaryOp::Exp => number(left.to_number().powf(right.to_number())),
        BinaryOp::Eq => boolean(abstract_equals(left, right)),
        BinaryOp::NotEq => boolean(!abstract_equals(left, right)),
        BinaryOp::StrictEq => boolean(left.strict_equals(right)),
        BinaryOp::StrictNotEq => boolean(!left.strict_equals(right)),
        BinaryOp::Lt => relational(left, right, |o| o == std::cmp::Ordering::Less),
        BinaryOp::LtEq => relational(left, right, |o| o != std::cmp::Ordering::Greater),
        BinaryOp::Gt => relational(left, right, |o| o == std::cmp::Ordering::Greater),
        BinaryOp::GtEq => relational(left, right, |o| o != std::cmp::Ordering::Less),
        BinaryOp::Shl => number(f64::from(to_int32(left.to_number()) << (to_uint32(right.to_number()) & 31))),
        BinaryOp::Shr => number(f64::from(to_int32(left.to_number()) >> (to_uint32(right.to_number()) & 31))),
        BinaryOp::UShr => number(f64::from(to_uint32(left.to_number()) >> (to_uint32(right.to_number()) & 31))),
        BinaryOp::BitAnd => number(f64::from(to_int32(left.to_number()) & to_int32(right.to_number()))),
        BinaryOp::BitOr => number(f64::from(to_int32(left.to_number()) | to_int32(right.to_number()))),
        BinaryOp::BitXor => number(f64::from(to_int32(left.to_number()) ^ to_int32(right.to_number()))),
        BinaryOp::In => return has_in(left, right),
        BinaryOp::Instanceof => return instance_of(left, right),
    })
}

/// Apply a value-level unary operator. `typeof`, `void` and `delete` are
/// handled by the evaluator.
pub fn unary(op: UnaryOp, value: &RuntimeValue) -> RuntimeValue {
    match op {
        UnaryOp::Minus => number(-value.to_number()),
        UnaryOp::Plus => number(value.to_number()),
        UnaryOp::Not => boolean(!value.to_boolean()),
        UnaryOp::BitNot => number(f64::from(!to_int32(value.to_number()))),
        UnaryOp::Typeof => RuntimeValue::String(JsString::from(value.type_of())),
        UnaryOp::Void => RuntimeValue::Undefined,
        UnaryOp::Delete => boolean(true),
    }
}

/// `+`: string concatenation when either side is (or coerces to) a string,
/// numeric addition otherwise. Objects coerce through their string primitive.
fn add(left: &RuntimeValue, right: &RuntimeValue) -> RuntimeValue {
    let stringy = |v: &RuntimeValue| {
        matches!(
            v,
            RuntimeValue::String(_) | RuntimeValue::Object(_) | RuntimeValue::Function(_)
        )
    };
    if stringy(left) || stringy(right) {
        let mut out = String::with_capacity(16);
        out.push_str(&left.to_js_string());
        out.push_str(&right.to_js_string());
        RuntimeValue::String(JsString::from(out))
    } else {
        number(left.to_number() + right.to_number())
    }
}

/// Abstract equality (`==`).
fn abstract_equals(left: &RuntimeValue, right: &RuntimeValue) -> bool {
    use RuntimeValue::*;
    match (left, right) {
        (Undefined | Null, Undefined | Null) => true,
        (Number(_), Number(_))
        | (String(_), String(_))
        | (Boolean(_), Boolean(_))
        | (Object(_), Object(_))
        | (Function(_), Function(_)) => left.strict_equals(right),
        (Number(n), String(s)) | (String(s), Number(n)) => {
            let other = crate::value::string_to_number(s);
            !n.is_nan() && !other.is_nan() && *n == other
        }
        (Boolean(_), _) => abstract_equals(&number(left.to_number()), right),
        (_, Boolean(_)) => abstract_equals(left, &number(right.to_number())),
        (Object(_) | Function(_), Number(_) | String(_)) => {
            abstract_equals(&RuntimeValue::String(left.to_js_string()), right)
        }
        (Number(_) | String(_), Object(_) | Function(_)) => {
            abstract_equals(left, &RuntimeValue::String(right.to_js_string()))
        }
        _ => false,
    }
}

/// Relational comparison: lexicographic when both sides are strings, numeric
/// otherwise. Any NaN operand compares false.
fn relational(
    left: &RuntimeValue,
    right: &RuntimeValue,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> RuntimeValue {
    if let (RuntimeValue::String(l), RuntimeValue::String(r)) = (left, right) {
        // Host string order is by UTF-16 code unit, not by byte.
        return boolean(accept(l.encode_utf16().cmp(r.encode_utf16())));
    }
    let (l, r) = (left.to_number(), right.to_number());
    match l.partial_cmp(&r) {
        Some(ordering) => boolean(accept(ordering)),
        None => boolean(false),
    }
}

fn has_in(left: &RuntimeValue, right: &RuntimeValue) -> Result<RuntimeValue, Error> {
    let RuntimeValue::Object(obj) = right else {
        return Err(Error::type_error(format!(
            "Cannot use 'in' operator to search for '{}' in {}",
            left.to_js_string(),
            right.to_js_string()
        )));
    };
    let key = PropertyKey::from_value(left);
    Ok(boolean(obj.read().has_property(&key)))
}

fn instance_of(left: &RuntimeValue, right: &RuntimeValue) -> Result<RuntimeValue, Error> {
    let class = match right {
        RuntimeValue::Function(func) => func.as_class(),
        _ => None,
    };
    if !right.is_callable() {
        return Err(Error::type_error(
            "Right-hand side of 'instanceof' is not callable",
        ));
    }
    let Some(class) = class else {
        // A plain-function right-hand side is callable but our instances do
        // not track their constructor, so nothing matches it.
        return Ok(boolean(false));
    };
    let RuntimeValue::Object(obj) = left else {
        return Ok(boolean(false));
    };
    let instance_class = obj.read().class.clone();
    Ok(boolean(match instance_class {
        Some(c) => c.derives_from(class),
        None => false,
    }))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)]

    use super::*;
    use crate::value::wrap;

    fn bin(op: BinaryOp, l: impl Into<RuntimeValue>, r: impl Into<RuntimeValue>) -> RuntimeValue {
        match binary(op, &l.into(), &r.into()) {
            Ok(v) => v,
            Err(e) => RuntimeValue::String(JsString::from(e.to_string())),
        }
    }

    #[test]
    fn addition_coerces_like_the_host() {
        assert_eq!(bin(BinaryOp::Add, 2.0, 120.0), wrap(122.0));
        assert_eq!(bin(BinaryOp::Add, "2", 2.0), wrap("22"));
        assert_eq!(bin(BinaryOp::Add, 2.0, "hi"), wrap("2hi"));
        assert_eq!(bin(BinaryOp::Add, true, true), wrap(2.0));
        assert!(matches!(
            bin(BinaryOp::Add, f64::NAN, 1.0),
            RuntimeValue::Number(n) if n.is_nan()
        ));
        assert_eq!(bin(BinaryOp::Add, f64::INFINITY, 1.0), wrap(f64::INFINITY));
    }

    #[test]
    fn subtraction_coerces_strings() {
        assert_eq!(bin(BinaryOp::Sub, "2", 1.0), wrap(1.0));
        assert!(matches!(
            bin(BinaryOp::Sub, "hi", 1.0),
            RuntimeValue::Number(n) if n.is_nan()
        ));
    }

    #[test]
    fn abstract_vs_strict_equality() {
        assert_eq!(bin(BinaryOp::Eq, 2.0, "2"), wrap(true));
        assert_eq!(bin(BinaryOp::StrictEq, 2.0, "2"), wrap(false));
        assert_eq!(bin(BinaryOp::Eq, f64::NAN, f64::NAN), wrap(false));
        assert_eq!(bin(BinaryOp::StrictEq, f64::NAN, f64::NAN), wrap(false));
        assert_eq!(bin(BinaryOp::Eq, true, 1.0), wrap(true));
        assert_eq!(bin(BinaryOp::Eq, false, "0"), wrap(true));
        assert_eq!(
            binary(BinaryOp::Eq, &RuntimeValue::Null, &RuntimeValue::Undefined).ok(),
            Some(wrap(true))
        );
        assert_eq!(
            binary(BinaryOp::StrictEq, &RuntimeValue::Null, &RuntimeValue::Undefined).ok(),
            Some(wrap(false))
        );
    }

    #[test]
    fn relational_comparison() {
        assert_eq!(bin(BinaryOp::Lt, 2.0, 120.0), wrap(true));
        assert_eq!(bin(BinaryOp::Lt, "a", "b"), wrap(true));
        assert_eq!(bin(BinaryOp::Lt, "120", "2"), wrap(true)); // lexicographic
        assert_eq!(bin(BinaryOp::Lt, f64::NAN, 1.0), wrap(false));
        assert_eq!(bin(BinaryOp::GtEq, f64::NAN, f64::NAN), wrap(false));
        assert_eq!(bin(BinaryOp::LtEq, 2.0, "2"), wrap(true));
    }

    #[test]
    fn bitwise_truncates_to_int32() {
        assert_eq!(bin(BinaryOp::BitOr, 2.5, 0.0), wrap(2.0));
        assert_eq!(bin(BinaryOp::BitAnd, -1.0, 0xff as f64), wrap(255.0));
        assert_eq!(bin(BinaryOp::Shl, 1.0, 33.0), wrap(2.0)); // shift masked to 5 bits
        assert_eq!(bin(BinaryOp::UShr, -1.0, 0.0), wrap(4294967295.0));
        assert_eq!(bin(BinaryOp::BitXor, f64::NAN, 0.0), wrap(0.0));
        assert_eq!(bin(BinaryOp::BitOr, f64::INFINITY, 0.0), wrap(0.0));
    }

    #[test]
    fn exponentiation() {
        assert_eq!(bin(BinaryOp::Exp, 2.0, 120.0), wrap(2f64.powf(120.0)));
        assert_eq!(bin(BinaryOp::Exp, 2.0, "2"), wrap(4.0));
    }

    #[test]
    fn in_requires_an_object() {
        let err = binary(BinaryOp::In, &wrap("a"), &wrap("hi"));
        match err {
            Err(Error::Type { message }) => {
                assert_eq!(message, "Cannot use 'in' operator to search for 'a' in hi");
            }
            other => panic!("expected a TypeError, got {other:?}"),
        }
    }

    #[test]
    fn instanceof_requires_a_callable() {
        let err = binary(BinaryOp::Instanceof, &wrap(1.0), &wrap(2.0));
        match err {
            Err(Error::Type { message }) => {
                assert_eq!(message, "Right-hand side of 'instanceof' is not callable");
            }
            other => panic!("expected a TypeError, got {other:?}"),
        }
    }

    #[test]
    fn unary_operators() {
        assert_eq!(unary(UnaryOp::Minus, &wrap("2")), wrap(-2.0));
        assert_eq!(unary(UnaryOp::Not, &wrap(0.0)), wrap(true));
        assert_eq!(unary(UnaryOp::BitNot, &wrap(0.0)), wrap(-1.0));
        assert_eq!(unary(UnaryOp::Typeof, &wrap(1.0)), wrap("number"));
        assert_eq!(unary(UnaryOp::Void, &wrap(1.0)), RuntimeValue::Undefined);
    }

    #[test]
    fn int32_conversion() {
        assert_eq!(to_int32(0.0), 0);
        assert_eq!(to_int32(-1.5), -1);
        assert_eq!(to_int32(4294967296.0), 0);
        assert_eq!(to_int32(2147483648.0), -2147483648);
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(to_uint32(-1.0), 4294967295);
    }
}
