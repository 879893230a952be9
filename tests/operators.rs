//! Operator fidelity tests: evaluated results must match what the host
//! JavaScript engine produces for the same source, including coercion rules,
//! NaN behavior, and exact error message texts.

#![allow(clippy::expect_used, clippy::panic)]

use pretty_assertions::assert_eq;
use stepjs::{Error, Runtime, RuntimeValue, wrap};

fn eval(source: &str) -> RuntimeValue {
    Runtime::new().eval(source).expect("evaluation failed")
}

fn eval_err(source: &str) -> Error {
    match Runtime::new().eval(source) {
        Ok(value) => panic!("expected an error, got {value:?}"),
        Err(error) => error,
    }
}

fn assert_number(source: &str, expected: f64) {
    assert_eq!(eval(source), RuntimeValue::Number(expected), "{source}");
}

fn assert_string(source: &str, expected: &str) {
    assert_eq!(eval(source), wrap(expected), "{source}");
}

fn assert_bool(source: &str, expected: bool) {
    assert_eq!(eval(source), RuntimeValue::Boolean(expected), "{source}");
}

fn assert_nan(source: &str) {
    match eval(source) {
        RuntimeValue::Number(n) => assert!(n.is_nan(), "{source} expected NaN, got {n}"),
        other => panic!("{source} expected NaN, got {other:?}"),
    }
}

#[test]
fn test_addition_coercion() {
    assert_number("2 + 2", 4.0);
    assert_string("'2' + 2", "22");
    assert_string("2 + '2'", "22");
    assert_string("'hi' + 2", "hi2");
    assert_number("true + true", 2.0);
    assert_number("true + false", 1.0);
    assert_number("Infinity + 2", f64::INFINITY);
    assert_string("'hi' + true", "hitrue");
    assert_nan("NaN + 2");
}

#[test]
fn test_arithmetic_coercion() {
    assert_number("2 - '2'", 0.0);
    assert_number("'120' - '2'", 118.0);
    assert_number("'2' * '2'", 4.0);
    assert_number("120 / '2'", 60.0);
    assert_number("120 % 7", 1.0);
    assert_nan("'hi' * 2");
    assert_nan("Infinity - Infinity");
    assert_number("2 / 0", f64::INFINITY);
    assert_number("-2 / 0", f64::NEG_INFINITY);
}

#[test]
fn test_number_coercion_rejects_rust_float_spellings() {
    assert_number("'Infinity' * 1", f64::INFINITY);
    assert_number("'+Infinity' * 1", f64::INFINITY);
    assert_number("'-Infinity' * 1", f64::NEG_INFINITY);
    assert_nan("'inf' * 1");
    assert_nan("'infinity' * 1");
    assert_nan("'nan' * 1");
    assert_nan("'NaN' * 1");
    assert_number("' 12 ' * 1", 12.0);
    assert_number("'1e3' * 1", 1000.0);
}

#[test]
fn test_exponentiation() {
    assert_number("2 ** 10", 1024.0);
    assert_number("2 ** -1", 0.5);
    // Right-associative.
    assert_number("2 ** 3 ** 2", 512.0);
    assert_nan("2 ** NaN");
}

#[test]
fn test_abstract_vs_strict_equality() {
    assert_bool("2 == '2'", true);
    assert_bool("2 === '2'", false);
    assert_bool("2 != '2'", false);
    assert_bool("2 !== '2'", true);
    assert_bool("NaN == NaN", false);
    assert_bool("NaN === NaN", false);
    assert_bool("NaN !== NaN", true);
    assert_bool("true == 1", true);
    assert_bool("true === 1", false);
    assert_bool("null == undefined", true);
    assert_bool("null === undefined", false);
    assert_bool("'hi' == 'hi'", true);
    assert_bool("Infinity === Infinity", true);
}

#[test]
fn test_relational_comparison() {
    assert_bool("2 < 120", true);
    assert_bool("2 < '120'", true);
    // Two strings compare lexicographically: '2' > '120'.
    assert_bool("'2' < '120'", false);
    assert_bool("'2' < 'hi'", true);
    assert_bool("'hi' < 2", false);
    assert_bool("'hi' >= 2", false);
    assert_bool("NaN < 2", false);
    assert_bool("NaN >= 2", false);
    assert_bool("2 <= 2", true);
    assert_bool("Infinity > 120", true);
}

#[test]
fn test_string_comparison_uses_utf16_code_units() {
    // U+FF5F is one code unit (0xFF5F); U+10000 encodes as a surrogate pair
    // starting at 0xD800, so it sorts first despite its higher code point.
    assert_bool("'\u{10000}' < '\u{ff5f}'", true);
    assert_bool("'\u{ff5f}' < '\u{10000}'", false);
}

#[test]
fn test_bitwise_truncates_to_int32() {
    assert_number("120 & 2", 0.0);
    assert_number("120 | 2", 122.0);
    assert_number("120 ^ 2", 122.0);
    assert_number("'2' << 2", 8.0);
    assert_number("120 >> 2", 30.0);
    assert_number("-1 >>> 0", 4294967295.0);
    assert_number("NaN | 0", 0.0);
    assert_number("Infinity | 0", 0.0);
    assert_number("true | false", 1.0);
    assert_number("2.9 | 0", 2.0);
    assert_number("~2", -3.0);
}

#[test]
fn test_unary_operators() {
    assert_number("-'2'", -2.0);
    assert_number("+true", 1.0);
    assert_nan("+'hi'");
    assert_bool("!false", true);
    assert_bool("!'hi'", false);
    assert_string("typeof 2", "number");
    assert_string("typeof 'hi'", "string");
    assert_string("typeof true", "boolean");
    assert_string("typeof undefined", "undefined");
    assert_string("typeof null", "object");
    assert_string("typeof NaN", "number");
    assert_string("typeof {}", "object");
    assert_string("typeof (() => 1)", "function");
    assert_eq!(eval("void 2"), RuntimeValue::Undefined);
}

#[test]
fn test_typeof_undeclared_name() {
    assert_string("typeof nowhere", "undefined");
}

#[test]
fn test_short_circuit() {
    assert_number("let a = 0; false && (a = 1); a", 0.0);
    assert_number("let a = 0; true || (a = 1); a", 0.0);
    assert_number("let a = 0; true && (a = 1); a", 1.0);
    assert_bool("false || true", true);
    assert_number("null ?? 2", 2.0);
    assert_number("0 ?? 2", 0.0);
    assert_string("undefined ?? 'hi'", "hi");
}

#[test]
fn test_comma_operator() {
    assert_number("let a = (1, 2, 3); a", 3.0);
    assert_number("let a = 0; let b = ((a = 5), 7); a + b", 12.0);
}

#[test]
fn test_compound_assignment() {
    assert_string("let a = 2; a += '2'; a", "22");
    assert_number("let a = 5; a %= 2; a", 1.0);
    assert_number("let a = 3; a **= 2; a", 9.0);
    assert_number("let a = 2; a <<= 3; a", 16.0);
    assert_number("let a = 120; a &= 2; a", 0.0);
}

#[test]
fn test_update_expressions() {
    assert_number("let a = 2; a++; a", 3.0);
    assert_number("let a = 2; a++", 2.0);
    assert_number("let a = 2; ++a", 3.0);
    assert_number("let a = 2; --a + a--", 2.0);
    assert_number("let o = { n: 2 }; o.n++; o.n", 3.0);
}

#[test]
fn test_in_operator() {
    assert_bool("'a' in { a: 1 }", true);
    assert_bool("'b' in { a: 1 }", false);
    assert_bool("0 in [7]", true);
    match eval_err("'hi' in true") {
        Error::Type { message } => assert_eq!(
            message,
            "Cannot use 'in' operator to search for 'hi' in true"
        ),
        other => panic!("expected TypeError, got {other:?}"),
    }
}

#[test]
fn test_instanceof_operator() {
    assert_bool("class A {} new A() instanceof A", true);
    assert_bool("class A {} class B extends A {} new B() instanceof A", true);
    assert_bool("class A {} class B {} new B() instanceof A", false);
    match eval_err("2 instanceof 2") {
        Error::Type { message } => {
            assert_eq!(message, "Right-hand side of 'instanceof' is not callable");
        }
        other => panic!("expected TypeError, got {other:?}"),
    }
}

#[test]
fn test_calling_a_non_function() {
    match eval_err("let a = 2; a();") {
        Error::Type { message } => assert_eq!(message, "a is not a function"),
        other => panic!("expected TypeError, got {other:?}"),
    }
    match eval_err("let o = {}; o.missing();") {
        Error::Type { message } => assert_eq!(message, "o.missing is not a function"),
        other => panic!("expected TypeError, got {other:?}"),
    }
}

#[test]
fn test_member_access_on_nullish() {
    match eval_err("undefined.x") {
        Error::Type { message } => {
            assert_eq!(message, "Cannot read properties of undefined (reading 'x')");
        }
        other => panic!("expected TypeError, got {other:?}"),
    }
    match eval_err("null.x") {
        Error::Type { message } => {
            assert_eq!(message, "Cannot read properties of null (reading 'x')");
        }
        other => panic!("expected TypeError, got {other:?}"),
    }
}

#[test]
fn test_undeclared_read_is_a_reference_error() {
    match eval_err("b") {
        Error::Reference { message } => assert_eq!(message, "b is not defined"),
        other => panic!("expected ReferenceError, got {other:?}"),
    }
}

#[test]
fn test_wrapping_is_idempotent() {
    let once = wrap(2.0);
    let twice = wrap(wrap(2.0));
    assert_eq!(once, twice);
    assert_eq!(wrap(wrap("hi")), wrap("hi"));
    assert_eq!(wrap(wrap(true)), wrap(true));
}
