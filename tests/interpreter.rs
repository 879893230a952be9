//! End-to-end evaluation tests through the public `Runtime` API.

#![allow(clippy::expect_used, clippy::panic)]

use pretty_assertions::assert_eq;
use stepjs::{Config, Error, Runtime, RuntimeValue, wrap};

fn eval(source: &str) -> RuntimeValue {
    Runtime::new().eval(source).expect("evaluation failed")
}

fn eval_err(source: &str) -> Error {
    match Runtime::new().eval(source) {
        Ok(value) => panic!("expected an error, got {value:?}"),
        Err(error) => error,
    }
}

// ---- control flow ----

#[test]
fn test_continue_skips_rest_of_iteration() {
    let source = "let b=0; for(let a=1;a<=2;a++){b=b+a; continue; b+=2} b;";
    assert_eq!(eval(source), wrap(3.0));
}

#[test]
fn test_break_only_exits_its_own_loop() {
    let source = "let b=0; for(let a=1;a<=2;a++){for(let i=1;i<10;i++){break;b++;} b=b+a;} b;";
    assert_eq!(eval(source), wrap(3.0));
}

#[test]
fn test_while_and_do_while() {
    assert_eq!(eval("let i = 0; while (i < 3) { i++ } i"), wrap(3.0));
    assert_eq!(eval("let i = 0; do { i++ } while (i < 3); i"), wrap(3.0));
    // A do-while body runs at least once.
    assert_eq!(eval("let i = 9; do { i++ } while (false); i"), wrap(10.0));
}

#[test]
fn test_for_of_over_arrays_and_strings() {
    assert_eq!(
        eval("let s = 0; for (const n of [1, 2, 3]) { s = s + n } s"),
        wrap(6.0)
    );
    assert_eq!(
        eval("let s = ''; for (const c of 'abc') { s = s + c } s"),
        wrap("abc")
    );
}

#[test]
fn test_for_in_visits_keys_in_insertion_order() {
    assert_eq!(
        eval("let k = ''; for (const key in { a: 1, b: 2 }) { k = k + key } k"),
        wrap("ab")
    );
}

#[test]
fn test_if_else_chains() {
    assert_eq!(
        eval("let a = 5; let r; if (a < 3) { r = 'lo' } else if (a < 10) { r = 'mid' } else { r = 'hi' } r"),
        wrap("mid")
    );
}

// ---- hoisting ----

#[test]
fn test_function_declarations_are_hoisted() {
    assert_eq!(eval("a.foo = 'bar'; function a(){}; a.foo;"), wrap("bar"));
}

#[test]
fn test_function_callable_before_its_position() {
    assert_eq!(eval("let r = twice(21); function twice(n){ return n * 2 } r"), wrap(42.0));
}

#[test]
fn test_var_reads_undefined_before_initialization() {
    assert_eq!(eval("let r = typeof v; var v = 1; r"), wrap("undefined"));
}

#[test]
fn test_var_is_function_scoped() {
    assert_eq!(
        eval("function f() { if (true) { var x = 5; } return x; } f()"),
        wrap(5.0)
    );
}

// ---- closures and this ----

#[test]
fn test_arrow_captures_object_literal_this() {
    let source = "let a = { a: () => {return this.b}, b: 44 }; const b = a.a; a.a() + b();";
    assert_eq!(eval(source), wrap(88.0));
}

#[test]
fn test_closure_counter() {
    let source = "function counter(){ let n = 0; return () => { n = n + 1; return n } } \
                  const c = counter(); c(); c(); c()";
    assert_eq!(eval(source), wrap(3.0));
}

#[test]
fn test_recursion() {
    assert_eq!(
        eval("function fact(n){ if (n <= 1) { return 1 } return n * fact(n - 1) } fact(5)"),
        wrap(120.0)
    );
}

#[test]
fn test_method_this_is_the_receiver() {
    assert_eq!(
        eval("let o = { n: 7, get_n: function(){ return this.n } }; o.get_n()"),
        wrap(7.0)
    );
}

#[test]
fn test_arguments_object() {
    assert_eq!(
        eval("function f(){ return arguments.length + arguments[0] } f(10, 2)"),
        wrap(12.0)
    );
}

#[test]
fn test_arrows_have_no_own_arguments() {
    assert_eq!(
        eval("function f(){ const g = () => arguments[0]; return g(9) } f(1)"),
        wrap(1.0)
    );
    // Nested arrows still see the enclosing function's arguments.
    assert_eq!(
        eval("function f(){ return (() => () => arguments.length)()() } f(1, 2)"),
        wrap(2.0)
    );
}

#[test]
fn test_default_parameters() {
    assert_eq!(eval("function f(a, b = a + 1){ return b } f(2)"), wrap(3.0));
    assert_eq!(eval("function f(a, b = 9){ return b } f(1, 2)"), wrap(2.0));
}

// ---- classes ----

#[test]
fn test_class_inheritance() {
    let source = "class A {a(){return \"AA\"}} class B extends A {b(){return \"BB\"}} \
                  let b=new B(); b.a()+b.b();";
    assert_eq!(eval(source), wrap("AABB"));
}

#[test]
fn test_constructor_and_super() {
    let source = "class A { constructor(x){ this.x = x } } \
                  class B extends A { constructor(){ super(5); this.y = 1 } } \
                  let b = new B(); b.x + b.y";
    assert_eq!(eval(source), wrap(6.0));
}

#[test]
fn test_method_override_wins() {
    let source = "class A { who(){ return 'A' } } class B extends A { who(){ return 'B' } } \
                  new B().who()";
    assert_eq!(eval(source), wrap("B"));
}

#[test]
fn test_static_methods() {
    assert_eq!(eval("class A { static s(){ return 7 } } A.s()"), wrap(7.0));
    // Statics are inherited through the parent chain.
    assert_eq!(
        eval("class A { static s(){ return 7 } } class B extends A {} B.s()"),
        wrap(7.0)
    );
}

#[test]
fn test_static_method_named_name_shadows_the_intrinsic() {
    assert_eq!(
        eval("class A { static name(){ return 'x' } } A.name()"),
        wrap("x")
    );
    // Without such a method, `name` is still the declared name.
    assert_eq!(eval("class A {} A.name"), wrap("A"));
}

#[test]
fn test_class_without_new_is_a_type_error() {
    match eval_err("class A {} A()") {
        Error::Type { message } => {
            assert_eq!(message, "Class constructor A cannot be invoked without 'new'");
        }
        other => panic!("expected TypeError, got {other:?}"),
    }
}

// ---- object model ----

#[test]
fn test_getters_and_setters() {
    let source = "let o = { get v(){ return this.raw * 2 }, set v(x){ this.raw = x } }; \
                  o.v = 21; o.v";
    assert_eq!(eval(source), wrap(42.0));
}

#[test]
fn test_computed_members_and_keys() {
    assert_eq!(eval("let k = 'a'; let o = { [k]: 5 }; o['a']"), wrap(5.0));
    assert_eq!(eval("let o = { x: 1 }; o['x'] = 2; o.x"), wrap(2.0));
}

#[test]
fn test_array_length_and_indexing() {
    assert_eq!(eval("let xs = [1, 2, 3]; xs.length"), wrap(3.0));
    assert_eq!(eval("let xs = [1, 2, 3]; xs[1] = 9; xs[1]"), wrap(9.0));
    assert_eq!(eval("[1, 2, 3][4]"), RuntimeValue::Undefined);
}

#[test]
fn test_string_length_and_indexing() {
    assert_eq!(eval("'hello'.length"), wrap(5.0));
    assert_eq!(eval("'hello'[1]"), wrap("e"));
}

#[test]
fn test_delete_removes_a_property() {
    assert_eq!(eval("let o = { a: 1 }; delete o.a; 'a' in o"), wrap(false));
}

#[test]
fn test_spread_in_arrays_and_calls() {
    assert_eq!(
        eval("function add(a, b, c){ return a + b + c } add(...[1, 2, 3])"),
        wrap(6.0)
    );
    assert_eq!(eval("let xs = [1, 2]; [0, ...xs].length"), wrap(3.0));
}

#[test]
fn test_new_with_a_plain_function() {
    assert_eq!(eval("function P(x){ this.x = x } new P(4).x"), wrap(4.0));
    // An explicit returned object overrides the allocated instance.
    assert_eq!(eval("function P(){ return { x: 9 } } new P().x"), wrap(9.0));
    // An explicit primitive return does not.
    assert_eq!(eval("function P(){ this.x = 1; return 5 } new P().x"), wrap(1.0));
}

// ---- destructuring ----

#[test]
fn test_array_destructuring_with_holes_and_defaults() {
    assert_eq!(eval("let [a, , b = 10] = [1, 2]; a + b"), wrap(11.0));
    assert_eq!(eval("let [x, y] = 'hi'; x + y"), wrap("hi"));
}

#[test]
fn test_object_destructuring() {
    assert_eq!(eval("let { a, b: c = 5 } = { a: 1 }; a + c"), wrap(6.0));
    assert_eq!(eval("let { a: { b } } = { a: { b: 2 } }; b"), wrap(2.0));
}

#[test]
fn test_rest_patterns_are_unsupported() {
    assert!(matches!(
        eval_err("let [...xs] = [1, 2];"),
        Error::Unsupported { .. }
    ));
}

// ---- scoping and bindings ----

#[test]
fn test_let_shadows_in_blocks() {
    assert_eq!(eval("let a = 1; { let a = 2; } a"), wrap(1.0));
}

#[test]
fn test_tdz_reference_error() {
    match eval_err("a; let a = 1;") {
        Error::Reference { message } => {
            assert_eq!(message, "Cannot access 'a' before initialization");
        }
        other => panic!("expected ReferenceError, got {other:?}"),
    }
}

#[test]
fn test_const_reassignment_is_a_type_error() {
    match eval_err("const a = 1; a = 2;") {
        Error::Type { message } => assert_eq!(message, "Assignment to constant variable."),
        other => panic!("expected TypeError, got {other:?}"),
    }
}

#[test]
fn test_unresolved_writes_auto_vivify_globals() {
    let mut runtime = Runtime::new();
    assert_eq!(runtime.eval("x = 5; x * 2").expect("eval"), wrap(10.0));
    assert_eq!(runtime.get_global("x"), Some(wrap(5.0)));
}

#[test]
fn test_host_globals_are_visible() {
    let mut runtime = Runtime::new();
    runtime.set_global("answer", 42.0);
    assert_eq!(runtime.eval("answer + 1").expect("eval"), wrap(43.0));
}

// ---- exceptions ----

#[test]
fn test_try_catch_finally() {
    assert_eq!(
        eval("let r = 0; try { throw 5 } catch (e) { r = e } finally { r = r + 1 } r"),
        wrap(6.0)
    );
}

#[test]
fn test_finally_overrides_return() {
    assert_eq!(
        eval("function f(){ try { return 1 } finally { return 2 } } f()"),
        wrap(2.0)
    );
}

#[test]
fn test_catch_without_a_binding() {
    assert_eq!(eval("let r = 0; try { throw 1 } catch { r = 9 } r"), wrap(9.0));
}

#[test]
fn test_uncaught_throw_surfaces_unmodified() {
    match eval_err("throw 'boom'") {
        Error::Thrown { value } => assert_eq!(value, wrap("boom")),
        other => panic!("expected a guest throw, got {other:?}"),
    }
}

#[test]
fn test_rethrow_from_catch() {
    match eval_err("try { throw 1 } catch (e) { throw e + 1 }") {
        Error::Thrown { value } => assert_eq!(value, wrap(2.0)),
        other => panic!("expected a guest throw, got {other:?}"),
    }
}

// ---- unsupported syntax policy ----

#[test]
fn test_unsupported_nodes_are_fatal_by_default() {
    assert!(matches!(
        eval_err("switch (1) { default: }"),
        Error::Unsupported { .. }
    ));
}

#[test]
fn test_skip_unsupported_nodes_downgrades_to_a_no_op() {
    let mut runtime = Runtime::with_config(Config {
        skip_unsupported_nodes: true,
    });
    assert_eq!(
        runtime.eval("switch (1) { default: } 42").expect("eval"),
        wrap(42.0)
    );
}
