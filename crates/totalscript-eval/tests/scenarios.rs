//! End-to-end program scenarios: lex, parse, evaluate, assert on the
//! resulting value.

use totalscript_eval::{Interpreter, ModuleResolver};
use totalscript_object::{Environment, Value};

struct NoImports;

impl ModuleResolver for NoImports {
    fn resolve(&self, _importer_file: &str, path: &str) -> Value {
        Value::error(format!("no module available: {path}"))
    }
}

fn run(source: &str) -> Value {
    let (program, errors) = totalscript_parser::parse(source);
    assert!(errors.is_empty(), "parse errors: {errors:?}");
    let resolver = NoImports;
    let interp = Interpreter::new(&resolver);
    let env = Environment::root("scenario.tsl");
    interp.eval_program(&program, &env)
}

#[test]
fn range_for_in_accumulates_sum() {
    let result = run("var sum = 0; for i in 0..=5 { sum = sum + i } sum");
    assert_eq!(result, Value::Integer(15));
}

#[test]
fn open_ended_range_is_rejected_as_a_standalone_value() {
    let Value::Error(msg) = run("..5") else { panic!("expected error") };
    assert!(msg.contains("open-ended range requires both bounds"));

    let Value::Error(msg) = run("5..") else { panic!("expected error") };
    assert!(msg.contains("open-ended range requires both bounds"));
}

#[test]
fn model_method_computes_distance() {
    let source = r#"
        const Point = model {
            x: float;
            y: float;
            distance = function() { (this.x**2 + this.y**2) ** 0.5 }
        };
        var p = Point(3.0, 4.0);
        p.distance()
    "#;
    assert_eq!(run(source), Value::Float(5.0));
}

#[test]
fn annotated_var_rejects_mismatched_type() {
    let result = run(r#"var x: integer = "hello""#);
    let Value::Error(msg) = result else { panic!("expected error, got {result:?}") };
    assert!(msg.contains("type mismatch: expected integer, got string"));
}

#[test]
fn inclusive_range_slices_array() {
    let result = run("var a = [1,2,3,4,5]; a[1..=3]");
    assert_eq!(result, Value::array(vec![Value::Integer(2), Value::Integer(3), Value::Integer(4)]));
}

#[test]
fn enum_values_compare_equal_and_match_is_check() {
    let source = r#"
        const Status = enum { OK = 200; NotFound = 404 };
        Status.OK == Status.OK
    "#;
    assert_eq!(run(source), Value::Boolean(true));

    let source_is = r#"
        const Status = enum { OK = 200; NotFound = 404 };
        Status.OK is Status
    "#;
    assert_eq!(run(source_is), Value::Boolean(true));
}

#[test]
fn generic_array_element_mismatch_names_the_index() {
    let result = run(r#"var arr: array<integer | string> = [1, "two", true]"#);
    let Value::Error(msg) = result else { panic!("expected error, got {result:?}") };
    assert!(msg.contains("array element 2: type mismatch: expected integer | string, got boolean"));
}

#[test]
fn closures_capture_their_defining_environment() {
    let source = "var make = function(x) { function(y) { x + y } }; var f = make(2); f(3)";
    assert_eq!(run(source), Value::Integer(5));
}

#[test]
fn scope_write_through_mutates_outer_binding() {
    let result = run("var x = 0; if true { x = 5 } x");
    assert_eq!(result, Value::Integer(5));
}

#[test]
fn negative_index_and_out_of_range_on_arrays() {
    assert_eq!(run("var a = [1,2,3]; a[-1]"), Value::Integer(3));
    assert_eq!(run("var a = [1,2,3]; a[10]"), Value::Null);
}

#[test]
fn map_missing_key_is_null() {
    assert_eq!(run(r#"var m = {a: 1}; m["missing-key"]"#), Value::Null);
}

#[test]
fn division_by_zero_is_an_error() {
    let Value::Error(msg) = run("5 / 0") else { panic!("expected error") };
    assert_eq!(msg, "division by zero");
    let Value::Error(msg) = run("5 // 0") else { panic!("expected error") };
    assert_eq!(msg, "division by zero");
}

#[test]
fn integer_power_zero_is_one() {
    assert_eq!(run("2 ** 0"), Value::Integer(1));
}

#[test]
fn switch_falls_back_to_default() {
    let source = r#"
        var x = 3;
        switch (x) {
            case 1: "one"
            case 2: "two"
            default: "other"
        }
    "#;
    assert_eq!(run(source), Value::string("other"));
}

#[test]
fn model_default_constructor_validates_field_types() {
    let source = r#"
        const Pair = model { a: integer; b: integer };
        Pair(1, "x")
    "#;
    let Value::Error(msg) = run(source) else { panic!("expected error") };
    assert!(msg.contains("type mismatch"));
}

#[test]
fn array_builtin_methods_chain() {
    let source = "var a = [1,2,3]; a.push(4); a.length()";
    assert_eq!(run(source), Value::Integer(4));
}
