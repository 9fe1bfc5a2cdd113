//! Type validator: `validate(value, type-expr, env)` and `coerce(value,
//! type-expr)`, invoked by the evaluator at every type boundary — variable
//! declaration, reassignment, argument binding, container construction,
//! and model field mutation.

use std::rc::Rc;

use indexmap::IndexMap;
use totalscript_parser::ast::TypeExpr;
use totalscript_object::{Environment, Value};

/// `Ok(true)`/`Ok(false)` is a definite validation verdict; `Err` means the
/// type expression names something the validator cannot resolve at all
/// ("unknown type"), which is itself an error distinct from a mismatch.
pub fn validate(value: &Value, t: &TypeExpr, env: &Environment) -> Result<bool, String> {
    if t.optional && matches!(value, Value::Null) {
        return Ok(true);
    }
    if !t.union.is_empty() {
        for alt in &t.union {
            if validate_named(value, alt, env)? {
                return Ok(true);
            }
        }
        return Ok(false);
    }
    if !t.generics.is_empty() {
        return validate_generic(value, t, env);
    }
    validate_named(value, &t.name, env)
}

fn validate_generic(value: &Value, t: &TypeExpr, env: &Environment) -> Result<bool, String> {
    match t.name.as_str() {
        "array" => {
            let Value::Array(elems) = value else { return Ok(false) };
            let Some(elem_type_raw) = t.generics.first() else { return Ok(false) };
            let elem_type = parse_inline_type(elem_type_raw);
            for elem in elems.borrow().iter() {
                if !validate(elem, &elem_type, env)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        "map" => {
            let Value::Map(pairs) = value else { return Ok(false) };
            let Some(value_type_raw) = t.generics.get(1) else { return Ok(false) };
            let value_type = parse_inline_type(value_type_raw);
            for v in pairs.borrow().values() {
                if !validate(v, &value_type, env)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        other => Err(format!("unknown type: {other}")),
    }
}

fn validate_named(value: &Value, name: &str, env: &Environment) -> Result<bool, String> {
    match name {
        "integer" => Ok(matches!(value, Value::Integer(_))),
        "float" => Ok(matches!(value, Value::Integer(_) | Value::Float(_))),
        "string" => Ok(matches!(value, Value::Str(_))),
        "boolean" => Ok(matches!(value, Value::Boolean(_))),
        "null" => Ok(matches!(value, Value::Null)),
        "array" => Ok(matches!(value, Value::Array(_))),
        "map" => Ok(matches!(value, Value::Map(_))),
        "function" => {
            Ok(matches!(value, Value::Function(_) | Value::Builtin(_) | Value::BoundMethod(..)))
        }
        other => match env.get(other) {
            Some(Value::Model(m)) => Ok(matches!(value, Value::ModelInstance(inst) if Rc::ptr_eq(&inst.model, &m))),
            Some(Value::Enum(e)) => Ok(matches!(
                value,
                Value::EnumValue(ev) if *ev.enum_name.borrow() == *e.name.borrow()
            )),
            _ => Err(format!("unknown type: {other}")),
        },
    }
}

/// A generic parameter is captured by the parser as raw text, possibly a
/// `" | "`-joined union (e.g. `"integer | string"`). Re-split it here.
fn parse_inline_type(raw: &str) -> TypeExpr {
    if raw.contains(" | ") {
        let union: Vec<String> = raw.split(" | ").map(|s| s.trim().to_string()).collect();
        TypeExpr { name: union[0].clone(), generics: Vec::new(), union, optional: false }
    } else {
        TypeExpr::simple(raw.trim())
    }
}

/// The single implicit conversion the language performs: an `Integer`
/// value satisfying `float` is replaced by a `Float` of the same
/// magnitude. Assumes `value` has already passed [`validate`].
pub fn coerce(value: Value, t: &TypeExpr) -> Value {
    if t.optional {
        if matches!(value, Value::Null) {
            return value;
        }
        let mut inner = t.clone();
        inner.optional = false;
        return coerce(value, &inner);
    }
    if !t.union.is_empty() {
        for alt in &t.union {
            if accepts_scalar(&value, alt) {
                return coerce(value, &TypeExpr::simple(alt.clone()));
            }
        }
        return value;
    }
    if !t.generics.is_empty() {
        return coerce_generic(value, t);
    }
    match (t.name.as_str(), value) {
        ("float", Value::Integer(n)) => Value::Float(n as f64),
        (_, v) => v,
    }
}

fn coerce_generic(value: Value, t: &TypeExpr) -> Value {
    match t.name.as_str() {
        "array" => {
            let Value::Array(elems) = &value else { return value };
            let Some(elem_type_raw) = t.generics.first() else { return value };
            let elem_type = parse_inline_type(elem_type_raw);
            let coerced: Vec<Value> =
                elems.borrow().iter().cloned().map(|v| coerce(v, &elem_type)).collect();
            Value::array(coerced)
        }
        "map" => {
            let Value::Map(pairs) = &value else { return value };
            let Some(value_type_raw) = t.generics.get(1) else { return value };
            let value_type = parse_inline_type(value_type_raw);
            let mut out = indexmap::IndexMap::new();
            for (k, v) in pairs.borrow().iter() {
                out.insert(k.clone(), coerce(v.clone(), &value_type));
            }
            Value::map(out)
        }
        _ => value,
    }
}

fn accepts_scalar(value: &Value, name: &str) -> bool {
    match name {
        "integer" => matches!(value, Value::Integer(_)),
        "float" => matches!(value, Value::Integer(_) | Value::Float(_)),
        "string" => matches!(value, Value::Str(_)),
        "boolean" => matches!(value, Value::Boolean(_)),
        "null" => matches!(value, Value::Null),
        "array" => matches!(value, Value::Array(_)),
        "map" => matches!(value, Value::Map(_)),
        _ => false,
    }
}

/// Validate then coerce in one step, building the standard "type mismatch"
/// message on failure. Used at every type boundary in the evaluator.
///
/// Container generics recurse element-by-element so a failure names the
/// offending element (`"array element 2: type mismatch: ..."`) instead of
/// only reporting the container's own type mismatch.
pub fn validate_and_coerce(value: Value, t: &TypeExpr, env: &Environment) -> Result<Value, String> {
    if t.optional && matches!(value, Value::Null) {
        return Ok(value);
    }
    if t.generics.is_empty() || !t.union.is_empty() {
        return match validate(&value, t, env) {
            Ok(true) => Ok(coerce(value, t)),
            Ok(false) => {
                Err(format!("type mismatch: expected {}, got {}", t.display(), value.type_name()))
            }
            Err(e) => Err(e),
        };
    }
    match t.name.as_str() {
        "array" => {
            let Value::Array(elems) = &value else {
                return Err(format!("type mismatch: expected {}, got {}", t.display(), value.type_name()));
            };
            let Some(elem_type_raw) = t.generics.first() else {
                return Err(format!("unknown type: {}", t.display()));
            };
            let elem_type = parse_inline_type(elem_type_raw);
            let mut out = Vec::with_capacity(elems.borrow().len());
            for (i, elem) in elems.borrow().iter().enumerate() {
                match validate_and_coerce(elem.clone(), &elem_type, env) {
                    Ok(v) => out.push(v),
                    Err(msg) => return Err(format!("array element {i}: {msg}")),
                }
            }
            Ok(Value::array(out))
        }
        "map" => {
            let Value::Map(pairs) = &value else {
                return Err(format!("type mismatch: expected {}, got {}", t.display(), value.type_name()));
            };
            let Some(value_type_raw) = t.generics.get(1) else {
                return Err(format!("unknown type: {}", t.display()));
            };
            let value_type = parse_inline_type(value_type_raw);
            let mut out = IndexMap::new();
            for (k, v) in pairs.borrow().iter() {
                match validate_and_coerce(v.clone(), &value_type, env) {
                    Ok(coerced) => out.insert(k.clone(), coerced),
                    Err(msg) => return Err(format!("map value for key {k:?}: {msg}")),
                };
            }
            Ok(Value::map(out))
        }
        other => Err(format!("unknown type: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::root("test.tsl")
    }

    #[test]
    fn integer_satisfies_float_and_coerces() {
        let t = TypeExpr::simple("float");
        let v = validate_and_coerce(Value::Integer(3), &t, &env()).unwrap();
        assert_eq!(v, Value::Float(3.0));
    }

    #[test]
    fn string_does_not_satisfy_integer() {
        let t = TypeExpr::simple("integer");
        let err = validate_and_coerce(Value::string("hello"), &t, &env()).unwrap_err();
        assert!(err.contains("type mismatch: expected integer, got string"));
    }

    #[test]
    fn optional_accepts_null() {
        let t = TypeExpr { name: "integer".into(), generics: vec![], union: vec![], optional: true };
        assert!(validate(&Value::Null, &t, &env()).unwrap());
    }

    #[test]
    fn union_accepts_any_alternative() {
        let t = TypeExpr {
            name: "integer".into(),
            generics: vec![],
            union: vec!["integer".into(), "string".into()],
            optional: false,
        };
        assert!(validate(&Value::string("x"), &t, &env()).unwrap());
        assert!(!validate(&Value::Boolean(true), &t, &env()).unwrap());
    }

    #[test]
    fn array_generic_validates_each_element() {
        let t = TypeExpr { name: "array".into(), generics: vec!["integer".into()], union: vec![], optional: false };
        let good = Value::array(vec![Value::Integer(1), Value::Integer(2)]);
        assert!(validate(&good, &t, &env()).unwrap());
        let bad = Value::array(vec![Value::Integer(1), Value::string("x")]);
        assert!(!validate(&bad, &t, &env()).unwrap());
    }

    #[test]
    fn array_generic_with_embedded_union() {
        let t = TypeExpr {
            name: "array".into(),
            generics: vec!["integer | string".into()],
            union: vec![],
            optional: false,
        };
        let v = Value::array(vec![Value::Integer(1), Value::string("two"), Value::Boolean(true)]);
        assert!(!validate(&v, &t, &env()).unwrap());
    }

    #[test]
    fn unknown_type_name_is_an_error() {
        let t = TypeExpr::simple("NoSuchType");
        let err = validate(&Value::Integer(1), &t, &env()).unwrap_err();
        assert!(err.contains("unknown type"));
    }

    #[test]
    fn array_generic_mismatch_names_the_offending_element() {
        let t = TypeExpr {
            name: "array".into(),
            generics: vec!["integer | string".into()],
            union: vec![],
            optional: false,
        };
        let v = Value::array(vec![Value::Integer(1), Value::string("two"), Value::Boolean(true)]);
        let err = validate_and_coerce(v, &t, &env()).unwrap_err();
        assert_eq!(err, "array element 2: type mismatch: expected integer | string, got boolean");
    }

    #[test]
    fn array_generic_coerces_each_element() {
        let t = TypeExpr { name: "array".into(), generics: vec!["float".into()], union: vec![], optional: false };
        let v = Value::array(vec![Value::Integer(1), Value::Integer(2)]);
        let coerced = validate_and_coerce(v, &t, &env()).unwrap();
        assert_eq!(coerced, Value::array(vec![Value::Float(1.0), Value::Float(2.0)]));
    }
}
