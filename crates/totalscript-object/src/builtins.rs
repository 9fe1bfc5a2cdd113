//! Built-in method registry: a process-wide `(runtime-type, method-name) ->
//! builtin` table consulted by member access on strings, arrays, and maps.

use std::sync::OnceLock;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::value::{BuiltinValue, CallFn, TypeTag, Value};

type Registry = FxHashMap<(TypeTag, &'static str), BuiltinValue>;

static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn lookup_builtin(tag: TypeTag, name: &str) -> Option<BuiltinValue> {
    registry().get(&(tag, name)).copied()
}

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(build_registry)
}

fn build_registry() -> Registry {
    let mut reg: Registry = FxHashMap::default();
    let mut add = |tag: TypeTag, name: &'static str, func: BuiltinFnPtr| {
        reg.insert((tag, name), BuiltinValue { name, func });
    };

    add(TypeTag::String, "length", string_length);
    add(TypeTag::String, "upper", string_upper);
    add(TypeTag::String, "lower", string_lower);
    add(TypeTag::String, "trim", string_trim);
    add(TypeTag::String, "split", string_split);
    add(TypeTag::String, "contains", string_contains);
    add(TypeTag::String, "startsWith", string_starts_with);
    add(TypeTag::String, "endsWith", string_ends_with);
    add(TypeTag::String, "replace", string_replace);
    add(TypeTag::String, "substring", string_substring);

    add(TypeTag::Array, "length", array_length);
    add(TypeTag::Array, "push", array_push);
    add(TypeTag::Array, "pop", array_pop);
    add(TypeTag::Array, "insert", array_insert);
    add(TypeTag::Array, "remove", array_remove);
    add(TypeTag::Array, "contains", array_contains);
    add(TypeTag::Array, "indexOf", array_index_of);
    add(TypeTag::Array, "join", array_join);
    add(TypeTag::Array, "map", array_map);
    add(TypeTag::Array, "filter", array_filter);
    add(TypeTag::Array, "reduce", array_reduce);
    add(TypeTag::Array, "each", array_each);

    add(TypeTag::Map, "length", map_length);
    add(TypeTag::Map, "keys", map_keys);
    add(TypeTag::Map, "values", map_values);
    add(TypeTag::Map, "contains", map_contains);
    add(TypeTag::Map, "remove", map_remove);

    reg
}

type BuiltinFnPtr = fn(&Value, &[Value], CallFn) -> Value;

fn wrong_receiver() -> Value {
    Value::error("internal: built-in invoked with mismatched receiver type")
}

// ── String methods ───────────────────────────────────────────────────

fn as_str(v: &Value) -> Option<&str> {
    match v {
        Value::Str(s) => Some(s.as_ref()),
        _ => None,
    }
}

fn string_length(recv: &Value, _args: &[Value], _call: CallFn) -> Value {
    match as_str(recv) {
        Some(s) => Value::Integer(s.chars().count() as i64),
        None => wrong_receiver(),
    }
}

fn string_upper(recv: &Value, _args: &[Value], _call: CallFn) -> Value {
    match as_str(recv) {
        Some(s) => Value::string(s.to_uppercase()),
        None => wrong_receiver(),
    }
}

fn string_lower(recv: &Value, _args: &[Value], _call: CallFn) -> Value {
    match as_str(recv) {
        Some(s) => Value::string(s.to_lowercase()),
        None => wrong_receiver(),
    }
}

fn string_trim(recv: &Value, _args: &[Value], _call: CallFn) -> Value {
    match as_str(recv) {
        Some(s) => Value::string(s.trim()),
        None => wrong_receiver(),
    }
}

fn string_split(recv: &Value, args: &[Value], _call: CallFn) -> Value {
    let Some(s) = as_str(recv) else { return wrong_receiver() };
    let Some(sep) = args.first().and_then(as_str) else {
        return Value::error("split expects a string separator argument");
    };
    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::string(c.to_string())).collect()
    } else {
        s.split(sep).map(Value::string).collect()
    };
    Value::array(parts)
}

fn string_contains(recv: &Value, args: &[Value], _call: CallFn) -> Value {
    let Some(s) = as_str(recv) else { return wrong_receiver() };
    let Some(needle) = args.first().and_then(as_str) else {
        return Value::error("contains expects a string argument");
    };
    Value::Boolean(s.contains(needle))
}

fn string_starts_with(recv: &Value, args: &[Value], _call: CallFn) -> Value {
    let Some(s) = as_str(recv) else { return wrong_receiver() };
    let Some(prefix) = args.first().and_then(as_str) else {
        return Value::error("startsWith expects a string argument");
    };
    Value::Boolean(s.starts_with(prefix))
}

fn string_ends_with(recv: &Value, args: &[Value], _call: CallFn) -> Value {
    let Some(s) = as_str(recv) else { return wrong_receiver() };
    let Some(suffix) = args.first().and_then(as_str) else {
        return Value::error("endsWith expects a string argument");
    };
    Value::Boolean(s.ends_with(suffix))
}

fn string_replace(recv: &Value, args: &[Value], _call: CallFn) -> Value {
    let Some(s) = as_str(recv) else { return wrong_receiver() };
    let (Some(from), Some(to)) = (args.first().and_then(as_str), args.get(1).and_then(as_str))
    else {
        return Value::error("replace expects two string arguments");
    };
    Value::string(s.replace(from, to))
}

fn string_substring(recv: &Value, args: &[Value], _call: CallFn) -> Value {
    let Some(s) = as_str(recv) else { return wrong_receiver() };
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let start = args.first().and_then(as_int).unwrap_or(0).clamp(0, len);
    let end = args.get(1).and_then(as_int).unwrap_or(len).clamp(start, len);
    let slice: String = chars[start as usize..end as usize].iter().collect();
    Value::string(slice)
}

fn as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Integer(n) => Some(*n),
        _ => None,
    }
}

// ── Array methods ────────────────────────────────────────────────────

fn as_array(v: &Value) -> Option<&std::cell::RefCell<Vec<Value>>> {
    match v {
        Value::Array(a) => Some(a),
        _ => None,
    }
}

fn array_length(recv: &Value, _args: &[Value], _call: CallFn) -> Value {
    match as_array(recv) {
        Some(a) => Value::Integer(a.borrow().len() as i64),
        None => wrong_receiver(),
    }
}

fn array_push(recv: &Value, args: &[Value], _call: CallFn) -> Value {
    let Some(a) = as_array(recv) else { return wrong_receiver() };
    a.borrow_mut().extend(args.iter().cloned());
    Value::Integer(a.borrow().len() as i64)
}

fn array_pop(recv: &Value, _args: &[Value], _call: CallFn) -> Value {
    let Some(a) = as_array(recv) else { return wrong_receiver() };
    a.borrow_mut().pop().unwrap_or(Value::Null)
}

fn array_insert(recv: &Value, args: &[Value], _call: CallFn) -> Value {
    let Some(a) = as_array(recv) else { return wrong_receiver() };
    let Some(index) = args.first().and_then(as_int) else {
        return Value::error("insert expects an integer index argument");
    };
    let Some(value) = args.get(1) else {
        return Value::error("insert expects a value argument");
    };
    let mut a = a.borrow_mut();
    let index = normalize_index(index, a.len());
    if index > a.len() {
        return Value::error("index out of bounds");
    }
    a.insert(index, value.clone());
    Value::Null
}

fn array_remove(recv: &Value, args: &[Value], _call: CallFn) -> Value {
    let Some(a) = as_array(recv) else { return wrong_receiver() };
    let Some(index) = args.first().and_then(as_int) else {
        return Value::error("remove expects an integer index argument");
    };
    let mut a = a.borrow_mut();
    let index = normalize_index(index, a.len());
    if index >= a.len() {
        return Value::Null;
    }
    a.remove(index)
}

fn normalize_index(index: i64, len: usize) -> usize {
    if index < 0 {
        (len as i64 + index).max(0) as usize
    } else {
        index as usize
    }
}

fn array_contains(recv: &Value, args: &[Value], _call: CallFn) -> Value {
    let Some(a) = as_array(recv) else { return wrong_receiver() };
    let Some(needle) = args.first() else {
        return Value::error("contains expects one argument");
    };
    Value::Boolean(a.borrow().iter().any(|v| v == needle))
}

fn array_index_of(recv: &Value, args: &[Value], _call: CallFn) -> Value {
    let Some(a) = as_array(recv) else { return wrong_receiver() };
    let Some(needle) = args.first() else {
        return Value::error("indexOf expects one argument");
    };
    match a.borrow().iter().position(|v| v == needle) {
        Some(i) => Value::Integer(i as i64),
        None => Value::Integer(-1),
    }
}

fn array_join(recv: &Value, args: &[Value], _call: CallFn) -> Value {
    let Some(a) = as_array(recv) else { return wrong_receiver() };
    let sep = args.first().and_then(as_str).unwrap_or("");
    let parts: Vec<String> = a.borrow().iter().map(Value::inspect).collect();
    Value::string(parts.join(sep))
}

fn array_map(recv: &Value, args: &[Value], call: CallFn) -> Value {
    let Some(a) = as_array(recv) else { return wrong_receiver() };
    let Some(func) = args.first() else {
        return Value::error("map expects a function argument");
    };
    let elems = a.borrow().clone();
    let mut out = Vec::with_capacity(elems.len());
    for (i, elem) in elems.iter().enumerate() {
        let result = call(func, &[elem.clone(), Value::Integer(i as i64)]);
        if result.is_error() {
            return result;
        }
        out.push(result);
    }
    Value::array(out)
}

fn array_filter(recv: &Value, args: &[Value], call: CallFn) -> Value {
    let Some(a) = as_array(recv) else { return wrong_receiver() };
    let Some(func) = args.first() else {
        return Value::error("filter expects a function argument");
    };
    let elems = a.borrow().clone();
    let mut out = Vec::new();
    for (i, elem) in elems.iter().enumerate() {
        let result = call(func, &[elem.clone(), Value::Integer(i as i64)]);
        if result.is_error() {
            return result;
        }
        if result.is_truthy() {
            out.push(elem.clone());
        }
    }
    Value::array(out)
}

fn array_reduce(recv: &Value, args: &[Value], call: CallFn) -> Value {
    let Some(a) = as_array(recv) else { return wrong_receiver() };
    let Some(func) = args.first() else {
        return Value::error("reduce expects a function argument");
    };
    let elems = a.borrow().clone();
    let mut acc = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match elems.first() {
            Some(first) => first.clone(),
            None => return Value::error("reduce of empty array with no initial value"),
        },
    };
    let start = if args.get(1).is_some() { 0 } else { 1 };
    for (i, elem) in elems.iter().enumerate().skip(start) {
        acc = call(func, &[acc, elem.clone(), Value::Integer(i as i64)]);
        if acc.is_error() {
            return acc;
        }
    }
    acc
}

fn array_each(recv: &Value, args: &[Value], call: CallFn) -> Value {
    let Some(a) = as_array(recv) else { return wrong_receiver() };
    let Some(func) = args.first() else {
        return Value::error("each expects a function argument");
    };
    let elems = a.borrow().clone();
    for (i, elem) in elems.iter().enumerate() {
        let result = call(func, &[elem.clone(), Value::Integer(i as i64)]);
        if result.is_error() {
            return result;
        }
    }
    Value::Null
}

// ── Map methods ──────────────────────────────────────────────────────

fn as_map(v: &Value) -> Option<&std::cell::RefCell<IndexMap<String, Value>>> {
    match v {
        Value::Map(m) => Some(m),
        _ => None,
    }
}

fn map_length(recv: &Value, _args: &[Value], _call: CallFn) -> Value {
    match as_map(recv) {
        Some(m) => Value::Integer(m.borrow().len() as i64),
        None => wrong_receiver(),
    }
}

fn map_keys(recv: &Value, _args: &[Value], _call: CallFn) -> Value {
    let Some(m) = as_map(recv) else { return wrong_receiver() };
    Value::array(m.borrow().keys().map(|k| Value::string(k.as_str())).collect())
}

fn map_values(recv: &Value, _args: &[Value], _call: CallFn) -> Value {
    let Some(m) = as_map(recv) else { return wrong_receiver() };
    Value::array(m.borrow().values().cloned().collect())
}

fn map_contains(recv: &Value, args: &[Value], _call: CallFn) -> Value {
    let Some(m) = as_map(recv) else { return wrong_receiver() };
    let Some(key) = args.first().and_then(as_str) else {
        return Value::error("contains expects a string key argument");
    };
    Value::Boolean(m.borrow().contains_key(key))
}

fn map_remove(recv: &Value, args: &[Value], _call: CallFn) -> Value {
    let Some(m) = as_map(recv) else { return wrong_receiver() };
    let Some(key) = args.first().and_then(as_str) else {
        return Value::error("remove expects a string key argument");
    };
    m.borrow_mut().shift_remove(key).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_call(_f: &Value, _args: &[Value]) -> Value {
        Value::Null
    }

    #[test]
    fn string_registry_round_trip() {
        let b = lookup_builtin(TypeTag::String, "upper").unwrap();
        let result = (b.func)(&Value::string("hi"), &[], &noop_call);
        assert_eq!(result, Value::string("HI"));
    }

    #[test]
    fn array_push_returns_new_length() {
        let recv = Value::array(vec![Value::Integer(1)]);
        let b = lookup_builtin(TypeTag::Array, "push").unwrap();
        let result = (b.func)(&recv, &[Value::Integer(2)], &noop_call);
        assert_eq!(result, Value::Integer(2));
    }

    #[test]
    fn array_negative_index_remove() {
        let recv = Value::array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        let b = lookup_builtin(TypeTag::Array, "remove").unwrap();
        let result = (b.func)(&recv, &[Value::Integer(-1)], &noop_call);
        assert_eq!(result, Value::Integer(3));
    }

    #[test]
    fn array_map_invokes_callback() {
        let recv = Value::array(vec![Value::Integer(1), Value::Integer(2)]);
        let b = lookup_builtin(TypeTag::Array, "map").unwrap();
        let double = |_f: &Value, args: &[Value]| match &args[0] {
            Value::Integer(n) => Value::Integer(n * 2),
            _ => Value::Null,
        };
        let result = (b.func)(&recv, &[Value::Null], &double);
        assert_eq!(result, Value::array(vec![Value::Integer(2), Value::Integer(4)]));
    }

    #[test]
    fn map_missing_key_returns_null_not_error() {
        let recv = Value::map(IndexMap::new());
        let b = lookup_builtin(TypeTag::Map, "remove").unwrap();
        let result = (b.func)(&recv, &[Value::string("missing")], &noop_call);
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn unknown_method_is_absent() {
        assert!(lookup_builtin(TypeTag::String, "doesNotExist").is_none());
    }
}
