//! Standard-module builders. Each is called at most once, lazily, on first
//! `import` of its name (the resolver caches the result).

use std::rc::Rc;

use indexmap::IndexMap;
use totalscript_object::{BuiltinValue, CallFn, Environment, ModuleValue, Value};

pub(crate) fn build(name: &str) -> Option<Value> {
    match name {
        "math" => Some(math_module()),
        "json" => Some(json_module()),
        "fs" => Some(fs_module()),
        "time" => Some(time_module()),
        "os" => Some(os_module()),
        "http" => Some(stub_module("http", &["get", "post", "listen"])),
        "db" => Some(stub_module("db", &["connect", "query", "execute"])),
        _ => None,
    }
}

fn module(name: &str, entries: Vec<(&str, Value)>) -> Value {
    let scope = Environment::root(format!("<{name}>"));
    for (key, value) in entries {
        scope.declare(key, value);
    }
    Value::Module(Rc::new(ModuleValue { name: name.to_string(), scope }))
}

fn builtin(name: &'static str, func: fn(&Value, &[Value], CallFn) -> Value) -> Value {
    Value::Builtin(Rc::new(BuiltinValue { name, func }))
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Integer(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn expect_number(args: &[Value], i: usize, fname: &str) -> Result<f64, Value> {
    args.get(i)
        .and_then(as_f64)
        .ok_or_else(|| Value::error(format!("{fname} expects a numeric argument")))
}

// ── math ─────────────────────────────────────────────────────────────

fn math_module() -> Value {
    module(
        "math",
        vec![
            ("pi", Value::Float(std::f64::consts::PI)),
            ("e", Value::Float(std::f64::consts::E)),
            ("abs", builtin("abs", math_abs)),
            ("floor", builtin("floor", math_floor)),
            ("ceil", builtin("ceil", math_ceil)),
            ("round", builtin("round", math_round)),
            ("sqrt", builtin("sqrt", math_sqrt)),
            ("pow", builtin("pow", math_pow)),
            ("min", builtin("min", math_min)),
            ("max", builtin("max", math_max)),
        ],
    )
}

fn math_abs(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    match args.first() {
        Some(Value::Integer(n)) => Value::Integer(n.abs()),
        Some(Value::Float(f)) => Value::Float(f.abs()),
        _ => Value::error("abs expects a numeric argument"),
    }
}

fn math_floor(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    match expect_number(args, 0, "floor") {
        Ok(x) => Value::Float(x.floor()),
        Err(e) => e,
    }
}

fn math_ceil(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    match expect_number(args, 0, "ceil") {
        Ok(x) => Value::Float(x.ceil()),
        Err(e) => e,
    }
}

fn math_round(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    match expect_number(args, 0, "round") {
        Ok(x) => Value::Float(x.round()),
        Err(e) => e,
    }
}

fn math_sqrt(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    match expect_number(args, 0, "sqrt") {
        Ok(x) => Value::Float(x.sqrt()),
        Err(e) => e,
    }
}

fn math_pow(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    let base = match expect_number(args, 0, "pow") {
        Ok(x) => x,
        Err(e) => return e,
    };
    let exp = match expect_number(args, 1, "pow") {
        Ok(x) => x,
        Err(e) => return e,
    };
    Value::Float(base.powf(exp))
}

fn math_min(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    match (args.first(), args.get(1)) {
        (Some(Value::Integer(a)), Some(Value::Integer(b))) => Value::Integer(*a.min(b)),
        _ => match (expect_number(args, 0, "min"), expect_number(args, 1, "min")) {
            (Ok(a), Ok(b)) => Value::Float(a.min(b)),
            (Err(e), _) | (_, Err(e)) => e,
        },
    }
}

fn math_max(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    match (args.first(), args.get(1)) {
        (Some(Value::Integer(a)), Some(Value::Integer(b))) => Value::Integer(*a.max(b)),
        _ => match (expect_number(args, 0, "max"), expect_number(args, 1, "max")) {
            (Ok(a), Ok(b)) => Value::Float(a.max(b)),
            (Err(e), _) | (_, Err(e)) => e,
        },
    }
}

// ── json ─────────────────────────────────────────────────────────────

fn json_module() -> Value {
    module("json", vec![("stringify", builtin("stringify", json_stringify)), ("parse", builtin("parse", json_parse))])
}

fn json_stringify(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    let Some(v) = args.first() else { return Value::error("stringify expects one argument") };
    match value_to_json(v) {
        Ok(json) => Value::string(json.to_string()),
        Err(e) => Value::error(e),
    }
}

fn json_parse(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    let Some(Value::Str(s)) = args.first() else {
        return Value::error("parse expects a string argument");
    };
    match serde_json::from_str::<serde_json::Value>(s) {
        Ok(json) => json_to_value(&json),
        Err(e) => Value::error(format!("invalid JSON: {e}")),
    }
}

fn value_to_json(v: &Value) -> Result<serde_json::Value, String> {
    Ok(match v {
        Value::Integer(n) => serde_json::Value::Number((*n).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| "cannot represent non-finite float as JSON".to_string())?,
        Value::Str(s) => serde_json::Value::String(s.to_string()),
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Null => serde_json::Value::Null,
        Value::Array(elems) => {
            let mut out = Vec::with_capacity(elems.borrow().len());
            for e in elems.borrow().iter() {
                out.push(value_to_json(e)?);
            }
            serde_json::Value::Array(out)
        }
        Value::Map(pairs) => {
            let mut out = serde_json::Map::new();
            for (k, v) in pairs.borrow().iter() {
                out.insert(k.clone(), value_to_json(v)?);
            }
            serde_json::Value::Object(out)
        }
        other => return Err(format!("cannot serialize {} to JSON", other.type_name())),
    })
}

fn json_to_value(j: &serde_json::Value) -> Value {
    match j {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::string(s.clone()),
        serde_json::Value::Array(items) => Value::array(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => {
            let mut out = IndexMap::new();
            for (k, v) in map {
                out.insert(k.clone(), json_to_value(v));
            }
            Value::map(out)
        }
    }
}

// ── fs ───────────────────────────────────────────────────────────────

fn fs_module() -> Value {
    module(
        "fs",
        vec![
            ("readFile", builtin("readFile", fs_read_file)),
            ("writeFile", builtin("writeFile", fs_write_file)),
            ("exists", builtin("exists", fs_exists)),
        ],
    )
}

fn fs_read_file(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    let Some(Value::Str(path)) = args.first() else {
        return Value::error("readFile expects a string path argument");
    };
    match std::fs::read_to_string(path.as_ref()) {
        Ok(contents) => Value::string(contents),
        Err(e) => Value::error(format!("readFile failed: {e}")),
    }
}

fn fs_write_file(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    let (Some(Value::Str(path)), Some(Value::Str(contents))) = (args.first(), args.get(1)) else {
        return Value::error("writeFile expects a path and contents, both strings");
    };
    match std::fs::write(path.as_ref(), contents.as_ref()) {
        Ok(()) => Value::Null,
        Err(e) => Value::error(format!("writeFile failed: {e}")),
    }
}

fn fs_exists(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    let Some(Value::Str(path)) = args.first() else {
        return Value::error("exists expects a string path argument");
    };
    Value::Boolean(std::path::Path::new(path.as_ref()).exists())
}

// ── time ─────────────────────────────────────────────────────────────

fn time_module() -> Value {
    module("time", vec![("now", builtin("now", time_now)), ("sleepMillis", builtin("sleepMillis", time_sleep_millis))])
}

fn time_now(_r: &Value, _args: &[Value], _c: CallFn) -> Value {
    use std::time::{SystemTime, UNIX_EPOCH};
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => Value::Integer(d.as_secs() as i64),
        Err(_) => Value::error("system clock is before the Unix epoch"),
    }
}

fn time_sleep_millis(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    let Some(Value::Integer(millis)) = args.first() else {
        return Value::error("sleepMillis expects an integer argument");
    };
    if *millis < 0 {
        return Value::error("sleepMillis expects a non-negative argument");
    }
    std::thread::sleep(std::time::Duration::from_millis(*millis as u64));
    Value::Null
}

// ── os ───────────────────────────────────────────────────────────────

fn os_module() -> Value {
    module(
        "os",
        vec![
            ("args", builtin("args", os_args)),
            ("getEnv", builtin("getEnv", os_get_env)),
            ("platform", builtin("platform", os_platform)),
        ],
    )
}

fn os_args(_r: &Value, _args: &[Value], _c: CallFn) -> Value {
    Value::array(std::env::args().skip(2).map(Value::string).collect())
}

fn os_get_env(_r: &Value, args: &[Value], _c: CallFn) -> Value {
    let Some(Value::Str(name)) = args.first() else {
        return Value::error("getEnv expects a string argument");
    };
    match std::env::var(name.as_ref()) {
        Ok(v) => Value::string(v),
        Err(_) => Value::Null,
    }
}

fn os_platform(_r: &Value, _args: &[Value], _c: CallFn) -> Value {
    let platform = if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else {
        "unknown"
    };
    Value::string(platform)
}

// ── registration-only stubs ─────────────────────────────────────────

/// Each stub function's receiver is bound to `"MODULE function NAME"`, so a
/// single `fn` pointer can still produce a message naming the module and
/// function it stands in for, without per-function closures (`BuiltinFn`
/// is a plain `fn` pointer, not a capturing closure).
fn stub_module(name: &'static str, functions: &[&'static str]) -> Value {
    let entries = functions
        .iter()
        .map(|fname| {
            let label = Value::string(format!("{name} function {fname}"));
            let bound = Value::BoundMethod(Box::new(label), Rc::new(BuiltinValue { name: fname, func: stub_fn }));
            (*fname, bound)
        })
        .collect();
    module(name, entries)
}

fn stub_fn(receiver: &Value, _args: &[Value], _c: CallFn) -> Value {
    let label = match receiver {
        Value::Str(s) => s.to_string(),
        _ => "this module function".to_string(),
    };
    Value::error(format!("{label} is a registration-only stub in the core engine"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(v: &Value, args: &[Value]) -> Value {
        match v {
            Value::Builtin(b) => (b.func)(&Value::Null, args, &|_f, _a| Value::Null),
            Value::BoundMethod(receiver, b) => (b.func)(receiver, args, &|_f, _a| Value::Null),
            other => panic!("not callable: {other:?}"),
        }
    }

    fn member(module: &Value, name: &str) -> Value {
        let Value::Module(m) = module else { panic!("not a module") };
        m.scope.get(name).unwrap()
    }

    #[test]
    fn math_sqrt_and_pow() {
        let m = math_module();
        assert_eq!(call(&member(&m, "sqrt"), &[Value::Integer(9)]), Value::Float(3.0));
        assert_eq!(call(&member(&m, "pow"), &[Value::Integer(2), Value::Integer(10)]), Value::Float(1024.0));
    }

    #[test]
    fn math_min_max_preserve_integer_type() {
        let m = math_module();
        assert_eq!(call(&member(&m, "min"), &[Value::Integer(3), Value::Integer(-1)]), Value::Integer(-1));
        assert_eq!(call(&member(&m, "max"), &[Value::Integer(3), Value::Integer(-1)]), Value::Integer(3));
    }

    #[test]
    fn json_round_trips_nested_structures() {
        let m = json_module();
        let original = Value::map(IndexMap::from([
            ("name".to_string(), Value::string("ts")),
            ("scores".to_string(), Value::array(vec![Value::Integer(1), Value::Integer(2)])),
        ]));
        let stringified = call(&member(&m, "stringify"), &[original.clone()]);
        let Value::Str(s) = stringified else { panic!("expected string") };
        let parsed = call(&member(&m, "parse"), &[Value::Str(s)]);
        assert_eq!(parsed, original);
    }

    #[test]
    fn os_platform_is_one_of_the_known_values() {
        let m = os_module();
        let Value::Str(p) = call(&member(&m, "platform"), &[]) else { panic!("expected string") };
        assert!(["linux", "macos", "windows", "unknown"].contains(&p.as_ref()));
    }

    #[test]
    fn http_stub_functions_return_stub_error() {
        let m = stub_module("http", &["get", "post", "listen"]);
        let Value::Error(msg) = call(&member(&m, "get"), &[]) else { panic!("expected error") };
        assert!(msg.contains("registration-only stub"));
    }
}
