//! The runtime value model: a closed sum type covering every kind of
//! object the evaluator can produce, plus the non-value control-flow
//! sentinels it propagates internally.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use totalscript_parser::ast::{Block, Param, TypeExpr};

use crate::environment::Environment;

/// A user-defined function: its declared parameters, body, optional return
/// annotation, and the environment active at the point it was defined.
/// Sharing that environment by reference is what makes closures work.
#[derive(Debug)]
pub struct FunctionValue {
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Block,
    pub env: Environment,
}

/// How a builtin invokes a callback value (a `Function` or another
/// `Builtin`) passed to it, e.g. the predicate in `array.filter`. Builtins
/// live in this crate, which has no notion of AST evaluation, so the actual
/// call logic is supplied by the evaluator at call time.
pub type CallFn<'a> = &'a dyn Fn(&Value, &[Value]) -> Value;

pub type BuiltinFn = fn(&Value, &[Value], CallFn) -> Value;

/// A host-implemented callable: a free-standing stdlib function or an
/// entry in the built-in method registry.
#[derive(Clone, Copy)]
pub struct BuiltinValue {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl fmt::Debug for BuiltinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinValue").field("name", &self.name).finish()
    }
}

#[derive(Debug)]
pub struct ModelValue {
    pub name: RefCell<String>,
    pub fields: Vec<(String, TypeExpr)>,
    pub methods: IndexMap<String, Rc<FunctionValue>>,
    pub constructors: Vec<Rc<FunctionValue>>,
    /// The scope the model literal was evaluated in, used to resolve type
    /// names (other models/enums) referenced by field annotations.
    pub env: Environment,
}

#[derive(Debug)]
pub struct ModelInstanceValue {
    pub model: Rc<ModelValue>,
    pub fields: RefCell<IndexMap<String, Value>>,
}

#[derive(Debug)]
pub struct EnumDefValue {
    pub name: RefCell<String>,
    /// Declaration order preserved so `.values()` is deterministic.
    pub members: IndexMap<String, Rc<EnumMemberValue>>,
}

#[derive(Debug)]
pub struct EnumMemberValue {
    pub enum_name: RefCell<String>,
    pub name: String,
    pub underlying: Value,
}

#[derive(Debug)]
pub struct ModuleValue {
    pub name: String,
    pub scope: Environment,
}

/// Runtime type tag, used for dispatch and diagnostics. Distinct from
/// `TypeExpr::name`, though the two coincide for the eight scalar/container
/// names the validator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Integer,
    Float,
    String,
    Boolean,
    Null,
    Array,
    Map,
    Function,
    Builtin,
    BoundMethod,
    Model,
    ModelInstance,
    Enum,
    EnumValue,
    Module,
}

impl TypeTag {
    pub fn display_name(self) -> &'static str {
        match self {
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::String => "string",
            TypeTag::Boolean => "boolean",
            TypeTag::Null => "null",
            TypeTag::Array => "array",
            TypeTag::Map => "map",
            TypeTag::Function => "function",
            TypeTag::Builtin => "builtin",
            TypeTag::BoundMethod => "bound method",
            TypeTag::Model => "model",
            TypeTag::ModelInstance => "model instance",
            TypeTag::Enum => "enum",
            TypeTag::EnumValue => "enum value",
            TypeTag::Module => "module",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Str(Rc<str>),
    Boolean(bool),
    Null,
    Array(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<IndexMap<String, Value>>>),
    Function(Rc<FunctionValue>),
    Builtin(Rc<BuiltinValue>),
    BoundMethod(Box<Value>, Rc<BuiltinValue>),
    Model(Rc<ModelValue>),
    ModelInstance(Rc<ModelInstanceValue>),
    Enum(Rc<EnumDefValue>),
    EnumValue(Rc<EnumMemberValue>),
    Module(Rc<ModuleValue>),
    Return(Box<Value>),
    Break,
    Continue,
    Error(String),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::Str(s.into())
    }

    pub fn error(message: impl Into<String>) -> Value {
        Value::Error(message.into())
    }

    pub fn array(elems: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(elems)))
    }

    pub fn map(pairs: IndexMap<String, Value>) -> Value {
        Value::Map(Rc::new(RefCell::new(pairs)))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Value::Return(_) | Value::Break | Value::Continue | Value::Error(_))
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Integer(_) => TypeTag::Integer,
            Value::Float(_) => TypeTag::Float,
            Value::Str(_) => TypeTag::String,
            Value::Boolean(_) => TypeTag::Boolean,
            Value::Null => TypeTag::Null,
            Value::Array(_) => TypeTag::Array,
            Value::Map(_) => TypeTag::Map,
            Value::Function(_) => TypeTag::Function,
            Value::Builtin(_) => TypeTag::Builtin,
            Value::BoundMethod(..) => TypeTag::BoundMethod,
            Value::Model(_) => TypeTag::Model,
            Value::ModelInstance(_) => TypeTag::ModelInstance,
            Value::Enum(_) => TypeTag::Enum,
            Value::EnumValue(_) => TypeTag::EnumValue,
            Value::Module(_) => TypeTag::Module,
            Value::Return(_) | Value::Break | Value::Continue | Value::Error(_) => TypeTag::Null,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_tag().display_name()
    }

    /// `Null` is false, `Boolean` is itself, numeric zero is false, the
    /// empty string is false, every other value is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn inspect(&self) -> String {
        match self {
            Value::Integer(n) => n.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => s.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Array(elems) => {
                let parts: Vec<String> =
                    elems.borrow().iter().map(Value::inspect_nested).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Map(pairs) => {
                let parts: Vec<String> = pairs
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.inspect_nested()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Function(_) => "<function>".to_string(),
            Value::Builtin(b) => format!("<builtin {}>", b.name),
            Value::BoundMethod(_, b) => format!("<bound method {}>", b.name),
            Value::Model(m) => format!("<model {}>", m.name.borrow()),
            Value::ModelInstance(inst) => format!("<{} instance>", inst.model.name.borrow()),
            Value::Enum(e) => format!("<enum {}>", e.name.borrow()),
            Value::EnumValue(ev) => format!("{}.{}", ev.enum_name.borrow(), ev.name),
            Value::Module(m) => format!("<module {}>", m.name),
            Value::Return(v) => v.inspect(),
            Value::Break => "<break>".to_string(),
            Value::Continue => "<continue>".to_string(),
            Value::Error(msg) => format!("ERROR: {msg}"),
        }
    }

    fn inspect_nested(&self) -> String {
        match self {
            Value::Str(s) => format!("{:?}", s.as_ref()),
            other => other.inspect(),
        }
    }
}

/// Delegates to [`values_equal`]. Provided so `Value` can sit in
/// `assert_eq!` and ordinary map/set lookups without every caller having to
/// remember to call the free function.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other)
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Polymorphic equality used by `==`, `!=`, and `switch` case matching.
/// Comparisons across mismatched types are `false`, never an error.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Null, Value::Null) => true,
        (Value::Array(x), Value::Array(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b))
        }
        (Value::Map(x), Value::Map(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        (Value::ModelInstance(x), Value::ModelInstance(y)) => Rc::ptr_eq(x, y),
        (Value::Model(x), Value::Model(y)) => Rc::ptr_eq(x, y),
        (Value::Enum(x), Value::Enum(y)) => Rc::ptr_eq(x, y),
        (Value::EnumValue(x), Value::EnumValue(y)) => {
            *x.enum_name.borrow() == *y.enum_name.borrow() && x.name == y.name
        }
        (Value::Break, Value::Break) | (Value::Continue, Value::Continue) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec_rules() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(Value::Integer(1).is_truthy());
        assert!(Value::string("x").is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    #[test]
    fn integer_and_float_are_never_equal() {
        assert!(!values_equal(&Value::Integer(2), &Value::Float(2.0)));
        assert!(!values_equal(&Value::Integer(2), &Value::Float(2.5)));
    }

    #[test]
    fn mismatched_types_are_unequal_not_an_error() {
        assert!(!values_equal(&Value::Integer(1), &Value::string("1")));
        assert!(!values_equal(&Value::Null, &Value::Boolean(false)));
    }

    #[test]
    fn model_instance_equality_is_by_identity() {
        let model = Rc::new(ModelValue {
            name: RefCell::new("Point".to_string()),
            fields: vec![],
            methods: IndexMap::new(),
            constructors: vec![],
            env: Environment::root("test.tsl"),
        });
        let a = Value::ModelInstance(Rc::new(ModelInstanceValue {
            model: model.clone(),
            fields: RefCell::new(IndexMap::new()),
        }));
        let b = Value::ModelInstance(Rc::new(ModelInstanceValue {
            model,
            fields: RefCell::new(IndexMap::new()),
        }));
        assert!(!values_equal(&a, &b));
        assert!(values_equal(&a, &a.clone()));
    }
}
