//! `eval(node, env) -> value`: an AST-directed interpreter. Three
//! non-value sentinels (`Return`, `Break`, `Continue`) and one error
//! channel (`Error`) propagate by ordinary early return — there is no
//! host-exception control flow here.

use std::rc::Rc;

use indexmap::IndexMap;
use totalscript_parser::ast::{Expr, ForC, ForIn, IfElse, Program, Stmt};
use totalscript_object::{
    values_equal, BuiltinValue, Environment, EnumDefValue, EnumMemberValue, FunctionValue,
    ModelInstanceValue, ModelValue, Value,
};

use crate::validate::validate_and_coerce;

/// Resolves `import "PATH" [as NAME]` to a `Module` value. Implemented by
/// the module system crate, which depends on this crate (not the reverse)
/// so an imported file can itself be evaluated with a fresh `Interpreter`.
pub trait ModuleResolver {
    fn resolve(&self, importer_file: &str, path: &str) -> Value;
}

pub struct Interpreter<'a> {
    resolver: &'a dyn ModuleResolver,
}

impl<'a> Interpreter<'a> {
    pub fn new(resolver: &'a dyn ModuleResolver) -> Self {
        Interpreter { resolver }
    }

    /// Evaluate statements in order. A top-level `Return` is unwrapped into
    /// the program's result; an `Error` short-circuits and is returned as-is.
    pub fn eval_program(&self, program: &Program, env: &Environment) -> Value {
        let mut result = Value::Null;
        for stmt in &program.stmts {
            result = self.eval_stmt(stmt, env);
            if result.is_error() {
                return result;
            }
            if let Value::Return(v) = result {
                return *v;
            }
        }
        result
    }

    /// Evaluate a block's statements in `env` without creating a new scope
    /// — callers decide whether a child scope is warranted (loops and
    /// brace-delimited block statements do; `if`/`else` deliberately do not).
    fn eval_block(&self, block: &totalscript_parser::ast::Block, env: &Environment) -> Value {
        let mut result = Value::Null;
        for stmt in &block.stmts {
            result = self.eval_stmt(stmt, env);
            if result.is_sentinel() {
                return result;
            }
        }
        result
    }

    fn eval_stmt(&self, stmt: &Stmt, env: &Environment) -> Value {
        match stmt {
            Stmt::Var { name, type_expr, value, .. } => {
                let v = match value {
                    Some(e) => self.eval_expr(e, env),
                    None => Value::Null,
                };
                if v.is_error() {
                    return v;
                }
                self.bind_declaration(name, type_expr.as_ref(), v, env)
            }
            Stmt::Const { name, type_expr, value, .. } => {
                let v = self.eval_expr(value, env);
                if v.is_error() {
                    return v;
                }
                self.bind_declaration(name, type_expr.as_ref(), v, env)
            }
            Stmt::Return { value, .. } => {
                let v = match value {
                    Some(e) => self.eval_expr(e, env),
                    None => Value::Null,
                };
                if v.is_error() {
                    return v;
                }
                Value::Return(Box::new(v))
            }
            Stmt::Break { .. } => Value::Break,
            Stmt::Continue { .. } => Value::Continue,
            Stmt::While { cond, body, .. } => self.eval_while(cond, body, env),
            Stmt::ForIn(for_in) => self.eval_for_in(for_in, env),
            Stmt::ForC(for_c) => self.eval_for_c(for_c, env),
            Stmt::Switch { value, cases, default, .. } => {
                self.eval_switch(value, cases, default.as_ref(), env)
            }
            Stmt::Block(block) => self.eval_block(block, &Environment::child(env)),
            Stmt::ExprStmt { expr, .. } => self.eval_expr(expr, env),
            Stmt::Import { path, derived_name, .. } => {
                let module = self.resolver.resolve(&env.current_file(), path);
                if module.is_error() {
                    return module;
                }
                env.declare(derived_name.clone(), module);
                Value::Null
            }
        }
    }

    fn bind_declaration(
        &self,
        name: &str,
        type_expr: Option<&totalscript_parser::ast::TypeExpr>,
        value: Value,
        env: &Environment,
    ) -> Value {
        let value = if let Some(t) = type_expr {
            match validate_and_coerce(value, t, env) {
                Ok(v) => v,
                Err(msg) => return Value::error(msg),
            }
        } else {
            value
        };
        if let Value::Model(m) = &value {
            *m.name.borrow_mut() = name.to_string();
        }
        if let Value::Enum(e) = &value {
            *e.name.borrow_mut() = name.to_string();
            for member in e.members.values() {
                *member.enum_name.borrow_mut() = name.to_string();
            }
        }
        env.declare(name.to_string(), value);
        if let Some(t) = type_expr {
            env.declare_type(name.to_string(), t.clone());
        }
        Value::Null
    }

    fn eval_while(&self, cond: &Expr, body: &totalscript_parser::ast::Block, env: &Environment) -> Value {
        loop {
            let c = self.eval_expr(cond, env);
            if c.is_error() {
                return c;
            }
            if !c.is_truthy() {
                return Value::Null;
            }
            let r = self.eval_block(body, &Environment::child(env));
            match r {
                Value::Break => return Value::Null,
                Value::Continue => continue,
                Value::Return(_) | Value::Error(_) => return r,
                _ => {}
            }
        }
    }

    fn eval_for_in(&self, for_in: &ForIn, env: &Environment) -> Value {
        let iterable = self.eval_expr(&for_in.iterable, env);
        if iterable.is_error() {
            return iterable;
        }
        match &iterable {
            Value::Array(a) => {
                let elems = a.borrow().clone();
                for (i, elem) in elems.into_iter().enumerate() {
                    let scope = Environment::child(env);
                    scope.declare(for_in.value_name.clone(), elem);
                    if let Some(idx_name) = &for_in.index_name {
                        scope.declare(idx_name.clone(), Value::Integer(i as i64));
                    }
                    let r = self.eval_block(&for_in.body, &scope);
                    match r {
                        Value::Break => break,
                        Value::Continue => continue,
                        Value::Return(_) | Value::Error(_) => return r,
                        _ => {}
                    }
                }
                Value::Null
            }
            Value::Map(m) => {
                let pairs: Vec<(String, Value)> =
                    m.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                for (k, v) in pairs {
                    let scope = Environment::child(env);
                    scope.declare(for_in.value_name.clone(), v);
                    if let Some(idx_name) = &for_in.index_name {
                        scope.declare(idx_name.clone(), Value::string(k));
                    }
                    let r = self.eval_block(&for_in.body, &scope);
                    match r {
                        Value::Break => break,
                        Value::Continue => continue,
                        Value::Return(_) | Value::Error(_) => return r,
                        _ => {}
                    }
                }
                Value::Null
            }
            other => Value::error(format!("cannot iterate over {}", other.type_name())),
        }
    }

    fn eval_for_c(&self, for_c: &ForC, env: &Environment) -> Value {
        let scope = Environment::child(env);
        let init_r = self.eval_stmt(&for_c.init, &scope);
        if init_r.is_error() {
            return init_r;
        }
        loop {
            let c = self.eval_expr(&for_c.cond, &scope);
            if c.is_error() {
                return c;
            }
            if !c.is_truthy() {
                return Value::Null;
            }
            let r = self.eval_block(&for_c.body, &Environment::child(&scope));
            match r {
                Value::Break => return Value::Null,
                Value::Return(_) | Value::Error(_) => return r,
                _ => {}
            }
            let post_r = self.eval_stmt(&for_c.post, &scope);
            if post_r.is_error() {
                return post_r;
            }
        }
    }

    fn eval_switch(
        &self,
        value: &Expr,
        cases: &[totalscript_parser::ast::SwitchCase],
        default: Option<&totalscript_parser::ast::Block>,
        env: &Environment,
    ) -> Value {
        let disc = self.eval_expr(value, env);
        if disc.is_error() {
            return disc;
        }
        for case in cases {
            for candidate in &case.candidates {
                let cv = self.eval_expr(candidate, env);
                if cv.is_error() {
                    return cv;
                }
                if values_equal(&disc, &cv) {
                    return self.eval_block(&case.body, &Environment::child(env));
                }
            }
        }
        match default {
            Some(block) => self.eval_block(block, &Environment::child(env)),
            None => Value::Null,
        }
    }

    fn eval_expr(&self, expr: &Expr, env: &Environment) -> Value {
        match expr {
            Expr::Ident { name, .. } => {
                env.get(name).unwrap_or_else(|| Value::error(format!("identifier not found: {name}")))
            }
            Expr::IntLit { value, .. } => Value::Integer(*value),
            Expr::FloatLit { value, .. } => Value::Float(*value),
            Expr::StrLit { value, .. } => Value::string(value.clone()),
            Expr::BoolLit { value, .. } => Value::Boolean(*value),
            Expr::NullLit { .. } => Value::Null,
            Expr::This { .. } => env
                .get("this")
                .unwrap_or_else(|| Value::error("'this' is not bound in this scope")),
            Expr::ArrayLit { elems, .. } => {
                let mut out = Vec::with_capacity(elems.len());
                for e in elems {
                    let v = self.eval_expr(e, env);
                    if v.is_error() {
                        return v;
                    }
                    out.push(v);
                }
                Value::array(out)
            }
            Expr::MapLit { pairs, .. } => {
                let mut out = IndexMap::new();
                for (k, v) in pairs {
                    let kv = self.eval_expr(k, env);
                    if kv.is_error() {
                        return kv;
                    }
                    let Value::Str(key) = kv else {
                        return Value::error("map key must be a string");
                    };
                    let vv = self.eval_expr(v, env);
                    if vv.is_error() {
                        return vv;
                    }
                    out.insert(key.to_string(), vv);
                }
                Value::map(out)
            }
            Expr::Prefix { op, right, .. } => {
                let r = self.eval_expr(right, env);
                if r.is_error() {
                    return r;
                }
                match op.as_str() {
                    "!" => Value::Boolean(!r.is_truthy()),
                    "-" => match r {
                        Value::Integer(n) => Value::Integer(-n),
                        Value::Float(f) => Value::Float(-f),
                        other => Value::error(format!("unknown operator: -{}", other.type_name())),
                    },
                    other => Value::error(format!("unknown operator: {other}")),
                }
            }
            Expr::Infix { op, left, right, .. } => self.eval_infix(op, left, right, env),
            Expr::If { cond, then_branch, else_branch, .. } => {
                self.eval_if(cond, then_branch, else_branch.as_deref(), env)
            }
            Expr::Function(f) => Value::Function(Rc::new(FunctionValue {
                params: f.params.clone(),
                return_type: f.return_type.clone(),
                body: f.body.clone(),
                env: env.clone(),
            })),
            Expr::Call { callee, args, .. } => {
                let callee_v = self.eval_expr(callee, env);
                if callee_v.is_error() {
                    return callee_v;
                }
                let mut arg_vals = Vec::with_capacity(args.len());
                for a in args {
                    let v = self.eval_expr(a, env);
                    if v.is_error() {
                        return v;
                    }
                    arg_vals.push(v);
                }
                self.call_value(&callee_v, &arg_vals)
            }
            Expr::Index { left, index, .. } => {
                let left_v = self.eval_expr(left, env);
                if left_v.is_error() {
                    return left_v;
                }
                self.eval_index(&left_v, index, env)
            }
            Expr::Member { object, name, .. } => {
                let obj = self.eval_expr(object, env);
                if obj.is_error() {
                    return obj;
                }
                self.eval_member(&obj, name)
            }
            Expr::Range { start, end, inclusive, .. } => {
                let (Some(start_expr), Some(end_expr)) = (start, end) else {
                    return Value::error("open-ended range requires both bounds when used as a value");
                };
                let a = match self.eval_expr(start_expr, env) {
                    Value::Integer(n) => n,
                    other if other.is_error() => return other,
                    other => return Value::error(format!("range bounds must be integers, got {}", other.type_name())),
                };
                let b = match self.eval_expr(end_expr, env) {
                    Value::Integer(n) => n,
                    other if other.is_error() => return other,
                    other => return Value::error(format!("range bounds must be integers, got {}", other.type_name())),
                };
                let b = if *inclusive { b + 1 } else { b };
                Value::array((a..b).map(Value::Integer).collect())
            }
            Expr::Model(m) => self.eval_model_lit(m, env),
            Expr::Enum(e) => self.eval_enum_lit(e, env),
            Expr::TypeExprLit { .. } => Value::error("type expressions are not valid runtime values"),
        }
    }

    fn eval_if(
        &self,
        cond: &Expr,
        then_branch: &totalscript_parser::ast::Block,
        else_branch: Option<&IfElse>,
        env: &Environment,
    ) -> Value {
        let c = self.eval_expr(cond, env);
        if c.is_error() {
            return c;
        }
        if c.is_truthy() {
            return self.eval_block(then_branch, env);
        }
        match else_branch {
            Some(IfElse::Block(block)) => self.eval_block(block, env),
            Some(IfElse::If(inner)) => self.eval_expr(inner, env),
            None => Value::Null,
        }
    }

    fn eval_model_lit(&self, m: &totalscript_parser::ast::ModelExpr, env: &Environment) -> Value {
        let fields: Vec<(String, totalscript_parser::ast::TypeExpr)> =
            m.fields.iter().map(|f| (f.name.clone(), f.type_expr.clone())).collect();
        let methods: IndexMap<String, Rc<FunctionValue>> = m
            .methods
            .iter()
            .map(|meth| {
                (
                    meth.name.clone(),
                    Rc::new(FunctionValue {
                        params: meth.function.params.clone(),
                        return_type: meth.function.return_type.clone(),
                        body: meth.function.body.clone(),
                        env: env.clone(),
                    }),
                )
            })
            .collect();
        let constructors: Vec<Rc<FunctionValue>> = m
            .constructors
            .iter()
            .map(|c| {
                Rc::new(FunctionValue {
                    params: c.params.clone(),
                    return_type: c.return_type.clone(),
                    body: c.body.clone(),
                    env: env.clone(),
                })
            })
            .collect();
        Value::Model(Rc::new(ModelValue {
            name: std::cell::RefCell::new(String::new()),
            fields,
            methods,
            constructors,
            env: env.clone(),
        }))
    }

    fn eval_enum_lit(&self, e: &totalscript_parser::ast::EnumExpr, env: &Environment) -> Value {
        let mut members = IndexMap::new();
        for member in &e.members {
            let underlying = self.eval_expr(&member.value, env);
            if underlying.is_error() {
                return underlying;
            }
            members.insert(
                member.name.clone(),
                Rc::new(EnumMemberValue {
                    enum_name: std::cell::RefCell::new(String::new()),
                    name: member.name.clone(),
                    underlying,
                }),
            );
        }
        Value::Enum(Rc::new(EnumDefValue { name: std::cell::RefCell::new(String::new()), members }))
    }

    // ── Indexing / member access ─────────────────────────────────────

    fn eval_index(&self, left: &Value, index_expr: &Expr, env: &Environment) -> Value {
        if let Expr::Range { start, end, inclusive, .. } = index_expr {
            return self.eval_slice(left, start.as_deref(), end.as_deref(), *inclusive, env);
        }
        let index = self.eval_expr(index_expr, env);
        if index.is_error() {
            return index;
        }
        match (left, &index) {
            (Value::Array(arr), Value::Integer(i)) => {
                let len = arr.borrow().len() as i64;
                let idx = if *i < 0 { len + i } else { *i };
                if idx < 0 || idx >= len {
                    Value::Null
                } else {
                    arr.borrow()[idx as usize].clone()
                }
            }
            (Value::Array(_), other) => {
                Value::error(format!("array index must be an integer, got {}", other.type_name()))
            }
            (Value::Map(m), Value::Str(k)) => m.borrow().get(k.as_ref()).cloned().unwrap_or(Value::Null),
            (Value::Map(_), other) => {
                Value::error(format!("map index must be a string, got {}", other.type_name()))
            }
            (other, _) => Value::error(format!("cannot index into {}", other.type_name())),
        }
    }

    fn eval_slice(
        &self,
        left: &Value,
        start: Option<&Expr>,
        end: Option<&Expr>,
        inclusive: bool,
        env: &Environment,
    ) -> Value {
        let Value::Array(arr) = left else {
            return Value::error(format!("cannot slice {}", left.type_name()));
        };
        let len = arr.borrow().len() as i64;
        let a = match start {
            Some(e) => match self.eval_expr(e, env) {
                Value::Integer(n) => n,
                other if other.is_error() => return other,
                other => return Value::error(format!("range bounds must be integers, got {}", other.type_name())),
            },
            None => 0,
        };
        let b = match end {
            Some(e) => match self.eval_expr(e, env) {
                Value::Integer(n) => n,
                other if other.is_error() => return other,
                other => return Value::error(format!("range bounds must be integers, got {}", other.type_name())),
            },
            None => len,
        };
        let a = if a < 0 { len + a } else { a };
        let b = if b < 0 { len + b } else { b };
        let b = if inclusive { b + 1 } else { b };
        let a = a.clamp(0, len);
        let b = b.clamp(a, len);
        Value::array(arr.borrow()[a as usize..b as usize].to_vec())
    }

    fn eval_member(&self, obj: &Value, name: &str) -> Value {
        match obj {
            Value::Module(m) => m
                .scope
                .get(name)
                .unwrap_or_else(|| Value::error(format!("identifier not found: {name}"))),
            Value::ModelInstance(inst) => {
                if let Some(v) = inst.fields.borrow().get(name) {
                    return v.clone();
                }
                match inst.model.methods.get(name) {
                    Some(method) => self.bind_method(obj, method),
                    None => Value::error("member access not supported".to_string()),
                }
            }
            Value::Enum(e) => {
                if name == "values" {
                    return Value::BoundMethod(
                        Box::new(obj.clone()),
                        Rc::new(BuiltinValue { name: "values", func: enum_values }),
                    );
                }
                if name == "fromValue" {
                    return Value::BoundMethod(
                        Box::new(obj.clone()),
                        Rc::new(BuiltinValue { name: "fromValue", func: enum_from_value }),
                    );
                }
                match e.members.get(name) {
                    Some(member) => Value::EnumValue(member.clone()),
                    None => Value::error(format!("member access not supported: {name}")),
                }
            }
            Value::EnumValue(ev) => {
                if name == "value" {
                    ev.underlying.clone()
                } else {
                    Value::error(format!("member access not supported: {name}"))
                }
            }
            Value::Model(m) => match m.methods.get(name) {
                Some(method) => Value::Function(method.clone()),
                None => Value::error("member access not supported".to_string()),
            },
            other => match totalscript_object::builtins::lookup_builtin(other.type_tag(), name) {
                Some(builtin) => Value::BoundMethod(Box::new(other.clone()), Rc::new(builtin)),
                None => Value::error("member access not supported".to_string()),
            },
        }
    }

    /// Build a fresh `Function` closing over the method's original defining
    /// scope with `this` bound to `receiver` — the idiomatic way to get a
    /// "pre-bound receiver" callable without the registry's `BoundMethod`
    /// machinery, which only knows how to wrap Rust builtins.
    fn bind_method(&self, receiver: &Value, method: &Rc<FunctionValue>) -> Value {
        let bound_env = Environment::child(&method.env);
        bound_env.declare("this", receiver.clone());
        Value::Function(Rc::new(FunctionValue {
            params: method.params.clone(),
            return_type: method.return_type.clone(),
            body: method.body.clone(),
            env: bound_env,
        }))
    }

    // ── Calling ───────────────────────────────────────────────────────

    pub fn call_value(&self, callee: &Value, args: &[Value]) -> Value {
        match callee {
            Value::Function(f) => self.call_function(f, args),
            Value::Builtin(b) => (b.func)(&Value::Null, args, &|f, a| self.call_value(f, a)),
            Value::BoundMethod(receiver, b) => (b.func)(receiver, args, &|f, a| self.call_value(f, a)),
            Value::Model(m) => self.call_model(m, args),
            other => Value::error(format!("not callable: {}", other.type_name())),
        }
    }

    fn call_function(&self, f: &Rc<FunctionValue>, args: &[Value]) -> Value {
        if f.params.len() != args.len() {
            return Value::error(format!(
                "wrong number of arguments: expected {}, got {}",
                f.params.len(),
                args.len()
            ));
        }
        let scope = Environment::child(&f.env);
        for (param, arg) in f.params.iter().zip(args.iter()) {
            let bound = match &param.type_expr {
                Some(t) => match validate_and_coerce(arg.clone(), t, &f.env) {
                    Ok(v) => v,
                    Err(msg) => return Value::error(msg),
                },
                None => arg.clone(),
            };
            scope.declare(param.name.clone(), bound);
            if let Some(t) = &param.type_expr {
                scope.declare_type(param.name.clone(), t.clone());
            }
        }
        match self.eval_block(&f.body, &scope) {
            Value::Return(v) => *v,
            other => other,
        }
    }

    fn call_model(&self, m: &Rc<ModelValue>, args: &[Value]) -> Value {
        if !m.constructors.is_empty() {
            match m.constructors.iter().find(|c| c.params.len() == args.len()) {
                Some(ctor) => self.invoke_constructor(m, ctor, args),
                None => Value::error(format!(
                    "wrong number of arguments: no constructor accepts {} arguments",
                    args.len()
                )),
            }
        } else {
            self.default_construct(m, args)
        }
    }

    fn default_construct(&self, m: &Rc<ModelValue>, args: &[Value]) -> Value {
        if args.len() != m.fields.len() {
            return Value::error(format!(
                "wrong number of arguments: expected {}, got {}",
                m.fields.len(),
                args.len()
            ));
        }
        let mut fields = IndexMap::new();
        for ((fname, ftype), arg) in m.fields.iter().zip(args.iter()) {
            let coerced = match validate_and_coerce(arg.clone(), ftype, &m.env) {
                Ok(v) => v,
                Err(msg) => return Value::error(msg),
            };
            fields.insert(fname.clone(), coerced);
        }
        Value::ModelInstance(Rc::new(ModelInstanceValue { model: m.clone(), fields: std::cell::RefCell::new(fields) }))
    }

    /// Pre-populates the instance's declared fields with `Null`, binds
    /// `this`, runs the constructor body (which assigns real values via
    /// `this.field = ...`), and returns the populated instance regardless
    /// of what the body's own last expression evaluates to.
    fn invoke_constructor(&self, m: &Rc<ModelValue>, ctor: &Rc<FunctionValue>, args: &[Value]) -> Value {
        let mut initial = IndexMap::new();
        for (fname, _) in &m.fields {
            initial.insert(fname.clone(), Value::Null);
        }
        let instance = Rc::new(ModelInstanceValue { model: m.clone(), fields: std::cell::RefCell::new(initial) });
        let scope = Environment::child(&ctor.env);
        scope.declare("this", Value::ModelInstance(instance.clone()));
        for (param, arg) in ctor.params.iter().zip(args.iter()) {
            let bound = match &param.type_expr {
                Some(t) => match validate_and_coerce(arg.clone(), t, &ctor.env) {
                    Ok(v) => v,
                    Err(msg) => return Value::error(msg),
                },
                None => arg.clone(),
            };
            scope.declare(param.name.clone(), bound);
        }
        let result = self.eval_block(&ctor.body, &scope);
        if result.is_error() {
            return result;
        }
        Value::ModelInstance(instance)
    }

    // ── Binary operators ─────────────────────────────────────────────

    fn eval_infix(&self, op: &str, left: &Expr, right: &Expr, env: &Environment) -> Value {
        if is_assignment_op(op) {
            return self.eval_assignment(op, left, right, env);
        }
        let l = self.eval_expr(left, env);
        if l.is_error() {
            return l;
        }
        let r = self.eval_expr(right, env);
        if r.is_error() {
            return r;
        }
        apply_binary(op, &l, &r)
    }

    fn eval_assignment(&self, op: &str, target: &Expr, rhs_expr: &Expr, env: &Environment) -> Value {
        let rhs = self.eval_expr(rhs_expr, env);
        if rhs.is_error() {
            return rhs;
        }
        match target {
            Expr::Ident { name, .. } => self.assign_ident(op, name, rhs, env),
            Expr::Index { left, index, .. } => self.assign_index(op, left, index, rhs, env),
            Expr::Member { object, name, .. } => self.assign_member(op, object, name, rhs, env),
            _ => Value::error("invalid assignment target"),
        }
    }

    fn assign_ident(&self, op: &str, name: &str, rhs: Value, env: &Environment) -> Value {
        let new_val = if op == "=" {
            rhs
        } else {
            let current = match env.get(name) {
                Some(v) => v,
                None => return Value::error(format!("identifier not found: {name}")),
            };
            apply_binary(compound_op(op), &current, &rhs)
        };
        if new_val.is_error() {
            return new_val;
        }
        let new_val = if let Some(t) = env.get_type(name) {
            match validate_and_coerce(new_val, &t, env) {
                Ok(v) => v,
                Err(msg) => return Value::error(msg),
            }
        } else {
            new_val
        };
        env.set(name, new_val.clone());
        new_val
    }

    fn assign_index(&self, op: &str, left: &Expr, index: &Expr, rhs: Value, env: &Environment) -> Value {
        let target = self.eval_expr(left, env);
        if target.is_error() {
            return target;
        }
        match &target {
            Value::Array(arr) => {
                let idx = self.eval_expr(index, env);
                let idx = match idx {
                    Value::Integer(n) => n,
                    other if other.is_error() => return other,
                    other => return Value::error(format!("array index must be an integer, got {}", other.type_name())),
                };
                let len = arr.borrow().len() as i64;
                let i = if idx < 0 { len + idx } else { idx };
                if i < 0 || i >= len {
                    return Value::error("index out of bounds");
                }
                let new_val = if op == "=" {
                    rhs
                } else {
                    let current = arr.borrow()[i as usize].clone();
                    apply_binary(compound_op(op), &current, &rhs)
                };
                if new_val.is_error() {
                    return new_val;
                }
                arr.borrow_mut()[i as usize] = new_val.clone();
                new_val
            }
            Value::Map(m) => {
                let key = self.eval_expr(index, env);
                let key = match key {
                    Value::Str(s) => s,
                    other if other.is_error() => return other,
                    other => return Value::error(format!("map index must be a string, got {}", other.type_name())),
                };
                let new_val = if op == "=" {
                    rhs
                } else {
                    let current = m.borrow().get(key.as_ref()).cloned().unwrap_or(Value::Null);
                    apply_binary(compound_op(op), &current, &rhs)
                };
                if new_val.is_error() {
                    return new_val;
                }
                m.borrow_mut().insert(key.to_string(), new_val.clone());
                new_val
            }
            other => Value::error(format!("cannot assign to index of {}", other.type_name())),
        }
    }

    fn assign_member(&self, op: &str, object: &Expr, name: &str, rhs: Value, env: &Environment) -> Value {
        let obj = self.eval_expr(object, env);
        if obj.is_error() {
            return obj;
        }
        let Value::ModelInstance(inst) = &obj else {
            return Value::error(format!("cannot assign to {name} on {}", obj.type_name()));
        };
        if !inst.fields.borrow().contains_key(name) {
            return Value::error(format!("cannot assign to {name}"));
        }
        let new_val = if op == "=" {
            rhs
        } else {
            let current = inst.fields.borrow().get(name).cloned().unwrap_or(Value::Null);
            apply_binary(compound_op(op), &current, &rhs)
        };
        if new_val.is_error() {
            return new_val;
        }
        let ftype = inst.model.fields.iter().find(|(n, _)| n == name).map(|(_, t)| t.clone());
        let new_val = if let Some(t) = ftype {
            match validate_and_coerce(new_val, &t, &inst.model.env) {
                Ok(v) => v,
                Err(msg) => return Value::error(msg),
            }
        } else {
            new_val
        };
        inst.fields.borrow_mut().insert(name.to_string(), new_val.clone());
        new_val
    }
}

fn is_assignment_op(op: &str) -> bool {
    matches!(op, "=" | "+=" | "-=" | "*=" | "/=" | "%=")
}

fn compound_op(op: &str) -> &str {
    &op[..op.len() - 1]
}

fn apply_binary(op: &str, left: &Value, right: &Value) -> Value {
    match op {
        "==" => Value::Boolean(values_equal(left, right)),
        "!=" => Value::Boolean(!values_equal(left, right)),
        "&&" => Value::Boolean(left.is_truthy() && right.is_truthy()),
        "||" => Value::Boolean(left.is_truthy() || right.is_truthy()),
        "is" => eval_is(left, right),
        "<" | ">" | "<=" | ">=" => compare(op, left, right),
        "+" => add(left, right),
        "-" | "*" | "/" | "//" | "%" | "**" => arith(op, left, right),
        other => Value::error(format!("unknown operator: {other}")),
    }
}

fn eval_is(left: &Value, right: &Value) -> Value {
    match right {
        Value::Model(m) => Value::Boolean(matches!(left, Value::ModelInstance(inst) if Rc::ptr_eq(&inst.model, m))),
        Value::Enum(e) => Value::Boolean(
            matches!(left, Value::EnumValue(ev) if *ev.enum_name.borrow() == *e.name.borrow()),
        ),
        _ => Value::Boolean(false),
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Integer(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn compare(op: &str, left: &Value, right: &Value) -> Value {
    let ordering = match (left, right) {
        (Value::Str(a), Value::Str(b)) => a.as_ref().partial_cmp(b.as_ref()),
        _ => match (as_f64(left), as_f64(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Value::error(format!(
                    "type mismatch: cannot compare {} and {}",
                    left.type_name(),
                    right.type_name()
                ))
            }
        },
    };
    let Some(ordering) = ordering else {
        return Value::error("comparison produced no ordering (NaN?)".to_string());
    };
    use std::cmp::Ordering::*;
    let result = match op {
        "<" => ordering == Less,
        ">" => ordering == Greater,
        "<=" => ordering != Greater,
        ">=" => ordering != Less,
        _ => unreachable!(),
    };
    Value::Boolean(result)
}

fn add(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Value::string(format!("{a}{b}")),
        _ => arith("+", left, right),
    }
}

fn arith(op: &str, left: &Value, right: &Value) -> Value {
    if let (Value::Integer(a), Value::Integer(b)) = (left, right) {
        return match op {
            "+" => Value::Integer(a.wrapping_add(*b)),
            "-" => Value::Integer(a.wrapping_sub(*b)),
            "*" => Value::Integer(a.wrapping_mul(*b)),
            "/" => {
                if *b == 0 {
                    Value::error("division by zero")
                } else {
                    Value::Float(*a as f64 / *b as f64)
                }
            }
            "//" => {
                if *b == 0 {
                    Value::error("division by zero")
                } else {
                    Value::Integer(a / b)
                }
            }
            "%" => {
                if *b == 0 {
                    Value::error("division by zero")
                } else {
                    Value::Integer(a % b)
                }
            }
            "**" => {
                if *b >= 0 {
                    Value::Integer(a.wrapping_pow(*b as u32))
                } else {
                    Value::Float((*a as f64).powf(*b as f64))
                }
            }
            _ => Value::error(format!("unknown operator: {op}")),
        };
    }
    match (as_f64(left), as_f64(right)) {
        (Some(a), Some(b)) => match op {
            "+" => Value::Float(a + b),
            "-" => Value::Float(a - b),
            "*" => Value::Float(a * b),
            "/" => {
                if b == 0.0 {
                    Value::error("division by zero")
                } else {
                    Value::Float(a / b)
                }
            }
            "//" => {
                if b == 0.0 {
                    Value::error("division by zero")
                } else {
                    Value::Float((a / b).floor())
                }
            }
            "%" => {
                if b == 0.0 {
                    Value::error("division by zero")
                } else {
                    Value::Float(a % b)
                }
            }
            "**" => Value::Float(a.powf(b)),
            _ => Value::error(format!("unknown operator: {op}")),
        },
        _ => Value::error(format!(
            "type mismatch: cannot apply {op} to {} and {}",
            left.type_name(),
            right.type_name()
        )),
    }
}

fn enum_values(receiver: &Value, _args: &[Value], _call: totalscript_object::CallFn) -> Value {
    match receiver {
        Value::Enum(e) => Value::array(e.members.values().map(|m| Value::EnumValue(m.clone())).collect()),
        other => Value::error(format!("internal: expected enum receiver, got {}", other.type_name())),
    }
}

fn enum_from_value(receiver: &Value, args: &[Value], _call: totalscript_object::CallFn) -> Value {
    let Value::Enum(e) = receiver else {
        return Value::error(format!("internal: expected enum receiver, got {}", receiver.type_name()));
    };
    let Some(target) = args.first() else {
        return Value::error("fromValue expects one argument");
    };
    e.members
        .values()
        .find(|m| values_equal(&m.underlying, target))
        .map(|m| Value::EnumValue(m.clone()))
        .unwrap_or_else(|| Value::error(format!("no enum value with underlying {}", target.inspect())))
}
