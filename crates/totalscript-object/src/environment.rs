//! Lexically nested scopes. `set` walks the parent chain and writes through
//! to whichever ancestor already owns the name, which is what lets `x = 1`
//! inside a loop body mutate an outer `x` instead of shadowing it.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use totalscript_parser::ast::TypeExpr;

use crate::value::Value;

struct EnvInner {
    bindings: IndexMap<String, Value>,
    types: IndexMap<String, TypeExpr>,
    parent: Option<Environment>,
    current_file: Rc<String>,
}

/// Cheap to clone: every clone shares the same underlying scope.
#[derive(Clone)]
pub struct Environment(Rc<RefCell<EnvInner>>);

impl Environment {
    pub fn root(current_file: impl Into<String>) -> Self {
        Environment(Rc::new(RefCell::new(EnvInner {
            bindings: IndexMap::new(),
            types: IndexMap::new(),
            parent: None,
            current_file: Rc::new(current_file.into()),
        })))
    }

    /// A nested scope (function call frame, block, loop iteration) that
    /// inherits the parent's current-file and falls back to it for lookups.
    pub fn child(parent: &Environment) -> Self {
        Environment(Rc::new(RefCell::new(EnvInner {
            bindings: IndexMap::new(),
            types: IndexMap::new(),
            parent: Some(parent.clone()),
            current_file: parent.0.borrow().current_file.clone(),
        })))
    }

    pub fn current_file(&self) -> Rc<String> {
        self.0.borrow().current_file.clone()
    }

    /// Bind `name` in *this* scope, regardless of whether an ancestor
    /// already owns it. Used by `var`, `const`, parameter binding, and
    /// loop-variable binding.
    pub fn declare(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().bindings.insert(name.into(), value);
    }

    pub fn declare_type(&self, name: impl Into<String>, type_expr: TypeExpr) {
        self.0.borrow_mut().types.insert(name.into(), type_expr);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let inner = self.0.borrow();
        if let Some(v) = inner.bindings.get(name) {
            return Some(v.clone());
        }
        inner.parent.as_ref().and_then(|p| p.get(name))
    }

    pub fn get_type(&self, name: &str) -> Option<TypeExpr> {
        let inner = self.0.borrow();
        if let Some(t) = inner.types.get(name) {
            return Some(t.clone());
        }
        inner.parent.as_ref().and_then(|p| p.get_type(name))
    }

    /// Update `name` at the ancestor scope that already binds it; create it
    /// in this scope if no ancestor does. Returns `true` if an existing
    /// binding was updated (informational only, callers don't need to act
    /// differently either way).
    pub fn set(&self, name: &str, value: Value) -> bool {
        if self.0.borrow().bindings.contains_key(name) {
            self.0.borrow_mut().bindings.insert(name.to_string(), value);
            return true;
        }
        let parent = self.0.borrow().parent.clone();
        if let Some(parent) = parent {
            if parent.set(name, value.clone()) {
                return true;
            }
        }
        self.0.borrow_mut().bindings.insert(name.to_string(), value);
        false
    }

    pub fn set_type(&self, name: &str, type_expr: TypeExpr) {
        if self.0.borrow().types.contains_key(name) {
            self.0.borrow_mut().types.insert(name.to_string(), type_expr);
            return;
        }
        let parent = self.0.borrow().parent.clone();
        if let Some(parent) = parent {
            parent.set_type(name, type_expr);
            return;
        }
        self.0.borrow_mut().types.insert(name.to_string(), type_expr);
    }

    pub fn is_bound_here(&self, name: &str) -> bool {
        self.0.borrow().bindings.contains_key(name)
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("bindings", &self.0.borrow().bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_walks_parent_chain() {
        let root = Environment::root("main.tsl");
        root.declare("x", Value::Integer(1));
        let child = Environment::child(&root);
        assert_eq!(child.get("x"), Some(Value::Integer(1)));
    }

    #[test]
    fn set_writes_through_to_ancestor() {
        let root = Environment::root("main.tsl");
        root.declare("x", Value::Integer(0));
        let child = Environment::child(&root);
        child.set("x", Value::Integer(5));
        assert_eq!(root.get("x"), Some(Value::Integer(5)));
        assert!(!child.is_bound_here("x"));
    }

    #[test]
    fn set_with_no_existing_binding_creates_locally() {
        let root = Environment::root("main.tsl");
        let child = Environment::child(&root);
        child.set("y", Value::Integer(9));
        assert!(child.is_bound_here("y"));
        assert_eq!(root.get("y"), None);
    }

    #[test]
    fn declare_always_targets_current_scope() {
        let root = Environment::root("main.tsl");
        root.declare("x", Value::Integer(1));
        let child = Environment::child(&root);
        child.declare("x", Value::Integer(2));
        assert_eq!(child.get("x"), Some(Value::Integer(2)));
        assert_eq!(root.get("x"), Some(Value::Integer(1)));
    }

    #[test]
    fn child_inherits_current_file() {
        let root = Environment::root("/abs/main.tsl");
        let child = Environment::child(&root);
        assert_eq!(*child.current_file(), "/abs/main.tsl".to_string());
    }
}
