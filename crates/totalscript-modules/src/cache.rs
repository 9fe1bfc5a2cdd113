//! Process-wide module cache. Read-mostly: every evaluation reads through
//! it on `import`, and it is only written on a cache miss or when the
//! external reload collaborator calls [`clear`].

use std::cell::RefCell;
use std::collections::HashMap;

use totalscript_object::Value;

#[derive(Default)]
pub(crate) struct ModuleCache {
    /// Keyed by canonical absolute path.
    file_modules: HashMap<String, Value>,
    /// Original import string -> absolute path, so a second `import` using
    /// the same literal string skips re-canonicalizing it.
    aliases: HashMap<String, String>,
    stdlib_modules: HashMap<String, Value>,
}

thread_local! {
    static CACHE: RefCell<ModuleCache> = RefCell::new(ModuleCache::default());
}

pub(crate) fn get_file_module(original: &str, abs_path: &str) -> Option<Value> {
    CACHE.with(|cache| {
        let guard = cache.borrow();
        if let Some(v) = guard.file_modules.get(abs_path) {
            return Some(v.clone());
        }
        guard.aliases.get(original).and_then(|p| guard.file_modules.get(p)).cloned()
    })
}

pub(crate) fn insert_file_module(original: &str, abs_path: &str, module: Value) {
    CACHE.with(|cache| {
        let mut guard = cache.borrow_mut();
        guard.file_modules.insert(abs_path.to_string(), module);
        guard.aliases.insert(original.to_string(), abs_path.to_string());
    });
    log::debug!("cached file module {abs_path}");
}

pub(crate) fn get_stdlib_module(name: &str) -> Option<Value> {
    CACHE.with(|cache| cache.borrow().stdlib_modules.get(name).cloned())
}

pub(crate) fn insert_stdlib_module(name: &str, module: Value) {
    CACHE.with(|cache| {
        cache.borrow_mut().stdlib_modules.insert(name.to_string(), module);
    });
    log::debug!("registered stdlib module {name}");
}

/// Absolute paths of every file module currently cached, for the external
/// reload collaborator.
pub fn list_loaded_file_modules() -> Vec<String> {
    CACHE.with(|cache| cache.borrow().file_modules.keys().cloned().collect())
}

/// Drop every cache entry, file and stdlib alike, so the next `import`
/// re-reads and re-evaluates from scratch.
pub fn clear() {
    CACHE.with(|cache| {
        let mut guard = cache.borrow_mut();
        guard.file_modules.clear();
        guard.aliases.clear();
        guard.stdlib_modules.clear();
    });
    log::debug!("module cache cleared");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        clear();
        insert_file_module("./a.tsl", "/abs/a.tsl", Value::Integer(1));
        assert_eq!(get_file_module("./a.tsl", "/abs/a.tsl"), Some(Value::Integer(1)));
        assert_eq!(get_file_module("./different.tsl", "/abs/a.tsl"), Some(Value::Integer(1)));
    }

    #[test]
    fn clear_empties_both_tables() {
        clear();
        insert_file_module("./b.tsl", "/abs/b.tsl", Value::Integer(2));
        insert_stdlib_module("math", Value::Integer(3));
        clear();
        assert_eq!(get_file_module("./b.tsl", "/abs/b.tsl"), None);
        assert_eq!(get_stdlib_module("math"), None);
        assert!(list_loaded_file_modules().is_empty());
    }
}
