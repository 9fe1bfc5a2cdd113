//! Resolves `import "PATH" [as ALIAS]` per the file-module vs. stdlib-module
//! split: a `./`/`../`-prefixed path is read from disk and evaluated; any
//! other name is looked up in the stdlib builder registry.

use std::path::Path;

use totalscript_eval::{Interpreter, ModuleResolver};
use totalscript_object::{Environment, ModuleValue, Value};
use std::rc::Rc;

use crate::cache;
use crate::stdlib;

pub struct ModuleSystem;

impl ModuleResolver for ModuleSystem {
    fn resolve(&self, importer_file: &str, path: &str) -> Value {
        if is_relative(path) {
            self.resolve_file(importer_file, path)
        } else {
            self.resolve_stdlib(path)
        }
    }
}

impl ModuleSystem {
    fn resolve_file(&self, importer_file: &str, path: &str) -> Value {
        let with_ext = if path.ends_with(".tsl") { path.to_string() } else { format!("{path}.tsl") };
        let importer_dir = Path::new(importer_file).parent().unwrap_or_else(|| Path::new("."));
        let joined = importer_dir.join(&with_ext);
        let abs = match canonicalize(&joined) {
            Some(p) => p,
            None => return Value::error(format!("failed to read module file: {path}")),
        };

        if let Some(cached) = cache::get_file_module(path, &abs) {
            return cached;
        }

        let source = match std::fs::read_to_string(&abs) {
            Ok(s) => s,
            Err(_) => return Value::error(format!("failed to read module file: {path}")),
        };

        let (program, errors) = totalscript_parser::parse(&source);
        if !errors.is_empty() {
            let joined_errors = errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
            return Value::error(format!("parse errors in module {abs}: {joined_errors}"));
        }

        let module_env = Environment::root(abs.clone());
        let interp = Interpreter::new(self);
        let result = interp.eval_program(&program, &module_env);
        if let Value::Error(msg) = result {
            return Value::error(format!("runtime error in module {abs}: {msg}"));
        }

        let derived_name = Path::new(&abs)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| abs.clone());
        let module = Value::Module(Rc::new(ModuleValue { name: derived_name, scope: module_env }));
        cache::insert_file_module(path, &abs, module.clone());
        module
    }

    fn resolve_stdlib(&self, name: &str) -> Value {
        if let Some(cached) = cache::get_stdlib_module(name) {
            return cached;
        }
        let Some(module) = stdlib::build(name) else {
            return Value::error("unknown stdlib module");
        };
        cache::insert_stdlib_module(name, module.clone());
        module
    }
}

fn is_relative(path: &str) -> bool {
    path.starts_with("./") || path.starts_with("../")
}

/// Resolves and verifies existence in one step: a path that doesn't resolve
/// to a real file is indistinguishable from one that can't be read.
fn canonicalize(path: &Path) -> Option<String> {
    std::fs::canonicalize(path).ok().map(|p| p.to_string_lossy().to_string())
}
