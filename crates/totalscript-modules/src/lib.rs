//! Module resolution, the process-wide module cache, and the standard
//! library builders that back `import "math"`, `import "json"`, etc.
//!
//! - [`resolver`]: implements `totalscript_eval::ModuleResolver`, splitting
//!   `import` targets into file modules (read, parsed, evaluated) and
//!   stdlib modules (looked up in [`stdlib`]).
//! - [`cache`]: the shared cache both paths consult, plus the
//!   list-loaded/clear lifecycle operations the reload collaborator needs.
//! - [`stdlib`]: builder functions for `math`, `json`, `fs`, `time`, `os`,
//!   and the `http`/`db` registration-only stubs.

mod cache;
mod resolver;
mod stdlib;

pub use cache::{clear, list_loaded_file_modules};
pub use resolver::ModuleSystem;
