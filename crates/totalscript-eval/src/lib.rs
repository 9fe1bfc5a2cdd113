//! Tree-walking evaluation of a parsed program.
//!
//! - [`interpreter`]: `Interpreter::eval_program` and every `eval_*` /
//!   `call_*` helper it delegates to, plus the [`interpreter::ModuleResolver`]
//!   trait implemented by the module system crate.
//! - [`validate`]: the type validator and coercer consulted at every
//!   annotated boundary (declarations, parameters, model fields).

pub mod interpreter;
pub mod validate;

pub use interpreter::{Interpreter, ModuleResolver};
pub use validate::{coerce, validate, validate_and_coerce};
