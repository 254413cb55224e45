// The Pyrite compiler core: contexts, the value-lattice operator
// evaluator, the annotation and analysis passes, and the compilation
// driver with its fragment cache.
//
// Lexing and parsing live in their own crates; this crate strings the
// pipeline together per module and owns all cross-module state in
// GlobalContext.

pub mod analysis;
pub mod annotation;
pub mod builtins;
pub mod contexts;
pub mod debug;
pub mod driver;
pub mod operators;
mod resolver;

pub use contexts::{
    ClassContext, Fragment, FunctionContext, GlobalContext, ModuleContext, ModuleRef, Phase,
};
pub use debug::{debug_flag_for_name, DebugFlag, DebugFlags};
pub use driver::{advance_module_phase, get_module_at_phase, resolve_function_call};
