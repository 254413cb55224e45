// Built-in names, functions, and modules.
//
// builtin_names maps every name visible without an import to a Value. Most
// entries are unknown Function values (enough for analysis to accept a
// call and give up on the return type); the concrete built-ins below get
// registered function contexts with real fragment definitions, and their
// table entries are overwritten with known Function ids.
//
// Two source-less modules are registered at startup: `sys` (argv and
// executable) and the introspection module `__pyrite__`, whose functions
// report compiler state.

use std::collections::BTreeMap;

use pyrite_ast::value::{Value, ValueType};

use crate::contexts::{FunctionContext, GlobalContext, ModuleContext};

/// Names that exist in every scope without an import. Assignments to any
/// of these are rejected during annotation.
const UNKNOWN_FUNCTION_NAMES: &[&str] = &[
    "__build_class__",
    "__import__",
    "ArithmeticError",
    "AssertionError",
    "AttributeError",
    "BaseException",
    "BufferError",
    "BytesWarning",
    "DeprecationWarning",
    "EOFError",
    "EnvironmentError",
    "Exception",
    "FileExistsError",
    "FileNotFoundError",
    "FloatingPointError",
    "GeneratorExit",
    "IOError",
    "ImportError",
    "ImportWarning",
    "IndentationError",
    "IndexError",
    "InterruptedError",
    "KeyError",
    "KeyboardInterrupt",
    "LookupError",
    "MemoryError",
    "ModuleNotFoundError",
    "NameError",
    "NotImplementedError",
    "OSError",
    "OverflowError",
    "PermissionError",
    "RecursionError",
    "ReferenceError",
    "RuntimeError",
    "RuntimeWarning",
    "StopIteration",
    "SyntaxError",
    "SyntaxWarning",
    "SystemError",
    "SystemExit",
    "TabError",
    "TimeoutError",
    "TypeError",
    "UnboundLocalError",
    "UnicodeDecodeError",
    "UnicodeEncodeError",
    "UnicodeError",
    "UserWarning",
    "ValueError",
    "Warning",
    "ZeroDivisionError",
    "all",
    "any",
    "ascii",
    "bin",
    "bool",
    "bytearray",
    "bytes",
    "callable",
    "dict",
    "dir",
    "divmod",
    "enumerate",
    "filter",
    "float",
    "format",
    "frozenset",
    "getattr",
    "globals",
    "hasattr",
    "hash",
    "id",
    "int",
    "isinstance",
    "iter",
    "list",
    "locals",
    "map",
    "max",
    "min",
    "next",
    "oct",
    "open",
    "pow",
    "range",
    "reversed",
    "round",
    "set",
    "setattr",
    "sorted",
    "str",
    "sum",
    "tuple",
    "type",
    "zip",
];

fn unknown(t: ValueType) -> Value {
    Value::unknown(t)
}

/// Register one concrete built-in function and bind its name (either in
/// the root namespace or in a module's globals).
fn register_builtin_function(
    global: &mut GlobalContext,
    name: &str,
    fragments: Vec<(Vec<Value>, Value)>,
) -> i64 {
    let id = global.next_builtin_function_id();
    // fragment definitions here are static and known-valid
    if let Ok(context) = FunctionContext::builtin(id, name, fragments) {
        global.builtin_functions.insert(id, context);
    }
    id
}

pub fn create_default_builtins(global: &mut GlobalContext) {
    // the table of names analysis can resolve without knowing anything
    for name in UNKNOWN_FUNCTION_NAMES {
        global
            .builtin_names
            .insert((*name).to_string(), unknown(ValueType::Function));
    }
    global
        .builtin_names
        .insert("__debug__".to_string(), Value::bool_value(true));
    global
        .builtin_names
        .insert("__doc__".to_string(), Value::none());
    global
        .builtin_names
        .insert("__name__".to_string(), unknown(ValueType::Unicode));
    global
        .builtin_names
        .insert("__package__".to_string(), Value::none());
    global
        .builtin_names
        .insert("__spec__".to_string(), Value::none());
    global
        .builtin_names
        .insert("__loader__".to_string(), Value::none());
    global
        .builtin_names
        .insert("Ellipsis".to_string(), Value::indeterminate());
    global
        .builtin_names
        .insert("NotImplemented".to_string(), Value::indeterminate());

    // concrete built-ins with registered fragments
    let print_id = register_builtin_function(
        global,
        "print",
        vec![
            (vec![unknown(ValueType::Unicode)], Value::none()),
            (vec![unknown(ValueType::Bytes)], Value::none()),
            (vec![unknown(ValueType::Int)], Value::none()),
            (vec![unknown(ValueType::Float)], Value::none()),
            (vec![unknown(ValueType::Bool)], Value::none()),
        ],
    );
    let len_id = register_builtin_function(
        global,
        "len",
        vec![
            (vec![unknown(ValueType::Bytes)], unknown(ValueType::Int)),
            (vec![unknown(ValueType::Unicode)], unknown(ValueType::Int)),
            (vec![unknown(ValueType::List)], unknown(ValueType::Int)),
            (vec![unknown(ValueType::Tuple)], unknown(ValueType::Int)),
            (vec![unknown(ValueType::Set)], unknown(ValueType::Int)),
            (vec![unknown(ValueType::Dict)], unknown(ValueType::Int)),
        ],
    );
    let repr_id = register_builtin_function(
        global,
        "repr",
        vec![
            (vec![unknown(ValueType::Int)], unknown(ValueType::Unicode)),
            (vec![unknown(ValueType::Float)], unknown(ValueType::Unicode)),
            (vec![unknown(ValueType::Bool)], unknown(ValueType::Unicode)),
            (vec![unknown(ValueType::Bytes)], unknown(ValueType::Unicode)),
            (vec![unknown(ValueType::Unicode)], unknown(ValueType::Unicode)),
        ],
    );
    let abs_id = register_builtin_function(
        global,
        "abs",
        vec![
            (vec![unknown(ValueType::Int)], unknown(ValueType::Int)),
            (vec![unknown(ValueType::Float)], unknown(ValueType::Float)),
        ],
    );
    let chr_id = register_builtin_function(
        global,
        "chr",
        vec![(vec![unknown(ValueType::Int)], unknown(ValueType::Unicode))],
    );
    let ord_id = register_builtin_function(
        global,
        "ord",
        vec![(vec![unknown(ValueType::Unicode)], unknown(ValueType::Int))],
    );
    let hex_id = register_builtin_function(
        global,
        "hex",
        vec![(vec![unknown(ValueType::Int)], unknown(ValueType::Unicode))],
    );
    let input_id = register_builtin_function(
        global,
        "input",
        vec![(vec![Value::unicode("")], unknown(ValueType::Unicode))],
    );

    for (name, id) in [
        ("print", print_id),
        ("len", len_id),
        ("repr", repr_id),
        ("abs", abs_id),
        ("chr", chr_id),
        ("ord", ord_id),
        ("hex", hex_id),
        ("input", input_id),
    ] {
        global
            .builtin_names
            .insert(name.to_string(), Value::function(id));
    }

    create_sys_module(global);
    create_introspection_module(global);
}

/// The `sys` module: argv, executable, version.
fn create_sys_module(global: &mut GlobalContext) {
    let mut globals = BTreeMap::new();
    globals.insert("argv".to_string(), Value::list(Vec::new()));
    globals.insert("executable".to_string(), Value::unicode(""));
    globals.insert(
        "version".to_string(),
        Value::unicode(env!("CARGO_PKG_VERSION")),
    );
    let module = ModuleContext::builtin("sys", globals);
    global.register_module(module);
}

/// Fill in sys.argv (and the program's own argv copy). Must happen before
/// the sys module advances past Analyzed.
pub fn sys_set_argv(global: &mut GlobalContext, argv: Vec<String>) {
    let values = argv.iter().map(|a| Value::unicode(a.clone())).collect();
    if let Some(module) = global.modules.get("sys") {
        module
            .borrow_mut()
            .globals
            .insert("argv".to_string(), Value::list(values));
    }
    global.argv = argv;
}

pub fn sys_set_executable(global: &mut GlobalContext, executable: &str) {
    if let Some(module) = global.modules.get("sys") {
        module
            .borrow_mut()
            .globals
            .insert("executable".to_string(), Value::unicode(executable));
    }
}

/// The introspection module. Its functions are registered for analysis
/// like any built-in; the Rust entry points below are the actual
/// implementations, reachable by the embedder and the test suite.
fn create_introspection_module(global: &mut GlobalContext) {
    let mut globals = BTreeMap::new();
    globals.insert(
        "__doc__".to_string(),
        Value::unicode("Built-in objects specific to pyrite."),
    );

    let mut bind = |global: &mut GlobalContext,
                    name: &str,
                    fragments: Vec<(Vec<Value>, Value)>| {
        let id = register_builtin_function(global, name, fragments);
        globals.insert(name.to_string(), Value::function(id));
    };

    bind(
        global,
        "module_phase",
        vec![(vec![unknown(ValueType::Bytes)], unknown(ValueType::Int))],
    );
    bind(
        global,
        "module_compiled_size",
        vec![(vec![unknown(ValueType::Bytes)], unknown(ValueType::Int))],
    );
    bind(global, "code_buffer_size", vec![(vec![], unknown(ValueType::Int))]);
    bind(
        global,
        "code_buffer_used_size",
        vec![(vec![], unknown(ValueType::Int))],
    );
    bind(global, "global_space", vec![(vec![], unknown(ValueType::Int))]);
    bind(
        global,
        "bytes_constant_count",
        vec![(vec![], unknown(ValueType::Int))],
    );
    bind(
        global,
        "unicode_constant_count",
        vec![(vec![], unknown(ValueType::Int))],
    );
    bind(global, "debug_flags", vec![(vec![], unknown(ValueType::Int))]);

    let module = ModuleContext::builtin("__pyrite__", globals);
    global.register_module(module);
}

// ==================== Introspection entry points ====================

/// Phase ordinal of a module, or -1 if no such module exists.
pub fn module_phase(global: &GlobalContext, name: &[u8]) -> i64 {
    let Ok(name) = std::str::from_utf8(name) else {
        return -1;
    };
    match global.modules.get(name) {
        Some(module) => module.borrow().phase.ordinal(),
        None => -1,
    }
}

/// Total assembled byte count of a module, or -1 if no such module.
pub fn module_compiled_size(global: &GlobalContext, name: &[u8]) -> i64 {
    let Ok(name) = std::str::from_utf8(name) else {
        return -1;
    };
    match global.modules.get(name) {
        Some(module) => module.borrow().compiled_size as i64,
        None => -1,
    }
}

pub fn code_buffer_size(global: &GlobalContext) -> i64 {
    global.code.total_size() as i64
}

pub fn code_buffer_used_size(global: &GlobalContext) -> i64 {
    global.code.used_size() as i64
}

pub fn global_space(global: &GlobalContext) -> i64 {
    global.global_space_size() as i64
}

pub fn bytes_constant_count(global: &GlobalContext) -> i64 {
    global.bytes_constants.len() as i64
}

pub fn unicode_constant_count(global: &GlobalContext) -> i64 {
    global.unicode_constants.len() as i64
}

pub fn debug_flags(global: &GlobalContext) -> i64 {
    global.debug_flags as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::Phase;

    #[test]
    fn test_builtin_names_present() {
        let global = GlobalContext::new(vec![]);
        assert_eq!(
            global.builtin_names.get("__debug__"),
            Some(&Value::bool_value(true))
        );
        // print has a known id; ValueError does not
        let print = global.builtin_names.get("print").unwrap();
        assert!(print.value_known());
        assert!(print.as_function_id().unwrap() < 0);
        let value_error = global.builtin_names.get("ValueError").unwrap();
        assert_eq!(value_error.value_type(), ValueType::Function);
        assert!(!value_error.value_known());
    }

    #[test]
    fn test_builtin_modules_registered() {
        let global = GlobalContext::new(vec![]);
        assert!(global.modules.contains_key("sys"));
        assert!(global.modules.contains_key("__pyrite__"));
        assert_eq!(module_phase(&global, b"sys"), Phase::Initial.ordinal());
        assert_eq!(module_phase(&global, b"no_such_module"), -1);
        assert_eq!(module_compiled_size(&global, b"no_such_module"), -1);
    }

    #[test]
    fn test_sys_argv() {
        let mut global = GlobalContext::new(vec![]);
        sys_set_argv(
            &mut global,
            vec!["prog.py".to_string(), "arg".to_string()],
        );
        let sys = global.modules.get("sys").unwrap().borrow();
        let argv = sys.globals.get("argv").unwrap();
        assert!(argv.value_known());
        assert_eq!(argv.extension_types[0].value_type(), ValueType::Unicode);
    }

    #[test]
    fn test_len_fragments() {
        let mut global = GlobalContext::new(vec![]);
        let len = global.builtin_names.get("len").cloned().unwrap();
        let id = len.as_function_id().unwrap();
        let context = global.context_for_function(id, None).unwrap();
        assert_eq!(context.fragments.len(), 6);
        assert!(context.is_builtin());
        // every fragment returns Int, so there's exactly one return type
        assert_eq!(context.return_types.len(), 1);
    }
}
