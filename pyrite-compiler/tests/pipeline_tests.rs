// End-to-end pipeline tests: lex + parse + annotate + analyze in-memory
// modules and check the resulting lattice state, then drive the fragment
// cache and the import machinery.

use pyrite_ast::value::{Value, ValueType};
use pyrite_diagnostics::ErrorKind;
use pyrite_compiler::builtins;
use pyrite_compiler::{
    advance_module_phase, resolve_function_call, GlobalContext, ModuleRef, Phase,
};

fn analyze(source: &str) -> (GlobalContext, ModuleRef) {
    let mut global = GlobalContext::new(vec![]);
    let module = global
        .get_or_create_module("__main__", Some(source), true)
        .expect("module creation failed");
    advance_module_phase(&mut global, &module, Phase::Analyzed).expect("analysis failed");
    (global, module)
}

fn analyze_err(source: &str) -> pyrite_diagnostics::CompileError {
    let mut global = GlobalContext::new(vec![]);
    let module = global
        .get_or_create_module("__main__", Some(source), true)
        .expect("module creation failed");
    advance_module_phase(&mut global, &module, Phase::Analyzed)
        .expect_err("analysis unexpectedly succeeded")
}

fn global_value(module: &ModuleRef, name: &str) -> Value {
    module
        .borrow()
        .globals
        .get(name)
        .cloned()
        .unwrap_or_else(|| panic!("no global named {}", name))
}

// ==================== end-to-end scenarios ====================

#[test]
fn test_scenario_constant_folding() {
    // x = 1 + 2 -> x : Int = 3, immutable
    let (_global, module) = analyze("x = 1 + 2\n");
    assert_eq!(global_value(&module, "x"), Value::int(3));
    assert!(!module.borrow().is_global_mutable("x"));
}

#[test]
fn test_scenario_second_write_clears_value() {
    // x = 1; x = 2 -> x : Int, mutable, value unknown
    let (_global, module) = analyze("x = 1\nx = 2\n");
    let x = global_value(&module, "x");
    assert_eq!(x.value_type(), ValueType::Int);
    assert!(!x.value_known());
    assert!(module.borrow().is_global_mutable("x"));
}

#[test]
fn test_scenario_function_call_return_type() {
    // f's generic return type set holds one Indeterminate (the argument
    // type is unknown at definition); the call site specializes a fragment
    // for Int and takes its return type, so y : Int
    let (mut global, module) = analyze("def f(a):\n  return a + 1\ny = f(3)\n");
    let f = global_value(&module, "f");
    let f_id = f.as_function_id().expect("f should have a known id");
    let context = global.context_for_function(f_id, None).unwrap();
    assert_eq!(context.return_types.len(), 1);
    assert_eq!(
        context.return_types[0].value_type(),
        ValueType::Indeterminate
    );

    // the call site's fragment was compiled for Int and carries the
    // re-derived return type
    assert_eq!(context.fragments.len(), 1);
    assert_eq!(
        context.fragments[0].arg_types[0].value_type(),
        ValueType::Int
    );
    assert_eq!(
        context.fragments[0].return_type.value_type(),
        ValueType::Int
    );

    let y = global_value(&module, "y");
    assert_eq!(y.value_type(), ValueType::Int);
    assert!(!y.value_known());
}

#[test]
fn test_scenario_static_branch() {
    // if True: x = 1 else: x = "s" -> always_true, x : Int = 1
    let (_global, module) = analyze("if True:\n  x = 1\nelse:\n  x = 's'\n");
    assert_eq!(global_value(&module, "x"), Value::int(1));

    let borrowed = module.borrow();
    let ast = borrowed.ast_root.as_ref().unwrap();
    let pyrite_ast::Stmt::If(if_stmt) = &ast.items[0] else {
        panic!("expected if statement");
    };
    assert!(if_stmt.always_true);
    assert!(!if_stmt.always_false);
}

#[test]
fn test_scenario_attribute_type_change() {
    // an attribute may only be created in __init__, and its type is fixed
    let err = analyze_err(
        "class C:\n  def __init__(self):\n    self.v = 0\n  def g(self):\n    self.v = 'x'\n",
    );
    assert_eq!(err.kind, ErrorKind::Analysis);
    assert!(err.message.contains("changes type"), "got: {}", err.message);
}

#[test]
fn test_scenario_for_element_type() {
    // a = [1, 2, 3]; for x in a: pass -> x : Int, a retains its value
    let (_global, module) = analyze("a = [1, 2, 3]\nfor x in a:\n  pass\n");
    let a = global_value(&module, "a");
    assert_eq!(
        a,
        Value::list(vec![Value::int(1), Value::int(2), Value::int(3)])
    );
    assert_eq!(a.extension_types[0].value_type(), ValueType::Int);
    assert!(!module.borrow().is_global_mutable("a"));

    let x = global_value(&module, "x");
    assert_eq!(x.value_type(), ValueType::Int);
    assert!(!x.value_known());
}

// ==================== annotation properties ====================

#[test]
fn test_annotation_ids_increase_in_preorder() {
    let (_global, module) = analyze(
        "def f():\n  return 1\ndef g():\n  def inner():\n    return 2\n  return 3\nclass C:\n  pass\n",
    );
    let borrowed = module.borrow();
    let ast = borrowed.ast_root.as_ref().unwrap();

    let mut ids = Vec::new();
    for item in &ast.items {
        match item {
            pyrite_ast::Stmt::FunctionDef(f) => {
                ids.push(f.function_id);
                for inner in &f.items {
                    if let pyrite_ast::Stmt::FunctionDef(inner_f) = inner {
                        ids.push(inner_f.function_id);
                    }
                }
            }
            pyrite_ast::Stmt::ClassDef(c) => ids.push(c.class_id),
            _ => {}
        }
    }
    assert_eq!(ids.len(), 4);
    for window in ids.windows(2) {
        assert!(window[0] < window[1], "ids not increasing: {:?}", ids);
    }
    assert!(ids[0] > 0);
}

#[test]
fn test_mutability_inference() {
    let (_global, module) = analyze("a = 1\nb = 1\nb = 2\n");
    assert!(!module.borrow().is_global_mutable("a"));
    assert!(module.borrow().is_global_mutable("b"));
}

#[test]
fn test_global_declaration_marks_mutable() {
    let (_global, module) = analyze("c = 1\ndef f():\n  global c\n  c = 2\n");
    assert!(module.borrow().is_global_mutable("c"));
}

#[test]
fn test_global_after_local_write_is_an_error() {
    let err = analyze_err("def f():\n  x = 1\n  global x\n");
    assert_eq!(err.kind, ErrorKind::Annotation);
}

#[test]
fn test_write_to_builtin_name_is_an_error() {
    let err = analyze_err("print = 5\n");
    assert_eq!(err.kind, ErrorKind::Annotation);
}

#[test]
fn test_locals_recorded_per_function() {
    let (mut global, module) = analyze("def f(a, b):\n  c = a\n  return c\n");
    let f_id = global_value(&module, "f").as_function_id().unwrap();
    let context = global.context_for_function(f_id, None).unwrap();
    let names: Vec<&String> = context.locals.keys().collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

// ==================== analysis properties ====================

#[test]
fn test_type_change_detected() {
    let err = analyze_err("x = 1\nx = 'hello'\n");
    assert_eq!(err.kind, ErrorKind::Analysis);
    assert!(err.message.contains("changes type"));
}

#[test]
fn test_same_type_reassignment_clears_value_only() {
    let (_global, module) = analyze("x = 1\nx = 1\n");
    let x = global_value(&module, "x");
    assert_eq!(x.value_type(), ValueType::Int);
    assert!(!x.value_known());
}

#[test]
fn test_unknown_variable_is_an_error() {
    let err = analyze_err("y = nope\n");
    assert_eq!(err.kind, ErrorKind::Analysis);
    assert!(err.message.contains("does not exist"));
}

#[test]
fn test_exponentiation_precedence_in_lattice() {
    // 2**-1 = 0.5 end to end
    let (_global, module) = analyze("h = 2**-1\n");
    assert_eq!(global_value(&module, "h"), Value::float(0.5));
}

#[test]
fn test_builtin_call_return_type() {
    let (_global, module) = analyze("n = len(b'abc')\n");
    let n = global_value(&module, "n");
    assert_eq!(n.value_type(), ValueType::Int);
    assert!(!n.value_known());
}

#[test]
fn test_call_of_non_function_is_an_error() {
    let err = analyze_err("x = 1\ny = x()\n");
    assert_eq!(err.kind, ErrorKind::Analysis);
    assert!(err.message.contains("cannot call"));
}

#[test]
fn test_tuple_unpacking() {
    let (_global, module) = analyze("a, b = 1, 'two'\n");
    assert_eq!(global_value(&module, "a"), Value::int(1));
    assert_eq!(global_value(&module, "b"), Value::unicode("two"));
}

#[test]
fn test_subscript_folding() {
    let (_global, module) = analyze("a = [10, 20, 30]\nfirst = a[0]\nlast = a[-1]\n");
    assert_eq!(global_value(&module, "first"), Value::int(10));
    assert_eq!(global_value(&module, "last"), Value::int(30));

    let borrowed = module.borrow();
    let ast = borrowed.ast_root.as_ref().unwrap();
    let pyrite_ast::Stmt::Assignment(assign) = &ast.items[1] else {
        panic!("expected assignment");
    };
    let pyrite_ast::Expr::Index(index) = &assign.value else {
        panic!("expected index");
    };
    assert!(index.index_constant);
    assert_eq!(index.index_value, 0);
}

#[test]
fn test_assert_message_analysis_is_conditional() {
    // statically true check: the (non-Unicode) message is never analyzed
    let (_global, _module) = analyze("assert True, 5\n");

    // unknown check: the message must be Unicode
    let err = analyze_err("x = len(b'a')\nassert x, 5\n");
    assert_eq!(err.kind, ErrorKind::Analysis);
    assert!(err.message.contains("not Unicode"));
}

#[test]
fn test_unimplemented_constructs_fail_cleanly() {
    assert_eq!(analyze_err("x = [1]\nx[0] += 1\n").kind, ErrorKind::Analysis);
    assert_eq!(analyze_err("exec 'code'\n").kind, ErrorKind::Analysis);
    assert_eq!(analyze_err("a = [1, 2]\nb = a[0:1]\n").kind, ErrorKind::Analysis);
    assert_eq!(
        analyze_err("@deco\ndef f():\n  pass\n").kind,
        ErrorKind::Analysis
    );
    assert_eq!(
        analyze_err("class A:\n  pass\nclass B(A):\n  pass\n").kind,
        ErrorKind::Analysis
    );
}

#[test]
fn test_method_receiver_rules() {
    let err = analyze_err("class C:\n  def m(this):\n    pass\n");
    assert!(err.message.contains("self"));

    let err = analyze_err("class C:\n  def m(self=1):\n    pass\n");
    assert!(err.message.contains("default"));
}

#[test]
fn test_class_attribute_resolution() {
    let (mut global, module) = analyze(
        "class C:\n  def __init__(self):\n    self.v = 0\nx = C\n",
    );
    let c = global_value(&module, "C");
    let class_id = c.as_class_id().unwrap();
    let class = global.context_for_class(class_id, None).unwrap();
    assert_eq!(
        class.attributes.get("v").map(|v| v.value_type()),
        Some(ValueType::Int)
    );
    // __init__ shares the class id and returns an instance of it
    let init = global.context_for_function(class_id, None).unwrap();
    assert!(init.is_class_init());
    assert_eq!(init.return_types.len(), 1);
    assert_eq!(init.return_types[0].value_type(), ValueType::Instance);
}

#[test]
fn test_instance_construction_and_attribute_read() {
    let (_global, module) = analyze(
        "class C:\n  def __init__(self):\n    self.v = 5\nobj = C()\nw = obj.v\n",
    );
    let obj = global_value(&module, "obj");
    assert_eq!(obj.value_type(), ValueType::Instance);
    let w = global_value(&module, "w");
    assert_eq!(w.value_type(), ValueType::Int);
    assert!(!w.value_known());
}

#[test]
fn test_generator_tracking() {
    let (mut global, module) = analyze("def gen():\n  yield 1\n  yield 2\n");
    let id = global_value(&module, "gen").as_function_id().unwrap();
    let context = global.context_for_function(id, None).unwrap();
    assert_eq!(context.return_types.len(), 1);
    assert_eq!(context.return_types[0].value_type(), ValueType::Int);
    // both yields got split ids
    assert_eq!(context.num_splits, 2);
}

#[test]
fn test_only_none_return_clears_return_types() {
    let (mut global, module) = analyze("def f():\n  return None\n");
    let id = global_value(&module, "f").as_function_id().unwrap();
    let context = global.context_for_function(id, None).unwrap();
    assert!(context.return_types.is_empty());
}

// ==================== imports ====================

fn two_module_global(main_source: &str, other_source: &str) -> (GlobalContext, ModuleRef) {
    let mut global = GlobalContext::new(vec![]);
    global
        .get_or_create_module("m", Some(other_source), true)
        .expect("module m creation failed");
    let main = global
        .get_or_create_module("__main__", Some(main_source), true)
        .expect("main module creation failed");
    (global, main)
}

#[test]
fn test_import_module_binding() {
    let (mut global, main) = two_module_global("import m\nw = m.z\n", "z = 41 + 1\n");
    advance_module_phase(&mut global, &main, Phase::Analyzed).unwrap();

    let m_binding = global_value(&main, "m");
    assert_eq!(m_binding, Value::module("m"));
    assert!(!main.borrow().is_global_mutable("m"));

    // the attribute read advanced m to Analyzed and saw the folded value
    assert_eq!(global_value(&main, "w"), Value::int(42));
    assert_eq!(builtins::module_phase(&global, b"m"), 3);
}

#[test]
fn test_from_import_copies_values() {
    let (mut global, main) = two_module_global("from m import z as q\n", "z = 7\n");
    advance_module_phase(&mut global, &main, Phase::Analyzed).unwrap();
    assert_eq!(global_value(&main, "q"), Value::int(7));
}

#[test]
fn test_from_import_missing_name() {
    let (mut global, main) = two_module_global("from m import nope\n", "z = 7\n");
    let err = advance_module_phase(&mut global, &main, Phase::Analyzed).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Annotation);
    assert!(err.message.contains("not defined"));
}

#[test]
fn test_import_star_fails_at_analysis() {
    let (mut global, main) = two_module_global("from m import *\n", "z = 7\n");
    // annotation accepts it (the binding exists), analysis rejects it
    advance_module_phase(&mut global, &main, Phase::Annotated).unwrap();
    assert!(main.borrow().globals.contains_key("z"));
    let err = advance_module_phase(&mut global, &main, Phase::Analyzed).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Analysis);
}

#[test]
fn test_cyclic_import() {
    let mut global = GlobalContext::new(vec![]);
    global
        .get_or_create_module("x", Some("from y import g\ndef f():\n  return 1\n"), true)
        .unwrap();
    let x = global
        .get_or_create_module("x", None, false)
        .unwrap();
    global
        .get_or_create_module("y", Some("from x import f\ndef g():\n  return 2\n"), true)
        .unwrap();

    let err = advance_module_phase(&mut global, &x, Phase::Imported).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cycle);
    assert!(err.message.contains("cyclic import"));
    // the guard set is cleaned up on the error path
    assert!(global.in_progress.is_empty());
}

#[test]
fn test_missing_module_is_an_error() {
    let mut global = GlobalContext::new(vec![]);
    let main = global
        .get_or_create_module("__main__", Some("import missing_module\n"), true)
        .unwrap();
    let err = advance_module_phase(&mut global, &main, Phase::Analyzed).unwrap_err();
    assert!(err.message.contains("can't find file"));
}

// ==================== driver, fragments, globals ====================

#[test]
fn test_phase_progression_and_compiled_root() {
    let mut global = GlobalContext::new(vec![]);
    let main = global
        .get_or_create_module("__main__", Some("x = 1\ny = print('hi')\n"), true)
        .unwrap();

    assert_eq!(builtins::module_phase(&global, b"__main__"), 0);
    advance_module_phase(&mut global, &main, Phase::Imported).unwrap();
    assert_eq!(builtins::module_phase(&global, b"__main__"), 4);

    assert!(builtins::module_compiled_size(&global, b"__main__") > 0);
    assert!(builtins::code_buffer_used_size(&global) > 0);
    assert!(builtins::code_buffer_size(&global) >= builtins::code_buffer_used_size(&global));

    let borrowed = main.borrow();
    let root = borrowed.compiled_root.as_ref().unwrap();
    assert!(root.compiled_labels.contains_key("__main__"));
    // print() could not be resolved to a known return type... but it was:
    // print always returns None, so the split was cancelled and the root
    // carries no split labels beyond those still pending
    assert_eq!(root.call_split_labels.len() as i64, borrowed.num_splits);
}

#[test]
fn test_static_global_initialization_and_interning() {
    let mut global = GlobalContext::new(vec![]);
    let main = global
        .get_or_create_module("__main__", Some("x = 1\n"), true)
        .unwrap();
    advance_module_phase(&mut global, &main, Phase::Imported).unwrap();

    let borrowed = main.borrow();
    let base = borrowed.global_base_offset as usize;

    // __file__ and __name__ are both "__main__" for -c code, so they
    // intern to the same unicode constant
    let file_slot = borrowed.global_slot("__file__").unwrap();
    let name_slot = borrowed.global_slot("__name__").unwrap();
    let file_cell = global.read_global_slot(base + 8 * file_slot).unwrap();
    let name_cell = global.read_global_slot(base + 8 * name_slot).unwrap();
    assert_eq!(file_cell, name_cell);
    assert_eq!(
        global.unicode_constants.get("__main__").copied(),
        Some(name_cell)
    );

    // x is initialized by the root scope at run time, not statically
    let x_slot = borrowed.global_slot("x").unwrap();
    assert_eq!(global.read_global_slot(base + 8 * x_slot), Some(0));

    assert!(builtins::unicode_constant_count(&global) >= 1);
}

#[test]
fn test_builtin_module_globals_are_fully_initialized() {
    let mut global = GlobalContext::new(vec![]);
    builtins::sys_set_argv(&mut global, vec!["prog.py".to_string(), "a".to_string()]);
    let sys = global.get_or_create_module("sys", None, false).unwrap();
    advance_module_phase(&mut global, &sys, Phase::Imported).unwrap();

    let borrowed = sys.borrow();
    let base = borrowed.global_base_offset as usize;
    let argv_slot = borrowed.global_slot("argv").unwrap();
    let argv_cell = global.read_global_slot(base + 8 * argv_slot).unwrap();
    // argv is a real runtime list of two unicode objects
    let Some(pyrite_runtime::HeapObject::List { items, .. }) = global.heap.get(argv_cell) else {
        panic!("argv slot does not hold a list object");
    };
    assert_eq!(items.len(), 2);
}

#[test]
fn test_fragment_dispatch_specialization() {
    let (mut global, module) = analyze("def f(a):\n  return a\n");
    let f_id = global_value(&module, "f").as_function_id().unwrap();

    let int_arg = vec![Value::unknown(ValueType::Int)];
    let bytes_arg = vec![Value::unknown(ValueType::Bytes)];
    let list_int_arg = vec![Value::unknown_with_extension_types(
        ValueType::List,
        vec![Value::unknown(ValueType::Int)],
    )];

    let first = resolve_function_call(&mut global, f_id, int_arg.clone()).unwrap();
    let second = resolve_function_call(&mut global, f_id, bytes_arg).unwrap();
    let third = resolve_function_call(&mut global, f_id, list_int_arg).unwrap();
    assert_eq!((first, second, third), (0, 1, 2));

    // a repeated Int call reuses the first fragment
    let again = resolve_function_call(&mut global, f_id, int_arg).unwrap();
    assert_eq!(again, first);

    let context = global.context_for_function(f_id, None).unwrap();
    assert_eq!(context.fragments.len(), 3);
    assert!(context.fragments.iter().all(|f| f.compiled.is_some()));

    // each fragment re-derived its own return type from its signature
    assert_eq!(context.fragments[0].return_type.value_type(), ValueType::Int);
    assert_eq!(
        context.fragments[1].return_type.value_type(),
        ValueType::Bytes
    );
    assert_eq!(
        context.fragments[2].return_type.value_type(),
        ValueType::List
    );
    assert_eq!(
        context.fragments[2].return_type.extension_types[0].value_type(),
        ValueType::Int
    );
}

#[test]
fn test_specialization_rejects_impossible_signatures() {
    // the body a + 1 can't be compiled for Bytes; the fragment's own
    // type derivation reports it
    let (mut global, module) = analyze("def f(a):\n  return a + 1\n");
    let f_id = global_value(&module, "f").as_function_id().unwrap();

    let err = resolve_function_call(&mut global, f_id, vec![Value::unknown(ValueType::Bytes)])
        .unwrap_err();
    assert!(err.message.contains("bytes"), "got: {}", err.message);

    // the generic view of the function is untouched by the failed attempt
    let context = global.context_for_function(f_id, None).unwrap();
    assert!(context.fragments.is_empty());
    assert_eq!(context.return_types.len(), 1);
    assert_eq!(
        context.return_types[0].value_type(),
        ValueType::Indeterminate
    );
    assert_eq!(
        context.locals.get("a").map(Value::value_type),
        Some(ValueType::Indeterminate)
    );
}

#[test]
fn test_lambda_call_specialization() {
    let (_global, module) = analyze("double = lambda a: a + a\ny = double(4)\n");
    let y = global_value(&module, "y");
    assert_eq!(y.value_type(), ValueType::Int);
    assert!(!y.value_known());
}

#[test]
fn test_method_call_specialization() {
    // the receiver is injected into the fragment signature
    let (_global, module) = analyze(
        "class C:\n  def __init__(self):\n    self.v = 1\n  def m(self, a):\n    return a\n\
         obj = C()\nw = obj.m(5)\n",
    );
    assert_eq!(global_value(&module, "w").value_type(), ValueType::Int);
}

#[test]
fn test_recursive_function_specialization_terminates() {
    // the derivation pass doesn't specialize its own call sites: the
    // self-call reads f's generic return-type set, so deriving the Int
    // fragment terminates with Indeterminate instead of recursing
    let (mut global, module) = analyze(
        "def f(a):\n  if a:\n    return f(a)\n  return a\ny = f(3)\n",
    );
    assert_eq!(
        global_value(&module, "y").value_type(),
        ValueType::Indeterminate
    );

    let f_id = global_value(&module, "f").as_function_id().unwrap();
    let context = global.context_for_function(f_id, None).unwrap();
    assert_eq!(context.fragments.len(), 1);
    assert_eq!(
        context.fragments[0].return_type.value_type(),
        ValueType::Indeterminate
    );
}

#[test]
fn test_builtins_may_not_be_recompiled() {
    let mut global = GlobalContext::new(vec![]);
    let len_id = global
        .builtin_names
        .get("len")
        .and_then(Value::as_function_id)
        .unwrap();

    // a matching call dispatches to the registered fragment
    let ok = resolve_function_call(&mut global, len_id, vec![Value::unknown(ValueType::Bytes)]);
    assert!(ok.is_ok());

    // a non-matching signature cannot create a new builtin fragment
    let err = resolve_function_call(&mut global, len_id, vec![Value::unknown(ValueType::Int)])
        .unwrap_err();
    assert!(err.message.contains("may not be recompiled"));
}

#[test]
fn test_function_fragments_have_split_labels() {
    let (mut global, module) = analyze(
        "def helper():\n  return 9\ndef f(a):\n  b = helper()\n  c = helper()\n  return a\n",
    );
    let f_id = global_value(&module, "f").as_function_id().unwrap();
    let index =
        resolve_function_call(&mut global, f_id, vec![Value::unknown(ValueType::Int)]).unwrap();

    let context = global.context_for_function(f_id, None).unwrap();
    let fragment = &context.fragments[index];
    // helper() resolves to a known Int return... no: helper returns 9, a
    // known single return type, so both splits were cancelled at analysis.
    // The fragment still reserves label slots for the annotated count.
    assert_eq!(fragment.call_split_labels.len() as i64, context.num_splits);
    for label in &fragment.call_split_labels {
        assert_eq!(
            fragment.compiled_labels.get(label).is_some(),
            !label.is_empty()
        );
    }
}

#[test]
fn test_module_globals_slot_order_is_stable() {
    let (_global, module) = analyze("b = 1\na = 2\nc = 3\n");
    let borrowed = module.borrow();
    let names: Vec<&String> = borrowed.globals.keys().collect();
    // sorted order: __file__, __name__, a, b, c
    assert_eq!(names, vec!["__file__", "__name__", "a", "b", "c"]);
    assert_eq!(borrowed.global_slot("a"), Some(2));
}

#[test]
fn test_import_probe_only_advances_to_initial() {
    let (mut global, main) = two_module_global("import m\n", "z = 7\n");
    advance_module_phase(&mut global, &main, Phase::Analyzed).unwrap();
    // a plain import is an existence probe; m stays at Initial
    assert_eq!(builtins::module_phase(&global, b"m"), 0);
}

#[test]
fn test_from_import_advances_to_annotated() {
    let (mut global, main) = two_module_global("from m import z\n", "z = 7\n");
    advance_module_phase(&mut global, &main, Phase::Annotated).unwrap();
    assert_eq!(builtins::module_phase(&global, b"m"), 2);
}
