// The compilation driver.
//
// advance_module_phase walks a module through
// Initial -> Parsed -> Annotated -> Analyzed -> Imported, guarding against
// cyclic imports with the in_progress set. Root scopes compile eagerly on
// the Analyzed -> Imported edge; ordinary functions compile on demand when
// a call site first requests an argument-type signature
// (resolve_function_call).
//
// Code generation proper is the external backend's job: compile_scope
// lowers only the structural skeleton (entry label, one label per call
// split) and runs it through the assembler seam, which keeps the layout
// bookkeeping, split tables, and introspection counters real.

use pyrite_ast::value::{Value, ValueKind};
use pyrite_diagnostics::{render_error, CompileError, ErrorKind, Result, SourceFile};
use pyrite_parser::Parser;
use pyrite_runtime::{AsmStream, Assemble, PlaceholderEncoder};

use crate::analysis::{derive_fragment_return_type, AnalysisVisitor};
use crate::annotation::AnnotationVisitor;
use crate::contexts::{
    CodeRange, Fragment, GlobalContext, ModuleRef, Phase, STATIC_INITIALIZE_MODULE_ATTRIBUTES,
};
use crate::debug::{flag_enabled, DebugFlag};
use pyrite_ast::visit::VisitMut;

/// Attach the standard failure header (module, line, offset, source line,
/// caret) to an error that doesn't have one yet.
fn contextualize(err: CompileError, module_name: &str, source: Option<&SourceFile>) -> CompileError {
    if err.message.starts_with('[') {
        return err;
    }
    CompileError::new(
        err.kind,
        render_error(module_name, source, &err).trim_end().to_string(),
        err.offset,
    )
}

/// Look up (or create) a module and advance it to the given phase.
pub fn get_module_at_phase(
    global: &mut GlobalContext,
    module_name: &str,
    phase: Phase,
) -> Result<ModuleRef> {
    let module = global.get_or_create_module(module_name, None, false)?;
    advance_module_phase(global, &module, phase)?;
    Ok(module)
}

pub fn advance_module_phase(
    global: &mut GlobalContext,
    module: &ModuleRef,
    target: Phase,
) -> Result<()> {
    if module.borrow().phase >= target {
        return Ok(());
    }

    // re-entry for a module already being advanced is a cyclic import
    let name = module.borrow().name.clone();
    if !global.in_progress.insert(name.clone()) {
        return Err(CompileError::cycle(format!(
            "cyclic import dependency on module {}",
            name
        )));
    }

    let result = advance_phases(global, module, target);
    global.in_progress.remove(&name);
    result
}

fn advance_phases(global: &mut GlobalContext, module: &ModuleRef, target: Phase) -> Result<()> {
    while module.borrow().phase < target {
        let phase = module.borrow().phase;
        match phase {
            Phase::Initial => advance_to_parsed(global, module)?,
            Phase::Parsed => advance_to_annotated(global, module)?,
            Phase::Annotated => advance_to_analyzed(global, module)?,
            Phase::Analyzed => advance_to_imported(global, module)?,
            Phase::Imported => break,
        }
    }
    Ok(())
}

fn advance_to_parsed(global: &mut GlobalContext, module: &ModuleRef) -> Result<()> {
    let name = module.borrow().name.clone();
    let has_source = module.borrow().source.is_some();

    if has_source {
        let ast = {
            let borrowed = module.borrow();
            let source = borrowed.source.as_ref().ok_or_else(|| {
                CompileError::compile("module source disappeared", None)
            })?;

            let tokens = pyrite_lexer::tokenize(source)
                .map_err(|e| contextualize(e.into(), &name, Some(source)))?;
            if flag_enabled(global.debug_flags, DebugFlag::ShowLexDebug) {
                eprintln!("[{}] ======== module lexed", name);
                for (index, token) in tokens.iter().enumerate() {
                    eprintln!("      n:{:5} {}", index, token);
                }
            }

            let mut parser = Parser::new(source, &tokens);
            let ast = parser
                .parse_module()
                .map_err(|e| contextualize(e.into(), &name, Some(source)))?;
            if flag_enabled(global.debug_flags, DebugFlag::ShowParseDebug) {
                eprintln!("[{}] ======== module parsed", name);
                eprint!("{}", pyrite_ast::fmt::module_to_source(&ast));
            }
            ast
        };
        module.borrow_mut().ast_root = Some(ast);
    } else if flag_enabled(global.debug_flags, DebugFlag::ShowLexDebug)
        || flag_enabled(global.debug_flags, DebugFlag::ShowParseDebug)
    {
        eprintln!("[{}] ======== no lexing/parsing for built-in module", name);
    }

    module.borrow_mut().phase = Phase::Parsed;
    Ok(())
}

fn advance_to_annotated(global: &mut GlobalContext, module: &ModuleRef) -> Result<()> {
    let name = module.borrow().name.clone();

    let ast = module.borrow_mut().ast_root.take();
    if let Some(mut ast) = ast {
        let result = AnnotationVisitor::new(global, module).visit_module(&mut ast);
        module.borrow_mut().ast_root = Some(ast);
        if let Err(e) = result {
            let borrowed = module.borrow();
            return Err(contextualize(e, &name, borrowed.source.as_ref()));
        }
    }

    // reserve one 8-byte slot per global
    let bytes = 8 * module.borrow().globals.len();
    let offset = global.reserve_global_space(bytes);
    module.borrow_mut().global_base_offset = offset as i64;

    if flag_enabled(global.debug_flags, DebugFlag::ShowAnnotateDebug) {
        let borrowed = module.borrow();
        eprintln!("[{}] ======== module annotated", name);
        eprintln!("# split count: {}", borrowed.num_splits);
        for global_name in borrowed.globals.keys() {
            eprintln!(
                "# global: {} ({})",
                global_name,
                if borrowed.is_global_mutable(global_name) {
                    "mutable"
                } else {
                    "immutable"
                }
            );
        }
        eprintln!(
            "# global space is now {} bytes",
            global.global_space_size()
        );
    }

    module.borrow_mut().phase = Phase::Annotated;
    Ok(())
}

fn advance_to_analyzed(global: &mut GlobalContext, module: &ModuleRef) -> Result<()> {
    let name = module.borrow().name.clone();

    let ast = module.borrow_mut().ast_root.take();
    if let Some(mut ast) = ast {
        let result = AnalysisVisitor::new(global, module).visit_module(&mut ast);
        module.borrow_mut().ast_root = Some(ast);
        if let Err(e) = result {
            let borrowed = module.borrow();
            return Err(contextualize(e, &name, borrowed.source.as_ref()));
        }
    }

    if flag_enabled(global.debug_flags, DebugFlag::ShowAnalyzeDebug) {
        let borrowed = module.borrow();
        eprintln!("[{}] ======== module analyzed", name);
        let mut offset = borrowed.global_base_offset;
        for (global_name, value) in &borrowed.globals {
            eprintln!("# global at +{:X}: {} = {}", offset, global_name, value);
            offset += 8;
        }
    }

    let result = initialize_global_space_for_module(global, module);
    if let Err(e) = result {
        let borrowed = module.borrow();
        return Err(contextualize(e, &name, borrowed.source.as_ref()));
    }

    module.borrow_mut().phase = Phase::Analyzed;
    Ok(())
}

fn advance_to_imported(global: &mut GlobalContext, module: &ModuleRef) -> Result<()> {
    let name = module.borrow().name.clone();
    let has_ast = module.borrow().ast_root.is_some();

    // with eager compilation disabled, every boundary crossing compiles at
    // first use instead
    if flag_enabled(global.debug_flags, DebugFlag::NoEagerCompilation) {
        if flag_enabled(global.debug_flags, DebugFlag::ShowCompileDebug) {
            eprintln!("[{}] ======== eager root compilation disabled", name);
        }
        module.borrow_mut().phase = Phase::Imported;
        return Ok(());
    }

    if has_ast {
        let num_splits = module.borrow().num_splits;
        let fragment = compile_scope(global, &name, 0, 0, num_splits, Vec::new(), Value::none())
            .map_err(|e| {
                let borrowed = module.borrow();
                contextualize(e, &name, borrowed.source.as_ref())
            })?;

        if flag_enabled(global.debug_flags, DebugFlag::ShowCompileDebug) {
            eprintln!("[{}] ======== root scope compiled", name);
        }
        if flag_enabled(global.debug_flags, DebugFlag::ShowAssembly) {
            let length = fragment.compiled.map(|r| r.length).unwrap_or(0);
            eprintln!("[{}] ======== root scope assembled ({} bytes)", name, length);
            for (label, label_offset) in &fragment.compiled_labels {
                eprintln!("  {:8X}  {}", label_offset, label);
            }
        }

        let mut borrowed = module.borrow_mut();
        borrowed.compiled_size += fragment.compiled.map(|r| r.length).unwrap_or(0);
        borrowed.compiled_root = Some(fragment);

        // jumping into the assembled root scope is the execution backend's
        // contract; the driver's observable work ends here
        if flag_enabled(global.debug_flags, DebugFlag::ShowJITEvents) {
            eprintln!("[{}] ======== root scope ready for execution", name);
        }
    }

    module.borrow_mut().phase = Phase::Imported;
    Ok(())
}

// ==================== fragment compilation ====================

const PROLOGUE_OP: [u8; 4] = [0x01, 0x00, 0x00, 0x00];
const CALLSITE_OP: [u8; 8] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
const EPILOGUE_OP: [u8; 4] = [0x03, 0x00, 0x00, 0x00];

/// Lower one scope to the structural instruction stream, assemble it, and
/// lay it out in the code buffer. Each call/yield split point gets a label
/// named by a fresh callsite token so tail recompilation can find it.
fn compile_scope(
    global: &mut GlobalContext,
    scope_name: &str,
    function_id: i64,
    fragment_index: usize,
    num_splits: i64,
    arg_types: Vec<Value>,
    return_type: Value,
) -> Result<Fragment> {
    let mut stream = AsmStream::new();
    stream.label(scope_name.to_string());
    stream.op(PROLOGUE_OP.to_vec());

    let mut call_split_labels = Vec::new();
    for _ in 0..num_splits {
        let token = global.next_callsite_token;
        global.next_callsite_token += 1;
        let label = format!("callsite_{}", token);
        stream.label(label.clone());
        stream.op(CALLSITE_OP.to_vec());
        call_split_labels.push(label);
    }
    stream.op(EPILOGUE_OP.to_vec());

    let block = PlaceholderEncoder.assemble(&stream);
    let offset = global.code.append(&block.code);

    let mut fragment = Fragment::new(function_id, fragment_index, arg_types);
    fragment.return_type = return_type;
    fragment.compiled = Some(CodeRange {
        offset,
        length: block.code.len(),
    });
    fragment.compiled_labels = block.labels;
    fragment.call_split_labels = call_split_labels;
    fragment.resolve_call_split_labels()?;
    Ok(fragment)
}

/// Fragment dispatch for a call with a known callee: return the matching
/// fragment's index, compiling a new specialization when no existing
/// fragment satisfies the argument types. Built-ins may not be recompiled.
pub fn resolve_function_call(
    global: &mut GlobalContext,
    function_id: i64,
    arg_types: Vec<Value>,
) -> Result<usize> {
    let (existing, is_builtin, name, module_name, num_splits, next_index) = {
        let context = if function_id < 0 {
            global.builtin_functions.get(&function_id)
        } else {
            global.function_contexts.get(&function_id)
        };
        let Some(context) = context else {
            return Err(CompileError::compile(
                format!("call to unknown function {}", function_id),
                None,
            ));
        };
        (
            context.fragment_index_for_call_args(&arg_types)?,
            context.is_builtin(),
            context.name.clone(),
            context.module.clone(),
            context.num_splits,
            context.fragments.len(),
        )
    };

    if let Some(index) = existing {
        return Ok(index);
    }
    if is_builtin {
        return Err(CompileError::compile(
            format!(
                "no fragment of built-in function {} matches the call; built-in functions may not be recompiled",
                name
            ),
            None,
        ));
    }

    // this fragment's return type comes from re-analyzing the body with
    // the arguments bound to the concrete signature, not from the
    // function's generic return-type set
    let return_type = derive_fragment_return_type(global, function_id, &arg_types)?;

    let module_label = module_name.as_deref().unwrap_or("__builtins__");
    let scope_name = format!(
        "{}.{}+{}$f{}",
        module_label, name, function_id, next_index
    );
    log::debug!(
        "[{}] compiling fragment {} ({}) for signature ({})",
        module_label,
        scope_name,
        return_type,
        pyrite_ast::value::type_signature(&arg_types)
    );

    let fragment = compile_scope(
        global,
        &scope_name,
        function_id,
        next_index,
        num_splits,
        arg_types,
        return_type,
    )?;
    let length = fragment.compiled.map(|r| r.length).unwrap_or(0);

    if let Some(context) = global.function_contexts.get_mut(&function_id) {
        context.fragments.push(fragment);
    }
    if let Some(module_name) = module_name {
        if let Some(module) = global.modules.get(&module_name) {
            module.borrow_mut().compiled_size += length;
        }
    }
    Ok(next_index)
}

// ==================== global initialization ====================

/// Zero the module's slots and statically initialize the globals the root
/// scope won't: `__name__`/`__file__` everywhere, and every global of a
/// source-less built-in module.
fn initialize_global_space_for_module(
    global: &mut GlobalContext,
    module: &ModuleRef,
) -> Result<()> {
    let (base_offset, has_ast, globals) = {
        let borrowed = module.borrow();
        if borrowed.global_base_offset < 0 {
            return Err(CompileError::compile(
                format!("global space for module {} was never reserved", borrowed.name),
                None,
            ));
        }
        (
            borrowed.global_base_offset as usize,
            borrowed.ast_root.is_some(),
            borrowed
                .globals
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Vec<_>>(),
        )
    };

    for slot in 0..globals.len() {
        global.write_global_slot(base_offset + 8 * slot, 0);
    }

    for (slot, (name, value)) in globals.iter().enumerate() {
        if has_ast && !STATIC_INITIALIZE_MODULE_ATTRIBUTES.contains(&name.as_str()) {
            continue;
        }
        if !value.value_known() {
            return Err(CompileError::compile(
                format!("built-in global {} has unknown value", name),
                None,
            ));
        }
        let cell = construct_value(global, value, true)?;
        global.write_global_slot(base_offset + 8 * slot, cell);
    }
    Ok(())
}

/// Type-directed constructor for one 8-byte global cell. Numbers go in
/// place; strings point at interned constants; lists construct a runtime
/// list with each item written in turn.
pub fn construct_value(
    global: &mut GlobalContext,
    value: &Value,
    use_shared_constants: bool,
) -> Result<u64> {
    match &value.kind {
        ValueKind::None => Ok(0),
        ValueKind::Bool(Some(b)) => Ok(*b as u64),
        ValueKind::Int(Some(i)) => Ok(*i as u64),
        ValueKind::Float(Some(f)) => Ok(f.to_bits()),

        ValueKind::Bytes(Some(data)) => Ok(if use_shared_constants {
            global.get_or_create_bytes_constant(data)
        } else {
            global.heap.bytes_new(data)
        }),

        ValueKind::Unicode(Some(data)) => Ok(if use_shared_constants {
            global.get_or_create_unicode_constant(data)
        } else {
            global.heap.unicode_new(data)
        }),

        // function and module cells are filled in by the linker/backend
        ValueKind::Function(_) | ValueKind::Module(_) => Ok(0),

        ValueKind::List(Some(items)) => {
            let mut cells = Vec::with_capacity(items.len());
            for item in items {
                cells.push(construct_value(global, item, false)?);
            }
            let items_hold_references = value
                .extension_types
                .first()
                .map(|t| t.value_type().has_refcount())
                .unwrap_or(false);
            Ok(global.heap.list_new(cells, items_hold_references))
        }

        _ => Err(CompileError::new(
            ErrorKind::Compile,
            format!("static construction unimplemented for {}", value),
            None,
        )),
    }
}

