// The context registry: modules, functions, classes, fragments, and the
// process-wide GlobalContext that owns all of them.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use pyrite_ast::value::{Value, ValueType};
use pyrite_ast::{Module, Stmt};
use pyrite_diagnostics::{CompileError, SourceFile};
use pyrite_runtime::{CodeBuffer, Heap, ObjectRef};

use crate::builtins;
use crate::debug::DebugFlags;

/// Module phases, in driver order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Initial,
    Parsed,
    Annotated,
    Analyzed,
    Imported,
}

impl Phase {
    pub fn ordinal(self) -> i64 {
        match self {
            Phase::Initial => 0,
            Phase::Parsed => 1,
            Phase::Annotated => 2,
            Phase::Analyzed => 3,
            Phase::Imported => 4,
        }
    }
}

pub type ModuleRef = Rc<RefCell<ModuleContext>>;

/// Offset and length of an assembled blob inside the global code buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRange {
    pub offset: usize,
    pub length: usize,
}

/// A specialization of one function for a specific argument-type tuple.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Owning function id; 0 for a module root scope.
    pub function_id: i64,
    pub index: usize,
    pub arg_types: Vec<Value>,
    pub return_type: Value,
    /// None until compiled (and always None for built-in fragments, whose
    /// code lives outside the code buffer).
    pub compiled: Option<CodeRange>,
    pub compiled_labels: BTreeMap<String, usize>,
    /// One label per call/yield split point, in split-id order. Empty
    /// entries mark splits the code generator never reached.
    pub call_split_labels: Vec<String>,
    /// split index -> offset within the compiled blob
    pub call_split_offsets: HashMap<usize, usize>,
}

impl Fragment {
    pub fn new(function_id: i64, index: usize, arg_types: Vec<Value>) -> Self {
        Self {
            function_id,
            index,
            arg_types,
            return_type: Value::indeterminate(),
            compiled: None,
            compiled_labels: BTreeMap::new(),
            call_split_labels: Vec::new(),
            call_split_offsets: HashMap::new(),
        }
    }

    pub fn builtin(function_id: i64, index: usize, arg_types: Vec<Value>, return_type: Value) -> Self {
        let mut f = Self::new(function_id, index, arg_types);
        f.return_type = return_type;
        f
    }

    /// Match split labels against the compiled label map. Labels the code
    /// generator skipped (because an earlier split ended the fragment) are
    /// left unresolved.
    pub fn resolve_call_split_labels(&mut self) -> Result<(), CompileError> {
        let mut label_to_index: HashMap<&str, usize> = HashMap::new();
        for (x, label) in self.call_split_labels.iter().enumerate() {
            if label.is_empty() {
                continue;
            }
            if label_to_index.insert(label, x).is_some() {
                return Err(CompileError::compile(
                    format!("duplicate split label: {}", label),
                    None,
                ));
            }
        }

        for (label, offset) in &self.compiled_labels {
            if let Some(index) = label_to_index.get(label.as_str()) {
                self.call_split_offsets.insert(*index, *offset);
            }
        }
        Ok(())
    }
}

// ==================== Functions ====================

#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    pub name: String,
    pub default_value: Option<Value>,
}

/// Everything the compiler knows about one function, lambda, or method.
/// Built-in functions have no module and no AST; their fragments are
/// registered at startup and may not be recompiled.
#[derive(Debug, Clone)]
pub struct FunctionContext {
    pub module: Option<String>,
    pub id: i64,
    /// Nonzero when this function is a method; `id == class_id` marks the
    /// class's __init__.
    pub class_id: i64,
    pub name: String,
    pub has_ast: bool,
    /// The annotated function body (a lambda stores a synthesized return),
    /// recorded by the analysis pass. Fragment compilation re-analyzes it
    /// with the arguments bound to the concrete signature types.
    pub body: Option<Vec<Stmt>>,
    pub args: Vec<ArgumentSpec>,
    pub varargs_name: Option<String>,
    pub varkwargs_name: Option<String>,
    /// Local slot order is fixed after annotation.
    pub locals: BTreeMap<String, Value>,
    pub explicit_globals: HashSet<String>,
    pub deleted_variables: HashSet<String>,
    pub return_types: Vec<Value>,
    pub num_splits: i64,
    pub fragments: Vec<Fragment>,
    pub pass_exception_block: bool,
}

impl FunctionContext {
    pub fn new(module: Option<String>, id: i64) -> Self {
        Self {
            module,
            id,
            class_id: 0,
            name: String::new(),
            has_ast: false,
            body: None,
            args: Vec::new(),
            varargs_name: None,
            varkwargs_name: None,
            locals: BTreeMap::new(),
            explicit_globals: HashSet::new(),
            deleted_variables: HashSet::new(),
            return_types: Vec::new(),
            num_splits: 0,
            fragments: Vec::new(),
            pass_exception_block: false,
        }
    }

    /// Construct a built-in function from its fragment definitions. Every
    /// fragment must take the same number of arguments with fully known
    /// types, and defaults must agree across fragments.
    pub fn builtin(
        id: i64,
        name: &str,
        fragments: Vec<(Vec<Value>, Value)>,
    ) -> Result<Self, CompileError> {
        let mut ctx = Self::new(None, id);
        ctx.name = name.to_string();

        let Some(first) = fragments.first() else {
            return Err(CompileError::compile(
                format!("built-in function {} has no fragments", name),
                None,
            ));
        };

        for arg in &first.0 {
            if arg.value_type() == ValueType::Indeterminate {
                return Err(CompileError::compile(
                    "builtin functions must have known argument types",
                    None,
                ));
            }
            ctx.args.push(ArgumentSpec {
                name: String::new(),
                default_value: if arg.value_known() {
                    Some(arg.clone())
                } else {
                    None
                },
            });
        }

        for (arg_types, _) in &fragments {
            if arg_types.len() != ctx.args.len() {
                return Err(CompileError::compile(
                    "all fragments must take the same number of arguments",
                    None,
                ));
            }
            for (z, fragment_arg) in arg_types.iter().enumerate() {
                if fragment_arg.value_type() == ValueType::Indeterminate {
                    return Err(CompileError::compile(
                        "builtin functions must have known argument types",
                        None,
                    ));
                }
                if fragment_arg.value_known()
                    && ctx.args[z].default_value.as_ref() != Some(fragment_arg)
                {
                    return Err(CompileError::compile(
                        "all fragments must have the same default values",
                        None,
                    ));
                }
            }
        }

        for (arg_types, return_type) in fragments {
            ctx.add_return_type(return_type.clone());
            let index = ctx.fragments.len();
            ctx.fragments
                .push(Fragment::builtin(id, index, arg_types, return_type));
        }
        Ok(ctx)
    }

    pub fn is_class_init(&self) -> bool {
        self.id == self.class_id
    }

    pub fn is_builtin(&self) -> bool {
        !self.has_ast
    }

    /// Insert into the return-type set; see insert_return_type.
    pub fn add_return_type(&mut self, value: Value) {
        insert_return_type(&mut self.return_types, value);
    }

    /// Pick the best existing fragment for the given call argument types.
    /// Arity must match; a declared Indeterminate matches anything at the
    /// cost of one promotion (recursively through extension types);
    /// otherwise types must match exactly. Fewest promotions wins, with
    /// ties going to the lowest fragment index.
    pub fn fragment_index_for_call_args(
        &self,
        arg_types: &[Value],
    ) -> Result<Option<usize>, CompileError> {
        let mut best_index: Option<usize> = None;
        let mut best_score = i64::MAX;
        for (x, fragment) in self.fragments.iter().enumerate() {
            let Some(score) = match_call_arg_types(&fragment.arg_types, arg_types)? else {
                continue;
            };
            if best_index.is_none() || score < best_score {
                best_index = Some(x);
                best_score = score;
            }
        }
        Ok(best_index)
    }
}

/// Insert rule shared by a function's generic return-type set and a
/// fragment's derived one. Known values dedupe by equality; unknown values
/// dedupe against unknown entries of the same type, so a function whose
/// fragments all return unknown Int has one entry.
pub fn insert_return_type(set: &mut Vec<Value>, value: Value) {
    let duplicate = if value.value_known() {
        set.contains(&value)
    } else {
        set.iter()
            .any(|v| !v.value_known() && v.types_equal(&value))
    };
    if !duplicate {
        set.push(value);
    }
}

/// Promotion count if the declared types can satisfy the call types, None
/// if they cannot.
fn match_call_arg_types(
    declared: &[Value],
    call: &[Value],
) -> Result<Option<i64>, CompileError> {
    if declared.len() != call.len() {
        return Ok(None);
    }

    let mut promotion_count = 0;
    for (fn_arg, call_arg) in declared.iter().zip(call.iter()) {
        if call_arg.value_type() == ValueType::Indeterminate {
            return Err(CompileError::compile("call argument is Indeterminate", None));
        }

        if fn_arg.value_type() == ValueType::Indeterminate {
            promotion_count += 1;
            continue; // extension types are not checked for a wildcard
        }
        if fn_arg.value_type() != call_arg.value_type() {
            return Ok(None);
        }

        match match_call_arg_types(&fn_arg.extension_types, &call_arg.extension_types)? {
            None => return Ok(None),
            Some(extension_promotions) => promotion_count += extension_promotions,
        }
    }
    Ok(Some(promotion_count))
}

// ==================== Classes ====================

/// Instance layout: a header (refcount + destructor pointer) followed by
/// one 8-byte slot per dynamic attribute.
pub const INSTANCE_HEADER_SIZE: usize = 16;

#[derive(Debug, Clone)]
pub struct ClassContext {
    pub module: Option<String>,
    pub id: i64,
    pub name: String,
    pub has_ast: bool,
    pub attributes: BTreeMap<String, Value>,
    /// Slot index per mutable (non-Function, non-Class) attribute; fixed
    /// after class analysis.
    pub dynamic_attribute_indexes: BTreeMap<String, usize>,
    /// Opaque destructor handle, synthesized by the code generator when the
    /// class has refcounted attributes.
    pub destructor: Option<u64>,
}

impl ClassContext {
    pub fn new(module: Option<String>, id: i64) -> Self {
        Self {
            module,
            id,
            name: String::new(),
            has_ast: false,
            attributes: BTreeMap::new(),
            dynamic_attribute_indexes: BTreeMap::new(),
            destructor: None,
        }
    }

    /// Assign instance slots to every attribute that isn't a function or
    /// nested class. Rebuilt from scratch so a repeated class-body
    /// traversal lands on the same layout.
    pub fn populate_dynamic_attributes(&mut self) {
        self.dynamic_attribute_indexes.clear();
        for (name, value) in &self.attributes {
            if !matches!(
                value.value_type(),
                ValueType::Function | ValueType::Class
            ) {
                let index = self.dynamic_attribute_indexes.len();
                self.dynamic_attribute_indexes.insert(name.clone(), index);
            }
        }
    }

    pub fn attribute_count(&self) -> usize {
        self.dynamic_attribute_indexes.len()
    }

    pub fn instance_size(&self) -> usize {
        INSTANCE_HEADER_SIZE + 8 * self.attribute_count()
    }

    pub fn offset_for_attribute(&self, attribute: &str) -> Option<usize> {
        self.dynamic_attribute_indexes
            .get(attribute)
            .map(|index| INSTANCE_HEADER_SIZE + 8 * index)
    }

    pub fn has_refcounted_attributes(&self) -> bool {
        self.attributes.iter().any(|(name, value)| {
            self.dynamic_attribute_indexes.contains_key(name)
                && value.value_type().has_refcount()
        })
    }
}

// ==================== Modules ====================

/// Module globals that are statically initialized even for modules with
/// source; everything else is initialized by the compiled root scope.
pub const STATIC_INITIALIZE_MODULE_ATTRIBUTES: [&str; 2] = ["__name__", "__file__"];

pub struct ModuleContext {
    pub name: String,
    pub source: Option<SourceFile>,
    pub ast_root: Option<Module>,
    pub phase: Phase,
    /// Iteration order is the global slot order.
    pub globals: BTreeMap<String, Value>,
    pub globals_mutable: HashMap<String, bool>,
    /// Byte offset of this module's globals inside the global space; -1
    /// until reserved.
    pub global_base_offset: i64,
    /// Split counter for the root scope.
    pub num_splits: i64,
    pub compiled_root: Option<Fragment>,
    pub compiled_size: usize,
}

impl ModuleContext {
    /// A module with source, read from a file or given as literal code.
    pub fn from_source(name: &str, source: SourceFile, is_code: bool) -> Self {
        let file_value = if is_code {
            Value::unicode("__main__")
        } else {
            Value::unicode(source.filename())
        };
        let mut module = Self {
            name: name.to_string(),
            source: Some(source),
            ast_root: None,
            phase: Phase::Initial,
            globals: BTreeMap::new(),
            globals_mutable: HashMap::new(),
            global_base_offset: -1,
            num_splits: 0,
            compiled_root: None,
            compiled_size: 0,
        };
        module.seed_global("__name__", Value::unicode(name));
        module.seed_global("__file__", file_value);
        module
    }

    /// A source-less built-in module with pre-populated globals.
    pub fn builtin(name: &str, globals: BTreeMap<String, Value>) -> Self {
        let mut module = Self {
            name: name.to_string(),
            source: None,
            ast_root: None,
            phase: Phase::Initial,
            globals: BTreeMap::new(),
            globals_mutable: HashMap::new(),
            global_base_offset: -1,
            num_splits: 0,
            compiled_root: None,
            compiled_size: 0,
        };
        module.seed_global("__name__", Value::unicode(name));
        for (global_name, value) in globals {
            module.seed_global(&global_name, value);
        }
        module
    }

    fn seed_global(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_string(), value);
        self.globals_mutable.insert(name.to_string(), false);
    }

    /// Slot index of a global (its position in slot order).
    pub fn global_slot(&self, name: &str) -> Option<usize> {
        self.globals.keys().position(|k| k == name)
    }

    pub fn is_global_mutable(&self, name: &str) -> bool {
        self.globals_mutable.get(name).copied().unwrap_or(false)
    }
}

// ==================== Global context ====================

/// Owns every module, function, and class context, the id counter, the
/// global memory region, interned constants, and the code buffer. All
/// compiler state threads through this value; there are no process globals.
pub struct GlobalContext {
    pub modules: HashMap<String, ModuleRef>,
    pub import_paths: Vec<String>,

    pub function_contexts: HashMap<i64, FunctionContext>,
    pub class_contexts: HashMap<i64, ClassContext>,
    pub builtin_functions: HashMap<i64, FunctionContext>,
    pub builtin_classes: HashMap<i64, ClassContext>,
    pub builtin_names: HashMap<String, Value>,

    /// Flat region of 8-byte slots; offsets handed out by
    /// reserve_global_space are stable for the process lifetime.
    global_space: Vec<u64>,

    pub bytes_constants: HashMap<Vec<u8>, ObjectRef>,
    pub unicode_constants: HashMap<String, ObjectRef>,
    pub heap: Heap,
    pub code: CodeBuffer,

    /// Modules currently being phase-advanced (cyclic import guard).
    pub in_progress: HashSet<String>,
    pub next_callsite_token: i64,
    next_id: i64,
    next_builtin_id: i64,

    pub debug_flags: DebugFlags,
    pub argv: Vec<String>,
}

impl GlobalContext {
    pub fn new(import_paths: Vec<String>) -> Self {
        let mut global = Self {
            modules: HashMap::new(),
            import_paths,
            function_contexts: HashMap::new(),
            class_contexts: HashMap::new(),
            builtin_functions: HashMap::new(),
            builtin_classes: HashMap::new(),
            builtin_names: HashMap::new(),
            global_space: Vec::new(),
            bytes_constants: HashMap::new(),
            unicode_constants: HashMap::new(),
            heap: Heap::new(),
            code: CodeBuffer::new(),
            in_progress: HashSet::new(),
            next_callsite_token: 1,
            next_id: 1,
            next_builtin_id: -1,
            debug_flags: 0,
            argv: Vec::new(),
        };
        builtins::create_default_builtins(&mut global);
        global
    }

    /// Fresh id for a user-defined function, lambda, or class. Strictly
    /// increasing; id 0 is reserved.
    pub fn next_function_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Fresh (negative) id for a built-in function or class.
    pub fn next_builtin_function_id(&mut self) -> i64 {
        let id = self.next_builtin_id;
        self.next_builtin_id -= 1;
        id
    }

    pub fn register_module(&mut self, module: ModuleContext) -> ModuleRef {
        let name = module.name.clone();
        let module = Rc::new(RefCell::new(module));
        self.modules.insert(name, module.clone());
        module
    }

    /// Repeated calls with one name return the same module. A filename may
    /// be given explicitly; `filename_is_code` makes `filename` the literal
    /// source text instead.
    pub fn get_or_create_module(
        &mut self,
        module_name: &str,
        filename: Option<&str>,
        filename_is_code: bool,
    ) -> Result<ModuleRef, CompileError> {
        if let Some(module) = self.modules.get(module_name) {
            return Ok(module.clone());
        }

        if filename_is_code {
            let source = SourceFile::from_code(filename.unwrap_or_default());
            log::debug!(
                "[{}] added code from memory ({} lines, {} bytes)",
                module_name,
                source.line_count(),
                source.size()
            );
            return Ok(self.register_module(ModuleContext::from_source(module_name, source, true)));
        }

        let found_filename = match filename {
            Some(f) => f.to_string(),
            None => self.find_source_file(module_name)?,
        };
        let source = SourceFile::open(&found_filename).map_err(|e| {
            CompileError::compile(
                format!("can't read file {} for module {}: {}", found_filename, module_name, e),
                None,
            )
        })?;
        log::debug!(
            "[{}] loaded {} ({} lines, {} bytes)",
            module_name,
            found_filename,
            source.line_count(),
            source.size()
        );
        Ok(self.register_module(ModuleContext::from_source(module_name, source, false)))
    }

    /// Resolve a function id. Positive ids come from the registry (created
    /// on demand only when a creating module is given); negative ids are
    /// built-ins; 0 is "none".
    pub fn context_for_function(
        &mut self,
        function_id: i64,
        module_for_create: Option<&str>,
    ) -> Option<&mut FunctionContext> {
        if function_id == 0 {
            return None;
        }
        if function_id < 0 {
            return self.builtin_functions.get_mut(&function_id);
        }
        if let Some(module) = module_for_create {
            return Some(
                self.function_contexts
                    .entry(function_id)
                    .or_insert_with(|| FunctionContext::new(Some(module.to_string()), function_id)),
            );
        }
        self.function_contexts.get_mut(&function_id)
    }

    pub fn context_for_class(
        &mut self,
        class_id: i64,
        module_for_create: Option<&str>,
    ) -> Option<&mut ClassContext> {
        if class_id == 0 {
            return None;
        }
        if class_id < 0 {
            return self.builtin_classes.get_mut(&class_id);
        }
        if let Some(module) = module_for_create {
            return Some(
                self.class_contexts
                    .entry(class_id)
                    .or_insert_with(|| ClassContext::new(Some(module.to_string()), class_id)),
            );
        }
        self.class_contexts.get_mut(&class_id)
    }

    /// Intern a bytes constant; value-identical constants share one object,
    /// on which the registry holds one reference.
    pub fn get_or_create_bytes_constant(&mut self, data: &[u8]) -> ObjectRef {
        if let Some(object) = self.bytes_constants.get(data) {
            return *object;
        }
        let object = self.heap.bytes_new(data);
        self.bytes_constants.insert(data.to_vec(), object);
        object
    }

    pub fn get_or_create_unicode_constant(&mut self, data: &str) -> ObjectRef {
        if let Some(object) = self.unicode_constants.get(data) {
            return *object;
        }
        let object = self.heap.unicode_new(data);
        self.unicode_constants.insert(data.to_string(), object);
        object
    }

    /// Grow the global space by the given byte count (rounded up to whole
    /// slots), zeroing the new tail, and return the byte offset of the new
    /// region. Previously returned offsets stay valid forever.
    pub fn reserve_global_space(&mut self, bytes: usize) -> usize {
        let offset = self.global_space.len() * 8;
        let slots = bytes.div_ceil(8);
        self.global_space.resize(self.global_space.len() + slots, 0);
        offset
    }

    pub fn global_space_size(&self) -> usize {
        self.global_space.len() * 8
    }

    pub fn write_global_slot(&mut self, byte_offset: usize, value: u64) {
        let slot = byte_offset / 8;
        if let Some(cell) = self.global_space.get_mut(slot) {
            *cell = value;
        }
    }

    pub fn read_global_slot(&self, byte_offset: usize) -> Option<u64> {
        self.global_space.get(byte_offset / 8).copied()
    }
}

impl Drop for GlobalContext {
    fn drop(&mut self) {
        // release the registry's reference on each interned constant
        for (_, object) in self.bytes_constants.drain() {
            self.heap.delete_reference(object);
        }
        for (_, object) in self.unicode_constants.drain() {
            self.heap.delete_reference(object);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_identity() {
        let mut global = GlobalContext::new(vec![".".to_string()]);
        let a = global
            .get_or_create_module("m", Some("x = 1\n"), true)
            .unwrap();
        let b = global.get_or_create_module("m", None, false).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_module_seeds_name_and_file() {
        let mut global = GlobalContext::new(vec![]);
        let m = global
            .get_or_create_module("mod", Some("pass\n"), true)
            .unwrap();
        let m = m.borrow();
        assert_eq!(m.globals.get("__name__"), Some(&Value::unicode("mod")));
        assert_eq!(m.globals.get("__file__"), Some(&Value::unicode("__main__")));
        assert!(!m.is_global_mutable("__name__"));
    }

    #[test]
    fn test_constant_interning() {
        let mut global = GlobalContext::new(vec![]);
        let a = global.get_or_create_bytes_constant(b"shared");
        let b = global.get_or_create_bytes_constant(b"shared");
        let c = global.get_or_create_bytes_constant(b"other");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let u1 = global.get_or_create_unicode_constant("text");
        let u2 = global.get_or_create_unicode_constant("text");
        assert_eq!(u1, u2);
    }

    #[test]
    fn test_reserve_global_space() {
        let mut global = GlobalContext::new(vec![]);
        let a = global.reserve_global_space(16);
        let b = global.reserve_global_space(8);
        assert_eq!(a, 0);
        assert_eq!(b, 16);
        assert_eq!(global.global_space_size(), 24);
        assert_eq!(global.read_global_slot(a), Some(0));

        global.write_global_slot(a, 99);
        let _ = global.reserve_global_space(1024);
        assert_eq!(global.read_global_slot(a), Some(99));
    }

    #[test]
    fn test_fragment_matching_promotions() {
        let mut ctx = FunctionContext::new(Some("m".to_string()), 1);
        ctx.has_ast = true;
        ctx.fragments.push(Fragment::new(
            1,
            0,
            vec![Value::unknown(ValueType::Indeterminate)],
        ));
        ctx.fragments
            .push(Fragment::new(1, 1, vec![Value::unknown(ValueType::Int)]));

        // an exact match beats a wildcard
        assert_eq!(
            ctx.fragment_index_for_call_args(&[Value::unknown(ValueType::Int)])
                .unwrap(),
            Some(1)
        );
        // the wildcard catches everything else
        assert_eq!(
            ctx.fragment_index_for_call_args(&[Value::unknown(ValueType::Bytes)])
                .unwrap(),
            Some(0)
        );
        // arity mismatch matches nothing
        assert_eq!(ctx.fragment_index_for_call_args(&[]).unwrap(), None);
    }

    #[test]
    fn test_fragment_matching_extension_types() {
        let list_int = Value::unknown_with_extension_types(
            ValueType::List,
            vec![Value::unknown(ValueType::Int)],
        );
        let list_bytes = Value::unknown_with_extension_types(
            ValueType::List,
            vec![Value::unknown(ValueType::Bytes)],
        );

        let mut ctx = FunctionContext::new(Some("m".to_string()), 1);
        ctx.has_ast = true;
        ctx.fragments.push(Fragment::new(1, 0, vec![list_int.clone()]));

        assert_eq!(
            ctx.fragment_index_for_call_args(std::slice::from_ref(&list_int))
                .unwrap(),
            Some(0)
        );
        assert_eq!(
            ctx.fragment_index_for_call_args(std::slice::from_ref(&list_bytes))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_indeterminate_call_arg_is_an_error() {
        let mut ctx = FunctionContext::new(Some("m".to_string()), 1);
        ctx.fragments.push(Fragment::new(1, 0, vec![Value::unknown(ValueType::Int)]));
        assert!(ctx
            .fragment_index_for_call_args(&[Value::indeterminate()])
            .is_err());
    }

    #[test]
    fn test_tie_prefers_lower_fragment_index() {
        let mut ctx = FunctionContext::new(Some("m".to_string()), 1);
        ctx.fragments
            .push(Fragment::new(1, 0, vec![Value::unknown(ValueType::Int)]));
        ctx.fragments
            .push(Fragment::new(1, 1, vec![Value::unknown(ValueType::Int)]));
        assert_eq!(
            ctx.fragment_index_for_call_args(&[Value::unknown(ValueType::Int)])
                .unwrap(),
            Some(0)
        );
    }

    #[test]
    fn test_class_dynamic_attributes() {
        let mut cls = ClassContext::new(Some("m".to_string()), 7);
        cls.attributes
            .insert("v".to_string(), Value::unknown(ValueType::Int));
        cls.attributes
            .insert("name".to_string(), Value::unknown(ValueType::Unicode));
        cls.attributes
            .insert("method".to_string(), Value::function(9));
        cls.populate_dynamic_attributes();

        assert_eq!(cls.attribute_count(), 2);
        assert_eq!(cls.instance_size(), INSTANCE_HEADER_SIZE + 16);
        // sorted attribute order: "name" then "v"
        assert_eq!(cls.offset_for_attribute("name"), Some(INSTANCE_HEADER_SIZE));
        assert_eq!(cls.offset_for_attribute("v"), Some(INSTANCE_HEADER_SIZE + 8));
        assert_eq!(cls.offset_for_attribute("method"), None);
        assert!(cls.has_refcounted_attributes());
    }

    #[test]
    fn test_builtin_function_construction() {
        let ctx = FunctionContext::builtin(
            -5,
            "len",
            vec![
                (vec![Value::unknown(ValueType::Bytes)], Value::unknown(ValueType::Int)),
                (vec![Value::unknown(ValueType::Unicode)], Value::unknown(ValueType::Int)),
            ],
        )
        .unwrap();
        assert!(ctx.is_builtin());
        assert_eq!(ctx.fragments.len(), 2);
        assert_eq!(ctx.args.len(), 1);

        // Indeterminate args are rejected
        assert!(FunctionContext::builtin(
            -6,
            "bad",
            vec![(vec![Value::indeterminate()], Value::none())],
        )
        .is_err());
    }

    #[test]
    fn test_resolve_call_split_labels() {
        let mut fragment = Fragment::new(1, 0, vec![]);
        fragment.call_split_labels = vec!["cs_1".to_string(), String::new(), "cs_3".to_string()];
        fragment.compiled_labels.insert("cs_1".to_string(), 4);
        fragment.compiled_labels.insert("cs_3".to_string(), 12);
        fragment.compiled_labels.insert("entry".to_string(), 0);
        fragment.resolve_call_split_labels().unwrap();
        assert_eq!(fragment.call_split_offsets.get(&0), Some(&4));
        assert_eq!(fragment.call_split_offsets.get(&2), Some(&12));
        assert_eq!(fragment.call_split_offsets.get(&1), None);
    }
}
