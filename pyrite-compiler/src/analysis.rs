// The analysis pass: evaluates every expression against the value lattice
// and records the result on variables, class attributes, and function
// return types. The inferred value of the expression under evaluation
// rides in `current_value`; statement visitors consume it.

use std::collections::{HashMap, HashSet};

use pyrite_ast::value::{Value, ValueKind, ValueType};
use pyrite_ast::visit::{self, VisitMut};
use pyrite_ast::*;
use pyrite_diagnostics::{CompileError, Result};

use crate::contexts::{GlobalContext, ModuleRef, Phase};
use crate::driver;
use crate::operators::{
    execute_binary_operator, execute_ternary_operator, execute_unary_operator,
};

pub struct AnalysisVisitor<'a> {
    global: &'a mut GlobalContext,
    module: ModuleRef,
    module_name: String,
    in_function_id: i64,
    in_class_id: i64,
    current_value: Value,
    /// Call sites may request callee fragments on demand. Disabled inside
    /// the per-fragment derivation pass so recursive functions terminate.
    specialize_calls: bool,
    /// Set by the per-fragment derivation pass: returns of the named
    /// function are collected here instead of its generic return-type set
    /// (which a self-call inside the body still reads).
    fragment_returns: Option<(i64, Vec<Value>)>,
}

impl<'a> AnalysisVisitor<'a> {
    pub fn new(global: &'a mut GlobalContext, module: &ModuleRef) -> Self {
        let module_name = module.borrow().name.clone();
        Self {
            global,
            module: module.clone(),
            module_name,
            in_function_id: 0,
            in_class_id: 0,
            current_value: Value::indeterminate(),
            specialize_calls: true,
            fragment_returns: None,
        }
    }

    /// A visitor restricted to one function body, used by
    /// derive_fragment_return_type.
    fn for_specialization(
        global: &'a mut GlobalContext,
        module: &ModuleRef,
        function_id: i64,
    ) -> Self {
        let mut visitor = Self::new(global, module);
        visitor.in_function_id = function_id;
        visitor.specialize_calls = false;
        visitor.fragment_returns = Some((function_id, Vec::new()));
        visitor
    }

    /// Union a returned (or yielded) value into the right return-type set:
    /// the fragment's during derivation, the function's otherwise.
    fn record_return_type(&mut self, value: Value) {
        if let Some((function_id, set)) = &mut self.fragment_returns {
            if *function_id == self.in_function_id {
                crate::contexts::insert_return_type(set, value);
                return;
            }
        }
        if let Some(function) = self.global.function_contexts.get_mut(&self.in_function_id) {
            function.add_return_type(value);
        }
    }

    fn take_value(&mut self) -> Value {
        std::mem::take(&mut self.current_value)
    }

    // ==================== assignment recording ====================

    /// The lattice merge rule for a destination slot: an Indeterminate slot
    /// takes the new value; otherwise the types must match and the payload
    /// is cleared (this is not the first write).
    fn merge_slot(slot: &mut Value, value: Value, name: &str, offset: usize) -> Result<()> {
        if slot.value_type() == ValueType::Indeterminate {
            *slot = value;
            return Ok(());
        }
        if !slot.types_equal(&value) {
            return Err(CompileError::analysis(
                format!("{} changes type (from {} to {})", name, slot, value),
                offset,
            ));
        }
        slot.clear_value();
        Ok(())
    }

    fn record_assignment_global(&mut self, name: &str, value: Value, offset: usize) -> Result<()> {
        let mut module = self.module.borrow_mut();
        let Some(slot) = module.globals.get_mut(name) else {
            return Err(CompileError::analysis(
                format!("global {} not found in annotation phase", name),
                offset,
            ));
        };
        Self::merge_slot(slot, value, name, offset)
    }

    fn record_assignment_local(&mut self, name: &str, value: Value, offset: usize) -> Result<()> {
        let Some(function) = self.global.function_contexts.get_mut(&self.in_function_id) else {
            return Err(CompileError::analysis("write outside any function", offset));
        };
        let Some(slot) = function.locals.get_mut(name) else {
            return Err(CompileError::analysis(
                format!("local variable {} not found in annotation phase", name),
                offset,
            ));
        };
        Self::merge_slot(slot, value, name, offset)
    }

    fn record_assignment_attribute(
        &mut self,
        class_id: i64,
        name: &str,
        value: Value,
        allow_create: bool,
        offset: usize,
    ) -> Result<()> {
        let Some(class) = self.global.context_for_class(class_id, None) else {
            return Err(CompileError::analysis(
                format!("class {} does not have a context", class_id),
                offset,
            ));
        };
        if let Some(slot) = class.attributes.get_mut(name) {
            return Self::merge_slot(slot, value, name, offset);
        }
        if !allow_create {
            return Err(CompileError::analysis(
                format!(
                    "class does not have attribute {}; it must be assigned in __init__",
                    name
                ),
                offset,
            ));
        }
        // attributes introduced by __init__ are created on first write
        class.attributes.insert(name.to_string(), value);
        Ok(())
    }

    fn record_assignment(&mut self, name: &str, value: Value, offset: usize) -> Result<()> {
        if self.in_function_id != 0 {
            let explicit = self
                .global
                .function_contexts
                .get(&self.in_function_id)
                .map(|f| f.explicit_globals.contains(name))
                .unwrap_or(false);
            if explicit {
                return self.record_assignment_global(name, value, offset);
            }
            return self.record_assignment_local(name, value, offset);
        }

        if self.in_class_id != 0 {
            return self.record_assignment_attribute(self.in_class_id, name, value, false, offset);
        }

        self.record_assignment_global(name, value, offset)
    }

    fn operator_error(message: String, offset: usize) -> CompileError {
        CompileError::analysis(message, offset)
    }

    /// The argument-type tuple a call presents for specialization: the
    /// positional argument types, with the receiver injected for methods
    /// and trailing defaults filled in. None when the signature can't be
    /// completed statically.
    fn call_signature(
        &self,
        callee_id: i64,
        callee: &Value,
        arg_values: &[Value],
    ) -> Option<Vec<Value>> {
        let context = self.global.function_contexts.get(&callee_id)?;

        let mut signature: Vec<Value> = Vec::with_capacity(context.args.len());
        if context.class_id != 0 && callee.value_type() == ValueType::Function {
            // a bound method receives its instance first
            signature.push(Value::instance(context.class_id, None));
        }
        for value in arg_values {
            signature.push(value.type_only());
        }
        if signature.len() > context.args.len() {
            return None;
        }
        for arg in context.args.iter().skip(signature.len()) {
            signature.push(arg.default_value.as_ref()?.type_only());
        }
        if signature
            .iter()
            .any(|v| v.value_type() == ValueType::Indeterminate)
        {
            return None;
        }
        Some(signature)
    }
}

/// Re-analyze one function body with its arguments bound to the concrete
/// types of a call signature. This is the per-fragment specialization
/// pass: the return-type set it derives belongs to the fragment being
/// compiled, not to the function in general. Returns go to a side set (so
/// a self-call still reads the generic view) and the generic locals are
/// restored afterwards.
pub(crate) fn derive_fragment_return_type(
    global: &mut GlobalContext,
    function_id: i64,
    arg_types: &[Value],
) -> Result<Value> {
    let Some(context) = global.function_contexts.get(&function_id) else {
        return Err(CompileError::compile(
            format!("call to unknown function {}", function_id),
            None,
        ));
    };
    let generic = generic_return_type(&context.return_types);
    let is_init = context.is_class_init();

    let Some(mut body) = context.body.clone() else {
        return Ok(generic);
    };
    if context.args.len() != arg_types.len() {
        return Ok(generic);
    }
    let arg_names: Vec<String> = context.args.iter().map(|a| a.name.clone()).collect();
    let saved_locals = context.locals.clone();
    let module = context
        .module
        .as_ref()
        .and_then(|name| global.modules.get(name))
        .cloned();
    let Some(module) = module else {
        return Ok(generic);
    };

    if let Some(context) = global.function_contexts.get_mut(&function_id) {
        for (name, value) in arg_names.iter().zip(arg_types.iter()) {
            context.locals.insert(name.clone(), value.type_only());
        }
    }

    let mut visitor = AnalysisVisitor::for_specialization(global, &module, function_id);
    let result = visit::visit_stmt_list(&mut visitor, &mut body);
    let derived = visitor
        .fragment_returns
        .take()
        .map(|(_, set)| set)
        .unwrap_or_default();

    // restore the generic locals even when specialization failed
    if let Some(context) = global.function_contexts.get_mut(&function_id) {
        context.locals = saved_locals;
    }
    result?;

    if is_init {
        return Ok(Value::instance(function_id, None));
    }
    Ok(generic_return_type(&derived))
}

fn generic_return_type(return_types: &[Value]) -> Value {
    match return_types.len() {
        0 => Value::none(),
        1 => return_types[0].clone(),
        _ => Value::indeterminate(),
    }
}

impl<'a> VisitMut for AnalysisVisitor<'a> {
    // ==================== expressions ====================

    fn visit_unary(&mut self, x: &mut UnaryOperation) -> Result<()> {
        self.visit_expr(&mut x.expr)?;
        let operand = self.take_value();
        self.current_value = execute_unary_operator(x.oper, &operand).map_err(|e| {
            Self::operator_error(format!("unary operator execution failed: {}", e), x.offset)
        })?;
        Ok(())
    }

    fn visit_binary(&mut self, x: &mut BinaryOperation) -> Result<()> {
        self.visit_expr(&mut x.left)?;
        let left = self.take_value();
        self.visit_expr(&mut x.right)?;
        let right = self.take_value();
        self.current_value = execute_binary_operator(x.oper, &left, &right).map_err(|e| {
            Self::operator_error(format!("binary operator execution failed: {}", e), x.offset)
        })?;
        Ok(())
    }

    fn visit_ternary(&mut self, x: &mut TernaryOperation) -> Result<()> {
        self.visit_expr(&mut x.left)?;
        let left = self.take_value();
        self.visit_expr(&mut x.center)?;
        let center = self.take_value();
        self.visit_expr(&mut x.right)?;
        let right = self.take_value();
        self.current_value =
            execute_ternary_operator(x.oper, &left, &center, &right).map_err(|e| {
                Self::operator_error(
                    format!("ternary operator execution failed: {}", e),
                    x.offset,
                )
            })?;
        Ok(())
    }

    fn visit_list_ctor(&mut self, x: &mut ListConstructor) -> Result<()> {
        let mut items = Vec::with_capacity(x.items.len());
        for item in &mut x.items {
            self.visit_expr(item)?;
            items.push(self.take_value());
        }
        let value = Value::list(items);
        x.value_type = value.extension_types.first().cloned();
        self.current_value = value;
        Ok(())
    }

    fn visit_set_ctor(&mut self, x: &mut SetConstructor) -> Result<()> {
        let mut items = HashSet::new();
        for item in &mut x.items {
            self.visit_expr(item)?;
            items.insert(self.take_value());
        }
        let value = Value::set(items);
        x.value_type = value.extension_types.first().cloned();
        self.current_value = value;
        Ok(())
    }

    fn visit_dict_ctor(&mut self, x: &mut DictConstructor) -> Result<()> {
        let mut items = HashMap::new();
        for (key_expr, value_expr) in &mut x.items {
            self.visit_expr(key_expr)?;
            let key = self.take_value();
            self.visit_expr(value_expr)?;
            items.insert(key, self.take_value());
        }
        let value = Value::dict(items);
        x.key_type = value.extension_types.first().cloned();
        x.value_type = value.extension_types.get(1).cloned();
        self.current_value = value;
        Ok(())
    }

    fn visit_tuple_ctor(&mut self, x: &mut TupleConstructor) -> Result<()> {
        let mut items = Vec::with_capacity(x.items.len());
        for item in &mut x.items {
            self.visit_expr(item)?;
            items.push(self.take_value());
        }
        x.value_types = items.iter().map(Value::type_only).collect();
        self.current_value = Value::tuple(items);
        Ok(())
    }

    // comprehensions evaluate to unknown-valued containers
    fn visit_list_comp(&mut self, _x: &mut ListComprehension) -> Result<()> {
        self.current_value = Value::unknown(ValueType::List);
        Ok(())
    }

    fn visit_set_comp(&mut self, _x: &mut SetComprehension) -> Result<()> {
        self.current_value = Value::unknown(ValueType::Set);
        Ok(())
    }

    fn visit_dict_comp(&mut self, _x: &mut DictComprehension) -> Result<()> {
        self.current_value = Value::unknown(ValueType::Dict);
        Ok(())
    }

    fn visit_lambda(&mut self, x: &mut LambdaDefinition) -> Result<()> {
        let prev_function_id = self.in_function_id;
        self.in_function_id = x.function_id;

        if let Some(function) = self.global.function_contexts.get_mut(&x.function_id) {
            function.args.clear();
            function.varargs_name = x.args.varargs_name.clone();
            function.varkwargs_name = x.args.varkwargs_name.clone();
        }

        for arg in &mut x.args.args {
            let default_value = match &mut arg.default_value {
                Some(expr) => {
                    self.visit_expr(expr)?;
                    let value = self.take_value();
                    if value.value_type() == ValueType::Indeterminate {
                        return Err(CompileError::analysis(
                            "default value has Indeterminate type",
                            x.offset,
                        ));
                    }
                    if !value.value_known() {
                        return Err(CompileError::analysis(
                            "can't resolve default value",
                            x.offset,
                        ));
                    }
                    Some(value)
                }
                None => None,
            };
            if let Some(function) = self.global.function_contexts.get_mut(&x.function_id) {
                function.args.push(crate::contexts::ArgumentSpec {
                    name: arg.name.clone(),
                    default_value,
                });
            }
        }

        self.visit_expr(&mut x.result)?;
        let result = self.take_value();
        if let Some(function) = self.global.function_contexts.get_mut(&x.function_id) {
            function.add_return_type(result);
            // a lambda body is one implicit return
            function.body = Some(vec![Stmt::Return(ReturnStatement {
                value: Some((*x.result).clone()),
                offset: x.offset,
            })]);
        }

        self.in_function_id = prev_function_id;
        self.current_value = Value::function(x.function_id);
        Ok(())
    }

    fn visit_call(&mut self, x: &mut FunctionCall) -> Result<()> {
        // the callee had better be a function or class
        self.visit_expr(&mut x.function)?;
        let function = self.take_value();
        if !matches!(
            function.value_type(),
            ValueType::Function | ValueType::Class
        ) {
            return Err(CompileError::analysis(
                format!("cannot call a non-function/class object: {}", function),
                x.offset,
            ));
        }

        let mut arg_values = Vec::with_capacity(x.args.len());
        for arg in &mut x.args {
            self.visit_expr(arg)?;
            arg_values.push(self.take_value());
        }
        for (_, arg) in &mut x.kwargs {
            self.visit_expr(arg)?;
        }

        // we probably can't know the return value yet, but we'll try
        self.current_value = Value::indeterminate();

        let callee_id = match &function.kind {
            ValueKind::Function(Some(id)) | ValueKind::Class(Some(id)) => Some(*id),
            _ => None,
        };
        if let Some(callee_id) = callee_id {
            x.callee_function_id = callee_id;

            // if the callee is built-in, in this module, or in a module at
            // the Analyzed phase or later, its return types are known
            let callee = if callee_id < 0 {
                self.global.builtin_functions.get(&callee_id)
            } else {
                self.global.function_contexts.get(&callee_id)
            };
            if let Some(callee) = callee {
                let module_settled = match &callee.module {
                    None => true,
                    Some(name) if *name == self.module_name => true,
                    Some(name) => self
                        .global
                        .modules
                        .get(name)
                        .map(|m| m.borrow().phase >= Phase::Analyzed)
                        .unwrap_or(false),
                };
                if module_settled {
                    if callee.return_types.is_empty() {
                        self.current_value = Value::none();
                    } else if callee.return_types.len() == 1 {
                        self.current_value = callee.return_types[0].clone();
                    }
                }
            }

            // per-argument-type-signature specialization: when the generic
            // return type is unknown but every argument type is known, the
            // call site requests the callee's fragment and takes that
            // fragment's own return type
            if self.specialize_calls
                && callee_id > 0
                && self.current_value.value_type() == ValueType::Indeterminate
                && x.kwargs.is_empty()
                && x.varargs.is_none()
                && x.varkwargs.is_none()
            {
                if let Some(signature) = self.call_signature(callee_id, &function, &arg_values) {
                    let index = driver::resolve_function_call(self.global, callee_id, signature)?;
                    let fragment_return = self
                        .global
                        .function_contexts
                        .get(&callee_id)
                        .and_then(|c| c.fragments.get(index))
                        .map(|f| f.return_type.clone());
                    if let Some(fragment_return) = fragment_return {
                        if fragment_return.value_type() != ValueType::Indeterminate {
                            self.current_value = fragment_return;
                        }
                    }
                }
            }
        }

        // a known result type means this split can't change the local
        // variable signature; cancel it
        if self.current_value.value_type() != ValueType::Indeterminate {
            x.split_id = 0;
        }
        Ok(())
    }

    fn visit_index(&mut self, x: &mut ArrayIndex) -> Result<()> {
        self.visit_expr(&mut x.array)?;
        if self.current_value.value_type() == ValueType::Indeterminate {
            // don't even look at the index; nothing is knowable here
            return Ok(());
        }
        let array = self.take_value();

        self.visit_expr(&mut x.index)?;
        let index = self.take_value();

        // integer-indexed types
        if matches!(
            array.value_type(),
            ValueType::Bytes | ValueType::Unicode | ValueType::List | ValueType::Tuple
        ) {
            if !matches!(
                index.value_type(),
                ValueType::Bool | ValueType::Int | ValueType::Indeterminate
            ) {
                return Err(CompileError::analysis(
                    "array subscript is not Bool or Int",
                    x.offset,
                ));
            }
            if let Some(value) = index.as_int() {
                x.index_constant = true;
                x.index_value = value;
            }
            if !array.value_known() {
                self.current_value = Value::indeterminate();
                return Ok(());
            }
        }

        match &array.kind {
            ValueKind::Bytes(Some(data)) => {
                let Some(raw_index) = index.as_int() else {
                    self.current_value = Value::unknown(ValueType::Bytes);
                    return Ok(());
                };
                let folded = fold_index(raw_index, data.len());
                self.current_value = match folded {
                    Some(i) => Value::bytes(vec![data[i]]),
                    None => Value::indeterminate(),
                };
            }

            ValueKind::Unicode(Some(data)) => {
                let Some(raw_index) = index.as_int() else {
                    self.current_value = Value::unknown(ValueType::Unicode);
                    return Ok(());
                };
                let chars: Vec<char> = data.chars().collect();
                let folded = fold_index(raw_index, chars.len());
                self.current_value = match folded {
                    Some(i) => Value::unicode(chars[i].to_string()),
                    None => Value::indeterminate(),
                };
            }

            ValueKind::List(Some(items)) | ValueKind::Tuple(Some(items)) => {
                let Some(raw_index) = index.as_int() else {
                    // with the value known but not the index, the result
                    // type is the items' common type
                    self.current_value = common_item_type(items.iter());
                    return Ok(());
                };
                let folded = fold_index(raw_index, items.len());
                self.current_value = match folded {
                    Some(i) => items[i].clone(),
                    None => Value::indeterminate(),
                };
            }

            ValueKind::Dict(contents) => {
                let Some(contents) = contents else {
                    self.current_value = Value::indeterminate();
                    return Ok(());
                };
                if !index.value_known() {
                    self.current_value = common_item_type(contents.values());
                    return Ok(());
                }
                self.current_value = contents
                    .get(&index)
                    .cloned()
                    .unwrap_or_else(Value::indeterminate);
            }

            _ => {
                return Err(CompileError::analysis(
                    format!("invalid subscript reference {}[{}]", array, index),
                    x.offset,
                ));
            }
        }
        Ok(())
    }

    fn visit_slice(&mut self, x: &mut ArraySlice) -> Result<()> {
        Err(CompileError::analysis(
            "array slices are currently not supported",
            x.offset,
        ))
    }

    fn visit_int(&mut self, x: &mut IntegerConstant) -> Result<()> {
        self.current_value = Value::int(x.value);
        Ok(())
    }

    fn visit_float(&mut self, x: &mut FloatConstant) -> Result<()> {
        self.current_value = Value::float(x.value);
        Ok(())
    }

    fn visit_bytes(&mut self, x: &mut BytesConstant) -> Result<()> {
        self.current_value = Value::bytes(x.value.clone());
        Ok(())
    }

    fn visit_unicode(&mut self, x: &mut UnicodeConstant) -> Result<()> {
        self.current_value = Value::unicode(x.value.clone());
        Ok(())
    }

    fn visit_true(&mut self, _x: &mut TrueConstant) -> Result<()> {
        self.current_value = Value::bool_value(true);
        Ok(())
    }

    fn visit_false(&mut self, _x: &mut FalseConstant) -> Result<()> {
        self.current_value = Value::bool_value(false);
        Ok(())
    }

    fn visit_none(&mut self, _x: &mut NoneConstant) -> Result<()> {
        self.current_value = Value::none();
        Ok(())
    }

    fn visit_variable(&mut self, x: &mut VariableLookup) -> Result<()> {
        // built-in names resolve first; annotation already rejected any
        // assignment to them, so there's no conflict
        if let Some(value) = self.global.builtin_names.get(&x.name) {
            self.current_value = value.clone();
            return Ok(());
        }

        if self.in_function_id != 0 {
            if let Some(value) = self
                .global
                .function_contexts
                .get(&self.in_function_id)
                .and_then(|f| f.locals.get(&x.name))
            {
                self.current_value = value.clone();
                return Ok(());
            }
            if let Some(value) = self.module.borrow().globals.get(&x.name) {
                self.current_value = value.clone();
                return Ok(());
            }
            return Err(CompileError::analysis(
                format!("variable {} does not exist", x.name),
                x.offset,
            ));
        }

        // all lookups outside of a function are globals
        match self.module.borrow().globals.get(&x.name) {
            Some(value) => {
                self.current_value = value.clone();
                Ok(())
            }
            None => Err(CompileError::analysis(
                format!("global {} does not exist", x.name),
                x.offset,
            )),
        }
    }

    fn visit_attribute(&mut self, x: &mut AttributeLookup) -> Result<()> {
        self.visit_expr(&mut x.base)?;
        let base = self.take_value();

        match &base.kind {
            ValueKind::Indeterminate => Err(CompileError::analysis(
                "attribute lookup on Indeterminate variable",
                x.offset,
            )),
            ValueKind::ExtensionTypeReference(_) => Err(CompileError::analysis(
                "attribute lookup on ExtensionTypeReference variable",
                x.offset,
            )),
            ValueKind::None
            | ValueKind::Bool(_)
            | ValueKind::Int(_)
            | ValueKind::Float(_)
            | ValueKind::Function(_) => Err(CompileError::analysis(
                format!("attribute lookup on {} value", base.value_type()),
                x.offset,
            )),

            // methods on the built-in collection classes live in the
            // runtime object library, which is outside the compiler core
            ValueKind::Bytes(_)
            | ValueKind::Unicode(_)
            | ValueKind::List(_)
            | ValueKind::Tuple(_)
            | ValueKind::Set(_)
            | ValueKind::Dict(_) => Err(CompileError::analysis(
                format!(
                    "attribute lookup on {} values requires the runtime class library",
                    base.value_type()
                ),
                x.offset,
            )),

            ValueKind::Class(Some(class_id)) => {
                self.resolve_class_attribute(*class_id, &x.name, x.offset)
            }
            ValueKind::Class(None) => Err(CompileError::analysis(
                "attribute lookup on unknown class",
                x.offset,
            )),
            ValueKind::Instance { class_id, .. } => {
                self.resolve_class_attribute(*class_id, &x.name, x.offset)
            }

            // module attribute reads force the module to Analyzed
            ValueKind::Module(Some(module_name)) => {
                let module_name = module_name.clone();
                x.base_module_name = Some(module_name.clone());
                let other =
                    driver::get_module_at_phase(self.global, &module_name, Phase::Analyzed)?;
                let value = other.borrow().globals.get(&x.name).cloned();
                match value {
                    Some(value) => {
                        self.current_value = value;
                        Ok(())
                    }
                    None => Err(CompileError::analysis(
                        "module attribute lookup refers to missing attribute",
                        x.offset,
                    )),
                }
            }
            ValueKind::Module(None) => Err(CompileError::analysis(
                "attribute lookup on unknown module",
                x.offset,
            )),
        }
    }

    // ==================== l-values ====================

    fn visit_name_target(&mut self, x: &mut NameTarget) -> Result<()> {
        if self.global.builtin_names.contains_key(&x.name) {
            return Err(CompileError::analysis(
                format!("cannot reassign built-in name {}", x.name),
                x.offset,
            ));
        }
        let value = self.current_value.clone();
        self.record_assignment(&x.name.clone(), value, x.offset)
    }

    fn visit_attribute_target(&mut self, x: &mut AttributeTarget) -> Result<()> {
        let value = self.take_value();

        // the base must be a class instance; arbitrary attribute creation
        // on arbitrary objects is unsupported
        self.visit_expr(&mut x.base)?;
        let base = self.take_value();
        let ValueKind::Instance { class_id, .. } = base.kind else {
            return Err(CompileError::analysis(
                format!("cannot write attribute on {}", base),
                x.offset,
            ));
        };

        let allow_create = self
            .global
            .function_contexts
            .get(&self.in_function_id)
            .map(|f| f.is_class_init())
            .unwrap_or(false);
        self.record_assignment_attribute(class_id, &x.name.clone(), value, allow_create, x.offset)
    }

    fn visit_index_target(&mut self, _x: &mut IndexTarget) -> Result<()> {
        // subscript writes don't refine the lattice
        Ok(())
    }

    fn visit_slice_target(&mut self, _x: &mut SliceTarget) -> Result<()> {
        Ok(())
    }

    fn visit_tuple_target(&mut self, x: &mut TupleTarget) -> Result<()> {
        // the value was evaluated before the unpacking format
        let value = self.take_value();
        if !matches!(value.value_type(), ValueType::List | ValueType::Tuple) {
            return Err(CompileError::analysis(
                "cannot unpack something that's not a List or Tuple",
                x.offset,
            ));
        }
        let items = match value.kind {
            ValueKind::List(Some(items)) | ValueKind::Tuple(Some(items)) => items,
            _ => {
                return Err(CompileError::analysis(
                    "cannot unpack unknown values",
                    x.offset,
                ))
            }
        };
        if items.len() != x.items.len() {
            return Err(CompileError::analysis(
                "unpacking format length doesn't match List/Tuple count",
                x.offset,
            ));
        }

        for (item_value, target) in items.into_iter().zip(x.items.iter_mut()) {
            self.current_value = item_value;
            self.visit_lvalue(target)?;
        }
        Ok(())
    }

    // ==================== statements ====================

    fn visit_augment(&mut self, x: &mut AugmentStatement) -> Result<()> {
        Err(CompileError::analysis(
            "augmented assignment is not yet implemented",
            x.offset,
        ))
    }

    fn visit_delete(&mut self, x: &mut DeleteStatement) -> Result<()> {
        if self.in_function_id != 0 {
            Err(CompileError::analysis(
                "del is not yet implemented",
                x.offset,
            ))
        } else {
            Err(CompileError::analysis(
                "del is only supported in functions",
                x.offset,
            ))
        }
    }

    fn visit_import(&mut self, x: &mut ImportStatement) -> Result<()> {
        // the annotation pass created the bindings; this pass copies values

        if x.import_star {
            return Err(CompileError::analysis("import * is not supported", x.offset));
        }

        // whole-module imports already carry the right Module value
        if x.names.is_empty() {
            return Ok(());
        }

        let module_name = x.modules[0].0.clone();
        let other = driver::get_module_at_phase(self.global, &module_name, Phase::Analyzed)?;
        for (name, rename) in &x.names {
            let value = other.borrow().globals.get(name).cloned();
            let Some(value) = value else {
                return Err(CompileError::analysis(
                    format!("imported name {} not defined in source module", name),
                    x.offset,
                ));
            };
            if self.in_function_id != 0 {
                if let Some(function) =
                    self.global.function_contexts.get_mut(&self.in_function_id)
                {
                    function.locals.insert(rename.clone(), value);
                }
            } else {
                self.module
                    .borrow_mut()
                    .globals
                    .insert(rename.clone(), value);
            }
        }
        Ok(())
    }

    fn visit_global(&mut self, _x: &mut GlobalStatement) -> Result<()> {
        // annotation extracted everything useful
        Ok(())
    }

    fn visit_exec(&mut self, x: &mut ExecStatement) -> Result<()> {
        Err(CompileError::analysis(
            "exec statements are not supported",
            x.offset,
        ))
    }

    fn visit_assert(&mut self, x: &mut AssertStatement) -> Result<()> {
        self.visit_expr(&mut x.check)?;
        let check = self.take_value();

        // the failure message only matters if the check isn't provably true
        if check.truth_value() != Some(true) {
            if let Some(failure_message) = &mut x.failure_message {
                self.visit_expr(failure_message)?;
                let message = self.take_value();
                if message.value_type() != ValueType::Unicode {
                    return Err(CompileError::analysis(
                        "assertion failure message is not Unicode",
                        x.offset,
                    ));
                }
            }
        }
        Ok(())
    }

    fn visit_return(&mut self, x: &mut ReturnStatement) -> Result<()> {
        let Some(function) = self.global.function_contexts.get(&self.in_function_id) else {
            return Err(CompileError::analysis(
                "return statement outside function",
                x.offset,
            ));
        };
        let is_init = function.is_class_init();

        match &mut x.value {
            Some(value) => {
                if is_init {
                    return Err(CompileError::analysis(
                        "class __init__ cannot return a value",
                        x.offset,
                    ));
                }
                self.visit_expr(value)?;
                let value = self.take_value();
                self.record_return_type(value);
            }
            None => self.record_return_type(Value::none()),
        }
        Ok(())
    }

    fn visit_yield_stmt(&mut self, x: &mut YieldStatement) -> Result<()> {
        if self.in_function_id == 0 {
            return Err(CompileError::analysis(
                "yield statement outside function",
                x.offset,
            ));
        }
        // the yielded type marks the function as a generator; the concrete
        // values are the caller's business
        let yielded = match &mut x.expr {
            Some(expr) => {
                self.visit_expr(expr)?;
                self.take_value().type_only()
            }
            None => Value::none(),
        };
        self.record_return_type(yielded);
        Ok(())
    }

    fn visit_if(&mut self, x: &mut IfStatement) -> Result<()> {
        self.visit_expr(&mut x.check)?;
        let check = self.take_value();

        match check.truth_value() {
            // statically taken: the elif/else branches are dead
            Some(true) => {
                x.always_true = true;
                visit::visit_stmt_list(self, &mut x.items)
            }
            // statically skipped: only the elifs and else matter
            Some(false) => {
                x.always_false = true;
                for elif in &mut x.elifs {
                    self.visit_elif(elif)?;
                }
                if let Some(else_suite) = &mut x.else_suite {
                    self.visit_else(else_suite)?;
                }
                Ok(())
            }
            None => {
                visit::visit_stmt_list(self, &mut x.items)?;
                for elif in &mut x.elifs {
                    self.visit_elif(elif)?;
                }
                if let Some(else_suite) = &mut x.else_suite {
                    self.visit_else(else_suite)?;
                }
                Ok(())
            }
        }
    }

    fn visit_elif(&mut self, x: &mut ElifStatement) -> Result<()> {
        self.visit_expr(&mut x.check)?;
        let check = self.take_value();

        match check.truth_value() {
            Some(true) => x.always_true = true,
            Some(false) => x.always_false = true,
            None => {}
        }
        if check.truth_value() != Some(false) {
            visit::visit_stmt_list(self, &mut x.items)?;
        }
        Ok(())
    }

    fn visit_for(&mut self, x: &mut ForStatement) -> Result<()> {
        self.visit_expr(&mut x.collection)?;
        let collection = self.take_value();

        let element = match &collection.kind {
            ValueKind::Indeterminate => Value::indeterminate(),
            ValueKind::ExtensionTypeReference(_) => {
                return Err(CompileError::analysis(
                    "encountered collection of ExtensionTypeReference type",
                    x.offset,
                ))
            }

            ValueKind::None
            | ValueKind::Bool(_)
            | ValueKind::Int(_)
            | ValueKind::Float(_)
            | ValueKind::Function(_)
            | ValueKind::Class(_)
            | ValueKind::Instance { .. }
            | ValueKind::Module(_) => {
                return Err(CompileError::analysis(
                    format!("iteration target {} is not a collection", collection),
                    x.offset,
                ))
            }

            // strings iterate to themselves regardless of the value
            ValueKind::Bytes(_) => Value::unknown(ValueType::Bytes),
            ValueKind::Unicode(_) => Value::unknown(ValueType::Unicode),

            ValueKind::List(Some(items)) | ValueKind::Tuple(Some(items)) => {
                common_item_type(items.iter())
            }
            ValueKind::Set(Some(items)) => common_item_type(items.iter()),
            ValueKind::Dict(Some(items)) => common_item_type(items.keys()),

            // value unknown: fall back to the declared extension types
            ValueKind::List(None) | ValueKind::Set(None) => collection
                .extension_types
                .first()
                .cloned()
                .unwrap_or_else(Value::indeterminate),
            ValueKind::Dict(None) => collection
                .extension_types
                .first()
                .cloned()
                .unwrap_or_else(Value::indeterminate),
            ValueKind::Tuple(None) => common_item_type(collection.extension_types.iter()),
        };

        self.current_value = element;
        self.visit_lvalue(&mut x.variable)?;

        visit::visit_stmt_list(self, &mut x.items)?;
        if let Some(else_suite) = &mut x.else_suite {
            self.visit_else(else_suite)?;
        }
        Ok(())
    }

    fn visit_except(&mut self, x: &mut ExceptStatement) -> Result<()> {
        let Some(types) = &mut x.types else {
            return Err(CompileError::analysis(
                "except clause must name an exception type",
                x.offset,
            ));
        };
        self.visit_expr(types)?;
        let types_value = self.take_value();

        // the caught types must be statically resolvable: a single class
        // or a tuple of classes
        let mut class_ids = Vec::new();
        match &types_value.kind {
            ValueKind::Class(Some(id)) => class_ids.push(*id),
            ValueKind::Tuple(Some(items)) => {
                for item in items {
                    match item.as_class_id() {
                        Some(id) => class_ids.push(id),
                        None => {
                            return Err(CompileError::analysis(
                                format!("invalid exception type: {}", item),
                                x.offset,
                            ))
                        }
                    }
                }
            }
            _ => {
                return Err(CompileError::analysis(
                    format!("invalid exception type: {}", types_value),
                    x.offset,
                ))
            }
        }

        if class_ids.len() != 1 {
            return Err(CompileError::analysis(
                "except statement does not catch exactly one type",
                x.offset,
            ));
        }
        x.class_ids = class_ids.clone();

        if let Some(name) = x.name.clone() {
            self.record_assignment(&name, Value::instance(class_ids[0], None), x.offset)?;
        }

        visit::visit_stmt_list(self, &mut x.items)
    }

    fn visit_with(&mut self, x: &mut WithStatement) -> Result<()> {
        for (item, name) in &mut x.item_to_name {
            self.visit_expr(item)?;
            if let Some(name) = name.clone() {
                let value = self.current_value.clone();
                self.record_assignment(&name, value, x.offset)?;
            }
        }
        visit::visit_stmt_list(self, &mut x.items)
    }

    fn visit_function_def(&mut self, x: &mut FunctionDefinition) -> Result<()> {
        // bind the name first so recursive calls resolve
        self.record_assignment(&x.name.clone(), Value::function(x.function_id), x.offset)?;

        if !x.decorators.is_empty() {
            return Err(CompileError::analysis(
                "decorators not yet supported",
                x.offset,
            ));
        }

        let prev_function_id = self.in_function_id;
        self.in_function_id = x.function_id;

        let method_class_id = self
            .global
            .function_contexts
            .get(&x.function_id)
            .map(|f| f.class_id)
            .unwrap_or(0);
        if let Some(function) = self.global.function_contexts.get_mut(&x.function_id) {
            function.args.clear();
            function.varargs_name = x.args.varargs_name.clone();
            function.varkwargs_name = x.args.varkwargs_name.clone();
        }

        for (index, arg) in x.args.args.iter_mut().enumerate() {
            // the receiver of a method is the class instance; it may not
            // have a default and must be named self
            if index == 0 && method_class_id != 0 {
                if arg.default_value.is_some() {
                    return Err(CompileError::analysis(
                        "first argument to instance method cannot have a default value",
                        x.offset,
                    ));
                }
                if arg.name != "self" {
                    return Err(CompileError::analysis(
                        "first argument to instance method must be named 'self'",
                        x.offset,
                    ));
                }
                if let Some(function) = self.global.function_contexts.get_mut(&x.function_id) {
                    function
                        .locals
                        .insert(arg.name.clone(), Value::instance(method_class_id, None));
                    function.args.push(crate::contexts::ArgumentSpec {
                        name: arg.name.clone(),
                        default_value: None,
                    });
                }
                continue;
            }

            let default_value = match &mut arg.default_value {
                Some(expr) => {
                    self.visit_expr(expr)?;
                    let value = self.take_value();
                    if value.value_type() == ValueType::Indeterminate {
                        return Err(CompileError::analysis(
                            "default value has Indeterminate type",
                            x.offset,
                        ));
                    }
                    if !value.value_known() {
                        return Err(CompileError::analysis(
                            "can't resolve default value",
                            x.offset,
                        ));
                    }
                    Some(value)
                }
                None => None,
            };
            if let Some(function) = self.global.function_contexts.get_mut(&x.function_id) {
                if let Some(default_value) = &default_value {
                    function
                        .locals
                        .insert(arg.name.clone(), default_value.type_only());
                }
                function.args.push(crate::contexts::ArgumentSpec {
                    name: arg.name.clone(),
                    default_value,
                });
            }
        }

        visit::visit_stmt_list(self, &mut x.items)?;

        if let Some(function) = self.global.function_contexts.get_mut(&x.function_id) {
            function.body = Some(x.items.clone());
            if function.is_class_init() {
                // anything but the synthesized Instance entry is a real
                // return; bare returns land here as None
                if function
                    .return_types
                    .iter()
                    .any(|v| v.value_type() != ValueType::Instance)
                {
                    return Err(CompileError::analysis(
                        "__init__ cannot return a value",
                        x.offset,
                    ));
                }
                let id = function.id;
                function.add_return_type(Value::instance(id, None));
            } else if function.return_types.len() == 1
                && function.return_types[0].value_type() == ValueType::None
            {
                // a function that only returns None has an empty set
                function.return_types.clear();
            }
        }

        self.in_function_id = prev_function_id;
        Ok(())
    }

    fn visit_class_def(&mut self, x: &mut ClassDefinition) -> Result<()> {
        if !x.decorators.is_empty() {
            return Err(CompileError::analysis(
                "decorators not yet supported",
                x.offset,
            ));
        }
        if !x.parent_types.is_empty() {
            return Err(CompileError::analysis(
                "class inheritance not yet supported",
                x.offset,
            ));
        }

        let prev_class_id = self.in_class_id;
        let prev_function_id = self.in_function_id;
        self.in_class_id = x.class_id;
        self.in_function_id = 0;

        visit::visit_stmt_list(self, &mut x.items)?;

        if let Some(class) = self.global.class_contexts.get_mut(&x.class_id) {
            class.populate_dynamic_attributes();
        }

        self.in_class_id = prev_class_id;
        self.in_function_id = prev_function_id;

        self.record_assignment(&x.name.clone(), Value::class(x.class_id), x.offset)
    }
}

impl<'a> AnalysisVisitor<'a> {
    fn resolve_class_attribute(
        &mut self,
        class_id: i64,
        name: &str,
        offset: usize,
    ) -> Result<()> {
        let Some(class) = self.global.context_for_class(class_id, None) else {
            return Err(CompileError::analysis(
                format!("attribute lookup refers to missing class: {}", class_id),
                offset,
            ));
        };
        let Some(value) = class.attributes.get(name) else {
            return Err(CompileError::analysis(
                format!(
                    "class {} attribute lookup refers to missing attribute: {}",
                    class_id, name
                ),
                offset,
            ));
        };
        let mut value = value.clone();
        // non-function attributes may have been mutated; only the type is
        // trustworthy
        if value.value_type() != ValueType::Function {
            value.clear_value();
        }
        self.current_value = value;
        Ok(())
    }
}

/// Index folding with Python's negative-index rule; None when out of range.
fn fold_index(index: i64, length: usize) -> Option<usize> {
    let mut index = index;
    if index < 0 {
        index += length as i64;
    }
    if index < 0 || index >= length as i64 {
        None
    } else {
        Some(index as usize)
    }
}

/// The common type tag of a collection's items: a type-only value if every
/// item agrees, else Indeterminate.
fn common_item_type<'v>(items: impl Iterator<Item = &'v Value>) -> Value {
    let mut common: Option<ValueType> = None;
    for item in items {
        let item_type = item.value_type();
        if item_type == ValueType::Indeterminate {
            return Value::indeterminate();
        }
        match common {
            None => common = Some(item_type),
            Some(t) if t == item_type => {}
            Some(_) => return Value::indeterminate(),
        }
    }
    match common {
        Some(t) => Value::unknown(t),
        None => Value::indeterminate(),
    }
}
