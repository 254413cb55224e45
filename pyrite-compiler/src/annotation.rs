// The annotation pass: the first traversal over a freshly parsed module.
//
// It assigns stable ids to every def/lambda/class in pre-order, collects
// local and global variable names (with module-global mutability), records
// import dependencies (advancing the imported modules far enough to probe
// them), and numbers every call site and yield with a split id. Values are
// not inferred here; that's the analysis pass.

use pyrite_ast::value::Value;
use pyrite_ast::visit::{self, VisitMut};
use pyrite_ast::*;
use pyrite_diagnostics::{CompileError, Result};

use crate::contexts::{GlobalContext, ModuleRef, Phase};
use crate::driver;

pub struct AnnotationVisitor<'a> {
    global: &'a mut GlobalContext,
    module: ModuleRef,
    module_name: String,
    in_function_id: i64,
    in_class_id: i64,
}

impl<'a> AnnotationVisitor<'a> {
    pub fn new(global: &'a mut GlobalContext, module: &ModuleRef) -> Self {
        let module_name = module.borrow().name.clone();
        Self {
            global,
            module: module.clone(),
            module_name,
            in_function_id: 0,
            in_class_id: 0,
        }
    }

    /// Record a write to a name in the current scope: a function local
    /// (unless declared global), a class attribute, or a module global
    /// (mutable from the second write on).
    fn record_write(&mut self, name: &str, offset: usize) -> Result<()> {
        if name.is_empty() {
            return Err(CompileError::annotation("empty name in write", offset));
        }
        if self.global.builtin_names.contains_key(name) {
            return Err(CompileError::annotation(
                format!("can't assign to builtin name {}", name),
                offset,
            ));
        }

        if self.in_function_id != 0 {
            let Some(function) = self.global.function_contexts.get_mut(&self.in_function_id)
            else {
                return Err(CompileError::annotation(
                    "write outside a registered function context",
                    offset,
                ));
            };
            if function.explicit_globals.contains(name) {
                self.module
                    .borrow_mut()
                    .globals_mutable
                    .insert(name.to_string(), true);
            } else {
                function
                    .locals
                    .entry(name.to_string())
                    .or_insert_with(Value::indeterminate);
            }
            return Ok(());
        }

        if self.in_class_id != 0 {
            let Some(class) = self.global.class_contexts.get_mut(&self.in_class_id) else {
                return Err(CompileError::annotation(
                    "write outside a registered class context",
                    offset,
                ));
            };
            class
                .attributes
                .entry(name.to_string())
                .or_insert_with(Value::indeterminate);
            return Ok(());
        }

        // module-scope write: mutable if this is not the first write
        let mut module = self.module.borrow_mut();
        module
            .globals
            .entry(name.to_string())
            .or_insert_with(Value::indeterminate);
        module
            .globals_mutable
            .entry(name.to_string())
            .and_modify(|mutable| *mutable = true)
            .or_insert(false);
        Ok(())
    }

    /// Bind an import result in the current scope; collisions with an
    /// existing binding are errors, and module-scope import bindings are
    /// immutable.
    fn bind_import(&mut self, name: &str, value: Value, offset: usize) -> Result<()> {
        if self.in_function_id != 0 {
            let Some(function) = self.global.function_contexts.get_mut(&self.in_function_id)
            else {
                return Err(CompileError::annotation(
                    "import outside a registered function context",
                    offset,
                ));
            };
            if function.locals.contains_key(name) {
                return Err(CompileError::annotation(
                    format!("name {} overwritten by import", name),
                    offset,
                ));
            }
            function.locals.insert(name.to_string(), value);
            return Ok(());
        }

        let mut module = self.module.borrow_mut();
        if module.globals.contains_key(name) {
            return Err(CompileError::annotation(
                format!("name {} overwritten by import", name),
                offset,
            ));
        }
        module.globals.insert(name.to_string(), value);
        module.globals_mutable.insert(name.to_string(), false);
        Ok(())
    }

    fn bump_split_counter(&mut self) -> i64 {
        if self.in_function_id != 0 {
            if let Some(function) = self.global.function_contexts.get_mut(&self.in_function_id) {
                function.num_splits += 1;
                return function.num_splits;
            }
        }
        let mut module = self.module.borrow_mut();
        module.num_splits += 1;
        module.num_splits
    }
}

impl<'a> VisitMut for AnnotationVisitor<'a> {
    fn visit_module(&mut self, m: &mut Module) -> Result<()> {
        visit::walk_module(self, m)?;

        // every global must have a mutability record by now
        let module = self.module.borrow();
        if module.globals_mutable.len() != module.globals.len() {
            return Err(CompileError::annotation(
                "global registration is incomplete",
                m.offset,
            ));
        }
        Ok(())
    }

    fn visit_import(&mut self, x: &mut ImportStatement) -> Result<()> {
        // only names are collected here; values are copied by the analysis
        // pass, which can rely on the other module being analyzed

        // from M import *
        if x.import_star {
            let module_name = x.modules[0].0.clone();
            let other = driver::get_module_at_phase(self.global, &module_name, Phase::Annotated)?;
            let names: Vec<String> = other
                .borrow()
                .globals
                .keys()
                .filter(|name| !name.starts_with("__"))
                .cloned()
                .collect();
            for name in names {
                self.bind_import(&name, Value::indeterminate(), x.offset)?;
            }
            return Ok(());
        }

        // import M [as N], ...: an existence probe is enough
        if x.names.is_empty() {
            for (name, rename) in x.modules.clone() {
                driver::get_module_at_phase(self.global, &name, Phase::Initial)?;
                self.bind_import(&rename, Value::module(name), x.offset)?;
            }
            return Ok(());
        }

        // from M import a [as b], ...: the names must exist in M
        let module_name = x.modules[0].0.clone();
        let other = driver::get_module_at_phase(self.global, &module_name, Phase::Annotated)?;
        for (name, rename) in x.names.clone() {
            if !other.borrow().globals.contains_key(&name) {
                return Err(CompileError::annotation(
                    format!("imported name {} not defined in source module", name),
                    x.offset,
                ));
            }
            self.bind_import(&rename, Value::indeterminate(), x.offset)?;
        }
        Ok(())
    }

    fn visit_global(&mut self, x: &mut GlobalStatement) -> Result<()> {
        if self.in_function_id == 0 {
            return Err(CompileError::annotation(
                "global statement outside of function",
                x.offset,
            ));
        }

        for name in &x.names {
            let Some(function) = self.global.function_contexts.get_mut(&self.in_function_id)
            else {
                continue;
            };
            if function.locals.contains_key(name) {
                return Err(CompileError::annotation(
                    format!("variable `{}` declared before global statement", name),
                    x.offset,
                ));
            }
            function.explicit_globals.insert(name.clone());
            // a name referenced in a global statement is assumed mutable
            self.module
                .borrow_mut()
                .globals_mutable
                .insert(name.clone(), true);
        }
        Ok(())
    }

    fn visit_name_target(&mut self, x: &mut NameTarget) -> Result<()> {
        self.record_write(&x.name.clone(), x.offset)
    }

    fn visit_except(&mut self, x: &mut ExceptStatement) -> Result<()> {
        if let Some(name) = x.name.clone() {
            self.record_write(&name, x.offset)?;
        }
        visit::walk_except(self, x)
    }

    fn visit_function_def(&mut self, x: &mut FunctionDefinition) -> Result<()> {
        for decorator in &mut x.decorators {
            self.visit_expr(decorator)?;
        }

        // a def directly inside a class body is a method; __init__ shares
        // the class's id so instance construction dispatches through it
        let method_of = if self.in_function_id == 0 { self.in_class_id } else { 0 };
        let function_id = if method_of != 0 && x.name == "__init__" {
            method_of
        } else {
            self.global.next_function_id()
        };
        x.function_id = function_id;

        {
            let module_name = self.module_name.clone();
            let Some(context) = self
                .global
                .context_for_function(function_id, Some(&module_name))
            else {
                return Err(CompileError::annotation(
                    "could not create function context",
                    x.offset,
                ));
            };
            context.name = x.name.clone();
            context.has_ast = true;
            context.class_id = method_of;
        }

        let prev_function_id = self.in_function_id;
        self.in_function_id = function_id;

        for arg in &x.args.args.clone() {
            self.record_write(&arg.name, x.offset)?;
        }
        if let Some(name) = x.args.varargs_name.clone() {
            self.record_write(&name, x.offset)?;
        }
        if let Some(name) = x.args.varkwargs_name.clone() {
            self.record_write(&name, x.offset)?;
        }

        visit::visit_stmt_list(self, &mut x.items)?;
        self.in_function_id = prev_function_id;

        self.record_write(&x.name.clone(), x.offset)
    }

    fn visit_lambda(&mut self, x: &mut LambdaDefinition) -> Result<()> {
        let function_id = self.global.next_function_id();
        x.function_id = function_id;

        {
            let module_name = self.module_name.clone();
            let Some(context) = self
                .global
                .context_for_function(function_id, Some(&module_name))
            else {
                return Err(CompileError::annotation(
                    "could not create function context",
                    x.offset,
                ));
            };
            context.name = format!("Lambda@{}${}+{}", module_name, x.offset, function_id);
            context.has_ast = true;
        }

        let prev_function_id = self.in_function_id;
        self.in_function_id = function_id;

        for arg in &x.args.args.clone() {
            self.record_write(&arg.name, x.offset)?;
        }
        if let Some(name) = x.args.varargs_name.clone() {
            self.record_write(&name, x.offset)?;
        }
        if let Some(name) = x.args.varkwargs_name.clone() {
            self.record_write(&name, x.offset)?;
        }

        self.visit_expr(&mut x.result)?;
        self.in_function_id = prev_function_id;
        Ok(())
    }

    fn visit_class_def(&mut self, x: &mut ClassDefinition) -> Result<()> {
        for decorator in &mut x.decorators {
            self.visit_expr(decorator)?;
        }
        for parent in &mut x.parent_types {
            self.visit_expr(parent)?;
        }

        let class_id = self.global.next_function_id();
        x.class_id = class_id;

        {
            let module_name = self.module_name.clone();
            let Some(context) = self.global.context_for_class(class_id, Some(&module_name))
            else {
                return Err(CompileError::annotation(
                    "could not create class context",
                    x.offset,
                ));
            };
            context.name = x.name.clone();
            context.has_ast = true;
        }

        let prev_function_id = self.in_function_id;
        let prev_class_id = self.in_class_id;
        self.in_function_id = 0;
        self.in_class_id = class_id;

        visit::visit_stmt_list(self, &mut x.items)?;

        self.in_function_id = prev_function_id;
        self.in_class_id = prev_class_id;

        self.record_write(&x.name.clone(), x.offset)
    }

    fn visit_unary(&mut self, x: &mut UnaryOperation) -> Result<()> {
        visit::walk_unary(self, x)?;

        if x.oper == UnaryOperator::Yield {
            if self.in_function_id == 0 {
                return Err(CompileError::annotation(
                    "yield operator outside of function definition",
                    x.offset,
                ));
            }
            x.split_id = self.bump_split_counter();
        }
        Ok(())
    }

    fn visit_yield_stmt(&mut self, x: &mut YieldStatement) -> Result<()> {
        if self.in_function_id == 0 {
            return Err(CompileError::annotation(
                "yield statement outside of function definition",
                x.offset,
            ));
        }
        visit::walk_yield_stmt(self, x)?;
        x.split_id = self.bump_split_counter();
        Ok(())
    }

    fn visit_call(&mut self, x: &mut FunctionCall) -> Result<()> {
        visit::walk_call(self, x)?;
        x.split_id = self.bump_split_counter();
        Ok(())
    }
}
