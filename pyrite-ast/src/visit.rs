// Visitor scaffold.
//
// The compiler passes are visitors over the tagged-union AST: a trait with
// one method per node type, where every default method recurses into the
// node's children through the matching walk_* function. A pass overrides
// the nodes it cares about; overriding preempts recursion for that node, and
// the override can call the walk_* function itself to resume it.

use crate::*;
use pyrite_diagnostics::Result;

pub trait VisitMut {
    // ==================== dispatch ====================

    fn visit_module(&mut self, m: &mut Module) -> Result<()> {
        walk_module(self, m)
    }

    fn visit_stmt(&mut self, s: &mut Stmt) -> Result<()> {
        match s {
            Stmt::Expression(x) => self.visit_expression_stmt(x),
            Stmt::Assignment(x) => self.visit_assignment(x),
            Stmt::Augment(x) => self.visit_augment(x),
            Stmt::Delete(x) => self.visit_delete(x),
            Stmt::Pass(x) => self.visit_pass(x),
            Stmt::Import(x) => self.visit_import(x),
            Stmt::Global(x) => self.visit_global(x),
            Stmt::Exec(x) => self.visit_exec(x),
            Stmt::Assert(x) => self.visit_assert(x),
            Stmt::Break(x) => self.visit_break(x),
            Stmt::Continue(x) => self.visit_continue(x),
            Stmt::Return(x) => self.visit_return(x),
            Stmt::Raise(x) => self.visit_raise(x),
            Stmt::Yield(x) => self.visit_yield_stmt(x),
            Stmt::If(x) => self.visit_if(x),
            Stmt::For(x) => self.visit_for(x),
            Stmt::While(x) => self.visit_while(x),
            Stmt::Try(x) => self.visit_try(x),
            Stmt::With(x) => self.visit_with(x),
            Stmt::FunctionDef(x) => self.visit_function_def(x),
            Stmt::ClassDef(x) => self.visit_class_def(x),
        }
    }

    fn visit_expr(&mut self, e: &mut Expr) -> Result<()> {
        match e {
            Expr::Unary(x) => self.visit_unary(x),
            Expr::Binary(x) => self.visit_binary(x),
            Expr::Ternary(x) => self.visit_ternary(x),
            Expr::ListCtor(x) => self.visit_list_ctor(x),
            Expr::DictCtor(x) => self.visit_dict_ctor(x),
            Expr::SetCtor(x) => self.visit_set_ctor(x),
            Expr::TupleCtor(x) => self.visit_tuple_ctor(x),
            Expr::ListComp(x) => self.visit_list_comp(x),
            Expr::DictComp(x) => self.visit_dict_comp(x),
            Expr::SetComp(x) => self.visit_set_comp(x),
            Expr::Lambda(x) => self.visit_lambda(x),
            Expr::Call(x) => self.visit_call(x),
            Expr::Index(x) => self.visit_index(x),
            Expr::Slice(x) => self.visit_slice(x),
            Expr::Int(x) => self.visit_int(x),
            Expr::Float(x) => self.visit_float(x),
            Expr::Bytes(x) => self.visit_bytes(x),
            Expr::Unicode(x) => self.visit_unicode(x),
            Expr::True(x) => self.visit_true(x),
            Expr::False(x) => self.visit_false(x),
            Expr::None(x) => self.visit_none(x),
            Expr::Variable(x) => self.visit_variable(x),
            Expr::Attribute(x) => self.visit_attribute(x),
        }
    }

    fn visit_lvalue(&mut self, l: &mut LValue) -> Result<()> {
        match l {
            LValue::Name(x) => self.visit_name_target(x),
            LValue::Attribute(x) => self.visit_attribute_target(x),
            LValue::Index(x) => self.visit_index_target(x),
            LValue::Slice(x) => self.visit_slice_target(x),
            LValue::Tuple(x) => self.visit_tuple_target(x),
        }
    }

    // ==================== expressions ====================

    fn visit_unary(&mut self, x: &mut UnaryOperation) -> Result<()> {
        walk_unary(self, x)
    }
    fn visit_binary(&mut self, x: &mut BinaryOperation) -> Result<()> {
        walk_binary(self, x)
    }
    fn visit_ternary(&mut self, x: &mut TernaryOperation) -> Result<()> {
        walk_ternary(self, x)
    }
    fn visit_list_ctor(&mut self, x: &mut ListConstructor) -> Result<()> {
        walk_list_ctor(self, x)
    }
    fn visit_dict_ctor(&mut self, x: &mut DictConstructor) -> Result<()> {
        walk_dict_ctor(self, x)
    }
    fn visit_set_ctor(&mut self, x: &mut SetConstructor) -> Result<()> {
        walk_set_ctor(self, x)
    }
    fn visit_tuple_ctor(&mut self, x: &mut TupleConstructor) -> Result<()> {
        walk_tuple_ctor(self, x)
    }
    fn visit_list_comp(&mut self, x: &mut ListComprehension) -> Result<()> {
        walk_list_comp(self, x)
    }
    fn visit_dict_comp(&mut self, x: &mut DictComprehension) -> Result<()> {
        walk_dict_comp(self, x)
    }
    fn visit_set_comp(&mut self, x: &mut SetComprehension) -> Result<()> {
        walk_set_comp(self, x)
    }
    fn visit_lambda(&mut self, x: &mut LambdaDefinition) -> Result<()> {
        walk_lambda(self, x)
    }
    fn visit_call(&mut self, x: &mut FunctionCall) -> Result<()> {
        walk_call(self, x)
    }
    fn visit_index(&mut self, x: &mut ArrayIndex) -> Result<()> {
        walk_index(self, x)
    }
    fn visit_slice(&mut self, x: &mut ArraySlice) -> Result<()> {
        walk_slice(self, x)
    }
    fn visit_int(&mut self, _x: &mut IntegerConstant) -> Result<()> {
        Ok(())
    }
    fn visit_float(&mut self, _x: &mut FloatConstant) -> Result<()> {
        Ok(())
    }
    fn visit_bytes(&mut self, _x: &mut BytesConstant) -> Result<()> {
        Ok(())
    }
    fn visit_unicode(&mut self, _x: &mut UnicodeConstant) -> Result<()> {
        Ok(())
    }
    fn visit_true(&mut self, _x: &mut TrueConstant) -> Result<()> {
        Ok(())
    }
    fn visit_false(&mut self, _x: &mut FalseConstant) -> Result<()> {
        Ok(())
    }
    fn visit_none(&mut self, _x: &mut NoneConstant) -> Result<()> {
        Ok(())
    }
    fn visit_variable(&mut self, _x: &mut VariableLookup) -> Result<()> {
        Ok(())
    }
    fn visit_attribute(&mut self, x: &mut AttributeLookup) -> Result<()> {
        walk_attribute(self, x)
    }

    // ==================== l-values ====================

    fn visit_name_target(&mut self, _x: &mut NameTarget) -> Result<()> {
        Ok(())
    }
    fn visit_attribute_target(&mut self, x: &mut AttributeTarget) -> Result<()> {
        walk_attribute_target(self, x)
    }
    fn visit_index_target(&mut self, x: &mut IndexTarget) -> Result<()> {
        walk_index_target(self, x)
    }
    fn visit_slice_target(&mut self, x: &mut SliceTarget) -> Result<()> {
        walk_slice_target(self, x)
    }
    fn visit_tuple_target(&mut self, x: &mut TupleTarget) -> Result<()> {
        walk_tuple_target(self, x)
    }

    // ==================== statements ====================

    fn visit_expression_stmt(&mut self, x: &mut ExpressionStatement) -> Result<()> {
        walk_expression_stmt(self, x)
    }
    fn visit_assignment(&mut self, x: &mut AssignmentStatement) -> Result<()> {
        walk_assignment(self, x)
    }
    fn visit_augment(&mut self, x: &mut AugmentStatement) -> Result<()> {
        walk_augment(self, x)
    }
    fn visit_delete(&mut self, x: &mut DeleteStatement) -> Result<()> {
        walk_delete(self, x)
    }
    fn visit_pass(&mut self, _x: &mut PassStatement) -> Result<()> {
        Ok(())
    }
    fn visit_import(&mut self, _x: &mut ImportStatement) -> Result<()> {
        Ok(())
    }
    fn visit_global(&mut self, _x: &mut GlobalStatement) -> Result<()> {
        Ok(())
    }
    fn visit_exec(&mut self, x: &mut ExecStatement) -> Result<()> {
        walk_exec(self, x)
    }
    fn visit_assert(&mut self, x: &mut AssertStatement) -> Result<()> {
        walk_assert(self, x)
    }
    fn visit_break(&mut self, _x: &mut BreakStatement) -> Result<()> {
        Ok(())
    }
    fn visit_continue(&mut self, _x: &mut ContinueStatement) -> Result<()> {
        Ok(())
    }
    fn visit_return(&mut self, x: &mut ReturnStatement) -> Result<()> {
        walk_return(self, x)
    }
    fn visit_raise(&mut self, x: &mut RaiseStatement) -> Result<()> {
        walk_raise(self, x)
    }
    fn visit_yield_stmt(&mut self, x: &mut YieldStatement) -> Result<()> {
        walk_yield_stmt(self, x)
    }
    fn visit_if(&mut self, x: &mut IfStatement) -> Result<()> {
        walk_if(self, x)
    }
    fn visit_elif(&mut self, x: &mut ElifStatement) -> Result<()> {
        walk_elif(self, x)
    }
    fn visit_else(&mut self, x: &mut ElseStatement) -> Result<()> {
        walk_else(self, x)
    }
    fn visit_for(&mut self, x: &mut ForStatement) -> Result<()> {
        walk_for(self, x)
    }
    fn visit_while(&mut self, x: &mut WhileStatement) -> Result<()> {
        walk_while(self, x)
    }
    fn visit_try(&mut self, x: &mut TryStatement) -> Result<()> {
        walk_try(self, x)
    }
    fn visit_except(&mut self, x: &mut ExceptStatement) -> Result<()> {
        walk_except(self, x)
    }
    fn visit_finally(&mut self, x: &mut FinallyStatement) -> Result<()> {
        walk_finally(self, x)
    }
    fn visit_with(&mut self, x: &mut WithStatement) -> Result<()> {
        walk_with(self, x)
    }
    fn visit_function_def(&mut self, x: &mut FunctionDefinition) -> Result<()> {
        walk_function_def(self, x)
    }
    fn visit_class_def(&mut self, x: &mut ClassDefinition) -> Result<()> {
        walk_class_def(self, x)
    }
}

// ==================== walkers ====================

pub fn visit_stmt_list<V: VisitMut + ?Sized>(v: &mut V, items: &mut [Stmt]) -> Result<()> {
    for item in items {
        v.visit_stmt(item)?;
    }
    Ok(())
}

pub fn walk_module<V: VisitMut + ?Sized>(v: &mut V, m: &mut Module) -> Result<()> {
    visit_stmt_list(v, &mut m.items)
}

pub fn walk_unary<V: VisitMut + ?Sized>(v: &mut V, x: &mut UnaryOperation) -> Result<()> {
    v.visit_expr(&mut x.expr)
}

pub fn walk_binary<V: VisitMut + ?Sized>(v: &mut V, x: &mut BinaryOperation) -> Result<()> {
    v.visit_expr(&mut x.left)?;
    v.visit_expr(&mut x.right)
}

pub fn walk_ternary<V: VisitMut + ?Sized>(v: &mut V, x: &mut TernaryOperation) -> Result<()> {
    v.visit_expr(&mut x.left)?;
    v.visit_expr(&mut x.center)?;
    v.visit_expr(&mut x.right)
}

pub fn walk_list_ctor<V: VisitMut + ?Sized>(v: &mut V, x: &mut ListConstructor) -> Result<()> {
    for item in &mut x.items {
        v.visit_expr(item)?;
    }
    Ok(())
}

pub fn walk_dict_ctor<V: VisitMut + ?Sized>(v: &mut V, x: &mut DictConstructor) -> Result<()> {
    for (key, value) in &mut x.items {
        v.visit_expr(key)?;
        v.visit_expr(value)?;
    }
    Ok(())
}

pub fn walk_set_ctor<V: VisitMut + ?Sized>(v: &mut V, x: &mut SetConstructor) -> Result<()> {
    for item in &mut x.items {
        v.visit_expr(item)?;
    }
    Ok(())
}

pub fn walk_tuple_ctor<V: VisitMut + ?Sized>(v: &mut V, x: &mut TupleConstructor) -> Result<()> {
    for item in &mut x.items {
        v.visit_expr(item)?;
    }
    Ok(())
}

pub fn walk_list_comp<V: VisitMut + ?Sized>(v: &mut V, x: &mut ListComprehension) -> Result<()> {
    v.visit_expr(&mut x.item_pattern)?;
    v.visit_lvalue(&mut x.variable)?;
    v.visit_expr(&mut x.source_data)?;
    if let Some(predicate) = &mut x.predicate {
        v.visit_expr(predicate)?;
    }
    Ok(())
}

pub fn walk_dict_comp<V: VisitMut + ?Sized>(v: &mut V, x: &mut DictComprehension) -> Result<()> {
    v.visit_expr(&mut x.key_pattern)?;
    v.visit_expr(&mut x.value_pattern)?;
    v.visit_lvalue(&mut x.variable)?;
    v.visit_expr(&mut x.source_data)?;
    if let Some(predicate) = &mut x.predicate {
        v.visit_expr(predicate)?;
    }
    Ok(())
}

pub fn walk_set_comp<V: VisitMut + ?Sized>(v: &mut V, x: &mut SetComprehension) -> Result<()> {
    v.visit_expr(&mut x.item_pattern)?;
    v.visit_lvalue(&mut x.variable)?;
    v.visit_expr(&mut x.source_data)?;
    if let Some(predicate) = &mut x.predicate {
        v.visit_expr(predicate)?;
    }
    Ok(())
}

pub fn walk_lambda<V: VisitMut + ?Sized>(v: &mut V, x: &mut LambdaDefinition) -> Result<()> {
    for arg in &mut x.args.args {
        if let Some(default_value) = &mut arg.default_value {
            v.visit_expr(default_value)?;
        }
    }
    v.visit_expr(&mut x.result)
}

pub fn walk_call<V: VisitMut + ?Sized>(v: &mut V, x: &mut FunctionCall) -> Result<()> {
    v.visit_expr(&mut x.function)?;
    for arg in &mut x.args {
        v.visit_expr(arg)?;
    }
    for (_, arg) in &mut x.kwargs {
        v.visit_expr(arg)?;
    }
    if let Some(varargs) = &mut x.varargs {
        v.visit_expr(varargs)?;
    }
    if let Some(varkwargs) = &mut x.varkwargs {
        v.visit_expr(varkwargs)?;
    }
    Ok(())
}

pub fn walk_index<V: VisitMut + ?Sized>(v: &mut V, x: &mut ArrayIndex) -> Result<()> {
    v.visit_expr(&mut x.array)?;
    v.visit_expr(&mut x.index)
}

pub fn walk_slice<V: VisitMut + ?Sized>(v: &mut V, x: &mut ArraySlice) -> Result<()> {
    v.visit_expr(&mut x.array)?;
    if let Some(start_index) = &mut x.start_index {
        v.visit_expr(start_index)?;
    }
    if let Some(end_index) = &mut x.end_index {
        v.visit_expr(end_index)?;
    }
    if let Some(step_size) = &mut x.step_size {
        v.visit_expr(step_size)?;
    }
    Ok(())
}

pub fn walk_attribute<V: VisitMut + ?Sized>(v: &mut V, x: &mut AttributeLookup) -> Result<()> {
    v.visit_expr(&mut x.base)
}

pub fn walk_attribute_target<V: VisitMut + ?Sized>(v: &mut V, x: &mut AttributeTarget) -> Result<()> {
    v.visit_expr(&mut x.base)
}

pub fn walk_index_target<V: VisitMut + ?Sized>(v: &mut V, x: &mut IndexTarget) -> Result<()> {
    v.visit_expr(&mut x.array)?;
    v.visit_expr(&mut x.index)
}

pub fn walk_slice_target<V: VisitMut + ?Sized>(v: &mut V, x: &mut SliceTarget) -> Result<()> {
    v.visit_expr(&mut x.array)?;
    if let Some(start_index) = &mut x.start_index {
        v.visit_expr(start_index)?;
    }
    if let Some(end_index) = &mut x.end_index {
        v.visit_expr(end_index)?;
    }
    if let Some(step_size) = &mut x.step_size {
        v.visit_expr(step_size)?;
    }
    Ok(())
}

pub fn walk_tuple_target<V: VisitMut + ?Sized>(v: &mut V, x: &mut TupleTarget) -> Result<()> {
    for item in &mut x.items {
        v.visit_lvalue(item)?;
    }
    Ok(())
}

pub fn walk_expression_stmt<V: VisitMut + ?Sized>(v: &mut V, x: &mut ExpressionStatement) -> Result<()> {
    v.visit_expr(&mut x.expr)
}

pub fn walk_assignment<V: VisitMut + ?Sized>(v: &mut V, x: &mut AssignmentStatement) -> Result<()> {
    // values are visited before targets so lattice passes see the value
    // before the unpacking format
    v.visit_expr(&mut x.value)?;
    v.visit_lvalue(&mut x.target)
}

pub fn walk_augment<V: VisitMut + ?Sized>(v: &mut V, x: &mut AugmentStatement) -> Result<()> {
    v.visit_expr(&mut x.value)?;
    v.visit_lvalue(&mut x.target)
}

pub fn walk_delete<V: VisitMut + ?Sized>(v: &mut V, x: &mut DeleteStatement) -> Result<()> {
    v.visit_lvalue(&mut x.targets)
}

pub fn walk_exec<V: VisitMut + ?Sized>(v: &mut V, x: &mut ExecStatement) -> Result<()> {
    v.visit_expr(&mut x.code)?;
    if let Some(globals) = &mut x.globals {
        v.visit_expr(globals)?;
    }
    if let Some(locals) = &mut x.locals {
        v.visit_expr(locals)?;
    }
    Ok(())
}

pub fn walk_assert<V: VisitMut + ?Sized>(v: &mut V, x: &mut AssertStatement) -> Result<()> {
    v.visit_expr(&mut x.check)?;
    if let Some(failure_message) = &mut x.failure_message {
        v.visit_expr(failure_message)?;
    }
    Ok(())
}

pub fn walk_return<V: VisitMut + ?Sized>(v: &mut V, x: &mut ReturnStatement) -> Result<()> {
    if let Some(value) = &mut x.value {
        v.visit_expr(value)?;
    }
    Ok(())
}

pub fn walk_raise<V: VisitMut + ?Sized>(v: &mut V, x: &mut RaiseStatement) -> Result<()> {
    if let Some(type_expr) = &mut x.type_expr {
        v.visit_expr(type_expr)?;
    }
    if let Some(value) = &mut x.value {
        v.visit_expr(value)?;
    }
    if let Some(traceback) = &mut x.traceback {
        v.visit_expr(traceback)?;
    }
    Ok(())
}

pub fn walk_yield_stmt<V: VisitMut + ?Sized>(v: &mut V, x: &mut YieldStatement) -> Result<()> {
    if let Some(expr) = &mut x.expr {
        v.visit_expr(expr)?;
    }
    Ok(())
}

pub fn walk_if<V: VisitMut + ?Sized>(v: &mut V, x: &mut IfStatement) -> Result<()> {
    v.visit_expr(&mut x.check)?;
    visit_stmt_list(v, &mut x.items)?;
    for elif in &mut x.elifs {
        v.visit_elif(elif)?;
    }
    if let Some(else_suite) = &mut x.else_suite {
        v.visit_else(else_suite)?;
    }
    Ok(())
}

pub fn walk_elif<V: VisitMut + ?Sized>(v: &mut V, x: &mut ElifStatement) -> Result<()> {
    v.visit_expr(&mut x.check)?;
    visit_stmt_list(v, &mut x.items)
}

pub fn walk_else<V: VisitMut + ?Sized>(v: &mut V, x: &mut ElseStatement) -> Result<()> {
    visit_stmt_list(v, &mut x.items)
}

pub fn walk_for<V: VisitMut + ?Sized>(v: &mut V, x: &mut ForStatement) -> Result<()> {
    v.visit_expr(&mut x.collection)?;
    v.visit_lvalue(&mut x.variable)?;
    visit_stmt_list(v, &mut x.items)?;
    if let Some(else_suite) = &mut x.else_suite {
        v.visit_else(else_suite)?;
    }
    Ok(())
}

pub fn walk_while<V: VisitMut + ?Sized>(v: &mut V, x: &mut WhileStatement) -> Result<()> {
    v.visit_expr(&mut x.condition)?;
    visit_stmt_list(v, &mut x.items)?;
    if let Some(else_suite) = &mut x.else_suite {
        v.visit_else(else_suite)?;
    }
    Ok(())
}

pub fn walk_try<V: VisitMut + ?Sized>(v: &mut V, x: &mut TryStatement) -> Result<()> {
    visit_stmt_list(v, &mut x.items)?;
    for except in &mut x.excepts {
        v.visit_except(except)?;
    }
    if let Some(else_suite) = &mut x.else_suite {
        v.visit_else(else_suite)?;
    }
    if let Some(finally_suite) = &mut x.finally_suite {
        v.visit_finally(finally_suite)?;
    }
    Ok(())
}

pub fn walk_except<V: VisitMut + ?Sized>(v: &mut V, x: &mut ExceptStatement) -> Result<()> {
    if let Some(types) = &mut x.types {
        v.visit_expr(types)?;
    }
    visit_stmt_list(v, &mut x.items)
}

pub fn walk_finally<V: VisitMut + ?Sized>(v: &mut V, x: &mut FinallyStatement) -> Result<()> {
    visit_stmt_list(v, &mut x.items)
}

pub fn walk_with<V: VisitMut + ?Sized>(v: &mut V, x: &mut WithStatement) -> Result<()> {
    for (item, _) in &mut x.item_to_name {
        v.visit_expr(item)?;
    }
    visit_stmt_list(v, &mut x.items)
}

pub fn walk_function_def<V: VisitMut + ?Sized>(v: &mut V, x: &mut FunctionDefinition) -> Result<()> {
    for decorator in &mut x.decorators {
        v.visit_expr(decorator)?;
    }
    for arg in &mut x.args.args {
        if let Some(default_value) = &mut arg.default_value {
            v.visit_expr(default_value)?;
        }
    }
    visit_stmt_list(v, &mut x.items)
}

pub fn walk_class_def<V: VisitMut + ?Sized>(v: &mut V, x: &mut ClassDefinition) -> Result<()> {
    for decorator in &mut x.decorators {
        v.visit_expr(decorator)?;
    }
    for parent in &mut x.parent_types {
        v.visit_expr(parent)?;
    }
    visit_stmt_list(v, &mut x.items)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NameCollector {
        names: Vec<String>,
    }

    impl VisitMut for NameCollector {
        fn visit_variable(&mut self, x: &mut VariableLookup) -> Result<()> {
            self.names.push(x.name.clone());
            Ok(())
        }
    }

    #[test]
    fn test_default_recursion() {
        // a + f(b, c=d)
        let mut expr = Expr::Binary(BinaryOperation {
            oper: BinaryOperator::Addition,
            left: Box::new(Expr::Variable(VariableLookup {
                name: "a".to_string(),
                offset: 0,
            })),
            right: Box::new(Expr::Call(FunctionCall {
                function: Box::new(Expr::Variable(VariableLookup {
                    name: "f".to_string(),
                    offset: 4,
                })),
                args: vec![Expr::Variable(VariableLookup {
                    name: "b".to_string(),
                    offset: 6,
                })],
                kwargs: vec![(
                    "c".to_string(),
                    Expr::Variable(VariableLookup {
                        name: "d".to_string(),
                        offset: 11,
                    }),
                )],
                varargs: None,
                varkwargs: None,
                split_id: 0,
                callee_function_id: 0,
                offset: 4,
            })),
            offset: 0,
        });

        let mut v = NameCollector { names: Vec::new() };
        v.visit_expr(&mut expr).unwrap();
        assert_eq!(v.names, vec!["a", "f", "b", "d"]);
    }
}
