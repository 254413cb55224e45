// Canonical source rendering.
//
// Expressions render to source text that re-parses to a structurally equal
// tree. No grouping parentheses are added: in this grammar a parenthesized
// expression IS a tuple constructor, so tuples are the only place parens
// appear (a one-item tuple renders with a trailing comma). Statements render
// with two-space indentation for the phase debug dumps.

use crate::*;
use std::fmt::Write as _;

pub fn expr_to_source(e: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, e);
    out
}

pub fn lvalue_to_source(l: &LValue) -> String {
    let mut out = String::new();
    write_lvalue(&mut out, l);
    out
}

pub fn module_to_source(m: &Module) -> String {
    let mut out = String::new();
    for item in &m.items {
        write_stmt(&mut out, item, 0);
    }
    out
}

fn unary_operator_text(oper: UnaryOperator) -> &'static str {
    match oper {
        UnaryOperator::LogicalNot => "not ",
        UnaryOperator::BitwiseNot => "~",
        UnaryOperator::Positive => "+",
        UnaryOperator::Negative => "-",
        UnaryOperator::Yield => "yield ",
    }
}

fn binary_operator_text(oper: BinaryOperator) -> &'static str {
    match oper {
        BinaryOperator::LogicalOr => "or",
        BinaryOperator::LogicalAnd => "and",
        BinaryOperator::LessThan => "<",
        BinaryOperator::GreaterThan => ">",
        BinaryOperator::Equality => "==",
        BinaryOperator::GreaterOrEqual => ">=",
        BinaryOperator::LessOrEqual => "<=",
        BinaryOperator::NotEqual => "!=",
        BinaryOperator::In => "in",
        BinaryOperator::NotIn => "not in",
        BinaryOperator::Is => "is",
        BinaryOperator::IsNot => "is not",
        BinaryOperator::Or => "|",
        BinaryOperator::Xor => "^",
        BinaryOperator::And => "&",
        BinaryOperator::LeftShift => "<<",
        BinaryOperator::RightShift => ">>",
        BinaryOperator::Addition => "+",
        BinaryOperator::Subtraction => "-",
        BinaryOperator::Multiplication => "*",
        BinaryOperator::Division => "/",
        BinaryOperator::Modulus => "%",
        BinaryOperator::IntegerDivision => "//",
        BinaryOperator::Exponentiation => "**",
    }
}

fn augment_operator_text(oper: AugmentOperator) -> &'static str {
    match oper {
        AugmentOperator::Addition => "+=",
        AugmentOperator::Subtraction => "-=",
        AugmentOperator::Multiplication => "*=",
        AugmentOperator::Division => "/=",
        AugmentOperator::Modulus => "%=",
        AugmentOperator::And => "&=",
        AugmentOperator::Or => "|=",
        AugmentOperator::Xor => "^=",
        AugmentOperator::LeftShift => "<<=",
        AugmentOperator::RightShift => ">>=",
        AugmentOperator::Exponentiation => "**=",
        AugmentOperator::IntegerDivision => "//=",
    }
}

pub fn escape_bytes_literal(data: &[u8]) -> String {
    let mut out = String::new();
    for ch in data {
        match *ch {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            0x07 => out.push_str("\\a"),
            0x08 => out.push_str("\\b"),
            0x0C => out.push_str("\\f"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x0B => out.push_str("\\v"),
            ch if !(0x20..=0x7E).contains(&ch) => {
                let _ = write!(out, "\\x{:02X}", ch);
            }
            ch => out.push(ch as char),
        }
    }
    out
}

pub fn escape_unicode_literal(data: &str) -> String {
    let mut out = String::new();
    for ch in data.chars() {
        let cp = ch as u32;
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{B}' => out.push_str("\\v"),
            _ if cp > 0xFFFF => {
                let _ = write!(out, "\\U{:08X}", cp);
            }
            _ if cp > 0xFF => {
                let _ = write!(out, "\\u{:04X}", cp);
            }
            _ if !(0x20..=0x7E).contains(&cp) => {
                let _ = write!(out, "\\x{:02X}", cp);
            }
            _ => out.push(ch),
        }
    }
    out
}

fn write_comma_separated(out: &mut String, items: &[Expr]) {
    for (x, item) in items.iter().enumerate() {
        if x > 0 {
            out.push_str(", ");
        }
        write_expr(out, item);
    }
}

fn write_argument_definitions(out: &mut String, args: &FunctionArguments) {
    let mut first = true;
    let mut sep = |out: &mut String| {
        if !first {
            out.push_str(", ");
        }
        first = false;
    };
    for arg in &args.args {
        sep(out);
        out.push_str(&arg.name);
        if let Some(default_value) = &arg.default_value {
            out.push('=');
            write_expr(out, default_value);
        }
    }
    if let Some(name) = &args.varargs_name {
        sep(out);
        out.push('*');
        out.push_str(name);
    }
    if let Some(name) = &args.varkwargs_name {
        sep(out);
        out.push_str("**");
        out.push_str(name);
    }
}

fn write_expr(out: &mut String, e: &Expr) {
    match e {
        Expr::Unary(x) => {
            out.push_str(unary_operator_text(x.oper));
            write_expr(out, &x.expr);
        }
        Expr::Binary(x) => {
            write_expr(out, &x.left);
            let _ = write!(out, " {} ", binary_operator_text(x.oper));
            write_expr(out, &x.right);
        }
        Expr::Ternary(x) => {
            write_expr(out, &x.left);
            out.push_str(" if ");
            write_expr(out, &x.center);
            out.push_str(" else ");
            write_expr(out, &x.right);
        }
        Expr::ListCtor(x) => {
            out.push('[');
            write_comma_separated(out, &x.items);
            out.push(']');
        }
        Expr::DictCtor(x) => {
            out.push('{');
            for (i, (key, value)) in x.items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, key);
                out.push_str(": ");
                write_expr(out, value);
            }
            out.push('}');
        }
        Expr::SetCtor(x) => {
            out.push('{');
            write_comma_separated(out, &x.items);
            out.push('}');
        }
        Expr::TupleCtor(x) => {
            out.push('(');
            write_comma_separated(out, &x.items);
            if x.items.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        Expr::ListComp(x) => {
            out.push('[');
            write_expr(out, &x.item_pattern);
            out.push_str(" for ");
            write_lvalue(out, &x.variable);
            out.push_str(" in ");
            write_expr(out, &x.source_data);
            if let Some(predicate) = &x.predicate {
                out.push_str(" if ");
                write_expr(out, predicate);
            }
            out.push(']');
        }
        Expr::DictComp(x) => {
            out.push('{');
            write_expr(out, &x.key_pattern);
            out.push_str(": ");
            write_expr(out, &x.value_pattern);
            out.push_str(" for ");
            write_lvalue(out, &x.variable);
            out.push_str(" in ");
            write_expr(out, &x.source_data);
            if let Some(predicate) = &x.predicate {
                out.push_str(" if ");
                write_expr(out, predicate);
            }
            out.push('}');
        }
        Expr::SetComp(x) => {
            out.push('{');
            write_expr(out, &x.item_pattern);
            out.push_str(" for ");
            write_lvalue(out, &x.variable);
            out.push_str(" in ");
            write_expr(out, &x.source_data);
            if let Some(predicate) = &x.predicate {
                out.push_str(" if ");
                write_expr(out, predicate);
            }
            out.push('}');
        }
        Expr::Lambda(x) => {
            out.push_str("lambda");
            if !x.args.args.is_empty()
                || x.args.varargs_name.is_some()
                || x.args.varkwargs_name.is_some()
            {
                out.push(' ');
                write_argument_definitions(out, &x.args);
            }
            out.push_str(": ");
            write_expr(out, &x.result);
        }
        Expr::Call(x) => {
            write_expr(out, &x.function);
            out.push('(');
            let mut first = true;
            let mut sep = |out: &mut String| {
                if !first {
                    out.push_str(", ");
                }
                first = false;
            };
            for arg in &x.args {
                sep(out);
                write_expr(out, arg);
            }
            for (name, arg) in &x.kwargs {
                sep(out);
                out.push_str(name);
                out.push('=');
                write_expr(out, arg);
            }
            if let Some(varargs) = &x.varargs {
                sep(out);
                out.push('*');
                write_expr(out, varargs);
            }
            if let Some(varkwargs) = &x.varkwargs {
                sep(out);
                out.push_str("**");
                write_expr(out, varkwargs);
            }
            out.push(')');
        }
        Expr::Index(x) => {
            write_expr(out, &x.array);
            out.push('[');
            write_expr(out, &x.index);
            out.push(']');
        }
        Expr::Slice(x) => {
            write_expr(out, &x.array);
            out.push('[');
            if let Some(start_index) = &x.start_index {
                write_expr(out, start_index);
            }
            out.push(':');
            if let Some(end_index) = &x.end_index {
                write_expr(out, end_index);
            }
            if let Some(step_size) = &x.step_size {
                out.push(':');
                write_expr(out, step_size);
            }
            out.push(']');
        }
        Expr::Int(x) => {
            let _ = write!(out, "{}", x.value);
        }
        Expr::Float(x) => {
            // {:?} keeps a trailing .0 so the literal re-lexes as a float
            let _ = write!(out, "{:?}", x.value);
        }
        Expr::Bytes(x) => {
            out.push_str("b'");
            out.push_str(&escape_bytes_literal(&x.value));
            out.push('\'');
        }
        Expr::Unicode(x) => {
            out.push('\'');
            out.push_str(&escape_unicode_literal(&x.value));
            out.push('\'');
        }
        Expr::True(_) => out.push_str("True"),
        Expr::False(_) => out.push_str("False"),
        Expr::None(_) => out.push_str("None"),
        Expr::Variable(x) => out.push_str(&x.name),
        Expr::Attribute(x) => {
            write_expr(out, &x.base);
            out.push('.');
            out.push_str(&x.name);
        }
    }
}

fn write_lvalue(out: &mut String, l: &LValue) {
    match l {
        LValue::Name(x) => out.push_str(&x.name),
        LValue::Attribute(x) => {
            write_expr(out, &x.base);
            out.push('.');
            out.push_str(&x.name);
        }
        LValue::Index(x) => {
            write_expr(out, &x.array);
            out.push('[');
            write_expr(out, &x.index);
            out.push(']');
        }
        LValue::Slice(x) => {
            write_expr(out, &x.array);
            out.push('[');
            if let Some(start_index) = &x.start_index {
                write_expr(out, start_index);
            }
            out.push(':');
            if let Some(end_index) = &x.end_index {
                write_expr(out, end_index);
            }
            if let Some(step_size) = &x.step_size {
                out.push(':');
                write_expr(out, step_size);
            }
            out.push(']');
        }
        LValue::Tuple(x) => {
            for (i, item) in x.items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_lvalue(out, item);
            }
        }
    }
}

fn write_indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn write_suite(out: &mut String, items: &[Stmt], level: usize) {
    if items.is_empty() {
        write_indent(out, level);
        out.push_str("pass\n");
        return;
    }
    for item in items {
        write_stmt(out, item, level);
    }
}

fn write_stmt(out: &mut String, s: &Stmt, level: usize) {
    write_indent(out, level);
    match s {
        Stmt::Expression(x) => {
            write_expr(out, &x.expr);
            out.push('\n');
        }
        Stmt::Assignment(x) => {
            write_lvalue(out, &x.target);
            out.push_str(" = ");
            write_expr(out, &x.value);
            out.push('\n');
        }
        Stmt::Augment(x) => {
            write_lvalue(out, &x.target);
            let _ = write!(out, " {} ", augment_operator_text(x.oper));
            write_expr(out, &x.value);
            out.push('\n');
        }
        Stmt::Delete(x) => {
            out.push_str("del ");
            write_lvalue(out, &x.targets);
            out.push('\n');
        }
        Stmt::Pass(_) => out.push_str("pass\n"),
        Stmt::Import(x) => {
            if !x.names.is_empty() || x.import_star {
                let (module, _) = &x.modules[0];
                let _ = write!(out, "from {} import ", module);
                if x.import_star {
                    out.push('*');
                } else {
                    for (i, (name, rename)) in x.names.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(name);
                        if name != rename {
                            let _ = write!(out, " as {}", rename);
                        }
                    }
                }
            } else {
                out.push_str("import ");
                for (i, (name, rename)) in x.modules.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(name);
                    if name != rename {
                        let _ = write!(out, " as {}", rename);
                    }
                }
            }
            out.push('\n');
        }
        Stmt::Global(x) => {
            out.push_str("global ");
            out.push_str(&x.names.join(", "));
            out.push('\n');
        }
        Stmt::Exec(x) => {
            out.push_str("exec ");
            write_expr(out, &x.code);
            if let Some(globals) = &x.globals {
                out.push_str(", ");
                write_expr(out, globals);
            }
            if let Some(locals) = &x.locals {
                out.push_str(", ");
                write_expr(out, locals);
            }
            out.push('\n');
        }
        Stmt::Assert(x) => {
            out.push_str("assert ");
            write_expr(out, &x.check);
            if let Some(failure_message) = &x.failure_message {
                out.push_str(", ");
                write_expr(out, failure_message);
            }
            out.push('\n');
        }
        Stmt::Break(_) => out.push_str("break\n"),
        Stmt::Continue(_) => out.push_str("continue\n"),
        Stmt::Return(x) => {
            out.push_str("return");
            if let Some(value) = &x.value {
                out.push(' ');
                write_expr(out, value);
            }
            out.push('\n');
        }
        Stmt::Raise(x) => {
            out.push_str("raise");
            if let Some(type_expr) = &x.type_expr {
                out.push(' ');
                write_expr(out, type_expr);
            }
            if let Some(value) = &x.value {
                out.push_str(", ");
                write_expr(out, value);
            }
            if let Some(traceback) = &x.traceback {
                out.push_str(", ");
                write_expr(out, traceback);
            }
            out.push('\n');
        }
        Stmt::Yield(x) => {
            out.push_str("yield");
            if x.from {
                out.push_str(" from");
            }
            if let Some(expr) = &x.expr {
                out.push(' ');
                write_expr(out, expr);
            }
            out.push('\n');
        }
        Stmt::If(x) => {
            out.push_str("if ");
            write_expr(out, &x.check);
            out.push_str(":\n");
            write_suite(out, &x.items, level + 1);
            for elif in &x.elifs {
                write_indent(out, level);
                out.push_str("elif ");
                write_expr(out, &elif.check);
                out.push_str(":\n");
                write_suite(out, &elif.items, level + 1);
            }
            if let Some(else_suite) = &x.else_suite {
                write_indent(out, level);
                out.push_str("else:\n");
                write_suite(out, &else_suite.items, level + 1);
            }
        }
        Stmt::For(x) => {
            out.push_str("for ");
            write_lvalue(out, &x.variable);
            out.push_str(" in ");
            write_expr(out, &x.collection);
            out.push_str(":\n");
            write_suite(out, &x.items, level + 1);
            if let Some(else_suite) = &x.else_suite {
                write_indent(out, level);
                out.push_str("else:\n");
                write_suite(out, &else_suite.items, level + 1);
            }
        }
        Stmt::While(x) => {
            out.push_str("while ");
            write_expr(out, &x.condition);
            out.push_str(":\n");
            write_suite(out, &x.items, level + 1);
            if let Some(else_suite) = &x.else_suite {
                write_indent(out, level);
                out.push_str("else:\n");
                write_suite(out, &else_suite.items, level + 1);
            }
        }
        Stmt::Try(x) => {
            out.push_str("try:\n");
            write_suite(out, &x.items, level + 1);
            for except in &x.excepts {
                write_indent(out, level);
                out.push_str("except");
                if let Some(types) = &except.types {
                    out.push(' ');
                    write_expr(out, types);
                }
                if let Some(name) = &except.name {
                    let _ = write!(out, " as {}", name);
                }
                out.push_str(":\n");
                write_suite(out, &except.items, level + 1);
            }
            if let Some(else_suite) = &x.else_suite {
                write_indent(out, level);
                out.push_str("else:\n");
                write_suite(out, &else_suite.items, level + 1);
            }
            if let Some(finally_suite) = &x.finally_suite {
                write_indent(out, level);
                out.push_str("finally:\n");
                write_suite(out, &finally_suite.items, level + 1);
            }
        }
        Stmt::With(x) => {
            out.push_str("with ");
            for (i, (item, name)) in x.item_to_name.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, item);
                if let Some(name) = name {
                    let _ = write!(out, " as {}", name);
                }
            }
            out.push_str(":\n");
            write_suite(out, &x.items, level + 1);
        }
        Stmt::FunctionDef(x) => {
            for decorator in &x.decorators {
                out.push('@');
                write_expr(out, decorator);
                out.push('\n');
                write_indent(out, level);
            }
            let _ = write!(out, "def {}(", x.name);
            write_argument_definitions(out, &x.args);
            out.push_str("):\n");
            write_suite(out, &x.items, level + 1);
        }
        Stmt::ClassDef(x) => {
            for decorator in &x.decorators {
                out.push('@');
                write_expr(out, decorator);
                out.push('\n');
                write_indent(out, level);
            }
            let _ = write!(out, "class {}", x.name);
            if !x.parent_types.is_empty() {
                out.push('(');
                write_comma_separated(out, &x.parent_types);
                out.push(')');
            }
            out.push_str(":\n");
            write_suite(out, &x.items, level + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_round_trip_material() {
        assert_eq!(escape_bytes_literal(b"a\nb"), "a\\nb");
        assert_eq!(escape_bytes_literal(b"\x00\xFF"), "\\x00\\xFF");
        assert_eq!(escape_unicode_literal("a'b"), "a\\'b");
        assert_eq!(escape_unicode_literal("\u{3B1}"), "\\u03B1");
        assert_eq!(escape_unicode_literal("\u{1F600}"), "\\U0001F600");
    }

    #[test]
    fn test_expr_rendering() {
        let e = Expr::Binary(BinaryOperation {
            oper: BinaryOperator::Exponentiation,
            left: Box::new(Expr::Int(IntegerConstant {
                value: 2,
                offset: 0,
            })),
            right: Box::new(Expr::Unary(UnaryOperation {
                oper: UnaryOperator::Negative,
                expr: Box::new(Expr::Int(IntegerConstant {
                    value: 1,
                    offset: 4,
                })),
                split_id: 0,
                offset: 3,
            })),
            offset: 0,
        });
        assert_eq!(expr_to_source(&e), "2 ** -1");
    }

    #[test]
    fn test_float_rendering_keeps_floatness() {
        let e = Expr::Float(FloatConstant {
            value: 2.0,
            offset: 0,
        });
        assert_eq!(expr_to_source(&e), "2.0");
    }

    #[test]
    fn test_single_item_tuple_gets_trailing_comma() {
        let e = Expr::TupleCtor(TupleConstructor {
            items: vec![Expr::Int(IntegerConstant {
                value: 5,
                offset: 1,
            })],
            value_types: Vec::new(),
            offset: 0,
        });
        assert_eq!(expr_to_source(&e), "(5,)");
    }
}
