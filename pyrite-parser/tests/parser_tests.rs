use pyrite_ast::fmt::expr_to_source;
use pyrite_ast::*;
use pyrite_diagnostics::SourceFile;
use pyrite_parser::{ParseErrorKind, Parser};

fn parse(source: &str) -> Module {
    let file = SourceFile::from_code(source);
    let tokens = pyrite_lexer::tokenize(&file).expect("lexing failed");
    Parser::new(&file, &tokens)
        .parse_module()
        .expect("parsing failed")
}

fn parse_error(source: &str) -> ParseErrorKind {
    let file = SourceFile::from_code(source);
    let tokens = pyrite_lexer::tokenize(&file).expect("lexing failed");
    Parser::new(&file, &tokens)
        .parse_module()
        .expect_err("parsing unexpectedly succeeded")
        .kind
}

fn parse_expr(source: &str) -> Expr {
    let module = parse(&format!("{}\n", source));
    match module.items.into_iter().next() {
        Some(Stmt::Expression(x)) => x.expr,
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

#[test]
fn test_assignment() {
    let module = parse("x = 1 + 2\n");
    assert_eq!(module.items.len(), 1);
    let Stmt::Assignment(a) = &module.items[0] else {
        panic!("expected assignment");
    };
    assert!(matches!(&a.target, LValue::Name(n) if n.name == "x"));
    let Expr::Binary(b) = &a.value else {
        panic!("expected binary operation");
    };
    assert_eq!(b.oper, BinaryOperator::Addition);
}

#[test]
fn test_exponentiation_binds_less_tightly_than_unary() {
    // 2**-1 parses as Exponentiation(2, Negative(1))
    let module = parse("y = 2**-1\n");
    let Stmt::Assignment(a) = &module.items[0] else {
        panic!("expected assignment");
    };
    let Expr::Binary(b) = &a.value else {
        panic!("expected binary operation");
    };
    assert_eq!(b.oper, BinaryOperator::Exponentiation);
    assert!(matches!(&*b.left, Expr::Int(i) if i.value == 2));
    let Expr::Unary(u) = &*b.right else {
        panic!("expected unary operation");
    };
    assert_eq!(u.oper, UnaryOperator::Negative);
    assert!(matches!(&*u.expr, Expr::Int(i) if i.value == 1));
}

#[test]
fn test_precedence_chain() {
    // a + b * c: the + splits last
    let module = parse("r = a + b * c\n");
    let Stmt::Assignment(a) = &module.items[0] else {
        panic!("expected assignment");
    };
    let Expr::Binary(add) = &a.value else {
        panic!("expected binary operation");
    };
    assert_eq!(add.oper, BinaryOperator::Addition);
    let Expr::Binary(mul) = &*add.right else {
        panic!("expected nested multiplication");
    };
    assert_eq!(mul.oper, BinaryOperator::Multiplication);
}

#[test]
fn test_comparison_and_booleans() {
    let module = parse("r = a < b and c or not d\n");
    let Stmt::Assignment(a) = &module.items[0] else {
        panic!("expected assignment");
    };
    // or is the loosest operator
    let Expr::Binary(or) = &a.value else {
        panic!("expected or at top");
    };
    assert_eq!(or.oper, BinaryOperator::LogicalOr);
    let Expr::Binary(and) = &*or.left else {
        panic!("expected and on the left");
    };
    assert_eq!(and.oper, BinaryOperator::LogicalAnd);
    let Expr::Unary(not) = &*or.right else {
        panic!("expected not on the right");
    };
    assert_eq!(not.oper, UnaryOperator::LogicalNot);
}

#[test]
fn test_ternary() {
    let module = parse("r = a if b else c\n");
    let Stmt::Assignment(a) = &module.items[0] else {
        panic!("expected assignment");
    };
    let Expr::Ternary(t) = &a.value else {
        panic!("expected ternary");
    };
    assert!(matches!(&*t.left, Expr::Variable(v) if v.name == "a"));
    assert!(matches!(&*t.center, Expr::Variable(v) if v.name == "b"));
    assert!(matches!(&*t.right, Expr::Variable(v) if v.name == "c"));
}

#[test]
fn test_postfix_rightmost() {
    // a.b(c)[d] - the subscript is the outermost operation
    let module = parse("r = a.b(c)[d]\n");
    let Stmt::Assignment(a) = &module.items[0] else {
        panic!("expected assignment");
    };
    let Expr::Index(index) = &a.value else {
        panic!("expected index at top");
    };
    let Expr::Call(call) = &*index.array else {
        panic!("expected call below index");
    };
    let Expr::Attribute(attr) = &*call.function else {
        panic!("expected attribute below call");
    };
    assert_eq!(attr.name, "b");
}

#[test]
fn test_call_arguments() {
    let module = parse("f(1, x, k=2, *a, **kw)\n");
    let Stmt::Expression(e) = &module.items[0] else {
        panic!("expected expression statement");
    };
    let Expr::Call(call) = &e.expr else {
        panic!("expected call");
    };
    assert_eq!(call.args.len(), 2);
    assert_eq!(call.kwargs.len(), 1);
    assert_eq!(call.kwargs[0].0, "k");
    assert!(call.varargs.is_some());
    assert!(call.varkwargs.is_some());
}

#[test]
fn test_positional_after_keyword_rejected() {
    assert_eq!(parse_error("f(k=1, 2)\n"), ParseErrorKind::SyntaxError);
}

#[test]
fn test_constructors_and_comprehensions() {
    assert!(matches!(parse_expr("[1, 2, 3]"), Expr::ListCtor(_)));
    assert!(matches!(parse_expr("[]"), Expr::ListCtor(l) if l.items.is_empty()));
    assert!(matches!(parse_expr("{}"), Expr::DictCtor(d) if d.items.is_empty()));
    assert!(matches!(parse_expr("{1: 2}"), Expr::DictCtor(_)));
    assert!(matches!(parse_expr("{1, 2}"), Expr::SetCtor(_)));
    assert!(matches!(parse_expr("(1, 2)"), Expr::TupleCtor(_)));
    assert!(matches!(parse_expr("[x for x in a]"), Expr::ListComp(_)));
    assert!(matches!(parse_expr("[x for x in a if x]"), Expr::ListComp(c) if c.predicate.is_some()));
    assert!(matches!(parse_expr("{k: v for k, v in a}"), Expr::DictComp(_)));
    assert!(matches!(parse_expr("{x for x in a}"), Expr::SetComp(_)));
}

#[test]
fn test_lambda() {
    let e = parse_expr("lambda a, b=1: a + b");
    let Expr::Lambda(l) = e else {
        panic!("expected lambda");
    };
    assert_eq!(l.args.args.len(), 2);
    assert_eq!(l.args.args[0].name, "a");
    assert!(l.args.args[1].default_value.is_some());
}

#[test]
fn test_slices() {
    assert!(matches!(parse_expr("a[1]"), Expr::Index(_)));
    let Expr::Slice(s) = parse_expr("a[1:2]") else {
        panic!("expected slice");
    };
    assert!(s.start_index.is_some() && s.end_index.is_some() && s.step_size.is_none());
    let Expr::Slice(s) = parse_expr("a[1:2:3]") else {
        panic!("expected slice");
    };
    assert!(s.step_size.is_some());
    let Expr::Slice(s) = parse_expr("a[:2]") else {
        panic!("expected slice");
    };
    assert!(s.start_index.is_none() && s.end_index.is_some());
}

#[test]
fn test_lvalue_forms() {
    let module = parse("a, b = c\nx.y = 1\nz[0] = 2\n");
    assert!(matches!(
        &module.items[0],
        Stmt::Assignment(a) if matches!(&a.target, LValue::Tuple(t) if t.items.len() == 2)
    ));
    assert!(matches!(
        &module.items[1],
        Stmt::Assignment(a) if matches!(&a.target, LValue::Attribute(_))
    ));
    assert!(matches!(
        &module.items[2],
        Stmt::Assignment(a) if matches!(&a.target, LValue::Index(_))
    ));
}

#[test]
fn test_builtin_constants_cannot_be_reassigned() {
    assert_eq!(parse_error("True = 1\n"), ParseErrorKind::SyntaxError);
    assert_eq!(parse_error("None = 1\n"), ParseErrorKind::SyntaxError);
}

#[test]
fn test_augmented_assignments() {
    let module = parse("x += 1\ny //= 2\nz **= 3\n");
    assert!(matches!(
        &module.items[0],
        Stmt::Augment(a) if a.oper == AugmentOperator::Addition
    ));
    assert!(matches!(
        &module.items[1],
        Stmt::Augment(a) if a.oper == AugmentOperator::IntegerDivision
    ));
    assert!(matches!(
        &module.items[2],
        Stmt::Augment(a) if a.oper == AugmentOperator::Exponentiation
    ));
}

#[test]
fn test_compound_statements() {
    let module = parse(
        "if a:\n  x = 1\nelif b:\n  x = 2\nelse:\n  x = 3\n\
         while c:\n  pass\nelse:\n  pass\n\
         for i in s:\n  continue\n\
         try:\n  pass\nexcept E as e:\n  pass\nfinally:\n  pass\n\
         with m as f:\n  pass\n",
    );
    let Stmt::If(i) = &module.items[0] else {
        panic!("expected if");
    };
    assert_eq!(i.elifs.len(), 1);
    assert!(i.else_suite.is_some());

    let Stmt::While(w) = &module.items[1] else {
        panic!("expected while");
    };
    assert!(w.else_suite.is_some());

    assert!(matches!(&module.items[2], Stmt::For(_)));

    let Stmt::Try(t) = &module.items[3] else {
        panic!("expected try");
    };
    assert_eq!(t.excepts.len(), 1);
    assert_eq!(t.excepts[0].name.as_deref(), Some("e"));
    assert!(t.finally_suite.is_some());

    let Stmt::With(w) = &module.items[4] else {
        panic!("expected with");
    };
    assert_eq!(w.item_to_name[0].1.as_deref(), Some("f"));
}

#[test]
fn test_inline_suite() {
    let module = parse("if a: x = 1\n");
    let Stmt::If(i) = &module.items[0] else {
        panic!("expected if");
    };
    assert_eq!(i.items.len(), 1);
}

#[test]
fn test_function_and_class_definitions() {
    let module = parse(
        "def f(a, b=2, *args, **kwargs):\n  return a\n\
         class C(Base):\n  def g(self):\n    pass\n",
    );
    let Stmt::FunctionDef(f) = &module.items[0] else {
        panic!("expected def");
    };
    assert_eq!(f.name, "f");
    assert_eq!(f.args.args.len(), 2);
    assert_eq!(f.args.varargs_name.as_deref(), Some("args"));
    assert_eq!(f.args.varkwargs_name.as_deref(), Some("kwargs"));

    let Stmt::ClassDef(c) = &module.items[1] else {
        panic!("expected class");
    };
    assert_eq!(c.name, "C");
    assert_eq!(c.parent_types.len(), 1);
    assert!(matches!(&c.items[0], Stmt::FunctionDef(_)));
}

#[test]
fn test_decorators_attach_to_def() {
    let module = parse("@deco\n@other(1)\ndef f():\n  pass\n");
    let Stmt::FunctionDef(f) = &module.items[0] else {
        panic!("expected def");
    };
    assert_eq!(f.decorators.len(), 2);
}

#[test]
fn test_imports() {
    let module = parse("import a, b as c\nfrom m import x as y, z\nfrom n import *\n");
    let Stmt::Import(i) = &module.items[0] else {
        panic!("expected import");
    };
    assert_eq!(
        i.modules,
        vec![
            ("a".to_string(), "a".to_string()),
            ("b".to_string(), "c".to_string())
        ]
    );

    let Stmt::Import(i) = &module.items[1] else {
        panic!("expected import");
    };
    assert_eq!(i.modules, vec![("m".to_string(), "m".to_string())]);
    assert_eq!(
        i.names,
        vec![
            ("x".to_string(), "y".to_string()),
            ("z".to_string(), "z".to_string())
        ]
    );
    assert!(!i.import_star);

    let Stmt::Import(i) = &module.items[2] else {
        panic!("expected import");
    };
    assert!(i.import_star);
}

#[test]
fn test_simple_statements() {
    let module = parse(
        "del x\nglobal g, h\nassert a, 'msg'\nraise E, v\nyield 5\nyield from gen\n",
    );
    assert!(matches!(&module.items[0], Stmt::Delete(_)));
    let Stmt::Global(g) = &module.items[1] else {
        panic!("expected global");
    };
    assert_eq!(g.names, vec!["g".to_string(), "h".to_string()]);
    let Stmt::Assert(a) = &module.items[2] else {
        panic!("expected assert");
    };
    assert!(a.failure_message.is_some());
    let Stmt::Raise(r) = &module.items[3] else {
        panic!("expected raise");
    };
    assert!(r.type_expr.is_some() && r.value.is_some() && r.traceback.is_none());
    assert!(matches!(&module.items[4], Stmt::Yield(y) if !y.from));
    assert!(matches!(&module.items[5], Stmt::Yield(y) if y.from));
}

#[test]
fn test_docstring_skipped() {
    let module = parse("'module docstring'\nx = 1\n");
    assert_eq!(module.items.len(), 1);
    assert!(matches!(&module.items[0], Stmt::Assignment(_)));
}

#[test]
fn test_statement_errors() {
    assert_eq!(
        parse_error("else:\n  pass\n"),
        ParseErrorKind::SyntaxError
    );
    assert_eq!(
        parse_error("1 + 2\n"),
        ParseErrorKind::InvalidStartingTokenType
    );
    assert_eq!(
        parse_error("raise a, b, c, d\n"),
        ParseErrorKind::TooManyArguments
    );
    assert_eq!(
        parse_error("nonlocal x\n"),
        ParseErrorKind::UnimplementedFeature
    );
    assert_eq!(
        parse_error("x = lambda\n"),
        ParseErrorKind::IncompleteLambdaDefinition
    );
    assert_eq!(
        parse_error("x = a if b\n"),
        ParseErrorKind::IncompleteTernaryOperator
    );
}

#[test]
fn test_expression_round_trip() {
    // pretty-printing then re-parsing gives a structurally equal tree
    let cases = [
        "1 + 2 * 3",
        "2 ** -1",
        "a and b or c",
        "not a",
        "a < b",
        "a not in b",
        "a is not b",
        "x[1]",
        "x[1:2]",
        "x[1:2:3]",
        "a.b.c",
        "f(1, k=2)",
        "[1, 2, 3]",
        "{1: 2, 3: 4}",
        "{1, 2}",
        "(1, 2)",
        "(5,)",
        "[x for x in a if x]",
        "lambda a, b=1: a",
        "a if b else c",
        "-x + ~y",
        "'text'",
        "b'bytes'",
        "3.5",
        "2.0",
        "x | y ^ z & w",
        "x << 2 >> 1",
        "a // b % c",
    ];
    for case in cases {
        let first = parse_expr(case);
        let rendered = expr_to_source(&first);
        let second = parse_expr(&rendered);
        assert_eq!(first, second, "round trip failed for {:?} -> {:?}", case, rendered);
    }
}

#[test]
fn test_parenthesized_expression_is_one_tuple() {
    // in this grammar a parenthesized expression is a tuple constructor
    let Expr::TupleCtor(t) = parse_expr("(1 + 2)") else {
        panic!("expected tuple");
    };
    assert_eq!(t.items.len(), 1);
}

#[test]
fn test_offsets_recorded() {
    let module = parse("x = 1\ny = 2\n");
    assert_eq!(module.items[0].offset(), 0);
    assert_eq!(module.items[1].offset(), 6);
}
