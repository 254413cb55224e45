// Statement parsing.
//
// A suite is parsed statement by statement up to an end bound. Block-local
// state binds elif/else/except/finally to the nearest preceding matching
// head and holds pending decorators; any other statement clears it.

use super::Parser;
use crate::{ParseError, ParseErrorKind};
use pyrite_ast::*;
use pyrite_lexer::TokenType;

/// The most recent compound statement in the current suite that may still
/// accept a continuation clause. Holds an index into the suite's items.
#[derive(Clone, Copy)]
enum PrevBlock {
    None,
    If(usize),
    For(usize),
    While(usize),
    Try(usize),
}

static AUGMENT_OPERATOR_TOKENS: [(TokenType, AugmentOperator); 12] = [
    (TokenType::PlusEquals, AugmentOperator::Addition),
    (TokenType::MinusEquals, AugmentOperator::Subtraction),
    (TokenType::AsteriskEquals, AugmentOperator::Multiplication),
    (TokenType::SlashEquals, AugmentOperator::Division),
    (TokenType::PercentEquals, AugmentOperator::Modulus),
    (TokenType::AmpersandEquals, AugmentOperator::And),
    (TokenType::PipeEquals, AugmentOperator::Or),
    (TokenType::CaretEquals, AugmentOperator::Xor),
    (TokenType::LeftShiftEquals, AugmentOperator::LeftShift),
    (TokenType::RightShiftEquals, AugmentOperator::RightShift),
    (TokenType::DoubleAsteriskEquals, AugmentOperator::Exponentiation),
    (TokenType::DoubleSlashEquals, AugmentOperator::IntegerDivision),
];

impl<'a> Parser<'a> {
    /// Expression statement, assignment, or augmented assignment.
    pub(crate) fn parse_simple_statement(&mut self, end_offset: usize) -> Result<Stmt, ParseError> {
        let offset = self.head_offset();

        let mut operator_offset = self.find_bracketed(TokenType::Equals, end_offset, false)?;
        let mut augment_operator = None;
        if operator_offset.is_none() {
            for (token, oper) in AUGMENT_OPERATOR_TOKENS.iter() {
                if let Some(found) = self.find_bracketed(*token, end_offset, false)? {
                    operator_offset = Some(found);
                    augment_operator = Some(*oper);
                    break;
                }
            }
        }

        // no operator: a bare expression, maybe a function call
        let Some(operator_offset) = operator_offset else {
            let expr = self.parse_expression_tuple(end_offset)?;
            return Ok(Stmt::Expression(ExpressionStatement { expr, offset }));
        };

        let target = self.parse_lvalue_tuple(operator_offset)?;
        match augment_operator {
            None => {
                self.expect_token_type(
                    TokenType::Equals,
                    ParseErrorKind::IncompleteParsing,
                    "left side of assignment is incomplete",
                )?;
                self.advance(1);
                let value = self.parse_expression_tuple(end_offset)?;
                Ok(Stmt::Assignment(AssignmentStatement {
                    target,
                    value,
                    offset,
                }))
            }
            Some(oper) => {
                self.expect_offset(
                    operator_offset,
                    ParseErrorKind::IncompleteParsing,
                    "left side of augment is incomplete",
                )?;
                self.advance(1);
                let value = self.parse_expression_tuple(end_offset)?;
                Ok(Stmt::Augment(AugmentStatement {
                    oper,
                    target,
                    value,
                    offset,
                }))
            }
        }
    }

    pub(crate) fn parse_compound_statement_suite(
        &mut self,
        end_offset: usize,
    ) -> Result<Vec<Stmt>, ParseError> {
        let mut ret: Vec<Stmt> = Vec::new();

        // parser state local to the current indentation level
        let mut decorator_stack: Vec<Expr> = Vec::new();
        let mut prev = PrevBlock::None;

        while self.token_num < end_offset {
            let offset = self.head_offset();
            let mut newline_expected = true;
            let mut should_clear_local = true;

            let line_end_offset = self
                .find_bracketed(TokenType::Newline, end_offset, false)?
                .unwrap_or(end_offset);

            match self.head()?.ty {
                TokenType::Newline => {
                    should_clear_local = false;
                }

                // a lone string constant is probably a docstring
                TokenType::BytesConstant | TokenType::UnicodeConstant
                    if self.tokens.get(self.token_num + 1).map(|t| t.ty)
                        == Some(TokenType::Newline) =>
                {
                    self.advance(1);
                }

                TokenType::BytesConstant
                | TokenType::UnicodeConstant
                | TokenType::Dynamic
                | TokenType::OpenParen => {
                    ret.push(self.parse_simple_statement(line_end_offset)?);
                }

                TokenType::Del => {
                    self.advance(1);
                    let targets = self.parse_lvalue_tuple(line_end_offset)?;
                    ret.push(Stmt::Delete(DeleteStatement { targets, offset }));
                }

                TokenType::Pass => {
                    self.advance(1);
                    ret.push(Stmt::Pass(PassStatement { offset }));
                }

                TokenType::Break => {
                    self.advance(1);
                    ret.push(Stmt::Break(BreakStatement { offset }));
                }

                TokenType::Continue => {
                    self.advance(1);
                    ret.push(Stmt::Continue(ContinueStatement { offset }));
                }

                TokenType::Return => {
                    self.advance(1);
                    let value = if self.head()?.ty != TokenType::Newline {
                        Some(self.parse_expression_tuple(line_end_offset)?)
                    } else {
                        None
                    };
                    ret.push(Stmt::Return(ReturnStatement { value, offset }));
                }

                TokenType::Raise => {
                    self.advance(1);
                    let mut exprs = if self.head()?.ty != TokenType::Newline {
                        self.parse_expression_list(line_end_offset)?
                    } else {
                        Vec::new()
                    };
                    self.expect_condition(
                        exprs.len() <= 3,
                        ParseErrorKind::TooManyArguments,
                        "too many arguments to raise statement",
                    )?;
                    let traceback = if exprs.len() > 2 { Some(exprs.remove(2)) } else { None };
                    let value = if exprs.len() > 1 { Some(exprs.remove(1)) } else { None };
                    let type_expr = if !exprs.is_empty() { Some(exprs.remove(0)) } else { None };
                    ret.push(Stmt::Raise(RaiseStatement {
                        type_expr,
                        value,
                        traceback,
                        offset,
                    }));
                }

                TokenType::Import => {
                    self.advance(1);

                    // import name [as rename][, name [as rename], ...]
                    let mut modules = Vec::new();
                    while self.head()?.ty != TokenType::Newline {
                        self.expect_token_type(
                            TokenType::Dynamic,
                            ParseErrorKind::SyntaxError,
                            "expected name following import keyword",
                        )?;
                        let name = self.head()?.ident().unwrap_or_default().to_string();
                        self.advance(1);
                        if self.head()?.ty == TokenType::As {
                            self.advance(1);
                            self.expect_token_type(
                                TokenType::Dynamic,
                                ParseErrorKind::SyntaxError,
                                "expected name following 'as'",
                            )?;
                            let rename = self.head()?.ident().unwrap_or_default().to_string();
                            self.advance(1);
                            modules.push((name, rename));
                        } else {
                            modules.push((name.clone(), name));
                        }

                        if self.head()?.ty == TokenType::Comma {
                            self.advance(1);
                        }
                    }

                    ret.push(Stmt::Import(ImportStatement {
                        modules,
                        names: Vec::new(),
                        import_star: false,
                        offset,
                    }));
                }

                TokenType::From => {
                    self.advance(1);

                    // from name import *
                    // from name import sym [as rename][, sym [as rename], ...]
                    self.expect_token_type(
                        TokenType::Dynamic,
                        ParseErrorKind::SyntaxError,
                        "expected name following 'from'",
                    )?;
                    let module = self.head()?.ident().unwrap_or_default().to_string();
                    self.advance(1);

                    self.expect_token_type(
                        TokenType::Import,
                        ParseErrorKind::SyntaxError,
                        "expected 'import' after module name",
                    )?;
                    self.advance(1);
                    self.expect_condition(
                        self.head()?.ty != TokenType::Newline,
                        ParseErrorKind::SyntaxError,
                        "expected something after from...import",
                    )?;

                    let mut names = Vec::new();
                    let mut import_star = false;
                    if self.head()?.ty == TokenType::Asterisk {
                        self.advance(1);
                        import_star = true;
                    } else {
                        while self.head()?.ty != TokenType::Newline {
                            self.expect_token_type(
                                TokenType::Dynamic,
                                ParseErrorKind::SyntaxError,
                                "expected name for attribute import",
                            )?;
                            let name = self.head()?.ident().unwrap_or_default().to_string();
                            self.advance(1);
                            if self.head()?.ty == TokenType::As {
                                self.advance(1);
                                self.expect_token_type(
                                    TokenType::Dynamic,
                                    ParseErrorKind::SyntaxError,
                                    "expected name following 'as' for attribute import",
                                )?;
                                let rename = self.head()?.ident().unwrap_or_default().to_string();
                                self.advance(1);
                                names.push((name, rename));
                            } else {
                                names.push((name.clone(), name));
                            }

                            if self.head()?.ty == TokenType::Comma {
                                self.advance(1);
                            }
                        }
                    }

                    ret.push(Stmt::Import(ImportStatement {
                        modules: vec![(module.clone(), module)],
                        names,
                        import_star,
                        offset,
                    }));
                }

                TokenType::Def => {
                    self.advance(1);

                    self.expect_token_type(
                        TokenType::Dynamic,
                        ParseErrorKind::SyntaxError,
                        "expected name for function definition",
                    )?;
                    let name = self.head()?.ident().unwrap_or_default().to_string();
                    self.advance(1);

                    self.expect_token_type(
                        TokenType::OpenParen,
                        ParseErrorKind::SyntaxError,
                        "expected open parenthesis after function name",
                    )?;
                    self.advance(1);

                    let args_end_offset = self
                        .find_bracketed(TokenType::CloseParen, end_offset, false)?
                        .ok_or_else(|| {
                            self.error(
                                ParseErrorKind::BracketingError,
                                "function argspec has no close parenthesis",
                            )
                        })?;
                    let args = self.parse_function_argument_definition(args_end_offset)?;
                    self.expect_offset(
                        args_end_offset,
                        ParseErrorKind::IncompleteParsing,
                        "function argspec is incomplete",
                    )?;

                    self.expect_token_type(
                        TokenType::CloseParen,
                        ParseErrorKind::SyntaxError,
                        "expected close parenthesis at end of argument list",
                    )?;
                    self.advance(1);

                    let items = self.parse_suite_from_colon(end_offset)?;

                    ret.push(Stmt::FunctionDef(FunctionDefinition {
                        decorators: std::mem::take(&mut decorator_stack),
                        name,
                        args,
                        items,
                        function_id: 0,
                        offset,
                    }));
                    newline_expected = false;
                }

                TokenType::Global => {
                    self.advance(1);
                    let names = self.parse_dynamic_list()?;
                    ret.push(Stmt::Global(GlobalStatement { names, offset }));
                }

                TokenType::Nonlocal => {
                    return Err(self.error(
                        ParseErrorKind::UnimplementedFeature,
                        "nonlocal declarations are not supported",
                    ));
                }

                TokenType::Exec => {
                    self.advance(1);
                    let mut exprs = self.parse_expression_list(line_end_offset)?;
                    self.expect_condition(
                        !exprs.is_empty(),
                        ParseErrorKind::SyntaxError,
                        "expected expression after exec",
                    )?;
                    self.expect_condition(
                        exprs.len() <= 3,
                        ParseErrorKind::TooManyArguments,
                        "too many arguments to exec statement",
                    )?;
                    let locals = if exprs.len() > 2 { Some(exprs.remove(2)) } else { None };
                    let globals = if exprs.len() > 1 { Some(exprs.remove(1)) } else { None };
                    let code = exprs.remove(0);
                    ret.push(Stmt::Exec(ExecStatement {
                        code,
                        globals,
                        locals,
                        offset,
                    }));
                }

                TokenType::Assert => {
                    self.advance(1);
                    let mut exprs = self.parse_expression_list(line_end_offset)?;
                    self.expect_condition(
                        !exprs.is_empty(),
                        ParseErrorKind::SyntaxError,
                        "expected expression after assert",
                    )?;
                    self.expect_condition(
                        exprs.len() <= 2,
                        ParseErrorKind::TooManyArguments,
                        "too many arguments to assert statement",
                    )?;
                    let failure_message = if exprs.len() > 1 { Some(exprs.remove(1)) } else { None };
                    let check = exprs.remove(0);
                    ret.push(Stmt::Assert(AssertStatement {
                        check,
                        failure_message,
                        offset,
                    }));
                }

                TokenType::If => {
                    decorator_stack.clear();
                    prev = PrevBlock::None;
                    self.advance(1);

                    let colon_offset = self
                        .find_bracketed(TokenType::Colon, end_offset, false)?
                        .ok_or_else(|| {
                            self.error(
                                ParseErrorKind::SyntaxError,
                                "expected colon after if statement",
                            )
                        })?;
                    let check = self.parse_expression(colon_offset)?;
                    self.expect_offset(
                        colon_offset,
                        ParseErrorKind::IncompleteParsing,
                        "if expression is incomplete",
                    )?;

                    let items = self.parse_suite_from_colon(end_offset)?;

                    // elifs and else are attached later
                    ret.push(Stmt::If(IfStatement {
                        check,
                        items,
                        elifs: Vec::new(),
                        else_suite: None,
                        always_true: false,
                        always_false: false,
                        offset,
                    }));
                    prev = PrevBlock::If(ret.len() - 1);
                    newline_expected = false;
                    should_clear_local = false;
                }

                TokenType::Else => {
                    self.expect_condition(
                        !matches!(prev, PrevBlock::None) && decorator_stack.is_empty(),
                        ParseErrorKind::SyntaxError,
                        "else block not after if/for/while/try",
                    )?;

                    self.advance(1);
                    self.expect_token_type(
                        TokenType::Colon,
                        ParseErrorKind::SyntaxError,
                        "expected colon after 'else'",
                    )?;

                    let items = self.parse_suite_from_colon(end_offset)?;
                    let else_suite = Some(ElseStatement { items, offset });

                    match prev {
                        PrevBlock::If(index) => {
                            if let Some(Stmt::If(x)) = ret.get_mut(index) {
                                x.else_suite = else_suite;
                            }
                        }
                        PrevBlock::For(index) => {
                            if let Some(Stmt::For(x)) = ret.get_mut(index) {
                                x.else_suite = else_suite;
                            }
                        }
                        PrevBlock::While(index) => {
                            if let Some(Stmt::While(x)) = ret.get_mut(index) {
                                x.else_suite = else_suite;
                            }
                        }
                        PrevBlock::Try(index) => {
                            if let Some(Stmt::Try(x)) = ret.get_mut(index) {
                                x.else_suite = else_suite;
                            }
                            should_clear_local = false;
                        }
                        PrevBlock::None => {}
                    }

                    newline_expected = false;
                }

                TokenType::Elif => {
                    let PrevBlock::If(if_index) = prev else {
                        return Err(self.error(
                            ParseErrorKind::SyntaxError,
                            "elif block not after if block",
                        ));
                    };

                    self.advance(1);

                    let colon_offset = self
                        .find_bracketed(TokenType::Colon, end_offset, false)?
                        .ok_or_else(|| {
                            self.error(
                                ParseErrorKind::SyntaxError,
                                "expected colon after elif statement",
                            )
                        })?;
                    let check = self.parse_expression(colon_offset)?;
                    self.expect_offset(
                        colon_offset,
                        ParseErrorKind::IncompleteParsing,
                        "elif expression is incomplete",
                    )?;

                    let items = self.parse_suite_from_colon(end_offset)?;

                    if let Some(Stmt::If(x)) = ret.get_mut(if_index) {
                        x.elifs.push(ElifStatement {
                            check,
                            items,
                            always_true: false,
                            always_false: false,
                            offset,
                        });
                    }
                    newline_expected = false;
                    should_clear_local = false;
                }

                TokenType::While => {
                    decorator_stack.clear();
                    prev = PrevBlock::None;
                    self.advance(1);

                    let colon_offset = self
                        .find_bracketed(TokenType::Colon, end_offset, false)?
                        .ok_or_else(|| {
                            self.error(
                                ParseErrorKind::SyntaxError,
                                "expected colon after while statement",
                            )
                        })?;
                    let condition = self.parse_expression(colon_offset)?;
                    self.expect_offset(
                        colon_offset,
                        ParseErrorKind::IncompleteParsing,
                        "while expression is incomplete",
                    )?;

                    let items = self.parse_suite_from_colon(end_offset)?;

                    ret.push(Stmt::While(WhileStatement {
                        condition,
                        items,
                        else_suite: None,
                        offset,
                    }));
                    prev = PrevBlock::While(ret.len() - 1);
                    newline_expected = false;
                    should_clear_local = false;
                }

                TokenType::For => {
                    decorator_stack.clear();
                    prev = PrevBlock::None;
                    self.advance(1);

                    let in_offset = self
                        .find_bracketed(TokenType::In, end_offset, false)?
                        .ok_or_else(|| {
                            self.error(ParseErrorKind::SyntaxError, "expected 'in' after 'for'")
                        })?;
                    let variable = self.parse_lvalue_tuple(in_offset)?;

                    self.expect_token_type(
                        TokenType::In,
                        ParseErrorKind::SyntaxError,
                        "expected 'in' after 'for' unpacking",
                    )?;
                    self.advance(1);

                    let colon_offset = self
                        .find_bracketed(TokenType::Colon, end_offset, false)?
                        .ok_or_else(|| {
                            self.error(ParseErrorKind::SyntaxError, "expected colon after 'for'")
                        })?;
                    let collection = self.parse_expression_tuple(colon_offset)?;
                    self.expect_offset(
                        colon_offset,
                        ParseErrorKind::IncompleteParsing,
                        "for expression list is incomplete",
                    )?;

                    let items = self.parse_suite_from_colon(end_offset)?;

                    ret.push(Stmt::For(ForStatement {
                        variable,
                        collection,
                        items,
                        else_suite: None,
                        offset,
                    }));
                    prev = PrevBlock::For(ret.len() - 1);
                    newline_expected = false;
                    should_clear_local = false;
                }

                TokenType::Try => {
                    decorator_stack.clear();
                    prev = PrevBlock::None;
                    self.advance(1);
                    self.expect_token_type(
                        TokenType::Colon,
                        ParseErrorKind::SyntaxError,
                        "expected colon after 'try'",
                    )?;

                    let items = self.parse_suite_from_colon(end_offset)?;

                    ret.push(Stmt::Try(TryStatement {
                        items,
                        excepts: Vec::new(),
                        else_suite: None,
                        finally_suite: None,
                        offset,
                    }));
                    prev = PrevBlock::Try(ret.len() - 1);
                    newline_expected = false;
                    should_clear_local = false;
                }

                TokenType::Except => {
                    let PrevBlock::Try(try_index) = prev else {
                        return Err(self.error(
                            ParseErrorKind::SyntaxError,
                            "except block not after try block",
                        ));
                    };

                    self.advance(1);

                    let colon_offset = self
                        .find_bracketed(TokenType::Colon, end_offset, false)?
                        .ok_or_else(|| {
                            self.error(
                                ParseErrorKind::SyntaxError,
                                "expected colon after 'except'",
                            )
                        })?;

                    // the caught name follows an 'as' or a comma
                    let marker = self
                        .find_bracketed_any(&[TokenType::Comma, TokenType::As], colon_offset, false)?
                        .map(|(found, _)| found)
                        .filter(|&found| found <= colon_offset)
                        .unwrap_or(colon_offset);

                    let types = if marker != self.token_num {
                        let t = self.parse_expression(marker)?;
                        self.expect_offset(
                            marker,
                            ParseErrorKind::IncompleteParsing,
                            "exception expression is incomplete",
                        )?;
                        if marker != colon_offset {
                            self.advance(1);
                        }
                        Some(t)
                    } else {
                        None
                    };

                    let name = if colon_offset != self.token_num {
                        self.expect_token_type(
                            TokenType::Dynamic,
                            ParseErrorKind::SyntaxError,
                            "expected name after 'as' or comma",
                        )?;
                        let name = self.head()?.ident().unwrap_or_default().to_string();
                        self.advance(1);
                        self.expect_offset(
                            colon_offset,
                            ParseErrorKind::SyntaxError,
                            "expected colon at end of except statement",
                        )?;
                        Some(name)
                    } else {
                        None
                    };

                    let items = self.parse_suite_from_colon(end_offset)?;

                    if let Some(Stmt::Try(x)) = ret.get_mut(try_index) {
                        x.excepts.push(ExceptStatement {
                            types,
                            name,
                            items,
                            class_ids: Vec::new(),
                            offset,
                        });
                    }
                    newline_expected = false;
                    should_clear_local = false;
                }

                TokenType::Finally => {
                    let PrevBlock::Try(try_index) = prev else {
                        return Err(self.error(
                            ParseErrorKind::SyntaxError,
                            "finally block not after try block",
                        ));
                    };

                    self.advance(1);
                    self.expect_token_type(
                        TokenType::Colon,
                        ParseErrorKind::SyntaxError,
                        "expected colon after 'finally'",
                    )?;

                    let items = self.parse_suite_from_colon(end_offset)?;

                    if let Some(Stmt::Try(x)) = ret.get_mut(try_index) {
                        x.finally_suite = Some(FinallyStatement { items, offset });
                    }
                    newline_expected = false;
                }

                TokenType::Class => {
                    self.advance(1);
                    self.expect_token_type(
                        TokenType::Dynamic,
                        ParseErrorKind::SyntaxError,
                        "expected class name",
                    )?;
                    let name = self.head()?.ident().unwrap_or_default().to_string();
                    self.advance(1);

                    let mut parent_types = Vec::new();
                    if self.head()?.ty == TokenType::OpenParen {
                        self.advance(1);
                        let close_paren_offset = self
                            .find_bracketed(TokenType::CloseParen, line_end_offset, false)?
                            .filter(|&c| c < line_end_offset)
                            .ok_or_else(|| {
                                self.error(
                                    ParseErrorKind::SyntaxError,
                                    "expected close parenthesis after class name",
                                )
                            })?;

                        parent_types = self.parse_expression_list(close_paren_offset)?;
                        self.expect_offset(
                            close_paren_offset,
                            ParseErrorKind::IncompleteParsing,
                            "class parent type list is incomplete",
                        )?;
                        self.advance(1);
                    }

                    let items = self.parse_suite_from_colon(end_offset)?;

                    ret.push(Stmt::ClassDef(ClassDefinition {
                        decorators: std::mem::take(&mut decorator_stack),
                        name,
                        parent_types,
                        items,
                        class_id: 0,
                        offset,
                    }));
                    newline_expected = false;
                }

                TokenType::With => {
                    self.advance(1);

                    let colon_offset = self
                        .find_bracketed(TokenType::Colon, end_offset, false)?
                        .ok_or_else(|| {
                            self.error(ParseErrorKind::SyntaxError, "expected colon after 'with'")
                        })?;

                    let mut item_to_name = Vec::new();
                    while self.head()?.ty != TokenType::Colon {
                        let comma_offset = self
                            .find_bracketed(TokenType::Comma, colon_offset, false)?
                            .filter(|&c| c <= colon_offset)
                            .unwrap_or(colon_offset);

                        let as_offset = self
                            .find_bracketed(TokenType::As, comma_offset, false)?
                            .filter(|&a| a <= comma_offset)
                            .unwrap_or(comma_offset);

                        let expr = self.parse_expression(as_offset)?;
                        self.expect_offset(
                            as_offset,
                            ParseErrorKind::IncompleteParsing,
                            "with context expression is incomplete",
                        )?;

                        if as_offset != comma_offset {
                            self.advance(1);
                            self.expect_token_type(
                                TokenType::Dynamic,
                                ParseErrorKind::IncompleteParsing,
                                "excess tokens after 'as'",
                            )?;
                            let name = self.head()?.ident().unwrap_or_default().to_string();
                            item_to_name.push((expr, Some(name)));
                            self.advance(1);
                        } else {
                            item_to_name.push((expr, None));
                        }

                        self.expect_offset(
                            comma_offset,
                            ParseErrorKind::IncompleteParsing,
                            "with context definition is incomplete",
                        )?;

                        if comma_offset != colon_offset {
                            self.expect_token_type(
                                TokenType::Comma,
                                ParseErrorKind::SyntaxError,
                                "expected comma here",
                            )?;
                            self.advance(1);
                        }
                    }

                    let items = self.parse_suite_from_colon(end_offset)?;

                    ret.push(Stmt::With(WithStatement {
                        item_to_name,
                        items,
                        offset,
                    }));
                    newline_expected = false;
                    should_clear_local = false;
                }

                TokenType::Yield => {
                    self.advance(1);

                    let from = self.head()?.ty == TokenType::From;
                    if from {
                        self.advance(1);
                    }

                    let expr = if self.head()?.ty != TokenType::Newline {
                        Some(self.parse_expression(line_end_offset)?)
                    } else {
                        None
                    };

                    ret.push(Stmt::Yield(YieldStatement {
                        expr,
                        from,
                        split_id: 0,
                        offset,
                    }));
                }

                TokenType::At => {
                    self.advance(1);
                    let decorator = self.parse_expression(line_end_offset)?;
                    decorator_stack.push(decorator);
                    should_clear_local = false;
                }

                TokenType::Indent | TokenType::Unindent => {
                    return Err(self.error(
                        ParseErrorKind::InvalidIndentationChange,
                        "indent encountered out of line",
                    ));
                }

                _ => {
                    return Err(self.error(
                        ParseErrorKind::InvalidStartingTokenType,
                        format!("line starts with an invalid token type: {}", self.head()?),
                    ));
                }
            }

            // here we expect to be at either the end bound or a newline
            if newline_expected {
                self.expect_token_type(
                    TokenType::Newline,
                    ParseErrorKind::ExtraDataAfterLine,
                    "expected newline at end of statement",
                )?;
                self.advance(1);
            }
            if should_clear_local {
                decorator_stack.clear();
                prev = PrevBlock::None;
            }
        }

        Ok(ret)
    }
}
