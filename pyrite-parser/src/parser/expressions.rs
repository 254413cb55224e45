// Expression parsing.
//
// Each precedence level locates its operator with the bracketed scan
// (usually the last top-level occurrence) and recurses into the bounded
// sub-ranges on either side. Assignment targets take a dedicated path that
// only admits names, attributes, subscripts, slices, and tuples of those.

use super::Parser;
use crate::{ParseError, ParseErrorKind};
use pyrite_ast::*;
use pyrite_lexer::TokenType;

impl<'a> Parser<'a> {
    pub(crate) fn parse_binary_operator(
        &mut self,
        operator_offset: usize,
        end_offset: usize,
        oper: BinaryOperator,
    ) -> Result<Expr, ParseError> {
        let offset = self.head_offset();
        let left = self.parse_expression(operator_offset)?;
        self.expect_offset(
            operator_offset,
            ParseErrorKind::IncompleteParsing,
            "left side of binary operator is incomplete",
        )?;
        self.advance(1);
        let right = self.parse_expression(end_offset)?;
        self.expect_offset(
            end_offset,
            ParseErrorKind::IncompleteParsing,
            "right side of binary operator is incomplete",
        )?;
        Ok(Expr::Binary(BinaryOperation {
            oper,
            left: Box::new(left),
            right: Box::new(right),
            offset,
        }))
    }

    pub(crate) fn parse_unary_operator(
        &mut self,
        end_offset: usize,
        oper: UnaryOperator,
    ) -> Result<Expr, ParseError> {
        let offset = self.head_offset();
        self.advance(1);
        let expr = self.parse_expression(end_offset)?;
        self.expect_offset(
            end_offset,
            ParseErrorKind::IncompleteParsing,
            "argument of unary operator is incomplete",
        )?;
        Ok(Expr::Unary(UnaryOperation {
            oper,
            expr: Box::new(expr),
            split_id: 0,
            offset,
        }))
    }

    /// One table-driven binary level: parse at the last top-level occurrence
    /// of any of the given operator tokens.
    fn parse_binary_level(
        &mut self,
        tokens: &[TokenType],
        opers: &[BinaryOperator],
        end_offset: usize,
    ) -> Result<Option<Expr>, ParseError> {
        if let Some((pos, index)) = self.find_bracketed_any(tokens, end_offset, true)? {
            if pos > self.token_num && pos < end_offset {
                return Ok(Some(self.parse_binary_operator(pos, end_offset, opers[index])?));
            }
        }
        Ok(None)
    }

    pub(crate) fn parse_expression_list(
        &mut self,
        end_offset: usize,
    ) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while self.token_num < end_offset {
            let comma_offset = self
                .find_bracketed(TokenType::Comma, end_offset, false)?
                .unwrap_or(end_offset);
            items.push(self.parse_expression(comma_offset)?);
            self.expect_offset(
                comma_offset,
                ParseErrorKind::IncompleteParsing,
                "expression in list is incomplete",
            )?;
            if comma_offset < end_offset {
                self.advance(1);
            }
        }
        Ok(items)
    }

    /// If the range contains a top-level comma it's a tuple; otherwise just
    /// an expression, not wrapped in anything.
    pub(crate) fn parse_expression_tuple(&mut self, end_offset: usize) -> Result<Expr, ParseError> {
        let comma_offset = self.find_bracketed(TokenType::Comma, end_offset, false)?;
        if comma_offset.is_some() {
            let offset = self.head_offset();
            let items = self.parse_expression_list(end_offset)?;
            Ok(Expr::TupleCtor(TupleConstructor {
                items,
                value_types: Vec::new(),
                offset,
            }))
        } else {
            self.parse_expression(end_offset)
        }
    }

    pub(crate) fn parse_lvalue_tuple(&mut self, end_offset: usize) -> Result<LValue, ParseError> {
        let comma_offset = self.find_bracketed(TokenType::Comma, end_offset, false)?;
        if comma_offset.is_some() {
            let offset = self.head_offset();
            let mut items = Vec::new();
            while self.token_num < end_offset {
                let comma_offset = self
                    .find_bracketed(TokenType::Comma, end_offset, false)?
                    .unwrap_or(end_offset);
                items.push(self.parse_lvalue(comma_offset)?);
                self.expect_offset(
                    comma_offset,
                    ParseErrorKind::IncompleteParsing,
                    "assignment target in list is incomplete",
                )?;
                if comma_offset < end_offset {
                    self.advance(1);
                }
            }
            Ok(LValue::Tuple(TupleTarget { items, offset }))
        } else {
            self.parse_lvalue(end_offset)
        }
    }

    pub(crate) fn parse_dict_item_list(
        &mut self,
        end_offset: usize,
    ) -> Result<Vec<(Expr, Expr)>, ParseError> {
        let mut ret = Vec::new();
        while self.token_num < end_offset {
            let comma_offset = self
                .find_bracketed(TokenType::Comma, end_offset, false)?
                .unwrap_or(end_offset);
            let colon_offset = self.find_bracketed(TokenType::Colon, comma_offset, false)?;
            let colon_offset = match colon_offset {
                Some(colon) if colon > self.token_num && colon < comma_offset => colon,
                _ => {
                    return Err(self.error(
                        ParseErrorKind::IncompleteDictItem,
                        "dict item does not contain a colon",
                    ))
                }
            };

            let key = self.parse_expression(colon_offset)?;
            self.expect_offset(
                colon_offset,
                ParseErrorKind::IncompleteParsing,
                "key in dict definition is incomplete",
            )?;
            self.advance(1);
            let value = self.parse_expression(comma_offset)?;
            self.expect_offset(
                comma_offset,
                ParseErrorKind::IncompleteParsing,
                "value in dict definition is incomplete",
            )?;
            if comma_offset < end_offset {
                self.advance(1);
            }
            ret.push((key, value));
        }
        Ok(ret)
    }

    pub(crate) fn parse_expression(&mut self, end_offset: usize) -> Result<Expr, ParseError> {
        let offset = self.head_offset();

        // 1. lambda
        if self.head()?.ty == TokenType::Lambda {
            self.advance(1);

            let colon_offset = self.find_bracketed(TokenType::Colon, end_offset, false)?;
            let colon_offset = match colon_offset {
                Some(colon) if colon < end_offset => colon,
                _ => {
                    return Err(self.error(
                        ParseErrorKind::IncompleteLambdaDefinition,
                        "lambda has no colon",
                    ))
                }
            };

            let args = self.parse_function_argument_definition(colon_offset)?;
            self.expect_offset(
                colon_offset,
                ParseErrorKind::IncompleteParsing,
                "lambda argspec is incomplete",
            )?;
            self.advance(1);
            let result = self.parse_expression(end_offset)?;
            self.expect_offset(
                end_offset,
                ParseErrorKind::IncompleteParsing,
                "lambda body is incomplete",
            )?;
            return Ok(Expr::Lambda(LambdaDefinition {
                args,
                result: Box::new(result),
                function_id: 0,
                offset,
            }));
        }

        // 2. x if y else z
        if let Some(if_offset) = self.find_bracketed(TokenType::If, end_offset, true)? {
            if if_offset > self.token_num && if_offset < end_offset {
                let else_offset = self.find_bracketed(TokenType::Else, end_offset, true)?;
                let else_offset = match else_offset {
                    Some(e) if e > if_offset && e < end_offset => e,
                    _ => {
                        return Err(self.error(
                            ParseErrorKind::IncompleteTernaryOperator,
                            "ternary operator is missing its else",
                        ))
                    }
                };

                let left = self.parse_expression(if_offset)?;
                self.expect_offset(
                    if_offset,
                    ParseErrorKind::IncompleteParsing,
                    "left side of ternary operation is incomplete",
                )?;
                self.advance(1);
                let center = self.parse_expression(else_offset)?;
                self.expect_offset(
                    else_offset,
                    ParseErrorKind::IncompleteParsing,
                    "center side of ternary operation is incomplete",
                )?;
                self.advance(1);
                let right = self.parse_expression(end_offset)?;
                self.expect_offset(
                    end_offset,
                    ParseErrorKind::IncompleteParsing,
                    "right side of ternary operation is incomplete",
                )?;
                return Ok(Expr::Ternary(TernaryOperation {
                    oper: TernaryOperator::IfElse,
                    left: Box::new(left),
                    center: Box::new(center),
                    right: Box::new(right),
                    offset,
                }));
            }
        }

        // 3. or
        if let Some(e) = self.parse_binary_level(
            &[TokenType::Or],
            &[BinaryOperator::LogicalOr],
            end_offset,
        )? {
            return Ok(e);
        }

        // 4. and
        if let Some(e) = self.parse_binary_level(
            &[TokenType::And],
            &[BinaryOperator::LogicalAnd],
            end_offset,
        )? {
            return Ok(e);
        }

        // 5. not
        if self.head()?.ty == TokenType::Not {
            return self.parse_unary_operator(end_offset, UnaryOperator::LogicalNot);
        }

        // 6. comparisons: in, not in, is, is not, <, <=, >, >=, !=, ==
        if let Some(e) = self.parse_binary_level(
            &[
                TokenType::In,
                TokenType::NotIn,
                TokenType::Is,
                TokenType::IsNot,
                TokenType::LessThan,
                TokenType::LessOrEqual,
                TokenType::GreaterThan,
                TokenType::GreaterOrEqual,
                TokenType::NotEqual,
                TokenType::Equality,
            ],
            &[
                BinaryOperator::In,
                BinaryOperator::NotIn,
                BinaryOperator::Is,
                BinaryOperator::IsNot,
                BinaryOperator::LessThan,
                BinaryOperator::LessOrEqual,
                BinaryOperator::GreaterThan,
                BinaryOperator::GreaterOrEqual,
                BinaryOperator::NotEqual,
                BinaryOperator::Equality,
            ],
            end_offset,
        )? {
            return Ok(e);
        }

        // 7. |
        if let Some(e) =
            self.parse_binary_level(&[TokenType::Pipe], &[BinaryOperator::Or], end_offset)?
        {
            return Ok(e);
        }

        // 8. ^
        if let Some(e) =
            self.parse_binary_level(&[TokenType::Caret], &[BinaryOperator::Xor], end_offset)?
        {
            return Ok(e);
        }

        // 9. &
        if let Some(e) =
            self.parse_binary_level(&[TokenType::Ampersand], &[BinaryOperator::And], end_offset)?
        {
            return Ok(e);
        }

        // 10. <<, >>
        if let Some(e) = self.parse_binary_level(
            &[TokenType::LeftShift, TokenType::RightShift],
            &[BinaryOperator::LeftShift, BinaryOperator::RightShift],
            end_offset,
        )? {
            return Ok(e);
        }

        // 11. binary + and -
        // assumed binary unless there's another operator (or nothing) on
        // the left of the located occurrence
        if let Some((pos, index)) = self.find_bracketed_any(
            &[TokenType::Plus, TokenType::Minus],
            end_offset,
            true,
        )? {
            if pos > self.token_num
                && pos < end_offset
                && !self.token_at(pos - 1)?.ty.is_operator()
            {
                let opers = [BinaryOperator::Addition, BinaryOperator::Subtraction];
                return self.parse_binary_operator(pos, end_offset, opers[index]);
            }
        }

        // 12. *, /, //, %
        if let Some(e) = self.parse_binary_level(
            &[
                TokenType::Asterisk,
                TokenType::Slash,
                TokenType::DoubleSlash,
                TokenType::Percent,
            ],
            &[
                BinaryOperator::Multiplication,
                BinaryOperator::Division,
                BinaryOperator::IntegerDivision,
                BinaryOperator::Modulus,
            ],
            end_offset,
        )? {
            return Ok(e);
        }

        // 13. unary +x, -x, ~x
        match self.head()?.ty {
            TokenType::Plus => return self.parse_unary_operator(end_offset, UnaryOperator::Positive),
            TokenType::Minus => {
                return self.parse_unary_operator(end_offset, UnaryOperator::Negative)
            }
            TokenType::Tilde => {
                return self.parse_unary_operator(end_offset, UnaryOperator::BitwiseNot)
            }
            _ => {}
        }

        // 14. ** (binds less tightly than the unary operators to its right,
        // so 2**-1 is 2**(-1))
        if let Some(e) = self.parse_binary_level(
            &[TokenType::DoubleAsterisk],
            &[BinaryOperator::Exponentiation],
            end_offset,
        )? {
            return Ok(e);
        }

        // 15. postfix x[y], x[y:z(:w)], x(...), x.name - pick the rightmost
        // top-level postfix and recurse into its base
        let bracket_offset = self.find_bracketed(TokenType::OpenBracket, end_offset, true)?;
        let paren_offset = self.find_bracketed(TokenType::OpenParen, end_offset, true)?;
        let dot_offset = self.find_bracketed(TokenType::Dot, end_offset, true)?;
        let effective_offset = [bracket_offset, paren_offset, dot_offset]
            .into_iter()
            .flatten()
            .max();

        if let Some(effective) = effective_offset {
            if effective > self.token_num {
                if Some(effective) == bracket_offset {
                    return self.parse_subscript(effective, end_offset, offset);
                } else if Some(effective) == paren_offset {
                    return self.parse_call(effective, end_offset, offset);
                } else {
                    // attribute lookup
                    let base = self.parse_expression(effective)?;
                    self.expect_offset(
                        effective,
                        ParseErrorKind::IncompleteParsing,
                        "left side of attribute lookup is incomplete",
                    )?;
                    self.advance(1);

                    self.expect_token_type(
                        TokenType::Dynamic,
                        ParseErrorKind::SyntaxError,
                        "expected attribute name after '.'",
                    )?;
                    let name = self.head()?.ident().unwrap_or_default().to_string();
                    self.advance(1);
                    self.expect_offset(
                        end_offset,
                        ParseErrorKind::IncompleteParsing,
                        "right side of attribute lookup is incomplete",
                    )?;
                    return Ok(Expr::Attribute(AttributeLookup {
                        base: Box::new(base),
                        name,
                        base_module_name: None,
                        offset,
                    }));
                }
            }
        }

        // 16. atoms: [items], {key: value}, {items}, (items), constants
        let brace_offset = self.find_bracketed(TokenType::OpenBrace, end_offset, true)?;

        if bracket_offset == Some(self.token_num) {
            return self.parse_list_atom(end_offset, offset);
        } else if brace_offset == Some(self.token_num) {
            return self.parse_brace_atom(end_offset, offset);
        } else if paren_offset == Some(self.token_num) {
            // tuple constructor
            self.expect_condition(
                self.token_at(end_offset - 1)?.ty == TokenType::CloseParen,
                ParseErrorKind::IncompleteParsing,
                "parenthesized section is incomplete",
            )?;
            self.advance(1);

            let items = self.parse_expression_list(end_offset - 1)?;
            self.expect_offset(
                end_offset - 1,
                ParseErrorKind::IncompleteParsing,
                "tuple constructor is incomplete",
            )?;
            self.advance(1);
            return Ok(Expr::TupleCtor(TupleConstructor {
                items,
                value_types: Vec::new(),
                offset,
            }));
        }

        // probably a constant
        if self.token_num == end_offset.wrapping_sub(1) {
            let token = self.head()?;
            self.advance(1);
            return match (&token.ty, &token.data) {
                (TokenType::Integer, _) => Ok(Expr::Int(IntegerConstant {
                    value: token.int_value().unwrap_or_default(),
                    offset,
                })),
                (TokenType::Float, _) => Ok(Expr::Float(FloatConstant {
                    value: token.float_value().unwrap_or_default(),
                    offset,
                })),
                (TokenType::BytesConstant, pyrite_lexer::TokenData::Bytes(b)) => {
                    Ok(Expr::Bytes(BytesConstant {
                        value: b.clone(),
                        offset,
                    }))
                }
                (TokenType::UnicodeConstant, pyrite_lexer::TokenData::Unicode(s)) => {
                    Ok(Expr::Unicode(UnicodeConstant {
                        value: s.clone(),
                        offset,
                    }))
                }
                (TokenType::Dynamic, pyrite_lexer::TokenData::Ident(name)) => match name.as_str() {
                    "True" => Ok(Expr::True(TrueConstant { offset })),
                    "False" => Ok(Expr::False(FalseConstant { offset })),
                    "None" => Ok(Expr::None(NoneConstant { offset })),
                    _ => Ok(Expr::Variable(VariableLookup {
                        name: name.clone(),
                        offset,
                    })),
                },
                _ => Err(self.error(
                    ParseErrorKind::IncompleteExpressionParsing,
                    "no expression parsing rules matched",
                )),
            };
        }

        Err(self.error(
            ParseErrorKind::IncompleteExpressionParsing,
            "no expression parsing rules matched",
        ))
    }

    fn parse_subscript(
        &mut self,
        bracket_offset: usize,
        end_offset: usize,
        offset: usize,
    ) -> Result<Expr, ParseError> {
        let array = self.parse_expression(bracket_offset)?;
        self.expect_offset(
            bracket_offset,
            ParseErrorKind::IncompleteParsing,
            "array reference is incomplete",
        )?;
        self.advance(1);

        let bracket_end_offset = self.find_bracketed(TokenType::CloseBracket, end_offset, false)?;
        let bracket_end_offset = match bracket_end_offset {
            Some(e) if e > bracket_offset && e < end_offset => e,
            _ => {
                return Err(self.error(
                    ParseErrorKind::BracketingError,
                    "array subscript has no close bracket",
                ))
            }
        };

        let colon_offset = self.find_bracketed(TokenType::Colon, bracket_end_offset, false)?;
        if let Some(colon) = colon_offset.filter(|&c| c > bracket_offset && c < bracket_end_offset) {
            // slice
            let start_index = if self.head()?.ty != TokenType::Colon {
                Some(Box::new(self.parse_expression(colon)?))
            } else {
                None
            };
            self.expect_token_type(
                TokenType::Colon,
                ParseErrorKind::IncompleteParsing,
                "left side of slice is incomplete",
            )?;
            self.advance(1);

            let second_colon = self.find_bracketed(TokenType::Colon, bracket_end_offset, false)?;

            let head_type = self.head()?.ty;
            let end_index = if head_type != TokenType::Colon && head_type != TokenType::CloseBracket
            {
                Some(Box::new(
                    self.parse_expression(second_colon.unwrap_or(bracket_end_offset))?,
                ))
            } else {
                None
            };

            let step_size = if self.head()?.ty == TokenType::Colon {
                self.advance(1);
                Some(Box::new(self.parse_expression(bracket_end_offset)?))
            } else {
                None
            };

            self.expect_offset(
                bracket_end_offset,
                ParseErrorKind::IncompleteParsing,
                "right side of slice is incomplete",
            )?;
            self.advance(1);

            Ok(Expr::Slice(ArraySlice {
                array: Box::new(array),
                start_index,
                end_index,
                step_size,
                offset,
            }))
        } else {
            let index = self.parse_expression(bracket_end_offset)?;
            self.expect_offset(
                bracket_end_offset,
                ParseErrorKind::IncompleteParsing,
                "array index is incomplete",
            )?;
            self.advance(1);

            Ok(Expr::Index(ArrayIndex {
                array: Box::new(array),
                index: Box::new(index),
                index_constant: false,
                index_value: 0,
                offset,
            }))
        }
    }

    fn parse_call(
        &mut self,
        paren_offset: usize,
        end_offset: usize,
        offset: usize,
    ) -> Result<Expr, ParseError> {
        let function = self.parse_expression(paren_offset)?;
        self.expect_offset(
            paren_offset,
            ParseErrorKind::IncompleteParsing,
            "function reference is incomplete",
        )?;
        self.advance(1);

        let paren_end_offset = self.find_bracketed(TokenType::CloseParen, end_offset, false)?;
        let paren_end_offset = match paren_end_offset {
            Some(e) if e > paren_offset && e < end_offset => e,
            _ => {
                return Err(self.error(
                    ParseErrorKind::BracketingError,
                    "function call has no close parenthesis",
                ))
            }
        };

        let (args, kwargs, varargs, varkwargs) =
            self.parse_function_call_arguments(paren_end_offset)?;
        self.expect_offset(
            paren_end_offset,
            ParseErrorKind::IncompleteParsing,
            "function argument list is incomplete",
        )?;
        self.advance(1);

        Ok(Expr::Call(FunctionCall {
            function: Box::new(function),
            args,
            kwargs,
            varargs,
            varkwargs,
            split_id: 0,
            callee_function_id: 0,
            offset,
        }))
    }

    fn parse_list_atom(&mut self, end_offset: usize, offset: usize) -> Result<Expr, ParseError> {
        self.expect_condition(
            self.token_at(end_offset - 1)?.ty == TokenType::CloseBracket,
            ParseErrorKind::IncompleteParsing,
            "bracketed section is incomplete",
        )?;
        self.advance(1);

        // []
        if self.token_num == end_offset - 1 {
            self.advance(1);
            return Ok(Expr::ListCtor(ListConstructor {
                items: Vec::new(),
                value_type: None,
                offset,
            }));
        }

        // a top-level for ... in makes it a comprehension
        let for_offset = self.find_bracketed(TokenType::For, end_offset - 1, false)?;
        if let Some(for_offset) = for_offset.filter(|&f| f < end_offset) {
            let item_pattern = self.parse_expression(for_offset)?;
            self.expect_offset(
                for_offset,
                ParseErrorKind::IncompleteParsing,
                "list comprehension expression is incomplete",
            )?;
            self.advance(1);

            let in_offset = self.find_bracketed(TokenType::In, end_offset - 1, false)?;
            let in_offset = match in_offset {
                Some(i) if i > for_offset && i < end_offset => i,
                _ => {
                    return Err(self.error(
                        ParseErrorKind::IncompleteGeneratorExpression,
                        "list comprehension has no 'in'",
                    ))
                }
            };
            let variable = self.parse_lvalue_tuple(in_offset)?;
            self.expect_offset(
                in_offset,
                ParseErrorKind::IncompleteParsing,
                "list comprehension unpacking format is incomplete",
            )?;
            self.advance(1);

            let if_offset = self.find_bracketed(TokenType::If, end_offset - 1, false)?;
            let has_predicate = if_offset.map_or(false, |i| i > in_offset);
            let expr_end_offset = if has_predicate {
                if_offset.unwrap_or(end_offset - 1)
            } else {
                end_offset - 1
            };

            let source_data = self.parse_expression(expr_end_offset)?;
            self.expect_offset(
                expr_end_offset,
                ParseErrorKind::IncompleteParsing,
                "list comprehension source is incomplete",
            )?;
            self.advance(1);

            let predicate = if has_predicate {
                let p = self.parse_expression(end_offset - 1)?;
                self.expect_offset(
                    end_offset - 1,
                    ParseErrorKind::IncompleteParsing,
                    "list comprehension condition is incomplete",
                )?;
                self.advance(1);
                Some(Box::new(p))
            } else {
                None
            };

            return Ok(Expr::ListComp(ListComprehension {
                item_pattern: Box::new(item_pattern),
                variable,
                source_data: Box::new(source_data),
                predicate,
                offset,
            }));
        }

        let items = self.parse_expression_list(end_offset - 1)?;
        self.expect_offset(
            end_offset - 1,
            ParseErrorKind::IncompleteParsing,
            "list constructor is incomplete",
        )?;
        self.advance(1);
        Ok(Expr::ListCtor(ListConstructor {
            items,
            value_type: None,
            offset,
        }))
    }

    fn parse_brace_atom(&mut self, end_offset: usize, offset: usize) -> Result<Expr, ParseError> {
        self.expect_condition(
            self.token_at(end_offset - 1)?.ty == TokenType::CloseBrace,
            ParseErrorKind::IncompleteParsing,
            "braced section is incomplete",
        )?;
        self.advance(1);

        // {} is an empty dict
        if self.token_num == end_offset - 1 {
            self.advance(1);
            return Ok(Expr::DictCtor(DictConstructor {
                items: Vec::new(),
                key_type: None,
                value_type: None,
                offset,
            }));
        }

        // a top-level colon makes it a dict; otherwise it's a set
        let colon_offset = self.find_bracketed(TokenType::Colon, end_offset - 1, false)?;
        let is_dict = colon_offset.map_or(false, |c| c < end_offset);

        // a top-level for ... in makes it a comprehension
        let for_offset = self.find_bracketed(TokenType::For, end_offset - 1, true)?;
        if let Some(for_offset) = for_offset.filter(|&f| f < end_offset) {
            let in_offset = self.find_bracketed(TokenType::In, end_offset - 1, true)?;
            let in_offset = match in_offset {
                Some(i) if i > for_offset && i < end_offset => i,
                _ => {
                    return Err(self.error(
                        ParseErrorKind::IncompleteGeneratorExpression,
                        "dict/set comprehension has no 'in'",
                    ))
                }
            };

            let key_pattern = if is_dict {
                let colon = colon_offset.unwrap_or(end_offset - 1);
                let k = self.parse_expression(colon)?;
                self.expect_offset(
                    colon,
                    ParseErrorKind::IncompleteParsing,
                    "dict comprehension key is incomplete",
                )?;
                self.advance(1);
                Some(k)
            } else {
                None
            };

            let item_pattern = self.parse_expression(for_offset)?;
            self.expect_offset(
                for_offset,
                ParseErrorKind::IncompleteParsing,
                "dict/set comprehension value is incomplete",
            )?;
            self.advance(1);

            let variable = self.parse_lvalue_tuple(in_offset)?;
            self.expect_offset(
                in_offset,
                ParseErrorKind::IncompleteParsing,
                "dict/set comprehension unpacking format is incomplete",
            )?;
            self.advance(1);

            let if_offset = self.find_bracketed(TokenType::If, end_offset - 1, false)?;
            let has_predicate = if_offset.map_or(false, |i| i > in_offset);
            let expr_end_offset = if has_predicate {
                if_offset.unwrap_or(end_offset - 1)
            } else {
                end_offset - 1
            };

            let source_data = self.parse_expression(expr_end_offset)?;
            self.expect_offset(
                expr_end_offset,
                ParseErrorKind::IncompleteParsing,
                "dict/set comprehension source is incomplete",
            )?;
            self.advance(1);

            let predicate = if has_predicate {
                let p = self.parse_expression(end_offset - 1)?;
                self.expect_offset(
                    end_offset - 1,
                    ParseErrorKind::IncompleteParsing,
                    "dict/set comprehension condition is incomplete",
                )?;
                self.advance(1);
                Some(Box::new(p))
            } else {
                None
            };

            if let Some(key_pattern) = key_pattern {
                return Ok(Expr::DictComp(DictComprehension {
                    key_pattern: Box::new(key_pattern),
                    value_pattern: Box::new(item_pattern),
                    variable,
                    source_data: Box::new(source_data),
                    predicate,
                    offset,
                }));
            }
            return Ok(Expr::SetComp(SetComprehension {
                item_pattern: Box::new(item_pattern),
                variable,
                source_data: Box::new(source_data),
                predicate,
                offset,
            }));
        }

        if is_dict {
            let items = self.parse_dict_item_list(end_offset - 1)?;
            self.expect_offset(
                end_offset - 1,
                ParseErrorKind::IncompleteParsing,
                "dict constructor is incomplete",
            )?;
            self.advance(1);
            Ok(Expr::DictCtor(DictConstructor {
                items,
                key_type: None,
                value_type: None,
                offset,
            }))
        } else {
            let items = self.parse_expression_list(end_offset - 1)?;
            self.expect_offset(
                end_offset - 1,
                ParseErrorKind::IncompleteParsing,
                "set constructor is incomplete",
            )?;
            self.advance(1);
            Ok(Expr::SetCtor(SetConstructor {
                items,
                value_type: None,
                offset,
            }))
        }
    }

    /// Assignment targets: bare names, attributes, subscripts, slices, and
    /// (via parse_lvalue_tuple) tuples of those. The built-in constant
    /// names cannot be reassigned.
    pub(crate) fn parse_lvalue(&mut self, end_offset: usize) -> Result<LValue, ParseError> {
        let offset = self.head_offset();

        let bracket_offset = self.find_bracketed(TokenType::OpenBracket, end_offset, true)?;
        let paren_offset = self.find_bracketed(TokenType::OpenParen, end_offset, true)?;
        let dot_offset = self.find_bracketed(TokenType::Dot, end_offset, true)?;
        let effective_offset = [bracket_offset, paren_offset, dot_offset]
            .into_iter()
            .flatten()
            .max();

        if let Some(effective) = effective_offset.filter(|&e| e > self.token_num) {
            if Some(effective) == bracket_offset {
                return self.parse_subscript_target(effective, end_offset, offset);
            } else if Some(effective) == dot_offset {
                let base = self.parse_expression(effective)?;
                self.expect_offset(
                    effective,
                    ParseErrorKind::IncompleteParsing,
                    "left side of attribute write is incomplete",
                )?;
                self.advance(1);

                self.expect_token_type(
                    TokenType::Dynamic,
                    ParseErrorKind::SyntaxError,
                    "expected attribute name after '.'",
                )?;
                let name = self.head()?.ident().unwrap_or_default().to_string();
                self.advance(1);
                self.expect_offset(
                    end_offset,
                    ParseErrorKind::IncompleteParsing,
                    "right side of attribute write is incomplete",
                )?;
                return Ok(LValue::Attribute(AttributeTarget {
                    base: Box::new(base),
                    name,
                    offset,
                }));
            }
            return Err(self.error(
                ParseErrorKind::IncompleteExpressionParsing,
                "no lvalue parsing rules matched",
            ));
        }

        if self.token_num == end_offset.wrapping_sub(1) {
            self.expect_token_type(
                TokenType::Dynamic,
                ParseErrorKind::InvalidAssignment,
                "cannot parse constant as lvalue",
            )?;
            let name = self.head()?.ident().unwrap_or_default().to_string();
            self.advance(1);

            if name == "True" || name == "False" || name == "None" {
                return Err(self.error(
                    ParseErrorKind::SyntaxError,
                    "built-in constants cannot be reassigned",
                ));
            }

            return Ok(LValue::Name(NameTarget { name, offset }));
        }

        Err(self.error(
            ParseErrorKind::IncompleteExpressionParsing,
            "no lvalue parsing rules matched",
        ))
    }

    fn parse_subscript_target(
        &mut self,
        bracket_offset: usize,
        end_offset: usize,
        offset: usize,
    ) -> Result<LValue, ParseError> {
        let array = self.parse_expression(bracket_offset)?;
        self.expect_offset(
            bracket_offset,
            ParseErrorKind::IncompleteParsing,
            "array reference is incomplete",
        )?;
        self.advance(1);

        let bracket_end_offset = self.find_bracketed(TokenType::CloseBracket, end_offset, false)?;
        let bracket_end_offset = match bracket_end_offset {
            Some(e) if e > bracket_offset && e < end_offset => e,
            _ => {
                return Err(self.error(
                    ParseErrorKind::BracketingError,
                    "array subscript has no close bracket",
                ))
            }
        };

        let colon_offset = self.find_bracketed(TokenType::Colon, bracket_end_offset, false)?;
        if let Some(colon) = colon_offset.filter(|&c| c > bracket_offset && c < bracket_end_offset)
        {
            let start_index = if self.head()?.ty != TokenType::Colon {
                Some(Box::new(self.parse_expression(colon)?))
            } else {
                None
            };
            self.expect_token_type(
                TokenType::Colon,
                ParseErrorKind::IncompleteParsing,
                "left side of slice is incomplete",
            )?;
            self.advance(1);

            let second_colon = self.find_bracketed(TokenType::Colon, bracket_end_offset, false)?;

            let head_type = self.head()?.ty;
            let end_index = if head_type != TokenType::Colon && head_type != TokenType::CloseBracket
            {
                Some(Box::new(
                    self.parse_expression(second_colon.unwrap_or(bracket_end_offset))?,
                ))
            } else {
                None
            };

            let step_size = if self.head()?.ty == TokenType::Colon {
                self.advance(1);
                Some(Box::new(self.parse_expression(bracket_end_offset)?))
            } else {
                None
            };

            self.expect_offset(
                bracket_end_offset,
                ParseErrorKind::IncompleteParsing,
                "right side of slice is incomplete",
            )?;
            self.advance(1);

            Ok(LValue::Slice(SliceTarget {
                array: Box::new(array),
                start_index,
                end_index,
                step_size,
                offset,
            }))
        } else {
            let index = self.parse_expression(bracket_end_offset)?;
            self.expect_offset(
                bracket_end_offset,
                ParseErrorKind::IncompleteParsing,
                "array index is incomplete",
            )?;
            self.advance(1);

            Ok(LValue::Index(IndexTarget {
                array: Box::new(array),
                index: Box::new(index),
                offset,
            }))
        }
    }
}
