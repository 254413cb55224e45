// Argument list parsing for definitions and call sites.

use super::Parser;
use crate::{ParseError, ParseErrorKind};
use pyrite_ast::*;
use pyrite_lexer::TokenType;

impl<'a> Parser<'a> {
    /// Comma-separated name list (for `global`).
    pub(crate) fn parse_dynamic_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut result = Vec::new();
        self.expect_token_type(
            TokenType::Dynamic,
            ParseErrorKind::InvalidDynamicList,
            "expected a name",
        )?;
        while self.head()?.ty == TokenType::Dynamic {
            result.push(self.head()?.ident().unwrap_or_default().to_string());
            self.advance(1);
            if self.head()?.ty == TokenType::Comma {
                self.advance(1);
            }
        }
        Ok(result)
    }

    /// Definition-side argument list: `name[=default]`, `*args`, `**kwargs`.
    pub(crate) fn parse_function_argument_definition(
        &mut self,
        end_offset: usize,
    ) -> Result<FunctionArguments, ParseError> {
        let mut ret = FunctionArguments::default();
        while self.token_num < end_offset {
            let comma_offset = self
                .find_bracketed(TokenType::Comma, end_offset, false)?
                .unwrap_or(end_offset);
            let offset = self.head_offset();

            let head_type = self.head()?.ty;
            if head_type == TokenType::Asterisk || head_type == TokenType::DoubleAsterisk {
                self.advance(1);
                self.expect_token_type(
                    TokenType::Dynamic,
                    ParseErrorKind::SyntaxError,
                    "expected name for args/kwargs variable",
                )?;
                let name = self.head()?.ident().unwrap_or_default().to_string();
                self.advance(1);
                if head_type == TokenType::Asterisk {
                    ret.varargs_name = Some(name);
                } else {
                    ret.varkwargs_name = Some(name);
                }
            } else {
                self.expect_token_type(
                    TokenType::Dynamic,
                    ParseErrorKind::SyntaxError,
                    "expected argument name",
                )?;
                let name = self.head()?.ident().unwrap_or_default().to_string();
                self.advance(1);

                let default_value = if self.head()?.ty == TokenType::Equals {
                    self.advance(1);
                    Some(self.parse_expression(comma_offset)?)
                } else {
                    None
                };
                ret.args.push(ArgumentDefinition {
                    name,
                    default_value,
                    offset,
                });
            }

            if comma_offset < end_offset {
                self.expect_token_type(
                    TokenType::Comma,
                    ParseErrorKind::IncompleteParsing,
                    "function argument is incomplete",
                )?;
                self.advance(1);
            }
        }
        Ok(ret)
    }

    /// Call-side argument list. A positional argument may not follow a
    /// keyword argument; the `=` of a keyword argument must immediately
    /// follow the name.
    #[allow(clippy::type_complexity)]
    pub(crate) fn parse_function_call_arguments(
        &mut self,
        end_offset: usize,
    ) -> Result<
        (
            Vec<Expr>,
            Vec<(String, Expr)>,
            Option<Box<Expr>>,
            Option<Box<Expr>>,
        ),
        ParseError,
    > {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();
        let mut varargs = None;
        let mut varkwargs = None;

        while self.token_num < end_offset {
            let comma_offset = self
                .find_bracketed(TokenType::Comma, end_offset, false)?
                .unwrap_or(end_offset);

            let head_type = self.head()?.ty;
            let star_mode = match head_type {
                TokenType::Asterisk => {
                    self.advance(1);
                    Some(false)
                }
                TokenType::DoubleAsterisk => {
                    self.advance(1);
                    Some(true)
                }
                _ => None,
            };

            // a top-level = makes it a keyword argument
            let mut keyword_name = None;
            if let Some(equals_offset) = self.find_bracketed(TokenType::Equals, comma_offset, false)?
            {
                self.expect_condition(
                    star_mode.is_none() && equals_offset == self.token_num + 1,
                    ParseErrorKind::SyntaxError,
                    "found =, but not immediately following name",
                )?;
                self.expect_token_type(
                    TokenType::Dynamic,
                    ParseErrorKind::SyntaxError,
                    "expected name for keyword argument",
                )?;
                keyword_name = Some(self.head()?.ident().unwrap_or_default().to_string());
                self.advance(1);
                self.expect_token_type(
                    TokenType::Equals,
                    ParseErrorKind::SyntaxError,
                    "expected = immediately following keyword argument name",
                )?;
                self.advance(1);
            }

            let value = self.parse_expression(comma_offset)?;

            match (star_mode, keyword_name) {
                (Some(false), _) => varargs = Some(Box::new(value)),
                (Some(true), _) => varkwargs = Some(Box::new(value)),
                (None, Some(name)) => kwargs.push((name, value)),
                (None, None) => {
                    self.expect_condition(
                        kwargs.is_empty(),
                        ParseErrorKind::SyntaxError,
                        "positional argument follows keyword argument",
                    )?;
                    args.push(value);
                }
            }

            if comma_offset < end_offset {
                self.expect_token_type(
                    TokenType::Comma,
                    ParseErrorKind::IncompleteParsing,
                    "function call argument is incomplete",
                )?;
                self.advance(1);
            }
        }

        Ok((args, kwargs, varargs, varkwargs))
    }
}
