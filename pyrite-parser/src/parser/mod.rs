// Parser core: token cursor, bracketed scanning, and suite parsing.
//
// Sub-modules hold the expression grammar, statement grammar, and argument
// list parsing.

use crate::{ParseError, ParseErrorKind};
use pyrite_ast::*;
use pyrite_diagnostics::SourceFile;
use pyrite_lexer::{Token, TokenType};

mod arguments;
mod expressions;
mod statements;

pub struct Parser<'a> {
    pub(crate) tokens: &'a [Token],
    pub(crate) source: &'a SourceFile,
    pub(crate) token_num: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a SourceFile, tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            source,
            token_num: 0,
        }
    }

    /// Parse a whole module. The entire token stream must be consumed.
    pub fn parse_module(&mut self) -> Result<Module, ParseError> {
        let items = self.parse_compound_statement_suite(self.tokens.len())?;
        self.expect_condition(
            self.token_num == self.tokens.len(),
            ParseErrorKind::IncompleteParsing,
            "module parsing did not consume every token",
        )?;
        Ok(Module { items, offset: 0 })
    }

    // ==================== Cursor helpers ====================

    pub(crate) fn head(&self) -> Result<&'a Token, ParseError> {
        self.tokens
            .get(self.token_num)
            .ok_or_else(|| self.error_at_end(ParseErrorKind::UnexpectedEndOfStream, "no more tokens"))
    }

    pub(crate) fn head_type(&self) -> Result<TokenType, ParseError> {
        Ok(self.head()?.ty)
    }

    pub(crate) fn token_at(&self, offset: usize) -> Result<&'a Token, ParseError> {
        self.tokens
            .get(offset)
            .ok_or_else(|| self.error_at_end(ParseErrorKind::UnexpectedEndOfStream, "no more tokens"))
    }

    pub(crate) fn advance(&mut self, count: usize) {
        self.token_num += count;
    }

    /// Byte offset of the token under the cursor (end of source at EOF).
    pub(crate) fn head_offset(&self) -> usize {
        self.tokens
            .get(self.token_num)
            .map(|t| t.offset)
            .unwrap_or_else(|| self.source.size())
    }

    // ==================== Errors ====================

    pub(crate) fn error(&self, kind: ParseErrorKind, explanation: impl Into<String>) -> ParseError {
        let offset = self.head_offset();
        let line = self
            .source
            .line_number_of_offset(offset)
            .unwrap_or(self.source.line_count());
        ParseError {
            kind,
            token_num: self.token_num,
            offset,
            line,
            explanation: explanation.into(),
        }
    }

    fn error_at_end(&self, kind: ParseErrorKind, explanation: impl Into<String>) -> ParseError {
        ParseError {
            kind,
            token_num: self.token_num,
            offset: self.source.size(),
            line: self.source.line_count(),
            explanation: explanation.into(),
        }
    }

    pub(crate) fn expect_condition(
        &self,
        condition: bool,
        kind: ParseErrorKind,
        explanation: &str,
    ) -> Result<(), ParseError> {
        if condition {
            Ok(())
        } else {
            Err(self.error(kind, explanation))
        }
    }

    pub(crate) fn expect_token_type(
        &self,
        ty: TokenType,
        kind: ParseErrorKind,
        explanation: &str,
    ) -> Result<(), ParseError> {
        self.expect_condition(self.head()?.ty == ty, kind, explanation)
    }

    pub(crate) fn expect_offset(
        &self,
        offset: usize,
        kind: ParseErrorKind,
        explanation: &str,
    ) -> Result<(), ParseError> {
        self.expect_condition(self.token_num == offset, kind, explanation)
    }

    // ==================== Bracketed scanning ====================

    /// Scan from the cursor to end_offset for the first (or last) position
    /// where one of the given token types appears at top nesting level.
    /// Every token participates in nesting bookkeeping, including matched
    /// ones: an open bracket (or lambda, or indent) pushes its closer, a
    /// closer pops it, and a closer with no opener is a bracketing error.
    ///
    /// Returns (position, index into `types`).
    pub(crate) fn find_bracketed_any(
        &self,
        types: &[TokenType],
        end_offset: usize,
        find_last: bool,
    ) -> Result<Option<(usize, usize)>, ParseError> {
        let mut found: Option<(usize, usize)> = None;
        let mut open_stack: Vec<TokenType> = Vec::new();

        for offset in self.token_num..end_offset.min(self.tokens.len()) {
            let ty = self.tokens[offset].ty;

            if open_stack.is_empty() {
                if let Some(index) = types.iter().position(|&t| t == ty) {
                    if !find_last {
                        return Ok(Some((offset, index)));
                    }
                    found = Some((offset, index));
                }
            }

            if open_stack.last() == Some(&ty) {
                open_stack.pop();
            } else if ty.is_open_bracket() {
                if let Some(closer) = ty.closing_bracket() {
                    open_stack.push(closer);
                }
            } else if ty.requires_opener() {
                return Err(self.error(
                    ParseErrorKind::BracketingError,
                    "found a closing token with no matching open token",
                ));
            }
        }

        Ok(found)
    }

    pub(crate) fn find_bracketed(
        &self,
        ty: TokenType,
        end_offset: usize,
        find_last: bool,
    ) -> Result<Option<usize>, ParseError> {
        Ok(self
            .find_bracketed_any(&[ty], end_offset, find_last)?
            .map(|(offset, _)| offset))
    }

    // ==================== Suites ====================

    /// Parse the suite after a compound-statement head: either an indented
    /// block (colon, newline, indent ... unindent) or the tail of an inline
    /// colon line.
    pub(crate) fn parse_suite_from_colon(
        &mut self,
        end_offset: usize,
    ) -> Result<Vec<Stmt>, ParseError> {
        self.expect_token_type(
            TokenType::Colon,
            ParseErrorKind::SyntaxError,
            "expected : before suite",
        )?;
        self.advance(1);

        if self.head()?.ty == TokenType::Newline {
            self.advance(1);
            self.expect_token_type(
                TokenType::Indent,
                ParseErrorKind::SyntaxError,
                "expected indentation after :",
            )?;
            self.advance(1);

            let suite_end_offset = self
                .find_bracketed(TokenType::Unindent, end_offset, false)?
                .ok_or_else(|| {
                    self.error(ParseErrorKind::BracketingError, "suite has no unindent")
                })?;
            let ret = self.parse_compound_statement_suite(suite_end_offset)?;
            self.expect_offset(
                suite_end_offset,
                ParseErrorKind::IncompleteParsing,
                "compound statement is incomplete",
            )?;

            self.expect_token_type(
                TokenType::Unindent,
                ParseErrorKind::SyntaxError,
                "expected unindentation after suite",
            )?;
            self.advance(1);
            Ok(ret)
        } else {
            let suite_end_offset = self
                .find_bracketed(TokenType::Newline, end_offset, false)?
                .ok_or_else(|| {
                    self.error(ParseErrorKind::BracketingError, "inline suite has no newline")
                })?;
            let ret = self.parse_compound_statement_suite(suite_end_offset + 1)?;
            self.expect_offset(
                suite_end_offset + 1,
                ParseErrorKind::IncompleteParsing,
                "inline compound statement is incomplete",
            )?;
            Ok(ret)
        }
    }
}
