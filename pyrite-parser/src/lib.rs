// Recursive-descent parser for Pyrite source.
//
// The parser runs over the lexer's token stream with an integer cursor and
// an end bound per production; operators are located with a bracketed scan
// (see parser::Parser::find_bracketed_any) rather than precedence tables.

mod parser;

pub use parser::Parser;

use pyrite_diagnostics::CompileError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseErrorKind {
    UnimplementedFeature,
    InvalidIndentationChange,
    InvalidStartingTokenType,
    ExtraDataAfterLine,
    InvalidDynamicList,
    SyntaxError,
    UnexpectedEndOfStream,
    BracketingError,
    IncompleteParsing,
    IncompleteTernaryOperator,
    IncompleteLambdaDefinition,
    IncompleteGeneratorExpression,
    IncompleteExpressionParsing,
    IncompleteDictItem,
    TooManyArguments,
    InvalidAssignment,
}

impl ParseErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ParseErrorKind::UnimplementedFeature => "UnimplementedFeature",
            ParseErrorKind::InvalidIndentationChange => "InvalidIndentationChange",
            ParseErrorKind::InvalidStartingTokenType => "InvalidStartingTokenType",
            ParseErrorKind::ExtraDataAfterLine => "ExtraDataAfterLine",
            ParseErrorKind::InvalidDynamicList => "InvalidDynamicList",
            ParseErrorKind::SyntaxError => "SyntaxError",
            ParseErrorKind::UnexpectedEndOfStream => "UnexpectedEndOfStream",
            ParseErrorKind::BracketingError => "BracketingError",
            ParseErrorKind::IncompleteParsing => "IncompleteParsing",
            ParseErrorKind::IncompleteTernaryOperator => "IncompleteTernaryOperator",
            ParseErrorKind::IncompleteLambdaDefinition => "IncompleteLambdaDefinition",
            ParseErrorKind::IncompleteGeneratorExpression => "IncompleteGeneratorExpression",
            ParseErrorKind::IncompleteExpressionParsing => "IncompleteExpressionParsing",
            ParseErrorKind::IncompleteDictItem => "IncompleteDictItem",
            ParseErrorKind::TooManyArguments => "TooManyArguments",
            ParseErrorKind::InvalidAssignment => "InvalidAssignment",
        }
    }
}

/// Parsing is halt-on-first-error; the error carries the token index, byte
/// offset, and 1-based line number of the failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parsing failed: {} ({explanation}) at token {token_num} (offset {offset}, line {line})", .kind.name())]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub token_num: usize,
    pub offset: usize,
    pub line: usize,
    pub explanation: String,
}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::parse(e.to_string(), e.offset)
    }
}
