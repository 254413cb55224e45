// Tokenizer for Pyrite source.
//
// The raw token layer (raw.rs) is a logos lexer; this layer drives it with
// the indentation and bracket state the language needs: newlines inside
// brackets disappear, newlines at top level are followed by blank-line
// skipping and indent comparison, and a post-processing pass merges the
// composite keywords and normalizes newlines.

use logos::Logos;
use serde::{Deserialize, Serialize};

use pyrite_diagnostics::{CompileError, SourceFile};

pub mod escape;
mod raw;

pub use escape::{escape_bytes, escape_unicode, unescape_bytes, unescape_unicode};

use raw::{RawLexError, RawToken};

/// Closed set of token types. Dynamic/constant tokens carry their payload
/// in the Token's data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    Dynamic,
    BytesConstant,
    UnicodeConstant,
    Integer,
    Float,
    Indent,
    Unindent,
    Comment,
    Del,
    Pass,
    Break,
    Continue,
    Return,
    Raise,
    Import,
    From,
    As,
    Def,
    Global,
    Nonlocal,
    Exec,
    Assert,
    If,
    Else,
    Elif,
    With,
    While,
    For,
    In,
    NotIn,
    Not,
    And,
    Or,
    Try,
    Except,
    Finally,
    Lambda,
    Colon,
    Class,
    Yield,
    Is,
    IsNot,
    At,
    OpenParen,
    CloseParen,
    Newline,
    Equals,
    Comma,
    Asterisk,
    DoubleAsterisk,
    Semicolon,
    PlusEquals,
    MinusEquals,
    AsteriskEquals,
    SlashEquals,
    PercentEquals,
    AmpersandEquals,
    PipeEquals,
    CaretEquals,
    LeftShiftEquals,
    RightShiftEquals,
    DoubleAsteriskEquals,
    DoubleSlashEquals,
    LeftShift,
    RightShift,
    Dot,
    Plus,
    Minus,
    Slash,
    LessThan,
    GreaterThan,
    Equality,
    GreaterOrEqual,
    LessOrEqual,
    NotEqual,
    Pipe,
    Caret,
    Ampersand,
    Percent,
    DoubleSlash,
    Tilde,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Backtick,
}

impl TokenType {
    /// Tokens that open a nesting region for the parser's bracketed scan.
    /// Lambda opens a region closed by a colon; Indent is closed by
    /// Unindent.
    pub fn is_open_bracket(self) -> bool {
        matches!(
            self,
            TokenType::OpenParen
                | TokenType::OpenBrace
                | TokenType::OpenBracket
                | TokenType::Indent
                | TokenType::Lambda
        )
    }

    pub fn is_close_bracket(self) -> bool {
        matches!(
            self,
            TokenType::CloseParen
                | TokenType::CloseBrace
                | TokenType::CloseBracket
                | TokenType::Unindent
                | TokenType::Colon
        )
    }

    /// Closers that are invalid without a matching opener. Colon is exempt:
    /// it closes a lambda but also appears on its own.
    pub fn requires_opener(self) -> bool {
        matches!(
            self,
            TokenType::CloseParen
                | TokenType::CloseBrace
                | TokenType::CloseBracket
                | TokenType::Unindent
        )
    }

    pub fn closing_bracket(self) -> Option<TokenType> {
        match self {
            TokenType::OpenParen => Some(TokenType::CloseParen),
            TokenType::OpenBrace => Some(TokenType::CloseBrace),
            TokenType::OpenBracket => Some(TokenType::CloseBracket),
            TokenType::Indent => Some(TokenType::Unindent),
            TokenType::Lambda => Some(TokenType::Colon),
            _ => None,
        }
    }

    /// Operator tokens, used by the parser to decide whether +/- are unary.
    pub fn is_operator(self) -> bool {
        matches!(
            self,
            TokenType::In
                | TokenType::NotIn
                | TokenType::Not
                | TokenType::And
                | TokenType::Or
                | TokenType::Asterisk
                | TokenType::DoubleAsterisk
                | TokenType::LeftShift
                | TokenType::RightShift
                | TokenType::Dot
                | TokenType::Plus
                | TokenType::Minus
                | TokenType::Slash
                | TokenType::LessThan
                | TokenType::GreaterThan
                | TokenType::Equality
                | TokenType::GreaterOrEqual
                | TokenType::LessOrEqual
                | TokenType::NotEqual
                | TokenType::Is
                | TokenType::IsNot
                | TokenType::Pipe
                | TokenType::Caret
                | TokenType::Ampersand
                | TokenType::Percent
                | TokenType::DoubleSlash
                | TokenType::Tilde
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum TokenData {
    #[default]
    None,
    Ident(String),
    Bytes(Vec<u8>),
    Unicode(String),
    Int(i64),
    Float(f64),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub ty: TokenType,
    pub data: TokenData,
    pub offset: usize,
    pub length: usize,
}

impl Token {
    fn new(ty: TokenType, data: TokenData, offset: usize, length: usize) -> Self {
        Self {
            ty,
            data,
            offset,
            length,
        }
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.data {
            TokenData::Ident(s) => Some(s),
            _ => None,
        }
    }

    pub fn int_value(&self) -> Option<i64> {
        match &self.data {
            TokenData::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn float_value(&self) -> Option<f64> {
        match &self.data {
            TokenData::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Token[{:?}", self.ty)?;
        match &self.data {
            TokenData::None => {}
            TokenData::Ident(s) => write!(f, ", s='{}'", s)?,
            TokenData::Bytes(b) => write!(f, ", b='{}'", escape_bytes(b))?,
            TokenData::Unicode(s) => write!(f, ", u='{}'", escape_unicode(s))?,
            TokenData::Int(i) => write!(f, ", i={}", i)?,
            TokenData::Float(v) => write!(f, ", f={}", v)?,
            TokenData::Comment(s) => write!(f, ", c='{}'", s)?,
        }
        write!(f, ", off={} len={}]", self.offset, self.length)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LexErrorKind {
    UnmatchedParenthesis,
    UnmatchedBrace,
    UnmatchedBracket,
    MisalignedUnindent,
    BadToken,
    UnterminatedString,
    BadScientificNotation,
    NonUtf8Source,
}

impl LexErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            LexErrorKind::UnmatchedParenthesis => "UnmatchedParenthesis",
            LexErrorKind::UnmatchedBrace => "UnmatchedBrace",
            LexErrorKind::UnmatchedBracket => "UnmatchedBracket",
            LexErrorKind::MisalignedUnindent => "MisalignedUnindent",
            LexErrorKind::BadToken => "BadToken",
            LexErrorKind::UnterminatedString => "UnterminatedString",
            LexErrorKind::BadScientificNotation => "BadScientificNotation",
            LexErrorKind::NonUtf8Source => "NonUtf8Source",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("lexing failed: {} at offset {offset} (line {line})", .kind.name())]
pub struct LexError {
    pub kind: LexErrorKind,
    pub offset: usize,
    pub line: usize,
}

impl LexError {
    fn at(kind: LexErrorKind, offset: usize, source: &SourceFile) -> Self {
        let line = source.line_number_of_offset(offset).unwrap_or(source.line_count());
        Self { kind, offset, line }
    }
}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self {
        CompileError::lexing(e.to_string(), e.offset)
    }
}

impl From<RawLexError> for LexErrorKind {
    fn from(e: RawLexError) -> Self {
        match e {
            RawLexError::BadToken => LexErrorKind::BadToken,
            RawLexError::UnterminatedString => LexErrorKind::UnterminatedString,
            RawLexError::BadScientificNotation => LexErrorKind::BadScientificNotation,
        }
    }
}

/// Length of the first line of `s` (including its newline) if that line is
/// blank (spaces only); 0 if it is not blank.
fn blank_line_length(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut indent = 0;
    while indent < bytes.len() && bytes[indent] == b' ' {
        indent += 1;
    }
    if bytes[indent..].starts_with(b"\r\n") {
        return indent + 2;
    }
    if bytes[indent..].starts_with(b"\n") {
        return indent + 1;
    }
    0
}

fn leading_spaces(s: &str) -> usize {
    s.as_bytes().iter().take_while(|&&b| b == b' ').count()
}

fn map_raw(raw: RawToken, offset: usize, length: usize) -> Token {
    let (ty, data) = match raw {
        RawToken::Del => (TokenType::Del, TokenData::None),
        RawToken::Pass => (TokenType::Pass, TokenData::None),
        RawToken::Break => (TokenType::Break, TokenData::None),
        RawToken::Continue => (TokenType::Continue, TokenData::None),
        RawToken::Return => (TokenType::Return, TokenData::None),
        RawToken::Raise => (TokenType::Raise, TokenData::None),
        RawToken::Import => (TokenType::Import, TokenData::None),
        RawToken::From => (TokenType::From, TokenData::None),
        RawToken::As => (TokenType::As, TokenData::None),
        RawToken::Def => (TokenType::Def, TokenData::None),
        RawToken::Global => (TokenType::Global, TokenData::None),
        RawToken::Nonlocal => (TokenType::Nonlocal, TokenData::None),
        RawToken::Exec => (TokenType::Exec, TokenData::None),
        RawToken::Assert => (TokenType::Assert, TokenData::None),
        RawToken::If => (TokenType::If, TokenData::None),
        RawToken::Else => (TokenType::Else, TokenData::None),
        RawToken::Elif => (TokenType::Elif, TokenData::None),
        RawToken::With => (TokenType::With, TokenData::None),
        RawToken::While => (TokenType::While, TokenData::None),
        RawToken::For => (TokenType::For, TokenData::None),
        RawToken::In => (TokenType::In, TokenData::None),
        RawToken::Not => (TokenType::Not, TokenData::None),
        RawToken::And => (TokenType::And, TokenData::None),
        RawToken::Or => (TokenType::Or, TokenData::None),
        RawToken::Try => (TokenType::Try, TokenData::None),
        RawToken::Except => (TokenType::Except, TokenData::None),
        RawToken::Finally => (TokenType::Finally, TokenData::None),
        RawToken::Lambda => (TokenType::Lambda, TokenData::None),
        RawToken::Class => (TokenType::Class, TokenData::None),
        RawToken::Yield => (TokenType::Yield, TokenData::None),
        RawToken::Is => (TokenType::Is, TokenData::None),
        RawToken::BytesLiteral(b) => (TokenType::BytesConstant, TokenData::Bytes(b)),
        RawToken::UnicodeLiteral(s) => (TokenType::UnicodeConstant, TokenData::Unicode(s)),
        RawToken::Integer(i) => (TokenType::Integer, TokenData::Int(i)),
        RawToken::Float(f) => (TokenType::Float, TokenData::Float(f)),
        RawToken::BadExponent => (TokenType::Comment, TokenData::None), // unreachable; errors out in the callback
        RawToken::Comment(s) => (TokenType::Comment, TokenData::Comment(s)),
        RawToken::Dynamic(s) => (TokenType::Dynamic, TokenData::Ident(s)),
        RawToken::BackslashNewline => (TokenType::Newline, TokenData::None), // handled by the caller
        RawToken::Newline => (TokenType::Newline, TokenData::None),
        RawToken::LeftShiftEquals => (TokenType::LeftShiftEquals, TokenData::None),
        RawToken::RightShiftEquals => (TokenType::RightShiftEquals, TokenData::None),
        RawToken::DoubleAsteriskEquals => (TokenType::DoubleAsteriskEquals, TokenData::None),
        RawToken::DoubleSlashEquals => (TokenType::DoubleSlashEquals, TokenData::None),
        RawToken::DoubleSlash => (TokenType::DoubleSlash, TokenData::None),
        RawToken::DoubleAsterisk => (TokenType::DoubleAsterisk, TokenData::None),
        RawToken::LeftShift => (TokenType::LeftShift, TokenData::None),
        RawToken::RightShift => (TokenType::RightShift, TokenData::None),
        RawToken::Equality => (TokenType::Equality, TokenData::None),
        RawToken::GreaterOrEqual => (TokenType::GreaterOrEqual, TokenData::None),
        RawToken::LessOrEqual => (TokenType::LessOrEqual, TokenData::None),
        RawToken::NotEqual => (TokenType::NotEqual, TokenData::None),
        RawToken::PlusEquals => (TokenType::PlusEquals, TokenData::None),
        RawToken::MinusEquals => (TokenType::MinusEquals, TokenData::None),
        RawToken::AsteriskEquals => (TokenType::AsteriskEquals, TokenData::None),
        RawToken::SlashEquals => (TokenType::SlashEquals, TokenData::None),
        RawToken::PercentEquals => (TokenType::PercentEquals, TokenData::None),
        RawToken::AmpersandEquals => (TokenType::AmpersandEquals, TokenData::None),
        RawToken::PipeEquals => (TokenType::PipeEquals, TokenData::None),
        RawToken::CaretEquals => (TokenType::CaretEquals, TokenData::None),
        RawToken::At => (TokenType::At, TokenData::None),
        RawToken::OpenParen => (TokenType::OpenParen, TokenData::None),
        RawToken::CloseParen => (TokenType::CloseParen, TokenData::None),
        RawToken::Colon => (TokenType::Colon, TokenData::None),
        RawToken::LessThan => (TokenType::LessThan, TokenData::None),
        RawToken::GreaterThan => (TokenType::GreaterThan, TokenData::None),
        RawToken::Equals => (TokenType::Equals, TokenData::None),
        RawToken::Comma => (TokenType::Comma, TokenData::None),
        RawToken::Semicolon => (TokenType::Semicolon, TokenData::None),
        RawToken::Dot => (TokenType::Dot, TokenData::None),
        RawToken::Plus => (TokenType::Plus, TokenData::None),
        RawToken::Minus => (TokenType::Minus, TokenData::None),
        RawToken::Asterisk => (TokenType::Asterisk, TokenData::None),
        RawToken::Slash => (TokenType::Slash, TokenData::None),
        RawToken::Pipe => (TokenType::Pipe, TokenData::None),
        RawToken::Caret => (TokenType::Caret, TokenData::None),
        RawToken::Ampersand => (TokenType::Ampersand, TokenData::None),
        RawToken::Percent => (TokenType::Percent, TokenData::None),
        RawToken::Tilde => (TokenType::Tilde, TokenData::None),
        RawToken::OpenBracket => (TokenType::OpenBracket, TokenData::None),
        RawToken::CloseBracket => (TokenType::CloseBracket, TokenData::None),
        RawToken::OpenBrace => (TokenType::OpenBrace, TokenData::None),
        RawToken::CloseBrace => (TokenType::CloseBrace, TokenData::None),
        RawToken::Backtick => (TokenType::Backtick, TokenData::None),
    };
    Token::new(ty, data, offset, length)
}

fn unmatched_error_for(closer: TokenType) -> LexErrorKind {
    match closer {
        TokenType::CloseBracket => LexErrorKind::UnmatchedBracket,
        TokenType::CloseBrace => LexErrorKind::UnmatchedBrace,
        _ => LexErrorKind::UnmatchedParenthesis,
    }
}

/// Tokenize a source file: the full state machine plus post-processing.
pub fn tokenize(source: &SourceFile) -> Result<Vec<Token>, LexError> {
    let text = source
        .text()
        .map_err(|e| LexError::at(LexErrorKind::NonUtf8Source, e.valid_up_to(), source))?;

    let mut tokens: Vec<Token> = Vec::new();
    let mut indent_levels: Vec<usize> = vec![0];
    let mut bracket_stack: Vec<TokenType> = Vec::new(); // expected closers

    let mut lex = RawToken::lexer(text);
    while let Some(result) = lex.next() {
        let span = lex.span();
        let raw = result.map_err(|kind| LexError::at(kind.into(), span.start, source))?;

        match raw {
            // eaten, never emitted
            RawToken::BackslashNewline => {}

            RawToken::OpenParen | RawToken::OpenBracket | RawToken::OpenBrace => {
                let token = map_raw(raw, span.start, span.end - span.start);
                bracket_stack.push(
                    token
                        .ty
                        .closing_bracket()
                        .unwrap_or(TokenType::CloseParen),
                );
                tokens.push(token);
            }

            RawToken::CloseParen | RawToken::CloseBracket | RawToken::CloseBrace => {
                let token = map_raw(raw, span.start, span.end - span.start);
                if bracket_stack.last() != Some(&token.ty) {
                    return Err(LexError::at(
                        unmatched_error_for(token.ty),
                        span.start,
                        source,
                    ));
                }
                bracket_stack.pop();
                tokens.push(token);
            }

            // a newline at bracket depth zero begins indent tracking; inside
            // brackets it disappears
            RawToken::Newline => {
                if !bracket_stack.is_empty() {
                    continue;
                }
                tokens.push(Token::new(
                    TokenType::Newline,
                    TokenData::None,
                    span.start,
                    span.end - span.start,
                ));

                // blank lines are not indent-enforced
                loop {
                    let blank = blank_line_length(lex.remainder());
                    if blank == 0 {
                        break;
                    }
                    lex.bump(blank);
                }

                let rem = lex.remainder();
                let next_indent = leading_spaces(rem);
                let pos = lex.span().end;

                // spaces at end of file close out like a blank line
                if rem.len() == next_indent {
                    lex.bump(next_indent);
                    continue;
                }

                let current = *indent_levels.last().unwrap_or(&0);
                if next_indent > current {
                    indent_levels.push(next_indent);
                    tokens.push(Token::new(TokenType::Indent, TokenData::None, pos, 0));
                } else {
                    while next_indent < *indent_levels.last().unwrap_or(&0) {
                        indent_levels.pop();
                        tokens.push(Token::new(TokenType::Unindent, TokenData::None, pos, 0));
                    }
                }
                if *indent_levels.last().unwrap_or(&0) != next_indent {
                    return Err(LexError::at(LexErrorKind::MisalignedUnindent, pos, source));
                }
                lex.bump(next_indent);
            }

            _ => tokens.push(map_raw(raw, span.start, span.end - span.start)),
        }
    }

    if let Some(closer) = bracket_stack.last() {
        return Err(LexError::at(
            unmatched_error_for(*closer),
            text.len().saturating_sub(1),
            source,
        ));
    }

    postprocess(&mut tokens, text.len(), &mut indent_levels);
    Ok(tokens)
}

fn postprocess(tokens: &mut Vec<Token>, source_len: usize, indent_levels: &mut Vec<usize>) {
    // delete comments
    tokens.retain(|t| t.ty != TokenType::Comment);

    // remove leading newlines
    while tokens.first().map(|t| t.ty) == Some(TokenType::Newline) {
        tokens.remove(0);
    }

    // replace composite tokens, duplicate newlines, and semicolons
    let mut x = 0;
    while x + 1 < tokens.len() {
        if tokens[x].ty == TokenType::Is && tokens[x + 1].ty == TokenType::Not {
            let offset = tokens[x].offset;
            let length = tokens[x + 1].offset + tokens[x + 1].length - offset;
            tokens.remove(x + 1);
            tokens[x] = Token::new(TokenType::IsNot, TokenData::None, offset, length);
        } else if tokens[x].ty == TokenType::Not && tokens[x + 1].ty == TokenType::In {
            let offset = tokens[x].offset;
            let length = tokens[x + 1].offset + tokens[x + 1].length - offset;
            tokens.remove(x + 1);
            tokens[x] = Token::new(TokenType::NotIn, TokenData::None, offset, length);
        } else if tokens[x].ty == TokenType::Semicolon {
            tokens[x].ty = TokenType::Newline;
        } else if tokens[x].ty == TokenType::Newline && tokens[x + 1].ty == TokenType::Newline {
            tokens.remove(x + 1);
        } else {
            x += 1;
        }
    }

    // make sure the stream ends with a newline
    if tokens.last().map(|t| t.ty) != Some(TokenType::Newline) {
        tokens.push(Token::new(TokenType::Newline, TokenData::None, source_len, 0));
    }

    // close any indents that are still open
    while indent_levels.last().copied().unwrap_or(0) > 0 {
        indent_levels.pop();
        tokens.push(Token::new(TokenType::Unindent, TokenData::None, source_len, 0));
    }
}
