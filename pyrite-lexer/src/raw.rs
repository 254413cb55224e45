// Raw token layer.
//
// logos matches keywords, operators, identifiers, numbers, and the openers
// of strings and comments; callbacks scan the rest of multi-character
// literals by hand so unterminated strings and malformed escapes surface as
// precise errors. Indentation and bracket state live in the layer above
// (lib.rs), which drives this lexer and consumes blank lines and leading
// spaces itself.

use logos::Logos;

use crate::escape::{unescape_bytes, unescape_unicode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawLexError {
    #[default]
    BadToken,
    UnterminatedString,
    BadScientificNotation,
}

/// Scan past the matched 3-quote opener to the matching closer. The closer
/// may not be preceded by a backslash.
fn triple_rest(lex: &mut logos::Lexer<RawToken>) -> Result<String, RawLexError> {
    let slice = lex.slice().as_bytes();
    let quote = slice[slice.len() - 1];
    let closer = [quote, quote, quote];
    let rem = lex.remainder();
    let bytes = rem.as_bytes();
    let mut x = 0;
    loop {
        if x + 3 > bytes.len() {
            return Err(RawLexError::UnterminatedString);
        }
        if bytes[x..x + 3] == closer && (x == 0 || bytes[x - 1] != b'\\') {
            break;
        }
        x += 1;
    }
    let contents = rem[..x].to_string();
    lex.bump(x + 3);
    Ok(contents)
}

/// Scan past the matched single-quote opener to the matching closer. The
/// literal may span newlines; only end-of-file makes it unterminated.
fn single_rest(lex: &mut logos::Lexer<RawToken>) -> Result<String, RawLexError> {
    let slice = lex.slice().as_bytes();
    let quote = slice[slice.len() - 1];
    let rem = lex.remainder();
    let bytes = rem.as_bytes();
    let mut x = 0;
    loop {
        if x >= bytes.len() {
            return Err(RawLexError::UnterminatedString);
        }
        if bytes[x] == quote && (x == 0 || bytes[x - 1] != b'\\') {
            break;
        }
        x += 1;
    }
    let contents = rem[..x].to_string();
    lex.bump(x + 1);
    Ok(contents)
}

fn bytes_literal(lex: &mut logos::Lexer<RawToken>, triple: bool) -> Result<Vec<u8>, RawLexError> {
    let raw = if triple {
        triple_rest(lex)?
    } else {
        single_rest(lex)?
    };
    unescape_bytes(raw.as_bytes()).map_err(|_| RawLexError::BadToken)
}

fn unicode_literal(lex: &mut logos::Lexer<RawToken>, triple: bool) -> Result<String, RawLexError> {
    let raw = if triple {
        triple_rest(lex)?
    } else {
        single_rest(lex)?
    };
    unescape_unicode(&raw).map_err(|_| RawLexError::BadToken)
}

/// Everything up to the next newline not preceded by a backslash. The
/// newline itself is left for the newline rule.
fn comment_rest(lex: &mut logos::Lexer<RawToken>) -> String {
    let rem = lex.remainder();
    let bytes = rem.as_bytes();
    let mut x = 0;
    while x < bytes.len() {
        if bytes[x] == b'\n' && (x == 0 || bytes[x - 1] != b'\\') {
            break;
        }
        x += 1;
    }
    let contents = rem[..x].to_string();
    lex.bump(x);
    contents
}

fn parse_decimal_int(lex: &mut logos::Lexer<RawToken>) -> i64 {
    // wrap at 64 bits rather than fail on huge literals
    let mut value: i64 = 0;
    for ch in lex.slice().bytes() {
        if ch == b'L' {
            break;
        }
        value = value.wrapping_mul(10).wrapping_add((ch - b'0') as i64);
    }
    value
}

fn parse_hex_int(lex: &mut logos::Lexer<RawToken>) -> i64 {
    let mut value: i64 = 0;
    for ch in lex.slice().bytes().skip(2) {
        let digit = match ch {
            b'0'..=b'9' => (ch - b'0') as i64,
            b'a'..=b'f' => (ch - b'a') as i64 + 10,
            b'A'..=b'F' => (ch - b'A') as i64 + 10,
            _ => break,
        };
        value = (value << 4) | digit;
    }
    value
}

fn parse_float(lex: &mut logos::Lexer<RawToken>) -> Result<f64, RawLexError> {
    // forms like "1.e5" need a digit restored before the exponent
    let slice = lex.slice().replace(".e", ".0e").replace(".E", ".0E");
    slice.parse().map_err(|_| RawLexError::BadToken)
}

fn bad_exponent(_lex: &mut logos::Lexer<RawToken>) -> Result<(), RawLexError> {
    Err(RawLexError::BadScientificNotation)
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r" +")]
#[logos(error = RawLexError)]
pub enum RawToken {
    // Keywords
    #[token("del")]
    Del,
    #[token("pass")]
    Pass,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("return")]
    Return,
    #[token("raise")]
    Raise,
    #[token("import")]
    Import,
    #[token("from")]
    From,
    #[token("as")]
    As,
    #[token("def")]
    Def,
    #[token("global")]
    Global,
    #[token("nonlocal")]
    Nonlocal,
    #[token("exec")]
    Exec,
    #[token("assert")]
    Assert,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("elif")]
    Elif,
    #[token("with")]
    With,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("not")]
    Not,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("try")]
    Try,
    #[token("except")]
    Except,
    #[token("finally")]
    Finally,
    #[token("lambda")]
    Lambda,
    #[token("class")]
    Class,
    #[token("yield")]
    Yield,
    #[token("is")]
    Is,

    // Literals
    #[regex("[bB]'''", |lex| bytes_literal(lex, true))]
    #[regex("[bB]\"\"\"", |lex| bytes_literal(lex, true))]
    #[regex("[bB]'", |lex| bytes_literal(lex, false))]
    #[regex("[bB]\"", |lex| bytes_literal(lex, false))]
    BytesLiteral(Vec<u8>),

    #[regex("[uU]?'''", |lex| unicode_literal(lex, true))]
    #[regex("[uU]?\"\"\"", |lex| unicode_literal(lex, true))]
    #[regex("[uU]'", |lex| unicode_literal(lex, false))]
    #[regex("[uU]\"", |lex| unicode_literal(lex, false))]
    #[regex("'", |lex| unicode_literal(lex, false))]
    #[regex("\"", |lex| unicode_literal(lex, false))]
    UnicodeLiteral(String),

    #[regex(r"0[xX][0-9a-fA-F]+", parse_hex_int)]
    #[regex(r"[0-9]+L?", parse_decimal_int)]
    Integer(i64),

    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", parse_float)]
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", parse_float)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", parse_float)]
    Float(f64),

    // an exponent marker with no digits after it
    #[regex(r"([0-9]+\.?[0-9]*|\.[0-9]+)[eE][+-]?", bad_exponent)]
    BadExponent,

    #[token("#", comment_rest)]
    Comment(String),

    // Identifiers (keywords take precedence at equal length)
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Dynamic(String),

    // Line structure
    #[token("\\\r\n")]
    #[token("\\\n")]
    BackslashNewline,
    #[token("\r\n")]
    #[token("\n")]
    Newline,

    // Operators and punctuation
    #[token("<<=")]
    LeftShiftEquals,
    #[token(">>=")]
    RightShiftEquals,
    #[token("**=")]
    DoubleAsteriskEquals,
    #[token("//=")]
    DoubleSlashEquals,
    #[token("//")]
    DoubleSlash,
    #[token("**")]
    DoubleAsterisk,
    #[token("<<")]
    LeftShift,
    #[token(">>")]
    RightShift,
    #[token("==")]
    Equality,
    #[token(">=")]
    GreaterOrEqual,
    #[token("<=")]
    LessOrEqual,
    #[token("!=")]
    #[token("<>")]
    NotEqual,
    #[token("+=")]
    PlusEquals,
    #[token("-=")]
    MinusEquals,
    #[token("*=")]
    AsteriskEquals,
    #[token("/=")]
    SlashEquals,
    #[token("%=")]
    PercentEquals,
    #[token("&=")]
    AmpersandEquals,
    #[token("|=")]
    PipeEquals,
    #[token("^=")]
    CaretEquals,
    #[token("@")]
    At,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token(":")]
    Colon,
    #[token("<")]
    LessThan,
    #[token(">")]
    GreaterThan,
    #[token("=")]
    Equals,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Asterisk,
    #[token("/")]
    Slash,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("&")]
    Ampersand,
    #[token("%")]
    Percent,
    #[token("~")]
    Tilde,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token("`")]
    Backtick,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<RawToken> {
        RawToken::lexer(source).map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            lex_all("def foo"),
            vec![RawToken::Def, RawToken::Dynamic("foo".to_string())]
        );
        // a keyword prefix does not hijack a longer identifier
        assert_eq!(lex_all("deli"), vec![RawToken::Dynamic("deli".to_string())]);
        assert_eq!(lex_all("_x1"), vec![RawToken::Dynamic("_x1".to_string())]);
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            lex_all("'abc'"),
            vec![RawToken::UnicodeLiteral("abc".to_string())]
        );
        assert_eq!(
            lex_all("b'a\\nb'"),
            vec![RawToken::BytesLiteral(b"a\nb".to_vec())]
        );
        assert_eq!(
            lex_all("'''two\nlines'''"),
            vec![RawToken::UnicodeLiteral("two\nlines".to_string())]
        );
        assert_eq!(
            lex_all("u\"x\""),
            vec![RawToken::UnicodeLiteral("x".to_string())]
        );
        assert_eq!(
            lex_all("B\"\"\"q\"\"\""),
            vec![RawToken::BytesLiteral(b"q".to_vec())]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = RawToken::lexer("'oops");
        assert_eq!(lexer.next(), Some(Err(RawLexError::UnterminatedString)));
    }

    #[test]
    fn test_escaped_closer() {
        assert_eq!(
            lex_all("'a\\'b'"),
            vec![RawToken::UnicodeLiteral("a'b".to_string())]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex_all("42"), vec![RawToken::Integer(42)]);
        assert_eq!(lex_all("42L"), vec![RawToken::Integer(42)]);
        assert_eq!(lex_all("0x1F"), vec![RawToken::Integer(31)]);
        assert_eq!(lex_all("3.5"), vec![RawToken::Float(3.5)]);
        assert_eq!(lex_all(".5"), vec![RawToken::Float(0.5)]);
        assert_eq!(lex_all("1e3"), vec![RawToken::Float(1000.0)]);
        assert_eq!(lex_all("2.5e-1"), vec![RawToken::Float(0.25)]);
    }

    #[test]
    fn test_bad_scientific_notation() {
        let mut lexer = RawToken::lexer("1e+");
        assert_eq!(lexer.next(), Some(Err(RawLexError::BadScientificNotation)));
    }

    #[test]
    fn test_comment_stops_at_newline() {
        let mut lexer = RawToken::lexer("# hi\nx");
        assert_eq!(lexer.next(), Some(Ok(RawToken::Comment(" hi".to_string()))));
        assert_eq!(lexer.next(), Some(Ok(RawToken::Newline)));
        assert_eq!(
            lexer.next(),
            Some(Ok(RawToken::Dynamic("x".to_string())))
        );
    }

    #[test]
    fn test_comment_continuation() {
        let mut lexer = RawToken::lexer("# a\\\nb\nx");
        assert_eq!(
            lexer.next(),
            Some(Ok(RawToken::Comment(" a\\\nb".to_string())))
        );
        assert_eq!(lexer.next(), Some(Ok(RawToken::Newline)));
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            lex_all("<<= << < <= <>"),
            vec![
                RawToken::LeftShiftEquals,
                RawToken::LeftShift,
                RawToken::LessThan,
                RawToken::LessOrEqual,
                RawToken::NotEqual,
            ]
        );
        assert_eq!(
            lex_all("**= ** * *="),
            vec![
                RawToken::DoubleAsteriskEquals,
                RawToken::DoubleAsterisk,
                RawToken::Asterisk,
                RawToken::AsteriskEquals,
            ]
        );
    }

    #[test]
    fn test_bad_token() {
        let mut lexer = RawToken::lexer("$");
        assert_eq!(lexer.next(), Some(Err(RawLexError::BadToken)));
    }
}
