use pyrite_diagnostics::SourceFile;
use pyrite_lexer::{tokenize, LexErrorKind, TokenData, TokenType};

fn stream(source: &str) -> Vec<(TokenType, TokenData)> {
    let file = SourceFile::from_code(source);
    tokenize(&file)
        .expect("lexing failed")
        .into_iter()
        .map(|t| (t.ty, t.data))
        .collect()
}

#[test]
fn test_full_program_stream() {
    let source = "\
def fib(n):
    if n < 2:
        return n
    return fib(n - 1) + fib(n - 2)

print(fib(20))
";
    let tokens = stream(source);
    use TokenType as T;
    let types: Vec<TokenType> = tokens.iter().map(|(t, _)| *t).collect();
    assert_eq!(
        types,
        vec![
            T::Def,
            T::Dynamic,
            T::OpenParen,
            T::Dynamic,
            T::CloseParen,
            T::Colon,
            T::Newline,
            T::Indent,
            T::If,
            T::Dynamic,
            T::LessThan,
            T::Integer,
            T::Colon,
            T::Newline,
            T::Indent,
            T::Return,
            T::Dynamic,
            T::Newline,
            T::Unindent,
            T::Return,
            T::Dynamic,
            T::OpenParen,
            T::Dynamic,
            T::Minus,
            T::Integer,
            T::CloseParen,
            T::Plus,
            T::Dynamic,
            T::OpenParen,
            T::Dynamic,
            T::Minus,
            T::Integer,
            T::CloseParen,
            T::Newline,
            T::Unindent,
            T::Dynamic,
            T::OpenParen,
            T::Dynamic,
            T::OpenParen,
            T::Integer,
            T::CloseParen,
            T::CloseParen,
            T::Newline,
        ]
    );
}

#[test]
fn test_whitespace_insertion_is_invisible() {
    // inserting blank lines at line boundaries and trailing spaces on
    // blank lines leaves the token stream identical
    let base = "class A:\n  def m(self):\n    if self:\n      return 1\n    return 0\n";
    let variants = [
        "class A:\n\n  def m(self):\n    if self:\n      return 1\n    return 0\n",
        "class A:\n  def m(self):\n   \n    if self:\n      return 1\n\n    return 0\n",
        "class A:\n  def m(self):\n    if self:\n      return 1\n        \n    return 0\n\n\n",
    ];
    let expected = stream(base);
    for variant in variants {
        assert_eq!(stream(variant), expected, "variant: {:?}", variant);
    }
}

#[test]
fn test_error_positions_carry_lines() {
    let file = SourceFile::from_code("x = 1\ny = $\n");
    let err = tokenize(&file).unwrap_err();
    assert_eq!(err.kind, LexErrorKind::BadToken);
    assert_eq!(err.line, 2);
    assert_eq!(err.offset, 10);
}

#[test]
fn test_string_prefix_matrix() {
    let tokens = stream("a = b'x'\nb = B'x'\nc = u'x'\nd = U'x'\ne = 'x'\nf = \"x\"\n");
    let data: Vec<&TokenData> = tokens
        .iter()
        .filter(|(t, _)| matches!(t, TokenType::BytesConstant | TokenType::UnicodeConstant))
        .map(|(_, d)| d)
        .collect();
    assert_eq!(data.len(), 6);
    assert_eq!(data[0], &TokenData::Bytes(b"x".to_vec()));
    assert_eq!(data[1], &TokenData::Bytes(b"x".to_vec()));
    for datum in &data[2..] {
        assert_eq!(**datum, TokenData::Unicode("x".to_string()));
    }
}

#[test]
fn test_triple_quoted_docstring_spans_lines() {
    let tokens = stream("s = '''line one\nline two'''\n");
    assert_eq!(
        tokens[2].1,
        TokenData::Unicode("line one\nline two".to_string())
    );
    // the newline inside the literal doesn't produce indent tracking
    let types: Vec<TokenType> = tokens.iter().map(|(t, _)| *t).collect();
    assert!(!types.contains(&TokenType::Indent));
}

#[test]
fn test_escape_decoding_through_tokens() {
    let tokens = stream("s = '\\x41\\u0042\\tC'\nb = b'\\101\\x42'\n");
    assert_eq!(tokens[2].1, TokenData::Unicode("AB\tC".to_string()));
    assert_eq!(tokens[6].1, TokenData::Bytes(b"AB".to_vec()));
}

#[test]
fn test_numeric_forms() {
    let tokens = stream("a = 10\nb = 0xFF\nc = 3.25\nd = .5\ne = 1e2\nf = 12L\n");
    let numbers: Vec<&TokenData> = tokens
        .iter()
        .filter(|(t, _)| matches!(t, TokenType::Integer | TokenType::Float))
        .map(|(_, d)| d)
        .collect();
    assert_eq!(
        numbers,
        vec![
            &TokenData::Int(10),
            &TokenData::Int(255),
            &TokenData::Float(3.25),
            &TokenData::Float(0.5),
            &TokenData::Float(100.0),
            &TokenData::Int(12),
        ]
    );
}

#[test]
fn test_bracket_errors_by_kind() {
    let check = |source: &str, kind: LexErrorKind| {
        let file = SourceFile::from_code(source);
        assert_eq!(tokenize(&file).unwrap_err().kind, kind, "source: {:?}", source);
    };
    check("a = (1]\n", LexErrorKind::UnmatchedBracket);
    check("a = [1)\n", LexErrorKind::UnmatchedParenthesis);
    check("a = {1]\n", LexErrorKind::UnmatchedBracket);
    check("a = (((1))\n", LexErrorKind::UnmatchedParenthesis);
}
