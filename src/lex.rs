//! Classify contiguous spans of source text into tokens to simplify parsing.

use crate::context::{Context, PassStep};
use crate::diag::{MessageKind, MessageText};
use crate::source::{Location, Source, SourcePos, SourceSpan};
use std::fmt;

/// Kind of the token matched by the [`Lexer`]
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum TokenType {
    /// `'('`
    OpenParen,
    /// `')'`
    CloseParen,
    /// `'{'`
    OpenBrace,
    /// `'}'`
    CloseBrace,
    /// `'['`
    OpenBracket,
    /// `']'`
    CloseBracket,
    /// An operator run that is exactly `'='`
    Declaration,
    /// `';'`
    SemiColon,
    /// `"-|"`
    PreCond,
    /// `"|-"`
    PostCond,
    /// Reserved, quoted text is always a [`TokenType::StringLiteral`]
    SingleQuote,
    /// Reserved, quoted text is always a [`TokenType::StringLiteral`]
    DoubleQuote,
    /// Reserved, quoted text is always a [`TokenType::StringLiteral`]
    BackQuote,
    /// An operator run that is exactly `'.'`
    Dot,
    /// `','`
    Comma,
    /// Spaces, line breaks and comments
    WhiteSpace,
    /// `[0-9.]+`
    NumberLiteral,
    /// Text between a pair of `'`, `"` or `` ` ``
    StringLiteral,
    /// A run of operator characters
    Operator,
    /// `[_0-9A-Za-z]+`
    Symbol,
    /// Anything else
    Error,
}

impl TokenType {
    fn as_str(self) -> &'static str {
        match self {
            Self::OpenParen => "'('",
            Self::CloseParen => "')'",
            Self::OpenBrace => "'{'",
            Self::CloseBrace => "'}'",
            Self::OpenBracket => "'['",
            Self::CloseBracket => "']'",
            Self::Declaration => "'='",
            Self::SemiColon => "';'",
            Self::PreCond => "'-|'",
            Self::PostCond => "'|-'",
            Self::SingleQuote => "single quote",
            Self::DoubleQuote => "double quote",
            Self::BackQuote => "back quote",
            Self::Dot => "'.'",
            Self::Comma => "','",
            Self::WhiteSpace => "whitespace",
            Self::NumberLiteral => "number literal",
            Self::StringLiteral => "string literal",
            Self::Operator => "operator",
            Self::Symbol => "symbol",
            Self::Error => "invalid character",
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, Self::OpenParen | Self::OpenBrace | Self::OpenBracket)
    }

    pub fn is_close(self) -> bool {
        matches!(
            self,
            Self::CloseParen | Self::CloseBrace | Self::CloseBracket
        )
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub ty: TokenType,
    pub location: Location,
}

pub type Tokens = Vec<Token>;

const WHITE_SPACE: &str = " \t\n\r";
const OPERATOR_CHARS: &str = "-+&#@<>^~∆%•|=÷×°$\\/*:?!.";
const QUOTES: &str = "'\"`";
/// The only quote whose literals may contain raw line breaks.
const MULTILINE_QUOTE: char = '"';

/// Checked in order, before any of the character class rules.
const PUNCTUATION: &[(&str, TokenType)] = &[
    ("(", TokenType::OpenParen),
    (")", TokenType::CloseParen),
    ("{", TokenType::OpenBrace),
    ("}", TokenType::CloseBrace),
    ("[", TokenType::OpenBracket),
    ("]", TokenType::CloseBracket),
    (";", TokenType::SemiColon),
    ("-|", TokenType::PreCond),
    ("|-", TokenType::PostCond),
    (",", TokenType::Comma),
];

type Problem = (MessageKind, MessageText);

/// Scan the context's source into tokens, whitespace included.
///
/// Every byte of the input ends up in exactly one token. Problems are
/// reported to the context's messages.
pub fn lex(ctx: &mut Context) -> Tokens {
    ctx.start_step(PassStep::Lex);
    let file = ctx.source.id;
    let mut tokens = vec![];
    for lexeme in Lexer::new(&ctx.source) {
        let location = Location::new(file, lexeme.span);
        if let Some((kind, text)) = lexeme.problem {
            ctx.messages.report(kind, location, text);
        }
        tokens.push(Token {
            ty: lexeme.ty,
            location,
        });
    }
    tracing::debug!(tokens = tokens.len(), messages = ctx.messages.len(), "lexed");
    tokens
}

/// One scanned token along with the problem found while scanning it, if any.
#[derive(Clone, Debug)]
pub struct Lexeme {
    pub ty: TokenType,
    pub span: SourceSpan,
    pub problem: Option<Problem>,
}

/// State of a lexer
pub struct Lexer<'source> {
    /// Input source
    source: &'source Source,
    /// Start of the next token.
    pos: SourcePos,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self {
            source,
            pos: SourcePos(0),
        }
    }

    fn scan(&mut self) -> (TokenType, Option<Problem>) {
        for &(text, ty) in PUNCTUATION {
            if self.source.starts_with(self.pos, text) {
                self.pos.0 += text.len();
                return (ty, None);
            }
        }
        let Some(c) = self.peek() else {
            return (TokenType::Error, None);
        };
        if QUOTES.contains(c) {
            return self.string_literal(c);
        }
        if self.white_space() {
            return (TokenType::WhiteSpace, None);
        }
        let start = self.pos;
        if self.scan_forward(|c| OPERATOR_CHARS.contains(c)) {
            let ty = match &self.source[SourceSpan::new(start, self.pos)] {
                "=" => TokenType::Declaration,
                "." => TokenType::Dot,
                _ => TokenType::Operator,
            };
            return (ty, None);
        }
        if self.scan_forward(|c| c.is_ascii_digit() || c == '.') {
            return (TokenType::NumberLiteral, None);
        }
        if self.scan_forward(|c| c.is_ascii_alphanumeric() || c == '_') {
            return (TokenType::Symbol, None);
        }
        self.pos.0 += c.len_utf8();
        (
            TokenType::Error,
            Some((MessageKind::Error, MessageText::UnexpectedCharacter)),
        )
    }

    fn string_literal(&mut self, quote: char) -> (TokenType, Option<Problem>) {
        self.pos.0 += quote.len_utf8();
        loop {
            let Some(c) = self.peek() else {
                let problem = (MessageKind::Error, MessageText::UnterminatedString);
                return (TokenType::StringLiteral, Some(problem));
            };
            self.pos.0 += c.len_utf8();
            if c == quote {
                return (TokenType::StringLiteral, None);
            }
            if c == '\n' && quote != MULTILINE_QUOTE {
                let problem = (MessageKind::Warning, MessageText::UnterminatedLine);
                return (TokenType::StringLiteral, Some(problem));
            }
        }
    }

    /// Skip whitespace and comments, returning whether anything was skipped.
    fn white_space(&mut self) -> bool {
        let start = self.pos;
        loop {
            if self.scan_forward(|c| WHITE_SPACE.contains(c)) {
                continue;
            }
            if self.source.starts_with(self.pos, "//") || self.source.starts_with(self.pos, "#")
            {
                self.scan_forward(|c| c != '\n');
                continue;
            }
            if self.source.starts_with(self.pos, "/*") {
                let body = SourcePos(self.pos.0 + 2);
                self.pos = match self.source.text[body.0..].find("*/") {
                    Some(len) => SourcePos(body.0 + len + 2),
                    None => self.source.end(),
                };
                continue;
            }
            break;
        }
        self.pos != start
    }

    /// Return the character (if any) at the current position
    fn peek(&self) -> Option<char> {
        self.source.peek(self.pos)
    }

    /// Advance to the first position that does not match the provided
    /// predicate, returning whether the position moved.
    fn scan_forward(&mut self, while_char: impl Fn(char) -> bool) -> bool {
        let start = self.pos;
        self.pos = self.source.scan_forward(self.pos, while_char);
        self.pos != start
    }
}

impl Iterator for Lexer<'_> {
    type Item = Lexeme;

    fn next(&mut self) -> Option<Lexeme> {
        let start = self.pos;
        if start == self.source.end() {
            return None;
        }
        let (ty, problem) = self.scan();
        if self.pos == start {
            // step over the character so scanning still terminates
            let len = self.source.peek(start).map_or(1, char::len_utf8);
            self.pos.0 += len;
            return Some(Lexeme {
                ty: TokenType::Error,
                span: SourceSpan::new(start, self.pos),
                problem: Some((MessageKind::InternalError, MessageText::EmptyToken)),
            });
        }
        Some(Lexeme {
            ty,
            span: SourceSpan::new(start, self.pos),
            problem,
        })
    }
}

/// Lists tokens one per line, with their position and text.
pub struct TokensWriter<'a> {
    source: &'a Source,
    tokens: &'a [Token],
}

impl<'a> TokensWriter<'a> {
    pub fn new(source: &'a Source, tokens: &'a [Token]) -> Self {
        Self { source, tokens }
    }
}

impl fmt::Display for TokensWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in self.tokens {
            writeln!(
                f,
                "{:?} @ {} {:?}",
                token.ty,
                self.source.line_col(token.location.start),
                &self.source[token.location],
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
fn lex_text(text: &str) -> (Context, Tokens) {
    let mut ctx = Context::new(Source::new("<filename>", text), Default::default());
    let tokens = lex(&mut ctx);
    (ctx, tokens)
}

#[cfg(test)]
fn test(text: &str, expected: &[(TokenType, &str)]) {
    let (ctx, tokens) = lex_text(text);
    let mut actual = vec![];
    let mut last_end = SourcePos(0);
    for token in &tokens {
        assert_eq!(token.location.start, last_end, "gap or overlap");
        assert_ne!(token.location.length, 0, "no progress");
        actual.push((token.ty, &ctx.source[token.location]));
        last_end = token.location.end();
    }
    assert_eq!(last_end, ctx.source.end(), "input not covered");
    assert_eq!(actual, expected);
}

#[cfg(test)]
fn messages(text: &str) -> Vec<(MessageKind, String)> {
    let (ctx, _) = lex_text(text);
    ctx.messages
        .iter()
        .map(|m| (m.kind, m.text.to_string()))
        .collect()
}

#[test]
fn empty() {
    test("", &[]);
    assert!(messages("").is_empty());
}

#[test]
fn white_space_only() {
    test(" ", &[(TokenType::WhiteSpace, " ")]);
}

#[test]
fn number() {
    test("12", &[(TokenType::NumberLiteral, "12")]);
    test("1.25", &[(TokenType::NumberLiteral, "1.25")]);
}

#[test]
fn expression() {
    use TokenType::*;
    test(
        "var * 32",
        &[
            (Symbol, "var"),
            (WhiteSpace, " "),
            (Operator, "*"),
            (WhiteSpace, " "),
            (NumberLiteral, "32"),
        ],
    );
}

#[test]
fn call_with_arguments() {
    use TokenType::*;
    test(
        "32 * var(a, 3)",
        &[
            (NumberLiteral, "32"),
            (WhiteSpace, " "),
            (Operator, "*"),
            (WhiteSpace, " "),
            (Symbol, "var"),
            (OpenParen, "("),
            (Symbol, "a"),
            (Comma, ","),
            (WhiteSpace, " "),
            (NumberLiteral, "3"),
            (CloseParen, ")"),
        ],
    );
}

#[test]
fn declaration_and_dot() {
    use TokenType::*;
    test(
        "a=b.c==d",
        &[
            (Symbol, "a"),
            (Declaration, "="),
            (Symbol, "b"),
            (Dot, "."),
            (Symbol, "c"),
            (Operator, "=="),
            (Symbol, "d"),
        ],
    );
}

#[test]
fn conditions_before_operators() {
    use TokenType::*;
    test(
        "f(x) -| x |- y",
        &[
            (Symbol, "f"),
            (OpenParen, "("),
            (Symbol, "x"),
            (CloseParen, ")"),
            (WhiteSpace, " "),
            (PreCond, "-|"),
            (WhiteSpace, " "),
            (Symbol, "x"),
            (WhiteSpace, " "),
            (PostCond, "|-"),
            (WhiteSpace, " "),
            (Symbol, "y"),
        ],
    );
}

#[test]
fn brackets() {
    use TokenType::*;
    test(
        "{[;]}",
        &[
            (OpenBrace, "{"),
            (OpenBracket, "["),
            (SemiColon, ";"),
            (CloseBracket, "]"),
            (CloseBrace, "}"),
        ],
    );
}

#[test]
fn comments_join_white_space() {
    use TokenType::*;
    test(
        "a // line\n  # hash\n/* block\n */ b",
        &[
            (Symbol, "a"),
            (WhiteSpace, " // line\n  # hash\n/* block\n */ "),
            (Symbol, "b"),
        ],
    );
    test("x /* open", &[(Symbol, "x"), (WhiteSpace, " /* open")]);
}

#[test]
fn string_literal() {
    test("'123abc!'", &[(TokenType::StringLiteral, "'123abc!'")]);
    assert!(messages("'123abc!'").is_empty());
}

#[test]
fn unterminated_string_literal_with_newline() {
    test("'123\n", &[(TokenType::StringLiteral, "'123\n")]);
    assert_eq!(
        messages("'123\n"),
        [(
            MessageKind::Warning,
            "Unterminated string literal (or maybe you wanted a \"multiline string\"?)".to_string()
        )]
    );
}

#[test]
fn string_literal_with_newlines() {
    test(
        "'123\n'foo",
        &[
            (TokenType::StringLiteral, "'123\n"),
            (TokenType::StringLiteral, "'foo"),
        ],
    );
    assert_eq!(
        messages("'123\n'foo"),
        [
            (
                MessageKind::Warning,
                "Unterminated string literal (or maybe you wanted a \"multiline string\"?)"
                    .to_string()
            ),
            (
                MessageKind::Error,
                "Unterminated string literal, found end of file.".to_string()
            ),
        ]
    );
}

#[test]
fn multiline_string_literal() {
    test("\"123\nabc!\"", &[(TokenType::StringLiteral, "\"123\nabc!\"")]);
    assert!(messages("\"123\nabc!\"").is_empty());
}

#[test]
fn back_quote_is_single_line() {
    test("`a\n", &[(TokenType::StringLiteral, "`a\n")]);
    assert_eq!(messages("`a\n").len(), 1);
}

#[test]
fn unexpected_character() {
    use TokenType::*;
    test("a é", &[(Symbol, "a"), (WhiteSpace, " "), (Error, "é")]);
    assert_eq!(
        messages("a é"),
        [(MessageKind::Error, "Unexpected character".to_string())]
    );
}

#[test]
fn unicode_operators() {
    test(
        "a×b",
        &[
            (TokenType::Symbol, "a"),
            (TokenType::Operator, "×"),
            (TokenType::Symbol, "b"),
        ],
    );
}

#[test]
fn writer() {
    let (ctx, tokens) = lex_text("f(1)");
    let output = TokensWriter::new(&ctx.source, &tokens).to_string();
    assert_eq!(
        output,
        "Symbol @ 1:1 \"f\"\nOpenParen @ 1:2 \"(\"\nNumberLiteral @ 1:3 \"1\"\nCloseParen @ 1:4 \")\"\n"
    );
}
