use crate::context::PassStep;
use crate::lex::TokenType;
use crate::source::{Location, Source, SourcePos, SourceSpan};
use colorful::{Color, Colorful};
use std::fmt;

/// Ordered diagnostic log of one compilation context.
///
/// Passes only ever append; the driver drains the log with [`Messages::take`]
/// between runs.
#[derive(Clone, Debug, Default)]
pub struct Messages {
    messages: Vec<Message>,
}

impl Messages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn internal_error(&mut self, location: Location, text: MessageText) {
        self.report(MessageKind::InternalError, location, text)
    }

    pub fn error(&mut self, location: Location, text: MessageText) {
        self.report(MessageKind::Error, location, text)
    }

    pub fn warning(&mut self, location: Location, text: MessageText) {
        self.report(MessageKind::Warning, location, text)
    }

    pub fn report(&mut self, kind: MessageKind, location: Location, text: MessageText) {
        tracing::trace!(%kind, %text, start = location.start.0, "message");
        self.messages.push(Message {
            kind,
            location,
            text,
        });
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Number of messages that block further processing.
    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|m| m.kind.is_error()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.kind.is_error())
    }

    /// Copy the log out and clear it.
    pub fn take(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }
}

impl std::ops::Index<usize> for Messages {
    type Output = Message;

    fn index(&self, index: usize) -> &Self::Output {
        &self.messages[index]
    }
}

impl<'a> IntoIterator for &'a Messages {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    pub kind: MessageKind,
    pub location: Location,
    pub text: MessageText,
}

#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq)]
pub enum MessageKind {
    Warning,
    Error,
    /// A defect in the compiler rather than in its input.
    InternalError,
}

impl MessageKind {
    pub fn is_error(self) -> bool {
        self >= Self::Error
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::InternalError => "internal error",
        }
    }

    fn color(self) -> Color {
        match self {
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
            Self::InternalError => Color::Magenta,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MessageText {
    // Lexer
    /// `"Unexpected character"`
    UnexpectedCharacter,
    /// `"Unterminated string literal, found end of file."`
    UnterminatedString,
    /// `"Unterminated string literal (or maybe you wanted a "multiline string"?)"`
    UnterminatedLine,
    /// `"Illegal empty token"`
    EmptyToken,

    // Tree builder
    /// `"Expected a value, found {found}"`, `None` meaning end of input
    ExpectedValue { found: Option<TokenType> },
    /// `"Unclosed {open}"`
    Unclosed { open: TokenType },
    /// `"Expected {expected}, found {found}"`
    Mismatched {
        expected: TokenType,
        found: TokenType,
    },
    /// `"Expected ',' or {close}, found {found}"`
    ExpectedSeparator { close: TokenType, found: TokenType },
    /// `"Unexpected {found} after the end of the expression"`
    TrailingInput { found: TokenType },
    /// `"Unmatched {close}"`
    Unmatched { close: TokenType },
    /// `"Expected a definition"`
    ExpectedDefinition,
    /// `"Expression nesting is too deep (maximum {max} levels)"`
    NestingTooDeep { max: usize },

    // Parser
    /// `"Expected a parameter name"`
    ExpectedParameter,
    /// `"Duplicate argument '{name}'"`
    DuplicateArgument { name: String },
    /// `"Duplicate parameter '{name}'"`
    DuplicateParameter { name: String },
    /// `"Expected a module"`
    ExpectedModule,
    /// `"Malformed {node} node with {children} children"`
    MalformedNode { node: TokenType, children: usize },

    // Driver
    /// `"Pass step regressed from {from} to {to}"`
    StepRegressed { from: PassStep, to: PassStep },
    /// `"Evaluation failed: {reason}"`
    EvalFailed { reason: String },
}

impl fmt::Display for MessageText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Lexer
            Self::UnexpectedCharacter => write!(f, "Unexpected character"),
            Self::UnterminatedString => {
                write!(f, "Unterminated string literal, found end of file.")
            }
            Self::UnterminatedLine => write!(
                f,
                "Unterminated string literal (or maybe you wanted a \"multiline string\"?)"
            ),
            Self::EmptyToken => write!(f, "Illegal empty token"),

            // Tree builder
            Self::ExpectedValue { found: Some(found) } => {
                write!(f, "Expected a value, found {found}")
            }
            Self::ExpectedValue { found: None } => {
                write!(f, "Expected a value, found end of input")
            }
            Self::Unclosed { open } => write!(f, "Unclosed {open}"),
            Self::Mismatched { expected, found } => {
                write!(f, "Expected {expected}, found {found}")
            }
            Self::ExpectedSeparator { close, found } => {
                write!(f, "Expected ',' or {close}, found {found}")
            }
            Self::TrailingInput { found } => {
                write!(f, "Unexpected {found} after the end of the expression")
            }
            Self::Unmatched { close } => write!(f, "Unmatched {close}"),
            Self::ExpectedDefinition => write!(f, "Expected a definition"),
            Self::NestingTooDeep { max } => {
                write!(f, "Expression nesting is too deep (maximum {max} levels)")
            }

            // Parser
            Self::ExpectedParameter => write!(f, "Expected a parameter name"),
            Self::DuplicateArgument { name } => write!(f, "Duplicate argument '{name}'"),
            Self::DuplicateParameter { name } => write!(f, "Duplicate parameter '{name}'"),
            Self::ExpectedModule => write!(f, "Expected a module"),
            Self::MalformedNode { node, children } => {
                write!(f, "Malformed {node} node with {children} children")
            }

            // Driver
            Self::StepRegressed { from, to } => {
                write!(f, "Pass step regressed from {from} to {to}")
            }
            Self::EvalFailed { reason } => write!(f, "Evaluation failed: {reason}"),
        }
    }
}

/// Renders messages against their source: a `file:line:column` header, the
/// offending line and a caret underline.
pub struct ReportFormatter<'a> {
    write: &'a mut dyn fmt::Write,
    source: &'a Source,
    color: bool,
}

impl<'a> ReportFormatter<'a> {
    pub fn new(write: &'a mut dyn fmt::Write, source: &'a Source) -> Self {
        Self {
            write,
            source,
            color: false,
        }
    }

    pub fn with_color(self, color: bool) -> Self {
        Self { color, ..self }
    }
}

impl ReportFormatter<'_> {
    pub fn write(&mut self, message: &Message) -> fmt::Result {
        let location = message.location;
        let start_loc = self.source.line_col(location.start);
        write!(
            self.write,
            "{filename}:{start_loc}: ",
            filename = self.source.name
        )?;
        if self.color {
            let kind = message.kind.as_str().color(message.kind.color()).bold();
            write!(self.write, "{kind}")?;
        } else {
            write!(self.write, "{}", message.kind)?;
        }
        writeln!(self.write, ": {}", message.text)?;

        // a span ending in a line break is shown on the line it breaks
        let mut end = location.end();
        if location.length > 0 && self.source[location].ends_with('\n') {
            end = SourcePos(end.0 - 1);
        }

        let start_line_span = self.source.line_span(location.start);
        self.line(start_loc.line, start_line_span)?;
        // squiggle
        write!(self.write, "     | ")?;
        for _ in 1..start_loc.column {
            self.write.write_char(' ')?
        }
        if start_line_span.contains(end) {
            // single line
            self.carets(SourceSpan::new(location.start, end))?;
        } else {
            // multiple lines - only show first line and last line
            self.carets(SourceSpan::new(location.start, start_line_span.end))?;
            let end_loc = self.source.line_col(end);
            let end_line_span = self.source.line_span(end);
            self.line(end_loc.line, end_line_span)?;
            write!(self.write, "     | ")?;
            self.carets(SourceSpan::new(end_line_span.start, end))?;
        }
        Ok(())
    }

    fn line(&mut self, line: usize, span: SourceSpan) -> fmt::Result {
        writeln!(
            self.write,
            "{line:>4} | {source}",
            source = &self.source[span]
        )
    }

    fn carets(&mut self, span: SourceSpan) -> fmt::Result {
        let width = self.source[span].chars().count().max(1);
        for _ in 0..width {
            self.write.write_char('^')?
        }
        writeln!(self.write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FileId;

    fn location(start: usize, end: usize) -> Location {
        Location::new(FileId(0), SourceSpan::new(SourcePos(start), SourcePos(end)))
    }

    fn render(source: &Source, message: &Message) -> String {
        let mut output = String::new();
        ReportFormatter::new(&mut output, source).write(message).unwrap();
        output
    }

    #[test]
    fn counts_only_blocking_messages_as_errors() {
        let mut messages = Messages::new();
        messages.warning(location(0, 1), MessageText::UnterminatedLine);
        assert!(!messages.has_errors());
        messages.error(location(0, 1), MessageText::UnexpectedCharacter);
        messages.internal_error(location(0, 0), MessageText::EmptyToken);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages.error_count(), 2);
        assert!(messages.has_errors());
    }

    #[test]
    fn take_drains_the_log() {
        let mut messages = Messages::new();
        messages.error(location(0, 1), MessageText::ExpectedDefinition);
        let taken = messages.take();
        assert_eq!(taken.len(), 1);
        assert!(messages.is_empty());
        assert_eq!(taken[0].text.to_string(), "Expected a definition");
    }

    #[test]
    fn single_line() {
        let source = Source::new("test", "x = 1\nf(a, b\n");
        let message = Message {
            kind: MessageKind::Error,
            location: location(7, 8),
            text: MessageText::Unclosed {
                open: TokenType::OpenParen,
            },
        };
        assert_eq!(
            render(&source, &message),
            "test:2:2: error: Unclosed '('\n   2 | f(a, b\n     |  ^\n"
        );
    }

    #[test]
    fn trailing_line_break_stays_on_its_line() {
        let source = Source::new("test", "'123\n");
        let message = Message {
            kind: MessageKind::Warning,
            location: location(0, 5),
            text: MessageText::UnterminatedLine,
        };
        let expected = "test:1:1: warning: Unterminated string literal \
            (or maybe you wanted a \"multiline string\"?)\n   1 | '123\n     | ^^^^\n";
        assert_eq!(render(&source, &message), expected);
    }

    #[test]
    fn multiple_lines() {
        let source = Source::new("test", "\"ab\ncd\" x");
        let message = Message {
            kind: MessageKind::Error,
            location: location(0, 7),
            text: MessageText::TrailingInput {
                found: TokenType::StringLiteral,
            },
        };
        let expected = "test:1:1: error: Unexpected string literal after the end of the expression\n\
            \x20  1 | \"ab\n\
            \x20    | ^^^\n\
            \x20  2 | cd\" x\n\
            \x20    | ^^^\n";
        assert_eq!(render(&source, &message), expected);
    }
}
