//! Build a generic [`Tree`] of tokens: operator precedence, calls, groupings
//! and tuples, and bracket matching. Meaning is left to [`crate::parse`].

use crate::context::Context;
use crate::diag::MessageText;
use crate::lex::{Token, TokenType};
use crate::source::{Location, SourceSpan};
use crate::tree::Tree;

/// A grammar entry point for [`ast`].
pub type Rule = fn(&mut Builder<'_>) -> Option<Tree<Token>>;

/// Build a tree from `tokens` using the entry `rule`.
///
/// Whitespace tokens are dropped, as are error tokens which the lexer already
/// reported. Returns `None` when the rule cannot match at all.
pub fn ast(tokens: &[Token], ctx: &mut Context, rule: Rule) -> Option<Tree<Token>> {
    let tokens = tokens
        .iter()
        .copied()
        .filter(|token| !matches!(token.ty, TokenType::WhiteSpace | TokenType::Error))
        .collect();
    let mut builder = Builder {
        tokens,
        pos: 0,
        depth: 0,
        ctx,
    };
    let tree = rule(&mut builder);
    tracing::debug!(
        nodes = tree.as_ref().map_or(0, |tree| tree.iter().count()),
        messages = builder.ctx.messages.len(),
        "built tree"
    );
    tree
}

/// A single expression.
pub fn parse_value(builder: &mut Builder<'_>) -> Option<Tree<Token>> {
    if builder.at_end() {
        return None;
    }
    let tree = builder.expression(0)?;
    builder.expect_end();
    Some(tree)
}

/// `name = value`, `name(params) = value`, or a bare `name(params)`.
pub fn parse_definition(builder: &mut Builder<'_>) -> Option<Tree<Token>> {
    if builder.at_end() {
        return None;
    }
    let tree = builder.definition()?;
    builder.expect_end();
    Some(tree)
}

/// Definitions up to the end of input, optionally separated by `;`.
///
/// The result is a module node: a [`TokenType::SemiColon`] token spanning the
/// whole input, with one child per definition.
pub fn parse_module(builder: &mut Builder<'_>) -> Option<Tree<Token>> {
    let mut definitions = vec![];
    while let Some(token) = builder.peek() {
        if builder.ctx.error_limit_reached() {
            tracing::warn!(
                errors = builder.ctx.messages.error_count(),
                "too many errors, giving up on the module"
            );
            break;
        }
        if token.ty == TokenType::SemiColon {
            builder.bump();
            continue;
        }
        if token.ty.is_close() {
            builder.error(token.location, MessageText::Unmatched { close: token.ty });
            builder.bump();
            continue;
        }
        let before = builder.pos;
        match builder.definition() {
            Some(definition) => definitions.push(definition),
            None => builder.skip_stalled(before),
        }
    }
    let token = Token {
        ty: TokenType::SemiColon,
        location: builder.ctx.source.location(),
    };
    Some(Tree::new(token, definitions))
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Associativity {
    Left,
    Right,
}

use Associativity::{Left, Right};

/// Binding of operator runs by text, loosest first.
const OPERATORS: &[(&str, u8, Associativity)] = &[
    ("->", 2, Right),
    ("=>", 2, Right),
    ("||", 3, Left),
    ("&&", 4, Left),
    ("==", 5, Left),
    ("!=", 5, Left),
    ("<", 5, Left),
    (">", 5, Left),
    ("<=", 5, Left),
    (">=", 5, Left),
    ("+", 6, Left),
    ("-", 6, Left),
    ("++", 6, Left),
    ("*", 7, Left),
    ("/", 7, Left),
    ("%", 7, Left),
    ("^", 8, Right),
];

const DECLARATION_PRECEDENCE: u8 = 1;
const CONDITION_PRECEDENCE: u8 = 2;
/// Operator runs missing from [`OPERATORS`].
const DEFAULT_PRECEDENCE: u8 = 5;
const PREFIX_PRECEDENCE: u8 = 9;
const DOT_PRECEDENCE: u8 = 10;

/// Deepest tree the builder produces. Every later pass walks trees
/// recursively, so this bounds their stack use too.
pub const MAX_NESTING_DEPTH: usize = 256;

/// State of the tree builder over whitespace-free tokens.
pub struct Builder<'ctx> {
    tokens: Vec<Token>,
    pos: usize,
    /// Nodes open above the one being built.
    depth: usize,
    ctx: &'ctx mut Context,
}

impl Builder<'_> {
    fn definition(&mut self) -> Option<Tree<Token>> {
        let tree = self.expression(0)?;
        let head = match tree.value.ty {
            TokenType::Declaration if tree.children.len() == 2 => &tree.children[0],
            _ => &tree,
        };
        if head.value.ty != TokenType::Symbol {
            self.error(tree.location(), MessageText::ExpectedDefinition);
            return None;
        }
        Some(tree)
    }

    /// Precedence climbing over binary operators binding at least as tight as
    /// `min_precedence`.
    fn expression(&mut self, min_precedence: u8) -> Option<Tree<Token>> {
        let mut left = self.operand()?;
        // each operator applied here wraps `left` one level deeper
        let mut entered = 0;
        while let Some(token) = self.peek() {
            let Some((precedence, associativity)) = self.binary(token) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            if !self.enter(token.location) {
                self.skip_nested();
                break;
            }
            entered += 1;
            self.bump();
            let next = match associativity {
                Left => precedence + 1,
                Right => precedence,
            };
            match self.expression(next) {
                Some(right) => left = Tree::new(token, vec![left, right]),
                // reported by operand()
                None => break,
            }
        }
        self.depth -= entered;
        Some(left)
    }

    fn binary(&self, token: Token) -> Option<(u8, Associativity)> {
        match token.ty {
            TokenType::Declaration => Some((DECLARATION_PRECEDENCE, Right)),
            TokenType::PreCond | TokenType::PostCond => Some((CONDITION_PRECEDENCE, Left)),
            TokenType::Dot => Some((DOT_PRECEDENCE, Left)),
            TokenType::Operator => {
                let text = &self.ctx.source[token.location];
                let binding = OPERATORS
                    .iter()
                    .find(|(operator, _, _)| *operator == text)
                    .map_or((DEFAULT_PRECEDENCE, Left), |&(_, precedence, associativity)| {
                        (precedence, associativity)
                    });
                Some(binding)
            }
            _ => None,
        }
    }

    fn operand(&mut self) -> Option<Tree<Token>> {
        let Some(token) = self.peek() else {
            let location = self.end_location();
            self.error(location, MessageText::ExpectedValue { found: None });
            return None;
        };
        match token.ty {
            TokenType::NumberLiteral | TokenType::StringLiteral => {
                self.bump();
                Some(Tree::leaf(token))
            }
            TokenType::Symbol => {
                self.bump();
                match self.peek() {
                    // calls need the paren to touch the name
                    Some(open)
                        if open.ty == TokenType::OpenParen
                            && open.location.start == token.location.end() =>
                    {
                        if !self.enter(open.location) {
                            self.skip_nested();
                            return None;
                        }
                        self.bump();
                        let (arguments, delimiters) = self.delimited(open, TokenType::CloseParen);
                        self.leave();
                        Some(Tree::delimited(token, arguments, delimiters))
                    }
                    _ => Some(Tree::leaf(token)),
                }
            }
            // a single child without a comma is a grouping, anything else a tuple
            TokenType::OpenParen => self.bracketed(token, TokenType::CloseParen),
            TokenType::OpenBracket => self.bracketed(token, TokenType::CloseBracket),
            TokenType::OpenBrace => self.bracketed(token, TokenType::CloseBrace),
            TokenType::Operator => {
                if !self.enter(token.location) {
                    self.skip_nested();
                    return None;
                }
                self.bump();
                let operand = self.expression(PREFIX_PRECEDENCE);
                self.leave();
                Some(Tree::new(token, vec![operand?]))
            }
            // left for the enclosing list or module to deal with
            ty if ty.is_close() || matches!(ty, TokenType::Comma | TokenType::SemiColon) => {
                self.error(token.location, MessageText::ExpectedValue { found: Some(ty) });
                None
            }
            ty => {
                self.bump();
                self.error(token.location, MessageText::ExpectedValue { found: Some(ty) });
                None
            }
        }
    }

    /// A bracket node opened by `open`, which is the next token.
    fn bracketed(&mut self, open: Token, close: TokenType) -> Option<Tree<Token>> {
        if !self.enter(open.location) {
            self.skip_nested();
            return None;
        }
        self.bump();
        let (items, delimiters) = self.delimited(open, close);
        self.leave();
        Some(Tree::delimited(open, items, delimiters))
    }

    /// Separated items up to the `close` matching `open`, which has already
    /// been consumed. Also returns the separators and the closing bracket
    /// that were consumed.
    ///
    /// A different closing bracket or the end of input closes the list
    /// implicitly, after reporting it.
    fn delimited(&mut self, open: Token, close: TokenType) -> (Vec<Tree<Token>>, Vec<Token>) {
        let separators: &[TokenType] = match close {
            TokenType::CloseBrace => &[TokenType::Comma, TokenType::SemiColon],
            _ => &[TokenType::Comma],
        };
        let mut items = vec![];
        let mut delimiters = vec![];
        loop {
            let Some(token) = self.peek() else {
                self.error(open.location, MessageText::Unclosed { open: open.ty });
                break;
            };
            if token.ty == close {
                self.bump();
                delimiters.push(token);
                break;
            }
            if token.ty.is_close() {
                self.error(
                    token.location,
                    MessageText::Mismatched {
                        expected: close,
                        found: token.ty,
                    },
                );
                break;
            }
            let before = self.pos;
            match self.expression(0) {
                Some(item) => items.push(item),
                None => {
                    self.skip_stalled(before);
                    continue;
                }
            }
            match self.peek() {
                Some(token) if separators.contains(&token.ty) => {
                    self.bump();
                    delimiters.push(token);
                }
                Some(token) if token.ty.is_close() => {}
                None => {}
                Some(token) => self.error(
                    token.location,
                    MessageText::ExpectedSeparator {
                        close,
                        found: token.ty,
                    },
                ),
            }
        }
        (items, delimiters)
    }

    fn expect_end(&mut self) {
        if let Some(token) = self.peek() {
            let text = if token.ty.is_close() {
                MessageText::Unmatched { close: token.ty }
            } else {
                MessageText::TrailingInput { found: token.ty }
            };
            self.error(token.location, text);
        }
    }

    /// Skip a token if nothing was consumed since `before`, so recovery
    /// always makes progress.
    fn skip_stalled(&mut self, before: usize) {
        if self.pos == before {
            if let Some(token) = self.bump() {
                tracing::trace!(ty = ?token.ty, start = token.location.start.0, "skipped token");
            }
        }
    }

    /// Open a node one level deeper, or report that the limit is reached.
    fn enter(&mut self, location: Location) -> bool {
        if self.depth >= MAX_NESTING_DEPTH {
            self.error(
                location,
                MessageText::NestingTooDeep {
                    max: MAX_NESTING_DEPTH,
                },
            );
            return false;
        }
        self.depth += 1;
        true
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Skip the rest of the current expression: up to a separator or a
    /// closing bracket that is not nested in it, or the end of input.
    fn skip_nested(&mut self) {
        let mut open = 0usize;
        while let Some(token) = self.peek() {
            if token.ty.is_close() {
                if open == 0 {
                    break;
                }
                open -= 1;
            } else if token.ty.is_open() {
                open += 1;
            } else if open == 0 && matches!(token.ty, TokenType::Comma | TokenType::SemiColon) {
                break;
            }
            self.bump();
        }
        tracing::trace!(pos = self.pos, "skipped nested expression");
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn end_location(&self) -> Location {
        let end = self.ctx.source.end();
        Location::new(self.ctx.source.id, SourceSpan::empty(end))
    }

    fn error(&mut self, location: Location, text: MessageText) {
        self.ctx.messages.error(location, text);
    }
}
