//! Give meaning to token trees: values, definitions and modules.

use crate::context::Context;
use crate::diag::MessageText;
use crate::lex::{Token, TokenType};
use crate::source::Location;
use crate::symbols::Path;
use crate::tree::Tree;
use std::fmt;

/// Which structural rule produced a [`Value`].
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum ValueKind {
    Symbol,
    Number,
    /// A string literal, quotes included in the name.
    Text,
    /// Infix (two arguments) or prefix (one argument).
    Operator,
    Call,
    Tuple,
    List,
    Block,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Value {
    pub kind: ValueKind,
    /// Source text of the symbol, literal or operator; the opening bracket
    /// for tuples, lists and blocks.
    pub name: String,
    pub args: Vec<Argument>,
    pub location: Location,
}

impl Value {
    pub fn arg(&self, name: &str) -> Option<&Argument> {
        self.args.iter().find(|arg| arg.name == name)
    }
}

/// A named or positional (`#0`, `#1`, ...) argument, or a parameter when it
/// has no value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: Option<Value>,
    pub location: Location,
}

impl Argument {
    pub fn is_positional(&self) -> bool {
        self.name.starts_with('#')
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Definition {
    pub name: String,
    pub params: Vec<Argument>,
    pub body: Option<Value>,
    pub location: Location,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Module {
    /// In source order, duplicates included.
    pub definitions: Vec<Definition>,
    pub location: Location,
}

/// Run `rule`, falling back to the default `T` when it fails. The failure
/// itself is in the context's messages.
pub fn parse<T: Default>(
    tree: &Tree<Token>,
    ctx: &mut Context,
    rule: fn(&Tree<Token>, &mut Context) -> Option<T>,
) -> T {
    rule(tree, ctx).unwrap_or_default()
}

pub fn parse_value(tree: &Tree<Token>, ctx: &mut Context) -> Option<Value> {
    let token = tree.value;
    let kind = match token.ty {
        TokenType::Symbol if tree.is_leaf() => ValueKind::Symbol,
        TokenType::Symbol => ValueKind::Call,
        TokenType::NumberLiteral => ValueKind::Number,
        TokenType::StringLiteral => ValueKind::Text,
        TokenType::Operator
        | TokenType::Declaration
        | TokenType::Dot
        | TokenType::PreCond
        | TokenType::PostCond => ValueKind::Operator,
        // grouping, while `(a,)` stays a tuple
        TokenType::OpenParen if tree.children.len() == 1 && !tree.has_comma() => {
            return parse_value(&tree.children[0], ctx);
        }
        TokenType::OpenParen => ValueKind::Tuple,
        TokenType::OpenBracket => ValueKind::List,
        TokenType::OpenBrace => ValueKind::Block,
        ty => {
            ctx.messages.error(token.location, MessageText::ExpectedValue { found: Some(ty) });
            return None;
        }
    };

    let expected_children = match kind {
        ValueKind::Symbol | ValueKind::Number | ValueKind::Text => Some(0..=0),
        ValueKind::Operator => Some(1..=2),
        _ => None,
    };
    if let Some(expected) = expected_children {
        if !expected.contains(&tree.children.len()) {
            ctx.messages.internal_error(
                token.location,
                MessageText::MalformedNode {
                    node: token.ty,
                    children: tree.children.len(),
                },
            );
            return None;
        }
    }

    let args = match kind {
        ValueKind::Operator => positional_arguments(&tree.children, ctx)?,
        _ => arguments(&tree.children, ctx)?,
    };
    Some(Value {
        kind,
        name: ctx.source[token.location].to_string(),
        args,
        location: tree.location(),
    })
}

/// Operands, always positional: `a = b` is an assignment here, not a
/// named argument.
fn positional_arguments(children: &[Tree<Token>], ctx: &mut Context) -> Option<Vec<Argument>> {
    let mut ok = true;
    let mut args = vec![];
    for (index, child) in children.iter().enumerate() {
        match parse_value(child, ctx) {
            Some(value) => args.push(Argument {
                name: format!("#{index}"),
                value: Some(value),
                location: child.location(),
            }),
            None => ok = false,
        }
    }
    ok.then_some(args)
}

fn arguments(children: &[Tree<Token>], ctx: &mut Context) -> Option<Vec<Argument>> {
    let mut ok = true;
    let mut args: Vec<Argument> = vec![];
    let mut positional = 0;
    for child in children {
        let location = child.location();
        let (name, value) = match named_argument(child) {
            Some((name, value)) => (ctx.source[name.location].to_string(), value),
            None => {
                positional += 1;
                (format!("#{}", positional - 1), child)
            }
        };
        if args.iter().any(|arg| arg.name == name) {
            ctx.messages.error(location, MessageText::DuplicateArgument { name });
            ok = false;
            continue;
        }
        match parse_value(value, ctx) {
            Some(value) => args.push(Argument {
                name,
                value: Some(value),
                location,
            }),
            None => ok = false,
        }
    }
    ok.then_some(args)
}

/// `name = value` with a bare symbol name.
fn named_argument(tree: &Tree<Token>) -> Option<(Token, &Tree<Token>)> {
    match (tree.value.ty, tree.children.as_slice()) {
        (TokenType::Declaration, [name, value])
            if name.value.ty == TokenType::Symbol && name.is_leaf() =>
        {
            Some((name.value, value))
        }
        _ => None,
    }
}

/// `name = body`, `name(params) = body`, or a bare head without a body.
pub fn parse_definition(tree: &Tree<Token>, ctx: &mut Context) -> Option<Definition> {
    let (head, body) = match (tree.value.ty, tree.children.as_slice()) {
        (TokenType::Declaration, [head, body]) => (head, Some(body)),
        _ => (tree, None),
    };
    if head.value.ty != TokenType::Symbol {
        ctx.messages.error(head.location(), MessageText::ExpectedDefinition);
        return None;
    }

    let mut ok = true;
    let mut params: Vec<Argument> = vec![];
    for param in &head.children {
        if param.value.ty != TokenType::Symbol || !param.is_leaf() {
            ctx.messages.error(param.location(), MessageText::ExpectedParameter);
            ok = false;
            continue;
        }
        let name = ctx.source[param.value.location].to_string();
        if params.iter().any(|p| p.name == name) {
            ctx.messages.error(param.value.location, MessageText::DuplicateParameter { name });
            ok = false;
            continue;
        }
        params.push(Argument {
            name,
            value: None,
            location: param.value.location,
        });
    }

    let body = match body {
        Some(body) => Some(parse_value(body, ctx)?),
        None => None,
    };
    if !ok {
        return None;
    }
    Some(Definition {
        name: ctx.source[head.value.location].to_string(),
        params,
        body,
        location: tree.location(),
    })
}

/// Parse every definition of a module node, registering each one and its
/// parameters in the context's symbols.
pub fn parse_module(tree: &Tree<Token>, ctx: &mut Context) -> Option<Module> {
    if tree.value.ty != TokenType::SemiColon {
        ctx.messages.error(tree.location(), MessageText::ExpectedModule);
        return None;
    }
    let mut definitions = vec![];
    for child in &tree.children {
        if ctx.error_limit_reached() {
            tracing::warn!(
                errors = ctx.messages.error_count(),
                "too many errors, giving up on the module"
            );
            break;
        }
        let Some(definition) = parse_definition(child, ctx) else {
            continue;
        };
        declare(&definition, ctx);
        definitions.push(definition);
    }
    tracing::debug!(definitions = definitions.len(), "parsed module");
    Some(Module {
        definitions,
        location: tree.value.location,
    })
}

fn declare(definition: &Definition, ctx: &mut Context) {
    let path = Path::root().child(&definition.name);
    ctx.symbols.insert(&path, definition.clone(), ctx.allow_overrides);
    for param in &definition.params {
        let param = Definition {
            name: param.name.clone(),
            params: vec![],
            body: None,
            location: param.location,
        };
        ctx.symbols.insert(&path.child(&param.name), param, false);
    }
}

fn write_args(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    args: &[Argument],
    close: &str,
) -> fmt::Result {
    f.write_str(open)?;
    for (index, arg) in args.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    f.write_str(close)
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) if self.is_positional() => write!(f, "{value}"),
            Some(value) => write!(f, "{} = {value}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ValueKind::Symbol | ValueKind::Number | ValueKind::Text => f.write_str(&self.name),
            ValueKind::Operator => match self.args.as_slice() {
                [operand] => write!(f, "({}{operand})", self.name),
                [left, right] => write!(f, "({left} {} {right})", self.name),
                args => {
                    f.write_str(&self.name)?;
                    write_args(f, "(", args, ")")
                }
            },
            ValueKind::Call => {
                f.write_str(&self.name)?;
                write_args(f, "(", &self.args, ")")
            }
            ValueKind::Tuple if self.args.len() == 1 => write_args(f, "(", &self.args, ",)"),
            ValueKind::Tuple => write_args(f, "(", &self.args, ")"),
            ValueKind::List => write_args(f, "[", &self.args, "]"),
            ValueKind::Block => write_args(f, "{", &self.args, "}"),
        }
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.params.is_empty() {
            write_args(f, "(", &self.params, ")")?;
        }
        if let Some(body) = &self.body {
            write!(f, " = {body}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for definition in &self.definitions {
            writeln!(f, "{definition}")?;
        }
        Ok(())
    }
}
