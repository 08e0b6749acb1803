use crate::lex::{Token, TokenType};
use crate::source::{Location, Source};
use std::fmt;

/// Ordered n-ary tree. Each node owns its children.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tree<T> {
    pub value: T,
    pub children: Vec<Tree<T>>,
    /// Separators between the children and the closing bracket, if any.
    pub delimiters: Vec<T>,
}

impl<T> Tree<T> {
    pub fn new(value: T, children: Vec<Tree<T>>) -> Self {
        Self::delimited(value, children, vec![])
    }

    pub fn delimited(value: T, children: Vec<Tree<T>>, delimiters: Vec<T>) -> Self {
        Self {
            value,
            children,
            delimiters,
        }
    }

    pub fn leaf(value: T) -> Self {
        Self::new(value, vec![])
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Nodes in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = &Tree<T>> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let tree = stack.pop()?;
            stack.extend(tree.children.iter().rev());
            Some(tree)
        })
    }

    /// Values in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.nodes().map(|tree| &tree.value)
    }
}

impl Tree<Token> {
    /// Union of the locations of every token in this tree, delimiters
    /// included.
    pub fn location(&self) -> Location {
        self.nodes()
            .flat_map(|tree| std::iter::once(&tree.value).chain(&tree.delimiters))
            .map(|token| token.location)
            .fold(self.value.location, Location::merge)
    }

    /// Whether the children were separated by at least one comma.
    pub fn has_comma(&self) -> bool {
        self.delimiters
            .iter()
            .any(|token| token.ty == TokenType::Comma)
    }
}

/// Dumps a token tree, one node per line, children nested in braces.
pub struct TreeWriter<'a> {
    source: &'a Source,
    tree: &'a Tree<Token>,
    indent: usize,
}

impl<'a> TreeWriter<'a> {
    pub fn new(source: &'a Source, tree: &'a Tree<Token>) -> Self {
        Self {
            source,
            tree,
            indent: 0,
        }
    }
}

fn indent(count: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    use std::fmt::Write as _;
    for _ in 0..count {
        f.write_char(' ')?
    }
    Ok(())
}

impl fmt::Display for TreeWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = self.tree.value;
        let start_loc = self.source.line_col(token.location.start);
        let end_loc = self.source.line_col(token.location.end());
        write!(
            f,
            "{:?} @ {}-{} ({}-{})",
            token.ty,
            start_loc,
            end_loc,
            token.location.start.0,
            token.location.end().0,
        )?;
        // the module node spans the whole input
        if token.ty != TokenType::SemiColon {
            write!(f, " {:?}", &self.source[token.location])?;
        }
        if self.tree.is_leaf() {
            return writeln!(f);
        }
        writeln!(f, " {{")?;
        for child in &self.tree.children {
            indent(self.indent + 2, f)?;
            let child = TreeWriter {
                source: self.source,
                tree: child,
                indent: self.indent + 2,
            };
            fmt::Display::fmt(&child, f)?;
        }
        indent(self.indent, f)?;
        writeln!(f, "}}")
    }
}
