use crate::parse::Definition;
use std::fmt;

/// Name segments from the root scope, rendered joined by `/`.
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct Path(pub Vec<String>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Definitions declared under one name, and the scopes nested in it.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    pub definitions: Vec<Definition>,
    /// In insertion order.
    pub members: Vec<(String, Scope)>,
}

impl Scope {
    fn member(&self, name: &str) -> Option<&Scope> {
        self.members
            .iter()
            .find(|(member, _)| member == name)
            .map(|(_, scope)| scope)
    }

    fn member_mut(&mut self, name: &str) -> &mut Scope {
        let index = match self.members.iter().position(|(member, _)| member == name) {
            Some(index) => index,
            None => {
                self.members.push((name.to_string(), Scope::default()));
                self.members.len() - 1
            }
        };
        &mut self.members[index].1
    }

    fn for_all(&self, path: &Path, f: &mut dyn FnMut(&Path, &Definition)) {
        for definition in &self.definitions {
            f(path, definition);
        }
        for (name, scope) in &self.members {
            scope.for_all(&path.child(name), f);
        }
    }
}

/// Every definition seen so far, keyed by [`Path`].
#[derive(Clone, Debug, Default)]
pub struct Symbols {
    pub root: Scope,
}

impl Symbols {
    /// Add `definition` at `path`, creating scopes as needed. With
    /// `allow_overrides`, it replaces whatever was declared there before,
    /// nested scopes included.
    pub fn insert(&mut self, path: &Path, definition: Definition, allow_overrides: bool) {
        let mut scope = &mut self.root;
        for name in &path.0 {
            scope = scope.member_mut(name);
        }
        if allow_overrides {
            if !scope.definitions.is_empty() {
                tracing::debug!(%path, "overriding definition");
            }
            scope.definitions.clear();
            scope.members.clear();
        }
        scope.definitions.push(definition);
    }

    pub fn get(&self, path: &Path) -> Option<&Scope> {
        path.0
            .iter()
            .try_fold(&self.root, |scope, name| scope.member(name))
    }

    /// Definitions under `path`, oldest first.
    pub fn lookup(&self, path: &Path) -> &[Definition] {
        self.get(path)
            .map_or(&[][..], |scope| scope.definitions.as_slice())
    }

    /// Visit every definition depth first, in insertion order.
    pub fn for_all(&self, mut f: impl FnMut(&Path, &Definition)) {
        self.root.for_all(&Path::root(), &mut f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Location;

    fn definition(name: &str) -> Definition {
        Definition {
            name: name.to_string(),
            params: vec![],
            body: None,
            location: Location::default(),
        }
    }

    fn all(symbols: &Symbols) -> Vec<String> {
        let mut all = vec![];
        symbols.for_all(|path, definition| all.push(format!("{path}:{}", definition.name)));
        all
    }

    #[test]
    fn paths() {
        let path = Path::root().child("f").child("x");
        assert_eq!(path.to_string(), "f/x");
        assert_eq!(Path::root().to_string(), "");
    }

    #[test]
    fn insertion_order() {
        let mut symbols = Symbols::default();
        let f = Path::root().child("f");
        symbols.insert(&f, definition("f"), false);
        symbols.insert(&f.child("x"), definition("x"), false);
        symbols.insert(&Path::root().child("a"), definition("a"), false);
        symbols.insert(&f, definition("f2"), false);
        assert_eq!(all(&symbols), ["f:f", "f:f2", "f/x:x", "a:a"]);
        assert_eq!(symbols.lookup(&f).len(), 2);
        assert!(symbols.lookup(&Path::root().child("missing")).is_empty());
    }

    #[test]
    fn overrides_replace_nested_scopes() {
        let mut symbols = Symbols::default();
        let f = Path::root().child("f");
        symbols.insert(&f, definition("old"), false);
        symbols.insert(&f.child("x"), definition("x"), false);
        symbols.insert(&f, definition("new"), true);
        assert_eq!(all(&symbols), ["f:new"]);
        assert!(symbols.get(&f.child("x")).is_none());
    }
}
