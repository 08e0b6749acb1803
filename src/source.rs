use std::fmt;

#[derive(Copy, Clone, Hash, Ord, PartialOrd, Eq, PartialEq, Default)]
pub struct SourcePos(pub usize);

impl fmt::Debug for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half-open range of source positions: describes a span of text in a [`Source`].
/// [`std::ops::Range<SourcePos>`] has worse ergonomics: in particular it's not [`Copy`]!
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct SourceSpan {
    pub start: SourcePos,
    pub end: SourcePos,
}

impl SourceSpan {
    pub fn new(start: SourcePos, end: SourcePos) -> Self {
        Self { start, end }
    }

    pub fn empty(pos: SourcePos) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn contains(&self, pos: SourcePos) -> bool {
        self.start <= pos && pos <= self.end
    }

    pub fn len(&self) -> usize {
        self.end.0 - self.start.0
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Identifies one [`Source`] among those compiled by a driver.
#[derive(Copy, Clone, Debug, Hash, Ord, PartialOrd, Eq, PartialEq, Default)]
pub struct FileId(pub u32);

/// A span of text in a particular file, as carried by tokens, values and
/// diagnostics.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct Location {
    pub file: FileId,
    pub start: SourcePos,
    /// Length in bytes.
    pub length: usize,
}

impl Location {
    pub fn new(file: FileId, span: SourceSpan) -> Self {
        Self {
            file,
            start: span.start,
            length: span.len(),
        }
    }

    pub fn end(&self) -> SourcePos {
        SourcePos(self.start.0 + self.length)
    }

    pub fn span(&self) -> SourceSpan {
        SourceSpan::new(self.start, self.end())
    }

    /// Smallest location covering both `self` and `other`.
    pub fn merge(self, other: Location) -> Location {
        let start = self.start.min(other.start);
        let end = self.end().max(other.end());
        Location::new(self.file, SourceSpan::new(start, end))
    }
}

/// 1-based line and column in a source file
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for LineColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone, Debug)]
pub struct Source {
    pub id: FileId,
    pub name: String,
    pub text: String,
}

impl Source {
    /// Create a Source object for a string
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: FileId::default(),
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn with_id(self, id: FileId) -> Self {
        Self { id, ..self }
    }

    pub fn end(&self) -> SourcePos {
        SourcePos(self.text.len())
    }

    /// Location of the whole text.
    pub fn location(&self) -> Location {
        Location::new(self.id, SourceSpan::new(SourcePos(0), self.end()))
    }

    pub fn peek(&self, pos: SourcePos) -> Option<char> {
        self.text[pos.0..].chars().next()
    }

    pub fn starts_with(&self, pos: SourcePos, prefix: &str) -> bool {
        self.text[pos.0..].starts_with(prefix)
    }

    pub fn scan_forward(
        &self,
        pos: SourcePos,
        mut while_char: impl FnMut(char) -> bool,
    ) -> SourcePos {
        match self.text[pos.0..].find(|c: char| !while_char(c)) {
            Some(len) => SourcePos(pos.0 + len),
            None => self.end(),
        }
    }

    /// Lookup line and column from this in a source file
    pub fn line_col(&self, pos: SourcePos) -> LineColumn {
        let mut line_start = 0;
        let mut line = 1;
        while let Some(line_len) = self.text[line_start..].find('\n') {
            let line_end = line_start + line_len + 1;
            if pos.0 < line_end {
                break;
            }
            line_start = line_end;
            line += 1;
        }
        let column = 1 + self.text[line_start..pos.0].chars().count();
        LineColumn { line, column }
    }

    /// Return the span for the line containing a position
    pub fn line_span(&self, pos: SourcePos) -> SourceSpan {
        let start = SourcePos(match self.text[..pos.0].rfind('\n') {
            Some(pos) => pos + 1,
            None => 0,
        });
        let end = SourcePos(match self.text[pos.0..].find('\n') {
            Some(len) => pos.0 + len,
            None => self.text.len(),
        });
        SourceSpan { start, end }
    }
}

impl std::ops::Index<SourceSpan> for Source {
    type Output = str;

    fn index(&self, value: SourceSpan) -> &Self::Output {
        &self.text[value.start.0..value.end.0]
    }
}

impl std::ops::Index<Location> for Source {
    type Output = str;

    fn index(&self, value: Location) -> &Self::Output {
        &self[value.span()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col() {
        let source = Source::new("test", "ab\ncd\n\nx");
        assert_eq!(source.line_col(SourcePos(0)).to_string(), "1:1");
        assert_eq!(source.line_col(SourcePos(2)).to_string(), "1:3");
        assert_eq!(source.line_col(SourcePos(3)).to_string(), "2:1");
        assert_eq!(source.line_col(SourcePos(6)).to_string(), "3:1");
        assert_eq!(source.line_col(SourcePos(7)).to_string(), "4:1");
    }

    #[test]
    fn line_span() {
        let source = Source::new("test", "ab\ncd\n");
        let span = source.line_span(SourcePos(4));
        assert_eq!(&source[span], "cd");
        assert_eq!(&source[source.line_span(SourcePos(0))], "ab");
    }

    #[test]
    fn merge_locations() {
        let a = Location::new(FileId(0), SourceSpan::new(SourcePos(4), SourcePos(6)));
        let b = Location::new(FileId(0), SourceSpan::new(SourcePos(1), SourcePos(2)));
        let merged = a.merge(b);
        assert_eq!(merged.start, SourcePos(1));
        assert_eq!(merged.length, 5);
        assert_eq!(merged.end(), SourcePos(6));
    }
}
