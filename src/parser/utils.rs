use std::fmt;

/// A reference to a line and column in an input source file
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SourcePosition {
    index: usize,
    line: usize,
    col: usize,
}

impl SourcePosition {
    #[doc(hidden)]
    pub fn new(index: usize, line: usize, col: usize) -> Self {
        assert!(index >= line + col);

        Self { index, line, col }
    }

    #[doc(hidden)]
    pub fn new_origin() -> Self {
        Self {
            index: 0,
            line: 0,
            col: 0,
        }
    }

    #[doc(hidden)]
    pub fn advance_col(&mut self) {
        self.index += 1;
        self.col += 1;
    }

    #[doc(hidden)]
    pub fn advance_line(&mut self) {
        self.index += 1;
        self.line += 1;
        self.col = 0;
    }

    /// The index of the character in the input source
    ///
    /// Zero-based index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The line of the character in the input source
    ///
    /// Zero-based index: the first line is line zero.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The column of the character in the input source
    ///
    /// Zero-based index: the first column is column zero.
    pub fn column(&self) -> usize {
        self.col
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A range of characters in the input source, starting at the character
/// pointed to by `start` and ending just before the `end` marker.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Span {
    /// Start position of the span.
    pub start: SourcePosition,

    /// First source position _after_ the span.
    pub end: SourcePosition,
}

impl Span {
    #[doc(hidden)]
    pub fn new(start: SourcePosition, end: SourcePosition) -> Self {
        Self { start, end }
    }

    #[doc(hidden)]
    pub fn zero_width(pos: SourcePosition) -> Self {
        Self::new(pos, pos)
    }

    #[doc(hidden)]
    pub fn unlocated() -> Self {
        Self {
            start: SourcePosition::new_origin(),
            end: SourcePosition::new_origin(),
        }
    }
}

/// Wraps an item with the start and end markers of its position in the input
/// source.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Spanning<T> {
    /// The wrapped item.
    pub item: T,

    /// The span of the item in the input source.
    pub span: Span,
}

impl<T> Spanning<T> {
    #[doc(hidden)]
    pub fn new(span: Span, item: T) -> Self {
        Self { item, span }
    }

    #[doc(hidden)]
    pub fn start_end(start: SourcePosition, end: SourcePosition, item: T) -> Self {
        Self::new(Span::new(start, end), item)
    }

    /// Wraps the `item` without any location information.
    pub fn unlocated(item: T) -> Self {
        Self::new(Span::unlocated(), item)
    }

    #[doc(hidden)]
    pub fn start(&self) -> &SourcePosition {
        &self.span.start
    }

    #[doc(hidden)]
    pub fn end(&self) -> &SourcePosition {
        &self.span.end
    }

    /// Modifies the contents of the spanned item.
    pub fn map<O, F: FnOnce(T) -> O>(self, f: F) -> Spanning<O> {
        Spanning::new(self.span, f(self.item))
    }
}

impl<T: fmt::Display> fmt::Display for Spanning<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. At {}", self.item, self.span.start)
    }
}

impl<T: std::error::Error> std::error::Error for Spanning<T> {}
