use std::fmt;

/// 1-based source location. `col` is the column of the next character to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Default for Position {
    fn default() -> Self {
        Position { row: 1, col: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// Cursor over a slice with a single checkpoint.
///
/// Used directly as the token stream, and wrapped by [`CharStream`] for source text.
#[derive(Debug, Clone)]
pub struct Stream<'a, T> {
    items: &'a [T],
    cursor: usize,
    saved: usize,
}

impl<'a, T> Stream<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Stream {
            items,
            cursor: 0,
            saved: 0,
        }
    }

    pub fn next(&mut self) -> Option<&'a T> {
        let item = self.items.get(self.cursor)?;
        self.cursor += 1;
        Some(item)
    }

    pub fn peek(&self) -> Option<&'a T> {
        self.items.get(self.cursor)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&'a T> {
        self.items.get(self.cursor + n)
    }

    /// The item most recently returned by `next`.
    pub fn previous(&self) -> Option<&'a T> {
        self.cursor.checked_sub(1).and_then(|i| self.items.get(i))
    }

    pub fn get(&self, index: usize) -> Option<&'a T> {
        self.items.get(index)
    }

    /// Undo the most recent `next`. Only valid after a matching `next`.
    pub fn back(&mut self) {
        debug_assert!(self.cursor > 0, "back() called at start of stream");
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn save(&mut self) -> usize {
        self.saved = self.cursor;
        self.cursor
    }

    pub fn restore(&mut self) {
        self.cursor = self.saved;
    }

    pub fn offset(&self) -> usize {
        self.cursor
    }

    pub fn eof(&self) -> bool {
        self.cursor >= self.items.len()
    }
}

/// Character cursor that keeps row/column in step with every `next` and `back`.
#[derive(Debug, Clone)]
pub struct CharStream<'a> {
    inner: Stream<'a, char>,
    position: Position,
    saved_position: Position,
    // Length of each completed line, indexed by row - 1. Needed to back up over a newline.
    line_lengths: Vec<usize>,
}

impl<'a> CharStream<'a> {
    pub fn new(chars: &'a [char]) -> Self {
        CharStream {
            inner: Stream::new(chars),
            position: Position::default(),
            saved_position: Position::default(),
            line_lengths: vec![],
        }
    }

    pub fn next(&mut self) -> Option<char> {
        let c = *self.inner.next()?;
        if c == '\n' {
            let row = self.position.row;
            if self.line_lengths.len() < row {
                self.line_lengths.resize(row, 0);
            }
            self.line_lengths[row - 1] = self.position.col - 1;
            self.position.row += 1;
            self.position.col = 1;
        } else {
            self.position.col += 1;
        }
        Some(c)
    }

    pub fn peek(&self) -> Option<char> {
        self.inner.peek().copied()
    }

    pub fn back(&mut self) {
        self.inner.back();
        if self.inner.peek() == Some(&'\n') {
            self.position.row -= 1;
            self.position.col = self.line_lengths[self.position.row - 1] + 1;
        } else {
            self.position.col -= 1;
        }
    }

    pub fn save(&mut self) -> usize {
        self.saved_position = self.position;
        self.inner.save()
    }

    pub fn restore(&mut self) {
        self.inner.restore();
        self.position = self.saved_position;
    }

    pub fn char_at(&self, index: usize) -> Option<char> {
        self.inner.get(index).copied()
    }

    pub fn offset(&self) -> usize {
        self.inner.offset()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn eof(&self) -> bool {
        self.inner.eof()
    }
}
