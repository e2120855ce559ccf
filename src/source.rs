use std::{iter::Peekable, str::Chars};

use crate::token::Position;

/// The character sentinel returned once the input is exhausted.
pub const END_OF_INPUT: char = '\0';

/// A forward-only stream of characters with line/column tracking.
///
/// Implementors release any underlying resource on drop.
pub trait CharSource {
    /// The character under the cursor, or [`END_OF_INPUT`].
    fn current(&self) -> char;

    /// The position of [`CharSource::current`].
    fn position(&self) -> Position;

    /// Moves the cursor one character forward. Does nothing at the end of
    /// the input.
    fn advance(&mut self);

    /// Moves the cursor to the first character of the next line.
    fn skip_line(&mut self) {
        while !matches!(self.current(), '\n' | END_OF_INPUT) {
            self.advance();
        }
        self.advance();
    }
}

/// An in-memory character source.
pub struct StrSource<'src> {
    iter: Peekable<Chars<'src>>,
    current: char,
    line: i32,
    column: i32,
}

impl StrSource<'_> {
    pub fn new(src: &str) -> StrSource<'_> {
        let mut iter = src.chars().peekable();
        let current = iter.next().unwrap_or(END_OF_INPUT);
        StrSource {
            iter,
            current,
            line: 1,
            column: 1,
        }
    }
}

impl CharSource for StrSource<'_> {
    fn current(&self) -> char {
        self.current
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn advance(&mut self) {
        match self.current {
            END_OF_INPUT => return,
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            _ => self.column += 1,
        }
        self.current = self.iter.next().unwrap_or(END_OF_INPUT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_lines_and_columns() {
        let mut s = StrSource::new("ab\nc");
        assert_eq!((s.current(), s.position()), ('a', Position::new(1, 1)));
        s.advance();
        assert_eq!((s.current(), s.position()), ('b', Position::new(1, 2)));
        s.advance();
        assert_eq!((s.current(), s.position()), ('\n', Position::new(1, 3)));
        s.advance();
        assert_eq!((s.current(), s.position()), ('c', Position::new(2, 1)));
        s.advance();
        assert_eq!(s.current(), END_OF_INPUT);
        s.advance();
        assert_eq!((s.current(), s.position()), (END_OF_INPUT, Position::new(2, 2)));
    }

    #[test]
    fn skip_line() {
        let mut s = StrSource::new("# comment\nx");
        s.skip_line();
        assert_eq!((s.current(), s.position()), ('x', Position::new(2, 1)));

        let mut s = StrSource::new("# no line break");
        s.skip_line();
        assert_eq!(s.current(), END_OF_INPUT);
    }
}
