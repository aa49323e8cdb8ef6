//! Compile-time errors for template sources.

use std::fmt;

use thiserror::Error;

/// A location inside a template source.
///
/// `offset` is a byte offset; `line` and `column` are 1-based, with the column
/// counted in characters from the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Computes the line and column of `offset` within `source`.
    ///
    /// Offsets past the end of the source are clamped to its length.
    pub fn locate(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.column)
    }
}

/// Errors raised while compiling a template source.
///
/// Both kinds are fatal: no partially compiled tree is ever produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    /// The lexer met a character no directive rule accepts.
    #[error("unexpected character {character:?} (at {position})")]
    Lexical { character: char, position: Position },

    /// The parser met a token the grammar does not allow at that point.
    #[error("{message} (at {position})")]
    Unexpected { message: String, position: Position },
}

impl SyntaxError {
    pub(crate) fn lexical(source: &str, offset: usize) -> Self {
        let character = source[offset..].chars().next().unwrap_or('\0');
        SyntaxError::Lexical {
            character,
            position: Position::locate(source, offset),
        }
    }

    pub(crate) fn unexpected(source: &str, offset: usize, message: impl Into<String>) -> Self {
        SyntaxError::Unexpected {
            message: message.into(),
            position: Position::locate(source, offset),
        }
    }

    /// Where in the source the error was detected.
    pub fn position(&self) -> Position {
        match self {
            SyntaxError::Lexical { position, .. } | SyntaxError::Unexpected { position, .. } => {
                *position
            }
        }
    }

    /// Returns `true` for errors raised by the lexer.
    pub fn is_lexical(&self) -> bool {
        matches!(self, SyntaxError::Lexical { .. })
    }
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, SyntaxError>;
