use std::fmt;

/// A 1-based (line, column) source location.
///
/// Nodes built outside of the user source (the standard environment) use
/// [`Position::BUILTIN`].
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: i32,
    pub column: i32,
}

impl Position {
    pub const BUILTIN: Position = Position {
        line: -1,
        column: -1,
    };

    pub const fn new(line: i32, column: i32) -> Position {
        Position { line, column }
    }

    pub fn is_builtin(self) -> bool {
        self == Position::BUILTIN
    }

    /// Attaches this position to some value, usually an error.
    pub fn wrap<T>(self, inner: T) -> Located<T> {
        Located {
            position: self,
            inner,
        }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({self})")
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_builtin() {
            f.write_str("<builtin>")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// A value tagged with the source position it refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Located<T> {
    pub position: Position,
    pub inner: T,
}

impl<T: fmt::Display> fmt::Display for Located<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{}: ", self.position)?;
        }
        write!(f, "{}", self.inner)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub spelling: Box<str>,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, spelling: impl Into<Box<str>>, position: Position) -> Token {
        Token {
            kind,
            spelling: spelling.into(),
            position,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::EndOfText
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token({:?}, {:?}, {})",
            self.kind, self.spelling, self.position
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?} at {}", self.kind, self.spelling, self.position)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    IntLiteral,
    Identifier,
    /// One of `+ - * / < > = !`.
    Operator,
    CharLiteral,

    If,
    Then,
    Else,
    EndIf,
    While,
    Let,
    In,
    Begin,
    End,
    For,
    To,
    Do,
    Const,
    Var,
    Next,

    /// `:=`
    Becomes,
    Colon,
    Semicolon,
    /// `~`
    Is,
    LeftBracket,
    RightBracket,

    EndOfText,

    ErrorUnknownInput,
    /// A character literal which isn't a single graphic character between
    /// quotes.
    ErrorUnacceptableSequence,
}

impl TokenKind {
    pub fn is_error(self) -> bool {
        matches!(
            self,
            TokenKind::ErrorUnknownInput | TokenKind::ErrorUnacceptableSequence
        )
    }
}

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "if" => TokenKind::If,
    "then" => TokenKind::Then,
    "else" => TokenKind::Else,
    "endif" => TokenKind::EndIf,
    "while" => TokenKind::While,
    "let" => TokenKind::Let,
    "in" => TokenKind::In,
    "begin" => TokenKind::Begin,
    "end" => TokenKind::End,
    "for" => TokenKind::For,
    "to" => TokenKind::To,
    "do" => TokenKind::Do,
    "const" => TokenKind::Const,
    "var" => TokenKind::Var,
    "next" => TokenKind::Next,
};
