use tracing::trace;

use crate::{
    diagnostics::Reporter,
    source::{CharSource, StrSource, END_OF_INPUT},
    token::{Position, Token, TokenKind, KEYWORDS},
};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 1_024;

/// Lexes the provided character source, producing the tokens into the provided
/// buffer. The last produced token is always [`TokenKind::EndOfText`].
///
/// Error tokens are produced (and reported) in place; scanning always carries
/// on until the input is exhausted.
pub fn lex(source: impl CharSource, tokens: &mut Vec<Token>, reporter: &mut Reporter) {
    Lexer::new(source, tokens, reporter).lex();
}

/// Lexes an in-memory source into the provided buffer.
pub fn lex_str(src: &str, tokens: &mut Vec<Token>, reporter: &mut Reporter) {
    lex(StrSource::new(src), tokens, reporter);
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str, reporter: &mut Reporter) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex_str(src, &mut tokens, reporter);
    tokens
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unknown input {0:?}")]
    UnknownInput(char),
    #[error("unacceptable character literal `{0}`")]
    UnacceptableSequence(Box<str>),
}

/// The Triangle lexer
struct Lexer<'tok, 'rep, S> {
    source: S,
    /// Spelling of the token being scanned.
    spelling: String,
    tokens: &'tok mut Vec<Token>,
    reporter: &'rep mut Reporter,
}

impl<S: CharSource> Lexer<'_, '_, S> {
    /// Scans the source until the input is exhausted.
    fn lex(mut self) {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        loop {
            self.skip_separators();
            let position = self.source.position();
            self.spelling.clear();
            let kind = self.scan_token_kind();
            let is_eof = kind == TokenKind::EndOfText;
            self.produce(kind, position);
            if is_eof {
                break;
            }
        }
    }

    /// Skips whitespace and `#` comments, which run up to the end of the line.
    fn skip_separators(&mut self) {
        loop {
            match self.source.current() {
                '#' => self.source.skip_line(),
                c if is_whitespace(c) => self.source.advance(),
                _ => break,
            }
        }
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> TokenKind {
        use TokenKind::*;
        match self.source.current() {
            END_OF_INPUT => EndOfText,
            '+' | '-' | '*' | '/' | '<' | '>' | '=' | '!' => self.take_with(Operator),
            ':' => {
                self.take();
                match self.source.current() {
                    '=' => self.take_with(Becomes),
                    _ => Colon,
                }
            }
            ';' => self.take_with(Semicolon),
            '~' => self.take_with(Is),
            '(' => self.take_with(LeftBracket),
            ')' => self.take_with(RightBracket),
            '\'' => self.char_literal(),
            c if is_letter(c) => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.int_literal(),
            _ => self.take_with(ErrorUnknownInput),
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_suffix = |c: char| is_letter(c) || c.is_ascii_digit();

        while valid_identifier_suffix(self.source.current()) {
            self.take();
        }
        KEYWORDS
            .get(self.spelling.as_str())
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    /// A leading zero is a complete literal on its own, so `007` is scanned as
    /// three literals.
    fn int_literal(&mut self) -> TokenKind {
        if self.take() == '0' {
            return TokenKind::IntLiteral;
        }
        while self.source.current().is_ascii_digit() {
            self.take();
        }
        TokenKind::IntLiteral
    }

    fn char_literal(&mut self) -> TokenKind {
        assert_eq!(self.take(), '\'');
        if !is_graphic(self.source.current()) {
            return TokenKind::ErrorUnacceptableSequence;
        }
        self.take();
        match self.source.current() {
            '\'' => self.take_with(TokenKind::CharLiteral),
            _ => TokenKind::ErrorUnacceptableSequence,
        }
    }
}

impl<S: CharSource> Lexer<'_, '_, S> {
    /// Constructs a new lexer with the default state.
    fn new<'tok, 'rep>(
        source: S,
        tokens: &'tok mut Vec<Token>,
        reporter: &'rep mut Reporter,
    ) -> Lexer<'tok, 'rep, S> {
        Lexer {
            source,
            spelling: String::with_capacity(32),
            tokens,
            reporter,
        }
    }

    /// Appends the current character to the spelling and advances, returning
    /// the taken character.
    fn take(&mut self) -> char {
        let c = self.source.current();
        self.spelling.push(c);
        self.source.advance();
        c
    }

    /// Takes the current character and returns the provided value.
    fn take_with<T>(&mut self, value: T) -> T {
        self.take();
        value
    }

    /// Produces a token spelled with the taken characters.
    fn produce(&mut self, kind: TokenKind, position: Position) {
        let token = Token::new(kind, self.spelling.as_str(), position);
        trace!("scanned {token}");
        match kind {
            TokenKind::ErrorUnknownInput => {
                let c = token.spelling.chars().next().unwrap_or(END_OF_INPUT);
                self.reporter.report(position, Error::UnknownInput(c));
            }
            TokenKind::ErrorUnacceptableSequence => {
                let error = Error::UnacceptableSequence(token.spelling.clone());
                self.reporter.report(position, error);
            }
            _ => {}
        }
        self.tokens.push(token);
    }
}

fn is_letter(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Characters allowed inside a character literal.
fn is_graphic(c: char) -> bool {
    c.is_alphabetic() || c.is_ascii_digit() || matches!(c, '.' | '?') || is_whitespace(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_demo_programs_no_errors() {
        for input in [
            include_str!("../demos/factorial.tri"),
            include_str!("../demos/big.tri"),
        ] {
            let mut reporter = Reporter::new();
            let has_errors = lex_in_new(input, &mut reporter)
                .into_iter()
                .any(|t| t.kind.is_error());
            assert!(!has_errors);
            assert!(!reporter.has_errors());
        }
    }

    #[test]
    fn tests_with_position() {
        use TokenKind::*;
        let cases = cases!(match .. {
            "+-*/<>=!" => [
                (Operator, "+", (1, 1)),
                (Operator, "-", (1, 2)),
                (Operator, "*", (1, 3)),
                (Operator, "/", (1, 4)),
                (Operator, "<", (1, 5)),
                (Operator, ">", (1, 6)),
                (Operator, "=", (1, 7)),
                (Operator, "!", (1, 8)),
                (EndOfText, "", (1, 9)),
            ],
            "x := y; z : w ~" => [
                (Identifier, "x", (1, 1)),
                (Becomes, ":=", (1, 3)),
                (Identifier, "y", (1, 6)),
                (Semicolon, ";", (1, 7)),
                (Identifier, "z", (1, 9)),
                (Colon, ":", (1, 11)),
                (Identifier, "w", (1, 13)),
                (Is, "~", (1, 15)),
                (EndOfText, "", (1, 16)),
            ],
            "if then else endif While endIF" => [
                (If, "if", (1, 1)),
                (Then, "then", (1, 4)),
                (Else, "else", (1, 9)),
                (EndIf, "endif", (1, 14)),
                (Identifier, "While", (1, 20)),
                (Identifier, "endIF", (1, 26)),
                (EndOfText, "", (1, 31)),
            ],
            "f _fo foo_1 B2 ifx" => [
                (Identifier, "f", (1, 1)),
                (Identifier, "_fo", (1, 3)),
                (Identifier, "foo_1", (1, 7)),
                (Identifier, "B2", (1, 13)),
                (Identifier, "ifx", (1, 16)),
                (EndOfText, "", (1, 19)),
            ],
            "1 12 007 0" => [
                (IntLiteral, "1", (1, 1)),
                (IntLiteral, "12", (1, 3)),
                (IntLiteral, "0", (1, 6)),
                (IntLiteral, "0", (1, 7)),
                (IntLiteral, "7", (1, 8)),
                (IntLiteral, "0", (1, 10)),
                (EndOfText, "", (1, 11)),
            ],
            "'a' '7' '.' ' ' '?'" => [
                (CharLiteral, "'a'", (1, 1)),
                (CharLiteral, "'7'", (1, 5)),
                (CharLiteral, "'.'", (1, 9)),
                (CharLiteral, "' '", (1, 13)),
                (CharLiteral, "'?'", (1, 17)),
                (EndOfText, "", (1, 20)),
            ],
            "'ab' ';'" => [
                (ErrorUnacceptableSequence, "'a", (1, 1)),
                (Identifier, "b", (1, 3)),
                (CharLiteral, "' '", (1, 4)),
                (Semicolon, ";", (1, 7)),
                (ErrorUnacceptableSequence, "'", (1, 8)),
                (EndOfText, "", (1, 9)),
            ],
            "x # a comment := ;\n  (y) # another" => [
                (Identifier, "x", (1, 1)),
                (LeftBracket, "(", (2, 3)),
                (Identifier, "y", (2, 4)),
                (RightBracket, ")", (2, 5)),
                (EndOfText, "", (2, 16)),
            ],
            "a $ b" => [
                (Identifier, "a", (1, 1)),
                (ErrorUnknownInput, "$", (1, 3)),
                (Identifier, "b", (1, 5)),
                (EndOfText, "", (1, 6)),
            ],
            "" => [(EndOfText, "", (1, 1))],
        });

        for (input, tokens) in cases {
            let mut reporter = Reporter::new();
            let lexed = lex_in_new(input, &mut reporter);
            assert_eq!(lexed, tokens.as_slice(), "input: {input:?}");
        }
    }

    #[test]
    fn error_tokens_are_reported_and_scanning_continues() {
        let mut reporter = Reporter::new();
        let tokens = lex_in_new("x := $ 1 ; 'ab'", &mut reporter);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::EndOfText));
        assert_eq!(
            reporter.format(),
            [
                "1:6: unknown input '$'",
                "1:12: unacceptable character literal `'a`",
                "1:15: unacceptable character literal `'`",
            ]
        );
    }

    #[test]
    fn keywords_never_lex_as_identifiers() {
        for (spelling, kind) in &KEYWORDS {
            let mut reporter = Reporter::new();
            let tokens = lex_in_new(spelling, &mut reporter);
            assert_eq!(tokens[0].kind, *kind);
            assert_eq!(&*tokens[0].spelling, *spelling);
        }
    }

    #[test]
    fn identifiers_relex_to_themselves() {
        for spelling in ["x", "_", "abc_123", "Integer", "putint", "thenx", "élan"] {
            let mut reporter = Reporter::new();
            let tokens = lex_in_new(spelling, &mut reporter);
            assert_eq!(tokens.len(), 2);
            assert_eq!(tokens[0].kind, TokenKind::Identifier);
            let relexed = lex_in_new(&tokens[0].spelling, &mut reporter);
            assert_eq!(relexed[0], tokens[0]);
        }
    }

    macro_rules! cases {
        (match .. {
            $($str:expr => [$(($kind:expr, $spelling:expr, ($line:expr, $col:expr))),* $(,)?]),* $(,)?
        }) => {{
            &[$((
                $str,
                vec![
                    $(Token::new($kind, $spelling, Position::new($line, $col))),*
                ],
            )),*]
        }};
    }
    use cases;
}
