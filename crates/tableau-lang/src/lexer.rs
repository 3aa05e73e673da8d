use std::str::Chars;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Max,
    Min,

    // Literals
    /// `X` followed by an index, e.g. `X12`
    Var,
    /// Unsigned decimal, e.g. `3`, `1.5`, `.25`
    Number,
    Ident,

    // Operators
    Plus,
    Minus,
    Le,
    Ge,
    Eq,
    EqEq,

    // Special
    Newline,
    Eof,
    Error,
}

impl TokenKind {
    pub fn is_relation(self) -> bool {
        matches!(self, TokenKind::Le | TokenKind::Ge | TokenKind::Eq | TokenKind::EqEq)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, text: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            text: text.into(),
        }
    }
}

/// Lexer for the model notation. Case-insensitive; spaces and tabs are skipped.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Chars<'a>,
    pos: usize,
    current: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            source,
            chars,
            pos: 0,
            current,
        }
    }

    pub fn tokenize(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current;
        self.current = self.chars.next();
        if let Some(c) = c {
            self.pos += c.len_utf8();
        }
        c
    }

    fn peek(&self) -> Option<char> {
        self.current
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c != '\n' && c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn token_from(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, Span::new(start, self.pos), &self.source[start..self.pos])
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        // Fractional part, a trailing dot is allowed (`5.`)
        if self.peek() == Some('.') {
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        self.token_from(TokenKind::Number, start)
    }

    fn read_word(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.source[start..self.pos];
        let kind = if text.eq_ignore_ascii_case("maxz") {
            TokenKind::Max
        } else if text.eq_ignore_ascii_case("minz") {
            TokenKind::Min
        } else if is_variable_name(text) {
            TokenKind::Var
        } else {
            TokenKind::Ident
        };
        self.token_from(kind, start)
    }

    /// `<` and `>` are only valid when followed by `=`.
    fn read_relation(&mut self, kind: TokenKind) -> Token {
        let start = self.pos;
        self.advance();
        if self.peek() == Some('=') {
            self.advance();
            self.token_from(kind, start)
        } else {
            self.token_from(TokenKind::Error, start)
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos;

        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, Span::new(start, start), "");
        };

        match c {
            '\n' => {
                self.advance();
                Token::new(TokenKind::Newline, Span::new(start, self.pos), "\n")
            }
            '+' => {
                self.advance();
                self.token_from(TokenKind::Plus, start)
            }
            '-' => {
                self.advance();
                self.token_from(TokenKind::Minus, start)
            }
            '<' => self.read_relation(TokenKind::Le),
            '>' => self.read_relation(TokenKind::Ge),
            '=' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    self.token_from(TokenKind::EqEq, start)
                } else {
                    self.token_from(TokenKind::Eq, start)
                }
            }
            '.' if self.peek_next().is_some_and(|n| n.is_ascii_digit()) => self.read_number(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_alphabetic() || c == '_' => self.read_word(),
            _ => {
                self.advance();
                self.token_from(TokenKind::Error, start)
            }
        }
    }
}

/// `X` (either case) followed by one or more ASCII digits.
fn is_variable_name(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some('X' | 'x'))
        && !chars.as_str().is_empty()
        && chars.all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_objective_line() {
        assert_eq!(
            kinds("MAXZ=3X1+5X2"),
            vec![
                TokenKind::Max,
                TokenKind::Eq,
                TokenKind::Number,
                TokenKind::Var,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::Var,
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("minz = -x1")[0], TokenKind::Min);
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::tokenize("100 8.5 .25 5. 0.005");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["100", "8.5", ".25", "5.", "0.005", ""]);
        assert!(tokens[..5].iter().all(|t| t.kind == TokenKind::Number));
    }

    #[test]
    fn test_relations() {
        assert_eq!(
            kinds("<= >= = =="),
            vec![
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Eq,
                TokenKind::EqEq,
                TokenKind::Eof,
            ]
        );
        assert!(kinds("<= >= = ==").iter().filter(|k| k.is_relation()).count() == 4);
    }

    #[test]
    fn test_lone_angle_bracket_is_error() {
        let tokens = Lexer::tokenize("X1<4");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].text, "<");
    }

    #[test]
    fn test_variable_names() {
        assert_eq!(
            kinds("X1 x23 X Y1 X1A"),
            vec![
                TokenKind::Var,
                TokenKind::Var,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_spans_and_newlines() {
        let tokens = Lexer::tokenize("X1 <= 4\n2X2>=-1");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Var,
                TokenKind::Le,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::Number,
                TokenKind::Var,
                TokenKind::Ge,
                TokenKind::Minus,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[1].span, Span::new(3, 5));
        assert_eq!(tokens[0].span.merge(tokens[2].span), Span::new(0, 7));
    }
}
