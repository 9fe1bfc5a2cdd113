//! Single-pass byte scanner for TotalScript source files.
//!
//! Produces a finite stream of [`Token`]s. Whitespace is insignificant and
//! separates tokens; `#` starts a line comment, `###` ... `###` is a
//! balanced (non-nesting) block comment. Once the source is exhausted the
//! lexer yields `Eof` tokens forever.

mod cursor;
pub mod token;

pub use token::{lookup_keyword, Token, TokenKind};

use cursor::Cursor;

pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    emitted_eof: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self { cursor: Cursor::new(source), emitted_eof: false }
    }

    /// Tokenize the entire source, including the trailing `Eof` token.
    pub fn tokenize(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Produce the next token. Returns `Eof` forever once the source is
    /// exhausted.
    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let (line, column) = (self.cursor.line(), self.cursor.column());

        let Some(c) = self.cursor.peek() else {
            self.emitted_eof = true;
            return Token::new(TokenKind::Eof, "", line, column);
        };

        if c.is_ascii_digit() {
            return self.lex_number(line, column);
        }
        if is_ident_start(c) {
            return self.lex_ident(line, column);
        }
        if c == '"' {
            return self.lex_string(line, column);
        }

        self.lex_operator(line, column)
    }

    /// Skip whitespace and comments. May loop: a comment can be followed by
    /// more whitespace/comments.
    fn skip_trivia(&mut self) {
        loop {
            self.cursor.eat_while(|c| c.is_whitespace());
            match self.cursor.peek() {
                Some('#') if self.cursor.peek_next() == Some('#') => {
                    if self.try_skip_block_comment() {
                        continue;
                    }
                    self.skip_line_comment();
                    continue;
                }
                Some('#') => {
                    self.skip_line_comment();
                    continue;
                }
                _ => break,
            }
        }
    }

    /// Attempts to skip a `###` ... `###` block comment starting at the
    /// current position. Returns `false` (consuming nothing) if the current
    /// position is not the start of a well-formed `###` marker, so the
    /// caller can fall back to treating it as a line comment.
    fn try_skip_block_comment(&mut self) -> bool {
        if !self.at_triple_hash() {
            return false;
        }
        self.advance_n(3);
        while !self.cursor.is_eof() && !self.at_triple_hash() {
            self.cursor.advance();
        }
        if !self.cursor.is_eof() {
            self.advance_n(3);
        }
        true
    }

    fn at_triple_hash(&self) -> bool {
        let mut probe = self.cursor.clone();
        for _ in 0..3 {
            if probe.advance() != Some('#') {
                return false;
            }
        }
        true
    }

    fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            self.cursor.advance();
        }
    }

    fn skip_line_comment(&mut self) {
        self.cursor.eat_while(|c| c != '\n');
    }

    fn lex_number(&mut self, line: u32, column: u32) -> Token {
        let mut literal = String::new();
        while let Some(c) = self.cursor.peek() {
            if c.is_ascii_digit() {
                literal.push(c);
                self.cursor.advance();
            } else {
                break;
            }
        }
        // A trailing '.' only joins the number if followed by a digit.
        if self.cursor.peek() == Some('.') {
            if let Some(next) = self.cursor.peek_next() {
                if next.is_ascii_digit() {
                    literal.push('.');
                    self.cursor.advance();
                    while let Some(c) = self.cursor.peek() {
                        if c.is_ascii_digit() {
                            literal.push(c);
                            self.cursor.advance();
                        } else {
                            break;
                        }
                    }
                    return Token::new(TokenKind::Float, literal, line, column);
                }
            }
        }
        Token::new(TokenKind::Integer, literal, line, column)
    }

    fn lex_ident(&mut self, line: u32, column: u32) -> Token {
        let mut literal = String::new();
        while let Some(c) = self.cursor.peek() {
            if is_ident_continue(c) {
                literal.push(c);
                self.cursor.advance();
            } else {
                break;
            }
        }
        let kind = lookup_keyword(&literal).unwrap_or(TokenKind::Ident);
        Token::new(kind, literal, line, column)
    }

    fn lex_string(&mut self, line: u32, column: u32) -> Token {
        self.cursor.advance(); // opening quote
        let mut literal = String::new();
        loop {
            match self.cursor.peek() {
                None => break,
                Some('"') => {
                    self.cursor.advance();
                    break;
                }
                Some('\\') => {
                    self.cursor.advance();
                    match self.cursor.peek() {
                        Some('n') => {
                            literal.push('\n');
                            self.cursor.advance();
                        }
                        Some('t') => {
                            literal.push('\t');
                            self.cursor.advance();
                        }
                        Some('r') => {
                            literal.push('\r');
                            self.cursor.advance();
                        }
                        Some('\\') => {
                            literal.push('\\');
                            self.cursor.advance();
                        }
                        Some('"') => {
                            literal.push('"');
                            self.cursor.advance();
                        }
                        Some(other) => {
                            literal.push('\\');
                            literal.push(other);
                            self.cursor.advance();
                        }
                        None => literal.push('\\'),
                    }
                }
                Some(c) => {
                    literal.push(c);
                    self.cursor.advance();
                }
            }
        }
        Token::new(TokenKind::String, literal, line, column)
    }

    fn lex_operator(&mut self, line: u32, column: u32) -> Token {
        use TokenKind::*;
        let c = self.cursor.advance().unwrap();
        let kind = match c {
            '(' => LParen,
            ')' => RParen,
            '[' => LBracket,
            ']' => RBracket,
            '{' => LBrace,
            '}' => RBrace,
            ',' => Comma,
            ';' => Semicolon,
            ':' => Colon,
            '?' => Question,
            '=' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.advance();
                    Eq
                } else {
                    Assign
                }
            }
            '!' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.advance();
                    NotEq
                } else {
                    Bang
                }
            }
            '<' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.advance();
                    LtEq
                } else {
                    Lt
                }
            }
            '>' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.advance();
                    GtEq
                } else {
                    Gt
                }
            }
            '&' => {
                if self.cursor.peek() == Some('&') {
                    self.cursor.advance();
                    And
                } else {
                    return Token::new(Illegal, "&", line, column);
                }
            }
            '|' => {
                if self.cursor.peek() == Some('|') {
                    self.cursor.advance();
                    Or
                } else {
                    Pipe
                }
            }
            '+' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.advance();
                    PlusAssign
                } else {
                    Plus
                }
            }
            '-' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.advance();
                    MinusAssign
                } else {
                    Minus
                }
            }
            '*' => {
                if self.cursor.peek() == Some('*') {
                    self.cursor.advance();
                    StarStar
                } else if self.cursor.peek() == Some('=') {
                    self.cursor.advance();
                    StarAssign
                } else {
                    Star
                }
            }
            '/' => {
                if self.cursor.peek() == Some('/') {
                    self.cursor.advance();
                    SlashSlash
                } else if self.cursor.peek() == Some('=') {
                    self.cursor.advance();
                    SlashAssign
                } else {
                    Slash
                }
            }
            '%' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.advance();
                    PercentAssign
                } else {
                    Percent
                }
            }
            '.' => {
                if self.cursor.peek() == Some('.') {
                    self.cursor.advance();
                    if self.cursor.peek() == Some('=') {
                        self.cursor.advance();
                        DotDotEq
                    } else {
                        DotDot
                    }
                } else {
                    Dot
                }
            }
            other => {
                return Token::new(Illegal, other.to_string(), line, column);
            }
        };
        let literal = operator_literal(kind);
        Token::new(kind, literal, line, column)
    }
}

fn operator_literal(kind: TokenKind) -> &'static str {
    use TokenKind::*;
    match kind {
        LParen => "(",
        RParen => ")",
        LBracket => "[",
        RBracket => "]",
        LBrace => "{",
        RBrace => "}",
        Comma => ",",
        Semicolon => ";",
        Colon => ":",
        Question => "?",
        Assign => "=",
        Eq => "==",
        Bang => "!",
        NotEq => "!=",
        Lt => "<",
        LtEq => "<=",
        Gt => ">",
        GtEq => ">=",
        And => "&&",
        Or => "||",
        Pipe => "|",
        Plus => "+",
        PlusAssign => "+=",
        Minus => "-",
        MinusAssign => "-=",
        Star => "*",
        StarStar => "**",
        StarAssign => "*=",
        Slash => "/",
        SlashSlash => "//",
        SlashAssign => "/=",
        Percent => "%",
        PercentAssign => "%=",
        Dot => ".",
        DotDot => "..",
        DotDotEq => "..=",
        _ => "",
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_keywords_and_idents() {
        assert_eq!(
            kinds("var x = 1"),
            vec![TokenKind::Var, TokenKind::Ident, TokenKind::Assign, TokenKind::Integer, TokenKind::Eof]
        );
    }

    #[test]
    fn trailing_dot_is_not_part_of_integer() {
        let tokens = Lexer::tokenize("42.");
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(tokens[0].literal, "42");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
    }

    #[test]
    fn float_literal() {
        let tokens = Lexer::tokenize("3.14");
        assert_eq!(tokens[0].kind, TokenKind::Float);
        assert_eq!(tokens[0].literal, "3.14");
    }

    #[test]
    fn string_with_escapes() {
        let tokens = Lexer::tokenize("\"a\\nb\\tc\\\"d\"");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].literal, "a\nb\tc\"d");
    }

    #[test]
    fn unknown_escape_is_preserved() {
        let tokens = Lexer::tokenize("\"\\q\"");
        assert_eq!(tokens[0].literal, "\\q");
    }

    #[test]
    fn line_comment_is_stripped() {
        let tokens = Lexer::tokenize("var x # comment\nvar y");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Var, TokenKind::Ident, TokenKind::Var, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn block_comment_is_stripped() {
        let tokens = Lexer::tokenize("var x ### this\nis a\nblock ### var y");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Var, TokenKind::Ident, TokenKind::Var, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn greedy_operator_matching() {
        assert_eq!(kinds("..="), vec![TokenKind::DotDotEq, TokenKind::Eof]);
        assert_eq!(kinds(".."), vec![TokenKind::DotDot, TokenKind::Eof]);
        assert_eq!(kinds("**"), vec![TokenKind::StarStar, TokenKind::Eof]);
        assert_eq!(kinds("*="), vec![TokenKind::StarAssign, TokenKind::Eof]);
        assert_eq!(kinds("//"), vec![TokenKind::SlashSlash, TokenKind::Eof]);
    }

    #[test]
    fn eof_repeats() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn illegal_byte() {
        let tokens = Lexer::tokenize("@");
        assert_eq!(tokens[0].kind, TokenKind::Illegal);
    }

    #[test]
    fn line_and_column_tracking() {
        let tokens = Lexer::tokenize("var\nx");
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 1));
    }
}
