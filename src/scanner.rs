use crate::stream::{CharStream, Position};
use crate::token::{is_identifier_char, Lexeme, Token, TokenKind, SPELLINGS};
use std::rc::Rc;
use thiserror::Error;
use tracing::{trace, warn};

/// Non-fatal scanner diagnostics. Scanning always runs to the end of input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("[{0}] unterminated string")]
    UnterminatedString(Position),
    #[error("[{0}] unterminated block comment")]
    UnterminatedComment(Position),
    #[error("[{pos}] unrecognized input {text:?}, treated as an identifier")]
    LexicalAmbiguity { text: String, pos: Position },
}

// Characters that end a number. `-` is decided in `number`, after an exponent it continues one.
const NUMBER_TERMINATORS: &[char] = &[
    '+', '*', '/', '%', '=', '<', '>', '|', '&', '!', '^', '~', '(', ')', '{', '}', '[', ']', ';',
    ',', ':', '"', '\'',
];

struct Scanner<'a> {
    stream: CharStream<'a>,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Scanner<'a> {
    fn new(chars: &'a [char]) -> Self {
        Self {
            stream: CharStream::new(chars),
            tokens: vec![],
            errors: vec![],
        }
    }

    fn report_error(&mut self, err: LexError) {
        warn!("{err}");
        self.errors.push(err);
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<Rc<str>>, pos: Position) {
        let token = Token::new(kind, text, pos);
        trace!(kind = ?token.kind, text = &*token.text, %pos, "token");
        self.tokens.push(token);
    }

    fn skip_whitespace(&mut self) {
        while self.stream.peek().is_some_and(char::is_whitespace) {
            self.stream.next();
        }
    }

    /// Longest table spelling starting at the cursor.
    ///
    /// Extends one character at a time while some spelling still has the working text as a
    /// prefix, then rewinds to the end of the longest complete spelling. Keywords glued to
    /// identifier characters on either side are rejected so `forever` stays one identifier.
    fn munch(&mut self) -> Option<(&'static str, Lexeme)> {
        let start = self.stream.save();
        let mut working = String::new();
        let mut consumed = 0;
        let mut longest = None;
        let mut longest_len = 0;

        while let Some(c) = self.stream.next() {
            working.push(c);
            consumed += 1;
            let candidates = SPELLINGS
                .iter()
                .filter(|(spelling, _)| spelling.starts_with(working.as_str()))
                .count();
            if candidates == 0 {
                self.stream.back();
                consumed -= 1;
                break;
            }
            if let Some(&(spelling, lexeme)) = SPELLINGS.iter().find(|(s, _)| *s == working) {
                longest = Some((spelling, lexeme));
                longest_len = consumed;
                if candidates == 1 {
                    break;
                }
            }
        }

        let Some((spelling, lexeme)) = longest else {
            self.stream.restore();
            return None;
        };
        for _ in longest_len..consumed {
            self.stream.back();
        }

        if lexeme == Lexeme::Kind(TokenKind::Keyword) {
            let before = start.checked_sub(1).and_then(|i| self.stream.char_at(i));
            let after = self.stream.peek();
            if before.is_some_and(is_identifier_char) || after.is_some_and(is_identifier_char) {
                trace!(spelling, "not a keyword here");
                self.stream.restore();
                return None;
            }
        }

        Some((spelling, lexeme))
    }

    fn number(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.stream.peek() {
            if c.is_whitespace() {
                break;
            }
            if c == '-' {
                let hex = text.starts_with("0x") || text.starts_with("0X");
                if hex || !text.ends_with(|e| e == 'e' || e == 'E') {
                    break;
                }
            } else if NUMBER_TERMINATORS.contains(&c) {
                break;
            }
            self.stream.next();
            text.push(c);
        }
        text
    }

    fn string(&mut self, open: &str, pos: Position) -> String {
        let mut text = String::from(open);
        loop {
            match self.stream.next() {
                None => {
                    self.report_error(LexError::UnterminatedString(pos));
                    break;
                }
                Some('\\') => {
                    text.push('\\');
                    if let Some(escaped) = self.stream.next() {
                        text.push(escaped);
                    }
                }
                Some(c) => {
                    text.push(c);
                    if open.starts_with(c) {
                        break;
                    }
                }
            }
        }
        text
    }

    fn line_comment(&mut self) -> String {
        let mut text = String::from("//");
        while let Some(c) = self.stream.peek() {
            if c == '\n' {
                break;
            }
            self.stream.next();
            text.push(c);
            if c == '\\' {
                if let Some(escaped) = self.stream.next() {
                    text.push(escaped);
                }
            }
        }
        text
    }

    fn block_comment(&mut self, pos: Position) -> String {
        let mut text = String::from("/*");
        loop {
            match self.stream.next() {
                None => {
                    self.report_error(LexError::UnterminatedComment(pos));
                    break;
                }
                Some('\\') => {
                    text.push('\\');
                    if let Some(escaped) = self.stream.next() {
                        text.push(escaped);
                    }
                }
                Some('*') if self.stream.peek() == Some('/') => {
                    self.stream.next();
                    text.push_str("*/");
                    break;
                }
                Some(c) => text.push(c),
            }
        }
        text
    }

    fn identifier(&mut self, pos: Position) -> String {
        let mut text = String::new();
        while let Some(c) = self.stream.peek().filter(|c| is_identifier_char(*c)) {
            self.stream.next();
            text.push(c);
        }
        if text.is_empty() {
            // Nothing in the table starts here either. Take one character and keep going.
            if let Some(c) = self.stream.next() {
                text.push(c);
            }
            self.report_error(LexError::LexicalAmbiguity {
                text: text.clone(),
                pos,
            });
        }
        text
    }
}

/// Tokenizes `code` completely. Comment tokens are kept; see [`strip_comments`].
pub fn scan(code: &str) -> (Vec<Token>, Vec<LexError>) {
    let chars = code.chars().collect::<Vec<_>>();
    let mut scanner = Scanner::new(&chars);

    loop {
        scanner.skip_whitespace();
        let Some(c) = scanner.stream.peek() else {
            return (scanner.tokens, scanner.errors);
        };
        let pos = scanner.stream.position();

        if c.is_ascii_digit() {
            let text = scanner.number();
            scanner.push(TokenKind::Number, text, pos);
            continue;
        }

        match scanner.munch() {
            Some((open, Lexeme::Quote)) => {
                let text = scanner.string(open, pos);
                scanner.push(TokenKind::String, text, pos);
            }
            Some((_, Lexeme::LineComment)) => {
                let text = scanner.line_comment();
                scanner.push(TokenKind::Comment, text, pos);
            }
            Some((_, Lexeme::BlockComment)) => {
                let text = scanner.block_comment(pos);
                scanner.push(TokenKind::Comment, text, pos);
            }
            Some((spelling, Lexeme::Kind(kind))) => scanner.push(kind, spelling, pos),
            None => {
                let text = scanner.identifier(pos);
                scanner.push(TokenKind::Identifier, text, pos);
            }
        }
    }
}

pub fn strip_comments(tokens: &mut Vec<Token>) {
    tokens.retain(|token| token.kind != TokenKind::Comment);
}
