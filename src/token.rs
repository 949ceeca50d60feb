use crate::stream::Position;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: Rc<str>,
    pub pos: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<Rc<str>>, pos: Position) -> Self {
        Token {
            kind,
            text: text.into(),
            pos,
        }
    }

    /// True for table-spelled tokens (operators, punctuators, keywords) with exactly this spelling.
    pub fn is(&self, spelling: &str) -> bool {
        matches!(
            self.kind,
            TokenKind::BinaryOp | TokenKind::UnaryOp | TokenKind::Keyword | TokenKind::Punctuator
        ) && &*self.text == spelling
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    BinaryOp,
    UnaryOp,
    Keyword,
    String,
    Number,
    Comment,
    Punctuator,
}

/// What a spelling in [`SPELLINGS`] starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lexeme {
    Kind(TokenKind),
    Quote,
    LineComment,
    BlockComment,
}

const PUNCT: Lexeme = Lexeme::Kind(TokenKind::Punctuator);
const BINARY: Lexeme = Lexeme::Kind(TokenKind::BinaryOp);
const UNARY: Lexeme = Lexeme::Kind(TokenKind::UnaryOp);
const KEYWORD: Lexeme = Lexeme::Kind(TokenKind::Keyword);

/// Every fixed spelling the scanner recognizes. Matched by maximal munch.
pub const SPELLINGS: &[(&str, Lexeme)] = &[
    (",", PUNCT),
    (";", PUNCT),
    ("{", PUNCT),
    ("}", PUNCT),
    ("(", PUNCT),
    (")", PUNCT),
    ("[", PUNCT),
    ("]", PUNCT),
    (":", PUNCT),
    (".", BINARY),
    ("+", BINARY),
    ("-", BINARY),
    ("*", BINARY),
    ("**", BINARY),
    ("/", BINARY),
    ("%", BINARY),
    ("=", BINARY),
    ("+=", BINARY),
    ("-=", BINARY),
    ("*=", BINARY),
    ("/=", BINARY),
    ("%=", BINARY),
    ("==", BINARY),
    ("===", BINARY),
    ("!=", BINARY),
    ("!==", BINARY),
    ("<", BINARY),
    (">", BINARY),
    ("<=", BINARY),
    (">=", BINARY),
    ("||", BINARY),
    ("&&", BINARY),
    ("<<", BINARY),
    (">>", BINARY),
    (">>>", BINARY),
    ("^", BINARY),
    ("|", BINARY),
    ("&", BINARY),
    ("~", UNARY),
    ("!", UNARY),
    ("++", UNARY),
    ("--", UNARY),
    ("\"", Lexeme::Quote),
    ("'", Lexeme::Quote),
    ("//", Lexeme::LineComment),
    ("/*", Lexeme::BlockComment),
    ("break", KEYWORD),
    ("case", KEYWORD),
    ("continue", KEYWORD),
    ("default", KEYWORD),
    ("do", KEYWORD),
    ("else", KEYWORD),
    ("for", KEYWORD),
    ("function", KEYWORD),
    ("if", KEYWORD),
    ("new", KEYWORD),
    ("return", KEYWORD),
    ("switch", KEYWORD),
    ("this", KEYWORD),
    ("var", KEYWORD),
    ("while", KEYWORD),
    ("true", KEYWORD),
    ("false", KEYWORD),
    ("null", KEYWORD),
    ("undefined", KEYWORD),
    // Reserved, rejected by the parser.
    ("catch", KEYWORD),
    ("class", KEYWORD),
    ("const", KEYWORD),
    ("delete", KEYWORD),
    ("finally", KEYWORD),
    ("in", KEYWORD),
    ("instanceof", KEYWORD),
    ("throw", KEYWORD),
    ("try", KEYWORD),
    ("typeof", KEYWORD),
    ("void", KEYWORD),
    ("with", KEYWORD),
    ("yield", KEYWORD),
];

pub fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
