use crate::node::{Arms, CaseLabel, Node};
use crate::ops::{BinaryOp, Fixity, UnaryOp, MEMBER_PRECEDENCE};
use crate::stream::{Position, Stream};
use crate::token::{is_identifier_char, Token, TokenKind};
use std::{
    fmt::{self, Display},
    rc::Rc,
};
use thiserror::Error;
use tracing::trace;

type NodeResult = Result<Node, SyntaxError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    #[error("unexpected {0}")]
    UnexpectedToken(Rc<str>),
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("expected `{expected}` but found {found}")]
    ExpectedToken {
        expected: &'static str,
        found: Rc<str>,
    },
    #[error("expected an identifier but found {0}")]
    ExpectedIdentifier(Rc<str>),
    #[error("case label must be a number, string or boolean literal, found {0}")]
    NonStaticCase(Rc<str>),
    #[error("switch has more than one `default`")]
    DuplicateDefault,
    #[error("malformed number `{0}`")]
    InvalidNumber(Rc<str>),
    #[error("`var` takes names with optional `= value` initializers")]
    InvalidDeclaration,
    #[error("`for` needs three clauses but has {0}")]
    MalformedFor(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub pos: Option<Position>,
}

impl SyntaxError {
    fn new(kind: SyntaxErrorKind, pos: Option<Position>) -> Self {
        SyntaxError { kind, pos }
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pos) = &self.pos {
            write!(f, "[{pos}] ")?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for SyntaxError {}

fn describe(token: Option<&Token>) -> Rc<str> {
    match token {
        Some(token) => format!("`{}`", token.text).into(),
        None => "end of input".into(),
    }
}

/// Which parts of a delimited list are mandatory.
#[derive(Debug, Clone, Copy)]
struct Delimit {
    open: bool,
    close: bool,
    separator: bool,
}

impl Delimit {
    const ALL: Delimit = Delimit {
        open: true,
        close: true,
        separator: true,
    };
}

pub struct Parser<'a> {
    tokens: Stream<'a, Token>,
}

impl<'a> Parser<'a> {
    /// `tokens` must already have comments stripped.
    pub fn new(tokens: &'a [Token]) -> Parser<'a> {
        Parser {
            tokens: Stream::new(tokens),
        }
    }

    pub fn parse(&mut self) -> NodeResult {
        let root = Delimit {
            open: false,
            close: false,
            separator: true,
        };
        let body = self.delimited("{", "}", ";", root, Self::expression)?;
        if let Some(token) = self.tokens.peek() {
            return Err(SyntaxError::new(
                SyntaxErrorKind::UnexpectedToken(describe(Some(token))),
                Some(token.pos),
            ));
        }
        Ok(Node::Program(body))
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.peek()
    }

    fn check(&self, spelling: &str) -> bool {
        self.peek().is_some_and(|t| t.is(spelling))
    }

    fn match_next(&mut self, spelling: &str) -> bool {
        let matched = self.check(spelling);
        if matched {
            self.tokens.next();
        }
        matched
    }

    /// Position of the next token, or of the last one at the end of input.
    fn here(&self) -> Option<Position> {
        self.peek().or_else(|| self.tokens.previous()).map(|t| t.pos)
    }

    fn expected(&self, spelling: &'static str) -> SyntaxError {
        SyntaxError::new(
            SyntaxErrorKind::ExpectedToken {
                expected: spelling,
                found: describe(self.peek()),
            },
            self.here(),
        )
    }

    fn consume(&mut self, spelling: &'static str) -> Result<&'a Token, SyntaxError> {
        match self.peek() {
            Some(token) if token.is(spelling) => {
                self.tokens.next();
                Ok(token)
            }
            _ => Err(self.expected(spelling)),
        }
    }

    fn advance(&mut self) -> Result<&'a Token, SyntaxError> {
        let token = self.tokens.next();
        token.ok_or_else(|| SyntaxError::new(SyntaxErrorKind::UnexpectedEnd, self.here()))
    }

    fn after_block(&self) -> bool {
        self.tokens.previous().is_some_and(|t| t.is("}"))
    }

    fn at_statement_end(&self) -> bool {
        self.peek().map_or(true, |t| t.is(";") || t.is("}"))
    }

    /// Consumes a `;` sitting between a statement and a continuation keyword such as `else`.
    fn skip_separator_before(&mut self, keyword: &str) {
        if self.check(";") && self.tokens.peek_nth(1).is_some_and(|t| t.is(keyword)) {
            self.tokens.next();
        }
    }

    /// Parses `open elem sep elem ... close`.
    ///
    /// A trailing separator before `close` is accepted. When the separator is `;`, a
    /// statement ending in `}` needs none. When `flags.separator` is false a missing
    /// separator ends the list instead of failing.
    fn delimited<T>(
        &mut self,
        open: &'static str,
        close: &'static str,
        separator: &'static str,
        flags: Delimit,
        mut element: impl FnMut(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<Vec<T>, SyntaxError> {
        if flags.open {
            self.consume(open)?;
        }
        let mut items = vec![];
        while !self.tokens.eof() && !self.check(close) {
            if !items.is_empty() {
                let separated = self.match_next(separator);
                if separated && self.check(close) {
                    break;
                }
                if !separated && !(separator == ";" && self.after_block()) {
                    if flags.separator {
                        return Err(self.expected(separator));
                    }
                    break;
                }
            }
            if self.tokens.eof() {
                break;
            }
            items.push(element(self)?);
        }
        if flags.close {
            self.consume(close)?;
        }
        Ok(items)
    }

    fn expression(&mut self) -> NodeResult {
        let left = self.statement()?;
        self.binary_op(left, 0)
    }

    /// Precedence climbing. Folds operators that bind tighter than `min_precedence` onto `left`.
    fn binary_op(&mut self, mut left: Node, min_precedence: u8) -> NodeResult {
        while let Some(op) = self.peek_binary_op() {
            let precedence = op.precedence();
            if precedence <= min_precedence {
                break;
            }
            self.tokens.next();

            if op == BinaryOp::Member {
                let name = self.member_key()?;
                let access = Node::Binary(op, Box::new(left), Box::new(Node::Identifier(name)));
                left = self.suffixes(access)?;
                continue;
            }

            // Assignment is right associative.
            let next_min = if op.is_assignment() {
                precedence - 1
            } else {
                precedence
            };
            let operand = self.statement()?;
            let right = self.binary_op(operand, next_min)?;
            left = Node::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        self.peek()
            .filter(|t| t.kind == TokenKind::BinaryOp)
            .and_then(|t| BinaryOp::from_spelling(&t.text))
    }

    /// A primary or statement form followed by any call and index suffixes.
    fn statement(&mut self) -> NodeResult {
        let node = self.form()?;
        self.suffixes(node)
    }

    /// Calls and indexing, then an optional postfix `++`/`--` on the whole.
    fn suffixes(&mut self, mut node: Node) -> NodeResult {
        loop {
            if self.check("(") {
                let args = self.delimited("(", ")", ",", Delimit::ALL, Self::expression)?;
                node = Node::Call(Box::new(node), args);
            } else if self.match_next("[") {
                let key = self.expression()?;
                self.consume("]")?;
                node = Node::Index(Box::new(node), Box::new(key));
            } else {
                break;
            }
        }
        let op = match self.peek() {
            Some(t) if t.is("++") => UnaryOp::Inc,
            Some(t) if t.is("--") => UnaryOp::Dec,
            _ => return Ok(node),
        };
        self.tokens.next();
        Ok(Node::Unary(op, Fixity::Postfix, Box::new(node)))
    }

    fn form(&mut self) -> NodeResult {
        let token = match self.peek() {
            Some(token) => token,
            None => return Err(SyntaxError::new(SyntaxErrorKind::UnexpectedEnd, self.here())),
        };
        trace!(token = &*token.text, pos = %token.pos, "form");
        let unexpected = || {
            SyntaxError::new(
                SyntaxErrorKind::UnexpectedToken(describe(Some(token))),
                Some(token.pos),
            )
        };

        match (token.kind, &*token.text) {
            (TokenKind::Punctuator, "(") => {
                self.tokens.next();
                let inner = self.expression()?;
                self.consume(")")?;
                Ok(inner)
            }
            (TokenKind::Punctuator, "{") => self.block(),
            (TokenKind::Keyword, "if") => self.if_else(),
            (TokenKind::Keyword, "function") => self.function(),
            (TokenKind::Keyword, "return") => {
                self.tokens.next();
                let value = if self.at_statement_end() {
                    Node::Undefined
                } else {
                    self.expression()?
                };
                Ok(Node::Return(Box::new(value)))
            }
            (TokenKind::Keyword, "var") => {
                let flags = Delimit {
                    open: true,
                    close: false,
                    separator: false,
                };
                let decls = self.delimited("var", ";", ",", flags, Self::declarator)?;
                Ok(Node::Declaration(decls))
            }
            (TokenKind::Keyword, "switch") => self.switch(),
            (TokenKind::Keyword, "for") => self.for_loop(),
            (TokenKind::Keyword, "while") => self.while_loop(),
            (TokenKind::Keyword, "do") => self.do_while(),
            (TokenKind::Keyword, "new") => {
                self.tokens.next();
                Ok(Node::New(Box::new(self.statement()?)))
            }
            (TokenKind::Keyword, keyword) => {
                let node = match keyword {
                    "break" => Node::Break,
                    "continue" => Node::Continue,
                    "true" => Node::Boolean(true),
                    "false" => Node::Boolean(false),
                    "null" => Node::Null,
                    "undefined" => Node::Undefined,
                    "this" => return self.variable(),
                    _ => return Err(unexpected()),
                };
                self.tokens.next();
                Ok(node)
            }
            (TokenKind::Identifier, text) => {
                if !text.starts_with(is_identifier_char) {
                    return Err(unexpected());
                }
                self.variable()
            }
            (TokenKind::Number, text) => {
                self.tokens.next();
                Node::number(text).ok_or_else(|| {
                    SyntaxError::new(SyntaxErrorKind::InvalidNumber(text.into()), Some(token.pos))
                })
            }
            (TokenKind::String, text) => {
                self.tokens.next();
                Ok(Node::string(text))
            }
            (TokenKind::BinaryOp, "-" | "+") | (TokenKind::UnaryOp, _) => self.prefix(),
            _ => Err(unexpected()),
        }
    }

    /// An identifier or `this`.
    fn variable(&mut self) -> NodeResult {
        let token = self.advance()?;
        Ok(Node::Identifier(token.text.clone()))
    }

    /// A prefix operator. Its operand absorbs member access but no other binary operator.
    fn prefix(&mut self) -> NodeResult {
        let token = self.advance()?;
        let op = UnaryOp::from_spelling(&token.text).ok_or_else(|| {
            SyntaxError::new(
                SyntaxErrorKind::UnexpectedToken(describe(Some(token))),
                Some(token.pos),
            )
        })?;
        let operand = self.statement()?;
        let operand = self.binary_op(operand, MEMBER_PRECEDENCE - 1)?;
        Ok(Node::Unary(op, Fixity::Prefix, Box::new(operand)))
    }

    fn var_name(&mut self) -> Result<Rc<str>, SyntaxError> {
        match self.peek() {
            Some(token)
                if token.kind == TokenKind::Identifier
                    && token.text.starts_with(is_identifier_char) =>
            {
                self.tokens.next();
                Ok(token.text.clone())
            }
            found => Err(SyntaxError::new(
                SyntaxErrorKind::ExpectedIdentifier(describe(found)),
                self.here(),
            )),
        }
    }

    /// The name after `.`, where keywords are plain property names.
    fn member_key(&mut self) -> Result<Rc<str>, SyntaxError> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Keyword => {
                self.tokens.next();
                Ok(token.text.clone())
            }
            _ => self.var_name(),
        }
    }

    fn declarator(&mut self) -> Result<(Rc<str>, Option<Node>), SyntaxError> {
        let pos = self.here();
        let invalid = || SyntaxError::new(SyntaxErrorKind::InvalidDeclaration, pos);
        match self.expression()? {
            Node::Identifier(id) => Ok((id, None)),
            Node::Binary(BinaryOp::Assign, target, init) => match *target {
                Node::Identifier(id) => Ok((id, Some(*init))),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }

    fn block(&mut self) -> NodeResult {
        let body = self.delimited("{", "}", ";", Delimit::ALL, Self::expression)?;
        Ok(Node::Program(body))
    }

    /// Body of a function, branch or loop: a block or a single expression.
    fn branch(&mut self) -> NodeResult {
        if self.check("{") {
            self.block()
        } else {
            self.expression()
        }
    }

    fn function(&mut self) -> NodeResult {
        self.consume("function")?;
        let name = match self.peek() {
            Some(t) if t.kind == TokenKind::Identifier => Some(self.var_name()?),
            _ => None,
        };
        let params = self.delimited("(", ")", ",", Delimit::ALL, Self::var_name)?;
        let body = self.branch()?;
        Ok(Node::Function(name, params.into(), Rc::new(body)))
    }

    /// A loop or branch condition. Parentheses end it, so `if (c) -1` has the body `-1`.
    fn condition(&mut self) -> NodeResult {
        if !self.match_next("(") {
            return self.expression();
        }
        let cond = self.expression()?;
        self.consume(")")?;
        Ok(cond)
    }

    fn if_else(&mut self) -> NodeResult {
        self.consume("if")?;
        let cond = self.condition()?;
        let then = self.branch()?;
        self.skip_separator_before("else");
        let otherwise = if self.match_next("else") {
            Some(Box::new(self.branch()?))
        } else {
            None
        };
        Ok(Node::IfElse(Box::new(cond), Box::new(then), otherwise))
    }

    fn for_loop(&mut self) -> NodeResult {
        let pos = self.here();
        self.consume("for")?;
        let header = self.delimited("(", ")", ";", Delimit::ALL, Self::expression)?;
        let count = header.len();
        let [init, cond, step] = <[Node; 3]>::try_from(header)
            .map_err(|_| SyntaxError::new(SyntaxErrorKind::MalformedFor(count), pos))?;
        let body = self.branch()?;
        Ok(Node::For(
            Box::new(init),
            Box::new(cond),
            Box::new(step),
            Box::new(body),
        ))
    }

    fn while_loop(&mut self) -> NodeResult {
        self.consume("while")?;
        let cond = self.condition()?;
        let body = self.branch()?;
        Ok(Node::While(Box::new(cond), Box::new(body)))
    }

    fn do_while(&mut self) -> NodeResult {
        self.consume("do")?;
        let body = self.branch()?;
        self.skip_separator_before("while");
        self.consume("while")?;
        let cond = self.expression()?;
        Ok(Node::DoWhile(Box::new(body), Box::new(cond)))
    }

    fn switch(&mut self) -> NodeResult {
        self.consume("switch")?;
        let subject = self.statement()?;
        self.consume("{")?;

        let mut arms = Arms::default();
        let mut body = vec![];
        loop {
            let Some(token) = self.peek() else {
                return Err(self.expected("}"));
            };
            if token.is("}") {
                self.tokens.next();
                break;
            } else if token.is("case") {
                self.tokens.next();
                let label = self.case_label()?;
                self.consume(":")?;
                // The first of two equal labels wins.
                arms.cases.entry(label).or_insert(body.len());
            } else if token.is("default") {
                self.tokens.next();
                if arms.default.is_some() {
                    return Err(SyntaxError::new(
                        SyntaxErrorKind::DuplicateDefault,
                        Some(token.pos),
                    ));
                }
                self.consume(":")?;
                arms.default = Some(body.len());
            } else {
                body.push(self.expression()?);
                if !self.match_next(";") && !self.after_block() && !self.check("}") {
                    return Err(self.expected(";"));
                }
            }
        }
        Ok(Node::Switch(Box::new(subject), arms, body))
    }

    fn case_label(&mut self) -> Result<CaseLabel, SyntaxError> {
        let first = self.advance()?;
        let negate = first.is("-");
        let token = if negate { self.advance()? } else { first };
        let non_static = || {
            SyntaxError::new(
                SyntaxErrorKind::NonStaticCase(describe(Some(token))),
                Some(token.pos),
            )
        };

        match token.kind {
            TokenKind::Number => match Node::number(&token.text) {
                Some(Node::Number(n)) => Ok(CaseLabel::number(if negate { -n } else { n })),
                _ => Err(SyntaxError::new(
                    SyntaxErrorKind::InvalidNumber(token.text.clone()),
                    Some(token.pos),
                )),
            },
            _ if negate => Err(non_static()),
            TokenKind::String => match Node::string(&token.text) {
                Node::String(s) => Ok(CaseLabel::Str(s)),
                _ => Err(non_static()),
            },
            TokenKind::Keyword if token.is("true") => Ok(CaseLabel::Bool(true)),
            TokenKind::Keyword if token.is("false") => Ok(CaseLabel::Bool(false)),
            _ => Err(non_static()),
        }
    }
}
