//! Selector engine for slot lookup and `query_selector`.
//!
//! A logos tokenizer feeds a small recursive descent parser. The supported
//! subset is what layouts and mounted units need to find placeholders:
//! type, `*`, `#id`, `.class`, `[attr]`, `[attr=value]`, the descendant
//! (whitespace) and child (`>`) combinators, and comma-separated lists.
//!
//! Token priority follows logos rules (longest match, then declaration order),
//! so `#navbar` lexes as [`Token::IdSelector`] and never as two tokens.

use std::ops::Range;

use logos::Logos;

use super::node::{NodeData, NodeId};
use super::tree::Dom;

/// Errors from selector parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("unexpected `{text}` at byte {position} in selector")]
    UnexpectedToken { position: usize, text: String },
    #[error("unexpected end of selector: {0}")]
    UnexpectedEof(String),
    #[error("empty selector")]
    Empty,
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Selector token produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\n\r\f]+")]
pub enum Token {
    /// `#name`
    #[regex(r"#[a-zA-Z_-][a-zA-Z0-9_-]*")]
    IdSelector,

    /// `.name`
    #[regex(r"\.[a-zA-Z_-][a-zA-Z0-9_-]*")]
    ClassSelector,

    /// Double-quoted string literal.
    #[regex(r#""[^"]*""#)]
    StringLiteral,

    /// Single-quoted string literal.
    #[regex(r"'[^']*'")]
    StringLiteralSingle,

    /// Tag or attribute name.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*")]
    Ident,

    #[token("*")]
    Star,

    #[token(">")]
    GreaterThan,

    #[token(",")]
    Comma,

    #[token("[")]
    BracketOpen,

    #[token("]")]
    BracketClose,

    #[token("=")]
    Equals,
}

/// A lexed token with its source text and byte span.
#[derive(Debug, Clone)]
struct Lexeme {
    token: Token,
    text: String,
    span: Range<usize>,
}

fn tokenize(input: &str) -> Result<Vec<Lexeme>, SelectorError> {
    let mut out = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => out.push(Lexeme {
                token,
                text: input[span.clone()].to_owned(),
                span,
            }),
            Err(()) => {
                return Err(SelectorError::UnexpectedToken {
                    position: span.start,
                    text: input[span].to_owned(),
                })
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A single simple selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    /// Tag name, matched case-insensitively.
    Type(String),
    /// `*`
    Universal,
    /// `#id`
    Id(String),
    /// `.class`
    Class(String),
    /// `[name]` or `[name=value]`
    Attribute { name: String, value: Option<String> },
}

/// A combinator between compound selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: `A B`.
    Descendant,
    /// `A > B`.
    Child,
}

/// A compound selector: simple selectors that must all hold for one node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    pub components: Vec<SimpleSelector>,
}

impl CompoundSelector {
    fn matches(&self, node: &NodeData) -> bool {
        if !node.is_element() {
            return false;
        }
        self.components.iter().all(|component| match component {
            SimpleSelector::Type(name) => node.tag().is_some_and(|t| t.eq_ignore_ascii_case(name)),
            SimpleSelector::Universal => true,
            SimpleSelector::Id(id) => node.id.as_deref() == Some(id.as_str()),
            SimpleSelector::Class(class) => node.has_class(class),
            SimpleSelector::Attribute { name, value } => match (node.attr(name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == *expected,
                (None, _) => false,
            },
        })
    }
}

/// One complex selector: compounds joined by combinators.
///
/// `head` is the leftmost compound; each `tail` entry is the combinator that
/// precedes its compound. The rightmost compound is the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub head: CompoundSelector,
    pub tail: Vec<(Combinator, CompoundSelector)>,
}

impl Selector {
    /// Whether `node` is matched by this selector.
    pub fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        let mut compounds: Vec<&CompoundSelector> = vec![&self.head];
        let mut combinators = Vec::with_capacity(self.tail.len());
        for (combinator, compound) in &self.tail {
            combinators.push(*combinator);
            compounds.push(compound);
        }
        matches_at(dom, node, &compounds, &combinators, compounds.len() - 1)
    }
}

/// Match `compounds[idx]` against `node`, then walk leftward through the
/// combinators. Descendant steps backtrack over every ancestor.
fn matches_at(
    dom: &Dom,
    node: NodeId,
    compounds: &[&CompoundSelector],
    combinators: &[Combinator],
    idx: usize,
) -> bool {
    let Some(data) = dom.get(node) else {
        return false;
    };
    if !compounds[idx].matches(data) {
        return false;
    }
    if idx == 0 {
        return true;
    }
    match combinators[idx - 1] {
        Combinator::Child => dom
            .parent(node)
            .is_some_and(|parent| matches_at(dom, parent, compounds, combinators, idx - 1)),
        Combinator::Descendant => dom
            .ancestors(node)
            .into_iter()
            .any(|ancestor| matches_at(dom, ancestor, compounds, combinators, idx - 1)),
    }
}

/// A comma-separated list of selectors. Matches if any member matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(pub Vec<Selector>);

impl SelectorList {
    /// Parse selector text.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        Parser::new(tokenize(input)?).parse_list()
    }

    /// Whether `node` is matched by any selector in the list.
    pub fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        self.0.iter().any(|selector| selector.matches(dom, node))
    }
}

impl std::str::FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Lexeme>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Lexeme>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Lexeme> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Lexeme> {
        let lexeme = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        lexeme
    }

    fn unexpected(lexeme: &Lexeme) -> SelectorError {
        SelectorError::UnexpectedToken {
            position: lexeme.span.start,
            text: lexeme.text.clone(),
        }
    }

    /// Whether whitespace separates the previous token from the current one.
    fn gap_before_current(&self) -> bool {
        match (self.pos.checked_sub(1).and_then(|p| self.tokens.get(p)), self.peek()) {
            (Some(prev), Some(cur)) => cur.span.start > prev.span.end,
            _ => false,
        }
    }

    fn parse_list(&mut self) -> Result<SelectorList, SelectorError> {
        if self.tokens.is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut selectors = vec![self.parse_selector()?];
        while let Some(lexeme) = self.peek() {
            if lexeme.token != Token::Comma {
                return Err(Self::unexpected(lexeme));
            }
            self.bump();
            selectors.push(self.parse_selector()?);
        }
        Ok(SelectorList(selectors))
    }

    fn parse_selector(&mut self) -> Result<Selector, SelectorError> {
        let head = self.parse_compound()?;
        let mut tail = Vec::new();
        loop {
            let Some(lexeme) = self.peek() else { break };
            match lexeme.token {
                Token::Comma => break,
                Token::GreaterThan => {
                    self.bump();
                    tail.push((Combinator::Child, self.parse_compound()?));
                }
                _ if self.gap_before_current() => {
                    tail.push((Combinator::Descendant, self.parse_compound()?));
                }
                _ => return Err(Self::unexpected(lexeme)),
            }
        }
        Ok(Selector { head, tail })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let mut compound = CompoundSelector::default();
        loop {
            let Some(lexeme) = self.peek() else { break };
            // Whitespace inside a compound ends it (descendant combinator).
            if !compound.components.is_empty() && self.gap_before_current() {
                break;
            }
            let component = match lexeme.token {
                Token::Ident if compound.components.is_empty() => {
                    SimpleSelector::Type(lexeme.text.to_ascii_lowercase())
                }
                Token::Star if compound.components.is_empty() => SimpleSelector::Universal,
                Token::IdSelector => SimpleSelector::Id(lexeme.text[1..].to_owned()),
                Token::ClassSelector => SimpleSelector::Class(lexeme.text[1..].to_owned()),
                Token::BracketOpen => {
                    self.bump();
                    compound.components.push(self.parse_attribute()?);
                    continue;
                }
                _ => break,
            };
            self.bump();
            compound.components.push(component);
        }
        if compound.components.is_empty() {
            return match self.peek() {
                Some(lexeme) => Err(Self::unexpected(lexeme)),
                None => Err(SelectorError::UnexpectedEof("expected a selector".into())),
            };
        }
        Ok(compound)
    }

    /// Parse the inside of `[...]`; the opening bracket is already consumed.
    fn parse_attribute(&mut self) -> Result<SimpleSelector, SelectorError> {
        let name = match self.bump() {
            Some(l) if l.token == Token::Ident => l.text,
            Some(l) => return Err(Self::unexpected(&l)),
            None => return Err(SelectorError::UnexpectedEof("expected attribute name".into())),
        };
        let value = match self.bump() {
            Some(l) if l.token == Token::BracketClose => return Ok(SimpleSelector::Attribute { name, value: None }),
            Some(l) if l.token == Token::Equals => match self.bump() {
                Some(v) if v.token == Token::Ident => v.text,
                Some(v) if matches!(v.token, Token::StringLiteral | Token::StringLiteralSingle) => {
                    v.text[1..v.text.len() - 1].to_owned()
                }
                Some(v) => return Err(Self::unexpected(&v)),
                None => return Err(SelectorError::UnexpectedEof("expected attribute value".into())),
            },
            Some(l) => return Err(Self::unexpected(&l)),
            None => return Err(SelectorError::UnexpectedEof("expected `]`".into())),
        };
        match self.bump() {
            Some(l) if l.token == Token::BracketClose => Ok(SimpleSelector::Attribute {
                name,
                value: Some(value),
            }),
            Some(l) => Err(Self::unexpected(&l)),
            None => Err(SelectorError::UnexpectedEof("expected `]`".into())),
        }
    }
}
