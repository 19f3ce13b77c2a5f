#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{GraphError, Result};

use super::authorizations::Authorizations;

/// Parsed boolean label expression gating read access to a datum.
///
/// Grammar:
///
/// ```text
/// Expr   := Term ('|' Term)*
/// Term   := Factor ('&' Factor)*
/// Factor := Label | '(' Expr ')'
/// ```
///
/// Labels are runs of ASCII alphanumerics and `_ - : . /`, or double quoted
/// strings with `\"` and `\\` escapes. Whitespace between tokens is ignored.
/// The empty expression is readable by everyone.
///
/// Identity (equality, ordering, hashing) is the expression text: `a&b` and
/// `b&a` are distinct visibilities even though they evaluate alike.
#[derive(Clone)]
pub struct Visibility {
    expression: Arc<str>,
    root: Option<Arc<Node>>,
}

#[derive(Debug)]
enum Node {
    Label(String),
    And(Vec<Node>),
    Or(Vec<Node>),
}

impl Node {
    fn evaluate(&self, auths: &Authorizations) -> bool {
        match self {
            Node::Label(label) => auths.contains(label),
            Node::And(children) => children.iter().all(|child| child.evaluate(auths)),
            Node::Or(children) => children.iter().any(|child| child.evaluate(auths)),
        }
    }

    fn collect_labels<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::Label(label) => out.push(label),
            Node::And(children) | Node::Or(children) => {
                for child in children {
                    child.collect_labels(out);
                }
            }
        }
    }
}

impl Visibility {
    /// Parses `expression`, failing with [`GraphError::MalformedVisibility`].
    pub fn parse(expression: impl AsRef<str>) -> Result<Self> {
        let expression = expression.as_ref();
        let root = Parser::new(expression).parse()?;
        Ok(Self {
            expression: Arc::from(expression),
            root: root.map(Arc::new),
        })
    }

    /// The universally readable visibility.
    pub fn empty() -> Self {
        Self {
            expression: Arc::from(""),
            root: None,
        }
    }

    /// Returns the expression text.
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// Returns `true` for the universally readable visibility.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Evaluates the expression against `auths`.
    pub fn evaluate(&self, auths: &Authorizations) -> bool {
        match &self.root {
            None => true,
            Some(root) => root.evaluate(auths),
        }
    }

    /// Lists the labels referenced by the expression, in source order.
    pub fn labels(&self) -> Vec<&str> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.collect_labels(&mut out);
        }
        out
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Visibility {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl Eq for Visibility {}

impl PartialOrd for Visibility {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Visibility {
    fn cmp(&self, other: &Self) -> Ordering {
        self.expression.cmp(&other.expression)
    }
}

impl Hash for Visibility {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.expression.hash(state);
    }
}

impl fmt::Debug for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Visibility({:?})", &*self.expression)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Parses `expression` and evaluates it against `auths`.
pub fn can_read(expression: &str, auths: &Authorizations) -> Result<bool> {
    Ok(Visibility::parse(expression)?.evaluate(auths))
}

/// Returns `true` when `expression` parses and `auths` satisfies it.
///
/// Used on write paths to reject visibilities the writer could not read back.
pub fn is_valid(expression: &str, auths: &Authorizations) -> Result<bool> {
    can_read(expression, auths)
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<Option<Node>> {
        self.skip_ws();
        if self.pos == self.bytes.len() {
            return Ok(None);
        }
        let node = self.expr()?;
        self.skip_ws();
        match self.peek() {
            None => Ok(Some(node)),
            Some(b')') => Err(self.error("unbalanced closing parenthesis")),
            Some(_) => Err(self.error("unexpected character")),
        }
    }

    fn expr(&mut self) -> Result<Node> {
        let mut terms = vec![self.term()?];
        loop {
            self.skip_ws();
            if self.peek() != Some(b'|') {
                break;
            }
            self.pos += 1;
            terms.push(self.term()?);
        }
        Ok(collapse(terms, Node::Or))
    }

    fn term(&mut self) -> Result<Node> {
        let mut factors = vec![self.factor()?];
        loop {
            self.skip_ws();
            if self.peek() != Some(b'&') {
                break;
            }
            self.pos += 1;
            factors.push(self.factor()?);
        }
        Ok(collapse(factors, Node::And))
    }

    fn factor(&mut self) -> Result<Node> {
        self.skip_ws();
        match self.peek() {
            None | Some(b'&') | Some(b'|') | Some(b')') => Err(self.error("empty term")),
            Some(b'(') => {
                self.pos += 1;
                self.skip_ws();
                if self.peek() == Some(b')') {
                    return Err(self.error("empty term"));
                }
                let inner = self.expr()?;
                self.skip_ws();
                if self.peek() != Some(b')') {
                    return Err(self.error("missing closing parenthesis"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(b'"') => self.quoted(),
            Some(byte) if is_label_byte(byte) => {
                let start = self.pos;
                while matches!(self.peek(), Some(b) if is_label_byte(b)) {
                    self.pos += 1;
                }
                Ok(Node::Label(self.src[start..self.pos].to_owned()))
            }
            Some(_) => Err(self.error("invalid character in label")),
        }
    }

    fn quoted(&mut self) -> Result<Node> {
        let open = self.pos;
        self.pos += 1;
        let mut label = Vec::new();
        loop {
            match self.peek() {
                None => {
                    self.pos = open;
                    return Err(self.error("unterminated quoted label"));
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    match self.bytes.get(self.pos + 1) {
                        Some(&escaped @ (b'"' | b'\\')) => label.push(escaped),
                        _ => return Err(self.error("invalid escape in quoted label")),
                    }
                    self.pos += 2;
                }
                Some(byte) => {
                    label.push(byte);
                    self.pos += 1;
                }
            }
        }
        if label.is_empty() {
            self.pos = open;
            return Err(self.error("empty term"));
        }
        let label = String::from_utf8(label).map_err(|_| self.error("label is not utf8"))?;
        Ok(Node::Label(label))
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, reason: &'static str) -> GraphError {
        GraphError::MalformedVisibility {
            expression: self.src.to_owned(),
            position: self.pos,
            reason,
        }
    }
}

fn collapse(mut nodes: Vec<Node>, wrap: fn(Vec<Node>) -> Node) -> Node {
    if nodes.len() == 1 {
        nodes.remove(0)
    } else {
        wrap(nodes)
    }
}

fn is_label_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-' | b':' | b'.' | b'/')
}
