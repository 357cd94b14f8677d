//! Node - the tree shape handed over by the parser
//!
//! A node is a kind, an ordered list of children and a span. Children are
//! either nested nodes or tokens; the engine reads both positionally.

use rill_error::{Span, Spanned};
use std::fmt;

/// Every node kind the engine reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,

    // Declarations and statements
    VarDeclaration,
    Assignment,
    Print,
    Read,
    Return,
    CallStatement,

    // Aggregates
    ArrayDeclaration,
    MatrixDeclaration,
    MatrixRow,
    ArrayIndex,
    MatrixIndex,

    // Classes
    ClassDeclaration,
    MemberDeclaration,
    ClassInstantiation,
    MemberAccess,
    MemberAssignment,
    MethodCall,

    // Functions
    Function,
    Parameter,
    FunctionBlock,
    FunctionCall,
    Argument,

    // Control flow
    IfStatement,
    IfBlock,
    ElseStatement,
    Loop,

    // Expressions, lowest precedence first
    Disjunction,
    Conjunction,
    Equality,
    Additive,
    Multiplicative,
    Unary,
}

impl NodeKind {
    /// Binary chain levels (operand, operator, operand, ...)
    pub fn is_chain(&self) -> bool {
        matches!(
            self,
            NodeKind::Disjunction
                | NodeKind::Conjunction
                | NodeKind::Equality
                | NodeKind::Additive
                | NodeKind::Multiplicative
        )
    }

    pub fn is_boolean_chain(&self) -> bool {
        matches!(self, NodeKind::Disjunction | NodeKind::Conjunction)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Variable, function, class, field or method name
    Ident,
    /// `int`, `double`, `bool`, `string`, `void`, `var` or a class name
    TypeName,
    /// Integer literal
    Int,
    /// Floating literal
    Float,
    /// `true` / `false`
    Bool,
    /// String literal, text without the surrounding quotes
    Str,
    /// `+ - * / == != && ||`
    Operator,
    /// `!`
    Not,
}

/// A leaf of the tree
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }
}

impl Spanned for Token {
    fn span(&self) -> Span {
        self.span
    }
}

/// A child of a node
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Node(Node),
    Token(Token),
}

impl Element {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Element::Node(node) => Some(node),
            Element::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Element::Token(token) => Some(token),
            Element::Node(_) => None,
        }
    }
}

impl Spanned for Element {
    fn span(&self) -> Span {
        match self {
            Element::Node(node) => node.span,
            Element::Token(token) => token.span,
        }
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        Element::Node(node)
    }
}

impl From<Token> for Element {
    fn from(token: Token) -> Self {
        Element::Token(token)
    }
}

/// An interior node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Element>,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, children: Vec<Element>, span: Span) -> Self {
        Self {
            kind,
            children,
            span,
        }
    }

    /// Moves the node (not its children) to a source line
    pub fn at_line(mut self, line: u32) -> Self {
        self.span = Span::line(line);
        self
    }

    pub fn line(&self) -> u32 {
        self.span.start.line
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, index: usize) -> Option<&Element> {
        self.children.get(index)
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.child(index).and_then(Element::as_token)
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.child(index).and_then(Element::as_node)
    }

    /// Child nodes, skipping tokens
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter_map(Element::as_node)
    }

    /// Child tokens, skipping nodes
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.children.iter().filter_map(Element::as_token)
    }

    /// First child token of the given kind
    pub fn find_token(&self, kind: TokenKind) -> Option<&Token> {
        self.tokens().find(|t| t.kind == kind)
    }

    pub fn has_child_kind(&self, kind: NodeKind) -> bool {
        self.nodes().any(|n| n.kind == kind)
    }
}

impl Spanned for Node {
    fn span(&self) -> Span {
        self.span
    }
}
