//! Tree builder
//!
//! Constructs the node shapes the engine expects. Parsers can use it to
//! assemble their output; tests use it to write programs without a parser.
//! Every node starts on line 0; use [`Node::at_line`] to place it.

use crate::node::{Element, Node, NodeKind, Token, TokenKind};
use rill_error::Span;

fn token(kind: TokenKind, text: impl Into<String>) -> Element {
    Token::new(kind, text, Span::default()).into()
}

fn node(kind: NodeKind, children: Vec<Element>) -> Node {
    Node::new(kind, children, Span::default())
}

fn nodes(items: Vec<Node>) -> Vec<Element> {
    items.into_iter().map(Element::from).collect()
}

pub fn program(statements: Vec<Node>) -> Node {
    node(NodeKind::Program, nodes(statements))
}

// Leaves, each wrapped in a unary node

pub fn int(value: i64) -> Node {
    node(NodeKind::Unary, vec![token(TokenKind::Int, value.to_string())])
}

/// Floating literal, kept as written
pub fn float(text: &str) -> Node {
    node(NodeKind::Unary, vec![token(TokenKind::Float, text)])
}

pub fn boolean(value: bool) -> Node {
    node(NodeKind::Unary, vec![token(TokenKind::Bool, value.to_string())])
}

pub fn string(contents: &str) -> Node {
    node(NodeKind::Unary, vec![token(TokenKind::Str, contents)])
}

pub fn ident(name: &str) -> Node {
    node(NodeKind::Unary, vec![token(TokenKind::Ident, name)])
}

/// `!expr`; stacks onto an existing unary node
pub fn not(expr: Node) -> Node {
    if expr.kind == NodeKind::Unary {
        let mut children = vec![token(TokenKind::Not, "!")];
        children.extend(expr.children);
        Node::new(NodeKind::Unary, children, expr.span)
    } else {
        node(NodeKind::Unary, vec![token(TokenKind::Not, "!"), expr.into()])
    }
}

// Expression chains

/// `first op operand op operand ...` at one precedence level
pub fn chain(kind: NodeKind, first: Node, rest: Vec<(&str, Node)>) -> Node {
    let mut children = vec![Element::from(first)];
    for (op, operand) in rest {
        children.push(token(TokenKind::Operator, op));
        children.push(operand.into());
    }
    node(kind, children)
}

/// Wraps an expression in a single-operand level, as a full parse would
pub fn group(kind: NodeKind, inner: Node) -> Node {
    node(kind, vec![inner.into()])
}

pub fn add(lhs: Node, rhs: Node) -> Node {
    chain(NodeKind::Additive, lhs, vec![("+", rhs)])
}

pub fn sub(lhs: Node, rhs: Node) -> Node {
    chain(NodeKind::Additive, lhs, vec![("-", rhs)])
}

pub fn mul(lhs: Node, rhs: Node) -> Node {
    chain(NodeKind::Multiplicative, lhs, vec![("*", rhs)])
}

pub fn div(lhs: Node, rhs: Node) -> Node {
    chain(NodeKind::Multiplicative, lhs, vec![("/", rhs)])
}

pub fn eq(lhs: Node, rhs: Node) -> Node {
    chain(NodeKind::Equality, lhs, vec![("==", rhs)])
}

pub fn ne(lhs: Node, rhs: Node) -> Node {
    chain(NodeKind::Equality, lhs, vec![("!=", rhs)])
}

pub fn and(lhs: Node, rhs: Node) -> Node {
    chain(NodeKind::Conjunction, lhs, vec![("&&", rhs)])
}

pub fn or(lhs: Node, rhs: Node) -> Node {
    chain(NodeKind::Disjunction, lhs, vec![("||", rhs)])
}

// Statements

/// `ty name [= init]`
pub fn var_decl(ty: &str, name: &str, init: Option<Node>) -> Node {
    let mut children = vec![token(TokenKind::TypeName, ty), token(TokenKind::Ident, name)];
    children.extend(init.map(Element::from));
    node(NodeKind::VarDeclaration, children)
}

pub fn assign(name: &str, expr: Node) -> Node {
    node(NodeKind::Assignment, vec![token(TokenKind::Ident, name), expr.into()])
}

pub fn print(expr: Node) -> Node {
    node(NodeKind::Print, vec![expr.into()])
}

/// `print(name)` where the argument is a bare identifier
pub fn print_var(name: &str) -> Node {
    node(NodeKind::Print, vec![token(TokenKind::Ident, name)])
}

pub fn read(name: &str) -> Node {
    node(NodeKind::Read, vec![token(TokenKind::Ident, name)])
}

pub fn ret(expr: Option<Node>) -> Node {
    node(NodeKind::Return, expr.into_iter().map(Element::from).collect())
}

// Control flow

/// `if (cond) { then } [else { otherwise }]`
pub fn if_(cond: &str, then: Vec<Node>, otherwise: Option<Vec<Node>>) -> Node {
    let mut children = vec![
        token(TokenKind::Ident, cond),
        node(NodeKind::IfBlock, nodes(then)).into(),
    ];
    if let Some(body) = otherwise {
        children.push(node(NodeKind::ElseStatement, nodes(body)).into());
    }
    node(NodeKind::IfStatement, children)
}

/// `loop (bound) { body }`; a numeric bound becomes an int literal
pub fn repeat(bound: &str, body: Vec<Node>) -> Node {
    let kind = if bound.parse::<i64>().is_ok() {
        TokenKind::Int
    } else {
        TokenKind::Ident
    };
    let mut children = vec![token(kind, bound)];
    children.extend(nodes(body));
    node(NodeKind::Loop, children)
}

// Functions

/// `ret name(params) { body }`
pub fn function(ret: &str, name: &str, params: &[(&str, &str)], body: Vec<Node>) -> Node {
    let mut children = vec![token(TokenKind::TypeName, ret), token(TokenKind::Ident, name)];
    for (ty, param) in params {
        children.push(
            node(
                NodeKind::Parameter,
                vec![token(TokenKind::TypeName, *ty), token(TokenKind::Ident, *param)],
            )
            .into(),
        );
    }
    children.push(node(NodeKind::FunctionBlock, nodes(body)).into());
    node(NodeKind::Function, children)
}

fn arguments(args: Vec<Node>) -> impl Iterator<Item = Element> {
    args.into_iter()
        .map(|arg| node(NodeKind::Argument, vec![arg.into()]).into())
}

pub fn call(name: &str, args: Vec<Node>) -> Node {
    let mut children = vec![token(TokenKind::Ident, name)];
    children.extend(arguments(args));
    node(NodeKind::FunctionCall, children)
}

/// A call whose result is discarded
pub fn call_stmt(call: Node) -> Node {
    node(NodeKind::CallStatement, vec![call.into()])
}

// Aggregates

pub fn array_decl(name: &str, values: &[i64]) -> Node {
    let mut children = vec![token(TokenKind::Ident, name)];
    children.extend(values.iter().map(|v| token(TokenKind::Int, v.to_string())));
    node(NodeKind::ArrayDeclaration, children)
}

pub fn matrix_decl(name: &str, rows: &[&[i64]]) -> Node {
    let mut children = vec![token(TokenKind::Ident, name)];
    for row in rows {
        let values = row.iter().map(|v| token(TokenKind::Int, v.to_string())).collect();
        children.push(node(NodeKind::MatrixRow, values).into());
    }
    node(NodeKind::MatrixDeclaration, children)
}

pub fn array_index(name: &str, index: i64) -> Node {
    node(
        NodeKind::ArrayIndex,
        vec![token(TokenKind::Ident, name), token(TokenKind::Int, index.to_string())],
    )
}

pub fn matrix_index(name: &str, row: i64, column: i64) -> Node {
    node(
        NodeKind::MatrixIndex,
        vec![
            token(TokenKind::Ident, name),
            token(TokenKind::Int, row.to_string()),
            token(TokenKind::Int, column.to_string()),
        ],
    )
}

// Classes

/// `class name { members }`; members are `member` or `function` nodes
pub fn class_decl(name: &str, members: Vec<Node>) -> Node {
    let mut children = vec![token(TokenKind::Ident, name)];
    children.extend(nodes(members));
    node(NodeKind::ClassDeclaration, children)
}

pub fn member(ty: &str, name: &str) -> Node {
    node(
        NodeKind::MemberDeclaration,
        vec![token(TokenKind::TypeName, ty), token(TokenKind::Ident, name)],
    )
}

/// `class_name var = new class_name()`
pub fn instantiate(class_name: &str, var: &str) -> Node {
    node(
        NodeKind::ClassInstantiation,
        vec![token(TokenKind::Ident, class_name), token(TokenKind::Ident, var)],
    )
}

pub fn member_access(object: &str, field: &str) -> Node {
    node(
        NodeKind::MemberAccess,
        vec![token(TokenKind::Ident, object), token(TokenKind::Ident, field)],
    )
}

pub fn member_assign(object: &str, field: &str, expr: Node) -> Node {
    node(
        NodeKind::MemberAssignment,
        vec![
            token(TokenKind::Ident, object),
            token(TokenKind::Ident, field),
            expr.into(),
        ],
    )
}

pub fn method_call(object: &str, method: &str, args: Vec<Node>) -> Node {
    let mut children = vec![token(TokenKind::Ident, object), token(TokenKind::Ident, method)];
    children.extend(arguments(args));
    node(NodeKind::MethodCall, children)
}
