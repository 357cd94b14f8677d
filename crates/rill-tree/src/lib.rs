//! rill-tree - Syntax-tree contract for the Rill IR emitter
//!
//! The engine never parses text. An external parser hands over a tree of
//! [`Node`]s whose shapes are fixed per [`NodeKind`]; the engine consumes
//! it through the [`Listener`] protocol driven by [`walk`].

pub mod build;
pub mod node;
pub mod walk;

pub use node::{Element, Node, NodeKind, Token, TokenKind};
pub use walk::{walk, Listener};
