//! Lossless, immutable two-layer syntax tree.
//!
//! The green layer is position-free and interned, so structurally identical
//! subtrees share one identity across edits. The red layer wraps a green
//! node with a parent back-pointer and an absolute offset, materializing
//! children lazily. Text edits splice and reparse; sharing falls out of the
//! interning.

/// Typed AST wrappers around the raw syntax tree.
pub mod ast;
mod builder;
mod cache;
mod edit;
mod green;
mod red;
mod syntax_kind;
mod syntax_set;
mod tree;
mod visitor;

pub use builder::GreenBuilder;
pub use cache::NodeCache;
pub use edit::{EditError, Reparse};
pub use green::{
    Green, GreenDiagnostic, GreenNode, GreenToken, GreenTrivia, NodeFlags, SyntaxAnnotation,
    TokenValue, TriviaPiece, TriviaPieceKind,
};
pub use red::{Red, RedNode, RedToken};
pub use syntax_kind::SyntaxKind;
pub use syntax_set::SyntaxSet;
pub use tree::SyntaxTree;
pub use visitor::{DebugTree, SyntaxVisitor, walk};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NodeOrToken<N, T> {
    Node(N),
    Token(T),
}
