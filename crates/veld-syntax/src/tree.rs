use std::fmt;
use std::sync::OnceLock;

use salsa::Database;

use crate::green::GreenNode;
use crate::red::RedNode;

/// A parsed source file: the original text plus the green root.
///
/// Invariant: concatenating the text of the root's leaf tokens, trivia
/// included, reproduces `text` exactly.
pub struct SyntaxTree<'db> {
    text: Box<str>,
    root: GreenNode<'db>,
    red_root: OnceLock<RedNode<'db>>,
}

impl<'db> SyntaxTree<'db> {
    pub fn new(db: &'db dyn Database, root: GreenNode<'db>, text: impl Into<Box<str>>) -> Self {
        let text = text.into();
        debug_assert_eq!(root.text(db), &*text);
        Self { text, root, red_root: OnceLock::new() }
    }

    /// Builds a tree whose text is derived from the green root itself.
    pub fn from_root(db: &'db dyn Database, root: GreenNode<'db>) -> Self {
        Self { text: root.text(db).into(), root, red_root: OnceLock::new() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> GreenNode<'db> {
        self.root
    }

    /// Returns the root red node; the tree keeps it alive so parent links of
    /// handed-out children stay valid for the tree's lifetime.
    pub fn root_node(&self, db: &'db dyn Database) -> RedNode<'db> {
        self.red_root.get_or_init(|| RedNode::new_root(db, self.root)).clone()
    }
}

impl fmt::Debug for SyntaxTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree").field("text_len", &self.text.len()).finish_non_exhaustive()
    }
}
