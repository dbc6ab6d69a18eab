use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use salsa::Database;
use text_size::{TextRange, TextSize};

use crate::green::{GreenNode, GreenToken};
use crate::{NodeOrToken, SyntaxKind};

pub type Red<'db> = NodeOrToken<RedNode<'db>, RedToken<'db>>;

impl<'db> Red<'db> {
    pub fn kind(&self, db: &dyn Database) -> SyntaxKind {
        match self {
            NodeOrToken::Node(node) => node.kind(db),
            NodeOrToken::Token(token) => token.kind(db),
        }
    }

    pub fn range(&self, db: &dyn Database) -> TextRange {
        match self {
            NodeOrToken::Node(node) => node.range(db),
            NodeOrToken::Token(token) => token.range(db),
        }
    }

    pub fn into_node(self) -> Option<RedNode<'db>> {
        match self {
            NodeOrToken::Node(node) => Some(node),
            NodeOrToken::Token(_) => None,
        }
    }

    pub fn into_token(self) -> Option<RedToken<'db>> {
        match self {
            NodeOrToken::Token(token) => Some(token),
            NodeOrToken::Node(_) => None,
        }
    }
}

struct RedData<'db> {
    green: GreenNode<'db>,
    // The parent owns its children through the slot cache; a child only
    // holds a non-owning back-pointer.
    parent: Weak<RedData<'db>>,
    offset: TextSize,
    slots: Box<[OnceLock<Option<Red<'db>>>]>,
}

/// Positioned view over a green node, materialized on demand.
#[derive(Clone)]
pub struct RedNode<'db> {
    data: Arc<RedData<'db>>,
}

impl PartialEq for RedNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for RedNode<'_> {}

impl fmt::Debug for RedNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedNode").field("offset", &self.data.offset).finish_non_exhaustive()
    }
}

impl<'db> RedNode<'db> {
    pub fn new_root(db: &'db dyn Database, green: GreenNode<'db>) -> Self {
        Self::alloc(db, green, Weak::new(), TextSize::new(0))
    }

    fn alloc(
        db: &'db dyn Database,
        green: GreenNode<'db>,
        parent: Weak<RedData<'db>>,
        offset: TextSize,
    ) -> Self {
        let slots = (0..green.slot_count(db)).map(|_| OnceLock::new()).collect();
        Self { data: Arc::new(RedData { green, parent, offset, slots }) }
    }

    pub fn green(&self) -> GreenNode<'db> {
        self.data.green
    }

    pub fn kind(&self, db: &dyn Database) -> SyntaxKind {
        self.data.green.kind(db)
    }

    pub fn text_offset(&self) -> TextSize {
        self.data.offset
    }

    pub fn range(&self, db: &dyn Database) -> TextRange {
        TextRange::at(self.data.offset, self.data.green.text_len(db))
    }

    pub fn parent(&self) -> Option<Self> {
        self.data.parent.upgrade().map(|data| Self { data })
    }

    pub fn slot_count(&self, db: &dyn Database) -> usize {
        self.data.green.slot_count(db)
    }

    /// Returns the red child in slot `index`, materializing it on first use.
    ///
    /// Publication is first-writer-wins: a concurrent duplicate construction
    /// is discarded, which is harmless because both are structurally equal.
    /// Absent and out-of-range slots yield `None`.
    pub fn slot(&self, db: &'db dyn Database, index: usize) -> Option<Red<'db>> {
        let cell = self.data.slots.get(index)?;
        if cell.get().is_none() {
            let computed = self.materialize(db, index);
            let _ = cell.set(computed);
        }
        cell.get().cloned().flatten()
    }

    fn materialize(&self, db: &'db dyn Database, index: usize) -> Option<Red<'db>> {
        let green = self.data.green.slot(db, index)?;

        let mut offset = self.data.offset;
        for preceding in 0..index {
            if let Some(sibling) = self.data.green.slot(db, preceding) {
                offset += sibling.text_len(db);
            }
        }

        let parent = Arc::downgrade(&self.data);
        Some(match green {
            NodeOrToken::Node(node) => NodeOrToken::Node(Self::alloc(db, node, parent, offset)),
            NodeOrToken::Token(token) => {
                NodeOrToken::Token(RedToken { green: token, parent, offset })
            }
        })
    }

    pub fn children<'a>(&'a self, db: &'db dyn Database) -> impl Iterator<Item = Red<'db>> + 'a {
        (0..self.slot_count(db)).filter_map(move |index| self.slot(db, index))
    }

    pub fn child_nodes<'a>(
        &'a self,
        db: &'db dyn Database,
    ) -> impl Iterator<Item = RedNode<'db>> + 'a {
        self.children(db).filter_map(Red::into_node)
    }

    pub fn ancestors(&self) -> impl Iterator<Item = RedNode<'db>> + use<'db> {
        std::iter::successors(Some(self.clone()), Self::parent)
    }

    /// Descends to the innermost node whose range contains `range`.
    pub fn covering_node(&self, db: &'db dyn Database, range: TextRange) -> Self {
        let mut node = self.clone();
        'descend: loop {
            for child in node.clone().child_nodes(db) {
                if child.range(db).contains_range(range) {
                    node = child;
                    continue 'descend;
                }
            }
            return node;
        }
    }
}

/// Positioned view over a green token.
#[derive(Clone)]
pub struct RedToken<'db> {
    green: GreenToken<'db>,
    parent: Weak<RedData<'db>>,
    offset: TextSize,
}

impl PartialEq for RedToken<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.green == other.green && self.offset == other.offset
    }
}

impl Eq for RedToken<'_> {}

impl fmt::Debug for RedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedToken").field("offset", &self.offset).finish_non_exhaustive()
    }
}

impl<'db> RedToken<'db> {
    pub fn green(&self) -> GreenToken<'db> {
        self.green
    }

    pub fn kind(&self, db: &dyn Database) -> SyntaxKind {
        self.green.kind(db)
    }

    pub fn parent(&self) -> Option<RedNode<'db>> {
        self.parent.upgrade().map(|data| RedNode { data })
    }

    pub fn range(&self, db: &dyn Database) -> TextRange {
        TextRange::at(self.offset, self.green.text_len(db))
    }

    pub fn text(&self, db: &'db dyn Database) -> &'db str {
        self.green.text(db)
    }

    /// Token range excluding attached trivia.
    pub fn trimmed_range(&self, db: &dyn Database) -> TextRange {
        let leading = self.green.leading(db).len();
        let trailing = self.green.trailing(db).len();

        let range = self.range(db);
        TextRange::new(range.start() + leading, range.end() - trailing)
    }
}

#[cfg(test)]
mod tests {
    use salsa::DatabaseImpl;

    use super::*;
    use crate::green::GreenTrivia;

    fn sample_root(db: &dyn Database) -> GreenNode<'_> {
        let mut builder = crate::GreenBuilder::new(db);
        builder.start_node(SyntaxKind::MODULE);
        builder.start_node(SyntaxKind::EXPR_STMT);
        builder.token(GreenTrivia::empty(), SyntaxKind::IDENT, "abc ", GreenTrivia::empty());
        builder.token(GreenTrivia::empty(), SyntaxKind::PLUS, "+ ", GreenTrivia::empty());
        builder.token(GreenTrivia::empty(), SyntaxKind::NUMBER, "12", GreenTrivia::empty());
        builder.finish_node();
        builder.finish_node();
        builder.finish()
    }

    #[test]
    fn positions_accumulate_sibling_widths() {
        let db = DatabaseImpl::new();
        let root = RedNode::new_root(&db, sample_root(&db));

        let stmt = root.slot(&db, 0).and_then(Red::into_node).expect("statement child");
        assert_eq!(stmt.range(&db), TextRange::new(0.into(), 8.into()));

        let number = stmt.slot(&db, 2).and_then(Red::into_token).expect("number token");
        assert_eq!(number.range(&db), TextRange::new(6.into(), 8.into()));
    }

    #[test]
    fn slots_are_memoized() {
        let db = DatabaseImpl::new();
        let root = RedNode::new_root(&db, sample_root(&db));

        let first = root.slot(&db, 0).and_then(Red::into_node).expect("child");
        let second = root.slot(&db, 0).and_then(Red::into_node).expect("child");
        assert_eq!(first, second);
    }

    #[test]
    fn out_of_range_slot_is_none() {
        let db = DatabaseImpl::new();
        let root = RedNode::new_root(&db, sample_root(&db));

        assert!(root.slot(&db, 99).is_none());
    }

    #[test]
    fn parent_back_pointer_is_non_owning() {
        let db = DatabaseImpl::new();
        let root = RedNode::new_root(&db, sample_root(&db));

        let stmt = root.slot(&db, 0).and_then(Red::into_node).expect("child");
        assert_eq!(stmt.parent(), Some(root.clone()));

        drop(root);
        // With the owner gone, the back-pointer dangles gracefully.
        assert_eq!(stmt.parent(), None);
    }

    #[test]
    fn covering_node_descends_to_innermost() {
        let db = DatabaseImpl::new();
        let root = RedNode::new_root(&db, sample_root(&db));

        let covering = root.covering_node(&db, TextRange::new(6.into(), 8.into()));
        assert_eq!(covering.kind(&db), SyntaxKind::EXPR_STMT);

        let whole = root.covering_node(&db, TextRange::new(0.into(), 8.into()));
        assert_eq!(whole.kind(&db), SyntaxKind::EXPR_STMT);
    }
}
