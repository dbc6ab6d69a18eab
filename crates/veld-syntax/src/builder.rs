use salsa::Database;

use crate::SyntaxKind;
use crate::cache::NodeCache;
use crate::green::{Green, GreenNode, GreenToken, GreenTrivia, TokenValue};
use crate::NodeOrToken;

/// Builds a green tree from parser events.
///
/// Finished small nodes go through the node cache, so repeated shapes (an
/// empty argument list, a bare `else` clause) collapse to one identity.
pub struct GreenBuilder<'db> {
    db: &'db dyn Database,
    cache: NodeCache<'db>,
    parents: Vec<(SyntaxKind, usize)>,
    children: Vec<Option<Green<'db>>>,
}

impl<'db> GreenBuilder<'db> {
    pub fn new(db: &'db dyn Database) -> Self {
        Self { db, cache: NodeCache::new(), parents: Vec::new(), children: Vec::new() }
    }

    pub fn start_node(&mut self, kind: SyntaxKind) {
        self.parents.push((kind, self.children.len()));
    }

    pub fn finish_node(&mut self) {
        let (kind, first_child) = self.parents.pop().expect("no started node to finish");
        let slots = self.children.split_off(first_child);
        let node = self.cache.get_or_insert(self.db, kind, slots);
        self.children.push(Some(NodeOrToken::Node(node)));
    }

    pub fn token(
        &mut self,
        leading: GreenTrivia,
        kind: SyntaxKind,
        text: &str,
        trailing: GreenTrivia,
    ) {
        self.token_with_value(leading, kind, text, None, trailing);
    }

    pub fn token_with_value(
        &mut self,
        leading: GreenTrivia,
        kind: SyntaxKind,
        text: &str,
        value: Option<TokenValue>,
        trailing: GreenTrivia,
    ) {
        assert!(!self.parents.is_empty(), "token outside of any node");
        let token = GreenToken::new(self.db, leading, kind, text, value, trailing);
        self.children.push(Some(NodeOrToken::Token(token)));
    }

    /// Records an absent optional child, keeping later slot indices stable.
    pub fn missing(&mut self) {
        assert!(!self.parents.is_empty(), "missing slot outside of any node");
        self.children.push(None);
    }

    pub fn finish(mut self) -> GreenNode<'db> {
        assert!(self.parents.is_empty(), "unfinished nodes at end of build");
        assert_eq!(self.children.len(), 1, "expected exactly one root node");
        match self.children.pop() {
            Some(Some(NodeOrToken::Node(node))) => node,
            _ => panic!("root must be a node"),
        }
    }
}
