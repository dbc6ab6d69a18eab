use salsa::Database;

use crate::SyntaxKind;
use crate::red::{Red, RedNode, RedToken};

/// Kind-directed traversal over the red tree.
///
/// Dispatch is one flat switch on the kind tag; every hook defaults to
/// [`SyntaxVisitor::visit_node`], which walks the children. Implementations
/// override only the kinds they care about.
pub trait SyntaxVisitor<'db> {
    fn visit_node(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        walk(self, db, node);
    }

    fn visit_token(&mut self, db: &'db dyn Database, token: &RedToken<'db>) {
        let _ = (db, token);
    }

    fn visit_module(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        self.visit_node(db, node);
    }

    fn visit_namespace_decl(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        self.visit_node(db, node);
    }

    fn visit_type_decl(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        self.visit_node(db, node);
    }

    fn visit_fn_decl(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        self.visit_node(db, node);
    }

    fn visit_field_decl(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        self.visit_node(db, node);
    }

    fn visit_block(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        self.visit_node(db, node);
    }

    fn visit_if_stmt(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        self.visit_node(db, node);
    }

    fn visit_while_stmt(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        self.visit_node(db, node);
    }

    fn visit_labeled_stmt(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        self.visit_node(db, node);
    }

    fn visit_return_stmt(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        self.visit_node(db, node);
    }

    fn visit_binary_expr(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        self.visit_node(db, node);
    }

    fn visit_call_expr(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        self.visit_node(db, node);
    }

    fn visit_name_ref(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        self.visit_node(db, node);
    }

    fn visit_literal(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        self.visit_node(db, node);
    }
}

/// Walks all children of `node`, dispatching each through the visitor.
pub fn walk<'db, V: SyntaxVisitor<'db> + ?Sized>(
    visitor: &mut V,
    db: &'db dyn Database,
    node: &RedNode<'db>,
) {
    for child in node.children(db) {
        match child {
            Red::Node(node) => node.accept(db, visitor),
            Red::Token(token) => visitor.visit_token(db, &token),
        }
    }
}

impl<'db> RedNode<'db> {
    pub fn accept<V: SyntaxVisitor<'db> + ?Sized>(&self, db: &'db dyn Database, visitor: &mut V) {
        match self.kind(db) {
            SyntaxKind::MODULE => visitor.visit_module(db, self),
            SyntaxKind::NAMESPACE_DECL => visitor.visit_namespace_decl(db, self),
            SyntaxKind::TYPE_DECL => visitor.visit_type_decl(db, self),
            SyntaxKind::FN_DECL => visitor.visit_fn_decl(db, self),
            SyntaxKind::FIELD_DECL => visitor.visit_field_decl(db, self),
            SyntaxKind::BLOCK => visitor.visit_block(db, self),
            SyntaxKind::IF_STMT => visitor.visit_if_stmt(db, self),
            SyntaxKind::WHILE_STMT => visitor.visit_while_stmt(db, self),
            SyntaxKind::LABELED_STMT => visitor.visit_labeled_stmt(db, self),
            SyntaxKind::RETURN_STMT => visitor.visit_return_stmt(db, self),
            SyntaxKind::BINARY_EXPR => visitor.visit_binary_expr(db, self),
            SyntaxKind::CALL_EXPR => visitor.visit_call_expr(db, self),
            SyntaxKind::NAME_REF => visitor.visit_name_ref(db, self),
            SyntaxKind::LITERAL => visitor.visit_literal(db, self),
            _ => visitor.visit_node(db, self),
        }
    }
}

/// Renders the tree shape used by snapshot tests.
pub struct DebugTree {
    out: String,
    depth: usize,
}

impl DebugTree {
    pub fn render<'db>(db: &'db dyn Database, node: &RedNode<'db>) -> String {
        let mut printer = Self { out: String::new(), depth: 0 };
        node.accept(db, &mut printer);
        printer.out
    }
}

impl<'db> SyntaxVisitor<'db> for DebugTree {
    fn visit_node(&mut self, db: &'db dyn Database, node: &RedNode<'db>) {
        let range = node.range(db);
        let indent = "  ".repeat(self.depth);
        self.out.push_str(&format!(
            "{indent}{:?}@{}..{}\n",
            node.kind(db),
            u32::from(range.start()),
            u32::from(range.end())
        ));
        self.depth += 1;
        walk(self, db, node);
        self.depth -= 1;
    }

    fn visit_token(&mut self, db: &'db dyn Database, token: &RedToken<'db>) {
        let indent = "  ".repeat(self.depth);
        self.out.push_str(&format!("{indent}{:?} {:?}\n", token.kind(db), token.text(db)));
    }
}
