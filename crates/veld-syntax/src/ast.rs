use salsa::Database;

use crate::SyntaxKind::*;
use crate::red::{Red, RedNode, RedToken};

pub trait Node<'db> {
    fn cast(db: &'db dyn Database, syntax: RedNode<'db>) -> Option<Self>
    where
        Self: Sized;

    fn syntax(&self) -> &RedNode<'db>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module<'db>(RedNode<'db>);

impl<'db> Module<'db> {
    pub fn decls(&self, db: &'db dyn Database) -> impl Iterator<Item = Decl<'db>> {
        self.0.child_nodes(db).filter_map(|syntax| Decl::cast(db, syntax))
    }
}

impl<'db> Node<'db> for Module<'db> {
    fn cast(db: &'db dyn Database, syntax: RedNode<'db>) -> Option<Self> {
        (syntax.kind(db) == MODULE).then_some(Self(syntax))
    }

    fn syntax(&self) -> &RedNode<'db> {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub enum Decl<'db> {
    Fn(FnDecl<'db>),
    Field(FieldDecl<'db>),
    Type(TypeDecl<'db>),
}

impl<'db> Node<'db> for Decl<'db> {
    fn cast(db: &'db dyn Database, syntax: RedNode<'db>) -> Option<Self> {
        match syntax.kind(db) {
            FN_DECL => Some(Self::Fn(FnDecl(syntax))),
            FIELD_DECL => Some(Self::Field(FieldDecl(syntax))),
            TYPE_DECL => Some(Self::Type(TypeDecl(syntax))),
            _ => None,
        }
    }

    fn syntax(&self) -> &RedNode<'db> {
        match self {
            Self::Fn(decl) => decl.syntax(),
            Self::Field(decl) => decl.syntax(),
            Self::Type(decl) => decl.syntax(),
        }
    }
}

impl<'db> Decl<'db> {
    pub fn modifier_list(&self, db: &'db dyn Database) -> Option<ModifierList<'db>> {
        self.syntax().child_nodes(db).find_map(|syntax| ModifierList::cast(db, syntax))
    }
}

macro_rules! decl_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name<'db>(RedNode<'db>);

        impl<'db> Node<'db> for $name<'db> {
            fn cast(db: &'db dyn Database, syntax: RedNode<'db>) -> Option<Self> {
                (syntax.kind(db) == $kind).then_some(Self(syntax))
            }

            fn syntax(&self) -> &RedNode<'db> {
                &self.0
            }
        }
    };
}

decl_node!(FnDecl, FN_DECL);
decl_node!(FieldDecl, FIELD_DECL);
decl_node!(TypeDecl, TYPE_DECL);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierList<'db>(RedNode<'db>);

impl<'db> ModifierList<'db> {
    pub fn tokens(&self, db: &'db dyn Database) -> impl Iterator<Item = RedToken<'db>> {
        self.0.children(db).filter_map(Red::into_token).filter(|token| token.kind(db).is_modifier())
    }
}

impl<'db> Node<'db> for ModifierList<'db> {
    fn cast(db: &'db dyn Database, syntax: RedNode<'db>) -> Option<Self> {
        (syntax.kind(db) == MODIFIER_LIST).then_some(Self(syntax))
    }

    fn syntax(&self) -> &RedNode<'db> {
        &self.0
    }
}
