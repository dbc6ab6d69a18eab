//! Bound (name-resolved) statement trees, the flow walker's input.
//!
//! The real binder lives upstream; this is the shape it hands over, plus a
//! builder the binder and the tests drive.

use la_arena::{Arena, Idx};
use salsa::Database;
use veld_span::{IntoName as _, Name};

pub type LocalId<'db> = Idx<LocalData<'db>>;
pub type LabelId<'db> = Idx<LabelData<'db>>;
pub type ExprId<'db> = Idx<Expr<'db>>;
pub type StmtId<'db> = Idx<Stmt<'db>>;

#[derive(Debug)]
pub struct LocalData<'db> {
    pub name: Name<'db>,
    pub kind: LocalKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalKind {
    Local,
    Param { out: bool },
    /// Query range variable; declared by a clause, never assigned.
    RangeVariable,
}

impl LocalKind {
    pub fn is_out_param(self) -> bool {
        matches!(self, Self::Param { out: true })
    }
}

#[derive(Debug)]
pub struct LabelData<'db> {
    pub name: Name<'db>,
}

#[derive(Debug)]
pub enum Expr<'db> {
    Literal,
    Read(LocalId<'db>),
    Assign { target: LocalId<'db>, value: ExprId<'db> },
    Binary { lhs: ExprId<'db>, rhs: ExprId<'db> },
    /// Member slice off a receiver; flow analysis attributes reads to the
    /// root non-member local underneath.
    Field { receiver: ExprId<'db> },
    Call { args: Vec<ExprId<'db>> },
}

#[derive(Debug)]
pub enum Stmt<'db> {
    Expr(ExprId<'db>),
    Let { local: LocalId<'db>, init: Option<ExprId<'db>> },
    Block { stmts: Vec<StmtId<'db>> },
    If { cond: ExprId<'db>, then_branch: StmtId<'db>, else_branch: Option<StmtId<'db>> },
    While { cond: ExprId<'db>, body: StmtId<'db> },
    Labeled { label: LabelId<'db>, body: StmtId<'db> },
    Goto { label: LabelId<'db> },
    Return { value: Option<ExprId<'db>> },
}

/// One bound function body.
#[derive(Debug, Default)]
pub struct Body<'db> {
    locals: Arena<LocalData<'db>>,
    labels: Arena<LabelData<'db>>,
    exprs: Arena<Expr<'db>>,
    stmts: Arena<Stmt<'db>>,
    root: Vec<StmtId<'db>>,
}

impl<'db> Body<'db> {
    pub fn local(&self, id: LocalId<'db>) -> &LocalData<'db> {
        &self.locals[id]
    }

    pub fn locals(&self) -> impl Iterator<Item = (LocalId<'db>, &LocalData<'db>)> {
        self.locals.iter()
    }

    pub fn local_count(&self) -> usize {
        self.locals.len()
    }

    pub fn expr(&self, id: ExprId<'db>) -> &Expr<'db> {
        &self.exprs[id]
    }

    pub fn stmt(&self, id: StmtId<'db>) -> &Stmt<'db> {
        &self.stmts[id]
    }

    pub fn root(&self) -> &[StmtId<'db>] {
        &self.root
    }
}

/// Convenience constructor for bound bodies.
pub struct BodyBuilder<'db> {
    db: &'db dyn Database,
    body: Body<'db>,
}

impl<'db> BodyBuilder<'db> {
    pub fn new(db: &'db dyn Database) -> Self {
        Self { db, body: Body::default() }
    }

    pub fn local(&mut self, name: &str) -> LocalId<'db> {
        self.alloc_local(name, LocalKind::Local)
    }

    pub fn param(&mut self, name: &str, out: bool) -> LocalId<'db> {
        self.alloc_local(name, LocalKind::Param { out })
    }

    pub fn range_variable(&mut self, name: &str) -> LocalId<'db> {
        self.alloc_local(name, LocalKind::RangeVariable)
    }

    fn alloc_local(&mut self, name: &str, kind: LocalKind) -> LocalId<'db> {
        self.body.locals.alloc(LocalData { name: name.into_name(self.db), kind })
    }

    pub fn label(&mut self, name: &str) -> LabelId<'db> {
        self.body.labels.alloc(LabelData { name: name.into_name(self.db) })
    }

    pub fn literal(&mut self) -> ExprId<'db> {
        self.body.exprs.alloc(Expr::Literal)
    }

    pub fn read(&mut self, local: LocalId<'db>) -> ExprId<'db> {
        self.body.exprs.alloc(Expr::Read(local))
    }

    pub fn assign(&mut self, target: LocalId<'db>, value: ExprId<'db>) -> ExprId<'db> {
        self.body.exprs.alloc(Expr::Assign { target, value })
    }

    pub fn binary(&mut self, lhs: ExprId<'db>, rhs: ExprId<'db>) -> ExprId<'db> {
        self.body.exprs.alloc(Expr::Binary { lhs, rhs })
    }

    pub fn field(&mut self, receiver: ExprId<'db>) -> ExprId<'db> {
        self.body.exprs.alloc(Expr::Field { receiver })
    }

    pub fn call(&mut self, args: Vec<ExprId<'db>>) -> ExprId<'db> {
        self.body.exprs.alloc(Expr::Call { args })
    }

    pub fn expr_stmt(&mut self, expr: ExprId<'db>) -> StmtId<'db> {
        self.body.stmts.alloc(Stmt::Expr(expr))
    }

    pub fn let_stmt(&mut self, local: LocalId<'db>, init: Option<ExprId<'db>>) -> StmtId<'db> {
        self.body.stmts.alloc(Stmt::Let { local, init })
    }

    pub fn block(&mut self, stmts: Vec<StmtId<'db>>) -> StmtId<'db> {
        self.body.stmts.alloc(Stmt::Block { stmts })
    }

    pub fn if_stmt(
        &mut self,
        cond: ExprId<'db>,
        then_branch: StmtId<'db>,
        else_branch: Option<StmtId<'db>>,
    ) -> StmtId<'db> {
        self.body.stmts.alloc(Stmt::If { cond, then_branch, else_branch })
    }

    pub fn while_stmt(&mut self, cond: ExprId<'db>, body: StmtId<'db>) -> StmtId<'db> {
        self.body.stmts.alloc(Stmt::While { cond, body })
    }

    pub fn labeled(&mut self, label: LabelId<'db>, body: StmtId<'db>) -> StmtId<'db> {
        self.body.stmts.alloc(Stmt::Labeled { label, body })
    }

    pub fn goto(&mut self, label: LabelId<'db>) -> StmtId<'db> {
        self.body.stmts.alloc(Stmt::Goto { label })
    }

    pub fn ret(&mut self, value: Option<ExprId<'db>>) -> StmtId<'db> {
        self.body.stmts.alloc(Stmt::Return { value })
    }

    /// Appends a statement to the body's top level.
    pub fn push(&mut self, stmt: StmtId<'db>) {
        self.body.root.push(stmt);
    }

    pub fn finish(self) -> Body<'db> {
        self.body
    }
}

/// A statement or expression position within a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundRef<'db> {
    Stmt(StmtId<'db>),
    Expr(ExprId<'db>),
}

/// Contiguous sub-range of a body, delimited inclusively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionSpan<'db> {
    pub first: BoundRef<'db>,
    pub last: BoundRef<'db>,
}

impl<'db> RegionSpan<'db> {
    pub fn stmts(first: StmtId<'db>, last: StmtId<'db>) -> Self {
        Self { first: BoundRef::Stmt(first), last: BoundRef::Stmt(last) }
    }

    pub fn single(stmt: StmtId<'db>) -> Self {
        Self::stmts(stmt, stmt)
    }
}
