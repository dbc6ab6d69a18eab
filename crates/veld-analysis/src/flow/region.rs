use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};

use super::FlowState;
use crate::bound::{Body, BoundRef, Expr, ExprId, LabelId, LocalId, RegionSpan, Stmt, StmtId};

/// Variables that flow into a region, i.e. true external inputs: reads the
/// region performs before any assignment of its own.
#[derive(Debug)]
pub struct DataFlowResult<'db> {
    pub flows_in: IndexSet<LocalId<'db>>,
    /// `false` when the boundaries did not describe an analyzable region;
    /// the set is empty and must not be trusted in that case.
    pub succeeded: bool,
}

struct PendingBranch<'db> {
    label: LabelId<'db>,
    state: FlowState,
    from_inside: bool,
}

/// Single-use region walker over one bound body.
///
/// Concurrent queries each build their own walker; the only shared input is
/// the immutable body.
pub struct DataFlowsInWalker<'a, 'db> {
    body: &'a Body<'db>,
    region: RegionSpan<'db>,
    state: FlowState,
    inside: bool,
    saw_first: bool,
    saw_last: bool,
    bad_region: bool,
    flows_in: IndexSet<LocalId<'db>>,
    pending: Vec<PendingBranch<'db>>,
    labels_seen: FxHashSet<LabelId<'db>>,
    labels_inside: FxHashSet<LabelId<'db>>,
    label_states: FxHashMap<LabelId<'db>, FlowState>,
    changed: bool,
}

const MAX_PASSES: usize = 32;

impl<'a, 'db> DataFlowsInWalker<'a, 'db> {
    pub fn analyze(body: &'a Body<'db>, region: RegionSpan<'db>) -> DataFlowResult<'db> {
        let slots = body.local_count() + 1;
        let mut walker = Self {
            body,
            region,
            state: FlowState::top(slots),
            inside: false,
            saw_first: false,
            saw_last: false,
            bad_region: false,
            flows_in: IndexSet::new(),
            pending: Vec::new(),
            labels_seen: FxHashSet::default(),
            labels_inside: FxHashSet::default(),
            label_states: FxHashMap::default(),
            changed: false,
        };
        walker.run();

        if walker.bad_region || !(walker.saw_first && walker.saw_last) {
            return DataFlowResult { flows_in: IndexSet::new(), succeeded: false };
        }
        DataFlowResult { flows_in: walker.flows_in, succeeded: true }
    }

    fn slots(&self) -> usize {
        self.body.local_count() + 1
    }

    // Slot 0 is the unreachable sentinel.
    fn slot(local: LocalId<'db>) -> usize {
        u32::from(local.into_raw()) as usize + 1
    }

    /// Runs forward passes until backward-branch states stabilize.
    fn run(&mut self) {
        for _ in 0..MAX_PASSES {
            self.changed = false;
            self.state = FlowState::top(self.slots());
            self.inside = false;
            self.saw_first = false;
            self.saw_last = false;
            self.pending.clear();
            self.labels_seen.clear();

            for index in 0..self.body.root().len() {
                self.visit_stmt(self.body.root()[index]);
            }

            if !self.changed {
                return;
            }
        }
        self.bad_region = true;
    }

    fn note_enter(&mut self, node: BoundRef<'db>) {
        if node == self.region.first {
            self.saw_first = true;
            self.enter_region();
        }
    }

    fn note_leave(&mut self, node: BoundRef<'db>) {
        if node == self.region.last {
            self.saw_last = true;
            self.inside = false;
        }
    }

    /// Forgets everything assumed assigned, keeping only unreachability, and
    /// starts accumulating afresh.
    fn enter_region(&mut self) {
        let reachable = self.state.reachable();
        self.state = FlowState::top(self.slots());
        if !reachable {
            self.state.set_unreachable();
        }
        self.flows_in.clear();
        self.inside = true;
    }

    /// The unassigned-read callback of the underlying pass.
    fn note_read(&mut self, local: LocalId<'db>) {
        if self.inside && !self.state.is_assigned(Self::slot(local)) {
            self.flows_in.insert(local);
        }
    }

    fn visit_stmt(&mut self, stmt: StmtId<'db>) {
        self.note_enter(BoundRef::Stmt(stmt));
        let body = self.body;
        match body.stmt(stmt) {
            Stmt::Expr(expr) => self.visit_expr(*expr),
            Stmt::Let { local, init } => {
                if let Some(init) = *init {
                    self.visit_expr(init);
                    self.state.assign(Self::slot(*local));
                }
            }
            Stmt::Block { stmts } => {
                for &stmt in stmts {
                    self.visit_stmt(stmt);
                }
            }
            Stmt::If { cond, then_branch, else_branch } => {
                let (cond, then_branch, else_branch) = (*cond, *then_branch, *else_branch);
                self.visit_expr(cond);
                let after_cond = self.state.clone();
                self.visit_stmt(then_branch);
                let after_then = std::mem::replace(&mut self.state, after_cond);
                if let Some(else_branch) = else_branch {
                    self.visit_stmt(else_branch);
                }
                self.state = after_then.meet(&self.state);
            }
            Stmt::While { cond, body: loop_body } => {
                let (cond, loop_body) = (*cond, *loop_body);
                self.visit_expr(cond);
                let after_cond = self.state.clone();
                self.visit_stmt(loop_body);
                // The body may not run at all; nothing it assigns is
                // definite after the loop.
                self.state = after_cond;
            }
            Stmt::Labeled { label, body: inner } => {
                let (label, inner) = (*label, *inner);
                self.visit_labeled(label, inner);
            }
            Stmt::Goto { label } => self.visit_goto(*label),
            Stmt::Return { value } => {
                if let Some(value) = *value {
                    self.visit_expr(value);
                }
                if self.inside {
                    // An out parameter still unassigned here is an input the
                    // region's caller must have provided.
                    for (local, data) in body.locals() {
                        if data.kind.is_out_param() && !self.state.is_assigned(Self::slot(local)) {
                            self.flows_in.insert(local);
                        }
                    }
                }
                self.state.set_unreachable();
            }
        }
        self.note_leave(BoundRef::Stmt(stmt));
    }

    fn visit_labeled(&mut self, label: LabelId<'db>, inner: StmtId<'db>) {
        self.labels_seen.insert(label);
        if self.inside {
            self.labels_inside.insert(label);
        }

        let mut incoming = self.state.clone();

        // Forward branches recorded earlier in this pass.
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].label != label {
                index += 1;
                continue;
            }
            let branch = self.pending.swap_remove(index);
            // A branch from outside into the region must not smuggle in
            // assumed assignments.
            let branch_state = if self.inside && !branch.from_inside {
                FlowState::top(self.slots())
            } else {
                branch.state
            };
            incoming = incoming.meet(&branch_state);
        }

        // Backward branches, as observed on the previous pass.
        if let Some(saved) = self.label_states.get(&label) {
            incoming = incoming.meet(saved);
        }

        self.state = incoming;
        self.visit_stmt(inner);
    }

    fn visit_goto(&mut self, label: LabelId<'db>) {
        let mut state = self.state.clone();
        if self.labels_inside.contains(&label) && !self.inside {
            state = FlowState::top(self.slots());
        }

        if self.labels_seen.contains(&label) {
            // Backward branch: converges over repeated passes.
            match self.label_states.get_mut(&label) {
                Some(saved) => {
                    let merged = saved.meet(&state);
                    if merged != *saved {
                        *saved = merged;
                        self.changed = true;
                    }
                }
                None => {
                    self.label_states.insert(label, state);
                    self.changed = true;
                }
            }
        } else {
            self.pending.push(PendingBranch { label, state, from_inside: self.inside });
        }
        self.state.set_unreachable();
    }

    fn visit_expr(&mut self, expr: ExprId<'db>) {
        self.note_enter(BoundRef::Expr(expr));
        let body = self.body;
        match body.expr(expr) {
            Expr::Literal => {}
            Expr::Read(local) => self.note_read(*local),
            Expr::Assign { target, value } => {
                let (target, value) = (*target, *value);
                self.visit_expr(value);
                self.state.assign(Self::slot(target));
            }
            Expr::Binary { lhs, rhs } => {
                let (lhs, rhs) = (*lhs, *rhs);
                self.visit_expr(lhs);
                self.visit_expr(rhs);
            }
            Expr::Field { receiver } => match self.root_local(*receiver) {
                Some(local) => self.note_read(local),
                None => self.visit_expr(*receiver),
            },
            Expr::Call { args } => {
                for &arg in args {
                    self.visit_expr(arg);
                }
            }
        }
        self.note_leave(BoundRef::Expr(expr));
    }

    /// Peels member slices down to the root non-member local, if any.
    fn root_local(&self, mut expr: ExprId<'db>) -> Option<LocalId<'db>> {
        loop {
            match self.body.expr(expr) {
                Expr::Read(local) => return Some(*local),
                Expr::Field { receiver } => expr = *receiver,
                _ => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use salsa::DatabaseImpl;

    use super::*;
    use crate::bound::BodyBuilder;

    #[test]
    fn return_of_outside_assignment_flows_in() {
        let db = DatabaseImpl::new();
        let mut builder = BodyBuilder::new(&db);

        let x = builder.local("x");
        let init = builder.literal();
        let decl = builder.let_stmt(x, Some(init));
        let read = builder.read(x);
        let ret = builder.ret(Some(read));
        builder.push(decl);
        builder.push(ret);
        let body = builder.finish();

        let result = DataFlowsInWalker::analyze(&body, RegionSpan::single(ret));
        assert!(result.succeeded);
        assert_eq!(result.flows_in.into_iter().collect::<Vec<_>>(), [x]);
    }

    #[test]
    fn straight_line_reads_before_assignment() {
        let db = DatabaseImpl::new();
        let mut builder = BodyBuilder::new(&db);

        let a = builder.local("a");
        let b = builder.local("b");
        let c = builder.local("c");

        // a = 1; b = a + c; c = b
        let one = builder.literal();
        let assign_a = builder.assign(a, one);
        let first = builder.expr_stmt(assign_a);

        let read_a = builder.read(a);
        let read_c = builder.read(c);
        let sum = builder.binary(read_a, read_c);
        let assign_b = builder.assign(b, sum);
        let second = builder.expr_stmt(assign_b);

        let read_b = builder.read(b);
        let assign_c = builder.assign(c, read_b);
        let last = builder.expr_stmt(assign_c);

        builder.push(first);
        builder.push(second);
        builder.push(last);
        let body = builder.finish();

        let result = DataFlowsInWalker::analyze(&body, RegionSpan::stmts(first, last));
        assert!(result.succeeded);
        // Only `c` is read before the region assigns it.
        assert_eq!(result.flows_in.into_iter().collect::<Vec<_>>(), [c]);
    }

    #[test]
    fn branch_assignment_is_not_definite_at_join() {
        let db = DatabaseImpl::new();
        let mut builder = BodyBuilder::new(&db);

        let cond = builder.local("cond");
        let x = builder.local("x");

        let cond_init = builder.literal();
        let cond_decl = builder.let_stmt(cond, Some(cond_init));

        let read_cond = builder.read(cond);
        let one = builder.literal();
        let assign_x = builder.assign(x, one);
        let then_branch = builder.expr_stmt(assign_x);
        let if_stmt = builder.if_stmt(read_cond, then_branch, None);

        let read_x = builder.read(x);
        let use_x = builder.expr_stmt(read_x);

        builder.push(cond_decl);
        builder.push(if_stmt);
        builder.push(use_x);
        let body = builder.finish();

        let result = DataFlowsInWalker::analyze(&body, RegionSpan::stmts(if_stmt, use_x));
        assert!(result.succeeded);
        // `x` is only assigned on one path, so the read still flows in; the
        // condition is read outright.
        let flows: Vec<_> = result.flows_in.into_iter().collect();
        assert_eq!(flows, [cond, x]);
    }

    #[test]
    fn goto_into_region_provides_no_assignments() {
        let db = DatabaseImpl::new();
        let mut builder = BodyBuilder::new(&db);

        let x = builder.local("x");
        let label = builder.label("target");

        let init = builder.literal();
        let decl = builder.let_stmt(x, Some(init));
        let jump = builder.goto(label);

        let read_x = builder.read(x);
        let use_x = builder.expr_stmt(read_x);
        let labeled = builder.labeled(label, use_x);

        builder.push(decl);
        builder.push(jump);
        builder.push(labeled);
        let body = builder.finish();

        let result = DataFlowsInWalker::analyze(&body, RegionSpan::single(labeled));
        assert!(result.succeeded);
        // The goto from outside assigned `x` first, but entry over a branch
        // must not assume it.
        assert_eq!(result.flows_in.into_iter().collect::<Vec<_>>(), [x]);
    }

    #[test]
    fn unassigned_out_param_at_return_flows_in() {
        let db = DatabaseImpl::new();
        let mut builder = BodyBuilder::new(&db);

        let result_param = builder.param("result", true);
        let ret = builder.ret(None);
        builder.push(ret);
        let body = builder.finish();

        let analysis = DataFlowsInWalker::analyze(&body, RegionSpan::single(ret));
        assert!(analysis.succeeded);
        assert_eq!(analysis.flows_in.into_iter().collect::<Vec<_>>(), [result_param]);
    }

    #[test]
    fn range_variable_declared_outside_flows_in() {
        let db = DatabaseImpl::new();
        let mut builder = BodyBuilder::new(&db);

        let item = builder.range_variable("item");
        let read = builder.read(item);
        let use_item = builder.expr_stmt(read);
        builder.push(use_item);
        let body = builder.finish();

        let result = DataFlowsInWalker::analyze(&body, RegionSpan::single(use_item));
        assert!(result.succeeded);
        assert_eq!(result.flows_in.into_iter().collect::<Vec<_>>(), [item]);
    }

    #[test]
    fn field_read_reports_the_root_local() {
        let db = DatabaseImpl::new();
        let mut builder = BodyBuilder::new(&db);

        let s = builder.local("s");
        let read_s = builder.read(s);
        let inner = builder.field(read_s);
        let outer = builder.field(inner);
        let use_field = builder.expr_stmt(outer);
        builder.push(use_field);
        let body = builder.finish();

        let result = DataFlowsInWalker::analyze(&body, RegionSpan::single(use_field));
        assert!(result.succeeded);
        assert_eq!(result.flows_in.into_iter().collect::<Vec<_>>(), [s]);
    }

    #[test]
    fn boundaries_outside_the_walk_fail_without_panicking() {
        let db = DatabaseImpl::new();
        let mut builder = BodyBuilder::new(&db);

        let x = builder.local("x");
        let read = builder.read(x);
        let pushed = builder.expr_stmt(read);
        let orphan = builder.expr_stmt(read); // allocated, never part of the body
        builder.push(pushed);
        let body = builder.finish();

        let result = DataFlowsInWalker::analyze(&body, RegionSpan::stmts(pushed, orphan));
        assert!(!result.succeeded);
        assert!(result.flows_in.is_empty());
    }
}
