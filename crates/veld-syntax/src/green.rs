use std::sync::atomic::{AtomicU64, Ordering};

use salsa::Database;
use text_size::TextSize;
use triomphe::ThinArc;

use crate::{NodeOrToken, SyntaxKind};

pub type Green<'db> = NodeOrToken<GreenNode<'db>, GreenToken<'db>>;

impl<'db> Green<'db> {
    pub fn text_len(&self, db: &dyn Database) -> TextSize {
        match self {
            NodeOrToken::Node(node) => node.text_len(db),
            NodeOrToken::Token(token) => TextSize::new(token.text(db).len() as u32),
        }
    }

    pub fn kind(&self, db: &dyn Database) -> SyntaxKind {
        match self {
            NodeOrToken::Node(node) => node.kind(db),
            NodeOrToken::Token(token) => token.kind(db),
        }
    }

    fn flags(&self, db: &dyn Database) -> NodeFlags {
        match self {
            NodeOrToken::Node(node) => node.flags(db),
            NodeOrToken::Token(_) => NodeFlags::EMPTY,
        }
    }
}

/// Derived facts about a green subtree, unioned up from children.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct NodeFlags(u8);

impl NodeFlags {
    pub const EMPTY: Self = Self(0);
    pub const CONTAINS_DIAGNOSTICS: Self = Self(1);
    pub const CONTAINS_ANNOTATIONS: Self = Self(1 << 1);
    pub const COMPILER_GENERATED: Self = Self(1 << 2);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Diagnostic attached to a green node.
///
/// Green nodes carry no positions, so the record is position-independent;
/// the red layer supplies the absolute offset.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct GreenDiagnostic {
    pub code: Box<str>,
    pub message: Box<str>,
}

impl GreenDiagnostic {
    pub fn new(code: impl Into<Box<str>>, message: impl Into<Box<str>>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

/// Marker that survives structural updates of the tree.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SyntaxAnnotation {
    kind: &'static str,
    id: u64,
}

impl SyntaxAnnotation {
    pub fn new(kind: &'static str) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self { kind, id: NEXT_ID.fetch_add(1, Ordering::Relaxed) }
    }

    pub fn kind(self) -> &'static str {
        self.kind
    }
}

/// Decoded literal payload of a token.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TokenValue {
    Int(i64),
    Str(Box<str>),
}

/// Position-independent syntax node: shape, children and derived facts only.
///
/// Interning gives structurally identical subtrees a single identity, so
/// "reference equality" of greens is id equality and trees share structure
/// across edits for free.
#[salsa::interned(debug, constructor = alloc)]
pub struct GreenNode<'db> {
    pub kind: SyntaxKind,
    #[returns(ref)]
    pub slots: Vec<Option<Green<'db>>>,
    pub text_len: TextSize,
    pub flags: NodeFlags,
    #[returns(ref)]
    pub diagnostics: Box<[GreenDiagnostic]>,
    #[returns(ref)]
    pub annotations: Box<[SyntaxAnnotation]>,
}

impl<'db> GreenNode<'db> {
    pub fn new(db: &'db dyn Database, kind: SyntaxKind, slots: Vec<Option<Green<'db>>>) -> Self {
        Self::compute(db, kind, slots, Box::default(), Box::default(), NodeFlags::EMPTY)
    }

    fn compute(
        db: &'db dyn Database,
        kind: SyntaxKind,
        slots: Vec<Option<Green<'db>>>,
        diagnostics: Box<[GreenDiagnostic]>,
        annotations: Box<[SyntaxAnnotation]>,
        extra_flags: NodeFlags,
    ) -> Self {
        let mut text_len = TextSize::new(0);
        let mut flags = extra_flags;
        for slot in slots.iter().flatten() {
            text_len += slot.text_len(db);
            flags = flags.union(slot.flags(db));
        }
        if !diagnostics.is_empty() {
            flags = flags.union(NodeFlags::CONTAINS_DIAGNOSTICS);
        }
        if !annotations.is_empty() {
            flags = flags.union(NodeFlags::CONTAINS_ANNOTATIONS);
        }
        Self::alloc(db, kind, slots, text_len, flags, diagnostics, annotations)
    }

    pub fn slot_count(self, db: &'db dyn Database) -> usize {
        self.slots(db).len()
    }

    /// Returns the child in slot `index`.
    ///
    /// Absent optional children and out-of-range indices yield `None`; slot
    /// indices of siblings are unaffected by absent children.
    pub fn slot(self, db: &'db dyn Database, index: usize) -> Option<Green<'db>> {
        self.slots(db).get(index).copied().flatten()
    }

    /// Replaces the children, keeping diagnostics and annotations.
    ///
    /// Returns `self` when every new slot is identity-equal to the current
    /// one, so unchanged subtrees keep their identity.
    pub fn update(self, db: &'db dyn Database, new_slots: Vec<Option<Green<'db>>>) -> Self {
        if *self.slots(db) == new_slots {
            return self;
        }
        Self::compute(
            db,
            self.kind(db),
            new_slots,
            self.diagnostics(db).clone(),
            self.annotations(db).clone(),
            NodeFlags::EMPTY,
        )
    }

    /// Returns a node carrying `diagnostics` instead of the current list.
    pub fn with_diagnostics(
        self,
        db: &'db dyn Database,
        diagnostics: impl Into<Box<[GreenDiagnostic]>>,
    ) -> Self {
        Self::compute(
            db,
            self.kind(db),
            self.slots(db).clone(),
            diagnostics.into(),
            self.annotations(db).clone(),
            NodeFlags::EMPTY,
        )
    }

    /// Returns a node carrying `annotations` instead of the current list.
    pub fn with_annotations(
        self,
        db: &'db dyn Database,
        annotations: impl Into<Box<[SyntaxAnnotation]>>,
    ) -> Self {
        Self::compute(
            db,
            self.kind(db),
            self.slots(db).clone(),
            self.diagnostics(db).clone(),
            annotations.into(),
            NodeFlags::EMPTY,
        )
    }

    /// Marks the subtree rooted here as synthesized by the compiler.
    pub fn as_compiler_generated(self, db: &'db dyn Database) -> Self {
        Self::compute(
            db,
            self.kind(db),
            self.slots(db).clone(),
            self.diagnostics(db).clone(),
            self.annotations(db).clone(),
            NodeFlags::COMPILER_GENERATED,
        )
    }

    pub fn contains_diagnostics(self, db: &'db dyn Database) -> bool {
        self.flags(db).contains(NodeFlags::CONTAINS_DIAGNOSTICS)
    }

    /// Concatenates the text of all leaf tokens, including trivia.
    pub fn write_text(self, db: &'db dyn Database, out: &mut String) {
        for slot in self.slots(db).iter().flatten() {
            match slot {
                NodeOrToken::Node(node) => node.write_text(db, out),
                NodeOrToken::Token(token) => out.push_str(token.text(db)),
            }
        }
    }

    pub fn text(self, db: &'db dyn Database) -> String {
        let mut out = String::new();
        self.write_text(db, &mut out);
        out
    }
}

#[salsa::interned(debug)]
pub struct GreenToken<'db> {
    pub leading: GreenTrivia,
    pub kind: SyntaxKind,
    #[returns(deref)]
    pub text: Box<str>,
    pub value: Option<TokenValue>,
    pub trailing: GreenTrivia,
}

impl<'db> GreenToken<'db> {
    fn leading_trailing_total_len(self, db: &'db dyn Database) -> (TextSize, TextSize, TextSize) {
        let leading_len = self.leading(db).len();
        let trailing_len = self.trailing(db).len();
        let total_len = self.text(db).len() as u32;

        (leading_len, trailing_len, total_len.into())
    }

    pub fn text_len(self, db: &'db dyn Database) -> TextSize {
        TextSize::new(self.text(db).len() as u32)
    }

    /// Token text without the surrounding trivia characters.
    pub fn text_trimmed(self, db: &'db dyn Database) -> &'db str {
        let (leading_len, trailing_len, total_len) = self.leading_trailing_total_len(db);

        let start: usize = leading_len.into();
        let end: usize = (total_len - trailing_len).into();

        &self.text(db)[start..end]
    }
}

/// Lengths and kinds of trivia pieces; the characters themselves live in the
/// owning token's text.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct GreenTrivia {
    ptr: Option<ThinArc<TextSize, TriviaPiece>>,
}

impl std::fmt::Debug for GreenTrivia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GreenTrivia")
            .field("pieces", &self.pieces())
            .field("total_len", &self.len())
            .finish()
    }
}

impl GreenTrivia {
    pub fn new(pieces: &[TriviaPiece]) -> Self {
        let total_len = pieces.iter().map(|piece| piece.len).sum();
        Self { ptr: Some(ThinArc::from_header_and_slice(total_len, pieces)) }
    }

    pub const fn empty() -> Self {
        Self { ptr: None }
    }

    pub fn len(&self) -> TextSize {
        match self.ptr {
            None => TextSize::new(0),
            Some(ref ptr) => ptr.header.header,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == TextSize::new(0)
    }

    pub fn pieces(&self) -> &[TriviaPiece] {
        match &self.ptr {
            None => &[],
            Some(ptr) => &ptr.slice,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TriviaPiece {
    pub kind: TriviaPieceKind,
    pub len: TextSize,
}

impl TriviaPiece {
    pub fn new(kind: TriviaPieceKind, len: TextSize) -> Self {
        Self { kind, len }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TriviaPieceKind {
    Whitespace,
    Newline,
    SingleLineComment,
}
