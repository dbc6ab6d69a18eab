//! Attribute-driven diagnostic suppression.
//!
//! A compilation carries a symbol table, a node-to-declared-symbols index and
//! the module-level suppression attributes. Suppression questions are
//! answered by walking from the diagnostic's covering syntax node up through
//! its ancestors, consulting per-symbol attributes and the lazily-decoded
//! compilation-wide index.

use std::sync::{Arc, Mutex, OnceLock};

use la_arena::{Arena, Idx};
use rustc_hash::{FxHashMap, FxHashSet};
use salsa::Database;
use text_size::TextSize;
use veld_errors::Diagnostic;
use veld_span::{IntoName as _, Name};
use veld_syntax::{GreenNode, RedNode};

pub type SymbolId<'db> = Idx<SymbolData<'db>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Namespace,
    Type,
    Member,
}

#[derive(Debug)]
pub struct SymbolData<'db> {
    pub name: Name<'db>,
    pub kind: SymbolKind,
    pub parent: Option<SymbolId<'db>>,
    pub children: Vec<SymbolId<'db>>,
    pub attrs: Vec<SuppressAttr>,
}

/// A suppression attribute application, as bound upstream.
#[derive(Clone, Debug)]
pub struct SuppressAttr {
    pub check_id: Box<str>,
    pub scope: Option<Box<str>>,
    pub target: Option<Box<str>>,
    pub message_id: Option<Box<str>>,
}

impl SuppressAttr {
    pub fn new(check_id: impl Into<Box<str>>) -> Self {
        Self { check_id: check_id.into(), scope: None, target: None, message_id: None }
    }

    pub fn with_scope(mut self, scope: impl Into<Box<str>>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<Box<str>>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_message_id(mut self, message_id: impl Into<Box<str>>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }
}

/// Decoded form of one attribute: the id with any rule-name category
/// stripped, plus the raw scope, target and message-id strings. Matching is
/// by id; the message id rides along for reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuppressMessageInfo {
    pub id: Box<str>,
    pub scope: Option<Box<str>>,
    pub target: Option<Box<str>>,
    pub message_id: Option<Box<str>>,
}

impl SuppressMessageInfo {
    fn decode(attr: &SuppressAttr) -> Self {
        let id = attr.check_id.split(':').next().unwrap_or(&attr.check_id).trim();
        Self {
            id: id.into(),
            scope: attr.scope.clone(),
            target: attr.target.clone(),
            message_id: attr.message_id.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetScope {
    Module,
    Namespace,
    NamespaceAndDescendants,
    Type,
    Member,
    Invalid,
}

impl TargetScope {
    /// Scope strings compare case-insensitively; a missing scope means
    /// module-wide unless a target was given, which no scope can absorb.
    fn parse(scope: Option<&str>, has_target: bool) -> Self {
        let Some(scope) = scope else {
            return if has_target { Self::Invalid } else { Self::Module };
        };
        if scope.eq_ignore_ascii_case("module") {
            Self::Module
        } else if scope.eq_ignore_ascii_case("namespace") {
            Self::Namespace
        } else if scope.eq_ignore_ascii_case("namespaceanddescendants") {
            Self::NamespaceAndDescendants
        } else if scope.eq_ignore_ascii_case("type") {
            Self::Type
        } else if scope.eq_ignore_ascii_case("member") {
            Self::Member
        } else {
            Self::Invalid
        }
    }
}

/// Compilation-wide suppression index, decoded at most once.
#[derive(Debug, Default)]
struct GlobalSuppressions<'db> {
    by_id: FxHashSet<Box<str>>,
    by_symbol: FxHashMap<Box<str>, FxHashMap<SymbolId<'db>, TargetScope>>,
}

type LocalSuppressions = Arc<FxHashMap<Box<str>, SuppressMessageInfo>>;

/// Symbol table plus suppression state for one compilation.
///
/// Both caches live and die with this value; discarding the compilation
/// discards every decoded suppression.
pub struct Compilation<'db> {
    db: &'db dyn Database,
    symbols: Arena<SymbolData<'db>>,
    root: SymbolId<'db>,
    declarations: FxHashMap<(GreenNode<'db>, TextSize), Vec<SymbolId<'db>>>,
    module_attrs: Vec<SuppressAttr>,
    global_cache: OnceLock<GlobalSuppressions<'db>>,
    local_cache: Mutex<FxHashMap<SymbolId<'db>, LocalSuppressions>>,
}

impl<'db> Compilation<'db> {
    pub fn symbol(&self, id: SymbolId<'db>) -> &SymbolData<'db> {
        &self.symbols[id]
    }

    pub fn root(&self) -> SymbolId<'db> {
        self.root
    }

    /// Symbols declared by a syntax node; one node may declare several.
    pub fn declared_symbols(&self, node: &RedNode<'db>) -> &[SymbolId<'db>] {
        self.declarations
            .get(&(node.green(), node.text_offset()))
            .map_or(&[], Vec::as_slice)
    }

    /// Resolves a documentation-id-like target string to matching symbols.
    ///
    /// Unresolvable targets yield an empty set; a dangling suppression is
    /// inert, not an error.
    pub fn resolve_target_symbols(&self, target: &str, scope: TargetScope) -> Vec<SymbolId<'db>> {
        let target = target.trim();
        let target = target
            .strip_prefix("N:")
            .or_else(|| target.strip_prefix("T:"))
            .or_else(|| target.strip_prefix("M:"))
            .unwrap_or(target);
        let target = target.split('(').next().unwrap_or(target);

        let mut current = vec![self.root];
        for segment in target.split('.') {
            if segment.is_empty() {
                return Vec::new();
            }
            let name = segment.into_name(self.db);
            current = current
                .iter()
                .flat_map(|&id| self.symbols[id].children.iter().copied())
                .filter(|&child| self.symbols[child].name == name)
                .collect();
            if current.is_empty() {
                return Vec::new();
            }
        }

        current.retain(|&id| match scope {
            TargetScope::Namespace | TargetScope::NamespaceAndDescendants => {
                self.symbols[id].kind == SymbolKind::Namespace
            }
            TargetScope::Type => self.symbols[id].kind == SymbolKind::Type,
            TargetScope::Member => self.symbols[id].kind == SymbolKind::Member,
            TargetScope::Module | TargetScope::Invalid => false,
        });
        current
    }

    /// Whether attribute-based suppression applies to this diagnostic.
    pub fn is_diagnostic_suppressed(&self, root: &RedNode<'db>, diagnostic: &Diagnostic) -> bool {
        if diagnostic.is_compiler_diagnostic() {
            return false;
        }

        let global = self.global_suppressions();
        if global.by_id.contains(diagnostic.id()) {
            return true;
        }

        let covering = root.covering_node(self.db, diagnostic.range());
        for node in covering.ancestors() {
            let Some(symbols) = self.declarations.get(&(node.green(), node.text_offset())) else {
                continue;
            };
            for &symbol in symbols {
                if self.local_suppressions(symbol).contains_key(diagnostic.id()) {
                    return true;
                }
                if self.is_globally_suppressed(global, symbol, diagnostic.id()) {
                    return true;
                }
            }
        }
        false
    }

    /// Re-emits the batch with suppressed diagnostics marked as such.
    pub fn apply_source_suppressions(
        &self,
        root: &RedNode<'db>,
        diagnostics: Vec<Diagnostic>,
    ) -> Vec<Diagnostic> {
        diagnostics
            .into_iter()
            .map(|diagnostic| {
                if !diagnostic.is_suppressed() && self.is_diagnostic_suppressed(root, &diagnostic)
                {
                    diagnostic.with_suppressed(true)
                } else {
                    diagnostic
                }
            })
            .collect()
    }

    fn global_suppressions(&self) -> &GlobalSuppressions<'db> {
        if let Some(global) = self.global_cache.get() {
            return global;
        }
        // First publish wins; a racing decode is discarded.
        let computed = self.decode_global();
        self.global_cache.get_or_init(|| computed)
    }

    fn decode_global(&self) -> GlobalSuppressions<'db> {
        let mut global = GlobalSuppressions::default();
        for attr in &self.module_attrs {
            let info = SuppressMessageInfo::decode(attr);
            let scope = TargetScope::parse(info.scope.as_deref(), info.target.is_some());
            match scope {
                TargetScope::Module => {
                    global.by_id.insert(info.id);
                }
                TargetScope::Invalid => {}
                _ => {
                    let Some(target) = info.target.as_deref() else { continue };
                    for symbol in self.resolve_target_symbols(target, scope) {
                        global
                            .by_symbol
                            .entry(info.id.clone())
                            .or_default()
                            .insert(symbol, scope);
                    }
                }
            }
        }
        global
    }

    fn local_suppressions(&self, symbol: SymbolId<'db>) -> LocalSuppressions {
        if let Some(map) = self
            .local_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&symbol)
        {
            return Arc::clone(map);
        }

        // Decoded outside the lock; the entry that lands first is kept.
        let mut map = FxHashMap::default();
        for attr in &self.symbols[symbol].attrs {
            let info = SuppressMessageInfo::decode(attr);
            map.entry(info.id.clone()).or_insert(info);
        }
        let map = Arc::new(map);

        let mut cache = self.local_cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(cache.entry(symbol).or_insert(map))
    }

    fn is_globally_suppressed(
        &self,
        global: &GlobalSuppressions<'db>,
        symbol: SymbolId<'db>,
        id: &str,
    ) -> bool {
        let Some(entries) = global.by_symbol.get(id) else { return false };
        entries.iter().any(|(&target, &scope)| self.scope_matches(symbol, target, scope))
    }

    fn scope_matches(&self, symbol: SymbolId<'db>, target: SymbolId<'db>, scope: TargetScope) -> bool {
        match scope {
            TargetScope::Member => symbol == target,
            TargetScope::Type => {
                symbol == target || self.ancestors(symbol).any(|ancestor| ancestor == target)
            }
            // Only the immediately-containing namespace, never an ancestor.
            TargetScope::Namespace => self.containing_namespace(symbol) == Some(target),
            TargetScope::NamespaceAndDescendants => self
                .ancestors(symbol)
                .any(|ancestor| ancestor == target && self.symbols[ancestor].kind == SymbolKind::Namespace),
            TargetScope::Module | TargetScope::Invalid => false,
        }
    }

    fn ancestors(&self, symbol: SymbolId<'db>) -> impl Iterator<Item = SymbolId<'db>> + '_ {
        std::iter::successors(self.symbols[symbol].parent, |&id| self.symbols[id].parent)
    }

    fn containing_namespace(&self, symbol: SymbolId<'db>) -> Option<SymbolId<'db>> {
        self.ancestors(symbol).find(|&id| self.symbols[id].kind == SymbolKind::Namespace)
    }
}

/// Constructs a compilation's symbol table and suppression inputs.
pub struct CompilationBuilder<'db> {
    db: &'db dyn Database,
    symbols: Arena<SymbolData<'db>>,
    root: SymbolId<'db>,
    declarations: FxHashMap<(GreenNode<'db>, TextSize), Vec<SymbolId<'db>>>,
    module_attrs: Vec<SuppressAttr>,
}

impl<'db> CompilationBuilder<'db> {
    pub fn new(db: &'db dyn Database) -> Self {
        let mut symbols = Arena::new();
        let root = symbols.alloc(SymbolData {
            name: "".into_name(db),
            kind: SymbolKind::Namespace,
            parent: None,
            children: Vec::new(),
            attrs: Vec::new(),
        });
        Self { db, symbols, root, declarations: FxHashMap::default(), module_attrs: Vec::new() }
    }

    pub fn root(&self) -> SymbolId<'db> {
        self.root
    }

    pub fn namespace(&mut self, parent: SymbolId<'db>, name: &str) -> SymbolId<'db> {
        self.alloc(parent, name, SymbolKind::Namespace)
    }

    pub fn type_symbol(&mut self, parent: SymbolId<'db>, name: &str) -> SymbolId<'db> {
        self.alloc(parent, name, SymbolKind::Type)
    }

    pub fn member(&mut self, parent: SymbolId<'db>, name: &str) -> SymbolId<'db> {
        self.alloc(parent, name, SymbolKind::Member)
    }

    fn alloc(&mut self, parent: SymbolId<'db>, name: &str, kind: SymbolKind) -> SymbolId<'db> {
        let id = self.symbols.alloc(SymbolData {
            name: name.into_name(self.db),
            kind,
            parent: Some(parent),
            children: Vec::new(),
            attrs: Vec::new(),
        });
        self.symbols[parent].children.push(id);
        id
    }

    /// Attaches a suppression attribute directly to a symbol.
    pub fn attr(&mut self, symbol: SymbolId<'db>, attr: SuppressAttr) {
        self.symbols[symbol].attrs.push(attr);
    }

    /// Records a module-level suppression attribute.
    pub fn module_attr(&mut self, attr: SuppressAttr) {
        self.module_attrs.push(attr);
    }

    /// Records that `node` declares `symbol`.
    pub fn declare(&mut self, node: &RedNode<'db>, symbol: SymbolId<'db>) {
        self.declarations
            .entry((node.green(), node.text_offset()))
            .or_default()
            .push(symbol);
    }

    pub fn finish(self) -> Compilation<'db> {
        Compilation {
            db: self.db,
            symbols: self.symbols,
            root: self.root,
            declarations: self.declarations,
            module_attrs: self.module_attrs,
            global_cache: OnceLock::new(),
            local_cache: Mutex::new(FxHashMap::default()),
        }
    }
}
