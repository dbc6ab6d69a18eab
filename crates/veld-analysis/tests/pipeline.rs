use expect_test::expect;
use salsa::{Database, DatabaseImpl};
use veld_analysis::suppression::{CompilationBuilder, SuppressAttr};
use veld_analysis::{DeclarationModifiers, check_modifiers};
use veld_errors::Diagnostic;
use veld_syntax::ast::{Module, Node as _};
use veld_syntax::{GreenBuilder, GreenTrivia, RedNode, SyntaxKind};

/// `pub static virtual fn m`
fn declaration<'db>(db: &'db dyn Database) -> RedNode<'db> {
    let mut builder = GreenBuilder::new(db);
    builder.start_node(SyntaxKind::MODULE);
    builder.start_node(SyntaxKind::FN_DECL);
    builder.start_node(SyntaxKind::MODIFIER_LIST);
    builder.token(GreenTrivia::empty(), SyntaxKind::PUB_KW, "pub ", GreenTrivia::empty());
    builder.token(GreenTrivia::empty(), SyntaxKind::STATIC_KW, "static ", GreenTrivia::empty());
    builder.token(GreenTrivia::empty(), SyntaxKind::VIRTUAL_KW, "virtual ", GreenTrivia::empty());
    builder.finish_node();
    builder.token(GreenTrivia::empty(), SyntaxKind::FN_KW, "fn ", GreenTrivia::empty());
    builder.token(GreenTrivia::empty(), SyntaxKind::IDENT, "m", GreenTrivia::empty());
    builder.finish_node();
    builder.finish_node();
    RedNode::new_root(db, builder.finish())
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|diagnostic| {
            format!(
                "{:?} {}: {} (suppressed: {})\n",
                diagnostic.severity(),
                diagnostic.id(),
                diagnostic.message(),
                diagnostic.is_suppressed(),
            )
        })
        .collect()
}

#[test]
fn modifier_check_flows_into_suppression() {
    use DeclarationModifiers as Mods;

    let db = DatabaseImpl::new();
    let root = declaration(&db);

    let module = Module::cast(&db, root.clone()).expect("module root");
    let decl = module.decls(&db).next().expect("one declaration");
    let modifier_list = decl.modifier_list(&db).expect("modifier list");

    let mut diagnostics = Vec::new();
    let requested = DeclarationModifiers::from_tokens(
        modifier_list.tokens(&db).map(|token| (token.kind(&db), token.trimmed_range(&db))),
        &mut diagnostics,
    );
    assert_eq!(requested, Mods::PUBLIC | Mods::STATIC | Mods::VIRTUAL);

    let allowed = Mods::PUBLIC | Mods::STATIC | Mods::ABSTRACT | Mods::OVERRIDE;
    let (resolved, had_errors) = check_modifiers(
        false,
        false,
        requested,
        allowed,
        modifier_list.syntax().range(&db),
        &mut diagnostics,
    );
    assert_eq!(resolved, Mods::PUBLIC | Mods::STATIC);
    assert!(had_errors);

    let mut builder = CompilationBuilder::new(&db);
    let member = builder.member(builder.root(), "m");
    builder.declare(decl.syntax(), member);
    builder.attr(member, SuppressAttr::new("invalid-modifier:Modifier hygiene"));
    let compilation = builder.finish();

    let diagnostics = compilation.apply_source_suppressions(&root, diagnostics);
    expect![[r#"
        Error invalid-modifier: static member cannot be marked `virtual` (suppressed: true)
    "#]]
    .assert_eq(&summarize(&diagnostics));
}
