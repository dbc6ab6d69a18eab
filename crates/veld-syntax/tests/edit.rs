use salsa::{Database, DatabaseImpl};
use text_size::TextSize;
use veld_syntax::{
    EditError, GreenBuilder, GreenNode, GreenTrivia, SyntaxKind, SyntaxTree, TriviaPiece,
    TriviaPieceKind,
};

/// Word-level stand-in for the real parser: every whitespace-separated word
/// becomes one token, surrounding whitespace becomes attached trivia.
fn parse<'db>(db: &'db dyn Database, text: &str) -> GreenNode<'db> {
    let mut builder = GreenBuilder::new(db);
    builder.start_node(SyntaxKind::MODULE);

    let mut rest = text;
    let mut first = true;
    while !rest.is_empty() {
        let lead_len = rest.len() - rest.trim_start().len();
        let (lead_len, leading) = if first && lead_len > 0 {
            (lead_len, GreenTrivia::new(&[whitespace(lead_len)]))
        } else {
            (0, GreenTrivia::empty())
        };
        first = false;

        let after_lead = &rest[lead_len..];
        let word_len = after_lead.find(char::is_whitespace).unwrap_or(after_lead.len());
        let after_word = &after_lead[word_len..];
        let trail_len = after_word.len() - after_word.trim_start().len();
        let trailing = if trail_len > 0 {
            GreenTrivia::new(&[whitespace(trail_len)])
        } else {
            GreenTrivia::empty()
        };

        let token_len = lead_len + word_len + trail_len;
        let kind = if word_len == 0 { SyntaxKind::UNKNOWN } else { SyntaxKind::IDENT };
        builder.token(leading, kind, &rest[..token_len], trailing);
        rest = &rest[token_len..];
    }

    builder.finish_node();
    builder.finish()
}

fn whitespace(len: usize) -> TriviaPiece {
    TriviaPiece::new(TriviaPieceKind::Whitespace, TextSize::new(len as u32))
}

#[test]
fn replace_at_offset_shifts_only_the_edited_range() {
    let db = DatabaseImpl::new();
    let tree = SyntaxTree::new(&db, parse(&db, "aaa bbb ccc ddd"), "aaa bbb ccc ddd");

    let edited = tree.with_replace(&db, TextSize::new(10), TextSize::new(3), "xyz", &parse).unwrap();

    assert_eq!(&edited.text()[10..13], "xyz");
    assert_eq!(&edited.text()[..10], &tree.text()[..10]);
    assert_eq!(&edited.text()[13..], &tree.text()[13..]);
    assert_eq!(edited.root().text(&db), edited.text());
}

#[test]
fn unaffected_prefix_keeps_green_identity() {
    let db = DatabaseImpl::new();
    let tree = SyntaxTree::new(&db, parse(&db, "aaa bbb ccc"), "aaa bbb ccc");

    let edited = tree.with_replace_first(&db, "ccc", "zzz", &parse).unwrap();

    // The first two tokens reparse to the same interned greens.
    assert_eq!(tree.root().slot(&db, 0), edited.root().slot(&db, 0));
    assert_eq!(tree.root().slot(&db, 1), edited.root().slot(&db, 1));
    assert_ne!(tree.root().slot(&db, 2), edited.root().slot(&db, 2));
}

#[test]
fn insert_and_remove_round_trip() {
    let db = DatabaseImpl::new();
    let tree = SyntaxTree::new(&db, parse(&db, "one two"), "one two");

    let inserted = tree.with_insert_before(&db, "two", "mid ", &parse).unwrap();
    assert_eq!(inserted.text(), "one mid two");

    let removed = inserted.with_remove_first(&db, "mid ", &parse).unwrap();
    assert_eq!(removed.text(), "one two");
    assert_eq!(removed.root(), tree.root());
}

#[test]
fn replace_past_end_is_rejected() {
    let db = DatabaseImpl::new();
    let tree = SyntaxTree::new(&db, parse(&db, "abc"), "abc");

    let err = tree.with_replace(&db, TextSize::new(2), TextSize::new(5), "x", &parse).unwrap_err();
    assert_eq!(
        err,
        EditError::OutOfRange {
            offset: TextSize::new(2),
            length: TextSize::new(5),
            text_len: TextSize::new(3),
        }
    );
}

#[test]
fn replace_inside_multibyte_char_is_rejected() {
    let db = DatabaseImpl::new();
    let tree = SyntaxTree::new(&db, parse(&db, "é x"), "é x");

    // Offset 1 lands between the two bytes of `é`.
    let err = tree.with_replace(&db, TextSize::new(1), TextSize::new(1), "z", &parse).unwrap_err();
    assert_eq!(err, EditError::NotCharBoundary { offset: TextSize::new(1) });

    // A valid start with an end inside a character is rejected too.
    let err = tree.with_replace(&db, TextSize::new(0), TextSize::new(1), "z", &parse).unwrap_err();
    assert_eq!(err, EditError::NotCharBoundary { offset: TextSize::new(1) });
}

#[test]
fn missing_needle_is_rejected() {
    let db = DatabaseImpl::new();
    let tree = SyntaxTree::new(&db, parse(&db, "abc"), "abc");

    let err = tree.with_replace_first(&db, "nope", "x", &parse).unwrap_err();
    assert_eq!(err, EditError::NotFound { needle: "nope".into() });
}
