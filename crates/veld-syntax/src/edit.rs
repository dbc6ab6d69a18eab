use salsa::Database;
use text_size::{TextRange, TextSize};

use crate::green::GreenNode;
use crate::tree::SyntaxTree;

/// The reparse entry point supplied by the lexer/parser.
pub trait Reparse<'db> {
    fn reparse(&self, db: &'db dyn Database, text: &str) -> GreenNode<'db>;
}

impl<'db, F> Reparse<'db> for F
where
    F: Fn(&'db dyn Database, &str) -> GreenNode<'db>,
{
    fn reparse(&self, db: &'db dyn Database, text: &str) -> GreenNode<'db> {
        self(db, text)
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("edit range {offset:?}+{length:?} lies outside text of length {text_len:?}")]
    OutOfRange { offset: TextSize, length: TextSize, text_len: TextSize },
    #[error("edit boundary {offset:?} splits a multibyte character")]
    NotCharBoundary { offset: TextSize },
    #[error("substring `{needle}` not found")]
    NotFound { needle: Box<str> },
}

impl<'db> SyntaxTree<'db> {
    /// Splices `new_text` over `offset..offset+length` and reparses.
    ///
    /// Interning makes unaffected regions collapse back to the same green
    /// identities, so the new tree shares structure with this one.
    pub fn with_replace(
        &self,
        db: &'db dyn Database,
        offset: TextSize,
        length: TextSize,
        new_text: &str,
        parser: &dyn Reparse<'db>,
    ) -> Result<Self, EditError> {
        let text_len = TextSize::of(self.text());
        if offset + length > text_len {
            return Err(EditError::OutOfRange { offset, length, text_len });
        }
        if !self.text().is_char_boundary(usize::from(offset)) {
            return Err(EditError::NotCharBoundary { offset });
        }
        if !self.text().is_char_boundary(usize::from(offset + length)) {
            return Err(EditError::NotCharBoundary { offset: offset + length });
        }

        let mut text = String::with_capacity(self.text().len() + new_text.len());
        let range = TextRange::at(offset, length);
        text.push_str(&self.text()[..usize::from(range.start())]);
        text.push_str(new_text);
        text.push_str(&self.text()[usize::from(range.end())..]);

        let root = parser.reparse(db, &text);
        Ok(Self::new(db, root, text))
    }

    /// Replaces the first occurrence of `needle`.
    pub fn with_replace_first(
        &self,
        db: &'db dyn Database,
        needle: &str,
        replacement: &str,
        parser: &dyn Reparse<'db>,
    ) -> Result<Self, EditError> {
        let offset = self.find(needle)?;
        self.with_replace(db, offset, TextSize::of(needle), replacement, parser)
    }

    /// Inserts `insertion` in front of the first occurrence of `needle`.
    pub fn with_insert_before(
        &self,
        db: &'db dyn Database,
        needle: &str,
        insertion: &str,
        parser: &dyn Reparse<'db>,
    ) -> Result<Self, EditError> {
        let offset = self.find(needle)?;
        self.with_replace(db, offset, TextSize::new(0), insertion, parser)
    }

    /// Deletes the first occurrence of `needle`.
    pub fn with_remove_first(
        &self,
        db: &'db dyn Database,
        needle: &str,
        parser: &dyn Reparse<'db>,
    ) -> Result<Self, EditError> {
        let offset = self.find(needle)?;
        self.with_replace(db, offset, TextSize::of(needle), "", parser)
    }

    fn find(&self, needle: &str) -> Result<TextSize, EditError> {
        match self.text().find(needle) {
            Some(offset) => Ok(TextSize::new(offset as u32)),
            None => Err(EditError::NotFound { needle: needle.into() }),
        }
    }
}
