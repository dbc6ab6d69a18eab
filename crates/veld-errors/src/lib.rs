use std::fmt::Display;

pub use annotate_snippets::Renderer;
use annotate_snippets::{Level, Snippet};
pub use text_size::TextRange;

/// Tag carried by diagnostics authored by the compiler itself.
///
/// Such diagnostics are exempt from attribute-based suppression.
pub const COMPILER_TAG: &str = "Compiler";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    id: Box<str>,
    severity: Severity,
    message: String,
    range: TextRange,
    tags: Box<[&'static str]>,
    is_suppressed: bool,
}

impl Diagnostic {
    pub fn error(id: impl Into<Box<str>>, message: impl Into<String>, range: TextRange) -> Self {
        Self::new(id, Severity::Error, message, range)
    }

    pub fn warning(id: impl Into<Box<str>>, message: impl Into<String>, range: TextRange) -> Self {
        Self::new(id, Severity::Warning, message, range)
    }

    fn new(
        id: impl Into<Box<str>>,
        severity: Severity,
        message: impl Into<String>,
        range: TextRange,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            message: message.into(),
            range,
            tags: Box::default(),
            is_suppressed: false,
        }
    }

    pub fn with_tags(self, tags: impl IntoIterator<Item = &'static str>) -> Self {
        Self { tags: tags.into_iter().collect(), ..self }
    }

    pub fn with_suppressed(self, is_suppressed: bool) -> Self {
        Self { is_suppressed, ..self }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn tags(&self) -> &[&'static str] {
        &self.tags
    }

    pub fn is_compiler_diagnostic(&self) -> bool {
        self.tags.contains(&COMPILER_TAG)
    }

    pub fn is_suppressed(&self) -> bool {
        self.is_suppressed
    }

    pub fn render<'a>(
        &'a self,
        renderer: &'a Renderer,
        path: &'a str,
        text: &'a str,
    ) -> impl Display + 'a {
        let level = match self.severity {
            Severity::Error => Level::Error,
            Severity::Warning => Level::Warning,
        };
        let message = level.title(&self.message).snippet(
            Snippet::source(text)
                .origin(path)
                .annotation(level.span(self.range.into()).label("here"))
                .fold(true),
        );
        renderer.render(message)
    }
}
