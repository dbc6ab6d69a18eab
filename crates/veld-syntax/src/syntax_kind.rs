use crate::SyntaxSet;

#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u16)]
pub enum SyntaxKind {
    WHITESPACE,
    NEWLINE,
    LINE_COMMENT,

    LEFT_PAREN,
    RIGHT_PAREN,
    LEFT_BRACKET,
    RIGHT_BRACKET,
    LEFT_BRACE,
    RIGHT_BRACE,
    COMMA,
    SEMICOLON,
    COLON,
    DOT,
    EQ,
    PLUS,
    MINUS,
    STAR,

    IDENT,
    NUMBER,
    STRING,

    FN_KW,
    LET_KW,
    IF_KW,
    ELSE_KW,
    WHILE_KW,
    RETURN_KW,
    GOTO_KW,
    TYPE_KW,
    NAMESPACE_KW,

    PUB_KW,
    PRIVATE_KW,
    PROTECTED_KW,
    INTERNAL_KW,
    STATIC_KW,
    ABSTRACT_KW,
    VIRTUAL_KW,
    OVERRIDE_KW,
    SEALED_KW,
    PARTIAL_KW,
    READONLY_KW,
    EXTERN_KW,
    NEW_KW,

    UNKNOWN,
    EOF,

    MODULE,
    NAMESPACE_DECL,
    TYPE_DECL,
    FN_DECL,
    FIELD_DECL,
    MODIFIER_LIST,
    PARAM_LIST,
    PARAM,
    NAME,
    BLOCK,
    LET_STMT,
    IF_STMT,
    ELSE_CLAUSE,
    WHILE_STMT,
    LABELED_STMT,
    GOTO_STMT,
    RETURN_STMT,
    EXPR_STMT,
    BINARY_EXPR,
    FIELD_EXPR,
    CALL_EXPR,
    ARG_LIST,
    NAME_REF,
    LITERAL,
    ERROR,
    TOMBSTONE,
}

const MODIFIERS: SyntaxSet = SyntaxSet::new([
    SyntaxKind::PUB_KW,
    SyntaxKind::PRIVATE_KW,
    SyntaxKind::PROTECTED_KW,
    SyntaxKind::INTERNAL_KW,
    SyntaxKind::STATIC_KW,
    SyntaxKind::ABSTRACT_KW,
    SyntaxKind::VIRTUAL_KW,
    SyntaxKind::OVERRIDE_KW,
    SyntaxKind::SEALED_KW,
    SyntaxKind::PARTIAL_KW,
    SyntaxKind::READONLY_KW,
    SyntaxKind::EXTERN_KW,
    SyntaxKind::NEW_KW,
]);

impl SyntaxKind {
    pub const fn is_trivia(self) -> bool {
        matches!(self, Self::WHITESPACE | Self::NEWLINE | Self::LINE_COMMENT)
    }

    pub const fn is_modifier(self) -> bool {
        MODIFIERS.contains(self)
    }

    pub const fn is_token(self) -> bool {
        (self as u16) < (Self::MODULE as u16)
    }
}
