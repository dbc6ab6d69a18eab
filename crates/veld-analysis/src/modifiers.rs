//! Declaration-modifier validation and accessibility resolution.

use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use text_size::TextRange;
use veld_errors::Diagnostic;
use veld_syntax::SyntaxKind;

/// Bit-flag set of source modifier keywords on one declaration.
///
/// `protected internal` and `private protected` collapse to composite bits
/// during token conversion, so the accessibility portion of a well-formed set
/// holds at most one bit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DeclarationModifiers(u32);

impl DeclarationModifiers {
    pub const NONE: Self = Self(0);
    pub const ABSTRACT: Self = Self(1 << 0);
    pub const VIRTUAL: Self = Self(1 << 1);
    pub const OVERRIDE: Self = Self(1 << 2);
    pub const STATIC: Self = Self(1 << 3);
    pub const SEALED: Self = Self(1 << 4);
    pub const EXTERN: Self = Self(1 << 5);
    pub const PARTIAL: Self = Self(1 << 6);
    pub const READ_ONLY: Self = Self(1 << 7);
    pub const NEW: Self = Self(1 << 8);
    pub const PRIVATE: Self = Self(1 << 9);
    pub const PROTECTED: Self = Self(1 << 10);
    pub const INTERNAL: Self = Self(1 << 11);
    pub const PUBLIC: Self = Self(1 << 12);
    pub const PROTECTED_INTERNAL: Self = Self(1 << 13);
    pub const PRIVATE_PROTECTED: Self = Self(1 << 14);

    pub const ACCESSIBILITY_MASK: Self = Self(
        Self::PRIVATE.0
            | Self::PROTECTED.0
            | Self::INTERNAL.0
            | Self::PUBLIC.0
            | Self::PROTECTED_INTERNAL.0
            | Self::PRIVATE_PROTECTED.0,
    );

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Single-bit subsets, lowest bit first.
    pub fn iter(self) -> impl Iterator<Item = Self> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let low = bits & bits.wrapping_neg();
            bits ^= low;
            Some(Self(low))
        })
    }

    fn from_keyword(kind: SyntaxKind) -> Option<Self> {
        Some(match kind {
            SyntaxKind::ABSTRACT_KW => Self::ABSTRACT,
            SyntaxKind::VIRTUAL_KW => Self::VIRTUAL,
            SyntaxKind::OVERRIDE_KW => Self::OVERRIDE,
            SyntaxKind::STATIC_KW => Self::STATIC,
            SyntaxKind::SEALED_KW => Self::SEALED,
            SyntaxKind::EXTERN_KW => Self::EXTERN,
            SyntaxKind::PARTIAL_KW => Self::PARTIAL,
            SyntaxKind::READONLY_KW => Self::READ_ONLY,
            SyntaxKind::NEW_KW => Self::NEW,
            SyntaxKind::PRIVATE_KW => Self::PRIVATE,
            SyntaxKind::PROTECTED_KW => Self::PROTECTED,
            SyntaxKind::INTERNAL_KW => Self::INTERNAL,
            SyntaxKind::PUB_KW => Self::PUBLIC,
            _ => return None,
        })
    }

    /// Keyword spelling for single-bit sets, used in diagnostics.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::ABSTRACT => "abstract",
            Self::VIRTUAL => "virtual",
            Self::OVERRIDE => "override",
            Self::STATIC => "static",
            Self::SEALED => "sealed",
            Self::EXTERN => "extern",
            Self::PARTIAL => "partial",
            Self::READ_ONLY => "readonly",
            Self::NEW => "new",
            Self::PRIVATE => "private",
            Self::PROTECTED => "protected",
            Self::INTERNAL => "internal",
            Self::PUBLIC => "pub",
            Self::PROTECTED_INTERNAL => "protected internal",
            Self::PRIVATE_PROTECTED => "private protected",
            _ => "<modifiers>",
        }
    }

    /// Converts modifier tokens to a bit-set, in source order.
    ///
    /// A repeated modifier is reported once no matter how often it repeats.
    /// Non-modifier kinds are skipped so callers can feed raw token streams.
    pub fn from_tokens(
        tokens: impl IntoIterator<Item = (SyntaxKind, TextRange)>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Self {
        let mut result = Self::NONE;
        let mut reported = Self::NONE;

        for (kind, range) in tokens {
            let Some(modifier) = Self::from_keyword(kind) else { continue };
            if result.contains(modifier) {
                if !reported.contains(modifier) {
                    diagnostics.push(Diagnostic::error(
                        "duplicate-modifier",
                        format!("duplicate modifier `{}`", modifier.display_name()),
                        range,
                    ));
                    reported |= modifier;
                }
                continue;
            }
            result |= modifier;
        }

        result.collapse_composite_accessibility()
    }

    fn collapse_composite_accessibility(self) -> Self {
        if self.contains(Self::PROTECTED | Self::INTERNAL) {
            return Self(self.0 & !(Self::PROTECTED.0 | Self::INTERNAL.0))
                | Self::PROTECTED_INTERNAL;
        }
        if self.contains(Self::PRIVATE | Self::PROTECTED) {
            return Self(self.0 & !(Self::PRIVATE.0 | Self::PROTECTED.0))
                | Self::PRIVATE_PROTECTED;
        }
        self
    }
}

impl BitOr for DeclarationModifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DeclarationModifiers {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for DeclarationModifiers {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for DeclarationModifiers {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// Declared accessibility after composite decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Accessibility {
    None,
    Private,
    Protected,
    Internal,
    Public,
    ProtectedInternal,
    PrivateProtected,
}

/// Maps accessibility bits to exactly one value, for every input.
///
/// Mixed combinations such as `pub private` already produced an error during
/// modifier checking; defaulting them to `Public` here lets binding continue
/// without a second cascade.
pub fn effective_accessibility(modifiers: DeclarationModifiers) -> Accessibility {
    let access = modifiers & DeclarationModifiers::ACCESSIBILITY_MASK;
    if access == DeclarationModifiers::NONE {
        Accessibility::None
    } else if access == DeclarationModifiers::PRIVATE {
        Accessibility::Private
    } else if access == DeclarationModifiers::PROTECTED {
        Accessibility::Protected
    } else if access == DeclarationModifiers::INTERNAL {
        Accessibility::Internal
    } else if access == DeclarationModifiers::PUBLIC {
        Accessibility::Public
    } else if access == DeclarationModifiers::PROTECTED_INTERNAL {
        Accessibility::ProtectedInternal
    } else if access == DeclarationModifiers::PRIVATE_PROTECTED {
        Accessibility::PrivateProtected
    } else {
        Accessibility::Public
    }
}

/// Validates `requested` against `allowed`, reporting one diagnostic per
/// illegal modifier, lowest bit first. Returns the surviving set and whether
/// any modifier was rejected.
///
/// When `static` is both requested and allowed, `abstract`, `virtual` and
/// `override` become disallowed for this call and are reported with a
/// conflict message instead of the generic one. `is_for_interface_member`
/// only selects the wording of the generic rejection.
pub fn check_modifiers(
    is_for_type_declaration: bool,
    is_for_interface_member: bool,
    requested: DeclarationModifiers,
    allowed: DeclarationModifiers,
    range: TextRange,
    diagnostics: &mut Vec<Diagnostic>,
) -> (DeclarationModifiers, bool) {
    use DeclarationModifiers as Mods;

    let static_conflicts = if !is_for_type_declaration
        && requested.contains(Mods::STATIC)
        && allowed.contains(Mods::STATIC)
    {
        requested & (Mods::ABSTRACT | Mods::VIRTUAL | Mods::OVERRIDE)
    } else {
        Mods::NONE
    };

    let result = Mods((requested & allowed).0 & !static_conflicts.0);
    let error_set = Mods((requested & !allowed).0 & !static_conflicts.0);

    for modifier in (error_set | static_conflicts).iter() {
        let message = if static_conflicts.contains(modifier) {
            format!("static member cannot be marked `{}`", modifier.display_name())
        } else if is_for_interface_member {
            format!("modifier `{}` is not valid for an interface member", modifier.display_name())
        } else {
            format!("modifier `{}` is not valid for this item", modifier.display_name())
        };
        diagnostics.push(Diagnostic::error("invalid-modifier", message, range));
    }

    let had_errors = !error_set.is_empty() || !static_conflicts.is_empty();
    (result, had_errors)
}

/// Applies the default-members-have-bodies rule to an interface member.
///
/// A member that is not an explicit implementation and carries none of
/// `private`/`partial`/`virtual`/`abstract` becomes implicitly virtual when
/// it has a body (or is extern or sealed; sealed is consumed and suppresses
/// the virtual), otherwise implicitly abstract. Missing accessibility
/// defaults to public, or private for partial and explicit implementations.
pub fn adjust_for_interface_member(
    modifiers: DeclarationModifiers,
    has_body: bool,
    is_explicit_interface_implementation: bool,
) -> DeclarationModifiers {
    use DeclarationModifiers as Mods;

    let mut result = modifiers;
    if !is_explicit_interface_implementation
        && !result.intersects(Mods::PRIVATE | Mods::PARTIAL | Mods::VIRTUAL | Mods::ABSTRACT)
    {
        if has_body || result.intersects(Mods::EXTERN | Mods::SEALED) {
            if result.contains(Mods::SEALED) {
                result = Mods(result.0 & !Mods::SEALED.0);
            } else {
                result |= Mods::VIRTUAL;
            }
        } else {
            result |= Mods::ABSTRACT;
        }
    }

    if (result & Mods::ACCESSIBILITY_MASK).is_empty() {
        if !result.contains(Mods::PARTIAL) && !is_explicit_interface_implementation {
            result |= Mods::PUBLIC;
        } else {
            result |= Mods::PRIVATE;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use text_size::TextSize;

    use super::*;

    fn range() -> TextRange {
        TextRange::new(TextSize::new(0), TextSize::new(6))
    }

    #[test]
    fn duplicate_modifier_reported_once() {
        let mut diagnostics = Vec::new();
        let tokens = [
            (SyntaxKind::PUB_KW, range()),
            (SyntaxKind::STATIC_KW, range()),
            (SyntaxKind::STATIC_KW, range()),
            (SyntaxKind::STATIC_KW, range()),
        ];
        let modifiers = DeclarationModifiers::from_tokens(tokens, &mut diagnostics);

        assert_eq!(modifiers, DeclarationModifiers::PUBLIC | DeclarationModifiers::STATIC);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message(), "duplicate modifier `static`");
    }

    #[test]
    fn composite_accessibility_collapses() {
        let mut diagnostics = Vec::new();
        let tokens = [(SyntaxKind::PROTECTED_KW, range()), (SyntaxKind::INTERNAL_KW, range())];
        let modifiers = DeclarationModifiers::from_tokens(tokens, &mut diagnostics);
        assert_eq!(modifiers, DeclarationModifiers::PROTECTED_INTERNAL);

        let tokens = [(SyntaxKind::PRIVATE_KW, range()), (SyntaxKind::PROTECTED_KW, range())];
        let modifiers = DeclarationModifiers::from_tokens(tokens, &mut diagnostics);
        assert_eq!(modifiers, DeclarationModifiers::PRIVATE_PROTECTED);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn static_demotes_virtual_with_conflict_message() {
        use DeclarationModifiers as Mods;

        let requested = Mods::PUBLIC | Mods::STATIC | Mods::VIRTUAL;
        let allowed = Mods::PUBLIC | Mods::STATIC | Mods::ABSTRACT | Mods::OVERRIDE;

        let mut diagnostics = Vec::new();
        let (resolved, had_errors) =
            check_modifiers(false, false, requested, allowed, range(), &mut diagnostics);

        assert_eq!(resolved, Mods::PUBLIC | Mods::STATIC);
        assert!(had_errors);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message(), "static member cannot be marked `virtual`");
    }

    #[test]
    fn interface_member_rejections_use_their_own_wording() {
        use DeclarationModifiers as Mods;

        let requested = Mods::PUBLIC | Mods::READ_ONLY;
        let allowed = Mods::PUBLIC | Mods::STATIC | Mods::ABSTRACT;

        let mut diagnostics = Vec::new();
        let (resolved, had_errors) =
            check_modifiers(false, true, requested, allowed, range(), &mut diagnostics);

        assert_eq!(resolved, Mods::PUBLIC);
        assert!(had_errors);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message(),
            "modifier `readonly` is not valid for an interface member"
        );
    }

    #[test]
    fn illegal_modifiers_reported_lowest_bit_first() {
        use DeclarationModifiers as Mods;

        let requested = Mods::ABSTRACT | Mods::SEALED | Mods::PUBLIC;
        let allowed = Mods::PUBLIC;

        let mut diagnostics = Vec::new();
        let (resolved, had_errors) =
            check_modifiers(false, false, requested, allowed, range(), &mut diagnostics);

        assert_eq!(resolved, Mods::PUBLIC);
        assert!(had_errors);
        let messages: Vec<_> = diagnostics.iter().map(Diagnostic::message).collect();
        assert_eq!(messages, [
            "modifier `abstract` is not valid for this item",
            "modifier `sealed` is not valid for this item",
        ]);
    }

    #[test]
    fn check_modifiers_is_idempotent() {
        use DeclarationModifiers as Mods;

        let requested = Mods::PUBLIC | Mods::STATIC | Mods::VIRTUAL;
        let allowed = Mods::PUBLIC | Mods::STATIC | Mods::ABSTRACT | Mods::OVERRIDE;

        let mut diagnostics = Vec::new();
        let (resolved, _) =
            check_modifiers(false, false, requested, allowed, range(), &mut diagnostics);
        let (again, had_errors) =
            check_modifiers(false, false, resolved, allowed, range(), &mut diagnostics);

        assert_eq!(again, resolved);
        assert!(!had_errors);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn effective_accessibility_is_total() {
        use DeclarationModifiers as Mods;

        let single_bits = [
            Mods::PRIVATE,
            Mods::PROTECTED,
            Mods::INTERNAL,
            Mods::PUBLIC,
            Mods::PROTECTED_INTERNAL,
            Mods::PRIVATE_PROTECTED,
        ];

        for pattern in 0u32..64 {
            let mut modifiers = Mods::NONE;
            for (index, &bit) in single_bits.iter().enumerate() {
                if pattern & (1 << index) != 0 {
                    modifiers |= bit;
                }
            }
            // Every combination decodes; mixed ones default to Public.
            let access = effective_accessibility(modifiers | Mods::STATIC);
            if modifiers.iter().count() > 1 {
                assert_eq!(access, Accessibility::Public, "pattern {pattern:#b}");
            }
        }

        assert_eq!(effective_accessibility(Mods::STATIC), Accessibility::None);
        assert_eq!(
            effective_accessibility(Mods::PUBLIC | Mods::PRIVATE),
            Accessibility::Public
        );
        assert_eq!(
            effective_accessibility(Mods::PRIVATE_PROTECTED),
            Accessibility::PrivateProtected
        );
    }

    #[test]
    fn interface_member_with_body_becomes_virtual_and_public() {
        use DeclarationModifiers as Mods;

        let adjusted = adjust_for_interface_member(Mods::NONE, true, false);
        assert_eq!(adjusted, Mods::VIRTUAL | Mods::PUBLIC);

        let adjusted = adjust_for_interface_member(Mods::SEALED, true, false);
        assert_eq!(adjusted, Mods::PUBLIC);

        let adjusted = adjust_for_interface_member(Mods::NONE, false, false);
        assert_eq!(adjusted, Mods::ABSTRACT | Mods::PUBLIC);

        let adjusted = adjust_for_interface_member(Mods::NONE, true, true);
        assert_eq!(adjusted, Mods::PRIVATE);
    }
}
