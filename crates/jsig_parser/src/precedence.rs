//! Binding power of binary operators.

use jsig_ast::syntax_kind::SyntaxKind;

/// How tightly a binary operator binds. Higher binds tighter; operands of an
/// operator are parsed at its own level so that equal levels associate left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Precedence(u8);

impl Precedence {
    /// Floor used when parsing the condition of `a ? b : c`; every binary
    /// operator binds tighter.
    pub const LOWEST: Precedence = Precedence(0);

    /// Binding power of `kind` used as a binary operator, or `None` if the
    /// token does not continue a binary expression. Assignment is handled
    /// separately because it associates right.
    pub fn of_binary(kind: SyntaxKind) -> Option<Precedence> {
        use SyntaxKind::*;
        let level = match kind {
            BarBarToken => 1,
            AmpersandAmpersandToken => 2,
            BarToken => 3,
            CaretToken => 4,
            AmpersandToken => 5,
            EqualsEqualsToken | ExclamationEqualsToken | EqualsEqualsEqualsToken | ExclamationEqualsEqualsToken => 6,
            LessThanToken | GreaterThanToken | LessThanEqualsToken | GreaterThanEqualsToken | InstanceOfKeyword
            | InKeyword => 7,
            LessThanLessThanToken | GreaterThanGreaterThanToken | GreaterThanGreaterThanGreaterThanToken => 8,
            PlusToken | MinusToken => 9,
            AsteriskToken | SlashToken | PercentToken => 10,
            _ => return None,
        };
        Some(Precedence(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplicative_binds_tighter_than_additive() {
        assert!(Precedence::of_binary(SyntaxKind::AsteriskToken) > Precedence::of_binary(SyntaxKind::PlusToken));
        assert!(Precedence::of_binary(SyntaxKind::BarBarToken) > Some(Precedence::LOWEST));
    }

    #[test]
    fn test_assignment_is_not_binary() {
        assert_eq!(Precedence::of_binary(SyntaxKind::EqualsToken), None);
        assert_eq!(Precedence::of_binary(SyntaxKind::QuestionToken), None);
    }
}
