//! Flag types for nodes and tokens.

bitflags::bitflags! {
    /// Flags for AST nodes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u16 {
        const NONE                = 0;
        const LET                 = 1 << 0;
        const CONST               = 1 << 1;
        /// Set on a node the parser had to recover from.
        const THIS_NODE_HAS_ERROR = 1 << 2;

        const BLOCK_SCOPED = Self::LET.bits() | Self::CONST.bits();
    }
}

bitflags::bitflags! {
    /// Flags recorded by the scanner for the current token.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TokenFlags: u16 {
        const NONE                 = 0;
        const PRECEDING_LINE_BREAK = 1 << 0;
        const UNTERMINATED         = 1 << 1;
        const SCIENTIFIC           = 1 << 2;
        const HEX_SPECIFIER        = 1 << 3;
        const OCTAL                = 1 << 4;
        const UNICODE_ESCAPE       = 1 << 5;

        const NUMERIC_LITERAL_FLAGS = Self::SCIENTIFIC.bits()
            | Self::HEX_SPECIFIER.bits()
            | Self::OCTAL.bits();
    }
}
