//! Metadata tokens.
//!
//! A token is a 32-bit value where the high byte is the table id and the low 24 bits are the
//! 1-based row index. Tokens appear as operands of `ldfld`, `call`, `newobj`... and are the
//! identity the patcher embeds into every instruction it synthesizes.

use std::fmt;

use crate::metadata::tables::TableId;

/// A metadata token referring to one row of one table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Token(pub u32);

impl Token {
    /// Create a token from its raw value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Create a token from a table and a 1-based row
    #[must_use]
    pub fn from_parts(table: TableId, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// The raw value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table byte
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The 1-based row index
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// `true` if this is the null token
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// `true` if the token points into `table`
    #[must_use]
    pub fn is_table(&self, table: TableId) -> bool {
        self.table() == table as u8
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts() {
        let token = Token::from_parts(TableId::MethodDef, 5);
        assert_eq!(token.value(), 0x0600_0005);
        assert_eq!(token.table(), 0x06);
        assert_eq!(token.row(), 5);
        assert!(token.is_table(TableId::MethodDef));
        assert!(!token.is_table(TableId::Field));
    }

    #[test]
    fn null() {
        assert!(Token::default().is_null());
        assert!(!Token(0x0400_0001).is_null());
    }

    #[test]
    fn formatting() {
        let token = Token(0x0A00_0012);
        assert_eq!(format!("{token}"), "0x0a000012");
        assert_eq!(
            format!("{token:?}"),
            "Token(0x0a000012, table: 0x0a, row: 18)"
        );
    }
}
