use bitflags::bitflags;

bitflags! {
    /// Kind of an exception clause, ECMA-335 II.25.4.6
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExceptionHandlerFlags: u16 {
        /// A typed exception clause
        const EXCEPTION = 0x0000;
        /// An exception filter and handler clause
        const FILTER = 0x0001;
        /// A finally clause
        const FINALLY = 0x0002;
        /// Fault clause (finally that is called on exception only)
        const FAULT = 0x0004;
    }
}

/// An exception clause as stored in a method body, with byte offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Kind of the clause
    pub flags: ExceptionHandlerFlags,
    /// Offset of the protected block
    pub try_offset: u32,
    /// Length of the protected block
    pub try_length: u32,
    /// Offset of the handler
    pub handler_offset: u32,
    /// Length of the handler
    pub handler_length: u32,
    /// Catch type token for typed clauses, filter offset for filter clauses, else 0
    pub class_token_or_filter: u32,
}

impl ExceptionHandler {
    /// `true` if the clause fits the 12-byte small encoding
    #[must_use]
    pub fn fits_small(&self) -> bool {
        self.try_offset <= 0xFFFF
            && self.try_length <= 0xFF
            && self.handler_offset <= 0xFFFF
            && self.handler_length <= 0xFF
    }
}
