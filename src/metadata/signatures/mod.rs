//! Signature blobs, ECMA-335 II.23.2.
//!
//! The patcher reads three kinds of signatures: method signatures (to count parameters and
//! derive the stack effect of a call), field signatures (to disambiguate fields by type
//! name, for example `Single[]`) and local variable signatures (to validate slot types and
//! to extend them with new locals).
//!
//! # Examples
//!
//! ```rust
//! use autofish::metadata::signatures::{parse_local_var_signature, TypeSignature};
//!
//! let locals = parse_local_var_signature(&[0x07, 0x02, 0x08, 0x0E])?;
//! assert_eq!(locals.locals[0].base, TypeSignature::I4);
//! assert_eq!(locals.locals[1].base, TypeSignature::String);
//! # Ok::<(), autofish::Error>(())
//! ```

mod encoders;
mod parser;
mod types;

pub use encoders::{encode_type_signature, extend_local_var_signature};
pub use parser::SignatureParser;
pub use types::*;

use crate::Result;

/// Parse a method signature blob
///
/// # Errors
/// Returns an error if the blob is not a valid method signature.
pub fn parse_method_signature(data: &[u8]) -> Result<SignatureMethod> {
    SignatureParser::new(data).parse_method_signature()
}

/// Parse a field signature blob
///
/// # Errors
/// Returns an error if the blob is not a valid field signature.
pub fn parse_field_signature(data: &[u8]) -> Result<SignatureField> {
    SignatureParser::new(data).parse_field_signature()
}

/// Parse a local variable signature blob
///
/// # Errors
/// Returns an error if the blob is not a valid local variable signature.
pub fn parse_local_var_signature(data: &[u8]) -> Result<SignatureLocalVariables> {
    SignatureParser::new(data).parse_local_var_signature()
}
