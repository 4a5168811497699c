//! Signature encoders for the blobs the patcher adds to `#Blob`.
//!
//! Only local variable signatures are ever written. Existing signatures are extended by
//! copying their entries verbatim and appending the new slots, so that a type the parser
//! does not model in full still round-trips.

use crate::{
    file::io::push_compressed_uint,
    metadata::{
        signatures::{SignatureParser, TypeSignature, ELEMENT_TYPE, SIGNATURE_HEADER},
        tables::TableId,
        token::Token,
    },
    Error::SerializationFailed,
    Result,
};

/// Encode a `TypeDefOrRef` token in the compressed form used inside signatures
fn encode_type_def_or_ref(token: Token, buffer: &mut Vec<u8>) -> Result<()> {
    let tag = if token.is_table(TableId::TypeDef) {
        0
    } else if token.is_table(TableId::TypeRef) {
        1
    } else if token.is_table(TableId::TypeSpec) {
        2
    } else {
        return Err(SerializationFailed(format!(
            "{token} is not a TypeDefOrRef token"
        )));
    };

    push_compressed_uint(buffer, (token.row() << 2) | tag)
}

/// Append the encoding of `signature` to `buffer`
///
/// # Errors
/// Returns [`crate::Error::SerializationFailed`] for types that cannot appear in a local
/// slot written by the patcher.
pub fn encode_type_signature(signature: &TypeSignature, buffer: &mut Vec<u8>) -> Result<()> {
    match signature {
        TypeSignature::Void => buffer.push(ELEMENT_TYPE::VOID),
        TypeSignature::Boolean => buffer.push(ELEMENT_TYPE::BOOLEAN),
        TypeSignature::Char => buffer.push(ELEMENT_TYPE::CHAR),
        TypeSignature::I1 => buffer.push(ELEMENT_TYPE::I1),
        TypeSignature::U1 => buffer.push(ELEMENT_TYPE::U1),
        TypeSignature::I2 => buffer.push(ELEMENT_TYPE::I2),
        TypeSignature::U2 => buffer.push(ELEMENT_TYPE::U2),
        TypeSignature::I4 => buffer.push(ELEMENT_TYPE::I4),
        TypeSignature::U4 => buffer.push(ELEMENT_TYPE::U4),
        TypeSignature::I8 => buffer.push(ELEMENT_TYPE::I8),
        TypeSignature::U8 => buffer.push(ELEMENT_TYPE::U8),
        TypeSignature::R4 => buffer.push(ELEMENT_TYPE::R4),
        TypeSignature::R8 => buffer.push(ELEMENT_TYPE::R8),
        TypeSignature::String => buffer.push(ELEMENT_TYPE::STRING),
        TypeSignature::I => buffer.push(ELEMENT_TYPE::I),
        TypeSignature::U => buffer.push(ELEMENT_TYPE::U),
        TypeSignature::Object => buffer.push(ELEMENT_TYPE::OBJECT),
        TypeSignature::TypedByRef => buffer.push(ELEMENT_TYPE::TYPEDBYREF),
        TypeSignature::Ptr(base) => {
            buffer.push(ELEMENT_TYPE::PTR);
            encode_type_signature(base, buffer)?;
        }
        TypeSignature::ByRef(base) => {
            buffer.push(ELEMENT_TYPE::BYREF);
            encode_type_signature(base, buffer)?;
        }
        TypeSignature::Pinned(base) => {
            buffer.push(ELEMENT_TYPE::PINNED);
            encode_type_signature(base, buffer)?;
        }
        TypeSignature::SzArray(base) => {
            buffer.push(ELEMENT_TYPE::SZARRAY);
            encode_type_signature(base, buffer)?;
        }
        TypeSignature::Array(base, rank) => {
            buffer.push(ELEMENT_TYPE::ARRAY);
            encode_type_signature(base, buffer)?;
            push_compressed_uint(buffer, *rank)?;
            push_compressed_uint(buffer, 0)?;
            push_compressed_uint(buffer, 0)?;
        }
        TypeSignature::Class(token) => {
            buffer.push(ELEMENT_TYPE::CLASS);
            encode_type_def_or_ref(*token, buffer)?;
        }
        TypeSignature::ValueType(token) => {
            buffer.push(ELEMENT_TYPE::VALUETYPE);
            encode_type_def_or_ref(*token, buffer)?;
        }
        TypeSignature::GenericParamType(index) => {
            buffer.push(ELEMENT_TYPE::VAR);
            push_compressed_uint(buffer, *index)?;
        }
        TypeSignature::GenericParamMethod(index) => {
            buffer.push(ELEMENT_TYPE::MVAR);
            push_compressed_uint(buffer, *index)?;
        }
        TypeSignature::GenericInst(base, args) => {
            buffer.push(ELEMENT_TYPE::GENERICINST);
            encode_type_signature(base, buffer)?;
            push_compressed_uint(
                buffer,
                u32::try_from(args.len())
                    .map_err(|_| SerializationFailed("too many generic arguments".to_string()))?,
            )?;
            for arg in args {
                encode_type_signature(arg, buffer)?;
            }
        }
        TypeSignature::Unknown | TypeSignature::FnPtr(_) => {
            return Err(SerializationFailed(format!(
                "cannot encode local type {signature:?}"
            )))
        }
    }

    Ok(())
}

/// Build a local variable signature that holds the locals of `original` followed by
/// `added`.
///
/// The entries of `original` are copied byte for byte. Without an original signature the
/// result declares only the added locals.
///
/// # Errors
/// Returns an error if `original` is not a local variable signature or an added type
/// cannot be encoded.
pub fn extend_local_var_signature(
    original: Option<&[u8]>,
    added: &[TypeSignature],
) -> Result<Vec<u8>> {
    let (count, entries) = match original {
        Some(blob) => {
            let mut parser = SignatureParser::new(blob);
            let count = parser.parse_local_var_header()?;
            (count, &blob[parser.pos()..])
        }
        None => (0, &[][..]),
    };

    let added_count = u32::try_from(added.len())
        .map_err(|_| SerializationFailed("too many locals".to_string()))?;

    let mut buffer = Vec::with_capacity(4 + entries.len() + added.len() * 4);
    buffer.push(SIGNATURE_HEADER::LOCAL_SIG);
    push_compressed_uint(&mut buffer, count + added_count)?;
    buffer.extend_from_slice(entries);
    for local in added {
        encode_type_signature(local, &mut buffer)?;
    }

    Ok(buffer)
}
