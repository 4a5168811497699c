//! The `#Blob` heap, ECMA-335 II.24.2.4.
//!
//! Blobs are length-prefixed with a compressed integer. The heap is append-only from the
//! patcher's point of view: new local variable signatures are added at the end and existing
//! blobs are never touched, so every blob index held by a table row stays valid.

use crate::{
    file::{io::push_compressed_uint, parser::Parser},
    Error::OutOfBounds,
    Result,
};

/// View over the `#Blob` heap
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Create a view over the heap
    ///
    /// # Errors
    /// Returns an error if the heap is empty or does not start with the empty blob.
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Invalid memory for #Blob heap"));
        }

        Ok(Blob { data })
    }

    /// Get the blob starting at byte `index`, without its length prefix
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob exceeds the heap.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(&self.data[index..]);
        let len = parser.read_compressed_uint()? as usize;
        parser.read_bytes(len)
    }
}

/// Append `blob` to a heap buffer and return its index
///
/// # Errors
/// Returns an error if the blob is too large for a compressed length prefix, or the heap
/// outgrows a 32-bit index.
pub fn append_blob(heap: &mut Vec<u8>, blob: &[u8]) -> Result<u32> {
    if heap.is_empty() {
        heap.push(0);
    }

    let index =
        u32::try_from(heap.len()).map_err(|_| malformed_error!("#Blob heap exceeds 4GB"))?;
    let len = u32::try_from(blob.len()).map_err(|_| malformed_error!("Blob too large"))?;

    push_compressed_uint(heap, len)?;
    heap.extend_from_slice(blob);

    Ok(index)
}
