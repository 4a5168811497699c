//! The CLI (Cor20) header, ECMA-335 II.25.3.3.
//!
//! Only the metadata directory is ever rewritten by the serializer. The remaining fields are
//! parsed so that `info` can report them and so that a strong-name signed image can be
//! recognized before it is patched.

use bitflags::bitflags;

use crate::{file::parser::Parser, Error::OutOfBounds, Result};

/// Size of the CLI header in bytes
pub const COR20_HEADER_SIZE: usize = 72;

/// Offset of the `MetaData` RVA inside the CLI header
pub const META_DATA_DIRECTORY_OFFSET: usize = 8;

bitflags! {
    /// Runtime flags of the CLI header
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CorFlags: u32 {
        /// The image contains only IL code
        const ILONLY = 0x0000_0001;
        /// The image can only be loaded into a 32-bit process
        const REQUIRE_32BIT = 0x0000_0002;
        /// The image has a strong name signature
        const STRONG_NAME_SIGNED = 0x0000_0008;
        /// The entry point is a native function
        const NATIVE_ENTRYPOINT = 0x0000_0010;
        /// Debug data is tracked
        const TRACK_DEBUG_DATA = 0x0001_0000;
        /// The image prefers to run as a 32-bit process
        const PREFER_32BIT = 0x0002_0000;
    }
}

/// The CLI header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cor20Header {
    /// Size of the header, always 72
    pub cb: u32,
    /// Minimum runtime major version
    pub major_runtime_version: u16,
    /// Minimum runtime minor version
    pub minor_runtime_version: u16,
    /// RVA of the metadata root
    pub meta_data_rva: u32,
    /// Size of the metadata
    pub meta_data_size: u32,
    /// Runtime flags
    pub flags: CorFlags,
    /// Entry point `MethodDef` token (or file token)
    pub entry_point_token: u32,
    /// RVA of the managed resources
    pub resource_rva: u32,
    /// Size of the managed resources
    pub resource_size: u32,
    /// RVA of the strong name signature blob
    pub strong_name_signature_rva: u32,
    /// Size of the strong name signature blob
    pub strong_name_signature_size: u32,
}

impl Cor20Header {
    /// Parse the CLI header from the start of `data`
    ///
    /// # Errors
    /// Returns an error if the header is truncated or structurally invalid.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < COR20_HEADER_SIZE {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()?;
        if cb as usize != COR20_HEADER_SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;

        let meta_data_rva = parser.read_le::<u32>()?;
        let meta_data_size = parser.read_le::<u32>()?;
        if meta_data_rva == 0 || meta_data_size == 0 {
            return Err(malformed_error!("Metadata directory cannot be empty"));
        }

        let flags = CorFlags::from_bits_retain(parser.read_le::<u32>()?);
        let entry_point_token = parser.read_le::<u32>()?;

        let resource_rva = parser.read_le::<u32>()?;
        let resource_size = parser.read_le::<u32>()?;

        let strong_name_signature_rva = parser.read_le::<u32>()?;
        let strong_name_signature_size = parser.read_le::<u32>()?;

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
            entry_point_token,
            resource_rva,
            resource_size,
            strong_name_signature_rva,
            strong_name_signature_size,
        })
    }

    /// `true` if the image carries a strong name signature that patching will invalidate
    #[must_use]
    pub fn is_strong_name_signed(&self) -> bool {
        self.flags.contains(CorFlags::STRONG_NAME_SIGNED) && self.strong_name_signature_size != 0
    }
}
