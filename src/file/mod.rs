//! PE file abstraction.
//!
//! This module loads a Portable Executable that carries a CLR runtime header and exposes
//! what the rest of the crate needs from the container format: raw data access, section
//! headers, RVA to file offset translation and the offsets of the header fields that the
//! serializer rewrites when it appends a section.
//!
//! # Key Components
//!
//! - [`File`] - The loaded image with its layout facts
//! - [`Backend`] - Trait for data sources (memory-mapped file, owned buffer)
//! - [`Parser`] - Little-endian cursor used by the metadata and IL readers
//! - [`io`] - Primitive read/write helpers and compressed integers
//!
//! PE parsing and validation go through `goblin`. The raw offsets of the COFF header, the
//! optional header and the section table are read directly, since the serializer needs to
//! patch them in place.
//!
//! # Examples
//!
//! ```rust,no_run
//! use autofish::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("Terraria.exe"))?;
//! let (clr_rva, clr_size) = file.clr();
//! let clr_offset = file.rva_to_offset(clr_rva)?;
//! println!("CLR header at 0x{:x} ({} bytes)", clr_offset, clr_size);
//! # Ok::<(), autofish::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use goblin::pe::{section_table::SectionTable, PE};

use crate::{
    file::io::read_le,
    Error::{Empty, GoblinErr, OutOfBounds},
    Result,
};
use memory::Memory;
use physical::Physical;

pub use parser::Parser;

/// Size in bytes of one section table entry
pub const SECTION_HEADER_SIZE: usize = 40;

/// Index of the CLR runtime header in the data directory array
pub const CLR_DIRECTORY_INDEX: usize = 14;

/// Backend trait for file data sources.
///
/// Abstracts over an owned buffer and a memory-mapped file, so that the same loading code
/// serves the CLI (which maps the executable) and tests (which build images in memory).
pub trait Backend: Send + Sync {
    /// Returns a bounds-checked slice of the data.
    ///
    /// # Errors
    /// Returns an error if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// Raw header offsets and alignment facts of a PE image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeLayout {
    /// File offset of the `PE\0\0` signature
    pub pe_offset: usize,
    /// File offset of the COFF file header
    pub coff_offset: usize,
    /// File offset of the optional header
    pub optional_header_offset: usize,
    /// Declared size of the optional header
    pub optional_header_size: usize,
    /// File offset of the first section header
    pub section_table_offset: usize,
    /// Number of section headers
    pub number_of_sections: u16,
    /// `true` for PE32+ images
    pub is_pe32plus: bool,
    /// Section alignment in memory
    pub section_alignment: u32,
    /// Section alignment on disk
    pub file_alignment: u32,
    /// Size of all headers, rounded to the file alignment
    pub size_of_headers: u32,
    /// Size of the loaded image
    pub size_of_image: u32,
}

impl PeLayout {
    fn read(data: &[u8]) -> Result<PeLayout> {
        let pe_offset = read_le::<u32>(data.get(0x3C..).ok_or(OutOfBounds)?)? as usize;
        let coff_offset = pe_offset + 4;
        let coff = data.get(coff_offset..).ok_or(OutOfBounds)?;

        let number_of_sections = read_le::<u16>(coff.get(2..).ok_or(OutOfBounds)?)?;
        let optional_header_size = read_le::<u16>(coff.get(16..).ok_or(OutOfBounds)?)? as usize;

        let optional_header_offset = coff_offset + 20;
        let optional = data.get(optional_header_offset..).ok_or(OutOfBounds)?;
        let is_pe32plus = match read_le::<u16>(optional)? {
            0x10B => false,
            0x20B => true,
            magic => return Err(malformed_error!("Unknown optional header magic - 0x{:X}", magic)),
        };

        let field = |offset: usize| -> Result<u32> {
            read_le::<u32>(optional.get(offset..).ok_or(OutOfBounds)?)
        };

        Ok(PeLayout {
            pe_offset,
            coff_offset,
            optional_header_offset,
            optional_header_size,
            section_table_offset: optional_header_offset + optional_header_size,
            number_of_sections,
            is_pe32plus,
            section_alignment: field(32)?,
            file_alignment: field(36)?,
            size_of_image: field(56)?,
            size_of_headers: field(60)?,
        })
    }

    /// File offset of the `NumberOfSections` field
    #[must_use]
    pub fn number_of_sections_offset(&self) -> usize {
        self.coff_offset + 2
    }

    /// File offset of the `SizeOfInitializedData` field
    #[must_use]
    pub fn size_of_initialized_data_offset(&self) -> usize {
        self.optional_header_offset + 8
    }

    /// File offset of the `SizeOfImage` field
    #[must_use]
    pub fn size_of_image_offset(&self) -> usize {
        self.optional_header_offset + 56
    }

    /// File offset of the `CheckSum` field
    #[must_use]
    pub fn checksum_offset(&self) -> usize {
        self.optional_header_offset + 64
    }

    /// File offset of the data directory entry `index`
    #[must_use]
    pub fn data_directory_offset(&self, index: usize) -> usize {
        let base = if self.is_pe32plus { 112 } else { 96 };
        self.optional_header_offset + base + index * 8
    }

    /// File offset right after the last section header
    #[must_use]
    pub fn section_table_end(&self) -> usize {
        self.section_table_offset + usize::from(self.number_of_sections) * SECTION_HEADER_SIZE
    }
}

/// A loaded PE file with a CLR runtime header.
///
/// # Examples
///
/// ```rust,no_run
/// use autofish::File;
///
/// let data = std::fs::read("Terraria.exe")?;
/// let file = File::from_mem(data)?;
/// for section in file.sections() {
///     let name = std::str::from_utf8(&section.name).unwrap_or("<invalid>");
///     println!("{} at RVA 0x{:x}", name.trim_end_matches('\0'), section.virtual_address);
/// }
/// # Ok::<(), autofish::Error>(())
/// ```
pub struct File {
    data: Box<dyn Backend>,
    layout: PeLayout,
    sections: Vec<SectionTable>,
    clr: (usize, usize),
}

impl File {
    /// Loads and memory-maps a PE file from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not a PE image, or has no CLR
    /// runtime header.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Loads a PE file from a memory buffer.
    ///
    /// # Errors
    /// Returns an error if the buffer is empty, is not a PE image, or has no CLR runtime
    /// header.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let (sections, clr) = {
            let pe = PE::parse(data.data()).map_err(GoblinErr)?;
            let Some(optional_header) = pe.header.optional_header else {
                return Err(malformed_error!("File does not have an OptionalHeader"));
            };

            let Some(clr_dir) = optional_header.data_directories.get_clr_runtime_header()
            else {
                return Err(malformed_error!(
                    "File does not have a CLR runtime header directory"
                ));
            };

            (
                pe.sections.clone(),
                (clr_dir.virtual_address as usize, clr_dir.size as usize),
            )
        };

        let layout = PeLayout::read(data.data())?;

        Ok(File {
            data: Box::new(data),
            layout,
            sections,
            clr,
        })
    }

    /// Returns the total size of the loaded file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the file has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the complete file data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns a bounds-checked slice of the file data.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the file.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }

    /// Returns the raw header layout.
    #[must_use]
    pub fn layout(&self) -> &PeLayout {
        &self.layout
    }

    /// Returns the section headers.
    pub fn sections(&self) -> impl Iterator<Item = &SectionTable> {
        self.sections.iter()
    }

    /// Returns the RVA and size of the CLR runtime header.
    #[must_use]
    pub fn clr(&self) -> (usize, usize) {
        self.clr
    }

    /// Converts a relative virtual address to a file offset.
    ///
    /// RVAs inside the headers map to themselves.
    ///
    /// # Errors
    /// Returns an error if no section contains the RVA.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        if rva < self.layout.size_of_headers as usize {
            return Ok(rva);
        }

        for section in &self.sections {
            let start = section.virtual_address as usize;
            let extent = section.virtual_size.max(section.size_of_raw_data) as usize;
            let Some(end) = start.checked_add(extent) else {
                return Err(malformed_error!(
                    "Section malformed, causing integer overflow - {} + {}",
                    start,
                    extent
                ));
            };

            if rva >= start && rva < end {
                let delta = rva - start;
                if delta >= section.size_of_raw_data as usize {
                    return Err(malformed_error!(
                        "RVA 0x{:x} points into uninitialized section data",
                        rva
                    ));
                }
                return Ok(section.pointer_to_raw_data as usize + delta);
            }
        }

        Err(malformed_error!(
            "RVA could not be converted to offset - 0x{:x}",
            rva
        ))
    }
}
