//! Metadata parsing and re-encoding for .NET executables.
//!
//! This module holds the ECMA-335 structures the patcher reads and rewrites. Everything
//! here is deliberately low level: tables are kept as raw column values so that every
//! row survives a rewrite unchanged, and heaps are kept as byte buffers that new entries
//! are appended to.
//!
//! # Key Components
//!
//! - [`cor20header`] - The CLI header that points at the metadata
//! - [`root`] - The `BSJB` metadata root and its stream directory
//! - [`streams`] - `#Strings`, `#Blob`, `#GUID` and the `#~` tables stream
//! - [`tables`] - Table ids, coded indices, column schemas and typed row views
//! - [`signatures`] - Method, field and local variable signatures
//! - [`method`] - Method body headers and exception clauses
//! - [`token`] - Metadata table row references
//!
//! # Examples
//!
//! ```rust,no_run
//! use autofish::metadata::{cor20header::Cor20Header, root::Root};
//! use autofish::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("Terraria.exe"))?;
//! let (clr_rva, clr_size) = file.clr();
//! let header = Cor20Header::read(file.data_slice(file.rva_to_offset(clr_rva)?, clr_size)?)?;
//!
//! let metadata_offset = file.rva_to_offset(header.meta_data_rva as usize)?;
//! let root = Root::read(file.data_slice(metadata_offset, header.meta_data_size as usize)?)?;
//! println!("Runtime version: {}", root.version);
//! # Ok::<(), autofish::Error>(())
//! ```

/// Implementation of the Header of CIL
pub mod cor20header;
/// Method body headers and exception clauses
pub mod method;
/// Implementation of the metadata root
pub mod root;
/// Signature parsing and encoding
pub mod signatures;
/// Metadata streams
pub mod streams;
/// Metadata tables
pub mod tables;
/// Metadata tokens
pub mod token;
