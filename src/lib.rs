// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # autofish
//!
//! Patches the Terraria executable so fishing plays itself: a fish is reeled in the moment
//! it bites, and the rod is cast again as soon as no bobber is out.
//!
//! The crate reads the .NET executable, finds the two places the game decides these
//! things, splices small CIL fragments in front of them and writes the result back, keeping
//! a backup of the unpatched game. It never needs the .NET runtime or Windows.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use autofish::prelude::*;
//!
//! let report = Patcher::new(PatchConfig::from_env()).run()?;
//! println!("{} -> {} bytes", report.original_size, report.patched_size);
//! # Ok::<(), autofish::Error>(())
//! ```
//!
//! ### Working on a module directly
//!
//! ```rust,no_run
//! use autofish::{autofish::patch_module, config::PatchConfig, Module};
//! use std::path::Path;
//!
//! let mut module = Module::from_file(Path::new("Terraria.exe"))?;
//! for outcome in patch_module(&mut module, &PatchConfig::new())? {
//!     println!("{} at {} via '{}'", outcome.patch, outcome.method, outcome.pattern);
//! }
//! module.write(Path::new("Terraria.patched.exe"))?;
//! # Ok::<(), autofish::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - PE image access, memory mapped or in memory
//! - [`metadata`] - ECMA-335 metadata root, streams, tables, signatures and method bodies
//! - [`assembly`] - CIL opcodes, instructions and the instruction list with stable identities
//! - [`module`] - Symbol resolution, decoded bodies and serialization of a patched image
//! - [`patch`] - Pattern matching, fragment building and splicing
//! - [`autofish`] - The two game patches and the [`autofish::Patcher`] pipeline
//! - [`backup`] and [`config`] - Backup bookkeeping and run settings
//! - [`Error`] and [`Result`] - Error handling

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// PE file access.
///
/// [`File`] maps or owns the bytes of the executable and translates RVAs to file offsets;
/// [`Parser`] is the little-endian cursor the metadata and IL readers are built on.
pub mod file;

/// Definitions and parsing of CIL metadata based on ECMA-335.
///
/// Only what patching needs is modelled: the CLI header, the metadata root and its
/// streams, the raw table rows, signatures and method body headers.
pub mod metadata;

/// CIL instructions: opcodes, decoding, encoding and the instruction list.
///
/// # Examples
///
/// ```rust
/// use autofish::assembly::decode_stream;
///
/// let decoded = decode_stream(&[0x00, 0x2A])?; // nop, ret
/// assert_eq!(decoded.instructions.len(), 2);
/// # Ok::<(), autofish::Error>(())
/// ```
pub mod assembly;

/// A loaded executable with resolvable symbols and editable method bodies.
pub mod module;

/// Locating, building and splicing instruction fragments.
pub mod patch;

/// The autofish patches and the patch pipeline.
pub mod autofish;

/// Backup and restore of the game executable.
pub mod backup;

/// Settings of a patch run.
pub mod config;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use autofish::prelude::*;
///
/// let inspection = Patcher::new(PatchConfig::new()).inspect()?;
/// println!("{} {:?}", inspection.module, inspection.backup);
/// # Ok::<(), autofish::Error>(())
/// ```
pub mod prelude;

/// `autofish` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `autofish` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use autofish::{autofish::Patcher, config::PatchConfig, Error};
///
/// match Patcher::new(PatchConfig::new()).run() {
///     Ok(report) => println!("patched, {} bytes", report.patched_size),
///     Err(Error::PatternNotFound { method, tried }) => {
///         println!("{method} changed, tried {}", tried.join(", "))
///     }
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::{Error, SymbolKind};

/// The loaded executable, see [`module::Module`].
pub use module::Module;

/// Low-level file and parsing utilities.
pub use file::{parser::Parser, File};
