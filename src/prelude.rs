//! # autofish Prelude
//!
//! The types needed to run the patches, look at a module or write a patch of your own.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all autofish operations
pub use crate::Error;

/// The kind of symbol named in resolution errors
pub use crate::SymbolKind;

/// The result type used throughout autofish
pub use crate::Result;

// ================================================================================================
// Pipeline
// ================================================================================================

/// Patch runs, their settings and their reports
pub use crate::autofish::{Inspection, PatchReport, Patcher};

/// Settings of a patch run
pub use crate::config::PatchConfig;

/// Backup bookkeeping
pub use crate::backup::{Backup, BackupAction, BackupState};

// ================================================================================================
// Modules and Symbols
// ================================================================================================

/// A loaded executable
pub use crate::Module;

/// Resolved symbols and the queries that find them
pub use crate::module::{
    FieldHandle, FieldQuery, MethodHandle, MethodQuery, TypeHandle, TypeQuery,
};

/// Decoded method bodies
pub use crate::module::{CilBody, ExceptionRegion, LocalSlot};

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

// ================================================================================================
// Instructions and Patches
// ================================================================================================

/// Instructions and their identities
pub use crate::assembly::{opcodes, InstrRef, Instruction, InstructionList, OpCode, Operand};

/// Building blocks of a patch
pub use crate::patch::{
    apply, Fragment, FragmentBuilder, Label, Local, Match, Patch, PatchOutcome, Pattern,
    PatternSet, Predicate, SpliceReport,
};
