use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The kind of declaration a failed symbol lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A `TypeDef` row
    Type,
    /// A `Field` row
    Field,
    /// A `MethodDef` row
    Method,
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolKind::Type => write!(f, "type"),
            SymbolKind::Field => write!(f, "field"),
            SymbolKind::Method => write!(f, "method"),
        }
    }
}

/// The generic Error type, which covers every failure the patcher can report.
///
/// Parsing errors ([`Error::Malformed`], [`Error::OutOfBounds`], ...) come from the file and
/// metadata layers. The three run-aborting categories of a patch run are
/// [`Error::SymbolNotFound`] / [`Error::AmbiguousSymbol`] (the executable does not have the
/// declarations we expect), [`Error::PatternNotFound`] (the method body changed shape) and
/// [`Error::SerializationFailed`] (the rebuilt image could not be produced or written).
///
/// None of them are retried. A run that hits any of them writes nothing.
///
/// # Examples
///
/// ```rust,no_run
/// use autofish::{Error, Module};
/// use std::path::Path;
///
/// match Module::from_file(Path::new("Terraria.exe")) {
///     Ok(module) => println!("{} types", module.types().len()),
///     Err(Error::NotSupported) => eprintln!("not a supported .NET image"),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("{}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// Carries the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type, or a feature used by it, is not supported.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// A declaration the patch depends on does not exist in the module.
    ///
    /// This almost always means the executable is a different version than the one the
    /// symbol catalog was written against.
    #[error("Could not resolve {kind} '{name}' (in '{owner}')")]
    SymbolNotFound {
        /// What kind of declaration was looked up
        kind: SymbolKind,
        /// Owning type name, or the namespace for type lookups
        owner: String,
        /// The requested name
        name: String,
    },

    /// More than one declaration matched a lookup that supplied no disambiguating predicate.
    #[error("{count} candidates for {kind} '{name}' in '{owner}', a disambiguating predicate is required")]
    AmbiguousSymbol {
        /// What kind of declaration was looked up
        kind: SymbolKind,
        /// Owning type name
        owner: String,
        /// The requested name
        name: String,
        /// Number of declarations carrying that name
        count: usize,
    },

    /// None of the candidate patterns matched inside the target method.
    #[error("No pattern matched in {method} (tried: {})", tried.join(", "))]
    PatternNotFound {
        /// The method whose body was scanned
        method: String,
        /// Names of all candidate patterns, in the order they were tried
        tried: Vec<String>,
    },

    /// A branch refers to an instruction that is not part of the list it lives in, or a
    /// fragment jumps to something other than its own instructions or its continuation.
    #[error("Invalid branch - {0}")]
    InvalidBranch(String),

    /// An opcode was used with an operand it cannot carry, or an unknown opcode was decoded.
    #[error("Invalid instruction - {0}")]
    InvalidInstruction(String),

    /// The patched image could not be encoded or written.
    #[error("Serialization failed - {0}")]
    SerializationFailed(String),

    /// A configuration value would produce a patch that does not behave as intended.
    #[error("Invalid configuration - {0}")]
    InvalidConfig(String),

    /// The method has no body that could be decoded (abstract, runtime or native method).
    #[error("Method has no IL body - {0}")]
    NoBody(Token),
}
