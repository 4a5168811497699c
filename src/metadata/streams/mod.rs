//! Metadata streams.
//!
//! - [`StreamHeader`] - An entry of the stream directory
//! - [`Strings`] - The `#Strings` heap
//! - [`Blob`] - The `#Blob` heap, with [`append_blob`] for adding signatures
//! - [`Guid`] - The `#GUID` heap
//! - [`TablesHeader`] - The `#~` (or `#-`) tables stream, decoded into raw rows
//!
//! The `#US` heap is carried through the serializer verbatim and has no reader.

mod streamheader;
pub use streamheader::{StreamHeader, STREAM_NAMES};

mod strings;
pub use strings::Strings;

mod blob;
pub use blob::{append_blob, Blob};

mod guid;
pub use guid::Guid;

mod tablesheader;
pub use tablesheader::{TableRows, TablesHeader};
