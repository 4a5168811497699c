//! Metadata tables.
//!
//! The tables are kept as raw column values ([`TableRows`]) so that a patched image can be
//! written back with every original row preserved in place. Typed views ([`TypeDefRaw`],
//! [`MethodDefRaw`], ...) exist for the handful of tables the resolver reads.

mod codedindex;
mod rows;
mod schema;
mod tableid;
mod tableinfo;

pub use codedindex::{CodedIndexType, CODED_INDEX_COUNT};
pub use rows::{
    FieldRaw, MethodDefRaw, NestedClassRaw, StandAloneSigRaw, TypeDefRaw, TypeRefRaw,
};
pub use schema::Column;
pub use tableid::TableId;
pub use tableinfo::{
    TableInfo, HEAP_EXTRA_DATA, HEAP_LARGE_BLOB, HEAP_LARGE_GUID, HEAP_LARGE_STRINGS,
};

pub use crate::metadata::streams::{TableRows, TablesHeader};
