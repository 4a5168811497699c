use strum::IntoEnumIterator;

use crate::metadata::tables::{CodedIndexType, Column, TableId};

/// Heap size flag: `#Strings` indexes are 4 bytes
pub const HEAP_LARGE_STRINGS: u8 = 0x01;
/// Heap size flag: `#GUID` indexes are 4 bytes
pub const HEAP_LARGE_GUID: u8 = 0x02;
/// Heap size flag: `#Blob` indexes are 4 bytes
pub const HEAP_LARGE_BLOB: u8 = 0x04;
/// Heap size flag: an extra 4-byte value follows the row counts
pub const HEAP_EXTRA_DATA: u8 = 0x40;

/// Row counts and heap widths, from which every column width of the tables stream follows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableInfo {
    rows: Vec<u32>,
    heap_sizes: u8,
}

impl TableInfo {
    /// Build from row counts indexed by table number and the `HeapSizes` byte
    #[must_use]
    pub fn new(rows: Vec<u32>, heap_sizes: u8) -> Self {
        TableInfo { rows, heap_sizes }
    }

    /// Row count of `table`
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.rows.get(table as usize).copied().unwrap_or(0)
    }

    /// `true` if `#Strings` indexes are 4 bytes
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.heap_sizes & HEAP_LARGE_STRINGS != 0
    }

    /// `true` if `#GUID` indexes are 4 bytes
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.heap_sizes & HEAP_LARGE_GUID != 0
    }

    /// `true` if `#Blob` indexes are 4 bytes
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.heap_sizes & HEAP_LARGE_BLOB != 0
    }

    /// Bits needed to represent the row count of `table`
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn table_index_bits(&self, table: TableId) -> u8 {
        let rows = self.rows(table);
        if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        }
    }

    /// `true` if a simple index into `table` is 4 bytes
    #[must_use]
    pub fn is_large(&self, table: TableId) -> bool {
        self.table_index_bits(table) > 16
    }

    /// Bits needed by a coded index of the given kind
    #[must_use]
    pub fn coded_index_bits(&self, coded_index_type: CodedIndexType) -> u8 {
        let max_bits = coded_index_type
            .tables()
            .iter()
            .map(|table| self.table_index_bits(*table))
            .max()
            .unwrap_or(1);

        max_bits + coded_index_type.tag_bits()
    }

    /// `true` if a coded index of the given kind is 4 bytes
    #[must_use]
    pub fn is_large_coded(&self, coded_index_type: CodedIndexType) -> bool {
        self.coded_index_bits(coded_index_type) > 16
    }

    /// `true` if `column` is stored with 4 bytes
    #[must_use]
    pub fn is_large_column(&self, column: Column) -> bool {
        match column {
            Column::Fixed2 => false,
            Column::Fixed4 => true,
            Column::String => self.is_large_str(),
            Column::Guid => self.is_large_guid(),
            Column::Blob => self.is_large_blob(),
            Column::Table(table) => self.is_large(table),
            Column::Coded(coded) => self.is_large_coded(coded),
        }
    }

    /// Size in bytes of one row of `table`
    #[must_use]
    pub fn row_size(&self, table: TableId) -> usize {
        Column::of(table)
            .iter()
            .map(|column| if self.is_large_column(*column) { 4 } else { 2 })
            .sum()
    }

    /// Total size of all rows of all tables
    #[must_use]
    pub fn tables_size(&self) -> usize {
        TableId::iter()
            .map(|table| self.row_size(table) * self.rows(table) as usize)
            .sum()
    }
}
