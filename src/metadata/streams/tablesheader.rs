//! The `#~` tables stream, ECMA-335 II.24.2.6.
//!
//! Every table from `Module` to `GenericParamConstraint` is decoded into raw `u32` column
//! values. On encode, row counts and heap flags are recomputed and the column widths follow,
//! so rows can be appended (new `StandAloneSig` entries) while every pre-existing row keeps
//! its index and therefore every token stays valid.
//!
//! An unmodified stream encodes back to its original bytes.

use strum::IntoEnumIterator;

use crate::{
    file::io::{push_le, push_le_dyn, read_le, read_le_at, read_le_at_dyn},
    metadata::tables::{Column, TableId, TableInfo, HEAP_EXTRA_DATA},
    Error::{NotSupported, OutOfBounds},
    Result,
};

/// The raw rows of one metadata table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRows {
    id: TableId,
    columns: &'static [Column],
    values: Vec<u32>,
}

impl TableRows {
    /// Create an empty table
    #[must_use]
    pub fn new(id: TableId) -> Self {
        TableRows {
            id,
            columns: Column::of(id),
            values: Vec::new(),
        }
    }

    /// The table this holds rows for
    #[must_use]
    pub fn id(&self) -> TableId {
        self.id
    }

    /// The column layout
    #[must_use]
    pub fn columns(&self) -> &'static [Column] {
        self.columns
    }

    /// Number of rows
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn row_count(&self) -> u32 {
        (self.values.len() / self.columns.len()) as u32
    }

    /// The columns of the 1-based row `rid`
    #[must_use]
    pub fn row(&self, rid: u32) -> Option<&[u32]> {
        let width = self.columns.len();
        let start = (rid as usize).checked_sub(1)? * width;
        self.values.get(start..start + width)
    }

    /// The mutable columns of the 1-based row `rid`
    pub fn row_mut(&mut self, rid: u32) -> Option<&mut [u32]> {
        let width = self.columns.len();
        let start = (rid as usize).checked_sub(1)? * width;
        self.values.get_mut(start..start + width)
    }

    /// Append a row and return its 1-based row id
    ///
    /// # Errors
    /// Returns an error if the number of values does not match the column layout.
    pub fn push(&mut self, row: &[u32]) -> Result<u32> {
        if row.len() != self.columns.len() {
            return Err(malformed_error!(
                "{:?} rows have {} columns, got {}",
                self.id,
                self.columns.len(),
                row.len()
            ));
        }

        self.values.extend_from_slice(row);
        Ok(self.row_count())
    }

    fn read(&mut self, data: &[u8], offset: &mut usize, rows: u32, info: &TableInfo) -> Result<()> {
        self.values.reserve(rows as usize * self.columns.len());
        for _ in 0..rows {
            for column in self.columns {
                let value = read_le_at_dyn(data, offset, info.is_large_column(*column))?;
                self.values.push(value);
            }
        }

        Ok(())
    }

    fn write(&self, buffer: &mut Vec<u8>, info: &TableInfo) -> Result<()> {
        for row in self.values.chunks(self.columns.len()) {
            for (value, column) in row.iter().zip(self.columns) {
                push_le_dyn(buffer, *value, info.is_large_column(*column))?;
            }
        }

        Ok(())
    }
}

/// The decoded tables stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablesHeader {
    /// Reserved, always 0
    pub reserved: u32,
    /// Major version of the table schema
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// Heap index width flags
    pub heap_sizes: u8,
    /// Reserved, always 1
    pub reserved_2: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Extra data announced by [`HEAP_EXTRA_DATA`]
    pub extra_data: Option<u32>,
    tables: Vec<TableRows>,
    trailing: Vec<u8>,
}

impl TablesHeader {
    /// Decode a tables stream
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if the stream contains tables this crate cannot
    /// decode, or an error if the stream is truncated.
    pub fn from(data: &[u8]) -> Result<TablesHeader> {
        if data.len() < 24 {
            return Err(OutOfBounds);
        }

        let valid = read_le::<u64>(&data[8..])?;
        if valid == 0 {
            return Err(malformed_error!("No valid rows in any of the tables"));
        }
        if valid >> (TableId::MAX + 1) != 0 {
            return Err(NotSupported);
        }

        let heap_sizes = read_le::<u8>(&data[6..])?;

        let mut offset = 24;
        let mut row_counts = vec![0_u32; TableId::MAX as usize + 1];
        for table in TableId::iter() {
            if valid & (1 << table as u8) != 0 {
                row_counts[table as usize] = read_le_at::<u32>(data, &mut offset)?;
            }
        }

        let extra_data = if heap_sizes & HEAP_EXTRA_DATA != 0 {
            Some(read_le_at::<u32>(data, &mut offset)?)
        } else {
            None
        };

        let info = TableInfo::new(row_counts.clone(), heap_sizes);
        let mut tables = Vec::with_capacity(row_counts.len());
        for table in TableId::iter() {
            let mut rows = TableRows::new(table);
            rows.read(data, &mut offset, row_counts[table as usize], &info)?;
            tables.push(rows);
        }

        Ok(TablesHeader {
            reserved: read_le::<u32>(data)?,
            major_version: read_le::<u8>(&data[4..])?,
            minor_version: read_le::<u8>(&data[5..])?,
            heap_sizes,
            reserved_2: read_le::<u8>(&data[7..])?,
            valid,
            sorted: read_le::<u64>(&data[16..])?,
            extra_data,
            tables,
            trailing: data[offset..].to_vec(),
        })
    }

    /// The rows of `table`
    #[must_use]
    pub fn table(&self, table: TableId) -> &TableRows {
        &self.tables[table as usize]
    }

    /// The mutable rows of `table`
    pub fn table_mut(&mut self, table: TableId) -> &mut TableRows {
        &mut self.tables[table as usize]
    }

    /// Row count of `table`
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.tables[table as usize].row_count()
    }

    /// Number of tables marked present
    #[must_use]
    pub fn table_count(&self) -> u32 {
        self.valid.count_ones()
    }

    /// Column widths for the current row counts and heap flags
    #[must_use]
    pub fn info(&self) -> TableInfo {
        let rows = self.tables.iter().map(TableRows::row_count).collect();
        TableInfo::new(rows, self.heap_sizes)
    }

    /// Raise a heap index width flag when the heap has outgrown 2-byte indexes
    ///
    /// Flags are never lowered, so an unmodified stream keeps its original widths.
    pub fn widen_heap(&mut self, flag: u8, heap_size: usize) {
        if heap_size > usize::from(u16::MAX) {
            self.heap_sizes |= flag;
        }
    }

    /// Encode the stream with widths recomputed from the current rows
    ///
    /// # Errors
    /// Returns an error if a value does not fit its column.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let info = self.info();

        let mut valid = self.valid;
        for rows in &self.tables {
            if rows.row_count() > 0 {
                valid |= 1 << rows.id() as u8;
            }
        }

        let mut buffer = Vec::with_capacity(24 + info.tables_size() + self.trailing.len());
        push_le(&mut buffer, self.reserved);
        push_le(&mut buffer, self.major_version);
        push_le(&mut buffer, self.minor_version);
        push_le(&mut buffer, self.heap_sizes);
        push_le(&mut buffer, self.reserved_2);
        push_le(&mut buffer, valid);
        push_le(&mut buffer, self.sorted);

        for rows in &self.tables {
            if valid & (1 << rows.id() as u8) != 0 {
                push_le(&mut buffer, rows.row_count());
            }
        }

        if let Some(extra_data) = self.extra_data {
            push_le(&mut buffer, extra_data);
        }

        for rows in &self.tables {
            rows.write(&mut buffer, &info)?;
        }

        buffer.extend_from_slice(&self.trailing);
        crate::file::io::pad_to(&mut buffer, 4);

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::HEAP_LARGE_BLOB;

    #[rustfmt::skip]
    fn crafted() -> Vec<u8> {
        let mut data = vec![
            0x00, 0x00, 0x00, 0x00,
            0x02, 0x00,
            0x00,
            0x01,
        ];
        // Module, TypeDef, StandAloneSig
        data.extend_from_slice(&((1_u64 << 0x00) | (1 << 0x02) | (1 << 0x11)).to_le_bytes());
        data.extend_from_slice(&0_u64.to_le_bytes());
        data.extend_from_slice(&1_u32.to_le_bytes());
        data.extend_from_slice(&2_u32.to_le_bytes());
        data.extend_from_slice(&1_u32.to_le_bytes());
        // Module: Generation, Name, Mvid, EncId, EncBaseId
        data.extend_from_slice(&[0x00, 0x00, 0x0A, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
        // TypeDef x2: Flags, Name, Namespace, Extends, FieldList, MethodList
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00]);
        data.extend_from_slice(&[0x01, 0x00, 0x10, 0x00, 0x14, 0x00, 0x20, 0x00, 0x05, 0x00, 0x01, 0x00, 0x01, 0x00]);
        // StandAloneSig: Signature
        data.extend_from_slice(&[0x33, 0x00]);
        // padding
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        data
    }

    #[test]
    fn decode() {
        let data = crafted();
        let tables = TablesHeader::from(&data).unwrap();

        assert_eq!(tables.major_version, 2);
        assert_eq!(tables.table_count(), 3);
        assert_eq!(tables.row_count(TableId::TypeDef), 2);
        assert_eq!(tables.row_count(TableId::MethodDef), 0);

        let module = tables.table(TableId::Module).row(1).unwrap();
        assert_eq!(module, &[0, 0x0A, 1, 0, 0]);

        let type_def = tables.table(TableId::TypeDef).row(2).unwrap();
        assert_eq!(type_def, &[0x0010_0001, 0x14, 0x20, 0x05, 1, 1]);
        assert!(tables.table(TableId::TypeDef).row(3).is_none());
        assert!(tables.table(TableId::TypeDef).row(0).is_none());

        assert_eq!(tables.table(TableId::StandAloneSig).row(1).unwrap(), &[0x33]);
    }

    #[test]
    fn unmodified_encode_is_identical() {
        let data = crafted();
        let tables = TablesHeader::from(&data).unwrap();

        assert_eq!(tables.encode().unwrap(), data);
    }

    #[test]
    fn appended_rows_keep_existing_rows() {
        let data = crafted();
        let mut tables = TablesHeader::from(&data).unwrap();

        let rid = tables
            .table_mut(TableId::StandAloneSig)
            .push(&[0x1_0040])
            .unwrap();
        assert_eq!(rid, 2);
        assert!(tables.table_mut(TableId::StandAloneSig).push(&[1, 2]).is_err());

        tables.widen_heap(HEAP_LARGE_BLOB, 0x1_0050);
        let encoded = tables.encode().unwrap();
        let reparsed = TablesHeader::from(&encoded).unwrap();

        assert!(reparsed.info().is_large_blob());
        assert_eq!(reparsed.row_count(TableId::StandAloneSig), 2);
        assert_eq!(reparsed.table(TableId::StandAloneSig).row(1).unwrap(), &[0x33]);
        assert_eq!(reparsed.table(TableId::StandAloneSig).row(2).unwrap(), &[0x1_0040]);
        assert_eq!(
            reparsed.table(TableId::TypeDef).row(2),
            tables.table(TableId::TypeDef).row(2)
        );
    }

    #[test]
    fn unsupported_tables() {
        let mut data = crafted();
        data[8..16].copy_from_slice(&(1_u64 << 0x30).to_le_bytes());
        assert!(matches!(TablesHeader::from(&data), Err(NotSupported)));
    }
}
