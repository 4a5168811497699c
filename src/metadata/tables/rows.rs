//! Typed views over the raw rows the resolver and the serializer work with.

use crate::{
    metadata::tables::{TableId, TableRows},
    Result,
};

/// Borrow a row of `table` out of the tables stream
fn columns<'a>(rows: &'a TableRows, rid: u32) -> Result<&'a [u32]> {
    rows.row(rid).ok_or_else(|| {
        malformed_error!("{:?} row {} does not exist", rows.id(), rid)
    })
}

/// A `TypeDef` row, ECMA-335 II.22.37
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDefRaw {
    /// Row id
    pub rid: u32,
    /// `TypeAttributes`
    pub flags: u32,
    /// `#Strings` index of the name
    pub type_name: u32,
    /// `#Strings` index of the namespace
    pub type_namespace: u32,
    /// Raw `TypeDefOrRef` coded index of the base type
    pub extends: u32,
    /// First row of the field list
    pub field_list: u32,
    /// First row of the method list
    pub method_list: u32,
}

impl TypeDefRaw {
    /// Read row `rid` of the `TypeDef` table
    ///
    /// # Errors
    /// Returns an error if the row does not exist.
    pub fn read(rows: &TableRows, rid: u32) -> Result<TypeDefRaw> {
        debug_assert_eq!(rows.id(), TableId::TypeDef);
        let row = columns(rows, rid)?;
        Ok(TypeDefRaw {
            rid,
            flags: row[0],
            type_name: row[1],
            type_namespace: row[2],
            extends: row[3],
            field_list: row[4],
            method_list: row[5],
        })
    }
}

/// A `Field` row, ECMA-335 II.22.15
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRaw {
    /// Row id
    pub rid: u32,
    /// `FieldAttributes`
    pub flags: u32,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Blob` index of the field signature
    pub signature: u32,
}

impl FieldRaw {
    /// Read row `rid` of the `Field` table
    ///
    /// # Errors
    /// Returns an error if the row does not exist.
    pub fn read(rows: &TableRows, rid: u32) -> Result<FieldRaw> {
        debug_assert_eq!(rows.id(), TableId::Field);
        let row = columns(rows, rid)?;
        Ok(FieldRaw {
            rid,
            flags: row[0],
            name: row[1],
            signature: row[2],
        })
    }
}

/// A `MethodDef` row, ECMA-335 II.22.26
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDefRaw {
    /// Row id
    pub rid: u32,
    /// RVA of the method body, 0 if there is none
    pub rva: u32,
    /// `MethodImplAttributes`
    pub impl_flags: u32,
    /// `MethodAttributes`
    pub flags: u32,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Blob` index of the method signature
    pub signature: u32,
    /// First row of the parameter list
    pub param_list: u32,
}

impl MethodDefRaw {
    /// Column holding the RVA
    pub const RVA_COLUMN: usize = 0;

    /// Read row `rid` of the `MethodDef` table
    ///
    /// # Errors
    /// Returns an error if the row does not exist.
    pub fn read(rows: &TableRows, rid: u32) -> Result<MethodDefRaw> {
        debug_assert_eq!(rows.id(), TableId::MethodDef);
        let row = columns(rows, rid)?;
        Ok(MethodDefRaw {
            rid,
            rva: row[0],
            impl_flags: row[1],
            flags: row[2],
            name: row[3],
            signature: row[4],
            param_list: row[5],
        })
    }
}

/// A `TypeRef` row, ECMA-335 II.22.38
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRefRaw {
    /// Row id
    pub rid: u32,
    /// Raw `ResolutionScope` coded index
    pub resolution_scope: u32,
    /// `#Strings` index of the name
    pub type_name: u32,
    /// `#Strings` index of the namespace
    pub type_namespace: u32,
}

impl TypeRefRaw {
    /// Read row `rid` of the `TypeRef` table
    ///
    /// # Errors
    /// Returns an error if the row does not exist.
    pub fn read(rows: &TableRows, rid: u32) -> Result<TypeRefRaw> {
        debug_assert_eq!(rows.id(), TableId::TypeRef);
        let row = columns(rows, rid)?;
        Ok(TypeRefRaw {
            rid,
            resolution_scope: row[0],
            type_name: row[1],
            type_namespace: row[2],
        })
    }
}

/// A `NestedClass` row, ECMA-335 II.22.32
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedClassRaw {
    /// `TypeDef` row of the nested type
    pub nested_class: u32,
    /// `TypeDef` row of the enclosing type
    pub enclosing_class: u32,
}

impl NestedClassRaw {
    /// Read row `rid` of the `NestedClass` table
    ///
    /// # Errors
    /// Returns an error if the row does not exist.
    pub fn read(rows: &TableRows, rid: u32) -> Result<NestedClassRaw> {
        debug_assert_eq!(rows.id(), TableId::NestedClass);
        let row = columns(rows, rid)?;
        Ok(NestedClassRaw {
            nested_class: row[0],
            enclosing_class: row[1],
        })
    }
}

/// A `StandAloneSig` row, ECMA-335 II.22.36
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandAloneSigRaw {
    /// Row id
    pub rid: u32,
    /// `#Blob` index of the signature
    pub signature: u32,
}

impl StandAloneSigRaw {
    /// Read row `rid` of the `StandAloneSig` table
    ///
    /// # Errors
    /// Returns an error if the row does not exist.
    pub fn read(rows: &TableRows, rid: u32) -> Result<StandAloneSigRaw> {
        debug_assert_eq!(rows.id(), TableId::StandAloneSig);
        let row = columns(rows, rid)?;
        Ok(StandAloneSigRaw {
            rid,
            signature: row[0],
        })
    }
}
