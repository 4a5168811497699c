use strum::{EnumCount, EnumIter};

use crate::{metadata::tables::TableId, metadata::token::Token, Error::OutOfBounds, Result};

/// The coded index kinds of ECMA-335 II.24.2.6.
///
/// A coded index packs a table tag into its low bits and a row number into the rest. The tag
/// width depends only on the number of candidate tables, so the raw value stays the same when
/// the column width changes between 2 and 4 bytes.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
pub enum CodedIndexType {
    /// `TypeDef`, `TypeRef`, `TypeSpec`
    TypeDefOrRef,
    /// `Field`, `Param`, `Property`
    HasConstant,
    /// Everything that can carry a custom attribute
    HasCustomAttribute,
    /// `Field`, `Param`
    HasFieldMarshal,
    /// `TypeDef`, `MethodDef`, `Assembly`
    HasDeclSecurity,
    /// `TypeDef`, `TypeRef`, `ModuleRef`, `MethodDef`, `TypeSpec`
    MemberRefParent,
    /// `Event`, `Property`
    HasSemantics,
    /// `MethodDef`, `MemberRef`
    MethodDefOrRef,
    /// `Field`, `MethodDef`
    MemberForwarded,
    /// `File`, `AssemblyRef`, `ExportedType`
    Implementation,
    /// Constructors of custom attributes (tags 0, 1 and 4 are unused)
    CustomAttributeType,
    /// `Module`, `ModuleRef`, `AssemblyRef`, `TypeRef`
    ResolutionScope,
    /// `TypeDef`, `MethodDef`
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// The candidate tables, in tag order
    #[must_use]
    pub fn tables(&self) -> &'static [TableId] {
        match self {
            CodedIndexType::TypeDefOrRef => {
                &[TableId::TypeDef, TableId::TypeRef, TableId::TypeSpec]
            }
            CodedIndexType::HasConstant => &[TableId::Field, TableId::Param, TableId::Property],
            CodedIndexType::HasCustomAttribute => &[
                TableId::MethodDef,
                TableId::Field,
                TableId::TypeRef,
                TableId::TypeDef,
                TableId::Param,
                TableId::InterfaceImpl,
                TableId::MemberRef,
                TableId::Module,
                TableId::DeclSecurity,
                TableId::Property,
                TableId::Event,
                TableId::StandAloneSig,
                TableId::ModuleRef,
                TableId::TypeSpec,
                TableId::Assembly,
                TableId::AssemblyRef,
                TableId::File,
                TableId::ExportedType,
                TableId::ManifestResource,
                TableId::GenericParam,
                TableId::GenericParamConstraint,
                TableId::MethodSpec,
            ],
            CodedIndexType::HasFieldMarshal => &[TableId::Field, TableId::Param],
            CodedIndexType::HasDeclSecurity => {
                &[TableId::TypeDef, TableId::MethodDef, TableId::Assembly]
            }
            CodedIndexType::MemberRefParent => &[
                TableId::TypeDef,
                TableId::TypeRef,
                TableId::ModuleRef,
                TableId::MethodDef,
                TableId::TypeSpec,
            ],
            CodedIndexType::HasSemantics => &[TableId::Event, TableId::Property],
            CodedIndexType::MethodDefOrRef => &[TableId::MethodDef, TableId::MemberRef],
            CodedIndexType::MemberForwarded => &[TableId::Field, TableId::MethodDef],
            CodedIndexType::Implementation => {
                &[TableId::File, TableId::AssemblyRef, TableId::ExportedType]
            }
            CodedIndexType::CustomAttributeType => &[
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MemberRef,
                TableId::MemberRef,
            ],
            CodedIndexType::ResolutionScope => &[
                TableId::Module,
                TableId::ModuleRef,
                TableId::AssemblyRef,
                TableId::TypeRef,
            ],
            CodedIndexType::TypeOrMethodDef => &[TableId::TypeDef, TableId::MethodDef],
        }
    }

    /// Number of low bits used by the tag
    #[must_use]
    pub fn tag_bits(&self) -> u8 {
        match self.tables().len() {
            0..=2 => 1,
            3..=4 => 2,
            5..=8 => 3,
            9..=16 => 4,
            _ => 5,
        }
    }

    /// Split a raw coded index into its table and row
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the tag does not name a candidate table.
    pub fn decode(&self, value: u32) -> Result<(TableId, u32)> {
        let tag_bits = self.tag_bits();
        let tag = (value & ((1 << tag_bits) - 1)) as usize;
        let tables = self.tables();

        if tag >= tables.len() {
            return Err(OutOfBounds);
        }

        Ok((tables[tag], value >> tag_bits))
    }

    /// Decode a raw coded index straight into a token
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the tag does not name a candidate table.
    pub fn decode_token(&self, value: u32) -> Result<Token> {
        let (table, row) = self.decode(value)?;
        Ok(Token::from_parts(table, row))
    }
}

/// Number of coded index kinds
pub const CODED_INDEX_COUNT: usize = CodedIndexType::COUNT;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_widths() {
        assert_eq!(CodedIndexType::TypeDefOrRef.tag_bits(), 2);
        assert_eq!(CodedIndexType::HasCustomAttribute.tag_bits(), 5);
        assert_eq!(CodedIndexType::CustomAttributeType.tag_bits(), 3);
        assert_eq!(CodedIndexType::MethodDefOrRef.tag_bits(), 1);
        assert_eq!(CodedIndexType::MemberRefParent.tag_bits(), 3);
    }

    #[test]
    fn decode() {
        // TypeRef row 4
        assert_eq!(
            CodedIndexType::TypeDefOrRef.decode(0x11).unwrap(),
            (TableId::TypeRef, 4)
        );
        // MemberRef row 2
        assert_eq!(
            CodedIndexType::MethodDefOrRef.decode_token(0x05).unwrap(),
            Token(0x0A00_0002)
        );
        // tag 3 is not a TypeDefOrRef candidate
        assert!(CodedIndexType::TypeDefOrRef.decode(0x03).is_err());
    }
}
