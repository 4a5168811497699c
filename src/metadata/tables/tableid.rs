use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// Identifiers of the metadata tables, ECMA-335 II.22.
///
/// The discriminant is the table number used in tokens and in the `valid` bit vector of the
/// tables stream. Portable PDB tables (`0x30` and above) live in separate debug files and are
/// not part of an executable's tables stream.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, EnumIter, EnumCount)]
#[repr(u8)]
pub enum TableId {
    /// `0x00` - the module itself
    Module = 0x00,
    /// `0x01` - references to types in other modules
    TypeRef = 0x01,
    /// `0x02` - type declarations
    TypeDef = 0x02,
    /// `0x03` - field indirection (uncompressed `#-` streams)
    FieldPtr = 0x03,
    /// `0x04` - field declarations
    Field = 0x04,
    /// `0x05` - method indirection (uncompressed `#-` streams)
    MethodPtr = 0x05,
    /// `0x06` - method declarations
    MethodDef = 0x06,
    /// `0x07` - parameter indirection (uncompressed `#-` streams)
    ParamPtr = 0x07,
    /// `0x08` - parameter declarations
    Param = 0x08,
    /// `0x09` - implemented interfaces
    InterfaceImpl = 0x09,
    /// `0x0A` - references to fields and methods of other types
    MemberRef = 0x0A,
    /// `0x0B` - compile-time constants
    Constant = 0x0B,
    /// `0x0C` - custom attributes
    CustomAttribute = 0x0C,
    /// `0x0D` - marshalling descriptors
    FieldMarshal = 0x0D,
    /// `0x0E` - declarative security
    DeclSecurity = 0x0E,
    /// `0x0F` - explicit class layout
    ClassLayout = 0x0F,
    /// `0x10` - explicit field offsets
    FieldLayout = 0x10,
    /// `0x11` - standalone signatures (local variables, `calli`)
    StandAloneSig = 0x11,
    /// `0x12` - type to event list map
    EventMap = 0x12,
    /// `0x13` - event indirection (uncompressed `#-` streams)
    EventPtr = 0x13,
    /// `0x14` - event declarations
    Event = 0x14,
    /// `0x15` - type to property list map
    PropertyMap = 0x15,
    /// `0x16` - property indirection (uncompressed `#-` streams)
    PropertyPtr = 0x16,
    /// `0x17` - property declarations
    Property = 0x17,
    /// `0x18` - getters, setters and event accessors
    MethodSemantics = 0x18,
    /// `0x19` - explicit method overrides
    MethodImpl = 0x19,
    /// `0x1A` - references to other modules
    ModuleRef = 0x1A,
    /// `0x1B` - type specifications (generic instances, arrays...)
    TypeSpec = 0x1B,
    /// `0x1C` - P/Invoke mappings
    ImplMap = 0x1C,
    /// `0x1D` - initial values of static fields
    FieldRVA = 0x1D,
    /// `0x1E` - edit-and-continue log
    EncLog = 0x1E,
    /// `0x1F` - edit-and-continue map
    EncMap = 0x1F,
    /// `0x20` - the assembly manifest
    Assembly = 0x20,
    /// `0x21` - unused
    AssemblyProcessor = 0x21,
    /// `0x22` - unused
    AssemblyOS = 0x22,
    /// `0x23` - referenced assemblies
    AssemblyRef = 0x23,
    /// `0x24` - unused
    AssemblyRefProcessor = 0x24,
    /// `0x25` - unused
    AssemblyRefOS = 0x25,
    /// `0x26` - files of a multi-file assembly
    File = 0x26,
    /// `0x27` - types exported or forwarded
    ExportedType = 0x27,
    /// `0x28` - manifest resources
    ManifestResource = 0x28,
    /// `0x29` - nesting relationship of types
    NestedClass = 0x29,
    /// `0x2A` - generic parameters
    GenericParam = 0x2A,
    /// `0x2B` - generic method instantiations
    MethodSpec = 0x2B,
    /// `0x2C` - generic parameter constraints
    GenericParamConstraint = 0x2C,
}

impl TableId {
    /// Map a table number to its id
    #[must_use]
    pub fn from_u8(value: u8) -> Option<TableId> {
        TableId::iter().find(|id| *id as u8 == value)
    }

    /// The highest table number this crate can decode
    pub const MAX: u8 = TableId::GenericParamConstraint as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous() {
        assert_eq!(TableId::COUNT, 0x2D);
        for (index, id) in TableId::iter().enumerate() {
            assert_eq!(index, id as usize);
            assert_eq!(TableId::from_u8(index as u8), Some(id));
        }
        assert_eq!(TableId::from_u8(0x2D), None);
        assert_eq!(TableId::from_u8(0x30), None);
    }
}
