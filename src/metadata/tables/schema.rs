//! Column layouts of every table, ECMA-335 II.22.
//!
//! Rows are kept as raw `u32` column values. The layout is all that is needed to decode and
//! re-encode a table, since only the byte width of index columns depends on the image.

use crate::metadata::tables::{CodedIndexType, TableId};

/// One column of a metadata table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    /// A 2-byte constant (flags, versions)
    Fixed2,
    /// A 4-byte constant (flags, RVAs, offsets)
    Fixed4,
    /// An index into `#Strings`
    String,
    /// An index into `#GUID`
    Guid,
    /// An index into `#Blob`
    Blob,
    /// A simple index into another table
    Table(TableId),
    /// A coded index
    Coded(CodedIndexType),
}

use Column::{Blob, Coded, Fixed2, Fixed4, Guid, String, Table};
use CodedIndexType as C;

impl Column {
    /// The columns of `table`, in storage order
    #[must_use]
    pub fn of(table: TableId) -> &'static [Column] {
        match table {
            TableId::Module => &[Fixed2, String, Guid, Guid, Guid],
            TableId::TypeRef => &[Coded(C::ResolutionScope), String, String],
            TableId::TypeDef => &[
                Fixed4,
                String,
                String,
                Coded(C::TypeDefOrRef),
                Table(TableId::Field),
                Table(TableId::MethodDef),
            ],
            TableId::FieldPtr => &[Table(TableId::Field)],
            TableId::Field => &[Fixed2, String, Blob],
            TableId::MethodPtr => &[Table(TableId::MethodDef)],
            TableId::MethodDef => &[Fixed4, Fixed2, Fixed2, String, Blob, Table(TableId::Param)],
            TableId::ParamPtr => &[Table(TableId::Param)],
            TableId::Param => &[Fixed2, Fixed2, String],
            TableId::InterfaceImpl => &[Table(TableId::TypeDef), Coded(C::TypeDefOrRef)],
            TableId::MemberRef => &[Coded(C::MemberRefParent), String, Blob],
            TableId::Constant => &[Fixed2, Coded(C::HasConstant), Blob],
            TableId::CustomAttribute => &[
                Coded(C::HasCustomAttribute),
                Coded(C::CustomAttributeType),
                Blob,
            ],
            TableId::FieldMarshal => &[Coded(C::HasFieldMarshal), Blob],
            TableId::DeclSecurity => &[Fixed2, Coded(C::HasDeclSecurity), Blob],
            TableId::ClassLayout => &[Fixed2, Fixed4, Table(TableId::TypeDef)],
            TableId::FieldLayout => &[Fixed4, Table(TableId::Field)],
            TableId::StandAloneSig => &[Blob],
            TableId::EventMap => &[Table(TableId::TypeDef), Table(TableId::Event)],
            TableId::EventPtr => &[Table(TableId::Event)],
            TableId::Event => &[Fixed2, String, Coded(C::TypeDefOrRef)],
            TableId::PropertyMap => &[Table(TableId::TypeDef), Table(TableId::Property)],
            TableId::PropertyPtr => &[Table(TableId::Property)],
            TableId::Property => &[Fixed2, String, Blob],
            TableId::MethodSemantics => &[
                Fixed2,
                Table(TableId::MethodDef),
                Coded(C::HasSemantics),
            ],
            TableId::MethodImpl => &[
                Table(TableId::TypeDef),
                Coded(C::MethodDefOrRef),
                Coded(C::MethodDefOrRef),
            ],
            TableId::ModuleRef => &[String],
            TableId::TypeSpec => &[Blob],
            TableId::ImplMap => &[
                Fixed2,
                Coded(C::MemberForwarded),
                String,
                Table(TableId::ModuleRef),
            ],
            TableId::FieldRVA => &[Fixed4, Table(TableId::Field)],
            TableId::EncLog => &[Fixed4, Fixed4],
            TableId::EncMap => &[Fixed4],
            TableId::Assembly => &[
                Fixed4, Fixed2, Fixed2, Fixed2, Fixed2, Fixed4, Blob, String, String,
            ],
            TableId::AssemblyProcessor => &[Fixed4],
            TableId::AssemblyOS => &[Fixed4, Fixed4, Fixed4],
            TableId::AssemblyRef => &[
                Fixed2, Fixed2, Fixed2, Fixed2, Fixed4, Blob, String, String, Blob,
            ],
            TableId::AssemblyRefProcessor => &[Fixed4, Table(TableId::AssemblyRef)],
            TableId::AssemblyRefOS => &[Fixed4, Fixed4, Fixed4, Table(TableId::AssemblyRef)],
            TableId::File => &[Fixed4, String, Blob],
            TableId::ExportedType => &[Fixed4, Fixed4, String, String, Coded(C::Implementation)],
            TableId::ManifestResource => &[Fixed4, Fixed4, String, Coded(C::Implementation)],
            TableId::NestedClass => &[Table(TableId::TypeDef), Table(TableId::TypeDef)],
            TableId::GenericParam => &[Fixed2, Fixed2, Coded(C::TypeOrMethodDef), String],
            TableId::MethodSpec => &[Coded(C::MethodDefOrRef), Blob],
            TableId::GenericParamConstraint => {
                &[Table(TableId::GenericParam), Coded(C::TypeDefOrRef)]
            }
        }
    }
}
