//! The decoded executable.
//!
//! A [`Module`] owns the loaded image, the decoded metadata tables and the ordered list of
//! type declarations with their fields and methods. Method bodies are decoded on first use
//! and cached; a body that is borrowed mutably is re-encoded when the module is written.
//!
//! The module is the single context object of a patch run. It is created once, threaded
//! through the resolver, matcher and splicer as `&mut Module`, and consumed by
//! [`Module::to_bytes`] or [`Module::write`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use autofish::Module;
//! use std::path::Path;
//!
//! let module = Module::from_file(Path::new("Terraria.exe"))?;
//! for ty in module.types() {
//!     println!("{} ({} methods)", ty.full_name(), ty.methods.len());
//! }
//! # Ok::<(), autofish::Error>(())
//! ```

mod body;
mod output;
pub mod resolver;
mod types;
mod writer;

use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
};

pub use body::{CilBody, ExceptionRegion, LocalSlot};
pub use output::Output;
pub use resolver::{FieldQuery, MethodQuery, TypeQuery};
pub use types::{FieldDef, FieldHandle, MethodDef, MethodHandle, TypeDef, TypeHandle};

use crate::{
    file::File,
    metadata::{
        cor20header::{Cor20Header, COR20_HEADER_SIZE},
        method::{FieldAttributes, MethodAttributes, MethodBody, MethodImplAttributes},
        root::Root,
        signatures::{parse_field_signature, parse_method_signature, SignatureParser},
        streams::{Blob, Guid, Strings, TablesHeader},
        tables::{
            FieldRaw, MethodDefRaw, NestedClassRaw, StandAloneSigRaw, TableId, TypeDefRaw,
            TypeRefRaw,
        },
        token::Token,
    },
    Error::{NoBody, NotSupported, OutOfBounds},
    Result,
};

/// The decoded executable, see the module documentation.
pub struct Module {
    file: File,
    cor20: Cor20Header,
    cor20_offset: usize,
    root: Root,
    metadata: Vec<u8>,
    tables: TablesHeader,
    types: Vec<TypeDef>,
    bodies: HashMap<Token, CilBody>,
    dirty: BTreeSet<Token>,
}

impl Module {
    /// Load a module from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a .NET image this crate can
    /// decode. An image with an uncompressed (`#-`) tables stream is
    /// [`crate::Error::NotSupported`].
    pub fn from_file(path: &Path) -> Result<Module> {
        Self::load(File::from_file(path)?)
    }

    /// Load a module from a buffer.
    ///
    /// # Errors
    /// See [`Module::from_file`].
    pub fn from_mem(data: Vec<u8>) -> Result<Module> {
        Self::load(File::from_mem(data)?)
    }

    fn load(file: File) -> Result<Module> {
        let (clr_rva, clr_size) = file.clr();
        if clr_size < COR20_HEADER_SIZE {
            return Err(malformed_error!("CLR header is too small - {}", clr_size));
        }

        let cor20_offset = file.rva_to_offset(clr_rva)?;
        let cor20 = Cor20Header::read(file.data_slice(cor20_offset, COR20_HEADER_SIZE)?)?;

        let metadata_offset = file.rva_to_offset(cor20.meta_data_rva as usize)?;
        let metadata = file
            .data_slice(metadata_offset, cor20.meta_data_size as usize)?
            .to_vec();

        let root = Root::read(&metadata)?;
        if root.stream("#-").is_some() {
            return Err(NotSupported);
        }

        let tables = TablesHeader::from(stream_data(&root, &metadata, "#~")?)?;
        let strings = Strings::from(stream_data(&root, &metadata, "#Strings")?)?;
        let blob = Blob::from(stream_data(&root, &metadata, "#Blob")?)?;
        let types = load_types(&tables, &strings, &blob)?;

        log::debug!(
            "Loaded module: runtime {}, {} types, {} methods",
            root.version,
            types.len(),
            tables.row_count(TableId::MethodDef)
        );

        Ok(Module {
            file,
            cor20,
            cor20_offset,
            root,
            metadata,
            tables,
            types,
            bodies: HashMap::new(),
            dirty: BTreeSet::new(),
        })
    }

    /// The loaded image
    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// The CLI header
    #[must_use]
    pub fn cor20(&self) -> &Cor20Header {
        &self.cor20
    }

    /// The metadata root
    #[must_use]
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// The decoded tables stream
    #[must_use]
    pub fn tables(&self) -> &TablesHeader {
        &self.tables
    }

    /// The type declarations, in `TypeDef` table order
    #[must_use]
    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    /// The declaration behind `handle`
    #[must_use]
    pub fn type_def(&self, handle: TypeHandle) -> Option<&TypeDef> {
        let index = (handle.token().row() as usize).checked_sub(1)?;
        self.types.get(index)
    }

    /// The method declaration behind `handle`
    #[must_use]
    pub fn method_def(&self, handle: MethodHandle) -> Option<&MethodDef> {
        self.types
            .iter()
            .flat_map(|ty| ty.methods.iter())
            .find(|method| method.handle == handle)
    }

    /// `Type::Method` for diagnostics
    #[must_use]
    pub fn method_name(&self, handle: MethodHandle) -> String {
        self.qualified_method_name(handle.token())
    }

    fn qualified_method_name(&self, token: Token) -> String {
        self.types
            .iter()
            .find_map(|ty| {
                ty.methods
                    .iter()
                    .find(|method| method.handle.token() == token)
                    .map(|method| format!("{}::{}", ty.full_name(), method.name))
            })
            .unwrap_or_else(|| token.to_string())
    }

    /// Name of the module, from the first `Module` row
    ///
    /// # Errors
    /// Returns an error if the row or the string does not exist.
    pub fn name(&self) -> Result<&str> {
        let row = self
            .tables
            .table(TableId::Module)
            .row(1)
            .ok_or_else(|| malformed_error!("Module table is empty"))?;
        Strings::from(self.heap("#Strings")?)?.get(row[1] as usize)
    }

    /// The module version id
    ///
    /// # Errors
    /// Returns an error if the module row or its GUID does not exist.
    pub fn mvid(&self) -> Result<uguid::Guid> {
        let row = self
            .tables
            .table(TableId::Module)
            .row(1)
            .ok_or_else(|| malformed_error!("Module table is empty"))?;
        Guid::from(self.heap("#GUID")?)?.get(row[2] as usize)
    }

    /// `true` if any body was borrowed mutably since loading
    #[must_use]
    pub fn is_modified(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Number of instructions in the body of `method`, without caching the decoded body.
    ///
    /// A body that is already cached reports its current length.
    ///
    /// # Errors
    /// Returns [`crate::Error::NoBody`] for methods without IL, or an error if the body
    /// cannot be decoded.
    pub fn instruction_count(&self, method: MethodHandle) -> Result<usize> {
        if let Some(body) = self.bodies.get(&method.token()) {
            return Ok(body.instructions.len());
        }

        Ok(self.decode_body(method.token())?.instructions.len())
    }

    /// The body of `method`, decoded on first use
    ///
    /// # Errors
    /// Returns [`crate::Error::NoBody`] for methods without IL, or an error if the body
    /// cannot be decoded.
    pub fn body(&mut self, method: MethodHandle) -> Result<&CilBody> {
        self.cached_body(method.token()).map(|body| &*body)
    }

    /// The mutable body of `method`. The body is re-encoded when the module is written.
    ///
    /// # Errors
    /// See [`Module::body`].
    pub fn body_mut(&mut self, method: MethodHandle) -> Result<&mut CilBody> {
        let token = method.token();
        self.cached_body(token)?;
        self.dirty.insert(token);
        self.bodies.get_mut(&token).ok_or(NoBody(token))
    }

    fn cached_body(&mut self, token: Token) -> Result<&mut CilBody> {
        if !self.bodies.contains_key(&token) {
            let body = self.decode_body(token)?;
            self.bodies.insert(token, body);
        }

        self.bodies.get_mut(&token).ok_or(NoBody(token))
    }

    fn decode_body(&self, token: Token) -> Result<CilBody> {
        let method = MethodDefRaw::read(self.tables.table(TableId::MethodDef), token.row())?;
        let impl_flags = MethodImplAttributes::from_bits_retain(method.impl_flags);
        if method.rva == 0 || !impl_flags.is_il() {
            return Err(NoBody(token));
        }

        let offset = self.file.rva_to_offset(method.rva as usize)?;
        let data = self.file.data().get(offset..).ok_or(OutOfBounds)?;
        let header = MethodBody::from(data)?;
        let code = header.code(data)?;

        let original_locals = match self.local_signature(header.local_var_sig_token)? {
            Some(signature) => SignatureParser::new(signature).parse_local_var_header()?,
            None => 0,
        };

        CilBody::decode(&header, code, original_locals)
    }

    /// The blob of the local signature `token` refers to, `None` for token 0
    fn local_signature(&self, token: u32) -> Result<Option<&[u8]>> {
        let token = Token::new(token);
        if token.is_null() {
            return Ok(None);
        }
        if !token.is_table(TableId::StandAloneSig) {
            return Err(malformed_error!("Local signature token is not a StandAloneSig - {}", token));
        }

        let row = StandAloneSigRaw::read(self.tables.table(TableId::StandAloneSig), token.row())?;
        Blob::from(self.heap("#Blob")?)?
            .get(row.signature as usize)
            .map(Some)
    }

    /// The bytes of the metadata stream `name`
    fn heap(&self, name: &str) -> Result<&[u8]> {
        stream_data(&self.root, &self.metadata, name)
    }
}

/// The bytes of stream `name` inside `metadata`
fn stream_data<'a>(root: &Root, metadata: &'a [u8], name: &str) -> Result<&'a [u8]> {
    let header = root
        .stream(name)
        .ok_or_else(|| malformed_error!("Metadata has no {} stream", name))?;

    let start = header.offset as usize;
    metadata
        .get(start..start + header.size as usize)
        .ok_or(OutOfBounds)
}

/// Name of a `TypeDef` or `TypeRef` for signature display
fn type_name(tables: &TablesHeader, strings: &Strings, token: Token) -> Option<String> {
    let name = if token.is_table(TableId::TypeDef) {
        TypeDefRaw::read(tables.table(TableId::TypeDef), token.row())
            .ok()?
            .type_name
    } else if token.is_table(TableId::TypeRef) {
        TypeRefRaw::read(tables.table(TableId::TypeRef), token.row())
            .ok()?
            .type_name
    } else {
        return None;
    };

    strings.get(name as usize).ok().map(str::to_string)
}

/// Row range `[start, end)` of a member list, where `next` is the list start of the
/// following type and `count` the row count of the member table
fn member_range(start: u32, next: Option<u32>, count: u32) -> Result<std::ops::Range<u32>> {
    let start = start.max(1);
    let end = next.unwrap_or(count + 1).min(count + 1).max(start);
    if start > count + 1 {
        return Err(malformed_error!(
            "Member list starts past the end of its table - {} > {}",
            start,
            count
        ));
    }

    Ok(start..end)
}

fn load_types(tables: &TablesHeader, strings: &Strings, blob: &Blob) -> Result<Vec<TypeDef>> {
    let typedefs = tables.table(TableId::TypeDef);
    let type_count = typedefs.row_count();
    let field_count = tables.row_count(TableId::Field);
    let method_count = tables.row_count(TableId::MethodDef);

    let mut enclosing = HashMap::new();
    let nested = tables.table(TableId::NestedClass);
    for rid in 1..=nested.row_count() {
        let row = NestedClassRaw::read(nested, rid)?;
        enclosing.insert(row.nested_class, row.enclosing_class);
    }

    let resolve = |token: Token| type_name(tables, strings, token);

    let mut types = Vec::with_capacity(type_count as usize);
    for rid in 1..=type_count {
        let raw = TypeDefRaw::read(typedefs, rid)?;
        let next = if rid < type_count {
            Some(TypeDefRaw::read(typedefs, rid + 1)?)
        } else {
            None
        };

        let mut fields = Vec::new();
        for field_rid in member_range(raw.field_list, next.map(|n| n.field_list), field_count)? {
            let field = FieldRaw::read(tables.table(TableId::Field), field_rid)?;
            let flags = FieldAttributes::from_bits_retain(field.flags);
            let signature = parse_field_signature(blob.get(field.signature as usize)?)?;

            fields.push(FieldDef {
                handle: FieldHandle::new(
                    Token::from_parts(TableId::Field, field_rid),
                    flags.contains(FieldAttributes::STATIC),
                ),
                name: strings.get(field.name as usize)?.to_string(),
                flags,
                type_name: signature.base.display_name(&resolve),
                signature,
            });
        }

        let mut methods = Vec::new();
        for method_rid in
            member_range(raw.method_list, next.map(|n| n.method_list), method_count)?
        {
            let method = MethodDefRaw::read(tables.table(TableId::MethodDef), method_rid)?;
            let signature = parse_method_signature(blob.get(method.signature as usize)?)?;

            methods.push(MethodDef {
                handle: MethodHandle::new(
                    Token::from_parts(TableId::MethodDef, method_rid),
                    &signature,
                ),
                name: strings.get(method.name as usize)?.to_string(),
                flags: MethodAttributes::from_bits_retain(method.flags),
                impl_flags: MethodImplAttributes::from_bits_retain(method.impl_flags),
                rva: method.rva,
                signature,
            });
        }

        types.push(TypeDef {
            handle: TypeHandle::new(Token::from_parts(TableId::TypeDef, rid)),
            name: strings.get(raw.type_name as usize)?.to_string(),
            namespace: strings.get(raw.type_namespace as usize)?.to_string(),
            enclosing: enclosing
                .get(&rid)
                .map(|outer| TypeHandle::new(Token::from_parts(TableId::TypeDef, *outer))),
            fields,
            methods,
        });
    }

    Ok(types)
}
