//! Synthetic Terraria-shaped .NET images.
//!
//! [`ImageBuilder`] lays out a minimal PE32 executable with one `.text` section holding the
//! CLI header, the method bodies and the metadata. The declarations mirror the parts of the
//! game the patches touch: `Projectile`, `Player`, `Main`, `Item` and `Entity` with the
//! fields and methods the symbol catalog resolves, a bobber AI with the nibble check and a
//! large `ItemCheck` overload with the `controlUseItem` gate.
//!
//! The file only depends on `uguid`, so the integration tests include it through `#[path]`.

#![allow(dead_code)]

use std::collections::HashMap;

use uguid::{guid, Guid};

const PE_OFFSET: usize = 0x80;
const OPTIONAL_HEADER_SIZE: usize = 0xE0;
const SECTION_HEADER_SIZE: usize = 40;
const FILE_ALIGNMENT: usize = 0x200;
const SECTION_ALIGNMENT: usize = 0x2000;
const TEXT_RVA: usize = 0x2000;
const CLR_HEADER_SIZE: usize = 72;
const RUNTIME_VERSION: &str = "v4.0.30319";

const ITEM_CHECK_LEN: usize = 2100;

mod op {
    pub const NOP: u8 = 0x00;
    pub const LDARG_0: u8 = 0x02;
    pub const LDC_I4_0: u8 = 0x16;
    pub const LDC_I4_1: u8 = 0x17;
    pub const LDC_R4: u8 = 0x22;
    pub const RET: u8 = 0x2A;
    pub const BRFALSE_S: u8 = 0x2C;
    pub const BGE_UN_S: u8 = 0x34;
    pub const BRFALSE: u8 = 0x39;
    pub const BRTRUE: u8 = 0x3A;
    pub const SWITCH: u8 = 0x45;
    pub const LDFLD: u8 = 0x7B;
    pub const STFLD: u8 = 0x7D;
    pub const LDELEM_R4: u8 = 0x98;
    pub const ENDFINALLY: u8 = 0xDC;
    pub const LEAVE_S: u8 = 0xDE;
}

mod sig {
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const I4: u8 = 0x08;
    pub const R4: u8 = 0x0C;
    pub const BYREF: u8 = 0x10;
    pub const CLASS: u8 = 0x12;
    pub const SZARRAY: u8 = 0x1D;
    pub const HASTHIS: u8 = 0x20;
    pub const FIELD: u8 = 0x06;
    pub const LOCAL_SIG: u8 = 0x07;
}

const FIELD_PUBLIC: u16 = 0x0006;
const FIELD_STATIC: u16 = 0x0010;
const METHOD_PUBLIC: u16 = 0x0006 | 0x0080;
const METHOD_ABSTRACT: u16 = 0x0040 | 0x0400;
const TYPE_PUBLIC: u32 = 0x0000_0001;
const TYPE_NESTED_PUBLIC: u32 = 0x0000_0002;

/// TypeDef rows, fixed so that signatures can refer to them before the tables exist
const MODULE_TYPE: u32 = 1;
const ENTITY: u32 = 2;
const PROJECTILE: u32 = 3;
const PLAYER: u32 = 4;
const ITEM: u32 = 5;
const MAIN: u32 = 6;
const SELECTION_RADIAL: u32 = 7;

/// Which construct sits at [`ImageBuilder::GATE_AT`] in `ItemCheck`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    /// `stfld releaseUseItem` followed by the `controlUseItem` test
    AfterStore,
    /// `controlUseItem` and `releaseUseItem` tested back to back
    Double,
    /// Neither shape
    Missing,
}

/// Builds synthetic executables, see the module documentation.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    slack: usize,
    gate: Gate,
    omitted: Vec<(String, String)>,
    nested_name: &'static str,
}

impl ImageBuilder {
    /// Module version id of every built image
    pub const MVID: Guid = guid!("0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0");

    /// Instructions of the small `ItemCheck` overload
    pub const ITEM_CHECK_STUB_LEN: usize = 5;

    /// Index of the first instruction of the nibble check in the bobber AI
    pub const NIBBLE_CHECK_AT: usize = 8;

    /// Index of the `controlUseItem` gate in the large `ItemCheck`
    pub const GATE_AT: usize = 40;

    /// Jumps in the large `ItemCheck` that land on the gate
    pub const BRANCHES_TO_GATE: usize = 3;

    /// The image the patches are written against
    #[must_use]
    pub fn terraria() -> Self {
        ImageBuilder {
            slack: 0x60,
            gate: Gate::AfterStore,
            omitted: Vec::new(),
            nested_name: "SelectionRadial",
        }
    }

    /// Free bytes between the section table and the end of the headers
    #[must_use]
    pub fn section_table_slack(mut self, slack: usize) -> Self {
        self.slack = slack;
        self
    }

    /// Leave out the field `name` of the type `ty`
    #[must_use]
    pub fn without_field(mut self, ty: &str, name: &str) -> Self {
        self.omitted.push((ty.to_string(), name.to_string()));
        self
    }

    /// Rename the type nested in `Player`
    #[must_use]
    pub fn nested_type_named(mut self, name: &'static str) -> Self {
        self.nested_name = name;
        self
    }

    /// Use the older gate that tests `releaseUseItem` right after `controlUseItem`
    #[must_use]
    pub fn double_gate(mut self) -> Self {
        self.gate = Gate::Double;
        self
    }

    /// Replace the gate with a construct no gate pattern recognizes
    #[must_use]
    pub fn without_gate(mut self) -> Self {
        self.gate = Gate::Missing;
        self
    }

    /// Lay out the image
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut heaps = Heaps::new();
        let types = self.declarations();

        let mut field_tokens = Vec::new();
        let mut row = 1_u32;
        for ty in &types {
            for field in &ty.fields {
                field_tokens.push((ty.name, field.name, 0x0400_0000 | row));
                row += 1;
            }
        }
        let field = |ty: &str, name: &str| -> u32 {
            field_tokens
                .iter()
                .find(|(owner, field, _)| *owner == ty && *field == name)
                .map_or(0x0400_0000, |(_, _, token)| *token)
        };

        let mut bodies = HashMap::new();
        bodies.insert(("Projectile", "AI_061_FishingBobber"), bobber_ai(&field, &mut heaps));
        bodies.insert(("Player", "ItemCheck"), item_check(&field, &mut heaps, self.gate));

        let mut text = vec![0_u8; CLR_HEADER_SIZE];
        let mut method_rows = Vec::new();
        for ty in &types {
            for method in &ty.methods {
                let rva = match method.body {
                    BodyKind::None => 0,
                    BodyKind::Ret => place(&mut text, &Body::returning(false).encode()),
                    BodyKind::ReturnFalse => place(&mut text, &Body::returning(true).encode()),
                    BodyKind::Stub => place(&mut text, &Body::stub().encode()),
                    BodyKind::Named => {
                        let body = bodies.get(&(ty.name, method.name)).map(Body::encode);
                        body.map_or(0, |encoded| place(&mut text, &encoded))
                    }
                };
                method_rows.push((rva, method));
            }
        }

        let metadata = self.metadata(&types, &method_rows, &mut heaps);
        pad(&mut text, 4);
        let metadata_rva = TEXT_RVA + text.len();
        text.extend_from_slice(&metadata);

        let mut header = Vec::with_capacity(CLR_HEADER_SIZE);
        push_u32(&mut header, CLR_HEADER_SIZE as u32);
        push_u16(&mut header, 2);
        push_u16(&mut header, 5);
        push_u32(&mut header, metadata_rva as u32);
        push_u32(&mut header, metadata.len() as u32);
        push_u32(&mut header, 0x0000_0001);
        header.resize(CLR_HEADER_SIZE, 0);
        text[..CLR_HEADER_SIZE].copy_from_slice(&header);

        self.pe(&text)
    }

    fn declarations(&self) -> Vec<TypeDecl> {
        let class = |row: u32| {
            let mut encoded = vec![sig::CLASS];
            compressed(&mut encoded, row << 2);
            encoded
        };
        let array_of = |row: u32| {
            let mut encoded = vec![sig::SZARRAY];
            encoded.extend(class(row));
            encoded
        };
        let instance = |fields: &[(&'static str, Vec<u8>)]| {
            fields
                .iter()
                .map(|(name, ty)| FieldDecl::new(name, FIELD_PUBLIC, ty))
                .collect::<Vec<_>>()
        };

        let mut types = vec![
            TypeDecl::new("", "<Module>", 0),
            TypeDecl {
                methods: vec![MethodDecl::new(
                    "Update",
                    METHOD_PUBLIC | METHOD_ABSTRACT,
                    method_sig(true, &[sig::VOID], &[]),
                    BodyKind::None,
                )],
                fields: instance(&[("whoAmI", vec![sig::I4])]),
                ..TypeDecl::new("Terraria", "Entity", TYPE_PUBLIC)
            },
            TypeDecl {
                fields: instance(&[
                    ("ai", vec![sig::SZARRAY, sig::R4]),
                    ("owner", vec![sig::I4]),
                    ("active", vec![sig::BOOLEAN]),
                    ("bobber", vec![sig::BOOLEAN]),
                ]),
                methods: vec![
                    MethodDecl::new(
                        "AI_061_FishingBobber",
                        METHOD_PUBLIC,
                        method_sig(true, &[sig::VOID], &[]),
                        BodyKind::Named,
                    ),
                    MethodDecl::new(
                        "Kill",
                        METHOD_PUBLIC,
                        method_sig(true, &[sig::VOID], &[]),
                        BodyKind::Ret,
                    ),
                    MethodDecl::new(
                        "Kill",
                        METHOD_PUBLIC,
                        method_sig(true, &[sig::VOID], &[vec![sig::I4]]),
                        BodyKind::Ret,
                    ),
                ],
                ..TypeDecl::new("Terraria", "Projectile", TYPE_PUBLIC)
            },
            TypeDecl {
                fields: instance(&[
                    ("controlUseItem", vec![sig::BOOLEAN]),
                    ("releaseUseItem", vec![sig::BOOLEAN]),
                    ("itemAnimation", vec![sig::I4]),
                ]),
                methods: vec![
                    MethodDecl::new(
                        "ItemCheck_CheckFishingBobber_ConsumeBait",
                        METHOD_PUBLIC,
                        method_sig(
                            true,
                            &[sig::BOOLEAN],
                            &[class(PROJECTILE), vec![sig::BYREF, sig::I4]],
                        ),
                        BodyKind::ReturnFalse,
                    ),
                    MethodDecl::new(
                        "ItemCheck_CheckFishingBobber_PullBobber",
                        METHOD_PUBLIC,
                        method_sig(true, &[sig::VOID], &[class(PROJECTILE), vec![sig::I4]]),
                        BodyKind::Ret,
                    ),
                    MethodDecl::new(
                        "ItemCheck",
                        METHOD_PUBLIC,
                        method_sig(true, &[sig::VOID], &[]),
                        BodyKind::Stub,
                    ),
                    MethodDecl::new(
                        "ItemCheck",
                        METHOD_PUBLIC,
                        method_sig(true, &[sig::VOID], &[vec![sig::I4]]),
                        BodyKind::Named,
                    ),
                ],
                ..TypeDecl::new("Terraria", "Player", TYPE_PUBLIC)
            },
            TypeDecl {
                fields: instance(&[("fishingPole", vec![sig::I4])]),
                ..TypeDecl::new("Terraria", "Item", TYPE_PUBLIC)
            },
            TypeDecl {
                fields: vec![
                    FieldDecl::new("player", FIELD_PUBLIC | FIELD_STATIC, &array_of(PLAYER)),
                    FieldDecl::new("myPlayer", FIELD_PUBLIC | FIELD_STATIC, &[sig::I4]),
                    FieldDecl::new(
                        "projectile",
                        FIELD_PUBLIC | FIELD_STATIC,
                        &array_of(PROJECTILE),
                    ),
                ],
                ..TypeDecl::new("Terraria", "Main", TYPE_PUBLIC)
            },
            TypeDecl {
                enclosing: Some(PLAYER),
                ..TypeDecl::new("", self.nested_name, TYPE_NESTED_PUBLIC)
            },
        ];

        for ty in &mut types {
            ty.fields.retain(|field| {
                !self
                    .omitted
                    .iter()
                    .any(|(owner, name)| owner == ty.name && name == field.name)
            });
        }
        debug_assert_eq!(types.len() as u32, SELECTION_RADIAL);
        debug_assert_eq!(types[MODULE_TYPE as usize - 1].name, "<Module>");
        debug_assert_eq!(types[ENTITY as usize - 1].name, "Entity");
        debug_assert_eq!(types[ITEM as usize - 1].name, "Item");
        debug_assert_eq!(types[MAIN as usize - 1].name, "Main");
        types
    }

    fn metadata(
        &self,
        types: &[TypeDecl],
        methods: &[(usize, &MethodDecl)],
        heaps: &mut Heaps,
    ) -> Vec<u8> {
        let mut tables = Tables::default();

        let module_name = heaps.string("Terraria.exe");
        tables.module.extend([0, module_name, 1, 0, 0]);

        let mut field_row = 1;
        let mut method_row = 1;
        let mut method_iter = methods.iter();
        for (index, ty) in types.iter().enumerate() {
            let name = heaps.string(ty.name);
            let namespace = heaps.string(ty.namespace);
            let extends = if ty.name == "Projectile" || ty.name == "Player" {
                ENTITY << 2
            } else {
                0
            };
            tables
                .type_def
                .push([ty.flags, name, namespace, extends, field_row, method_row]);

            for field in &ty.fields {
                let name = heaps.string(field.name);
                let signature = heaps.blob(&field.signature);
                tables.field.push([u32::from(field.flags), name, signature]);
                field_row += 1;
            }

            for _ in &ty.methods {
                let Some((rva, method)) = method_iter.next() else {
                    break;
                };
                let name = heaps.string(method.name);
                let signature = heaps.blob(&method.signature);
                tables.method_def.push([
                    *rva as u32,
                    0,
                    u32::from(method.flags),
                    name,
                    signature,
                    1,
                ]);
                method_row += 1;
            }

            if let Some(enclosing) = ty.enclosing {
                tables.nested_class.push([index as u32 + 1, enclosing]);
            }
        }
        tables.stand_alone_sig = heaps.local_signatures.clone();

        let streams = [
            ("#~", tables.encode()),
            ("#Strings", heaps.strings.clone()),
            ("#US", vec![0]),
            ("#GUID", Self::MVID.to_bytes().to_vec()),
            ("#Blob", heaps.blob.clone()),
        ];

        let mut version = RUNTIME_VERSION.as_bytes().to_vec();
        version.push(0);
        pad(&mut version, 4);

        let directory_len: usize = streams
            .iter()
            .map(|(name, _)| 8 + ((name.len() + 1 + 3) & !3))
            .sum();
        let mut offset = 20 + version.len() + directory_len;

        let mut root = Vec::new();
        push_u32(&mut root, 0x424A_5342);
        push_u16(&mut root, 1);
        push_u16(&mut root, 1);
        push_u32(&mut root, 0);
        push_u32(&mut root, version.len() as u32);
        root.extend_from_slice(&version);
        push_u16(&mut root, 0);
        push_u16(&mut root, streams.len() as u16);

        let mut data = Vec::new();
        for (name, stream) in &streams {
            let mut stream = stream.clone();
            pad(&mut stream, 4);
            push_u32(&mut root, offset as u32);
            push_u32(&mut root, stream.len() as u32);
            root.extend_from_slice(name.as_bytes());
            root.push(0);
            pad(&mut root, 4);
            offset += stream.len();
            data.extend_from_slice(&stream);
        }

        root.extend_from_slice(&data);
        root
    }

    fn pe(&self, text: &[u8]) -> Vec<u8> {
        let section_table = PE_OFFSET + 4 + 20 + OPTIONAL_HEADER_SIZE;
        let size_of_headers = section_table + SECTION_HEADER_SIZE + self.slack;
        let text_raw = align(size_of_headers, FILE_ALIGNMENT);
        let raw_size = align(text.len(), FILE_ALIGNMENT);
        let size_of_image = align(TEXT_RVA + text.len(), SECTION_ALIGNMENT);

        let mut image = vec![0_u8; PE_OFFSET];
        image[0] = b'M';
        image[1] = b'Z';
        image[0x3C..0x40].copy_from_slice(&(PE_OFFSET as u32).to_le_bytes());

        image.extend_from_slice(b"PE\0\0");
        push_u16(&mut image, 0x014C);
        push_u16(&mut image, 1);
        push_u32(&mut image, 0x5F5E_1000);
        push_u32(&mut image, 0);
        push_u32(&mut image, 0);
        push_u16(&mut image, OPTIONAL_HEADER_SIZE as u16);
        push_u16(&mut image, 0x0102);

        let optional = image.len();
        push_u16(&mut image, 0x010B);
        image.push(8);
        image.push(0);
        push_u32(&mut image, raw_size as u32);
        push_u32(&mut image, 0);
        push_u32(&mut image, 0);
        push_u32(&mut image, 0);
        push_u32(&mut image, TEXT_RVA as u32);
        push_u32(&mut image, 0);
        push_u32(&mut image, 0x0040_0000);
        push_u32(&mut image, SECTION_ALIGNMENT as u32);
        push_u32(&mut image, FILE_ALIGNMENT as u32);
        for version in [4_u16, 0, 0, 0, 4, 0] {
            push_u16(&mut image, version);
        }
        push_u32(&mut image, 0);
        push_u32(&mut image, size_of_image as u32);
        push_u32(&mut image, size_of_headers as u32);
        push_u32(&mut image, 0);
        push_u16(&mut image, 3);
        push_u16(&mut image, 0x8540);
        for size in [0x0010_0000_u32, 0x1000, 0x0010_0000, 0x1000] {
            push_u32(&mut image, size);
        }
        push_u32(&mut image, 0);
        push_u32(&mut image, 16);
        for index in 0..16 {
            if index == 14 {
                push_u32(&mut image, TEXT_RVA as u32);
                push_u32(&mut image, CLR_HEADER_SIZE as u32);
            } else {
                push_u32(&mut image, 0);
                push_u32(&mut image, 0);
            }
        }
        debug_assert_eq!(image.len(), optional + OPTIONAL_HEADER_SIZE);

        image.extend_from_slice(b".text\0\0\0");
        push_u32(&mut image, text.len() as u32);
        push_u32(&mut image, TEXT_RVA as u32);
        push_u32(&mut image, raw_size as u32);
        push_u32(&mut image, text_raw as u32);
        push_u32(&mut image, 0);
        push_u32(&mut image, 0);
        push_u16(&mut image, 0);
        push_u16(&mut image, 0);
        push_u32(&mut image, 0x6000_0020);

        image.resize(text_raw, 0);
        image.extend_from_slice(text);
        image.resize(text_raw + raw_size, 0);
        image
    }
}

/// How a declared method gets its body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    /// No body, RVA 0
    None,
    /// `ret`
    Ret,
    /// `ldc.i4.0; ret`
    ReturnFalse,
    /// The small `ItemCheck` overload
    Stub,
    /// Built by name in [`ImageBuilder::build`]
    Named,
}

struct TypeDecl {
    namespace: &'static str,
    name: &'static str,
    flags: u32,
    enclosing: Option<u32>,
    fields: Vec<FieldDecl>,
    methods: Vec<MethodDecl>,
}

impl TypeDecl {
    fn new(namespace: &'static str, name: &'static str, flags: u32) -> Self {
        TypeDecl {
            namespace,
            name,
            flags,
            enclosing: None,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }
}

struct FieldDecl {
    name: &'static str,
    flags: u16,
    signature: Vec<u8>,
}

impl FieldDecl {
    fn new(name: &'static str, flags: u16, ty: &[u8]) -> Self {
        let mut signature = vec![sig::FIELD];
        signature.extend_from_slice(ty);
        FieldDecl {
            name,
            flags,
            signature,
        }
    }
}

struct MethodDecl {
    name: &'static str,
    flags: u16,
    signature: Vec<u8>,
    body: BodyKind,
}

impl MethodDecl {
    fn new(name: &'static str, flags: u16, signature: Vec<u8>, body: BodyKind) -> Self {
        MethodDecl {
            name,
            flags,
            signature,
            body,
        }
    }
}

fn method_sig(has_this: bool, ret: &[u8], params: &[Vec<u8>]) -> Vec<u8> {
    let mut signature = vec![if has_this { sig::HASTHIS } else { 0 }];
    compressed(&mut signature, params.len() as u32);
    signature.extend_from_slice(ret);
    for param in params {
        signature.extend_from_slice(param);
    }
    signature
}

/// The heaps, plus the `StandAloneSig` rows that point into `#Blob`
struct Heaps {
    strings: Vec<u8>,
    string_index: HashMap<String, u32>,
    blob: Vec<u8>,
    local_signatures: Vec<[u32; 1]>,
}

impl Heaps {
    fn new() -> Self {
        Heaps {
            strings: vec![0],
            string_index: HashMap::new(),
            blob: vec![0],
            local_signatures: Vec::new(),
        }
    }

    fn string(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(index) = self.string_index.get(value) {
            return *index;
        }

        let index = self.strings.len() as u32;
        self.strings.extend_from_slice(value.as_bytes());
        self.strings.push(0);
        self.string_index.insert(value.to_string(), index);
        index
    }

    fn blob(&mut self, value: &[u8]) -> u32 {
        let index = self.blob.len() as u32;
        compressed(&mut self.blob, value.len() as u32);
        self.blob.extend_from_slice(value);
        index
    }

    /// Add a local signature and return its `StandAloneSig` token
    fn locals(&mut self, types: &[&[u8]]) -> u32 {
        let mut signature = vec![sig::LOCAL_SIG];
        compressed(&mut signature, types.len() as u32);
        for ty in types {
            signature.extend_from_slice(ty);
        }
        let index = self.blob(&signature);
        self.local_signatures.push([index]);
        0x1100_0000 | self.local_signatures.len() as u32
    }
}

/// The tables the image uses, every column 2 bytes wide except the 4-byte constants
#[derive(Default)]
struct Tables {
    module: Vec<u32>,
    type_def: Vec<[u32; 6]>,
    field: Vec<[u32; 3]>,
    method_def: Vec<[u32; 6]>,
    stand_alone_sig: Vec<[u32; 1]>,
    nested_class: Vec<[u32; 2]>,
}

impl Tables {
    fn encode(&self) -> Vec<u8> {
        const MODULE: u64 = 0x00;
        const TYPE_DEF: u64 = 0x02;
        const FIELD: u64 = 0x04;
        const METHOD_DEF: u64 = 0x06;
        const STAND_ALONE_SIG: u64 = 0x11;
        const NESTED_CLASS: u64 = 0x29;

        let mut valid: u64 = (1 << MODULE) | (1 << TYPE_DEF) | (1 << FIELD) | (1 << METHOD_DEF);
        if !self.stand_alone_sig.is_empty() {
            valid |= 1 << STAND_ALONE_SIG;
        }
        if !self.nested_class.is_empty() {
            valid |= 1 << NESTED_CLASS;
        }

        let mut data = Vec::new();
        push_u32(&mut data, 0);
        data.push(2);
        data.push(0);
        data.push(0);
        data.push(1);
        data.extend_from_slice(&valid.to_le_bytes());
        data.extend_from_slice(&(1_u64 << NESTED_CLASS).to_le_bytes());

        push_u32(&mut data, 1);
        push_u32(&mut data, self.type_def.len() as u32);
        push_u32(&mut data, self.field.len() as u32);
        push_u32(&mut data, self.method_def.len() as u32);
        if !self.stand_alone_sig.is_empty() {
            push_u32(&mut data, self.stand_alone_sig.len() as u32);
        }
        if !self.nested_class.is_empty() {
            push_u32(&mut data, self.nested_class.len() as u32);
        }

        for value in &self.module {
            push_u16(&mut data, *value as u16);
        }
        for [flags, name, namespace, extends, fields, methods] in &self.type_def {
            push_u32(&mut data, *flags);
            for value in [name, namespace, extends, fields, methods] {
                push_u16(&mut data, *value as u16);
            }
        }
        for row in &self.field {
            for value in row {
                push_u16(&mut data, *value as u16);
            }
        }
        for [rva, impl_flags, flags, name, signature, params] in &self.method_def {
            push_u32(&mut data, *rva);
            for value in [impl_flags, flags, name, signature, params] {
                push_u16(&mut data, *value as u16);
            }
        }
        for [signature] in &self.stand_alone_sig {
            push_u16(&mut data, *signature as u16);
        }
        for [nested, enclosing] in &self.nested_class {
            push_u16(&mut data, *nested as u16);
            push_u16(&mut data, *enclosing as u16);
        }

        pad(&mut data, 4);
        data
    }
}

/// A finally clause, as instruction indexes
struct Clause {
    try_start: usize,
    handler_start: usize,
    handler_end: usize,
}

/// A method body under construction.
///
/// Branch targets are instruction indexes, resolved to displacements on encode.
struct Body {
    code: Vec<Emitted>,
    local_sig: u32,
    max_stack: u16,
    clauses: Vec<Clause>,
}

enum Emitted {
    Plain(Vec<u8>),
    Branch(u8, usize),
    Switch(Vec<usize>),
}

impl Emitted {
    fn size(&self) -> usize {
        match self {
            Emitted::Plain(bytes) => bytes.len(),
            Emitted::Branch(opcode, _) if is_short_branch(*opcode) => 2,
            Emitted::Branch(..) => 5,
            Emitted::Switch(targets) => 5 + 4 * targets.len(),
        }
    }
}

fn is_short_branch(opcode: u8) -> bool {
    (0x2B..=0x37).contains(&opcode) || opcode == op::LEAVE_S
}

impl Body {
    fn new(local_sig: u32, max_stack: u16) -> Self {
        Body {
            code: Vec::new(),
            local_sig,
            max_stack,
            clauses: Vec::new(),
        }
    }

    fn returning(value: bool) -> Self {
        let mut body = Body::new(0, 8);
        if value {
            body.op(op::LDC_I4_0);
        }
        body.op(op::RET);
        body
    }

    fn stub() -> Self {
        let mut body = Body::new(0, 8);
        body.nops(ImageBuilder::ITEM_CHECK_STUB_LEN - 1);
        body.op(op::RET);
        body
    }

    fn len(&self) -> usize {
        self.code.len()
    }

    fn op(&mut self, opcode: u8) {
        self.code.push(Emitted::Plain(vec![opcode]));
    }

    fn nops(&mut self, count: usize) {
        for _ in 0..count {
            self.op(op::NOP);
        }
    }

    fn nops_until(&mut self, index: usize) {
        while self.len() < index {
            self.op(op::NOP);
        }
    }

    fn token(&mut self, opcode: u8, token: u32) {
        let mut bytes = vec![opcode];
        bytes.extend_from_slice(&token.to_le_bytes());
        self.code.push(Emitted::Plain(bytes));
    }

    fn ldc_r4(&mut self, value: f32) {
        let mut bytes = vec![op::LDC_R4];
        bytes.extend_from_slice(&value.to_le_bytes());
        self.code.push(Emitted::Plain(bytes));
    }

    fn branch(&mut self, opcode: u8, target: usize) {
        self.code.push(Emitted::Branch(opcode, target));
    }

    fn switch(&mut self, targets: Vec<usize>) {
        self.code.push(Emitted::Switch(targets));
    }

    fn encode(&self) -> Vec<u8> {
        let mut offsets = Vec::with_capacity(self.code.len() + 1);
        let mut cursor = 0;
        for emitted in &self.code {
            offsets.push(cursor);
            cursor += emitted.size();
        }
        offsets.push(cursor);
        let at = |index: usize| offsets[index.min(self.code.len())] as i64;

        let mut code = Vec::with_capacity(cursor);
        for (index, emitted) in self.code.iter().enumerate() {
            let end = at(index) + emitted.size() as i64;
            match emitted {
                Emitted::Plain(bytes) => code.extend_from_slice(bytes),
                Emitted::Branch(opcode, target) => {
                    code.push(*opcode);
                    let delta = at(*target) - end;
                    if is_short_branch(*opcode) {
                        code.push(i8::try_from(delta).unwrap_or(0) as u8);
                    } else {
                        code.extend_from_slice(&(delta as i32).to_le_bytes());
                    }
                }
                Emitted::Switch(targets) => {
                    code.push(op::SWITCH);
                    code.extend_from_slice(&(targets.len() as u32).to_le_bytes());
                    for target in targets {
                        code.extend_from_slice(&((at(*target) - end) as i32).to_le_bytes());
                    }
                }
            }
        }

        let tiny = code.len() < 64
            && self.local_sig == 0
            && self.max_stack <= 8
            && self.clauses.is_empty();
        if tiny {
            let mut encoded = vec![((code.len() as u8) << 2) | 0x02];
            encoded.extend_from_slice(&code);
            return encoded;
        }

        let mut flags: u16 = 0x0003 | 0x0010 | (3 << 12);
        if !self.clauses.is_empty() {
            flags |= 0x0008;
        }
        let mut encoded = Vec::new();
        push_u16(&mut encoded, flags);
        push_u16(&mut encoded, self.max_stack);
        push_u32(&mut encoded, code.len() as u32);
        push_u32(&mut encoded, self.local_sig);
        encoded.extend_from_slice(&code);

        if !self.clauses.is_empty() {
            pad(&mut encoded, 4);
            encoded.push(0x01);
            encoded.push((4 + 12 * self.clauses.len()) as u8);
            push_u16(&mut encoded, 0);
            for clause in &self.clauses {
                push_u16(&mut encoded, 0x0002);
                push_u16(&mut encoded, at(clause.try_start) as u16);
                encoded.push((at(clause.handler_start) - at(clause.try_start)) as u8);
                push_u16(&mut encoded, at(clause.handler_start) as u16);
                encoded.push((at(clause.handler_end) - at(clause.handler_start)) as u8);
                push_u32(&mut encoded, 0);
            }
        }

        encoded
    }
}

/// `Projectile.AI_061_FishingBobber`: padding, the nibble check, padding, `ret`
fn bobber_ai(field: &dyn Fn(&str, &str) -> u32, heaps: &mut Heaps) -> Body {
    let locals = heaps.locals(&[&[sig::I4], &[sig::R4]]);
    let mut body = Body::new(locals, 8);
    let end = ImageBuilder::NIBBLE_CHECK_AT + 9;

    body.nops_until(ImageBuilder::NIBBLE_CHECK_AT);
    body.op(op::LDARG_0);
    body.token(op::LDFLD, field("Projectile", "ai"));
    body.op(op::LDC_I4_1);
    body.op(op::LDELEM_R4);
    body.ldc_r4(0.0);
    body.branch(op::BGE_UN_S, end);
    body.nops_until(end);
    body.op(op::RET);
    body
}

/// The large `Player.ItemCheck`: jumps to the gate from before and after it, the gate, a
/// try/finally, padding past the overload threshold, `ret`
fn item_check(field: &dyn Fn(&str, &str) -> u32, heaps: &mut Heaps, gate: Gate) -> Body {
    let mut item = vec![sig::CLASS];
    compressed(&mut item, ITEM << 2);
    let locals = heaps.locals(&[&[sig::I4], &item]);
    let mut body = Body::new(locals, 8);

    let at = ImageBuilder::GATE_AT;
    let skip = at + 6;
    let after_try = skip + 4;
    let backward = 60;

    body.nops(10);
    body.op(op::LDC_I4_0);
    body.branch(op::BRTRUE, at);
    body.op(op::LDC_I4_1);
    body.switch(vec![at, after_try]);
    body.nops_until(at - 3);

    let control = field("Player", "controlUseItem");
    let release = field("Player", "releaseUseItem");
    match gate {
        Gate::AfterStore => {
            body.op(op::LDARG_0);
            body.op(op::LDC_I4_0);
            body.token(op::STFLD, release);
            body.op(op::LDARG_0);
            body.token(op::LDFLD, control);
            body.branch(op::BRFALSE_S, skip);
            body.nops(3);
        }
        Gate::Double => {
            body.nops(3);
            body.op(op::LDARG_0);
            body.token(op::LDFLD, control);
            body.branch(op::BRFALSE_S, skip);
            body.op(op::LDARG_0);
            body.token(op::LDFLD, release);
            body.branch(op::BRFALSE_S, skip);
        }
        Gate::Missing => {
            body.nops(3);
            body.op(op::LDARG_0);
            body.token(op::LDFLD, field("Player", "itemAnimation"));
            body.branch(op::BRFALSE_S, skip);
            body.nops(3);
        }
    }

    body.op(op::NOP);
    body.branch(op::LEAVE_S, after_try);
    body.op(op::NOP);
    body.op(op::ENDFINALLY);
    body.clauses.push(Clause {
        try_start: skip,
        handler_start: skip + 2,
        handler_end: after_try,
    });

    body.nops_until(backward);
    body.op(op::LDC_I4_0);
    body.branch(op::BRFALSE, at);
    body.nops_until(ITEM_CHECK_LEN - 1);
    body.op(op::RET);
    body
}

/// Append `body` 4-byte aligned to the `.text` contents and return its RVA
fn place(text: &mut Vec<u8>, body: &[u8]) -> usize {
    pad(text, 4);
    let rva = TEXT_RVA + text.len();
    text.extend_from_slice(body);
    rva
}

fn compressed(buffer: &mut Vec<u8>, value: u32) {
    if value < 0x80 {
        buffer.push(value as u8);
    } else if value < 0x4000 {
        buffer.push(0x80 | (value >> 8) as u8);
        buffer.push(value as u8);
    } else {
        buffer.extend_from_slice(&(0xC000_0000 | value).to_be_bytes());
    }
}

fn push_u16(buffer: &mut Vec<u8>, value: u16) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn pad(buffer: &mut Vec<u8>, alignment: usize) {
    buffer.resize(align(buffer.len(), alignment), 0);
}

fn align(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}
