//! Declarations of the module and the handles the resolver hands out.

use crate::metadata::{
    method::{FieldAttributes, MethodAttributes, MethodImplAttributes},
    signatures::{SignatureField, SignatureMethod},
    token::Token,
};

/// A resolved `TypeDef`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    token: Token,
}

impl TypeHandle {
    pub(crate) fn new(token: Token) -> Self {
        TypeHandle { token }
    }

    /// The `TypeDef` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }
}

/// A resolved `Field`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHandle {
    token: Token,
    is_static: bool,
}

impl FieldHandle {
    pub(crate) fn new(token: Token, is_static: bool) -> Self {
        FieldHandle { token, is_static }
    }

    /// The `Field` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// `true` for fields that live on the type rather than on an instance
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }
}

/// A resolved `MethodDef`, together with what a call to it does to the evaluation stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodHandle {
    token: Token,
    is_static: bool,
    pops: u16,
    pushes: u8,
}

impl MethodHandle {
    pub(crate) fn new(token: Token, signature: &SignatureMethod) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let pops = signature.params.len().min(usize::from(u16::MAX - 1)) as u16
            + u16::from(signature.has_this);

        MethodHandle {
            token,
            is_static: !signature.has_this,
            pops,
            pushes: u8::from(signature.returns_value()),
        }
    }

    /// The `MethodDef` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// `true` if the method takes no `this`
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Values a call consumes, `this` included
    #[must_use]
    pub fn pops(&self) -> u16 {
        self.pops
    }

    /// Values a call leaves behind, 0 or 1
    #[must_use]
    pub fn pushes(&self) -> u8 {
        self.pushes
    }
}

/// A type declaration with its members
#[derive(Debug, Clone)]
pub struct TypeDef {
    /// Handle of this type
    pub handle: TypeHandle,
    /// Simple name
    pub name: String,
    /// Namespace, empty for nested types
    pub namespace: String,
    /// The enclosing type of a nested type
    pub enclosing: Option<TypeHandle>,
    /// Fields, in declaration order
    pub fields: Vec<FieldDef>,
    /// Methods, in declaration order
    pub methods: Vec<MethodDef>,
}

impl TypeDef {
    /// `Namespace.Name`, or just the name in the global namespace
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// A field declaration
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Handle of this field
    pub handle: FieldHandle,
    /// Name
    pub name: String,
    /// `FieldAttributes`
    pub flags: FieldAttributes,
    /// Parsed signature
    pub signature: SignatureField,
    /// Display name of the field type, e.g. `Single[]`
    pub type_name: String,
}

/// A method declaration
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Handle of this method
    pub handle: MethodHandle,
    /// Name
    pub name: String,
    /// `MethodAttributes`
    pub flags: MethodAttributes,
    /// `MethodImplAttributes`
    pub impl_flags: MethodImplAttributes,
    /// RVA of the body, 0 if there is none
    pub rva: u32,
    /// Parsed signature
    pub signature: SignatureMethod,
}

impl MethodDef {
    /// Number of declared parameters, not counting `this`
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.signature.params.len()
    }

    /// `true` if the method has an IL body to decode
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.rva != 0 && self.impl_flags.is_il()
    }
}
