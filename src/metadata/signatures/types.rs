use crate::metadata::token::Token;

/// Element type codes used in signature blobs, ECMA-335 II.23.1.16
#[allow(non_snake_case, missing_docs)]
pub mod ELEMENT_TYPE {
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    pub const PTR: u8 = 0x0f;
    pub const BYREF: u8 = 0x10;
    pub const VALUETYPE: u8 = 0x11;
    pub const CLASS: u8 = 0x12;
    pub const VAR: u8 = 0x13;
    pub const ARRAY: u8 = 0x14;
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    pub const I: u8 = 0x18;
    pub const U: u8 = 0x19;
    pub const FNPTR: u8 = 0x1b;
    pub const OBJECT: u8 = 0x1c;
    pub const SZARRAY: u8 = 0x1d;
    pub const MVAR: u8 = 0x1e;
    pub const CMOD_REQD: u8 = 0x1f;
    pub const CMOD_OPT: u8 = 0x20;
    pub const SENTINEL: u8 = 0x41;
    pub const PINNED: u8 = 0x45;
}

/// Leading bytes of the standalone signature kinds, ECMA-335 II.23.2
#[allow(non_snake_case, missing_docs)]
pub mod SIGNATURE_HEADER {
    pub const FIELD: u8 = 0x06;
    pub const LOCAL_SIG: u8 = 0x07;
}

/// Represents a parsed type in various signatures
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypeSignature {
    #[default]
    /// Not defined
    Unknown,
    /// void
    Void,
    /// bool
    Boolean,
    /// char
    Char,
    /// signed 8bit integer
    I1,
    /// unsigned 8bit integer
    U1,
    /// signed 16bit integer
    I2,
    /// unsigned 16bit integer
    U2,
    /// signed 32bit integer
    I4,
    /// unsigned 32bit integer
    U4,
    /// signed 64bit integer
    I8,
    /// unsigned 64bit integer
    U8,
    /// 32bit floating-point
    R4,
    /// 64bit floating-point
    R8,
    /// System.String
    String,
    /// A pointer to a type
    Ptr(Box<TypeSignature>),
    /// Type by reference
    ByRef(Box<TypeSignature>),
    /// CIL value-type, `TypeDefOrRef` token
    ValueType(Token),
    /// CIL class, `TypeDefOrRef` token
    Class(Token),
    /// Generic type parameter
    GenericParamType(u32),
    /// Multi-dimensional array and its rank
    Array(Box<TypeSignature>, u32),
    /// Generic type and its arguments
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// Type is referenced during runtime
    TypedByRef,
    /// signed integer, sized to executing platform
    I,
    /// unsigned integer, sized to executing platform
    U,
    /// Function pointer
    FnPtr(Box<SignatureMethod>),
    /// System.Object
    Object,
    /// Single dimension array
    SzArray(Box<TypeSignature>),
    /// Generic method parameter
    GenericParamMethod(u32),
    /// A pinned type
    Pinned(Box<TypeSignature>),
}

impl TypeSignature {
    /// The short display name of this type, as it appears in a member listing.
    ///
    /// `Single[]` for a `float32` vector, `Player` for a class. Class and value-type names
    /// are looked up through `resolve`; unresolved tokens render as their token value.
    pub fn display_name(&self, resolve: &dyn Fn(Token) -> Option<String>) -> String {
        match self {
            TypeSignature::Unknown => "?".to_string(),
            TypeSignature::Void => "Void".to_string(),
            TypeSignature::Boolean => "Boolean".to_string(),
            TypeSignature::Char => "Char".to_string(),
            TypeSignature::I1 => "SByte".to_string(),
            TypeSignature::U1 => "Byte".to_string(),
            TypeSignature::I2 => "Int16".to_string(),
            TypeSignature::U2 => "UInt16".to_string(),
            TypeSignature::I4 => "Int32".to_string(),
            TypeSignature::U4 => "UInt32".to_string(),
            TypeSignature::I8 => "Int64".to_string(),
            TypeSignature::U8 => "UInt64".to_string(),
            TypeSignature::R4 => "Single".to_string(),
            TypeSignature::R8 => "Double".to_string(),
            TypeSignature::String => "String".to_string(),
            TypeSignature::I => "IntPtr".to_string(),
            TypeSignature::U => "UIntPtr".to_string(),
            TypeSignature::Object => "Object".to_string(),
            TypeSignature::TypedByRef => "TypedReference".to_string(),
            TypeSignature::Ptr(base) => format!("{}*", base.display_name(resolve)),
            TypeSignature::ByRef(base) => format!("{}&", base.display_name(resolve)),
            TypeSignature::Pinned(base) => base.display_name(resolve),
            TypeSignature::SzArray(base) => format!("{}[]", base.display_name(resolve)),
            TypeSignature::Array(base, rank) => format!(
                "{}[{}]",
                base.display_name(resolve),
                ",".repeat((*rank).saturating_sub(1) as usize)
            ),
            TypeSignature::ValueType(token) | TypeSignature::Class(token) => {
                resolve(*token).unwrap_or_else(|| token.to_string())
            }
            TypeSignature::GenericParamType(index) => format!("!{index}"),
            TypeSignature::GenericParamMethod(index) => format!("!!{index}"),
            TypeSignature::GenericInst(base, args) => format!(
                "{}<{}>",
                base.display_name(resolve),
                args.iter()
                    .map(|arg| arg.display_name(resolve))
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            TypeSignature::FnPtr(_) => "method".to_string(),
        }
    }
}

/// Parameter of a method signature
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureParameter {
    /// Parameter is passed by reference
    pub by_ref: bool,
    /// The type of the parameter
    pub base: TypeSignature,
}

/// Represents a method signature (II.23.2.1)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureMethod {
    /// Used to encode the keyword instance in the calling convention, see §II.15.3
    pub has_this: bool,
    /// Used to encode the keyword explicit in the calling convention, see §II.15.3
    pub explicit_this: bool,
    /// Number of generic parameters, 0 for non-generic methods
    pub param_count_generic: u32,
    /// The return type
    pub return_type: SignatureParameter,
    /// The declared parameters, not counting `this`
    pub params: Vec<SignatureParameter>,
}

impl SignatureMethod {
    /// `true` if a call leaves a value on the evaluation stack
    #[must_use]
    pub fn returns_value(&self) -> bool {
        self.return_type.by_ref || self.return_type.base != TypeSignature::Void
    }
}

/// Represents a field signature (II.23.2.4)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureField {
    /// Custom modifiers, `TypeDefOrRef` tokens
    pub modifiers: Vec<Token>,
    /// The field type
    pub base: TypeSignature,
}

/// One entry of a local variable signature
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureLocalVariable {
    /// The local is a managed reference
    pub is_byref: bool,
    /// The local is pinned
    pub is_pinned: bool,
    /// The local type
    pub base: TypeSignature,
}

/// Represents a local variable signature (II.23.2.6)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureLocalVariables {
    /// The declared locals, in slot order
    pub locals: Vec<SignatureLocalVariable>,
}
