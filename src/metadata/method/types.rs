use bitflags::bitflags;

bitflags! {
    /// Flags of a method body header, ECMA-335 II.25.4.1
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodBodyFlags: u16 {
        /// The method header is tiny
        const TINY_FORMAT = 0x2;
        /// The method header is fat
        const FAT_FORMAT = 0x3;
        /// More sections follow after this header
        const MORE_SECTS = 0x8;
        /// Call default constructor on all local variables
        const INIT_LOCALS = 0x10;
    }
}

bitflags! {
    /// Flags of an extra data section, ECMA-335 II.25.4.5
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u8 {
        /// Exception handling data
        const EHTABLE = 0x1;
        /// Reserved, shall be 0
        const OPT_ILTABLE = 0x2;
        /// Data format is of the fat variety, meaning there is a 3-byte length
        const FAT_FORMAT = 0x40;
        /// Another data section occurs after this current section
        const MORE_SECTS = 0x80;
    }
}

bitflags! {
    /// `MethodAttributes`, ECMA-335 II.23.1.10
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodAttributes: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special
        const SPECIAL_NAME = 0x0800;
        /// Implementation is forwarded through P/Invoke
        const PINVOKE_IMPL = 0x2000;
    }
}

bitflags! {
    /// `MethodImplAttributes`, ECMA-335 II.23.1.11
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodImplAttributes: u32 {
        /// Method implementation is native
        const NATIVE = 0x0001;
        /// Method implementation is OPTIL
        const OPTIL = 0x0002;
        /// Method implementation is provided by the runtime
        const RUNTIME = 0x0003;
        /// Method implementation is unmanaged
        const UNMANAGED = 0x0004;
        /// Method is implemented by the runtime itself
        const INTERNAL_CALL = 0x1000;
    }
}

impl MethodImplAttributes {
    /// `true` if the implementation is IL and therefore has a body to decode
    #[must_use]
    pub fn is_il(&self) -> bool {
        self.bits() & 0x0003 == 0 && !self.contains(MethodImplAttributes::INTERNAL_CALL)
    }
}

bitflags! {
    /// `FieldAttributes`, ECMA-335 II.23.1.5
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FieldAttributes: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Field can only be initialized
        const INIT_ONLY = 0x0020;
        /// Value is a compile time constant
        const LITERAL = 0x0040;
        /// Field has an RVA
        const HAS_FIELD_RVA = 0x0100;
    }
}
