use crate::{
    file::parser::Parser,
    metadata::{
        signatures::{
            SignatureField, SignatureLocalVariable, SignatureLocalVariables, SignatureMethod,
            SignatureParameter, TypeSignature, ELEMENT_TYPE, SIGNATURE_HEADER,
        },
        token::Token,
    },
    Result,
};

/// Maximum recursion depth for signature parsing
const MAX_RECURSION_DEPTH: usize = 50;

/// Parser for the signature blobs the patcher reads: method, field and local variable
/// signatures.
///
/// # Example
///
/// ```rust
/// use autofish::metadata::signatures::SignatureParser;
/// let data = &[0x20, 0x01, 0x01, 0x0E];
/// let mut parser = SignatureParser::new(data);
/// let sig = parser.parse_method_signature().unwrap();
/// assert_eq!(sig.params.len(), 1);
/// ```
pub struct SignatureParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> SignatureParser<'a> {
    /// Create a new `SignatureParser` from a byte slice
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    /// Current position inside the blob
    #[must_use]
    pub fn pos(&self) -> usize {
        self.parser.pos()
    }

    fn parse_type(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(malformed_error!(
                "Signature nesting exceeds {} levels",
                MAX_RECURSION_DEPTH
            ));
        }

        let current_byte = self.parser.read_le::<u8>()?;
        let parsed = match current_byte {
            ELEMENT_TYPE::VOID => TypeSignature::Void,
            ELEMENT_TYPE::BOOLEAN => TypeSignature::Boolean,
            ELEMENT_TYPE::CHAR => TypeSignature::Char,
            ELEMENT_TYPE::I1 => TypeSignature::I1,
            ELEMENT_TYPE::U1 => TypeSignature::U1,
            ELEMENT_TYPE::I2 => TypeSignature::I2,
            ELEMENT_TYPE::U2 => TypeSignature::U2,
            ELEMENT_TYPE::I4 => TypeSignature::I4,
            ELEMENT_TYPE::U4 => TypeSignature::U4,
            ELEMENT_TYPE::I8 => TypeSignature::I8,
            ELEMENT_TYPE::U8 => TypeSignature::U8,
            ELEMENT_TYPE::R4 => TypeSignature::R4,
            ELEMENT_TYPE::R8 => TypeSignature::R8,
            ELEMENT_TYPE::STRING => TypeSignature::String,
            ELEMENT_TYPE::PTR => {
                self.parse_custom_mods()?;
                TypeSignature::Ptr(Box::new(self.parse_type()?))
            }
            ELEMENT_TYPE::BYREF => TypeSignature::ByRef(Box::new(self.parse_type()?)),
            ELEMENT_TYPE::VALUETYPE => {
                TypeSignature::ValueType(self.parser.read_compressed_token()?)
            }
            ELEMENT_TYPE::CLASS => TypeSignature::Class(self.parser.read_compressed_token()?),
            ELEMENT_TYPE::VAR => {
                TypeSignature::GenericParamType(self.parser.read_compressed_uint()?)
            }
            ELEMENT_TYPE::ARRAY => {
                let elem_type = self.parse_type()?;
                let rank = self.parser.read_compressed_uint()?;

                let num_sizes = self.parser.read_compressed_uint()?;
                for _ in 0..num_sizes {
                    self.parser.read_compressed_uint()?;
                }
                let num_lo_bounds = self.parser.read_compressed_uint()?;
                for _ in 0..num_lo_bounds {
                    self.parser.read_compressed_uint()?;
                }

                TypeSignature::Array(Box::new(elem_type), rank)
            }
            ELEMENT_TYPE::GENERICINST => {
                let peek_byte = self.parser.peek_byte()?;
                if peek_byte != ELEMENT_TYPE::CLASS && peek_byte != ELEMENT_TYPE::VALUETYPE {
                    return Err(malformed_error!(
                        "GENERICINST - Next byte is not TYPE_CLASS or TYPE_VALUE - {}",
                        peek_byte
                    ));
                }

                let base_type = self.parse_type()?;
                let arg_count = self.parser.read_compressed_uint()?;

                let mut type_args = Vec::with_capacity(arg_count.min(16) as usize);
                for _ in 0..arg_count {
                    type_args.push(self.parse_type()?);
                }

                TypeSignature::GenericInst(Box::new(base_type), type_args)
            }
            ELEMENT_TYPE::TYPEDBYREF => TypeSignature::TypedByRef,
            ELEMENT_TYPE::I => TypeSignature::I,
            ELEMENT_TYPE::U => TypeSignature::U,
            ELEMENT_TYPE::FNPTR => TypeSignature::FnPtr(Box::new(self.parse_method_signature()?)),
            ELEMENT_TYPE::OBJECT => TypeSignature::Object,
            ELEMENT_TYPE::SZARRAY => {
                self.parse_custom_mods()?;
                TypeSignature::SzArray(Box::new(self.parse_type()?))
            }
            ELEMENT_TYPE::MVAR => {
                TypeSignature::GenericParamMethod(self.parser.read_compressed_uint()?)
            }
            ELEMENT_TYPE::PINNED => TypeSignature::Pinned(Box::new(self.parse_type()?)),
            ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                self.parser.read_compressed_token()?;
                self.parse_custom_mods()?;
                self.parse_type()?
            }
            _ => {
                return Err(malformed_error!(
                    "Unsupported ELEMENT_TYPE - {}",
                    current_byte
                ))
            }
        };

        self.depth -= 1;
        Ok(parsed)
    }

    /// Parse custom modifiers (`CMOD_OPT` or `CMOD_REQD`)
    fn parse_custom_mods(&mut self) -> Result<Vec<Token>> {
        let mut mods = Vec::new();

        while self.parser.has_more_data() {
            let next_byte = self.parser.peek_byte()?;
            if next_byte != ELEMENT_TYPE::CMOD_OPT && next_byte != ELEMENT_TYPE::CMOD_REQD {
                break;
            }

            self.parser.advance_by(1)?;
            mods.push(self.parser.read_compressed_token()?);
        }

        Ok(mods)
    }

    fn parse_param(&mut self) -> Result<SignatureParameter> {
        self.parse_custom_mods()?;

        let by_ref = if self.parser.peek_byte()? == ELEMENT_TYPE::BYREF {
            self.parser.advance_by(1)?;
            true
        } else {
            false
        };

        Ok(SignatureParameter {
            by_ref,
            base: self.parse_type()?,
        })
    }

    /// Parse a method signature from the blob (II.23.2.1)
    ///
    /// # Errors
    /// Returns an error if the blob is truncated or uses an unknown element type.
    pub fn parse_method_signature(&mut self) -> Result<SignatureMethod> {
        let convention_byte = self.parser.read_le::<u8>()?;

        let param_count_generic = if convention_byte & 0x10 != 0 {
            self.parser.read_compressed_uint()?
        } else {
            0
        };
        let param_count = self.parser.read_compressed_uint()?;
        let return_type = self.parse_param()?;

        let mut params = Vec::with_capacity(param_count.min(64) as usize);
        for _ in 0..param_count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                self.parser.advance_by(1)?;
            }

            params.push(self.parse_param()?);
        }

        Ok(SignatureMethod {
            has_this: convention_byte & 0x20 != 0,
            explicit_this: convention_byte & 0x40 != 0,
            param_count_generic,
            return_type,
            params,
        })
    }

    /// Parse a field signature from the blob (II.23.2.4)
    ///
    /// # Errors
    /// Returns an error if the header is not `FIELD` or the type cannot be parsed.
    pub fn parse_field_signature(&mut self) -> Result<SignatureField> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::FIELD {
            return Err(malformed_error!(
                "SignatureField - invalid start - {}",
                head_byte
            ));
        }

        let modifiers = self.parse_custom_mods()?;
        let base = self.parse_type()?;

        Ok(SignatureField { modifiers, base })
    }

    /// Parse a local variable signature from the blob (II.23.2.6)
    ///
    /// # Errors
    /// Returns an error if the header is not `LOCAL_SIG` or a type cannot be parsed.
    pub fn parse_local_var_signature(&mut self) -> Result<SignatureLocalVariables> {
        let count = self.parse_local_var_header()?;

        let mut locals = Vec::with_capacity(count.min(256) as usize);
        for _ in 0..count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::TYPEDBYREF {
                self.parser.advance_by(1)?;
                locals.push(SignatureLocalVariable {
                    is_byref: false,
                    is_pinned: false,
                    base: TypeSignature::TypedByRef,
                });
                continue;
            }

            let mut is_pinned = false;
            let mut is_byref = false;
            while self.parser.has_more_data() {
                match self.parser.peek_byte()? {
                    ELEMENT_TYPE::CMOD_OPT | ELEMENT_TYPE::CMOD_REQD => {
                        self.parser.advance_by(1)?;
                        self.parser.read_compressed_token()?;
                    }
                    ELEMENT_TYPE::PINNED => {
                        self.parser.advance_by(1)?;
                        is_pinned = true;
                    }
                    ELEMENT_TYPE::BYREF => {
                        self.parser.advance_by(1)?;
                        is_byref = true;
                    }
                    _ => break,
                }
            }

            locals.push(SignatureLocalVariable {
                is_byref,
                is_pinned,
                base: self.parse_type()?,
            });
        }

        Ok(SignatureLocalVariables { locals })
    }

    /// Read the `LOCAL_SIG` header byte and the local count
    ///
    /// # Errors
    /// Returns an error if the header is not `LOCAL_SIG`.
    pub fn parse_local_var_header(&mut self) -> Result<u32> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::LOCAL_SIG {
            return Err(malformed_error!(
                "SignatureLocalVar - invalid start - {}",
                head_byte
            ));
        }

        self.parser.read_compressed_uint()
    }
}
