//! Method body headers and exception sections, ECMA-335 II.25.4.
//!
//! [`MethodBody`] describes the header of a body stored at a `MethodDef` RVA: header format,
//! code size, evaluation stack depth, local variable signature and exception clauses. The
//! same struct is used in reverse by [`MethodBody::encode`] when a rewritten body is placed
//! in the patch section.
//!
//! # References
//! - ECMA-335 6th Edition, Partition II, Section 25.4 - Method Header Format

use crate::{
    file::{
        io::{pad_to, push_le, read_le},
        parser::Parser,
    },
    metadata::method::{ExceptionHandler, ExceptionHandlerFlags, MethodBodyFlags, SectionFlags},
    Error::{OutOfBounds, SerializationFailed},
    Result,
};

/// Maximum code size that a tiny header can describe
const TINY_MAX_CODE: usize = 64;
/// Evaluation stack depth implied by a tiny header
const TINY_MAX_STACK: usize = 8;
/// Size of a fat header in bytes
const FAT_HEADER_SIZE: usize = 12;
/// Size of one small exception clause
const SMALL_CLAUSE_SIZE: usize = 12;
/// Size of one fat exception clause
const FAT_CLAUSE_SIZE: usize = 24;

/// The header of one method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    /// Size of the method (length of all instructions, not counting the header) in bytes
    pub size_code: usize,
    /// Size of the method header in bytes
    pub size_header: usize,
    /// `StandAloneSig` token of the local variables signature, 0 when there are no locals
    pub local_var_sig_token: u32,
    /// Maximum number of items on the operand stack
    pub max_stack: usize,
    /// Flag, indicating the type of the method header
    pub is_fat: bool,
    /// Flag, indicating to call default constructor on all local variables
    pub is_init_local: bool,
    /// Flag, indicating if this method does have exception handlers
    pub is_exception_data: bool,
    /// A list of exception handlers this method has
    pub exception_handlers: Vec<ExceptionHandler>,
}

impl MethodBody {
    /// Parse a method body header from the bytes at its RVA.
    ///
    /// # Errors
    /// Returns an error if the data is empty, out of bounds, or malformed.
    pub fn from(data: &[u8]) -> Result<MethodBody> {
        if data.is_empty() {
            return Err(malformed_error!("Provided data for body parsing is empty"));
        }

        let first_byte = read_le::<u8>(data)?;
        match MethodBodyFlags::from_bits_truncate(u16::from(first_byte & 0b_0000_0011_u8)) {
            MethodBodyFlags::TINY_FORMAT => {
                let size_code = (first_byte >> 2) as usize;
                if size_code + 1 > data.len() {
                    return Err(OutOfBounds);
                }

                Ok(MethodBody {
                    size_code,
                    size_header: 1,
                    local_var_sig_token: 0,
                    max_stack: TINY_MAX_STACK,
                    is_fat: false,
                    is_init_local: false,
                    is_exception_data: false,
                    exception_handlers: Vec::new(),
                })
            }
            MethodBodyFlags::FAT_FORMAT => {
                if data.len() < FAT_HEADER_SIZE {
                    return Err(OutOfBounds);
                }

                let first_duo = read_le::<u16>(data)?;
                let size_header = usize::from(first_duo >> 12) * 4;
                if size_header < FAT_HEADER_SIZE {
                    return Err(malformed_error!(
                        "Fat method header declares {} bytes",
                        size_header
                    ));
                }

                let size_code = read_le::<u32>(&data[4..])? as usize;
                if data.len() < size_code + size_header {
                    return Err(OutOfBounds);
                }

                let local_var_sig_token = read_le::<u32>(&data[8..])?;
                let flags_header =
                    MethodBodyFlags::from_bits_truncate(first_duo & 0b_0000_1111_1111_1111_u16);
                let max_stack = read_le::<u16>(&data[2..])? as usize;

                let exception_handlers = if flags_header.contains(MethodBodyFlags::MORE_SECTS) {
                    read_sections(data, size_header + size_code)?
                } else {
                    Vec::new()
                };

                Ok(MethodBody {
                    size_code,
                    size_header,
                    local_var_sig_token,
                    max_stack,
                    is_fat: true,
                    is_init_local: flags_header.contains(MethodBodyFlags::INIT_LOCALS),
                    is_exception_data: !exception_handlers.is_empty(),
                    exception_handlers,
                })
            }
            _ => Err(malformed_error!(
                "Invalid method header format - 0x{:02X}",
                first_byte
            )),
        }
    }

    /// The instruction bytes of this body, given the data it was parsed from
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than the header describes.
    pub fn code<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        data.get(self.size_header..self.size_header + self.size_code)
            .ok_or(OutOfBounds)
    }

    /// Encode a complete body: header, `code` and exception sections.
    ///
    /// A tiny header is emitted when the code is shorter than 64 bytes, the stack depth is at
    /// most 8 and there are neither locals nor exception clauses. Everything else gets a fat
    /// header. The exception section uses the small layout when every clause fits it.
    ///
    /// The result starts at a 4-byte aligned position when it is placed in the image.
    ///
    /// # Errors
    /// Returns [`crate::Error::SerializationFailed`] if a value exceeds its field.
    pub fn encode(&self, code: &[u8]) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(FAT_HEADER_SIZE + code.len());

        let tiny = code.len() < TINY_MAX_CODE
            && self.max_stack <= TINY_MAX_STACK
            && self.local_var_sig_token == 0
            && !self.is_init_local
            && self.exception_handlers.is_empty();

        if tiny {
            #[allow(clippy::cast_possible_truncation)]
            buffer.push(((code.len() as u8) << 2) | MethodBodyFlags::TINY_FORMAT.bits() as u8);
            buffer.extend_from_slice(code);
            return Ok(buffer);
        }

        let mut flags = MethodBodyFlags::FAT_FORMAT;
        if self.is_init_local {
            flags |= MethodBodyFlags::INIT_LOCALS;
        }
        if !self.exception_handlers.is_empty() {
            flags |= MethodBodyFlags::MORE_SECTS;
        }

        let max_stack = u16::try_from(self.max_stack).map_err(|_| {
            SerializationFailed(format!("max stack {} exceeds 65535", self.max_stack))
        })?;
        let code_size = u32::try_from(code.len())
            .map_err(|_| SerializationFailed(format!("code size {} too large", code.len())))?;

        #[allow(clippy::cast_possible_truncation)]
        push_le(&mut buffer, flags.bits() | ((FAT_HEADER_SIZE as u16 / 4) << 12));
        push_le(&mut buffer, max_stack);
        push_le(&mut buffer, code_size);
        push_le(&mut buffer, self.local_var_sig_token);
        buffer.extend_from_slice(code);

        if !self.exception_handlers.is_empty() {
            pad_to(&mut buffer, 4);
            write_section(&mut buffer, &self.exception_handlers)?;
        }

        Ok(buffer)
    }
}

/// Read the chain of extra data sections that starts at the first 4-byte boundary
/// after `code_end`
fn read_sections(data: &[u8], code_end: usize) -> Result<Vec<ExceptionHandler>> {
    let mut handlers = Vec::new();
    let mut cursor = (code_end + 3) & !3;

    loop {
        if cursor + 4 > data.len() {
            return Err(OutOfBounds);
        }

        let section_flags = SectionFlags::from_bits_truncate(data[cursor]);
        let is_fat = section_flags.contains(SectionFlags::FAT_FORMAT);
        let section_size = if is_fat {
            (read_le::<u32>(&data[cursor..])? >> 8) as usize
        } else {
            usize::from(data[cursor + 1])
        };

        if section_size < 4 || cursor + section_size > data.len() {
            return Err(malformed_error!(
                "Method data section of {} bytes at 0x{:X} is invalid",
                section_size,
                cursor
            ));
        }

        if section_flags.contains(SectionFlags::EHTABLE) {
            let mut parser = Parser::new(&data[cursor + 4..cursor + section_size]);
            if is_fat {
                for _ in 0..(section_size - 4) / FAT_CLAUSE_SIZE {
                    #[allow(clippy::cast_possible_truncation)]
                    let flags = parser.read_le::<u32>()? as u16;
                    handlers.push(ExceptionHandler {
                        flags: ExceptionHandlerFlags::from_bits_truncate(flags),
                        try_offset: parser.read_le::<u32>()?,
                        try_length: parser.read_le::<u32>()?,
                        handler_offset: parser.read_le::<u32>()?,
                        handler_length: parser.read_le::<u32>()?,
                        class_token_or_filter: parser.read_le::<u32>()?,
                    });
                }
            } else {
                for _ in 0..(section_size - 4) / SMALL_CLAUSE_SIZE {
                    handlers.push(ExceptionHandler {
                        flags: ExceptionHandlerFlags::from_bits_truncate(
                            parser.read_le::<u16>()?,
                        ),
                        try_offset: u32::from(parser.read_le::<u16>()?),
                        try_length: u32::from(parser.read_le::<u8>()?),
                        handler_offset: u32::from(parser.read_le::<u16>()?),
                        handler_length: u32::from(parser.read_le::<u8>()?),
                        class_token_or_filter: parser.read_le::<u32>()?,
                    });
                }
            }
        }

        if !section_flags.contains(SectionFlags::MORE_SECTS) {
            break;
        }
        cursor = (cursor + section_size + 3) & !3;
    }

    Ok(handlers)
}

/// Append one exception section holding all `handlers`
fn write_section(buffer: &mut Vec<u8>, handlers: &[ExceptionHandler]) -> Result<()> {
    let small_size = 4 + handlers.len() * SMALL_CLAUSE_SIZE;
    let use_small = small_size <= 0xFF && handlers.iter().all(ExceptionHandler::fits_small);

    if use_small {
        buffer.push(SectionFlags::EHTABLE.bits());
        #[allow(clippy::cast_possible_truncation)]
        buffer.push(small_size as u8);
        push_le(buffer, 0_u16);

        for handler in handlers {
            #[allow(clippy::cast_possible_truncation)]
            {
                push_le(buffer, handler.flags.bits());
                push_le(buffer, handler.try_offset as u16);
                push_le(buffer, handler.try_length as u8);
                push_le(buffer, handler.handler_offset as u16);
                push_le(buffer, handler.handler_length as u8);
            }
            push_le(buffer, handler.class_token_or_filter);
        }
        return Ok(());
    }

    let fat_size = 4 + handlers.len() * FAT_CLAUSE_SIZE;
    if fat_size > 0x00FF_FFFF {
        return Err(SerializationFailed(format!(
            "{} exception clauses do not fit one section",
            handlers.len()
        )));
    }

    #[allow(clippy::cast_possible_truncation)]
    push_le(
        buffer,
        u32::from((SectionFlags::EHTABLE | SectionFlags::FAT_FORMAT).bits()) | ((fat_size as u32) << 8),
    );
    for handler in handlers {
        push_le(buffer, u32::from(handler.flags.bits()));
        push_le(buffer, handler.try_offset);
        push_le(buffer, handler.try_length);
        push_le(buffer, handler.handler_offset);
        push_le(buffer, handler.handler_length);
        push_le(buffer, handler.class_token_or_filter);
    }

    Ok(())
}
