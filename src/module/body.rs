//! Editable method bodies.
//!
//! A [`CilBody`] is the decoded form of one method body: the instruction list with identity
//! targets, the exception regions expressed as instruction identities, and the local
//! variable table. The locals declared by the original signature are kept opaque (their
//! signature bytes are carried over verbatim on write), new locals are appended after them.

use crate::{
    assembly::{decode_stream, encode_stream, InstrRef, InstructionList},
    metadata::{
        method::{ExceptionHandler, ExceptionHandlerFlags, MethodBody},
        signatures::TypeSignature,
        token::Token,
    },
    Error::{InvalidBranch, SerializationFailed},
    Result,
};

/// A local variable added to a method body
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSlot {
    /// Type of the local
    pub ty: TypeSignature,
    /// Name used in diagnostics, never persisted
    pub name: Option<String>,
}

impl LocalSlot {
    /// A named local of type `ty`
    #[must_use]
    pub fn named(ty: TypeSignature, name: &str) -> LocalSlot {
        LocalSlot {
            ty,
            name: Some(name.to_string()),
        }
    }
}

/// An exception clause whose boundaries are instruction identities.
///
/// An end of `None` means "until the end of the method".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionRegion {
    /// Kind of the clause
    pub kind: ExceptionHandlerFlags,
    /// First instruction of the protected block
    pub try_start: InstrRef,
    /// First instruction after the protected block
    pub try_end: Option<InstrRef>,
    /// First instruction of the handler
    pub handler_start: InstrRef,
    /// First instruction after the handler
    pub handler_end: Option<InstrRef>,
    /// First instruction of the filter, for filter clauses
    pub filter_start: Option<InstrRef>,
    /// Caught exception type, for typed clauses
    pub catch_type: Option<Token>,
}

impl ExceptionRegion {
    /// Replace every boundary equal to `from` with `to`, returning how many were replaced
    pub fn retarget(&mut self, from: InstrRef, to: InstrRef) -> usize {
        let mut count = 0;
        for boundary in [&mut self.try_start, &mut self.handler_start] {
            if *boundary == from {
                *boundary = to;
                count += 1;
            }
        }
        for boundary in [
            &mut self.try_end,
            &mut self.handler_end,
            &mut self.filter_start,
        ] {
            if *boundary == Some(from) {
                *boundary = Some(to);
                count += 1;
            }
        }
        count
    }

    /// `true` if the instruction at `index` lies in the protected block, the filter or the
    /// handler of this clause
    #[must_use]
    pub fn covers(&self, list: &InstructionList, index: usize) -> bool {
        let position = |instr_ref: Option<InstrRef>| match instr_ref {
            Some(instr_ref) => list.position(instr_ref).unwrap_or(list.len()),
            None => list.len(),
        };
        let within = |start: Option<InstrRef>, end: Option<InstrRef>| {
            position(start) <= index && index < position(end)
        };

        within(Some(self.try_start), self.try_end)
            || within(Some(self.handler_start), self.handler_end)
            || (self.filter_start.is_some() && within(self.filter_start, Some(self.handler_start)))
    }
}

/// The editable body of one method.
#[derive(Debug, Clone)]
pub struct CilBody {
    /// The instructions
    pub instructions: InstructionList,
    /// Exception clauses, in their original order
    pub exception_regions: Vec<ExceptionRegion>,
    /// Maximum evaluation stack depth
    pub max_stack: usize,
    /// Locals are zero-initialized on entry
    pub init_locals: bool,
    local_sig_token: u32,
    original_locals: u32,
    added_locals: Vec<LocalSlot>,
}

impl CilBody {
    /// Decode a body from its parsed header and code bytes.
    ///
    /// `original_locals` is the number of locals declared by the signature the header
    /// refers to.
    ///
    /// # Errors
    /// Returns an error if the code cannot be decoded or an exception clause does not start
    /// and end on instruction boundaries.
    pub fn decode(header: &MethodBody, code: &[u8], original_locals: u32) -> Result<CilBody> {
        let decoded = decode_stream(code)?;

        let required = |offset: u32| -> Result<InstrRef> {
            decoded.ref_at(offset)?.ok_or_else(|| {
                malformed_error!("Exception clause starts at the end of the method - {}", offset)
            })
        };
        let end = |offset: u32, length: u32| -> Result<Option<InstrRef>> {
            let Some(end) = offset.checked_add(length) else {
                return Err(malformed_error!(
                    "Exception clause overflows - {} + {}",
                    offset,
                    length
                ));
            };
            decoded.ref_at(end)
        };

        let mut exception_regions = Vec::with_capacity(header.exception_handlers.len());
        for handler in &header.exception_handlers {
            let is_filter = handler.flags.contains(ExceptionHandlerFlags::FILTER);
            exception_regions.push(ExceptionRegion {
                kind: handler.flags,
                try_start: required(handler.try_offset)?,
                try_end: end(handler.try_offset, handler.try_length)?,
                handler_start: required(handler.handler_offset)?,
                handler_end: end(handler.handler_offset, handler.handler_length)?,
                filter_start: if is_filter {
                    Some(required(handler.class_token_or_filter)?)
                } else {
                    None
                },
                catch_type: if handler.flags.is_empty() && handler.class_token_or_filter != 0 {
                    Some(Token::new(handler.class_token_or_filter))
                } else {
                    None
                },
            });
        }

        Ok(CilBody {
            instructions: decoded.instructions,
            exception_regions,
            max_stack: header.max_stack,
            init_locals: header.is_init_local,
            local_sig_token: header.local_var_sig_token,
            original_locals,
            added_locals: Vec::new(),
        })
    }

    /// `StandAloneSig` token of the original local signature, 0 if there was none
    #[must_use]
    pub fn local_sig_token(&self) -> u32 {
        self.local_sig_token
    }

    /// Number of locals, original and added
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn local_count(&self) -> u32 {
        self.original_locals + self.added_locals.len() as u32
    }

    /// Locals added since the body was decoded
    #[must_use]
    pub fn added_locals(&self) -> &[LocalSlot] {
        &self.added_locals
    }

    /// Append a local and return its index
    ///
    /// # Errors
    /// Returns [`crate::Error::SerializationFailed`] if the local table is full.
    pub fn add_local(&mut self, slot: LocalSlot) -> Result<u16> {
        let index = u16::try_from(self.local_count())
            .ok()
            .filter(|index| *index < u16::MAX)
            .ok_or_else(|| SerializationFailed("local variable table is full".to_string()))?;

        self.added_locals.push(slot);
        Ok(index)
    }

    /// `true` if the instruction at `index` lies inside any exception clause
    #[must_use]
    pub fn is_protected(&self, index: usize) -> bool {
        self.exception_regions
            .iter()
            .any(|region| region.covers(&self.instructions, index))
    }

    /// Encode the body with `local_sig_token` as its local signature.
    ///
    /// Returns the complete body (header, code, exception sections) and the number of
    /// branches that had to be relaxed.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidBranch`] if a branch or exception boundary refers to
    /// an instruction outside the list, or an error if a header field overflows.
    pub fn encode(&self, local_sig_token: u32) -> Result<(Vec<u8>, usize)> {
        let encoded = encode_stream(&self.instructions)?;

        let mut exception_handlers = Vec::with_capacity(self.exception_regions.len());
        for region in &self.exception_regions {
            let try_offset = encoded.offset_of(Some(region.try_start))?;
            let handler_offset = encoded.offset_of(Some(region.handler_start))?;
            let length = |start: u32, end: Option<InstrRef>| -> Result<u32> {
                encoded
                    .offset_of(end)?
                    .checked_sub(start)
                    .ok_or_else(|| InvalidBranch("exception clause ends before it starts".into()))
            };

            exception_handlers.push(ExceptionHandler {
                flags: region.kind,
                try_offset,
                try_length: length(try_offset, region.try_end)?,
                handler_offset,
                handler_length: length(handler_offset, region.handler_end)?,
                class_token_or_filter: match region.filter_start {
                    Some(filter) => encoded.offset_of(Some(filter))?,
                    None => region.catch_type.map_or(0, |token| token.value()),
                },
            });
        }

        let header = MethodBody {
            size_code: encoded.code.len(),
            size_header: 0,
            local_var_sig_token: local_sig_token,
            max_stack: self.max_stack,
            is_fat: false,
            is_init_local: self.init_locals,
            is_exception_data: !exception_handlers.is_empty(),
            exception_handlers,
        };

        Ok((header.encode(&encoded.code)?, encoded.relaxed))
    }
}
