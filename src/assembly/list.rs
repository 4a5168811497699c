//! Arena-backed instruction sequence with stable identities.
//!
//! Every instruction lives in an arena slot addressed by an [`InstrRef`]. The order of the
//! method is a separate sequence of identities, so inserting instructions never changes the
//! identity of an existing one, and a branch that names an [`InstrRef`] keeps pointing at
//! the same instruction wherever it moves.
//!
//! Slots can be allocated without being placed in the order. The fragment builder uses
//! this to create instructions that only become part of the method when they are spliced
//! in; until then any branch to them is dangling and the encoder refuses it.

use std::fmt;

use crate::assembly::Instruction;

/// Stable identity of an instruction inside one [`InstructionList`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrRef(u32);

impl InstrRef {
    /// The arena slot of this identity
    #[must_use]
    pub fn slot(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for InstrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for InstrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An ordered instruction sequence over an arena of instructions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructionList {
    arena: Vec<Instruction>,
    order: Vec<InstrRef>,
}

impl InstructionList {
    /// Create an empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of placed instructions
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// `true` if no instruction is placed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Allocate an arena slot without placing it in the order
    pub fn alloc(&mut self, instruction: Instruction) -> InstrRef {
        // Method bodies are bounded by a u32 code size, so are their instruction counts
        #[allow(clippy::cast_possible_truncation)]
        let slot = self.arena.len() as u32;
        self.arena.push(instruction);
        InstrRef(slot)
    }

    /// Allocate an instruction and append it to the order
    pub fn push(&mut self, instruction: Instruction) -> InstrRef {
        let instr_ref = self.alloc(instruction);
        self.order.push(instr_ref);
        instr_ref
    }

    /// Place already allocated instructions at `index`, shifting the rest back
    ///
    /// # Panics
    /// Panics if `index` is greater than the length of the list.
    pub fn insert(&mut self, index: usize, refs: &[InstrRef]) {
        self.order.splice(index..index, refs.iter().copied());
    }

    /// The instruction behind `instr_ref`
    ///
    /// # Panics
    /// Panics if `instr_ref` was not allocated by this list.
    #[must_use]
    pub fn get(&self, instr_ref: InstrRef) -> &Instruction {
        &self.arena[instr_ref.slot()]
    }

    /// Mutable access to the instruction behind `instr_ref`
    ///
    /// # Panics
    /// Panics if `instr_ref` was not allocated by this list.
    pub fn get_mut(&mut self, instr_ref: InstrRef) -> &mut Instruction {
        &mut self.arena[instr_ref.slot()]
    }

    /// The identity at `index` in the order
    #[must_use]
    pub fn at(&self, index: usize) -> Option<InstrRef> {
        self.order.get(index).copied()
    }

    /// The instruction at `index` in the order
    #[must_use]
    pub fn instruction_at(&self, index: usize) -> Option<&Instruction> {
        self.at(index).map(|instr_ref| self.get(instr_ref))
    }

    /// Index of `instr_ref` in the order, `None` if it is not placed
    #[must_use]
    pub fn position(&self, instr_ref: InstrRef) -> Option<usize> {
        self.order.iter().position(|placed| *placed == instr_ref)
    }

    /// `true` if `instr_ref` is placed in the order
    #[must_use]
    pub fn contains(&self, instr_ref: InstrRef) -> bool {
        self.position(instr_ref).is_some()
    }

    /// The placed identities, in order
    #[must_use]
    pub fn refs(&self) -> &[InstrRef] {
        &self.order
    }

    /// Iterate over the placed instructions, in order
    pub fn iter(&self) -> impl Iterator<Item = (InstrRef, &Instruction)> {
        self.order
            .iter()
            .map(move |instr_ref| (*instr_ref, &self.arena[instr_ref.slot()]))
    }
}
