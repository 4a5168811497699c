//! Structural pattern matching over instruction lists.
//!
//! A [`Pattern`] is a fixed-length window of [`Predicate`]s. Scanning slides the window over
//! the placed instructions and reports the first position where every predicate holds.
//! Scanning never mutates the list, so scanning the same list twice yields the same index.
//!
//! Several candidates for the same construct are grouped in a [`PatternSet`]. The set is
//! tried in order through an explicit [`MatchState`] machine; the first pattern that
//! matches wins and running out of candidates is [`crate::Error::PatternNotFound`].
//!
//! # Examples
//!
//! ```rust
//! use autofish::assembly::{opcodes, Instruction, InstructionList, Operand};
//! use autofish::patch::pattern::{Pattern, PatternSet, Predicate};
//!
//! let mut list = InstructionList::new();
//! list.push(Instruction::simple(opcodes::LDARG_0));
//! list.push(Instruction::new(opcodes::LDC_R4, Operand::F32(0.0)));
//! list.push(Instruction::simple(opcodes::RET));
//!
//! let set = PatternSet::new(vec![Pattern::new(
//!     "zero",
//!     vec![Predicate::op(opcodes::LDC_R4).with_f32(0.0), Predicate::op(opcodes::RET)],
//! )]);
//! let found = set.find(&list, "Sample::Method")?;
//! assert_eq!(found.index, 1);
//! # Ok::<(), autofish::Error>(())
//! ```

use std::fmt;

use crate::{
    assembly::{Instruction, InstructionList, OpCode, Operand},
    metadata::token::Token,
    Error::PatternNotFound,
    Result,
};

/// How the opcode of an instruction is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeMatch {
    /// The opcode must be exactly this one
    Exact(OpCode),
    /// The short or the long form of this branch
    Family(OpCode),
}

/// How the operand of an instruction is compared
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperandMatch {
    /// Any operand
    Any,
    /// A token operand naming this metadata row
    Token(Token),
    /// A 32-bit float literal
    F32(f32),
    /// A 32-bit integer constant in any of its `ldc.i4` encodings
    I4(i32),
}

/// A test applied to one instruction of a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Predicate {
    opcode: Option<OpcodeMatch>,
    operand: OperandMatch,
}

impl Predicate {
    /// Match exactly `opcode`
    #[must_use]
    pub fn op(opcode: OpCode) -> Self {
        Predicate {
            opcode: Some(OpcodeMatch::Exact(opcode)),
            operand: OperandMatch::Any,
        }
    }

    /// Match the branch `opcode` in its short or long form
    #[must_use]
    pub fn branch(opcode: OpCode) -> Self {
        Predicate {
            opcode: Some(OpcodeMatch::Family(opcode)),
            operand: OperandMatch::Any,
        }
    }

    /// Match any instruction that pushes the 32-bit constant `value`
    #[must_use]
    pub fn i4(value: i32) -> Self {
        Predicate {
            opcode: None,
            operand: OperandMatch::I4(value),
        }
    }

    /// Additionally require the token operand `token`
    #[must_use]
    pub fn with_token(mut self, token: Token) -> Self {
        self.operand = OperandMatch::Token(token);
        self
    }

    /// Additionally require the float operand `value`
    #[must_use]
    pub fn with_f32(mut self, value: f32) -> Self {
        self.operand = OperandMatch::F32(value);
        self
    }

    /// `true` if `instruction` satisfies this predicate
    #[must_use]
    pub fn matches(&self, instruction: &Instruction) -> bool {
        let opcode = match self.opcode {
            Some(OpcodeMatch::Exact(opcode)) => instruction.opcode == opcode,
            Some(OpcodeMatch::Family(opcode)) => instruction.opcode.same_family(opcode),
            None => true,
        };

        #[allow(clippy::float_cmp)]
        let operand = match self.operand {
            OperandMatch::Any => true,
            OperandMatch::Token(token) => instruction.token() == Some(token),
            OperandMatch::F32(value) => {
                matches!(instruction.operand, Operand::F32(actual) if actual == value)
            }
            OperandMatch::I4(value) => instruction.i4_constant() == Some(value),
        };

        opcode && operand
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode {
            Some(OpcodeMatch::Exact(opcode)) => write!(f, "{opcode}")?,
            Some(OpcodeMatch::Family(opcode)) => write!(f, "{}(.s)", opcode.long_form())?,
            None => write!(f, "ldc.i4*")?,
        }
        match self.operand {
            OperandMatch::Any => Ok(()),
            OperandMatch::Token(token) => write!(f, " {token}"),
            OperandMatch::F32(value) => write!(f, " {value}"),
            OperandMatch::I4(value) => write!(f, " {value}"),
        }
    }
}

/// A named window of predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    name: String,
    window: Vec<Predicate>,
    target: usize,
}

impl Pattern {
    /// A pattern that reports the index of its first instruction
    #[must_use]
    pub fn new(name: &str, window: Vec<Predicate>) -> Self {
        Pattern {
            name: name.to_string(),
            window,
            target: 0,
        }
    }

    /// Report `offset` instructions past the start of the window instead of its start.
    ///
    /// The offset may equal the window length, which names the instruction right after
    /// the matched construct.
    #[must_use]
    pub fn target(mut self, offset: usize) -> Self {
        self.target = offset;
        self
    }

    /// Name used in diagnostics
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of instructions in the window
    #[must_use]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// `true` for a window without predicates, which never matches
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Index of the first window start where every predicate holds
    #[must_use]
    pub fn scan_window(&self, list: &InstructionList) -> Option<usize> {
        if self.window.is_empty() || self.window.len() > list.len() {
            return None;
        }

        (0..=list.len() - self.window.len()).find(|start| {
            self.window.iter().enumerate().all(|(offset, predicate)| {
                list.instruction_at(start + offset)
                    .is_some_and(|instruction| predicate.matches(instruction))
            })
        })
    }

    /// The reported index of the first match, see [`Pattern::target`].
    ///
    /// A match whose target would lie past the end of the list is no match.
    #[must_use]
    pub fn scan(&self, list: &InstructionList) -> Option<usize> {
        self.scan_window(list)
            .map(|start| start + self.target)
            .filter(|index| *index < list.len())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.name)?;
        for (position, predicate) in self.window.iter().enumerate() {
            if position > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{predicate}")?;
        }
        write!(f, "] +{}", self.target)
    }
}

/// Where a [`PatternSet`] found its construct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Name of the pattern that matched
    pub pattern: String,
    /// Position of the pattern in its set
    pub candidate: usize,
    /// The reported index
    pub index: usize,
}

/// Progress of a [`PatternSet`] scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchState {
    /// Nothing was scanned yet
    Unattempted,
    /// The candidate at this position is scanned next
    Trying(usize),
    /// A candidate matched
    Matched(Match),
    /// Every candidate was scanned without a match
    Exhausted,
}

impl MatchState {
    /// `true` once no further step changes the state
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self, MatchState::Matched(_) | MatchState::Exhausted)
    }
}

/// Candidate patterns for one construct, most specific first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatternSet {
    candidates: Vec<Pattern>,
}

impl PatternSet {
    /// A set trying `candidates` in order
    #[must_use]
    pub fn new(candidates: Vec<Pattern>) -> Self {
        PatternSet { candidates }
    }

    /// The candidates, in the order they are tried
    #[must_use]
    pub fn candidates(&self) -> &[Pattern] {
        &self.candidates
    }

    /// Advance `state` by one scan of `list`
    #[must_use]
    pub fn step(&self, state: MatchState, list: &InstructionList) -> MatchState {
        match state {
            MatchState::Unattempted => MatchState::Trying(0),
            MatchState::Trying(candidate) => match self.candidates.get(candidate) {
                None => MatchState::Exhausted,
                Some(pattern) => match pattern.scan(list) {
                    Some(index) => MatchState::Matched(Match {
                        pattern: pattern.name.clone(),
                        candidate,
                        index,
                    }),
                    None => {
                        log::debug!("pattern '{}' did not match", pattern.name);
                        MatchState::Trying(candidate + 1)
                    }
                },
            },
            done => done,
        }
    }

    /// Run the candidates against `list` until one matches.
    ///
    /// `method` names the scanned method in the error.
    ///
    /// # Errors
    /// Returns [`crate::Error::PatternNotFound`] naming every candidate if none matches.
    pub fn find(&self, list: &InstructionList, method: &str) -> Result<Match> {
        let mut state = MatchState::Unattempted;
        while !state.is_final() {
            state = self.step(state, list);
        }

        match state {
            MatchState::Matched(found) => Ok(found),
            _ => Err(PatternNotFound {
                method: method.to_string(),
                tried: self.candidates.iter().map(ToString::to_string).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::opcodes,
        metadata::tables::TableId,
        test::instructions::{nibble_check, padded},
    };

    fn ai() -> Token {
        Token::from_parts(TableId::Field, 7)
    }

    fn nibble() -> Pattern {
        Pattern::new(
            "nibble",
            vec![
                Predicate::op(opcodes::LDARG_0),
                Predicate::op(opcodes::LDFLD).with_token(ai()),
                Predicate::op(opcodes::LDC_I4_1),
                Predicate::op(opcodes::LDELEM_R4),
                Predicate::op(opcodes::LDC_R4).with_f32(0.0),
                Predicate::branch(opcodes::BGE_UN),
            ],
        )
    }

    #[test]
    fn finds_window_at_its_position() {
        let list = padded(12, &nibble_check(ai(), opcodes::BGE_UN_S), 4);
        assert_eq!(nibble().scan_window(&list), Some(12));
        assert_eq!(nibble().target(6).scan(&list), Some(18));
    }

    #[test]
    fn rescanning_is_stable() {
        let list = padded(3, &nibble_check(ai(), opcodes::BGE_UN), 2);
        let pattern = nibble();
        let first = pattern.scan(&list);
        assert_eq!(first, Some(3));
        assert_eq!(pattern.scan(&list), first);
    }

    #[test]
    fn first_of_two_occurrences_wins() {
        let mut window = nibble_check(ai(), opcodes::BGE_UN_S);
        window.push(Instruction::simple(opcodes::NOP));
        window.extend(nibble_check(ai(), opcodes::BGE_UN));
        let list = padded(2, &window, 1);

        assert_eq!(nibble().scan(&list), Some(2));
    }

    #[test]
    fn operands_are_compared() {
        let other = Token::from_parts(TableId::Field, 8);
        let list = padded(0, &nibble_check(other, opcodes::BGE_UN_S), 1);
        assert_eq!(nibble().scan(&list), None);

        let mut check = nibble_check(ai(), opcodes::BGE_UN_S);
        check[4] = Instruction::new(opcodes::LDC_R4, Operand::F32(1.0));
        assert_eq!(nibble().scan(&padded(0, &check, 0)), None);

        let mut check = nibble_check(ai(), opcodes::BGE_UN_S);
        check[5] = Instruction::new(opcodes::BGE_S, Operand::None);
        assert_eq!(nibble().scan(&padded(0, &check, 0)), None);
    }

    #[test]
    fn constants_in_any_encoding() {
        let predicate = Predicate::i4(1000);
        assert!(predicate.matches(&Instruction::new(opcodes::LDC_I4, Operand::I32(1000))));
        assert!(!predicate.matches(&Instruction::new(opcodes::LDC_I4, Operand::I32(999))));
        assert!(Predicate::i4(1).matches(&Instruction::simple(opcodes::LDC_I4_1)));
        assert!(Predicate::i4(1).matches(&Instruction::new(opcodes::LDC_I4_S, Operand::I32(1))));
    }

    #[test]
    fn window_at_the_very_end() {
        let list = padded(5, &nibble_check(ai(), opcodes::BGE_UN_S), 0);
        assert_eq!(nibble().scan_window(&list), Some(5));
        assert_eq!(nibble().target(6).scan(&list), None);
        assert_eq!(nibble().target(5).scan(&list), Some(10));
    }

    #[test]
    fn short_lists_never_match() {
        let list = padded(3, &[], 0);
        assert_eq!(nibble().scan(&list), None);
        assert_eq!(Pattern::new("empty", Vec::new()).scan(&list), None);
    }

    #[test]
    fn candidates_in_order() {
        let list = padded(4, &nibble_check(ai(), opcodes::BGE_UN_S), 0);
        let missing = Pattern::new("missing", vec![Predicate::op(opcodes::RET)]);
        let set = PatternSet::new(vec![missing, nibble().target(1)]);

        let mut state = MatchState::Unattempted;
        state = set.step(state, &list);
        assert_eq!(state, MatchState::Trying(0));
        state = set.step(state, &list);
        assert_eq!(state, MatchState::Trying(1));
        state = set.step(state, &list);
        assert!(state.is_final());

        let found = set.find(&list, "Terraria.Projectile::AI_061_FishingBobber").unwrap();
        assert_eq!(found.pattern, "nibble");
        assert_eq!(found.candidate, 1);
        assert_eq!(found.index, 5);
    }

    #[test]
    fn exhaustion_names_every_candidate() {
        let list = padded(4, &[], 0);
        let set = PatternSet::new(vec![
            nibble(),
            Pattern::new("fallback", vec![Predicate::op(opcodes::RET)]),
        ]);

        match set.find(&list, "Terraria.Player::ItemCheck") {
            Err(PatternNotFound { method, tried }) => {
                assert_eq!(method, "Terraria.Player::ItemCheck");
                assert_eq!(tried.len(), 2);
                assert!(tried[0].starts_with("nibble ["));
                assert!(tried[1].starts_with("fallback ["));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
