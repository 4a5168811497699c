//! Insertion of fragments into method bodies.
//!
//! Splicing places a [`Fragment`] in front of the instruction at an index and makes the
//! fragment the new entry to that spot: every branch, switch entry and exception clause
//! boundary that named the displaced instruction now names the first instruction of the
//! fragment. Jumps made by the fragment itself are left alone, they are its way out to the
//! continuation.

use std::collections::HashSet;

use crate::{
    assembly::{FlowType, InstrRef},
    module::CilBody,
    patch::fragment::Fragment,
    Error::{InvalidBranch, InvalidInstruction, SerializationFailed},
    Result,
};

/// What a splice changed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpliceReport {
    /// Index the fragment was inserted at
    pub index: usize,
    /// Number of inserted instructions
    pub inserted: usize,
    /// Positions, after the splice, of the instructions whose jumps were redirected
    pub retargeted: Vec<usize>,
    /// Exception clause boundaries that were moved to the fragment
    pub regions: usize,
    /// Locals added to the method
    pub locals: usize,
}

/// Insert `fragment` in front of the instruction at `index` of `body`.
///
/// # Errors
/// Returns [`crate::Error::InvalidBranch`] if the instruction at `index` is not the
/// continuation of the fragment or the fragment is empty,
/// [`crate::Error::InvalidInstruction`] if the fragment returns from inside an exception
/// clause, and [`crate::Error::SerializationFailed`] if the locals of the method changed
/// since the fragment was built.
pub fn splice(body: &mut CilBody, index: usize, fragment: Fragment) -> Result<SpliceReport> {
    let anchor = body.instructions.at(index).ok_or_else(|| {
        InvalidBranch(format!(
            "splice index {} is past the end of the method ({} instructions)",
            index,
            body.instructions.len()
        ))
    })?;
    if anchor != fragment.continuation {
        return Err(InvalidBranch(format!(
            "fragment continues at {}, but {} is at index {}",
            fragment.continuation, anchor, index
        )));
    }
    let Some(entry) = fragment.entry() else {
        return Err(InvalidBranch("cannot splice an empty fragment".to_string()));
    };

    if body.is_protected(index)
        && fragment.instructions.iter().any(|instr_ref| {
            body.instructions.get(*instr_ref).opcode.flow() == FlowType::Return
        })
    {
        return Err(InvalidInstruction(format!(
            "fragment returns from inside an exception clause at index {index}"
        )));
    }
    if body.local_count() != fragment.first_local {
        return Err(SerializationFailed(format!(
            "fragment numbers its locals from {}, the method has {} now",
            fragment.first_local,
            body.local_count()
        )));
    }

    let members: HashSet<InstrRef> = fragment.instructions.iter().copied().collect();
    let placed: Vec<InstrRef> = body.instructions.refs().to_vec();
    let mut retargeted = Vec::new();
    for (position, instr_ref) in placed.into_iter().enumerate() {
        if members.contains(&instr_ref) {
            continue;
        }
        if body.instructions.get_mut(instr_ref).retarget(anchor, entry) > 0 {
            retargeted.push(if position < index {
                position
            } else {
                position + fragment.len()
            });
        }
    }

    let regions = body
        .exception_regions
        .iter_mut()
        .map(|region| region.retarget(anchor, entry))
        .sum();

    for slot in &fragment.locals {
        body.add_local(slot.clone())?;
    }

    body.instructions.insert(index, &fragment.instructions);
    body.max_stack = body
        .max_stack
        .saturating_add(usize::from(fragment.max_stack));

    Ok(SpliceReport {
        index,
        inserted: fragment.len(),
        retargeted,
        regions,
        locals: fragment.locals.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{opcodes, Instruction, Operand},
        metadata::{method::ExceptionHandlerFlags, signatures::TypeSignature},
        module::ExceptionRegion,
        patch::fragment::FragmentBuilder,
        test::instructions::body_of,
    };

    fn nops(builder: &mut FragmentBuilder<'_>, count: usize) {
        for _ in 0..count {
            builder.op(opcodes::NOP).unwrap();
        }
    }

    #[test]
    fn branches_follow_the_fragment() {
        let mut body = body_of(20);
        let anchor = body.instructions.at(12).unwrap();
        let before = body.instructions.at(3).unwrap();
        let after = body.instructions.at(15).unwrap();
        let elsewhere = body.instructions.at(19).unwrap();
        *body.instructions.get_mut(before) = Instruction::new(opcodes::BR_S, Operand::Target(anchor));
        *body.instructions.get_mut(after) = Instruction::new(opcodes::BRTRUE, Operand::Target(anchor));
        let switch = body.instructions.at(5).unwrap();
        *body.instructions.get_mut(switch) =
            Instruction::new(opcodes::SWITCH, Operand::Switch(vec![elsewhere, anchor, anchor]));

        let mut builder = FragmentBuilder::new(&mut body, anchor);
        nops(&mut builder, 5);
        let fragment = builder.finish().unwrap();
        let entry = fragment.entry().unwrap();

        let report = splice(&mut body, 12, fragment).unwrap();
        assert_eq!(report.index, 12);
        assert_eq!(report.inserted, 5);
        assert_eq!(report.retargeted, vec![3, 5, 20]);

        assert_eq!(body.instructions.len(), 25);
        assert_eq!(body.instructions.position(anchor), Some(17));
        assert_eq!(body.instructions.at(12), Some(entry));
        assert_eq!(body.instructions.get(before).targets(), vec![entry]);
        assert_eq!(body.instructions.get(after).targets(), vec![entry]);
        assert_eq!(
            body.instructions.get(switch).targets(),
            vec![elsewhere, entry, entry]
        );
    }

    #[test]
    fn fragment_jumps_keep_the_continuation() {
        let mut body = body_of(4);
        let anchor = body.instructions.at(2).unwrap();

        let mut builder = FragmentBuilder::new(&mut body, anchor);
        builder.ldc_i4(0).unwrap();
        let exit = builder.branch(opcodes::BRFALSE, builder.continuation()).unwrap();
        builder.op(opcodes::NOP).unwrap();
        let fragment = builder.finish().unwrap();

        splice(&mut body, 2, fragment).unwrap();
        assert_eq!(body.instructions.get(exit).targets(), vec![anchor]);
        assert_eq!(body.instructions.position(anchor), Some(5));
    }

    #[test]
    fn exception_boundaries_move_with_the_anchor() {
        let mut body = body_of(10);
        let at = |body: &CilBody, index| body.instructions.at(index).unwrap();
        let region = ExceptionRegion {
            kind: ExceptionHandlerFlags::FINALLY,
            try_start: at(&body, 1),
            try_end: Some(at(&body, 4)),
            handler_start: at(&body, 4),
            handler_end: Some(at(&body, 6)),
            filter_start: None,
            catch_type: None,
        };
        body.exception_regions.push(region);
        let anchor = at(&body, 4);

        let mut builder = FragmentBuilder::new(&mut body, anchor);
        nops(&mut builder, 2);
        let fragment = builder.finish().unwrap();
        let entry = fragment.entry().unwrap();

        let report = splice(&mut body, 4, fragment).unwrap();
        assert_eq!(report.regions, 2);
        let region = &body.exception_regions[0];
        assert_eq!(region.try_end, Some(entry));
        assert_eq!(region.handler_start, entry);
        assert_eq!(region.handler_end, Some(at(&body, 8)));
    }

    #[test]
    fn returning_inside_a_clause_is_refused() {
        let mut body = body_of(6);
        let at = |body: &CilBody, index| body.instructions.at(index).unwrap();
        let region = ExceptionRegion {
            kind: ExceptionHandlerFlags::FINALLY,
            try_start: at(&body, 0),
            try_end: Some(at(&body, 3)),
            handler_start: at(&body, 3),
            handler_end: Some(at(&body, 5)),
            filter_start: None,
            catch_type: None,
        };
        body.exception_regions.push(region);
        let anchor = at(&body, 2);

        let mut builder = FragmentBuilder::new(&mut body, anchor);
        builder.ret().unwrap();
        let fragment = builder.finish().unwrap();

        assert!(matches!(
            splice(&mut body, 2, fragment),
            Err(InvalidInstruction(_))
        ));
        assert_eq!(body.instructions.len(), 6);
    }

    #[test]
    fn wrong_anchor_is_refused() {
        let mut body = body_of(4);
        let anchor = body.instructions.at(1).unwrap();
        let mut builder = FragmentBuilder::new(&mut body, anchor);
        nops(&mut builder, 1);
        let fragment = builder.finish().unwrap();

        assert!(matches!(
            splice(&mut body, 2, fragment.clone()),
            Err(InvalidBranch(_))
        ));
        assert!(matches!(
            splice(&mut body, 9, fragment),
            Err(InvalidBranch(_))
        ));
    }

    #[test]
    fn locals_and_stack_are_committed() {
        let mut body = body_of(3);
        body.max_stack = 4;
        let anchor = body.instructions.at(0).unwrap();

        let mut builder = FragmentBuilder::new(&mut body, anchor);
        let local = builder.local(TypeSignature::I4, "flag").unwrap();
        builder.ldc_i4(1).unwrap();
        builder.ldc_i4(2).unwrap();
        builder.op(opcodes::ADD).unwrap();
        builder.stloc(local).unwrap();
        let fragment = builder.finish().unwrap();

        let report = splice(&mut body, 0, fragment).unwrap();
        assert_eq!(report.locals, 1);
        assert_eq!(body.local_count(), 1);
        assert_eq!(body.added_locals()[0].name.as_deref(), Some("flag"));
        assert_eq!(body.max_stack, 6);
    }

    #[test]
    fn stale_locals_are_refused() {
        let mut body = body_of(2);
        let anchor = body.instructions.at(0).unwrap();
        let mut builder = FragmentBuilder::new(&mut body, anchor);
        let local = builder.local(TypeSignature::I4, "late").unwrap();
        builder.ldc_i4(0).unwrap();
        builder.stloc(local).unwrap();
        let fragment = builder.finish().unwrap();

        body.add_local(crate::module::LocalSlot::named(TypeSignature::I4, "other"))
            .unwrap();
        assert!(matches!(
            splice(&mut body, 0, fragment),
            Err(SerializationFailed(_))
        ));
    }
}
