//! Locating, building and splicing instruction fragments.
//!
//! A patch is applied to exactly one method in four steps:
//!
//! 1. the [`pattern::PatternSet`] of the patch locates the construct to patch,
//! 2. the instruction at the reported index becomes the continuation,
//! 3. the patch builds its fragment with a [`fragment::FragmentBuilder`],
//! 4. [`splice::splice`] inserts the fragment in front of the continuation.
//!
//! All steps work on the single [`crate::Module`] of the run. A patch that fails leaves its
//! method without inserted instructions, but nothing is written until the module is
//! serialized, so a failed run never touches the executable.
//!
//! # Key Components
//!
//! - [`Patch`] - What a concrete patch supplies
//! - [`apply`] - Runs one patch against a module
//! - [`pattern`] - Predicate windows and ordered candidate sets
//! - [`fragment`] - Fragment builder with labels, locals and stack tracking
//! - [`splice`] - Insertion with branch and exception clause retargeting

pub mod fragment;
pub mod pattern;
pub mod splice;

pub use fragment::{Fragment, FragmentBuilder, Label, Local};
pub use pattern::{Match, MatchState, Pattern, PatternSet, Predicate};
pub use splice::{splice, SpliceReport};

use crate::{module::MethodHandle, Module, Result};

/// One patch for one method.
pub trait Patch {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// The method to patch
    fn method(&self) -> MethodHandle;

    /// Candidate locations, tried in order
    fn patterns(&self) -> PatternSet;

    /// Emit the fragment. Jumps to [`FragmentBuilder::continuation`] resume the original
    /// code at the matched location.
    ///
    /// # Errors
    /// Returns an error if the fragment cannot be built.
    fn build(&self, builder: &mut FragmentBuilder<'_>) -> Result<()>;
}

/// The result of applying one [`Patch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    /// Name of the patch
    pub patch: String,
    /// `Type::Method` of the patched method
    pub method: String,
    /// The pattern that located the insertion point
    pub pattern: String,
    /// Details of the splice
    pub splice: SpliceReport,
}

/// Locate, build and splice `patch` into its method.
///
/// # Errors
/// Returns [`crate::Error::PatternNotFound`] if no candidate pattern matches, or any error
/// of fragment construction or splicing.
pub fn apply(module: &mut Module, patch: &dyn Patch) -> Result<PatchOutcome> {
    let method = module.method_name(patch.method());
    let patterns = patch.patterns();

    let body = module.body_mut(patch.method())?;
    let found = patterns.find(&body.instructions, &method)?;
    log::info!(
        "{}: pattern '{}' matched {} at index {}",
        patch.name(),
        found.pattern,
        method,
        found.index
    );

    let continuation = body.instructions.at(found.index).ok_or_else(|| {
        malformed_error!("Match index {} is outside of {}", found.index, method)
    })?;
    let mut builder = FragmentBuilder::new(body, continuation);
    patch.build(&mut builder)?;
    let fragment = builder.finish()?;

    let report = splice(body, found.index, fragment)?;
    log::info!(
        "{}: injected {} instructions, retargeted {} branches, {} new locals",
        patch.name(),
        report.inserted,
        report.retargeted.len(),
        report.locals
    );
    log::debug!("{}: retargeted positions {:?}", patch.name(), report.retargeted);

    Ok(PatchOutcome {
        patch: patch.name().to_string(),
        method,
        pattern: found.pattern,
        splice: report,
    })
}
