//! Shared helpers for the unit tests: synthetic images, hand-assembled instruction
//! sequences and an interpreter for spliced fragments.

pub mod builder;
pub mod instructions;

pub use builder::ImageBuilder;
