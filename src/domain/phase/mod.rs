//! Phase script - ordered phases, questions and pedagogical rationale.

mod catalog;
mod rationale;
mod script;

pub use catalog::inclusive_design_script;
pub use rationale::{Rationale, Reasoning};
pub use script::{PhaseDefinition, PhaseScript};

#[cfg(test)]
pub(crate) use script::test_support;
