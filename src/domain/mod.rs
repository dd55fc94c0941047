//! Domain layer containing consultation rules and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `phase` - Phase script: ordered phases, questions and rationale
//! - `consultation` - Session data, cursor math, progress and export records
//! - `ai` - Provider registry, provider configuration and prompt framing

pub mod ai;
pub mod consultation;
pub mod foundation;
pub mod phase;
