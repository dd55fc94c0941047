//! Inclusive Design Wizard - guided UDL/WCAG consultations
//!
//! This crate walks an educator through a scripted, multi-phase
//! questionnaire, relays each answer to a local or cloud language model,
//! streams the reply into the transcript and exports the result.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
