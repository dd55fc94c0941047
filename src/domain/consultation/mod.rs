//! Consultation module - session data, cursor math, progress and export
//! records.

mod cursor;
mod export;
mod progress;
mod session;

pub use cursor::{Advance, Cursor, RestoredCursor, COMPLETE_MARKER};
pub use export::{ExportDocument, ExportRecord};
pub use progress::{PhaseProgress, PhaseStatus, Progress};
pub use session::{
    ConsultationSession, Note, Turn, TurnRole, DEFAULT_TEMPLATE, MAX_TITLE_LENGTH,
};
