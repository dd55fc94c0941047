//! Document Exporter Port - turns export records into a document.
//!
//! Exporters are pure formatters over [`ExportDocument`]; they make no
//! decisions about content.

use crate::domain::consultation::ExportDocument;
use crate::domain::foundation::DomainError;

/// Port for rendering an exported consultation.
pub trait DocumentExporter: Send + Sync {
    /// File extension without the dot (e.g. "md").
    fn file_extension(&self) -> &'static str;

    /// Render the document to bytes ready to be written to disk.
    ///
    /// # Errors
    ///
    /// Returns `InternalError` if rendering fails.
    fn render(&self, document: &ExportDocument) -> Result<Vec<u8>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_exporter_is_object_safe() {
        fn _accepts_dyn(_exporter: &dyn DocumentExporter) {}
    }
}
