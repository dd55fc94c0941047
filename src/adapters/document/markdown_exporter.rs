//! Markdown document exporter adapter.
//!
//! Renders an exported consultation as a Markdown document with a fixed
//! structure: metadata, the conversation grouped under phase headings,
//! notes, recommendations pulled from the consultant's replies, and an
//! accessibility statement.

use crate::domain::consultation::{ExportDocument, ExportRecord, TurnRole};
use crate::domain::foundation::DomainError;
use crate::ports::DocumentExporter;

const SUMMARY: &str = "This document contains a record of the inclusive design consultation, \
organized by UDL and WCAG frameworks.";

const ACCESSIBILITY_STATEMENT: &str = "This document was generated with accessibility in mind. \
It uses heading levels for navigation, semantic structure, and avoids images without \
alternative text.";

/// Markdown implementation of DocumentExporter.
#[derive(Debug, Clone, Default)]
pub struct MarkdownExporter;

impl MarkdownExporter {
    /// Creates a new markdown exporter.
    pub fn new() -> Self {
        Self
    }

    /// Renders the whole document as a string.
    pub fn render_markdown(&self, document: &ExportDocument) -> String {
        let mut out = String::new();

        out.push_str(&format!("# {}\n\n", document.title));
        out.push_str(&format!("**Consultation Type:** {}  \n", document.template_name));
        out.push_str(&format!("**Created:** {}  \n", document.created_at.date_label()));
        out.push_str(&format!(
            "**Status:** {}\n\n",
            if document.completed { "Complete" } else { "In Progress" }
        ));

        out.push_str("## Summary\n\n");
        out.push_str(SUMMARY);
        out.push_str("\n\n");

        self.render_conversation(&document.records, &mut out);

        if !document.notes.is_empty() {
            out.push_str("## Notes\n\n");
            for note in &document.notes {
                out.push_str(&format!(
                    "- {} ({})\n",
                    note.content,
                    note.timestamp.date_label()
                ));
            }
            out.push('\n');
        }

        out.push_str("## Key Recommendations\n\n");
        out.push_str("Based on this consultation, consider the following action items:\n\n");
        for recommendation in recommendations(&document.records) {
            out.push_str(&format!("- {}\n", recommendation));
        }
        out.push('\n');

        out.push_str("## Accessibility\n\n");
        out.push_str(ACCESSIBILITY_STATEMENT);
        out.push('\n');

        out
    }

    fn render_conversation(&self, records: &[ExportRecord], out: &mut String) {
        let mut current_phase: Option<&str> = None;

        for record in records {
            if let Some(label) = record.phase_label.as_deref() {
                if current_phase != Some(label) {
                    current_phase = Some(label);
                    out.push_str(&format!("## {}\n\n", label));
                }
            }

            out.push_str(&format!(
                "**{}:** {}\n\n",
                record.role.speaker_label(),
                record.content
            ));

            if record.role == TurnRole::Assistant {
                if let Some(summary) = &record.reasoning_summary {
                    out.push_str(&format!("> Framework: {}\n\n", summary));
                }
            }
        }
    }
}

/// First sentence mentioning "recommend" from each consultant reply.
fn recommendations(records: &[ExportRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.role == TurnRole::Assistant)
        .filter_map(|r| {
            r.content
                .split('.')
                .find(|sentence| sentence.to_lowercase().contains("recommend"))
                .map(|sentence| format!("{}.", sentence.trim()))
        })
        .collect()
}

impl DocumentExporter for MarkdownExporter {
    fn file_extension(&self) -> &'static str {
        "md"
    }

    fn render(&self, document: &ExportDocument) -> Result<Vec<u8>, DomainError> {
        Ok(self.render_markdown(document).into_bytes())
    }
}
