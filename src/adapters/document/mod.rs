//! Document adapters - Implementations of the DocumentExporter port.
//!
//! - `MarkdownExporter` - Accessible Markdown export of a consultation

mod markdown_exporter;

pub use markdown_exporter::MarkdownExporter;
