//! Command-line helpers for docrag

mod input;
mod ui;


pub use input::{parse_key_value, parse_metadata, read_document};
pub use ui::{
    format_bytes, render_deletion, render_document, render_documents, render_evaluation,
    render_evaluation_summary, render_health, render_ingest, render_search, render_statistics,
    render_update, rule,
};

// Re-export core types
pub use docrag_core::{Error, Result};
