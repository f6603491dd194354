//! Terminal rendering of catalog results

use chrono::{DateTime, Utc};
use colored::*;
use crossterm::terminal::size;
use serde_json::Value;
use std::fmt::Write;

use docrag_core::{
    CatalogStatistics, DeletionReceipt, DocumentDetail, DocumentMetadata, DocumentSummary,
    IngestReceipt, MetadataUpdateReceipt, RetrievedChunk,
};
use docrag_eval::{Evaluation, EvaluationSummary};

/// Horizontal rule sized to the terminal, at most 72 columns
pub fn rule() -> String {
    let width = size().map(|(w, _)| w as usize).unwrap_or(80);
    "─".repeat(width.saturating_sub(4).clamp(20, 72))
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn field(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {:<14} {}", format!("{}:", label).dimmed(), value);
}

fn custom_fields(out: &mut String, extra: &serde_json::Map<String, Value>) {
    for (key, value) in extra {
        let shown = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        field(out, key, shown);
    }
}

fn metadata_fields(out: &mut String, metadata: &DocumentMetadata) {
    field(out, "size", format_bytes(metadata.file_size_bytes));
    if let Some(pages) = metadata.page_count {
        field(out, "pages", pages);
    }
    field(out, "chunks", metadata.total_chunks);
    field(out, "text length", metadata.text_length);
    field(out, "processed", timestamp(&metadata.processed_at));
    if let Some(updated) = metadata.updated_at {
        field(out, "updated", timestamp(&updated));
    }
    custom_fields(out, &metadata.extra);
}

pub fn render_ingest(receipt: &IngestReceipt) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} Ingested {} into {} chunks",
        "✅".green(),
        receipt.filename.bold(),
        receipt.chunk_count
    );
    field(&mut out, "size", format_bytes(receipt.file_size_bytes));
    if let Some(pages) = receipt.page_count {
        field(&mut out, "pages", pages);
    }
    field(&mut out, "text length", receipt.text_length);
    out
}

pub fn render_search(query: &str, results: &[RetrievedChunk]) -> String {
    let mut out = String::new();
    if results.is_empty() {
        let _ = writeln!(out, "{} No matches for \"{}\"", "⚠️".yellow(), query);
        return out;
    }

    let _ = writeln!(out, "{} {} matches for \"{}\"", "🔍".blue(), results.len(), query);
    for (rank, hit) in results.iter().enumerate() {
        let _ = writeln!(out, "{}", rule().dimmed());
        let _ = writeln!(
            out,
            "{}. {} {} {}",
            rank + 1,
            hit.source.bold(),
            format!("#{}", hit.chunk_index).dimmed(),
            format!("score {:.3}", hit.score).cyan()
        );
        let _ = writeln!(out, "{}", hit.text.trim());
    }
    out
}

pub fn render_documents(documents: &[DocumentSummary]) -> String {
    let mut out = String::new();
    if documents.is_empty() {
        let _ = writeln!(out, "{}", "No documents stored".dimmed());
        return out;
    }

    for document in documents {
        let _ = writeln!(
            out,
            "{} {}",
            "📄".blue(),
            document.name.bold()
        );
        field(&mut out, "size", format_bytes(document.file_size_bytes));
        if let Some(pages) = document.page_count {
            field(&mut out, "pages", pages);
        }
        field(
            &mut out,
            "chunks",
            format!("{} stored / {} expected", document.actual_chunks, document.total_chunks),
        );
        field(&mut out, "processed", timestamp(&document.processed_at));
        custom_fields(&mut out, &document.custom_metadata);
        if document.actual_chunks != document.total_chunks {
            let _ = writeln!(out, "  {} chunk count differs from ingest", "⚠️".yellow());
        }
    }
    let _ = writeln!(out, "{}", format!("{} documents", documents.len()).dimmed());
    out
}

pub fn render_document(document: &DocumentDetail) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "📄".blue(), document.name.bold());
    metadata_fields(&mut out, &document.metadata);
    for chunk in &document.chunks {
        let _ = writeln!(out, "{}", rule().dimmed());
        let _ = writeln!(
            out,
            "{} {}",
            format!("chunk {}", chunk.chunk_index).bold(),
            format!("({} chars, id {})", chunk.chunk_length, chunk.id).dimmed()
        );
        let _ = writeln!(out, "{}", chunk.text);
    }
    out
}

pub fn render_update(receipt: &MetadataUpdateReceipt) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} Updated metadata of {} ({} chunks)",
        "✅".green(),
        receipt.name.bold(),
        receipt.updated_chunks
    );
    metadata_fields(&mut out, &receipt.updated_metadata);
    out
}

pub fn render_deletion(receipt: &DeletionReceipt) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} Deleted {} ({} chunks)",
        "🗑️".red(),
        receipt.name.bold(),
        receipt.deleted_chunks
    );
    out
}

pub fn render_statistics(stats: &CatalogStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Collection statistics".bold());
    field(&mut out, "documents", stats.total_documents);
    field(&mut out, "chunks", stats.total_chunks);
    field(&mut out, "file size", format_bytes(stats.total_file_size));
    field(&mut out, "text length", stats.total_text_length);
    field(&mut out, "avg chunk", format!("{:.1} chars", stats.average_chunk_size));
    out
}

fn score_colored(score: f32) -> ColoredString {
    let text = format!("{:.2}", score);
    if score >= 0.7 {
        text.green()
    } else if score >= 0.4 {
        text.yellow()
    } else {
        text.red()
    }
}

pub fn render_evaluation(evaluation: &Evaluation) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} Overall score {}",
        "📊".blue(),
        score_colored(evaluation.overall_score).bold()
    );
    for (metric, result) in &evaluation.metrics {
        match &result.error {
            Some(error) => {
                let _ = writeln!(out, "  {:<14} {} {}", metric.name(), "failed".red(), error.dimmed());
            }
            None => {
                let _ = writeln!(
                    out,
                    "  {:<14} {} {}",
                    metric.name(),
                    score_colored(result.score),
                    result.description.dimmed()
                );
            }
        }
    }
    if !evaluation.sources.is_empty() {
        field(&mut out, "sources", evaluation.sources.join(", "));
    }
    out
}

pub fn render_evaluation_summary(summary: &EvaluationSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} evaluations, trend: {}",
        "📈".blue(),
        summary.total_evaluations,
        summary.recent_trend.to_string().bold()
    );
    for (name, score) in &summary.average_scores {
        field(&mut out, name, format!("{:.2}", score));
    }
    out
}

pub fn render_health(target: &str, result: Result<(), String>) -> String {
    match result {
        Ok(()) => format!("{} Vector store reachable at {}\n", "✅".green(), target),
        Err(e) => format!("{} Vector store unreachable at {}: {}\n", "❌".red(), target, e),
    }
}
