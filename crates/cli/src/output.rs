use docmentor_text_splitter::DocumentInfo;
use docmentor_vector_store::{
    DocumentSummary, IndexStats, InsertReport, RetrievedContext, SearchHit, SlotId, SourcePreview,
};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct IngestOutput {
    pub source: String,
    pub document_id: String,
    pub title: String,
    pub segments: usize,
    pub first_slot: SlotId,
    pub average_segment_chars: f64,
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_error: Option<String>,
}

impl IngestOutput {
    pub fn new(path: &Path, info: &DocumentInfo, report: &InsertReport) -> Self {
        Self {
            source: path.display().to_string(),
            document_id: report.document_id.clone(),
            title: info.title.clone(),
            segments: report.segments,
            first_slot: report.first_slot,
            average_segment_chars: info.average_segment_chars,
            persisted: report.persisted(),
            persist_error: report.persist_error.as_ref().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AskOutput {
    pub question: String,
    pub confidence: f32,
    pub passages: Vec<SearchHit>,
    pub sources: Vec<SourcePreview>,
}

impl AskOutput {
    pub fn new(question: String, context: &RetrievedContext, preview_chars: usize) -> Self {
        Self {
            question,
            confidence: context.confidence(),
            passages: context.hits.clone(),
            sources: context.sources(preview_chars),
        }
    }
}

pub fn render_ingest(outputs: &[IngestOutput]) -> String {
    let mut out = String::new();
    for o in outputs {
        let _ = writeln!(
            out,
            "{} -> \"{}\" ({}): {} segments, avg {:.0} chars, slots from {}",
            o.source, o.title, o.document_id, o.segments, o.average_segment_chars, o.first_slot
        );
        if let Some(err) = &o.persist_error {
            let _ = writeln!(out, "  not saved: {err}");
        }
    }
    out
}

pub fn render_ask(ask: &AskOutput) -> String {
    let mut out = String::new();
    if ask.passages.is_empty() {
        out.push_str("No matching passages. Ingest documents first.\n");
        return out;
    }

    let _ = writeln!(out, "Confidence: {:.3}\n", ask.confidence);
    for (rank, hit) in ask.passages.iter().enumerate() {
        let _ = writeln!(
            out,
            "[{}] {} (slot {}, score {:.3})",
            rank + 1,
            hit.title,
            hit.slot,
            hit.score
        );
        for line in hit.text.lines() {
            let _ = writeln!(out, "    {line}");
        }
        out.push('\n');
    }

    out.push_str("Sources:\n");
    for source in &ask.sources {
        let _ = writeln!(out, "- {}: {}", source.title, one_line(&source.preview));
    }
    out
}

pub fn render_documents(documents: &[DocumentSummary]) -> String {
    if documents.is_empty() {
        return "No documents indexed.\n".to_string();
    }
    let mut out = String::new();
    for doc in documents {
        let _ = writeln!(
            out,
            "{}  {}  ({} segments, first slot {})",
            doc.document_id, doc.title, doc.segments, doc.first_slot
        );
    }
    out
}

pub fn render_stats(store_dir: &Path, stats: &IndexStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Store:      {}", store_dir.display());
    let _ = writeln!(out, "Documents:  {}", stats.documents);
    let _ = writeln!(out, "Segments:   {}", stats.segments);
    let _ = writeln!(
        out,
        "Dimension:  {}",
        stats
            .dimension
            .map_or_else(|| "unset".to_string(), |d| d.to_string())
    );
    let _ = writeln!(out, "Next slot:  {}", stats.next_slot);
    out
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
