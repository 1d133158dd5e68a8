use crate::error::Result;
use crate::splitter::TextSplitter;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A source document split into ordered segments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stable id derived from title and content
    pub id: String,

    /// Human-readable title (file stem for files)
    pub title: String,

    /// Full extracted text
    pub content: String,

    /// Segments in document order
    pub segments: Vec<String>,

    /// File the text came from, if any
    pub source_path: Option<PathBuf>,
}

/// Summary shown after ingesting a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: String,
    pub title: String,
    pub total_segments: usize,
    pub average_segment_chars: f64,
}

impl Document {
    pub fn from_text(
        title: impl Into<String>,
        content: impl Into<String>,
        splitter: &TextSplitter,
    ) -> Self {
        let title = title.into();
        let content = content.into();
        let segments = splitter.split(&content);
        Self {
            id: document_id(&title, &content),
            title,
            content,
            segments,
            source_path: None,
        }
    }

    /// Reads a UTF-8 text file; the title is the file stem.
    pub fn from_file(path: impl AsRef<Path>, splitter: &TextSplitter) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string());
        log::info!("Read {} ({} bytes)", path.display(), content.len());

        let mut document = Self::from_text(title, content, splitter);
        document.source_path = Some(path.to_path_buf());
        Ok(document)
    }

    #[must_use]
    pub fn info(&self) -> DocumentInfo {
        let total_chars: usize = self.segments.iter().map(|s| s.chars().count()).sum();
        #[allow(clippy::cast_precision_loss)]
        let average_segment_chars = if self.segments.is_empty() {
            0.0
        } else {
            total_chars as f64 / self.segments.len() as f64
        };
        DocumentInfo {
            id: self.id.clone(),
            title: self.title.clone(),
            total_segments: self.segments.len(),
            average_segment_chars,
        }
    }
}

/// First 128 bits of SHA-256 over title and content, hex encoded.
#[must_use]
pub fn document_id(title: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    digest[..16].iter().map(|b| format!("{b:02x}")).collect()
}
