//! # DocMentor Text Splitter
//!
//! Turns extracted document text into ordered, bounded segments ready for
//! embedding.
//!
//! ## Strategy
//!
//! ```text
//! Text
//!     │
//!     ├──> Split on the coarsest separator present ("\n\n", "\n", " ", graphemes)
//!     │
//!     ├──> Recurse into pieces still longer than chunk_size
//!     │
//!     └──> Pack pieces into segments
//!          └─> carry chunk_overlap trailing chars into the next segment
//! ```
//!
//! ## Example
//!
//! ```rust
//! use docmentor_text_splitter::{Document, SplitterConfig, TextSplitter};
//!
//! let splitter = TextSplitter::new(SplitterConfig::new(40, 10)).unwrap();
//! let doc = Document::from_text(
//!     "Handbook",
//!     "Ownership moves values.\n\nBorrowing lends them out.",
//!     &splitter,
//! );
//! assert_eq!(doc.segments.len(), 2);
//! ```

mod config;
mod document;
mod error;
mod splitter;

pub use config::{SplitterConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use document::{document_id, Document, DocumentInfo};
pub use error::{Result, SplitterError};
pub use splitter::TextSplitter;
