use serde::{Deserialize, Serialize};

/// Dense, monotonically assigned identifier shared by a vector and its record.
pub type SlotId = u64;

/// Provenance of one embedded segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub document_id: String,
    pub title: String,
    pub text: String,
}

impl VectorRecord {
    pub fn new(
        document_id: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            title: title.into(),
            text: text.into(),
        }
    }
}

/// One ranked passage returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub slot: SlotId,
    pub document_id: String,
    pub title: String,
    pub text: String,
    pub score: f32,
}

/// Maps a squared Euclidean distance into `(0, 1]`.
///
/// Identical vectors score `1.0`; the score strictly decreases as the distance grows.
#[must_use]
pub fn distance_to_score(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Outcome of inserting one document.
///
/// The segments are visible to searches as soon as this is returned, even when
/// `persist_error` reports that the snapshot could not be written.
#[derive(Debug)]
pub struct InsertReport {
    pub document_id: String,
    pub first_slot: SlotId,
    pub segments: usize,
    pub persist_error: Option<crate::VectorStoreError>,
}

impl InsertReport {
    #[must_use]
    pub const fn persisted(&self) -> bool {
        self.persist_error.is_none()
    }

    /// Slot ids assigned to this document, in segment order.
    #[must_use]
    pub fn slots(&self) -> std::ops::Range<SlotId> {
        self.first_slot..self.first_slot + self.segments as SlotId
    }
}

/// Per-document listing derived from the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub title: String,
    pub segments: usize,
    pub first_slot: SlotId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub documents: usize,
    pub segments: usize,
    pub dimension: Option<usize>,
    pub next_slot: SlotId,
}
