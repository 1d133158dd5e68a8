use crate::error::{Result, VectorStoreError};
use crate::flat_index::{FlatIndex, VectorIndex};
use crate::paths::StorePaths;
use crate::record_store::RecordStore;
use crate::snapshot;
use crate::types::{
    distance_to_score, DocumentSummary, IndexStats, InsertReport, SearchHit, SlotId, VectorRecord,
};
use std::collections::HashMap;
use std::path::Path;

/// Keeps the record store and the vector index in lockstep and owns their
/// on-disk snapshot.
///
/// Not internally synchronized: wrap it in a reader/writer lock (see
/// [`crate::Retriever`]) when it is shared.
pub struct IndexManager<I: VectorIndex = FlatIndex> {
    records: RecordStore,
    index: I,
    next_slot: SlotId,
    generation: u64,
    paths: StorePaths,
}

impl IndexManager<FlatIndex> {
    /// Empty manager persisting under `dir`. Nothing is read until [`Self::load`].
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::with_index(dir)
    }
}

impl<I: VectorIndex> IndexManager<I> {
    pub fn with_index(dir: impl AsRef<Path>) -> Self {
        Self {
            records: RecordStore::new(),
            index: I::default(),
            next_slot: 0,
            generation: 0,
            paths: StorePaths::new(dir.as_ref()),
        }
    }

    #[must_use]
    pub const fn paths(&self) -> &StorePaths {
        &self.paths
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.index.dimension()
    }

    /// The slot id the next inserted segment will receive.
    #[must_use]
    pub const fn next_slot(&self) -> SlotId {
        self.next_slot
    }

    #[must_use]
    pub const fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Embeds every segment with `embed`, then inserts them as one unit and
    /// persists the result.
    ///
    /// Nothing is inserted if any embedding fails.
    pub async fn insert_document<F>(
        &mut self,
        document_id: &str,
        title: &str,
        segments: Vec<String>,
        mut embed: F,
    ) -> Result<InsertReport>
    where
        F: FnMut(&str) -> Result<Vec<f32>>,
    {
        let mut embedded = Vec::with_capacity(segments.len());
        for (segment, text) in segments.into_iter().enumerate() {
            let vector = embed(text.as_str()).map_err(|err| match err {
                VectorStoreError::Embedding { message, .. } => {
                    VectorStoreError::embedding(segment, message)
                }
                other => VectorStoreError::embedding(segment, other.to_string()),
            })?;
            embedded.push((text, vector));
        }
        self.insert_embedded(document_id, title, embedded).await
    }

    /// Inserts already-embedded segments as one unit and persists the result.
    ///
    /// Either every segment becomes visible or none does. A failed save does not
    /// undo the insert; it is reported in [`InsertReport::persist_error`].
    pub async fn insert_embedded(
        &mut self,
        document_id: &str,
        title: &str,
        segments: Vec<(String, Vec<f32>)>,
    ) -> Result<InsertReport> {
        let first_slot = self.next_slot;
        let count = segments.len();
        if count == 0 {
            return Ok(InsertReport {
                document_id: document_id.to_string(),
                first_slot,
                segments: 0,
                persist_error: None,
            });
        }

        self.validate_dimensions(&segments)?;
        if self.contains_document(document_id) {
            log::warn!("Document {document_id} is already indexed; adding its segments again");
        }

        let base_len = self.index.len();
        if let Err(err) = self.apply(document_id, title, segments) {
            log::error!("Rolling back partial insert of document {document_id}: {err}");
            self.index.truncate(base_len);
            self.records.truncate_from(first_slot);
            self.next_slot = first_slot;
            return Err(err);
        }

        log::info!(
            "Inserted document {document_id} ({count} segments, slots {first_slot}..{})",
            self.next_slot
        );

        let persist_error = match self.save().await {
            Ok(()) => None,
            Err(err) => {
                log::warn!("Document {document_id} is searchable but was not persisted: {err}");
                Some(err)
            }
        };

        Ok(InsertReport {
            document_id: document_id.to_string(),
            first_slot,
            segments: count,
            persist_error,
        })
    }

    fn validate_dimensions(&self, segments: &[(String, Vec<f32>)]) -> Result<()> {
        let expected = self
            .index
            .dimension()
            .or_else(|| segments.first().map(|(_, v)| v.len()));
        let Some(expected) = expected else {
            return Ok(());
        };
        for (_, vector) in segments {
            if vector.len() != expected {
                return Err(VectorStoreError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }
        Ok(())
    }

    fn apply(
        &mut self,
        document_id: &str,
        title: &str,
        segments: Vec<(String, Vec<f32>)>,
    ) -> Result<()> {
        for (text, vector) in segments {
            let slot = self.next_slot;
            let position = self.index.add(vector)?;
            if position as SlotId != slot {
                return Err(VectorStoreError::Other(format!(
                    "Index placed slot {slot} at position {position}"
                )));
            }
            self.records
                .put(slot, VectorRecord::new(document_id, title, text))?;
            self.next_slot += 1;
        }
        Ok(())
    }

    /// The `k` passages nearest to `query`, best first.
    ///
    /// A manager that never received a document answers with no hits.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.index.is_empty() {
            if self.records.is_empty() {
                return Ok(Vec::new());
            }
            log::error!(
                "Vector index is empty while {} records exist",
                self.records.len()
            );
            return Err(VectorStoreError::EmptyIndex);
        }

        let neighbors = self.index.search(query, k)?;
        log::debug!("Search k={k} matched {} slots", neighbors.len());

        let mut hits = Vec::with_capacity(neighbors.len());
        for (position, distance) in neighbors {
            let slot = position as SlotId;
            let record = self.records.get(slot).map_err(|err| {
                log::error!("Refusing to serve slot {slot}: {err}");
                err
            })?;
            hits.push(SearchHit {
                slot,
                document_id: record.document_id.clone(),
                title: record.title.clone(),
                text: record.text.clone(),
                score: distance_to_score(distance),
            });
        }
        Ok(hits)
    }

    /// Writes the current state as a new snapshot generation.
    pub async fn save(&mut self) -> Result<()> {
        let generation = self.generation + 1;
        let count = self.index.len();
        let rows = (0..count).filter_map(|position| self.index.vector(position));
        let blob = snapshot::encode_vectors(generation, self.index.dimension(), count, rows)?;
        let records = self
            .records
            .all()
            .map(|(slot, record)| (slot, record.clone()))
            .collect();

        snapshot::write(
            &self.paths,
            blob,
            generation,
            self.index.dimension(),
            self.next_slot,
            records,
        )
        .await?;

        self.generation = generation;
        log::info!(
            "Saved index generation {generation} ({count} segments) to {:?}",
            self.paths.dir()
        );
        Ok(())
    }

    /// Replaces in-memory state with the persisted snapshot.
    ///
    /// Missing artifacts leave the manager empty. Unreadable or inconsistent
    /// artifacts are an error and also leave the manager empty.
    pub async fn load(&mut self) -> Result<()> {
        log::info!("Loading index from {:?}", self.paths.dir());
        self.reset();

        let snapshot = match snapshot::read(&self.paths).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                log::info!("No index artifacts found, starting empty");
                return Ok(());
            }
            Err(err) => {
                log::error!("Failed to load index: {err}");
                return Err(err);
            }
        };

        let mut index = I::default();
        for row in snapshot.rows() {
            if let Err(err) = index.add(row.to_vec()) {
                log::error!("Failed to rebuild index: {err}");
                return Err(VectorStoreError::Corrupt(format!(
                    "persisted vector rejected: {err}"
                )));
            }
        }

        self.records = snapshot.records.into_iter().collect();
        self.index = index;
        self.next_slot = snapshot.next_slot;
        self.generation = snapshot.generation;

        log::info!(
            "Loaded {} segments (dimension {:?}, generation {})",
            self.index.len(),
            self.index.dimension(),
            self.generation
        );
        Ok(())
    }

    fn reset(&mut self) {
        self.records = RecordStore::new();
        self.index = I::default();
        self.next_slot = 0;
        self.generation = 0;
    }

    #[must_use]
    pub fn contains_document(&self, document_id: &str) -> bool {
        self.records
            .all()
            .any(|(_, record)| record.document_id == document_id)
    }

    /// Documents in the order they were first inserted.
    #[must_use]
    pub fn documents(&self) -> Vec<DocumentSummary> {
        let mut order: Vec<DocumentSummary> = Vec::new();
        let mut by_id: HashMap<&str, usize> = HashMap::new();
        for (slot, record) in self.records.all() {
            match by_id.get(record.document_id.as_str()) {
                Some(&at) => order[at].segments += 1,
                None => {
                    by_id.insert(record.document_id.as_str(), order.len());
                    order.push(DocumentSummary {
                        document_id: record.document_id.clone(),
                        title: record.title.clone(),
                        segments: 1,
                        first_slot: slot,
                    });
                }
            }
        }
        order
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.documents().len(),
            segments: self.records.len(),
            dimension: self.index.dimension(),
            next_slot: self.next_slot,
        }
    }
}
