//! On-disk form of an index: a binary vector blob plus a JSON record map.
//!
//! Both artifacts carry the same `generation` and the record map stores the
//! SHA-256 of the vector blob, so a crash between the two renames is caught on
//! the next load instead of pairing vectors with the wrong records.

use crate::error::{Result, VectorStoreError};
use crate::paths::{tmp_sibling, StorePaths};
use crate::types::{SlotId, VectorRecord};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

const VECTORS_MAGIC: &[u8; 4] = b"DMV1";
pub const VECTORS_FORMAT_VERSION: u32 = 1;
pub const RECORDS_SCHEMA_VERSION: u32 = 1;

// magic + version + generation + dimension + count
const HEADER_LEN: usize = 4 + 4 + 8 + 4 + 8;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedRecords {
    schema_version: u32,
    generation: u64,
    dimension: Option<usize>,
    next_slot: SlotId,
    vectors_sha256: String,
    records: BTreeMap<SlotId, VectorRecord>,
}

/// Fully validated contents of both artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub generation: u64,
    pub dimension: Option<usize>,
    /// Row-major, `count * dimension` values in slot order.
    pub vectors: Vec<f32>,
    pub count: usize,
    pub records: BTreeMap<SlotId, VectorRecord>,
    pub next_slot: SlotId,
}

impl Snapshot {
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        let dimension = self.dimension.unwrap_or(1).max(1);
        self.vectors.chunks_exact(dimension).take(self.count)
    }
}

pub fn encode_vectors<'a>(
    generation: u64,
    dimension: Option<usize>,
    count: usize,
    rows: impl Iterator<Item = &'a [f32]>,
) -> Result<Vec<u8>> {
    let dim = dimension.unwrap_or(0);
    let dim_u32 = u32::try_from(dim)
        .map_err(|_| VectorStoreError::Other(format!("Dimension {dim} does not fit the format")))?;
    let mut out = Vec::with_capacity(HEADER_LEN + count * dim * 4);
    out.extend_from_slice(VECTORS_MAGIC);
    out.extend_from_slice(&VECTORS_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&generation.to_le_bytes());
    out.extend_from_slice(&dim_u32.to_le_bytes());
    out.extend_from_slice(&(count as u64).to_le_bytes());
    let mut written = 0usize;
    for row in rows {
        if row.len() != dim {
            return Err(VectorStoreError::DimensionMismatch {
                expected: dim,
                actual: row.len(),
            });
        }
        for v in row {
            out.extend_from_slice(&v.to_le_bytes());
        }
        written += 1;
    }
    if written != count {
        return Err(VectorStoreError::Other(format!(
            "Vector count changed while encoding ({written} != {count})"
        )));
    }
    Ok(out)
}

struct DecodedVectors {
    generation: u64,
    dimension: Option<usize>,
    count: usize,
    vectors: Vec<f32>,
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes(bytes.get(at..at + 4)?.try_into().ok()?))
}

fn read_u64(bytes: &[u8], at: usize) -> Option<u64> {
    Some(u64::from_le_bytes(bytes.get(at..at + 8)?.try_into().ok()?))
}

fn decode_vectors(bytes: &[u8]) -> Result<DecodedVectors> {
    if bytes.len() < HEADER_LEN || &bytes[0..4] != VECTORS_MAGIC {
        return Err(VectorStoreError::corrupt("vector artifact has no DMV1 header"));
    }
    let truncated = || VectorStoreError::corrupt("vector artifact header is truncated");
    let version = read_u32(bytes, 4).ok_or_else(truncated)?;
    if version != VECTORS_FORMAT_VERSION {
        return Err(VectorStoreError::Corrupt(format!(
            "Unsupported vector format version {version} (expected {VECTORS_FORMAT_VERSION})"
        )));
    }
    let generation = read_u64(bytes, 8).ok_or_else(truncated)?;
    let dim = read_u32(bytes, 16).ok_or_else(truncated)? as usize;
    let count = usize::try_from(read_u64(bytes, 20).ok_or_else(truncated)?)
        .map_err(|_| VectorStoreError::corrupt("vector count overflows usize"))?;

    if dim == 0 && count > 0 {
        return Err(VectorStoreError::Corrupt(format!(
            "vector artifact holds {count} vectors without a dimension"
        )));
    }
    let expected_len = count
        .checked_mul(dim)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(HEADER_LEN))
        .ok_or_else(|| VectorStoreError::corrupt("vector artifact size overflows"))?;
    if bytes.len() != expected_len {
        return Err(VectorStoreError::Corrupt(format!(
            "vector artifact is {} bytes, expected {expected_len}",
            bytes.len()
        )));
    }

    let vectors = bytes[HEADER_LEN..]
        .chunks_exact(4)
        .map(|raw| f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
        .collect();

    Ok(DecodedVectors {
        generation,
        dimension: (dim > 0).then_some(dim),
        count,
        vectors,
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Writes both artifacts through `.tmp` siblings, vectors first and records last.
pub async fn write(
    paths: &StorePaths,
    vectors_blob: Vec<u8>,
    generation: u64,
    dimension: Option<usize>,
    next_slot: SlotId,
    records: BTreeMap<SlotId, VectorRecord>,
) -> Result<()> {
    tokio::fs::create_dir_all(paths.dir()).await?;

    let persisted = PersistedRecords {
        schema_version: RECORDS_SCHEMA_VERSION,
        generation,
        dimension,
        next_slot,
        vectors_sha256: sha256_hex(&vectors_blob),
        records,
    };
    let records_blob = serde_json::to_vec_pretty(&persisted)?;

    let vectors_path = paths.vectors();
    let records_path = paths.records();
    let vectors_tmp = tmp_sibling(&vectors_path);
    let records_tmp = tmp_sibling(&records_path);

    let staged = async {
        tokio::fs::write(&vectors_tmp, &vectors_blob).await?;
        tokio::fs::write(&records_tmp, &records_blob).await?;
        Ok::<_, std::io::Error>(())
    }
    .await;
    if let Err(err) = staged {
        let _ = tokio::fs::remove_file(&vectors_tmp).await;
        let _ = tokio::fs::remove_file(&records_tmp).await;
        return Err(err.into());
    }

    tokio::fs::rename(&vectors_tmp, &vectors_path).await?;
    tokio::fs::rename(&records_tmp, &records_path).await?;
    Ok(())
}

async fn exists(path: &Path) -> Result<bool> {
    Ok(tokio::fs::try_exists(path).await?)
}

/// Reads and cross-checks both artifacts. `Ok(None)` when neither exists.
pub async fn read(paths: &StorePaths) -> Result<Option<Snapshot>> {
    let vectors_path = paths.vectors();
    let records_path = paths.records();
    match (exists(&vectors_path).await?, exists(&records_path).await?) {
        (false, false) => return Ok(None),
        (true, false) => {
            return Err(VectorStoreError::Corrupt(format!(
                "{} exists without {}",
                vectors_path.display(),
                records_path.display()
            )))
        }
        (false, true) => {
            return Err(VectorStoreError::Corrupt(format!(
                "{} exists without {}",
                records_path.display(),
                vectors_path.display()
            )))
        }
        (true, true) => {}
    }

    let vectors_blob = tokio::fs::read(&vectors_path).await?;
    let records_blob = tokio::fs::read(&records_path).await?;

    let decoded = decode_vectors(&vectors_blob)?;
    let persisted: PersistedRecords = serde_json::from_slice(&records_blob)
        .map_err(|err| VectorStoreError::Corrupt(format!("record artifact: {err}")))?;

    if persisted.schema_version != RECORDS_SCHEMA_VERSION {
        return Err(VectorStoreError::Corrupt(format!(
            "Unsupported record schema_version {} (expected {RECORDS_SCHEMA_VERSION})",
            persisted.schema_version
        )));
    }
    if persisted.generation != decoded.generation {
        return Err(VectorStoreError::Corrupt(format!(
            "artifact generations disagree (records {} vs vectors {})",
            persisted.generation, decoded.generation
        )));
    }
    if persisted.vectors_sha256 != sha256_hex(&vectors_blob) {
        return Err(VectorStoreError::corrupt(
            "vector artifact checksum does not match the record artifact",
        ));
    }
    if persisted.dimension != decoded.dimension {
        return Err(VectorStoreError::Corrupt(format!(
            "artifact dimensions disagree (records {:?} vs vectors {:?})",
            persisted.dimension, decoded.dimension
        )));
    }
    if persisted.records.len() != decoded.count {
        return Err(VectorStoreError::Corrupt(format!(
            "{} records for {} vectors",
            persisted.records.len(),
            decoded.count
        )));
    }
    if let Some((expected, slot)) = persisted
        .records
        .keys()
        .enumerate()
        .find(|(expected, slot)| **slot != *expected as SlotId)
    {
        return Err(VectorStoreError::Corrupt(format!(
            "record slot {slot} found where slot {expected} was expected"
        )));
    }
    if persisted.next_slot != decoded.count as SlotId {
        return Err(VectorStoreError::Corrupt(format!(
            "next_slot {} does not follow {} stored slots",
            persisted.next_slot, decoded.count
        )));
    }

    Ok(Some(Snapshot {
        generation: decoded.generation,
        dimension: decoded.dimension,
        vectors: decoded.vectors,
        count: decoded.count,
        records: persisted.records,
        next_slot: persisted.next_slot,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_records() -> BTreeMap<SlotId, VectorRecord> {
        [
            (0, VectorRecord::new("d1", "Guide", "alpha")),
            (1, VectorRecord::new("d1", "Guide", "beta")),
        ]
        .into_iter()
        .collect()
    }

    async fn write_sample(paths: &StorePaths, generation: u64) {
        let rows: [&[f32]; 2] = [&[1.0, 0.0], &[0.0, 1.0]];
        let blob = encode_vectors(generation, Some(2), 2, rows.into_iter()).unwrap();
        write(paths, blob, generation, Some(2), 2, sample_records())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn snapshot_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let paths = StorePaths::new(tmp.path().join("store"));
        write_sample(&paths, 3).await;

        let snapshot = read(&paths).await.unwrap().expect("snapshot");
        assert_eq!(snapshot.generation, 3);
        assert_eq!(snapshot.dimension, Some(2));
        assert_eq!(snapshot.count, 2);
        assert_eq!(snapshot.next_slot, 2);
        assert_eq!(snapshot.records, sample_records());
        assert_eq!(
            snapshot.rows().collect::<Vec<_>>(),
            vec![&[1.0, 0.0][..], &[0.0, 1.0][..]]
        );
        assert!(!tmp_sibling(&paths.vectors()).exists());
        assert!(!tmp_sibling(&paths.records()).exists());
    }

    #[tokio::test]
    async fn missing_artifacts_read_as_none() {
        let tmp = TempDir::new().unwrap();
        let paths = StorePaths::new(tmp.path());
        assert!(read(&paths).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lone_artifact_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let paths = StorePaths::new(tmp.path());
        write_sample(&paths, 1).await;
        tokio::fs::remove_file(paths.records()).await.unwrap();

        let err = read(&paths).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::Corrupt(_)), "{err}");
    }

    #[tokio::test]
    async fn vectors_from_another_generation_are_detected() {
        let tmp = TempDir::new().unwrap();
        let paths = StorePaths::new(tmp.path());
        write_sample(&paths, 1).await;
        let stale_records = tokio::fs::read(paths.records()).await.unwrap();

        // Simulates a crash after the vector rename of the next save.
        write_sample(&paths, 2).await;
        tokio::fs::write(paths.records(), stale_records).await.unwrap();

        let err = read(&paths).await.unwrap_err();
        assert!(err.to_string().contains("generations disagree"), "{err}");
    }

    #[tokio::test]
    async fn tampered_vectors_fail_checksum() {
        let tmp = TempDir::new().unwrap();
        let paths = StorePaths::new(tmp.path());
        write_sample(&paths, 1).await;

        let mut blob = tokio::fs::read(paths.vectors()).await.unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        tokio::fs::write(paths.vectors(), blob).await.unwrap();

        let err = read(&paths).await.unwrap_err();
        assert!(err.to_string().contains("checksum"), "{err}");
    }

    #[test]
    fn decode_rejects_bad_header_and_length() {
        assert!(decode_vectors(b"nope").is_err());

        let rows: [&[f32]; 1] = [&[1.0, 2.0]];
        let mut blob = encode_vectors(0, Some(2), 1, rows.into_iter()).unwrap();
        blob.pop();
        assert!(decode_vectors(&blob).is_err());
    }

    #[test]
    fn empty_index_encodes_without_dimension() {
        let blob = encode_vectors(0, None, 0, std::iter::empty()).unwrap();
        let decoded = decode_vectors(&blob).unwrap();
        assert_eq!(decoded.dimension, None);
        assert_eq!(decoded.count, 0);
        assert!(decoded.vectors.is_empty());
    }
}
