use crate::error::{Result, VectorStoreError};
use ndarray::{ArrayView1, ArrayView2, Zip};
use std::cmp::Ordering;

/// Positional nearest-neighbour index.
///
/// Positions are assigned densely in insertion order and double as slot ids.
/// An approximate index can sit behind the same contract once exact scans get
/// too slow.
pub trait VectorIndex: Default + Send + Sync {
    /// `None` until the first vector is added.
    fn dimension(&self) -> Option<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `vector` and returns its position.
    fn add(&mut self, vector: Vec<f32>) -> Result<usize>;

    /// The `k` nearest positions as `(position, squared distance)`, nearest first.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>>;

    fn vector(&self, position: usize) -> Option<&[f32]>;

    /// Drops every vector at or after `len`. Used to undo a partial insert.
    fn truncate(&mut self, len: usize);
}

/// Exact brute-force index over one contiguous row-major buffer.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    dimension: Option<usize>,
    data: Vec<f32>,
    len: usize,
}

impl FlatIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(VectorStoreError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }

    fn check_finite(vector: &[f32]) -> Result<()> {
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(VectorStoreError::invalid_vector(
                "contains NaN or infinite values",
            ));
        }
        Ok(())
    }

    fn rows(&self) -> Result<ArrayView2<'_, f32>> {
        let dimension = self.dimension.unwrap_or(0);
        ArrayView2::from_shape((self.len, dimension), &self.data)
            .map_err(|err| VectorStoreError::Other(format!("Flat index layout error: {err}")))
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn len(&self) -> usize {
        self.len
    }

    fn add(&mut self, vector: Vec<f32>) -> Result<usize> {
        if vector.is_empty() {
            return Err(VectorStoreError::invalid_vector("zero-length vector"));
        }
        Self::check_finite(&vector)?;
        self.check_dimension(vector.len())?;

        if self.dimension.is_none() {
            self.dimension = Some(vector.len());
        }
        self.data.extend_from_slice(&vector);
        let position = self.len;
        self.len += 1;
        Ok(position)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if self.len == 0 {
            return Err(VectorStoreError::EmptyIndex);
        }
        self.check_dimension(query.len())?;
        Self::check_finite(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = ArrayView1::from(query);
        let mut distances: Vec<(usize, f32)> = self
            .rows()?
            .outer_iter()
            .enumerate()
            .map(|(position, row)| {
                let distance = Zip::from(&row).and(&query).fold(0.0_f32, |acc, &a, &b| {
                    let diff = a - b;
                    diff.mul_add(diff, acc)
                });
                (position, distance)
            })
            .collect();

        // Ties resolve to the lower position so repeated queries rank identically.
        distances.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        distances.truncate(k.min(self.len));

        Ok(distances)
    }

    fn vector(&self, position: usize) -> Option<&[f32]> {
        let dimension = self.dimension?;
        if position >= self.len {
            return None;
        }
        let start = position * dimension;
        self.data.get(start..start + dimension)
    }

    fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let dimension = self.dimension.unwrap_or(0);
        self.data.truncate(len * dimension);
        self.len = len;
        if len == 0 {
            self.dimension = None;
        }
    }
}
