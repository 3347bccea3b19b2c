use rayon::prelude::*;
use tracing::warn;

use crate::config::EncoderParams;
use crate::error::{SeedForgeError, SfResult};
use crate::generator::PairRecord;
use crate::sequence::is_watson_crick;

/// Encodes sequence pairs into fixed-size Watson-Crick interaction matrices
/// of shape (target_len, source_max_len, 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairEncoder {
    target_len: usize,
    source_max_len: usize,
}

impl Default for PairEncoder {
    fn default() -> Self {
        Self::new(50, 26)
    }
}

impl PairEncoder {
    pub fn new(target_len: usize, source_max_len: usize) -> Self {
        Self {
            target_len,
            source_max_len,
        }
    }

    pub fn from_params(params: &EncoderParams) -> Self {
        Self::new(params.target_len, params.source_max_len)
    }

    pub fn target_len(&self) -> usize {
        self.target_len
    }

    pub fn source_max_len(&self) -> usize {
        self.source_max_len
    }

    /// Cells per encoded record (the trailing channel dimension is 1).
    pub fn row_size(&self) -> usize {
        self.target_len * self.source_max_len
    }

    /// Interaction matrix for one record, row-major over (target position,
    /// source position). Returns None when either sequence exceeds the
    /// tensor bounds.
    pub fn encode(&self, record: &PairRecord) -> Option<Vec<f32>> {
        if record.target.len() > self.target_len || record.source.len() > self.source_max_len {
            warn!(
                target = record.target.len(),
                source = record.source.len(),
                bounds = ?(self.target_len, self.source_max_len),
                "record exceeds tensor bounds, skipped"
            );
            return None;
        }

        let mut cells = vec![0.0f32; self.row_size()];
        for (ti, &tb) in record.target.as_bytes().iter().enumerate() {
            let base = ti * self.source_max_len;
            for (si, &sb) in record.source.as_bytes().iter().enumerate() {
                if is_watson_crick(tb, sb) {
                    cells[base + si] = 1.0;
                }
            }
        }
        Some(cells)
    }

    /// Encodes a dataset on the rayon pool. Results are collected in
    /// submission order, so the output rows follow the input ordering with
    /// oversize records removed; `EncodedSet::kept` records which input
    /// indices survived so parallel label arrays can be filtered the same
    /// way. An output with zero rows is an error, never an empty tensor.
    pub fn encode_records(&self, records: &[PairRecord]) -> SfResult<EncodedSet> {
        let encoded: Vec<Option<Vec<f32>>> = records.par_iter().map(|r| self.encode(r)).collect();

        let mut data = Vec::new();
        let mut kept = Vec::with_capacity(records.len());
        for (i, cells) in encoded.into_iter().enumerate() {
            if let Some(cells) = cells {
                data.extend_from_slice(&cells);
                kept.push(i);
            }
        }

        if kept.is_empty() {
            return Err(SeedForgeError::Validation(format!(
                "encoding produced no rows ({} input records, all skipped)",
                records.len()
            )));
        }

        let dropped = records.len() - kept.len();
        if dropped > 0 {
            warn!(dropped, kept = kept.len(), "records excluded from encoded set");
        }

        Ok(EncodedSet {
            data,
            rows: kept.len(),
            target_len: self.target_len,
            source_max_len: self.source_max_len,
            kept,
        })
    }
}

/// A stack of encoded interaction matrices, row-major, one row per surviving
/// input record.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedSet {
    data: Vec<f32>,
    rows: usize,
    target_len: usize,
    source_max_len: usize,
    kept: Vec<usize>,
}

impl EncodedSet {
    /// Assembles a set from raw parts, validating the geometry. `kept` must
    /// be strictly increasing with one entry per row.
    pub fn from_raw(
        data: Vec<f32>,
        target_len: usize,
        source_max_len: usize,
        kept: Vec<usize>,
    ) -> SfResult<Self> {
        let row_size = target_len * source_max_len;
        if row_size == 0 || data.len() % row_size != 0 {
            return Err(SeedForgeError::Validation(format!(
                "data of {} cells is not a multiple of the {}-cell row",
                data.len(),
                row_size
            )));
        }
        let rows = data.len() / row_size;
        if kept.len() != rows {
            return Err(SeedForgeError::Validation(format!(
                "kept-index set has {} entries for {} rows",
                kept.len(),
                rows
            )));
        }
        if !kept.windows(2).all(|w| w[0] < w[1]) {
            return Err(SeedForgeError::Validation(
                "kept-index set must be strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            data,
            rows,
            target_len,
            source_max_len,
            kept,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row_size(&self) -> usize {
        self.target_len * self.source_max_len
    }

    /// (rows, target_len, source_max_len, 1)
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        (self.rows, self.target_len, self.source_max_len, 1)
    }

    pub fn row(&self, i: usize) -> &[f32] {
        let size = self.row_size();
        &self.data[i * size..(i + 1) * size]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Input indices that survived the skip-filter, in order.
    pub fn kept(&self) -> &[usize] {
        &self.kept
    }

    /// Applies the skip-filter to an array that ran parallel to the raw
    /// records, so labels stay aligned with the encoded rows.
    pub fn filter_parallel<T: Clone>(&self, values: &[T]) -> SfResult<Vec<T>> {
        if let Some(&max) = self.kept.last() {
            if max >= values.len() {
                return Err(SeedForgeError::Validation(format!(
                    "parallel array has {} entries but the encoded view references index {}",
                    values.len(),
                    max
                )));
            }
        }
        Ok(self.kept.iter().map(|&i| values[i].clone()).collect())
    }
}
