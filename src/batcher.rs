use fastrand::Rng;

use crate::encoder::EncodedSet;
use crate::error::{SeedForgeError, SfResult};

/// One batch: row-major interaction tensors and binary labels, both shuffled
/// with the same permutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub rows: usize,
    pub row_size: usize,
}

/// Serves class-balanced batches over separately held positive and negative
/// encoded sets. Every batch (except trailing partial ones) carries
/// `floor(p * batch_size / (p + n))` positives and
/// `floor(n * batch_size / (p + n))` negatives for a class ratio of (p, n).
pub struct ClassBalancedBatches {
    positive: EncodedSet,
    positive_labels: Vec<f32>,
    negative: EncodedSet,
    negative_labels: Vec<f32>,
    positive_per_batch: usize,
    negative_per_batch: usize,
    batch_size: usize,
}

impl ClassBalancedBatches {
    pub fn new(
        positive: EncodedSet,
        positive_labels: Vec<f32>,
        negative: EncodedSet,
        negative_labels: Vec<f32>,
        class_ratio: (usize, usize),
        batch_size: usize,
    ) -> SfResult<Self> {
        if batch_size == 0 {
            return Err(SeedForgeError::Config("batch_size must be positive".to_string()));
        }
        let (p, n) = class_ratio;
        if p + n == 0 {
            return Err(SeedForgeError::Config(
                "class ratio must have at least one non-zero component".to_string(),
            ));
        }
        if positive.rows() != positive_labels.len() {
            return Err(SeedForgeError::Validation(format!(
                "positive set has {} rows but {} labels",
                positive.rows(),
                positive_labels.len()
            )));
        }
        if negative.rows() != negative_labels.len() {
            return Err(SeedForgeError::Validation(format!(
                "negative set has {} rows but {} labels",
                negative.rows(),
                negative_labels.len()
            )));
        }
        if positive.row_size() != negative.row_size() {
            return Err(SeedForgeError::Validation(format!(
                "positive rows ({} cells) and negative rows ({} cells) disagree",
                positive.row_size(),
                negative.row_size()
            )));
        }

        let positive_per_batch = p * batch_size / (p + n);
        let negative_per_batch = n * batch_size / (p + n);

        Ok(Self {
            positive,
            positive_labels,
            negative,
            negative_labels,
            positive_per_batch,
            negative_per_batch,
            batch_size,
        })
    }

    /// Total number of batches covering both classes.
    pub fn len(&self) -> usize {
        (self.positive.rows() + self.negative.rows()).div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn positive_per_batch(&self) -> usize {
        self.positive_per_batch
    }

    pub fn negative_per_batch(&self) -> usize {
        self.negative_per_batch
    }

    pub fn row_size(&self) -> usize {
        self.positive.row_size()
    }

    fn bounds(rows: usize, idx: usize, per_batch: usize) -> (usize, usize) {
        let start = (idx * per_batch).min(rows);
        let end = ((idx + 1) * per_batch).min(rows);
        (start, end)
    }

    /// Assembles batch `idx`. Out-of-range slices truncate silently, so the
    /// trailing batches may be short or empty. The shuffle permutation is
    /// derived from `idx` alone, making every call reproducible.
    pub fn get_batch(&self, idx: usize) -> Batch {
        let row_size = self.row_size();

        let (ps, pe) = Self::bounds(self.positive.rows(), idx, self.positive_per_batch);
        let (ns, ne) = Self::bounds(self.negative.rows(), idx, self.negative_per_batch);
        let positives = pe - ps;
        let count = positives + (ne - ns);

        let mut order: Vec<usize> = (0..count).collect();
        let mut rng = Rng::with_seed(idx as u64);
        rng.shuffle(&mut order);

        let mut x = Vec::with_capacity(count * row_size);
        let mut y = Vec::with_capacity(count);
        for &slot in &order {
            if slot < positives {
                x.extend_from_slice(self.positive.row(ps + slot));
                y.push(self.positive_labels[ps + slot]);
            } else {
                let local = ns + (slot - positives);
                x.extend_from_slice(self.negative.row(local));
                y.push(self.negative_labels[local]);
            }
        }

        Batch {
            x,
            y,
            rows: count,
            row_size,
        }
    }

    pub fn batches(&self) -> impl Iterator<Item = Batch> + '_ {
        (0..self.len()).map(|i| self.get_batch(i))
    }
}
