use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use typed_builder::TypedBuilder;

use crate::batcher::ClassBalancedBatches;
use crate::encoder::EncodedSet;
use crate::error::{SeedForgeError, SfResult};

/// Settings handed to the model's compile step. Stored by the iterative
/// trainer so re-compilation after a weight reset reuses the original values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub optimizer: String,
    pub loss: String,
    pub learning_rate: f64,
    pub metrics: Vec<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimizer: "adam".to_string(),
            loss: "binary_crossentropy".to_string(),
            learning_rate: 1e-3,
            metrics: vec!["binary_accuracy".to_string()],
        }
    }
}

/// Best-checkpoint persistence contract: during `fit`, whenever the
/// monitored metric improves, the model must be saved to `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub path: PathBuf,
    pub monitor: String,
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct FitOptions {
    #[builder(default = 50)]
    pub epochs: usize,
    #[builder(default, setter(strip_option))]
    pub checkpoint: Option<Checkpoint>,
}

#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    pub verbose: bool,
}

/// Named metric values from an evaluation pass.
pub type EvalMetrics = Vec<(String, f64)>;

/// The external trainable-model contract. The iterative trainer and the
/// resampling hooks talk to the model exclusively through this trait; the
/// network topology, loss and optimizer all live behind it.
pub trait TrainableModel {
    fn compile(&mut self, options: &CompileOptions) -> SfResult<()>;

    /// Runs one fit over the given train/val batch samplers, honoring the
    /// checkpoint request in `options`, and returns the per-epoch history.
    fn fit(
        &mut self,
        train: &ClassBalancedBatches,
        val: &ClassBalancedBatches,
        options: &FitOptions,
    ) -> SfResult<History>;

    fn evaluate(
        &mut self,
        test: &ClassBalancedBatches,
        options: &EvalOptions,
    ) -> SfResult<EvalMetrics>;

    /// Per-row scores over an encoded set, in row order.
    fn predict(&self, x: &EncodedSet) -> SfResult<Vec<f64>>;

    fn save_weights(&self, path: &Path) -> SfResult<()>;
    fn load_weights(&mut self, path: &Path) -> SfResult<()>;

    /// Full-model persistence (weights plus compile state).
    fn save(&self, path: &Path) -> SfResult<()>;
    fn load(&mut self, path: &Path) -> SfResult<()>;

    /// Human-readable architecture summary for the reporting side.
    fn summary(&self) -> String;
}

/// Per-epoch metric series keyed by metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    metrics: BTreeMap<String, Vec<f64>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: f64) {
        self.metrics.entry(key.to_string()).or_default().push(value);
    }

    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.metrics.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Epochs recorded on the longest series.
    pub fn epochs(&self) -> usize {
        self.metrics.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Concatenates per-metric series, `self` first. The two key sets must
    /// be identical; the trainer never reconciles diverging metric sets.
    pub fn merge(mut self, newer: History) -> SfResult<History> {
        let ours: BTreeSet<&String> = self.metrics.keys().collect();
        let theirs: BTreeSet<&String> = newer.metrics.keys().collect();
        if ours != theirs {
            return Err(SeedForgeError::Validation(format!(
                "cannot merge histories with different metric sets: {:?} vs {:?}",
                ours, theirs
            )));
        }

        for (key, mut series) in newer.metrics {
            if let Some(existing) = self.metrics.get_mut(&key) {
                existing.append(&mut series);
            }
        }
        Ok(self)
    }
}

impl FromIterator<(String, Vec<f64>)> for History {
    fn from_iter<I: IntoIterator<Item = (String, Vec<f64>)>>(iter: I) -> Self {
        Self {
            metrics: iter.into_iter().collect(),
        }
    }
}
