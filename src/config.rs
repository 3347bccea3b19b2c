use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SfResult;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub synthesis: SynthesisParams,
    pub encoder: EncoderParams,
    pub split: SplitParams,
    pub train: TrainParams,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SfResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Dataset synthesis knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisParams {
    /// Length of every generated target sequence.
    pub target_len: usize,
    /// Number of targets synthesized per source sequence in the positive set.
    pub samples_per_source: usize,
    /// Carry the mutation mode on each record.
    pub include_mode: bool,
    /// Carry the embed offset on each record.
    pub include_seed_start: bool,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            target_len: 50,
            samples_per_source: 1,
            include_mode: false,
            include_seed_start: false,
        }
    }
}

/// Interaction tensor dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderParams {
    pub target_len: usize,
    pub source_max_len: usize,
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self {
            target_len: 50,
            source_max_len: 26,
        }
    }
}

/// Train/val/test partitioning. The outer split carves off `test_fraction`,
/// the inner split carves `val_fraction` out of the remaining train set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitParams {
    pub test_fraction: f64,
    pub val_fraction: f64,
    pub seed: u64,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            val_fraction: 0.1,
            seed: 42,
        }
    }
}

/// Iterative training loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainParams {
    pub batch_size: usize,
    pub epochs: usize,
    pub num_iterations: usize,
    /// Restore the initial weight snapshot and recompile before every refit
    /// instead of fine-tuning from the loaded checkpoint.
    pub recompile: bool,
    /// Metric the best-checkpoint callback watches.
    pub monitor: String,
    pub checkpoint_path: PathBuf,
    pub initial_weights_path: PathBuf,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            batch_size: 256,
            epochs: 50,
            num_iterations: 5,
            recompile: true,
            monitor: "val_loss".to_string(),
            checkpoint_path: PathBuf::from("best_model.ckpt"),
            initial_weights_path: PathBuf::from("initial_weights.ckpt"),
        }
    }
}
