#![allow(dead_code)] // Shared test helpers; not every test file uses everything

use serde::{Deserialize, Serialize};
use std::path::Path;

use seedforge::batcher::ClassBalancedBatches;
use seedforge::encoder::EncodedSet;
use seedforge::error::{SeedForgeError, SfResult};
use seedforge::model::{
    CompileOptions, EvalMetrics, EvalOptions, FitOptions, History, TrainableModel,
};

/// Persisted half of the mock: what save/load and the checkpoint callback
/// actually write to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MockState {
    pub weights: Vec<f64>,
    pub fits_absorbed: usize,
}

/// Stand-in for the external network. Records every contract call, persists
/// its state as JSON and fabricates monotonically improving histories, so
/// controller tests can assert the exact call sequence.
#[derive(Debug, Default)]
pub struct MockModel {
    pub state: MockState,
    pub events: Vec<String>,
    pub compiled_with: Option<CompileOptions>,
    /// When set, the next fit call fails with a model error.
    pub fail_fit: bool,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            state: MockState {
                weights: vec![1.0, 2.0, 3.0],
                fits_absorbed: 0,
            },
            ..Self::default()
        }
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.iter().filter(|e| e.as_str() == event).count()
    }
}

impl TrainableModel for MockModel {
    fn compile(&mut self, options: &CompileOptions) -> SfResult<()> {
        self.events.push("compile".to_string());
        self.compiled_with = Some(options.clone());
        Ok(())
    }

    fn fit(
        &mut self,
        train: &ClassBalancedBatches,
        val: &ClassBalancedBatches,
        options: &FitOptions,
    ) -> SfResult<History> {
        self.events.push("fit".to_string());
        if self.fail_fit {
            return Err(SeedForgeError::Model("scripted fit failure".to_string()));
        }

        // Touch the data the way a real fit would
        let mut seen = 0usize;
        for batch in train.batches() {
            seen += batch.rows;
        }
        for batch in val.batches() {
            seen += batch.rows;
        }
        if seen == 0 {
            return Err(SeedForgeError::Model("fit received no data".to_string()));
        }

        self.state.fits_absorbed += 1;
        for w in &mut self.state.weights {
            *w += 0.1;
        }

        let mut history = History::new();
        for epoch in 0..options.epochs {
            let decay = (self.state.fits_absorbed * options.epochs + epoch) as f64;
            history.push("loss", 1.0 / (decay + 1.0));
            history.push("val_loss", 1.1 / (decay + 1.0));
            history.push("binary_accuracy", 1.0 - 0.5 / (decay + 1.0));
        }

        // Final epoch is the best one here, so the checkpoint holds the
        // end-of-fit state
        if let Some(checkpoint) = &options.checkpoint {
            self.save(&checkpoint.path)?;
        }

        Ok(history)
    }

    fn evaluate(
        &mut self,
        test: &ClassBalancedBatches,
        _options: &EvalOptions,
    ) -> SfResult<EvalMetrics> {
        self.events.push("evaluate".to_string());

        let mut rows = 0usize;
        let mut positives = 0.0f64;
        for batch in test.batches() {
            rows += batch.rows;
            positives += batch.y.iter().filter(|&&y| y > 0.5).count() as f64;
        }
        if rows == 0 {
            return Err(SeedForgeError::Model("evaluate received no data".to_string()));
        }

        Ok(vec![
            ("loss".to_string(), 0.25),
            ("binary_accuracy".to_string(), 1.0 - positives / rows as f64 * 0.1),
        ])
    }

    fn predict(&self, x: &EncodedSet) -> SfResult<Vec<f64>> {
        // Score = pairing density of the row; enough signal for ROC tests
        Ok((0..x.rows())
            .map(|i| {
                let row = x.row(i);
                row.iter().sum::<f32>() as f64 / row.len() as f64
            })
            .collect())
    }

    fn save_weights(&self, path: &Path) -> SfResult<()> {
        std::fs::write(path, serde_json::to_string(&self.state.weights)?)?;
        Ok(())
    }

    fn load_weights(&mut self, path: &Path) -> SfResult<()> {
        self.events.push("load_weights".to_string());
        let content = std::fs::read_to_string(path)?;
        self.state.weights = serde_json::from_str(&content)?;
        Ok(())
    }

    fn save(&self, path: &Path) -> SfResult<()> {
        std::fs::write(path, serde_json::to_string(&self.state)?)?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> SfResult<()> {
        self.events.push("load".to_string());
        let content = std::fs::read_to_string(path)?;
        self.state = serde_json::from_str(&content)?;
        Ok(())
    }

    fn summary(&self) -> String {
        format!("MockModel ({} weights)", self.state.weights.len())
    }
}

/// Deterministic pool of `count` synthetic source sequences of length `len`.
pub fn source_pool(count: usize, len: usize) -> Vec<String> {
    let mut rng = fastrand::Rng::with_seed(2024);
    let alphabet = [b'A', b'C', b'G', b'T'];
    (0..count)
        .map(|_| {
            let bytes: Vec<u8> = (0..len).map(|_| alphabet[rng.usize(0..4)]).collect();
            String::from_utf8(bytes).expect("ascii")
        })
        .collect()
}
