use std::fmt;

use fastrand::Rng;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use crate::batcher::ClassBalancedBatches;
use crate::config::{SplitParams, SynthesisParams};
use crate::encoder::{EncodedSet, PairEncoder};
use crate::error::{SeedForgeError, SfResult};
use crate::generator::{make_dataset, DatasetOptions, ModeSelector, PairRecord};
use crate::model::TrainableModel;

/// Negative-to-positive oversampling factor: either a constant or a schedule
/// over the iteration index.
pub enum NegativeRatio {
    Fixed(usize),
    Schedule(Box<dyn Fn(usize) -> usize + Send + Sync>),
}

impl NegativeRatio {
    pub fn resolve(&self, iteration: usize) -> usize {
        match self {
            NegativeRatio::Fixed(n) => *n,
            NegativeRatio::Schedule(f) => f(iteration),
        }
    }
}

impl fmt::Debug for NegativeRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegativeRatio::Fixed(n) => write!(f, "Fixed({})", n),
            NegativeRatio::Schedule(_) => write!(f, "Schedule(..)"),
        }
    }
}

/// A raw split and its encoded view. The two stay aligned: whenever `raw`
/// changes the sampler re-encodes it.
#[derive(Debug, Clone)]
pub struct SplitData {
    pub raw: Vec<PairRecord>,
    pub encoded: EncodedSet,
}

#[derive(Debug, Clone)]
pub struct SplitTriple {
    pub train: SplitData,
    pub val: SplitData,
    pub test: SplitData,
}

#[derive(Debug, Clone)]
pub struct Splits {
    pub positive: SplitTriple,
    pub negative: SplitTriple,
}

/// Per-iteration resampling hook. Concrete experiments inspect the freshly
/// loaded best model and rework the train/val splits for the next round;
/// returning true tells the sampler the raw records changed and the encoded
/// views must be rebuilt. The default keeps everything as-is.
pub trait ResamplingStrategy: Send {
    fn on_training_end(
        &mut self,
        model: &mut dyn TrainableModel,
        splits: &mut Splits,
        iteration: usize,
    ) -> SfResult<bool> {
        let _ = (model, splits, iteration);
        Ok(false)
    }
}

/// Default strategy: no resampling between iterations.
#[derive(Debug, Default)]
pub struct NoResampling;

impl ResamplingStrategy for NoResampling {}

/// Owns the synthetic dataset across training iterations: generation,
/// splitting, encoding and batch-sampler construction.
#[derive(TypedBuilder)]
pub struct Sampler {
    /// Source sequence pool both classes are synthesized from.
    sources: Vec<String>,
    negative_ratio: NegativeRatio,
    #[builder(default)]
    synthesis: SynthesisParams,
    #[builder(default)]
    split: SplitParams,
    #[builder(default)]
    encoder: PairEncoder,
    #[builder(default = Box::new(NoResampling) as Box<dyn ResamplingStrategy>)]
    strategy: Box<dyn ResamplingStrategy>,
    /// Generation seed; a random one is drawn and logged when absent.
    #[builder(default)]
    seed: Option<u64>,
    #[builder(default = 1, setter(skip))]
    current_ratio: usize,
    #[builder(default, setter(skip))]
    splits: Option<Splits>,
}

impl Sampler {
    /// Generates both classes from the source pool, performs the double
    /// split (outer test carve-off, then validation out of the train
    /// remainder) and encodes all six splits. Idempotent: a second call is
    /// a no-op.
    pub fn initialize(&mut self) -> SfResult<()> {
        if self.splits.is_some() {
            debug!("sampler already initialized, skipping");
            return Ok(());
        }

        self.current_ratio = self.negative_ratio.resolve(0);
        if self.current_ratio == 0 {
            return Err(SeedForgeError::Config(
                "negative ratio resolved to 0 at iteration 0".to_string(),
            ));
        }

        info!(
            sources = self.sources.len(),
            ratio = self.current_ratio,
            "sampler initializing"
        );

        let positive_raw = make_dataset(
            &self.sources,
            &DatasetOptions::builder()
                .selector(ModeSelector::PositiveClass)
                .samples_per_source(self.synthesis.samples_per_source)
                .target_len(self.synthesis.target_len)
                .include_mode(self.synthesis.include_mode)
                .include_seed_start(self.synthesis.include_seed_start)
                .seed(self.seed)
                .build(),
        )?;
        let negative_raw = make_dataset(
            &self.sources,
            &DatasetOptions::builder()
                .selector(ModeSelector::NegativeClass)
                .samples_per_source(self.current_ratio)
                .target_len(self.synthesis.target_len)
                .include_mode(self.synthesis.include_mode)
                .include_seed_start(self.synthesis.include_seed_start)
                .seed(self.seed.map(|s| s + 1))
                .build(),
        )?;

        let positive = self.split_and_encode(positive_raw)?;
        let negative = self.split_and_encode(negative_raw)?;

        self.splits = Some(Splits { positive, negative });
        info!("sampler initialized");
        Ok(())
    }

    fn split_and_encode(&self, records: Vec<PairRecord>) -> SfResult<SplitTriple> {
        let (train_raw, test_raw) =
            split_records(records, self.split.test_fraction, self.split.seed);
        let (train_raw, val_raw) =
            split_records(train_raw, self.split.val_fraction, self.split.seed);

        Ok(SplitTriple {
            train: self.encode_split(train_raw)?,
            val: self.encode_split(val_raw)?,
            test: self.encode_split(test_raw)?,
        })
    }

    fn encode_split(&self, raw: Vec<PairRecord>) -> SfResult<SplitData> {
        let encoded = self.encoder.encode_records(&raw)?;
        Ok(SplitData { raw, encoded })
    }

    /// Batch samplers over the current encoded splits: (train, val, test).
    pub fn get_data(
        &self,
        batch_size: usize,
    ) -> SfResult<(ClassBalancedBatches, ClassBalancedBatches, ClassBalancedBatches)> {
        let splits = self
            .splits
            .as_ref()
            .ok_or_else(|| SeedForgeError::Validation("sampler not initialized".to_string()))?;
        let ratio = (1, self.current_ratio);

        Ok((
            build_batches(&splits.positive.train, &splits.negative.train, ratio, batch_size)?,
            build_batches(&splits.positive.val, &splits.negative.val, ratio, batch_size)?,
            build_batches(&splits.positive.test, &splits.negative.test, ratio, batch_size)?,
        ))
    }

    /// RESAMPLE step of the training loop: hands the freshly loaded best
    /// model to the strategy, re-encodes whatever it touched, re-resolves a
    /// scheduled ratio and returns refreshed (train, val) batch samplers.
    /// The test split is never touched.
    pub fn resample(
        &mut self,
        model: &mut dyn TrainableModel,
        iteration: usize,
        batch_size: usize,
    ) -> SfResult<(ClassBalancedBatches, ClassBalancedBatches)> {
        let splits = self
            .splits
            .as_mut()
            .ok_or_else(|| SeedForgeError::Validation("sampler not initialized".to_string()))?;

        let changed = self.strategy.on_training_end(model, splits, iteration)?;
        if changed {
            info!(iteration, "resampling strategy touched train/val splits, re-encoding");
            for part in [
                &mut splits.positive.train,
                &mut splits.positive.val,
                &mut splits.negative.train,
                &mut splits.negative.val,
            ] {
                part.encoded = self.encoder.encode_records(&part.raw)?;
            }
        }

        let ratio = self.negative_ratio.resolve(iteration);
        if ratio == 0 {
            return Err(SeedForgeError::Config(format!(
                "negative ratio resolved to 0 at iteration {}",
                iteration
            )));
        }
        self.current_ratio = ratio;

        let ratio = (1, self.current_ratio);
        Ok((
            build_batches(&splits.positive.train, &splits.negative.train, ratio, batch_size)?,
            build_batches(&splits.positive.val, &splits.negative.val, ratio, batch_size)?,
        ))
    }

    pub fn splits(&self) -> Option<&Splits> {
        self.splits.as_ref()
    }

    pub fn current_ratio(&self) -> usize {
        self.current_ratio
    }
}

fn build_batches(
    pos: &SplitData,
    neg: &SplitData,
    ratio: (usize, usize),
    batch_size: usize,
) -> SfResult<ClassBalancedBatches> {
    ClassBalancedBatches::new(
        pos.encoded.clone(),
        vec![1.0; pos.encoded.rows()],
        neg.encoded.clone(),
        vec![0.0; neg.encoded.rows()],
        ratio,
        batch_size,
    )
}

/// Deterministic shuffle-and-carve split. The held-out fraction is rounded
/// up and taken from the tail of the shuffled order, so the same seed always
/// produces the same partition.
pub fn split_records(
    mut records: Vec<PairRecord>,
    holdout_fraction: f64,
    seed: u64,
) -> (Vec<PairRecord>, Vec<PairRecord>) {
    let mut rng = Rng::with_seed(seed);
    rng.shuffle(&mut records);

    let holdout = ((records.len() as f64) * holdout_fraction).ceil() as usize;
    let holdout = holdout.min(records.len());
    let held = records.split_off(records.len() - holdout);
    (records, held)
}
