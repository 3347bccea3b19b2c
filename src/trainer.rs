use std::path::PathBuf;
use tracing::info;
use typed_builder::TypedBuilder;

use crate::config::TrainParams;
use crate::error::SfResult;
use crate::model::{
    Checkpoint, CompileOptions, EvalMetrics, EvalOptions, FitOptions, History, TrainableModel,
};
use crate::sampler::Sampler;

#[derive(Debug, Clone, TypedBuilder)]
pub struct IterativeOptions {
    #[builder(default = 5)]
    pub num_iterations: usize,
    /// Restore the initial weight snapshot and recompile before every refit,
    /// restarting optimization from scratch instead of fine-tuning.
    #[builder(default = true)]
    pub recompile: bool,
    #[builder(default = 256)]
    pub batch_size: usize,
    #[builder(default = 50)]
    pub epochs: usize,
    #[builder(default = PathBuf::from("best_model.ckpt"))]
    pub checkpoint_path: PathBuf,
    #[builder(default = PathBuf::from("initial_weights.ckpt"))]
    pub initial_weights_path: PathBuf,
    #[builder(default = String::from("val_loss"))]
    pub monitor: String,
}

impl From<&TrainParams> for IterativeOptions {
    fn from(params: &TrainParams) -> Self {
        Self {
            num_iterations: params.num_iterations,
            recompile: params.recompile,
            batch_size: params.batch_size,
            epochs: params.epochs,
            checkpoint_path: params.checkpoint_path.clone(),
            initial_weights_path: params.initial_weights_path.clone(),
            monitor: params.monitor.clone(),
        }
    }
}

pub struct TrainOutcome {
    /// Per-epoch metric series merged across all iterations.
    pub history: History,
    /// Final evaluation on the untouched test split.
    pub evaluation: EvalMetrics,
}

/// Drives the outer training loop: initial fit, N resampling iterations
/// (load best checkpoint, resample, optionally reset weights, refit), then a
/// final checkpoint reload and one evaluation on the test split.
///
/// The checkpoint file is the only state shared across iterations; running
/// two trainers against the same checkpoint path concurrently is a caller
/// error. Model failures propagate unrecovered.
pub struct IterativeTrainer<'a, M: TrainableModel> {
    model: &'a mut M,
    sampler: &'a mut Sampler,
    compile_options: CompileOptions,
    options: IterativeOptions,
}

impl<'a, M: TrainableModel> IterativeTrainer<'a, M> {
    pub fn new(
        model: &'a mut M,
        sampler: &'a mut Sampler,
        compile_options: CompileOptions,
        options: IterativeOptions,
    ) -> Self {
        Self {
            model,
            sampler,
            compile_options,
            options,
        }
    }

    pub fn run(&mut self) -> SfResult<TrainOutcome> {
        let opts = self.options.clone();

        // INIT
        self.model.compile(&self.compile_options)?;
        if opts.recompile {
            // Snapshot must exist before the first weight reset
            self.model.save_weights(&opts.initial_weights_path)?;
        }

        self.sampler.initialize()?;
        let (mut train, mut val, test) = self.sampler.get_data(opts.batch_size)?;

        let fit_options = FitOptions::builder()
            .epochs(opts.epochs)
            .checkpoint(Checkpoint {
                path: opts.checkpoint_path.clone(),
                monitor: opts.monitor.clone(),
            })
            .build();

        info!(
            epochs = opts.epochs,
            batch_size = opts.batch_size,
            iterations = opts.num_iterations,
            "initial fit"
        );
        let mut history = self.model.fit(&train, &val, &fit_options)?;

        for iteration in 1..=opts.num_iterations {
            // LOAD_BEST: the persisted best becomes the current model for
            // the resampling decision (and, without a reset, for the refit).
            self.model.load(&opts.checkpoint_path)?;

            // RESAMPLE
            let (new_train, new_val) =
                self.sampler
                    .resample(&mut *self.model, iteration, opts.batch_size)?;
            train = new_train;
            val = new_val;

            // RESET_WEIGHTS
            if opts.recompile {
                self.model.load_weights(&opts.initial_weights_path)?;
                self.model.compile(&self.compile_options)?;
            }

            info!(iteration, "refit");
            let new_history = self.model.fit(&train, &val, &fit_options)?;
            history = history.merge(new_history)?;
        }

        // Final reload and a single evaluation on the untouched test split
        self.model.load(&opts.checkpoint_path)?;
        let evaluation = self.model.evaluate(&test, &EvalOptions::default())?;
        for (name, value) in &evaluation {
            info!(metric = %name, value, "test result");
        }

        Ok(TrainOutcome {
            history,
            evaluation,
        })
    }
}
