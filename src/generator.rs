use fastrand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use crate::error::{SeedForgeError, SfResult};
use crate::mutation::{mutation_rates, MutationMode, MUTATION_VECTOR_LEN};
use crate::sequence::{complement, normalize, ALPHABET};

/// Sources longer than this are excluded from synthesis.
pub const SOURCE_MAX_LEN: usize = MUTATION_VECTOR_LEN;

/// One synthesized sequence pair. `mode` and `seed_start` are carried only
/// when the dataset was built with the matching include flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairRecord {
    pub source: String,
    pub target: String,
    pub mode: Option<MutationMode>,
    pub seed_start: Option<usize>,
}

/// How mutation modes are assigned across a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSelector {
    /// Mode follows the source's fractional rank in the input ordering:
    /// <20% canonical_perfect, 20-50% canonical_20, 50-80% non_canonical,
    /// the rest noise. Callers wanting a different distribution must reorder
    /// the input themselves.
    PositiveClass,
    /// Every record gets the noise mode.
    NegativeClass,
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct DatasetOptions {
    pub selector: ModeSelector,
    /// Targets synthesized per source sequence.
    #[builder(default = 1)]
    pub samples_per_source: usize,
    #[builder(default = 50)]
    pub target_len: usize,
    #[builder(default = false)]
    pub include_mode: bool,
    #[builder(default = false)]
    pub include_seed_start: bool,
    /// When set, the finished dataset is also written to this CSV path.
    #[builder(default)]
    pub store_path: Option<PathBuf>,
    /// Generation seed. A random one is drawn (and logged) when absent.
    #[builder(default)]
    pub seed: Option<u64>,
}

fn mode_for_rank(index: usize, total: usize) -> MutationMode {
    let p = index as f64 / total as f64 * 100.0;
    if p < 20.0 {
        MutationMode::CanonicalPerfect
    } else if p < 50.0 {
        MutationMode::Canonical20
    } else if p < 80.0 {
        MutationMode::NonCanonical
    } else {
        MutationMode::Noise
    }
}

/// Synthesizes one target around `source`.
///
/// Each source position mutates with its per-position probability, the
/// mutated sequence is reverse-complemented into the binding core, and the
/// core is spliced into random filler at a random offset. Returns the target
/// and the offset the core was embedded at.
pub fn create_target(
    source: &str,
    rates: &[f32],
    target_len: usize,
    rng: &mut Rng,
) -> SfResult<(String, usize)> {
    let src = source.as_bytes();
    if src.len() > rates.len() {
        return Err(SeedForgeError::Validation(format!(
            "source of {} nt exceeds the {}-slot mutation vector",
            src.len(),
            rates.len()
        )));
    }
    if src.len() > target_len {
        return Err(SeedForgeError::Validation(format!(
            "source of {} nt does not fit a target of {} nt",
            src.len(),
            target_len
        )));
    }

    // Per-position substitution, always to a different base
    let mut mutated = Vec::with_capacity(src.len());
    for (i, &nt) in src.iter().enumerate() {
        if rng.f32() < rates[i] {
            let others: Vec<u8> = ALPHABET.iter().copied().filter(|&b| b != nt).collect();
            mutated.push(others[rng.usize(0..others.len())]);
        } else {
            mutated.push(nt);
        }
    }

    // Binding core = reverse complement of the mutated source
    let mut core = Vec::with_capacity(mutated.len());
    for &nt in mutated.iter().rev() {
        core.push(complement(nt));
    }

    let pad = target_len - src.len();
    let filler: Vec<u8> = (0..pad).map(|_| ALPHABET[rng.usize(0..ALPHABET.len())]).collect();
    let seed_start = rng.usize(0..=pad);

    let mut target = Vec::with_capacity(target_len);
    target.extend_from_slice(&filler[..seed_start]);
    target.extend_from_slice(&core);
    target.extend_from_slice(&filler[seed_start..]);

    let target = String::from_utf8(target)
        .map_err(|e| SeedForgeError::Validation(format!("non-utf8 target: {}", e)))?;
    Ok((target, seed_start))
}

/// Builds a labeled dataset of sequence pairs from a source pool.
///
/// Sources that fail normalization or exceed [`SOURCE_MAX_LEN`] are skipped
/// with a diagnostic; the fractional-rank mode assignment still counts them,
/// so the mode distribution is a function of position in the input ordering.
pub fn make_dataset(sources: &[String], opts: &DatasetOptions) -> SfResult<Vec<PairRecord>> {
    let seed = opts.seed.unwrap_or_else(|| fastrand::u64(..));
    let mut rng = Rng::with_seed(seed);
    info!(
        seed,
        sources = sources.len(),
        samples_per_source = opts.samples_per_source,
        selector = ?opts.selector,
        "synthesizing dataset"
    );

    let total = sources.len();
    let mut records = Vec::with_capacity(total * opts.samples_per_source);
    let mut skipped = 0usize;

    for (i, raw) in sources.iter().enumerate() {
        let mode = match opts.selector {
            ModeSelector::NegativeClass => MutationMode::Noise,
            ModeSelector::PositiveClass => mode_for_rank(i, total),
        };

        let source = match normalize(raw) {
            Ok(s) => s,
            Err(e) => {
                skipped += 1;
                warn!(error = %e, "source rejected");
                continue;
            }
        };
        if source.len() > SOURCE_MAX_LEN {
            skipped += 1;
            warn!(len = source.len(), max = SOURCE_MAX_LEN, "oversize source skipped");
            continue;
        }

        for _ in 0..opts.samples_per_source {
            let rates = mutation_rates(mode, &mut rng);
            let (target, seed_start) = create_target(&source, &rates, opts.target_len, &mut rng)?;
            records.push(PairRecord {
                source: source.clone(),
                target,
                mode: opts.include_mode.then_some(mode),
                seed_start: opts.include_seed_start.then_some(seed_start),
            });
        }
    }

    if skipped > 0 {
        warn!(skipped, "sources dropped during synthesis");
    }

    if let Some(path) = &opts.store_path {
        store_dataset(&records, path)?;
    }

    Ok(records)
}

/// Writes records as a delimited file with header
/// `source,target[,mode][,seed_start]`; the optional columns appear when the
/// first record carries them.
pub fn store_dataset<P: AsRef<Path>>(records: &[PairRecord], path: P) -> SfResult<()> {
    let with_mode = records.first().is_some_and(|r| r.mode.is_some());
    let with_seed_start = records.first().is_some_and(|r| r.seed_start.is_some());

    let mut wtr = csv::Writer::from_path(path.as_ref())?;

    let mut header = vec!["source", "target"];
    if with_mode {
        header.push("mode");
    }
    if with_seed_start {
        header.push("seed_start");
    }
    wtr.write_record(&header)?;

    for r in records {
        let mut row = vec![r.source.clone(), r.target.clone()];
        if with_mode {
            row.push(r.mode.map(|m| m.to_string()).unwrap_or_default());
        }
        if with_seed_start {
            row.push(r.seed_start.map(|s| s.to_string()).unwrap_or_default());
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;

    debug!(rows = records.len(), path = %path.as_ref().display(), "dataset stored");
    Ok(())
}

/// Reads a dataset back from the format `store_dataset` writes. Malformed
/// rows are skipped with a diagnostic rather than aborting the load.
pub fn load_dataset<P: AsRef<Path>>(path: P) -> SfResult<Vec<PairRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path.as_ref())?;

    let headers = rdr.headers()?.clone();
    let mode_col = headers.iter().position(|h| h == "mode");
    let seed_col = headers.iter().position(|h| h == "seed_start");

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for result in rdr.records() {
        let rec = match result {
            Ok(r) => r,
            Err(e) => {
                skipped += 1;
                debug!(error = %e, "bad csv row");
                continue;
            }
        };
        if rec.len() < 2 {
            skipped += 1;
            continue;
        }

        let mode = match mode_col.and_then(|c| rec.get(c)).filter(|s| !s.is_empty()) {
            Some(s) => match s.parse::<MutationMode>() {
                Ok(m) => Some(m),
                Err(_) => {
                    skipped += 1;
                    warn!(mode = %s, "unknown mutation mode, row skipped");
                    continue;
                }
            },
            None => None,
        };
        let seed_start = seed_col
            .and_then(|c| rec.get(c))
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<usize>().ok());

        records.push(PairRecord {
            source: rec[0].to_string(),
            target: rec[1].to_string(),
            mode,
            seed_start,
        });
    }

    if skipped > 0 {
        warn!(skipped, path = %path.as_ref().display(), "rows skipped while loading dataset");
    }
    Ok(records)
}
