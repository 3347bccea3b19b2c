use fastrand::Rng;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Mutation vectors always cover the maximal source length.
pub const MUTATION_VECTOR_LEN: usize = 22;

/// Named policy controlling the per-position substitution probability used
/// when synthesizing a target around a source sequence.
///
/// Parsing an unknown mode name is an error; there is deliberately no silent
/// "no restriction" fallback.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MutationMode {
    /// Seed region (positions 2-7) fully conserved, everything else scrambled.
    CanonicalPerfect,
    /// Seed region mutates at 20%, everything else scrambled.
    Canonical20,
    /// One conserved window in the head, one weakly conserved window in the
    /// tail, both placed at random.
    NonCanonical,
    /// Every position fully mutable.
    Noise,
}

/// Builds the per-position substitution probability vector for a mode.
///
/// `NonCanonical` draws its window placement from `rng`, so two calls with
/// the same mode agree only when the rng state does.
pub fn mutation_rates(mode: MutationMode, rng: &mut Rng) -> [f32; MUTATION_VECTOR_LEN] {
    let mut rates = [1.0f32; MUTATION_VECTOR_LEN];

    match mode {
        MutationMode::CanonicalPerfect => {
            for r in &mut rates[2..8] {
                *r = 0.0;
            }
        }
        MutationMode::Canonical20 => {
            for r in &mut rates[2..8] {
                *r = 0.2;
            }
        }
        MutationMode::NonCanonical => {
            let head = rng.usize(0..=6);
            for r in &mut rates[head..head + 4] {
                *r = 0.0;
            }
            // Tail window start 12..=15, run 4..=6: stays within the vector.
            let tail = rng.usize(12..=15);
            let run = rng.usize(4..=6);
            for r in &mut rates[tail..tail + run] {
                *r = 0.2;
            }
        }
        MutationMode::Noise => {}
    }

    rates
}
