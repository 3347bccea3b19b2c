use crate::error::{SeedForgeError, SfResult};

pub const ALPHABET: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Watson-Crick complement of a single base. Inputs are validated by
/// `normalize` before they reach this point; anything else passes through.
#[inline(always)]
pub fn complement(nt: u8) -> u8 {
    match nt {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        other => other,
    }
}

/// True if (a, b) is one of the four Watson-Crick pairings, case-insensitive.
#[inline(always)]
pub fn is_watson_crick(a: u8, b: u8) -> bool {
    matches!(
        (a.to_ascii_uppercase(), b.to_ascii_uppercase()),
        (b'A', b'T') | (b'T', b'A') | (b'G', b'C') | (b'C', b'G')
    )
}

/// Uppercases, maps RNA uracil to thymine and rejects anything outside
/// the nucleotide alphabet.
pub fn normalize(raw: &str) -> SfResult<String> {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c.to_ascii_uppercase() {
            'U' => out.push('T'),
            base @ ('A' | 'C' | 'G' | 'T') => out.push(base),
            other => {
                return Err(SeedForgeError::Validation(format!(
                    "invalid nucleotide '{}' in sequence '{}'",
                    other, raw
                )))
            }
        }
    }
    Ok(out)
}
