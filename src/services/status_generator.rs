//! Synthetic flight status codes for simulated oracles.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::StatusCode;

/// Draw one status code, each of the six with probability 1/6.
pub fn generate() -> StatusCode {
    generate_with(&mut rand::thread_rng())
}

/// Same as [`generate`] with a caller supplied RNG.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> StatusCode {
    // Pick straight from the table; never scale the sample into a code.
    *StatusCode::ALL
        .choose(rng)
        .unwrap_or(&StatusCode::Unknown)
}
