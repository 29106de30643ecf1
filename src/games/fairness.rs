//! Provably fair round seeds
//!
//! Every round draws a 32-byte server seed. Its SHA-256 is published when
//! the round opens for bets and the seed itself is revealed at the crash, so anyone
//! can recompute the crash point from the seed and check it against the
//! commitment.

use crate::games::crash_point::CrashPointGenerator;
use crate::games::types::RoundSummary;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

/// Fairness verification failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FairnessError {
    #[error("Invalid seed hex: {0}")]
    InvalidSeed(String),

    #[error("Seed must be 32 bytes, got {0}")]
    InvalidSeedLength(usize),

    #[error("Round {0} has no revealed seed")]
    SeedNotRevealed(u64),
}

/// Server seed for one round
#[derive(Clone, PartialEq, Eq)]
pub struct RoundSeed([u8; 32]);

impl RoundSeed {
    pub fn generate<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(seed_hex: &str) -> Result<Self, FairnessError> {
        let bytes = hex::decode(seed_hex.trim())
            .map_err(|e| FairnessError::InvalidSeed(e.to_string()))?;
        let len = bytes.len();
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| FairnessError::InvalidSeedLength(len))?;
        Ok(Self(array))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Hex SHA-256 of the seed, published before the outcome is known
    pub fn commitment(&self) -> String {
        hex::encode(Sha256::digest(self.0))
    }

    /// Deterministic stream the crash point is drawn from
    pub fn rng(&self) -> ChaCha20Rng {
        ChaCha20Rng::from_seed(self.0)
    }

    pub fn crash_point(&self, generator: &CrashPointGenerator) -> f64 {
        generator.generate(&mut self.rng())
    }
}

// The seed stays secret until the crash; keep it out of debug output.
impl std::fmt::Debug for RoundSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RoundSeed({})", self.commitment())
    }
}

/// Outcome of checking a revealed round
#[derive(Debug, Clone, PartialEq)]
pub struct FairnessVerdict {
    pub commitment_matches: bool,
    pub computed_crash_point: f64,
    pub crash_point_matches: bool,
}

impl FairnessVerdict {
    pub fn is_valid(&self) -> bool {
        self.commitment_matches && self.crash_point_matches
    }
}

/// Recompute a round from its revealed seed
pub fn verify_round(
    server_seed_hex: &str,
    seed_hash_hex: &str,
    claimed_crash_point: f64,
    generator: &CrashPointGenerator,
) -> Result<FairnessVerdict, FairnessError> {
    let seed = RoundSeed::from_hex(server_seed_hex)?;
    let computed_crash_point = seed.crash_point(generator);

    Ok(FairnessVerdict {
        commitment_matches: seed.commitment().eq_ignore_ascii_case(seed_hash_hex.trim()),
        computed_crash_point,
        crash_point_matches: computed_crash_point == generator.normalize(claimed_crash_point),
    })
}

/// Verify a history entry
pub fn verify_summary(
    summary: &RoundSummary,
    generator: &CrashPointGenerator,
) -> Result<FairnessVerdict, FairnessError> {
    match (&summary.server_seed, &summary.seed_hash) {
        (Some(seed), Some(hash)) => verify_round(seed, hash, summary.crash_point, generator),
        _ => Err(FairnessError::SeedNotRevealed(summary.round_number)),
    }
}
