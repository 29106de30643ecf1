//! Crash point generation
//!
//! [`CrashPointGenerator`] is a pure function of a random source: it never
//! owns an RNG, so tests inject a seeded one and check the distribution.
//! [`CrashPointSource`] is what the round engine pulls from once per round.

use crate::common::types::round_cents;
use crate::games::fairness::RoundSeed;
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Shape of the crash point distribution. Both shapes put at least half of
/// the mass below 2x.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrashDistribution {
    /// Start at the minimum and keep multiplying by `growth_factor` until a
    /// Bernoulli(`stop_probability`) draw stops the climb
    Geometric {
        growth_factor: f64,
        stop_probability: f64,
    },
    /// `(1 - house_edge) / (1 - u)` for uniform `u` in `[0, 1)`
    HouseEdge { house_edge: f64 },
}

impl Default for CrashDistribution {
    fn default() -> Self {
        CrashDistribution::Geometric {
            growth_factor: 1.1,
            stop_probability: 0.1,
        }
    }
}

/// Crash point generator bounded to `[min_crash, max_crash]`
#[derive(Debug, Clone, PartialEq)]
pub struct CrashPointGenerator {
    min_crash: f64,
    max_crash: f64,
    distribution: CrashDistribution,
}

impl CrashPointGenerator {
    /// Bounds and parameters must already be validated (see
    /// `AviatorConfig::validate`).
    pub fn new(min_crash: f64, max_crash: f64, distribution: CrashDistribution) -> Self {
        Self {
            min_crash,
            max_crash,
            distribution,
        }
    }

    pub fn min_crash(&self) -> f64 {
        self.min_crash
    }

    pub fn max_crash(&self) -> f64 {
        self.max_crash
    }

    pub fn distribution(&self) -> &CrashDistribution {
        &self.distribution
    }

    /// Draw one crash point
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let raw = match self.distribution {
            CrashDistribution::Geometric {
                growth_factor,
                stop_probability,
            } => {
                let mut point = self.min_crash;
                while point < self.max_crash && !rng.gen_bool(stop_probability) {
                    point *= growth_factor;
                }
                point
            }
            CrashDistribution::HouseEdge { house_edge } => {
                let u: f64 = rng.gen();
                (1.0 - house_edge) / (1.0 - u)
            }
        };
        self.normalize(raw)
    }

    /// Snap a raw value onto the cent grid inside the configured bounds
    pub fn normalize(&self, raw: f64) -> f64 {
        if raw.is_nan() {
            return self.min_crash;
        }
        round_cents(raw).clamp(self.min_crash, self.max_crash)
    }
}

/// One round's crash point, with the seed it was derived from when the
/// source is provably fair
#[derive(Debug, Clone)]
pub struct CrashDraw {
    pub crash_point: f64,
    pub seed: Option<RoundSeed>,
}

/// Per-round crash point supplier used by the engine
pub trait CrashPointSource: Send {
    fn draw(&mut self, round_number: u64) -> CrashDraw;
}

/// Draws a fresh server seed per round and derives the crash point from it
pub struct FairCrashSource<R: RngCore + Send> {
    generator: CrashPointGenerator,
    rng: R,
}

impl<R: RngCore + Send> FairCrashSource<R> {
    pub fn new(generator: CrashPointGenerator, rng: R) -> Self {
        Self { generator, rng }
    }

    pub fn generator(&self) -> &CrashPointGenerator {
        &self.generator
    }
}

impl FairCrashSource<StdRng> {
    /// Seeds from the operating system
    pub fn from_entropy(generator: CrashPointGenerator) -> Self {
        Self::new(generator, StdRng::from_entropy())
    }

    /// Reproducible sequence of rounds
    pub fn seeded(generator: CrashPointGenerator, seed: u64) -> Self {
        Self::new(generator, StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore + Send> CrashPointSource for FairCrashSource<R> {
    fn draw(&mut self, round_number: u64) -> CrashDraw {
        let seed = RoundSeed::generate(&mut self.rng);
        let crash_point = seed.crash_point(&self.generator);
        tracing::debug!(
            round_number,
            seed_hash = %seed.commitment(),
            "Drew round seed"
        );
        CrashDraw {
            crash_point,
            seed: Some(seed),
        }
    }
}

/// Replays a fixed list of crash points, cycling when exhausted
#[derive(Debug, Clone)]
pub struct ScriptedCrashSource {
    points: Vec<f64>,
    next: usize,
}

impl ScriptedCrashSource {
    pub fn new(points: Vec<f64>) -> Self {
        Self { points, next: 0 }
    }
}

impl CrashPointSource for ScriptedCrashSource {
    fn draw(&mut self, _round_number: u64) -> CrashDraw {
        // An empty script crashes every round immediately
        let crash_point = if self.points.is_empty() {
            1.0
        } else {
            let point = self.points[self.next % self.points.len()];
            self.next += 1;
            point
        };
        CrashDraw {
            crash_point,
            seed: None,
        }
    }
}
