//! Uncertainty injection for the blended score.
//!
//! The engine adds a small uniform offset so near-identical inputs do not
//! always produce identical, overconfident prices. The source is a trait
//! object so tests and reproducible runs can swap it out.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::errors::{EngineResult, OddsError};

/// Default half-width of the uncertainty band (5% total).
pub const DEFAULT_HALF_WIDTH: f64 = 0.025;

pub trait UncertaintySource: Send + Sync {
    /// Offset added to player1's score. Must lie in [-half_width, half_width].
    fn draw(&self) -> f64;

    fn half_width(&self) -> f64;
}

/// Uniform noise from the thread-local RNG.
#[derive(Debug, Clone, Copy)]
pub struct UniformNoise {
    half_width: f64,
}

impl UniformNoise {
    pub fn new(half_width: f64) -> EngineResult<Self> {
        check_half_width(half_width)?;
        Ok(UniformNoise { half_width })
    }
}

impl Default for UniformNoise {
    fn default() -> Self {
        UniformNoise {
            half_width: DEFAULT_HALF_WIDTH,
        }
    }
}

impl UncertaintySource for UniformNoise {
    fn draw(&self) -> f64 {
        rand::thread_rng().gen_range(-self.half_width..=self.half_width)
    }

    fn half_width(&self) -> f64 {
        self.half_width
    }
}

/// Uniform noise from a seeded generator, for reproducible runs.
pub struct SeededNoise {
    half_width: f64,
    rng: Mutex<StdRng>,
}

impl SeededNoise {
    pub fn new(half_width: f64, seed: u64) -> EngineResult<Self> {
        check_half_width(half_width)?;
        Ok(SeededNoise {
            half_width,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        })
    }
}

impl UncertaintySource for SeededNoise {
    fn draw(&self) -> f64 {
        // A poisoned lock only means another draw panicked; the RNG state is still usable.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(-self.half_width..=self.half_width)
    }

    fn half_width(&self) -> f64 {
        self.half_width
    }
}

/// Deterministic source that never perturbs the score.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNoise;

impl UncertaintySource for NoNoise {
    fn draw(&self) -> f64 {
        0.0
    }

    fn half_width(&self) -> f64 {
        0.0
    }
}

fn check_half_width(half_width: f64) -> EngineResult<()> {
    if !half_width.is_finite() || half_width <= 0.0 {
        return Err(OddsError::InvalidConfig(format!(
            "noise half-width must be positive and finite, got {}",
            half_width
        )));
    }
    Ok(())
}
