//! A single seeded source of randomness for the whole simulation.
//!
//! Determinism requires one logical PRNG stream consumed in a fixed order, so
//! the pool wraps exactly one [`StdRng`] and every stochastic decision in the
//! engine goes through it. Two runs with the same seed and inputs draw the
//! same sequence on the same platform.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma, LogNormal};

/// Seeded PRNG with the sampling primitives the model needs: uniform,
/// lognormal, gamma parameterised by mean and coefficient of variation, and
/// Bernoulli draws.
pub struct RandomPool {
    rng: StdRng,
}

impl RandomPool {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        RandomPool {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform draw from `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform integer from `[0, len)`. `len` must be nonzero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Bernoulli draw. Probabilities outside `[0, 1]` are clamped.
    pub fn chance(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.rng.gen_bool(p)
    }

    /// Lognormal draw with the given location and scale on the log axis.
    pub fn lognormal(&mut self, mu: f64, sigma: f64) -> f64 {
        let distribution = LogNormal::new(mu, sigma).unwrap();
        distribution.sample(&mut self.rng)
    }

    /// Gamma draw parameterised by mean and coefficient of variation.
    ///
    /// shape k = 1 / cv², scale θ = mean · cv², so that kθ = mean and
    /// 1/√k = cv.
    pub fn gamma(&mut self, mean: f64, cv: f64) -> f64 {
        if mean <= 0.0 {
            return 0.0;
        }
        let shape = 1.0 / (cv * cv);
        let scale = mean * cv * cv;
        let distribution = Gamma::new(shape, scale).unwrap();
        distribution.sample(&mut self.rng)
    }

    /// Fisher-Yates shuffle through the shared stream.
    pub fn shuffle<T>(&mut self, values: &mut [T]) {
        values.shuffle(&mut self.rng);
    }
}
