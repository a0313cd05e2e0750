//! Ensembles of independent particles.
//!
//! Propagation of a bunch is a loop over its members; no collective
//! effect couples them. Seeded generation uses a ChaCha8 RNG so equal
//! seeds give identical bunches.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::particle::{Kinematics, Particle};
use crate::phase::{State, DIM};

/// An ordered set of particles sharing one reference.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleBunch {
    kinematics: Kinematics,
    particles: Vec<Particle>,
}

impl ParticleBunch {
    /// An empty bunch.
    pub fn new(kinematics: Kinematics) -> Self {
        Self {
            kinematics,
            particles: Vec::new(),
        }
    }

    /// `count` particles with independent Gaussian coordinates of RMS `sigmas`
    /// about `centre`, drawn from a ChaCha8 stream seeded with `seed`.
    pub fn gaussian(kinematics: Kinematics, centre: State, sigmas: State, count: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let particles = (0..count)
            .map(|_| {
                let mut state = centre;
                for (s, sigma) in state.iter_mut().zip(sigmas) {
                    *s += sigma * Self::box_muller(&mut rng);
                }
                Particle::new(kinematics).with_state(state)
            })
            .collect();
        Self {
            kinematics,
            particles,
        }
    }

    /// Gaussian sample by Box-Muller, without pulling in `rand_distr`.
    fn box_muller(rng: &mut ChaCha8Rng) -> f64 {
        let u1: f64 = rng.gen::<f64>().max(1e-300);
        let u2: f64 = rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Reference kinematics.
    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    /// Add a particle with state `state`.
    pub fn push(&mut self, state: State) {
        self.particles.push(Particle::new(self.kinematics).with_state(state));
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Whether the bunch is empty.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// The particles.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// The particles, mutably.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Mean state; zeros for an empty bunch.
    pub fn centroid(&self) -> State {
        let mut sum = [0.0; DIM];
        if self.particles.is_empty() {
            return sum;
        }
        for p in &self.particles {
            for (acc, v) in sum.iter_mut().zip(p.state()) {
                *acc += v;
            }
        }
        let n = self.particles.len() as f64;
        sum.map(|s| s / n)
    }

    /// Remove the particles at `indices` (any order, duplicates ignored).
    pub fn remove(&mut self, indices: &[usize]) {
        let mut keep = vec![true; self.particles.len()];
        for &i in indices {
            if let Some(k) = keep.get_mut(i) {
                *k = false;
            }
        }
        let mut flags = keep.into_iter();
        self.particles.retain(|_| flags.next().unwrap_or(true));
    }
}
