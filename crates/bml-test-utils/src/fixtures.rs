//! Propagators for exercising line plumbing without physics.
//!
//! - [`RecordingPropagator`] counts calls and otherwise does nothing.
//! - [`ShiftPropagator`] adds a constant to one coordinate.
//! - [`FailingPropagator`] loses the particle after N calls.

use std::cell::Cell;

use bml_beamline::{ElementKind, LeafElement, Propagator};
use bml_core::{JetParticle, Particle, PhaseSpace, PropagationError};

/// Counts how many times it was asked to track, in either mode.
///
/// Accepts every kind, so it can stand in for any binding.
#[derive(Debug, Default)]
pub struct RecordingPropagator {
    plain: Cell<usize>,
    jet: Cell<usize>,
}

impl RecordingPropagator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain-particle calls so far.
    pub fn plain_calls(&self) -> usize {
        self.plain.get()
    }

    /// Series-particle calls so far.
    pub fn jet_calls(&self) -> usize {
        self.jet.get()
    }
}

impl Propagator for RecordingPropagator {
    fn name(&self) -> &str {
        "recording"
    }

    fn accepts(&self, _kind: ElementKind) -> bool {
        true
    }

    fn propagate(&self, _element: &LeafElement, _particle: &mut Particle) -> Result<(), PropagationError> {
        self.plain.set(self.plain.get() + 1);
        Ok(())
    }

    fn propagate_jet(
        &self,
        _element: &LeafElement,
        _particle: &mut JetParticle,
    ) -> Result<(), PropagationError> {
        self.jet.set(self.jet.get() + 1);
        Ok(())
    }
}

/// Adds `amount` to coordinate `index` on every pass.
#[derive(Clone, Copy, Debug)]
pub struct ShiftPropagator {
    pub index: usize,
    pub amount: f64,
}

impl ShiftPropagator {
    pub fn new(index: usize, amount: f64) -> Self {
        Self { index, amount }
    }
}

impl Propagator for ShiftPropagator {
    fn name(&self) -> &str {
        "shift"
    }

    fn accepts(&self, _kind: ElementKind) -> bool {
        true
    }

    fn propagate(&self, _element: &LeafElement, particle: &mut Particle) -> Result<(), PropagationError> {
        particle.state_mut()[self.index] += self.amount;
        Ok(())
    }

    fn propagate_jet(
        &self,
        _element: &LeafElement,
        particle: &mut JetParticle,
    ) -> Result<(), PropagationError> {
        let shifted = particle.state()[self.index].clone() + self.amount;
        particle.state_mut()[self.index] = shifted;
        Ok(())
    }
}

/// Succeeds `succeed_count` times, then reports the particle lost.
#[derive(Debug)]
pub struct FailingPropagator {
    pub succeed_count: usize,
    calls: Cell<usize>,
}

impl FailingPropagator {
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            calls: Cell::new(0),
        }
    }

    /// How many times tracking was attempted.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    fn tick(&self, element: &LeafElement, x: f64, y: f64) -> Result<(), PropagationError> {
        let n = self.calls.get();
        self.calls.set(n + 1);
        if n >= self.succeed_count {
            return Err(PropagationError::ParticleLost {
                element: element.name().to_owned(),
                x,
                y,
            });
        }
        Ok(())
    }
}

impl Propagator for FailingPropagator {
    fn name(&self) -> &str {
        "failing"
    }

    fn accepts(&self, _kind: ElementKind) -> bool {
        true
    }

    fn propagate(&self, element: &LeafElement, particle: &mut Particle) -> Result<(), PropagationError> {
        let s = particle.state();
        self.tick(element, s[0], s[1])
    }

    fn propagate_jet(
        &self,
        element: &LeafElement,
        particle: &mut JetParticle,
    ) -> Result<(), PropagationError> {
        let s = particle.state();
        self.tick(element, s[0].standard_part(), s[1].standard_part())
    }
}
