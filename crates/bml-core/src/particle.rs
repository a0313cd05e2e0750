//! Particles in plain and series representation.
//!
//! Both carry the same [`Kinematics`] (species mass and reference
//! momentum) and differ only in the coordinate type of their state. The
//! [`PhaseSpace`] trait exposes what propagators need from either.

use std::sync::Arc;

use bml_jet::{Jet, JetEnvironment};
use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::error::ConstructionError;
use crate::phase::{State, DIM, NDP, NPX, NPY};

/// Proton rest energy [GeV].
pub const PROTON_MASS: f64 = 0.938_272_046;
/// Electron rest energy [GeV].
pub const ELECTRON_MASS: f64 = 0.000_510_998_928;
/// `p [GeV/c] / PRH_CONSTANT = B·rho [T·m]`.
pub const PRH_CONSTANT: f64 = 0.299_792_458;

/// Particle species.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Species {
    /// Proton.
    Proton,
    /// Electron.
    Electron,
    /// Positron.
    Positron,
    /// Any other singly charged particle of the given rest energy [GeV].
    Custom {
        /// Rest energy [GeV].
        mass: f64,
    },
}

impl Species {
    /// Rest energy [GeV].
    pub fn mass(self) -> f64 {
        match self {
            Self::Proton => PROTON_MASS,
            Self::Electron | Self::Positron => ELECTRON_MASS,
            Self::Custom { mass } => mass,
        }
    }
}

/// Reference kinematics: species and reference momentum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    species: Species,
    momentum: f64,
}

impl Kinematics {
    /// Reference momentum `p` [GeV/c] for `species`.
    pub fn new(species: Species, momentum: f64) -> Self {
        Self { species, momentum }
    }

    /// Reference kinematics with total energy `energy` [GeV].
    ///
    /// Energies below the rest mass give zero momentum.
    pub fn with_energy(species: Species, energy: f64) -> Self {
        let m = species.mass();
        let p = (energy * energy - m * m).max(0.0).sqrt();
        Self::new(species, p)
    }

    /// Species.
    pub fn species(&self) -> Species {
        self.species
    }

    /// Rest energy [GeV].
    pub fn mass(&self) -> f64 {
        self.species.mass()
    }

    /// Reference momentum [GeV/c].
    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    /// Reference total energy [GeV].
    pub fn energy(&self) -> f64 {
        self.momentum.hypot(self.mass())
    }

    /// Reference `gamma`.
    pub fn gamma(&self) -> f64 {
        self.energy() / self.mass()
    }

    /// Reference `beta`.
    pub fn beta(&self) -> f64 {
        self.momentum / self.energy()
    }

    /// Reference magnetic rigidity [T·m].
    pub fn brho(&self) -> f64 {
        self.momentum / PRH_CONSTANT
    }

    /// Change the reference momentum.
    pub fn set_momentum(&mut self, momentum: f64) {
        self.momentum = momentum;
    }
}

/// What a propagator needs from a particle, independent of representation.
pub trait PhaseSpace {
    /// Coordinate representation.
    type Coord: Coordinate;

    /// The state vector.
    fn state(&self) -> &[Self::Coord; DIM];

    /// The state vector, mutably.
    fn state_mut(&mut self) -> &mut [Self::Coord; DIM];

    /// Reference kinematics.
    fn kinematics(&self) -> &Kinematics;

    /// A constant coordinate.
    fn coord(&self, value: f64) -> Self::Coord;

    /// A strength-like parameter, optionally tied to series variable `index`.
    ///
    /// Plain particles ignore the index. Series particles return
    /// `value + d_index` when their environment has that variable.
    fn parameter(&self, value: f64, index: Option<usize>) -> Self::Coord;

    /// `pz / p_ref` for the current state.
    fn npz(&self) -> Self::Coord {
        let s = self.state();
        let p = s[NDP].clone() + 1.0;
        (p.clone() * p - s[NPX].clone() * s[NPX].clone() - s[NPY].clone() * s[NPY].clone()).sqrt()
    }

    /// Velocity over `c` for the current momentum deviation.
    fn beta(&self) -> Self::Coord {
        let k = self.kinematics();
        let p = (self.state()[NDP].clone() + 1.0) * k.momentum();
        let m = k.mass();
        p.clone() / (p.clone() * p + m * m).sqrt()
    }
}

/// A single particle tracked with plain floating-point coordinates.
///
/// # Examples
///
/// ```
/// use bml_core::Particle;
///
/// let p = Particle::proton_with_energy(5.0);
/// assert!((p.kinematics().energy() - 5.0).abs() < 1e-12);
/// assert!(p.state().iter().all(|&c| c == 0.0));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    kinematics: Kinematics,
    state: State,
}

impl Particle {
    /// A particle on the reference orbit.
    pub fn new(kinematics: Kinematics) -> Self {
        Self {
            kinematics,
            state: [0.0; DIM],
        }
    }

    /// A proton on the reference orbit with total energy `energy` [GeV].
    pub fn proton_with_energy(energy: f64) -> Self {
        Self::new(Kinematics::with_energy(Species::Proton, energy))
    }

    /// A proton on the reference orbit with momentum `momentum` [GeV/c].
    pub fn proton(momentum: f64) -> Self {
        Self::new(Kinematics::new(Species::Proton, momentum))
    }

    /// An electron on the reference orbit with momentum `momentum` [GeV/c].
    pub fn electron(momentum: f64) -> Self {
        Self::new(Kinematics::new(Species::Electron, momentum))
    }

    /// A positron on the reference orbit with momentum `momentum` [GeV/c].
    pub fn positron(momentum: f64) -> Self {
        Self::new(Kinematics::new(Species::Positron, momentum))
    }

    /// Builder-style state replacement.
    pub fn with_state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    /// Reference kinematics.
    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    /// The state vector.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Replace the state vector.
    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    /// Return to the reference orbit.
    pub fn reset_state(&mut self) {
        self.state = [0.0; DIM];
    }
}

impl PhaseSpace for Particle {
    type Coord = f64;

    fn state(&self) -> &State {
        &self.state
    }

    fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    fn coord(&self, value: f64) -> f64 {
        value
    }

    fn parameter(&self, value: f64, _index: Option<usize>) -> f64 {
        value
    }
}

/// A particle whose coordinates are truncated power series.
///
/// Built about a plain particle's state, it starts as the identity map;
/// after propagation its state is the transfer map of everything it
/// passed through, expanded about that starting point.
#[derive(Clone, Debug)]
pub struct JetParticle {
    kinematics: Kinematics,
    state: [Jet; DIM],
}

impl JetParticle {
    /// Identity map of order `order` about `particle`'s state.
    pub fn new(particle: &Particle, order: u32) -> Result<Self, ConstructionError> {
        let env = JetEnvironment::new(DIM, order, particle.state())
            .map_err(|e| ConstructionError::new("JetParticle::new", e.into()))?;
        Self::with_environment(particle.kinematics, &env)
    }

    /// Identity map in a caller-supplied environment.
    ///
    /// The environment needs at least six variables; the first six are
    /// the phase-space coordinates, any further ones are parameters
    /// reachable through [`PhaseSpace::parameter`].
    pub fn with_environment(
        kinematics: Kinematics,
        env: &Arc<JetEnvironment>,
    ) -> Result<Self, ConstructionError> {
        let variable = |i: usize| {
            Jet::variable(env, i)
                .map_err(|e| ConstructionError::new("JetParticle::with_environment", e.into()))
        };
        let state = [
            variable(0)?,
            variable(1)?,
            variable(2)?,
            variable(3)?,
            variable(4)?,
            variable(5)?,
        ];
        Ok(Self { kinematics, state })
    }

    /// Reference kinematics.
    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    /// The series state.
    pub fn state(&self) -> &[Jet; DIM] {
        &self.state
    }

    /// The environment shared by the state.
    pub fn env(&self) -> &Arc<JetEnvironment> {
        self.state[0].env()
    }

    /// Standard parts as a plain particle.
    pub fn to_particle(&self) -> Particle {
        let mut state = [0.0; DIM];
        for (dst, jet) in state.iter_mut().zip(&self.state) {
            *dst = jet.standard_part();
        }
        Particle::new(self.kinematics).with_state(state)
    }

    /// Linear part of the map: `m[i][j] = d state_i / d z_j`.
    pub fn jacobian(&self) -> [[f64; DIM]; DIM] {
        let mut m = [[0.0; DIM]; DIM];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = self.state[i].derivative(j);
            }
        }
        m
    }
}

impl PhaseSpace for JetParticle {
    type Coord = Jet;

    fn state(&self) -> &[Jet; DIM] {
        &self.state
    }

    fn state_mut(&mut self) -> &mut [Jet; DIM] {
        &mut self.state
    }

    fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    fn coord(&self, value: f64) -> Jet {
        Jet::constant(self.env(), value)
    }

    fn parameter(&self, value: f64, index: Option<usize>) -> Jet {
        let base = Jet::constant(self.env(), value);
        match index.map(|i| Jet::delta(self.env(), i)) {
            Some(Ok(delta)) => base + delta,
            _ => base,
        }
    }
}
