//! Element construction with the configured propagators bound.
//!
//! [`ElementFactory`] is the usual way to build leaves: it owns one
//! shared instance of each propagator selected by a [`TrackingConfig`]
//! and hands the right one to every element it builds, so that all
//! drifts of a lattice share a single binding.

use std::rc::Rc;

use bml_beamline::{
    Beamline, ElementBuilder, ElementData, ElementKind, Geometry, IdentityPropagator,
    LeafElement, Propagator, SlotPropagator, SubLinePropagator,
};
use bml_core::{ConstructionError, Frame};

use crate::bend::{RbendLinear, SbendLinear};
use crate::config::{BendModel, ConfigError, DriftModel, QuadModel, TrackingConfig};
use crate::drift::{ExactDrift, MadDrift};
use crate::kick::CorrectorKick;
use crate::marker::{MarkerPropagator, SRotation};
use crate::monitor::MonitorPropagator;
use crate::multipole::{SextupoleKick, ThinSextupoleKick};
use crate::quadrupole::{LinearQuad, MultiKickQuad, ThinQuadKick};

/// Builds leaf elements bound to the propagators of one [`TrackingConfig`].
///
/// # Examples
///
/// ```
/// use bml_beamline::Beamline;
/// use bml_propagators::{ElementFactory, TrackingConfig};
///
/// let f = ElementFactory::new(TrackingConfig::default()).unwrap();
/// let mut line = Beamline::new("FODO");
/// line.append(f.quadrupole("QF", 0.5, 1.3).unwrap());
/// line.append(f.drift("D", 2.0).unwrap());
/// line.append(f.quadrupole("QD", 0.5, -1.3).unwrap());
/// assert_eq!(line.length(), 3.0);
/// ```
#[derive(Debug)]
pub struct ElementFactory {
    config: TrackingConfig,
    drift: Rc<dyn Propagator>,
    quadrupole: Rc<dyn Propagator>,
    sbend: Rc<dyn Propagator>,
    rbend: Rc<dyn Propagator>,
    monitor: Rc<dyn Propagator>,
    thin_quad: Rc<dyn Propagator>,
    sextupole: Rc<dyn Propagator>,
    thin_sextupole: Rc<dyn Propagator>,
    corrector: Rc<dyn Propagator>,
    marker: Rc<dyn Propagator>,
    srot: Rc<dyn Propagator>,
    slot: Rc<dyn Propagator>,
    sub_line: Rc<dyn Propagator>,
    identity: Rc<dyn Propagator>,
}

/// Drift propagator for a model.
pub(crate) fn drift_propagator(model: DriftModel) -> Rc<dyn Propagator> {
    match model {
        DriftModel::Exact => Rc::new(ExactDrift),
        DriftModel::Mad => Rc::new(MadDrift),
    }
}

/// Thick-quadrupole propagator for a model.
pub(crate) fn quad_propagator(model: QuadModel) -> Rc<dyn Propagator> {
    match model {
        QuadModel::Linear => Rc::new(LinearQuad),
        QuadModel::MultiKick { kicks } => Rc::new(MultiKickQuad::new(kicks)),
    }
}

impl ElementFactory {
    /// Validate `config` and instantiate its propagators.
    pub fn new(config: TrackingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (sbend, rbend): (Rc<dyn Propagator>, Rc<dyn Propagator>) = match config.bend {
            BendModel::Linear => (Rc::new(SbendLinear), Rc::new(RbendLinear)),
        };
        Ok(Self {
            config,
            drift: drift_propagator(config.drift),
            quadrupole: quad_propagator(config.quadrupole),
            sbend,
            rbend,
            monitor: Rc::new(MonitorPropagator),
            thin_quad: Rc::new(ThinQuadKick),
            sextupole: Rc::new(SextupoleKick),
            thin_sextupole: Rc::new(ThinSextupoleKick),
            corrector: Rc::new(CorrectorKick),
            marker: Rc::new(MarkerPropagator),
            srot: Rc::new(SRotation),
            slot: Rc::new(SlotPropagator),
            sub_line: Rc::new(SubLinePropagator),
            identity: Rc::new(IdentityPropagator),
        })
    }

    /// The configuration this factory was built from.
    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// The shared propagator bound to elements of `kind`.
    ///
    /// Sectors carry their own map and nested lines have no propagator;
    /// both get the identity binding.
    pub fn propagator_for(&self, kind: ElementKind) -> Rc<dyn Propagator> {
        let p = match kind {
            ElementKind::Drift => &self.drift,
            ElementKind::Quadrupole => &self.quadrupole,
            ElementKind::Sbend => &self.sbend,
            ElementKind::Rbend => &self.rbend,
            ElementKind::Monitor | ElementKind::HMonitor | ElementKind::VMonitor => &self.monitor,
            ElementKind::ThinQuad => &self.thin_quad,
            ElementKind::Sextupole => &self.sextupole,
            ElementKind::ThinSextupole => &self.thin_sextupole,
            ElementKind::HKick | ElementKind::VKick => &self.corrector,
            ElementKind::Marker => &self.marker,
            ElementKind::Srot => &self.srot,
            ElementKind::Slot => &self.slot,
            ElementKind::CombinedFunction => &self.sub_line,
            ElementKind::Sector | ElementKind::Beamline => &self.identity,
        };
        Rc::clone(p)
    }

    /// A builder for `kind` with the configured propagator already bound.
    pub fn builder(&self, kind: ElementKind, name: impl Into<String>) -> ElementBuilder {
        ElementBuilder::new(kind, name).propagator(self.propagator_for(kind))
    }

    /// Field-free straight section.
    pub fn drift(&self, name: &str, length: f64) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::Drift, name).length(length).build()
    }

    /// Zero-length marker.
    pub fn marker(&self, name: &str) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::Marker, name).build()
    }

    /// Thick quadrupole with gradient `gradient` [T/m].
    pub fn quadrupole(
        &self,
        name: &str,
        length: f64,
        gradient: f64,
    ) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::Quadrupole, name)
            .length(length)
            .strength(gradient)
            .build()
    }

    /// Thin quadrupole with integrated gradient `integrated` [T].
    pub fn thin_quad(&self, name: &str, integrated: f64) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::ThinQuad, name).strength(integrated).build()
    }

    /// Thick sextupole with `B''` = `strength` [T/m²].
    pub fn sextupole(
        &self,
        name: &str,
        length: f64,
        strength: f64,
    ) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::Sextupole, name)
            .length(length)
            .strength(strength)
            .build()
    }

    /// Thin sextupole with integrated `B''` [T/m].
    pub fn thin_sextupole(
        &self,
        name: &str,
        integrated: f64,
    ) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::ThinSextupole, name)
            .strength(integrated)
            .build()
    }

    /// Horizontal corrector kicking by `kick` [rad].
    pub fn hkick(&self, name: &str, length: f64, kick: f64) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::HKick, name)
            .length(length)
            .strength(kick)
            .build()
    }

    /// Vertical corrector kicking by `kick` [rad].
    pub fn vkick(&self, name: &str, length: f64, kick: f64) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::VKick, name)
            .length(length)
            .strength(kick)
            .build()
    }

    /// Two-plane monitor.
    pub fn monitor(&self, name: &str, length: f64) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::Monitor, name).length(length).build()
    }

    /// Horizontal monitor.
    pub fn hmonitor(&self, name: &str, length: f64) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::HMonitor, name).length(length).build()
    }

    /// Vertical monitor.
    pub fn vmonitor(&self, name: &str, length: f64) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::VMonitor, name).length(length).build()
    }

    /// Sector bend of arc length `length`, field `field` [T] and bend `angle`.
    pub fn sbend(
        &self,
        name: &str,
        length: f64,
        field: f64,
        angle: f64,
    ) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::Sbend, name)
            .length(length)
            .strength(field)
            .geometry(Geometry::Arc { angle })
            .build()
    }

    /// Rectangular bend of chord `length`, field `field` [T] and bend `angle`.
    pub fn rbend(
        &self,
        name: &str,
        length: f64,
        field: f64,
        angle: f64,
    ) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::Rbend, name)
            .length(length)
            .strength(field)
            .geometry(Geometry::Chord { angle })
            .build()
    }

    /// Rotation about the beam axis by `angle` [rad].
    pub fn srot(&self, name: &str, angle: f64) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::Srot, name).strength(angle).build()
    }

    /// Slot whose exit face is `exit` in the entry frame.
    pub fn slot(&self, name: &str, exit: Frame) -> Result<LeafElement, ConstructionError> {
        self.builder(ElementKind::Slot, name)
            .length(exit.distance())
            .geometry(Geometry::Patch { exit })
            .build()
    }

    /// Composite element tracking through `parts`, with `active` naming
    /// the part that takes over strength changes.
    pub fn combined_function(
        &self,
        name: &str,
        parts: Beamline,
        active: Option<usize>,
    ) -> Result<LeafElement, ConstructionError> {
        let length = parts.length();
        self.builder(ElementKind::CombinedFunction, name)
            .length(length)
            .sub_line(parts, active)
            .build()
    }

    /// Rebuild an element from a persisted record.
    pub fn from_data(&self, data: &ElementData) -> Result<LeafElement, ConstructionError> {
        let kind = data.element_kind()?;
        data.builder()?.propagator(self.propagator_for(kind)).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bml_core::phase::NPX;
    use bml_core::{ConstructionFault, Particle};

    fn factory() -> ElementFactory {
        ElementFactory::new(TrackingConfig::default()).unwrap()
    }

    #[test]
    fn every_kind_gets_a_compatible_propagator() {
        let f = factory();
        for kind in ElementKind::ALL {
            assert!(f.propagator_for(kind).accepts(kind), "{kind:?}");
        }
    }

    #[test]
    fn drifts_share_one_binding() {
        let f = factory();
        let a = f.drift("A", 1.0).unwrap();
        let b = f.drift("B", 2.0).unwrap();
        assert!(Rc::ptr_eq(a.propagator(), b.propagator()));
        assert_eq!(a.propagator().name(), "drift_exact");
    }

    #[test]
    fn config_selects_models() {
        let f = ElementFactory::new(TrackingConfig {
            drift: DriftModel::Mad,
            quadrupole: QuadModel::Linear,
            ..TrackingConfig::default()
        })
        .unwrap();
        assert_eq!(f.drift("D", 1.0).unwrap().propagator().name(), "drift_mad");
        assert_eq!(
            f.quadrupole("Q", 1.0, 1.0).unwrap().propagator().name(),
            "quadrupole_linear"
        );
    }

    #[test]
    fn invalid_config_is_refused() {
        let err = ElementFactory::new(TrackingConfig {
            quadrupole: QuadModel::MultiKick { kicks: 0 },
            ..TrackingConfig::default()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::ZeroKicks);
    }

    #[test]
    fn negative_length_is_a_construction_error() {
        let err = factory().drift("D", -1.0).unwrap_err();
        assert_eq!(err.fault, ConstructionFault::NegativeLength(-1.0));
    }

    #[test]
    fn bends_carry_their_angle() {
        let f = factory();
        assert_eq!(f.sbend("B", 2.0, 0.5, 0.1).unwrap().bend_angle(), 0.1);
        assert_eq!(f.rbend("R", 2.0, 0.5, 0.2).unwrap().bend_angle(), 0.2);
    }

    #[test]
    fn slot_length_is_the_face_distance() {
        let s = factory().slot("S", Frame::straight(1.5)).unwrap();
        assert_eq!(s.length(), 1.5);
    }

    #[test]
    fn combined_function_tracks_its_parts() {
        let f = factory();
        let mut parts = Beamline::new("parts");
        parts.append(f.drift("D1", 0.25).unwrap());
        parts.append(f.thin_quad("K", 0.5).unwrap());
        parts.append(f.drift("D2", 0.25).unwrap());
        let cf = f.combined_function("CF", parts, Some(1)).unwrap();
        assert_eq!(cf.length(), 0.5);

        let mut a = Particle::proton(10.0).with_state([1e-3, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let mut b = a.clone();
        cf.propagate(&mut a).unwrap();
        for e in cf.sub_line().unwrap() {
            e.borrow().propagate(&mut b).unwrap();
        }
        assert_eq!(a.state(), b.state());
        assert!(a.state()[NPX] < 0.0);
    }

    #[test]
    fn from_data_round_trip() {
        let f = factory();
        let q = f.quadrupole("Q", 0.5, 1.3).unwrap();
        let back = f.from_data(&q.to_data()).unwrap();
        assert_eq!(back.name(), "Q");
        assert_eq!(back.kind(), ElementKind::Quadrupole);
        assert_eq!(back.strength(), 1.3);
        assert!(Rc::ptr_eq(back.propagator(), q.propagator()));
    }
}
