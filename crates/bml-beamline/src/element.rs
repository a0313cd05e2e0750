//! Elements: leaves bound to a propagator, or nested lines.
//!
//! ```text
//! ElmPtr ── Rc<RefCell<Element>>   (cloning the handle aliases)
//! Element
//! ├── Leaf(LeafElement)   physical parameters + Rc<dyn Propagator>
//! │                       optional sub-line with one active part
//! └── Line(Beamline)      ordered child handles
//! ```
//!
//! The same handle may sit in several lines at once; a strength or
//! alignment change made through one is visible through all of them.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use bml_core::phase::{DIM, X, Y};
use bml_core::{
    Alignment, Aperture, BarnacleList, ConstructionError, ConstructionFault, Coordinate, EditError,
    Frame, JetParticle, Particle, PhaseSpace, PropagationError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::beamline::Beamline;
use crate::kind::{ElementKind, StrengthScaling};
use crate::propagator::Propagator;
use crate::visitor::Visitor;

/// Shape of an element's reference trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// Straight; orbit length equals length.
    Straight,
    /// Circular arc; length is the arc length.
    Arc {
        /// Bend angle [rad].
        angle: f64,
    },
    /// Circular arc measured by its chord; length is the chord.
    Chord {
        /// Bend angle [rad].
        angle: f64,
    },
    /// Free-space patch ending on an arbitrary face.
    Patch {
        /// Exit face relative to the entrance face.
        exit: Frame,
    },
}

impl Geometry {
    /// Bend angle, zero for straight sections and patches.
    pub fn bend_angle(&self) -> f64 {
        match *self {
            Self::Arc { angle } | Self::Chord { angle } => angle,
            Self::Straight | Self::Patch { .. } => 0.0,
        }
    }
}

// ── LeafElement ─────────────────────────────────────────────────

/// A physical element with its own propagator.
pub struct LeafElement {
    name: String,
    kind: ElementKind,
    flavor: String,
    length: f64,
    strength: f64,
    strength_index: Option<usize>,
    aperture: Option<Aperture>,
    alignment: Option<Alignment>,
    i_to_field: f64,
    shunt: f64,
    geometry: Geometry,
    ct_ref: f64,
    sub_line: Option<Box<Beamline>>,
    active_part: Option<ElmPtr>,
    barnacles: BarnacleList,
    propagator: Rc<dyn Propagator>,
}

impl LeafElement {
    /// Element name; not required to be unique.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Change the name.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Element family.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Type tag string.
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// See [`ElementKind::is_type`].
    pub fn is_type(&self, name: &str) -> bool {
        self.kind.is_type(name)
    }

    /// Sub-variant bookkeeping string.
    pub fn flavor(&self) -> &str {
        &self.flavor
    }

    /// Set the flavor string.
    pub fn set_flavor(&mut self, flavor: impl Into<String>) {
        self.flavor = flavor.into();
    }

    /// Length [m].
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Change the length, keeping the element's length invariants.
    pub fn set_length(&mut self, length: f64) -> Result<(), ConstructionError> {
        check_length(self.kind, length)?;
        self.length = length;
        if let Geometry::Patch { .. } = self.geometry {
            self.geometry = Geometry::Patch {
                exit: Frame::straight(length),
            };
        }
        Ok(())
    }

    /// Whether the element has zero length.
    pub fn is_thin(&self) -> bool {
        self.length == 0.0
    }

    /// Strength; meaning depends on the kind.
    pub fn strength(&self) -> f64 {
        self.strength
    }

    /// Series variable the strength is tied to, if any.
    pub fn strength_index(&self) -> Option<usize> {
        self.strength_index
    }

    /// Set the strength, net of the shunt contribution.
    ///
    /// A composite element also passes the value to its active part,
    /// integrated over this element's length when the part is thin.
    pub fn set_strength(&mut self, value: f64) {
        self.strength = value - self.shunt * self.i_to_field;
        if let Some(active) = &self.active_part {
            let mut part = active.borrow_mut();
            let delegated = if part.length() == 0.0 {
                value * self.length
            } else {
                value
            };
            part.set_strength(delegated);
        }
    }

    /// Set the strength and tie it to series variable `index`.
    pub fn set_strength_indexed(&mut self, value: f64, index: usize) {
        self.set_strength(value);
        self.strength_index = Some(index);
    }

    /// Untie the strength from any series variable.
    pub fn clear_strength_index(&mut self) {
        self.strength_index = None;
    }

    /// Current-to-field conversion factor.
    pub fn i_to_field(&self) -> f64 {
        self.i_to_field
    }

    /// Set the current-to-field conversion factor.
    pub fn set_i_to_field(&mut self, factor: f64) {
        self.i_to_field = factor;
    }

    /// Current implied by the strength.
    pub fn current(&self) -> f64 {
        self.strength / self.i_to_field
    }

    /// Set the strength from a current.
    pub fn set_current(&mut self, current: f64) {
        self.set_strength((current - self.shunt) * self.i_to_field);
    }

    /// Shunt current.
    pub fn shunt(&self) -> f64 {
        self.shunt
    }

    /// Change the shunt current, moving the strength by the difference.
    pub fn set_shunt(&mut self, shunt: f64) {
        self.strength += (self.shunt - shunt) * self.i_to_field;
        self.shunt = shunt;
    }

    /// Aperture, if any.
    pub fn aperture(&self) -> Option<&Aperture> {
        self.aperture.as_ref()
    }

    /// Whether an aperture is set.
    pub fn has_aperture(&self) -> bool {
        self.aperture.is_some()
    }

    /// Replace or remove the aperture.
    pub fn set_aperture(&mut self, aperture: Option<Aperture>) {
        self.aperture = aperture;
    }

    /// Misalignment, if any. Never a null alignment.
    pub fn alignment(&self) -> Option<&Alignment> {
        self.alignment.as_ref()
    }

    /// Replace the misalignment; a null alignment clears it.
    ///
    /// Returns false, leaving the element unchanged, for kinds that do
    /// not accept a misalignment.
    pub fn set_alignment(&mut self, alignment: Alignment) -> bool {
        if !self.kind.may_misalign() {
            warn!(element = %self.name, kind = self.type_name(), "misalignment refused");
            return false;
        }
        self.alignment = (!alignment.is_null()).then_some(alignment);
        true
    }

    /// Reference trajectory shape.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Bend angle [rad].
    pub fn bend_angle(&self) -> f64 {
        self.geometry.bend_angle()
    }

    /// `cdt` the reference particle accumulates here, removed by the propagator.
    pub fn reference_time(&self) -> f64 {
        self.ct_ref
    }

    /// Set the reference `cdt` [m].
    pub fn set_reference_time(&mut self, ct_ref: f64) {
        self.ct_ref = ct_ref;
    }

    /// Nested sub-line of a composite element.
    pub fn sub_line(&self) -> Option<&Beamline> {
        self.sub_line.as_deref()
    }

    /// The sub-line member strength changes are delegated to.
    pub fn active_part(&self) -> Option<&ElmPtr> {
        self.active_part.as_ref()
    }

    /// Insert `element` into the sub-line at `s`, the composite's entrance
    /// sitting at `s0`. The composite grows by the inserted length.
    pub(crate) fn insert_into_sub_line(
        &mut self,
        s0: f64,
        s: f64,
        element: ElmPtr,
    ) -> Result<usize, EditError> {
        let Some(parts) = self.sub_line.as_deref_mut() else {
            return Err(EditError::Construction(ConstructionError::new(
                "LeafElement::insert_into_sub_line",
                ConstructionFault::NotSplittable {
                    kind: self.kind.type_name().to_owned(),
                    name: self.name.clone(),
                },
            )));
        };
        let before = parts.length();
        let splits = parts.insert_element_at(s0, s, element)?;
        self.length += parts.length() - before;
        let orphaned = self
            .active_part
            .as_ref()
            .is_some_and(|part| parts.position_of(part).is_none());
        if orphaned {
            warn!(element = %self.name, "active part was split; strength no longer delegated");
            self.active_part = None;
        }
        Ok(splits)
    }

    /// Attached side-data.
    pub fn barnacles(&self) -> &BarnacleList {
        &self.barnacles
    }

    /// Attached side-data, mutably.
    pub fn barnacles_mut(&mut self) -> &mut BarnacleList {
        &mut self.barnacles
    }

    /// The bound propagator.
    pub fn propagator(&self) -> &Rc<dyn Propagator> {
        &self.propagator
    }

    /// Rebind the propagator, returning the previous binding.
    pub fn set_propagator(
        &mut self,
        propagator: Rc<dyn Propagator>,
    ) -> Result<Rc<dyn Propagator>, ConstructionError> {
        if !propagator.accepts(self.kind) {
            return Err(ConstructionError::new(
                "LeafElement::set_propagator",
                ConstructionFault::IncompatiblePropagator {
                    propagator: propagator.name().to_owned(),
                    kind: self.type_name().to_owned(),
                },
            ));
        }
        Ok(std::mem::replace(&mut self.propagator, propagator))
    }

    /// Path length of the reference trajectory for `particle` [m].
    ///
    /// Chord-measured bends report their arc.
    pub fn orbit_length(&self, _particle: &Particle) -> f64 {
        match self.geometry {
            Geometry::Chord { angle } if angle != 0.0 => {
                let half = 0.5 * angle;
                self.length * half / half.sin()
            }
            _ => self.length,
        }
    }

    /// Track a plain particle: enter the local frame, run the propagator,
    /// check the aperture, leave the local frame.
    pub fn propagate(&self, particle: &mut Particle) -> Result<(), PropagationError> {
        self.track(particle, |prop, elm, p| prop.propagate(elm, p))
    }

    /// Track a series particle; see [`propagate`](Self::propagate).
    pub fn propagate_jet(&self, particle: &mut JetParticle) -> Result<(), PropagationError> {
        self.track(particle, |prop, elm, p| prop.propagate_jet(elm, p))
    }

    fn track<P: PhaseSpace>(
        &self,
        particle: &mut P,
        step: impl FnOnce(&dyn Propagator, &Self, &mut P) -> Result<(), PropagationError>,
    ) -> Result<(), PropagationError> {
        if let Some(a) = &self.alignment {
            a.misalign(particle.state_mut());
        }
        let mut result = step(self.propagator.as_ref(), self, particle);
        if result.is_ok() {
            result = self.check_aperture(particle.state());
        }
        if let Some(a) = &self.alignment {
            a.align(particle.state_mut());
        }
        result
    }

    fn check_aperture<C: Coordinate>(&self, state: &[C; DIM]) -> Result<(), PropagationError> {
        let Some(aperture) = &self.aperture else {
            return Ok(());
        };
        let (x, y) = (state[X].standard_part(), state[Y].standard_part());
        if aperture.contains(x, y) {
            Ok(())
        } else {
            Err(PropagationError::ParticleLost {
                element: self.name.clone(),
                x,
                y,
            })
        }
    }

    /// Deep, independent copy.
    ///
    /// Aperture, alignment and sub-line are duplicated; the active part
    /// is remapped to the same position in the copied sub-line. The
    /// propagator binding is shared. Barnacles are not copied.
    pub fn clone_element(&self) -> LeafElement {
        let sub_line = self.sub_line.as_ref().map(|l| Box::new(l.clone_line()));
        let active_part = match (&self.active_part, &self.sub_line, &sub_line) {
            (Some(active), Some(old), Some(new)) => {
                old.position_of(active).and_then(|i| new.get(i).cloned())
            }
            _ => None,
        };
        LeafElement {
            name: self.name.clone(),
            kind: self.kind,
            flavor: self.flavor.clone(),
            length: self.length,
            strength: self.strength,
            strength_index: self.strength_index,
            aperture: self.aperture,
            alignment: self.alignment,
            i_to_field: self.i_to_field,
            shunt: self.shunt,
            geometry: self.geometry,
            ct_ref: self.ct_ref,
            sub_line,
            active_part,
            barnacles: BarnacleList::new(),
            propagator: Rc::clone(&self.propagator),
        }
    }

    /// [`clone_element`](Self::clone_element) under a new name.
    pub fn clone_named(&self, name: impl Into<String>) -> LeafElement {
        let mut copy = self.clone_element();
        copy.name = name.into();
        copy
    }

    /// Cut at `fraction` of the length into `<name>_CL_A` and `<name>_CL_B`.
    ///
    /// Tracking through both pieces in order reproduces tracking through
    /// the whole element. Fails for fractions outside `(0, 1)`, for thin
    /// elements, composites and kinds without a split rule.
    pub fn split(&self, fraction: f64) -> Result<(LeafElement, LeafElement), ConstructionError> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ConstructionError::new(
                "LeafElement::split",
                ConstructionFault::SplitFraction(fraction),
            ));
        }
        let scaling = match self.kind.split_scaling() {
            Some(s) if self.length > 0.0 && self.sub_line.is_none() => s,
            _ => {
                return Err(ConstructionError::new(
                    "LeafElement::split",
                    ConstructionFault::NotSplittable {
                        kind: self.type_name().to_owned(),
                        name: self.name.clone(),
                    },
                ))
            }
        };

        let rest = 1.0 - fraction;
        let mut a = self.clone_named(format!("{}_CL_A", self.name));
        let mut b = self.clone_named(format!("{}_CL_B", self.name));
        a.length = fraction * self.length;
        b.length = rest * self.length;
        if scaling == StrengthScaling::Integrated {
            a.strength = fraction * self.strength;
            b.strength = rest * self.strength;
        }
        if let Geometry::Arc { angle } = self.geometry {
            a.geometry = Geometry::Arc {
                angle: fraction * angle,
            };
            b.geometry = Geometry::Arc { angle: rest * angle };
        }
        a.ct_ref = fraction * self.ct_ref;
        b.ct_ref = rest * self.ct_ref;
        debug!(element = %self.name, fraction, "split element");
        Ok((a, b))
    }

    /// Dispatch to the visitor method for this element's kind.
    pub fn accept<V: Visitor + ?Sized>(&self, v: &mut V) {
        match self.kind {
            ElementKind::Marker => v.visit_marker(self),
            ElementKind::Drift => v.visit_drift(self),
            ElementKind::Slot => v.visit_slot(self),
            ElementKind::Quadrupole => v.visit_quadrupole(self),
            ElementKind::ThinQuad => v.visit_thin_quad(self),
            ElementKind::Sextupole => v.visit_sextupole(self),
            ElementKind::ThinSextupole => v.visit_thin_sextupole(self),
            ElementKind::HKick => v.visit_hkick(self),
            ElementKind::VKick => v.visit_vkick(self),
            ElementKind::Monitor => v.visit_monitor(self),
            ElementKind::HMonitor => v.visit_hmonitor(self),
            ElementKind::VMonitor => v.visit_vmonitor(self),
            ElementKind::Sbend => v.visit_sbend(self),
            ElementKind::Rbend => v.visit_rbend(self),
            ElementKind::Srot => v.visit_srot(self),
            ElementKind::Sector => v.visit_sector(self),
            ElementKind::CombinedFunction => v.visit_combined_function(self),
            ElementKind::Beamline => v.visit_element(self),
        }
    }
}

impl fmt::Debug for LeafElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafElement")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("length", &self.length)
            .field("strength", &self.strength)
            .field("alignment", &self.alignment)
            .field("aperture", &self.aperture)
            .field("propagator", &self.propagator.name())
            .finish_non_exhaustive()
    }
}

#[track_caller]
fn check_length(kind: ElementKind, length: f64) -> Result<(), ConstructionError> {
    let fault = if !length.is_finite() {
        ConstructionFault::NonFinite { field: "length" }
    } else if length < 0.0 {
        ConstructionFault::NegativeLength(length)
    } else if kind.requires_length() && length == 0.0 {
        ConstructionFault::NonPositiveLength {
            kind: kind.type_name().to_owned(),
            length,
        }
    } else {
        return Ok(());
    };
    Err(ConstructionError::new("check_length", fault))
}

// ── Builder ─────────────────────────────────────────────────────

/// Builder for [`LeafElement`]. A propagator is mandatory.
///
/// # Examples
///
/// ```
/// use bml_beamline::{ElementBuilder, ElementKind, IdentityPropagator};
/// use std::rc::Rc;
///
/// let q = ElementBuilder::new(ElementKind::Quadrupole, "QF")
///     .length(0.5)
///     .strength(1.3)
///     .propagator(Rc::new(IdentityPropagator))
///     .build()
///     .unwrap();
/// assert_eq!(q.length(), 0.5);
///
/// let err = ElementBuilder::new(ElementKind::Quadrupole, "QD").length(0.5).build();
/// assert!(err.is_err());
/// ```
#[must_use]
#[derive(Debug)]
pub struct ElementBuilder {
    kind: ElementKind,
    name: String,
    flavor: String,
    length: f64,
    strength: f64,
    strength_index: Option<usize>,
    aperture: Option<Aperture>,
    alignment: Option<Alignment>,
    i_to_field: f64,
    shunt: f64,
    geometry: Option<Geometry>,
    ct_ref: f64,
    sub_line: Option<(Beamline, Option<usize>)>,
    propagator: Option<Rc<dyn Propagator>>,
}

impl ElementBuilder {
    /// Start a builder for `kind` named `name`.
    pub fn new(kind: ElementKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            flavor: String::new(),
            length: 0.0,
            strength: 0.0,
            strength_index: None,
            aperture: None,
            alignment: None,
            i_to_field: 1.0,
            shunt: 0.0,
            geometry: None,
            ct_ref: 0.0,
            sub_line: None,
            propagator: None,
        }
    }

    /// Sub-variant string (default: empty).
    pub fn flavor(mut self, flavor: impl Into<String>) -> Self {
        self.flavor = flavor.into();
        self
    }

    /// Length [m] (default: 0).
    pub fn length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    /// Strength (default: 0).
    pub fn strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    /// Tie the strength to series variable `index`.
    pub fn strength_index(mut self, index: usize) -> Self {
        self.strength_index = Some(index);
        self
    }

    /// Aperture (default: none).
    pub fn aperture(mut self, aperture: Aperture) -> Self {
        self.aperture = Some(aperture);
        self
    }

    /// Misalignment (default: none).
    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Current-to-field factor (default: 1).
    pub fn i_to_field(mut self, factor: f64) -> Self {
        self.i_to_field = factor;
        self
    }

    /// Shunt current (default: 0).
    pub fn shunt(mut self, shunt: f64) -> Self {
        self.shunt = shunt;
        self
    }

    /// Reference trajectory shape (default: straight; slots get a straight patch).
    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Reference `cdt` [m] (default: 0).
    pub fn reference_time(mut self, ct_ref: f64) -> Self {
        self.ct_ref = ct_ref;
        self
    }

    /// Nested sub-line, with the index of its active part.
    pub fn sub_line(mut self, line: Beamline, active: Option<usize>) -> Self {
        self.sub_line = Some((line, active));
        self
    }

    /// Propagator binding (mandatory).
    pub fn propagator(mut self, propagator: Rc<dyn Propagator>) -> Self {
        self.propagator = Some(propagator);
        self
    }

    /// Validate and build.
    #[track_caller]
    pub fn build(self) -> Result<LeafElement, ConstructionError> {
        const FUNCTION: &str = "ElementBuilder::build";

        // 1. Lines are not leaves.
        if self.kind == ElementKind::Beamline {
            return Err(ConstructionError::new(FUNCTION, ConstructionFault::NotALeaf));
        }

        // 2. Finite numbers and a valid length.
        for (field, value) in [
            ("strength", self.strength),
            ("i_to_field", self.i_to_field),
            ("shunt", self.shunt),
            ("reference_time", self.ct_ref),
        ] {
            if !value.is_finite() {
                return Err(ConstructionError::new(
                    FUNCTION,
                    ConstructionFault::NonFinite { field },
                ));
            }
        }
        if let Err(mut e) = check_length(self.kind, self.length) {
            e.function = FUNCTION;
            return Err(e);
        }

        // 3. A compatible propagator.
        let Some(propagator) = self.propagator else {
            return Err(ConstructionError::new(
                FUNCTION,
                ConstructionFault::MissingPropagator,
            ));
        };
        if !propagator.accepts(self.kind) {
            return Err(ConstructionError::new(
                FUNCTION,
                ConstructionFault::IncompatiblePropagator {
                    propagator: propagator.name().to_owned(),
                    kind: self.kind.type_name().to_owned(),
                },
            ));
        }

        // 4. The active part must be a member of the sub-line.
        let (sub_line, active_part) = match self.sub_line {
            None => (None, None),
            Some((line, None)) => (Some(Box::new(line)), None),
            Some((line, Some(i))) => {
                let Some(part) = line.get(i).cloned() else {
                    return Err(ConstructionError::new(
                        FUNCTION,
                        ConstructionFault::ForeignActivePart(format!("#{i}")),
                    ));
                };
                (Some(Box::new(line)), Some(part))
            }
        };

        // 5. Null or forbidden alignments are not stored.
        let alignment = match self.alignment {
            Some(a) if !a.is_null() && !self.kind.may_misalign() => {
                warn!(element = %self.name, kind = self.kind.type_name(), "misalignment dropped");
                None
            }
            Some(a) if !a.is_null() => Some(a),
            _ => None,
        };

        let geometry = match (self.kind, self.geometry) {
            (_, Some(g)) => g,
            (ElementKind::Slot, None) => Geometry::Patch {
                exit: Frame::straight(self.length),
            },
            (_, None) => Geometry::Straight,
        };

        Ok(LeafElement {
            name: self.name,
            kind: self.kind,
            flavor: self.flavor,
            length: self.length,
            strength: self.strength,
            strength_index: self.strength_index,
            aperture: self.aperture,
            alignment,
            i_to_field: self.i_to_field,
            shunt: self.shunt,
            geometry,
            ct_ref: self.ct_ref,
            sub_line,
            active_part,
            barnacles: BarnacleList::new(),
            propagator,
        })
    }
}

// ── Element ─────────────────────────────────────────────────────

/// A leaf element or a nested line.
#[derive(Debug)]
pub enum Element {
    /// Physical element with its own propagator.
    Leaf(LeafElement),
    /// Nested line, propagated as a unit.
    Line(Beamline),
}

impl Element {
    /// Name of the leaf or line.
    pub fn name(&self) -> &str {
        match self {
            Self::Leaf(e) => e.name(),
            Self::Line(l) => l.name(),
        }
    }

    /// Change the name.
    pub fn rename(&mut self, name: impl Into<String>) {
        match self {
            Self::Leaf(e) => e.rename(name),
            Self::Line(l) => l.rename(name),
        }
    }

    /// Element family; lines report [`ElementKind::Beamline`].
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Leaf(e) => e.kind(),
            Self::Line(_) => ElementKind::Beamline,
        }
    }

    /// Type tag string.
    pub fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }

    /// See [`ElementKind::is_type`].
    pub fn is_type(&self, name: &str) -> bool {
        self.kind().is_type(name)
    }

    /// Whether this is a nested line.
    pub fn is_line(&self) -> bool {
        matches!(self, Self::Line(_))
    }

    /// The leaf, if this is one.
    pub fn as_leaf(&self) -> Option<&LeafElement> {
        match self {
            Self::Leaf(e) => Some(e),
            Self::Line(_) => None,
        }
    }

    /// The leaf, mutably.
    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafElement> {
        match self {
            Self::Leaf(e) => Some(e),
            Self::Line(_) => None,
        }
    }

    /// The line, if this is one.
    pub fn as_line(&self) -> Option<&Beamline> {
        match self {
            Self::Line(l) => Some(l),
            Self::Leaf(_) => None,
        }
    }

    /// The line, mutably.
    pub fn as_line_mut(&mut self) -> Option<&mut Beamline> {
        match self {
            Self::Line(l) => Some(l),
            Self::Leaf(_) => None,
        }
    }

    /// Length [m]; a line sums its children.
    pub fn length(&self) -> f64 {
        match self {
            Self::Leaf(e) => e.length(),
            Self::Line(l) => l.length(),
        }
    }

    /// Strength; zero for lines.
    pub fn strength(&self) -> f64 {
        match self {
            Self::Leaf(e) => e.strength(),
            Self::Line(_) => 0.0,
        }
    }

    /// Set a leaf's strength. Lines have none; returns false for them.
    pub fn set_strength(&mut self, value: f64) -> bool {
        match self {
            Self::Leaf(e) => {
                e.set_strength(value);
                true
            }
            Self::Line(l) => {
                warn!(line = %l.name(), "strength ignored for a beamline");
                false
            }
        }
    }

    /// A leaf's misalignment; lines report none.
    pub fn alignment(&self) -> Option<Alignment> {
        self.as_leaf().and_then(|e| e.alignment().copied())
    }

    /// Misalign a leaf, or every leaf of a line; see [`Beamline::set_alignment`].
    pub fn set_alignment(&mut self, alignment: Alignment) -> bool {
        match self {
            Self::Leaf(e) => e.set_alignment(alignment),
            Self::Line(l) => l.set_alignment(alignment),
        }
    }

    /// Whether a leaf has an aperture.
    pub fn has_aperture(&self) -> bool {
        self.as_leaf().is_some_and(LeafElement::has_aperture)
    }

    /// Reference-trajectory path length [m].
    pub fn orbit_length(&self, particle: &Particle) -> f64 {
        match self {
            Self::Leaf(e) => e.orbit_length(particle),
            Self::Line(l) => l.orbit_length(particle),
        }
    }

    /// Track a plain particle.
    pub fn propagate(&self, particle: &mut Particle) -> Result<(), PropagationError> {
        match self {
            Self::Leaf(e) => e.propagate(particle),
            Self::Line(l) => l.propagate(particle),
        }
    }

    /// Track a series particle.
    pub fn propagate_jet(&self, particle: &mut JetParticle) -> Result<(), PropagationError> {
        match self {
            Self::Leaf(e) => e.propagate_jet(particle),
            Self::Line(l) => l.propagate_jet(particle),
        }
    }

    /// Visitor dispatch.
    pub fn accept<V: Visitor + ?Sized>(&self, v: &mut V) {
        match self {
            Self::Leaf(e) => e.accept(v),
            Self::Line(l) => v.visit_beamline(l),
        }
    }

    /// Attached side-data.
    pub fn barnacles(&self) -> &BarnacleList {
        match self {
            Self::Leaf(e) => e.barnacles(),
            Self::Line(l) => l.barnacles(),
        }
    }

    /// Attached side-data, mutably.
    pub fn barnacles_mut(&mut self) -> &mut BarnacleList {
        match self {
            Self::Leaf(e) => e.barnacles_mut(),
            Self::Line(l) => l.barnacles_mut(),
        }
    }

    /// Deep, independent copy.
    pub fn clone_element(&self) -> Element {
        match self {
            Self::Leaf(e) => Self::Leaf(e.clone_element()),
            Self::Line(l) => Self::Line(l.clone_line()),
        }
    }

    /// Deep copy under a new name.
    pub fn clone_named(&self, name: impl Into<String>) -> Element {
        let mut copy = self.clone_element();
        copy.rename(name);
        copy
    }

    /// See [`LeafElement::split`]; lines cannot be split.
    pub fn split(&self, fraction: f64) -> Result<(Element, Element), ConstructionError> {
        match self {
            Self::Leaf(e) => e.split(fraction).map(|(a, b)| (Self::Leaf(a), Self::Leaf(b))),
            Self::Line(l) => Err(ConstructionError::new(
                "Element::split",
                ConstructionFault::NotSplittable {
                    kind: ElementKind::Beamline.type_name().to_owned(),
                    name: l.name().to_owned(),
                },
            )),
        }
    }
}

impl From<LeafElement> for Element {
    fn from(e: LeafElement) -> Self {
        Self::Leaf(e)
    }
}

impl From<Beamline> for Element {
    fn from(l: Beamline) -> Self {
        Self::Line(l)
    }
}

// ── ElmPtr ──────────────────────────────────────────────────────

/// Shared, mutable handle to an element.
///
/// Cloning the handle aliases the element; use
/// [`ElmPtr::clone_element`] for an independent copy. The element is
/// freed when its last holder drops.
#[derive(Clone)]
pub struct ElmPtr(Rc<RefCell<Element>>);

impl ElmPtr {
    /// Wrap an element in a fresh handle.
    pub fn new(element: impl Into<Element>) -> Self {
        Self(Rc::new(RefCell::new(element.into())))
    }

    /// Shared access. Panics if the element is mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, Element> {
        self.0.borrow()
    }

    /// Exclusive access. Panics if the element is borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, Element> {
        self.0.borrow_mut()
    }

    /// Whether two handles alias the same element.
    pub fn ptr_eq(&self, other: &ElmPtr) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live handles to this element.
    pub fn holders(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Element name.
    pub fn name(&self) -> String {
        self.borrow().name().to_owned()
    }

    /// Element family.
    pub fn kind(&self) -> ElementKind {
        self.borrow().kind()
    }

    /// Length [m].
    pub fn length(&self) -> f64 {
        self.borrow().length()
    }

    /// Strength.
    pub fn strength(&self) -> f64 {
        self.borrow().strength()
    }

    /// Whether the element is a nested line.
    pub fn is_line(&self) -> bool {
        self.borrow().is_line()
    }

    /// A fresh handle to a deep copy.
    pub fn clone_element(&self) -> ElmPtr {
        ElmPtr::new(self.borrow().clone_element())
    }
}

impl fmt::Debug for ElmPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(e) => write!(f, "ElmPtr({} {:?})", e.type_name(), e.name()),
            Err(_) => f.write_str("ElmPtr(<borrowed>)"),
        }
    }
}

impl From<Element> for ElmPtr {
    fn from(e: Element) -> Self {
        Self::new(e)
    }
}

impl From<LeafElement> for ElmPtr {
    fn from(e: LeafElement) -> Self {
        Self::new(e)
    }
}

impl From<Beamline> for ElmPtr {
    fn from(l: Beamline) -> Self {
        Self::new(l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagator::IdentityPropagator;

    fn leaf(kind: ElementKind, name: &str, length: f64, strength: f64) -> LeafElement {
        ElementBuilder::new(kind, name)
            .length(length)
            .strength(strength)
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap()
    }

    // ── Builder tests ───────────────────────────────────────────

    #[test]
    fn builder_rejects_missing_propagator() {
        let err = ElementBuilder::new(ElementKind::Drift, "D").length(1.0).build().unwrap_err();
        assert_eq!(err.fault, ConstructionFault::MissingPropagator);
        assert_eq!(err.function, "ElementBuilder::build");
        assert_eq!(err.location.file(), file!());
    }

    #[test]
    fn builder_rejects_negative_and_zero_lengths() {
        let neg = ElementBuilder::new(ElementKind::Drift, "D")
            .length(-1.0)
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap_err();
        assert_eq!(neg.fault, ConstructionFault::NegativeLength(-1.0));

        let zero = ElementBuilder::new(ElementKind::Quadrupole, "Q")
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap_err();
        assert!(matches!(zero.fault, ConstructionFault::NonPositiveLength { .. }));
    }

    #[test]
    fn builder_rejects_beamline_kind() {
        let err = ElementBuilder::new(ElementKind::Beamline, "L")
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap_err();
        assert_eq!(err.fault, ConstructionFault::NotALeaf);
    }

    #[test]
    fn builder_debug_names_the_element() {
        let builder = ElementBuilder::new(ElementKind::Quadrupole, "QF").length(0.5);
        let text = format!("{builder:?}");
        assert!(text.contains("QF"), "{text}");
        assert!(text.contains("Quadrupole"), "{text}");
    }

    #[test]
    fn builder_rejects_foreign_active_part() {
        let err = ElementBuilder::new(ElementKind::CombinedFunction, "CF")
            .length(1.0)
            .sub_line(Beamline::new("inner"), Some(0))
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap_err();
        assert!(matches!(err.fault, ConstructionFault::ForeignActivePart(_)));
    }

    #[test]
    fn null_alignment_is_not_stored() {
        let e = ElementBuilder::new(ElementKind::Drift, "D")
            .length(1.0)
            .alignment(Alignment::null())
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap();
        assert!(e.alignment().is_none());
    }

    // ── Strength bookkeeping tests ──────────────────────────────

    #[test]
    fn shunt_and_current_bookkeeping() {
        let mut q = leaf(ElementKind::Quadrupole, "Q", 1.0, 0.0);
        q.set_i_to_field(2.0);
        q.set_current(3.0);
        assert_eq!(q.strength(), 6.0);
        assert_eq!(q.current(), 3.0);

        q.set_shunt(0.5);
        assert_eq!(q.strength(), 5.0);
        assert_eq!(q.shunt(), 0.5);

        q.set_strength(4.0);
        assert_eq!(q.strength(), 3.0);
    }

    #[test]
    fn composite_delegates_integrated_strength_to_thin_part() {
        let mut inner = Beamline::new("inner");
        inner.append(leaf(ElementKind::Drift, "D", 0.5, 0.0));
        inner.append(leaf(ElementKind::ThinQuad, "TQ", 0.0, 0.0));
        inner.append(leaf(ElementKind::Drift, "D", 0.5, 0.0));
        let mut cf = ElementBuilder::new(ElementKind::CombinedFunction, "CF")
            .length(1.0)
            .sub_line(inner, Some(1))
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap();
        cf.set_length(2.0).unwrap();
        cf.set_strength(0.7);
        let part = cf.active_part().unwrap();
        assert!((part.strength() - 1.4).abs() < 1e-15);
    }

    #[test]
    fn strength_index_is_recorded() {
        let mut k = leaf(ElementKind::HKick, "K", 0.0, 0.0);
        k.set_strength_indexed(1e-3, 6);
        assert_eq!(k.strength_index(), Some(6));
        assert_eq!(k.strength(), 1e-3);
        k.clear_strength_index();
        assert_eq!(k.strength_index(), None);
    }

    // ── Clone and split tests ───────────────────────────────────

    #[test]
    fn clone_is_independent() {
        let e1 = leaf(ElementKind::Quadrupole, "Q", 0.5, 1.3);
        let mut e2 = e1.clone_named("Q2");
        e2.set_strength(9.0);
        assert!(e2.set_alignment(Alignment::new(1e-3, 0.0, 0.0)));
        assert_eq!(e1.strength(), 1.3);
        assert!(e1.alignment().is_none());
        assert_eq!(e2.name(), "Q2");
    }

    #[test]
    fn clone_remaps_active_part() {
        let mut inner = Beamline::new("inner");
        inner.append(leaf(ElementKind::Drift, "D", 0.5, 0.0));
        inner.append(leaf(ElementKind::Quadrupole, "Q", 0.5, 1.0));
        let cf = ElementBuilder::new(ElementKind::CombinedFunction, "CF")
            .length(1.0)
            .sub_line(inner, Some(1))
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap();
        let copy = cf.clone_element();
        let (orig, dup) = (cf.active_part().unwrap(), copy.active_part().unwrap());
        assert!(!orig.ptr_eq(dup));
        assert!(copy.sub_line().unwrap().get(1).unwrap().ptr_eq(dup));
    }

    #[test]
    fn split_names_and_lengths() {
        let d = leaf(ElementKind::Drift, "D", 2.0, 0.0);
        let (a, b) = d.split(0.25).unwrap();
        assert_eq!(a.name(), "D_CL_A");
        assert_eq!(b.name(), "D_CL_B");
        assert_eq!(a.length() + b.length(), 2.0);
        assert_eq!(a.length(), 0.5);
    }

    #[test]
    fn split_scales_integrated_strength_only() {
        let q = leaf(ElementKind::Quadrupole, "Q", 1.0, 2.0);
        let (a, b) = q.split(0.5).unwrap();
        assert_eq!((a.strength(), b.strength()), (2.0, 2.0));

        let k = leaf(ElementKind::HKick, "K", 1.0, 2e-3);
        let (a, b) = k.split(0.25).unwrap();
        assert!((a.strength() - 5e-4).abs() < 1e-18);
        assert!((b.strength() - 1.5e-3).abs() < 1e-18);
    }

    #[test]
    fn split_rejects_bad_fractions_and_thin_elements() {
        let d = leaf(ElementKind::Drift, "D", 1.0, 0.0);
        for f in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let err = d.split(f).unwrap_err();
            assert!(matches!(err.fault, ConstructionFault::SplitFraction(_)));
        }
        let m = leaf(ElementKind::Drift, "thin", 0.0, 0.0);
        assert!(matches!(
            m.split(0.5).unwrap_err().fault,
            ConstructionFault::NotSplittable { .. }
        ));
    }

    #[test]
    fn split_divides_bend_angle() {
        let b = ElementBuilder::new(ElementKind::Sbend, "B")
            .length(2.0)
            .geometry(Geometry::Arc { angle: 0.1 })
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap();
        let (x, y) = b.split(0.3).unwrap();
        assert!((x.bend_angle() + y.bend_angle() - 0.1).abs() < 1e-15);
    }

    // ── Frame and aperture tests ────────────────────────────────

    #[test]
    fn markers_refuse_misalignment() {
        let mut m = leaf(ElementKind::Marker, "M", 0.0, 0.0);
        assert!(!m.set_alignment(Alignment::new(1e-3, 0.0, 0.0)));
        assert!(m.alignment().is_none());
    }

    #[test]
    fn aperture_loss_is_reported_in_design_frame() {
        let mut d = leaf(ElementKind::Drift, "D", 1.0, 0.0);
        d.set_aperture(Some(Aperture::Rectangular {
            half_width: 1e-3,
            half_height: 1e-3,
        }));
        d.set_alignment(Alignment::new(5e-4, 0.0, 0.0));
        let mut p = Particle::proton(1.0).with_state([-6e-4, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let err = d.propagate(&mut p).unwrap_err();
        assert_eq!(err.code(), 1);
        assert!((p.state()[X] + 6e-4).abs() < 1e-18);

        let mut ok = Particle::proton(1.0).with_state([4e-4, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(d.propagate(&mut ok).is_ok());
    }

    #[test]
    fn chord_orbit_length_is_arc() {
        let b = ElementBuilder::new(ElementKind::Rbend, "RB")
            .length(1.0)
            .geometry(Geometry::Chord { angle: 0.2 })
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap();
        let p = Particle::proton(1.0);
        let arc = 0.1 / (0.1_f64).sin();
        assert!((b.orbit_length(&p) - arc).abs() < 1e-15);
    }

    #[test]
    fn set_propagator_returns_previous() {
        #[derive(Debug)]
        struct DriftOnly;
        impl Propagator for DriftOnly {
            fn name(&self) -> &str {
                "drift_only"
            }
            fn accepts(&self, kind: ElementKind) -> bool {
                kind == ElementKind::Drift
            }
            fn propagate(&self, _: &LeafElement, _: &mut Particle) -> Result<(), PropagationError> {
                Ok(())
            }
            fn propagate_jet(&self, _: &LeafElement, _: &mut JetParticle) -> Result<(), PropagationError> {
                Ok(())
            }
        }

        let mut d = leaf(ElementKind::Drift, "D", 1.0, 0.0);
        let prev = d.set_propagator(Rc::new(DriftOnly)).unwrap();
        assert_eq!(prev.name(), "identity");
        assert_eq!(d.propagator().name(), "drift_only");

        let mut q = leaf(ElementKind::Quadrupole, "Q", 1.0, 0.0);
        let err = q.set_propagator(Rc::new(DriftOnly)).unwrap_err();
        assert!(matches!(err.fault, ConstructionFault::IncompatiblePropagator { .. }));
        assert_eq!(q.propagator().name(), "identity");
    }

    #[test]
    fn handles_alias_and_count_holders() {
        let a = ElmPtr::new(leaf(ElementKind::Quadrupole, "Q", 0.5, 1.0));
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert_eq!(a.holders(), 2);
        b.borrow_mut().set_strength(2.0);
        assert_eq!(a.strength(), 2.0);
        let c = a.clone_element();
        assert!(!c.ptr_eq(&a));
        assert_eq!(format!("{c:?}"), "ElmPtr(quadrupole \"Q\")");
    }
}
