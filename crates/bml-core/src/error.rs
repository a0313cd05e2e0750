//! Error types for beamline construction, editing and propagation.
//!
//! Three failure classes, each with its own handling policy:
//!
//! - [`ConstructionError`]: invalid arguments when building or splitting an
//!   element. Always fatal to the operation in progress; carries the
//!   function name and the caller's source location.
//! - [`EditError`]: a structural edit referenced something that is not
//!   there. Recoverable; exposes an integer [`EditError::code`].
//! - [`PropagationError`]: a particle was lost or the geometry degenerated
//!   while tracking. Expected on the hot path; exposes
//!   [`PropagationError::code`] so callers can keep integer status codes.

use std::panic::Location;

use bml_jet::JetError;
use thiserror::Error;

/// Why an element could not be constructed.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConstructionFault {
    /// Lengths are never negative.
    #[error("length {0} is negative")]
    NegativeLength(f64),
    /// The element kind needs a strictly positive length.
    #[error("a {kind} needs a positive length, got {length}")]
    NonPositiveLength {
        /// Element type name.
        kind: String,
        /// Offending length.
        length: f64,
    },
    /// A numeric field was NaN or infinite.
    #[error("{field} is not finite")]
    NonFinite {
        /// Field name.
        field: &'static str,
    },
    /// No propagator was supplied.
    #[error("no propagator bound")]
    MissingPropagator,
    /// The propagator does not drive this element kind.
    #[error("propagator '{propagator}' cannot drive a {kind}")]
    IncompatiblePropagator {
        /// Propagator name.
        propagator: String,
        /// Element type name.
        kind: String,
    },
    /// Split fraction outside the open interval (0, 1).
    #[error("split fraction {0} is outside (0, 1)")]
    SplitFraction(f64),
    /// The element kind cannot be split.
    #[error("{kind} '{name}' cannot be split")]
    NotSplittable {
        /// Element type name.
        kind: String,
        /// Element name.
        name: String,
    },
    /// The kind cannot be rebuilt from a flat persisted record.
    #[error("a {kind} cannot be built from a persisted record")]
    NotFromRecord {
        /// Element type name.
        kind: String,
    },
    /// Lines are built as lines, never through the leaf builder.
    #[error("a beamline is not a leaf element")]
    NotALeaf,
    /// Unrecognised type tag in a persisted record.
    #[error("unknown element type '{0}'")]
    UnknownKind(String),
    /// A composite element's active part is not in its sub-line.
    #[error("active part '{0}' is not a member of the sub-line")]
    ForeignActivePart(String),
    /// The series environment could not be built.
    #[error("jet environment: {0}")]
    Jet(#[from] JetError),
}

/// A structured construction failure: what went wrong, where, and in which operation.
///
/// Built with [`ConstructionError::new`], which records the caller's
/// source location through `#[track_caller]`.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{function} ({location}): {fault}")]
pub struct ConstructionError {
    /// Operation that failed, e.g. `"Element::split"`.
    pub function: &'static str,
    /// Source location of the failing call.
    pub location: &'static Location<'static>,
    /// What went wrong.
    #[source]
    pub fault: ConstructionFault,
}

impl ConstructionError {
    /// Record a failure of `function` at the caller's location.
    #[track_caller]
    pub fn new(function: &'static str, fault: ConstructionFault) -> Self {
        Self {
            function,
            location: Location::caller(),
            fault,
        }
    }

    /// The underlying fault.
    pub fn fault(&self) -> &ConstructionFault {
        &self.fault
    }
}

/// Per-element tracking failure.
///
/// Returned by propagators instead of panicking; a lost particle is an
/// ordinary outcome when scanning for the edge of stability.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PropagationError {
    /// The particle left the element's aperture.
    #[error("particle lost at '{element}' (x = {x}, y = {y})")]
    ParticleLost {
        /// Element name.
        element: String,
        /// Horizontal position at the check [m].
        x: f64,
        /// Vertical position at the check [m].
        y: f64,
    },
    /// Transverse momenta exceed the total momentum.
    #[error("longitudinal momentum is imaginary in '{element}'")]
    ImaginaryMomentum {
        /// Element name.
        element: String,
    },
    /// The element's geometry cannot transport this particle.
    #[error("degenerate geometry in '{element}': {detail}")]
    DegenerateGeometry {
        /// Element name.
        element: String,
        /// What degenerated.
        detail: String,
    },
}

impl PropagationError {
    /// Integer status code; 0 is reserved for success.
    pub fn code(&self) -> i32 {
        match self {
            Self::ParticleLost { .. } => 1,
            Self::ImaginaryMomentum { .. } => 2,
            Self::DegenerateGeometry { .. } => 3,
        }
    }

    /// Name of the element that failed.
    pub fn element(&self) -> &str {
        match self {
            Self::ParticleLost { element, .. }
            | Self::ImaginaryMomentum { element }
            | Self::DegenerateGeometry { element, .. } => element,
        }
    }
}

/// Integer status of a propagation result: 0 on success.
pub fn status(result: &Result<(), PropagationError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.code(),
    }
}

/// Structural edit failures.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EditError {
    /// No element matched.
    #[error("element '{name}' not found")]
    ElementNotFound {
        /// Name of the element searched for.
        name: String,
    },
    /// The element exists, but not that many times.
    #[error("occurrence {occurrence} of '{name}' not found")]
    OccurrenceNotFound {
        /// Element name.
        name: String,
        /// Requested 1-based occurrence.
        occurrence: usize,
    },
    /// An insertion position lies outside the line.
    #[error("position {s} outside [{start}, {end}]")]
    PositionOutOfRange {
        /// Requested position [m].
        s: f64,
        /// Line start [m].
        start: f64,
        /// Line end [m].
        end: f64,
    },
    /// A geometric edit needs a free-space neighbor.
    #[error("neighbor '{name}' of the moved element is not free space")]
    NotFreeSpace {
        /// Neighbor name.
        name: String,
    },
    /// In a two-element ring the one neighbor sits on both sides.
    #[error("'{name}' is both neighbors of the moved element")]
    SharedNeighbor {
        /// Neighbor name.
        name: String,
    },
    /// Translations under one nanometer are refused.
    #[error("displacement {displacement} m of '{name}' is below 1 nm")]
    DisplacementTooSmall {
        /// Element name.
        name: String,
        /// Requested displacement [m].
        displacement: f64,
    },
    /// Rotations under one nanoradian are refused.
    #[error("rotation {angle} rad of '{name}' is below 1 nrad")]
    RotationTooSmall {
        /// Element name.
        name: String,
        /// Requested angle [rad].
        angle: f64,
    },
    /// Rotations are only defined for straight elements.
    #[error("'{name}' has a curved reference trajectory")]
    CurvedElement {
        /// Element name.
        name: String,
    },
    /// The selected range contains no elements.
    #[error("range between '{from}' and '{to}' is empty")]
    EmptyRange {
        /// Upstream boundary.
        from: String,
        /// Downstream boundary.
        to: String,
    },
    /// Propagating through the range failed while building a map.
    #[error("propagation failed while editing: {0}")]
    Propagation(#[from] PropagationError),
    /// Splitting or building a replacement element failed.
    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

impl EditError {
    /// Integer status code; 0 is reserved for success.
    pub fn code(&self) -> i32 {
        match self {
            Self::ElementNotFound { .. } | Self::OccurrenceNotFound { .. } => 1,
            Self::PositionOutOfRange { .. } => 2,
            Self::NotFreeSpace { .. } | Self::SharedNeighbor { .. } => 3,
            Self::DisplacementTooSmall { .. } | Self::RotationTooSmall { .. } => 4,
            Self::CurvedElement { .. } => 8,
            Self::EmptyRange { .. } => 5,
            Self::Propagation(_) => 6,
            Self::Construction(_) => 7,
        }
    }
}
