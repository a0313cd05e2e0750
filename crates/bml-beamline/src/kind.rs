//! The closed set of element families.

use serde::{Deserialize, Serialize};

/// Element family tag.
///
/// Visitors dispatch on this tag, propagators declare which tags they
/// drive, and persisted records name it by [`ElementKind::type_name`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Zero-length reference point.
    Marker,
    /// Field-free straight section.
    Drift,
    /// Field-free patch between two arbitrary faces.
    Slot,
    /// Thick quadrupole; strength is the gradient [T/m].
    Quadrupole,
    /// Thin quadrupole; strength is the integrated gradient [T].
    ThinQuad,
    /// Thick sextupole; strength is `B''` [T/m²].
    Sextupole,
    /// Thin sextupole; strength is the integrated `B''` [T/m].
    ThinSextupole,
    /// Horizontal corrector; strength is the kick [rad].
    HKick,
    /// Vertical corrector; strength is the kick [rad].
    VKick,
    /// Two-plane beam position monitor.
    Monitor,
    /// Horizontal beam position monitor.
    HMonitor,
    /// Vertical beam position monitor.
    VMonitor,
    /// Sector bend; strength is the field [T].
    Sbend,
    /// Rectangular bend; strength is the field [T], length is the chord.
    Rbend,
    /// Rotation about the beam axis; strength is the angle [rad].
    Srot,
    /// Precomputed transfer map.
    Sector,
    /// Element built from a sub-line with one active part.
    CombinedFunction,
    /// A nested line.
    Beamline,
}

/// How a split distributes an element's strength over its two pieces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrengthScaling {
    /// Strength is per unit length; both pieces keep it.
    Intensive,
    /// Strength is integrated; pieces take their length fraction.
    Integrated,
}

impl ElementKind {
    /// Every kind, in declaration order.
    pub const ALL: [ElementKind; 18] = [
        Self::Marker,
        Self::Drift,
        Self::Slot,
        Self::Quadrupole,
        Self::ThinQuad,
        Self::Sextupole,
        Self::ThinSextupole,
        Self::HKick,
        Self::VKick,
        Self::Monitor,
        Self::HMonitor,
        Self::VMonitor,
        Self::Sbend,
        Self::Rbend,
        Self::Srot,
        Self::Sector,
        Self::CombinedFunction,
        Self::Beamline,
    ];

    /// Type tag string.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::Drift => "drift",
            Self::Slot => "Slot",
            Self::Quadrupole => "quadrupole",
            Self::ThinQuad => "thinQuad",
            Self::Sextupole => "sextupole",
            Self::ThinSextupole => "thinSextupole",
            Self::HKick => "hkick",
            Self::VKick => "vkick",
            Self::Monitor => "monitor",
            Self::HMonitor => "hmonitor",
            Self::VMonitor => "vmonitor",
            Self::Sbend => "sbend",
            Self::Rbend => "rbend",
            Self::Srot => "srot",
            Self::Sector => "sector",
            Self::CombinedFunction => "combinedFunction",
            Self::Beamline => "beamline",
        }
    }

    /// Inverse of [`type_name`](Self::type_name).
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_name() == name)
    }

    /// Coarser families this kind belongs to, most specific first.
    pub fn ancestors(self) -> &'static [&'static str] {
        match self {
            Self::Drift | Self::Slot => &["freeSpace"],
            Self::Quadrupole | Self::Sextupole => &["magnet"],
            Self::ThinQuad | Self::ThinSextupole => &["multipole", "magnet"],
            Self::HKick | Self::VKick => &["kick", "magnet"],
            Self::Monitor | Self::HMonitor | Self::VMonitor => &["monitor"],
            Self::Sbend | Self::Rbend => &["bend", "magnet"],
            Self::CombinedFunction => &["bend", "magnet"],
            Self::Marker | Self::Srot | Self::Sector | Self::Beamline => &[],
        }
    }

    /// Exact match on the tag, on an ancestor family, or on `"element"`.
    pub fn is_type(self, name: &str) -> bool {
        name == "element" || self.type_name() == name || self.ancestors().contains(&name)
    }

    /// Split behaviour, or `None` if elements of this kind cannot be split.
    pub fn split_scaling(self) -> Option<StrengthScaling> {
        match self {
            Self::Drift
            | Self::Quadrupole
            | Self::Sextupole
            | Self::Monitor
            | Self::HMonitor
            | Self::VMonitor
            | Self::Sbend => Some(StrengthScaling::Intensive),
            Self::HKick | Self::VKick => Some(StrengthScaling::Integrated),
            Self::Marker
            | Self::Slot
            | Self::ThinQuad
            | Self::ThinSextupole
            | Self::Rbend
            | Self::Srot
            | Self::Sector
            | Self::CombinedFunction
            | Self::Beamline => None,
        }
    }

    /// Whether the kind needs `length > 0`.
    pub fn requires_length(self) -> bool {
        matches!(
            self,
            Self::Quadrupole | Self::Sextupole | Self::Sbend | Self::Rbend
        )
    }

    /// Whether elements of this kind accept a misalignment.
    pub fn may_misalign(self) -> bool {
        !matches!(
            self,
            Self::Marker | Self::Slot | Self::Srot | Self::Sector | Self::Beamline
        )
    }

    /// Free-space kinds that geometric edits may reshape.
    pub fn is_free_space(self) -> bool {
        matches!(self, Self::Drift | Self::Slot)
    }

    /// Kinds whose reference trajectory bends.
    pub fn is_bend(self) -> bool {
        self.is_type("bend")
    }
}
