//! Persisted element records.
//!
//! [`ElementData`] is the flat, serializable description of a leaf
//! element. It carries no propagator; turning a record back into an
//! element goes through [`ElementData::builder`] plus a propagator
//! binding, which the factory in `bml-propagators` supplies.

use bml_core::{Alignment, AlignmentData, Aperture, ConstructionError, ConstructionFault};
use serde::{Deserialize, Serialize};

use crate::element::{ElementBuilder, Geometry, LeafElement};
use crate::kind::ElementKind;

fn unit() -> f64 {
    1.0
}

/// Serializable snapshot of a leaf element.
///
/// # Examples
///
/// ```
/// use bml_beamline::ElementData;
///
/// let json = r#"{ "name": "QF", "type": "quadrupole", "length": 0.5, "strength": 1.3 }"#;
/// let data: ElementData = serde_json::from_str(json).unwrap();
/// assert_eq!(data.i_to_field, 1.0);
/// assert!(data.builder().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementData {
    /// Element name.
    pub name: String,
    /// Type tag, as in [`ElementKind::type_name`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Sub-variant string.
    #[serde(default)]
    pub flavor: String,
    /// Length [m].
    pub length: f64,
    /// Strength.
    #[serde(default)]
    pub strength: f64,
    /// Aperture, if any.
    #[serde(default)]
    pub aperture: Option<Aperture>,
    /// Misalignment; all zero when absent.
    #[serde(default)]
    pub alignment: AlignmentData,
    /// Current-to-field factor.
    #[serde(default = "unit")]
    pub i_to_field: f64,
    /// Shunt current.
    #[serde(default)]
    pub shunt: f64,
    /// Bend angle [rad] for bends.
    #[serde(default)]
    pub angle: f64,
}

impl ElementData {
    /// The kind this record may be rebuilt as.
    ///
    /// Composites, sectors, slots and lines carry state a flat record
    /// cannot hold and are refused.
    pub fn element_kind(&self) -> Result<ElementKind, ConstructionError> {
        let Some(kind) = ElementKind::from_type_name(&self.kind) else {
            return Err(ConstructionError::new(
                "ElementData::element_kind",
                ConstructionFault::UnknownKind(self.kind.clone()),
            ));
        };
        match kind {
            ElementKind::CombinedFunction
            | ElementKind::Sector
            | ElementKind::Slot
            | ElementKind::Beamline => Err(ConstructionError::new(
                "ElementData::element_kind",
                ConstructionFault::NotFromRecord {
                    kind: self.kind.clone(),
                },
            )),
            k => Ok(k),
        }
    }

    /// A builder preloaded with every field of the record.
    ///
    /// The caller adds the propagator and calls
    /// [`build`](ElementBuilder::build).
    pub fn builder(&self) -> Result<ElementBuilder, ConstructionError> {
        let kind = self.element_kind()?;
        let mut b = ElementBuilder::new(kind, self.name.clone())
            .flavor(self.flavor.clone())
            .length(self.length)
            .strength(self.strength)
            .i_to_field(self.i_to_field)
            .shunt(self.shunt)
            .alignment(Alignment::from(self.alignment));
        if let Some(aperture) = self.aperture {
            b = b.aperture(aperture);
        }
        match kind {
            ElementKind::Sbend => b = b.geometry(Geometry::Arc { angle: self.angle }),
            ElementKind::Rbend => b = b.geometry(Geometry::Chord { angle: self.angle }),
            _ => {}
        }
        Ok(b)
    }
}

impl LeafElement {
    /// Snapshot as a persisted record.
    pub fn to_data(&self) -> ElementData {
        ElementData {
            name: self.name().to_owned(),
            kind: self.type_name().to_owned(),
            flavor: self.flavor().to_owned(),
            length: self.length(),
            strength: self.strength(),
            aperture: self.aperture().copied(),
            alignment: self.alignment().copied().unwrap_or_default().data(),
            i_to_field: self.i_to_field(),
            shunt: self.shunt(),
            angle: self.bend_angle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagator::IdentityPropagator;
    use std::rc::Rc;

    #[test]
    fn unknown_and_forbidden_kinds() {
        let mut data: ElementData =
            serde_json::from_str(r#"{ "name": "X", "type": "wiggler", "length": 1.0 }"#).unwrap();
        assert!(matches!(
            data.element_kind().unwrap_err().fault,
            ConstructionFault::UnknownKind(_)
        ));
        for tag in ["combinedFunction", "sector", "Slot", "beamline"] {
            data.kind = tag.to_owned();
            assert!(matches!(
                data.builder().unwrap_err().fault,
                ConstructionFault::NotFromRecord { .. }
            ));
        }
    }

    #[test]
    fn record_survives_json_and_rebuild() {
        let q = ElementBuilder::new(ElementKind::Quadrupole, "QF")
            .length(0.5)
            .strength(1.3)
            .i_to_field(0.1)
            .alignment(Alignment::new(1e-4, 0.0, 0.01))
            .aperture(Aperture::Elliptical { a: 0.02, b: 0.01 })
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap();
        let json = serde_json::to_string(&q.to_data()).unwrap();
        assert!(json.contains(r#""type":"quadrupole""#));
        let data: ElementData = serde_json::from_str(&json).unwrap();
        let back = data
            .builder()
            .unwrap()
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap();
        assert_eq!(back.to_data(), q.to_data());
    }

    #[test]
    fn bend_angle_maps_to_geometry() {
        let data = ElementData {
            name: "B".into(),
            kind: "rbend".into(),
            flavor: String::new(),
            length: 2.0,
            strength: 0.5,
            aperture: None,
            alignment: AlignmentData::default(),
            i_to_field: 1.0,
            shunt: 0.0,
            angle: 0.05,
        };
        let b = data
            .builder()
            .unwrap()
            .propagator(Rc::new(IdentityPropagator))
            .build()
            .unwrap();
        assert_eq!(b.geometry(), &Geometry::Chord { angle: 0.05 });
    }
}
