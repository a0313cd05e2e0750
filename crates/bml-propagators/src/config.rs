//! Tracking-model selection.
//!
//! A [`TrackingConfig`] chooses, per element family, which propagator
//! the [`ElementFactory`](crate::ElementFactory) binds and what
//! [`rebind`](crate::rebind) switches a line to. It round-trips through
//! serde so a model choice can live next to a lattice file.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Drift transport model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftModel {
    /// Exact straight line.
    #[default]
    Exact,
    /// First-order paraxial map.
    Mad,
}

/// Thick quadrupole model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuadModel {
    /// First-order matrix.
    Linear,
    /// Thin kicks between exact drifts.
    MultiKick {
        /// Number of slices; at least one.
        kicks: usize,
    },
}

impl Default for QuadModel {
    fn default() -> Self {
        Self::MultiKick { kicks: 4 }
    }
}

/// Dipole model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BendModel {
    /// First-order matrix with linear edge focusing.
    #[default]
    Linear,
}

/// Propagator choice per element family.
///
/// # Examples
///
/// ```
/// use bml_propagators::{DriftModel, QuadModel, TrackingConfig};
///
/// let cfg: TrackingConfig =
///     serde_json::from_str(r#"{ "drift": "mad", "quadrupole": "linear" }"#).unwrap();
/// assert_eq!(cfg.drift, DriftModel::Mad);
/// assert_eq!(cfg.quadrupole, QuadModel::Linear);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Drift and monitor transport.
    pub drift: DriftModel,
    /// Thick quadrupoles.
    pub quadrupole: QuadModel,
    /// Sector and rectangular bends.
    pub bend: BendModel,
}

/// Invalid tracking configuration.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A multi-kick model with no kicks.
    #[error("multi-kick quadrupole model needs at least one kick")]
    ZeroKicks,
}

impl TrackingConfig {
    /// Check the configuration's invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let QuadModel::MultiKick { kicks: 0 } = self.quadrupole {
            return Err(ConfigError::ZeroKicks);
        }
        Ok(())
    }
}
