//! Labelled side-data attached to elements and lines.
//!
//! A [`BarnacleList`] maps a string label to an ordered list of
//! type-erased payloads. Analysis passes hang their results here (lattice
//! functions under `"Twiss"`, ring tunes under `"Ring"`) without the
//! element type needing a field for each.

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Label under which lattice functions are stored.
pub const TWISS_LABEL: &str = "Twiss";
/// Label under which ring tunes are stored.
pub const RING_LABEL: &str = "Ring";

/// Ordered multimap from label to owned payloads.
///
/// # Examples
///
/// ```
/// use bml_core::BarnacleList;
///
/// let mut list = BarnacleList::new();
/// list.append("note", 1_u32);
/// list.append("note", 2_u32);
/// list.insert("note", 0_u32);
/// assert_eq!(list.find_as::<u32>("note", 0), Some(&0));
/// assert_eq!(list.lift_as::<u32>("note", 2), Some(2));
/// assert_eq!(list.count("note"), 2);
/// ```
#[derive(Default)]
pub struct BarnacleList {
    entries: IndexMap<String, Vec<Box<dyn Any>>>,
}

impl BarnacleList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `payload` after every existing value under `label`.
    pub fn append<T: Any>(&mut self, label: impl Into<String>, payload: T) {
        self.entries
            .entry(label.into())
            .or_default()
            .push(Box::new(payload));
    }

    /// Attach `payload` before every existing value under `label`.
    pub fn insert<T: Any>(&mut self, label: impl Into<String>, payload: T) {
        self.entries
            .entry(label.into())
            .or_default()
            .insert(0, Box::new(payload));
    }

    /// Remove the first value under `label`. Returns whether one was removed.
    pub fn erase_first(&mut self, label: &str) -> bool {
        let Some(values) = self.entries.get_mut(label) else {
            return false;
        };
        values.remove(0);
        if values.is_empty() {
            self.entries.shift_remove(label);
        }
        true
    }

    /// Remove every value under `label`. Returns how many were removed.
    pub fn erase_all(&mut self, label: &str) -> usize {
        self.entries.shift_remove(label).map_or(0, |v| v.len())
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The `nth` (0-based) value under `label`.
    pub fn find(&self, label: &str, nth: usize) -> Option<&dyn Any> {
        self.entries
            .get(label)
            .and_then(|v| v.get(nth))
            .map(|b| &**b)
    }

    /// The `nth` value under `label`, if it is a `T`.
    pub fn find_as<T: Any>(&self, label: &str, nth: usize) -> Option<&T> {
        self.find(label, nth).and_then(|a| a.downcast_ref::<T>())
    }

    /// Mutable access to the `nth` value under `label`, if it is a `T`.
    pub fn find_mut<T: Any>(&mut self, label: &str, nth: usize) -> Option<&mut T> {
        self.entries
            .get_mut(label)
            .and_then(|v| v.get_mut(nth))
            .and_then(|b| b.downcast_mut::<T>())
    }

    /// Remove and return the `nth` value under `label`.
    pub fn lift(&mut self, label: &str, nth: usize) -> Option<Box<dyn Any>> {
        let values = self.entries.get_mut(label)?;
        if nth >= values.len() {
            return None;
        }
        let out = values.remove(nth);
        if values.is_empty() {
            self.entries.shift_remove(label);
        }
        Some(out)
    }

    /// Remove and return the `nth` value under `label` if it is a `T`.
    ///
    /// A value of another type is left in place.
    pub fn lift_as<T: Any>(&mut self, label: &str, nth: usize) -> Option<T> {
        if !self.find(label, nth)?.is::<T>() {
            return None;
        }
        self.lift(label, nth)
            .and_then(|b| b.downcast::<T>().ok())
            .map(|b| *b)
    }

    /// Whether anything is stored under `label`.
    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    /// Number of values under `label`.
    pub fn count(&self, label: &str) -> usize {
        self.entries.get(label).map_or(0, Vec::len)
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Whether the list holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels in first-attached order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for BarnacleList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

/// Uncoupled lattice functions at one element's exit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatticeFunctions {
    /// Arc length from the start of the line [m].
    pub arc_length: f64,
    /// Horizontal beta [m].
    pub beta_x: f64,
    /// Vertical beta [m].
    pub beta_y: f64,
    /// Horizontal alpha.
    pub alpha_x: f64,
    /// Vertical alpha.
    pub alpha_y: f64,
    /// Horizontal phase advance [rad].
    pub psi_x: f64,
    /// Vertical phase advance [rad].
    pub psi_y: f64,
    /// Horizontal dispersion [m].
    pub dispersion_x: f64,
    /// Vertical dispersion [m].
    pub dispersion_y: f64,
}

/// Tunes and chromaticities of a closed ring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RingTunes {
    /// Horizontal tune.
    pub tune_x: f64,
    /// Vertical tune.
    pub tune_y: f64,
    /// Horizontal chromaticity.
    pub chromaticity_x: f64,
    /// Vertical chromaticity.
    pub chromaticity_y: f64,
}
