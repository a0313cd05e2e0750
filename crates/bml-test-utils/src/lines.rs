//! Canned lines.

use bml_beamline::{Beamline, LineMode};
use bml_propagators::{ElementFactory, TrackingConfig};

/// Reference total energy of [`five_gev_line`] [GeV].
pub const FIVE_GEV: f64 = 5.0;

/// Factory with the default tracking configuration.
pub fn factory() -> ElementFactory {
    ElementFactory::new(TrackingConfig::default()).expect("default tracking config is valid")
}

/// `[DA(2.0), Q(0.5, 1.3 T/m), DB(3.0)]` at 5 GeV, 5.5 m long.
pub fn five_gev_line(f: &ElementFactory) -> Beamline {
    let mut line = Beamline::new("FIVE_GEV");
    line.set_nominal_energy(Some(FIVE_GEV));
    line.set_mode(LineMode::Line);
    line.append(f.drift("DA", 2.0).unwrap());
    line.append(f.quadrupole("Q", 0.5, 1.3).unwrap());
    line.append(f.drift("DB", 3.0).unwrap());
    line
}

/// `[A, [B, [], [C, D]], E]`: drifts of 1 m named by their deep order,
/// with an empty nested line in the middle.
pub fn nested_line(f: &ElementFactory) -> Beamline {
    let mut inner = Beamline::new("INNER");
    inner.append(f.drift("C", 1.0).unwrap());
    inner.append(f.drift("D", 1.0).unwrap());

    let mut middle = Beamline::new("MIDDLE");
    middle.append(f.drift("B", 1.0).unwrap());
    middle.append(Beamline::new("EMPTY"));
    middle.append(inner);

    let mut line = Beamline::new("OUTER");
    line.append(f.drift("A", 1.0).unwrap());
    line.append(middle);
    line.append(f.drift("E", 1.0).unwrap());
    line
}
