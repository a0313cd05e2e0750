//! Benchmark profiles for bml.
//!
//! - [`fodo_ring`]: a ring of FODO cells with markers at the cell ends
//! - [`beam`]: a deterministic Gaussian bunch at the ring's energy

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use bml_beamline::{Beamline, LineMode};
use bml_core::phase::State;
use bml_core::{ConstructionError, Kinematics, ParticleBunch, Species};
use bml_propagators::ElementFactory;

/// Total energy of the benchmark ring [GeV].
pub const ENERGY: f64 = 5.0;

/// One 10 m FODO cell: `QF/2 D QD D QF/2` between a marker and a monitor.
fn fodo_cell(f: &ElementFactory, i: usize) -> Result<Beamline, ConstructionError> {
    let mut cell = Beamline::new(format!("CELL{i}"));
    cell.append(f.marker(&format!("START{i}"))?);
    cell.append(f.quadrupole(&format!("QF{i}A"), 0.25, 1.3)?);
    cell.append(f.drift(&format!("D{i}A"), 4.5)?);
    cell.append(f.quadrupole(&format!("QD{i}"), 0.5, -1.3)?);
    cell.append(f.drift(&format!("D{i}B"), 4.5)?);
    cell.append(f.quadrupole(&format!("QF{i}B"), 0.25, 1.3)?);
    cell.append(f.monitor(&format!("BPM{i}"), 0.0)?);
    Ok(cell)
}

/// A ring of `cells` FODO cells, nested one level deep.
pub fn fodo_ring(f: &ElementFactory, cells: usize) -> Result<Beamline, ConstructionError> {
    let mut ring = Beamline::new("RING");
    ring.set_nominal_energy(Some(ENERGY));
    ring.set_mode(LineMode::Ring);
    for i in 0..cells {
        ring.append(fodo_cell(f, i)?);
    }
    Ok(ring)
}

/// `count` protons at [`ENERGY`] with millimetre-scale transverse spread.
pub fn beam(count: usize, seed: u64) -> ParticleBunch {
    let sigmas: State = [1e-3, 1e-3, 1e-3, 1e-5, 1e-5, 1e-4];
    ParticleBunch::gaussian(
        Kinematics::with_energy(Species::Proton, ENERGY),
        [0.0; 6],
        sigmas,
        count,
        seed,
    )
}
