//! Shared setup helpers for the cinder benchmarks.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use std::sync::Arc;

use cinder_core::{CellId, CellState};
use cinder_mech::{Arrhenius, Mechanism, MechanismBuilder};

/// A linear chain `S0 → S1 → … → S(n-1)` with rate constants spread
/// over two decades, stiff enough to exercise the adaptive sub-stepping.
pub fn chain_mechanism(n_species: usize) -> Arc<Mechanism> {
    assert!(n_species >= 2, "a chain needs at least two species");
    let names: Vec<String> = (0..n_species).map(|i| format!("S{i}")).collect();
    let mut builder = MechanismBuilder::new().element("X");
    for name in &names {
        builder = builder.species(name, &[("X", 1)]);
    }
    for i in 0..n_species - 1 {
        let k = 1.0 * 10f64.powf((i % 3) as f64 - 1.0);
        builder = builder.reaction(
            &[(names[i].as_str(), 1)],
            &[(names[i + 1].as_str(), 1)],
            Arrhenius::constant(k),
        );
    }
    Arc::new(builder.build().expect("chain mechanism is valid"))
}

/// A field of cells whose leading species concentration varies smoothly,
/// so neighbouring cells fall inside each other's validity regions.
pub fn smooth_field(n_cells: usize, n_species: usize) -> Vec<(CellId, CellState)> {
    (0..n_cells)
        .map(|i| {
            let mut composition = vec![0.0; n_species];
            composition[0] = 1.0 + 1e-6 * i as f64;
            (
                CellId(i as u64),
                CellState::new(composition, 1000.0, 101_325.0, 0.0),
            )
        })
        .collect()
}
