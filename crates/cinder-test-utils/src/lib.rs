//! Test fixtures and mock strategies for cinder development.
//!
//! Provides the small mechanisms used across the workspace's tests and
//! instrumented wrappers ([`CountingIntegrator`], [`RecordingTabulation`])
//! for asserting which pipeline phases actually ran.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cinder_core::{CellState, IntegrateError};
use cinder_mech::{Arrhenius, Mechanism, MechanismBuilder};
use cinder_ode::{OdeSystem, StepProfile, StiffIntegrator};
use cinder_tab::{AddOutcome, Retrieved, TabulationMethod};
use nalgebra::DMatrix;

/// First-order decay `A → B` with rate constant `k`.
pub fn decay_mechanism(k: f64) -> Arc<Mechanism> {
    Arc::new(
        MechanismBuilder::new()
            .element("X")
            .species("A", &[("X", 1)])
            .species("B", &[("X", 1)])
            .reaction(&[("A", 1)], &[("B", 1)], Arrhenius::constant(k))
            .build()
            .expect("decay mechanism is valid"),
    )
}

/// `A → B` plus an inert `Z` carrying its own element, with a slow
/// `Z → B` side channel. With `Z` depleted the reduction drops both `Z`
/// and its reaction.
pub fn decay_with_inert(k: f64) -> Arc<Mechanism> {
    Arc::new(
        MechanismBuilder::new()
            .element("X")
            .element("Y")
            .species("A", &[("X", 1)])
            .species("B", &[("X", 1)])
            .species("Z", &[("Y", 1)])
            .reaction(&[("A", 1)], &[("B", 1)], Arrhenius::constant(k))
            .reaction(&[("Z", 1)], &[("B", 1)], Arrhenius::constant(0.1 * k))
            .build()
            .expect("inert mechanism is valid"),
    )
}

/// Two-stage chain `A → B → C` with distinct rate constants.
pub fn chain_mechanism(k1: f64, k2: f64) -> Arc<Mechanism> {
    Arc::new(
        MechanismBuilder::new()
            .element("X")
            .species("A", &[("X", 1)])
            .species("B", &[("X", 1)])
            .species("C", &[("X", 1)])
            .reaction(&[("A", 1)], &[("B", 1)], Arrhenius::constant(k1))
            .reaction(&[("B", 1)], &[("C", 1)], Arrhenius::constant(k2))
            .build()
            .expect("chain mechanism is valid"),
    )
}

/// A fresh cell state at standard test conditions.
pub fn standard_state(composition: Vec<f64>) -> CellState {
    CellState::new(composition, 1000.0, 101_325.0, 0.0)
}

/// Wraps an integrator and counts how many times it is invoked.
///
/// The count uses a relaxed atomic so the wrapper stays shareable
/// across batch workers like the integrator it wraps.
pub struct CountingIntegrator {
    inner: Box<dyn StiffIntegrator>,
    calls: AtomicU64,
}

impl CountingIntegrator {
    pub fn new(inner: Box<dyn StiffIntegrator>) -> Self {
        Self {
            inner,
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl StiffIntegrator for CountingIntegrator {
    fn name(&self) -> &str {
        "Counting"
    }

    fn integrate(
        &self,
        system: &dyn OdeSystem,
        c: &mut [f64],
        delta_t: f64,
        dt_init: f64,
    ) -> Result<StepProfile, IntegrateError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.integrate(system, c, delta_t, dt_init)
    }
}

/// Wraps a tabulation strategy and records retrieve/add traffic.
pub struct RecordingTabulation<T: TabulationMethod> {
    inner: T,
    retrieves: AtomicU64,
    hits: AtomicU64,
    adds: u64,
}

impl<T: TabulationMethod> RecordingTabulation<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            retrieves: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            adds: 0,
        }
    }

    pub fn retrieves(&self) -> u64 {
        self.retrieves.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn adds(&self) -> u64 {
        self.adds
    }
}

impl<T: TabulationMethod> TabulationMethod for RecordingTabulation<T> {
    fn name(&self) -> &str {
        "Recording"
    }

    fn retrieve(&self, query: &[f64]) -> Option<Retrieved> {
        self.retrieves.fetch_add(1, Ordering::Relaxed);
        let result = self.inner.retrieve(query);
        if result.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn add(&mut self, query: &[f64], output: &[f64], gradient: &DMatrix<f64>) -> AddOutcome {
        self.adds += 1;
        self.inner.add(query, output, gradient)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn clear(&mut self) {
        self.inner.clear()
    }
}
