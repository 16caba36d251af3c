//! The chemistry engine: per-cell pipeline and its reusable workspace.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use cinder_core::{CellId, CellState, SolveError, StateError};
use cinder_mech::Mechanism;
use cinder_ode::StiffIntegrator;
use cinder_reduce::{ActiveSet, FullMechanism, ReductionMethod};
use cinder_tab::TabulationMethod;
use nalgebra::DMatrix;

use crate::config::{ConfigError, EngineConfig};
use crate::metrics::ChemistryMetrics;
use crate::reduced::ReducedSystem;

/// Per-worker scratch state for cell solves.
///
/// The active-set maps and translation buffers are rebuilt every cell
/// but sized once to the mechanism's worst case, so the hot per-cell
/// loop never reallocates. Metrics accumulate here and are merged per
/// step.
pub struct Workspace {
    /// Diagnostics accumulated by this workspace's solves.
    pub metrics: ChemistryMetrics,
    active: ActiveSet,
    reduced: Vec<f64>,
    query: Vec<f64>,
    jac_full: DMatrix<f64>,
    gradient: DMatrix<f64>,
}

impl Workspace {
    fn new(n_species: usize, n_reactions: usize) -> Self {
        Self {
            metrics: ChemistryMetrics::default(),
            active: ActiveSet::new(n_species, n_reactions),
            reduced: Vec::with_capacity(n_species),
            query: Vec::with_capacity(n_species + 2),
            jac_full: DMatrix::zeros(n_species, n_species),
            gradient: DMatrix::zeros(n_species, n_species + 2),
        }
    }

    /// Number of active species in the most recent solve.
    pub fn last_active_count(&self) -> usize {
        self.active.n_active()
    }
}

/// Per-cell chemistry orchestrator.
///
/// Every method takes `&self`: the engine is shared across the batch
/// worker pool, with the tabulation cache as the only synchronized
/// state (concurrent retrieves, serialized adds — a retrieve never
/// observes a partially inserted entry).
pub struct ChemistryEngine {
    mechanism: Arc<Mechanism>,
    reduction: Box<dyn ReductionMethod>,
    tabulation: Arc<RwLock<dyn TabulationMethod>>,
    integrator: Box<dyn StiffIntegrator>,
    workers: usize,
    dt_chem_fraction: f64,
}

impl ChemistryEngine {
    /// Construct an engine from a validated configuration.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let workers = config.resolved_workers();
        Ok(Self {
            mechanism: config.mechanism,
            reduction: config.reduction,
            tabulation: config.tabulation,
            integrator: config.integrator,
            workers,
            dt_chem_fraction: config.dt_chem_fraction,
        })
    }

    /// The shared mechanism.
    pub fn mechanism(&self) -> &Mechanism {
        &self.mechanism
    }

    /// Resolved worker count for [`solve_batch`](Self::solve_batch).
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Live entries in the tabulation cache.
    pub fn cache_len(&self) -> usize {
        self.tabulation
            .read()
            .expect("tabulation lock poisoned")
            .len()
    }

    /// A workspace sized for this engine's mechanism.
    pub fn workspace(&self) -> Workspace {
        Workspace::new(self.mechanism.n_species(), self.mechanism.n_reactions())
    }

    /// Advance one cell's composition by `delta_t`.
    ///
    /// Runs the full pipeline — reduce, project, cache lookup,
    /// integration on miss, cache update, scatter — and returns the
    /// cell's characteristic chemical time. Reduction failures fall
    /// back to the full mechanism and are only visible in the metrics;
    /// invalid input and integration failures are fatal and carry the
    /// cell ID.
    pub fn solve_cell(
        &self,
        ws: &mut Workspace,
        cell: CellId,
        state: &mut CellState,
        delta_t: f64,
    ) -> Result<f64, SolveError> {
        // 0. Boundary validation: refuse rather than repair.
        let n = self.mechanism.n_species();
        if state.n_species() != n {
            return Err(SolveError::InvalidState {
                cell,
                source: StateError::LengthMismatch {
                    expected: n,
                    found: state.n_species(),
                },
            });
        }
        state
            .validate()
            .map_err(|source| SolveError::InvalidState { cell, source })?;
        if !delta_t.is_finite() || delta_t <= 0.0 {
            return Err(SolveError::InvalidTimeStep {
                cell,
                value: delta_t,
            });
        }

        // 1. Reduce. A failed strategy is recovered locally by running
        //    the cell on the full mechanism.
        let reduce_start = Instant::now();
        ws.active.reset(n, self.mechanism.n_reactions());
        if self
            .reduction
            .reduce(
                &self.mechanism,
                &state.composition,
                state.temperature,
                state.pressure,
                &mut ws.active,
            )
            .is_err()
        {
            ws.active.reset(n, self.mechanism.n_reactions());
            FullMechanism
                .reduce(
                    &self.mechanism,
                    &state.composition,
                    state.temperature,
                    state.pressure,
                    &mut ws.active,
                )
                .expect("full reduction cannot fail");
            ws.metrics.reduction_fallbacks += 1;
        }
        ws.metrics.reduce_us += reduce_start.elapsed().as_micros() as u64;
        ws.metrics.cells += 1;
        ws.metrics.active_species_sum += ws.active.n_active() as u64;

        // 2. Tabulation key: the full-space composition with temperature
        //    and pressure appended, so entries stay comparable across
        //    cells whose active sets differ.
        ws.query.clear();
        ws.query.extend_from_slice(&state.composition);
        ws.query.push(state.temperature);
        ws.query.push(state.pressure);

        // 3. Lookup.
        let retrieve_start = Instant::now();
        let hit = {
            let tab = self.tabulation.read().expect("tabulation lock poisoned");
            tab.retrieve(&ws.query)
        };
        ws.metrics.retrieve_us += retrieve_start.elapsed().as_micros() as u64;

        if let Some(hit) = hit {
            // 3a. Hit: the extrapolated result replaces the composition;
            //     integration is skipped entirely.
            ws.metrics.hits += 1;
            for (target, value) in state.composition.iter_mut().zip(&hit.output) {
                *target = value.max(0.0);
            }
            // A cached step carries no new stiffness information; cells
            // without history report the full step as their chemical time.
            if !(state.dt_chem > 0.0) {
                state.dt_chem = delta_t;
            }
            return Ok(state.dt_chem);
        }
        ws.metrics.misses += 1;

        // 4. Miss: integrate the reduced system. The mapping sensitivity
        //    is linearized at the step origin, before the state moves.
        let integrate_start = Instant::now();
        ws.active.project(&state.composition, &mut ws.reduced);
        self.mechanism.jacobian(
            &state.composition,
            state.temperature,
            Some(ws.active.reactions_disabled()),
            &mut ws.jac_full,
        );

        let dt_init = if state.dt_chem.is_finite() && state.dt_chem > 0.0 {
            state.dt_chem
        } else {
            delta_t * self.dt_chem_fraction
        };
        let profile = {
            let system = ReducedSystem::new(
                &self.mechanism,
                &ws.active,
                &state.composition,
                state.temperature,
            );
            self.integrator
                .integrate(&system, &mut ws.reduced, delta_t, dt_init)
        }
        .map_err(|source| SolveError::IntegrationFailed { cell, source })?;
        ws.metrics.integrate_us += integrate_start.elapsed().as_micros() as u64;
        ws.metrics.integration_sub_steps += u64::from(profile.sub_steps);

        // 5. Scatter the reduced result back; inactive species stay
        //    frozen for the step.
        ws.active.scatter(&ws.reduced, &mut state.composition);

        // 6. Grow the cache with the fresh result. The stored gradient
        //    is `I + Δt·J`; sensitivity to temperature and pressure is
        //    not modeled, the validity radii confine those axes instead.
        let add_start = Instant::now();
        for i in 0..n {
            for j in 0..n {
                let identity = if i == j { 1.0 } else { 0.0 };
                ws.gradient[(i, j)] = identity + delta_t * ws.jac_full[(i, j)];
            }
            ws.gradient[(i, n)] = 0.0;
            ws.gradient[(i, n + 1)] = 0.0;
        }
        let outcome = {
            let mut tab = self.tabulation.write().expect("tabulation lock poisoned");
            tab.add(&ws.query, &state.composition, &ws.gradient)
        };
        ws.metrics.add_us += add_start.elapsed().as_micros() as u64;
        if outcome.inserted.is_some() {
            ws.metrics.insertions += 1;
        }
        if outcome.grew.is_some() {
            ws.metrics.grows += 1;
        }
        if outcome.shrank.is_some() {
            ws.metrics.shrinks += 1;
        }
        if outcome.evicted.is_some() {
            ws.metrics.evictions += 1;
        }

        // 7. The last accepted sub-step seeds the next solve.
        state.dt_chem = profile.sub_dt_used;
        Ok(state.dt_chem)
    }
}
