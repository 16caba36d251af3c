//! Parallel fan-out of cell solves across a worker pool.
//!
//! Per-cell chemistry is embarrassingly parallel: no cell's solve
//! depends on another's current-step result, only on the frozen field
//! values it arrived with. Cells are split into contiguous chunks, one
//! worker per chunk, each with its own [`Workspace`]; worker reports
//! come back over a channel and are merged after the scope joins.
//!
//! [`Workspace`]: crate::engine::Workspace

use cinder_core::{CellId, CellState, SolveError};

use crate::engine::ChemistryEngine;
use crate::metrics::ChemistryMetrics;

/// Result of a successful batch solve.
#[derive(Clone, Debug)]
pub struct BatchOutcome {
    /// Minimum characteristic chemical time across all cells — the
    /// outer solver uses this to bound its own time step.
    pub min_dt_chem: f64,
    /// Merged diagnostics for the step.
    pub metrics: ChemistryMetrics,
}

struct WorkerReport {
    min_dt_chem: f64,
    metrics: ChemistryMetrics,
    /// First failure in this worker's chunk, with its global cell slot.
    failure: Option<(usize, SolveError)>,
}

impl ChemistryEngine {
    /// Advance every cell by `delta_t`, fanning out across the
    /// configured worker pool.
    ///
    /// On failure the first fatal error in cell order is returned;
    /// cells in other chunks may or may not have been advanced, which
    /// is acceptable because fatal errors abort the run.
    pub fn solve_batch(
        &self,
        cells: &mut [(CellId, CellState)],
        delta_t: f64,
    ) -> Result<BatchOutcome, SolveError> {
        if cells.is_empty() {
            return Ok(BatchOutcome {
                min_dt_chem: f64::INFINITY,
                metrics: ChemistryMetrics::default(),
            });
        }

        let workers = self.workers().min(cells.len()).max(1);
        let chunk_size = cells.len().div_ceil(workers);
        let (tx, rx) = crossbeam_channel::unbounded();

        std::thread::scope(|scope| {
            for (chunk_index, chunk) in cells.chunks_mut(chunk_size).enumerate() {
                let tx = tx.clone();
                scope.spawn(move || {
                    let mut ws = self.workspace();
                    let mut min_dt_chem = f64::INFINITY;
                    let mut failure = None;
                    for (offset, (cell, state)) in chunk.iter_mut().enumerate() {
                        match self.solve_cell(&mut ws, *cell, state, delta_t) {
                            Ok(dt_chem) => min_dt_chem = min_dt_chem.min(dt_chem),
                            Err(err) => {
                                failure = Some((chunk_index * chunk_size + offset, err));
                                break;
                            }
                        }
                    }
                    tx.send(WorkerReport {
                        min_dt_chem,
                        metrics: std::mem::take(&mut ws.metrics),
                        failure,
                    })
                    .expect("batch collector outlives workers");
                });
            }
        });
        drop(tx);

        let mut metrics = ChemistryMetrics::default();
        let mut min_dt_chem = f64::INFINITY;
        let mut first_failure: Option<(usize, SolveError)> = None;
        for report in rx.try_iter() {
            metrics.merge(&report.metrics);
            min_dt_chem = min_dt_chem.min(report.min_dt_chem);
            if let Some((slot, err)) = report.failure {
                match &first_failure {
                    Some((best, _)) if *best <= slot => {}
                    _ => first_failure = Some((slot, err)),
                }
            }
        }

        match first_failure {
            Some((_, err)) => Err(err),
            None => Ok(BatchOutcome {
                min_dt_chem,
                metrics,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use cinder_mech::{Arrhenius, Mechanism, MechanismBuilder};
    use cinder_tab::IsatTable;
    use std::sync::{Arc, RwLock};

    fn mechanism() -> Arc<Mechanism> {
        Arc::new(
            MechanismBuilder::new()
                .element("X")
                .species("A", &[("X", 1)])
                .species("B", &[("X", 1)])
                .reaction(&[("A", 1)], &[("B", 1)], Arrhenius::constant(1.0))
                .build()
                .unwrap(),
        )
    }

    fn cells(n: usize) -> Vec<(CellId, CellState)> {
        (0..n)
            .map(|i| {
                let a = 0.5 + 0.1 * i as f64;
                (
                    CellId(i as u64),
                    CellState::new(vec![a, 0.0], 1000.0, 101_325.0, 0.0),
                )
            })
            .collect()
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let engine = ChemistryEngine::new(EngineConfig::new(mechanism())).unwrap();
        let outcome = engine.solve_batch(&mut [], 0.1).unwrap();
        assert_eq!(outcome.min_dt_chem, f64::INFINITY);
        assert_eq!(outcome.metrics.cells, 0);
    }

    #[test]
    fn batch_matches_sequential_solves() {
        let mut config = EngineConfig::new(mechanism());
        config.workers = Some(4);
        let engine = ChemistryEngine::new(config).unwrap();

        let mut parallel = cells(9);
        let outcome = engine.solve_batch(&mut parallel, 0.1).unwrap();
        assert_eq!(outcome.metrics.cells, 9);

        let mut sequential = cells(9);
        let mut ws = engine.workspace();
        let mut min_dt = f64::INFINITY;
        for (cell, state) in sequential.iter_mut() {
            min_dt = min_dt.min(engine.solve_cell(&mut ws, *cell, state, 0.1).unwrap());
        }

        for ((_, a), (_, b)) in parallel.iter().zip(&sequential) {
            for (x, y) in a.composition.iter().zip(&b.composition) {
                assert!((x - y).abs() < 1e-14, "parallel {x} vs sequential {y}");
            }
        }
        assert!((outcome.min_dt_chem - min_dt).abs() < 1e-14);
    }

    #[test]
    fn first_failure_in_cell_order_wins() {
        let mut config = EngineConfig::new(mechanism());
        config.workers = Some(2);
        let engine = ChemistryEngine::new(config).unwrap();

        let mut batch = cells(6);
        batch[3].1.composition[0] = -1.0;
        batch[5].1.composition[0] = f64::NAN;

        match engine.solve_batch(&mut batch, 0.1) {
            Err(SolveError::InvalidState { cell, .. }) => assert_eq!(cell, CellId(3)),
            other => panic!("expected InvalidState for cell 3, got {other:?}"),
        }
    }

    #[test]
    fn shared_cache_serves_identical_cells() {
        let mut config = EngineConfig::new(mechanism());
        config.tabulation = Arc::new(RwLock::new(IsatTable::builder().build().unwrap()));
        config.workers = Some(1);
        let engine = ChemistryEngine::new(config).unwrap();

        let mut batch: Vec<(CellId, CellState)> = (0..4)
            .map(|i| {
                (
                    CellId(i),
                    CellState::new(vec![1.0, 0.0], 1000.0, 101_325.0, 0.0),
                )
            })
            .collect();
        let outcome = engine.solve_batch(&mut batch, 0.1).unwrap();
        assert_eq!(outcome.metrics.misses, 1, "only the first cell integrates");
        assert_eq!(outcome.metrics.hits, 3);
        assert_eq!(engine.cache_len(), 1);

        let reference = batch[0].1.composition.clone();
        for (_, state) in &batch {
            for (a, b) in state.composition.iter().zip(&reference) {
                assert!((a - b).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn concurrent_batches_share_the_cache_safely() {
        let mut config = EngineConfig::new(mechanism());
        config.tabulation = Arc::new(RwLock::new(IsatTable::builder().build().unwrap()));
        config.workers = Some(4);
        let engine = ChemistryEngine::new(config).unwrap();

        // Two rounds over the same states: the second round must be
        // served from cache no matter how the first was interleaved.
        let mut round1 = cells(16);
        engine.solve_batch(&mut round1, 0.1).unwrap();

        let mut round2 = cells(16);
        let outcome = engine.solve_batch(&mut round2, 0.1).unwrap();
        assert_eq!(outcome.metrics.hits, 16);
        assert_eq!(outcome.metrics.misses, 0);

        for ((_, a), (_, b)) in round1.iter().zip(&round2) {
            for (x, y) in a.composition.iter().zip(&b.composition) {
                assert!((x - y).abs() < 1e-10);
            }
        }
    }
}
