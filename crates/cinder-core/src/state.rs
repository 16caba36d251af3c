//! The per-cell thermochemical state mutated by the chemistry layer.

use crate::error::StateError;
use crate::id::SpeciesId;

/// Thermochemical state of one finite-volume cell.
///
/// The composition vector is owned by the flow field and mutated in
/// place by the chemistry layer; temperature and pressure are frozen for
/// the duration of a chemistry step. `dt_chem` is the cell's
/// characteristic chemical time, carried across steps as the stiff
/// integrator's initial sub-step guess and fed back to the outer solver
/// to bound its own time step.
#[derive(Clone, Debug, PartialEq)]
pub struct CellState {
    /// Concentration of each species, in mechanism species order.
    pub composition: Vec<f64>,
    /// Cell temperature, frozen for the step.
    pub temperature: f64,
    /// Cell pressure, frozen for the step.
    pub pressure: f64,
    /// Characteristic chemical time from the previous solve.
    pub dt_chem: f64,
}

impl CellState {
    /// Create a state with the given composition and an initial
    /// chemical time equal to the first step the integrator will try.
    pub fn new(composition: Vec<f64>, temperature: f64, pressure: f64, dt_chem: f64) -> Self {
        Self {
            composition,
            temperature,
            pressure,
            dt_chem,
        }
    }

    /// Number of species slots in the composition vector.
    pub fn n_species(&self) -> usize {
        self.composition.len()
    }

    /// Validate the state at the solve boundary.
    ///
    /// Rejects empty, NaN, infinite, or negative concentrations and
    /// non-positive temperature or pressure. A state that fails here is
    /// fatal for the cell solve; the chemistry layer never "repairs"
    /// caller-supplied input.
    pub fn validate(&self) -> Result<(), StateError> {
        if self.composition.is_empty() {
            return Err(StateError::EmptyComposition);
        }
        for (i, &c) in self.composition.iter().enumerate() {
            let species = SpeciesId(i as u32);
            if !c.is_finite() {
                return Err(StateError::NonFiniteConcentration { species, value: c });
            }
            if c < 0.0 {
                return Err(StateError::NegativeConcentration { species, value: c });
            }
        }
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(StateError::InvalidTemperature {
                value: self.temperature,
            });
        }
        if !self.pressure.is_finite() || self.pressure <= 0.0 {
            return Err(StateError::InvalidPressure {
                value: self.pressure,
            });
        }
        Ok(())
    }
}
