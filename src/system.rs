//! Integrator-facing interface shared by the Runge-Kutta steppers.

use simba::scalar::SubsetOf;
use std::fmt;
use thiserror::Error;

/// Right-hand side of an ODE system `dy/dt = f(t, y)`.
pub trait System<V> {
    /// Writes the derivative at `(x, y)` into `dy`. Every element of `dy` must be overwritten.
    fn system(&self, x: f64, y: &V, dy: &mut V);
    /// Stop function called at every successful integration step. The integration is stopped when this function returns true.
    fn solout(&mut self, _x: f64, _y: &V, _dy: &V) -> bool {
        false
    }
}

/// Enumeration of the errors that may arise during integration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntegrationError {
    #[error("Stopped at x = {x}. Need more than {n_step} steps.")]
    MaxNumStepReached { x: f64, n_step: u32 },
    #[error("Stopped at x = {x}. Step size underflow.")]
    StepSizeUnderflow { x: f64 },
    #[error("The problem seems to become stiff at x = {x}.")]
    StiffnessDetected { x: f64 },
    #[error("Invalid step size h = {h}.")]
    InvalidStepSize { h: f64 },
    #[error("Invalid time grid: {reason}.")]
    InvalidTimeGrid { reason: String },
}

/// Contains some statistics of the integration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub num_eval: u32,
    pub accepted_steps: u32,
    pub rejected_steps: u32,
}

impl Stats {
    pub(crate) fn new() -> Stats {
        Stats::default()
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Number of function evaluations: {}", self.num_eval)?;
        writeln!(f, "Number of accepted steps: {}", self.accepted_steps)?;
        write!(f, "Number of rejected steps: {}", self.rejected_steps)
    }
}

/// Converts an `f64` coefficient into the scalar type of the state.
pub(crate) fn scalar<T: SubsetOf<f64>>(value: f64) -> T {
    T::from_superset_unchecked(&value)
}

/// Checks that `grid` holds at least two strictly increasing, finite sample times.
pub(crate) fn check_time_grid(grid: &[f64]) -> Result<(), IntegrationError> {
    if grid.len() < 2 {
        return Err(IntegrationError::InvalidTimeGrid {
            reason: format!("need at least 2 samples, got {}", grid.len()),
        });
    }
    if let Some(t) = grid.iter().find(|t| !t.is_finite()) {
        return Err(IntegrationError::InvalidTimeGrid {
            reason: format!("sample {} is not finite", t),
        });
    }
    if let Some(w) = grid.windows(2).find(|w| w[1] <= w[0]) {
        return Err(IntegrationError::InvalidTimeGrid {
            reason: format!("samples {} and {} are not increasing", w[0], w[1]),
        });
    }
    Ok(())
}
