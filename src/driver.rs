//! Assembles and runs a reactor simulation from a [`RunConfig`].

use crate::coke::{CokeModel, ModelError};
use crate::config::{ConfigError, RunConfig, SolverConfig};
use crate::dopri5::Dopri5;
use crate::layout::{index, Species, SPECIES_PER_SEGMENT};
use crate::rk4::Rk4;
use crate::system::{IntegrationError, Stats};
use crate::trajectory::Trajectory;

use log::info;
use nalgebra::DVector;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Integration(#[from] IntegrationError),
}

/// Initial reactor state: empty reactor with the feed `(A0, B0, C0)` at the inlet.
pub fn initial_state(config: &RunConfig) -> DVector<f64> {
    let mut state = DVector::zeros(SPECIES_PER_SEGMENT * config.n_points);
    if config.n_points > 0 {
        state[index(0, Species::A)] = config.a0;
        state[index(0, Species::B)] = config.b0;
        state[index(0, Species::C)] = config.c0;
    }
    state
}

/// `samples` evenly spaced times from 0 to `t_final`, both included.
pub fn time_grid(t_final: f64, samples: usize) -> Vec<f64> {
    match samples {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..samples)
            .map(|i| t_final * i as f64 / (samples - 1) as f64)
            .collect(),
    }
}

/// Axial coordinate of each segment on the unit reactor length.
pub fn axial_coordinates(n_points: usize) -> Vec<f64> {
    time_grid(1.0, n_points)
}

/// Output of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub trajectory: Trajectory<DVector<f64>>,
    pub stats: Stats,
}

/// A validated simulation ready to run.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: RunConfig,
    model: CokeModel,
}

impl Simulation {
    pub fn new(config: RunConfig) -> Result<Self, DriverError> {
        config.validate()?;
        let model =
            CokeModel::with_uniform_sites(config.rate_constants(), config.n_points, config.active_sites);
        Ok(Simulation { config, model })
    }

    /// Runs `config` with a caller-built model, e.g. a non-uniform site density.
    ///
    /// The model is not checked against `config.n_points` here; a mismatch is
    /// reported by [`Simulation::run`] as [`DriverError::Model`].
    pub fn with_model(config: RunConfig, model: CokeModel) -> Result<Self, DriverError> {
        config.validate()?;
        Ok(Simulation { config, model })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn model(&self) -> &CokeModel {
        &self.model
    }

    /// Integrates the model over the time grid with the configured solver.
    pub fn run(&self) -> Result<SimulationResult, DriverError> {
        let y0 = initial_state(&self.config);
        let grid = time_grid(self.config.t_final, self.config.t_grid);
        // A model from `with_model` may not match the configured segment count.
        self.model.evaluate(y0.as_slice(), grid[0])?;

        info!(
            "integrating {} segments over t = [0, {}] with {:?}",
            self.config.n_points, self.config.t_final, self.config.solver
        );

        let (trajectory, stats) = match self.config.solver {
            SolverConfig::Rk4 { step_size } => {
                let mut stepper = Rk4::new(self.model.clone(), grid, y0, step_size);
                let stats = stepper.integrate()?;
                (stepper.into_trajectory(), stats)
            }
            SolverConfig::Dopri5 { rtol, atol } => {
                let mut stepper = Dopri5::new(self.model.clone(), grid, y0, rtol, atol);
                let stats = stepper.integrate()?;
                (stepper.into_trajectory(), stats)
            }
        };

        info!(
            "integration done: {} samples, {} RHS evaluations",
            trajectory.len(),
            stats.num_eval
        );
        Ok(SimulationResult { trajectory, stats })
    }
}
