//! # Coke reactor
//! `coke_reactor` models coke formation along an axial-flow catalytic reactor.
//!
//! Three species react on the catalyst, A → B, A → C and B → C, at rates scaled by the
//! free active-site density. The reactor is split into axial segments and the resulting
//! method-of-lines ODE system is integrated with Runge-Kutta steppers.
//!
//! ```
//! use coke_reactor::{CokeModel, Dopri5, RateConstants};
//! use coke_reactor::driver::{initial_state, time_grid};
//! use coke_reactor::config::RunConfig;
//!
//! let config = RunConfig { n_points: 10, t_grid: 5, t_final: 1.0, ..RunConfig::default() };
//! let model = CokeModel::with_uniform_sites(RateConstants::new(1.0, 0.6, 0.4), 10, 0.82);
//! let mut stepper = Dopri5::new(model, time_grid(1.0, 5), initial_state(&config), 1e-6, 1e-9);
//! stepper.integrate().unwrap();
//! assert_eq!(stepper.y_out().len(), 5);
//! ```

// Re-export from external crate
pub use nalgebra::{DMatrix, DVector};

// Declare modules
pub mod coke;
pub mod config;
pub mod constants;
pub mod controller;
pub mod discretization;
pub mod dopri5;
pub mod driver;
pub mod kinetics;
pub mod layout;
pub mod report;
pub mod rk4;
pub mod system;
pub mod tableau;
pub mod trajectory;

pub use coke::{evaluate_rhs, CokeModel, ModelError};
pub use dopri5::Dopri5;
pub use kinetics::RateConstants;
pub use layout::Species;
pub use rk4::Rk4;
pub use system::{IntegrationError, Stats, System};
pub use trajectory::Trajectory;
