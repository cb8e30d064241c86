//! Run configuration of the reactor simulation.
//!
//! A configuration can be read from JSON or built from command-line arguments. The
//! nine run options may be given positionally in the order
//! `k1 k2 k3 A0 B0 C0 Tfinal Tgrid Npoints`, or by name as `key=value`.

use crate::kinetics::RateConstants;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Total number of active sites in [mol / m^3].
pub const DEFAULT_ACTIVE_SITES: f64 = 0.82;

/// Names of the positional options, in order.
pub const POSITIONAL_KEYS: [&str; 9] = [
    "k1", "k2", "k3", "A0", "B0", "C0", "Tfinal", "Tgrid", "Npoints",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown option '{0}'.")]
    UnknownKey(String),
    #[error("Could not parse '{value}' for option '{key}'.")]
    BadValue { key: String, value: String },
    #[error("Too many positional arguments: at most {} are accepted.", POSITIONAL_KEYS.len())]
    TooManyPositionals,
    #[error("Option '{0}' expects a value.")]
    MissingValue(String),
    #[error("Invalid configuration: {0}.")]
    Invalid(String),
    #[error("Could not read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Integrator used to advance the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum SolverConfig {
    /// Classic Runge-Kutta 4 with a fixed maximum step.
    Rk4 { step_size: f64 },
    /// Adaptive Dormand-Prince 5(4).
    Dopri5 { rtol: f64, atol: f64 },
}

impl SolverConfig {
    pub fn rk4() -> Self {
        SolverConfig::Rk4 { step_size: 1.0e-3 }
    }

    pub fn dopri5() -> Self {
        SolverConfig::Dopri5 {
            rtol: 1.0e-6,
            atol: 1.0e-9,
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig::dopri5()
    }
}

/// All parameters of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Rate constant A → B
    pub k1: f64,
    /// Rate constant A → C
    pub k2: f64,
    /// Rate constant B → C
    pub k3: f64,
    /// Inlet concentration of A
    pub a0: f64,
    /// Inlet concentration of B
    pub b0: f64,
    /// Inlet concentration of C
    pub c0: f64,
    /// Final time
    pub t_final: f64,
    /// Number of time samples, both ends included
    pub t_grid: usize,
    /// Number of axial segments
    pub n_points: usize,
    /// Active-site density of every segment
    pub active_sites: f64,
    pub solver: SolverConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            k1: 1.0,
            k2: 0.6,
            k3: 0.4,
            a0: 1.0,
            b0: 0.0,
            c0: 0.0,
            t_final: 5.0,
            t_grid: 50,
            n_points: 100,
            active_sites: DEFAULT_ACTIVE_SITES,
            solver: SolverConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Builds a configuration from command-line arguments (without the program name).
    ///
    /// Accepted forms, applied in order on top of the defaults:
    /// * `--config <file>` - JSON file replacing the current configuration
    /// * `--solver rk4|dopri5` - integrator with its default settings
    /// * `key=value` - named option
    /// * bare values - positional options `k1 k2 k3 A0 B0 C0 Tfinal Tgrid Npoints`
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = RunConfig::default();
        let mut positional = 0;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let arg = arg.as_ref();
            match arg {
                "--config" => {
                    let path = args
                        .next()
                        .ok_or_else(|| ConfigError::MissingValue(arg.to_string()))?;
                    config = RunConfig::from_json_file(path.as_ref())?;
                }
                "--solver" => {
                    let name = args
                        .next()
                        .ok_or_else(|| ConfigError::MissingValue(arg.to_string()))?;
                    config.set("solver", name.as_ref())?;
                }
                _ => {
                    if let Some((key, value)) = arg.split_once('=') {
                        config.set(key, value)?;
                    } else {
                        let key = POSITIONAL_KEYS
                            .get(positional)
                            .ok_or(ConfigError::TooManyPositionals)?;
                        config.set(key, arg)?;
                        positional += 1;
                    }
                }
            }
        }
        Ok(config)
    }

    /// Sets one option by name. Keys are case-insensitive.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key.to_ascii_lowercase().as_str() {
            "k1" => self.k1 = parse(key, value)?,
            "k2" => self.k2 = parse(key, value)?,
            "k3" => self.k3 = parse(key, value)?,
            "a0" => self.a0 = parse(key, value)?,
            "b0" => self.b0 = parse(key, value)?,
            "c0" => self.c0 = parse(key, value)?,
            "tfinal" | "t_final" => self.t_final = parse(key, value)?,
            "tgrid" | "t_grid" => self.t_grid = parse(key, value)?,
            "npoints" | "n_points" => self.n_points = parse(key, value)?,
            "active_sites" => self.active_sites = parse(key, value)?,
            "solver" => {
                self.solver = match value.to_ascii_lowercase().as_str() {
                    "rk4" => SolverConfig::rk4(),
                    "dopri5" => SolverConfig::dopri5(),
                    _ => return Err(bad_value(key, value)),
                }
            }
            "step_size" => match &mut self.solver {
                SolverConfig::Rk4 { step_size } => *step_size = parse(key, value)?,
                SolverConfig::Dopri5 { .. } => {
                    return Err(ConfigError::Invalid(
                        "step_size only applies to the rk4 solver".to_string(),
                    ))
                }
            },
            "rtol" | "atol" => match &mut self.solver {
                SolverConfig::Dopri5 { rtol, atol } => {
                    let tolerance = parse(key, value)?;
                    if key.eq_ignore_ascii_case("rtol") {
                        *rtol = tolerance;
                    } else {
                        *atol = tolerance;
                    }
                }
                SolverConfig::Rk4 { .. } => {
                    return Err(ConfigError::Invalid(format!(
                        "{} only applies to the dopri5 solver",
                        key
                    )))
                }
            },
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Checks the values the driver relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("k1", self.k1),
            ("k2", self.k2),
            ("k3", self.k3),
            ("A0", self.a0),
            ("B0", self.b0),
            ("C0", self.c0),
            ("active_sites", self.active_sites),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::Invalid(format!("{} = {} is not finite", name, value)));
        }
        if !(self.t_final > 0.0 && self.t_final.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "Tfinal must be positive, got {}",
                self.t_final
            )));
        }
        if self.t_grid < 2 {
            return Err(ConfigError::Invalid(format!(
                "Tgrid must be at least 2, got {}",
                self.t_grid
            )));
        }
        if self.n_points < 1 {
            return Err(ConfigError::Invalid("Npoints must be at least 1".to_string()));
        }
        match self.solver {
            SolverConfig::Rk4 { step_size } if !(step_size > 0.0) => Err(ConfigError::Invalid(
                format!("step_size must be positive, got {}", step_size),
            )),
            SolverConfig::Dopri5 { rtol, atol } if !(rtol > 0.0 && atol > 0.0) => Err(
                ConfigError::Invalid(format!(
                    "tolerances must be positive, got rtol = {}, atol = {}",
                    rtol, atol
                )),
            ),
            _ => Ok(()),
        }
    }

    pub fn rate_constants(&self) -> RateConstants {
        RateConstants::new(self.k1, self.k2, self.k3)
    }

    /// Spatial step in space-time units for a reactor of unit length.
    pub fn dtau(&self) -> f64 {
        1.0 / self.n_points as f64
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| bad_value(key, value))
}

fn bad_value(key: &str, value: &str) -> ConfigError {
    ConfigError::BadValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
