//! Right-hand side of the coke formation model.
//!
//! Each axial segment carries the concentrations of A, B and C. A and B are carried
//! downstream by an upwind advection term in space time `tau` and react on the free
//! active sites; coke (C) stays where it is deposited. The inlet segment is a fixed
//! feed, so its derivatives are always zero.
//!
//! ```
//! use coke_reactor::coke::evaluate_rhs;
//!
//! let state = [1.0, 0.0, 0.0, 0.5, 0.1, 0.0];
//! let dstate = evaluate_rhs(&state, 0.0, 1.0, 0.6, 0.4, &[0.82, 0.82], 0.5).unwrap();
//! assert_eq!(&dstate[..3], &[0.0, 0.0, 0.0]);
//! ```

use crate::discretization::upwind_difference;
use crate::kinetics::RateConstants;
use crate::layout::{index, segment_count, species_views, Species, SPECIES_PER_SEGMENT};
use crate::system::System;

use log::error;
use nalgebra::DVector;
use thiserror::Error;

/// Errors raised at the boundary of the model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("State of length {state_len} does not match {sites_len} segments of site density.")]
    ShapeMismatch { state_len: usize, sites_len: usize },
}

/// Evaluates `d(state)/dt` of the coke formation model.
///
/// # Arguments
///
/// * `state`        - Interleaved concentrations `[A_0, B_0, C_0, A_1, ...]`
/// * `_time`        - Current time. The model is autonomous; the value is ignored
/// * `k1`           - Rate constant of A → B
/// * `k2`           - Rate constant of A → C
/// * `k3`           - Rate constant of B → C
/// * `site_density` - Active-site density of every segment
/// * `dtau`         - Spatial step in space-time units
///
/// Returns a freshly allocated vector with the layout of `state`. Fails with
/// [`ModelError::ShapeMismatch`] unless `state.len() == 3 * site_density.len()`.
/// A zero `dtau` is not checked and yields non-finite derivatives.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_rhs(
    state: &[f64],
    _time: f64,
    k1: f64,
    k2: f64,
    k3: f64,
    site_density: &[f64],
    dtau: f64,
) -> Result<Vec<f64>, ModelError> {
    check_shape(state.len(), site_density.len())?;
    let mut dstate = vec![0.0; state.len()];
    fill_derivative(
        state,
        &RateConstants::new(k1, k2, k3),
        site_density,
        dtau,
        &mut dstate,
    );
    Ok(dstate)
}

fn check_shape(state_len: usize, sites_len: usize) -> Result<(), ModelError> {
    match segment_count(state_len) {
        Some(n) if n == sites_len => Ok(()),
        _ => Err(ModelError::ShapeMismatch {
            state_len,
            sites_len,
        }),
    }
}

/// Writes the derivative of `state` into `dstate`. Shapes must already be consistent.
fn fill_derivative(
    state: &[f64],
    rates: &RateConstants,
    site_density: &[f64],
    dtau: f64,
    dstate: &mut [f64],
) {
    let (a, b, c) = species_views(state);

    // Fixed feed at the inlet
    for d in dstate.iter_mut().take(SPECIES_PER_SEGMENT) {
        *d = 0.0;
    }

    let diff_a = upwind_difference(&a, dtau);
    let diff_b = upwind_difference(&b, dtau);

    for i in 1..a.len() {
        let r = rates.rates(a[i], b[i], c[i], site_density[i]);
        dstate[index(i, Species::A)] = -diff_a[i - 1] - r.consumption_a;
        dstate[index(i, Species::B)] = -diff_b[i - 1] + r.net_b;
        // Coke is not transported
        dstate[index(i, Species::C)] = r.production_c;
    }
}

/// Coke formation model with its parameter set bound for an integration run.
#[derive(Debug, Clone, PartialEq)]
pub struct CokeModel {
    rates: RateConstants,
    site_density: DVector<f64>,
    dtau: f64,
}

impl CokeModel {
    /// Creates the model from explicit per-segment site densities.
    pub fn new(rates: RateConstants, site_density: DVector<f64>, dtau: f64) -> Self {
        CokeModel {
            rates,
            site_density,
            dtau,
        }
    }

    /// Reactor of unit length split into `npoints` segments sharing the same site density.
    ///
    /// `dtau` is `1 / npoints`.
    pub fn with_uniform_sites(rates: RateConstants, npoints: usize, density: f64) -> Self {
        CokeModel::new(
            rates,
            DVector::from_element(npoints, density),
            1.0 / npoints as f64,
        )
    }

    pub fn rates(&self) -> &RateConstants {
        &self.rates
    }

    pub fn site_density(&self) -> &DVector<f64> {
        &self.site_density
    }

    pub fn dtau(&self) -> f64 {
        self.dtau
    }

    /// Number of axial segments.
    pub fn segments(&self) -> usize {
        self.site_density.len()
    }

    /// Length of a state vector accepted by the model.
    pub fn state_len(&self) -> usize {
        SPECIES_PER_SEGMENT * self.segments()
    }

    /// Same contract as [`evaluate_rhs`] with the bound parameters.
    pub fn evaluate(&self, state: &[f64], time: f64) -> Result<Vec<f64>, ModelError> {
        evaluate_rhs(
            state,
            time,
            self.rates.k1,
            self.rates.k2,
            self.rates.k3,
            self.site_density.as_slice(),
            self.dtau,
        )
    }
}

impl System<DVector<f64>> for CokeModel {
    fn system(&self, _x: f64, y: &DVector<f64>, dy: &mut DVector<f64>) {
        if let Err(e) = check_shape(y.len(), self.segments())
            .and_then(|_| check_shape(dy.len(), self.segments()))
        {
            // The steppers reject non-finite error estimates until the step underflows.
            error!("{}", e);
            dy.fill(f64::NAN);
            return;
        }
        fill_derivative(
            y.as_slice(),
            &self.rates,
            self.site_density.as_slice(),
            self.dtau,
            dy.as_mut_slice(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const K1: f64 = 1.0;
    const K2: f64 = 0.6;
    const K3: f64 = 0.4;

    fn sample_state(npoints: usize) -> Vec<f64> {
        (0..3 * npoints)
            .map(|i| 0.05 * ((i * 7 % 11) as f64))
            .collect()
    }

    #[test]
    fn test_two_segment_scenario() {
        let state = [1.0, 0.0, 0.0, 0.5, 0.1, 0.0];
        let dstate = evaluate_rhs(&state, 0.0, K1, K2, K3, &[0.82, 0.82], 0.5).unwrap();
        let expected = [0.0, 0.0, 0.0, 0.344, 0.1772, 0.2788];
        assert_eq!(dstate.len(), expected.len());
        for (value, reference) in dstate.iter().zip(expected.iter()) {
            assert_relative_eq!(*value, *reference, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_inlet_is_fixed() {
        for npoints in 1..6 {
            let state = sample_state(npoints);
            let sites = vec![0.82; npoints];
            let dstate = evaluate_rhs(&state, 1.3, K1, K2, K3, &sites, 0.2).unwrap();
            assert_eq!(dstate.len(), state.len());
            assert_eq!(&dstate[..3], &[0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_single_segment_is_all_zeros() {
        let dstate = evaluate_rhs(&[0.3, 0.2, 0.1], 0.0, 5.0, 3.0, 2.0, &[0.5], 0.0).unwrap();
        assert_eq!(dstate, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_empty_reactor() {
        let dstate = evaluate_rhs(&[], 0.0, K1, K2, K3, &[], 1.0).unwrap();
        assert!(dstate.is_empty());
    }

    #[test]
    fn test_pure_transport_without_reactions() {
        let npoints = 5;
        let dtau = 1.0 / npoints as f64;
        let state = sample_state(npoints);
        let sites = vec![0.82; npoints];
        let dstate = evaluate_rhs(&state, 0.0, 0.0, 0.0, 0.0, &sites, dtau).unwrap();
        for i in 1..npoints {
            let diff_a = (state[index(i, Species::A)] - state[index(i - 1, Species::A)]) / dtau;
            let diff_b = (state[index(i, Species::B)] - state[index(i - 1, Species::B)]) / dtau;
            assert_eq!(dstate[index(i, Species::A)], -diff_a);
            assert_eq!(dstate[index(i, Species::B)], -diff_b);
            assert_eq!(dstate[index(i, Species::C)], 0.0);
        }
    }

    #[test]
    fn test_capacity_exhaustion_is_not_clamped() {
        let sites = [0.82, 0.82];
        // Equal concentrations in both segments so only kinetics contribute.
        let fresh = [0.5, 0.1, 0.0, 0.5, 0.1, 0.2];
        let coked = [0.5, 0.1, 0.0, 0.5, 0.1, 1.5];
        let d_fresh = evaluate_rhs(&fresh, 0.0, K1, K2, K3, &sites, 0.5).unwrap();
        let d_coked = evaluate_rhs(&coked, 0.0, K1, K2, K3, &sites, 0.5).unwrap();
        assert!(d_fresh[3] < 0.0);
        assert!(d_coked[3] > 0.0);
        assert!(d_coked[5] < 0.0);
        assert_relative_eq!(d_coked[3], (K1 + K2) * 0.5 * 0.68, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_step_propagates() {
        let state = [1.0, 0.0, 0.0, 0.5, 0.0, 0.0];
        let dstate = evaluate_rhs(&state, 0.0, K1, K2, K3, &[0.82, 0.82], 0.0).unwrap();
        assert_eq!(dstate[3], f64::INFINITY);
        assert!(dstate[4].is_nan());
        assert!(dstate[5].is_finite());
    }

    #[test]
    fn test_shape_mismatch() {
        assert_eq!(
            evaluate_rhs(&[1.0, 0.0, 0.0, 0.5], 0.0, K1, K2, K3, &[0.82], 0.5),
            Err(ModelError::ShapeMismatch {
                state_len: 4,
                sites_len: 1
            })
        );
        assert!(evaluate_rhs(&[1.0, 0.0, 0.0], 0.0, K1, K2, K3, &[0.82, 0.82], 0.5).is_err());
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let state = sample_state(8);
        let sites = vec![0.7; 8];
        let first = evaluate_rhs(&state, 0.0, K1, K2, K3, &sites, 0.125).unwrap();
        let second = evaluate_rhs(&state, 3.0, K1, K2, K3, &sites, 0.125).unwrap();
        let first_bits: Vec<u64> = first.iter().map(|v| v.to_bits()).collect();
        let second_bits: Vec<u64> = second.iter().map(|v| v.to_bits()).collect();
        assert_eq!(first_bits, second_bits);
        assert_eq!(state, sample_state(8));
    }

    #[test]
    fn test_concurrent_calls_do_not_interfere() {
        let model = CokeModel::with_uniform_sites(RateConstants::new(K1, K2, K3), 6, 0.82);
        let states: Vec<Vec<f64>> = (0..4)
            .map(|k| sample_state(6).iter().map(|v| v * (k + 1) as f64).collect())
            .collect();
        let serial: Vec<Vec<f64>> = states
            .iter()
            .map(|s| model.evaluate(s, 0.0).unwrap())
            .collect();

        let model = &model;
        let parallel: Vec<Vec<f64>> = std::thread::scope(|scope| {
            let handles: Vec<_> = states
                .iter()
                .map(|s| scope.spawn(move || model.evaluate(s, 0.0).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_system_matches_evaluate() {
        let model = CokeModel::with_uniform_sites(RateConstants::new(K1, K2, K3), 4, 0.82);
        assert_eq!(model.state_len(), 12);
        assert_relative_eq!(model.dtau(), 0.25);
        let state = sample_state(4);
        let expected = model.evaluate(&state, 0.0).unwrap();

        // Stale values in the output buffer must be overwritten.
        let mut dy = DVector::from_element(12, 42.0);
        model.system(0.0, &DVector::from_vec(state), &mut dy);
        assert_eq!(dy.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_system_flags_wrong_shape() {
        let model = CokeModel::with_uniform_sites(RateConstants::new(K1, K2, K3), 4, 0.82);
        let mut dy = DVector::zeros(9);
        model.system(0.0, &DVector::zeros(9), &mut dy);
        assert!(dy.iter().all(|v| v.is_nan()));
    }
}
