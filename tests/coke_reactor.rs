use approx::assert_relative_eq;
use coke_reactor::config::{RunConfig, SolverConfig};
use coke_reactor::driver::{initial_state, Simulation};
use coke_reactor::layout::{index, Species};
use coke_reactor::{evaluate_rhs, CokeModel, Dopri5, RateConstants, System};
use nalgebra::DVector;

fn small_config(solver: SolverConfig) -> RunConfig {
    RunConfig {
        t_final: 1.0,
        t_grid: 11,
        n_points: 10,
        solver,
        ..RunConfig::default()
    }
}

#[test]
fn test_trajectory_shape_and_inlet() {
    let config = small_config(SolverConfig::dopri5());
    let result = Simulation::new(config.clone()).unwrap().run().unwrap();
    let trajectory = &result.trajectory;

    assert_eq!(trajectory.len(), 11);
    assert_relative_eq!(trajectory.times()[10], 1.0);
    for state in trajectory.states() {
        assert_eq!(state.len(), 30);
        assert_eq!(state[index(0, Species::A)], config.a0);
        assert_eq!(state[index(0, Species::B)], config.b0);
        assert_eq!(state[index(0, Species::C)], config.c0);
    }
    assert!(result.stats.accepted_steps > 0);
}

#[test]
fn test_rk4_and_dopri5_agree() {
    let adaptive = Simulation::new(small_config(SolverConfig::Dopri5 {
        rtol: 1e-9,
        atol: 1e-12,
    }))
    .unwrap()
    .run()
    .unwrap();
    let fixed = Simulation::new(small_config(SolverConfig::Rk4 { step_size: 1e-3 }))
        .unwrap()
        .run()
        .unwrap();

    let (_, y_adaptive) = adaptive.trajectory.last().unwrap();
    let (_, y_fixed) = fixed.trajectory.last().unwrap();
    for (a, b) in y_adaptive.iter().zip(y_fixed.iter()) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn test_coke_accumulates_while_sites_are_free() {
    let result = Simulation::new(small_config(SolverConfig::rk4()))
        .unwrap()
        .run()
        .unwrap();
    let trajectory = &result.trajectory;

    for segment in 1..10 {
        let coke = trajectory.species_history(segment, Species::C).unwrap();
        assert!(coke.windows(2).all(|w| w[1] >= w[0] - 1e-12));
        assert!(coke.iter().all(|&c| c < 0.82));
    }
    // Feed has reached the outlet and deposited coke there.
    let outlet_coke = trajectory.outlet(Species::C).unwrap();
    assert!(*outlet_coke.last().unwrap() > 0.0);
    let profile = trajectory.profile(10, Species::C).unwrap();
    assert!(profile[1] > profile[9]);
}

#[test]
fn test_without_reactions_feed_is_transported_unchanged() {
    let config = RunConfig {
        k1: 0.0,
        k2: 0.0,
        k3: 0.0,
        t_final: 5.0,
        t_grid: 6,
        n_points: 5,
        ..RunConfig::default()
    };
    let result = Simulation::new(config).unwrap().run().unwrap();
    let (_, y) = result.trajectory.last().unwrap();
    // After five residence times the reactor is filled with feed.
    for segment in 0..5 {
        assert!((y[index(segment, Species::A)] - 1.0).abs() < 1e-2);
        assert_eq!(y[index(segment, Species::C)], 0.0);
    }
}

#[test]
fn test_model_is_a_drop_in_system() {
    let config = small_config(SolverConfig::dopri5());
    let model = CokeModel::with_uniform_sites(RateConstants::new(1.0, 0.6, 0.4), 10, 0.82);
    let y0 = initial_state(&config);

    let mut dy = DVector::zeros(30);
    model.system(0.0, &y0, &mut dy);
    let expected = evaluate_rhs(y0.as_slice(), 0.0, 1.0, 0.6, 0.4, &[0.82; 10], 0.1).unwrap();
    assert_eq!(dy.as_slice(), expected.as_slice());

    let grid: Vec<f64> = (0..=4).map(|i| 0.25 * i as f64).collect();
    let mut stepper = Dopri5::new(model, grid, y0, 1e-6, 1e-9);
    stepper.integrate().unwrap();
    assert_eq!(stepper.y_out().len(), 5);
}
