//! Explicit Runge-Kutta method of order 4 with fixed step size.

use crate::system::{check_time_grid, scalar, IntegrationError, Stats, System};
use crate::trajectory::Trajectory;

use log::debug;
use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, OVector, Scalar};
use num_traits::Zero;
use simba::scalar::{ClosedAdd, ClosedMul, ClosedSub, SubsetOf};

const SUBSTEP_ROUNDING: f64 = 1.0e-12;

/// Structure containing the parameters for the numerical integration.
///
/// Each interval between two consecutive sample times is split into equal substeps no
/// longer than `step_size`, so the solution is recorded exactly at every sample time.
pub struct Rk4<V, F>
where
    F: System<V>,
{
    f: F,
    grid: Vec<f64>,
    y: V,
    step_size: f64,
    x_out: Vec<f64>,
    y_out: Vec<V>,
    stats: Stats,
}

impl<T, D: Dim, F> Rk4<OVector<T, D>, F>
where
    T: Copy + SubsetOf<f64> + Scalar + ClosedAdd + ClosedMul + ClosedSub + Zero,
    F: System<OVector<T, D>>,
    DefaultAllocator: Allocator<T, D>,
{
    /// Default initializer for the structure
    ///
    /// # Arguments
    ///
    /// * `f`           - Structure implementing the System<V> trait
    /// * `grid`        - Increasing sample times, the first one being the initial time
    /// * `y`           - Initial value of the dependent variable(s)
    /// * `step_size`   - Largest step size used in the method
    ///
    pub fn new(f: F, grid: Vec<f64>, y: OVector<T, D>, step_size: f64) -> Self {
        Rk4 {
            f,
            grid,
            y,
            step_size,
            x_out: Vec::new(),
            y_out: Vec::new(),
            stats: Stats::new(),
        }
    }

    /// Core integration method.
    pub fn integrate(&mut self) -> Result<Stats, IntegrationError> {
        check_time_grid(&self.grid)?;
        if !(self.step_size > 0.0 && self.step_size.is_finite()) {
            return Err(IntegrationError::InvalidStepSize { h: self.step_size });
        }

        self.x_out.clear();
        self.y_out.clear();
        self.x_out.push(self.grid[0]);
        self.y_out.push(self.y.clone());

        for i in 1..self.grid.len() {
            let (x_start, x_end) = (self.grid[i - 1], self.grid[i]);
            // Round-off in the sample times must not add a substep.
            let ratio = (x_end - x_start) / self.step_size;
            let num_steps = (ratio * (1.0 - SUBSTEP_ROUNDING)).ceil().max(1.0) as usize;
            let h = (x_end - x_start) / num_steps as f64;

            for n in 0..num_steps {
                let x = x_start + n as f64 * h;
                self.y = self.step(x, h);
                self.stats.num_eval += 4;
                self.stats.accepted_steps += 1;
            }

            self.x_out.push(x_end);
            self.y_out.push(self.y.clone());

            let (rows, cols) = self.y.shape_generic();
            let mut dy = OVector::zeros_generic(rows, cols);
            self.f.system(x_end, &self.y, &mut dy);
            self.stats.num_eval += 1;
            if self.f.solout(x_end, &self.y, &dy) {
                debug!("rk4 stopped by solout at x = {}", x_end);
                break;
            }
        }

        debug!(
            "rk4 finished: {} samples, {} steps",
            self.x_out.len(),
            self.stats.accepted_steps
        );
        Ok(self.stats)
    }

    /// Performs one step of the Runge-Kutta 4 method from `(x, self.y)`.
    fn step(&self, x: f64, step_size: f64) -> OVector<T, D> {
        let (rows, cols) = self.y.shape_generic();
        let mut k1 = OVector::zeros_generic(rows, cols);
        let mut k2 = OVector::zeros_generic(rows, cols);
        let mut k3 = OVector::zeros_generic(rows, cols);
        let mut k4 = OVector::zeros_generic(rows, cols);

        let h: T = scalar(step_size);
        let half: T = scalar(step_size / 2.0);
        let two: T = scalar(2.0);

        self.f.system(x, &self.y, &mut k1);
        self.f
            .system(x + step_size / 2.0, &(&self.y + &k1 * half), &mut k2);
        self.f
            .system(x + step_size / 2.0, &(&self.y + &k2 * half), &mut k3);
        self.f.system(x + step_size, &(&self.y + &k3 * h), &mut k4);

        &self.y + (k1 + k2 * two + k3 * two + k4) * scalar::<T>(step_size / 6.0)
    }

    /// Getter for the independent variable's output.
    pub fn x_out(&self) -> &Vec<f64> {
        &self.x_out
    }

    /// Getter for the dependent variables' output.
    pub fn y_out(&self) -> &Vec<OVector<T, D>> {
        &self.y_out
    }

    /// Consumes the stepper and returns the recorded samples.
    pub fn into_trajectory(self) -> Trajectory<OVector<T, D>> {
        Trajectory::new(self.x_out, self.y_out)
    }
}

#[cfg(test)]
mod tests {
    use crate::rk4::Rk4;
    use crate::system::System;
    use nalgebra::{allocator::Allocator, DVector, DefaultAllocator, Dim, OVector, Vector1};

    struct Test1 {}
    impl<D: Dim> System<OVector<f64, D>> for Test1
    where
        DefaultAllocator: Allocator<f64, D>,
    {
        fn system(&self, x: f64, y: &OVector<f64, D>, dy: &mut OVector<f64, D>) {
            dy[0] = (x - y[0]) / 2.;
        }
    }

    struct Test2 {}
    impl<D: Dim> System<OVector<f64, D>> for Test2
    where
        DefaultAllocator: Allocator<f64, D>,
    {
        fn system(&self, x: f64, y: &OVector<f64, D>, dy: &mut OVector<f64, D>) {
            dy[0] = -2. * x - y[0];
        }
    }

    struct Test3 {}
    impl<D: Dim> System<OVector<f64, D>> for Test3
    where
        DefaultAllocator: Allocator<f64, D>,
    {
        fn system(&self, x: f64, y: &OVector<f64, D>, dy: &mut OVector<f64, D>) {
            dy[0] = (5. * x * x - y[0]) / (x + y[0]).exp();
        }
    }

    // Stops once the solution drops below zero.
    struct Decay {}
    impl System<Vector1<f64>> for Decay {
        fn system(&self, _x: f64, _y: &Vector1<f64>, dy: &mut Vector1<f64>) {
            dy[0] = -1.0;
        }

        fn solout(&mut self, _x: f64, y: &Vector1<f64>, _dy: &Vector1<f64>) -> bool {
            y[0] < 0.0
        }
    }

    fn grid(x_end: f64, samples: usize) -> Vec<f64> {
        (0..samples)
            .map(|i| x_end * i as f64 / (samples - 1) as f64)
            .collect()
    }

    #[test]
    fn test_integrate_test1_svector() {
        let mut stepper = Rk4::new(Test1 {}, grid(0.2, 3), Vector1::new(1.), 0.1);
        let _ = stepper.integrate();
        let x_out = stepper.x_out();
        let y_out = stepper.y_out();
        assert!((*x_out.last().unwrap() - 0.2).abs() < 1.0E-8);
        assert!((&y_out[1][0] - 0.95369).abs() < 1.0E-5);
        assert!((&y_out[2][0] - 0.91451).abs() < 1.0E-5);
    }

    #[test]
    fn test_integrate_test2_svector() {
        let mut stepper = Rk4::new(Test2 {}, grid(0.5, 6), Vector1::new(-1.), 0.1);
        let _ = stepper.integrate();
        let x_out = stepper.x_out();
        let y_out = stepper.y_out();
        assert!((*x_out.last().unwrap() - 0.5).abs() < 1.0E-8);
        assert!((&y_out[3][0] + 0.82246).abs() < 1.0E-5);
        assert!((&y_out[5][0] + 0.81959).abs() < 1.0E-5);
    }

    #[test]
    fn test_integrate_test3_dvector() {
        let mut stepper = Rk4::new(Test3 {}, grid(1., 11), DVector::from(vec![1.]), 0.1);
        let stats = stepper.integrate().unwrap();
        assert_eq!(stats.accepted_steps, 10);
        let out = stepper.y_out();
        assert!((&out[5][0] - 0.913059839).abs() < 1.0E-9);
        assert!((&out[8][0] - 0.9838057659).abs() < 1.0E-9);
        assert!((&out[10][0] - 1.0715783953).abs() < 1.0E-9);
    }

    #[test]
    fn test_coarse_grid_uses_substeps() {
        // Two samples 0.2 apart with a 0.1 step reproduce the fine-grid value.
        let mut stepper = Rk4::new(Test1 {}, vec![0.0, 0.2], Vector1::new(1.), 0.1);
        let stats = stepper.integrate().unwrap();
        assert_eq!(stats.accepted_steps, 2);
        let trajectory = stepper.into_trajectory();
        assert_eq!(trajectory.len(), 2);
        assert!((trajectory.states()[1][0] - 0.91451).abs() < 1.0E-5);
    }

    #[test]
    fn test_solout_stops_at_sample() {
        let mut stepper = Rk4::new(Decay {}, grid(2.0, 5), Vector1::new(0.75), 0.1);
        let _ = stepper.integrate().unwrap();
        assert_eq!(stepper.x_out().len(), 3);
        assert!((stepper.x_out()[2] - 1.0).abs() < 1.0E-12);
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut stepper = Rk4::new(Test1 {}, vec![0.0], Vector1::new(1.), 0.1);
        assert!(stepper.integrate().is_err());
        let mut stepper = Rk4::new(Test1 {}, grid(1.0, 3), Vector1::new(1.), 0.0);
        assert!(stepper.integrate().is_err());
    }
}
