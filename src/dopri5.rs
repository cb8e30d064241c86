//! Explicit Runge-Kutta method with Dormand-Prince coefficients of order 5(4) and dense output of order 4.
//!
//! The step size adapts to the local error while the solution is reported on a fixed
//! grid of sample times through the dense output polynomial.

use crate::constants::{control, initial_step, stiffness};
use crate::controller::{Controller, Decision};
use crate::system::{check_time_grid, scalar, IntegrationError, Stats, System};
use crate::tableau;
use crate::trajectory::Trajectory;

use log::{debug, warn};
use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, OVector, Scalar};
use num_traits::Zero;
use simba::scalar::{ClosedAdd, ClosedMul, ClosedNeg, ClosedSub, SubsetOf};

/// Tuning parameters of the adaptive stepper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dopri5Options {
    /// Safety factor used in the computation of the adaptive step size
    pub safety_factor: f64,
    /// Value of the beta coefficient of the PI controller
    pub beta: f64,
    /// Minimum factor between two successive steps
    pub fac_min: f64,
    /// Maximum factor between two successive steps
    pub fac_max: f64,
    /// Maximum step size, the whole time span when `None`
    pub h_max: Option<f64>,
    /// Initial step size, computed automatically when `None`
    pub h_init: Option<f64>,
    /// Maximum number of steps
    pub n_max: u32,
    /// Stiffness is tested when the number of accepted steps is a multiple of `n_stiff`
    pub n_stiff: u32,
}

impl Default for Dopri5Options {
    fn default() -> Self {
        Dopri5Options {
            safety_factor: control::SAFETY_FACTOR,
            beta: control::BETA,
            fac_min: control::FAC_MIN,
            fac_max: control::FAC_MAX,
            h_max: None,
            h_init: None,
            n_max: control::MAX_STEPS,
            n_stiff: stiffness::DEFAULT_CHECK_INTERVAL,
        }
    }
}

/// Structure containing the parameters for the numerical integration.
pub struct Dopri5<V, F>
where
    F: System<V>,
{
    f: F,
    grid: Vec<f64>,
    x: f64,
    x_old: f64,
    y: V,
    rtol: f64,
    atol: f64,
    options: Dopri5Options,
    x_out: Vec<f64>,
    y_out: Vec<V>,
    h: f64,
    h_old: f64,
    rcont: [V; 5],
    stats: Stats,
}

impl<T, D: Dim, F> Dopri5<OVector<T, D>, F>
where
    f64: From<T>,
    T: Copy + SubsetOf<f64> + Scalar + ClosedAdd + ClosedMul + ClosedSub + ClosedNeg + Zero,
    F: System<OVector<T, D>>,
    DefaultAllocator: Allocator<T, D>,
{
    /// Default initializer for the structure
    ///
    /// # Arguments
    ///
    /// * `f`       - Structure implementing the System<V> trait
    /// * `grid`    - Increasing sample times, the first one being the initial time
    /// * `y`       - Initial value of the dependent variable(s)
    /// * `rtol`    - Relative tolerance used in the computation of the adaptive step size
    /// * `atol`    - Absolute tolerance used in the computation of the adaptive step size
    ///
    pub fn new(f: F, grid: Vec<f64>, y: OVector<T, D>, rtol: f64, atol: f64) -> Self {
        Self::with_options(f, grid, y, rtol, atol, Dopri5Options::default())
    }

    /// Initializer with explicit tuning parameters.
    pub fn with_options(
        f: F,
        grid: Vec<f64>,
        y: OVector<T, D>,
        rtol: f64,
        atol: f64,
        options: Dopri5Options,
    ) -> Self {
        let (rows, cols) = y.shape_generic();
        let x = grid.first().copied().unwrap_or(0.0);
        Self {
            f,
            grid,
            x,
            x_old: x,
            y,
            rtol,
            atol,
            options,
            x_out: Vec::new(),
            y_out: Vec::new(),
            h: 0.0,
            h_old: 0.0,
            rcont: [
                OVector::zeros_generic(rows, cols),
                OVector::zeros_generic(rows, cols),
                OVector::zeros_generic(rows, cols),
                OVector::zeros_generic(rows, cols),
                OVector::zeros_generic(rows, cols),
            ],
            stats: Stats::new(),
        }
    }

    /// Error scale of component `i` for the current and proposed solution values.
    fn scale(&self, y_i: f64, y_next_i: f64) -> f64 {
        self.atol + y_i.abs().max(y_next_i.abs()) * self.rtol
    }

    /// Compute the initial stepsize
    fn hinit(&self, f0: &OVector<T, D>, h_max: f64) -> f64 {
        let (rows, cols) = self.y.shape_generic();
        let dim = rows.value();

        // Compute the norm of y0 and f0
        let mut d0 = 0.0;
        let mut d1 = 0.0;
        for i in 0..dim {
            let y_i = f64::from(self.y[i]);
            let sci = self.scale(y_i, y_i);
            d0 += (y_i / sci) * (y_i / sci);
            let f0_i = f64::from(f0[i]);
            d1 += (f0_i / sci) * (f0_i / sci);
        }

        let h0 = if d0 < initial_step::MIN_TOLERANCE || d1 < initial_step::MIN_TOLERANCE {
            initial_step::DEFAULT_INITIAL_STEP
        } else {
            initial_step::SAFETY_FACTOR * (d0 / d1).sqrt()
        }
        .min(h_max);

        // Explicit Euler step to estimate the second derivative
        let y1 = &self.y + f0 * scalar::<T>(h0);
        let mut f1 = OVector::zeros_generic(rows, cols);
        self.f.system(self.x + h0, &y1, &mut f1);

        let mut d2: f64 = 0.0;
        for i in 0..dim {
            let f0_i = f64::from(f0[i]);
            let f1_i = f64::from(f1[i]);
            let y_i = f64::from(self.y[i]);
            let sci = self.scale(y_i, y_i);
            d2 += ((f1_i - f0_i) / sci) * ((f1_i - f0_i) / sci);
        }
        d2 = d2.sqrt() / h0;

        let h1 = if d1.sqrt().max(d2.abs()) <= 1.0E-15 {
            (1.0E-6_f64).max(h0 * 1.0E-3)
        } else {
            (0.01 / (d1.sqrt().max(d2))).powf(1.0 / 5.0)
        };

        (100.0 * h0).min(h1.min(h_max))
    }

    /// Core integration method.
    ///
    /// Records the initial state and then one state per grid time. Integration ends at the
    /// last grid time, or earlier if [`System::solout`] returns true. In that case the
    /// samples run up to the end of the accepted step that triggered the stop.
    pub fn integrate(&mut self) -> Result<Stats, IntegrationError> {
        check_time_grid(&self.grid)?;

        let (rows, cols) = self.y.shape_generic();
        let dim = rows.value();
        let x_end = self.grid[self.grid.len() - 1];
        self.x = self.grid[0];
        self.x_old = self.x;
        self.x_out.clear();
        self.y_out.clear();
        self.x_out.push(self.x);
        self.y_out.push(self.y.clone());
        let mut next_sample = 1;

        let options = self.options;
        let h_max = options.h_max.unwrap_or(x_end - self.x).abs();
        let mut controller = Controller::new(
            0.2 - options.beta * 0.75,
            options.beta,
            options.fac_max,
            options.fac_min,
            h_max,
            options.safety_factor,
        );

        let mut k = vec![OVector::zeros_generic(rows, cols); 7];
        self.f.system(self.x, &self.y, &mut k[0]);
        self.stats.num_eval += 1;

        self.h = match options.h_init {
            Some(h) => h.min(h_max),
            None => {
                self.stats.num_eval += 1;
                self.hinit(&k[0], controller.h_max())
            }
        };
        self.h_old = self.h;

        let mut n_step = 0;
        let mut last = false;
        let mut non_stiff = 0;
        let mut iasti = 0;

        while !last {
            if n_step > options.n_max {
                return Err(IntegrationError::MaxNumStepReached { x: self.x, n_step });
            }
            if !(0.1 * self.h.abs() > f64::EPSILON * self.x.abs()) {
                return Err(IntegrationError::StepSizeUnderflow { x: self.x });
            }

            // Check if it's the last iteration
            if self.x + 1.01 * self.h - x_end > 0.0 {
                self.h = x_end - self.x;
                last = true;
            }
            n_step += 1;

            let h: T = scalar(self.h);

            // 6 Stages, the last one evaluated at the new solution (FSAL)
            let mut y_next = self.y.clone();
            let mut y_stiff = self.y.clone();
            for s in 1..7 {
                let mut y_stage = self.y.clone();
                for (j, k_value) in k.iter().enumerate().take(s) {
                    y_stage += k_value * (h * scalar::<T>(tableau::A[s][j]));
                }
                self.f
                    .system(self.x + self.h * tableau::C[s], &y_stage, &mut k[s]);
                match s {
                    5 => y_stiff = y_stage,
                    6 => y_next = y_stage,
                    _ => {}
                }
            }
            k[1] = k[6].clone();
            self.stats.num_eval += 6;

            // Dense output weights, before k[3] is reused for the error estimate
            self.rcont[4] = (&k[0] * scalar::<T>(tableau::D[0])
                + &k[2] * scalar::<T>(tableau::D[2])
                + &k[3] * scalar::<T>(tableau::D[3])
                + &k[4] * scalar::<T>(tableau::D[4])
                + &k[5] * scalar::<T>(tableau::D[5])
                + &k[1] * scalar::<T>(tableau::D[6]))
                * h;

            k[3] = (&k[0] * scalar::<T>(tableau::E[0])
                + &k[2] * scalar::<T>(tableau::E[2])
                + &k[3] * scalar::<T>(tableau::E[3])
                + &k[4] * scalar::<T>(tableau::E[4])
                + &k[5] * scalar::<T>(tableau::E[5])
                + &k[1] * scalar::<T>(tableau::E[6]))
                * h;

            let mut err = 0.0;
            for i in 0..dim {
                let sc_i = self.scale(f64::from(self.y[i]), f64::from(y_next[i]));
                let err_est_i = f64::from(k[3][i]);
                err += (err_est_i / sc_i) * (err_est_i / sc_i);
            }
            err = (err / dim.max(1) as f64).sqrt();

            match controller.decide(err, self.h) {
                Decision::Accept(h_new) => {
                    self.stats.accepted_steps += 1;

                    let check_stiffness = options.n_stiff > 0
                        && self.stats.accepted_steps % options.n_stiff == 0;
                    if check_stiffness || iasti > 0 {
                        let num = f64::from((&k[1] - &k[5]).dot(&(&k[1] - &k[5])));
                        let den = f64::from((&y_next - &y_stiff).dot(&(&y_next - &y_stiff)));
                        let h_lamb = if den > 0.0 {
                            self.h * (num / den).sqrt()
                        } else {
                            0.0
                        };

                        if h_lamb > stiffness::DOPRI5_THRESHOLD {
                            iasti += 1;
                            non_stiff = 0;
                            if iasti == stiffness::MAX_STIFF_ITERATIONS {
                                warn!("dopri5: stiffness detected at x = {}", self.x);
                                return Err(IntegrationError::StiffnessDetected { x: self.x });
                            }
                        } else {
                            non_stiff += 1;
                            if non_stiff == stiffness::NON_STIFF_RESET_COUNT {
                                iasti = 0;
                            }
                        }
                    }

                    let ydiff = &y_next - &self.y;
                    let bspl = &k[0] * h - &ydiff;
                    self.rcont[0] = self.y.clone();
                    self.rcont[1] = ydiff.clone();
                    self.rcont[2] = bspl.clone();
                    self.rcont[3] = -&k[1] * h + ydiff - bspl;

                    k[0] = k[1].clone();
                    self.y = y_next;
                    self.x_old = self.x;
                    self.x = if last { x_end } else { self.x + self.h };
                    self.h_old = self.h;

                    next_sample = self.sample_output(next_sample);

                    if self.f.solout(self.x, &self.y, &k[0]) {
                        debug!("dopri5 stopped by solout at x = {}", self.x);
                        last = true;
                    }
                    self.h = h_new;
                }
                Decision::Reject(h_new) => {
                    last = false;
                    if self.stats.accepted_steps >= 1 {
                        self.stats.rejected_steps += 1;
                    }
                    self.h = h_new;
                }
            }
        }

        debug!(
            "dopri5 finished: {} samples, {} accepted, {} rejected",
            self.x_out.len(),
            self.stats.accepted_steps,
            self.stats.rejected_steps
        );
        Ok(self.stats)
    }

    /// Interpolates every grid time covered by the last accepted step, starting at `next`.
    fn sample_output(&mut self, mut next: usize) -> usize {
        while next < self.grid.len() && self.grid[next] <= self.x {
            let xd = self.grid[next];
            let theta = (xd - self.x_old) / self.h_old;
            let theta1: T = scalar(1.0 - theta);
            let theta: T = scalar(theta);
            self.x_out.push(xd);
            self.y_out.push(
                &self.rcont[0]
                    + (&self.rcont[1]
                        + (&self.rcont[2] + (&self.rcont[3] + &self.rcont[4] * theta1) * theta)
                            * theta1)
                        * theta,
            );
            next += 1;
        }
        next
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
