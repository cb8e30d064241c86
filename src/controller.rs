//! Adaptive step size control.

/// Outcome of the error test on one trial step, with the size proposed for the next attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Accept(f64),
    Reject(f64),
}

/// PI controller used for adaptive step size control.
#[derive(Debug, Clone)]
pub struct Controller {
    alpha: f64,
    beta: f64,
    facc1: f64,
    facc2: f64,
    fac_old: f64,
    h_max: f64,
    reject: bool,
    safety_factor: f64,
}

impl Controller {
    /// Creates a controller responsible for adaptive step size control.
    ///
    /// # Arguments
    ///
    /// * `alpha`   - &#945; coefficient of the PI controller
    /// * `beta`    - &#946; coefficient of the PI controller
    /// * `fac_max` - Maximum factor between two successive steps
    /// * `fac_min` - Minimum factor between two successive steps
    /// * `h_max`   - Maximum step size
    /// * `safety_factor`   - Safety factor of the PI controller
    ///
    pub fn new(
        alpha: f64,
        beta: f64,
        fac_max: f64,
        fac_min: f64,
        h_max: f64,
        safety_factor: f64,
    ) -> Controller {
        Controller {
            alpha,
            beta,
            facc1: 1.0 / fac_min,
            facc2: 1.0 / fac_max,
            fac_old: 1.0E-4,
            h_max: h_max.abs(),
            reject: false,
            safety_factor,
        }
    }

    /// Tests the scaled error `err` of a step of size `h`.
    ///
    /// A NaN error is always rejected and shrinks the step by `fac_min`.
    pub fn decide(&mut self, err: f64, h: f64) -> Decision {
        let fac11 = err.powf(self.alpha);
        let fac = (fac11 * self.fac_old.powf(-self.beta) / self.safety_factor)
            .min(self.facc1)
            .max(self.facc2);
        let mut h_new = h / fac;

        if err <= 1.0 {
            self.fac_old = err.max(1.0E-4);
            h_new = h_new.min(self.h_max);
            if self.reject {
                h_new = h_new.min(h);
            }
            self.reject = false;
            Decision::Accept(h_new)
        } else {
            self.reject = true;
            Decision::Reject(h / self.facc1.min(fac11 / self.safety_factor))
        }
    }

    /// Returns the maximum step size allowed.
    pub fn h_max(&self) -> f64 {
        self.h_max
    }
}
