//! Numerical constants of the adaptive stepper.

/// Stiffness detection thresholds
pub mod stiffness {
    /// Stiffness threshold for DOPRI5 method
    /// Based on Hairer & Wanner, "Solving Ordinary Differential Equations II"
    pub const DOPRI5_THRESHOLD: f64 = 3.25;

    /// Maximum consecutive stiffness detections before error
    pub const MAX_STIFF_ITERATIONS: u32 = 15;

    /// Number of non-stiff steps needed to reset stiffness counter
    pub const NON_STIFF_RESET_COUNT: u32 = 6;

    /// Stiffness is tested every this many accepted steps
    pub const DEFAULT_CHECK_INTERVAL: u32 = 1000;
}

/// Initial step size computation constants
pub mod initial_step {
    /// Minimum tolerance for initial step computation
    pub const MIN_TOLERANCE: f64 = 1.0e-10;

    /// Default initial step when tolerance conditions not met
    pub const DEFAULT_INITIAL_STEP: f64 = 1.0e-6;

    /// Safety factor for initial step estimation
    pub const SAFETY_FACTOR: f64 = 0.01;
}

/// PI controller defaults
pub mod control {
    pub const SAFETY_FACTOR: f64 = 0.9;
    pub const BETA: f64 = 0.04;
    pub const FAC_MIN: f64 = 0.2;
    pub const FAC_MAX: f64 = 10.0;
    pub const MAX_STEPS: u32 = 100_000;
}
