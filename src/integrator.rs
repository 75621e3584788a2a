//! Dormand–Prince 5(4) integrator with dense output.
//!
//! Explicit embedded Runge–Kutta pair (FSAL, 7 stages) with adaptive step
//! control and a 4th-order continuous extension used to sample the solution at
//! requested times without constraining the step sequence.
//!
//! Reference: Dormand, J.R. & Prince, P.J. (1980). "A family of embedded
//! Runge-Kutta formulae". J. Comp. Appl. Math. 6(1).

/// System of ordinary differential equations: dy/dt = f(t, y)
pub trait OdeSystem<const N: usize> {
    /// Evaluate the right-hand side into `dydt`.
    fn rhs(&self, t: f64, y: &[f64; N], dydt: &mut [f64; N]);
}

/// Anything that can produce states of an [`OdeSystem`] at requested times.
pub trait Integrator<const N: usize> {
    /// Integrate `sys` over `t_span` starting from `y0` and sample the solution
    /// at each time of `t_eval`, which must lie in the span and be ordered in
    /// the direction of integration.
    ///
    /// Invalid input is an `Err`. A failure during integration is reported
    /// through [`Solution::status`], with the samples reached so far.
    fn solve<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t_span: (f64, f64),
        y0: &[f64; N],
        t_eval: &[f64],
    ) -> Result<Solution<N>, IntegrationError>;
}

const STAGES: usize = 7;

const C: [f64; 6] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0];

const A: [[f64; 5]; 6] = [
    [0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
    ],
];

/// 5th order weights (propagated solution)
const B: [f64; 6] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];

/// Difference between the 5th and 4th order weights, including the FSAL stage
const E: [f64; STAGES] = [
    -71.0 / 57600.0,
    0.0,
    71.0 / 16695.0,
    -71.0 / 1920.0,
    17253.0 / 339200.0,
    -22.0 / 525.0,
    1.0 / 40.0,
];

/// Dense output coefficients: y(t_old + x h) = y_old + h Σ_s K_s Σ_j P[s][j] x^(j+1)
const P: [[f64; 4]; STAGES] = [
    [
        1.0,
        -8048581381.0 / 2820520608.0,
        8663915743.0 / 2820520608.0,
        -12715105075.0 / 11282082432.0,
    ],
    [0.0, 0.0, 0.0, 0.0],
    [
        0.0,
        131558114200.0 / 32700410799.0,
        -68118460800.0 / 10900136933.0,
        87487479700.0 / 32700410799.0,
    ],
    [
        0.0,
        -1754552775.0 / 470086768.0,
        14199869525.0 / 1410260304.0,
        -10690763975.0 / 1880347072.0,
    ],
    [
        0.0,
        127303824393.0 / 49829197408.0,
        -318862633887.0 / 49829197408.0,
        701980252875.0 / 199316789632.0,
    ],
    [
        0.0,
        -282668133.0 / 205662961.0,
        2019193451.0 / 616988883.0,
        -1453857185.0 / 822651844.0,
    ],
    [
        0.0,
        40617522.0 / 29380423.0,
        -110615467.0 / 29380423.0,
        69997945.0 / 29380423.0,
    ],
];

/// Order of the embedded error estimate.
const ERROR_ESTIMATOR_ORDER: f64 = 4.0;

/// Tolerance specification for error control
///
/// Scaled error: |err| / (atol + rtol * max(|y|, |y_new|))
#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rtol: 1e-3,
            atol: 1e-6,
        }
    }
}

impl Tolerances {
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol }
    }
}

/// Step-size controller
///
/// h_new = safety * h * error^(-1/(q+1)), q = order of the error estimate
#[derive(Debug, Clone)]
pub struct StepController {
    /// Safety factor
    pub safety: f64,
    /// Maximum growth factor per step
    pub max_factor: f64,
    /// Minimum reduction factor per step
    pub min_factor: f64,
    exponent: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            max_factor: 10.0,
            min_factor: 0.2,
            exponent: -1.0 / (ERROR_ESTIMATOR_ORDER + 1.0),
        }
    }
}

impl StepController {
    /// Growth factor after an accepted step. No growth right after a rejection.
    fn accept_factor(&self, error_norm: f64, after_rejection: bool) -> f64 {
        let factor = if error_norm == 0.0 {
            self.max_factor
        } else {
            self.max_factor
                .min(self.safety * error_norm.powf(self.exponent))
        };
        if after_rejection {
            factor.min(1.0)
        } else {
            factor
        }
    }

    /// Shrink factor after a rejected step. A NaN error falls back to `min_factor`.
    fn reject_factor(&self, error_norm: f64) -> f64 {
        self.min_factor
            .max(self.safety * error_norm.powf(self.exponent))
    }
}

/// Integration statistics for diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    /// Total number of right-hand side evaluations
    pub fn_evals: u64,
    /// Number of accepted steps
    pub accepted_steps: u64,
    /// Number of rejected steps
    pub rejected_steps: u64,
}

/// Outcome of a call to [`Integrator::solve`].
#[derive(Debug, Clone, PartialEq)]
pub enum SolverStatus {
    /// The end of the span was reached.
    Completed,
    /// Integration stopped early; samples past the failure are missing.
    Failed(IntegrationError),
}

impl SolverStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, SolverStatus::Completed)
    }
}

/// Solution sampled at the requested times.
#[derive(Debug, Clone)]
pub struct Solution<const N: usize> {
    pub t: Vec<f64>,
    pub y: Vec<[f64; N]>,
    pub status: SolverStatus,
    pub stats: Stats,
}

/// Errors from the integrator
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrationError {
    /// Step size fell below the resolution of t
    StepSizeTooSmall {
        /// Time at which the step collapsed
        t: f64,
        /// Rejected step size
        h: f64,
    },
    /// Maximum number of steps exceeded
    MaxStepsExceeded {
        /// Time reached
        t: f64,
    },
    /// Invalid input parameters
    InvalidInput {
        /// Description of the invalid input
        message: String,
    },
}

impl std::fmt::Display for IntegrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrationError::StepSizeTooSmall { t, h } => {
                write!(f, "Step size {:e} too small at t = {}", h, t)
            }
            IntegrationError::MaxStepsExceeded { t } => {
                write!(f, "Maximum number of integration steps exceeded at t = {}", t)
            }
            IntegrationError::InvalidInput { message } => {
                write!(f, "Invalid input: {}", message)
            }
        }
    }
}

impl std::error::Error for IntegrationError {}

/// An accepted step. The stages live in the integrator workspace.
struct Step<const N: usize> {
    t_new: f64,
    h: f64,
    y_new: [f64; N],
    f_new: [f64; N],
}

/// Dormand–Prince 5(4) integrator
#[derive(Debug, Clone)]
pub struct DormandPrince<const N: usize> {
    tol: Tolerances,
    controller: StepController,
    /// Upper bound on |h|
    max_step: f64,
    /// Initial |h|; selected automatically when `None`
    first_step: Option<f64>,
    /// Maximum number of accepted steps before giving up
    max_steps: u64,
    /// Stage derivatives of the last attempted step
    k: [[f64; N]; STAGES],
    pub stats: Stats,
}

impl<const N: usize> DormandPrince<N> {
    pub fn new(tol: Tolerances) -> Self {
        Self {
            tol,
            controller: StepController::default(),
            max_step: f64::INFINITY,
            first_step: None,
            max_steps: 10_000_000,
            k: [[0.0; N]; STAGES],
            stats: Stats::default(),
        }
    }

    pub fn with_max_step(mut self, max_step: f64) -> Self {
        self.max_step = max_step;
        self
    }

    pub fn with_first_step(mut self, first_step: Option<f64>) -> Self {
        self.first_step = first_step;
        self
    }

    fn validate_inputs(
        &self,
        t_span: (f64, f64),
        y0: &[f64; N],
        t_eval: &[f64],
    ) -> Result<(), IntegrationError> {
        let (t0, t1) = t_span;
        if !t0.is_finite() || !t1.is_finite() {
            return Err(IntegrationError::InvalidInput {
                message: "t_span bounds must be finite".to_string(),
            });
        }
        if t0 == t1 {
            return Err(IntegrationError::InvalidInput {
                message: "t_span must not be empty".to_string(),
            });
        }
        if !(self.tol.rtol > 0.0 && self.tol.atol >= 0.0) {
            return Err(IntegrationError::InvalidInput {
                message: format!(
                    "tolerances must satisfy rtol > 0, atol >= 0 (got rtol = {}, atol = {})",
                    self.tol.rtol, self.tol.atol
                ),
            });
        }
        if !(self.max_step > 0.0) {
            return Err(IntegrationError::InvalidInput {
                message: format!("max_step must be positive, got {}", self.max_step),
            });
        }
        if let Some(h) = self.first_step {
            if !(h.is_finite() && h > 0.0) {
                return Err(IntegrationError::InvalidInput {
                    message: format!("first_step must be positive and finite, got {}", h),
                });
            }
        }
        for (i, &val) in y0.iter().enumerate() {
            if !val.is_finite() {
                return Err(IntegrationError::InvalidInput {
                    message: format!("y0[{}] is not finite", i),
                });
            }
        }

        let direction = (t1 - t0).signum();
        let (lo, hi) = (t0.min(t1), t0.max(t1));
        if let Some(&bad) = t_eval.iter().find(|&&t| !(lo..=hi).contains(&t)) {
            return Err(IntegrationError::InvalidInput {
                message: format!("t_eval value {} lies outside [{}, {}]", bad, lo, hi),
            });
        }
        if t_eval.windows(2).any(|w| (w[1] - w[0]) * direction < 0.0) {
            return Err(IntegrationError::InvalidInput {
                message: "t_eval must be ordered in the direction of integration".to_string(),
            });
        }
        Ok(())
    }

    /// Root-mean-square norm of `v`.
    fn rms_norm(v: &[f64; N]) -> f64 {
        if N == 0 {
            return 0.0;
        }
        (v.iter().map(|x| x * x).sum::<f64>() / N as f64).sqrt()
    }

    /// Initial step size following Hairer, Nørsett & Wanner, Sec. II.4.
    fn initial_step<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t0: f64,
        y0: &[f64; N],
        f0: &[f64; N],
        direction: f64,
        t_bound: f64,
    ) -> f64 {
        let interval = (t_bound - t0).abs();
        let mut scale = [0.0; N];
        let mut y_scaled = [0.0; N];
        let mut f_scaled = [0.0; N];
        for n in 0..N {
            scale[n] = self.tol.atol + y0[n].abs() * self.tol.rtol;
            y_scaled[n] = y0[n] / scale[n];
            f_scaled[n] = f0[n] / scale[n];
        }
        let d0 = Self::rms_norm(&y_scaled);
        let d1 = Self::rms_norm(&f_scaled);

        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        let h0 = h0.min(interval);

        let mut y1 = [0.0; N];
        for n in 0..N {
            y1[n] = y0[n] + h0 * direction * f0[n];
        }
        let mut f1 = [0.0; N];
        sys.rhs(t0 + h0 * direction, &y1, &mut f1);
        self.stats.fn_evals += 1;

        let mut df_scaled = [0.0; N];
        for n in 0..N {
            df_scaled[n] = (f1[n] - f0[n]) / scale[n];
        }
        let d2 = Self::rms_norm(&df_scaled) / h0;

        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            1e-6_f64.max(h0 * 1e-3)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / (ERROR_ESTIMATOR_ORDER + 1.0))
        };

        (100.0 * h0).min(h1).min(interval).min(self.max_step)
    }

    /// One Runge–Kutta step of size `h`; fills the stage workspace.
    #[allow(clippy::needless_range_loop)]
    fn rk_step<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t: f64,
        y: &[f64; N],
        f: &[f64; N],
        h: f64,
    ) -> ([f64; N], [f64; N]) {
        self.k[0] = *f;
        let mut y_temp = [0.0; N];

        for s in 1..6 {
            for n in 0..N {
                let mut sum = 0.0;
                for j in 0..s {
                    sum += A[s][j] * self.k[j][n];
                }
                y_temp[n] = y[n] + h * sum;
            }
            sys.rhs(t + C[s] * h, &y_temp, &mut self.k[s]);
        }

        let mut y_new = [0.0; N];
        for n in 0..N {
            let mut sum = 0.0;
            for s in 0..6 {
                sum += B[s] * self.k[s][n];
            }
            y_new[n] = y[n] + h * sum;
        }

        let mut f_new = [0.0; N];
        sys.rhs(t + h, &y_new, &mut f_new);
        self.k[STAGES - 1] = f_new;
        self.stats.fn_evals += 6;

        (y_new, f_new)
    }

    /// Scaled RMS norm of the embedded error estimate of the last step.
    #[allow(clippy::needless_range_loop)]
    fn error_norm(&self, y: &[f64; N], y_new: &[f64; N], h: f64) -> f64 {
        let mut scaled = [0.0; N];
        for n in 0..N {
            let mut err = 0.0;
            for s in 0..STAGES {
                err += E[s] * self.k[s][n];
            }
            let scale = self.tol.atol + y[n].abs().max(y_new[n].abs()) * self.tol.rtol;
            scaled[n] = h * err / scale;
        }
        Self::rms_norm(&scaled)
    }

    /// Attempt steps from `t` until one is accepted or the step size collapses.
    #[allow(clippy::too_many_arguments)]
    fn advance<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t: f64,
        y: &[f64; N],
        f: &[f64; N],
        h_abs: &mut f64,
        direction: f64,
        t_bound: f64,
    ) -> Result<Step<N>, IntegrationError> {
        let min_step = 10.0 * spacing(t);
        if *h_abs > self.max_step {
            *h_abs = self.max_step;
        } else if *h_abs < min_step {
            *h_abs = min_step;
        }

        let mut rejected = false;
        loop {
            if *h_abs < min_step {
                return Err(IntegrationError::StepSizeTooSmall { t, h: *h_abs });
            }

            let mut t_new = t + *h_abs * direction;
            if direction * (t_new - t_bound) > 0.0 {
                t_new = t_bound;
            }
            let h = t_new - t;
            *h_abs = h.abs();

            let (y_new, f_new) = self.rk_step(sys, t, y, f, h);
            let error_norm = self.error_norm(y, &y_new, h);

            if error_norm < 1.0 {
                *h_abs *= self.controller.accept_factor(error_norm, rejected);
                self.stats.accepted_steps += 1;
                return Ok(Step {
                    t_new,
                    h,
                    y_new,
                    f_new,
                });
            }

            *h_abs *= self.controller.reject_factor(error_norm);
            self.stats.rejected_steps += 1;
            rejected = true;
        }
    }

    /// Evaluate the continuous extension of the last accepted step at `t`.
    #[allow(clippy::needless_range_loop)]
    fn interpolate(&self, t_old: f64, y_old: &[f64; N], h: f64, t: f64) -> [f64; N] {
        let x = (t - t_old) / h;
        let powers = [x, x * x, x * x * x, x * x * x * x];
        let mut y = [0.0; N];
        for n in 0..N {
            let mut sum = 0.0;
            for s in 0..STAGES {
                let mut poly = 0.0;
                for j in 0..4 {
                    poly += P[s][j] * powers[j];
                }
                sum += self.k[s][n] * poly;
            }
            y[n] = y_old[n] + h * sum;
        }
        y
    }
}

impl<const N: usize> Integrator<N> for DormandPrince<N> {
    fn solve<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t_span: (f64, f64),
        y0: &[f64; N],
        t_eval: &[f64],
    ) -> Result<Solution<N>, IntegrationError> {
        self.validate_inputs(t_span, y0, t_eval)?;
        self.stats = Stats::default();

        let (t0, t_bound) = t_span;
        let direction = (t_bound - t0).signum();

        let mut t = t0;
        let mut y = *y0;
        let mut f = [0.0; N];
        sys.rhs(t, &y, &mut f);
        self.stats.fn_evals += 1;

        let mut h_abs = match self.first_step {
            Some(h) => h.min(self.max_step).min((t_bound - t0).abs()),
            None => self.initial_step(sys, t, &y, &f, direction, t_bound),
        };

        let mut ts = Vec::with_capacity(t_eval.len());
        let mut ys = Vec::with_capacity(t_eval.len());
        let mut next = 0;

        // Samples at the initial time are the initial state.
        while next < t_eval.len() && t_eval[next] == t0 {
            ts.push(t0);
            ys.push(y);
            next += 1;
        }

        let mut status = SolverStatus::Completed;
        while (t_bound - t) * direction > 0.0 {
            if self.stats.accepted_steps >= self.max_steps {
                status = SolverStatus::Failed(IntegrationError::MaxStepsExceeded { t });
                break;
            }

            let step = match self.advance(sys, t, &y, &f, &mut h_abs, direction, t_bound) {
                Ok(step) => step,
                Err(e) => {
                    status = SolverStatus::Failed(e);
                    break;
                }
            };

            while next < t_eval.len() && (t_eval[next] - step.t_new) * direction <= 0.0 {
                ts.push(t_eval[next]);
                ys.push(self.interpolate(t, &y, step.h, t_eval[next]));
                next += 1;
            }

            t = step.t_new;
            y = step.y_new;
            f = step.f_new;
        }

        Ok(Solution {
            t: ts,
            y: ys,
            status,
            stats: self.stats.clone(),
        })
    }
}

/// Distance from |x| to the next larger representable f64.
fn spacing(x: f64) -> f64 {
    let a = x.abs();
    f64::from_bits(a.to_bits() + 1) - a
}
