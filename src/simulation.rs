use glam::DVec2;

use crate::integrator::{
    DormandPrince, IntegrationError, Integrator, SolverStatus, Stats, Tolerances,
};
use crate::metrics::reissner_nordstrom::{GeodesicState, ReissnerNordstromParams};
use crate::projection;

pub const DEFAULT_SAMPLES: usize = 10_000;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub params: ReissnerNordstromParams,
    pub initial: GeodesicState,
    pub t_span: (f64, f64),
    pub samples: usize,
    pub tolerances: Tolerances,
    /// Upper bound on the solver step size
    pub max_step: f64,
    /// Initial solver step size; estimated from the initial state when `None`
    pub first_step: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            params: ReissnerNordstromParams::default(),
            initial: GeodesicState::new(10.0, 0.0, 0.0, 4.0),
            t_span: (0.0, 100.0),
            samples: DEFAULT_SAMPLES,
            tolerances: Tolerances::default(),
            max_step: f64::INFINITY,
            first_step: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        let ReissnerNordstromParams { mass, charge } = self.params;
        if !(mass.is_finite() && mass > 0.0) {
            return Err(SimulationError::InvalidParameters(format!(
                "mass must be positive and finite, got {}",
                mass
            )));
        }
        if !(charge.is_finite() && charge >= 0.0) {
            return Err(SimulationError::InvalidParameters(format!(
                "charge must be non-negative and finite, got {}",
                charge
            )));
        }
        if !self.initial.is_physical() {
            return Err(SimulationError::InvalidInitialState(format!(
                "initial state must be finite with r > 0, got {:?}",
                self.initial
            )));
        }
        let (t0, t1) = self.t_span;
        if !(t0.is_finite() && t1.is_finite() && t1 > t0) {
            return Err(SimulationError::InvalidInitialState(format!(
                "time span must be finite and increasing, got ({}, {})",
                t0, t1
            )));
        }
        if self.samples < 2 {
            return Err(SimulationError::InvalidInitialState(format!(
                "at least 2 samples are required, got {}",
                self.samples
            )));
        }
        Ok(())
    }

    pub fn time_grid(&self) -> Vec<f64> {
        linspace(self.t_span.0, self.t_span.1, self.samples)
    }
}

#[derive(Debug)]
pub enum SimulationError {
    InvalidParameters(String),
    InvalidInitialState(String),
    Integration(IntegrationError),
}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::InvalidParameters(msg) => write!(f, "Invalid metric parameters: {}", msg),
            SimulationError::InvalidInitialState(msg) => write!(f, "Invalid initial conditions: {}", msg),
            SimulationError::Integration(e) => write!(f, "Integration rejected: {}", e),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Integration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IntegrationError> for SimulationError {
    fn from(e: IntegrationError) -> Self {
        SimulationError::Integration(e)
    }
}

/// `n` evenly spaced values over `[start, stop]`, both endpoints included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut grid: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            grid[n - 1] = stop;
            grid
        }
    }
}

/// Sampled solution of one run. Shorter than requested if the solver failed.
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub params: ReissnerNordstromParams,
    pub times: Vec<f64>,
    pub states: Vec<GeodesicState>,
    pub status: SolverStatus,
    pub stats: Stats,
    pub requested_samples: usize,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_success() && self.states.len() == self.requested_samples
    }

    pub fn cartesian_path(&self) -> Vec<DVec2> {
        projection::cartesian_path(&self.states)
    }

    /// Index of the first sample with r ≤ 0 or a non-finite component.
    pub fn first_non_physical(&self) -> Option<usize> {
        self.states.iter().position(|s| !s.is_physical())
    }

    /// Largest |E(t) - E(0)| over the samples.
    pub fn energy_drift(&self) -> Option<f64> {
        let e0 = self.params.energy(self.states.first()?);
        Some(
            self.states
                .iter()
                .map(|s| (self.params.energy(s) - e0).abs())
                .fold(0.0, f64::max),
        )
    }
}

pub fn run(config: &SimulationConfig) -> Result<Trajectory, SimulationError> {
    let mut integrator = DormandPrince::new(config.tolerances)
        .with_max_step(config.max_step)
        .with_first_step(config.first_step);
    run_with(&mut integrator, config)
}

/// Integrate the geodesic equations with any [`Integrator`].
pub fn run_with<I: Integrator<4>>(
    integrator: &mut I,
    config: &SimulationConfig,
) -> Result<Trajectory, SimulationError> {
    config.validate()?;

    let t_eval = config.time_grid();
    let solution = integrator.solve(
        &config.params,
        config.t_span,
        &config.initial.to_array(),
        &t_eval,
    )?;

    log::debug!(
        "integration finished: {} accepted steps, {} rejected, {} evaluations",
        solution.stats.accepted_steps,
        solution.stats.rejected_steps,
        solution.stats.fn_evals
    );

    let trajectory = Trajectory {
        params: config.params,
        times: solution.t,
        states: solution.y.into_iter().map(GeodesicState::from_array).collect(),
        status: solution.status,
        stats: solution.stats,
        requested_samples: config.samples,
    };

    if let SolverStatus::Failed(e) = &trajectory.status {
        log::warn!(
            "integration stopped early ({}); {} of {} samples available",
            e,
            trajectory.len(),
            trajectory.requested_samples
        );
    }
    if let Some(i) = trajectory.first_non_physical() {
        log::warn!(
            "trajectory leaves the physical domain at t = {} (r = {})",
            trajectory.times[i],
            trajectory.states[i].r
        );
    }

    Ok(trajectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::{OdeSystem, Solution};

    #[test]
    fn linspace_includes_both_endpoints() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        let grid = linspace(0.0, 100.0, DEFAULT_SAMPLES);
        assert_eq!(grid.len(), DEFAULT_SAMPLES);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[DEFAULT_SAMPLES - 1], 100.0);
        assert!(grid.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(linspace(3.0, 4.0, 1), vec![3.0]);
        assert!(linspace(3.0, 4.0, 0).is_empty());
    }

    #[test]
    fn default_orbit_is_bound_and_complete() {
        let config = SimulationConfig::default();
        let trajectory = run(&config).unwrap();

        assert!(trajectory.is_complete());
        assert_eq!(trajectory.len(), DEFAULT_SAMPLES);
        assert_eq!(trajectory.times.len(), DEFAULT_SAMPLES);
        assert_eq!(trajectory.cartesian_path().len(), DEFAULT_SAMPLES);
        assert_eq!(trajectory.times[0], 0.0);
        assert_eq!(trajectory.times[DEFAULT_SAMPLES - 1], 100.0);

        assert_eq!(trajectory.states[0].r, 10.0);
        assert!(trajectory.first_non_physical().is_none());
        for s in &trajectory.states {
            assert!(s.r.is_finite() && s.r > 9.9 && s.r < 25.0, "r = {}", s.r);
            assert_eq!(s.p_phi, 4.0);
        }
    }

    #[test]
    fn default_orbit_moves_outward_and_prograde() {
        let trajectory = run(&SimulationConfig::default()).unwrap();
        let last = trajectory.states.last().unwrap();
        assert!(last.r > 10.0);
        assert!(last.phi > 0.0);
        assert!(trajectory.times.windows(2).all(|t| t[1] > t[0]));
    }

    #[test]
    fn default_orbit_roughly_conserves_energy() {
        let trajectory = run(&SimulationConfig::default()).unwrap();
        let drift = trajectory.energy_drift().unwrap();
        assert!(drift < 2e-3, "energy drift {}", drift);
    }

    #[test]
    fn runs_are_deterministic() {
        let config = SimulationConfig::default();
        let a = run(&config).unwrap();
        let b = run(&config).unwrap();
        assert_eq!(a.states, b.states);
        assert_eq!(a.times, b.times);
        assert_eq!(a.stats, b.stats);
    }

    #[test]
    fn zero_angular_momentum_is_purely_radial() {
        let config = SimulationConfig {
            initial: GeodesicState::new(10.0, 0.0, 0.0, 0.0),
            t_span: (0.0, 10.0),
            samples: 1000,
            ..Default::default()
        };
        let trajectory = run(&config).unwrap();

        assert!(trajectory.is_complete());
        assert!(trajectory.states.iter().all(|s| s.phi == 0.0));
        assert!(trajectory.states.last().unwrap().r < 10.0);
        assert!(trajectory.cartesian_path().iter().all(|p| p.y == 0.0));
    }

    #[test]
    fn radial_plunge_stops_at_the_singularity() {
        let config = SimulationConfig {
            params: ReissnerNordstromParams::new(1.0, 0.0),
            initial: GeodesicState::new(10.0, 0.0, 0.0, 0.0),
            ..Default::default()
        };
        let trajectory = run(&config).unwrap();

        assert!(!trajectory.is_complete());
        match &trajectory.status {
            SolverStatus::Failed(IntegrationError::StepSizeTooSmall { t, .. }) => {
                assert!((*t - 35.0).abs() < 1.0, "collapse at t = {}", t);
            }
            other => panic!("unexpected status {:?}", other),
        }
        assert!(trajectory.len() > 3000 && trajectory.len() < 3600);
        assert_eq!(trajectory.cartesian_path().len(), trajectory.times.len());
        let last = trajectory.states.last().unwrap();
        assert!(last.r > 0.0 && last.r < 1.0, "r = {}", last.r);
    }

    #[test]
    fn step_limits_reach_the_solver() {
        let coarse = run(&SimulationConfig {
            samples: 100,
            ..Default::default()
        })
        .unwrap();
        let fine = run(&SimulationConfig {
            samples: 100,
            max_step: 0.05,
            first_step: Some(0.01),
            ..Default::default()
        })
        .unwrap();

        assert!(fine.is_complete());
        assert!(fine.stats.accepted_steps >= 2000);
        assert!(fine.stats.accepted_steps > coarse.stats.accepted_steps);

        let invalid = SimulationConfig {
            max_step: -1.0,
            ..Default::default()
        };
        assert!(matches!(run(&invalid), Err(SimulationError::Integration(_))));
    }

    #[test]
    fn independent_parameter_sets_coexist() {
        let uncharged = SimulationConfig {
            params: ReissnerNordstromParams::new(1.0, 0.0),
            samples: 500,
            ..Default::default()
        };
        let charged = SimulationConfig {
            params: ReissnerNordstromParams::new(1.0, 0.9),
            samples: 500,
            ..Default::default()
        };
        let a = run(&uncharged).unwrap();
        let b = run(&charged).unwrap();
        assert_eq!(a.params.charge, 0.0);
        assert_eq!(b.params.charge, 0.9);
        assert_ne!(a.states.last(), b.states.last());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let bad_mass = SimulationConfig {
            params: ReissnerNordstromParams::new(0.0, 0.5),
            ..Default::default()
        };
        assert!(matches!(
            run(&bad_mass),
            Err(SimulationError::InvalidParameters(_))
        ));

        let bad_charge = SimulationConfig {
            params: ReissnerNordstromParams::new(1.0, -0.5),
            ..Default::default()
        };
        assert!(matches!(
            run(&bad_charge),
            Err(SimulationError::InvalidParameters(_))
        ));

        let at_singularity = SimulationConfig {
            initial: GeodesicState::new(0.0, 0.0, 0.0, 4.0),
            ..Default::default()
        };
        assert!(matches!(
            run(&at_singularity),
            Err(SimulationError::InvalidInitialState(_))
        ));

        let backwards = SimulationConfig {
            t_span: (10.0, 0.0),
            ..Default::default()
        };
        assert!(backwards.validate().is_err());

        let one_sample = SimulationConfig {
            samples: 1,
            ..Default::default()
        };
        assert!(one_sample.validate().is_err());
    }

    /// Stops after the first half of the grid.
    struct HalfwayIntegrator;

    impl Integrator<4> for HalfwayIntegrator {
        fn solve<S: OdeSystem<4>>(
            &mut self,
            _sys: &S,
            _t_span: (f64, f64),
            y0: &[f64; 4],
            t_eval: &[f64],
        ) -> Result<Solution<4>, IntegrationError> {
            let half = t_eval.len() / 2;
            Ok(Solution {
                t: t_eval[..half].to_vec(),
                y: vec![*y0; half],
                status: SolverStatus::Failed(IntegrationError::StepSizeTooSmall {
                    t: t_eval[half],
                    h: 1e-16,
                }),
                stats: Stats::default(),
            })
        }
    }

    #[test]
    fn solver_failure_is_surfaced() {
        let config = SimulationConfig {
            samples: 100,
            ..Default::default()
        };
        let trajectory = run_with(&mut HalfwayIntegrator, &config).unwrap();

        assert!(!trajectory.is_complete());
        assert!(!trajectory.status.is_success());
        assert_eq!(trajectory.len(), 50);
        assert_eq!(trajectory.cartesian_path().len(), trajectory.times.len());
    }
}
