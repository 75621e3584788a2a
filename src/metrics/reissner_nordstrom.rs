use crate::integrator::OdeSystem;

/// Parameters for the Reissner–Nordström metric.
///
/// ds² = -f(r)dt² + f(r)⁻¹dr² + r²(dθ² + sin²θ dφ²),  f(r) = 1 - 2M/r + Q²/r²
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReissnerNordstromParams {
    /// Mass M in geometric units (G = c = 1)
    pub mass: f64,
    /// Charge Q in geometric units
    pub charge: f64,
}

impl Default for ReissnerNordstromParams {
    fn default() -> Self {
        Self {
            mass: 1.0,
            charge: 0.5,
        }
    }
}

/// Equatorial state of the test particle: (r, φ, p_r, p_φ).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodesicState {
    pub r: f64,
    pub phi: f64,
    pub p_r: f64,
    pub p_phi: f64,
}

impl GeodesicState {
    pub fn new(r: f64, phi: f64, p_r: f64, p_phi: f64) -> Self {
        Self { r, phi, p_r, p_phi }
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.r, self.phi, self.p_r, self.p_phi]
    }

    pub fn from_array(y: [f64; 4]) -> Self {
        Self::new(y[0], y[1], y[2], y[3])
    }

    /// r is positive and every component is finite.
    pub fn is_physical(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite()) && self.r > 0.0
    }
}

impl ReissnerNordstromParams {
    pub fn new(mass: f64, charge: f64) -> Self {
        Self { mass, charge }
    }

    /// Lapse function f(r) = 1 - 2M/r + Q²/r². Not defined at r = 0.
    pub fn lapse(&self, r: f64) -> f64 {
        1.0 - (2.0 * self.mass) / r + (self.charge * self.charge) / (r * r)
    }

    /// Q > M: no horizon hides the singularity.
    pub fn is_naked_singularity(&self) -> bool {
        self.charge > self.mass
    }

    fn horizon_discriminant(&self) -> Option<f64> {
        let d = self.mass * self.mass - self.charge * self.charge;
        (d >= 0.0).then(|| d.sqrt())
    }

    /// Outer (event) horizon r+ = M + √(M² - Q²)
    pub fn outer_horizon(&self) -> Option<f64> {
        self.horizon_discriminant().map(|s| self.mass + s)
    }

    /// Inner (Cauchy) horizon r- = M - √(M² - Q²)
    pub fn inner_horizon(&self) -> Option<f64> {
        self.horizon_discriminant().map(|s| self.mass - s)
    }

    /// Potential whose negative radial gradient is the radial force of
    /// [`Self::derivatives`]:
    ///
    /// V(r) = -M/r + (Q² + p_φ²)/(2r²) - 2M p_φ²/(3r³)
    pub fn effective_potential(&self, r: f64, p_phi: f64) -> f64 {
        let m = self.mass;
        let q2 = self.charge * self.charge;
        let l2 = p_phi * p_phi;
        -m / r + (q2 + l2) / (2.0 * r * r) - 2.0 * m * l2 / (3.0 * r * r * r)
    }

    /// E = p_r²/2 + V(r), constant along exact solutions of the model.
    pub fn energy(&self, state: &GeodesicState) -> f64 {
        0.5 * state.p_r * state.p_r + self.effective_potential(state.r, state.p_phi)
    }

    /// Equations of motion. Autonomous, so `_t` is ignored.
    ///
    /// dr/dt   = p_r
    /// dφ/dt   = p_φ / r²
    /// dp_r/dt = -M/r² + Q²/r³ + p_φ²/r³ - 2M p_φ²/r⁴
    /// dp_φ/dt = 0
    pub fn derivatives(&self, _t: f64, state: &GeodesicState) -> GeodesicState {
        let GeodesicState { r, p_r, p_phi, .. } = *state;
        let m = self.mass;
        let q = self.charge;

        let dr = p_r;
        let dphi = p_phi / (r * r);
        let dp_r = -(m / (r * r)) + (q * q) / (r * r * r) + (p_phi * p_phi) / (r * r * r)
            - (2.0 * m * p_phi * p_phi) / (r * r * r * r);

        GeodesicState::new(dr, dphi, dp_r, 0.0)
    }
}

impl OdeSystem<4> for ReissnerNordstromParams {
    fn rhs(&self, t: f64, y: &[f64; 4], dydt: &mut [f64; 4]) {
        *dydt = self.derivatives(t, &GeodesicState::from_array(*y)).to_array();
    }
}
