use glam::DVec2;

use crate::metrics::reissner_nordstrom::GeodesicState;

/// Equatorial plane projection: x = r cos φ, y = r sin φ
pub fn polar_to_cartesian(r: f64, phi: f64) -> DVec2 {
    DVec2::new(r * phi.cos(), r * phi.sin())
}

pub fn cartesian_path(states: &[GeodesicState]) -> Vec<DVec2> {
    states
        .iter()
        .map(|s| polar_to_cartesian(s.r, s.phi))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn zero_angle_lies_on_x_axis() {
        assert_eq!(polar_to_cartesian(7.5, 0.0), DVec2::new(7.5, 0.0));
    }

    #[test]
    fn right_angle_lies_on_y_axis() {
        let p = polar_to_cartesian(3.0, FRAC_PI_2);
        assert!(p.x.abs() < 1e-12);
        assert!((p.y - 3.0).abs() < 1e-12);
    }

    #[test]
    fn radius_is_preserved() {
        for i in 0..16 {
            let phi = i as f64 * PI / 8.0;
            assert!((polar_to_cartesian(2.0, phi).length() - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn path_has_one_point_per_state() {
        let states = vec![
            GeodesicState::new(1.0, 0.0, 0.0, 1.0),
            GeodesicState::new(2.0, PI, 0.0, 1.0),
            GeodesicState::new(f64::NAN, 0.0, 0.0, 1.0),
        ];
        let path = cartesian_path(&states);
        assert_eq!(path.len(), states.len());
        assert!((path[1] - DVec2::new(-2.0, 0.0)).length() < 1e-12);
        assert!(path[2].is_nan());
    }
}
