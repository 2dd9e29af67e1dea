//! Line-vortex segments and free vortex particles
//!
//! The far-field wake model replaces each wake column with semi-infinite
//! trailing vortex filaments; the vorton wake augments the panel wake
//! with free vortex particles. Both kernels are regularized near the
//! filament/particle core.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::vector::Vector3;

/// Velocity induced at `pt` by a straight vortex filament from `a` to `b`
/// with unit circulation, including the 1/4π factor, regularized by
/// `core_radius`.
pub fn vortex_induced_velocity(a: &Vector3, b: &Vector3, pt: &Vector3, core_radius: f64) -> Vector3 {
    let r1 = *pt - *a;
    let r2 = *pt - *b;
    let r1n = r1.norm();
    let r2n = r2.norm();

    if r1n < core_radius || r2n < core_radius {
        return Vector3::zero();
    }

    let cross = r1.cross(&r2);
    let seg = *b - *a;
    // regularized denominator keeps the kernel finite on the filament
    let denom = r1n * r2n * (r1n * r2n + r1.dot(&r2)) + (core_radius * seg.norm()).powi(2);
    if denom.abs() < 1.0e-30 {
        return Vector3::zero();
    }

    cross * ((r1n + r2n) / denom / (4.0 * PI))
}

/// A free vortex particle carrying a concentrated circulation vector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vorton {
    /// Particle position
    pub position: Vector3,
    /// Circulation vector (strength × direction)
    pub alpha: Vector3,
    /// Inactive vortons are skipped by the field evaluation
    pub active: bool,
}

impl Vorton {
    pub fn new(position: Vector3, alpha: Vector3) -> Self {
        Self {
            position,
            alpha,
            active: true,
        }
    }

    /// Velocity induced at `pt`, with a smooth algebraic core of length
    /// `core_length`.
    pub fn induced_velocity(&self, pt: &Vector3, core_length: f64) -> Vector3 {
        let r = *pt - self.position;
        let d2 = r.norm_sq() + core_length * core_length;
        let d = d2.sqrt();
        self.alpha.cross(&r) / (4.0 * PI * d2 * d)
    }

    /// Velocity-gradient tensor `g[i][j] = ∂V_j/∂x_i` at `pt`.
    pub fn velocity_gradient(&self, pt: &Vector3, core_length: f64) -> [[f64; 3]; 3] {
        let r = *pt - self.position;
        let d2 = r.norm_sq() + core_length * core_length;
        let d = d2.sqrt();
        let inv = 1.0 / (4.0 * PI * d2 * d);

        let cross = self.alpha.cross(&r);
        let a = [self.alpha.x, self.alpha.y, self.alpha.z];
        let rv = [r.x, r.y, r.z];
        let cv = [cross.x, cross.y, cross.z];

        // ∂/∂x_i of (α × r)_j / d³: the cross-product term differentiates
        // through the Levi-Civita symbol, the 1/d³ term through r_i
        let mut g = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                let eps_term = match (i, j) {
                    (0, 1) => a[2],
                    (0, 2) => -a[1],
                    (1, 0) => -a[2],
                    (1, 2) => a[0],
                    (2, 0) => a[1],
                    (2, 1) => -a[0],
                    _ => 0.0,
                };
                g[i][j] = inv * (eps_term - 3.0 * cv[j] * rv[i] / d2);
            }
        }
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_segment_velocity_orientation() {
        // filament along +x, point above on +z: velocity along -y
        let a = Vector3::new(-100.0, 0.0, 0.0);
        let b = Vector3::new(100.0, 0.0, 0.0);
        let pt = Vector3::new(0.0, 0.0, 1.0);
        let v = vortex_induced_velocity(&a, &b, &pt, 0.0);
        assert!(v.y < 0.0);
        // near-infinite filament: |V| → Γ/(2π h)
        assert_relative_eq!(v.y.abs(), 1.0 / (2.0 * PI), max_relative = 1e-3);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_segment_velocity_regularized_on_core() {
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(1.0, 0.0, 0.0);
        let pt = Vector3::new(0.5, 1.0e-6, 0.0);
        let v = vortex_induced_velocity(&a, &b, &pt, 1.0e-3);
        assert!(v.norm().is_finite());
        // the core keeps the velocity well below the unregularized value
        assert!(v.norm() < 1.0 / (2.0 * PI * 1.0e-4));
    }

    #[test]
    fn test_vorton_velocity_decay() {
        let vtn = Vorton::new(Vector3::zero(), Vector3::new(0.0, 0.0, 1.0));
        let v1 = vtn.induced_velocity(&Vector3::new(1.0, 0.0, 0.0), 0.01);
        let v2 = vtn.induced_velocity(&Vector3::new(2.0, 0.0, 0.0), 0.01);
        // 1/r² decay of the far field
        assert_relative_eq!(v1.norm() / v2.norm(), 4.0, max_relative = 1e-2);
    }

    #[test]
    fn test_vorton_gradient_is_consistent() {
        let vtn = Vorton::new(Vector3::zero(), Vector3::new(0.3, -0.2, 1.0));
        let pt = Vector3::new(0.7, 0.4, -0.5);
        let core = 0.05;
        let g = vtn.velocity_gradient(&pt, core);

        let h = 1.0e-6;
        for i in 0..3 {
            let mut dp = pt;
            match i {
                0 => dp.x += h,
                1 => dp.y += h,
                _ => dp.z += h,
            }
            let vp = vtn.induced_velocity(&dp, core);
            let v0 = vtn.induced_velocity(&pt, core);
            let fd = (vp - v0) / h;
            assert_relative_eq!(g[i][0], fd.x, max_relative = 1e-3, epsilon = 1e-6);
            assert_relative_eq!(g[i][1], fd.y, max_relative = 1e-3, epsilon = 1e-6);
            assert_relative_eq!(g[i][2], fd.z, max_relative = 1e-3, epsilon = 1e-6);
        }
    }
}
