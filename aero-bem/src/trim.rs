//! Trim and equilibrium search
//!
//! Two nested scalar root-finding stages: the zero-pitching-moment angle
//! of attack, then the speed at which the lift balances the weight. Both
//! work on functions with no closed-form derivative, are cancellable and
//! report non-convergence as a normal outcome.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::analysis::PanelAnalysis;
use crate::config::{wind_direction, wind_normal};
use crate::vector::Vector3;

/// Iteration cap of both the bracketing and the secant stages.
const CM_ITER_MAX: usize = 50;
/// Moment-coefficient convergence threshold.
const CM_EPS: f64 = 1.0e-7;

/// Why a trim search did not produce an equilibrium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimFailure {
    /// No sign change of the moment was found inside the search bracket
    NoBracket,
    /// The secant iteration hit its cap without converging
    NoConvergence,
    /// The lift at the zero-moment angle is not positive; the
    /// configuration cannot trim at a positive load factor
    NegativeLift,
    /// The cooperative cancellation flag was observed
    Cancelled,
}

/// A converged trim state.
#[derive(Debug, Clone, Copy)]
pub struct TrimPoint {
    /// Zero-moment angle of attack (degrees)
    pub alpha_eq: f64,
    /// Speed balancing lift and weight (m/s)
    pub u0: f64,
}

/// Finds the angle where `cm` crosses zero, searching in `[−45°, 45°]`.
///
/// The bracket is shrunk geometrically until the moment changes sign
/// across it, then a secant iteration (replacing the end point with the
/// matching sign) refines the root until `|Cm|` is below threshold.
/// Angles are in degrees.
pub fn zero_moment_angle<F>(mut cm: F, cancel: &AtomicBool) -> Result<f64, TrimFailure>
where
    F: FnMut(f64) -> f64,
{
    let mut a0 = -45.0_f64;
    let mut a1 = 45.0_f64;

    let mut cm0 = cm(a0);
    let mut cm1 = cm(a1);

    // shrink until the bracket straddles the root
    let mut iter = 0;
    while cm0 * cm1 > 0.0 && iter <= CM_ITER_MAX {
        a0 *= 0.9;
        a1 *= 0.9;
        cm0 = cm(a0);
        cm1 = cm(a1);
        iter += 1;
        if cancel.load(Ordering::Relaxed) {
            return Err(TrimFailure::Cancelled);
        }
    }
    if iter > CM_ITER_MAX {
        log::info!("no zero-moment bracket found in [-45°, 45°]");
        return Err(TrimFailure::NoBracket);
    }

    // order the bracket so that cm0 < 0 < cm1
    if cm0 > cm1 {
        std::mem::swap(&mut a0, &mut a1);
        std::mem::swap(&mut cm0, &mut cm1);
    }

    let mut a = a0;
    let mut value = 1.0_f64;
    iter = 0;
    while value.abs() > CM_EPS && iter <= CM_ITER_MAX {
        a = a0 - (a1 - a0) * cm0 / (cm1 - cm0);
        value = cm(a);
        if value > 0.0 {
            a1 = a;
            cm1 = value;
        } else {
            a0 = a;
            cm0 = value;
        }
        iter += 1;
        if cancel.load(Ordering::Relaxed) {
            return Err(TrimFailure::Cancelled);
        }
    }

    if iter > CM_ITER_MAX {
        return Err(TrimFailure::NoConvergence);
    }
    Ok(a)
}

impl PanelAnalysis {
    /// Zero-moment angle of this analysis, iterating the on-body moment
    /// evaluation. Requires the unit solutions and local velocities.
    pub fn zero_moment_angle(
        &mut self,
        cog: &Vector3,
        fuse_moments: bool,
    ) -> Result<f64, TrimFailure> {
        let cancel = self.cancel_token();
        let cog = *cog;

        let this = self;
        zero_moment_angle(
            move |alpha| this.compute_cm(&cog, alpha, fuse_moments),
            &cancel,
        )
    }

    /// Computes the trimmed conditions: the zero-moment angle and the
    /// speed at which the lift balances `mass`.
    pub fn trimmed_conditions(
        &mut self,
        mass: f64,
        cog: &Vector3,
        fuse_moments: bool,
    ) -> Result<TrimPoint, TrimFailure> {
        if self.is_cancelled() {
            return Err(TrimFailure::Cancelled);
        }

        let alpha_eq = match self.zero_moment_angle(cog, fuse_moments) {
            Ok(a) => a,
            Err(e) => {
                log::info!("no zero-moment angle found");
                return Err(e);
            }
        };

        let vinf_dir = wind_direction(alpha_eq, 0.0);
        let wind_n = wind_normal(alpha_eq, 0.0);

        // unit-strength singularities at the equilibrium angle
        self.make_source_strengths(&vinf_dir);
        if self.is_cancelled() {
            return Err(TrimFailure::Cancelled);
        }
        self.make_unit_doublet_strengths(alpha_eq, 0.0);
        if self.is_cancelled() {
            return Err(TrimFailure::Cancelled);
        }

        // find the speed at which the lift carries the weight
        let vinf = vec![vinf_dir; self.n_panels()];
        let vlocal = self.combine_local_velocities(alpha_eq, 0.0);
        self.compute_on_body_cp(&vinf, &vlocal);

        let mu = self.mu.clone();
        let sigma = self.sigma.clone();
        let (force, _moment) = self.forces(
            &mu,
            &sigma,
            alpha_eq,
            0.0,
            cog,
            fuse_moments,
            &vinf,
        );

        // the far-field strips are authoritative for the trim force;
        // flag a disagreement with the on-body summation
        let near = self.sum_panel_forces() * (0.5 * self.config.density);
        crate::loads::check_force_agreement(&near, &force);

        let lift = force.dot(&wind_n);
        if lift <= 1.0e-10 {
            log::info!(
                "negative lift at alpha = {alpha_eq:.5}°, skipping the angle"
            );
            self.warning = true;
            return Err(TrimFailure::NegativeLift);
        }

        let u0 = (9.81 * mass / force.z).sqrt();
        Ok(TrimPoint { alpha_eq, u0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn no_cancel() -> AtomicBool {
        AtomicBool::new(false)
    }

    #[test]
    fn test_zero_moment_linear_inside_bracket() {
        // Cm(α) = a − bα with root a/b inside the bracket
        for (a, b) in [(0.5, 0.1), (-0.2, 0.05), (1.0, 0.08)] {
            let root = zero_moment_angle(|alpha| a - b * alpha, &no_cancel()).expect("root");
            assert_relative_eq!(root, a / b, epsilon = 0.01);
        }
    }

    #[test]
    fn test_zero_moment_root_outside_bracket() {
        // root at 100°, outside [−45°, 45°]: failure, not a wrong answer
        let result = zero_moment_angle(|alpha| 1.0 - 0.01 * alpha, &no_cancel());
        assert_eq!(result, Err(TrimFailure::NoBracket));
    }

    #[test]
    fn test_zero_moment_cancelled() {
        let cancel = AtomicBool::new(true);
        let result = zero_moment_angle(|alpha| -alpha, &cancel);
        assert_eq!(result, Err(TrimFailure::Cancelled));
    }

    #[test]
    fn test_zero_moment_nonlinear() {
        let root = zero_moment_angle(|alpha| (alpha - 3.0).powi(3) / 100.0, &no_cancel())
            .expect("root");
        assert_relative_eq!(root, 3.0, epsilon = 0.05);
    }
}
