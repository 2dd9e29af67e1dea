//! First-order stability derivatives about a trimmed state
//!
//! Central differences of the forces and moments under small
//! perturbations of the velocity and rotation rates along the stability
//! axes. Each perturbed state is a linear combination of the unit
//! solutions, so no additional system solve is needed.

use crate::analysis::{DensityField, PanelAnalysis};
use crate::assembly::source_strength;
use crate::vector::Vector3;

/// Speed step of the translation derivatives (m/s).
const DELTA_SPEED: f64 = 0.001;
/// Rate step of the angular derivatives (rad/s).
const ROTATION_RATE: f64 = 0.01;

/// First-order stability derivatives, stability axes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StabDerivatives {
    pub xu: f64,
    pub zu: f64,
    pub mu: f64,
    pub yv: f64,
    pub lv: f64,
    pub nv: f64,
    pub xw: f64,
    pub zw: f64,
    pub mw: f64,
    pub yp: f64,
    pub lp: f64,
    pub np: f64,
    pub xq: f64,
    pub zq: f64,
    pub mq: f64,
    pub yr: f64,
    pub lr: f64,
    pub nr: f64,
}

/// The force and moment of one perturbed state.
struct PerturbedLoads {
    force: Vector3,
    moment: Vector3,
}

impl PanelAnalysis {
    /// Computes the translation and angular derivatives about the
    /// equilibrium `(alpha_eq, u0)`; also returns the reference force and
    /// moment of the unperturbed state.
    pub fn compute_stability_derivatives(
        &mut self,
        alpha_eq: f64,
        u0: f64,
        cog: &Vector3,
        fuse_moments: bool,
    ) -> (StabDerivatives, Vector3, Vector3) {
        let mut sd = StabDerivatives::default();

        let cosa = alpha_eq.to_radians().cos();
        let sina = alpha_eq.to_radians().sin();

        // stability axes
        let is = Vector3::new(-cosa, 0.0, -sina);
        let js = Vector3::new(0.0, 1.0, 0.0);
        let ks = Vector3::new(sina, 0.0, -cosa);

        // steady-state wind velocity; the change in wind velocity is
        // opposite to the change in aircraft velocity
        let v0 = is * (-u0);

        let reference = self.perturbed_loads(alpha_eq, &v0, &Vector3::zero(), cog, fuse_moments);

        // translation derivatives
        let axes = [is, js, ks];
        let mut fp = [Vector3::zero(); 3];
        let mut fm = [Vector3::zero(); 3];
        let mut mp = [Vector3::zero(); 3];
        let mut mm = [Vector3::zero(); 3];
        for (i, axis) in axes.iter().enumerate() {
            let plus = self.perturbed_loads(
                alpha_eq,
                &(v0 + *axis * DELTA_SPEED),
                &Vector3::zero(),
                cog,
                fuse_moments,
            );
            let minus = self.perturbed_loads(
                alpha_eq,
                &(v0 - *axis * DELTA_SPEED),
                &Vector3::zero(),
                cog,
                fuse_moments,
            );
            fp[i] = plus.force;
            fm[i] = minus.force;
            mp[i] = plus.moment;
            mm[i] = minus.moment;
        }

        let ds2 = 2.0 * DELTA_SPEED;
        sd.xu = (fm[0] - fp[0]).dot(&is) / ds2;
        sd.zu = (fm[0] - fp[0]).dot(&ks) / ds2;
        sd.mu = (mm[0] - mp[0]).dot(&js) / ds2;

        sd.yv = (fm[1] - fp[1]).dot(&js) / ds2;
        sd.lv = (mm[1] - mp[1]).dot(&is) / ds2;
        sd.nv = (mm[1] - mp[1]).dot(&ks) / ds2;

        sd.xw = (fm[2] - fp[2]).dot(&is) / ds2;
        sd.zw = (fm[2] - fp[2]).dot(&ks) / ds2;
        sd.mw = (mm[2] - mp[2]).dot(&js) / ds2;

        // angular derivatives: a rotation of the aircraft about an axis
        // is the opposite of a rotation of the freestream about it
        for (i, axis) in axes.iter().enumerate() {
            let plus = self.perturbed_loads(
                alpha_eq,
                &v0,
                &(*axis * ROTATION_RATE),
                cog,
                fuse_moments,
            );
            let minus = self.perturbed_loads(
                alpha_eq,
                &v0,
                &(*axis * (-ROTATION_RATE)),
                cog,
                fuse_moments,
            );
            fp[i] = plus.force;
            fm[i] = minus.force;
            mp[i] = plus.moment;
            mm[i] = minus.moment;
        }

        let dr2 = 2.0 * ROTATION_RATE;
        sd.yp = (fp[0] - fm[0]).dot(&js) / dr2;
        sd.lp = (mp[0] - mm[0]).dot(&is) / dr2;
        sd.np = (mp[0] - mm[0]).dot(&ks) / dr2;

        sd.xq = (fp[1] - fm[1]).dot(&is) / dr2;
        sd.zq = (fp[1] - fm[1]).dot(&ks) / dr2;
        sd.mq = (mp[1] - mm[1]).dot(&js) / dr2;

        sd.yr = (fp[2] - fm[2]).dot(&js) / dr2;
        sd.lr = (mp[2] - mm[2]).dot(&is) / dr2;
        sd.nr = (mp[2] - mm[2]).dot(&ks) / dr2;

        (sd, reference.force, reference.moment)
    }

    /// Loads of one perturbed state: the velocity field of the solid-body
    /// motion `(vinf, omega)`, its singularity strengths from the unit
    /// solutions, and the resulting forces.
    fn perturbed_loads(
        &mut self,
        alpha: f64,
        vinf: &Vector3,
        omega: &Vector3,
        cog: &Vector3,
        fuse_moments: bool,
    ) -> PerturbedLoads {
        let n = self.n_panels();

        // per-panel onset velocities of the solid-body motion; `omega` is
        // the rotation rate of the configuration, so the wind each panel
        // sees turns the opposite way, matching the unit p/q/r columns
        let mut vfield = vec![Vector3::zero(); n];
        let mut sigma = vec![0.0; n];
        for i3 in 0..n {
            let p3 = &self.panels[i3];
            let lever = p3.cog - *cog;
            vfield[i3] = *vinf + lever.cross(omega);
            if p3.is_thick() {
                sigma[i3] = source_strength(&p3.normal, &vfield[i3]);
            }
        }

        let solution = self.combine_unit_rhs(vinf, omega);
        let mu = DensityField::from_values(self.config.density_model, solution.clone());

        // pressure distribution of the perturbed solution
        let cache = self.local_velocity_cache(&[&solution]);
        let vlocal = &cache[0];
        self.compute_on_body_cp(&vfield, vlocal);

        let (force, moment) = self.forces(&mu, &sigma, alpha, 0.0, cog, fuse_moments, &vfield);

        PerturbedLoads { force, moment }
    }
}
