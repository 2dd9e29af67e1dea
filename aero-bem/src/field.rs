//! Potential and velocity evaluation at field points
//!
//! Sums the source, doublet and trailing-wake contributions of every
//! panel, with the optional ground/free-surface image and vorton-wake
//! augmentation. The threaded path evaluates contiguous panel blocks
//! independently and combines the per-block partial sums in block order,
//! so results are reproducible for a fixed block count.

use std::sync::atomic::{AtomicBool, Ordering};

use aero_solvers::parallel::map_blocks;

use crate::analysis::DensityField;
use crate::config::{FlowConfig, SolverSettings, WakeModel};
use crate::panel::{Panel, WakeSide};
use crate::vector::Vector3;
use crate::vortex::{vortex_induced_velocity, Vorton};
use crate::wake::WakeChain;

/// Read-only view of the solver state needed to evaluate fields.
pub struct FieldContext<'a> {
    pub panels: &'a [Panel],
    pub wake_panels: &'a [Panel],
    pub vortons: &'a [Vec<Vorton>],
    pub config: &'a FlowConfig,
    pub cancel: &'a AtomicBool,
}

impl<'a> FieldContext<'a> {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Mirror of a point across the image plane at `z = -ground_height`.
    fn mirror_point(&self, pt: &Vector3) -> Vector3 {
        Vector3::new(pt.x, pt.y, -pt.z - 2.0 * self.config.ground_height)
    }

    /// Source potential of one panel, with the image contribution.
    pub fn source_potential_at(&self, p3: &Panel, pt: &Vector3, is_self: bool) -> f64 {
        let core = self.config.core_radius;
        let mut phi = p3.source_potential(pt, is_self, core);
        if self.config.has_image_plane() {
            let coef = self.config.image_coefficient();
            let cg = self.mirror_point(pt);
            phi += p3.source_potential(&cg, false, core) * coef;
        }
        phi
    }

    /// Source velocity of one panel, with the image contribution; the
    /// image's z-component is sign-flipped so the plane stays a stream
    /// surface.
    pub fn source_velocity_at(&self, p3: &Panel, pt: &Vector3, is_self: bool) -> Vector3 {
        let core = self.config.core_radius;
        let mut v = p3.source_velocity(pt, is_self, core);
        if self.config.has_image_plane() {
            let coef = self.config.image_coefficient();
            let cg = self.mirror_point(pt);
            let vg = p3.source_velocity(&cg, false, core);
            v.x += vg.x * coef;
            v.y += vg.y * coef;
            v.z -= vg.z * coef;
        }
        v
    }

    /// Basis doublet potentials of one panel, with the image contribution.
    pub fn doublet_potential_at(
        &self,
        p3: &Panel,
        pt: &Vector3,
        is_self: bool,
        use_rff: bool,
    ) -> [f64; 3] {
        let mut phi = p3.doublet_basis_potential(pt, is_self, use_rff);
        if self.config.has_image_plane() {
            let coef = self.config.image_coefficient();
            let cg = self.mirror_point(pt);
            let phi_g = p3.doublet_basis_potential(&cg, false, use_rff);
            for k in 0..3 {
                phi[k] += phi_g[k] * coef;
            }
        }
        phi
    }

    /// Basis doublet velocities of one panel, with the image contribution.
    pub fn doublet_velocity_at(
        &self,
        p3: &Panel,
        pt: &Vector3,
        core_radius: f64,
        use_rff: bool,
    ) -> [Vector3; 3] {
        let model = self.config.density_model;
        let mut v = p3.doublet_basis_velocity(pt, model, core_radius, use_rff);
        if self.config.has_image_plane() {
            let coef = self.config.image_coefficient();
            let cg = self.mirror_point(pt);
            let vg = p3.doublet_basis_velocity(&cg, model, core_radius, use_rff);
            for k in 0..3 {
                v[k].x += vg[k].x * coef;
                v[k].y += vg[k].y * coef;
                v[k].z -= vg[k].z * coef;
            }
        }
        v
    }

    /// Potential of a wake column at a field point, split into the
    /// weights of the shedding panel's left and right trailing nodes.
    pub fn wake_column_potential(&self, head: usize, pt: &Vector3) -> (f64, f64) {
        let mut left = 0.0;
        let mut right = 0.0;
        for p3w in WakeChain::new(self.wake_panels, head) {
            // the far-field shortcut is not used on wake panels
            let phi = self.doublet_potential_at(p3w, pt, false, false);
            match p3w.wake_side {
                WakeSide::Left => {
                    left += phi[0] + phi[1];
                    right += phi[2];
                }
                WakeSide::Right => {
                    left += phi[0];
                    right += phi[1] + phi[2];
                }
            }
        }
        (left, right)
    }

    /// Velocity of a wake column at a field point, split into the weights
    /// of the shedding panel's left and right trailing nodes.
    pub fn wake_column_velocity(
        &self,
        head: usize,
        pt: &Vector3,
        core_radius: f64,
    ) -> (Vector3, Vector3) {
        let mut left = Vector3::zero();
        let mut right = Vector3::zero();
        for p3w in WakeChain::new(self.wake_panels, head) {
            let v = self.doublet_velocity_at(p3w, pt, core_radius, false);
            match p3w.wake_side {
                WakeSide::Left => {
                    left += v[0] + v[1];
                    right += v[2];
                }
                WakeSide::Right => {
                    left += v[0];
                    right += v[1] + v[2];
                }
            }
        }
        (left, right)
    }

    /// Perturbation potential at a field point.
    pub fn potential(&self, pt: &Vector3, mu: &DensityField, sigma: &[f64]) -> f64 {
        let mut phi = 0.0;
        for (i3, p3) in self.panels.iter().enumerate() {
            if self.is_cancelled() {
                return phi;
            }

            if p3.is_thick() && sigma[i3].abs() > 0.0 {
                phi += self.source_potential_at(p3, pt, false) * sigma[i3];
            }

            let phi_b = self.doublet_potential_at(p3, pt, false, true);
            phi += phi_b[0] * mu.value(i3, 0) + phi_b[1] * mu.value(i3, 1)
                + phi_b[2] * mu.value(i3, 2);

            if p3.is_trailing {
                let sign = if p3.is_bottom() { -1.0 } else { 1.0 };
                if let Some(head) = p3.wake {
                    let (left, right) = self.wake_column_potential(head, pt);
                    phi += (left * mu.value(i3, 1) + right * mu.value(i3, 2)) * sign;
                }
            }
        }
        phi
    }

    /// Perturbation velocity contribution of one contiguous panel range.
    pub fn velocity_block(
        &self,
        range: std::ops::Range<usize>,
        pt: &Vector3,
        mu: &DensityField,
        sigma: &[f64],
        core_radius: f64,
        wake_only: bool,
    ) -> Vector3 {
        let mut vt = Vector3::zero();
        for i3 in range {
            let p3 = &self.panels[i3];

            if !wake_only {
                if p3.is_thick() && sigma[i3].abs() > 0.0 {
                    let is_self = pt.is_same(&p3.cog);
                    vt += self.source_velocity_at(p3, pt, is_self) * sigma[i3];
                }

                let vd = self.doublet_velocity_at(p3, pt, core_radius, true);
                vt += vd[0] * mu.value(i3, 0) + vd[1] * mu.value(i3, 1)
                    + vd[2] * mu.value(i3, 2);
            }

            if p3.is_trailing {
                let sign = if p3.is_bottom() { -1.0 } else { 1.0 };
                // requesting the velocity before the wake has been set is
                // not an error, the contribution is simply absent
                if let Some(head) = p3.wake {
                    let (left, right) = self.wake_column_velocity(head, pt, core_radius);
                    vt += (left * mu.value(i3, 1) + right * mu.value(i3, 2)) * sign;
                }
            }

            if self.is_cancelled() {
                return vt;
            }
        }
        vt
    }

    /// Perturbation velocity at a field point, summing all panel, wake
    /// and vorton contributions.
    pub fn velocity(
        &self,
        pt: &Vector3,
        mu: &DensityField,
        sigma: &[f64],
        core_radius: f64,
        wake_only: bool,
        settings: &SolverSettings,
    ) -> Vector3 {
        let blocks = map_blocks(
            self.panels.len(),
            settings.n_blocks,
            settings.multithread,
            |range| self.velocity_block(range, pt, mu, sigma, core_radius, wake_only),
        );

        let mut vt = Vector3::zero();
        for vb in blocks {
            vt += vb;
        }

        if self.config.wake_model == WakeModel::Vorton {
            vt += self.vorton_velocity(pt, self.config.vorton_core_length());
        }

        vt
    }

    /// Velocity induced by the vorton rows, with image contributions.
    pub fn vorton_velocity(&self, pt: &Vector3, core_length: f64) -> Vector3 {
        let coef = self.config.image_coefficient();
        let has_image = self.config.has_image_plane();

        let mut vel = Vector3::zero();
        for row in self.vortons {
            for vtn in row.iter().filter(|v| v.active) {
                vel += vtn.induced_velocity(pt, core_length);
                if has_image {
                    let cg = self.mirror_point(pt);
                    let vg = vtn.induced_velocity(&cg, core_length);
                    vel.x += vg.x * coef;
                    vel.y += vg.y * coef;
                    vel.z -= vg.z * coef;
                }
            }
        }
        vel
    }

    /// Far-downstream perturbation velocity using a line-vortex model of
    /// the wake, irrespective of the density model.
    ///
    /// Each trailing panel sheds a pair of stream-wise filaments at its
    /// trailing nodes, of length `trefftz_distance` chords, with opposite
    /// circulations `±4πμ`.
    pub fn far_field_velocity(&self, pt: &Vector3, mu: &DensityField, core_radius: f64) -> Vector3 {
        let far_dist = self.config.trefftz_distance * self.config.reference_chord;
        let mut vt = Vector3::zero();

        for (i3, p3) in self.panels.iter().enumerate() {
            if self.is_cancelled() {
                return vt;
            }
            if !p3.is_trailing {
                continue;
            }
            let sign = if p3.is_bottom() { -1.0 } else { 1.0 };
            let four_pi = 4.0 * std::f64::consts::PI;

            let left = p3.left_trailing_node();
            let mut a = left;
            a.x += far_dist;
            let vl = vortex_induced_velocity(&left, &a, pt, core_radius);
            vt += vl * (four_pi * mu.value(i3, 1) * sign);

            let right = p3.right_trailing_node();
            let mut b = right;
            b.x += far_dist;
            let vr = vortex_induced_velocity(&right, &b, pt, core_radius);
            // the two filament circulations are opposite
            vt += vr * (-four_pi * mu.value(i3, 2) * sign);
        }
        vt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DensityModel;
    use approx::assert_relative_eq;

    fn simple_context<'a>(
        panels: &'a [Panel],
        wake: &'a [Panel],
        config: &'a FlowConfig,
        cancel: &'a AtomicBool,
    ) -> FieldContext<'a> {
        FieldContext {
            panels,
            wake_panels: wake,
            vortons: &[],
            config,
            cancel,
        }
    }

    #[test]
    fn test_velocity_block_partials_sum_to_total() {
        let mut panels = Vec::new();
        for i in 0..8 {
            let x0 = i as f64 * 0.2;
            panels.push(Panel::new(
                i,
                [
                    Vector3::new(x0, 0.0, 0.0),
                    Vector3::new(x0 + 0.2, 0.0, 0.0),
                    Vector3::new(x0, 0.5, 0.0),
                ],
            ));
        }
        let config = FlowConfig::default();
        let cancel = AtomicBool::new(false);
        let ctx = simple_context(&panels, &[], &config, &cancel);

        let mut mu = DensityField::new(DensityModel::Uniform, panels.len());
        for i in 0..panels.len() {
            mu.set(i, 0, (i as f64 + 1.0) * 0.1);
        }
        let sigma = vec![0.0; panels.len()];
        let pt = Vector3::new(0.5, 0.2, 0.8);

        let serial = ctx.velocity(&pt, &mu, &sigma, 0.0, false, &SolverSettings::single_threaded());
        let mut settings = SolverSettings::default();
        settings.n_blocks = 3;
        settings.multithread = true;
        let parallel = ctx.velocity(&pt, &mu, &sigma, 0.0, false, &settings);

        assert_relative_eq!(serial.x, parallel.x, epsilon = 1e-10);
        assert_relative_eq!(serial.y, parallel.y, epsilon = 1e-10);
        assert_relative_eq!(serial.z, parallel.z, epsilon = 1e-10);
    }

    #[test]
    fn test_cancellation_returns_early() {
        let panels = vec![Panel::new(
            0,
            [
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
        )];
        let config = FlowConfig::default();
        let cancel = AtomicBool::new(true);
        let ctx = simple_context(&panels, &[], &config, &cancel);

        let mu = DensityField::new(DensityModel::Uniform, 1);
        let sigma = vec![0.0];
        let phi = ctx.potential(&Vector3::new(0.0, 0.0, 1.0), &mu, &sigma);
        assert_eq!(phi, 0.0);
    }
}
