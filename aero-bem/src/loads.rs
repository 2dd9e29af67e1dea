//! Aerodynamic load extraction
//!
//! Near-field pressure integration, Kutta-Joukowski strip forces with
//! the downwash sampled in the wake, Trefftz-plane induced drag and the
//! surface-gradient pressure reconstruction.
//!
//! Policy when the methods disagree: the near-field summation is
//! authoritative for total force and moment, the far-field evaluation
//! for induced drag; a relative gap above 5 % between the two totals is
//! logged as a warning, never silently preferred.

use std::f64::consts::PI;

use aero_solvers::small::solve_3x3;

use crate::analysis::{DensityField, PanelAnalysis};
use crate::config::{wind_direction, DensityModel};
use crate::panel::Panel;
use crate::vector::Vector3;
use crate::wake;

/// Relative near-field/far-field gap above which a warning is logged.
const FORCE_AGREEMENT_TOL: f64 = 0.05;

/// Per-spanwise-station results of one force/drag evaluation.
#[derive(Debug, Clone, Default)]
pub struct SpanDistribs {
    /// Bound circulation
    pub gamma: Vec<f64>,
    /// Local induced angle (degrees)
    pub ai: Vec<f64>,
    /// Sectional induced-drag coefficient
    pub icd: Vec<f64>,
    /// Sectional lift coefficient
    pub cl: Vec<f64>,
    /// Downwash velocity at the sampling point
    pub vd: Vec<Vector3>,
    /// Strip force, body axes
    pub force: Vec<Vector3>,
    /// Strip reference area
    pub strip_area: Vec<f64>,
}

impl SpanDistribs {
    pub fn new(n_stations: usize) -> Self {
        Self {
            gamma: vec![0.0; n_stations],
            ai: vec![0.0; n_stations],
            icd: vec![0.0; n_stations],
            cl: vec![0.0; n_stations],
            vd: vec![Vector3::zero(); n_stations],
            force: vec![Vector3::zero(); n_stations],
            strip_area: vec![1.0; n_stations],
        }
    }

    pub fn n_stations(&self) -> usize {
        self.gamma.len()
    }
}

/// Logs a warning when the near-field and far-field force totals drift
/// apart beyond tolerance, and returns whether they agree.
pub fn check_force_agreement(near: &Vector3, far: &Vector3) -> bool {
    let scale = near.norm().max(far.norm());
    if scale <= 0.0 {
        return true;
    }
    let gap = (*near - *far).norm() / scale;
    if gap > FORCE_AGREEMENT_TOL {
        log::warn!(
            "near-field and far-field forces disagree by {:.1}%: near {:?}, far {:?}",
            gap * 100.0,
            near,
            far
        );
        return false;
    }
    true
}

impl PanelAnalysis {
    /// Number of spanwise stations: one per shedding strip.
    pub fn n_stations(&self) -> usize {
        self.panels
            .iter()
            .filter(|p| p.is_trailing && (p.is_bottom() || p.is_mid()))
            .count()
    }

    /// Area of the strip a trailing panel belongs to, accumulated up the
    /// chord-wise chain; halved for thick surfaces where the strip covers
    /// both sides.
    pub fn strip_area(&self, p3: &Panel) -> f64 {
        let mut area = 0.0;
        let mut index = Some(p3.index);
        let mut steps = 0;
        while let Some(i) = index {
            if steps > self.panels.len() {
                debug_assert!(false, "strip chain of panel {} does not terminate", p3.index);
                break;
            }
            steps += 1;
            let p = &self.panels[i];
            area += p.area;
            index = p.upstream;
        }
        if p3.is_mid() {
            area
        } else {
            area / 2.0
        }
    }

    /// Fills the span-distribution strip areas.
    pub fn make_strip_areas(&self, span: &mut SpanDistribs) {
        let mut m = 0;
        for p3 in self
            .panels
            .iter()
            .filter(|p| p.is_trailing && (p.is_bottom() || p.is_mid()))
        {
            if m < span.n_stations() {
                span.strip_area[m] = self.strip_area(p3);
            }
            m += 1;
        }
    }

    /// Local tangential velocity on a panel as the gradient of the plane
    /// best fitting the three vertex doublet values, in the local frame.
    pub fn panel_doublet_surface_velocity(&self, i3: usize, mu: &DensityField) -> Vector3 {
        let p3 = &self.panels[i3];
        let sl = &p3.local_vertices;

        let mu0 = mu.value(i3, 0);
        let mu1 = mu.value(i3, 1);
        let mu2 = mu.value(i3, 2);

        // plane a·x + b·y + c·µ + d = 0 through the three vertex values
        let a = (sl[1].y - sl[0].y) * (mu2 - mu0) - (sl[2].y - sl[0].y) * (mu1 - mu0);
        let b = (sl[2].x - sl[0].x) * (mu1 - mu0) - (sl[1].x - sl[0].x) * (mu2 - mu0);
        let c = (sl[1].x - sl[0].x) * (sl[2].y - sl[0].y) - (sl[2].x - sl[0].x) * (sl[1].y - sl[0].y);

        // the density gradient is (−a/c, −b/c)
        Vector3::new(-4.0 * PI * (-a / c), -4.0 * PI * (-b / c), 0.0)
    }

    /// Builds the unit local-velocity caches from the unit solution
    /// vectors, one entry per panel vertex, in each panel's local frame.
    pub fn make_local_velocities(&mut self) {
        let u = std::mem::take(&mut self.u_rhs);
        let v = std::mem::take(&mut self.v_rhs);
        let w = std::mem::take(&mut self.w_rhs);
        let mut caches = self.local_velocity_cache(&[&u, &v, &w]);
        self.w_local = caches.pop().unwrap_or_default();
        self.v_local = caches.pop().unwrap_or_default();
        self.u_local = caches.pop().unwrap_or_default();
        self.u_rhs = u;
        self.v_rhs = v;
        self.w_rhs = w;
    }

    /// Local-frame tangential velocity caches for arbitrary solution
    /// columns, one `3 × n_panels` cache per column.
    ///
    /// The linear model differentiates each panel's own vertex densities;
    /// the uniform model estimates the gradient from the panel and its
    /// neighbours, each neighbour developed into the panel's plane by
    /// rotation about the shared edge.
    pub fn local_velocity_cache(&self, solutions: &[&[f64]]) -> Vec<Vec<Vector3>> {
        let n = self.n_panels();
        let n_sol = solutions.len();
        let mut caches = vec![vec![Vector3::zero(); 3 * n]; n_sol];

        match self.config.density_model {
            DensityModel::Linear => {
                for (j, sol) in solutions.iter().enumerate() {
                    let mu = DensityField::from_values(DensityModel::Linear, sol.to_vec());
                    for i3 in 0..n {
                        let v = self.panel_doublet_surface_velocity(i3, &mu);
                        for k in 0..3 {
                            caches[j][3 * i3 + k] = v;
                        }
                    }
                }
            }
            DensityModel::Uniform => {
                let mut singles: Vec<usize> = Vec::new();

                for i3 in 0..n {
                    let p3 = &self.panels[i3];
                    let n_neighbours = p3.neighbours.iter().flatten().count();

                    if n_neighbours == 0 {
                        // isolated panel, can only happen on a degenerate mesh
                        continue;
                    }
                    if n_neighbours == 1 {
                        singles.push(i3);
                        continue;
                    }

                    // the panel's own value plus the neighbours',
                    // developed into the panel plane
                    let mut pts: Vec<(f64, f64)> = vec![(0.0, 0.0)];
                    let mut vals: Vec<Vec<f64>> =
                        vec![solutions.iter().map(|s| s[i3]).collect()];

                    for (edge, neighbour) in p3.neighbours.iter().enumerate() {
                        let i3n = match neighbour {
                            Some(i) => *i,
                            None => continue,
                        };
                        let p3n = &self.panels[i3n];
                        let cog_dev = develop_into_plane(p3, p3n, edge);
                        let cl = p3.global_to_local_position(&cog_dev);
                        pts.push((cl.x, cl.y));
                        vals.push(solutions.iter().map(|s| s[i3n]).collect());
                    }

                    if let Some(grads) = fit_density_gradient(&pts, &vals) {
                        for (j, g) in grads.iter().enumerate() {
                            let local = Vector3::new(-4.0 * PI * g.0, -4.0 * PI * g.1, 0.0);
                            for k in 0..3 {
                                caches[j][3 * i3 + k] = local;
                            }
                        }
                    }
                }

                // single-neighbour panels take their neighbour's gradient,
                // converted through global coordinates
                for &i3 in &singles {
                    let p3 = &self.panels[i3];
                    let i3n = match p3.neighbours.iter().flatten().next() {
                        Some(i) => *i,
                        None => continue,
                    };
                    let p3n = &self.panels[i3n];
                    for cache in caches.iter_mut() {
                        let g = p3n.local_to_global(&cache[3 * i3n]);
                        let local = p3.global_to_local(&g);
                        for k in 0..3 {
                            cache[3 * i3 + k] = local;
                        }
                    }
                }
            }
        }

        caches
    }

    /// Combines the unit local-velocity caches for the angles `alpha`,
    /// `beta` (degrees).
    pub fn combine_local_velocities(&self, alpha: f64, beta: f64) -> Vec<Vector3> {
        let cosa = alpha.to_radians().cos();
        let sina = alpha.to_radians().sin();
        let cosb = (-beta).to_radians().cos();
        let sinb = (-beta).to_radians().sin();

        let mut vlocal = vec![Vector3::zero(); self.u_local.len()];
        for i in 0..vlocal.len() {
            vlocal[i] = self.u_local[i] * (cosa * cosb)
                + self.v_local[i] * sinb
                + self.w_local[i] * (sina * cosb);
        }
        vlocal
    }

    /// Pressure coefficients at the panel vertices.
    ///
    /// Mid panels carry the jump form: the tangential velocity jump is
    /// split half-and-half between the upper and lower surfaces and the
    /// vertex value is the Cp difference across the sheet.
    pub fn compute_on_body_cp(&mut self, vinf: &[Vector3], vlocal: &[Vector3]) {
        for i3 in 0..self.n_panels() {
            let p3 = &self.panels[i3];
            let vstream = p3.global_to_local(&vinf[i3]);
            let q_inf = vinf[i3].norm();
            let q2 = q_inf * q_inf;

            if p3.is_mid() {
                for k in 0..3 {
                    let vsup = vstream + vlocal[3 * i3 + k] * 0.5;
                    let cp_sup = 1.0 - (vsup.x * vsup.x + vsup.y * vsup.y) / q2;
                    let vinf_side = vstream - vlocal[3 * i3 + k] * 0.5;
                    let cp_inf = 1.0 - (vinf_side.x * vinf_side.x + vinf_side.y * vinf_side.y) / q2;
                    self.cp[3 * i3 + k] = cp_sup - cp_inf;
                }
            } else {
                for k in 0..3 {
                    let v = vstream + vlocal[3 * i3 + k];
                    self.cp[3 * i3 + k] = 1.0 - (v.x * v.x + v.y * v.y) / q2;
                }
            }
        }
    }

    /// Plain summation of the on-body panel forces, per unit dynamic
    /// pressure.
    pub fn sum_panel_forces(&self) -> Vector3 {
        let mut f = Vector3::zero();
        for (i3, p3) in self.panels.iter().enumerate() {
            let cp = (self.cp[3 * i3] + self.cp[3 * i3 + 1] + self.cp[3 * i3 + 2]) / 3.0;
            f += p3.normal * (-cp * p3.area);
        }
        f
    }

    /// Geometric pitching moment about `cog` for the given angle of
    /// attack, per the on-body pressure integration. Viscous effects are
    /// not included.
    pub fn compute_cm(&mut self, cog: &Vector3, alpha: f64, fuse_moments: bool) -> f64 {
        let winddir = wind_direction(alpha, 0.0);
        let vinf = vec![winddir; self.n_panels()];
        let vlocal = self.combine_local_velocities(alpha, 0.0);
        self.compute_on_body_cp(&vinf, &vlocal);

        let mut cm = 0.0;
        for (i3, p3) in self.panels.iter().enumerate() {
            if p3.is_fuselage && !fuse_moments {
                continue;
            }
            let cp = (self.cp[3 * i3] + self.cp[3 * i3 + 1] + self.cp[3 * i3 + 2]) / 3.0;
            let force = p3.normal * (-cp * p3.area);
            let lever = p3.cog - *cog;
            cm += -lever.x * force.z + lever.z * force.x;
        }
        cm * self.config.density
    }

    /// Total force by the far-field Kutta-Joukowski strip method and
    /// moment by near-field summation, both dimensional for the given
    /// onset velocities.
    pub fn forces(
        &self,
        mu: &DensityField,
        sigma: &[f64],
        alpha: f64,
        beta: f64,
        cog: &Vector3,
        fuse_moments: bool,
        vinf: &[Vector3],
    ) -> (Vector3, Vector3) {
        let ctx = self.field_context();
        let rho = self.config.density;

        let mut force = Vector3::zero();
        for (i3, p3) in self.panels.iter().enumerate() {
            if !(p3.is_trailing && (p3.is_bottom() || p3.is_mid())) {
                continue;
            }
            let head = match p3.wake {
                Some(head) => head,
                None => continue,
            };

            let (left, right) = match wake::trailing_wake_points(&self.wake_panels, head) {
                Some(pts) => pts,
                None => continue,
            };
            let mid = (left + right) * 0.5;

            let mut wg = ctx.velocity(
                &mid,
                mu,
                sigma,
                self.config.core_radius,
                true,
                &self.settings,
            );
            wg += vinf[i3];

            let gamma_strip = if p3.is_mid() {
                -(mu.value(i3, 1) + mu.value(i3, 2)) / 2.0 * 4.0 * PI
            } else {
                let i3u = match p3.opposite {
                    Some(i) => i,
                    None => continue,
                };
                let g_u = (mu.value(i3u, 1) + mu.value(i3u, 2)) / 2.0;
                let g_b = (mu.value(i3, 1) + mu.value(i3, 2)) / 2.0;
                (-g_u + g_b) * 4.0 * PI
            };

            let vortex = p3.trailing_vortex();
            let strip_force = wg.cross(&vortex) * (gamma_strip * rho);
            force += strip_force;
        }

        // on-body moment
        let mut moment = Vector3::zero();
        for (i3, p3) in self.panels.iter().enumerate() {
            if p3.is_fuselage && !fuse_moments {
                continue;
            }
            let q_inf = vinf[i3].norm();
            let cp = (self.cp[3 * i3] + self.cp[3 * i3 + 1] + self.cp[3 * i3 + 2]) / 3.0;
            let panel_force = p3.normal * (-cp * p3.area * 0.5 * q_inf * q_inf);
            let lever = p3.cog - *cog;
            moment += lever.cross(&panel_force);
        }

        if self.config.viscous_drag > 0.0 {
            let winddir = wind_direction(alpha, beta);
            force += winddir * self.config.viscous_drag;
        }

        (force, moment * rho)
    }

    /// Total force and moment by pure near-field summation, using the
    /// surface-gradient velocity reconstruction.
    pub fn moments(
        &self,
        mu: &DensityField,
        cog: &Vector3,
        vinf: &[Vector3],
    ) -> (Vector3, Vector3) {
        let rho = self.config.density;
        let mut force = Vector3::zero();
        let mut moment = Vector3::zero();

        for (i3, p3) in self.panels.iter().enumerate() {
            let velocity = vinf[i3];
            let q_inf = velocity.norm();
            let mut vp3 = self.panel_doublet_surface_velocity(i3, mu);
            vp3 += p3.global_to_local(&velocity);
            let cp = 1.0 - vp3.norm_sq() / (q_inf * q_inf);

            let panel_force = p3.normal * (-cp * p3.area * 0.5 * q_inf * q_inf);
            let lever = p3.cog - *cog;
            force += panel_force;
            moment += lever.cross(&panel_force);
        }

        (force * rho, moment * rho)
    }

    /// Cross-flow strip forces by the Kutta-Joukowski theorem; the
    /// induced drag is evaluated separately in the Trefftz plane.
    pub fn induced_force(
        &self,
        mu: &DensityField,
        q_inf: f64,
        alpha: f64,
        beta: f64,
        span: &mut SpanDistribs,
    ) -> Vector3 {
        let winddir = wind_direction(alpha, beta);
        let vinf = winddir * q_inf;
        let rho = self.config.density;
        let q_dyn = 0.5 * rho * q_inf * q_inf;

        self.make_strip_areas(span);

        let mut force_body = Vector3::zero();
        let mut m = 0;
        for (i3, p3) in self.panels.iter().enumerate() {
            if !(p3.is_trailing && (p3.is_bottom() || p3.is_mid())) {
                continue;
            }

            let (g_left, g_right) = self.strip_circulations(i3, mu);
            let g_mid = (g_left + g_right) / 2.0;
            span.gamma[m] = g_mid;

            let mut strip_force = vinf.cross(&p3.trailing_vortex());
            strip_force *= g_mid * rho; // N
            strip_force *= 1.0 / q_dyn; // N/q

            span.cl[m] = strip_force.dot(&p3.surface_normal()) / span.strip_area[m];
            span.force[m] = strip_force * q_dyn;
            force_body += span.force[m];
            m += 1;
        }

        force_body / q_dyn
    }

    /// Induced drag in the Trefftz plane: the wake-only downwash sampled
    /// at the mid-point of each wake column, applied to the strip
    /// circulation. Returns the drag force per unit dynamic pressure,
    /// body axes.
    pub fn trefftz_drag(
        &self,
        mu: &DensityField,
        sigma: &[f64],
        q_inf: f64,
        alpha: f64,
        beta: f64,
        span: &mut SpanDistribs,
    ) -> Vector3 {
        let ctx = self.field_context();
        let winddir = wind_direction(alpha, beta);
        let rho = self.config.density;
        let q_dyn = 0.5 * rho * q_inf * q_inf;

        self.make_strip_areas(span);

        let mut force_body = Vector3::zero();
        let mut m = 0;
        for (i3, p3) in self.panels.iter().enumerate() {
            if !(p3.is_trailing && (p3.is_bottom() || p3.is_mid())) {
                continue;
            }
            if self.is_cancelled() {
                break;
            }
            let head = match p3.wake {
                Some(head) => head,
                None => continue,
            };

            // sample halfway down the wake, away from both the bound
            // vorticity and the truncated wake end
            let (left, right) = match wake::mid_wake_points(&self.wake_panels, head) {
                Some(pts) => pts,
                None => continue,
            };
            let mid = (left + right) * 0.5;

            let mut wg = ctx.velocity(
                &mid,
                mu,
                sigma,
                1.0e-4,
                true,
                &self.settings,
            );
            wg *= 0.5;

            if let Some(sink) = &self.probe_sink {
                sink.probe(mid, wg);
            }

            let (g_left, g_right) = self.strip_circulations(i3, mu);
            let g_mid = (g_left + g_right) / 2.0;

            let u = p3.trailing_vortex().normalized();
            let mut strip_force = wg.cross(&u) * g_mid * 2.0;
            strip_force *= p3.trailing_vortex().norm() / 2.0; // two half segments
            strip_force *= rho / q_dyn; // N/q
            force_body += strip_force;

            span.vd[m] = wg;
            span.ai[m] = (wg.dot(&p3.surface_normal())).atan2(q_inf).to_degrees();
            span.icd[m] = strip_force.dot(&winddir) / span.strip_area[m];
            m += 1;
        }

        force_body
    }

    /// Left and right trailing-node circulations of the strip shed by
    /// panel `i3`; for a bottom panel the jump across the trailing edge.
    fn strip_circulations(&self, i3: usize, mu: &DensityField) -> (f64, f64) {
        let p3 = &self.panels[i3];
        if p3.is_mid() {
            (
                -mu.value(i3, 1) * 4.0 * PI,
                -mu.value(i3, 2) * 4.0 * PI,
            )
        } else {
            match p3.opposite {
                Some(i3u) => (
                    (-mu.value(i3u, 1) + mu.value(i3, 1)) * 4.0 * PI,
                    (-mu.value(i3u, 2) + mu.value(i3, 2)) * 4.0 * PI,
                ),
                None => {
                    debug_assert!(false, "bottom trailing panel {i3} has no opposite");
                    (0.0, 0.0)
                }
            }
        }
    }
}

/// Develops a neighbour panel's centroid into the base panel's plane by
/// rotating it about the shared edge.
fn develop_into_plane(p3: &Panel, p3n: &Panel, edge: usize) -> Vector3 {
    let cog_n = p3n.cog;
    let cross = p3n.normal.cross(&p3.normal);
    let sin_t = cross.norm();
    let cos_t = p3.normal.dot(&p3n.normal);
    if sin_t < 1.0e-10 {
        return cog_n;
    }
    let axis = cross.normalized();
    let theta = sin_t.atan2(cos_t);

    let origin = p3.vertices[edge];
    let r = cog_n - origin;
    // Rodrigues rotation about the shared-edge axis
    let rotated = r * theta.cos() + axis.cross(&r) * theta.sin()
        + axis * (axis.dot(&r) * (1.0 - theta.cos()));
    origin + rotated
}

/// Least-squares plane fit through the density samples; returns the
/// (x, y) gradient for each solution column. Falls back to a line
/// regression when the sample points are nearly aligned, where the
/// plane fit is unstable.
fn fit_density_gradient(pts: &[(f64, f64)], vals: &[Vec<f64>]) -> Option<Vec<(f64, f64)>> {
    let n = pts.len();
    if n < 3 {
        return None;
    }
    let n_sol = vals[0].len();

    if n == 3 {
        let v01 = (pts[1].0 - pts[0].0, pts[1].1 - pts[0].1);
        let v02 = (pts[2].0 - pts[0].0, pts[2].1 - pts[0].1);
        let n01 = (v01.0 * v01.0 + v01.1 * v01.1).sqrt();
        let n02 = (v02.0 * v02.0 + v02.1 * v02.1).sqrt();
        if n01 < 1.0e-12 || n02 < 1.0e-12 {
            return None;
        }
        let sin_t = (v01.0 * v02.1 - v01.1 * v02.0) / (n01 * n02);
        if sin_t.abs() < (35.0_f64).to_radians().sin() {
            // centroids nearly aligned: regress along the line instead
            let ux = (v02.0 - v01.0, v02.1 - v01.1);
            let un = (ux.0 * ux.0 + ux.1 * ux.1).sqrt();
            if un < 1.0e-12 {
                return None;
            }
            let u = (ux.0 / un, ux.1 / un);
            let x = [-n01, 0.0, n02];
            let mut grads = vec![(0.0, 0.0); n_sol];
            for (j, grad) in grads.iter_mut().enumerate() {
                let y = [vals[1][j], vals[0][j], vals[2][j]];
                let slope = line_slope(&x, &y)?;
                *grad = (slope * u.0, slope * u.1);
            }
            return Some(grads);
        }
    }

    // normal equations of the plane fit µ(x, y) = c0 + cx·x + cy·y
    let mut ata = [0.0_f64; 9];
    let mut atb = vec![[0.0_f64; 3]; n_sol];
    for (i, &(x, y)) in pts.iter().enumerate() {
        let row = [1.0, x, y];
        for a in 0..3 {
            for b in 0..3 {
                ata[3 * a + b] += row[a] * row[b];
            }
            for j in 0..n_sol {
                atb[j][a] += row[a] * vals[i][j];
            }
        }
    }

    let mut grads = vec![(0.0, 0.0); n_sol];
    for (j, grad) in grads.iter_mut().enumerate() {
        let mut rhs = atb[j];
        if !solve_3x3(&ata, &mut rhs) {
            return None;
        }
        *grad = (rhs[1], rhs[2]);
    }
    Some(grads)
}

/// Least-squares slope of `y` against `x`.
fn line_slope(x: &[f64; 3], y: &[f64; 3]) -> Option<f64> {
    let n = 3.0;
    let sx: f64 = x.iter().sum();
    let sy: f64 = y.iter().sum();
    let sxx: f64 = x.iter().map(|v| v * v).sum();
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let den = n * sxx - sx * sx;
    if den.abs() < 1.0e-12 {
        return None;
    }
    Some((n * sxy - sx * sy) / den)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_slope() {
        let x = [-1.0, 0.0, 2.0];
        let y = [1.0, 3.0, 7.0];
        let s = line_slope(&x, &y).expect("slope");
        approx::assert_relative_eq!(s, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fit_density_gradient_exact_plane() {
        // values sampled from µ = 2 + 3x − y must return the exact gradient
        let pts = vec![(0.0, 0.0), (1.0, 0.2), (0.3, 1.0), (-0.5, 0.4)];
        let vals: Vec<Vec<f64>> = pts
            .iter()
            .map(|&(x, y)| {
                let v = 2.0 + 3.0 * x - y;
                vec![v, 2.0 * v, 0.0]
            })
            .collect();
        let grads = fit_density_gradient(&pts, &vals).expect("fit");
        approx::assert_relative_eq!(grads[0].0, 3.0, epsilon = 1e-10);
        approx::assert_relative_eq!(grads[0].1, -1.0, epsilon = 1e-10);
        approx::assert_relative_eq!(grads[1].0, 6.0, epsilon = 1e-10);
    }

    #[test]
    fn test_check_force_agreement() {
        let near = Vector3::new(0.0, 0.0, 100.0);
        assert!(check_force_agreement(&near, &Vector3::new(0.0, 0.0, 101.0)));
        assert!(!check_force_agreement(&near, &Vector3::new(0.0, 0.0, 120.0)));
    }
}
