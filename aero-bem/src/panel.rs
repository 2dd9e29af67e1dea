//! Triangular boundary element and its influence kernels
//!
//! A panel carries a uniform source density and a uniform or linearly
//! varying doublet density. Influence kernels follow the NASA TN-4023
//! formulation: closed-form edge integrals near the panel, a point
//! singularity (real field function) beyond `RFF_FACTOR` panel sizes, and
//! explicit limits on the panel itself. The uniform doublet velocity is
//! the velocity of the edge vortex ring of equal strength.
//!
//! All kernels are written without the 1/4π factor; the source and
//! doublet strengths absorb it (σ = −V·n/4π, Γ = −4πμ).

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::config::DensityModel;
use crate::quadrature::triangle_quadrature;
use crate::vector::Vector3;

/// Distance beyond which the far-field point-singularity form is used,
/// in multiples of the panel's largest edge.
pub const RFF_FACTOR: f64 = 10.0;

/// Local-frame z below which a field point counts as in-plane.
pub const IN_PLANE_EPS: f64 = 1.0e-7;

/// Quadrature order for the linear-basis kernels and Galerkin products.
const GQ_ORDER: usize = 4;

/// Position of a panel on the discretized surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SurfacePosition {
    /// Lower surface of a thick body
    Bottom,
    /// Thin mid-surface; carries no source singularity
    #[default]
    Mid,
    /// Upper surface of a thick body
    Top,
}

/// Side of a wake column a wake panel belongs to.
///
/// A wake quad is split into a left triangle (vertices 0 and 1 on the
/// left stream-wise edge, vertex 1 downstream, vertex 2 on the right)
/// and a right triangle (vertex 0 on the left, vertices 1 and 2 on the
/// right, vertex 1 downstream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WakeSide {
    #[default]
    Left,
    Right,
}

/// A triangular boundary element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    /// Index in the owning panel array
    pub index: usize,
    /// Vertices, counter-clockwise about the outward normal
    pub vertices: [Vector3; 3],
    /// Outward unit normal
    pub normal: Vector3,
    /// Collocation point (centroid)
    pub cog: Vector3,
    /// Area
    pub area: f64,
    /// Local in-plane unit axes; the frame is (l, m, normal)
    pub l: Vector3,
    pub m: Vector3,
    /// Vertices in local coordinates, relative to the collocation point
    pub local_vertices: [Vector3; 3],
    /// Largest edge length, for the far-field switch
    pub max_size: f64,

    /// Surface position
    pub position: SurfacePosition,
    /// Sheds a wake column
    pub is_trailing: bool,
    /// First panel of a chord-wise strip
    pub is_leading: bool,
    /// Belongs to a fuselage
    pub is_fuselage: bool,
    /// Belongs to the wake
    pub is_wake: bool,
    /// Wake-column side; meaningful for wake panels only
    pub wake_side: WakeSide,
    /// Head of the shed wake chain, for trailing panels
    pub wake: Option<usize>,
    /// Upstream neighbour in a strip or wake chain
    pub upstream: Option<usize>,
    /// Downstream neighbour in a strip or wake chain
    pub downstream: Option<usize>,
    /// Opposite (top) trailing panel, for bottom trailing panels
    pub opposite: Option<usize>,
    /// Edge-sharing neighbour panels
    pub neighbours: [Option<usize>; 3],
}

impl Panel {
    /// Builds a panel from its vertices and computes the derived geometry.
    pub fn new(index: usize, vertices: [Vector3; 3]) -> Self {
        let e01 = vertices[1] - vertices[0];
        let e02 = vertices[2] - vertices[0];
        let cross = e01.cross(&e02);
        let area = 0.5 * cross.norm();
        let normal = cross.normalized();
        let cog = (vertices[0] + vertices[1] + vertices[2]) / 3.0;

        let l = e01.normalized();
        let m = normal.cross(&l);

        let mut local_vertices = [Vector3::zero(); 3];
        for (lv, v) in local_vertices.iter_mut().zip(vertices.iter()) {
            let d = *v - cog;
            *lv = Vector3::new(d.dot(&l), d.dot(&m), 0.0);
        }

        let e12 = vertices[2] - vertices[1];
        let max_size = e01.norm().max(e02.norm()).max(e12.norm());

        Self {
            index,
            vertices,
            normal,
            cog,
            area,
            l,
            m,
            local_vertices,
            max_size,
            position: SurfacePosition::Mid,
            is_trailing: false,
            is_leading: false,
            is_fuselage: false,
            is_wake: false,
            wake_side: WakeSide::Left,
            wake: None,
            upstream: None,
            downstream: None,
            opposite: None,
            neighbours: [None; 3],
        }
    }

    pub fn is_mid(&self) -> bool {
        self.position == SurfacePosition::Mid
    }

    pub fn is_bottom(&self) -> bool {
        self.position == SurfacePosition::Bottom
    }

    pub fn is_top(&self) -> bool {
        self.position == SurfacePosition::Top
    }

    /// Thin panels carry no source singularity.
    pub fn is_thick(&self) -> bool {
        !self.is_mid() && !self.is_wake
    }

    /// Position of a point in the local frame, relative to the collocation point.
    pub fn global_to_local_position(&self, pt: &Vector3) -> Vector3 {
        let d = *pt - self.cog;
        Vector3::new(d.dot(&self.l), d.dot(&self.m), d.dot(&self.normal))
    }

    /// Global point from local in-plane coordinates.
    pub fn local_to_global_position(&self, x: f64, y: f64) -> Vector3 {
        self.cog + self.l * x + self.m * y
    }

    /// Direction vector from local to global components.
    pub fn local_to_global(&self, v: &Vector3) -> Vector3 {
        self.l * v.x + self.m * v.y + self.normal * v.z
    }

    /// Direction vector from global to local components.
    pub fn global_to_local(&self, v: &Vector3) -> Vector3 {
        Vector3::new(v.dot(&self.l), v.dot(&self.m), v.dot(&self.normal))
    }

    /// Left trailing node: vertex 1 for body panels, the downstream-most
    /// left vertex for wake panels.
    pub fn left_trailing_node(&self) -> Vector3 {
        if self.is_wake {
            match self.wake_side {
                WakeSide::Left => self.vertices[1],
                WakeSide::Right => self.vertices[0],
            }
        } else {
            self.vertices[1]
        }
    }

    /// Right trailing node: vertex 2 for body panels, the downstream-most
    /// right vertex for wake panels.
    pub fn right_trailing_node(&self) -> Vector3 {
        if self.is_wake {
            match self.wake_side {
                WakeSide::Left => self.vertices[2],
                WakeSide::Right => self.vertices[1],
            }
        } else {
            self.vertices[2]
        }
    }

    /// Trailing-edge segment from the left to the right trailing node.
    pub fn trailing_vortex(&self) -> Vector3 {
        self.right_trailing_node() - self.left_trailing_node()
    }

    /// Surface normal used for span-distribution projections; for bottom
    /// panels the strip is attributed to the upper side.
    pub fn surface_normal(&self) -> Vector3 {
        self.normal
    }

    /// Linear shape function `k` at local in-plane coordinates.
    pub fn basis(&self, x: f64, y: f64, k: usize) -> f64 {
        let s = &self.local_vertices;
        let (a, b, c) = (s[k], s[(k + 1) % 3], s[(k + 2) % 3]);
        // barycentric coordinate of (x, y) with respect to vertex a
        let det = (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y);
        let num = (b.x - x) * (c.y - y) - (c.x - x) * (b.y - y);
        num / det
    }

    // ------------------------------------------------------------------
    // source kernels
    // ------------------------------------------------------------------

    /// Potential of the unit uniform source density at a field point.
    pub fn source_potential(&self, pt: &Vector3, _is_self: bool, core_radius: f64) -> f64 {
        let pjk = *pt - self.cog;
        let pn = pjk.dot(&self.normal);
        let r = pjk.norm();

        if r > RFF_FACTOR * self.max_size {
            return -self.area / r;
        }

        let mut phi = 0.0;
        for i in 0..3 {
            let s0 = self.vertices[i];
            let s1 = self.vertices[(i + 1) % 3];
            let a = *pt - s0;
            let b = *pt - s1;
            let s = s1 - s0;
            let an = a.norm();
            let bn = b.norm();
            let sk = s.norm();
            let sm = s.dot(&self.m);
            let sl = s.dot(&self.l);
            let am = a.dot(&self.m);
            let al = a.dot(&self.l);
            let alx = am * sl - al * sm;
            let pa = pn * pn * sl + alx * am;
            let pb = pa - alx * sm;
            let h = a.cross(&s);

            if sk < 1.0e-12 {
                continue;
            }
            if (h.norm_sq() / s.norm_sq() <= core_radius * core_radius
                && a.dot(&s) >= 0.0
                && b.dot(&s) <= 0.0)
                || an < core_radius
                || bn < core_radius
            {
                // on the panel's side
                continue;
            }

            let gl = if (an + bn - sk).abs() > 0.0 {
                ((an + bn + sk) / (an + bn - sk)).abs().ln() / sk
            } else {
                0.0
            };

            let cjk = edge_angle(pn, an, bn, pa, pb, sm);
            phi += alx * gl - pn * cjk;
        }
        -phi
    }

    /// Velocity of the unit uniform source density at a field point.
    pub fn source_velocity(&self, pt: &Vector3, is_self: bool, core_radius: f64) -> Vector3 {
        if is_self {
            // exterior limit of the normal jump
            return self.normal * (2.0 * PI);
        }

        let pjk = *pt - self.cog;
        let pn = pjk.dot(&self.normal);
        let r = pjk.norm();

        if r > RFF_FACTOR * self.max_size {
            return pjk * (self.area / (r * r * r));
        }

        let mut vel = Vector3::zero();
        for i in 0..3 {
            let s0 = self.vertices[i];
            let s1 = self.vertices[(i + 1) % 3];
            let a = *pt - s0;
            let b = *pt - s1;
            let s = s1 - s0;
            let an = a.norm();
            let bn = b.norm();
            let sk = s.norm();
            let sm = s.dot(&self.m);
            let sl = s.dot(&self.l);
            let am = a.dot(&self.m);
            let al = a.dot(&self.l);
            let alx = am * sl - al * sm;
            let pa = pn * pn * sl + alx * am;
            let pb = pa - alx * sm;
            let h = a.cross(&s);

            if sk < 1.0e-12 {
                continue;
            }
            if (h.norm_sq() / s.norm_sq() <= core_radius * core_radius
                && a.dot(&s) >= 0.0
                && b.dot(&s) <= 0.0)
                || an < core_radius
                || bn < core_radius
            {
                continue;
            }

            let gl = if (an + bn - sk).abs() > 0.0 {
                ((an + bn + sk) / (an + bn - sk)).abs().ln() / sk
            } else {
                0.0
            };

            let cjk = edge_angle(pn, an, bn, pa, pb, sm);

            vel += self.normal * cjk + self.l * (sm * gl) - self.m * (sl * gl);
        }

        if pn.abs() < IN_PLANE_EPS {
            // in the panel's plane only the tangential components survive
            let vn = vel.dot(&self.normal);
            vel -= self.normal * vn;
        }
        vel
    }

    // ------------------------------------------------------------------
    // doublet kernels
    // ------------------------------------------------------------------

    /// Potential of the unit uniform doublet density at a field point.
    ///
    /// The self value is the interior limit, consistent with the internal
    /// Dirichlet boundary condition.
    pub fn uniform_doublet_potential(&self, pt: &Vector3, is_self: bool, use_rff: bool) -> f64 {
        if is_self {
            return 2.0 * PI;
        }

        let pjk = *pt - self.cog;
        let pn = pjk.dot(&self.normal);
        let r = pjk.norm();

        if use_rff && r > RFF_FACTOR * self.max_size {
            return -pn * self.area / (r * r * r);
        }

        if pn.abs() < IN_PLANE_EPS {
            // zero in the panel's plane, outside the panel
            return 0.0;
        }

        let mut phi = 0.0;
        for i in 0..3 {
            let s0 = self.vertices[i];
            let s1 = self.vertices[(i + 1) % 3];
            let a = *pt - s0;
            let b = *pt - s1;
            let s = s1 - s0;
            let an = a.norm();
            let bn = b.norm();
            if s.norm_sq() < 1.0e-24 {
                continue;
            }
            let sm = s.dot(&self.m);
            let sl = s.dot(&self.l);
            let am = a.dot(&self.m);
            let al = a.dot(&self.l);
            let alx = am * sl - al * sm;
            let pa = pn * pn * sl + alx * am;
            let pb = pa - alx * sm;

            let rnum = sm * pn * (bn * pa - an * pb);
            let dnom = pa * pb + pn * pn * an * bn * sm * sm;
            phi -= rnum.atan2(dnom);
        }
        phi
    }

    /// Velocity of the unit uniform doublet density: the velocity of the
    /// panel's edge vortex ring, regularized by `core_radius`.
    pub fn ring_velocity(&self, pt: &Vector3, core_radius: f64, use_rff: bool) -> Vector3 {
        let pjk = *pt - self.cog;
        let pn = pjk.dot(&self.normal);
        let r = pjk.norm();

        if use_rff && r > RFF_FACTOR * self.max_size {
            let r2 = r * r;
            let r5 = r2 * r2 * r;
            return (pjk * (3.0 * pn) - self.normal * r2) * (self.area / r5);
        }

        let mut vel = Vector3::zero();
        for i in 0..3 {
            let s0 = self.vertices[i];
            let s1 = self.vertices[(i + 1) % 3];
            let a = *pt - s0;
            let b = *pt - s1;
            let s = s1 - s0;
            let an = a.norm();
            let bn = b.norm();

            if s.norm_sq() < 1.0e-24 || an < core_radius || bn < core_radius {
                continue;
            }
            let h = a.cross(&s);
            if h.norm_sq() / s.norm_sq() <= core_radius * core_radius
                && a.dot(&s) >= 0.0
                && b.dot(&s) <= 0.0
            {
                // on the edge: the induced velocity is singular
                continue;
            }

            let cross = a.cross(&b);
            let gl = (an + bn) / (an * bn * (an * bn + a.dot(&b)));
            vel += cross * gl;
        }
        vel
    }

    /// Potentials of the three unit basis doublet densities at a field point.
    pub fn doublet_basis_potential(&self, pt: &Vector3, is_self: bool, use_rff: bool) -> [f64; 3] {
        if is_self {
            // interior limit at the collocation point
            let v = 2.0 * PI / 3.0;
            return [v, v, v];
        }

        let ptl = self.global_to_local_position(pt);
        let r = ptl.norm();

        if ptl.z.abs() < IN_PLANE_EPS {
            return [0.0; 3];
        }

        if use_rff && r > RFF_FACTOR * self.max_size {
            let v = -ptl.z / (r * r * r) * self.area / 3.0;
            return [v, v, v];
        }

        // quadrature of the dipole kernel weighted by each basis function
        let mut phi = [0.0; 3];
        let two_a = 2.0 * self.area;
        for &(xi, eta, w) in triangle_quadrature(GQ_ORDER) {
            let q = self.vertices[0] * (1.0 - xi - eta) + self.vertices[1] * xi
                + self.vertices[2] * eta;
            let d = *pt - q;
            let dist = d.norm();
            let kern = -ptl.z / (dist * dist * dist);
            let shape = [1.0 - xi - eta, xi, eta];
            for k in 0..3 {
                phi[k] += w * two_a * shape[k] * kern;
            }
        }
        phi
    }

    /// Velocities of the three unit basis doublet densities at a field
    /// point, dispatched on the density model.
    ///
    /// For the uniform model the three entries are the ring velocity split
    /// evenly; for the linear model the basis velocities are integrated by
    /// quadrature away from the panel plane and fall back to the even ring
    /// split in the plane, where the kernel is hypersingular.
    pub fn doublet_basis_velocity(
        &self,
        pt: &Vector3,
        model: DensityModel,
        core_radius: f64,
        use_rff: bool,
    ) -> [Vector3; 3] {
        let ptl = self.global_to_local_position(pt);

        if model == DensityModel::Uniform || ptl.z.abs() < IN_PLANE_EPS {
            let v = self.ring_velocity(pt, core_radius, use_rff) / 3.0;
            return [v, v, v];
        }

        let r = ptl.norm();
        if use_rff && r > RFF_FACTOR * self.max_size {
            let r2 = r * r;
            let r3 = r2 * r;
            let r5 = r3 * r2;
            let mut v = [Vector3::zero(); 3];
            let pn = ptl.z;
            for k in 0..3 {
                // point dipole of strength A/3 with a first-moment offset
                let bx = self.local_vertices[k].x * self.area / 4.0;
                let by = self.local_vertices[k].y * self.area / 4.0;
                let vl = Vector3::new(
                    pn / r5 * (ptl.x * self.area - bx),
                    pn / r5 * (ptl.y * self.area - by),
                    (-1.0 / r3 + 3.0 * pn * pn / r5) * self.area / 3.0,
                );
                v[k] = self.local_to_global(&vl);
            }
            return v;
        }

        let mut vel = [Vector3::zero(); 3];
        let two_a = 2.0 * self.area;
        for &(xi, eta, w) in triangle_quadrature(GQ_ORDER) {
            let q = self.vertices[0] * (1.0 - xi - eta) + self.vertices[1] * xi
                + self.vertices[2] * eta;
            let d = *pt - q;
            let dist = d.norm();
            let d3 = dist * dist * dist;
            let d5 = d3 * dist * dist;
            let pn = d.dot(&self.normal);
            let contrib = d * (3.0 * pn / d5) - self.normal * (1.0 / d3);
            let shape = [1.0 - xi - eta, xi, eta];
            for k in 0..3 {
                vel[k] += contrib * (w * two_a * shape[k]);
            }
        }
        vel
    }

    // ------------------------------------------------------------------
    // Galerkin scalar products (linear method)
    // ------------------------------------------------------------------

    /// Scalar products of the source-panel potential with this panel's
    /// basis functions: `sp[k] = ∫ N_k φ_source dS`.
    pub fn scalar_product_source_potential(
        &self,
        source: &Panel,
        is_self: bool,
        core_radius: f64,
    ) -> [f64; 3] {
        let mut sp = [0.0; 3];
        let two_a = 2.0 * self.area;
        for &(xi, eta, w) in triangle_quadrature(GQ_ORDER) {
            let shape = [1.0 - xi - eta, xi, eta];
            let q = self.vertices[0] * shape[0] + self.vertices[1] * shape[1]
                + self.vertices[2] * shape[2];
            let phi = source.source_potential(&q, is_self, core_radius);
            for k in 0..3 {
                sp[k] += w * two_a * shape[k] * phi;
            }
        }
        sp
    }

    /// Scalar products of the source-panel normal velocity with this
    /// panel's basis functions: `sp[k] = ∫ N_k (V_source·n) dS`.
    pub fn scalar_product_source_velocity(
        &self,
        source: &Panel,
        is_self: bool,
        core_radius: f64,
    ) -> [f64; 3] {
        let mut sp = [0.0; 3];
        let two_a = 2.0 * self.area;
        for &(xi, eta, w) in triangle_quadrature(GQ_ORDER) {
            let shape = [1.0 - xi - eta, xi, eta];
            let q = self.vertices[0] * shape[0] + self.vertices[1] * shape[1]
                + self.vertices[2] * shape[2];
            let v = source.source_velocity(&q, is_self, core_radius);
            let vn = v.dot(&self.normal);
            for k in 0..3 {
                sp[k] += w * two_a * shape[k] * vn;
            }
        }
        sp
    }

    /// 3×3 scalar products of the doublet-panel basis potentials with this
    /// panel's basis functions: `sp[k][l] = ∫ N_k φ_l dS`.
    pub fn scalar_product_doublet_potential(&self, doublet: &Panel, is_self: bool) -> [[f64; 3]; 3] {
        let mut sp = [[0.0; 3]; 3];
        let two_a = 2.0 * self.area;
        for &(xi, eta, w) in triangle_quadrature(GQ_ORDER) {
            let shape = [1.0 - xi - eta, xi, eta];
            let q = self.vertices[0] * shape[0] + self.vertices[1] * shape[1]
                + self.vertices[2] * shape[2];
            let phi = doublet.doublet_basis_potential(&q, is_self, true);
            for k in 0..3 {
                for l in 0..3 {
                    sp[k][l] += w * two_a * shape[k] * phi[l];
                }
            }
        }
        sp
    }

    /// 3×3 scalar products of the doublet-panel basis normal velocities
    /// with this panel's basis functions.
    pub fn scalar_product_doublet_velocity(
        &self,
        doublet: &Panel,
        core_radius: f64,
    ) -> [[f64; 3]; 3] {
        let mut sp = [[0.0; 3]; 3];
        let two_a = 2.0 * self.area;
        for &(xi, eta, w) in triangle_quadrature(GQ_ORDER) {
            let shape = [1.0 - xi - eta, xi, eta];
            let q = self.vertices[0] * shape[0] + self.vertices[1] * shape[1]
                + self.vertices[2] * shape[2];
            let v = doublet.doublet_basis_velocity(&q, DensityModel::Linear, core_radius, true);
            for k in 0..3 {
                for l in 0..3 {
                    sp[k][l] += w * two_a * shape[k] * v[l].dot(&self.normal);
                }
            }
        }
        sp
    }
}

/// The per-edge arctangent term of the NASA TN-4023 kernels, with the
/// in-plane side-jump handling.
fn edge_angle(pn: f64, a: f64, b: f64, pa: f64, pb: f64, sm: f64) -> f64 {
    let rnum = sm * pn * (b * pa - a * pb);
    let dnom = pa * pb + pn * pn * a * b * sm * sm;

    if pn.abs() < IN_PLANE_EPS {
        if dnom < 0.0 {
            if pn > 0.0 {
                PI
            } else {
                -PI
            }
        } else if dnom == 0.0 {
            if pn > 0.0 {
                PI / 2.0
            } else {
                -PI / 2.0
            }
        } else {
            0.0
        }
    } else {
        rnum.atan2(dnom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_panel() -> Panel {
        Panel::new(
            0,
            [
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
        )
    }

    #[test]
    fn test_geometry() {
        let p = unit_panel();
        assert_relative_eq!(p.area, 0.5, epsilon = 1e-12);
        assert_relative_eq!(p.normal.z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.cog.x, 1.0 / 3.0, epsilon = 1e-12);
        // frame is orthonormal
        assert_relative_eq!(p.l.dot(&p.m), 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.l.dot(&p.normal), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_basis_partition_of_unity() {
        let p = unit_panel();
        for &(x, y) in &[(0.0, 0.0), (0.1, 0.05), (-0.1, 0.1)] {
            let sum: f64 = (0..3).map(|k| p.basis(x, y, k)).sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
        }
        // value 1 at own vertex, 0 at the others
        for k in 0..3 {
            let s = p.local_vertices[k];
            assert_relative_eq!(p.basis(s.x, s.y, k), 1.0, epsilon = 1e-12);
            assert_relative_eq!(p.basis(s.x, s.y, (k + 1) % 3), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_source_potential_far_field() {
        let p = unit_panel();
        let pt = Vector3::new(0.0, 0.0, 50.0);
        let phi = p.source_potential(&pt, false, 0.0);
        let r = (pt - p.cog).norm();
        assert_relative_eq!(phi, -p.area / r, epsilon = 1e-4);
    }

    #[test]
    fn test_source_potential_near_matches_far_at_transition() {
        // the closed form and the point form agree near the switch distance
        let p = unit_panel();
        let r = 0.95 * RFF_FACTOR * p.max_size;
        let pt = p.cog + Vector3::new(0.3, -0.2, 1.0).normalized() * r;
        let near = p.source_potential(&pt, false, 0.0);
        let far = -p.area / (pt - p.cog).norm();
        assert_relative_eq!(near, far, max_relative = 1e-3);
    }

    #[test]
    fn test_source_velocity_radial_far() {
        let p = unit_panel();
        let pt = Vector3::new(0.0, 0.0, 30.0);
        let v = p.source_velocity(&pt, false, 0.0);
        assert!(v.z > 0.0);
        assert_relative_eq!(v.x, (pt - p.cog).x * p.area / (pt - p.cog).norm().powi(3), epsilon = 1e-6);
    }

    #[test]
    fn test_source_self_velocity() {
        let p = unit_panel();
        let cog = p.cog;
        let v = p.source_velocity(&cog, true, 1e-6);
        assert_relative_eq!(v.z, 2.0 * PI, epsilon = 1e-12);
    }

    #[test]
    fn test_uniform_doublet_solid_angle() {
        // immediately above the panel interior the doublet potential
        // approaches −2π (exterior side), and the sum with the interior
        // limit 2π is the full solid angle 4π
        let p = unit_panel();
        let above = p.cog + Vector3::new(0.0, 0.0, 1e-4);
        let phi = p.uniform_doublet_potential(&above, false, true);
        assert_relative_eq!(phi, -2.0 * PI, epsilon = 1e-2);
        let below = p.cog + Vector3::new(0.0, 0.0, -1e-4);
        let phi_b = p.uniform_doublet_potential(&below, false, true);
        assert_relative_eq!(phi_b, 2.0 * PI, epsilon = 1e-2);
    }

    #[test]
    fn test_uniform_doublet_far_field() {
        let p = unit_panel();
        let pt = Vector3::new(0.2, 0.1, 40.0);
        let phi = p.uniform_doublet_potential(&pt, false, false);
        let pjk = pt - p.cog;
        let expected = -pjk.dot(&p.normal) * p.area / pjk.norm().powi(3);
        assert_relative_eq!(phi, expected, max_relative = 1e-3);
    }

    #[test]
    fn test_ring_velocity_matches_far_field() {
        let p = unit_panel();
        let pt = Vector3::new(0.5, -0.3, 20.0);
        let near = p.ring_velocity(&pt, 0.0, false);
        let far = p.ring_velocity(&pt, 0.0, true);
        assert_relative_eq!(near.z, far.z, max_relative = 1e-2);
    }

    #[test]
    fn test_ring_velocity_self_is_normal() {
        // at its own collocation point the ring induces a pure normal velocity
        let p = unit_panel();
        let cog = p.cog;
        let v = p.ring_velocity(&cog, 1e-6, false);
        assert!(v.z.abs() > 1.0);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(v.y, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_basis_potential_sums_to_uniform() {
        let p = unit_panel();
        let pt = Vector3::new(0.4, 0.3, 1.2);
        let phi = p.doublet_basis_potential(&pt, false, false);
        let uniform = p.uniform_doublet_potential(&pt, false, false);
        assert_relative_eq!(phi[0] + phi[1] + phi[2], uniform, max_relative = 2e-2);
    }

    #[test]
    fn test_basis_velocity_sums_to_ring() {
        let p = unit_panel();
        let pt = Vector3::new(0.4, 0.3, 1.5);
        let v = p.doublet_basis_velocity(&pt, DensityModel::Linear, 0.0, false);
        let ring = p.ring_velocity(&pt, 0.0, false);
        let sum = v[0] + v[1] + v[2];
        assert_relative_eq!(sum.z, ring.z, max_relative = 1e-2);
    }
}
