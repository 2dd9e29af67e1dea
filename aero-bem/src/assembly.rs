//! Influence-matrix and right-hand-side assembly
//!
//! The system rows are partitioned into contiguous panel ranges; each
//! block is computed by an independent worker when multi-threading is
//! enabled. Workers write disjoint row ranges of the matrix, set a shared
//! error flag cooperatively on a numerical failure, and poll the shared
//! cancellation flag. Sequential execution short-circuits the remaining
//! blocks once the error flag is set; parallel blocks already launched
//! run to completion and are joined.

use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayViewMut2, Axis};

use aero_solvers::parallel::{block_ranges, map_blocks};

use crate::config::{BoundaryKind, DensityModel};
use crate::field::FieldContext;
use crate::panel::Panel;
use crate::quadrature::triangle_quadrature;
use crate::vector::Vector3;

/// Quadrature order of the Galerkin products, matching the panel kernels.
const GQ_ORDER: usize = 4;

/// The seven unit right-hand-side columns.
#[derive(Debug, Clone, Default)]
pub struct UnitRhs {
    pub u: Vec<f64>,
    pub v: Vec<f64>,
    pub w: Vec<f64>,
    pub p: Vec<f64>,
    pub q: Vec<f64>,
    pub r: Vec<f64>,
}

/// Unit source strength of a panel facing the onset flow `v`:
/// `σ = −(V·n)/4π`.
pub fn source_strength(normal: &Vector3, v: &Vector3) -> f64 {
    -v.dot(normal) / (4.0 * std::f64::consts::PI)
}

/// True when the row of panel `p3i` enforces the Neumann condition:
/// either globally configured, or always on thin mid panels.
fn neumann_row(ctx: &FieldContext, p3i: &Panel) -> bool {
    ctx.config.boundary == BoundaryKind::Neumann || p3i.is_mid()
}

/// Builds the influence matrix, block-parallel over row ranges.
///
/// Returns `false` (and logs) when a numerical error was detected; the
/// matrix content is then unusable.
pub fn make_influence_matrix(
    ctx: &FieldContext,
    error: &AtomicBool,
    n_blocks: usize,
    multithread: bool,
    aij: &mut Array2<f64>,
) -> bool {
    error.store(false, Ordering::Relaxed);
    let n_panels = ctx.panels.len();
    let mult = ctx.config.density_model.per_panel_count();
    debug_assert_eq!(aij.nrows(), n_panels * mult);

    let ranges = block_ranges(n_panels, n_blocks);
    let chunk_rows = ranges[0].len().max(1) * mult;

    if multithread && ranges.len() > 1 {
        aij.axis_chunks_iter_mut(Axis(0), chunk_rows)
            .into_par_iter()
            .enumerate()
            .for_each(|(iblock, chunk)| {
                let start = iblock * chunk_rows / mult;
                matrix_block(ctx, error, start, chunk);
            });
    } else {
        for (iblock, chunk) in aij.axis_chunks_iter_mut(Axis(0), chunk_rows).enumerate() {
            if error.load(Ordering::Relaxed) {
                break;
            }
            let start = iblock * chunk_rows / mult;
            matrix_block(ctx, error, start, chunk);
        }
    }

    if error.load(Ordering::Relaxed) {
        log::error!("error building the influence matrix");
        return false;
    }
    true
}

/// Fills the matrix rows of the panels starting at `first_panel`.
fn matrix_block(
    ctx: &FieldContext,
    error: &AtomicBool,
    first_panel: usize,
    mut rows: ArrayViewMut2<f64>,
) {
    let mult = ctx.config.density_model.per_panel_count();
    let n_row_panels = rows.nrows() / mult;

    for local in 0..n_row_panels {
        let i3 = first_panel + local;
        let p3i = &ctx.panels[i3];

        for (k3, p3k) in ctx.panels.iter().enumerate() {
            match ctx.config.density_model {
                DensityModel::Uniform => {
                    let value = if neumann_row(ctx, p3i) {
                        let v = ctx.doublet_velocity_at(
                            p3k,
                            &p3i.cog,
                            ctx.config.core_radius,
                            true,
                        );
                        (v[0] + v[1] + v[2]).dot(&p3i.normal)
                    } else {
                        let phi = ctx.doublet_potential_at(p3k, &p3i.cog, i3 == k3, true);
                        phi[0] + phi[1] + phi[2]
                    };

                    if value.is_nan() {
                        log::error!(
                            "numerical error computing the influence of panel {k3} on panel {i3}"
                        );
                        error.store(true, Ordering::Relaxed);
                        return;
                    }
                    rows[[local, k3]] = value;
                }
                DensityModel::Linear => {
                    let sp = if neumann_row(ctx, p3i) {
                        p3i.scalar_product_doublet_velocity(p3k, ctx.config.core_radius)
                    } else {
                        p3i.scalar_product_doublet_potential(p3k, i3 == k3)
                    };

                    if sp[0][0].is_nan() || sp[1][1].is_nan() || sp[2][2].is_nan() {
                        log::error!(
                            "numerical error computing the influence of panel {k3} on panel {i3}"
                        );
                        error.store(true, Ordering::Relaxed);
                        return;
                    }

                    for ib in 0..3 {
                        for kb in 0..3 {
                            rows[[3 * local + ib, 3 * k3 + kb]] = sp[ib][kb];
                        }
                    }

                    if ctx.config.has_image_plane() {
                        let coef = ctx.config.image_coefficient();
                        let mirrored = mirror_panel(ctx, p3k);
                        let spg = if neumann_row(ctx, p3i) {
                            p3i.scalar_product_doublet_velocity(&mirrored, ctx.config.core_radius)
                        } else {
                            p3i.scalar_product_doublet_potential(&mirrored, false)
                        };
                        for ib in 0..3 {
                            for kb in 0..3 {
                                rows[[3 * local + ib, 3 * k3 + kb]] += spg[ib][kb] * coef;
                            }
                        }
                    }
                }
            }

            if ctx.is_cancelled() {
                return;
            }
        }
    }
}

/// The image of a panel across the ground/free-surface plane, with its
/// orientation reversed.
fn mirror_panel(ctx: &FieldContext, p3: &Panel) -> Panel {
    let h = ctx.config.ground_height;
    let m = |v: &Vector3| Vector3::new(v.x, v.y, -v.z - 2.0 * h);
    Panel::new(
        p3.index,
        [m(&p3.vertices[0]), m(&p3.vertices[2]), m(&p3.vertices[1])],
    )
}

/// Adds the trailing-wake contribution to the influence matrix.
///
/// Each trailing bottom or mid panel's wake column contributes to its own
/// column (mid: +1, bottom: −1) and, for bottom panels, with opposite
/// sign to the paired top panel's column; the linear model splits the
/// accumulation between the left and right trailing-node unknowns.
pub fn add_wake_contribution(
    ctx: &FieldContext,
    error: &AtomicBool,
    n_blocks: usize,
    multithread: bool,
    aij: &mut Array2<f64>,
) -> bool {
    let n_panels = ctx.panels.len();
    let mult = ctx.config.density_model.per_panel_count();

    let ranges = block_ranges(n_panels, n_blocks);
    let chunk_rows = ranges[0].len().max(1) * mult;

    if multithread && ranges.len() > 1 {
        aij.axis_chunks_iter_mut(Axis(0), chunk_rows)
            .into_par_iter()
            .enumerate()
            .for_each(|(iblock, chunk)| {
                let start = iblock * chunk_rows / mult;
                wake_matrix_block(ctx, error, start, chunk);
            });
    } else {
        for (iblock, chunk) in aij.axis_chunks_iter_mut(Axis(0), chunk_rows).enumerate() {
            if error.load(Ordering::Relaxed) {
                break;
            }
            let start = iblock * chunk_rows / mult;
            wake_matrix_block(ctx, error, start, chunk);
        }
    }

    !error.load(Ordering::Relaxed)
}

fn wake_matrix_block(
    ctx: &FieldContext,
    error: &AtomicBool,
    first_panel: usize,
    mut rows: ArrayViewMut2<f64>,
) {
    let mult = ctx.config.density_model.per_panel_count();
    let n_row_panels = rows.nrows() / mult;

    for local in 0..n_row_panels {
        let i3 = first_panel + local;
        let p3i = &ctx.panels[i3];

        for (k3, p3k) in ctx.panels.iter().enumerate() {
            if !(p3k.is_trailing && (p3k.is_bottom() || p3k.is_mid())) {
                continue;
            }
            let head = match p3k.wake {
                Some(head) => head,
                // the wake has not been built for this panel
                None => continue,
            };

            match ctx.config.density_model {
                DensityModel::Uniform => {
                    let contrib = if neumann_row(ctx, p3i) {
                        let (l, r) =
                            ctx.wake_column_velocity(head, &p3i.cog, ctx.config.core_radius);
                        (l + r).dot(&p3i.normal)
                    } else {
                        let (l, r) = ctx.wake_column_potential(head, &p3i.cog);
                        l + r
                    };

                    if contrib.is_nan() {
                        log::error!(
                            "numerical error in the wake contribution of panel {k3} on panel {i3}"
                        );
                        error.store(true, Ordering::Relaxed);
                        return;
                    }

                    if p3k.is_mid() {
                        rows[[local, k3]] += contrib;
                    } else {
                        rows[[local, k3]] -= contrib;
                        if let Some(k3t) = p3k.opposite {
                            rows[[local, k3t]] += contrib;
                        } else {
                            debug_assert!(false, "bottom trailing panel {k3} has no opposite");
                        }
                    }
                }
                DensityModel::Linear => {
                    let (left, right) = scalar_product_wake(ctx, p3i, head);
                    if left[0].is_nan() || right[0].is_nan() {
                        log::error!(
                            "numerical error in the wake scalar products of panel {k3} on panel {i3}"
                        );
                        error.store(true, Ordering::Relaxed);
                        return;
                    }

                    let sign = if p3k.is_mid() { 1.0 } else { -1.0 };
                    for ib in 0..3 {
                        let row = 3 * local + ib;
                        // the wake is driven by the trailing-node
                        // unknowns, basis functions 1 (left) and 2 (right)
                        rows[[row, 3 * k3 + 1]] += sign * left[ib];
                        rows[[row, 3 * k3 + 2]] += sign * right[ib];
                    }

                    if !p3k.is_mid() {
                        if let Some(k3t) = p3k.opposite {
                            for ib in 0..3 {
                                let row = 3 * local + ib;
                                rows[[row, 3 * k3t + 1]] += left[ib];
                                rows[[row, 3 * k3t + 2]] += right[ib];
                            }
                        } else {
                            debug_assert!(false, "bottom trailing panel {k3} has no opposite");
                        }
                    }
                }
            }

            if ctx.is_cancelled() {
                return;
            }
        }
    }
}

/// Galerkin products of a wake column's left/right influence with the
/// receiving panel's basis functions.
fn scalar_product_wake(ctx: &FieldContext, receiver: &Panel, head: usize) -> ([f64; 3], [f64; 3]) {
    let mut left = [0.0; 3];
    let mut right = [0.0; 3];
    let two_a = 2.0 * receiver.area;
    let neumann = neumann_row(ctx, receiver);

    for &(xi, eta, w) in triangle_quadrature(GQ_ORDER) {
        let shape = [1.0 - xi - eta, xi, eta];
        let q = receiver.vertices[0] * shape[0]
            + receiver.vertices[1] * shape[1]
            + receiver.vertices[2] * shape[2];

        let (l, r) = if neumann {
            let (lv, rv) = ctx.wake_column_velocity(head, &q, ctx.config.core_radius);
            (lv.dot(&receiver.normal), rv.dot(&receiver.normal))
        } else {
            ctx.wake_column_potential(head, &q)
        };

        for k in 0..3 {
            left[k] += w * two_a * shape[k] * l;
            right[k] += w * two_a * shape[k] * r;
        }
    }
    (left, right)
}

/// Builds the seven unit right-hand-side columns: unit inflow along
/// x/y/z and unit rotation rate about x/y/z through the reference point.
pub fn make_unit_rhs(ctx: &FieldContext, n_blocks: usize, multithread: bool) -> UnitRhs {
    let n_panels = ctx.panels.len();
    let mult = ctx.config.density_model.per_panel_count();
    let rank = n_panels * mult;

    let blocks = map_blocks(n_panels, n_blocks, multithread, |range| {
        unit_rhs_block(ctx, range)
    });

    let mut rhs = UnitRhs {
        u: Vec::with_capacity(rank),
        v: Vec::with_capacity(rank),
        w: Vec::with_capacity(rank),
        p: Vec::with_capacity(rank),
        q: Vec::with_capacity(rank),
        r: Vec::with_capacity(rank),
    };
    for b in blocks {
        rhs.u.extend_from_slice(&b.u);
        rhs.v.extend_from_slice(&b.v);
        rhs.w.extend_from_slice(&b.w);
        rhs.p.extend_from_slice(&b.p);
        rhs.q.extend_from_slice(&b.q);
        rhs.r.extend_from_slice(&b.r);
    }
    rhs
}

fn unit_rhs_block(ctx: &FieldContext, range: std::ops::Range<usize>) -> UnitRhs {
    let vx = Vector3::new(1.0, 0.0, 0.0);
    let vy = Vector3::new(0.0, 1.0, 0.0);
    let vz = Vector3::new(0.0, 0.0, 1.0);

    let mult = ctx.config.density_model.per_panel_count();
    let n_rows = range.len() * mult;
    let mut rhs = UnitRhs {
        u: vec![0.0; n_rows],
        v: vec![0.0; n_rows],
        w: vec![0.0; n_rows],
        p: vec![0.0; n_rows],
        q: vec![0.0; n_rows],
        r: vec![0.0; n_rows],
    };

    for (local, i3) in range.clone().enumerate() {
        let p3i = &ctx.panels[i3];
        let lever_i = p3i.cog - ctx.config.cog;
        let row0 = local * mult;
        // basis-weighted free terms: 1 for collocation, A/3 for Galerkin
        let weight = match ctx.config.density_model {
            DensityModel::Uniform => 1.0,
            DensityModel::Linear => p3i.area / 3.0,
        };

        if neumann_row(ctx, p3i) {
            for ib in 0..mult {
                rhs.u[row0 + ib] = -vx.dot(&p3i.normal) * weight;
                rhs.v[row0 + ib] = -vy.dot(&p3i.normal) * weight;
                rhs.w[row0 + ib] = -vz.dot(&p3i.normal) * weight;
                rhs.p[row0 + ib] = -lever_i.cross(&vx).dot(&p3i.normal) * weight;
                rhs.q[row0 + ib] = -lever_i.cross(&vy).dot(&p3i.normal) * weight;
                rhs.r[row0 + ib] = -lever_i.cross(&vz).dot(&p3i.normal) * weight;
            }
        }

        for (k3, p3k) in ctx.panels.iter().enumerate() {
            if !p3k.is_thick() {
                // no source singularity on thin surfaces
                continue;
            }
            let lever_k = p3k.cog - ctx.config.cog;

            let sp: [f64; 3] = match ctx.config.density_model {
                DensityModel::Uniform => {
                    let s = if neumann_row(ctx, p3i) {
                        ctx.source_velocity_at(p3k, &p3i.cog, i3 == k3).dot(&p3i.normal)
                    } else {
                        ctx.source_potential_at(p3k, &p3i.cog, i3 == k3)
                    };
                    [s, 0.0, 0.0]
                }
                DensityModel::Linear => {
                    if neumann_row(ctx, p3i) {
                        p3i.scalar_product_source_velocity(p3k, i3 == k3, ctx.config.core_radius)
                    } else {
                        p3i.scalar_product_source_potential(p3k, i3 == k3, ctx.config.core_radius)
                    }
                }
            };

            for (col, v_unit) in [(0, vx), (1, vy), (2, vz)] {
                let sigma = source_strength(&p3k.normal, &v_unit);
                let target = match col {
                    0 => &mut rhs.u,
                    1 => &mut rhs.v,
                    _ => &mut rhs.w,
                };
                apply_source_term(target, row0, mult, &sp, sigma, ctx.config.density_model);
            }
            for (col, om) in [(0, vx), (1, vy), (2, vz)] {
                let sigma = source_strength(&p3k.normal, &lever_k.cross(&om));
                let target = match col {
                    0 => &mut rhs.p,
                    1 => &mut rhs.q,
                    _ => &mut rhs.r,
                };
                apply_source_term(target, row0, mult, &sp, sigma, ctx.config.density_model);
            }

            if ctx.is_cancelled() {
                return rhs;
            }
        }
    }
    rhs
}

fn apply_source_term(
    target: &mut [f64],
    row0: usize,
    mult: usize,
    sp: &[f64; 3],
    sigma: f64,
    model: DensityModel,
) {
    match model {
        DensityModel::Uniform => {
            target[row0] -= sigma * sp[0];
        }
        DensityModel::Linear => {
            for ib in 0..mult {
                target[row0 + ib] -= sigma * sp[ib];
            }
        }
    }
}
