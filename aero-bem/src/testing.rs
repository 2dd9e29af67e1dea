//! Test and validation fixtures
//!
//! Builds small analytic meshes the validation tests solve against. The
//! production mesh comes from the external tessellation layer; these
//! builders only cover the shapes the tests need.

use crate::panel::{Panel, WakeSide};
use crate::vector::Vector3;

/// Builds a flat, untwisted, uncambered rectangular plate in the z = 0
/// plane as a thin (mid-surface) mesh, with a straight wake behind every
/// trailing strip.
///
/// The plate spans `[0, chord] × [−span/2, span/2]`; `nx` chord-wise and
/// `ny` span-wise quads, each split into two triangles with outward
/// normals along +z. Returns `(panels, wake_panels)` ready for
/// `PanelAnalysis::set_mesh`.
pub fn flat_plate_mesh(
    nx: usize,
    ny: usize,
    chord: f64,
    span: f64,
    wake_length: f64,
    n_wake_steps: usize,
) -> (Vec<Panel>, Vec<Panel>) {
    plate_mesh(nx, ny, chord, span, wake_length, n_wake_steps, |_| 0.0)
}

/// A rectangular plate with the rear quarter-chord reflexed upward by
/// `reflex_deg`. The nose-up zero-lift moment lets a configuration with
/// the reference point ahead of the aerodynamic center trim at positive
/// lift, which the flat plate cannot.
pub fn reflexed_plate_mesh(
    nx: usize,
    ny: usize,
    chord: f64,
    span: f64,
    wake_length: f64,
    n_wake_steps: usize,
    reflex_deg: f64,
) -> (Vec<Panel>, Vec<Panel>) {
    let hinge = 0.75 * chord;
    let slope = reflex_deg.to_radians().tan();
    plate_mesh(nx, ny, chord, span, wake_length, n_wake_steps, move |x| {
        slope * (x - hinge).max(0.0)
    })
}

fn plate_mesh(
    nx: usize,
    ny: usize,
    chord: f64,
    span: f64,
    wake_length: f64,
    n_wake_steps: usize,
    camber: impl Fn(f64) -> f64,
) -> (Vec<Panel>, Vec<Panel>) {
    assert!(nx >= 1 && ny >= 1 && n_wake_steps >= 1);

    let dx = chord / nx as f64;
    let dy = span / ny as f64;
    let y0 = -span / 2.0;

    let idx = |i: usize, j: usize, which: usize| (j * nx + i) * 2 + which;

    let mut panels = Vec::with_capacity(2 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let xa = i as f64 * dx;
            let xb = xa + dx;
            let ya = y0 + j as f64 * dy;
            let yb = ya + dy;

            let a = Vector3::new(xa, ya, camber(xa));
            let b = Vector3::new(xb, ya, camber(xb));
            let c = Vector3::new(xb, yb, camber(xb));
            let d = Vector3::new(xa, yb, camber(xa));

            let trailing = i + 1 == nx;

            // first triangle of the quad
            let mut tri_a = Panel::new(idx(i, j, 0), [a, b, d]);
            tri_a.is_leading = i == 0;
            tri_a.neighbours = [
                (j > 0).then(|| idx(i, j - 1, 1)),
                Some(idx(i, j, 1)),
                (i > 0).then(|| idx(i - 1, j, 1)),
            ];
            tri_a.upstream = (i > 0).then(|| idx(i - 1, j, 1));

            // second triangle; trailing quads are ordered so that
            // vertices 1 and 2 are the left and right trailing nodes
            let mut tri_b = if trailing {
                let mut p = Panel::new(idx(i, j, 1), [d, b, c]);
                p.is_trailing = true;
                p.neighbours = [
                    Some(idx(i, j, 0)),
                    None,
                    (j + 1 < ny).then(|| idx(i, j + 1, 0)),
                ];
                p
            } else {
                let mut p = Panel::new(idx(i, j, 1), [b, c, d]);
                p.neighbours = [
                    Some(idx(i + 1, j, 0)),
                    (j + 1 < ny).then(|| idx(i, j + 1, 0)),
                    Some(idx(i, j, 0)),
                ];
                p
            };
            tri_b.upstream = Some(idx(i, j, 0));

            panels.push(tri_a);
            panels.push(tri_b);
        }
    }

    // one wake column per trailing strip, planar at the trailing-edge height
    let z_te = camber(chord);
    let dxw = wake_length / n_wake_steps as f64;
    let mut wake_panels = Vec::with_capacity(2 * n_wake_steps * ny);
    for j in 0..ny {
        let ya = y0 + j as f64 * dy;
        let yb = ya + dy;
        let base = wake_panels.len();

        for s in 0..n_wake_steps {
            let xs = chord + s as f64 * dxw;
            let xs1 = xs + dxw;
            let l_s = Vector3::new(xs, ya, z_te);
            let l_s1 = Vector3::new(xs1, ya, z_te);
            let r_s = Vector3::new(xs, yb, z_te);
            let r_s1 = Vector3::new(xs1, yb, z_te);

            let iw = base + 2 * s;

            let mut tri_right = Panel::new(iw, [l_s, r_s1, r_s]);
            tri_right.is_wake = true;
            tri_right.wake_side = WakeSide::Right;
            tri_right.upstream = (s > 0).then(|| iw - 1);
            tri_right.downstream = Some(iw + 1);

            let mut tri_left = Panel::new(iw + 1, [l_s, l_s1, r_s1]);
            tri_left.is_wake = true;
            tri_left.wake_side = WakeSide::Left;
            tri_left.upstream = Some(iw);
            tri_left.downstream = (s + 1 < n_wake_steps).then(|| iw + 2);

            wake_panels.push(tri_right);
            wake_panels.push(tri_left);
        }

        // attach the column to its shedding panel
        let te = idx(nx - 1, j, 1);
        panels[te].wake = Some(base);
    }

    (panels, wake_panels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wake;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_plate_geometry() {
        let (panels, wake_panels) = flat_plate_mesh(4, 6, 1.0, 6.0, 20.0, 10);
        assert_eq!(panels.len(), 2 * 4 * 6);
        assert_eq!(wake_panels.len(), 2 * 10 * 6);

        // total area equals the plate area
        let area: f64 = panels.iter().map(|p| p.area).sum();
        assert_relative_eq!(area, 6.0, epsilon = 1e-10);

        // all normals up
        for p in &panels {
            assert_relative_eq!(p.normal.z, 1.0, epsilon = 1e-12);
        }

        // one trailing panel per strip, each with a terminating wake
        let trailing: Vec<_> = panels.iter().filter(|p| p.is_trailing).collect();
        assert_eq!(trailing.len(), 6);
        assert!(wake::check_chains(&panels, &wake_panels).is_ok());

        for p in trailing {
            // trailing vortex points to the right (+y)
            assert!(p.trailing_vortex().y > 0.0);
            let head = p.wake.expect("wake attached");
            let (left, right) = wake::trailing_wake_points(&wake_panels, head).expect("terminus");
            assert_relative_eq!(left.x, 1.0 + 20.0, epsilon = 1e-10);
            assert!(right.y > left.y);
        }
    }

    #[test]
    fn test_flat_plate_strip_chains() {
        let (panels, _) = flat_plate_mesh(3, 2, 1.0, 2.0, 10.0, 5);
        // walking upstream from a trailing panel visits the whole strip
        for p in panels.iter().filter(|p| p.is_trailing) {
            let mut count = 1;
            let mut index = p.upstream;
            while let Some(i) = index {
                count += 1;
                index = panels[i].upstream;
                assert!(count <= panels.len());
            }
            assert_eq!(count, 2 * 3);
        }
    }
}
