//! Closed-form kernels for 2×2, 3×3 and 4×4 systems
//!
//! Cofactor/determinant formulas, used as fast paths by the general
//! routines. Matrices are row-major fixed-size arrays.

/// Determinant magnitude below which a small matrix is treated as singular.
const DET_EPS: f64 = 1.0e-20;

/// Determinant of a 3×3 matrix.
pub fn det33(m: &[f64; 9]) -> f64 {
    m[0] * (m[4] * m[8] - m[5] * m[7]) - m[3] * (m[1] * m[8] - m[2] * m[7])
        + m[6] * (m[1] * m[5] - m[2] * m[4])
}

/// Cofactor of element (i, j) in a 4×4 matrix.
pub fn cofactor44(m: &[f64; 16], i: usize, j: usize) -> f64 {
    let mut a33 = [0.0_f64; 9];
    let mut p = 0;
    for k in 0..4 {
        if k == i {
            continue;
        }
        let mut q = 0;
        for l in 0..4 {
            if l == j {
                continue;
            }
            a33[p * 3 + q] = m[4 * k + l];
            q += 1;
        }
        p += 1;
    }
    det33(&a33)
}

/// Determinant of a 4×4 matrix, expanded along the first row.
pub fn det44(m: &[f64; 16]) -> f64 {
    let mut det = 0.0;
    for j in 0..4 {
        let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
        det += sign * m[j] * cofactor44(m, 0, j);
    }
    det
}

/// Inverts a 2×2 matrix. `None` if the determinant is below threshold.
pub fn invert22(m: &[f64; 4]) -> Option<[f64; 4]> {
    let det = m[0] * m[3] - m[1] * m[2];
    if det.abs() < 1.0e-15 {
        return None;
    }
    Some([m[3] / det, -m[1] / det, -m[2] / det, m[0] / det])
}

/// Inverts a 3×3 matrix.
pub fn invert33(m: &[f64; 9]) -> Option<[f64; 9]> {
    let det = det33(m);
    if det.abs() < DET_EPS {
        return None;
    }
    Some([
        (m[4] * m[8] - m[5] * m[7]) / det,
        (m[2] * m[7] - m[1] * m[8]) / det,
        (m[1] * m[5] - m[2] * m[4]) / det,
        (m[5] * m[6] - m[3] * m[8]) / det,
        (m[0] * m[8] - m[2] * m[6]) / det,
        (m[2] * m[3] - m[0] * m[5]) / det,
        (m[3] * m[7] - m[4] * m[6]) / det,
        (m[1] * m[6] - m[0] * m[7]) / det,
        (m[0] * m[4] - m[1] * m[3]) / det,
    ])
}

/// Inverts a 4×4 matrix by cofactor expansion.
pub fn invert44(m: &[f64; 16]) -> Option<[f64; 16]> {
    let det = det44(m);
    if det.abs() < 1.0e-50 {
        return None;
    }
    let mut out = [0.0_f64; 16];
    for i in 0..4 {
        for j in 0..4 {
            let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
            out[4 * j + i] = sign * cofactor44(m, i, j) / det;
        }
    }
    Some(out)
}

/// Solves a 2×2 system in place for `nrhs` stacked right-hand sides.
pub fn solve_2x2(m: &[f64; 4], rhs: &mut [f64]) -> bool {
    let det = m[0] * m[3] - m[1] * m[2];
    if det.abs() < DET_EPS {
        return false;
    }
    for pair in rhs.chunks_exact_mut(2) {
        let (a, b) = (pair[0], pair[1]);
        pair[0] = (a * m[3] - b * m[1]) / det;
        pair[1] = -(a * m[2] - b * m[0]) / det;
    }
    true
}

/// Solves a 3×3 system in place for stacked right-hand sides, by Cramer's rule.
pub fn solve_3x3(m: &[f64; 9], rhs: &mut [f64]) -> bool {
    let det = det33(m);
    if det.abs() < DET_EPS {
        return false;
    }
    for r in rhs.chunks_exact_mut(3) {
        let x = r[0] * (m[4] * m[8] - m[5] * m[7]) - r[1] * (m[1] * m[8] - m[2] * m[7])
            + r[2] * (m[1] * m[5] - m[2] * m[4]);
        let y = m[0] * (r[1] * m[8] - m[5] * r[2]) - m[3] * (r[0] * m[8] - m[2] * r[2])
            + m[6] * (r[0] * m[5] - m[2] * r[1]);
        let z = m[0] * (m[4] * r[2] - r[1] * m[7]) - m[3] * (m[1] * r[2] - r[0] * m[7])
            + m[6] * (m[1] * r[1] - r[0] * m[4]);
        r[0] = x / det;
        r[1] = y / det;
        r[2] = z / det;
    }
    true
}

/// Solves a 4×4 system in place for stacked right-hand sides.
pub fn solve_4x4(m: &[f64; 16], rhs: &mut [f64]) -> bool {
    let inv = match invert44(m) {
        Some(inv) => inv,
        None => return false,
    };
    for r in rhs.chunks_exact_mut(4) {
        let mut y = [0.0_f64; 4];
        mat_vec_4x4(&inv, &[r[0], r[1], r[2], r[3]], &mut y);
        r.copy_from_slice(&y);
    }
    true
}

/// 2×2 matrix-vector product.
pub fn mat_vec_2x2(a: &[f64; 4], x: &[f64; 2], y: &mut [f64; 2]) {
    y[0] = a[0] * x[0] + a[1] * x[1];
    y[1] = a[2] * x[0] + a[3] * x[1];
}

/// 3×3 matrix-vector product.
pub fn mat_vec_3x3(a: &[f64; 9], x: &[f64; 3], y: &mut [f64; 3]) {
    y[0] = a[0] * x[0] + a[1] * x[1] + a[2] * x[2];
    y[1] = a[3] * x[0] + a[4] * x[1] + a[5] * x[2];
    y[2] = a[6] * x[0] + a[7] * x[1] + a[8] * x[2];
}

/// 4×4 matrix-vector product.
pub fn mat_vec_4x4(a: &[f64; 16], x: &[f64; 4], y: &mut [f64; 4]) {
    for i in 0..4 {
        y[i] = a[4 * i] * x[0] + a[4 * i + 1] * x[1] + a[4 * i + 2] * x[2] + a[4 * i + 3] * x[3];
    }
}

/// 2×2 matrix product, row-major.
pub fn mat_mult22(a: &[f64; 4], b: &[f64; 4]) -> [f64; 4] {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
    ]
}

/// 3×3 matrix product, row-major.
pub fn mat_mult33(a: &[f64; 9], b: &[f64; 9]) -> [f64; 9] {
    let mut ab = [0.0_f64; 9];
    for i in 0..3 {
        for j in 0..3 {
            ab[3 * i + j] = a[3 * i] * b[j] + a[3 * i + 1] * b[3 + j] + a[3 * i + 2] * b[6 + j];
        }
    }
    ab
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_invert33_identity_product() {
        let m = [2.0, 1.0, 0.5, -1.0, 3.0, 2.0, 0.0, 1.0, 4.0];
        let inv = invert33(&m).expect("invertible");
        let prod = mat_mult33(&m, &inv);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(prod[3 * i + j], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_invert44_identity_product() {
        let m = [
            4.0, 1.0, 0.0, 2.0, 1.0, 3.0, 1.0, 0.0, 0.0, 1.0, 2.0, 1.0, 2.0, 0.0, 1.0, 5.0,
        ];
        let inv = invert44(&m).expect("invertible");
        for i in 0..4 {
            for j in 0..4 {
                let mut s = 0.0;
                for k in 0..4 {
                    s += m[4 * i + k] * inv[4 * k + j];
                }
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(s, expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_invert22_singular() {
        assert!(invert22(&[1.0, 2.0, 2.0, 4.0]).is_none());
    }

    #[test]
    fn test_solve_3x3_multiple_rhs() {
        let m = [4.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0];
        let mut rhs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert!(solve_3x3(&m, &mut rhs));
        for k in 0..2 {
            let x = &rhs[3 * k..3 * k + 3];
            let b = [1.0 + 3.0 * k as f64, 2.0 + 3.0 * k as f64, 3.0 + 3.0 * k as f64];
            let mut ax = [0.0; 3];
            mat_vec_3x3(&m, &[x[0], x[1], x[2]], &mut ax);
            for i in 0..3 {
                assert_relative_eq!(ax[i], b[i], epsilon = 1e-12);
            }
        }
    }
}
