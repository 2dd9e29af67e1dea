//! Gauss quadrature rules over the reference triangle
//!
//! Points are (ξ, η) on the triangle with vertices (0,0), (1,0), (0,1);
//! weights sum to 0.5, the reference-triangle area.

#![allow(clippy::excessive_precision)]

/// Quadrature rule: (ξ, η, weight) triplets.
pub fn triangle_quadrature(order: usize) -> &'static [(f64, f64, f64)] {
    match order {
        1 => &TR1,
        2 => &TR4,
        3 => &TR7,
        _ => &TR13,
    }
}

static TR1: [(f64, f64, f64); 1] = [(0.333333333333333, 0.333333333333333, 0.5)];

static TR4: [(f64, f64, f64); 4] = [
    (0.333333333333333, 0.333333333333333, -0.28125),
    (0.6, 0.2, 0.2604166666666665),
    (0.2, 0.6, 0.2604166666666665),
    (0.2, 0.2, 0.2604166666666665),
];

static TR7: [(f64, f64, f64); 7] = [
    (0.333333333333333, 0.333333333333333, 0.1125),
    (0.797426985353087, 0.101286507323456, 0.0629695902724135),
    (0.101286507323456, 0.797426985353087, 0.0629695902724135),
    (0.101286507323456, 0.101286507323456, 0.0629695902724135),
    (0.470142064105115, 0.059715871789770, 0.066197076394253),
    (0.059715871789770, 0.470142064105115, 0.066197076394253),
    (0.470142064105115, 0.470142064105115, 0.066197076394253),
];

static TR13: [(f64, f64, f64); 13] = [
    (0.333333333333333, 0.333333333333333, -0.074785022233841),
    (0.260345966079040, 0.260345966079040, 0.087807628716604),
    (0.260345966079040, 0.479308067841920, 0.087807628716604),
    (0.479308067841920, 0.260345966079040, 0.087807628716604),
    (0.065130102902216, 0.065130102902216, 0.026673617804419),
    (0.065130102902216, 0.869739794195568, 0.026673617804419),
    (0.869739794195568, 0.065130102902216, 0.026673617804419),
    (0.638444188569810, 0.048690315425316, 0.0385568804451285),
    (0.048690315425316, 0.638444188569810, 0.0385568804451285),
    (0.638444188569810, 0.312865496004874, 0.0385568804451285),
    (0.312865496004874, 0.638444188569810, 0.0385568804451285),
    (0.048690315425316, 0.312865496004874, 0.0385568804451285),
    (0.312865496004874, 0.048690315425316, 0.0385568804451285),
];

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weights_sum_to_reference_area() {
        for order in 1..=4 {
            let sum: f64 = triangle_quadrature(order).iter().map(|&(_, _, w)| w).sum();
            assert_relative_eq!(sum, 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_linear_exactness() {
        // ∫ξ over the reference triangle = 1/6
        for order in 2..=4 {
            let s: f64 = triangle_quadrature(order)
                .iter()
                .map(|&(xi, _, w)| xi * w)
                .sum();
            assert_relative_eq!(s, 1.0 / 6.0, epsilon = 1e-12);
        }
    }
}
