//! Physics validation on a flat rectangular wing
//!
//! A flat, symmetric, untwisted thin plate must produce zero lift and
//! zero pitching moment at zero incidence, a positive and monotonically
//! increasing lift through the pre-stall range, and near-field /
//! far-field force evaluations that agree for a converged case.

use aero_bem::testing::flat_plate_mesh;
use aero_bem::{
    wind_direction, wind_normal, FlowConfig, PanelAnalysis, SolverSettings, SpanDistribs, Vector3,
};

const NX: usize = 4;
const NY: usize = 10;
const CHORD: f64 = 1.0;
const SPAN: f64 = 6.0;
const WAKE_LENGTH: f64 = 60.0;
const WAKE_STEPS: usize = 15;

/// Builds and solves the unit system once.
fn solved_plate() -> PanelAnalysis {
    let (panels, wake_panels) = flat_plate_mesh(NX, NY, CHORD, SPAN, WAKE_LENGTH, WAKE_STEPS);

    let config = FlowConfig::default().with_reference(CHORD, CHORD * SPAN);
    let mut analysis = PanelAnalysis::new(config, SolverSettings::default());
    analysis.set_mesh(panels, wake_panels).expect("mesh");
    analysis.initialize_analysis().expect("allocate");
    analysis.solve_unit_system().expect("unit solve");
    analysis.make_local_velocities();
    analysis
}

/// Dimensional lift at unit speed for the given angle of attack.
fn lift_at(analysis: &mut PanelAnalysis, alpha: f64) -> f64 {
    let winddir = wind_direction(alpha, 0.0);
    let wind_n = wind_normal(alpha, 0.0);

    analysis.make_source_strengths(&winddir);
    analysis.make_unit_doublet_strengths(alpha, 0.0);

    let vinf = vec![winddir; analysis.n_panels()];
    let vlocal = analysis.combine_local_velocities(alpha, 0.0);
    analysis.compute_on_body_cp(&vinf, &vlocal);

    let mu = analysis.mu.clone();
    let sigma = analysis.sigma.clone();
    let cog = Vector3::zero();
    let (force, _moment) = analysis.forces(&mu, &sigma, alpha, 0.0, &cog, true, &vinf);
    force.dot(&wind_n)
}

#[test]
fn test_zero_incidence_zero_lift_and_moment() {
    let mut analysis = solved_plate();

    // the onset flow is parallel to every panel: the right-hand side is
    // identically zero and so is the whole solution
    analysis.make_unit_doublet_strengths(0.0, 0.0);
    let winddir = wind_direction(0.0, 0.0);
    analysis.make_source_strengths(&winddir);

    let max_mu = analysis
        .mu
        .values()
        .iter()
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    assert!(
        max_mu < 1e-10,
        "doublet strengths must vanish at zero incidence, got {max_mu}"
    );

    let lift = lift_at(&mut analysis, 0.0);
    assert!(lift.abs() < 1e-8, "lift at zero incidence: {lift}");

    let cog = Vector3::zero();
    let cm = analysis.compute_cm(&cog, 0.0, true);
    assert!(cm.abs() < 1e-8, "pitching moment at zero incidence: {cm}");
}

#[test]
fn test_lift_positive_and_monotonic() {
    let mut analysis = solved_plate();

    let mut previous = 0.0;
    for alpha in [2.0, 4.0, 6.0, 8.0] {
        let lift = lift_at(&mut analysis, alpha);
        assert!(lift > 0.0, "lift at alpha = {alpha}°: {lift}");
        assert!(
            lift > previous,
            "lift must grow with incidence: {lift} at {alpha}° after {previous}"
        );
        previous = lift;
    }
}

#[test]
fn test_near_and_far_field_forces_agree() {
    let mut analysis = solved_plate();
    let alpha = 5.0;
    let winddir = wind_direction(alpha, 0.0);
    let wind_n = wind_normal(alpha, 0.0);

    analysis.make_source_strengths(&winddir);
    analysis.make_unit_doublet_strengths(alpha, 0.0);

    let vinf = vec![winddir; analysis.n_panels()];
    let vlocal = analysis.combine_local_velocities(alpha, 0.0);
    analysis.compute_on_body_cp(&vinf, &vlocal);

    // far field: Kutta-Joukowski strip summation
    let mu = analysis.mu.clone();
    let sigma = analysis.sigma.clone();
    let cog = Vector3::zero();
    let (far_force, _) = analysis.forces(&mu, &sigma, alpha, 0.0, &cog, true, &vinf);
    let far_lift = far_force.dot(&wind_n);

    // near field: on-body pressure summation, per unit dynamic pressure
    let near = analysis.sum_panel_forces();
    let rho = analysis.config.density;
    let near_lift = near.dot(&wind_n) * 0.5 * rho;

    assert!(far_lift > 0.0 && near_lift > 0.0);
    let gap = (far_lift - near_lift).abs() / far_lift.abs().max(near_lift.abs());
    assert!(
        gap < 0.15,
        "near-field lift {near_lift} and far-field lift {far_lift} disagree by {:.1}%",
        gap * 100.0
    );
}

#[test]
fn test_span_distribution_symmetric() {
    let mut analysis = solved_plate();
    let alpha = 5.0;
    let winddir = wind_direction(alpha, 0.0);

    analysis.make_source_strengths(&winddir);
    analysis.make_unit_doublet_strengths(alpha, 0.0);

    let mu = analysis.mu.clone();
    let mut span = SpanDistribs::new(analysis.n_stations());
    let force = analysis.induced_force(&mu, 1.0, alpha, 0.0, &mut span);

    assert!(force.z > 0.0);
    assert_eq!(span.n_stations(), NY);

    // symmetric loading: the circulation distribution mirrors about the
    // root, and the tips are more lightly loaded than the center
    for m in 0..NY / 2 {
        let g_left = span.gamma[m];
        let g_right = span.gamma[NY - 1 - m];
        // the triangulation diagonals all run the same way, so the
        // mirror symmetry is only approximate
        let scale = g_left.abs().max(g_right.abs()).max(1e-12);
        assert!(
            (g_left - g_right).abs() / scale < 0.1,
            "asymmetric circulation: {g_left} vs {g_right}"
        );
    }
    let g_tip = span.gamma[0].abs();
    let g_mid = span.gamma[NY / 2].abs();
    assert!(g_mid > g_tip, "loading must peak at the root");
}

#[test]
fn test_trefftz_drag_positive() {
    let mut analysis = solved_plate();
    let alpha = 5.0;
    let winddir = wind_direction(alpha, 0.0);

    analysis.make_source_strengths(&winddir);
    analysis.make_unit_doublet_strengths(alpha, 0.0);

    let mu = analysis.mu.clone();
    let sigma = analysis.sigma.clone();
    let mut span = SpanDistribs::new(analysis.n_stations());
    let drag = analysis.trefftz_drag(&mu, &sigma, 1.0, alpha, 0.0, &mut span);

    // a lifting wing has positive induced drag along the wind axis
    let di = drag.dot(&winddir);
    assert!(di > 0.0, "induced drag must be positive, got {di}");

    // the induced angle is a downwash angle at every station
    for m in 0..span.n_stations() {
        assert!(span.ai[m].abs() < 45.0);
    }
}

#[test]
fn test_thread_count_invariance() {
    // the unit solutions must not depend on the block partitioning
    let (panels, wake_panels) = flat_plate_mesh(3, 6, CHORD, SPAN, WAKE_LENGTH, 9);
    let config = FlowConfig::default().with_reference(CHORD, CHORD * SPAN);

    let mut serial = PanelAnalysis::new(config.clone(), SolverSettings::single_threaded());
    serial
        .set_mesh(panels.clone(), wake_panels.clone())
        .expect("mesh");
    serial.initialize_analysis().expect("allocate");
    serial.solve_unit_system().expect("solve");

    let mut threaded = PanelAnalysis::new(config, SolverSettings::default());
    threaded.set_mesh(panels, wake_panels).expect("mesh");
    threaded.initialize_analysis().expect("allocate");
    threaded.solve_unit_system().expect("solve");

    for (a, b) in serial.w_rhs.iter().zip(threaded.w_rhs.iter()) {
        assert!(
            (a - b).abs() <= 1e-10 * a.abs().max(1.0),
            "unit solutions diverge across thread counts: {a} vs {b}"
        );
    }
}
