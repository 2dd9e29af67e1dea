//! Trim search and stability derivatives on simple wings
//!
//! A reflexed plate with the reference point ahead of the aerodynamic
//! center trims at positive lift; a plain flat plate can only trim at
//! zero lift and must report the failure instead of a bogus speed.

use aero_bem::testing::{flat_plate_mesh, reflexed_plate_mesh};
use aero_bem::{FlowConfig, PanelAnalysis, SolverSettings, TrimFailure, Vector3};

fn solved(panels: Vec<aero_bem::Panel>, wake: Vec<aero_bem::Panel>) -> PanelAnalysis {
    let config = FlowConfig::default().with_reference(1.0, 6.0);
    let mut analysis = PanelAnalysis::new(config, SolverSettings::default());
    analysis.set_mesh(panels, wake).expect("mesh");
    analysis.initialize_analysis().expect("allocate");
    analysis.solve_unit_system().expect("unit solve");
    analysis.make_local_velocities();
    analysis
}

#[test]
fn test_reflexed_wing_trims_at_positive_lift() {
    let (panels, wake) = reflexed_plate_mesh(4, 8, 1.0, 6.0, 60.0, 15, 6.0);
    let mut analysis = solved(panels, wake);

    let cog = Vector3::zero();
    let trim = analysis
        .trimmed_conditions(100.0, &cog, true)
        .expect("a reflexed wing with a forward reference point must trim");

    assert!(trim.alpha_eq.abs() < 20.0, "alpha_eq = {}", trim.alpha_eq);
    assert!(
        trim.u0.is_finite() && trim.u0 > 0.0,
        "trim speed = {}",
        trim.u0
    );
}

#[test]
fn test_flat_plate_cannot_trim() {
    // a symmetric uncambered plate has zero moment only at zero lift
    let (panels, wake) = flat_plate_mesh(4, 8, 1.0, 6.0, 60.0, 15);
    let mut analysis = solved(panels, wake);

    let cog = Vector3::zero();
    match analysis.trimmed_conditions(100.0, &cog, true) {
        // either outcome is a correct report of the degenerate physics:
        // the zero-moment angle carries no lift
        Err(TrimFailure::NegativeLift) => {}
        Ok(trim) => {
            // if the lift threshold was passed on round-off, the angle
            // must still be essentially zero
            assert!(
                trim.alpha_eq.abs() < 0.1,
                "flat plate trimmed away from zero: {}",
                trim.alpha_eq
            );
        }
        Err(other) => panic!("unexpected trim failure: {other:?}"),
    }
}

#[test]
fn test_stability_derivatives_finite_and_restoring() {
    let (panels, wake) = reflexed_plate_mesh(4, 8, 1.0, 6.0, 60.0, 15, 6.0);
    let mut analysis = solved(panels, wake);

    let cog = Vector3::zero();
    let trim = analysis
        .trimmed_conditions(100.0, &cog, true)
        .expect("trim point");

    let (sd, force0, moment0) =
        analysis.compute_stability_derivatives(trim.alpha_eq, trim.u0, &cog, true);

    for v in [
        sd.xu, sd.zu, sd.mu, sd.yv, sd.lv, sd.nv, sd.xw, sd.zw, sd.mw, sd.yp, sd.lp, sd.np,
        sd.xq, sd.zq, sd.mq, sd.yr, sd.lr, sd.nr,
    ] {
        assert!(v.is_finite());
    }
    assert!(force0.norm().is_finite());
    assert!(moment0.norm().is_finite());

    // heave damping: a downward velocity increment raises the lift,
    // which opposes the motion
    assert!(sd.zw < 0.0, "Zw = {}", sd.zw);
}
