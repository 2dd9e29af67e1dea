//! 3D potential-flow panel-method solver
//!
//! Given a triangulated, paneled surface mesh and a freestream/rotation
//! specification, this crate builds the boundary-element system (source
//! and doublet singularities with a trailing-wake model), solves for the
//! panel singularity strengths, and derives surface pressure, forces,
//! moments, induced drag and trim angles.
//!
//! The mesh comes from an external tessellation layer as immutable
//! arrays of [`panel::Panel`]s and wake chains; [`config::FlowConfig`]
//! selects the boundary condition, density model, wake model and image
//! plane. The pipeline:
//!
//! ```ignore
//! use aero_bem::{FlowConfig, PanelAnalysis, SolverSettings};
//!
//! let mut analysis = PanelAnalysis::new(FlowConfig::default(), SolverSettings::default());
//! analysis.set_mesh(panels, wake_panels)?;
//! analysis.initialize_analysis()?;
//! analysis.solve_unit_system()?;
//! analysis.make_local_velocities();
//!
//! // one operating point
//! analysis.make_source_strengths(&wind_direction(alpha, 0.0));
//! analysis.make_unit_doublet_strengths(alpha, 0.0);
//! ```
//!
//! Every fallible operation reports failure through `Result`s or
//! explicit outcome enums; a failed operating point never aborts the
//! process.

pub mod analysis;
pub mod assembly;
pub mod config;
pub mod field;
pub mod loads;
pub mod panel;
pub mod quadrature;
pub mod stability;
pub mod testing;
pub mod trim;
pub mod vector;
pub mod vortex;
pub mod wake;

pub use analysis::{AnalysisError, AnalysisStatus, DensityField, PanelAnalysis, ProbeSink};
pub use config::{
    wind_direction, wind_normal, BoundaryKind, DensityModel, FlowConfig, ImagePlane,
    SolverSettings, WakeModel,
};
pub use field::FieldContext;
pub use loads::SpanDistribs;
pub use panel::{Panel, SurfacePosition, WakeSide};
pub use stability::StabDerivatives;
pub use trim::{zero_moment_angle, TrimFailure, TrimPoint};
pub use vector::Vector3;
pub use vortex::Vorton;
