//! Analysis configuration
//!
//! `FlowConfig` is the flow and modeling specification handed to the
//! solver by the surrounding application: fluid properties, boundary
//! condition, wake model, density model, ground/free-surface modeling and
//! the reference quantities needed by the load extraction.
//! `SolverSettings` carries the numerical and threading knobs that used to
//! be process-wide statics.

use serde::{Deserialize, Serialize};

use crate::vector::Vector3;

/// Singularity-density discretization over a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DensityModel {
    /// One uniform doublet density per panel
    #[default]
    Uniform,
    /// Linearly varying density resolved at the three vertices
    Linear,
}

impl DensityModel {
    /// Number of unknowns each panel contributes to the system.
    pub fn per_panel_count(&self) -> usize {
        match self {
            DensityModel::Uniform => 1,
            DensityModel::Linear => 3,
        }
    }
}

/// Boundary condition enforced at the panel collocation points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoundaryKind {
    /// Zero interior perturbation potential (thick surfaces)
    #[default]
    Dirichlet,
    /// Zero normal velocity; always used on thin mid-surface panels
    Neumann,
}

/// Trailing-wake model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WakeModel {
    /// Classic flat wake of chained panels out to the wake length
    #[default]
    Classic,
    /// Buffer wake augmented by a free vortex-particle field
    Vorton,
}

/// Planar image modeling below the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImagePlane {
    /// No image panels
    #[default]
    None,
    /// Rigid ground at the configured height
    Ground,
    /// Free surface at the configured height
    FreeSurface,
}

/// Flow and modeling specification for one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Fluid density (kg/m³)
    pub density: f64,
    /// Boundary condition on thick panels
    pub boundary: BoundaryKind,
    /// Density discretization
    pub density_model: DensityModel,
    /// Wake model
    pub wake_model: WakeModel,
    /// Image-plane modeling
    pub image_plane: ImagePlane,
    /// Height of the ground / free-surface plane below the origin (m)
    pub ground_height: f64,
    /// Distance downstream at which the Trefftz evaluation samples the wake,
    /// as a multiple of the reference chord
    pub trefftz_distance: f64,
    /// Total wake length (m)
    pub wake_length: f64,
    /// Vortex-filament core radius (m)
    pub core_radius: f64,
    /// Vorton core size, as a fraction of the reference chord
    pub vorton_core_size: f64,
    /// Reference chord length (m)
    pub reference_chord: f64,
    /// Reference area (m²)
    pub reference_area: f64,
    /// Scalar viscous-drag increment added along the wind axis (N per unit q)
    pub viscous_drag: f64,
    /// Moment reference point (center of gravity)
    pub cog: Vector3,
    /// Include fuselage panels in the moment integration
    pub fuselage_moments: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            density: 1.225,
            boundary: BoundaryKind::Dirichlet,
            density_model: DensityModel::Uniform,
            wake_model: WakeModel::Classic,
            image_plane: ImagePlane::None,
            ground_height: 0.0,
            trefftz_distance: 100.0,
            wake_length: 100.0,
            core_radius: 1.0e-4,
            vorton_core_size: 0.1,
            reference_chord: 1.0,
            reference_area: 1.0,
            viscous_drag: 0.0,
            cog: Vector3::zero(),
            fuselage_moments: false,
        }
    }
}

impl FlowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn with_boundary(mut self, boundary: BoundaryKind) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_density_model(mut self, model: DensityModel) -> Self {
        self.density_model = model;
        self
    }

    pub fn with_wake_model(mut self, model: WakeModel) -> Self {
        self.wake_model = model;
        self
    }

    pub fn with_image_plane(mut self, plane: ImagePlane, height: f64) -> Self {
        self.image_plane = plane;
        self.ground_height = height;
        self
    }

    pub fn with_cog(mut self, cog: Vector3) -> Self {
        self.cog = cog;
        self
    }

    pub fn with_reference(mut self, chord: f64, area: f64) -> Self {
        self.reference_chord = chord;
        self.reference_area = area;
        self
    }

    /// True when an image plane augments every influence.
    pub fn has_image_plane(&self) -> bool {
        self.image_plane != ImagePlane::None
    }

    /// Image sign: +1 for ground effect, −1 for a free surface.
    pub fn image_coefficient(&self) -> f64 {
        match self.image_plane {
            ImagePlane::FreeSurface => -1.0,
            _ => 1.0,
        }
    }

    /// Vorton regularization core length (m).
    pub fn vorton_core_length(&self) -> f64 {
        self.vorton_core_size * self.reference_chord
    }
}

/// Numerical and threading settings, passed into the solver constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Number of partition blocks for parallel assembly and evaluation
    pub n_blocks: usize,
    /// Run parallel sections multi-threaded
    pub multithread: bool,
    /// Thread count handed to the linear-algebra layer (0 = all cores)
    pub n_threads: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        let hw = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            n_blocks: hw,
            multithread: true,
            n_threads: 0,
        }
    }
}

impl SolverSettings {
    /// Single-threaded settings, for reproducibility checks.
    pub fn single_threaded() -> Self {
        Self {
            n_blocks: 1,
            multithread: false,
            n_threads: 1,
        }
    }
}

/// Freestream direction for angle of attack `alpha` and sideslip `beta`,
/// both in degrees. The sideslip sign convention follows AVL.
pub fn wind_direction(alpha: f64, beta: f64) -> Vector3 {
    let a = alpha.to_radians();
    let b = (-beta).to_radians();
    Vector3::new(a.cos() * b.cos(), b.sin(), a.sin() * b.cos())
}

/// Unit vector normal to the freestream in the x-z plane.
pub fn wind_normal(alpha: f64, _beta: f64) -> Vector3 {
    let a = alpha.to_radians();
    Vector3::new(-a.sin(), 0.0, a.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wind_axes_orthogonal() {
        for alpha in [-5.0, 0.0, 3.0, 12.0] {
            let d = wind_direction(alpha, 0.0);
            let n = wind_normal(alpha, 0.0);
            assert_relative_eq!(d.dot(&n), 0.0, epsilon = 1e-14);
            assert_relative_eq!(d.norm(), 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_density_model_counts() {
        assert_eq!(DensityModel::Uniform.per_panel_count(), 1);
        assert_eq!(DensityModel::Linear.per_panel_count(), 3);
    }
}
