//! Analysis lifecycle and solve pipeline
//!
//! `PanelAnalysis` owns the working arrays of one analysis: the panel
//! working copies, the influence matrix, the unit right-hand-side
//! columns and the singularity strengths. All large arrays are allocated
//! once per analysis by [`PanelAnalysis::initialize_analysis`] and
//! released by [`PanelAnalysis::release_panel_arrays`]; nothing survives
//! across independent analyses.
//!
//! The solve pipeline is: influence matrix → wake contribution → unit
//! right-hand sides → LU factorization → back substitution of the six
//! unit columns. Operating points are then combinations of the unit
//! solutions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::{Array1, Array2};
use thiserror::Error;

use aero_solvers::lu::{Factorized, LuError};

use crate::assembly;
use crate::config::{DensityModel, FlowConfig, SolverSettings};
use crate::field::FieldContext;
use crate::panel::Panel;
use crate::vector::Vector3;
use crate::vortex::Vorton;
use crate::wake;

/// Progress state of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Running,
    Finished,
    Cancelled,
    Error,
}

/// Errors of the analysis pipeline
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("no mesh has been set")]
    NoMesh,
    #[error("the analysis arrays have not been allocated")]
    NotInitialized,
    #[error("error building the influence matrix")]
    MatrixAssembly,
    #[error("linear solve failed: {0}")]
    Solve(#[from] LuError),
    #[error("operation cancelled")]
    Cancelled,
    #[error("wake chain of trailing panel {0} does not terminate")]
    WakeTopology(usize),
}

/// Receives sampling-point/velocity pairs from the load-extraction
/// routines, e.g. the Trefftz downwash probes. Injected per analysis
/// instead of accumulating into process-wide buffers.
pub trait ProbeSink: Send + Sync {
    fn probe(&self, point: Vector3, velocity: Vector3);
}

/// Doublet-density array tagged with its per-panel multiplicity.
///
/// The uniform model stores one value per panel, the linear model three;
/// indexing goes through [`DensityField::value`] so callers never carry
/// the stride themselves.
#[derive(Debug, Clone)]
pub struct DensityField {
    values: Vec<f64>,
    model: DensityModel,
}

impl DensityField {
    pub fn new(model: DensityModel, n_panels: usize) -> Self {
        Self {
            values: vec![0.0; n_panels * model.per_panel_count()],
            model,
        }
    }

    /// Wraps an existing solution vector of the matching rank.
    pub fn from_values(model: DensityModel, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len() % model.per_panel_count(), 0);
        Self { values, model }
    }

    pub fn model(&self) -> DensityModel {
        self.model
    }

    /// Doublet density at vertex `vertex` of panel `panel`.
    pub fn value(&self, panel: usize, vertex: usize) -> f64 {
        match self.model {
            DensityModel::Uniform => self.values[panel],
            DensityModel::Linear => self.values[3 * panel + vertex],
        }
    }

    /// Sets the density at a vertex; the uniform model stores one value
    /// per panel regardless of the vertex index.
    pub fn set(&mut self, panel: usize, vertex: usize, value: f64) {
        match self.model {
            DensityModel::Uniform => self.values[panel] = value,
            DensityModel::Linear => self.values[3 * panel + vertex] = value,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn scale(&mut self, ratio: f64) {
        for v in &mut self.values {
            *v *= ratio;
        }
    }
}

/// One panel-method analysis: configuration, working arrays and the
/// solve pipeline.
pub struct PanelAnalysis {
    pub config: FlowConfig,
    pub settings: SolverSettings,

    pub(crate) panels: Vec<Panel>,
    pub(crate) wake_panels: Vec<Panel>,
    ref_panels: Vec<Panel>,
    ref_wake_panels: Vec<Panel>,

    aij: Array2<f64>,
    factorization: Option<Factorized>,

    pub u_rhs: Vec<f64>,
    pub v_rhs: Vec<f64>,
    pub w_rhs: Vec<f64>,
    pub p_rhs: Vec<f64>,
    pub q_rhs: Vec<f64>,
    pub r_rhs: Vec<f64>,
    pub c_rhs: Vec<f64>,

    pub mu: DensityField,
    pub sigma: Vec<f64>,
    /// Pressure coefficients at the three vertices of each panel
    pub cp: Vec<f64>,
    /// Unit local-velocity caches, one entry per panel vertex
    pub u_local: Vec<Vector3>,
    pub v_local: Vec<Vector3>,
    pub w_local: Vec<Vector3>,

    pub(crate) vortons: Vec<Vec<Vorton>>,

    cancel: Arc<AtomicBool>,
    matrix_error: AtomicBool,
    pub(crate) probe_sink: Option<Arc<dyn ProbeSink>>,
    pub status: AnalysisStatus,
    pub warning: bool,
}

impl PanelAnalysis {
    pub fn new(config: FlowConfig, settings: SolverSettings) -> Self {
        let model = config.density_model;
        Self {
            config,
            settings,
            panels: Vec::new(),
            wake_panels: Vec::new(),
            ref_panels: Vec::new(),
            ref_wake_panels: Vec::new(),
            aij: Array2::zeros((0, 0)),
            factorization: None,
            u_rhs: Vec::new(),
            v_rhs: Vec::new(),
            w_rhs: Vec::new(),
            p_rhs: Vec::new(),
            q_rhs: Vec::new(),
            r_rhs: Vec::new(),
            c_rhs: Vec::new(),
            mu: DensityField::new(model, 0),
            sigma: Vec::new(),
            cp: Vec::new(),
            u_local: Vec::new(),
            v_local: Vec::new(),
            w_local: Vec::new(),
            vortons: Vec::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            matrix_error: AtomicBool::new(false),
            probe_sink: None,
            status: AnalysisStatus::Pending,
            warning: false,
        }
    }

    /// Installs an optional sink for the sampling probes emitted by the
    /// load extraction.
    pub fn set_probe_sink(&mut self, sink: Arc<dyn ProbeSink>) {
        self.probe_sink = Some(sink);
    }

    /// Takes the working copies of the mesh panels and wake panels; the
    /// reference copies are kept for [`PanelAnalysis::restore_panels`].
    pub fn set_mesh(
        &mut self,
        panels: Vec<Panel>,
        wake_panels: Vec<Panel>,
    ) -> Result<(), AnalysisError> {
        if let Err(i3) = wake::check_chains(&panels, &wake_panels) {
            debug_assert!(false, "wake chain of trailing panel {i3} does not terminate");
            return Err(AnalysisError::WakeTopology(i3));
        }
        self.ref_panels = panels.clone();
        self.ref_wake_panels = wake_panels.clone();
        self.panels = panels;
        self.wake_panels = wake_panels;
        Ok(())
    }

    pub fn n_panels(&self) -> usize {
        self.panels.len()
    }

    pub fn n_wake_panels(&self) -> usize {
        self.wake_panels.len()
    }

    /// Rank of the linear system.
    pub fn mat_size(&self) -> usize {
        self.panels.len() * self.config.density_model.per_panel_count()
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn wake_panels(&self) -> &[Panel] {
        &self.wake_panels
    }

    /// Shared cancellation token; setting it stops the hot loops at their
    /// next poll.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Read-only evaluation view of the current state.
    pub fn field_context(&self) -> FieldContext<'_> {
        FieldContext {
            panels: &self.panels,
            wake_panels: &self.wake_panels,
            vortons: &self.vortons,
            config: &self.config,
            cancel: &self.cancel,
        }
    }

    /// Allocates the influence matrix and the result arrays.
    pub fn initialize_analysis(&mut self) -> Result<(), AnalysisError> {
        if self.panels.is_empty() {
            return Err(AnalysisError::NoMesh);
        }
        let n = self.n_panels();
        let rank = self.mat_size();

        self.aij = Array2::zeros((rank, rank));
        self.u_rhs = vec![0.0; rank];
        self.v_rhs = vec![0.0; rank];
        self.w_rhs = vec![0.0; rank];
        self.p_rhs = vec![0.0; rank];
        self.q_rhs = vec![0.0; rank];
        self.r_rhs = vec![0.0; rank];
        self.c_rhs = vec![0.0; rank];

        self.mu = DensityField::new(self.config.density_model, n);
        self.sigma = vec![0.0; n];
        self.cp = vec![0.0; 3 * n];
        self.u_local = vec![Vector3::zero(); 3 * n];
        self.v_local = vec![Vector3::zero(); 3 * n];
        self.w_local = vec![Vector3::zero(); 3 * n];

        let mem = (rank * rank + 7 * rank) * std::mem::size_of::<f64>();
        log::info!(
            "allocated {:.2} MB for a {rank}x{rank} system and 7 RHS vectors",
            mem as f64 / 1024.0 / 1024.0
        );

        self.matrix_error.store(false, Ordering::Relaxed);
        self.warning = false;
        self.status = AnalysisStatus::Running;
        Ok(())
    }

    /// Releases every array once the results have been stored.
    pub fn release_panel_arrays(&mut self) {
        self.aij = Array2::zeros((0, 0));
        self.factorization = None;
        self.u_rhs.clear();
        self.v_rhs.clear();
        self.w_rhs.clear();
        self.p_rhs.clear();
        self.q_rhs.clear();
        self.r_rhs.clear();
        self.c_rhs.clear();
        self.mu = DensityField::new(self.config.density_model, 0);
        self.sigma.clear();
        self.cp.clear();
        self.u_local.clear();
        self.v_local.clear();
        self.w_local.clear();
        self.panels.clear();
        self.wake_panels.clear();
        self.vortons.clear();
    }

    /// Builds the influence matrix, block-parallel.
    pub fn make_influence_matrix(&mut self) -> Result<(), AnalysisError> {
        if self.aij.nrows() != self.mat_size() {
            return Err(AnalysisError::NotInitialized);
        }
        let mut aij = std::mem::replace(&mut self.aij, Array2::zeros((0, 0)));
        let ok = assembly::make_influence_matrix(
            &self.field_context(),
            &self.matrix_error,
            self.settings.n_blocks,
            self.settings.multithread,
            &mut aij,
        );
        self.aij = aij;
        if self.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        if !ok {
            self.status = AnalysisStatus::Error;
            return Err(AnalysisError::MatrixAssembly);
        }
        Ok(())
    }

    /// Adds the wake columns' doublet contribution to the matrix.
    pub fn add_wake_contribution(&mut self) -> Result<(), AnalysisError> {
        let mut aij = std::mem::replace(&mut self.aij, Array2::zeros((0, 0)));
        let ok = assembly::add_wake_contribution(
            &self.field_context(),
            &self.matrix_error,
            self.settings.n_blocks,
            self.settings.multithread,
            &mut aij,
        );
        self.aij = aij;
        if self.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        if !ok {
            self.status = AnalysisStatus::Error;
            return Err(AnalysisError::MatrixAssembly);
        }
        Ok(())
    }

    /// Builds the six unit right-hand-side columns.
    pub fn make_unit_rhs(&mut self) {
        let rhs = assembly::make_unit_rhs(
            &self.field_context(),
            self.settings.n_blocks,
            self.settings.multithread,
        );
        self.u_rhs = rhs.u;
        self.v_rhs = rhs.v;
        self.w_rhs = rhs.w;
        self.p_rhs = rhs.p;
        self.q_rhs = rhs.q;
        self.r_rhs = rhs.r;
    }

    /// LU-factorizes the influence matrix.
    pub fn lu_factorize(&mut self) -> Result<(), AnalysisError> {
        match Factorized::factorize(&self.aij) {
            Ok(f) => {
                self.factorization = Some(f);
                Ok(())
            }
            Err(e) => {
                log::error!("singular influence matrix, aborting the calculation");
                self.status = AnalysisStatus::Error;
                Err(AnalysisError::Solve(e))
            }
        }
    }

    /// Back-substitutes the six unit columns against the factorization,
    /// turning them into the unit solution vectors.
    pub fn back_substitute_unit_rhs(&mut self) -> Result<(), AnalysisError> {
        let f = self.factorization.as_ref().ok_or(AnalysisError::NotInitialized)?;
        for rhs in [
            &mut self.u_rhs,
            &mut self.v_rhs,
            &mut self.w_rhs,
            &mut self.p_rhs,
            &mut self.q_rhs,
            &mut self.r_rhs,
        ] {
            let mut col = Array1::from_vec(std::mem::take(rhs));
            f.solve_in_place(&mut col)?;
            *rhs = col.to_vec();
        }
        Ok(())
    }

    /// Back-substitutes an arbitrary right-hand side in place.
    pub fn back_substitute(&self, rhs: &mut Vec<f64>) -> Result<(), AnalysisError> {
        let f = self.factorization.as_ref().ok_or(AnalysisError::NotInitialized)?;
        let mut col = Array1::from_vec(std::mem::take(rhs));
        f.solve_in_place(&mut col)?;
        *rhs = col.to_vec();
        Ok(())
    }

    /// Runs the unit solve pipeline: matrix, wake, right-hand sides,
    /// factorization, back substitution.
    pub fn solve_unit_system(&mut self) -> Result<(), AnalysisError> {
        log::info!(
            "solving the panel system: {} panels, rank {}",
            self.n_panels(),
            self.mat_size()
        );
        self.make_influence_matrix()?;
        self.add_wake_contribution()?;
        self.make_unit_rhs();
        if self.is_cancelled() {
            self.status = AnalysisStatus::Cancelled;
            return Err(AnalysisError::Cancelled);
        }
        self.lu_factorize()?;
        self.back_substitute_unit_rhs()?;
        Ok(())
    }

    /// Combines the unit solution columns for a freestream `vinf` and a
    /// rotation rate `omega` of the configuration about the reference
    /// point; the onset flow each panel sees turns the opposite way.
    pub fn combine_unit_rhs(&self, vinf: &Vector3, omega: &Vector3) -> Vec<f64> {
        let rank = self.mat_size();
        let mut rhs = vec![0.0; rank];
        for i in 0..rank {
            rhs[i] = vinf.x * self.u_rhs[i] + vinf.y * self.v_rhs[i] + vinf.z * self.w_rhs[i]
                + omega.x * self.p_rhs[i]
                + omega.y * self.q_rhs[i]
                + omega.z * self.r_rhs[i];
        }
        rhs
    }

    /// Unit source strengths for a uniform onset flow.
    pub fn make_source_strengths(&mut self, vinf: &Vector3) {
        for (i3, p3) in self.panels.iter().enumerate() {
            self.sigma[i3] = if p3.is_thick() {
                assembly::source_strength(&p3.normal, vinf)
            } else {
                0.0
            };
        }
    }

    /// Unit source strengths for a non-uniform onset field.
    pub fn make_source_strengths_field(&mut self, vfield: &[Vector3]) {
        for (i3, p3) in self.panels.iter().enumerate() {
            self.sigma[i3] = if p3.is_thick() {
                assembly::source_strength(&p3.normal, &vfield[i3])
            } else {
                0.0
            };
        }
    }

    /// Reconstructs the doublet strengths for the angles `alpha`, `beta`
    /// from the unit solution vectors.
    pub fn make_unit_doublet_strengths(&mut self, alpha: f64, beta: f64) {
        let cosa = alpha.to_radians().cos();
        let sina = alpha.to_radians().sin();
        let cosb = (-beta).to_radians().cos();
        let sinb = (-beta).to_radians().sin();

        let mult = self.config.density_model.per_panel_count();
        for i3 in 0..self.n_panels() {
            for k in 0..mult {
                let row = mult * i3 + k;
                let value = cosa * cosb * self.u_rhs[row] + sinb * self.v_rhs[row]
                    + sina * cosb * self.w_rhs[row];
                self.mu.set(i3, k, value);
            }
        }
    }

    /// Stores the working panel state as the new reference.
    pub fn save_panels(&mut self) {
        self.ref_panels = self.panels.clone();
        self.ref_wake_panels = self.wake_panels.clone();
    }

    /// Restores the working panels from the reference copies.
    pub fn restore_panels(&mut self) {
        self.panels = self.ref_panels.clone();
        self.wake_panels = self.ref_wake_panels.clone();
    }

    /// Scales the unit-strength results to a dimensional speed.
    pub fn scale_results_to_speed(&mut self, ratio: f64) {
        self.mu.scale(ratio);
        for s in &mut self.sigma {
            *s *= ratio;
        }
    }

    /// Installs a pre-computed vorton wake.
    pub fn set_vortons(&mut self, vortons: Vec<Vec<Vorton>>) {
        self.vortons = vortons;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_density_field_uniform_stride() {
        let mut f = DensityField::new(DensityModel::Uniform, 4);
        f.set(2, 0, 1.5);
        assert_eq!(f.value(2, 0), 1.5);
        assert_eq!(f.value(2, 1), 1.5);
        assert_eq!(f.value(2, 2), 1.5);
        assert_eq!(f.values().len(), 4);
    }

    #[test]
    fn test_density_field_linear_stride() {
        let mut f = DensityField::new(DensityModel::Linear, 4);
        f.set(1, 2, -0.5);
        assert_eq!(f.value(1, 2), -0.5);
        assert_eq!(f.value(1, 0), 0.0);
        assert_eq!(f.values().len(), 12);
    }

    #[test]
    fn test_lifecycle_allocation() {
        let mut pa = PanelAnalysis::new(FlowConfig::default(), SolverSettings::single_threaded());
        assert!(matches!(
            pa.initialize_analysis(),
            Err(AnalysisError::NoMesh)
        ));

        let panels = vec![Panel::new(
            0,
            [
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
        )];
        pa.set_mesh(panels, Vec::new()).expect("mesh");
        pa.initialize_analysis().expect("allocate");
        assert_eq!(pa.mat_size(), 1);
        assert_eq!(pa.u_rhs.len(), 1);
        assert_eq!(pa.cp.len(), 3);

        pa.release_panel_arrays();
        assert_eq!(pa.u_rhs.len(), 0);
        assert_eq!(pa.n_panels(), 0);
    }
}
