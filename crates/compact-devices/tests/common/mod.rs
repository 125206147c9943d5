//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use compact_core::{
    Analysis, BypassOptions, ConvergenceMonitor, InitMode, Integrator, LoadContext, MnaSystem,
    NodeId, SimOptions, StateStore,
};
use compact_devices::CompactModel;
use nalgebra::{DMatrix, DVector};

pub fn nodes(ids: &[u32]) -> Vec<NodeId> {
    ids.iter().copied().map(NodeId::new).collect()
}

pub fn solution(values: &[f64]) -> DVector<f64> {
    DVector::from_row_slice(values)
}

/// Everything a load context borrows.
pub struct Env {
    pub options: SimOptions,
    pub integrator: Integrator,
    pub monitor: ConvergenceMonitor,
}

impl Env {
    pub fn new() -> Self {
        Self::with_options(SimOptions::default())
    }

    pub fn with_options(options: SimOptions) -> Self {
        Self {
            options,
            integrator: Integrator::default(),
            monitor: ConvergenceMonitor::new(),
        }
    }

    /// Default options with load bypass switched off.
    pub fn without_bypass() -> Self {
        Self::with_options(SimOptions {
            bypass: BypassOptions::disabled(),
            ..SimOptions::default()
        })
    }

    pub fn dc(&self, init: InitMode) -> LoadContext<'_> {
        LoadContext::new(&self.options, &self.integrator, &self.monitor)
            .with_analysis(Analysis::Dc)
            .with_init(init)
    }

    pub fn transient(&self, init: InitMode) -> LoadContext<'_> {
        LoadContext::new(&self.options, &self.integrator, &self.monitor)
            .with_analysis(Analysis::Transient)
            .with_init(init)
    }
}

/// Matrix and state store for one small circuit.
pub struct Circuit {
    pub mna: MnaSystem,
    pub states: StateStore,
}

impl Circuit {
    pub fn new(num_nodes: usize) -> Self {
        Self {
            mna: MnaSystem::new(num_nodes),
            states: StateStore::default(),
        }
    }

    /// Setup followed by the temperature pass.
    pub fn setup(&mut self, model: &mut dyn CompactModel, env: &Env) {
        model
            .setup(&mut self.mna, &mut self.states, &env.options)
            .unwrap();
        model.temperature(&env.options).unwrap();
    }

    /// Clear the matrix and load once.
    pub fn load(
        &mut self,
        model: &mut dyn CompactModel,
        ctx: &LoadContext<'_>,
        solution: &DVector<f64>,
    ) {
        self.mna.clear();
        model
            .load(ctx, solution, &mut self.states, &mut self.mna)
            .unwrap();
    }

    /// Take the node voltages of `solution` as initial conditions and load
    /// them verbatim.
    pub fn load_at(&mut self, model: &mut dyn CompactModel, env: &Env, solution: &DVector<f64>) {
        model.set_initial_conditions(solution);
        self.load(model, &env.dc(InitMode::Junction), solution);
    }

    pub fn dense(&self) -> DMatrix<f64> {
        self.mna.to_dense()
    }

    pub fn rhs(&self) -> DVector<f64> {
        self.mna.rhs_vector()
    }
}

pub fn assert_close(actual: f64, expected: f64, rel: f64) {
    let tol = rel * expected.abs().max(actual.abs()) + 1e-300;
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected:e}, got {actual:e}"
    );
}
