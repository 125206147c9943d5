//! The capability interface every compact model family implements.

use std::fmt::Debug;

use compact_core::{CheckState, LoadContext, MnaSystem, NodeId, SimOptions, StateStore};
use nalgebra::DVector;
use num_complex::Complex;

use crate::error::Result;
use crate::fet::{DistortionInput, OperatingPoint};
use crate::param::ParamValue;

/// A model card together with the instances that reference it.
///
/// Load is split into [`evaluate`](Self::evaluate), which only reads shared
/// data and may run in parallel, and [`commit`](Self::commit), which writes
/// the state store and the matrix.
pub trait CompactModel: Debug + Send + Sync {
    /// Device family, e.g. `"mosfet"`.
    fn family(&self) -> &'static str;

    /// Model card name.
    fn name(&self) -> &str;

    fn instance_count(&self) -> usize;

    fn instance_names(&self) -> Vec<&str>;

    /// Place a new instance on external nodes.
    fn add_instance(&mut self, name: &str, nodes: &[NodeId]) -> Result<()>;

    /// Default parameters, allocate prime nodes and state slots, and acquire
    /// matrix handles. Safe to call again after topology-preserving changes.
    fn setup(
        &mut self,
        mna: &mut MnaSystem,
        states: &mut StateStore,
        options: &SimOptions,
    ) -> Result<()>;

    /// Forget prime nodes, state slots, handles and cached operating points.
    fn unsetup(&mut self);

    /// Recompute temperature-dependent values.
    fn temperature(&mut self, options: &SimOptions) -> Result<()>;

    /// Evaluate every instance at the present solution.
    fn evaluate(
        &self,
        ctx: &LoadContext<'_>,
        solution: &DVector<f64>,
        states: &StateStore,
    ) -> Result<Vec<OperatingPoint>>;

    /// Store and stamp operating points produced by [`evaluate`](Self::evaluate).
    fn commit(
        &mut self,
        ctx: &LoadContext<'_>,
        ops: Vec<OperatingPoint>,
        states: &mut StateStore,
        mna: &mut MnaSystem,
    ) -> Result<()>;

    /// Newton load: evaluate then commit.
    fn load(
        &mut self,
        ctx: &LoadContext<'_>,
        solution: &DVector<f64>,
        states: &mut StateStore,
        mna: &mut MnaSystem,
    ) -> Result<()> {
        let ops = self.evaluate(ctx, solution, states)?;
        self.commit(ctx, ops, states, mna)
    }

    /// Small-signal stamp at angular frequency `omega`.
    fn ac_load(&self, omega: f64, mna: &mut MnaSystem) -> Result<()>;

    /// Pole-zero stamp at complex frequency `s`.
    fn pz_load(&self, s: Complex<f64>, mna: &mut MnaSystem) -> Result<()>;

    /// Compute distortion kernels at the present operating point.
    fn disto_setup(&mut self, options: &SimOptions) -> Result<()>;

    /// Add distortion sources to the right-hand side.
    fn disto_load(&self, input: &DistortionInput<'_>, mna: &mut MnaSystem) -> Result<()>;

    /// Largest timestep the charges of this model allow.
    fn truncation_timestep(&self, ctx: &LoadContext<'_>, states: &StateStore) -> f64;

    /// Check the solution against the last linearization. Failures are
    /// recorded on the context's monitor.
    fn convergence_test(&self, ctx: &LoadContext<'_>, solution: &DVector<f64>) -> CheckState;

    /// Resolve initial conditions not given by the user from `solution`.
    fn set_initial_conditions(&mut self, solution: &DVector<f64>);

    fn model_param(&self, key: u32) -> Result<ParamValue>;

    fn set_model_param(&mut self, key: u32, value: ParamValue) -> Result<()>;

    fn instance_param(&self, instance: &str, key: u32) -> Result<ParamValue>;

    fn set_instance_param(&mut self, instance: &str, key: u32, value: ParamValue) -> Result<()>;

    /// Snapshot every instance.
    fn save(&mut self);

    /// Roll every instance back to its snapshot.
    fn restore(&mut self) -> Result<()>;

    fn clear_backups(&mut self);
}
