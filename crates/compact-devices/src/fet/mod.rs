//! Generic driver for field-effect transistor families.
//!
//! A family supplies its physics through [`FetEquations`]: parameter
//! handling, temperature update, limiting and one `evaluate` function
//! written in the forward orientation and generic over [`Real`]. The driver
//! does everything else the same way for every family:
//!
//! - Setup: defaults, prime nodes, state slots and matrix handles
//! - Load: bias selection, bypass, limiting, mode resolution, charge
//!   integration, convergence checking, state update and stamping
//! - AC, pole-zero and distortion restamping from the cached linearization
//! - Truncation error, initial conditions and backup/restore
//!
//! Equations see *effective* terminals; the [`Frame`] resolved at load time
//! maps them to the physical terminals that get stamped.

mod distortion;
mod frame;
mod instance;
mod load;
mod model;
mod small_signal;

pub use distortion::{DistortionCase, DistortionInput, DistortionKernels, KernelBranch};
pub use frame::{Bias, Frame, Mode, Terminal};
pub use instance::{FetInstance, InstanceState, LinearBranch, LinearCharge, OperatingPoint};
pub use model::FetModel;

use std::fmt::Debug;

use compact_core::SimOptions;

use crate::error::Result;
use crate::param::{Given, ParamValue};
use crate::taylor::Real;

/// State slots holding the normalized (vgs, vds, vbs) of the last load.
pub(crate) const BIAS_SLOTS: usize = 3;

/// A current or charge between two effective terminals.
///
/// Currents flow from `from` to `to` through the device. A charge is stored
/// on `from` and returned through `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Branch<T> {
    pub from: Terminal,
    pub to: Terminal,
    pub value: T,
}

impl<T> Branch<T> {
    pub fn new(from: Terminal, to: Terminal, value: T) -> Self {
        Self { from, to, value }
    }
}

/// Result of evaluating a family's equations at one bias point.
#[derive(Debug, Clone)]
pub struct Evaluation<T> {
    pub currents: Vec<Branch<T>>,
    /// One charge per entry of [`FetEquations::CHARGE_PAIRS`], in any order.
    pub charges: Vec<Branch<T>>,
    /// Effective threshold voltage, used to limit the next iteration.
    pub threshold: f64,
    /// Effective saturation voltage.
    pub saturation: f64,
}

/// User-supplied initial conditions, as raw terminal voltage differences.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InitialConditions {
    pub vds: Given<f64>,
    pub vgs: Given<f64>,
    pub vbs: Given<f64>,
}

impl InitialConditions {
    /// Whether every initial voltage is zero.
    pub fn is_zero(&self) -> bool {
        self.vds.get() == 0.0 && self.vgs.get() == 0.0 && self.vbs.get() == 0.0
    }

    /// Initial conditions as a polarity-normalized bias.
    pub fn bias(&self, polarity: f64) -> Bias {
        Bias::new(
            polarity * self.vgs.get(),
            polarity * self.vds.get(),
            polarity * self.vbs.get(),
        )
    }
}

/// Physics of one FET family.
pub trait FetEquations: Debug + Clone + Send + Sync + 'static {
    /// Model card.
    type Model: Debug + Clone + Send + Sync;
    /// Instance parameters.
    type Params: Debug + Clone + Default + Send + Sync;
    /// Temperature-dependent values computed once per instance.
    type Derived: Debug + Clone + Send + Sync;

    /// Family name used in diagnostics.
    const FAMILY: &'static str;
    /// Whether the device has a bulk terminal. Without one the bulk is tied
    /// to the source prime node.
    const HAS_BULK: bool;
    /// Physical terminal pairs that carry a charge, one state slot pair each.
    const CHARGE_PAIRS: &'static [(Terminal, Terminal)];
    /// Number of external terminals.
    const TERMINALS: usize = if Self::HAS_BULK { 4 } else { 3 };

    /// State slots needed per instance.
    fn state_count() -> usize {
        BIAS_SLOTS + 2 * Self::CHARGE_PAIRS.len()
    }

    /// Fill defaults and sanitize the model card.
    fn setup_model(model: &mut Self::Model, options: &SimOptions);

    /// Fill defaults and sanitize instance parameters.
    fn setup_instance(model: &Self::Model, params: &mut Self::Params, options: &SimOptions);

    /// Drain and source series resistances (ohm); nonzero values get a
    /// prime node.
    fn series_resistance(model: &Self::Model, params: &Self::Params) -> (f64, f64);

    /// Compute temperature-dependent values.
    fn temperature(model: &Self::Model, params: &Self::Params, options: &SimOptions)
    -> Self::Derived;

    /// +1 for n-type, -1 for p-type.
    fn polarity(derived: &Self::Derived) -> f64;

    /// Drain and source series conductances (S).
    fn series_conductance(derived: &Self::Derived) -> (f64, f64);

    /// Bias used for the first operating-point iteration.
    fn initial_bias(derived: &Self::Derived) -> Bias;

    /// Threshold used for limiting before the first load.
    fn threshold(derived: &Self::Derived) -> f64;

    fn initial_conditions(params: &Self::Params) -> &InitialConditions;

    fn initial_conditions_mut(params: &mut Self::Params) -> &mut InitialConditions;

    /// Whether the instance was declared off for the operating point.
    fn is_off(params: &Self::Params) -> bool;

    /// Damp the step from `previous` to `candidate`.
    fn limit(derived: &Self::Derived, candidate: Bias, previous: Bias, threshold: f64) -> Bias;

    /// Evaluate currents and charges at the effective bias `v` = (vgs, vds,
    /// vbs), all polarity-normalized.
    fn evaluate<T: Real>(
        derived: &Self::Derived,
        frame: Frame,
        v: [T; 3],
        gmin: f64,
    ) -> Evaluation<T>;

    fn model_param(model: &Self::Model, key: u32) -> Result<ParamValue>;

    fn set_model_param(model: &mut Self::Model, key: u32, value: &ParamValue) -> Result<()>;

    fn instance_param(params: &Self::Params, key: u32) -> Result<ParamValue>;

    fn set_instance_param(params: &mut Self::Params, key: u32, value: &ParamValue) -> Result<()>;
}
