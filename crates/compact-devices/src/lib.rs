//! Compact FET models for a SPICE-class simulator.
//!
//! This crate provides nonlinear device models and their matrix stamps:
//! - Level-1 MOSFET (NMOS, PMOS)
//! - GaAs MESFET, Statz and Curtice formulations (NMF, PMF)
//!
//! Every family implements [`FetEquations`]; the shared driver in [`fet`]
//! turns that into a [`CompactModel`] with setup, temperature, Newton load,
//! AC and pole-zero stamps, distortion sources, truncation error,
//! convergence checking, initial conditions and backup/restore.
//!
//! Numerical plumbing (matrix, state history, integration, limiting) lives
//! in `compact-core`.

pub mod compact;
pub mod error;
pub mod fet;
pub mod junction;
pub mod mesfet;
pub mod mosfet;
pub mod param;
pub mod parallel;
pub mod registry;
pub mod taylor;

pub use compact::CompactModel;
pub use error::{Error, Result};
pub use fet::{
    Bias, Branch, DistortionCase, DistortionInput, Evaluation, FetEquations, FetInstance,
    FetModel, Frame, InitialConditions, Mode, OperatingPoint, Terminal,
};
pub use mesfet::{Mesfet, MesfetModel};
pub use mosfet::{Mos1, MosfetModel};
pub use parallel::load_all;
pub use param::{Given, ParamValue};
pub use registry::{ModelRegistry, create_model, register_builtin_models};
pub use taylor::{Dual, Jet, Real};
