//! Numerical plumbing shared by compact device models.
//!
//! This crate provides the pieces a device model consumes from the outer
//! simulator during every Newton iteration:
//! - Node identifiers and solution-vector access
//! - A handle-based sparse MNA system with real and imaginary parts
//! - Per-instance state history (current and accepted generations)
//! - Voltage limiting, charge integration and convergence checking
//! - Simulator options and analysis-phase flags

pub mod context;
pub mod convergence;
pub mod error;
pub mod integrate;
pub mod limit;
pub mod mna;
pub mod node;
pub mod options;
pub mod state;

pub use context::{Analysis, InitMode, LoadContext};
pub use convergence::{CheckState, ConvergenceMonitor, within_tolerance};
pub use error::{Error, Result};
pub use integrate::{ChargeHistory, ChargeIntegrator, Companion, IntegrationMethod, Integrator, Predictor};
pub use mna::{ElementHandle, MnaSystem};
pub use node::{NodeId, node_voltage};
pub use options::{BypassOptions, SimOptions};
pub use state::StateStore;
