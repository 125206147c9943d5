//! Analysis-phase flags handed to every load call.

use crate::convergence::ConvergenceMonitor;
use crate::integrate::{ChargeIntegrator, Integrator, Predictor};
use crate::options::SimOptions;

/// Kind of analysis the outer solver is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Analysis {
    /// Operating point or DC sweep.
    #[default]
    Dc,
    /// Time-domain integration.
    Transient,
}

/// Initialization phase of the Newton iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitMode {
    /// Ordinary iteration: bypass, limiting and convergence checks active.
    #[default]
    Float,
    /// First iteration of an operating point: junctions start from
    /// model-supplied initial voltages.
    Junction,
    /// Iteration with off devices held at their initial voltages.
    Fix,
    /// Final load before small-signal analysis; capacitances are stored
    /// but charges are not integrated.
    SmallSignal,
    /// First timepoint of a transient; charge history is seeded.
    Transient,
    /// Predictor step; voltages come from extrapolated history.
    Predict,
}

/// Everything a model needs to know about the present load call besides the
/// solution vector.
#[derive(Clone, Copy)]
pub struct LoadContext<'a> {
    pub analysis: Analysis,
    pub init: InitMode,
    /// Use initial conditions instead of solving for an operating point.
    pub uic: bool,
    pub options: &'a SimOptions,
    pub integrator: &'a dyn ChargeIntegrator,
    pub predictor: &'a dyn Predictor,
    pub monitor: &'a ConvergenceMonitor,
}

impl<'a> LoadContext<'a> {
    /// A DC, floating-phase context using `integrator` for both charge
    /// integration and prediction.
    pub fn new(
        options: &'a SimOptions,
        integrator: &'a Integrator,
        monitor: &'a ConvergenceMonitor,
    ) -> Self {
        Self {
            analysis: Analysis::Dc,
            init: InitMode::Float,
            uic: false,
            options,
            integrator,
            predictor: integrator,
            monitor,
        }
    }

    pub fn with_analysis(mut self, analysis: Analysis) -> Self {
        self.analysis = analysis;
        self
    }

    pub fn with_init(mut self, init: InitMode) -> Self {
        self.init = init;
        self
    }

    pub fn with_uic(mut self, uic: bool) -> Self {
        self.uic = uic;
        self
    }

    /// Junction and Fix phases take voltages verbatim.
    pub fn is_forced(&self) -> bool {
        matches!(self.init, InitMode::Junction | InitMode::Fix)
    }

    /// Whether this load integrates charges.
    pub fn is_transient(&self) -> bool {
        self.analysis == Analysis::Transient && self.init != InitMode::SmallSignal
    }

    /// Whether a model may reuse its last operating point.
    pub fn bypass_allowed(&self) -> bool {
        self.init == InitMode::Float && self.options.bypass.enabled
    }
}

impl std::fmt::Debug for LoadContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadContext")
            .field("analysis", &self.analysis)
            .field("init", &self.init)
            .field("uic", &self.uic)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrate::IntegrationMethod;

    #[test]
    fn test_phase_flags() {
        let opts = SimOptions::default();
        let integrator = Integrator::new(IntegrationMethod::Trapezoidal, 1).unwrap();
        let monitor = ConvergenceMonitor::new();
        let ctx = LoadContext::new(&opts, &integrator, &monitor);
        assert!(ctx.bypass_allowed());
        assert!(!ctx.is_forced());
        assert!(!ctx.is_transient());

        let jct = ctx.with_init(InitMode::Junction);
        assert!(jct.is_forced());
        assert!(!jct.bypass_allowed());

        let tran = ctx.with_analysis(Analysis::Transient);
        assert!(tran.is_transient());
        assert!(!tran.with_init(InitMode::SmallSignal).is_transient());
    }
}
