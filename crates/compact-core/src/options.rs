//! Simulator-wide options consumed by device models.

/// Tolerances controlling the load-time bypass.
///
/// Kept apart from the convergence tolerances so bypass can be tightened or
/// disabled without changing what counts as converged.
#[derive(Debug, Clone, PartialEq)]
pub struct BypassOptions {
    /// Whether bypass is attempted at all.
    pub enabled: bool,
    /// Relative tolerance on voltages and currents.
    pub reltol: f64,
    /// Absolute tolerance on currents (A).
    pub abstol: f64,
    /// Absolute tolerance on voltages (V).
    pub vntol: f64,
}

impl Default for BypassOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            reltol: 1e-3,
            abstol: 1e-12,
            vntol: 1e-6,
        }
    }
}

impl BypassOptions {
    /// Bypass switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Global options shared by every model during setup and load.
#[derive(Debug, Clone, PartialEq)]
pub struct SimOptions {
    /// Relative tolerance.
    pub reltol: f64,
    /// Absolute current tolerance (A).
    pub abstol: f64,
    /// Absolute voltage tolerance (V).
    pub vntol: f64,
    /// Absolute charge tolerance (C).
    pub chgtol: f64,
    /// Truncation error overestimation factor.
    pub trtol: f64,
    /// Minimum conductance placed across every junction (S).
    pub gmin: f64,
    /// Circuit temperature (K).
    pub temp: f64,
    /// Nominal temperature at which parameters were extracted (K).
    pub tnom: f64,
    /// Default channel length (m).
    pub default_l: f64,
    /// Default channel width (m).
    pub default_w: f64,
    /// Default drain diffusion area (m²).
    pub default_ad: f64,
    /// Default source diffusion area (m²).
    pub default_as: f64,
    /// Evaluate instances on the rayon pool.
    pub parallel_load: bool,
    /// Upper bound on matrix elements a setup pass may acquire.
    pub element_limit: Option<usize>,
    /// Bypass configuration.
    pub bypass: BypassOptions,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            reltol: 1e-3,
            abstol: 1e-12,
            vntol: 1e-6,
            chgtol: 1e-14,
            trtol: 7.0,
            gmin: 1e-12,
            temp: 300.15,
            tnom: 300.15,
            default_l: 100e-6,
            default_w: 100e-6,
            default_ad: 0.0,
            default_as: 0.0,
            parallel_load: false,
            element_limit: None,
            bypass: BypassOptions::default(),
        }
    }
}
