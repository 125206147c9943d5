//! MESFET values scaled by area and normalized by polarity.

use compact_core::SimOptions;
use compact_core::limit::critical_voltage;

use super::params::{MesModel, MesParams, MesfetLevel};
use crate::junction::thermal_voltage;

#[derive(Debug, Clone)]
pub struct MesDerived {
    pub level: MesfetLevel,
    /// +1 for NMF, -1 for PMF.
    pub polarity: f64,
    /// Thermal voltage (V).
    pub vt: f64,
    /// Normalized pinch-off voltage (V).
    pub vto: f64,
    /// Area-scaled transconductance (A/V²).
    pub beta: f64,
    pub b: f64,
    pub alpha: f64,
    pub lambda: f64,
    /// Area-scaled gate saturation current (A).
    pub sat_cur: f64,
    pub vcrit: f64,
    pub czgs: f64,
    pub czgd: f64,
    pub pb: f64,
    pub fc: f64,
    /// Drain and source series conductances (S).
    pub gd: f64,
    pub gs: f64,
}

impl MesDerived {
    pub fn compute(model: &MesModel, params: &MesParams, options: &SimOptions) -> Self {
        let area = params.area.get();
        let vt = thermal_voltage(options.temp);
        let sat_cur = model.is.get() * area;
        let conductance = |r: f64| if r > 0.0 { area / r } else { 0.0 };
        let pol = model.mes_type.sign();
        Self {
            level: MesfetLevel::from_level(model.level.get()).unwrap_or_default(),
            polarity: pol,
            vt,
            vto: pol * model.vto.get(),
            beta: model.beta.get() * area,
            b: model.b.get(),
            alpha: model.alpha.get(),
            lambda: model.lambda.get(),
            sat_cur,
            vcrit: critical_voltage(vt, sat_cur),
            czgs: model.cgs.get() * area,
            czgd: model.cgd.get() * area,
            pb: model.pb.get(),
            fc: model.fc.get(),
            gd: conductance(model.rd.get()),
            gs: conductance(model.rs.get()),
        }
    }
}
