//! Level-1 temperature-adjusted parameters.
//!
//! Computed once per instance by the temperature pass and reused by every
//! load. Voltages are stored polarity-normalized so the channel equations
//! are the same for NMOS and PMOS.

use compact_core::SimOptions;
use compact_core::limit::critical_voltage;

use super::params::{MosModel, MosParams};
use crate::junction::{BOLTZMANN, CHARGE, REFTEMP, energy_gap, thermal_voltage};
use crate::param::Given;

/// Silicon dioxide permittivity (F/m).
pub const EPS_OX: f64 = 3.9 * 8.854214871e-12;
/// Silicon permittivity (F/m).
pub const EPS_SI: f64 = 11.7 * 8.854214871e-12;

/// Bulk junction on one side of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JunctionSide {
    /// Saturation current (A).
    pub sat_cur: f64,
    /// Critical voltage for junction limiting (V).
    pub vcrit: f64,
    /// Zero-bias bottom capacitance (F).
    pub czb: f64,
    /// Zero-bias sidewall capacitance (F).
    pub czbsw: f64,
}

/// Level-1 values at the circuit temperature.
#[derive(Debug, Clone)]
pub struct MosDerived {
    /// +1 for NMOS, -1 for PMOS.
    pub polarity: f64,
    /// Thermal voltage (V).
    pub vt: f64,
    /// kp · W / Leff (A/V²).
    pub beta: f64,
    /// Surface potential (V).
    pub phi: f64,
    pub gamma: f64,
    pub lambda: f64,
    /// Normalized flat-band-like term: threshold less the body effect (V).
    pub vbi: f64,
    /// Normalized zero-bias threshold (V).
    pub vto: f64,
    /// Effective channel length (m).
    pub leff: f64,
    /// Oxide capacitance times channel area (F). Zero disables intrinsic
    /// gate charge.
    pub cox_total: f64,
    pub cgs_overlap: f64,
    pub cgd_overlap: f64,
    pub cgb_overlap: f64,
    pub source: JunctionSide,
    pub drain: JunctionSide,
    /// Junction potential (V).
    pub pb: f64,
    pub mj: f64,
    pub mjsw: f64,
    pub fc: f64,
    /// Drain and source series conductances (S).
    pub gd: f64,
    pub gs: f64,
}

impl MosDerived {
    pub fn compute(model: &MosModel, params: &MosParams, options: &SimOptions) -> Self {
        let pol = model.mos_type.sign();
        let tnom = model.tnom.get();
        let temp = options.temp;

        let vtnom = thermal_voltage(tnom);
        let fact1 = tnom / REFTEMP;
        let egfet1 = energy_gap(tnom);
        let arg1 = -egfet1 / (2.0 * BOLTZMANN * tnom) + 1.1150877 / (BOLTZMANN * 2.0 * REFTEMP);
        let pbfact1 = -2.0 * vtnom * (1.5 * fact1.ln() + CHARGE * arg1);

        let vt = thermal_voltage(temp);
        let ratio = temp / tnom;
        let fact2 = temp / REFTEMP;
        let egfet = energy_gap(temp);
        let arg = -egfet / (2.0 * BOLTZMANN * temp) + 1.1150877 / (BOLTZMANN * 2.0 * REFTEMP);
        let pbfact = -2.0 * vt * (1.5 * fact2.ln() + CHARGE * arg);

        let phi = model.phi.get();
        let gamma = model.gamma.get();
        let ratio4 = ratio * ratio.sqrt();
        let kp = model.kp.get() / ratio4;
        let phio = (phi - pbfact1) / fact1;
        let tphi = fact2 * phio + pbfact;
        let tvbi = model.vto.get() - pol * gamma * phi.sqrt()
            + 0.5 * (egfet1 - egfet)
            + pol * 0.5 * (tphi - phi);
        let tvto = tvbi + pol * gamma * tphi.sqrt();

        let sat_scale = (-egfet / vt + egfet1 / vtnom).exp();
        let tis = model.is.get() * sat_scale;
        let tjs = model.js.get() * sat_scale;

        let pb = model.pb.get();
        let mj = model.mj.get();
        let mjsw = model.mjsw.get();
        let pbo = (pb - pbfact1) / fact1;
        let gmaold = (pb - pbo) / pb;
        let tpb = fact2 * pbo + pbfact;
        let gmanew = (tpb - pbo) / tpb;
        let bottom = (1.0 + mj * (4e-4 * (temp - REFTEMP) - gmanew))
            / (1.0 + mj * (4e-4 * (tnom - REFTEMP) - gmaold));
        let side = (1.0 + mjsw * (4e-4 * (temp - REFTEMP) - gmanew))
            / (1.0 + mjsw * (4e-4 * (tnom - REFTEMP) - gmaold));

        let l = params.l.get();
        let w = params.w.get();
        let ld = model.ld.get();
        let leff = if l - 2.0 * ld > 0.0 { l - 2.0 * ld } else { l };

        let cox_total = match model.tox.given() {
            Some(tox) if tox > 0.0 => EPS_OX / tox * w * leff,
            _ => 0.0,
        };

        let side_of = |given_cap: &Given<f64>, area: f64, perim: f64| {
            let sat_cur = if tjs == 0.0 || params.ad.get() == 0.0 || params.as_.get() == 0.0 {
                tis
            } else {
                tjs * area
            };
            let czb = match given_cap.given() {
                Some(c) => c * bottom,
                None => model.cj.get() * bottom * area,
            };
            JunctionSide {
                sat_cur,
                vcrit: critical_voltage(vt, sat_cur),
                czb,
                czbsw: model.cjsw.get() * side * perim,
            }
        };
        let drain = side_of(&model.cbd, params.ad.get(), params.pd.get());
        let source = side_of(&model.cbs, params.as_.get(), params.ps.get());

        let (rd, rs) = series_resistance(model, params);
        let conductance = |r: f64| if r > 0.0 { 1.0 / r } else { 0.0 };

        Self {
            polarity: pol,
            vt,
            beta: kp * w / leff,
            phi: tphi,
            gamma,
            lambda: model.lambda.get(),
            vbi: pol * tvbi,
            vto: pol * tvto,
            leff,
            cox_total,
            cgs_overlap: model.cgso.get() * w,
            cgd_overlap: model.cgdo.get() * w,
            cgb_overlap: model.cgbo.get() * leff,
            source,
            drain,
            pb: tpb,
            mj,
            mjsw,
            fc: model.fc.get(),
            gd: conductance(rd),
            gs: conductance(rs),
        }
    }
}

/// Drain and source series resistance (ohm), from the model card or from
/// the sheet resistance and square counts.
pub fn series_resistance(model: &MosModel, params: &MosParams) -> (f64, f64) {
    let rd = model
        .rd
        .given()
        .unwrap_or(model.rsh.get() * params.nrd.get());
    let rs = model
        .rs
        .given()
        .unwrap_or(model.rsh.get() * params.nrs.get());
    (rd, rs)
}
