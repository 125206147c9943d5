//! Level-1 MOSFET (Shichman-Hodges).
//!
//! # Usage
//!
//! ```text
//! .MODEL NMOD NMOS LEVEL=1 VTO=0.7 KP=1e-4 GAMMA=0.4 TOX=20n
//! M1 d g s b NMOD W=10u L=1u
//! ```
//!
//! Defaults and temperature scaling follow the classic Berkeley level-1
//! model. Threshold, transconductance and body-effect coefficient can be
//! derived from process parameters (TOX, U0, NSUB, TPG, NSS) when they are
//! not given directly.

pub mod derived;
pub mod evaluate;
pub mod params;

pub use derived::{JunctionSide, MosDerived};
pub use evaluate::{MosRegion, region};
pub use params::{MosInstanceParam, MosModel, MosModelParam, MosParams, MosfetType};

use compact_core::SimOptions;

use crate::error::Result;
use crate::fet::{Bias, Evaluation, FetEquations, FetModel, Frame, InitialConditions, Terminal};
use crate::junction::{CHARGE, energy_gap, thermal_voltage};
use crate::param::ParamValue;
use crate::taylor::Real;
use derived::{EPS_OX, EPS_SI};

/// Intrinsic carrier concentration of silicon (1/m³).
const NI: f64 = 1.45e16;

/// Level-1 MOSFET family.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mos1;

/// A level-1 model card with its instances.
pub type MosfetModel = FetModel<Mos1>;

impl MosfetModel {
    pub fn nmos(name: impl Into<String>) -> Self {
        FetModel::new(name, MosModel::nmos())
    }

    pub fn pmos(name: impl Into<String>) -> Self {
        FetModel::new(name, MosModel::pmos())
    }
}

impl FetEquations for Mos1 {
    type Model = MosModel;
    type Params = MosParams;
    type Derived = MosDerived;

    const FAMILY: &'static str = "mos1";
    const HAS_BULK: bool = true;
    const CHARGE_PAIRS: &'static [(Terminal, Terminal)] = &evaluate::CHARGE_PAIRS;

    fn setup_model(model: &mut MosModel, options: &SimOptions) {
        let pol = model.mos_type.sign();
        if model.level.get() != 1 {
            log::warn!("mos1: level {} not supported, using level 1", model.level.get());
            model.level.clamp_to(1);
        }
        model.tnom.default_to(options.tnom);

        let mut kp = 2e-5;
        let mut phi = 0.6;
        let mut vto = 0.7 * pol;
        if let Some(tox) = model.tox.given().filter(|&t| t > 0.0) {
            let cox = EPS_OX / tox;
            model.u0.default_to(600.0);
            kp = model.u0.get() * cox * 1e-4;
            match model.nsub.given() {
                Some(nsub) if nsub * 1e6 > NI => {
                    let vtnom = thermal_voltage(model.tnom.get());
                    let egfet1 = energy_gap(model.tnom.get());
                    phi = (2.0 * vtnom * (nsub * 1e6 / NI).ln()).max(0.1);
                    let phi_eff = model.phi.given().unwrap_or(phi);
                    let fermis = pol * 0.5 * phi_eff;
                    let mut wkfng = 3.2;
                    let tpg = model.tpg.get();
                    if tpg != 0 {
                        let fermig = pol * tpg as f64 * 0.5 * egfet1;
                        wkfng = 3.25 + 0.5 * egfet1 - fermig;
                    }
                    let wkfngs = wkfng - (3.25 + 0.5 * egfet1 + fermis);
                    model
                        .gamma
                        .default_to((2.0 * EPS_SI * CHARGE * nsub * 1e6).sqrt() / cox);
                    let gamma = model.gamma.get();
                    let vfb = wkfngs - model.nss.get() * 1e4 * CHARGE / cox;
                    vto = vfb + pol * (gamma * phi_eff.sqrt() + phi_eff);
                }
                Some(nsub) => {
                    log::warn!("mos1: nsub {nsub:e} below intrinsic concentration, ignored");
                }
                None => {}
            }
        }

        model.kp.default_to(kp);
        model.phi.default_to(phi);
        model.vto.default_to(vto);
        model.is.default_to(1e-14);
        model.pb.default_to(0.8);
        model.mj.default_to(0.5);
        model.mjsw.default_to(0.5);
        model.fc.default_to(0.5);

        if model.pb.get() < 0.1 {
            log::warn!("mos1: pb {} too small, using 0.1", model.pb.get());
            model.pb.clamp_to(0.1);
        }
        if model.fc.get() > 0.95 {
            log::warn!("mos1: fc {} too large, using 0.95", model.fc.get());
            model.fc.clamp_to(0.95);
        }
        if model.phi.get() <= 0.0 {
            log::warn!("mos1: phi {} not positive, using 0.6", model.phi.get());
            model.phi.clamp_to(0.6);
        }
    }

    fn setup_instance(model: &MosModel, params: &mut MosParams, options: &SimOptions) {
        params.l.default_to(options.default_l);
        params.w.default_to(options.default_w);
        params.ad.default_to(options.default_ad);
        params.as_.default_to(options.default_as);
        if params.l.get() - 2.0 * model.ld.get() <= 0.0 {
            log::warn!(
                "mos1: effective channel length {} not positive, ignoring ld",
                params.l.get() - 2.0 * model.ld.get()
            );
        }
    }

    fn series_resistance(model: &MosModel, params: &MosParams) -> (f64, f64) {
        derived::series_resistance(model, params)
    }

    fn temperature(model: &MosModel, params: &MosParams, options: &SimOptions) -> MosDerived {
        MosDerived::compute(model, params, options)
    }

    fn polarity(derived: &MosDerived) -> f64 {
        derived.polarity
    }

    fn series_conductance(derived: &MosDerived) -> (f64, f64) {
        (derived.gd, derived.gs)
    }

    fn initial_bias(derived: &MosDerived) -> Bias {
        Bias::new(derived.vto, 0.0, -1.0)
    }

    fn threshold(derived: &MosDerived) -> f64 {
        derived.vto
    }

    fn initial_conditions(params: &MosParams) -> &InitialConditions {
        &params.ic
    }

    fn initial_conditions_mut(params: &mut MosParams) -> &mut InitialConditions {
        &mut params.ic
    }

    fn is_off(params: &MosParams) -> bool {
        params.off
    }

    fn limit(derived: &MosDerived, candidate: Bias, previous: Bias, threshold: f64) -> Bias {
        evaluate::limit(derived, candidate, previous, threshold)
    }

    fn evaluate<T: Real>(derived: &MosDerived, frame: Frame, v: [T; 3], gmin: f64) -> Evaluation<T> {
        evaluate::evaluate(derived, frame, v, gmin)
    }

    fn model_param(model: &MosModel, key: u32) -> Result<ParamValue> {
        model.get(key)
    }

    fn set_model_param(model: &mut MosModel, key: u32, value: &ParamValue) -> Result<()> {
        model.set(key, value)
    }

    fn instance_param(params: &MosParams, key: u32) -> Result<ParamValue> {
        params.get(key)
    }

    fn set_instance_param(params: &mut MosParams, key: u32, value: &ParamValue) -> Result<()> {
        params.set(key, value)
    }
}
