//! GaAs MESFET (Statz and Curtice).
//!
//! ```text
//! .MODEL GAAS NMF LEVEL=1 VTO=-2 BETA=2.5m B=0.3 ALPHA=2 CGS=1p CGD=0.2p
//! Z1 d g s GAAS AREA=2
//! ```
//!
//! Three terminals; the bulk is tied to the source prime node so the
//! shared driver sees a zero body bias.

pub mod derived;
pub mod evaluate;
pub mod params;

pub use derived::MesDerived;
pub use params::{MesInstanceParam, MesModel, MesModelParam, MesParams, MesfetLevel, MesfetType};

use compact_core::SimOptions;

use crate::error::Result;
use crate::fet::{Bias, Evaluation, FetEquations, FetModel, Frame, InitialConditions, Terminal};
use crate::param::ParamValue;
use crate::taylor::Real;

/// MESFET family.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mesfet;

/// A MESFET model card with its instances.
pub type MesfetModel = FetModel<Mesfet>;

impl MesfetModel {
    pub fn nmf(name: impl Into<String>) -> Self {
        FetModel::new(name, MesModel::nmf())
    }

    pub fn pmf(name: impl Into<String>) -> Self {
        FetModel::new(name, MesModel::pmf())
    }
}

impl FetEquations for Mesfet {
    type Model = MesModel;
    type Params = MesParams;
    type Derived = MesDerived;

    const FAMILY: &'static str = "mesfet";
    const HAS_BULK: bool = false;
    const CHARGE_PAIRS: &'static [(Terminal, Terminal)] = &evaluate::CHARGE_PAIRS;

    fn setup_model(model: &mut MesModel, _options: &SimOptions) {
        let pol = model.mes_type.sign();
        if MesfetLevel::from_level(model.level.get()).is_none() {
            log::warn!("mesfet: level {} not supported, using level 1", model.level.get());
            model.level.clamp_to(1);
        }
        model.vto.default_to(-2.0 * pol);
        model.beta.default_to(2.5e-3);
        model.b.default_to(0.3);
        model.alpha.default_to(2.0);
        model.pb.default_to(1.0);
        model.is.default_to(1e-14);
        model.fc.default_to(0.5);

        if model.alpha.get() <= 0.0 {
            log::warn!("mesfet: alpha {} not positive, using 2.0", model.alpha.get());
            model.alpha.clamp_to(2.0);
        }
        if model.b.get() < 0.0 {
            log::warn!("mesfet: b {} negative, using 0", model.b.get());
            model.b.clamp_to(0.0);
        }
        if model.pb.get() < 0.1 {
            log::warn!("mesfet: pb {} too small, using 0.1", model.pb.get());
            model.pb.clamp_to(0.1);
        }
        if model.fc.get() > 0.95 {
            log::warn!("mesfet: fc {} too large, using 0.95", model.fc.get());
            model.fc.clamp_to(0.95);
        }
    }

    fn setup_instance(_model: &MesModel, params: &mut MesParams, _options: &SimOptions) {
        params.area.default_to(1.0);
        if params.area.get() <= 0.0 {
            log::warn!("mesfet: area {} not positive, using 1", params.area.get());
            params.area.clamp_to(1.0);
        }
    }

    fn series_resistance(model: &MesModel, params: &MesParams) -> (f64, f64) {
        let area = params.area.get();
        (model.rd.get() / area, model.rs.get() / area)
    }

    fn temperature(model: &MesModel, params: &MesParams, options: &SimOptions) -> MesDerived {
        MesDerived::compute(model, params, options)
    }

    fn polarity(derived: &MesDerived) -> f64 {
        derived.polarity
    }

    fn series_conductance(derived: &MesDerived) -> (f64, f64) {
        (derived.gd, derived.gs)
    }

    fn initial_bias(_derived: &MesDerived) -> Bias {
        Bias::new(-1.0, 0.0, 0.0)
    }

    fn threshold(derived: &MesDerived) -> f64 {
        derived.vto
    }

    fn initial_conditions(params: &MesParams) -> &InitialConditions {
        &params.ic
    }

    fn initial_conditions_mut(params: &mut MesParams) -> &mut InitialConditions {
        &mut params.ic
    }

    fn is_off(params: &MesParams) -> bool {
        params.off
    }

    fn limit(derived: &MesDerived, candidate: Bias, previous: Bias, threshold: f64) -> Bias {
        evaluate::limit(derived, candidate, previous, threshold)
    }

    fn evaluate<T: Real>(derived: &MesDerived, frame: Frame, v: [T; 3], gmin: f64) -> Evaluation<T> {
        evaluate::evaluate(derived, frame, v, gmin)
    }

    fn model_param(model: &MesModel, key: u32) -> Result<ParamValue> {
        model.get(key)
    }

    fn set_model_param(model: &mut MesModel, key: u32, value: &ParamValue) -> Result<()> {
        model.set(key, value)
    }

    fn instance_param(params: &MesParams, key: u32) -> Result<ParamValue> {
        params.get(key)
    }

    fn set_instance_param(params: &mut MesParams, key: u32, value: &ParamValue) -> Result<()> {
        params.set(key, value)
    }
}
