//! GaAs MESFET model and instance parameters.

use crate::error::{Error, Result};
use crate::fet::InitialConditions;
use crate::param::{Given, ParamValue, param_keys};

/// MESFET channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MesfetType {
    #[default]
    Nmf,
    Pmf,
}

impl MesfetType {
    /// +1 for n-channel, -1 for p-channel.
    pub fn sign(self) -> f64 {
        match self {
            MesfetType::Nmf => 1.0,
            MesfetType::Pmf => -1.0,
        }
    }
}

/// Drain current formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MesfetLevel {
    /// Statz: polynomial knee below `3/alpha`, doping tail through `b`.
    #[default]
    Statz,
    /// Curtice: square law with a `tanh` knee.
    Curtice,
}

impl MesfetLevel {
    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(MesfetLevel::Statz),
            2 => Some(MesfetLevel::Curtice),
            _ => None,
        }
    }
}

/// MESFET model card.
#[derive(Debug, Clone, Default)]
pub struct MesModel {
    pub mes_type: MesfetType,
    /// 1 = Statz, 2 = Curtice. Default: 1
    pub level: Given<i64>,
    /// Pinch-off voltage (V). Default: -2.0 (NMF), 2.0 (PMF)
    pub vto: Given<f64>,
    /// Transconductance parameter (A/V²). Default: 2.5e-3
    pub beta: Given<f64>,
    /// Doping tail extending parameter (1/V). Default: 0.3
    pub b: Given<f64>,
    /// Saturation voltage parameter (1/V). Default: 2.0
    pub alpha: Given<f64>,
    /// Channel-length modulation (1/V). Default: 0
    pub lambda: Given<f64>,
    /// Drain ohmic resistance (ohm).
    pub rd: Given<f64>,
    /// Source ohmic resistance (ohm).
    pub rs: Given<f64>,
    /// Zero-bias gate-source capacitance (F).
    pub cgs: Given<f64>,
    /// Zero-bias gate-drain capacitance (F).
    pub cgd: Given<f64>,
    /// Gate junction potential (V). Default: 1.0
    pub pb: Given<f64>,
    /// Gate junction saturation current (A). Default: 1e-14
    pub is: Given<f64>,
    /// Forward-bias depletion capacitance coefficient. Default: 0.5
    pub fc: Given<f64>,
}

impl MesModel {
    pub fn new(mes_type: MesfetType) -> Self {
        Self {
            mes_type,
            level: Given::new(1),
            ..Default::default()
        }
    }

    pub fn nmf() -> Self {
        Self::new(MesfetType::Nmf)
    }

    pub fn pmf() -> Self {
        Self::new(MesfetType::Pmf)
    }
}

/// MESFET instance parameters.
#[derive(Debug, Clone, Default)]
pub struct MesParams {
    /// Area factor scaling currents, capacitances and conductances.
    pub area: Given<f64>,
    pub off: bool,
    pub ic: InitialConditions,
}

param_keys! {
    /// MESFET model parameter keys.
    pub enum MesModelParam {
        Vto = 101,
        Alpha = 102,
        Beta = 103,
        Lambda = 104,
        B = 105,
        Rd = 106,
        Rs = 107,
        Cgs = 108,
        Cgd = 109,
        Pb = 110,
        Is = 111,
        Fc = 112,
        Nmf = 113,
        Pmf = 114,
        Level = 115,
        Type = 116,
    }
}

param_keys! {
    /// MESFET instance parameter keys.
    pub enum MesInstanceParam {
        Area = 1,
        IcVds = 2,
        IcVgs = 3,
        Off = 4,
        /// Vector of one or two values: vds, vgs.
        Ic = 5,
    }
}

impl MesModel {
    fn real(&self, key: MesModelParam) -> Option<&Given<f64>> {
        use MesModelParam::*;
        Some(match key {
            Vto => &self.vto,
            Alpha => &self.alpha,
            Beta => &self.beta,
            Lambda => &self.lambda,
            B => &self.b,
            Rd => &self.rd,
            Rs => &self.rs,
            Cgs => &self.cgs,
            Cgd => &self.cgd,
            Pb => &self.pb,
            Is => &self.is,
            Fc => &self.fc,
            Nmf | Pmf | Level | Type => return None,
        })
    }

    fn real_mut(&mut self, key: MesModelParam) -> Option<&mut Given<f64>> {
        use MesModelParam::*;
        Some(match key {
            Vto => &mut self.vto,
            Alpha => &mut self.alpha,
            Beta => &mut self.beta,
            Lambda => &mut self.lambda,
            B => &mut self.b,
            Rd => &mut self.rd,
            Rs => &mut self.rs,
            Cgs => &mut self.cgs,
            Cgd => &mut self.cgd,
            Pb => &mut self.pb,
            Is => &mut self.is,
            Fc => &mut self.fc,
            Nmf | Pmf | Level | Type => return None,
        })
    }

    pub(crate) fn get(&self, key: u32) -> Result<ParamValue> {
        let key = MesModelParam::try_from(key)?;
        Ok(match key {
            MesModelParam::Nmf => ParamValue::Flag(self.mes_type == MesfetType::Nmf),
            MesModelParam::Pmf => ParamValue::Flag(self.mes_type == MesfetType::Pmf),
            MesModelParam::Level => ParamValue::Int(self.level.get()),
            MesModelParam::Type => ParamValue::Int(self.mes_type.sign() as i64),
            other => ParamValue::Real(self.real(other).map(Given::get).unwrap_or_default()),
        })
    }

    pub(crate) fn set(&mut self, key: u32, value: &ParamValue) -> Result<()> {
        let raw = key;
        match MesModelParam::try_from(key)? {
            MesModelParam::Nmf => {
                if value.as_flag(raw)? {
                    self.mes_type = MesfetType::Nmf;
                }
            }
            MesModelParam::Pmf => {
                if value.as_flag(raw)? {
                    self.mes_type = MesfetType::Pmf;
                }
            }
            MesModelParam::Level => self.level.set(value.as_int(raw)?),
            MesModelParam::Type => {
                return Err(Error::BadParameter {
                    key: raw,
                    reason: "type is read-only".into(),
                });
            }
            other => {
                let v = value.as_real(raw)?;
                if let Some(field) = self.real_mut(other) {
                    field.set(v);
                }
            }
        }
        Ok(())
    }
}

impl MesParams {
    pub(crate) fn get(&self, key: u32) -> Result<ParamValue> {
        Ok(match MesInstanceParam::try_from(key)? {
            MesInstanceParam::Area => ParamValue::Real(self.area.get()),
            MesInstanceParam::IcVds => ParamValue::Real(self.ic.vds.get()),
            MesInstanceParam::IcVgs => ParamValue::Real(self.ic.vgs.get()),
            MesInstanceParam::Off => ParamValue::Flag(self.off),
            MesInstanceParam::Ic => ParamValue::Vector(vec![self.ic.vds.get(), self.ic.vgs.get()]),
        })
    }

    pub(crate) fn set(&mut self, key: u32, value: &ParamValue) -> Result<()> {
        let raw = key;
        match MesInstanceParam::try_from(key)? {
            MesInstanceParam::Area => self.area.set(value.as_real(raw)?),
            MesInstanceParam::IcVds => self.ic.vds.set(value.as_real(raw)?),
            MesInstanceParam::IcVgs => self.ic.vgs.set(value.as_real(raw)?),
            MesInstanceParam::Off => self.off = value.as_flag(raw)?,
            MesInstanceParam::Ic => {
                let values = value.as_vector(raw)?;
                if values.is_empty() || values.len() > 2 {
                    return Err(Error::BadParameter {
                        key: raw,
                        reason: format!("expected 1 or 2 initial voltages, got {}", values.len()),
                    });
                }
                self.ic.vds.set(values[0]);
                if let Some(&vgs) = values.get(1) {
                    self.ic.vgs.set(vgs);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_lookup() {
        assert_eq!(MesfetLevel::from_level(1), Some(MesfetLevel::Statz));
        assert_eq!(MesfetLevel::from_level(2), Some(MesfetLevel::Curtice));
        assert_eq!(MesfetLevel::from_level(3), None);
    }

    #[test]
    fn test_model_params() {
        let mut model = MesModel::pmf();
        model
            .set(MesModelParam::Alpha as u32, &ParamValue::Real(3.0))
            .unwrap();
        assert_eq!(
            model.get(MesModelParam::Alpha as u32).unwrap(),
            ParamValue::Real(3.0)
        );
        assert_eq!(
            model.get(MesModelParam::Type as u32).unwrap(),
            ParamValue::Int(-1)
        );
        assert!(model.set(MesModelParam::Beta as u32, &ParamValue::Vector(vec![])).is_err());
    }

    #[test]
    fn test_instance_ic() {
        let mut params = MesParams::default();
        params
            .set(MesInstanceParam::Ic as u32, &ParamValue::Vector(vec![2.0, -0.5]))
            .unwrap();
        assert_eq!(params.ic.vds.get(), 2.0);
        assert_eq!(params.ic.vgs.get(), -0.5);
        assert!(params.set(42, &ParamValue::Real(1.0)).is_err());
    }
}
