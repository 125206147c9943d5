//! Level-1 MOSFET model and instance parameters.

use crate::error::Result;
use crate::fet::InitialConditions;
use crate::param::{Given, ParamValue, param_keys};

/// MOSFET channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MosfetType {
    /// N-channel (electrons as carriers).
    #[default]
    Nmos,
    /// P-channel (holes as carriers).
    Pmos,
}

impl MosfetType {
    /// +1 for NMOS, -1 for PMOS.
    pub fn sign(self) -> f64 {
        match self {
            MosfetType::Nmos => 1.0,
            MosfetType::Pmos => -1.0,
        }
    }
}

/// Level-1 (Shichman-Hodges) model card.
///
/// Every value starts out defaulted; `setup_model` fills what the user
/// left out, some of it derived from process parameters.
#[derive(Debug, Clone, Default)]
pub struct MosModel {
    pub mos_type: MosfetType,
    /// Model level. Only level 1 is implemented.
    pub level: Given<i64>,

    // ========================================
    // Channel
    // ========================================
    /// Zero-bias threshold voltage (V). Default: 0.7 (NMOS), -0.7 (PMOS)
    pub vto: Given<f64>,
    /// Transconductance parameter (A/V²). Default: 2e-5
    pub kp: Given<f64>,
    /// Body-effect coefficient (V^0.5). Default: 0
    pub gamma: Given<f64>,
    /// Surface potential (V). Default: 0.6
    pub phi: Given<f64>,
    /// Channel-length modulation (1/V). Default: 0
    pub lambda: Given<f64>,

    // ========================================
    // Parasitics
    // ========================================
    /// Drain ohmic resistance (ohm).
    pub rd: Given<f64>,
    /// Source ohmic resistance (ohm).
    pub rs: Given<f64>,
    /// Drain and source diffusion sheet resistance (ohm/square).
    pub rsh: Given<f64>,
    /// Zero-bias bulk-drain junction capacitance (F).
    pub cbd: Given<f64>,
    /// Zero-bias bulk-source junction capacitance (F).
    pub cbs: Given<f64>,
    /// Bulk junction saturation current (A). Default: 1e-14
    pub is: Given<f64>,
    /// Bulk junction saturation current density (A/m²).
    pub js: Given<f64>,
    /// Bulk junction potential (V). Default: 0.8
    pub pb: Given<f64>,
    /// Bottom junction capacitance per area (F/m²).
    pub cj: Given<f64>,
    /// Bottom grading coefficient. Default: 0.5
    pub mj: Given<f64>,
    /// Sidewall junction capacitance per perimeter (F/m).
    pub cjsw: Given<f64>,
    /// Sidewall grading coefficient. Default: 0.5
    pub mjsw: Given<f64>,
    /// Forward-bias depletion capacitance coefficient. Default: 0.5
    pub fc: Given<f64>,

    // ========================================
    // Gate capacitance
    // ========================================
    /// Gate-source overlap capacitance per width (F/m).
    pub cgso: Given<f64>,
    /// Gate-drain overlap capacitance per width (F/m).
    pub cgdo: Given<f64>,
    /// Gate-bulk overlap capacitance per length (F/m).
    pub cgbo: Given<f64>,

    // ========================================
    // Process
    // ========================================
    /// Oxide thickness (m). Enables intrinsic gate charge.
    pub tox: Given<f64>,
    /// Lateral diffusion (m).
    pub ld: Given<f64>,
    /// Surface mobility (cm²/V·s). Default: 600
    pub u0: Given<f64>,
    /// Substrate doping (1/cm³).
    pub nsub: Given<f64>,
    /// Gate material: +1 opposite to substrate, -1 same, 0 aluminium.
    pub tpg: Given<i64>,
    /// Surface state density (1/cm²).
    pub nss: Given<f64>,
    /// Parameter measurement temperature (K).
    pub tnom: Given<f64>,
}

impl MosModel {
    pub fn new(mos_type: MosfetType) -> Self {
        Self {
            mos_type,
            level: Given::new(1),
            tpg: Given::new(1),
            ..Default::default()
        }
    }

    pub fn nmos() -> Self {
        Self::new(MosfetType::Nmos)
    }

    pub fn pmos() -> Self {
        Self::new(MosfetType::Pmos)
    }
}

/// Level-1 instance parameters.
#[derive(Debug, Clone, Default)]
pub struct MosParams {
    /// Channel length (m).
    pub l: Given<f64>,
    /// Channel width (m).
    pub w: Given<f64>,
    /// Drain diffusion area (m²).
    pub ad: Given<f64>,
    /// Source diffusion area (m²).
    pub as_: Given<f64>,
    /// Drain diffusion perimeter (m).
    pub pd: Given<f64>,
    /// Source diffusion perimeter (m).
    pub ps: Given<f64>,
    /// Squares of drain diffusion.
    pub nrd: Given<f64>,
    /// Squares of source diffusion.
    pub nrs: Given<f64>,
    /// Start the operating point with the device off.
    pub off: bool,
    pub ic: InitialConditions,
}

param_keys! {
    /// Level-1 model parameter keys.
    pub enum MosModelParam {
        Vto = 101,
        Kp = 102,
        Gamma = 103,
        Phi = 104,
        Lambda = 105,
        Rd = 106,
        Rs = 107,
        Cbd = 108,
        Cbs = 109,
        Is = 110,
        Pb = 111,
        Cgso = 112,
        Cgdo = 113,
        Cgbo = 114,
        Rsh = 115,
        Cj = 116,
        Mj = 117,
        Cjsw = 118,
        Mjsw = 119,
        Js = 120,
        Tox = 121,
        Ld = 122,
        U0 = 123,
        Fc = 124,
        /// Flag: make the model n-channel.
        Nmos = 125,
        /// Flag: make the model p-channel.
        Pmos = 126,
        Nsub = 127,
        Tpg = 128,
        Nss = 129,
        Tnom = 130,
        Level = 131,
        /// Read-only: +1 or -1.
        Type = 132,
    }
}

param_keys! {
    /// Level-1 instance parameter keys.
    pub enum MosInstanceParam {
        W = 1,
        L = 2,
        As = 3,
        Ad = 4,
        Ps = 5,
        Pd = 6,
        Nrs = 7,
        Nrd = 8,
        Off = 9,
        IcVds = 10,
        IcVgs = 11,
        IcVbs = 12,
        /// Vector of up to three values: vds, vgs, vbs.
        Ic = 13,
    }
}

impl MosModel {
    fn real(&self, key: MosModelParam) -> Option<&Given<f64>> {
        use MosModelParam::*;
        Some(match key {
            Vto => &self.vto,
            Kp => &self.kp,
            Gamma => &self.gamma,
            Phi => &self.phi,
            Lambda => &self.lambda,
            Rd => &self.rd,
            Rs => &self.rs,
            Cbd => &self.cbd,
            Cbs => &self.cbs,
            Is => &self.is,
            Pb => &self.pb,
            Cgso => &self.cgso,
            Cgdo => &self.cgdo,
            Cgbo => &self.cgbo,
            Rsh => &self.rsh,
            Cj => &self.cj,
            Mj => &self.mj,
            Cjsw => &self.cjsw,
            Mjsw => &self.mjsw,
            Js => &self.js,
            Tox => &self.tox,
            Ld => &self.ld,
            U0 => &self.u0,
            Fc => &self.fc,
            Nsub => &self.nsub,
            Nss => &self.nss,
            Tnom => &self.tnom,
            Nmos | Pmos | Tpg | Level | Type => return None,
        })
    }

    fn real_mut(&mut self, key: MosModelParam) -> Option<&mut Given<f64>> {
        use MosModelParam::*;
        Some(match key {
            Vto => &mut self.vto,
            Kp => &mut self.kp,
            Gamma => &mut self.gamma,
            Phi => &mut self.phi,
            Lambda => &mut self.lambda,
            Rd => &mut self.rd,
            Rs => &mut self.rs,
            Cbd => &mut self.cbd,
            Cbs => &mut self.cbs,
            Is => &mut self.is,
            Pb => &mut self.pb,
            Cgso => &mut self.cgso,
            Cgdo => &mut self.cgdo,
            Cgbo => &mut self.cgbo,
            Rsh => &mut self.rsh,
            Cj => &mut self.cj,
            Mj => &mut self.mj,
            Cjsw => &mut self.cjsw,
            Mjsw => &mut self.mjsw,
            Js => &mut self.js,
            Tox => &mut self.tox,
            Ld => &mut self.ld,
            U0 => &mut self.u0,
            Fc => &mut self.fc,
            Nsub => &mut self.nsub,
            Nss => &mut self.nss,
            Tnom => &mut self.tnom,
            Nmos | Pmos | Tpg | Level | Type => return None,
        })
    }

    pub(crate) fn get(&self, key: u32) -> Result<ParamValue> {
        let key = MosModelParam::try_from(key)?;
        Ok(match key {
            MosModelParam::Nmos => ParamValue::Flag(self.mos_type == MosfetType::Nmos),
            MosModelParam::Pmos => ParamValue::Flag(self.mos_type == MosfetType::Pmos),
            MosModelParam::Type => ParamValue::Int(self.mos_type.sign() as i64),
            MosModelParam::Tpg => ParamValue::Int(self.tpg.get()),
            MosModelParam::Level => ParamValue::Int(self.level.get()),
            other => ParamValue::Real(self.real(other).map(Given::get).unwrap_or_default()),
        })
    }

    pub(crate) fn set(&mut self, key: u32, value: &ParamValue) -> Result<()> {
        let raw = key;
        let key = MosModelParam::try_from(key)?;
        match key {
            MosModelParam::Nmos => {
                if value.as_flag(raw)? {
                    self.mos_type = MosfetType::Nmos;
                }
            }
            MosModelParam::Pmos => {
                if value.as_flag(raw)? {
                    self.mos_type = MosfetType::Pmos;
                }
            }
            MosModelParam::Tpg => self.tpg.set(value.as_int(raw)?),
            MosModelParam::Level => self.level.set(value.as_int(raw)?),
            MosModelParam::Type => {
                return Err(crate::error::Error::BadParameter {
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

impl MosParams {
    pub(crate) fn get(&self, key: u32) -> Result<ParamValue> {
        use MosInstanceParam::*;
        Ok(match MosInstanceParam::try_from(key)? {
            W => ParamValue::Real(self.w.get()),
            L => ParamValue::Real(self.l.get()),
            As => ParamValue::Real(self.as_.get()),
            Ad => ParamValue::Real(self.ad.get()),
            Ps => ParamValue::Real(self.ps.get()),
            Pd => ParamValue::Real(self.pd.get()),
            Nrs => ParamValue::Real(self.nrs.get()),
            Nrd => ParamValue::Real(self.nrd.get()),
            Off => ParamValue::Flag(self.off),
            IcVds => ParamValue::Real(self.ic.vds.get()),
            IcVgs => ParamValue::Real(self.ic.vgs.get()),
            IcVbs => ParamValue::Real(self.ic.vbs.get()),
            Ic => ParamValue::Vector(vec![
                self.ic.vds.get(),
                self.ic.vgs.get(),
                self.ic.vbs.get(),
            ]),
        })
    }

    pub(crate) fn set(&mut self, key: u32, value: &ParamValue) -> Result<()> {
        use MosInstanceParam::*;
        let raw = key;
        match MosInstanceParam::try_from(key)? {
            W => self.w.set(value.as_real(raw)?),
            L => self.l.set(value.as_real(raw)?),
            As => self.as_.set(value.as_real(raw)?),
            Ad => self.ad.set(value.as_real(raw)?),
            Ps => self.ps.set(value.as_real(raw)?),
            Pd => self.pd.set(value.as_real(raw)?),
            Nrs => self.nrs.set(value.as_real(raw)?),
            Nrd => self.nrd.set(value.as_real(raw)?),
            Off => self.off = value.as_flag(raw)?,
            IcVds => self.ic.vds.set(value.as_real(raw)?),
            IcVgs => self.ic.vgs.set(value.as_real(raw)?),
            IcVbs => self.ic.vbs.set(value.as_real(raw)?),
            Ic => set_ic_vector(&mut self.ic, raw, value.as_vector(raw)?)?,
        }
        Ok(())
    }
}

/// Assign (vds, vgs, vbs) from a vector of one to three values.
pub(crate) fn set_ic_vector(ic: &mut InitialConditions, key: u32, values: &[f64]) -> Result<()> {
    if values.is_empty() || values.len() > 3 {
        return Err(crate::error::Error::BadParameter {
            key,
            reason: format!("expected 1 to 3 initial voltages, got {}", values.len()),
        });
    }
    let slots = [&mut ic.vds, &mut ic.vgs, &mut ic.vbs];
    for (slot, &v) in slots.into_iter().zip(values) {
        slot.set(v);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_set_and_get_real() {
        let mut model = MosModel::nmos();
        model
            .set(MosModelParam::Vto as u32, &ParamValue::Real(0.45))
            .unwrap();
        assert!(model.vto.is_given());
        assert_eq!(
            model.get(MosModelParam::Vto as u32).unwrap(),
            ParamValue::Real(0.45)
        );
        assert!(!model.kp.is_given());
    }

    #[test]
    fn test_type_flags() {
        let mut model = MosModel::nmos();
        model
            .set(MosModelParam::Pmos as u32, &ParamValue::Flag(true))
            .unwrap();
        assert_eq!(model.mos_type, MosfetType::Pmos);
        assert_eq!(
            model.get(MosModelParam::Type as u32).unwrap(),
            ParamValue::Int(-1)
        );
        assert!(model.set(MosModelParam::Type as u32, &ParamValue::Int(1)).is_err());
    }

    #[test]
    fn test_bad_keys_and_types() {
        let mut model = MosModel::nmos();
        assert!(matches!(
            model.set(9999, &ParamValue::Real(1.0)),
            Err(Error::BadParameter { key: 9999, .. })
        ));
        assert!(matches!(
            model.set(MosModelParam::Kp as u32, &ParamValue::Flag(true)),
            Err(Error::BadParameter { .. })
        ));
    }

    #[test]
    fn test_ic_vector() {
        let mut params = MosParams::default();
        params
            .set(MosInstanceParam::Ic as u32, &ParamValue::Vector(vec![1.0, 2.0]))
            .unwrap();
        assert_eq!(params.ic.vds.get(), 1.0);
        assert_eq!(params.ic.vgs.get(), 2.0);
        assert!(!params.ic.vbs.is_given());
        assert!(params
            .set(MosInstanceParam::Ic as u32, &ParamValue::Vector(vec![]))
            .is_err());
    }
}
