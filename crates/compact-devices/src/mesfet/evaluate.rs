//! MESFET equations.
//!
//! ```text
//! Statz:   Id = β(1 + λVds)·Vgst²/(1 + b·Vgst) · [1 - (1 - αVds/3)³]   (Vds < 3/α)
//! Curtice: Id = β(1 + λVds)·Vgst²·tanh(αVds)
//! ```
//!
//! Both gate junctions are Schottky diodes with a square-root depletion
//! charge.

use compact_core::limit::{fetlim, pnjlim};

use super::derived::MesDerived;
use super::params::MesfetLevel;
use crate::fet::{Bias, Branch, Evaluation, Frame, Terminal};
use crate::junction::{depletion_charge, schottky_diode};
use crate::taylor::Real;

pub const CHARGE_PAIRS: [(Terminal, Terminal); 2] = [
    (Terminal::Gate, Terminal::SourcePrime),
    (Terminal::Gate, Terminal::DrainPrime),
];

/// Grading coefficient of the gate junction.
const GATE_GRADING: f64 = 0.5;

fn drain_current<T: Real>(d: &MesDerived, vgst: T, vds: T) -> T {
    if vgst.value() <= 0.0 {
        return T::zero();
    }
    let betap = (vds * d.lambda + 1.0) * d.beta;
    match d.level {
        MesfetLevel::Statz => {
            let core = betap * vgst * vgst / (vgst * d.b + 1.0);
            if vds.value() >= 3.0 / d.alpha {
                core
            } else {
                let knee = -(vds * (d.alpha / 3.0)) + 1.0;
                core * (-(knee * knee * knee) + 1.0)
            }
        }
        MesfetLevel::Curtice => betap * vgst * vgst * (vds * d.alpha).tanh(),
    }
}

pub fn evaluate<T: Real>(d: &MesDerived, frame: Frame, v: [T; 3], gmin: f64) -> Evaluation<T> {
    let [vgs, vds, _] = v;
    let vgd = vgs - vds;

    let igs = schottky_diode(vgs, d.sat_cur, d.vt, gmin);
    let igd = schottky_diode(vgd, d.sat_cur, d.vt, gmin);
    let vgst = vgs - d.vto;
    let ids = drain_current(d, vgst, vds);

    let (czs, czd) = frame.pick(d.czgs, d.czgd);
    let qgs = depletion_charge(vgs, czs, d.pb, GATE_GRADING, d.fc);
    let qgd = depletion_charge(vgd, czd, d.pb, GATE_GRADING, d.fc);

    use Terminal::*;
    Evaluation {
        currents: vec![
            Branch::new(DrainPrime, SourcePrime, ids),
            Branch::new(Gate, SourcePrime, igs),
            Branch::new(Gate, DrainPrime, igd),
        ],
        charges: vec![
            Branch::new(Gate, SourcePrime, qgs),
            Branch::new(Gate, DrainPrime, qgd),
        ],
        threshold: d.vto,
        saturation: vgst.value().max(0.0),
    }
}

/// Limit both gate junctions, first as diodes and then around pinch-off.
pub fn limit(d: &MesDerived, candidate: Bias, previous: Bias, vto: f64) -> Bias {
    let vgs = pnjlim(candidate.vgs, previous.vgs, d.vt, d.vcrit).0;
    let vgd = pnjlim(candidate.vgd(), previous.vgd(), d.vt, d.vcrit).0;
    let vgs = fetlim(vgs, previous.vgs, vto);
    let vgd = fetlim(vgd, previous.vgd(), vto);
    Bias::new(vgs, vgs - vgd, 0.0)
}
