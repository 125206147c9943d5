//! Level-1 MOSFET equations.
//!
//! Shichman-Hodges drain current with body effect, bulk junction diodes and
//! a charge-based gate model:
//!
//! ```text
//! Linear:     Id = β(1 + λVds)·Vds·(Vgst - Vds/2)
//! Saturation: Id = β(1 + λVds)·Vgst²/2
//! Vth = Vbi + γ·√(φ - Vbs)
//! ```
//!
//! The gate charge splits into inversion charge shared between source and
//! drain and depletion charge towards the bulk. Everything is written for
//! the forward orientation and evaluated on any [`Real`] scalar.

use compact_core::limit::{fetlim, limvds, pnjlim};

use super::derived::MosDerived;
use crate::fet::{Bias, Branch, Evaluation, Frame, Terminal};
use crate::junction::{bulk_diode, depletion_charge};
use crate::taylor::Real;

/// Physical terminal pairs carrying a charge.
pub const CHARGE_PAIRS: [(Terminal, Terminal); 5] = [
    (Terminal::Gate, Terminal::SourcePrime),
    (Terminal::Gate, Terminal::DrainPrime),
    (Terminal::Gate, Terminal::Bulk),
    (Terminal::Bulk, Terminal::SourcePrime),
    (Terminal::Bulk, Terminal::DrainPrime),
];

/// Operating region, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MosRegion {
    Cutoff,
    Linear,
    Saturation,
}

/// Region at the effective bias (vgs, vds, vbs).
pub fn region(d: &MosDerived, v: [f64; 3]) -> MosRegion {
    let vgst = v[0] - threshold(d, v[2]);
    if vgst <= 0.0 {
        MosRegion::Cutoff
    } else if vgst <= v[1] {
        MosRegion::Saturation
    } else {
        MosRegion::Linear
    }
}

/// √(φ - vbs), continued smoothly into forward body bias.
fn body_factor<T: Real>(d: &MosDerived, vbs: T) -> T {
    if vbs.value() <= 0.0 {
        (-vbs + d.phi).sqrt()
    } else {
        let sphi = d.phi.sqrt();
        (-(vbs * (0.5 / sphi)) + sphi).max(T::zero())
    }
}

fn threshold<T: Real>(d: &MosDerived, vbs: T) -> T {
    body_factor(d, vbs) * d.gamma + d.vbi
}

/// Gate-to-bulk depletion charge at gate-bulk voltage `vgb`.
fn gate_bulk_charge<T: Real>(d: &MosDerived, vgb: T) -> T {
    let x = vgb - (d.vbi - d.phi);
    if x.value() <= 0.0 || d.gamma <= 0.0 {
        return x * d.cox_total;
    }
    let g2 = d.gamma * d.gamma;
    ((x * (4.0 / g2) + 1.0).sqrt() - 1.0) * (0.5 * d.cox_total * g2)
}

/// Intrinsic gate charge split into (source, drain, bulk) parts.
fn intrinsic_charges<T: Real>(d: &MosDerived, vgs: T, vds: T, vbs: T, von: T) -> (T, T, T) {
    let vgst = vgs - von;
    if vgst.value() <= 0.0 {
        return (T::zero(), T::zero(), gate_bulk_charge(d, vgs - vbs));
    }
    // Above threshold the depletion charge is pinned at its threshold value.
    let qb = gate_bulk_charge(d, von - vbs);
    let vde = vds.min(vgst);
    let mid = vgst - vde * 0.5;
    let qi = (mid + vde * vde / (mid * 12.0)) * d.cox_total;
    let fd = -(vde / vgst) * 0.1 + 0.5;
    let qd = qi * fd;
    (qi - qd, qd, qb)
}

pub fn evaluate<T: Real>(d: &MosDerived, frame: Frame, v: [T; 3], gmin: f64) -> Evaluation<T> {
    let [vgs, vds, vbs] = v;
    let vgd = vgs - vds;
    let vbd = vbs - vds;
    let (src, drn) = frame.pick(d.source, d.drain);

    let ibs = bulk_diode(vbs, src.sat_cur, d.vt, gmin);
    let ibd = bulk_diode(vbd, drn.sat_cur, d.vt, gmin);

    let von = threshold(d, vbs);
    let vgst = vgs - von;
    let ids = if vgst.value() <= 0.0 {
        T::zero()
    } else {
        let betap = (vds * d.lambda + 1.0) * d.beta;
        if vgst.value() <= vds.value() {
            betap * vgst * vgst * 0.5
        } else {
            betap * vds * (vgst - vds * 0.5)
        }
    };

    let (cgs_ov, cgd_ov) = frame.pick(d.cgs_overlap, d.cgd_overlap);
    let mut qgs = vgs * cgs_ov;
    let mut qgd = vgd * cgd_ov;
    let mut qgb = (vgs - vbs) * d.cgb_overlap;
    if d.cox_total > 0.0 {
        let (qs, qd, qb) = intrinsic_charges(d, vgs, vds, vbs, von);
        qgs = qgs + qs;
        qgd = qgd + qd;
        qgb = qgb + qb;
    }
    let junction = |v: T, side: &super::derived::JunctionSide| {
        depletion_charge(v, side.czb, d.pb, d.mj, d.fc)
            + depletion_charge(v, side.czbsw, d.pb, d.mjsw, d.fc)
    };
    let qbs = junction(vbs, &src);
    let qbd = junction(vbd, &drn);

    use Terminal::*;
    Evaluation {
        currents: vec![
            Branch::new(DrainPrime, SourcePrime, ids),
            Branch::new(Bulk, SourcePrime, ibs),
            Branch::new(Bulk, DrainPrime, ibd),
        ],
        charges: vec![
            Branch::new(Gate, SourcePrime, qgs),
            Branch::new(Gate, DrainPrime, qgd),
            Branch::new(Gate, Bulk, qgb),
            Branch::new(Bulk, SourcePrime, qbs),
            Branch::new(Bulk, DrainPrime, qbd),
        ],
        threshold: von.value(),
        saturation: vgst.value().max(0.0),
    }
}

/// Damp a Newton step.
///
/// The gate is limited on whichever of source and drain acted as the
/// source last iteration, the drain-source step is bounded, and the
/// forward-biasable bulk junction goes through the pn limiter.
pub fn limit(d: &MosDerived, candidate: Bias, previous: Bias, von: f64) -> Bias {
    let (vgs, vds) = if previous.vds >= 0.0 {
        let vgs = fetlim(candidate.vgs, previous.vgs, von);
        let vds = limvds(vgs - candidate.vgd(), previous.vds);
        (vgs, vds)
    } else {
        let vgd = fetlim(candidate.vgd(), previous.vgd(), von);
        let vds = -limvds(-(candidate.vgs - vgd), -previous.vds);
        (vgd + vds, vds)
    };
    let vbs = if vds >= 0.0 {
        pnjlim(candidate.vbs, previous.vbs, d.vt, d.source.vcrit).0
    } else {
        pnjlim(candidate.vbs - vds, previous.vbd(), d.vt, d.drain.vcrit).0 + vds
    };
    Bias::new(vgs, vds, vbs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fet::FetEquations;
    use crate::mosfet::{Mos1, MosModel, MosParams};
    use crate::taylor::Dual;
    use compact_core::SimOptions;

    fn derived(configure: impl FnOnce(&mut MosModel)) -> MosDerived {
        let options = SimOptions::default();
        let mut model = MosModel::nmos();
        configure(&mut model);
        Mos1::setup_model(&mut model, &options);
        let mut params = MosParams::default();
        params.w.set(10e-6);
        params.l.set(1e-6);
        Mos1::setup_instance(&model, &mut params, &options);
        MosDerived::compute(&model, &params, &options)
    }

    fn drain_current(eval: &Evaluation<f64>) -> f64 {
        eval.currents[0].value
    }

    #[test]
    fn test_cutoff() {
        let d = derived(|m| m.vto.set(0.7));
        let eval = evaluate(&d, Frame::FORWARD, [0.5, 1.0, 0.0], 0.0);
        assert_eq!(drain_current(&eval), 0.0);
        assert_eq!(region(&d, [0.5, 1.0, 0.0]), MosRegion::Cutoff);
    }

    #[test]
    fn test_saturation_current() {
        let d = derived(|m| {
            m.vto.set(0.7);
            m.kp.set(1e-4);
        });
        let eval = evaluate(&d, Frame::FORWARD, [1.7, 2.0, 0.0], 0.0);
        // β = 1e-4 · 10; Vgst = 1
        assert!((drain_current(&eval) - 0.5e-3).abs() < 1e-12);
        assert_eq!(region(&d, [1.7, 2.0, 0.0]), MosRegion::Saturation);
    }

    #[test]
    fn test_linear_current() {
        let d = derived(|m| {
            m.vto.set(0.7);
            m.kp.set(1e-4);
        });
        let eval = evaluate(&d, Frame::FORWARD, [1.7, 0.5, 0.0], 0.0);
        let expected = 1e-3 * 0.5 * (1.0 - 0.25);
        assert!((drain_current(&eval) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_body_effect_raises_threshold() {
        let d = derived(|m| m.gamma.set(0.5));
        let zero = evaluate(&d, Frame::FORWARD, [1.5, 1.0, 0.0], 0.0);
        let back = evaluate(&d, Frame::FORWARD, [1.5, 1.0, -1.0], 0.0);
        assert!(back.threshold > zero.threshold);
        assert!(drain_current(&back) < drain_current(&zero));
    }

    #[test]
    fn test_derivatives_match_differences() {
        let d = derived(|m| {
            m.gamma.set(0.4);
            m.lambda.set(0.02);
            m.tox.set(20e-9);
            m.cgso.set(1e-10);
        });
        let v = [1.4, 0.3, -0.5];
        let vars = [
            Dual::variable(0, v[0]),
            Dual::variable(1, v[1]),
            Dual::variable(2, v[2]),
        ];
        let dual = evaluate(&d, Frame::FORWARD, vars, 1e-12);
        let h = 1e-7;
        for k in 0..3 {
            let mut up = v;
            let mut dn = v;
            up[k] += h;
            dn[k] -= h;
            let fu = evaluate(&d, Frame::FORWARD, up, 1e-12);
            let fd = evaluate(&d, Frame::FORWARD, dn, 1e-12);
            for (i, branch) in dual.currents.iter().enumerate() {
                let fd_slope = (fu.currents[i].value - fd.currents[i].value) / (2.0 * h);
                assert!((branch.value.d[k] - fd_slope).abs() < 1e-6 * (1.0 + fd_slope.abs()));
            }
            for (i, branch) in dual.charges.iter().enumerate() {
                let fd_slope = (fu.charges[i].value - fd.charges[i].value) / (2.0 * h);
                assert!((branch.value.d[k] - fd_slope).abs() < 1e-6 * (1.0 + fd_slope.abs()) * 1e-12);
            }
        }
    }

    #[test]
    fn test_inversion_charge_continuous_at_threshold() {
        let d = derived(|m| {
            m.tox.set(20e-9);
            m.gamma.set(0.3);
        });
        let von = evaluate(&d, Frame::FORWARD, [0.0, 0.5, 0.0], 0.0).threshold;
        let below = evaluate(&d, Frame::FORWARD, [von - 1e-9, 0.5, 0.0], 0.0);
        let above = evaluate(&d, Frame::FORWARD, [von + 1e-9, 0.5, 0.0], 0.0);
        for k in 0..3 {
            assert!((below.charges[k].value - above.charges[k].value).abs() < 1e-20);
        }
    }

    #[test]
    fn test_limit_passes_small_steps() {
        let d = derived(|_| {});
        let previous = Bias::new(1.0, 1.0, -0.5);
        let candidate = Bias::new(1.0625, 1.125, -0.4375);
        assert_eq!(limit(&d, candidate, previous, 0.7), candidate);
    }

    #[test]
    fn test_limit_damps_bulk_forward_bias() {
        let d = derived(|_| {});
        let previous = Bias::new(1.0, 1.0, 0.0);
        let candidate = Bias::new(1.0, 1.0, 3.0);
        let limited = limit(&d, candidate, previous, 0.7);
        assert!(limited.vbs < 1.0);
        assert!(limited.vbs > 0.0);
    }
}
