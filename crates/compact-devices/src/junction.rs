//! Junction currents and depletion charges shared by the FET families.

use crate::taylor::Real;

/// Boltzmann constant (J/K).
pub const BOLTZMANN: f64 = 1.3806226e-23;
/// Elementary charge (C).
pub const CHARGE: f64 = 1.6021918e-19;
/// Reference temperature for band-gap and junction-potential scaling (K).
pub const REFTEMP: f64 = 300.15;

/// Thermal voltage kT/q at `temp` kelvin.
pub fn thermal_voltage(temp: f64) -> f64 {
    BOLTZMANN * temp / CHARGE
}

/// Silicon band gap (eV) at `temp` kelvin.
pub fn energy_gap(temp: f64) -> f64 {
    1.16 - (7.02e-4 * temp * temp) / (temp + 1108.0)
}

/// Current of a bulk PN junction with a `gmin` shunt.
///
/// Reverse bias is linearized at the zero-bias conductance `is/vt`, which
/// keeps the reverse current continuous and avoids evaluating the
/// exponential far from the origin.
pub fn bulk_diode<T: Real>(v: T, is: f64, vt: f64, gmin: f64) -> T {
    if v.value() <= 0.0 {
        v * (is / vt + gmin)
    } else {
        ((v / vt).exp() - 1.0) * is + v * gmin
    }
}

/// Current of a Schottky gate diode with a `gmin` shunt.
///
/// Below `-5·vt` the exponential has vanished and the current saturates at
/// `-is`.
pub fn schottky_diode<T: Real>(v: T, is: f64, vt: f64, gmin: f64) -> T {
    if v.value() <= -5.0 * vt {
        v * gmin - is
    } else {
        ((v / vt).exp() - 1.0) * is + v * gmin
    }
}

/// Depletion charge of a junction with zero-bias capacitance `cj0`.
///
/// Above `fc·pb` the capacitance is continued linearly so the charge stays
/// finite through forward bias.
pub fn depletion_charge<T: Real>(v: T, cj0: f64, pb: f64, m: f64, fc: f64) -> T {
    if cj0 == 0.0 {
        return T::zero();
    }
    let vdep = fc * pb;
    let log_grading = (1.0 - m).abs() < 1e-9;
    if v.value() < vdep {
        let arg = -(v / pb) + 1.0;
        if log_grading {
            -(arg.ln() * (pb * cj0))
        } else {
            (-(arg.ln() * (1.0 - m)).exp() + 1.0) * (pb * cj0 / (1.0 - m))
        }
    } else {
        let f1 = if log_grading {
            -pb * (1.0 - fc).ln()
        } else {
            pb * (1.0 - (1.0 - fc).powf(1.0 - m)) / (1.0 - m)
        };
        let f2 = (1.0 - fc).powf(1.0 + m);
        let f3 = 1.0 - fc * (1.0 + m);
        let dv = v - vdep;
        let sq = v * v - vdep * vdep;
        ((dv * f3 + sq * (m / (2.0 * pb))) / f2 + f1) * cj0
    }
}
