//! Numerical integration of device charges.
//!
//! A nonlinear charge `q(v)` is turned into a companion model: an equivalent
//! conductance `geq = ag0·C` in parallel with the present estimate of
//! `dq/dt`. The coefficients `ag[]` depend on the method, the order and the
//! recent step sizes; they are recomputed whenever the outer solver sets a
//! new timestep.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::options::SimOptions;
use crate::state::StateStore;

/// Highest supported Gear order.
pub const MAX_GEAR_ORDER: usize = 6;

/// Truncation error constants for Gear orders 1..=6.
const GEAR_COEFF: [f64; 6] = [
    0.5,
    0.2222222222,
    0.1363636364,
    0.096,
    0.07299270073,
    0.05830903790,
];

/// Truncation error constants for trapezoidal orders 1..=2.
const TRAP_COEFF: [f64; 2] = [0.5, 0.08333333333];

/// Weight of the present point in second-order trapezoidal integration.
const XMU: f64 = 0.5;

/// Numerical integration method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrationMethod {
    /// Trapezoidal rule (order 1 is backward Euler).
    #[default]
    Trapezoidal,
    /// Backward differentiation formulas.
    Gear,
}

impl IntegrationMethod {
    fn max_order(self) -> usize {
        match self {
            IntegrationMethod::Trapezoidal => 2,
            IntegrationMethod::Gear => MAX_GEAR_ORDER,
        }
    }

    fn name(self) -> &'static str {
        match self {
            IntegrationMethod::Trapezoidal => "trapezoidal",
            IntegrationMethod::Gear => "gear",
        }
    }
}

/// Companion model of one integrated charge.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Companion {
    /// Equivalent conductance (S).
    pub geq: f64,
    /// Present charge current estimate `dq/dt` (A).
    pub ceq: f64,
}

/// Where a charge keeps its history in the state store.
#[derive(Debug, Clone, Copy)]
pub struct ChargeHistory<'a> {
    pub states: &'a StateStore,
    /// Slot holding the charge.
    pub charge_slot: usize,
    /// Slot holding the charge current.
    pub current_slot: usize,
    /// First timepoint: older generations are taken equal to the present
    /// charge and the previous current is zero.
    pub first_step: bool,
}

/// Integration primitive consumed by device models.
pub trait ChargeIntegrator: Send + Sync {
    /// Integrate `charge` at the present timepoint.
    ///
    /// `geq` is linear in `capacitance`; a caller with several controlling
    /// voltages can integrate once with unit capacitance and scale.
    fn integrate(&self, charge: f64, capacitance: f64, history: ChargeHistory<'_>) -> Companion;

    /// Factor mapping a capacitance to its equivalent conductance.
    fn conductance_factor(&self) -> f64;

    /// Largest timestep keeping the local truncation error of the charge in
    /// `charge_slot` within tolerance.
    fn truncation_timestep(
        &self,
        states: &StateStore,
        charge_slot: usize,
        current_slot: usize,
        options: &SimOptions,
    ) -> f64;
}

/// Voltage predictor used on predictor iterations.
pub trait Predictor: Send + Sync {
    /// Extrapolate the present value from the last two accepted ones.
    fn extrapolate(&self, prev: f64, prev2: f64) -> f64;
}

/// Trapezoidal / Gear integrator with variable step history.
#[derive(Debug, Clone)]
pub struct Integrator {
    method: IntegrationMethod,
    order: usize,
    /// Step sizes, most recent first; `deltas[0]` is the present step.
    deltas: [f64; MAX_GEAR_ORDER + 1],
    ag: [f64; MAX_GEAR_ORDER + 1],
}

impl Default for Integrator {
    /// Second-order trapezoidal.
    fn default() -> Self {
        Self {
            method: IntegrationMethod::Trapezoidal,
            order: 2,
            deltas: [0.0; MAX_GEAR_ORDER + 1],
            ag: [0.0; MAX_GEAR_ORDER + 1],
        }
    }
}

impl Integrator {
    /// Create an integrator. Coefficients are zero until the first
    /// [`set_timestep`](Self::set_timestep), which makes every companion a
    /// pure DC element.
    pub fn new(method: IntegrationMethod, order: usize) -> Result<Self> {
        Self::check_order(method, order)?;
        Ok(Self {
            method,
            order,
            deltas: [0.0; MAX_GEAR_ORDER + 1],
            ag: [0.0; MAX_GEAR_ORDER + 1],
        })
    }

    fn check_order(method: IntegrationMethod, order: usize) -> Result<()> {
        if order == 0 || order > method.max_order() {
            return Err(Error::InvalidOrder {
                method: method.name(),
                order,
            });
        }
        Ok(())
    }

    pub fn method(&self) -> IntegrationMethod {
        self.method
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Present timestep.
    pub fn delta(&self) -> f64 {
        self.deltas[0]
    }

    /// Integration coefficients for the present step.
    pub fn coefficients(&self) -> &[f64] {
        &self.ag[..=self.order]
    }

    /// Change the order, keeping the step history.
    pub fn set_order(&mut self, order: usize) -> Result<()> {
        Self::check_order(self.method, order)?;
        self.order = order;
        self.compute_coefficients();
        Ok(())
    }

    /// Advance to a new timestep of size `delta`.
    ///
    /// Older steps that were never set take the new value, so the first
    /// steps see a uniform history.
    pub fn set_timestep(&mut self, delta: f64) {
        self.deltas.rotate_right(1);
        self.deltas[0] = delta;
        for d in self.deltas.iter_mut().skip(1) {
            if *d <= 0.0 {
                *d = delta;
            }
        }
        self.compute_coefficients();
    }

    fn compute_coefficients(&mut self) {
        self.ag = [0.0; MAX_GEAR_ORDER + 1];
        let delta = self.deltas[0];
        if delta <= 0.0 {
            return;
        }
        match (self.method, self.order) {
            (IntegrationMethod::Trapezoidal, 1) => {
                self.ag[0] = 1.0 / delta;
                self.ag[1] = -1.0 / delta;
            }
            (IntegrationMethod::Trapezoidal, _) => {
                self.ag[0] = 1.0 / delta / (1.0 - XMU);
                self.ag[1] = XMU / (1.0 - XMU);
            }
            (IntegrationMethod::Gear, order) => self.compute_gear(order),
        }
    }

    /// Solve for BDF weights that differentiate every polynomial of degree
    /// `order` exactly at the present timepoint.
    fn compute_gear(&mut self, order: usize) {
        let n = order + 1;
        let delta = self.deltas[0];
        // Offsets (t_{n-i} - t_n) / delta, kept near unity for conditioning.
        let mut offsets = vec![0.0; n];
        for i in 1..n {
            offsets[i] = offsets[i - 1] - self.deltas[i - 1] / delta;
        }
        let vandermonde = DMatrix::from_fn(n, n, |m, i| offsets[i].powi(m as i32));
        let mut rhs = DVector::zeros(n);
        rhs[1] = 1.0;
        match vandermonde.lu().solve(&rhs) {
            Some(ag) => {
                for (slot, value) in self.ag.iter_mut().zip(ag.iter()) {
                    *slot = *value / delta;
                }
            }
            None => log::warn!("singular gear coefficient system for order {order}"),
        }
    }

    fn history_charge(&self, charge: f64, history: &ChargeHistory<'_>, generation: usize) -> f64 {
        if history.first_step {
            charge
        } else {
            history.states.get(generation, history.charge_slot)
        }
    }
}

impl ChargeIntegrator for Integrator {
    fn integrate(&self, charge: f64, capacitance: f64, history: ChargeHistory<'_>) -> Companion {
        let ccap = match (self.method, self.order) {
            (IntegrationMethod::Trapezoidal, 1) => {
                self.ag[0] * charge + self.ag[1] * self.history_charge(charge, &history, 1)
            }
            (IntegrationMethod::Trapezoidal, _) => {
                let prev_current = if history.first_step {
                    0.0
                } else {
                    history.states.get(1, history.current_slot)
                };
                -prev_current * self.ag[1]
                    + self.ag[0] * (charge - self.history_charge(charge, &history, 1))
            }
            (IntegrationMethod::Gear, order) => {
                let mut ccap = self.ag[0] * charge;
                for generation in 1..=order {
                    ccap += self.ag[generation] * self.history_charge(charge, &history, generation);
                }
                ccap
            }
        };
        Companion {
            geq: self.ag[0] * capacitance,
            ceq: ccap,
        }
    }

    fn conductance_factor(&self) -> f64 {
        self.ag[0]
    }

    fn truncation_timestep(
        &self,
        states: &StateStore,
        charge_slot: usize,
        current_slot: usize,
        options: &SimOptions,
    ) -> f64 {
        let delta = self.deltas[0];
        if delta <= 0.0 {
            return f64::INFINITY;
        }
        let order = self.order;

        let volttol = options.abstol
            + options.reltol
                * states
                    .current(current_slot)
                    .abs()
                    .max(states.previous(current_slot).abs());
        let chargetol = states
            .current(charge_slot)
            .abs()
            .max(states.previous(charge_slot).abs());
        let chargetol = options.reltol * chargetol.max(options.chgtol) / delta;
        let tol = volttol.max(chargetol);

        // Divided differences of the charge over the last order + 2 points.
        let mut diff: Vec<f64> = (0..=order + 1).map(|g| states.get(g, charge_slot)).collect();
        let mut deltmp: Vec<f64> = self.deltas[..=order].to_vec();
        let mut j = order;
        loop {
            for i in 0..=j {
                diff[i] = (diff[i] - diff[i + 1]) / deltmp[i];
            }
            if j == 0 {
                break;
            }
            j -= 1;
            for i in 0..=j {
                deltmp[i] = deltmp[i + 1] + self.deltas[i];
            }
        }

        let factor = match self.method {
            IntegrationMethod::Gear => GEAR_COEFF[order - 1],
            IntegrationMethod::Trapezoidal => TRAP_COEFF[order - 1],
        };
        let del = options.trtol * tol / options.abstol.max(factor * diff[0].abs());
        match order {
            1 => del,
            2 => del.sqrt(),
            _ => (del.ln() / order as f64).exp(),
        }
    }
}

impl Predictor for Integrator {
    fn extrapolate(&self, prev: f64, prev2: f64) -> f64 {
        let older = self.deltas[1];
        if older <= 0.0 {
            return prev;
        }
        let xfact = self.deltas[0] / older;
        (1.0 + xfact) * prev - xfact * prev2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_charges(charges: &[f64]) -> StateStore {
        let mut states = StateStore::default();
        states.reserve(2);
        for (generation, &q) in charges.iter().enumerate() {
            states.set(generation, 0, q);
        }
        states
    }

    #[test]
    fn test_invalid_order() {
        assert!(Integrator::new(IntegrationMethod::Trapezoidal, 3).is_err());
        assert!(Integrator::new(IntegrationMethod::Gear, 0).is_err());
        assert!(Integrator::new(IntegrationMethod::Gear, 7).is_err());
        assert!(Integrator::new(IntegrationMethod::Gear, 6).is_ok());
    }

    #[test]
    fn test_trapezoidal_coefficients() {
        let mut integ = Integrator::new(IntegrationMethod::Trapezoidal, 1).unwrap();
        integ.set_timestep(1e-9);
        assert!((integ.coefficients()[0] - 1e9).abs() < 1e-3);
        assert!((integ.coefficients()[1] + 1e9).abs() < 1e-3);

        integ.set_order(2).unwrap();
        assert!((integ.coefficients()[0] - 2e9).abs() < 1e-3);
        assert!((integ.coefficients()[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_gear2_uniform_step() {
        let mut integ = Integrator::new(IntegrationMethod::Gear, 2).unwrap();
        integ.set_timestep(1.0);
        let ag = integ.coefficients();
        assert!((ag[0] - 1.5).abs() < 1e-10);
        assert!((ag[1] + 2.0).abs() < 1e-10);
        assert!((ag[2] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_constant_charge_has_no_current() {
        let q = 3.3e-12;
        let states = store_with_charges(&[q; 8]);
        let history = ChargeHistory {
            states: &states,
            charge_slot: 0,
            current_slot: 1,
            first_step: false,
        };
        let configs = [
            (IntegrationMethod::Trapezoidal, 1),
            (IntegrationMethod::Trapezoidal, 2),
            (IntegrationMethod::Gear, 1),
            (IntegrationMethod::Gear, 3),
            (IntegrationMethod::Gear, 6),
        ];
        for (method, order) in configs {
            let mut integ = Integrator::new(method, order).unwrap();
            integ.set_timestep(1e-9);
            let comp = integ.integrate(q, 1e-12, history);
            assert!(comp.ceq.abs() < 1e-12, "{method:?} order {order}: {}", comp.ceq);
            assert!((comp.geq - integ.conductance_factor() * 1e-12).abs() < 1e-18);
        }
    }

    #[test]
    fn test_first_step_ignores_history() {
        let states = store_with_charges(&[0.0, 5.0, 7.0]);
        let mut integ = Integrator::new(IntegrationMethod::Trapezoidal, 1).unwrap();
        integ.set_timestep(1e-6);
        let comp = integ.integrate(
            1e-9,
            0.0,
            ChargeHistory {
                states: &states,
                charge_slot: 0,
                current_slot: 1,
                first_step: true,
            },
        );
        assert_eq!(comp.ceq, 0.0);
    }

    #[test]
    fn test_backward_euler_current() {
        let states = store_with_charges(&[0.0, 1e-12]);
        let mut integ = Integrator::new(IntegrationMethod::Trapezoidal, 1).unwrap();
        integ.set_timestep(1e-9);
        let comp = integ.integrate(
            2e-12,
            0.0,
            ChargeHistory {
                states: &states,
                charge_slot: 0,
                current_slot: 1,
                first_step: false,
            },
        );
        assert!((comp.ceq - 1e-3).abs() < 1e-12);
    }

    #[test]
    fn test_truncation_prefers_smooth_charge() {
        let opts = SimOptions::default();
        let mut integ = Integrator::new(IntegrationMethod::Trapezoidal, 1).unwrap();
        integ.set_timestep(1e-9);

        // q = k t and q = k t² sampled at t = 3, 2, 1 ns.
        let linear = store_with_charges(&[3e-12, 2e-12, 1e-12]);
        let quadratic = store_with_charges(&[9e-12, 4e-12, 1e-12]);
        let smooth = integ.truncation_timestep(&linear, 0, 1, &opts);
        let curved = integ.truncation_timestep(&quadratic, 0, 1, &opts);
        assert!(curved.is_finite());
        assert!(curved < smooth);
    }

    #[test]
    fn test_predictor() {
        let mut integ = Integrator::new(IntegrationMethod::Trapezoidal, 1).unwrap();
        integ.set_timestep(1e-9);
        integ.set_timestep(2e-9);
        // Linear extrapolation across a step twice as long as the last.
        assert!((integ.extrapolate(1.0, 0.5) - 2.0).abs() < 1e-12);
    }
}
