//! Newton load, convergence test, truncation error and initial conditions.

use compact_core::{
    BypassOptions, ChargeHistory, CheckState, InitMode, LoadContext, MnaSystem, SimOptions,
    StateStore, node_voltage, within_tolerance,
};
use nalgebra::DVector;

use super::frame::{Bias, Frame, Terminal};
use super::instance::{FetInstance, OperatingPoint, stamp_conductance, stamp_partials};
use super::{BIAS_SLOTS, FetEquations};
use crate::error::{Error, Result};
use crate::taylor::Dual;

const VGS: usize = 0;
const VDS: usize = 1;
const VBS: usize = 2;

fn charge_slot(offset: usize, k: usize) -> usize {
    offset + BIAS_SLOTS + 2 * k
}

impl<E: FetEquations> FetInstance<E> {
    /// Normalized bias read from a solution vector.
    pub fn solution_bias(&self, solution: &DVector<f64>, polarity: f64) -> Bias {
        let nodes = self.nodes();
        let v = |t: Terminal| node_voltage(solution, nodes[t.index()]);
        let vs = v(Terminal::SourcePrime);
        Bias::new(
            polarity * (v(Terminal::Gate) - vs),
            polarity * (v(Terminal::DrainPrime) - vs),
            polarity * (v(Terminal::Bulk) - vs),
        )
    }

    fn state_offset_or_err(&self) -> Result<usize> {
        self.state_offset
            .ok_or_else(|| Error::NotSetUp(self.name.clone()))
    }

    /// Pick the bias for this load. The flag is true when the bias is
    /// taken verbatim, without limiting or convergence checking.
    fn candidate_bias(
        &self,
        ctx: &LoadContext<'_>,
        derived: &E::Derived,
        solution: &DVector<f64>,
        states: &StateStore,
        offset: usize,
    ) -> (Bias, bool) {
        let polarity = E::polarity(derived);
        let off = E::is_off(&self.params);
        let ic = E::initial_conditions(&self.params);
        match ctx.init {
            InitMode::Junction | InitMode::Fix if off => (Bias::default(), true),
            InitMode::Junction if ic.is_zero() => (E::initial_bias(derived), true),
            InitMode::Junction => (ic.bias(polarity), true),
            InitMode::Transient if ctx.uic => (ic.bias(polarity), true),
            InitMode::Predict => {
                let predict = |slot: usize| {
                    ctx.predictor
                        .extrapolate(states.get(1, offset + slot), states.get(2, offset + slot))
                };
                (Bias::new(predict(VGS), predict(VDS), predict(VBS)), false)
            }
            _ => (self.solution_bias(solution, polarity), false),
        }
    }

    /// Evaluate the instance at the present solution without touching the
    /// matrix or the state store.
    pub fn evaluate(
        &self,
        ctx: &LoadContext<'_>,
        solution: &DVector<f64>,
        states: &StateStore,
    ) -> Result<OperatingPoint> {
        let derived = self.require_derived()?;
        let offset = self.state_offset_or_err()?;
        let (candidate, verbatim) = self.candidate_bias(ctx, derived, solution, states, offset);

        if !verbatim && ctx.bypass_allowed() {
            if let Some(old) = &self.state.op {
                if can_bypass(old, &candidate, &ctx.options.bypass) {
                    log::debug!("{}: bypassed", self.name);
                    let mut op = old.clone();
                    op.bypassed = true;
                    op.limited = false;
                    integrate_charges(&mut op, ctx, states, offset);
                    return Ok(op);
                }
            }
        }

        let (bias, limited) = if verbatim {
            (candidate, false)
        } else {
            let previous = Bias::new(
                states.current(offset + VGS),
                states.current(offset + VDS),
                states.current(offset + VBS),
            );
            let threshold = self
                .state
                .op
                .as_ref()
                .map_or_else(|| E::threshold(derived), |op| op.threshold);
            let limited = E::limit(derived, candidate, previous, threshold);
            (limited, limited != candidate)
        };

        let frame = Frame::resolve(bias.vds);
        if let Some(old) = &self.state.op {
            if old.frame != frame {
                log::trace!("{}: mode {:?} -> {:?}", self.name, old.frame.mode(), frame.mode());
            }
        }
        let v = frame.effective(&bias);
        let vars = [
            Dual::variable(0, v[0]),
            Dual::variable(1, v[1]),
            Dual::variable(2, v[2]),
        ];
        let eval = E::evaluate(derived, frame, vars, ctx.options.gmin);
        let mut op = OperatingPoint::from_evaluation::<E>(frame, bias, E::polarity(derived), eval);
        op.limited = limited;
        integrate_charges(&mut op, ctx, states, offset);

        if !verbatim && !E::is_off(&self.params) {
            let mismatch = self
                .state
                .op
                .as_ref()
                .is_some_and(|old| !currents_agree(old, &op, ctx.options));
            if limited || mismatch {
                ctx.monitor.record_failure(&self.name);
            }
        }
        Ok(op)
    }

    /// Persist an evaluated operating point and stamp it.
    pub fn commit(
        &mut self,
        ctx: &LoadContext<'_>,
        op: OperatingPoint,
        states: &mut StateStore,
        mna: &mut MnaSystem,
    ) -> Result<()> {
        let offset = self.state_offset_or_err()?;
        let derived = self.require_derived()?;
        let handles = self.require_handles()?;

        states.set_current(offset + VGS, op.bias.vgs);
        states.set_current(offset + VDS, op.bias.vds);
        states.set_current(offset + VBS, op.bias.vbs);
        let first_step = ctx.init == InitMode::Transient;
        for (k, charge) in op.charges.iter().enumerate() {
            let slot = charge_slot(offset, k);
            states.set_current(slot, charge.charge);
            if ctx.is_transient() {
                states.set_current(slot + 1, charge.current);
                if first_step {
                    states.set(1, slot, charge.charge);
                    states.set(1, slot + 1, charge.current);
                }
            }
        }

        let nodes = self.nodes();
        let controls = op.frame.controls();
        let veff = op.frame.effective(&op.bias);
        let polarity = op.polarity;
        let stamp_norton = |mna: &mut MnaSystem, from: Terminal, to: Terminal, ieq: f64| {
            mna.add_rhs(nodes[from.index()], -polarity * ieq);
            mna.add_rhs(nodes[to.index()], polarity * ieq);
        };

        for b in &op.currents {
            stamp_partials(mna, handles, (b.from, b.to), &b.partials, &controls, (1.0, 0.0));
            let ieq = b.value - dot(&b.partials, &veff);
            stamp_norton(mna, b.from, b.to, ieq);
        }
        for c in op.charges.iter().filter(|c| c.conductance_factor != 0.0) {
            let geq = c.capacitances.map(|cap| cap * c.conductance_factor);
            stamp_partials(mna, handles, c.pair, &geq, &controls, (1.0, 0.0));
            let ieq = c.current - dot(&geq, &veff);
            stamp_norton(mna, c.pair.0, c.pair.1, ieq);
        }

        let (gd, gs) = E::series_conductance(derived);
        stamp_conductance(mna, handles, Terminal::Drain, Terminal::DrainPrime, gd);
        stamp_conductance(mna, handles, Terminal::Source, Terminal::SourcePrime, gs);

        self.state.op = Some(op);
        // Kernels belong to the previous operating point.
        self.state.kernels = None;
        Ok(())
    }

    /// Evaluate and commit in one step.
    pub fn load(
        &mut self,
        ctx: &LoadContext<'_>,
        solution: &DVector<f64>,
        states: &mut StateStore,
        mna: &mut MnaSystem,
    ) -> Result<()> {
        let op = self.evaluate(ctx, solution, states)?;
        self.commit(ctx, op, states, mna)
    }

    /// Check whether `solution` is consistent with the last linearization.
    pub fn convergence_test(&self, solution: &DVector<f64>, options: &SimOptions) -> CheckState {
        if E::is_off(&self.params) {
            return CheckState::Pass;
        }
        let Some(op) = &self.state.op else {
            return CheckState::Pass;
        };
        let bias = self.solution_bias(solution, op.polarity);
        let predicted = op.predicted_terminal_currents(&bias);
        let actual = op.terminal_currents();
        let agree = predicted
            .iter()
            .zip(&actual)
            .all(|(&p, &a)| within_tolerance(p, a, options.reltol, options.abstol));
        if agree { CheckState::Pass } else { CheckState::Fail }
    }

    /// Largest timestep allowed by the truncation error of every charge.
    pub fn truncation_timestep(&self, ctx: &LoadContext<'_>, states: &StateStore) -> f64 {
        let Some(offset) = self.state_offset else {
            return f64::INFINITY;
        };
        (0..E::CHARGE_PAIRS.len())
            .map(|k| {
                let slot = charge_slot(offset, k);
                ctx.integrator
                    .truncation_timestep(states, slot, slot + 1, ctx.options)
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// Fill initial conditions the user did not give from `solution`.
    pub fn set_initial_conditions(&mut self, solution: &DVector<f64>) {
        let nodes = self.nodes();
        let v = |t: Terminal| node_voltage(solution, nodes[t.index()]);
        let (vd, vg, vs, vb) = (
            v(Terminal::Drain),
            v(Terminal::Gate),
            v(Terminal::Source),
            v(Terminal::Bulk),
        );
        let ic = E::initial_conditions_mut(&mut self.params);
        ic.vds.default_to(vd - vs);
        ic.vgs.default_to(vg - vs);
        ic.vbs.default_to(vb - vs);
    }
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Integrate every charge of `op` when the analysis calls for it.
fn integrate_charges(
    op: &mut OperatingPoint,
    ctx: &LoadContext<'_>,
    states: &StateStore,
    offset: usize,
) {
    let first_step = ctx.init == InitMode::Transient;
    for (k, charge) in op.charges.iter_mut().enumerate() {
        if ctx.is_transient() {
            let slot = charge_slot(offset, k);
            let history = ChargeHistory {
                states,
                charge_slot: slot,
                current_slot: slot + 1,
                first_step,
            };
            let companion = ctx.integrator.integrate(charge.charge, 1.0, history);
            charge.current = companion.ceq;
            charge.conductance_factor = companion.geq;
        } else {
            charge.current = 0.0;
            charge.conductance_factor = 0.0;
        }
    }
}

/// Whether the fresh terminal currents match what the previous
/// linearization predicts at the new bias.
fn currents_agree(old: &OperatingPoint, new: &OperatingPoint, options: &SimOptions) -> bool {
    let predicted = old.predicted_terminal_currents(&new.bias);
    let actual = new.terminal_currents();
    predicted
        .iter()
        .zip(&actual)
        .all(|(&p, &a)| within_tolerance(p, a, options.reltol, options.abstol))
}

/// Whether `candidate` is close enough to the bias of `op` that
/// re-evaluating would not change the stamps meaningfully.
fn can_bypass(op: &OperatingPoint, candidate: &Bias, opts: &BypassOptions) -> bool {
    if Frame::resolve(candidate.vds) != op.frame {
        return false;
    }
    let voltages_close = candidate
        .as_array()
        .iter()
        .zip(op.bias.as_array())
        .all(|(&new, old)| {
            new == old || (new - old).abs() < opts.reltol * new.abs().max(old.abs()) + opts.vntol
        });
    if !voltages_close {
        return false;
    }
    let predicted = op.predicted_terminal_currents(candidate);
    let actual = op.terminal_currents();
    predicted
        .iter()
        .zip(&actual)
        .all(|(&p, &a)| within_tolerance(p, a, opts.reltol, opts.abstol))
}
