//! FET instances and their cached linearization.

use compact_core::{ElementHandle, MnaSystem, NodeId};

use super::distortion::DistortionKernels;
use super::frame::{Bias, Frame, Terminal};
use super::{Evaluation, FetEquations};
use crate::error::{Error, Result};
use crate::taylor::Dual;

pub(crate) type HandleTable = [[ElementHandle; Terminal::COUNT]; Terminal::COUNT];

/// A linearized current between two physical terminals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearBranch {
    pub from: Terminal,
    pub to: Terminal,
    /// Normalized current (A).
    pub value: f64,
    /// Partials with respect to the effective (vgs, vds, vbs) (S).
    pub partials: [f64; 3],
}

/// A linearized charge between two physical terminals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearCharge {
    pub pair: (Terminal, Terminal),
    /// Normalized charge (C).
    pub charge: f64,
    /// Partials with respect to the effective (vgs, vds, vbs) (F).
    pub capacitances: [f64; 3],
    /// Integrated charge current (A); zero outside transient analysis.
    pub current: f64,
    /// Integrator factor turning capacitance into conductance; zero when
    /// the charge is not integrated.
    pub conductance_factor: f64,
}

/// Everything a load leaves behind for the restamping variants.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatingPoint {
    pub frame: Frame,
    /// Normalized physical bias after limiting.
    pub bias: Bias,
    pub polarity: f64,
    pub currents: Vec<LinearBranch>,
    /// Charges in the family's slot order.
    pub charges: Vec<LinearCharge>,
    pub threshold: f64,
    pub saturation: f64,
    /// Limiting changed the bias.
    pub limited: bool,
    /// The previous operating point was reused.
    pub bypassed: bool,
}

impl OperatingPoint {
    /// Translate an effective-frame evaluation into physical terms.
    pub(crate) fn from_evaluation<E: FetEquations>(
        frame: Frame,
        bias: Bias,
        polarity: f64,
        eval: Evaluation<Dual>,
    ) -> Self {
        let currents = eval
            .currents
            .iter()
            .map(|b| LinearBranch {
                from: frame.map(b.from),
                to: frame.map(b.to),
                value: b.value.v,
                partials: b.value.d,
            })
            .collect();

        let mut charges: Vec<LinearCharge> = E::CHARGE_PAIRS
            .iter()
            .map(|&pair| LinearCharge {
                pair,
                charge: 0.0,
                capacitances: [0.0; 3],
                current: 0.0,
                conductance_factor: 0.0,
            })
            .collect();
        for q in &eval.charges {
            let pair = (frame.map(q.from), frame.map(q.to));
            let (slot, sign) = match charge_slot::<E>(pair) {
                Some(found) => found,
                None => {
                    log::warn!("{}: charge between {:?} has no state slot", E::FAMILY, pair);
                    continue;
                }
            };
            charges[slot].charge += sign * q.value.v;
            for k in 0..3 {
                charges[slot].capacitances[k] += sign * q.value.d[k];
            }
        }

        Self {
            frame,
            bias,
            polarity,
            currents,
            charges,
            threshold: eval.threshold,
            saturation: eval.saturation,
            limited: false,
            bypassed: false,
        }
    }

    /// Current between two physical terminals, in either direction.
    pub fn current(&self, from: Terminal, to: Terminal) -> Option<LinearBranch> {
        self.currents.iter().find_map(|b| {
            if b.from == from && b.to == to {
                Some(*b)
            } else if b.from == to && b.to == from {
                Some(LinearBranch {
                    from,
                    to,
                    value: -b.value,
                    partials: b.partials.map(|p| -p),
                })
            } else {
                None
            }
        })
    }

    /// Charge stored in the slot for a physical terminal pair.
    pub fn charge(&self, from: Terminal, to: Terminal) -> Option<&LinearCharge> {
        self.charges.iter().find(|c| c.pair == (from, to))
    }

    /// Normalized current flowing into the device at each terminal.
    pub fn terminal_currents(&self) -> [f64; Terminal::COUNT] {
        let mut total = [0.0; Terminal::COUNT];
        for b in &self.currents {
            total[b.from.index()] += b.value;
            total[b.to.index()] -= b.value;
        }
        total
    }

    /// Terminal currents extrapolated from this linearization to `bias`.
    pub fn predicted_terminal_currents(&self, bias: &Bias) -> [f64; Terminal::COUNT] {
        let old = self.frame.effective(&self.bias);
        let new = self.frame.effective(bias);
        let mut total = [0.0; Terminal::COUNT];
        for b in &self.currents {
            let mut value = b.value;
            for k in 0..3 {
                value += b.partials[k] * (new[k] - old[k]);
            }
            total[b.from.index()] += value;
            total[b.to.index()] -= value;
        }
        total
    }
}

fn charge_slot<E: FetEquations>(pair: (Terminal, Terminal)) -> Option<(usize, f64)> {
    E::CHARGE_PAIRS.iter().enumerate().find_map(|(slot, &p)| {
        if p == pair {
            Some((slot, 1.0))
        } else if p == (pair.1, pair.0) {
            Some((slot, -1.0))
        } else {
            None
        }
    })
}

/// Every field a load-family call may change. Backups copy exactly this.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstanceState {
    pub op: Option<OperatingPoint>,
    pub kernels: Option<DistortionKernels>,
}

/// A placed FET.
#[derive(Debug, Clone)]
pub struct FetInstance<E: FetEquations> {
    pub(crate) name: String,
    pub(crate) drain: NodeId,
    pub(crate) gate: NodeId,
    pub(crate) source: NodeId,
    pub(crate) bulk: Option<NodeId>,
    pub(crate) drain_prime: Option<NodeId>,
    pub(crate) source_prime: Option<NodeId>,
    pub(crate) params: E::Params,
    pub(crate) derived: Option<E::Derived>,
    pub(crate) state_offset: Option<usize>,
    pub(crate) handles: Option<HandleTable>,
    pub(crate) state: InstanceState,
    pub(crate) backup: Option<Box<InstanceState>>,
}

impl<E: FetEquations> FetInstance<E> {
    /// Create an instance on external nodes (drain, gate, source[, bulk]).
    pub fn new(name: impl Into<String>, nodes: &[NodeId]) -> Result<Self> {
        let name = name.into();
        if nodes.len() != E::TERMINALS {
            return Err(Error::TerminalCount {
                instance: name,
                expected: E::TERMINALS,
                actual: nodes.len(),
            });
        }
        Ok(Self {
            name,
            drain: nodes[0],
            gate: nodes[1],
            source: nodes[2],
            bulk: nodes.get(3).copied(),
            drain_prime: None,
            source_prime: None,
            params: E::Params::default(),
            derived: None,
            state_offset: None,
            handles: None,
            state: InstanceState::default(),
            backup: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &E::Params {
        &self.params
    }

    /// Parameters changed here take effect at the next setup and
    /// temperature pass.
    pub fn params_mut(&mut self) -> &mut E::Params {
        &mut self.params
    }

    pub fn derived(&self) -> Option<&E::Derived> {
        self.derived.as_ref()
    }

    pub fn state_offset(&self) -> Option<usize> {
        self.state_offset
    }

    /// Matrix handles indexed by [`Terminal::index`]; `None` before setup.
    pub fn handles(&self) -> Option<&HandleTable> {
        self.handles.as_ref()
    }

    pub fn operating_point(&self) -> Option<&OperatingPoint> {
        self.state.op.as_ref()
    }

    pub fn kernels(&self) -> Option<&DistortionKernels> {
        self.state.kernels.as_ref()
    }

    pub fn state(&self) -> &InstanceState {
        &self.state
    }

    /// Node of every terminal. Prime nodes fall back to their external node
    /// and a missing bulk to the source prime node.
    pub fn nodes(&self) -> [NodeId; Terminal::COUNT] {
        let drain_prime = self.drain_prime.unwrap_or(self.drain);
        let source_prime = self.source_prime.unwrap_or(self.source);
        [
            self.drain,
            self.gate,
            self.source,
            self.bulk.unwrap_or(source_prime),
            drain_prime,
            source_prime,
        ]
    }

    pub fn node(&self, terminal: Terminal) -> NodeId {
        self.nodes()[terminal.index()]
    }

    /// Snapshot the load-mutable state, reusing an existing snapshot.
    pub fn save(&mut self) {
        match &mut self.backup {
            Some(backup) => (**backup).clone_from(&self.state),
            None => self.backup = Some(Box::new(self.state.clone())),
        }
    }

    /// Copy the snapshot back. The snapshot stays for further restores.
    pub fn restore(&mut self) -> Result<()> {
        let backup = self.backup.as_ref().ok_or_else(|| Error::NoBackup {
            instance: self.name.clone(),
        })?;
        self.state.clone_from(backup);
        Ok(())
    }

    pub fn clear_backup(&mut self) {
        self.backup = None;
    }

    pub fn has_backup(&self) -> bool {
        self.backup.is_some()
    }

    pub(crate) fn require_op(&self) -> Result<&OperatingPoint> {
        self.state.op.as_ref().ok_or_else(|| Error::NotLoaded {
            instance: self.name.clone(),
        })
    }

    pub(crate) fn require_handles(&self) -> Result<&HandleTable> {
        self.handles
            .as_ref()
            .ok_or_else(|| Error::NotSetUp(self.name.clone()))
    }

    pub(crate) fn require_derived(&self) -> Result<&E::Derived> {
        self.derived
            .as_ref()
            .ok_or_else(|| Error::NotSetUp(self.name.clone()))
    }
}

/// Stamp a branch linearized in the effective controls.
///
/// Each partial is scaled by `re + j·im`: `(1, 0)` for conductances,
/// `(0, ω)` for capacitances at frequency ω.
pub(crate) fn stamp_partials(
    mna: &mut MnaSystem,
    handles: &HandleTable,
    (from, to): (Terminal, Terminal),
    partials: &[f64; 3],
    controls: &[(Terminal, Terminal); 3],
    (re, im): (f64, f64),
) {
    let (f, t) = (from.index(), to.index());
    for (k, &(pos, neg)) in controls.iter().enumerate() {
        let p = partials[k];
        if p == 0.0 {
            continue;
        }
        let (pr, pi) = (p * re, p * im);
        let (pos, neg) = (pos.index(), neg.index());
        mna.add_complex(handles[f][pos], pr, pi);
        mna.add_complex(handles[f][neg], -pr, -pi);
        mna.add_complex(handles[t][pos], -pr, -pi);
        mna.add_complex(handles[t][neg], pr, pi);
    }
}

/// Stamp a linear conductance between two terminals.
pub(crate) fn stamp_conductance(
    mna: &mut MnaSystem,
    handles: &HandleTable,
    a: Terminal,
    b: Terminal,
    g: f64,
) {
    if g == 0.0 {
        return;
    }
    let (a, b) = (a.index(), b.index());
    mna.add(handles[a][a], g);
    mna.add(handles[a][b], -g);
    mna.add(handles[b][a], -g);
    mna.add(handles[b][b], g);
}
