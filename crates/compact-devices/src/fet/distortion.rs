//! Volterra-series distortion analysis.
//!
//! `disto_setup` expands the device equations to third order around the
//! operating point of the last load. `disto_load` then turns first- and
//! second-order node responses into the nonlinear current sources at one
//! combination frequency and adds them to the right-hand side only.
//!
//! Phasors are exponential components: a node voltage `V e^{jωt}` with no
//! implied factor of one half. Under that convention the source at `ω1+ω2`
//! of a quadratic term is `2·K2(V1, V2)`, while at `2ω1` it is `K2(V1, V1)`.

use compact_core::{MnaSystem, NodeId, SimOptions};
use nalgebra::DVector;
use num_complex::Complex;

use super::frame::{Frame, Terminal};
use super::instance::FetInstance;
use super::{Branch, FetEquations};
use crate::error::{Error, Result};
use crate::taylor::Jet;

/// Combination frequency to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistortionCase {
    /// Second harmonic, 2·f1.
    TwoF1,
    /// Third harmonic, 3·f1.
    ThreeF1,
    /// f1 + f2.
    SumF1F2,
    /// f1 − f2.
    DiffF1F2,
    /// 2·f1 − f2.
    TwoF1MinusF2,
}

impl DistortionCase {
    /// Angular frequency of the output.
    pub fn output_frequency(self, omega1: f64, omega2: f64) -> f64 {
        match self {
            DistortionCase::TwoF1 => 2.0 * omega1,
            DistortionCase::ThreeF1 => 3.0 * omega1,
            DistortionCase::SumF1F2 => omega1 + omega2,
            DistortionCase::DiffF1F2 => omega1 - omega2,
            DistortionCase::TwoF1MinusF2 => 2.0 * omega1 - omega2,
        }
    }
}

/// Node responses supplied by the outer solver.
#[derive(Debug, Clone, Copy)]
pub struct DistortionInput<'a> {
    pub case: DistortionCase,
    pub omega1: f64,
    pub omega2: f64,
    /// First-order response at ω1.
    pub v1: &'a DVector<Complex<f64>>,
    /// First-order response at ω2.
    pub v2: Option<&'a DVector<Complex<f64>>>,
    /// Second-order response at 2·ω1.
    pub h2_2f1: Option<&'a DVector<Complex<f64>>>,
    /// Second-order response at ω1 − ω2.
    pub h2_diff: Option<&'a DVector<Complex<f64>>>,
}

impl<'a> DistortionInput<'a> {
    /// Input for a case that needs only the ω1 response.
    pub fn new(case: DistortionCase, omega1: f64, v1: &'a DVector<Complex<f64>>) -> Self {
        Self {
            case,
            omega1,
            omega2: 0.0,
            v1,
            v2: None,
            h2_2f1: None,
            h2_diff: None,
        }
    }
}

/// Third-order expansion of one current or charge between physical
/// terminals.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelBranch {
    pub from: Terminal,
    pub to: Terminal,
    pub series: Jet,
}

/// Volterra kernels of an instance at its operating point.
#[derive(Debug, Clone, PartialEq)]
pub struct DistortionKernels {
    pub frame: Frame,
    pub polarity: f64,
    pub currents: Vec<KernelBranch>,
    pub charges: Vec<KernelBranch>,
}

fn need<'a>(
    v: Option<&'a DVector<Complex<f64>>>,
    what: &'static str,
) -> Result<&'a DVector<Complex<f64>>> {
    v.ok_or(Error::MissingExcitation(what))
}

fn phasor(v: &DVector<Complex<f64>>, node: NodeId) -> Complex<f64> {
    node.index()
        .and_then(|i| v.get(i).copied())
        .unwrap_or_default()
}

impl<E: FetEquations> FetInstance<E> {
    /// Expand the equations around the last operating point.
    pub fn disto_setup(&mut self, options: &SimOptions) -> Result<()> {
        let op = self.require_op()?;
        let derived = self.require_derived()?;
        let frame = op.frame;
        let v = frame.effective(&op.bias);
        let vars = [
            Jet::variable(0, v[0]),
            Jet::variable(1, v[1]),
            Jet::variable(2, v[2]),
        ];
        let eval = E::evaluate(derived, frame, vars, options.gmin);
        let physical = |b: &Branch<Jet>| KernelBranch {
            from: frame.map(b.from),
            to: frame.map(b.to),
            series: b.value,
        };
        let kernels = DistortionKernels {
            frame,
            polarity: op.polarity,
            currents: eval.currents.iter().map(physical).collect(),
            charges: eval.charges.iter().map(physical).collect(),
        };
        self.state.kernels = Some(kernels);
        Ok(())
    }

    /// Add the distortion sources for `input.case` to the right-hand side.
    pub fn disto_load(&self, input: &DistortionInput<'_>, mna: &mut MnaSystem) -> Result<()> {
        let kernels = self
            .state
            .kernels
            .as_ref()
            .ok_or_else(|| Error::NoDistortionSetup {
                instance: self.name.clone(),
            })?;
        let nodes = self.nodes();
        let controls = kernels.frame.controls();
        let polarity = kernels.polarity;

        let controls_of = |v: &DVector<Complex<f64>>, conjugate: bool| -> [Complex<f64>; 3] {
            controls.map(|(pos, neg)| {
                let u = (phasor(v, nodes[pos.index()]) - phasor(v, nodes[neg.index()])) * polarity;
                if conjugate { u.conj() } else { u }
            })
        };
        let u1 = controls_of(input.v1, false);
        let response: Box<dyn Fn(&Jet) -> Complex<f64>> = match input.case {
            DistortionCase::TwoF1 => Box::new(move |k: &Jet| k.bilinear(&u1, &u1)),
            DistortionCase::SumF1F2 => {
                let u2 = controls_of(need(input.v2, "f2 first-order")?, false);
                Box::new(move |k: &Jet| k.bilinear(&u1, &u2) * 2.0)
            }
            DistortionCase::DiffF1F2 => {
                let u2 = controls_of(need(input.v2, "f2 first-order")?, true);
                Box::new(move |k: &Jet| k.bilinear(&u1, &u2) * 2.0)
            }
            DistortionCase::ThreeF1 => {
                let h11 = controls_of(need(input.h2_2f1, "2f1 second-order")?, false);
                Box::new(move |k: &Jet| k.trilinear(&u1, &u1, &u1) + k.bilinear(&u1, &h11) * 2.0)
            }
            DistortionCase::TwoF1MinusF2 => {
                let u2 = controls_of(need(input.v2, "f2 first-order")?, true);
                let h11 = controls_of(need(input.h2_2f1, "2f1 second-order")?, false);
                let h12 = controls_of(need(input.h2_diff, "f1-f2 second-order")?, false);
                Box::new(move |k: &Jet| {
                    k.trilinear(&u1, &u1, &u2) * 3.0
                        + (k.bilinear(&u1, &h12) + k.bilinear(&u2, &h11)) * 2.0
                })
            }
        };

        let jw = Complex::new(0.0, input.case.output_frequency(input.omega1, input.omega2));
        let mut inject = |branch: &KernelBranch, scale: Complex<f64>| {
            let i = response(&branch.series) * scale * polarity;
            let (from, to) = (nodes[branch.from.index()], nodes[branch.to.index()]);
            mna.add_rhs_complex(from, -i.re, -i.im);
            mna.add_rhs_complex(to, i.re, i.im);
        };
        for branch in &kernels.currents {
            inject(branch, Complex::new(1.0, 0.0));
        }
        for branch in &kernels.charges {
            inject(branch, jw);
        }
        Ok(())
    }
}
