//! AC and pole-zero restamping from the last operating point.

use compact_core::MnaSystem;
use num_complex::Complex;

use super::FetEquations;
use super::frame::Terminal;
use super::instance::{FetInstance, stamp_conductance, stamp_partials};
use crate::error::Result;

impl<E: FetEquations> FetInstance<E> {
    /// Stamp `G + jωC` at angular frequency `omega`.
    pub fn ac_load(&self, omega: f64, mna: &mut MnaSystem) -> Result<()> {
        self.stamp_small_signal(Complex::new(0.0, omega), mna)
    }

    /// Stamp `G + sC` at complex frequency `s`.
    pub fn pz_load(&self, s: Complex<f64>, mna: &mut MnaSystem) -> Result<()> {
        self.stamp_small_signal(s, mna)
    }

    fn stamp_small_signal(&self, s: Complex<f64>, mna: &mut MnaSystem) -> Result<()> {
        let op = self.require_op()?;
        let handles = self.require_handles()?;
        let derived = self.require_derived()?;
        let controls = op.frame.controls();

        for b in &op.currents {
            stamp_partials(mna, handles, (b.from, b.to), &b.partials, &controls, (1.0, 0.0));
        }
        for c in &op.charges {
            stamp_partials(mna, handles, c.pair, &c.capacitances, &controls, (s.re, s.im));
        }

        let (gd, gs) = E::series_conductance(derived);
        stamp_conductance(mna, handles, Terminal::Drain, Terminal::DrainPrime, gd);
        stamp_conductance(mna, handles, Terminal::Source, Terminal::SourcePrime, gs);
        Ok(())
    }
}
