//! Per-instance state history.
//!
//! The store holds several generations of a flat `f64` array. Generation 0 is
//! the value being computed in the present Newton iteration, generation 1 is
//! the last accepted timepoint, and older generations feed the integrator and
//! the predictor. Models reserve a contiguous block at setup and address it
//! by offset.

use crate::error::{Error, Result};

/// Generations kept by default: enough history for sixth-order Gear plus the
/// present iterate.
pub const DEFAULT_GENERATIONS: usize = 8;

/// Multi-generation state vector.
#[derive(Debug, Clone, PartialEq)]
pub struct StateStore {
    generations: Vec<Vec<f64>>,
    len: usize,
}

impl Default for StateStore {
    fn default() -> Self {
        Self {
            generations: vec![Vec::new(); DEFAULT_GENERATIONS],
            len: 0,
        }
    }
}

impl StateStore {
    /// Create a store with `generations` history levels (at least two).
    pub fn new(generations: usize) -> Result<Self> {
        if generations < 2 {
            return Err(Error::TooFewGenerations {
                required: 2,
                actual: generations,
            });
        }
        Ok(Self {
            generations: vec![Vec::new(); generations],
            len: 0,
        })
    }

    /// Reserve `n` consecutive slots and return the offset of the first.
    pub fn reserve(&mut self, n: usize) -> usize {
        let offset = self.len;
        self.len += n;
        for generation in &mut self.generations {
            generation.resize(self.len, 0.0);
        }
        offset
    }

    /// Total number of reserved slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no slots have been reserved.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of history generations.
    pub fn generations(&self) -> usize {
        self.generations.len()
    }

    /// Value of `slot` in `generation` (0 = current).
    ///
    /// Generations beyond the configured depth read as zero.
    #[inline]
    pub fn get(&self, generation: usize, slot: usize) -> f64 {
        self.generations
            .get(generation)
            .and_then(|g| g.get(slot))
            .copied()
            .unwrap_or(0.0)
    }

    /// Write `value` into `slot` of `generation`.
    #[inline]
    pub fn set(&mut self, generation: usize, slot: usize, value: f64) {
        self.generations[generation][slot] = value;
    }

    /// Value of `slot` in the current generation.
    #[inline]
    pub fn current(&self, slot: usize) -> f64 {
        self.get(0, slot)
    }

    /// Value of `slot` in the last accepted generation.
    #[inline]
    pub fn previous(&self, slot: usize) -> f64 {
        self.get(1, slot)
    }

    /// Write `value` into `slot` of the current generation.
    #[inline]
    pub fn set_current(&mut self, slot: usize, value: f64) {
        self.generations[0][slot] = value;
    }

    /// Accept the current generation.
    ///
    /// Every generation moves one step into the past; the new current
    /// generation starts as a copy of the one just accepted.
    pub fn rotate(&mut self) {
        self.generations.rotate_right(1);
        let (head, tail) = self.generations.split_at_mut(1);
        head[0].copy_from_slice(&tail[0]);
    }

    /// Copy the current generation into every older generation.
    ///
    /// Used after the operating point so the first timestep sees a flat
    /// history.
    pub fn seed_history(&mut self) {
        let (head, tail) = self.generations.split_at_mut(1);
        for generation in tail {
            generation.copy_from_slice(&head[0]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_offsets() {
        let mut states = StateStore::default();
        assert!(states.is_empty());
        assert_eq!(states.reserve(3), 0);
        assert_eq!(states.reserve(5), 3);
        assert_eq!(states.len(), 8);
        assert_eq!(states.generations(), DEFAULT_GENERATIONS);
    }

    #[test]
    fn test_too_few_generations() {
        assert!(StateStore::new(1).is_err());
        assert!(StateStore::new(2).is_ok());
    }

    #[test]
    fn test_rotate_shifts_history() {
        let mut states = StateStore::new(3).unwrap();
        states.reserve(1);
        states.set_current(0, 1.0);
        states.rotate();
        assert_eq!(states.previous(0), 1.0);
        assert_eq!(states.current(0), 1.0);

        states.set_current(0, 2.0);
        states.rotate();
        assert_eq!(states.current(0), 2.0);
        assert_eq!(states.previous(0), 2.0);
        assert_eq!(states.get(2, 0), 1.0);
        assert_eq!(states.get(7, 0), 0.0);
    }

    #[test]
    fn test_seed_history() {
        let mut states = StateStore::new(4).unwrap();
        states.reserve(2);
        states.set_current(1, 0.5);
        states.seed_history();
        for generation in 0..4 {
            assert_eq!(states.get(generation, 1), 0.5);
        }
    }
}
