//! Convergence checking and the shared non-convergence monitor.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Outcome of a convergence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckState {
    #[default]
    Pass,
    Fail,
}

impl CheckState {
    pub fn is_pass(self) -> bool {
        self == CheckState::Pass
    }
}

/// Compare a predicted value against a freshly computed one.
///
/// Exact equality always passes, so a zero tolerance cannot fail an
/// unchanged quantity.
pub fn within_tolerance(predicted: f64, actual: f64, reltol: f64, abstol: f64) -> bool {
    if predicted == actual {
        return true;
    }
    let tol = reltol * predicted.abs().max(actual.abs()) + abstol;
    (predicted - actual).abs() < tol
}

/// Counter of non-converged devices for one Newton iteration, plus the name
/// of the device that most recently failed.
///
/// Shared by reference across parallel loads.
#[derive(Debug, Default)]
pub struct ConvergenceMonitor {
    count: AtomicUsize,
    trouble: Mutex<Option<String>>,
}

impl ConvergenceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one non-converged device.
    pub fn record_failure(&self, name: &str) {
        self.count.fetch_add(1, Ordering::Relaxed);
        log::debug!("{name} did not converge");
        if let Ok(mut trouble) = self.trouble.lock() {
            *trouble = Some(name.to_string());
        }
    }

    /// Non-converged devices since the last reset.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Whether every device converged.
    pub fn converged(&self) -> bool {
        self.count() == 0
    }

    /// Device that most recently failed, if any.
    pub fn trouble(&self) -> Option<String> {
        self.trouble.lock().ok().and_then(|t| t.clone())
    }

    /// Clear the counter before a new iteration. The trouble device is kept
    /// for diagnostics until overwritten.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_always_passes() {
        assert!(within_tolerance(1.0, 1.0, 0.0, 0.0));
        assert!(within_tolerance(0.0, 0.0, 0.0, 0.0));
        assert!(!within_tolerance(1.0, 1.0 + 1e-15, 0.0, 0.0));
    }

    #[test]
    fn test_tolerance_boundary() {
        assert!(within_tolerance(1.0, 1.0005, 1e-3, 1e-12));
        assert!(!within_tolerance(1.0, 1.002, 1e-3, 1e-12));
        assert!(within_tolerance(1e-13, 5e-13, 1e-3, 1e-12));
    }

    #[test]
    fn test_monitor() {
        let monitor = ConvergenceMonitor::new();
        assert!(monitor.converged());
        assert_eq!(monitor.trouble(), None);

        monitor.record_failure("M1");
        monitor.record_failure("Z2");
        assert_eq!(monitor.count(), 2);
        assert_eq!(monitor.trouble().as_deref(), Some("Z2"));

        monitor.reset();
        assert!(monitor.converged());
        assert_eq!(monitor.trouble().as_deref(), Some("Z2"));
    }

    #[test]
    fn test_monitor_is_shared_across_threads() {
        let monitor = ConvergenceMonitor::new();
        std::thread::scope(|s| {
            for i in 0..4 {
                let monitor = &monitor;
                s.spawn(move || monitor.record_failure(&format!("M{i}")));
            }
        });
        assert_eq!(monitor.count(), 4);
        assert!(monitor.trouble().is_some());
    }
}
