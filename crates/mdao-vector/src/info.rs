//! Evaluation context shared by the vectors of one system.

use std::sync::atomic::{AtomicBool, Ordering};

/// Context flags shared by all vectors allocated for the same system.
///
/// The owning system toggles complex-step mode here; transfers consult the
/// input vector's info to decide whether imaginary buffers move as well.
#[derive(Debug, Default)]
pub struct VectorInfo {
    under_complex_step: AtomicBool,
}

impl VectorInfo {
    /// Create a context with complex-step mode off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the system is currently evaluating under complex step.
    pub fn under_complex_step(&self) -> bool {
        self.under_complex_step.load(Ordering::Acquire)
    }

    /// Turn complex-step mode on or off.
    pub fn set_complex_step(&self, active: bool) {
        self.under_complex_step.store(active, Ordering::Release);
    }

    /// Turn complex-step mode on until the returned guard is dropped.
    ///
    /// The previous mode is restored on drop.
    #[must_use = "complex-step mode ends when the guard is dropped"]
    pub fn complex_step(&self) -> ComplexStepGuard<'_> {
        let previous = self.under_complex_step.swap(true, Ordering::AcqRel);
        ComplexStepGuard { info: self, previous }
    }
}

/// Restores the previous complex-step mode when dropped.
#[derive(Debug)]
pub struct ComplexStepGuard<'a> {
    info: &'a VectorInfo,
    previous: bool,
}

impl Drop for ComplexStepGuard<'_> {
    fn drop(&mut self) {
        self.info.set_complex_step(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_off() {
        assert!(!VectorInfo::new().under_complex_step());
    }

    #[test]
    fn test_guard_restores_previous_mode() {
        let info = VectorInfo::new();
        {
            let _cs = info.complex_step();
            assert!(info.under_complex_step());
            {
                let _nested = info.complex_step();
                assert!(info.under_complex_step());
            }
            assert!(info.under_complex_step());
        }
        assert!(!info.under_complex_step());
    }
}
