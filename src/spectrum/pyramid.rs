// SPDX-License-Identifier: GPL-3.0-only

//! Render target set for one reduction plan
//!
//! The pyramid owns the full-size luminance surface and one target per
//! reduction step. Targets are created through a [`TargetAllocator`] so the
//! lifecycle (all or nothing, idempotent release) is independent of wgpu.

use super::plan::{ReductionPlan, StepSize};
use crate::errors::SpectrumError;
use tracing::{debug, warn};

/// Creates and destroys render targets
pub trait TargetAllocator {
    type Target;

    fn allocate(&mut self, size: StepSize, label: &str) -> Result<Self::Target, SpectrumError>;

    fn destroy(&mut self, target: Self::Target);
}

/// Luminance surface plus reduction step targets
pub struct ReductionPyramid<A: TargetAllocator> {
    allocator: A,
    plan: Option<ReductionPlan>,
    surface: Option<A::Target>,
    steps: Vec<A::Target>,
}

impl<A: TargetAllocator> ReductionPyramid<A> {
    pub fn new(allocator: A) -> Self {
        Self {
            allocator,
            plan: None,
            surface: None,
            steps: Vec::new(),
        }
    }

    /// Allocate every target `plan` needs
    ///
    /// Anything held from a previous plan is released first. On failure the
    /// targets allocated so far are destroyed and the pyramid is left empty.
    pub fn configure(&mut self, plan: &ReductionPlan) -> Result<(), SpectrumError> {
        self.release();

        let surface = self.allocator.allocate(plan.surface, "luminance_surface")?;
        self.surface = Some(surface);

        for (index, size) in plan.steps.iter().enumerate() {
            let label = format!("reduction_step_{}", index);
            match self.allocator.allocate(*size, &label) {
                Ok(target) => self.steps.push(target),
                Err(e) => {
                    warn!(step = index, error = %e, "Reduction target allocation failed");
                    self.release();
                    return Err(e);
                }
            }
        }

        debug!(
            width = plan.surface.width,
            height = plan.surface.height,
            steps = plan.step_count(),
            "Reduction pyramid configured"
        );
        self.plan = Some(plan.clone());
        Ok(())
    }

    /// Destroy all targets; a no-op when nothing is held
    pub fn release(&mut self) {
        for target in self.steps.drain(..) {
            self.allocator.destroy(target);
        }
        if let Some(surface) = self.surface.take() {
            self.allocator.destroy(surface);
        }
        self.plan = None;
    }

    pub fn is_configured(&self) -> bool {
        self.plan.is_some()
    }

    /// Plan the current targets were built for
    pub fn plan(&self) -> Option<&ReductionPlan> {
        self.plan.as_ref()
    }

    pub fn surface(&self) -> Option<&A::Target> {
        self.surface.as_ref()
    }

    pub fn step(&self, index: usize) -> Option<&A::Target> {
        self.steps.get(index)
    }
}

impl<A: TargetAllocator> Drop for ReductionPyramid<A> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::types::{ReductionStrategy, SpectrumOrientation};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Ledger {
        live: Vec<u32>,
        destroyed: Vec<u32>,
        next: u32,
    }

    /// Allocator that fails on the n-th allocation
    struct MockAllocator {
        ledger: Rc<RefCell<Ledger>>,
        fail_at: Option<u32>,
    }

    impl TargetAllocator for MockAllocator {
        type Target = u32;

        fn allocate(&mut self, _size: StepSize, label: &str) -> Result<u32, SpectrumError> {
            let mut ledger = self.ledger.borrow_mut();
            let id = ledger.next;
            ledger.next += 1;
            if Some(id) == self.fail_at {
                return Err(SpectrumError::AllocationFailed {
                    label: label.to_string(),
                    reason: "out of memory".to_string(),
                });
            }
            ledger.live.push(id);
            Ok(id)
        }

        fn destroy(&mut self, target: u32) {
            let mut ledger = self.ledger.borrow_mut();
            ledger.live.retain(|t| *t != target);
            ledger.destroyed.push(target);
        }
    }

    fn plan() -> ReductionPlan {
        ReductionPlan::new(
            320,
            240,
            ReductionStrategy::Anisotropic,
            SpectrumOrientation::VerticalRedUp,
        )
        .unwrap()
    }

    fn pyramid(fail_at: Option<u32>) -> (ReductionPyramid<MockAllocator>, Rc<RefCell<Ledger>>) {
        let ledger = Rc::new(RefCell::new(Ledger::default()));
        let allocator = MockAllocator {
            ledger: ledger.clone(),
            fail_at,
        };
        (ReductionPyramid::new(allocator), ledger)
    }

    #[test]
    fn test_configure_allocates_surface_and_steps() {
        let (mut pyramid, ledger) = pyramid(None);
        pyramid.configure(&plan()).unwrap();

        assert!(pyramid.is_configured());
        assert_eq!(ledger.borrow().live.len(), 5);
        assert!(pyramid.step(3).is_some());
        assert!(pyramid.step(4).is_none());
    }

    #[test]
    fn test_failure_mid_allocation_leaks_nothing() {
        let (mut pyramid, ledger) = pyramid(Some(3));
        let result = pyramid.configure(&plan());

        assert!(matches!(
            result,
            Err(SpectrumError::AllocationFailed { ref label, .. }) if label == "reduction_step_2"
        ));
        assert!(!pyramid.is_configured());
        assert!(ledger.borrow().live.is_empty());
        assert_eq!(ledger.borrow().destroyed.len(), 3);
    }

    #[test]
    fn test_release_is_idempotent() {
        let (mut pyramid, ledger) = pyramid(None);
        pyramid.configure(&plan()).unwrap();

        pyramid.release();
        pyramid.release();

        assert!(ledger.borrow().live.is_empty());
        assert_eq!(ledger.borrow().destroyed.len(), 5);
    }

    #[test]
    fn test_reconfigure_releases_previous_targets() {
        let (mut pyramid, ledger) = pyramid(None);
        pyramid.configure(&plan()).unwrap();
        pyramid.configure(&plan()).unwrap();

        assert_eq!(ledger.borrow().live.len(), 5);
        assert_eq!(ledger.borrow().destroyed, vec![1, 2, 3, 4, 0]);
    }

    #[test]
    fn test_drop_releases() {
        let (mut pyramid, ledger) = pyramid(None);
        pyramid.configure(&plan()).unwrap();
        drop(pyramid);
        assert!(ledger.borrow().live.is_empty());
    }
}
