//! RAII convenience over the push/pop pair.

use {
    crate::{context::AffinityContext, error::AffinityError},
    hwbind_topology::ObjectType,
    std::ops::{Deref, DerefMut},
};

/// A scope guard that pushes a binding on entry and guarantees the matching
/// pop on every exit path.
///
/// The guard borrows the context exclusively, so no unmatched push/pop can
/// be issued while it lives; the underlying primitives remain available for
/// callers that need explicit control.
///
/// # Example
/// ```no_run
/// # use {hwbind_core::{AffinityContext, BindGuard}, hwbind_group::SingleProcessGroup};
/// # use hwbind_topology::ObjectType;
/// # fn main() -> Result<(), hwbind_core::AffinityError> {
/// # let mut context = AffinityContext::new();
/// # context.init(&SingleProcessGroup::new())?;
/// {
///     let guard = BindGuard::new(&mut context, ObjectType::Core, 0)?;
///     assert!(guard.bound()?);
/// } // binding restored here
/// # Ok(())
/// # }
/// ```
pub struct BindGuard<'a> {
    context: &'a mut AffinityContext,
}

impl<'a> BindGuard<'a> {
    /// Pushes a binding to the named object. The pop happens when the guard
    /// drops.
    pub fn new(
        context: &'a mut AffinityContext,
        obj_type: ObjectType,
        index: usize,
    ) -> Result<Self, AffinityError> {
        context.bind_push(obj_type, index)?;
        Ok(Self { context })
    }
}

impl Deref for BindGuard<'_> {
    type Target = AffinityContext;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl DerefMut for BindGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl Drop for BindGuard<'_> {
    fn drop(&mut self) {
        // Drop cannot fail; a provider error here leaves the binding where
        // the push put it.
        if let Err(err) = self.context.bind_pop() {
            log::warn!("failed to restore binding on scope exit: {err}");
        }
    }
}
