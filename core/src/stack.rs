//! The LIFO of saved affinity snapshots.

use {
    crate::error::AffinityError,
    hwbind_topology::{CpuSet, HostProvider, ObjectType, TopologyModel},
};

/// An immutable snapshot of the affinity mask this process was bound to at
/// the moment it was captured. Created by `push`, consumed by `pop`.
#[derive(Debug, Clone)]
struct BindingRecord {
    cpuset: CpuSet,
}

/// The ordered sequence of saved bindings. Empty at initialization,
/// representing whatever default binding the OS or launcher assigned.
///
/// The stack itself holds no collaborators; the owning context passes the
/// model and provider into each operation.
#[derive(Debug, Default)]
pub(crate) struct BindingStack {
    records: Vec<BindingRecord>,
}

impl BindingStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn depth(&self) -> usize {
        self.records.len()
    }

    /// Saves the current binding and narrows to the named object.
    ///
    /// On a failed apply the captured record is discarded and the previous
    /// binding is left in place.
    pub(crate) fn push(
        &mut self,
        provider: &dyn HostProvider,
        model: &TopologyModel,
        obj_type: ObjectType,
        index: usize,
    ) -> Result<(), AffinityError> {
        let target = model.resource_mask_of(obj_type, index)?.clone();
        let current = provider.current_affinity()?;

        self.records.push(BindingRecord { cpuset: current });
        if let Err(err) = provider.set_affinity(&target) {
            self.records.pop();
            return Err(err.into());
        }

        log::debug!("pushed binding, now bound to {obj_type} {index} (pus {target})");
        Ok(())
    }

    /// Restores the most recently saved binding.
    ///
    /// The record is consumed even when re-applying it fails; the caller
    /// must then treat the current binding as indeterminate relative to the
    /// discarded record.
    pub(crate) fn pop(&mut self, provider: &dyn HostProvider) -> Result<(), AffinityError> {
        let record = self.records.pop().ok_or(AffinityError::PopWithoutPush)?;
        provider.set_affinity(&record.cpuset)?;
        log::debug!("popped binding, restored pus {}", record.cpuset);
        Ok(())
    }

    /// Binds to the named object without saving the current binding. Not
    /// restorable via `pop`: it permanently supersedes what was bound
    /// before.
    pub(crate) fn rebind(
        &mut self,
        provider: &dyn HostProvider,
        model: &TopologyModel,
        obj_type: ObjectType,
        index: usize,
    ) -> Result<(), AffinityError> {
        let target = model.resource_mask_of(obj_type, index)?;
        provider.set_affinity(target)?;
        log::debug!("rebound to {obj_type} {index} (pus {target})");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        assert_matches::assert_matches,
        hwbind_topology::{FakeProvider, TopologyError},
    };

    fn setup() -> (FakeProvider, TopologyModel) {
        let provider = FakeProvider::small();
        let model = TopologyModel::build(provider.discover().unwrap()).unwrap();
        (provider, model)
    }

    #[test]
    fn test_push_narrows_and_pop_restores() {
        let (provider, model) = setup();
        let mut stack = BindingStack::new();
        let before = provider.current_affinity().unwrap();

        stack.push(&provider, &model, ObjectType::Core, 1).unwrap();
        assert_eq!(provider.current_affinity().unwrap().to_string(), "2-3");
        assert_eq!(stack.depth(), 1);

        stack.pop(&provider).unwrap();
        assert_eq!(provider.current_affinity().unwrap(), before);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_nested_pushes_restore_in_lifo_order() {
        let (provider, model) = setup();
        let mut stack = BindingStack::new();

        stack.push(&provider, &model, ObjectType::Socket, 0).unwrap();
        stack.push(&provider, &model, ObjectType::Core, 0).unwrap();
        stack.push(&provider, &model, ObjectType::Pu, 1).unwrap();
        assert_eq!(provider.current_affinity().unwrap().to_string(), "1");

        stack.pop(&provider).unwrap();
        assert_eq!(provider.current_affinity().unwrap().to_string(), "0-1");
        stack.pop(&provider).unwrap();
        assert_eq!(provider.current_affinity().unwrap().to_string(), "0-3");
        stack.pop(&provider).unwrap();
        assert_eq!(provider.current_affinity().unwrap().to_string(), "0-7");
    }

    #[test]
    fn test_pop_on_empty_stack() {
        let (provider, _model) = setup();
        let mut stack = BindingStack::new();
        let before = provider.current_affinity().unwrap();

        assert_matches!(
            stack.pop(&provider),
            Err(AffinityError::PopWithoutPush)
        );
        assert_eq!(provider.current_affinity().unwrap(), before);
    }

    #[test]
    fn test_push_out_of_range_leaves_stack_unchanged() {
        let (provider, model) = setup();
        let mut stack = BindingStack::new();
        let before = provider.current_affinity().unwrap();

        assert_matches!(
            stack.push(&provider, &model, ObjectType::Core, 4),
            Err(AffinityError::Topology(TopologyError::OutOfRange {
                index: 4,
                count: 4,
                ..
            }))
        );
        assert!(stack.is_empty());
        assert_eq!(provider.current_affinity().unwrap(), before);
    }

    #[test]
    fn test_push_rolls_back_on_apply_failure() {
        let (provider, model) = setup();
        let mut stack = BindingStack::new();
        let before = provider.current_affinity().unwrap();

        provider.fail_next_set_affinity();
        assert_matches!(
            stack.push(&provider, &model, ObjectType::Core, 0),
            Err(AffinityError::Sys(_))
        );
        assert!(stack.is_empty());
        assert_eq!(provider.current_affinity().unwrap(), before);
    }

    #[test]
    fn test_failed_pop_still_consumes_the_record() {
        let (provider, model) = setup();
        let mut stack = BindingStack::new();

        stack.push(&provider, &model, ObjectType::Core, 0).unwrap();
        provider.fail_next_set_affinity();
        assert_matches!(stack.pop(&provider), Err(AffinityError::Sys(_)));
        assert!(stack.is_empty());

        // A further pop is a stack-discipline violation, not a retry
        assert_matches!(stack.pop(&provider), Err(AffinityError::PopWithoutPush));
    }

    #[test]
    fn test_rebind_bypasses_the_stack() {
        let (provider, model) = setup();
        let mut stack = BindingStack::new();

        stack.push(&provider, &model, ObjectType::Socket, 1).unwrap();
        stack.rebind(&provider, &model, ObjectType::Pu, 0).unwrap();
        assert_eq!(provider.current_affinity().unwrap().to_string(), "0");
        assert_eq!(stack.depth(), 1);

        // pop restores the pre-push binding, not the pre-rebind one
        stack.pop(&provider).unwrap();
        assert_eq!(provider.current_affinity().unwrap().to_string(), "0-7");
    }
}
