//! The top-level handle: lifecycle state machine and query/command facade.

use {
    crate::{
        config::{ContextConfig, FingerprintSource},
        error::AffinityError,
        stack::BindingStack,
    },
    hwbind_group::{node_fingerprint, resolve, NodeRankInfo, ProcessGroup},
    hwbind_topology::{HostProvider, ObjectType, SysfsProvider, TopologyModel},
};

/// Lifecycle states. Construction puts a context in `Constructed`;
/// destruction is `Drop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Constructed,
    Initialized,
    Finalized,
}

/// The affinity-management handle.
///
/// One context per process (or per serialized owner): binding commands
/// mutate OS-level affinity state and must not be issued concurrently on
/// the same context. The topology and node/rank facts are immutable after
/// [`init`](Self::init) and may be read freely.
///
/// # Examples
///
/// ```no_run
/// use {hwbind_core::AffinityContext, hwbind_group::SingleProcessGroup, hwbind_topology::ObjectType};
///
/// # fn main() -> Result<(), hwbind_core::AffinityError> {
/// let mut context = AffinityContext::new();
/// context.init(&SingleProcessGroup::new())?;
///
/// context.bind_push(ObjectType::Core, 0)?;
/// // ... work pinned to core 0 ...
/// context.bind_pop()?;
///
/// context.finalize()?;
/// # Ok(())
/// # }
/// ```
pub struct AffinityContext {
    provider: Box<dyn HostProvider>,
    config: ContextConfig,
    state: State,
    model: Option<TopologyModel>,
    node_info: Option<NodeRankInfo>,
    /// Rendered once at init so repeated queries and repeated contexts on
    /// identical hosts agree byte for byte. Released at finalize.
    topo_string: Option<String>,
    stack: BindingStack,
}

impl AffinityContext {
    /// A context over the real host.
    pub fn new() -> Self {
        Self::with_provider(Box::new(SysfsProvider::new()), ContextConfig::default())
    }

    /// A context over an explicit provider, for harnesses and tests.
    pub fn with_provider(provider: Box<dyn HostProvider>, config: ContextConfig) -> Self {
        Self {
            provider,
            config,
            state: State::Constructed,
            model: None,
            node_info: None,
            topo_string: None,
            stack: BindingStack::new(),
        }
    }

    /// Discovers the host topology and resolves this process's node rank.
    ///
    /// Collective: every member of `group` must call `init` for any member
    /// to complete, and the call blocks until they all have. Must be called
    /// exactly once, before any query or binding command. On failure the
    /// context holds no partial state and remains unusable for queries.
    pub fn init<G>(&mut self, group: &G) -> Result<(), AffinityError>
    where
        G: ProcessGroup + ?Sized,
    {
        match self.state {
            State::Constructed => {}
            State::Initialized => {
                return Err(AffinityError::InvalidArgument("init called twice"));
            }
            State::Finalized => {
                return Err(AffinityError::InvalidArgument(
                    "init called on a finalized context",
                ));
            }
        }

        let model = TopologyModel::build(self.provider.discover()?)?;
        let fingerprint = match self.config.fingerprint {
            FingerprintSource::Hostname => node_fingerprint()?,
            FingerprintSource::Fixed(value) => value,
        };
        let node_info = resolve(group, fingerprint)?;

        self.topo_string = Some(model.stringify());
        self.model = Some(model);
        self.node_info = Some(node_info);
        self.state = State::Initialized;
        log::debug!(
            "initialized: rank {} of {} on node {} of {}",
            group.rank(),
            group.size(),
            node_info.node_id,
            node_info.nnodes
        );
        Ok(())
    }

    /// True iff the context is currently initialized. Valid in any state.
    pub fn initialized(&self) -> bool {
        self.state == State::Initialized
    }

    /// Releases the topology, node/rank facts, and any saved bindings. The
    /// context itself stays alive (destruction is `Drop`), but accepts no
    /// further queries or commands.
    pub fn finalize(&mut self) -> Result<(), AffinityError> {
        match self.state {
            State::Initialized => {}
            State::Constructed => return Err(AffinityError::CallBeforeInit),
            State::Finalized => {
                return Err(AffinityError::InvalidArgument("finalize called twice"));
            }
        }
        if !self.stack.is_empty() {
            log::warn!(
                "finalizing with {} binding(s) still pushed; the current \
                 binding is left as is",
                self.stack.depth()
            );
        }
        self.model = None;
        self.node_info = None;
        self.topo_string = None;
        self.stack = BindingStack::new();
        self.state = State::Finalized;
        Ok(())
    }

    fn model(&self) -> Result<&TopologyModel, AffinityError> {
        match (self.state, &self.model) {
            (State::Initialized, Some(model)) => Ok(model),
            _ => Err(AffinityError::CallBeforeInit),
        }
    }

    fn node_info(&self) -> Result<&NodeRankInfo, AffinityError> {
        match (self.state, &self.node_info) {
            (State::Initialized, Some(info)) => Ok(info),
            _ => Err(AffinityError::CallBeforeInit),
        }
    }

    /// Deterministic rendering of the whole hardware hierarchy.
    pub fn stringify_topology(&self) -> Result<&str, AffinityError> {
        match (self.state, &self.topo_string) {
            (State::Initialized, Some(text)) => Ok(text),
            _ => Err(AffinityError::CallBeforeInit),
        }
    }

    /// Total number of objects of the given type on the local machine.
    pub fn object_count(&self, obj_type: ObjectType) -> Result<usize, AffinityError> {
        Ok(self.model()?.object_count(obj_type))
    }

    pub fn nsockets(&self) -> Result<usize, AffinityError> {
        self.object_count(ObjectType::Socket)
    }

    pub fn ncores(&self) -> Result<usize, AffinityError> {
        self.object_count(ObjectType::Core)
    }

    pub fn npus(&self) -> Result<usize, AffinityError> {
        self.object_count(ObjectType::Pu)
    }

    /// True iff the current affinity mask is narrower than the full
    /// machine.
    pub fn bound(&self) -> Result<bool, AffinityError> {
        let model = self.model()?;
        let current = self.provider.current_affinity()?;
        Ok(current.is_proper_subset(model.machine_set()))
    }

    /// Deterministic rendering of the current affinity mask, in ascending
    /// PU order.
    pub fn stringify_current_binding(&self) -> Result<String, AffinityError> {
        self.model()?;
        Ok(self.provider.current_affinity()?.to_string())
    }

    /// Distinct nodes across the process group.
    pub fn nnodes(&self) -> Result<usize, AffinityError> {
        Ok(self.node_info()?.nnodes)
    }

    /// Processes sharing this process's node.
    pub fn nnoderanks(&self) -> Result<usize, AffinityError> {
        Ok(self.node_info()?.nnoderanks)
    }

    /// This process's 0-based rank among the processes on its node.
    pub fn noderank(&self) -> Result<usize, AffinityError> {
        Ok(self.node_info()?.noderank)
    }

    /// Binds to the named object without saving the current binding; not
    /// restorable via [`bind_pop`](Self::bind_pop).
    pub fn rebind(&mut self, obj_type: ObjectType, index: usize) -> Result<(), AffinityError> {
        if self.state != State::Initialized {
            return Err(AffinityError::CallBeforeInit);
        }
        let model = self.model.as_ref().ok_or(AffinityError::CallBeforeInit)?;
        self.stack
            .rebind(self.provider.as_ref(), model, obj_type, index)
    }

    /// Saves the current binding and narrows to the named object.
    pub fn bind_push(&mut self, obj_type: ObjectType, index: usize) -> Result<(), AffinityError> {
        if self.state != State::Initialized {
            return Err(AffinityError::CallBeforeInit);
        }
        let model = self.model.as_ref().ok_or(AffinityError::CallBeforeInit)?;
        self.stack
            .push(self.provider.as_ref(), model, obj_type, index)
    }

    /// Restores the binding saved by the most recent
    /// [`bind_push`](Self::bind_push).
    pub fn bind_pop(&mut self) -> Result<(), AffinityError> {
        if self.state != State::Initialized {
            return Err(AffinityError::CallBeforeInit);
        }
        self.stack.pop(self.provider.as_ref())
    }
}

impl Default for AffinityContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AffinityContext {
    fn drop(&mut self) {
        if self.state == State::Initialized {
            log::warn!("affinity context dropped without finalize");
        }
    }
}

impl std::fmt::Debug for AffinityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AffinityContext")
            .field("state", &self.state)
            .field("node_info", &self.node_info)
            .field("stack_depth", &self.stack.depth())
            .finish()
    }
}
