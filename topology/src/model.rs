//! The in-memory hardware hierarchy.
//!
//! [`TopologyModel`] owns every [`HardwareObject`] in an arena indexed by
//! (type, index); containment is answered with subset arithmetic over the
//! objects' PU sets, so the tree carries no parent/child pointers and no
//! cycles. Built exactly once from a [`RawTopology`] snapshot, immutable
//! thereafter (hot-plug is out of scope).

use {
    crate::{cpu_set::CpuSet, error::TopologyError, provider::RawTopology},
    std::{
        collections::BTreeMap,
        fmt::{self, Write},
    },
};

/// Hardware containment levels, coarsest to finest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectType {
    Machine,
    Node,
    Socket,
    Core,
    Pu,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::Machine => "machine",
            ObjectType::Node => "node",
            ObjectType::Socket => "socket",
            ObjectType::Core => "core",
            ObjectType::Pu => "pu",
        };
        f.write_str(name)
    }
}

/// One node of the topology tree. Owned by [`TopologyModel`]; referenced by
/// (type, index), never by pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareObject {
    pub obj_type: ObjectType,
    /// 0-based ordinal, unique within `obj_type` on the local machine.
    pub index: usize,
    /// The processing units physically beneath this object.
    pub cpuset: CpuSet,
}

/// The immutable hardware hierarchy of the local host.
#[derive(Debug, Clone)]
pub struct TopologyModel {
    machine: HardwareObject,
    nodes: Vec<HardwareObject>,
    sockets: Vec<HardwareObject>,
    cores: Vec<HardwareObject>,
    pus: Vec<HardwareObject>,
}

impl TopologyModel {
    /// Builds the arena from a discovery snapshot. Per-type indices are
    /// assigned in ascending order of the host's own ids, so they are
    /// stable across processes on an identical host.
    pub fn build(raw: RawTopology) -> Result<Self, TopologyError> {
        if raw.pus.is_empty() {
            return Err(TopologyError::Discovery(
                "discovery snapshot contains no processing units".to_string(),
            ));
        }

        let mut machine_set = CpuSet::new();
        let mut node_sets: BTreeMap<usize, CpuSet> = BTreeMap::new();
        let mut socket_sets: BTreeMap<usize, CpuSet> = BTreeMap::new();
        // Core ids are only unique within their socket, so cores are keyed
        // by (socket, core).
        let mut core_sets: BTreeMap<(usize, usize), CpuSet> = BTreeMap::new();
        let mut pu_ids: Vec<usize> = Vec::with_capacity(raw.pus.len());

        for pu in &raw.pus {
            machine_set.insert(pu.pu);
            node_sets.entry(pu.node).or_default().insert(pu.pu);
            socket_sets.entry(pu.socket).or_default().insert(pu.pu);
            core_sets
                .entry((pu.socket, pu.core))
                .or_default()
                .insert(pu.pu);
            pu_ids.push(pu.pu);
        }
        pu_ids.sort_unstable();
        pu_ids.dedup();

        let collect = |sets: Vec<CpuSet>, obj_type: ObjectType| -> Vec<HardwareObject> {
            sets.into_iter()
                .enumerate()
                .map(|(index, cpuset)| HardwareObject {
                    obj_type,
                    index,
                    cpuset,
                })
                .collect()
        };

        let model = Self {
            machine: HardwareObject {
                obj_type: ObjectType::Machine,
                index: 0,
                cpuset: machine_set,
            },
            nodes: collect(node_sets.into_values().collect(), ObjectType::Node),
            sockets: collect(socket_sets.into_values().collect(), ObjectType::Socket),
            cores: collect(core_sets.into_values().collect(), ObjectType::Core),
            pus: collect(
                pu_ids
                    .iter()
                    .map(|&id| [id].into_iter().collect())
                    .collect(),
                ObjectType::Pu,
            ),
        };

        log::debug!(
            "topology: {} node(s), {} socket(s), {} core(s), {} pu(s)",
            model.nodes.len(),
            model.sockets.len(),
            model.cores.len(),
            model.pus.len()
        );
        Ok(model)
    }

    fn objects(&self, obj_type: ObjectType) -> &[HardwareObject] {
        match obj_type {
            ObjectType::Machine => std::slice::from_ref(&self.machine),
            ObjectType::Node => &self.nodes,
            ObjectType::Socket => &self.sockets,
            ObjectType::Core => &self.cores,
            ObjectType::Pu => &self.pus,
        }
    }

    /// Total number of objects of the given type on the local machine.
    pub fn object_count(&self, obj_type: ObjectType) -> usize {
        self.objects(obj_type).len()
    }

    /// Checks that `index` names an existing object of `obj_type`. Every
    /// consumer must call this (directly or via [`Self::resource_mask_of`])
    /// before acting on a (type, index) pair.
    pub fn validate(&self, obj_type: ObjectType, index: usize) -> Result<(), TopologyError> {
        let count = self.object_count(obj_type);
        if index >= count {
            return Err(TopologyError::OutOfRange {
                obj_type,
                index,
                count,
            });
        }
        Ok(())
    }

    /// The set of processing units beneath the named object.
    pub fn resource_mask_of(
        &self,
        obj_type: ObjectType,
        index: usize,
    ) -> Result<&CpuSet, TopologyError> {
        self.validate(obj_type, index)?;
        Ok(&self.objects(obj_type)[index].cpuset)
    }

    /// All processing units on the machine.
    pub fn machine_set(&self) -> &CpuSet {
        &self.machine.cpuset
    }

    /// Deterministic rendering of the whole hierarchy: objects in ascending
    /// type-then-index order, nested by containment. Identical output
    /// across repeated calls and across processes on an identical host.
    pub fn stringify(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "machine (pus {})", self.machine.cpuset);
        for node in &self.nodes {
            let _ = writeln!(out, "  node {} (pus {})", node.index, node.cpuset);
            for socket in contained(&self.sockets, &node.cpuset) {
                let _ = writeln!(out, "    socket {} (pus {})", socket.index, socket.cpuset);
                for core in contained(&self.cores, &socket.cpuset) {
                    let _ = writeln!(out, "      core {} (pus {})", core.index, core.cpuset);
                    for pu in contained(&self.pus, &core.cpuset) {
                        let _ = writeln!(out, "        pu {}", pu.cpuset);
                    }
                }
            }
        }
        out
    }
}

/// Objects whose PU set falls entirely within `parent`, in index order.
fn contained<'a>(
    objects: &'a [HardwareObject],
    parent: &'a CpuSet,
) -> impl Iterator<Item = &'a HardwareObject> {
    objects.iter().filter(move |obj| obj.cpuset.is_subset(parent))
}
