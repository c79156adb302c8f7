//! In-memory host provider for tests and harnesses.
//!
//! Only available with the `dev-context-only-utils` feature.

use {
    crate::{
        cpu_set::CpuSet,
        error::TopologyError,
        provider::{HostProvider, PuDescriptor, RawTopology},
    },
    std::{
        io,
        sync::{
            atomic::{AtomicBool, Ordering},
            Mutex,
        },
    },
};

/// A synthetic host: a regular node/socket/core/PU grid and an in-memory
/// affinity cell, so binding behavior can be exercised without touching OS
/// state or needing elevated permissions.
#[derive(Debug)]
pub struct FakeProvider {
    raw: RawTopology,
    affinity: Mutex<CpuSet>,
    fail_next_set: AtomicBool,
}

impl FakeProvider {
    /// A host with `nodes * sockets_per_node * cores_per_socket *
    /// pus_per_core` PUs, numbered contiguously from 0. The initial
    /// affinity is the full machine.
    pub fn new(
        nodes: usize,
        sockets_per_node: usize,
        cores_per_socket: usize,
        pus_per_core: usize,
    ) -> Self {
        let mut pus = Vec::new();
        let mut pu = 0;
        for node in 0..nodes {
            for socket_in_node in 0..sockets_per_node {
                let socket = node * sockets_per_node + socket_in_node;
                for core in 0..cores_per_socket {
                    for _ in 0..pus_per_core {
                        pus.push(PuDescriptor {
                            pu,
                            node,
                            socket,
                            core,
                        });
                        pu += 1;
                    }
                }
            }
        }

        let machine: CpuSet = (0..pu).collect();
        Self {
            raw: RawTopology { pus },
            affinity: Mutex::new(machine),
            fail_next_set: AtomicBool::new(false),
        }
    }

    /// 1 node, 2 sockets, 2 cores per socket, 2 PUs per core: 8 PUs.
    pub fn small() -> Self {
        Self::new(1, 2, 2, 2)
    }

    /// Makes the next `set_affinity` call fail with a permission error,
    /// for exercising rollback paths.
    pub fn fail_next_set_affinity(&self) {
        self.fail_next_set.store(true, Ordering::SeqCst);
    }
}

impl HostProvider for FakeProvider {
    fn discover(&self) -> Result<RawTopology, TopologyError> {
        Ok(self.raw.clone())
    }

    fn current_affinity(&self) -> Result<CpuSet, TopologyError> {
        Ok(self
            .affinity
            .lock()
            .map_err(|_| TopologyError::Discovery("affinity cell poisoned".to_string()))?
            .clone())
    }

    fn set_affinity(&self, cpus: &CpuSet) -> Result<(), TopologyError> {
        if cpus.is_empty() {
            return Err(TopologyError::EmptyCpuSet);
        }
        if self.fail_next_set.swap(false, Ordering::SeqCst) {
            return Err(TopologyError::Io(io::Error::from(
                io::ErrorKind::PermissionDenied,
            )));
        }
        *self
            .affinity
            .lock()
            .map_err(|_| TopologyError::Discovery("affinity cell poisoned".to_string()))? =
            cpus.clone();
        Ok(())
    }
}
