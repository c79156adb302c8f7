//! The host provider seam: topology enumeration plus affinity get/set.
//!
//! Everything above this module is pure and portable; this is the one place
//! that touches sysfs and the affinity system calls. There is exactly one
//! real binding, [`SysfsProvider`], which is Linux only; all of its
//! operations return [`TopologyError::NotSupported`] on other platforms.

use crate::{cpu_set::CpuSet, error::TopologyError};
#[cfg(target_os = "linux")]
use std::{collections::BTreeMap, fs, io, path::Path};

/// Maximum CPU id that can be used with CPU_SET.
///
/// This is the standard Linux value defined in glibc. The kernel itself
/// supports more CPUs, but the cpu_set_t structure in glibc is fixed at
/// this size.
#[cfg(target_os = "linux")]
const CPU_SETSIZE: usize = 1024;

/// One processing unit as reported by the host, with the containment ids
/// needed to place it in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PuDescriptor {
    /// Logical CPU id (the id used in affinity masks).
    pub pu: usize,
    /// NUMA node the PU belongs to.
    pub node: usize,
    /// Physical package (socket) id.
    pub socket: usize,
    /// Core id, unique only within its socket.
    pub core: usize,
}

/// A raw snapshot of the host's processing units, taken once during
/// discovery. [`TopologyModel`](crate::model::TopologyModel) turns this
/// into the indexed arena.
#[derive(Debug, Clone, Default)]
pub struct RawTopology {
    pub pus: Vec<PuDescriptor>,
}

/// Capability interface over the host: enumerate the hardware hierarchy and
/// get/set the calling thread's affinity mask.
pub trait HostProvider: Send + Sync {
    /// Enumerates the host's processing units. Called exactly once per
    /// context, during initialization.
    fn discover(&self) -> Result<RawTopology, TopologyError>;

    /// The set of PUs the calling thread may currently execute on.
    fn current_affinity(&self) -> Result<CpuSet, TopologyError>;

    /// Restricts the calling thread to the given PUs.
    fn set_affinity(&self, cpus: &CpuSet) -> Result<(), TopologyError>;
}

/// The real host binding: sysfs enumeration plus
/// `sched_getaffinity`/`sched_setaffinity`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysfsProvider;

impl SysfsProvider {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "linux")]
impl SysfsProvider {
    /// Reads the PU -> NUMA node mapping from /sys/devices/system/node.
    /// Hosts without the node directory are treated as single-node.
    fn node_of_cpu() -> BTreeMap<usize, usize> {
        let mut mapping = BTreeMap::new();
        let node_root = Path::new("/sys/devices/system/node");
        let Ok(entries) = fs::read_dir(node_root) else {
            return mapping;
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(id_str) = name.strip_prefix("node") else {
                continue;
            };
            let Ok(node_id) = id_str.parse::<usize>() else {
                continue;
            };
            let cpulist_path = node_root.join(format!("node{node_id}/cpulist"));
            if let Ok(content) = fs::read_to_string(&cpulist_path) {
                if let Ok(cpus) = content.trim().parse::<CpuSet>() {
                    for cpu in cpus.iter() {
                        mapping.insert(cpu, node_id);
                    }
                }
            }
        }
        mapping
    }

    /// Reads one numeric per-CPU topology attribute from sysfs.
    fn cpu_attr(cpu: usize, attr: &str) -> Option<usize> {
        let path = format!("/sys/devices/system/cpu/cpu{cpu}/topology/{attr}");
        fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    /// The online PUs, from sysfs with a sysconf fallback.
    fn online_cpus() -> Result<CpuSet, TopologyError> {
        if let Ok(content) = fs::read_to_string("/sys/devices/system/cpu/online") {
            let cpus: CpuSet = content.trim().parse()?;
            if !cpus.is_empty() {
                return Ok(cpus);
            }
        }

        // Fallback to sysconf for online processors. glibc has its own
        // fallback chain here (sysfs, /proc/stat, sched_getaffinity), which
        // provides additional robustness when sysfs is not available.
        // safety: sysconf is safe to call
        let count = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
        if count <= 0 {
            return Err(TopologyError::Io(io::Error::last_os_error()));
        }
        Ok((0..count as usize).collect())
    }
}

#[cfg(target_os = "linux")]
impl HostProvider for SysfsProvider {
    fn discover(&self) -> Result<RawTopology, TopologyError> {
        let online = Self::online_cpus()?;
        let nodes = Self::node_of_cpu();

        let mut pus = Vec::with_capacity(online.len());
        for cpu in online.iter() {
            // Hosts that expose no per-CPU topology (some containers and
            // VMs) degrade to one socket of single-PU cores.
            let socket = Self::cpu_attr(cpu, "physical_package_id").unwrap_or(0);
            let core = Self::cpu_attr(cpu, "core_id").unwrap_or(cpu);
            let node = nodes.get(&cpu).copied().unwrap_or(0);
            pus.push(PuDescriptor {
                pu: cpu,
                node,
                socket,
                core,
            });
        }

        if pus.is_empty() {
            return Err(TopologyError::Discovery(
                "no online processing units found".to_string(),
            ));
        }

        log::debug!("discovered {} online processing units", pus.len());
        Ok(RawTopology { pus })
    }

    fn current_affinity(&self) -> Result<CpuSet, TopologyError> {
        // safety: cpu_set_t is a POD type, zero-initialization is standard
        let mut cpu_set: libc::cpu_set_t = unsafe { std::mem::zeroed() };

        // safety: sched_getaffinity is safe with valid parameters
        let result = unsafe {
            libc::sched_getaffinity(
                0, // 0 means current thread
                std::mem::size_of::<libc::cpu_set_t>(),
                &mut cpu_set,
            )
        };
        if result != 0 {
            return Err(TopologyError::Io(io::Error::last_os_error()));
        }

        let mut cpus = CpuSet::new();
        for cpu in 0..CPU_SETSIZE {
            // safety: CPU_ISSET is safe with a valid cpu_set_t and cpu < CPU_SETSIZE
            if unsafe { libc::CPU_ISSET(cpu, &cpu_set) } {
                cpus.insert(cpu);
            }
        }
        Ok(cpus)
    }

    fn set_affinity(&self, cpus: &CpuSet) -> Result<(), TopologyError> {
        if cpus.is_empty() {
            return Err(TopologyError::EmptyCpuSet);
        }

        // safety: cpu_set_t is a POD type, zero-initialization is standard
        let mut cpu_set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
        for cpu in cpus.iter() {
            // Validate against CPU_SETSIZE to prevent undefined behavior
            if cpu >= CPU_SETSIZE {
                return Err(TopologyError::OutOfRange {
                    obj_type: crate::model::ObjectType::Pu,
                    index: cpu,
                    count: CPU_SETSIZE,
                });
            }
            // safety: we've validated cpu is within valid range
            unsafe {
                libc::CPU_SET(cpu, &mut cpu_set);
            }
        }

        // safety: sched_setaffinity is safe with valid parameters
        let result = unsafe {
            libc::sched_setaffinity(
                0, // 0 means current thread
                std::mem::size_of::<libc::cpu_set_t>(),
                &cpu_set,
            )
        };
        if result != 0 {
            return Err(TopologyError::Io(io::Error::last_os_error()));
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
impl HostProvider for SysfsProvider {
    fn discover(&self) -> Result<RawTopology, TopologyError> {
        Err(TopologyError::NotSupported)
    }

    fn current_affinity(&self) -> Result<CpuSet, TopologyError> {
        Err(TopologyError::NotSupported)
    }

    fn set_affinity(&self, _cpus: &CpuSet) -> Result<(), TopologyError> {
        Err(TopologyError::NotSupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_os = "linux")]
    fn test_discover_finds_pus() {
        let raw = SysfsProvider::new().discover().expect("discovery failed");
        assert!(!raw.pus.is_empty(), "should find at least one PU");

        // PU ids must be unique
        let mut ids: Vec<usize> = raw.pus.iter().map(|p| p.pu).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), raw.pus.len(), "PU ids should be unique");
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_current_affinity_nonempty() {
        let affinity = SysfsProvider::new()
            .current_affinity()
            .expect("failed to read affinity");
        assert!(!affinity.is_empty(), "thread must be runnable somewhere");
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_set_affinity_rejects_empty() {
        let result = SysfsProvider::new().set_affinity(&CpuSet::new());
        assert!(matches!(result.unwrap_err(), TopologyError::EmptyCpuSet));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_set_and_restore_affinity() {
        let provider = SysfsProvider::new();
        let original = provider.current_affinity().expect("get affinity");

        let narrow: CpuSet = original.first().into_iter().collect();
        match provider.set_affinity(&narrow) {
            Ok(()) => {
                let now = provider.current_affinity().expect("get affinity");
                assert_eq!(now, narrow);
                provider.set_affinity(&original).expect("restore affinity");
                assert_eq!(provider.current_affinity().expect("get affinity"), original);
            }
            // Permission denied is acceptable in CI and containers
            Err(TopologyError::Io(err)) if err.raw_os_error() == Some(libc::EPERM) => {
                eprintln!("skipping affinity test: insufficient permissions");
            }
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    #[test]
    #[cfg(not(target_os = "linux"))]
    fn test_not_supported_on_non_linux() {
        let provider = SysfsProvider::new();
        assert!(matches!(
            provider.discover().unwrap_err(),
            TopologyError::NotSupported
        ));
        assert!(matches!(
            provider.current_affinity().unwrap_err(),
            TopologyError::NotSupported
        ));
        assert!(matches!(
            provider.set_affinity(&CpuSet::new()).unwrap_err(),
            TopologyError::NotSupported
        ));
    }
}
