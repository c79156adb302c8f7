//! One-time node/rank resolution over a process group.
//!
//! Every member hashes its host identity into a fingerprint, the group
//! all-gathers the (rank, fingerprint) records, and node ids plus
//! within-node ranks are assigned by a deterministic scan in ascending
//! global-rank order. The result is the same on every member of a node
//! partition, given the same rank ordering and fingerprints.

use {
    crate::{error::GroupError, ProcessGroup},
    serde::{Deserialize, Serialize},
};

/// Fixed seeds so the fingerprint hash agrees across all processes of a
/// job. Processes sharing a host hash the same name to the same value;
/// processes on different hosts collide only with negligible probability.
const FINGERPRINT_SEEDS: (u64, u64, u64, u64) = (
    0x6870_6269_6e64_2e31,
    0x9e37_79b9_7f4a_7c15,
    0xc2b2_ae3d_27d4_eb4f,
    0x1656_67b1_9e37_79f9,
);

/// The record each member contributes to the collective exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct FingerprintRecord {
    rank: u32,
    fingerprint: u64,
}

/// Process-local placement facts, computed exactly once per context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRankInfo {
    /// This process's node id; shared by every co-located process.
    pub node_id: usize,
    /// Distinct nodes across the whole group.
    pub nnodes: usize,
    /// Processes sharing this process's node.
    pub nnoderanks: usize,
    /// This process's 0-based rank within its node partition.
    pub noderank: usize,
}

/// Hashes an arbitrary host identity into a fingerprint.
pub fn fingerprint_of(identity: &[u8]) -> u64 {
    let (k0, k1, k2, k3) = FINGERPRINT_SEEDS;
    ahash::RandomState::with_seeds(k0, k1, k2, k3).hash_one(identity)
}

/// The default node-identity fingerprint: a hash of the host's stable name.
pub fn node_fingerprint() -> Result<u64, GroupError> {
    let hostname = nix::unistd::gethostname()
        .map_err(|errno| std::io::Error::from_raw_os_error(errno as i32))?;
    Ok(fingerprint_of(hostname.as_encoded_bytes()))
}

/// Resolves this process's node identity and node rank.
///
/// Blocking and collective: every member of `group` must call this (with
/// its own fingerprint) for any member to complete, and there is no
/// timeout, so a member that never participates blocks the whole group.
/// Any failure of the underlying exchange aborts with no partial result.
pub fn resolve<G>(group: &G, fingerprint: u64) -> Result<NodeRankInfo, GroupError>
where
    G: ProcessGroup + ?Sized,
{
    let rank = group.rank();
    let size = group.size();
    if rank >= size {
        return Err(GroupError::Comm(format!(
            "rank {rank} is out of range for a group of {size}"
        )));
    }

    let record = FingerprintRecord {
        rank: rank as u32,
        fingerprint,
    };
    let gathered = group.all_gather(&bincode::serialize(&record)?)?;
    if gathered.len() != size {
        return Err(GroupError::ShortGather {
            size,
            records: gathered.len(),
        });
    }

    let mut fingerprints = Vec::with_capacity(size);
    for (slot, bytes) in gathered.iter().enumerate() {
        let record: FingerprintRecord = bincode::deserialize(bytes)?;
        if record.rank as usize != slot {
            return Err(GroupError::Comm(format!(
                "gather slot {slot} holds a record from rank {}",
                record.rank
            )));
        }
        fingerprints.push(record.fingerprint);
    }

    let info = assign(&fingerprints, rank);
    log::debug!(
        "rank {rank}: node {} of {}, noderank {} of {}",
        info.node_id,
        info.nnodes,
        info.noderank,
        info.nnoderanks
    );
    Ok(info)
}

/// Deterministic assignment over rank-ordered fingerprints: the first
/// member seen with a new fingerprint claims the next node id; members
/// sharing a previously seen fingerprint reuse its node id; noderanks
/// count same-node members with a lower global rank.
fn assign(fingerprints: &[u64], my_rank: usize) -> NodeRankInfo {
    let mut node_ids = Vec::with_capacity(fingerprints.len());
    let mut seen: Vec<u64> = Vec::new();

    for &fingerprint in fingerprints {
        match seen.iter().position(|&s| s == fingerprint) {
            Some(node_id) => node_ids.push(node_id),
            None => {
                node_ids.push(seen.len());
                seen.push(fingerprint);
            }
        }
    }

    let node_id = node_ids[my_rank];
    let nnoderanks = node_ids.iter().filter(|&&n| n == node_id).count();
    let noderank = node_ids[..my_rank]
        .iter()
        .filter(|&&n| n == node_id)
        .count();

    NodeRankInfo {
        node_id,
        nnodes: seen.len(),
        nnoderanks,
        noderank,
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::SingleProcessGroup};

    const A: u64 = 0xaaaa;
    const B: u64 = 0xbbbb;
    const C: u64 = 0xcccc;

    #[test]
    fn test_assign_two_nodes_of_two() {
        let fps = [A, A, B, B];
        for (rank, expected) in [
            (0, (0, 0)), // (node_id, noderank)
            (1, (0, 1)),
            (2, (1, 0)),
            (3, (1, 1)),
        ] {
            let info = assign(&fps, rank);
            assert_eq!(info.nnodes, 2, "rank {rank}");
            assert_eq!(info.nnoderanks, 2, "rank {rank}");
            assert_eq!((info.node_id, info.noderank), expected, "rank {rank}");
        }
    }

    #[test]
    fn test_assign_interleaved_hosts() {
        // Node ids follow first-seen order, not grouping
        let fps = [A, B, A, B, C];
        assert_eq!(assign(&fps, 0).node_id, 0);
        assert_eq!(assign(&fps, 1).node_id, 1);
        assert_eq!(assign(&fps, 2).node_id, 0);
        assert_eq!(assign(&fps, 2).noderank, 1);
        assert_eq!(assign(&fps, 3).noderank, 1);
        assert_eq!(assign(&fps, 4).node_id, 2);
        assert_eq!(assign(&fps, 4).nnoderanks, 1);
        assert_eq!(assign(&fps, 0).nnodes, 3);
    }

    #[test]
    fn test_assign_noderanks_contiguous() {
        let fps = [A, B, B, A, B, A, A];
        for node in 0..2 {
            let mut noderanks: Vec<usize> = (0..fps.len())
                .map(|rank| assign(&fps, rank))
                .filter(|info| info.node_id == node)
                .map(|info| info.noderank)
                .collect();
            noderanks.sort_unstable();
            let expected: Vec<usize> = (0..noderanks.len()).collect();
            assert_eq!(noderanks, expected, "node {node}");
        }
    }

    #[test]
    fn test_resolve_single_process_group() {
        let info = resolve(&SingleProcessGroup::new(), A).unwrap();
        assert_eq!(info.nnodes, 1);
        assert_eq!(info.nnoderanks, 1);
        assert_eq!(info.noderank, 0);
        assert_eq!(info.node_id, 0);
    }

    #[test]
    fn test_fingerprint_deterministic() {
        assert_eq!(fingerprint_of(b"host-a"), fingerprint_of(b"host-a"));
        assert_ne!(fingerprint_of(b"host-a"), fingerprint_of(b"host-b"));
    }

    #[test]
    fn test_node_fingerprint_stable() {
        let first = node_fingerprint().unwrap();
        let second = node_fingerprint().unwrap();
        assert_eq!(first, second);
    }
}
