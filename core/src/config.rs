//! Context configuration.

use serde::{Deserialize, Serialize};

/// Where a context gets its node-identity fingerprint.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FingerprintSource {
    /// Hash the host's stable name. Processes sharing a host agree;
    /// processes on different hosts differ with overwhelming probability.
    #[default]
    Hostname,
    /// Use a fixed value. For harness runs that simulate co-location.
    Fixed(u64),
}

/// Configuration for an [`AffinityContext`](crate::AffinityContext).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub fingerprint: FingerprintSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.fingerprint, FingerprintSource::Hostname);
    }
}
