//! Error types for topology discovery and affinity operations.

use {crate::model::ObjectType, std::io, thiserror::Error};

/// Errors that can occur while discovering the host topology or while
/// getting/setting the affinity mask.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TopologyError {
    /// I/O or system call error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operation not supported on this platform
    #[error("topology and affinity operations are not supported on this platform")]
    NotSupported,

    /// The host could not be enumerated
    #[error("topology discovery failed: {0}")]
    Discovery(String),

    /// Object index exceeds the discovered count for its type
    #[error("{obj_type} index {index} is out of range (count is {count})")]
    OutOfRange {
        obj_type: ObjectType,
        index: usize,
        count: usize,
    },

    /// Failed to parse sysfs topology data
    #[error("failed to parse CPU specification: {0}")]
    Parse(String),

    /// An affinity mask must name at least one PU
    #[error("CPU set cannot be empty")]
    EmptyCpuSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TopologyError::OutOfRange {
            obj_type: ObjectType::Core,
            index: 10,
            count: 8,
        };
        assert_eq!(err.to_string(), "core index 10 is out of range (count is 8)");

        let err = TopologyError::EmptyCpuSet;
        assert_eq!(err.to_string(), "CPU set cannot be empty");

        let err = TopologyError::Discovery("no PUs found".to_string());
        assert_eq!(err.to_string(), "topology discovery failed: no PUs found");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied");
        let err: TopologyError = io_err.into();
        match err {
            TopologyError::Io(err) => {
                assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
            }
            _ => panic!("Expected Io error"),
        }
    }
}
