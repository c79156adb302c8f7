//! Error types for process-group communication.

use {std::io, thiserror::Error};

/// Errors that can occur during collective exchanges or while computing the
/// local node fingerprint.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GroupError {
    /// The collective exchange could not complete
    #[error("collective exchange failed: {0}")]
    Comm(String),

    /// A gathered record could not be encoded or decoded
    #[error("failed to encode collective record: {0}")]
    Codec(#[from] bincode::Error),

    /// I/O or system call error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The gather returned the wrong number of records
    #[error("group size is {size} but the gather returned {records} record(s)")]
    ShortGather { size: usize, records: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GroupError::Comm("member disconnected".to_string());
        assert_eq!(
            err.to_string(),
            "collective exchange failed: member disconnected"
        );

        let err = GroupError::ShortGather {
            size: 4,
            records: 3,
        };
        assert_eq!(
            err.to_string(),
            "group size is 4 but the gather returned 3 record(s)"
        );
    }
}
