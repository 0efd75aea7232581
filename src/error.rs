//! Error handling
use thiserror::Error;

/// Primary error type.
///
/// This is a closed set: every fallible entry point in the
/// crate reports one of these variants, and nothing is
/// recovered internally.
#[derive(Error, Debug, PartialEq, Eq, Copy, Clone)]
pub enum TreeSeqError {
    /// A memory reservation failed.
    #[error("out of memory")]
    NoMemory,
    /// A required input is missing or invalid.
    #[error("bad parameter value")]
    BadParam,
    /// An id refers to a row that does not exist.
    #[error("id out of bounds")]
    OutOfBounds,
    /// The sample list names the same node more than once.
    #[error("duplicate sample")]
    DuplicateSample,
    /// A listed sample node does not carry
    /// [`NodeFlags::IS_SAMPLE`](crate::NodeFlags::IS_SAMPLE).
    #[error("bad sample node")]
    BadSamples,
    /// Edgeset parents are not sorted by birth time.
    #[error("records not sorted by node time")]
    RecordsNotTimeSorted,
    /// An internal invariant failed.
    #[error("generic error")]
    Generic,
}

/// Result type for operations in this crate.
pub type TreeSeqResult<T> = std::result::Result<T, TreeSeqError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(TreeSeqError::NoMemory.to_string(), "out of memory");
        assert_eq!(
            TreeSeqError::RecordsNotTimeSorted.to_string(),
            "records not sorted by node time"
        );
    }
}
