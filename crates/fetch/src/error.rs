use thiserror::Error;

/// Errors reported by a [`NodeStore`](crate::NodeStore).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeStoreError {
    /// The request was abandoned through its cancellation token.
    #[error("request canceled")]
    Canceled,
    #[error("node store failure: {0}")]
    Failed(String),
}

impl NodeStoreError {
    pub fn failed<E: std::fmt::Display>(err: E) -> Self {
        NodeStoreError::Failed(err.to_string())
    }
}

/// Errors surfaced by a search session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The session was canceled or superseded. Not a failure; callers
    /// should not report it to the user.
    #[error("search canceled")]
    Canceled,
    #[error("slice request failed: {0}")]
    SliceFailed(String),
}

impl FetchError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, FetchError::Canceled)
    }
}

impl From<NodeStoreError> for FetchError {
    fn from(err: NodeStoreError) -> Self {
        match err {
            NodeStoreError::Canceled => FetchError::Canceled,
            NodeStoreError::Failed(msg) => FetchError::SliceFailed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_not_a_failure() {
        let canceled: FetchError = NodeStoreError::Canceled.into();
        assert!(canceled.is_canceled());

        let failed: FetchError = NodeStoreError::failed("timeout").into();
        assert!(!failed.is_canceled());
        assert_eq!(failed.to_string(), "slice request failed: timeout");
    }
}
