use thiserror::Error;

/// Failure reported by the host's persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    /// Connectivity-style failure; autosave retries on its next cycle.
    #[error("transient persistence failure: {0}")]
    Transient(String),
    /// The host refused the write.
    #[error("persistence rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("unknown item `{0}`")]
    UnknownItem(String),
    #[error("a session is already active on item `{0}`")]
    SessionActive(String),
    #[error("no active session")]
    NoSession,
    #[error("item `{0}` is owned by an active session")]
    SessionConflict(String),
    #[error("unsupported grid size {0} (expected 10, 20 or 40)")]
    InvalidGridSize(f32),
    #[error("missing required metadata: {}", .0.join(", "))]
    MissingMetadata(Vec<String>),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_metadata_lists_fields() {
        let err = LayoutError::MissingMetadata(vec!["title".to_string(), "grade".to_string()]);
        assert_eq!(err.to_string(), "missing required metadata: title, grade");
    }

    #[test]
    fn persist_error_converts() {
        let err: LayoutError = PersistError::Transient("offline".to_string()).into();
        assert!(err.to_string().contains("offline"));
    }
}
