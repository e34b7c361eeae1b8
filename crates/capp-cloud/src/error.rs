//! Cloud collaborator error types

use thiserror::Error;

/// Errors reported by the cloud management collaborators
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Request throttled: {0}")]
    Throttled(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Invalid resource id: {0}")]
    InvalidResourceId(String),

    #[error("Operation did not succeed: {0}")]
    OperationFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }

    /// Transient failures a caller may want to retry later (never retried here)
    pub fn is_transient(&self) -> bool {
        matches!(self, CloudError::Throttled(_) | CloudError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

/// Collapse a not-found lookup into `None`, keep every other failure.
pub trait CloudResultExt<T> {
    fn found(self) -> Result<Option<T>>;
}

impl<T> CloudResultExt<T> for Result<T> {
    fn found(self) -> Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(CloudError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_collapses_only_not_found() {
        let ok: Result<u32> = Ok(3);
        assert_eq!(ok.found().unwrap(), Some(3));

        let missing: Result<u32> = Err(CloudError::NotFound("rg".into()));
        assert_eq!(missing.found().unwrap(), None);

        let throttled: Result<u32> = Err(CloudError::Throttled("429".into()));
        assert!(matches!(throttled.found(), Err(CloudError::Throttled(_))));

        let denied: Result<u32> = Err(CloudError::PermissionDenied("403".into()));
        assert!(denied.found().is_err());
    }

    #[test]
    fn test_transient_classification() {
        assert!(CloudError::Throttled("x".into()).is_transient());
        assert!(!CloudError::NotFound("x".into()).is_transient());
        assert!(CloudError::NotFound("x".into()).is_not_found());
    }
}
