//! GitHub source host error types

use capp_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("GitHub API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid repository '{0}': expected owner/repo")]
    InvalidRepo(String),

    #[error("No deployment workflow for '{app}' in {repo}")]
    WorkflowNotFound { repo: String, app: String },

    #[error("Unsupported content encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Base64 decode error: {0}")]
    DecodeError(#[from] base64::DecodeError),

    #[error("File is not UTF-8: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<GitHubError> for CloudError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::ApiError { status: 404, message } => CloudError::NotFound(message),
            GitHubError::ApiError { status: 429, message } => CloudError::Throttled(message),
            GitHubError::ApiError {
                status: 401 | 403,
                message,
            } => {
                if message.to_ascii_lowercase().contains("rate limit") {
                    CloudError::Throttled(message)
                } else {
                    CloudError::PermissionDenied(message)
                }
            }
            GitHubError::ApiError { status, message } => CloudError::Api { status, message },
            e @ GitHubError::WorkflowNotFound { .. } => CloudError::NotFound(e.to_string()),
            GitHubError::JsonError(e) => CloudError::Json(e),
            other => CloudError::CommandFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, message: &str) -> GitHubError {
        GitHubError::ApiError {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(CloudError::from(api(404, "Not Found")), CloudError::NotFound(_)));
        assert!(matches!(
            CloudError::from(api(403, "API rate limit exceeded")),
            CloudError::Throttled(_)
        ));
        assert!(matches!(
            CloudError::from(api(401, "Bad credentials")),
            CloudError::PermissionDenied(_)
        ));
        assert!(matches!(
            CloudError::from(api(500, "boom")),
            CloudError::Api { status: 500, .. }
        ));
    }
}
