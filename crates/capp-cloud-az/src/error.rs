//! Azure CLI backend error types

use capp_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzError {
    #[error("az not found. Please install the Azure CLI: https://aka.ms/installazurecli")]
    AzNotFound,

    #[error("Not logged in to Azure. Run 'az login' first: {0}")]
    NotLoggedIn(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Request throttled: {0}")]
    Throttled(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("az command failed: {0}")]
    CommandFailed(String),

    #[error("Unexpected az output: {0}")]
    UnexpectedOutput(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<AzError> for CloudError {
    fn from(err: AzError) -> Self {
        match err {
            AzError::NotFound(m) => CloudError::NotFound(m),
            AzError::Throttled(m) => CloudError::Throttled(m),
            AzError::PermissionDenied(m) => CloudError::PermissionDenied(m),
            AzError::JsonError(e) => CloudError::Json(e),
            AzError::IoError(e) => CloudError::Io(e),
            other => CloudError::CommandFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AzError>;
