use capp_cloud::CloudError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpError {
    #[error("{0}")]
    RequiredArgumentMissing(String),

    #[error("{0}")]
    MutuallyExclusiveArguments(String),

    #[error("{0}")]
    InvalidArgumentValue(String),

    #[error("{0}")]
    Validation(String),

    #[error("There are multiple {kind}s matching {name} on the subscription ({count} found)")]
    Ambiguous {
        kind: String,
        name: String,
        count: usize,
    },

    #[error("{message}")]
    External { message: String, hint: String },

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UpError {
    pub fn ambiguous(kind: impl Into<String>, name: impl Into<String>, count: usize) -> Self {
        UpError::Ambiguous {
            kind: kind.into(),
            name: name.into(),
            count,
        }
    }

    pub fn external(message: impl Into<String>, hint: impl Into<String>) -> Self {
        UpError::External {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Remediation hint shown under the error message
    pub fn hint(&self) -> Option<String> {
        match self {
            UpError::Ambiguous { kind, .. } => Some(match kind.as_str() {
                "container app" => "Specify the resource group of the app with --resource-group".to_string(),
                "managed environment" => {
                    "Specify the environment with --environment (and its group with --resource-group)"
                        .to_string()
                }
                _ => format!("Specify which resource group the {} is in", kind),
            }),
            UpError::External { hint, .. } if !hint.is_empty() => Some(hint.clone()),
            UpError::Cloud(CloudError::Throttled(_)) => {
                Some("The service is throttling requests. Wait a moment and run the command again".to_string())
            }
            UpError::Cloud(CloudError::PermissionDenied(_)) => {
                Some("Check the role assignments of the signed-in account (az login)".to_string())
            }
            _ => None,
        }
    }

    /// Whether the error was raised before any network call
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            UpError::RequiredArgumentMissing(_)
                | UpError::MutuallyExclusiveArguments(_)
                | UpError::InvalidArgumentValue(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, UpError>;
