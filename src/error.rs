//! Error kinds for the token pipeline.
//!
//! Every variant is terminal for the run. Components return these to the
//! caller and only the binary decides how to report them.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RdsAuthError {
    /// Neither `HOME` nor the platform lookup produced a home directory
    #[error("Could not determine home directory")]
    HomeDirUnavailable,

    /// A configuration file is missing or not valid ini
    #[error("Failed to read file {}: {reason}", .path.display())]
    ConfigFileUnreadable { path: PathBuf, reason: String },

    /// The environment section resolved to an empty region
    #[error("No environment named: '{environment}' found")]
    EnvironmentNotFound { environment: String },

    /// The username cannot produce a role name suffix
    #[error("Username '{username}' is too short to derive a role name")]
    InvalidUsername { username: String },

    #[error("Failed to create temp credentials file {}: {source}", .path.display())]
    EphemeralProfileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load configuration for profile '{profile}': {reason}")]
    CredentialResolutionFailed { profile: String, reason: String },

    #[error("No username found")]
    MissingUsername,

    #[error("Failed to create authentication token: {reason}")]
    TokenIssuanceFailed { reason: String },
}

pub type Result<T> = std::result::Result<T, RdsAuthError>;

impl RdsAuthError {
    /// Follow-up advice printed under the error message.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::HomeDirUnavailable => Some("Set the HOME environment variable"),
            Self::ConfigFileUnreadable { .. } => {
                Some("Check that ~/.rdsauth.ini and ~/.aws/credentials exist and are valid ini")
            }
            Self::EnvironmentNotFound { .. } => Some("Check the name and your ~/.rdsauth.ini file"),
            Self::InvalidUsername { .. } | Self::MissingUsername => {
                Some("Check the user field in your ~/.rdsauth.ini file")
            }
            Self::EphemeralProfileWriteFailed { .. } => None,
            Self::CredentialResolutionFailed { .. } | Self::TokenIssuanceFailed { .. } => {
                Some("Have you created an ~/.aws/credentials file")
            }
        }
    }
}
