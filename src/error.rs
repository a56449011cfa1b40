//! Error taxonomy shared by the authorization core and the Gmail actions.

use std::path::PathBuf;

use crate::google::utils::ServerError;

/// The client credential descriptor is missing or malformed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed credentials: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("env var {0} is not set")]
    MissingEnv(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// The authorization server rejected consent, a code exchange or a refresh.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("token endpoint rejected the grant: {0}")]
    Rejected(#[from] ServerError),
    #[error("no authorization code was entered")]
    EmptyCode,
    #[error("consent was not completed within {0:?}")]
    ConsentTimedOut(std::time::Duration),
    #[error("consent prompt: {0}")]
    Prompt(#[source] std::io::Error),
    #[error("invalid authorization url: {0}")]
    Url(#[from] url::ParseError),
}

/// The token store could not be read or written.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("io on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt token file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unable to serialize token: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// The Gmail API call failed.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server: {0}")]
    Status(#[from] ServerError),
    #[error("unexpected response body: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Everything that can stop an authorized action from producing a result.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("auth: {0}")]
    Auth(#[from] AuthError),
    #[error("persistence: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("remote: {0}")]
    Remote(#[from] RemoteError),
}
