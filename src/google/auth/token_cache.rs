//! Durable storage for the OAuth token.

use std::path::PathBuf;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::{parse_scopes, Token};
use crate::error::PersistenceError;

#[async_trait::async_trait]
pub trait TokenCache: Send + Sync {
    /// `Ok(None)` means nothing was ever stored, which is the normal first-run state.
    async fn read(&self) -> Result<Option<Token>, PersistenceError>;
    /// Overwrites whatever was stored before.
    async fn write(&self, token: &Token) -> Result<(), PersistenceError>;
}

/// Stores the token as a `token.json` in the layout the Google client libraries use.
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
}

impl FileTokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait::async_trait]
impl TokenCache for FileTokenCache {
    async fn read(&self) -> Result<Option<Token>, PersistenceError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(message = "No stored token", path = ?self.path);
                return Ok(None);
            }
            Err(err) => return Err(self.io_error(err)),
        };
        let file: model::TokenFile =
            serde_json::from_slice(&raw).map_err(|source| PersistenceError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(file.into()))
    }

    async fn write(&self, token: &Token) -> Result<(), PersistenceError> {
        let serialized = serde_json::to_vec(&model::TokenFile::from(token))
            .map_err(PersistenceError::Serialize)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| self.io_error(err))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, serialized)
            .await
            .map_err(|err| self.io_error(err))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|err| self.io_error(err))?;
        }
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|err| self.io_error(err))?;

        debug!(message = "Token stored", path = ?self.path, token_expires_at = ?token.expiry);
        Ok(())
    }
}

/// Keeps the token in process memory only.
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    token: Mutex<Option<Token>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: Token) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

#[async_trait::async_trait]
impl TokenCache for MemoryTokenCache {
    async fn read(&self) -> Result<Option<Token>, PersistenceError> {
        Ok(self.token.lock().await.clone())
    }

    async fn write(&self, token: &Token) -> Result<(), PersistenceError> {
        self.token.lock().await.replace(token.clone());
        Ok(())
    }
}

mod model {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TokenFile {
        pub access_token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub refresh_token: Option<String>,
        #[serde(default)]
        pub scope: String,
        #[serde(default = "bearer")]
        pub token_type: String,
        /// Epoch milliseconds. Files without it are treated as already expired.
        #[serde(default)]
        pub expiry_date: i64,
    }

    fn bearer() -> String {
        "Bearer".to_owned()
    }

    impl From<&Token> for TokenFile {
        fn from(token: &Token) -> Self {
            let scope = token
                .scopes
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            Self {
                access_token: token.access_token.clone(),
                refresh_token: token.refresh_token.clone(),
                scope,
                token_type: bearer(),
                expiry_date: token.expiry.timestamp_millis(),
            }
        }
    }

    impl From<TokenFile> for Token {
        fn from(file: TokenFile) -> Self {
            Self {
                access_token: file.access_token,
                refresh_token: file.refresh_token,
                expiry: DateTime::from_timestamp_millis(file.expiry_date).unwrap_or_default(),
                scopes: parse_scopes(&file.scope),
            }
        }
    }
}
