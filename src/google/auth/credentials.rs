//! Load the OAuth client descriptor.

use std::path::PathBuf;

use super::ClientCredentials;
use crate::{config::Config, error::ConfigError};

pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<ClientCredentials, ConfigError>;
}

/// Reads the `credentials.json` downloaded from the Google cloud console.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    pub path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn parse(raw: &str) -> Result<ClientCredentials, ConfigError> {
        let file: model::CredentialsFile = serde_json::from_str(raw)?;
        let client = file
            .web
            .or(file.installed)
            .ok_or(ConfigError::MissingField("web"))?;

        let client_id = required(client.client_id, "client_id")?;
        let client_secret = required(client.client_secret, "client_secret")?;
        let redirect_uri = required(
            client.redirect_uris.and_then(|uris| uris.into_iter().next()),
            "redirect_uris",
        )?;

        Ok(ClientCredentials {
            client_id,
            client_secret,
            redirect_uri,
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<ClientCredentials, ConfigError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        Self::parse(&raw)
    }
}

/// Takes the client descriptor straight from `CLIENT_ID`, `CLIENT_SECRET` and `REDIRECT_URI`.
#[derive(Debug, Clone)]
pub struct EnvCredentialStore {
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
}

impl EnvCredentialStore {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.load().is_ok()
    }
}

impl CredentialStore for EnvCredentialStore {
    fn load(&self) -> Result<ClientCredentials, ConfigError> {
        Ok(ClientCredentials {
            client_id: non_empty(&self.client_id).ok_or(ConfigError::MissingEnv("CLIENT_ID"))?,
            client_secret: non_empty(&self.client_secret)
                .ok_or(ConfigError::MissingEnv("CLIENT_SECRET"))?,
            redirect_uri: non_empty(&self.redirect_uri)
                .ok_or(ConfigError::MissingEnv("REDIRECT_URI"))?,
        })
    }
}

/// Environment keys win when all three are present, otherwise the credentials file is used.
pub fn from_config(config: &Config) -> Box<dyn CredentialStore> {
    let env = EnvCredentialStore::from_config(config);
    if env.is_complete() {
        Box::new(env)
    } else {
        Box::new(FileCredentialStore::new(config.credentials_path.clone()))
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::MissingField(field))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|value| !value.trim().is_empty()).cloned()
}

mod model {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct CredentialsFile {
        pub web: Option<ClientSection>,
        pub installed: Option<ClientSection>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ClientSection {
        pub client_id: Option<String>,
        pub client_secret: Option<String>,
        pub redirect_uris: Option<Vec<String>>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "web": {
            "client_id": "id.apps.googleusercontent.com",
            "client_secret": "shh",
            "redirect_uris": ["http://localhost:3001/oauth2callback", "http://other"]
        }
    }"#;

    #[test]
    fn parses_web_section() {
        let credentials = FileCredentialStore::parse(FULL).unwrap();
        assert_eq!(credentials.client_id, "id.apps.googleusercontent.com");
        assert_eq!(credentials.client_secret, "shh");
        assert_eq!(
            credentials.redirect_uri,
            "http://localhost:3001/oauth2callback"
        );
    }

    #[test]
    fn parses_installed_section() {
        let raw = r#"{"installed": {"client_id": "a", "client_secret": "b", "redirect_uris": ["urn:ietf:wg:oauth:2.0:oob"]}}"#;
        let credentials = FileCredentialStore::parse(raw).unwrap();
        assert_eq!(credentials.redirect_uri, "urn:ietf:wg:oauth:2.0:oob");
    }

    #[test]
    fn missing_fields_are_config_errors() {
        let cases = [
            (r#"{"web": {"client_secret": "b", "redirect_uris": ["r"]}}"#, "client_id"),
            (r#"{"web": {"client_id": "a", "redirect_uris": ["r"]}}"#, "client_secret"),
            (r#"{"web": {"client_id": "a", "client_secret": "b"}}"#, "redirect_uris"),
            (r#"{"web": {"client_id": "a", "client_secret": "b", "redirect_uris": []}}"#, "redirect_uris"),
            (r#"{"web": {"client_id": "", "client_secret": "b", "redirect_uris": ["r"]}}"#, "client_id"),
            (r#"{}"#, "web"),
        ];
        for (raw, field) in cases {
            match FileCredentialStore::parse(raw) {
                Err(ConfigError::MissingField(missing)) => assert_eq!(missing, field, "{raw}"),
                other => panic!("expected missing {field} for {raw}, got {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_file_is_config_error() {
        assert!(matches!(
            FileCredentialStore::parse("not json"),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        assert!(matches!(store.load(), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn env_store_reports_first_missing_key() {
        let store = EnvCredentialStore {
            client_id: Some("a".into()),
            client_secret: None,
            redirect_uri: Some("r".into()),
        };
        assert!(!store.is_complete());
        assert!(matches!(
            store.load(),
            Err(ConfigError::MissingEnv("CLIENT_SECRET"))
        ));
    }
}
