//! Process configuration, read once at startup from the environment.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use crate::error::ConfigError;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_CONSENT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_SUBJECT: &str = "Email from gmail-relay";
const DEFAULT_BODY: &str = "This email was sent through the Gmail API";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub to: String,
    pub from: Option<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub refresh_token: Option<String>,
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub upload_dir: PathBuf,
    pub listen_addr: SocketAddr,
    pub consent_timeout: Duration,
    pub mail: MailSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let path = |key: &str, default: &str| {
            PathBuf::from(get(key).unwrap_or_else(|| default.to_owned()))
        };

        let listen_addr = get("LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned())
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::Invalid {
                key: "LISTEN_ADDR",
                reason: err.to_string(),
            })?;

        let consent_timeout = match get("CONSENT_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|err: std::num::ParseIntError| {
                ConfigError::Invalid {
                    key: "CONSENT_TIMEOUT_SECS",
                    reason: err.to_string(),
                }
            })?,
            None => DEFAULT_CONSENT_TIMEOUT_SECS,
        };

        let mail = MailSettings {
            to: get("MAIL_TO").ok_or(ConfigError::MissingEnv("MAIL_TO"))?,
            from: get("MAIL_FROM"),
            subject: get("MAIL_SUBJECT").unwrap_or_else(|| DEFAULT_SUBJECT.to_owned()),
            body: get("MAIL_BODY").unwrap_or_else(|| DEFAULT_BODY.to_owned()),
        };

        Ok(Self {
            client_id: get("CLIENT_ID"),
            client_secret: get("CLIENT_SECRET"),
            redirect_uri: get("REDIRECT_URI"),
            refresh_token: get("REFRESH_TOKEN"),
            credentials_path: path("CREDENTIALS_PATH", "credentials.json"),
            token_path: path("TOKEN_PATH", "token.json"),
            upload_dir: path("UPLOAD_DIR", "uploads"),
            listen_addr,
            consent_timeout: Duration::from_secs(consent_timeout),
            mail,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("MAIL_TO", "someone@example.com")]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:3001".parse().unwrap());
        assert_eq!(config.token_path, PathBuf::from("token.json"));
        assert_eq!(config.credentials_path, PathBuf::from("credentials.json"));
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.consent_timeout, Duration::from_secs(300));
        assert_eq!(config.client_id, None);
        assert_eq!(config.mail.from, None);
        assert_eq!(config.mail.subject, DEFAULT_SUBJECT);
    }

    #[test]
    fn recognised_keys_are_read() {
        let config = config(&[
            ("CLIENT_ID", "id"),
            ("CLIENT_SECRET", "secret"),
            ("REDIRECT_URI", "http://localhost:3001/callback"),
            ("REFRESH_TOKEN", "1//refresh"),
            ("TOKEN_PATH", "/var/lib/relay/token.json"),
            ("LISTEN_ADDR", "127.0.0.1:8080"),
            ("CONSENT_TIMEOUT_SECS", " 30 "),
            ("MAIL_TO", "someone@example.com"),
            ("MAIL_FROM", "me@example.com"),
        ])
        .unwrap();
        assert_eq!(config.client_id.as_deref(), Some("id"));
        assert_eq!(config.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(config.token_path, PathBuf::from("/var/lib/relay/token.json"));
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.consent_timeout, Duration::from_secs(30));
        assert_eq!(config.mail.from.as_deref(), Some("me@example.com"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config =
            config(&[("MAIL_TO", "someone@example.com"), ("REFRESH_TOKEN", "  ")]).unwrap();
        assert_eq!(config.refresh_token, None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config(&[("MAIL_TO", "a@b"), ("LISTEN_ADDR", "nope")]),
            Err(ConfigError::Invalid { key: "LISTEN_ADDR", .. })
        ));
        assert!(matches!(
            config(&[("MAIL_TO", "a@b"), ("CONSENT_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::Invalid { key: "CONSENT_TIMEOUT_SECS", .. })
        ));
        assert!(matches!(config(&[]), Err(ConfigError::MissingEnv("MAIL_TO"))));
    }
}
