//! Authorization logic.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

pub mod consent;
pub mod credentials;
pub mod flow;
pub mod oauth;
pub mod token_cache;

/// Permissions requested on consent. Constant for the process lifetime.
pub const GMAIL_SCOPES: &[&str] = &[
    "https://mail.google.com/",
    "https://www.googleapis.com/auth/gmail.addons.current.action.compose",
    "https://www.googleapis.com/auth/gmail.compose",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.send",
];

/// How long before the recorded expiry a token is already treated as stale.
pub const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Millisecond precision, matching what the token file can hold.
    pub expiry: DateTime<Utc>,
    pub scopes: BTreeSet<String>,
}

impl Token {
    /// Builds a token that expires `expires_in_secs` after `now`, truncated to milliseconds.
    pub fn expiring_in(
        access_token: String,
        refresh_token: Option<String>,
        expires_in_secs: i64,
        scopes: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let expiry_ms = now
            .timestamp_millis()
            .saturating_add(expires_in_secs.saturating_mul(1000));
        let expiry = DateTime::from_timestamp_millis(expiry_ms).unwrap_or(if expires_in_secs < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        });
        Self {
            access_token,
            refresh_token,
            expiry,
            scopes,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .checked_sub_signed(Duration::seconds(EXPIRY_SKEW_SECS))
            .map_or(true, |stale_at| stale_at <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

pub fn scope_set() -> BTreeSet<String> {
    GMAIL_SCOPES.iter().map(|scope| (*scope).to_owned()).collect()
}

pub fn parse_scopes(scope: &str) -> BTreeSet<String> {
    scope.split_whitespace().map(str::to_owned).collect()
}
