//! Talk to Google's authorization server: consent url, code exchange, refresh.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::Deserialize;
use url::Url;

use super::{parse_scopes, ClientCredentials, Token};
use crate::{error::AuthError, google::utils::check_status};

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Used when the token endpoint leaves `expires_in` out.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;
/// Lifetimes reported by the token endpoint are clamped to a day.
const MAX_EXPIRES_IN_SECS: i64 = 24 * 60 * 60;

pub struct OAuthClient {
    pub client: reqwest::Client,
    pub credentials: ClientCredentials,
    pub auth_url: String,
    pub token_url: String,
}

impl OAuthClient {
    pub fn new(client: reqwest::Client, credentials: ClientCredentials) -> Self {
        Self {
            client,
            credentials,
            auth_url: GOOGLE_AUTH_URL.to_owned(),
            token_url: GOOGLE_TOKEN_URL.to_owned(),
        }
    }

    /// The url the operator has to open to grant `scopes` with offline access.
    pub fn consent_url<'a>(
        &self,
        scopes: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, AuthError> {
        let scope = scopes.into_iter().collect::<Vec<_>>().join(" ");
        let url = Url::parse_with_params(
            &self.auth_url,
            &[
                ("access_type", "offline"),
                ("scope", scope.as_str()),
                ("response_type", "code"),
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ],
        )?;
        Ok(url)
    }

    /// Trade a one-time authorization code for a token.
    pub async fn exchange_code(
        &self,
        code: &str,
        requested: &BTreeSet<String>,
    ) -> Result<Token, AuthError> {
        let params = &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
        ];
        let response = self.post_form(params).await?;
        Ok(response.into_token(None, requested))
    }

    /// Mint a fresh access token. Google usually omits a new refresh token,
    /// in which case the one passed in is kept.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        requested: &BTreeSet<String>,
    ) -> Result<Token, AuthError> {
        let params = &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];
        let response = self.post_form(params).await?;
        Ok(response.into_token(Some(refresh_token), requested))
    }

    async fn post_form(&self, params: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let body = serde_urlencoded::to_string(params)
            .expect("string pairs always form-encode");

        let req = self
            .client
            .post(&self.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .build()?;

        let res = self.client.execute(req).await?;
        let res = check_status(res).await?;
        let token_response = res.json().await?;
        Ok(token_response)
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// The requested access token.
    access_token: String,
    /// Only issued on the first exchange with `access_type=offline`.
    refresh_token: Option<String>,
    /// The amount of time that an access token is valid (in seconds).
    expires_in: Option<i64>,
    /// Space separated scopes actually granted.
    scope: Option<String>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<&str>, requested: &BTreeSet<String>) -> Token {
        let TokenResponse {
            access_token,
            refresh_token,
            expires_in,
            scope,
        } = self;
        let refresh_token = refresh_token.or_else(|| previous_refresh.map(str::to_owned));
        let scopes = scope
            .map(|scope| parse_scopes(&scope))
            .unwrap_or_else(|| requested.clone());
        Token::expiring_in(
            access_token,
            refresh_token,
            expires_in
                .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
                .clamp(0, MAX_EXPIRES_IN_SECS),
            scopes,
            Utc::now(),
        )
    }
}
