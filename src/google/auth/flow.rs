use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
    time::Duration,
};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    consent::ConsentPrompt, oauth::OAuthClient, scope_set, token_cache::TokenCache, Token,
};
use crate::{
    core::{AuthorizedAction, AuthorizedClient},
    error::{AuthError, FlowError},
};

pub const DEFAULT_CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug)]
enum State {
    NeedConsent,
    HaveToken(Token),
    Authorized(Token),
}

/// Per credential identity locks, so only one token acquisition runs at a time.
#[derive(Debug, Default)]
pub struct AcquisitionLocks {
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AcquisitionLocks {
    pub fn lock_for(&self, identity: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(identity.to_owned()).or_default())
    }
}

pub struct AuthorizationFlow {
    oauth: OAuthClient,
    cache: Arc<dyn TokenCache>,
    prompt: Arc<dyn ConsentPrompt>,
    scopes: BTreeSet<String>,
    refresh_token: Option<String>,
    consent_timeout: Duration,
    locks: AcquisitionLocks,
}

impl AuthorizationFlow {
    pub fn new(
        oauth: OAuthClient,
        cache: Arc<dyn TokenCache>,
        prompt: Arc<dyn ConsentPrompt>,
    ) -> Self {
        Self {
            oauth,
            cache,
            prompt,
            scopes: scope_set(),
            refresh_token: None,
            consent_timeout: DEFAULT_CONSENT_TIMEOUT,
            locks: AcquisitionLocks::default(),
        }
    }

    /// A long-lived refresh token to try before falling back to interactive consent.
    pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token.filter(|token| !token.trim().is_empty());
        self
    }

    pub fn with_consent_timeout(mut self, timeout: Duration) -> Self {
        self.consent_timeout = timeout;
        self
    }

    /// Authorize, then run `action` exactly once with the resulting client.
    pub async fn run<A: AuthorizedAction>(&self, action: A) -> Result<A::Output, FlowError> {
        let client = self.authorize().await?;
        let output = action.perform(client).await?;
        Ok(output)
    }

    pub async fn authorize(&self) -> Result<AuthorizedClient, FlowError> {
        if let Some(token) = self.cache.read().await? {
            if !token.is_expired() {
                debug!(message = "Using cached token", token_expires_at = ?token.expiry);
                return Ok(self.authorized(token));
            }
        }

        let lock = self.locks.lock_for(&self.oauth.credentials.client_id);
        let _guard = lock.lock().await;

        // Whoever held the lock before us may have stored a usable token already.
        let state = match self.cache.read().await? {
            Some(token) => State::HaveToken(token),
            None => State::NeedConsent,
        };
        let token = self.acquire(state).await?;
        Ok(self.authorized(token))
    }

    async fn acquire(&self, mut state: State) -> Result<Token, FlowError> {
        loop {
            state = match state {
                State::HaveToken(token) => self.install(token).await,
                State::NeedConsent => State::Authorized(self.obtain_new_token().await?),
                State::Authorized(token) => return Ok(token),
            };
        }
    }

    async fn install(&self, token: Token) -> State {
        if !token.is_expired() {
            debug!(message = "Using stored token", token_expires_at = ?token.expiry);
            return State::Authorized(token);
        }

        let Some(refresh_token) = token.refresh_token.as_deref() else {
            info!(
                message = "Stored token expired and cannot be refreshed",
                token_expires_at = ?token.expiry,
            );
            return State::NeedConsent;
        };

        debug!(message = "Stored token expired, refreshing", token_expires_at = ?token.expiry);
        match self.oauth.refresh(refresh_token, &token.scopes).await {
            Ok(refreshed) => {
                self.persist(&refreshed).await;
                State::Authorized(refreshed)
            }
            Err(err) => {
                warn!(message = "Token refresh rejected, consent required", error = %err);
                State::NeedConsent
            }
        }
    }

    async fn obtain_new_token(&self) -> Result<Token, AuthError> {
        if let Some(refresh_token) = &self.refresh_token {
            info!(message = "No usable token found, minting one from the configured refresh token");
            match self.oauth.refresh(refresh_token, &self.scopes).await {
                Ok(token) => {
                    self.persist(&token).await;
                    return Ok(token);
                }
                Err(err) => {
                    warn!(message = "Configured refresh token rejected", error = %err);
                }
            }
        }

        info!(message = "No usable token found, about to ask for consent");

        let url = self
            .oauth
            .consent_url(self.scopes.iter().map(String::as_str))?;
        let code = tokio::time::timeout(self.consent_timeout, self.prompt.request_code(&url))
            .await
            .map_err(|_| AuthError::ConsentTimedOut(self.consent_timeout))??;

        let token = self.oauth.exchange_code(&code, &self.scopes).await?;
        debug!(message = "Got new token", token_expires_at = ?token.expiry);
        self.persist(&token).await;
        Ok(token)
    }

    /// A failed write leaves the request running on the in-memory token.
    async fn persist(&self, token: &Token) {
        if let Err(err) = self.cache.write(token).await {
            warn!(message = "Unable to store token, continuing with in-memory token", error = %err);
        }
    }

    fn authorized(&self, token: Token) -> AuthorizedClient {
        AuthorizedClient::new(self.oauth.credentials.clone(), token)
    }
}
