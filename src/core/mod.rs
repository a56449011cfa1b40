use crate::{
    error::RemoteError,
    google::auth::{ClientCredentials, Token},
};

/// Credentials plus a token that was just issued, refreshed or loaded from the cache.
///
/// Only [`crate::google::auth::flow::AuthorizationFlow`] builds these.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    credentials: ClientCredentials,
    token: Token,
}

impl AuthorizedClient {
    pub(crate) fn new(credentials: ClientCredentials, token: Token) -> Self {
        Self { credentials, token }
    }

    pub fn access_token(&self) -> &str {
        &self.token.access_token
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    /// Attach the bearer token to an outgoing request.
    pub fn sign(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(self.access_token())
    }
}

/// One remote operation that needs an authorized client.
///
/// `perform` takes `self` so an action runs at most once.
#[async_trait::async_trait]
pub trait AuthorizedAction: Send {
    type Output: Send;

    async fn perform(self, client: AuthorizedClient) -> Result<Self::Output, RemoteError>;
}
