use std::sync::Arc;

use anyhow::Context;
use gmail_relay::{
    api::http::{self, AppState},
    config::Config,
    google::{
        auth::{
            consent::StdinPrompt, credentials, flow::AuthorizationFlow, oauth::OAuthClient,
            token_cache::FileTokenCache,
        },
        gmail::Gmail,
    },
    upload::UploadDir,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(err).context("unable to load .env");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    let reqwest_client = reqwest::Client::builder()
        .build()
        .context("unable to build the http client")?;

    let client_credentials = credentials::from_config(&config)
        .load()
        .context("unable to load client credentials")?;

    let token_cache = Arc::new(FileTokenCache::new(config.token_path.clone()));
    if config.refresh_token.is_none() && !config.token_path.exists() {
        warn!(
            message = "No stored token, the first request will wait for consent on stdin",
            token_path = ?config.token_path,
        );
    }

    let prompt = StdinPrompt::new().context("unable to start the consent reader")?;
    let flow = AuthorizationFlow::new(
        OAuthClient::new(reqwest_client.clone(), client_credentials),
        token_cache,
        Arc::new(prompt),
    )
    .with_refresh_token(config.refresh_token.clone())
    .with_consent_timeout(config.consent_timeout);

    let state = AppState {
        flow: Arc::new(flow),
        gmail: Gmail::new(reqwest_client),
        uploads: UploadDir::new(config.upload_dir.clone()),
        mail: config.mail.clone(),
    };
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("unable to bind {}", config.listen_addr))?;

    info!(message = "Server listening", addr = %config.listen_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
