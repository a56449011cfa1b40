//! Out-of-band consent: show the operator a url and wait for the code they paste back.

use std::io::{self, BufRead};

use tokio::{
    io::AsyncWriteExt,
    sync::{mpsc, Mutex},
};
use tracing::{debug, info};
use url::Url;

use crate::error::AuthError;

#[async_trait::async_trait]
pub trait ConsentPrompt: Send + Sync {
    /// Present `consent_url` and return the authorization code the operator obtained from it.
    async fn request_code(&self, consent_url: &Url) -> Result<String, AuthError>;
}

/// Prints the url on stdout and takes the next line typed on stdin.
///
/// Lines come from a single reader thread, so a prompt that is cancelled
/// mid-wait leaves the next line for whoever prompts after it.
#[derive(Debug)]
pub struct StdinPrompt {
    lines: Mutex<mpsc::Receiver<io::Result<String>>>,
}

impl StdinPrompt {
    pub fn new() -> io::Result<Self> {
        Self::with_reader(io::BufReader::new(io::stdin()))
    }

    pub fn with_reader(reader: impl BufRead + Send + 'static) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel(1);
        std::thread::Builder::new()
            .name("consent-stdin".into())
            .spawn(move || forward_lines(reader, tx))?;
        Ok(Self {
            lines: Mutex::new(rx),
        })
    }
}

fn forward_lines(reader: impl BufRead, tx: mpsc::Sender<io::Result<String>>) {
    for line in reader.lines() {
        if tx.blocking_send(line).is_err() {
            break;
        }
    }
    debug!(message = "Consent input closed");
}

#[async_trait::async_trait]
impl ConsentPrompt for StdinPrompt {
    async fn request_code(&self, consent_url: &Url) -> Result<String, AuthError> {
        info!(message = "Consent required", url = %consent_url);

        let mut stdout = tokio::io::stdout();
        let banner = format!(
            "Authorize this app by visiting this url: {consent_url}\nEnter the code from that page here: "
        );
        stdout
            .write_all(banner.as_bytes())
            .await
            .map_err(AuthError::Prompt)?;
        stdout.flush().await.map_err(AuthError::Prompt)?;

        let line = self
            .lines
            .lock()
            .await
            .recv()
            .await
            .unwrap_or_else(|| Err(io::ErrorKind::UnexpectedEof.into()))
            .map_err(AuthError::Prompt)?;

        normalize_code(&line)
    }
}

/// Accepts either the bare code or the whole redirect url the browser landed on.
pub fn normalize_code(input: &str) -> Result<String, AuthError> {
    let input = input.trim();
    let is_url = input.starts_with("http://") || input.starts_with("https://");
    let code = match Url::parse(input) {
        Ok(url) if is_url => url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default(),
        _ => input.to_owned(),
    };
    if code.is_empty() {
        return Err(AuthError::EmptyCode);
    }
    Ok(code)
}
