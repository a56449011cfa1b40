#[derive(Debug, thiserror::Error)]
#[error("{status_code} status code{}", body_suffix(.body))]
pub struct ServerError {
    pub status_code: u16,
    pub body: String,
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

/// Turns a non-2xx response into a [`ServerError`], keeping the body for the logs.
pub async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, ServerError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(ServerError {
            status_code: status.as_u16(),
            body,
        });
    }
    Ok(res)
}
