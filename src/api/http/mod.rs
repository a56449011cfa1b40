//! The HTTP surface: four routes, each running one authorized Gmail action.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::{
    config::MailSettings,
    google::{auth::flow::AuthorizationFlow, gmail::Gmail},
    upload::UploadDir,
};

pub mod error;
mod routes;

/// Gmail rejects messages above 25 MB, so larger uploads are refused up front.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub flow: Arc<AuthorizationFlow>,
    pub gmail: Gmail,
    pub uploads: UploadDir,
    pub mail: MailSettings,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/getLabels", get(routes::get_labels))
        .route("/getProfileInfo", get(routes::get_profile_info))
        .route("/listEmail", get(routes::list_email))
        .route("/sendEmail", post(routes::send_email))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
