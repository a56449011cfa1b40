use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    Json,
};
use tracing::{debug, error, info};

use super::{
    error::{ApiError, MessageBody, SEND_OK},
    AppState,
};
use crate::{
    google::gmail::{
        mime::{Attachment, OutgoingMail},
        model, GetProfile, LabelNames, ListLabels, ListMessages, SendMessage,
    },
    upload::{sanitize_filename, UploadDir},
};

pub async fn get_labels(State(state): State<AppState>) -> Result<Json<LabelNames>, ApiError> {
    let labels = state
        .flow
        .run(ListLabels { gmail: state.gmail })
        .await
        .map_err(|err| {
            error!(message = "Listing labels failed", error = %err);
            ApiError::internal("Error while fetching labels")
        })?;
    Ok(Json(labels))
}

pub async fn get_profile_info(
    State(state): State<AppState>,
) -> Result<Json<model::Profile>, ApiError> {
    let profile = state
        .flow
        .run(GetProfile { gmail: state.gmail })
        .await
        .map_err(|err| {
            error!(message = "Fetching profile failed", error = %err);
            ApiError::internal("Error while fetching profile")
        })?;
    Ok(Json(profile))
}

pub async fn list_email(
    State(state): State<AppState>,
) -> Result<Json<model::MessageList>, ApiError> {
    let messages = state
        .flow
        .run(ListMessages::recent(state.gmail))
        .await
        .map_err(|err| {
            error!(message = "Listing messages failed", error = %err);
            ApiError::internal("Error while listing emails")
        })?;
    Ok(Json(messages))
}

/// Sends the configured mail, attaching the first uploaded file if the body is multipart.
pub async fn send_email(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageBody>, ApiError> {
    let attachment = match multipart {
        Ok(multipart) => read_attachment(&state.uploads, multipart)
            .await
            .map_err(|err| {
                error!(message = "Reading upload failed", error = %err);
                ApiError::send_failed()
            })?,
        Err(rejection) => {
            debug!(message = "No multipart body, sending without attachment", reason = %rejection);
            None
        }
    };

    let mail = OutgoingMail {
        to: state.mail.to,
        from: state.mail.from,
        subject: state.mail.subject,
        body: state.mail.body,
        attachment,
    };

    let sent = state
        .flow
        .run(SendMessage {
            gmail: state.gmail,
            mail,
        })
        .await
        .map_err(|err| {
            error!(message = "Sending email failed", error = %err);
            ApiError::send_failed()
        })?;

    info!(message = "Email sent", id = %sent.id, thread_id = %sent.thread_id);
    Ok(Json(MessageBody::new(SEND_OK)))
}

#[derive(Debug, thiserror::Error)]
enum UploadError {
    #[error("multipart: {0}")]
    Multipart(#[from] MultipartError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

async fn read_attachment(
    uploads: &UploadDir,
    mut multipart: Multipart,
) -> Result<Option<Attachment>, UploadError> {
    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(sanitize_filename) else {
            continue;
        };
        let data = field.bytes().await?;

        let path = uploads.save(&filename, &data).await?;
        let data = uploads.read(&path).await?;

        // The declared part type is ignored; the extension decides.
        let attachment = Attachment::new(filename, data);
        return Ok(Some(attachment));
    }
    Ok(None)
}
