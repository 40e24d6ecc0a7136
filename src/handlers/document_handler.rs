use actix_session::Session;
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use futures::StreamExt;
use log::info;
use serde::Deserialize;
use serde_json::json;
use crate::config::MAX_UPLOAD_BYTES;
use crate::errors::AppError;
use crate::handlers::session_handler::ensure_session;
use crate::routes::app_state::AppState;
use crate::services::document_service;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

pub async fn handle_upload(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    query: web::Query<UploadQuery>,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    let body = read_body(payload, MAX_UPLOAD_BYTES).await?;
    let session_id = ensure_session(&data, &session, None);
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    // Unsupported or unreadable files stop here, before the session is touched
    let entry = document_service::extract_text(&query.filename, content_type, &body)?;
    let summary = json!({
        "session_id": session_id,
        "file_name": &entry.file_name,
        "characters": entry.content.chars().count(),
        "paragraphs": entry.content.lines().count(),
    });

    data.session_manager
        .update(&session_id, |s| s.load_document(entry))
        .ok_or_else(|| AppError::SessionNotFound(session_id.clone()))?;
    info!("Loaded journal entry {} into session {}", query.filename, session_id);

    Ok(HttpResponse::Ok().json(summary))
}

/// Buffers the request body, failing as soon as it grows past `limit`.
async fn read_body(mut payload: web::Payload, limit: usize) -> Result<web::Bytes, AppError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| AppError::InvalidRequest(e.to_string()))?;
        if body.len() + chunk.len() > limit {
            return Err(AppError::UploadTooLarge(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}
