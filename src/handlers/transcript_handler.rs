use actix_session::Session;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use chrono::Local;
use log::info;
use crate::errors::AppError;
use crate::handlers::session_handler::ensure_session;
use crate::routes::app_state::AppState;
use crate::services::document_service::DOCX_MIME;
use crate::services::transcript_service;

pub async fn download_transcript(
    data: web::Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let session_id = ensure_session(&data, &session, None);
    let user_session = data
        .session_manager
        .get(&session_id)
        .ok_or_else(|| AppError::SessionNotFound(session_id.clone()))?;

    let now = Local::now();
    let bytes = transcript_service::render_docx(&user_session, &now)?;
    let file_name = transcript_service::file_name(&now);
    info!(
        "Exporting {} messages for session {} as {}",
        user_session.history.len(),
        session_id,
        file_name
    );

    Ok(HttpResponse::Ok()
        .content_type(DOCX_MIME)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file_name)],
        })
        .body(bytes))
}
