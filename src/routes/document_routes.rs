use actix_web::{get, post, web, HttpRequest, Responder};
use actix_session::Session;
use crate::handlers::document_handler::{self, UploadQuery};
use crate::handlers::transcript_handler;
use crate::routes::app_state::AppState;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(upload).service(transcript);
}

#[post("/upload")]
async fn upload(
    data: web::Data<AppState>,
    session: Session,
    req: HttpRequest,
    query: web::Query<UploadQuery>,
    payload: web::Payload,
) -> impl Responder {
    document_handler::handle_upload(data, session, req, query, payload).await
}

#[get("/transcript")]
async fn transcript(data: web::Data<AppState>, session: Session) -> impl Responder {
    transcript_handler::download_transcript(data, session).await
}
