use actix_web::{get, web, HttpResponse, Responder};
use actix_session::Session;
use serde_json::json;
use crate::routes::app_state::AppState;
use crate::handlers::session_handler;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(init_session)
        .service(history)
        .service(health);
}

#[get("/init_session")]
async fn init_session(data: web::Data<AppState>, session: Session) -> impl Responder {
    let session_id = session_handler::initialize_session(&data, &session);
    HttpResponse::Ok().json(json!({ "initialized": true, "session_id": session_id }))
}

#[get("/history")]
async fn history(data: web::Data<AppState>, session: Session) -> impl Responder {
    let session_id = session_handler::ensure_session(&data, &session, None);
    HttpResponse::Ok().json(session_handler::session_summary(&data, &session_id))
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
