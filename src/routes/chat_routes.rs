use actix_web::{post, web, Responder};
use actix_session::Session;
use crate::handlers::chat_handler::{self, ChatRequest};
use crate::routes::app_state::AppState;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(chat).service(stream_reply);
}

#[post("/chat")]
async fn chat(
    data: web::Data<AppState>,
    session: Session,
    req_body: web::Json<ChatRequest>
) -> impl Responder {
    chat_handler::handle_chat_request(data, session, req_body).await
}

#[post("/stream")]
async fn stream_reply(
    data: web::Data<AppState>,
    session: Session,
    req_body: web::Json<ChatRequest>
) -> impl Responder {
    chat_handler::handle_stream_request(data, session, req_body).await
}
