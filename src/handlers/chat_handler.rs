use actix_web::{web, HttpResponse};
use actix_session::Session;
use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use log::{debug, info, warn};
use crate::config::APOLOGY_MESSAGE;
use crate::errors::AppError;
use crate::global_session_manager::GlobalSessionManager;
use crate::handlers::session_handler::ensure_session;
use crate::routes::app_state::AppState;
use crate::services::chat_service::{self, TurnStart};
use crate::services::llm_service::TokenStream;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub exchanges: usize,
    pub remaining: usize,
    pub complete: bool,
}

enum Reply {
    Ready(String),
    Streaming { tokens: TokenStream, generation: u64 },
}

pub async fn handle_chat_request(
    data: web::Data<AppState>,
    session: Session,
    req_body: web::Json<ChatRequest>,
) -> Result<HttpResponse, AppError> {
    let session_id = ensure_session(&data, &session, req_body.session_id.as_deref());
    info!("Processing message for session {} ({} chars)", session_id, req_body.message.chars().count());
    debug!("Message for session {}: {}", session_id, req_body.message);

    let response = match open_turn(&data, &session_id, &req_body.message).await? {
        Reply::Ready(message) => message,
        Reply::Streaming { tokens, generation } => {
            let reply = chat_service::collect_reply(tokens).await;
            store_reply(&data.session_manager, &session_id, generation, reply.clone());
            reply
        }
    };

    let max = data.max_exchanges;
    let user_session = data.session_manager.get(&session_id).unwrap_or_default();
    Ok(HttpResponse::Ok().json(ChatResponse {
        response,
        exchanges: user_session.exchange_count(),
        remaining: user_session.remaining_exchanges(max),
        complete: user_session.is_complete(max),
    }))
}

pub async fn handle_stream_request(
    data: web::Data<AppState>,
    session: Session,
    req_body: web::Json<ChatRequest>,
) -> Result<HttpResponse, AppError> {
    let session_id = ensure_session(&data, &session, req_body.session_id.as_deref());
    info!("Streaming reply for session {} ({} chars)", session_id, req_body.message.chars().count());
    debug!("Message for session {}: {}", session_id, req_body.message);

    let (tokens, generation) = match open_turn(&data, &session_id, &req_body.message).await? {
        Reply::Ready(message) => {
            return Ok(HttpResponse::Ok()
                .content_type("text/plain; charset=utf-8")
                .body(message))
        }
        Reply::Streaming { tokens, generation } => (tokens, generation),
    };

    let manager = data.session_manager.clone();
    let relayed = chat_service::relay(tokens, move |reply| {
        store_reply(&manager, &session_id, generation, reply);
    })
    .map(|text| Ok::<Bytes, actix_web::Error>(Bytes::from(text)));

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .streaming(relayed))
}

// The limit check and the user message go in under one lock; the model call happens outside it
async fn open_turn(data: &AppState, session_id: &str, message: &str) -> Result<Reply, AppError> {
    let model = data.model()?;
    let max = data.max_exchanges;
    let started = data
        .session_manager
        .update(session_id, |s| chat_service::begin_turn(s, message, max))
        .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))??;

    let turn = match started {
        TurnStart::Closed(message) => return Ok(Reply::Ready(message)),
        TurnStart::Ready(turn) => turn,
    };

    match chat_service::request_reply(model.as_ref(), &turn).await {
        Some(tokens) => Ok(Reply::Streaming {
            tokens,
            generation: turn.generation,
        }),
        None => {
            store_reply(&data.session_manager, session_id, turn.generation, APOLOGY_MESSAGE.to_string());
            Ok(Reply::Ready(APOLOGY_MESSAGE.to_string()))
        }
    }
}

fn store_reply(manager: &GlobalSessionManager, session_id: &str, generation: u64, reply: String) {
    match manager.update(session_id, |s| chat_service::complete_turn(s, generation, reply)) {
        Some(true) => debug!("Stored reply for session {}", session_id),
        Some(false) => info!("Session {} moved to a new journal entry; reply not stored", session_id),
        None => warn!("Session {} disappeared before the reply was stored", session_id),
    }
}
