use actix_session::Session;
use actix_web::web;
use uuid::Uuid;
use log::{info, warn, error};
use serde_json::json;
use crate::routes::app_state::AppState;
use crate::models::user_session::UserSession;

const SESSION_KEY: &str = "session_id";

/// Starts an empty session and stores its id in the cookie.
pub fn initialize_session(data: &web::Data<AppState>, session: &Session) -> String {
    let session_id = Uuid::new_v4().to_string();
    if let Err(e) = session.insert(SESSION_KEY, session_id.clone()) {
        error!("Failed to insert session_id into cookie: {:?}", e);
    } else {
        info!("Stored session_id {} in cookie", session_id);
    }

    data.session_manager.insert(session_id.clone(), UserSession::default());
    info!("Initialized user session: {}", session_id);
    session_id
}

/// Returns the id of the caller's live session, creating one when there is none.
pub fn ensure_session(data: &web::Data<AppState>, session: &Session, fallback: Option<&str>) -> String {
    // Retrieve session_id from cookie (or fallback)
    let candidate = match session.get::<String>(SESSION_KEY) {
        Ok(Some(id)) => Some(id),
        _ => fallback.filter(|id| !id.is_empty()).map(str::to_string),
    };

    match candidate {
        Some(id) if data.session_manager.contains(&id) => id,
        Some(id) => {
            warn!("Session \"{}\" not found; starting a new one", id);
            initialize_session(data, session)
        }
        None => initialize_session(data, session),
    }
}

pub fn session_summary(data: &web::Data<AppState>, session_id: &str) -> serde_json::Value {
    let max = data.max_exchanges;
    let user_session = data.session_manager.get(session_id).unwrap_or_default();
    json!({
        "session_id": session_id,
        "exchanges": user_session.exchange_count(),
        "max_exchanges": max,
        "remaining": user_session.remaining_exchanges(max),
        "complete": user_session.is_complete(max),
        "document": &user_session.document,
        "messages": &user_session.history,
    })
}
