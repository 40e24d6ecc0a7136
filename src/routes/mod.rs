use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::web;
use crate::errors::AppError;

pub mod app_state;
pub mod chat_routes;
pub mod document_routes;
pub mod session_routes;

const SESSION_COOKIE: &str = "journal_session";

/// Registers every API route, with extractor failures answered as JSON errors.
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::InvalidRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::InvalidRequest(err.to_string()).into()),
    )
    .configure(session_routes::init_routes)
    .configure(document_routes::init_routes)
    .configure(chat_routes::init_routes);
}

pub fn session_middleware(key: Key) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(SESSION_COOKIE.to_string())
        .cookie_secure(false)
        .build()
}
