pub mod message;
pub mod user_session;
