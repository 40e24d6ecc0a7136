pub mod chat_handler;
pub mod document_handler;
pub mod session_handler;
pub mod transcript_handler;
