pub mod chat_service;
pub mod document_service;
pub mod llm_service;
pub mod transcript_service;
