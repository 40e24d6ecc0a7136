#![allow(dead_code)]

use std::time::Duration;
use async_trait::async_trait;
use futures::stream;
use mockall::mock;
use JournalChatAgent::errors::AppError;
use JournalChatAgent::models::message::Message;
use JournalChatAgent::models::user_session::{JournalEntry, UserSession};
use JournalChatAgent::services::llm_service::{ChatModel, TokenStream};

mock! {
    pub Model {}

    #[async_trait]
    impl ChatModel for Model {
        async fn stream_chat(&self, system_prompt: &str, history: &[Message]) -> Result<TokenStream, AppError>;
    }
}

pub const JOURNAL_TEXT: &str = "Today my team presentation did not go as planned.\nI froze when the lecturer asked a question.";

/// A reply stream that yields each part in order.
pub fn tokens(parts: &[&str]) -> TokenStream {
    let items: Vec<Result<String, AppError>> = parts.iter().map(|p| Ok(p.to_string())).collect();
    Box::pin(stream::iter(items))
}

/// A reply stream that breaks after the given parts.
pub fn failing_tokens(parts: &[&str]) -> TokenStream {
    let mut items: Vec<Result<String, AppError>> = parts.iter().map(|p| Ok(p.to_string())).collect();
    items.push(Err(AppError::Network("connection reset".to_string())));
    Box::pin(stream::iter(items))
}

/// A single-part reply that only arrives after `delay`.
pub fn delayed_tokens(text: &str, delay: Duration) -> TokenStream {
    let text = text.to_string();
    Box::pin(stream::once(async move {
        tokio::time::sleep(delay).await;
        Ok(text)
    }))
}

pub fn session_with_entry() -> UserSession {
    let mut session = UserSession::default();
    session.load_document(JournalEntry {
        file_name: "week4.txt".to_string(),
        content: JOURNAL_TEXT.to_string(),
    });
    session
}
