use async_stream::stream;
use futures::channel::oneshot;
use futures::{Stream, StreamExt};
use log::{error, info, warn};
use crate::config::{APOLOGY_MESSAGE, REFLECTION_PROMPT};
use crate::errors::AppError;
use crate::models::message::Message;
use crate::models::user_session::{JournalEntry, UserSession};
use crate::services::llm_service::{ChatModel, TokenStream};

/// Outcome of accepting a learner message.
pub enum ChatTurn {
    /// A fixed reply that needs no model output.
    Canned(String),
    /// The model's reply, still arriving.
    Streaming(TokenStream),
}

/// Everything the model call needs, captured while the session was locked.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub system_prompt: String,
    pub history: Vec<Message>,
    pub generation: u64,
}

pub enum TurnStart {
    /// The dialogue is over; the input was not recorded.
    Closed(String),
    Ready(PendingTurn),
}

/// The instructional prompt with the journal entry appended.
pub fn system_prompt(entry: &JournalEntry) -> String {
    format!(
        "{}\n\nJournal entry ({}):\n\"\"\"\n{}\n\"\"\"",
        REFLECTION_PROMPT, entry.file_name, entry.content
    )
}

pub fn closing_message(max_exchanges: usize) -> String {
    format!(
        "We've reached the end of this reflection ({} exchanges). \
Thank you for sharing your thoughts. You can download the transcript to keep a record of our conversation.",
        max_exchanges
    )
}

/// Validates the input and records the learner's message.
///
/// Does no I/O, so callers can run it under the session lock and the limit
/// check and the push happen together.
pub fn begin_turn(
    session: &mut UserSession,
    user_input: &str,
    max_exchanges: usize,
) -> Result<TurnStart, AppError> {
    let entry = session.document.as_ref().ok_or(AppError::NoDocument)?;
    let user_input = user_input.trim();
    if user_input.is_empty() {
        return Err(AppError::EmptyMessage);
    }
    if session.pending_reply {
        return Err(AppError::ReplyPending);
    }

    if session.is_complete(max_exchanges) {
        info!("Exchange limit of {} reached; rejecting input", max_exchanges);
        return Ok(TurnStart::Closed(closing_message(max_exchanges)));
    }

    let system_prompt = system_prompt(entry);
    session.push(Message::user(user_input));
    session.pending_reply = true;

    Ok(TurnStart::Ready(PendingTurn {
        system_prompt,
        history: session.history.clone(),
        generation: session.generation,
    }))
}

/// Asks the model for a reply; `None` when the request could not be started.
pub async fn request_reply(model: &dyn ChatModel, turn: &PendingTurn) -> Option<TokenStream> {
    match model.stream_chat(&turn.system_prompt, &turn.history).await {
        Ok(tokens) => Some(tokens),
        Err(e) => {
            error!("Failed to start reply: {}", e);
            None
        }
    }
}

/// Appends the assistant's reply and closes the pending turn.
///
/// Returns `false` and keeps the session untouched if a new journal entry was
/// uploaded after the turn began.
pub fn complete_turn(session: &mut UserSession, generation: u64, reply: String) -> bool {
    if session.generation != generation {
        warn!("Dropping reply for a replaced journal entry");
        return false;
    }
    session.push(Message::assistant(reply));
    session.pending_reply = false;
    true
}

/// Records the learner's message and asks the model for a reply.
pub async fn start_reply(
    model: &dyn ChatModel,
    session: &mut UserSession,
    user_input: &str,
    max_exchanges: usize,
) -> Result<ChatTurn, AppError> {
    let turn = match begin_turn(session, user_input, max_exchanges)? {
        TurnStart::Closed(message) => return Ok(ChatTurn::Canned(message)),
        TurnStart::Ready(turn) => turn,
    };

    match request_reply(model, &turn).await {
        Some(tokens) => Ok(ChatTurn::Streaming(tokens)),
        None => {
            complete_turn(session, turn.generation, APOLOGY_MESSAGE.to_string());
            Ok(ChatTurn::Canned(APOLOGY_MESSAGE.to_string()))
        }
    }
}

// Hands the kept text over exactly once, with the apology if the relay is dropped early
struct ReplyGuard<F: FnOnce(String)> {
    on_complete: Option<F>,
}

impl<F: FnOnce(String)> ReplyGuard<F> {
    fn finish(&mut self, reply: String) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(reply);
        }
    }
}

impl<F: FnOnce(String)> Drop for ReplyGuard<F> {
    fn drop(&mut self) {
        if self.on_complete.is_some() {
            warn!("Reply relay dropped before the model finished");
            self.finish(APOLOGY_MESSAGE.to_string());
        }
    }
}

/// Forwards reply text as it arrives, then hands the text to keep to `on_complete`.
///
/// If the model stream fails midway the apology is emitted and kept instead
/// of the partial reply. If the relay is dropped before the end (client gone),
/// `on_complete` still runs with the apology.
pub fn relay<F>(mut tokens: TokenStream, on_complete: F) -> impl Stream<Item = String> + Send
where
    F: FnOnce(String) + Send + 'static,
{
    let mut guard = ReplyGuard { on_complete: Some(on_complete) };
    stream! {
        let mut reply = String::new();
        let mut failed = false;
        while let Some(token) = tokens.next().await {
            match token {
                Ok(text) => {
                    reply.push_str(&text);
                    yield text;
                }
                Err(e) => {
                    error!("Reply stream failed: {}", e);
                    failed = true;
                    break;
                }
            }
        }

        if failed {
            let separator = if reply.is_empty() { "" } else { "\n\n" };
            yield format!("{}{}", separator, APOLOGY_MESSAGE);
            reply = APOLOGY_MESSAGE.to_string();
        }
        guard.finish(reply);
    }
}

/// Drains a reply stream into the text to keep.
pub async fn collect_reply(tokens: TokenStream) -> String {
    let (sender, receiver) = oneshot::channel();
    relay(tokens, move |reply| {
        let _ = sender.send(reply);
    })
    .collect::<Vec<String>>()
    .await;
    receiver.await.unwrap_or_else(|_| APOLOGY_MESSAGE.to_string())
}

/// Non-streaming variant: returns the full reply once it is complete.
pub async fn process_chat(
    model: &dyn ChatModel,
    session: &mut UserSession,
    user_input: &str,
    max_exchanges: usize,
) -> Result<String, AppError> {
    let tokens = match start_reply(model, session, user_input, max_exchanges).await? {
        ChatTurn::Canned(message) => return Ok(message),
        ChatTurn::Streaming(tokens) => tokens,
    };

    let reply = collect_reply(tokens).await;
    let generation = session.generation;
    complete_turn(session, generation, reply.clone());
    Ok(reply)
}
