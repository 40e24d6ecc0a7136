use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use crate::config::GENERIC_ERROR_MESSAGE;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("API key is not configured")]
    MissingApiKey,

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Document contains no text")]
    EmptyDocument,

    #[error("No journal entry has been uploaded for this session")]
    NoDocument,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("A reply is still being generated")]
    ReplyPending,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Upload exceeds {0} bytes")]
    UploadTooLarge(usize),

    #[error("Session \"{0}\" not found")]
    SessionNotFound(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Conditions the learner can fix themselves.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AppError::UnsupportedFileType(_)
                | AppError::InvalidDocument(_)
                | AppError::EmptyDocument
                | AppError::NoDocument
                | AppError::EmptyMessage
                | AppError::ReplyPending
                | AppError::InvalidRequest(_)
                | AppError::UploadTooLarge(_)
        )
    }

    /// The text shown to the learner.
    pub fn user_message(&self) -> String {
        match self {
            AppError::UnsupportedFileType(_) => {
                "Unsupported file type. Please upload a .txt or .docx file.".to_string()
            }
            AppError::InvalidDocument(_) => {
                "The uploaded file could not be read. Please check the file and try again.".to_string()
            }
            AppError::EmptyDocument => "The uploaded file does not contain any text.".to_string(),
            AppError::NoDocument => "Please upload a journal entry before starting the conversation.".to_string(),
            AppError::EmptyMessage => "Please enter a message.".to_string(),
            AppError::ReplyPending => "Please wait for the current reply to finish.".to_string(),
            AppError::InvalidRequest(_) => "The request could not be understood.".to_string(),
            AppError::UploadTooLarge(limit) => {
                format!("The file is too large. Please upload a file under {} MB.", limit / (1024 * 1024))
            }
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::Network(error.to_string())
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(error: zip::result::ZipError) -> Self {
        AppError::InvalidDocument(error.to_string())
    }
}

impl From<quick_xml::Error> for AppError {
    fn from(error: quick_xml::Error) -> Self {
        AppError::InvalidDocument(error.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ReplyPending => StatusCode::CONFLICT,
            AppError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ if self.is_user_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error!("Request failed: {}", self);
        HttpResponse::build(self.status_code()).json(json!({ "error": self.user_message() }))
    }
}
