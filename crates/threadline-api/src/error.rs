use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use threadline_llm::Provider;
use threadline_persist::{AuthorizationError, PersistError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Missing API key for {provider}; send it in the {header} header")]
    MissingApiKey {
        provider: Provider,
        header: &'static str,
    },

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Persistence error: {0}")]
    Persist(PersistError),

    #[error("LLM error: {0}")]
    Llm(#[from] anyhow::Error),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn missing_key(provider: Provider) -> Self {
        ApiError::MissingApiKey {
            provider,
            header: provider.header_key(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::ThreadNotFound(_) | ApiError::MessageNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::MissingApiKey { .. } | ApiError::UnknownModel(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Persist(_) | ApiError::Llm(_) | ApiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<PersistError> for ApiError {
    fn from(error: PersistError) -> Self {
        match error {
            PersistError::Authorization(AuthorizationError::NotAuthenticated) => {
                ApiError::Unauthorized("Not authenticated".to_string())
            }
            PersistError::Authorization(e @ AuthorizationError::NotOwner(_)) => {
                ApiError::Forbidden(e.to_string())
            }
            PersistError::ThreadNotFound(id) => ApiError::ThreadNotFound(id),
            PersistError::MessageNotFound(id) => ApiError::MessageNotFound(id),
            PersistError::InvalidObjectId(id) => ApiError::BadRequest(format!("Invalid id: {}", id)),
            other => ApiError::Persist(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Persist(ref e) => {
                tracing::error!("Persistence error: {}", e);
                "Storage error".to_string()
            }
            ApiError::Llm(ref e) => {
                tracing::error!("LLM error: {:#}", e);
                "Processing error".to_string()
            }
            ApiError::Internal => {
                tracing::error!("Internal error");
                "Internal server error".to_string()
            }
            ref other => other.to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
