use thiserror::Error;

/// Caller may not act on the referenced thread
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("You do not have permission to access thread {0}")]
    NotOwner(String),
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Message not found in this thread: {0}")]
    MessageNotFound(String),

    #[error("Invalid object ID: {0}")]
    InvalidObjectId(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[cfg(feature = "mongodb")]
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON serialization error: {0}")]
    BsonSerialization(#[from] bson::ser::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PersistError {
    pub fn is_authorization(&self) -> bool {
        matches!(self, PersistError::Authorization(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PersistError::ThreadNotFound(_) | PersistError::MessageNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
