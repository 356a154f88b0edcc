use thiserror::Error;

use crate::core::error_handling::ContextualError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContextualError for ServerError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, ServerError::Bind { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ServerError::Bind { .. } => {
                Some("Could not listen on the requested address. Is it already in use?")
            }
            _ => None,
        }
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
