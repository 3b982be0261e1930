use serde::Serialize;

use crate::repo::RepoError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Failure of a thread-details assembly.
#[derive(thiserror::Error, Debug)]
pub enum DetailsError {
    /// The requested thread does not exist.
    #[error("{0}")]
    NotFound(String),
    /// A thread, comment or reply points at a user the store cannot resolve.
    #[error("{0}")]
    DataInconsistency(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl DetailsError {
    /// HTTP-equivalent status for whichever presentation layer serializes this.
    pub fn status_code(&self) -> u16 {
        match self {
            DetailsError::NotFound(_) => 404,
            DetailsError::DataInconsistency(_) => 500,
            DetailsError::Repo(e) => match e {
                RepoError::NotFound => 404,
                RepoError::Conflict => 409,
                RepoError::Forbidden => 403,
                RepoError::Internal(_) => 500,
            },
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody { error: self.to_string() }
    }

    /// Process exit code for command-line callers: 2 for caller mistakes, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_client_error() { 2 } else { 1 }
    }
}
