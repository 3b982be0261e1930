pub mod config;
pub mod details;
pub mod error;
pub mod models;
pub mod repo;

// Re-export commonly used items for tests / external users
pub use details::{ThreadDetailsAssembler, COMMENT_DELETED_CONTENT, REPLY_DELETED_CONTENT};
pub use error::DetailsError;
