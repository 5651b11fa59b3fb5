use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("database error: {message}")]
    Database { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("crawl error: {message}")]
    Crawl { message: String },

    #[error("LLM error: {message}")]
    Llm { message: String },
}

impl From<sqlx::Error> for PipelineError {
    fn from(e: sqlx::Error) -> Self {
        PipelineError::Database {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
