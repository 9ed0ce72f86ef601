use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Failed to provision table {table}: {source}")]
    Provision {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to load batch into {table}: {source}")]
    Load {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Load failures wrap any store error raised while appending a batch.
    pub fn load(table: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Load {
            table: table.into(),
            source,
        }
    }

    pub fn provision(table: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Provision {
            table: table.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
