pub mod api;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod ingestion;
pub mod pagination;

pub use entity::Entity;
pub use error::{PipelineError, Result};
pub use pagination::Pagination;
