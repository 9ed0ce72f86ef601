//! Source Connector Trait - Abstract interface for batch producers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::Result;
use crate::ingestion::batch::Batch;
use crate::pagination::Pagination;

/// How a fetch went, reported alongside the batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchStatus {
    /// Source answered; the batch may still be empty
    Complete,
    /// Source answered with a non-success status; the batch is empty
    Rejected { code: u16 },
}

/// Result from a connector fetch
#[derive(Clone, Debug)]
pub struct FetchOutcome {
    pub batch: Batch,
    pub status: FetchStatus,
}

impl FetchOutcome {
    pub fn complete(batch: Batch) -> Self {
        Self {
            batch,
            status: FetchStatus::Complete,
        }
    }

    pub fn rejected(code: u16) -> Self {
        Self {
            batch: Batch::empty(),
            status: FetchStatus::Rejected { code },
        }
    }
}

/// Source Connector Trait
///
/// Implementations:
/// - CsvConnector: one flat file per entity on disk
/// - HttpConnector: one paginated API request per call
///
/// Neither retries.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Fetch one entity's batch. `page` narrows the rows fetched; `None` means
    /// the connector's natural default.
    async fn fetch(&self, entity: Entity, page: Option<Pagination>) -> Result<FetchOutcome>;

    /// Get source type (e.g., "file", "http")
    fn source_type(&self) -> &str;

    /// Get source URI/directory
    fn source_uri(&self) -> String;
}
