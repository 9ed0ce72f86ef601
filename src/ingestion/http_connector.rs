//! HTTP Connector - Fetches one page of an entity from the retail read API

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::entity::Entity;
use crate::error::Result;
use crate::ingestion::batch::Batch;
use crate::ingestion::connector::{FetchOutcome, SourceConnector};
use crate::pagination::Pagination;

/// `{count, data}` page envelope
#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    data: Vec<Value>,
}

pub struct HttpConnector {
    client: reqwest::Client,
    base_url: String,
}

impl HttpConnector {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self, entity: Entity) -> String {
        format!("{}/{}", self.base_url, entity.table_name())
    }
}

#[async_trait]
impl SourceConnector for HttpConnector {
    /// A non-success status is not an error: the outcome carries the status code
    /// and an empty batch. Transport failures are errors.
    async fn fetch(&self, entity: Entity, page: Option<Pagination>) -> Result<FetchOutcome> {
        let page = page.unwrap_or_default();
        let url = self.endpoint(entity);
        debug!("GET {} limit={} offset={}", url, page.limit(), page.offset());

        let response = self
            .client
            .get(&url)
            .query(&[("limit", page.limit()), ("offset", page.offset())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                "Failed to fetch data from {}. Status code: {}",
                entity,
                status.as_u16()
            );
            return Ok(FetchOutcome::rejected(status.as_u16()));
        }

        let body: Page = response.json().await?;
        let batch = Batch::from_json_records(&body.data)?;
        Ok(FetchOutcome::complete(batch))
    }

    fn source_type(&self) -> &str {
        "http"
    }

    fn source_uri(&self) -> String {
        self.base_url.clone()
    }
}
