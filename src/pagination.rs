//! Pagination window shared by the read API and the HTTP source

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

/// Validated `limit`/`offset` pair: `1 <= limit <= 1000`, `offset >= 0`.
///
/// Deserialization goes through [`Pagination::new`], so a decoded value holds
/// the same bounds as a constructed one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPagination")]
pub struct Pagination {
    limit: i64,
    offset: i64,
}

#[derive(Deserialize)]
struct RawPagination {
    limit: Option<i64>,
    offset: Option<i64>,
}

impl TryFrom<RawPagination> for Pagination {
    type Error = PipelineError;

    fn try_from(raw: RawPagination) -> Result<Self> {
        Self::new(raw.limit, raw.offset)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    /// Out-of-range values are rejected, never clamped.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Result<Self> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let offset = offset.unwrap_or(0);

        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(PipelineError::Validation(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LIMIT, limit
            )));
        }
        if offset < 0 {
            return Err(PipelineError::Validation(format!(
                "offset must be non-negative, got {}",
                offset
            )));
        }
        Ok(Self { limit, offset })
    }

    /// Parse from raw query-string values.
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Result<Self> {
        Self::new(parse_i64("limit", limit)?, parse_i64("offset", offset)?)
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

pub(crate) fn parse_i64(name: &str, raw: Option<&str>) -> Result<Option<i64>> {
    raw.map(|v| {
        v.trim().parse::<i64>().map_err(|_| {
            PipelineError::Validation(format!("{} must be an integer, got '{}'", name, v))
        })
    })
    .transpose()
}
