//! Retail repository - runs composed queries against PostgreSQL

use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use std::collections::HashMap;

use crate::api::query::{
    list_query, lookup_query, sales_by_store_sql, top_products_sql, SelectQuery, SqlParam,
};
use crate::api::rows::{row_to_json, JsonRow};
use crate::entity::Entity;
use crate::error::{PipelineError, Result};
use crate::pagination::Pagination;

/// Read side of the store. Each call borrows one pooled connection for the
/// duration of a single query.
pub struct RetailRepository {
    pool: PgPool,
    namespace: String,
}

impl RetailRepository {
    pub fn new(pool: PgPool, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn list(
        &self,
        entity: Entity,
        filters: &HashMap<String, String>,
        page: Pagination,
    ) -> Result<Vec<JsonRow>> {
        let query = list_query(&self.namespace, entity, filters, page)?;
        self.fetch(&query).await
    }

    /// One row by primary key, or `NotFound`.
    pub async fn get(&self, entity: Entity, id: i64) -> Result<JsonRow> {
        let rows = self.fetch(&lookup_query(&self.namespace, entity, id)).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PipelineError::NotFound(entity.singular().to_string()))
    }

    pub async fn sales_by_store(&self) -> Result<Vec<JsonRow>> {
        let sql = sales_by_store_sql(&self.namespace);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_json).collect()
    }

    pub async fn top_products(&self, limit: i64) -> Result<Vec<JsonRow>> {
        let sql = top_products_sql(&self.namespace);
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_json).collect()
    }

    async fn fetch(&self, query: &SelectQuery) -> Result<Vec<JsonRow>> {
        let (sql, params) = query.render();
        let rows = bind_all(sqlx::query(&sql), params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_json).collect()
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: Vec<SqlParam>,
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Integer(v) => query.bind(v),
            SqlParam::Text(v) => query.bind(v),
        };
    }
    query
}
