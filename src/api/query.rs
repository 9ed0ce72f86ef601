//! Query composer - accumulates bound predicates and renders one statement

use serde::Serialize;
use std::collections::HashMap;

use crate::db::{qualified, quote_ident};
use crate::entity::{Entity, FilterKind};
use crate::error::{PipelineError, Result};
use crate::pagination::Pagination;

/// A value that is always bound as a parameter, never spliced into SQL
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Integer(i64),
    Text(String),
}

/// SELECT builder: base select, equality predicates ANDed in insertion order,
/// optional ORDER BY, LIMIT/OFFSET last.
#[derive(Clone, Debug)]
pub struct SelectQuery {
    base: String,
    predicates: Vec<(String, SqlParam)>,
    order_by: Vec<String>,
    page: Option<Pagination>,
}

impl SelectQuery {
    pub fn from_table(namespace: &str, table: &str) -> Self {
        Self {
            base: format!("SELECT * FROM {}", qualified(namespace, table)),
            predicates: Vec::new(),
            order_by: Vec::new(),
            page: None,
        }
    }

    pub fn filter_eq(mut self, column: &str, value: SqlParam) -> Self {
        self.predicates.push((column.to_string(), value));
        self
    }

    /// Absent values add no predicate.
    pub fn filter_opt(self, column: &str, value: Option<SqlParam>) -> Self {
        match value {
            Some(v) => self.filter_eq(column, v),
            None => self,
        }
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by.push(column.to_string());
        self
    }

    pub fn paginate(mut self, page: Pagination) -> Self {
        self.page = Some(page);
        self
    }

    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    /// Render to SQL with `$n` placeholders plus the parameters to bind, in order.
    pub fn render(&self) -> (String, Vec<SqlParam>) {
        let mut sql = self.base.clone();
        let mut params = Vec::with_capacity(self.predicates.len() + 2);

        for (idx, (column, value)) in self.predicates.iter().enumerate() {
            sql.push_str(if idx == 0 { " WHERE " } else { " AND " });
            params.push(value.clone());
            sql.push_str(&format!("{} = ${}", quote_ident(column), params.len()));
        }

        if !self.order_by.is_empty() {
            let columns = self
                .order_by
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" ORDER BY {}", columns));
        }

        if let Some(page) = self.page {
            params.push(SqlParam::Integer(page.limit()));
            sql.push_str(&format!(" LIMIT ${}", params.len()));
            params.push(SqlParam::Integer(page.offset()));
            sql.push_str(&format!(" OFFSET ${}", params.len()));
        }

        (sql, params)
    }
}

/// List query for `entity`: recognised filters from `params`, ordered by the
/// primary key, paginated.
pub fn list_query(
    namespace: &str,
    entity: Entity,
    params: &HashMap<String, String>,
    page: Pagination,
) -> Result<SelectQuery> {
    let mut query = SelectQuery::from_table(namespace, entity.table_name());
    for field in entity.filters() {
        let raw = params
            .get(field.name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty());
        let value = match (raw, field.kind) {
            (None, _) => None,
            (Some(v), FilterKind::Text) => Some(SqlParam::Text(v.to_string())),
            (Some(v), FilterKind::Integer) => Some(SqlParam::Integer(v.parse().map_err(|_| {
                PipelineError::Validation(format!("{} must be an integer, got '{}'", field.name, v))
            })?)),
        };
        query = query.filter_opt(field.name, value);
    }

    Ok(query.order_by(entity.primary_key()).paginate(page))
}

/// Singular lookup by primary key
pub fn lookup_query(namespace: &str, entity: Entity, id: i64) -> SelectQuery {
    SelectQuery::from_table(namespace, entity.table_name())
        .filter_eq(entity.primary_key(), SqlParam::Integer(id))
}

pub const DEFAULT_TOP_PRODUCTS: i64 = 10;
pub const MAX_TOP_PRODUCTS: i64 = 100;

pub fn sales_by_store_sql(namespace: &str) -> String {
    format!(
        r#"
        SELECT
            s.store_id,
            s.store_name,
            COUNT(t.transaction_id) AS transaction_count,
            SUM(t.total_amount)::DOUBLE PRECISION AS total_sales
        FROM {stores} s
        LEFT JOIN {transactions} t ON s.store_id = t.store_id
        GROUP BY s.store_id, s.store_name
        ORDER BY total_sales DESC NULLS LAST, s.store_id
        "#,
        stores = qualified(namespace, Entity::Stores.table_name()),
        transactions = qualified(namespace, Entity::Transactions.table_name()),
    )
}

/// Takes one bound parameter: the row limit.
pub fn top_products_sql(namespace: &str) -> String {
    format!(
        r#"
        SELECT
            p.product_id,
            p.product_name,
            p.category,
            COUNT(t.transaction_id) AS sales_count,
            SUM(t.total_amount)::DOUBLE PRECISION AS total_revenue
        FROM {products} p
        LEFT JOIN {transactions} t ON p.product_id = t.product_id
        GROUP BY p.product_id, p.product_name, p.category
        ORDER BY sales_count DESC, p.product_id
        LIMIT $1
        "#,
        products = qualified(namespace, Entity::Products.table_name()),
        transactions = qualified(namespace, Entity::Transactions.table_name()),
    )
}

/// `limit` for top-products: default 10, must lie in [1, 100].
pub fn top_products_limit(raw: Option<&str>) -> Result<i64> {
    let limit = crate::pagination::parse_i64("limit", raw)?.unwrap_or(DEFAULT_TOP_PRODUCTS);
    if !(1..=MAX_TOP_PRODUCTS).contains(&limit) {
        return Err(PipelineError::Validation(format!(
            "limit must be between 1 and {}, got {}",
            MAX_TOP_PRODUCTS, limit
        )));
    }
    Ok(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_no_filters_renders_unconstrained_select() {
        let page = Pagination::new(Some(5), Some(10)).unwrap();
        let query = list_query("public", Entity::Customers, &params(&[]), page).unwrap();
        let (sql, binds) = query.render();

        assert_eq!(
            sql,
            "SELECT * FROM \"public\".\"customers\" ORDER BY \"customer_id\" LIMIT $1 OFFSET $2"
        );
        assert_eq!(binds, vec![SqlParam::Integer(5), SqlParam::Integer(10)]);
    }

    #[test]
    fn test_two_filters_are_anded_and_bound() {
        let page = Pagination::new(Some(2), Some(0)).unwrap();
        let query = list_query(
            "public",
            Entity::Transactions,
            &params(&[("customer_id", "7"), ("store_id", "3"), ("ignored", "x")]),
            page,
        )
        .unwrap();
        let (sql, binds) = query.render();

        assert_eq!(
            sql,
            "SELECT * FROM \"public\".\"transactions\" WHERE \"customer_id\" = $1 \
             AND \"store_id\" = $2 ORDER BY \"transaction_id\" LIMIT $3 OFFSET $4"
        );
        assert_eq!(
            binds,
            vec![
                SqlParam::Integer(7),
                SqlParam::Integer(3),
                SqlParam::Integer(2),
                SqlParam::Integer(0)
            ]
        );
    }

    #[test]
    fn test_text_filter_never_reaches_sql_text() {
        let hostile = "x' OR '1'='1";
        let query = list_query(
            "public",
            Entity::Products,
            &params(&[("category", hostile)]),
            Pagination::default(),
        )
        .unwrap();
        let (sql, binds) = query.render();

        assert!(!sql.contains(hostile));
        assert_eq!(binds[0], SqlParam::Text(hostile.to_string()));
    }

    #[test]
    fn test_empty_filter_value_is_absent() {
        let query = list_query(
            "public",
            Entity::Inventory,
            &params(&[("store_id", ""), ("product_id", "4")]),
            Pagination::default(),
        )
        .unwrap();
        assert_eq!(query.predicate_count(), 1);
    }

    #[test]
    fn test_bad_integer_filter_is_validation_error() {
        let err = list_query(
            "public",
            Entity::Inventory,
            &params(&[("store_id", "abc")]),
            Pagination::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn test_lookup_query() {
        let (sql, binds) = lookup_query("public", Entity::Products, 9999).render();
        assert_eq!(
            sql,
            "SELECT * FROM \"public\".\"products\" WHERE \"product_id\" = $1"
        );
        assert_eq!(binds, vec![SqlParam::Integer(9999)]);
    }

    #[test]
    fn test_top_products_limit_bounds() {
        assert_eq!(top_products_limit(None).unwrap(), 10);
        assert_eq!(top_products_limit(Some("100")).unwrap(), 100);
        assert!(top_products_limit(Some("0")).is_err());
        assert!(top_products_limit(Some("101")).is_err());
    }

    #[test]
    fn test_analytics_sql_targets_namespace() {
        assert!(sales_by_store_sql("apis").contains("\"apis\".\"stores\" s"));
        assert!(top_products_sql("public").contains("LIMIT $1"));
    }
}
