//! Entity catalogue - the eight fixed retail tables

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// One of the eight domain tables
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Products,
    Customers,
    Stores,
    Suppliers,
    Inventory,
    Transactions,
    Returns,
    Promotions,
}

/// Value kind a filter parameter is parsed into before binding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    Integer,
    Text,
}

/// Optional equality filter accepted by an entity's list endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterField {
    pub name: &'static str,
    pub kind: FilterKind,
}

impl FilterField {
    const fn integer(name: &'static str) -> Self {
        Self { name, kind: FilterKind::Integer }
    }

    const fn text(name: &'static str) -> Self {
        Self { name, kind: FilterKind::Text }
    }
}

const PRODUCT_FILTERS: &[FilterField] = &[FilterField::text("category")];
const INVENTORY_FILTERS: &[FilterField] = &[
    FilterField::integer("store_id"),
    FilterField::integer("product_id"),
];
const TRANSACTION_FILTERS: &[FilterField] = &[
    FilterField::integer("customer_id"),
    FilterField::integer("store_id"),
];

impl Entity {
    /// Ingestion order
    pub const ALL: [Entity; 8] = [
        Entity::Products,
        Entity::Customers,
        Entity::Stores,
        Entity::Suppliers,
        Entity::Inventory,
        Entity::Transactions,
        Entity::Returns,
        Entity::Promotions,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Entity::Products => "products",
            Entity::Customers => "customers",
            Entity::Stores => "stores",
            Entity::Suppliers => "suppliers",
            Entity::Inventory => "inventory",
            Entity::Transactions => "transactions",
            Entity::Returns => "returns",
            Entity::Promotions => "promotions",
        }
    }

    /// Natural key, also used as the stable ORDER BY for pagination
    pub fn primary_key(&self) -> &'static str {
        match self {
            Entity::Products => "product_id",
            Entity::Customers => "customer_id",
            Entity::Stores => "store_id",
            Entity::Suppliers => "supplier_id",
            Entity::Inventory => "inventory_id",
            Entity::Transactions => "transaction_id",
            Entity::Returns => "return_id",
            Entity::Promotions => "promotion_id",
        }
    }

    /// Human label used in not-found messages
    pub fn singular(&self) -> &'static str {
        match self {
            Entity::Products => "Product",
            Entity::Customers => "Customer",
            Entity::Stores => "Store",
            Entity::Suppliers => "Supplier",
            Entity::Inventory => "Inventory record",
            Entity::Transactions => "Transaction",
            Entity::Returns => "Return",
            Entity::Promotions => "Promotion",
        }
    }

    pub fn filters(&self) -> &'static [FilterField] {
        match self {
            Entity::Products => PRODUCT_FILTERS,
            Entity::Inventory => INVENTORY_FILTERS,
            Entity::Transactions => TRANSACTION_FILTERS,
            _ => &[],
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for Entity {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Entity::ALL
            .iter()
            .copied()
            .find(|e| e.table_name() == s.trim().to_lowercase())
            .ok_or_else(|| PipelineError::Validation(format!("unknown entity '{}'", s)))
    }
}
