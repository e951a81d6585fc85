//! Core data models used throughout Bizdesk.
//!
//! These are the records exchanged with the backend collections
//! (`customers`, `products`, `services`, `orders`) and held by the list
//! controllers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A record stored in a remote collection.
///
/// The identifier returned by [`id`](Record::id) is the deduplication key
/// for accumulated lists.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Collection name used in REST paths (e.g. `"customers"`).
    const COLLECTION: &'static str;

    /// Unique identifier within the collection.
    fn id(&self) -> &str;

    /// Case-insensitive match against a search term.
    ///
    /// Used by in-memory collections; remote backends do their own
    /// matching. An empty term matches everything.
    fn matches(&self, term: &str) -> bool;
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn any_contains(fields: &[Option<&str>], term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    fields.iter().flatten().any(|f| contains_ci(f, &term))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Tax document (CPF / CNPJ).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Record for Customer {
    const COLLECTION: &'static str = "customers";

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, term: &str) -> bool {
        any_contains(
            &[
                Some(self.name.as_str()),
                self.email.as_deref(),
                self.phone.as_deref(),
                self.document.as_deref(),
            ],
            term,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
}

impl Record for Product {
    const COLLECTION: &'static str = "products";

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, term: &str) -> bool {
        any_contains(
            &[
                Some(self.name.as_str()),
                self.description.as_deref(),
                self.sku.as_deref(),
            ],
            term,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

impl Record for Service {
    const COLLECTION: &'static str = "services";

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, term: &str) -> bool {
        any_contains(
            &[Some(self.name.as_str()), self.description.as_deref()],
            term,
        )
    }
}

/// Whether a line refers to a product or a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Product,
    Service,
}

impl LineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LineKind::Product => "product",
            LineKind::Service => "service",
        }
    }
}

impl std::str::FromStr for LineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" | "products" => Ok(LineKind::Product),
            "service" | "services" => Ok(LineKind::Service),
            other => Err(format!(
                "unknown line kind '{}': use product or service",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Open,
    Completed,
    Cancelled,
}

/// A line frozen into a stored order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub source_id: String,
    pub kind: LineKind,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// A stored order.
///
/// Amounts are frozen at creation time; the live recomputation lives in
/// [`OrderDraft`](crate::order::OrderDraft).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub lines: Vec<OrderLine>,
    pub discount: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for Order {
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, term: &str) -> bool {
        any_contains(
            &[Some(self.id.as_str()), Some(self.customer_name.as_str())],
            term,
        )
    }
}
