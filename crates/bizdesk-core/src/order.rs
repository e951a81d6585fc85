//! Order draft aggregator.
//!
//! An [`OrderDraft`] is the mutable order being assembled on the order
//! screen: an optional customer, product and service lines, and a
//! discount. Subtotals and the total are derived on every read from the
//! lines and the discount and are never stored, so they cannot drift from
//! their inputs.
//!
//! Text inputs are applied leniently: a malformed quantity or price is
//! written as zero and the parse failure is returned as a [`DraftError`]
//! so the caller can flag the field.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Customer, LineKind, Order, OrderLine, OrderStatus, Product, Service};
use crate::money::{self, ParseError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("no line with id '{0}'")]
    UnknownLine(String),
    #[error("invalid quantity for line '{line_id}': {source}")]
    InvalidQuantity { line_id: String, source: ParseError },
    #[error("invalid price for line '{line_id}': {source}")]
    InvalidPrice { line_id: String, source: ParseError },
    #[error("invalid discount: {0}")]
    InvalidDiscount(ParseError),
    #[error("order has no customer")]
    MissingCustomer,
    #[error("order has no lines")]
    EmptyOrder,
}

/// The customer an order is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRef {
    pub id: String,
    pub name: String,
}

impl From<&Customer> for CustomerRef {
    fn from(c: &Customer) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
        }
    }
}

/// A catalog entry that can be added to a draft.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSource {
    pub source_id: String,
    pub kind: LineKind,
    pub name: String,
    pub unit_price: Decimal,
}

impl From<&Product> for LineSource {
    fn from(p: &Product) -> Self {
        Self {
            source_id: p.id.clone(),
            kind: LineKind::Product,
            name: p.name.clone(),
            unit_price: p.price,
        }
    }
}

impl From<&Service> for LineSource {
    fn from(s: &Service) -> Self {
        Self {
            source_id: s.id.clone(),
            kind: LineKind::Service,
            name: s.name.clone(),
            unit_price: s.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub line_id: String,
    pub source_id: String,
    pub kind: LineKind,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    /// `unit_price * quantity`, saturating instead of overflowing.
    pub fn line_total(&self) -> Decimal {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity))
            .unwrap_or_else(|| saturated(self.unit_price))
    }
}

fn saturated(toward: Decimal) -> Decimal {
    if toward.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}

fn saturating_sum<I: Iterator<Item = Decimal>>(amounts: I) -> Decimal {
    amounts.fold(Decimal::ZERO, |acc, x| {
        acc.checked_add(x).unwrap_or_else(|| saturated(x))
    })
}

#[derive(Debug, Clone, Default)]
pub struct OrderDraft {
    customer: Option<CustomerRef>,
    lines: Vec<LineItem>,
    discount: Decimal,
}

impl OrderDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn customer(&self) -> Option<&CustomerRef> {
        self.customer.as_ref()
    }

    pub fn set_customer(&mut self, customer: CustomerRef) {
        self.customer = Some(customer);
    }

    pub fn clear_customer(&mut self) {
        self.customer = None;
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn line(&self, line_id: &str) -> Option<&LineItem> {
        self.lines.iter().find(|l| l.line_id == line_id)
    }

    /// Find the line created from a given catalog entry.
    pub fn line_for_source(&self, kind: LineKind, source_id: &str) -> Option<&LineItem> {
        self.lines
            .iter()
            .find(|l| l.kind == kind && l.source_id == source_id)
    }

    /// Append a line per source not already in the draft, at quantity 1.
    ///
    /// Sources are matched on kind and id. Returns how many lines were added.
    pub fn add_line_items<I>(&mut self, sources: I) -> usize
    where
        I: IntoIterator<Item = LineSource>,
    {
        let before = self.lines.len();
        for src in sources {
            if self.line_for_source(src.kind, &src.source_id).is_some() {
                continue;
            }
            self.lines.push(LineItem {
                line_id: Uuid::new_v4().to_string(),
                source_id: src.source_id,
                kind: src.kind,
                name: src.name,
                unit_price: src.unit_price,
                quantity: 1,
            });
        }
        self.lines.len() - before
    }

    pub fn remove_line_item(&mut self, line_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.line_id != line_id);
        self.lines.len() != before
    }

    /// Set a line's quantity from form text. Malformed input sets zero.
    pub fn set_quantity(&mut self, line_id: &str, raw: &str) -> Result<(), DraftError> {
        let line = self.line_mut(line_id)?;
        match money::parse_quantity(raw) {
            Ok(q) => {
                line.quantity = q;
                Ok(())
            }
            Err(source) => {
                line.quantity = 0;
                Err(DraftError::InvalidQuantity {
                    line_id: line_id.to_string(),
                    source,
                })
            }
        }
    }

    /// Set a line's unit price from form text (`"R$ 12,50"`). Malformed
    /// input sets zero.
    pub fn set_unit_price(&mut self, line_id: &str, raw: &str) -> Result<(), DraftError> {
        let line = self.line_mut(line_id)?;
        match money::parse_amount(raw) {
            Ok(p) => {
                line.unit_price = p;
                Ok(())
            }
            Err(source) => {
                line.unit_price = Decimal::ZERO;
                Err(DraftError::InvalidPrice {
                    line_id: line_id.to_string(),
                    source,
                })
            }
        }
    }

    pub fn discount(&self) -> Decimal {
        self.discount
    }

    /// Set the discount from form text. Malformed input sets zero.
    pub fn set_discount(&mut self, raw: &str) -> Result<(), DraftError> {
        match money::parse_amount(raw) {
            Ok(d) => {
                self.discount = d;
                Ok(())
            }
            Err(e) => {
                self.discount = Decimal::ZERO;
                Err(DraftError::InvalidDiscount(e))
            }
        }
    }

    pub fn subtotal(&self) -> Decimal {
        saturating_sum(self.lines.iter().map(LineItem::line_total))
    }

    pub fn products_subtotal(&self) -> Decimal {
        self.subtotal_of(LineKind::Product)
    }

    pub fn services_subtotal(&self) -> Decimal {
        self.subtotal_of(LineKind::Service)
    }

    /// `subtotal - discount`, floored at zero.
    pub fn total(&self) -> Decimal {
        self.subtotal()
            .checked_sub(self.discount)
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Freeze the draft into an unsaved [`Order`] (empty id, status open).
    pub fn to_order(&self) -> Result<Order, DraftError> {
        let customer = self.customer.as_ref().ok_or(DraftError::MissingCustomer)?;
        if self.lines.is_empty() {
            return Err(DraftError::EmptyOrder);
        }
        Ok(Order {
            id: String::new(),
            customer_id: customer.id.clone(),
            customer_name: customer.name.clone(),
            lines: self
                .lines
                .iter()
                .map(|l| OrderLine {
                    source_id: l.source_id.clone(),
                    kind: l.kind,
                    name: l.name.clone(),
                    unit_price: l.unit_price,
                    quantity: l.quantity,
                    line_total: l.line_total(),
                })
                .collect(),
            discount: self.discount,
            subtotal: self.subtotal(),
            total: self.total(),
            status: OrderStatus::Open,
            notes: None,
            created_at: Utc::now(),
        })
    }

    fn subtotal_of(&self, kind: LineKind) -> Decimal {
        saturating_sum(
            self.lines
                .iter()
                .filter(|l| l.kind == kind)
                .map(LineItem::line_total),
        )
    }

    fn line_mut(&mut self, line_id: &str) -> Result<&mut LineItem, DraftError> {
        self.lines
            .iter_mut()
            .find(|l| l.line_id == line_id)
            .ok_or_else(|| DraftError::UnknownLine(line_id.to_string()))
    }
}
