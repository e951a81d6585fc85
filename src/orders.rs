//! Order building from the command line.
//!
//! `bizdesk order create` assembles an [`OrderDraft`] from live catalog
//! records, applies quantities, price overrides, and a discount from text
//! exactly as the order screen would, prints the derived totals, and
//! creates the order unless `--dry-run` is given.
//!
//! Malformed quantities and prices are applied as zero (the draft's
//! lenient rule) and reported as warnings.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};

use bizdesk_core::collection::Collection;
use bizdesk_core::models::{Customer, LineKind, Order, Product, Service};
use bizdesk_core::money::format_brl;
use bizdesk_core::order::{CustomerRef, DraftError, LineSource, OrderDraft};

use crate::config::Config;
use crate::list::ListController;
use crate::notify::{Notice, Notifier};
use crate::rest::RestClient;

/// `--item product:ID[=QTY]` or `--item service:ID[=QTY]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSpec {
    pub kind: LineKind,
    pub id: String,
    /// Quantity text as typed; `None` keeps the default of 1.
    pub quantity: Option<String>,
}

impl FromStr for ItemSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid item '{}': expected KIND:ID[=QTY]", s))?;
        let kind: LineKind = kind.parse()?;
        let (id, quantity) = match rest.split_once('=') {
            Some((id, q)) => (id, Some(q.to_string())),
            None => (rest, None),
        };
        if id.is_empty() {
            return Err(format!("invalid item '{}': missing id", s));
        }
        Ok(Self {
            kind,
            id: id.to_string(),
            quantity,
        })
    }
}

/// `--price [KIND:]ID=TEXT`: override a line's unit price with form text.
///
/// The kind is only needed when a product and a service share an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceOverride {
    pub kind: Option<LineKind>,
    pub source_id: String,
    pub raw: String,
}

impl FromStr for PriceOverride {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, raw) = s
            .split_once('=')
            .ok_or_else(|| format!("invalid price '{}': expected [KIND:]ID=PRICE", s))?;
        let (kind, id) = match target.split_once(':') {
            Some((kind, id)) => (Some(kind.parse::<LineKind>()?), id),
            None => (None, target),
        };
        if id.is_empty() {
            return Err(format!("invalid price '{}': missing id", s));
        }
        Ok(Self {
            kind,
            source_id: id.to_string(),
            raw: raw.to_string(),
        })
    }
}

/// Everything the order command needs from the user.
#[derive(Debug, Clone, Default)]
pub struct OrderRequest {
    pub customer_id: String,
    pub items: Vec<ItemSpec>,
    pub prices: Vec<PriceOverride>,
    pub discount: Option<String>,
    pub notes: Option<String>,
}

/// Build a draft from catalog lookups.
///
/// Returns the draft together with the validation problems that were
/// coerced to zero along the way. Unknown customers or catalog ids are
/// hard errors.
pub async fn build_draft<CC, PC, SC>(
    customers: &CC,
    products: &PC,
    services: &SC,
    req: &OrderRequest,
) -> Result<(OrderDraft, Vec<DraftError>)>
where
    CC: Collection<Customer>,
    PC: Collection<Product>,
    SC: Collection<Service>,
{
    let mut draft = OrderDraft::new();
    let mut problems = Vec::new();

    let customer = customers
        .get(&req.customer_id)
        .await
        .with_context(|| format!("Failed to look up customer {}", req.customer_id))?
        .ok_or_else(|| anyhow!("Customer not found: {}", req.customer_id))?;
    draft.set_customer(CustomerRef::from(&customer));

    for spec in &req.items {
        let source = match spec.kind {
            LineKind::Product => products
                .get(&spec.id)
                .await
                .with_context(|| format!("Failed to look up product {}", spec.id))?
                .map(|p| LineSource::from(&p)),
            LineKind::Service => services
                .get(&spec.id)
                .await
                .with_context(|| format!("Failed to look up service {}", spec.id))?
                .map(|s| LineSource::from(&s)),
        }
        .ok_or_else(|| anyhow!("{} not found: {}", spec.kind.as_str(), spec.id))?;
        if draft.add_line_items([source]) == 0 {
            tracing::warn!(
                kind = spec.kind.as_str(),
                id = %spec.id,
                "item listed more than once; keeping the first"
            );
            continue;
        }

        if let Some(raw) = &spec.quantity {
            let line_id = line_id_for(&draft, spec.kind, &spec.id)?;
            if let Err(e) = draft.set_quantity(&line_id, raw) {
                problems.push(e);
            }
        }
    }

    for price in &req.prices {
        let line_id = price_target(&draft, price)?;
        if let Err(e) = draft.set_unit_price(&line_id, &price.raw) {
            problems.push(e);
        }
    }

    if let Some(raw) = &req.discount {
        if let Err(e) = draft.set_discount(raw) {
            problems.push(e);
        }
    }

    Ok((draft, problems))
}

fn price_target(draft: &OrderDraft, price: &PriceOverride) -> Result<String> {
    let mut matches = draft.lines().iter().filter(|l| {
        l.source_id == price.source_id && price.kind.map_or(true, |k| k == l.kind)
    });
    let line = matches
        .next()
        .ok_or_else(|| anyhow!("--price refers to an item not in the order: {}", price.source_id))?;
    if matches.next().is_some() {
        bail!(
            "--price {} is ambiguous: write product:{} or service:{}",
            price.source_id,
            price.source_id,
            price.source_id
        );
    }
    Ok(line.line_id.clone())
}

fn line_id_for(draft: &OrderDraft, kind: LineKind, source_id: &str) -> Result<String> {
    draft
        .line_for_source(kind, source_id)
        .map(|l| l.line_id.clone())
        .ok_or_else(|| anyhow!("line for {} {} missing", kind.as_str(), source_id))
}

/// Human-readable summary of a draft.
pub fn format_draft(draft: &OrderDraft) -> String {
    let mut out = String::new();
    if let Some(c) = draft.customer() {
        out.push_str(&format!("customer: {} ({})\n", c.name, c.id));
    }
    for line in draft.lines() {
        out.push_str(&format!(
            "  {:<8} {:<30} {:>4} x {:>14} = {:>14}\n",
            line.kind.as_str(),
            line.name,
            line.quantity,
            format_brl(line.unit_price),
            format_brl(line.line_total())
        ));
    }
    out.push_str(&format!("products: {}\n", format_brl(draft.products_subtotal())));
    out.push_str(&format!("services: {}\n", format_brl(draft.services_subtotal())));
    out.push_str(&format!("subtotal: {}\n", format_brl(draft.subtotal())));
    out.push_str(&format!("discount: {}\n", format_brl(draft.discount())));
    out.push_str(&format!("total:    {}\n", format_brl(draft.total())));
    out
}

/// Build, show, and (unless `dry_run`) create an order.
pub async fn run_order_create(
    config: &Config,
    req: OrderRequest,
    dry_run: bool,
    notifier: Arc<dyn Notifier>,
) -> Result<()> {
    if req.items.is_empty() {
        bail!("An order needs at least one --item");
    }
    let client = RestClient::new(&config.api)?;
    let (draft, problems) = build_draft(
        &client.collection::<Customer>(),
        &client.collection::<Product>(),
        &client.collection::<Service>(),
        &req,
    )
    .await?;

    for problem in &problems {
        notifier.notify(Notice::warning(format!("{} (applied as zero)", problem)));
    }

    print!("{}", format_draft(&draft));

    let mut order = draft.to_order()?;
    order.notes = req.notes.clone();

    if dry_run {
        println!("dry run: order not created");
        return Ok(());
    }

    let orders: ListController<Order, _> = ListController::new(
        Arc::new(client.collection::<Order>()),
        notifier,
        config.paging.page_size,
    );
    let stored = orders.create(&order).await?;
    tracing::info!(order = %stored.id, total = %stored.total, "order created");
    println!("created order {}", stored.id);
    Ok(())
}
