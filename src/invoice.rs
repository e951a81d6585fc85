//! `bizdesk invoice`: render a stored order as HTML.
//!
//! The rendering itself lives in `bizdesk_core::invoice`; this module
//! fetches the order and its customer and writes the document out.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use bizdesk_core::collection::Collection;
use bizdesk_core::models::{Customer, Order};

pub use bizdesk_core::invoice::{render_invoice_html, CompanyProfile};

use crate::config::Config;
use crate::rest::RestClient;

/// Fetch an order (and its customer, when still present) and render it.
///
/// A missing customer record is not an error: the invoice falls back to
/// the name stored on the order.
pub async fn invoice_for<OC, CC>(
    orders: &OC,
    customers: &CC,
    order_id: &str,
    company: &CompanyProfile,
) -> Result<String>
where
    OC: Collection<Order>,
    CC: Collection<Customer>,
{
    let order = orders
        .get(order_id)
        .await
        .with_context(|| format!("Failed to fetch order {}", order_id))?
        .ok_or_else(|| anyhow!("Order not found: {}", order_id))?;

    let customer = match customers.get(&order.customer_id).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(customer = %order.customer_id, "customer lookup failed: {:#}", e);
            None
        }
    };

    Ok(render_invoice_html(&order, customer.as_ref(), company))
}

pub async fn run_invoice(config: &Config, order_id: &str, out: Option<&Path>) -> Result<()> {
    let client = RestClient::new(&config.api)?;
    let html = invoice_for(
        &client.collection::<Order>(),
        &client.collection::<Customer>(),
        order_id,
        &config.company,
    )
    .await?;

    match out {
        Some(path) => {
            std::fs::write(path, &html)
                .with_context(|| format!("Failed to write invoice: {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => print!("{}", html),
    }
    Ok(())
}
