//! HTML invoice rendering.
//!
//! [`render_invoice_html`] turns a stored [`Order`] into a self-contained
//! HTML document (inline CSS, no external assets) suitable for printing
//! or saving as PDF from a browser. All interpolated text is escaped.

use std::fmt::Write as _;

use serde::Deserialize;

use crate::models::{Customer, LineKind, Order, OrderStatus};
use crate::money::format_brl;

/// Issuer details printed in the invoice header.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Escape text for inclusion in HTML element content or attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Open => "Em aberto",
        OrderStatus::Completed => "Concluído",
        OrderStatus::Cancelled => "Cancelado",
    }
}

fn kind_label(kind: LineKind) -> &'static str {
    match kind {
        LineKind::Product => "Produto",
        LineKind::Service => "Serviço",
    }
}

const STYLE: &str = "body{font-family:Helvetica,Arial,sans-serif;color:#222;margin:32px}\
h1{font-size:22px;margin:0 0 4px}\
.muted{color:#666;font-size:12px}\
table{width:100%;border-collapse:collapse;margin-top:24px}\
th,td{padding:8px;border-bottom:1px solid #ddd;text-align:left}\
td.num,th.num{text-align:right}\
.totals{margin-top:16px;float:right;min-width:260px}\
.totals td{border:none;padding:4px 8px}\
.grand td{font-weight:bold;font-size:16px;border-top:2px solid #222}";

/// Render `order` as a standalone HTML invoice.
///
/// `customer` adds contact details under the bill-to block when the full
/// record is available; otherwise only the name stored on the order is
/// printed.
pub fn render_invoice_html(
    order: &Order,
    customer: Option<&Customer>,
    company: &CompanyProfile,
) -> String {
    let mut html = String::new();
    let number = if order.id.is_empty() {
        "rascunho"
    } else {
        order.id.as_str()
    };

    // Writing to a String cannot fail.
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Pedido {}</title>\n<style>{}</style>\n</head>\n<body>\n",
        escape_html(number),
        STYLE
    );

    html.push_str("<header>\n");
    if !company.name.is_empty() {
        let _ = writeln!(html, "<h1>{}</h1>", escape_html(&company.name));
    }
    for line in [&company.document, &company.address, &company.email, &company.phone]
        .into_iter()
        .flatten()
    {
        let _ = writeln!(html, "<div class=\"muted\">{}</div>", escape_html(line));
    }
    html.push_str("</header>\n");

    let _ = writeln!(
        html,
        "<section>\n<h2>Pedido {}</h2>\n<div class=\"muted\">Emitido em {} · {}</div>",
        escape_html(number),
        order.created_at.format("%d/%m/%Y %H:%M"),
        status_label(order.status)
    );

    html.push_str("<h3>Cliente</h3>\n");
    let _ = writeln!(html, "<div>{}</div>", escape_html(&order.customer_name));
    if let Some(c) = customer {
        for line in [&c.document, &c.email, &c.phone, &c.address]
            .into_iter()
            .flatten()
        {
            let _ = writeln!(html, "<div class=\"muted\">{}</div>", escape_html(line));
        }
    }
    html.push_str("</section>\n");

    html.push_str(
        "<table>\n<thead><tr><th>Item</th><th>Tipo</th><th class=\"num\">Qtd</th>\
         <th class=\"num\">Preço unit.</th><th class=\"num\">Total</th></tr></thead>\n<tbody>\n",
    );
    for line in &order.lines {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td>\
             <td class=\"num\">{}</td></tr>",
            escape_html(&line.name),
            kind_label(line.kind),
            line.quantity,
            format_brl(line.unit_price),
            format_brl(line.line_total)
        );
    }
    html.push_str("</tbody>\n</table>\n");

    html.push_str("<table class=\"totals\">\n");
    let _ = writeln!(
        html,
        "<tr><td>Subtotal</td><td class=\"num\">{}</td></tr>",
        format_brl(order.subtotal)
    );
    if !order.discount.is_zero() {
        let _ = writeln!(
            html,
            "<tr><td>Desconto</td><td class=\"num\">- {}</td></tr>",
            format_brl(order.discount)
        );
    }
    let _ = writeln!(
        html,
        "<tr class=\"grand\"><td>Total</td><td class=\"num\">{}</td></tr>",
        format_brl(order.total)
    );
    html.push_str("</table>\n");

    if let Some(notes) = &order.notes {
        let _ = writeln!(
            html,
            "<p style=\"clear:both;padding-top:24px\">{}</p>",
            escape_html(notes)
        );
    }

    html.push_str("</body>\n</html>\n");
    html
}
