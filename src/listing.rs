//! `bizdesk list` and `bizdesk browse`: the list screens on a terminal.
//!
//! `list` pages through a collection with a [`ListController`] and prints
//! the accumulated result. `browse` reads search terms from stdin and runs
//! them through a [`SearchController`], so typing behaves like the search
//! box of a list screen (`:more` loads the next page, `:quit` exits).

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::ValueEnum;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use bizdesk_core::collection::Collection;
use bizdesk_core::models::{Customer, Order, Product, Record, Service};
use bizdesk_core::money::format_brl;

use crate::config::Config;
use crate::list::{ListController, ListSnapshot};
use crate::notify::Notifier;
use crate::rest::RestClient;
use crate::search::SearchController;

/// Collections addressable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CollectionKind {
    Customers,
    Products,
    Services,
    Orders,
}

/// One-line terminal rendering of a record.
pub trait Row {
    fn row(&self) -> String;
}

impl Row for Customer {
    fn row(&self) -> String {
        let contact = self
            .email
            .as_deref()
            .or(self.phone.as_deref())
            .unwrap_or("-");
        format!("{:<12} {:<32} {}", self.id, self.name, contact)
    }
}

impl Row for Product {
    fn row(&self) -> String {
        format!(
            "{:<12} {:<32} {:>14}  stock {}",
            self.id,
            self.name,
            format_brl(self.price),
            self.stock.map_or_else(|| "-".to_string(), |s| s.to_string())
        )
    }
}

impl Row for Service {
    fn row(&self) -> String {
        format!(
            "{:<12} {:<32} {:>14}",
            self.id,
            self.name,
            format_brl(self.price)
        )
    }
}

impl Row for Order {
    fn row(&self) -> String {
        format!(
            "{:<12} {:<24} {:>14}  {}  {:?}",
            self.id,
            self.customer_name,
            format_brl(self.total),
            self.created_at.format("%Y-%m-%d"),
            self.status
        )
    }
}

/// Print a snapshot as rows followed by a one-line footer.
pub fn write_rows<T: Record + Row, W: Write>(out: &mut W, snap: &ListSnapshot<T>) -> Result<()> {
    for item in &snap.items {
        writeln!(out, "{}", item.row())?;
    }
    let filter = if snap.term.is_empty() {
        String::new()
    } else {
        format!(" matching '{}'", snap.term)
    };
    writeln!(
        out,
        "-- {} {}{}{}",
        snap.items.len(),
        T::COLLECTION,
        filter,
        if snap.has_more {
            " (more available)"
        } else {
            ""
        }
    )?;
    Ok(())
}

pub async fn run_list(
    config: &Config,
    kind: CollectionKind,
    search: Option<String>,
    pages: u32,
    json: bool,
    notifier: Arc<dyn Notifier>,
) -> Result<()> {
    let client = RestClient::new(&config.api)?;
    let term = search.unwrap_or_default();
    match kind {
        CollectionKind::Customers => {
            list_records::<Customer>(&client, config, &term, pages, json, notifier).await
        }
        CollectionKind::Products => {
            list_records::<Product>(&client, config, &term, pages, json, notifier).await
        }
        CollectionKind::Services => {
            list_records::<Service>(&client, config, &term, pages, json, notifier).await
        }
        CollectionKind::Orders => {
            list_records::<Order>(&client, config, &term, pages, json, notifier).await
        }
    }
}

/// Load up to `pages` pages for `term`, stopping early once exhausted.
pub async fn collect_pages<T, C>(list: &ListController<T, C>, term: &str, pages: u32) -> Result<()>
where
    T: Record,
    C: Collection<T> + 'static,
{
    list.load_page(term, 0).await?;
    for _ in 1..pages.max(1) {
        if list.load_next().await?.is_none() {
            break;
        }
    }
    Ok(())
}

async fn list_records<T: Record + Row>(
    client: &RestClient,
    config: &Config,
    term: &str,
    pages: u32,
    json: bool,
    notifier: Arc<dyn Notifier>,
) -> Result<()> {
    let list = ListController::new(
        Arc::new(client.collection::<T>()),
        notifier,
        config.paging.page_size,
    );
    collect_pages(&list, term, pages).await?;
    let snap = list.snapshot();

    let mut out = std::io::stdout().lock();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&snap)?)?;
    } else {
        write_rows(&mut out, &snap)?;
    }
    Ok(())
}

pub async fn run_browse(
    config: &Config,
    kind: CollectionKind,
    notifier: Arc<dyn Notifier>,
) -> Result<()> {
    let client = RestClient::new(&config.api)?;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    match kind {
        CollectionKind::Customers => {
            let search = searcher::<Customer>(&client, config, notifier);
            browse_session(&search, stdin, &mut out).await
        }
        CollectionKind::Products => {
            let search = searcher::<Product>(&client, config, notifier);
            browse_session(&search, stdin, &mut out).await
        }
        CollectionKind::Services => {
            let search = searcher::<Service>(&client, config, notifier);
            browse_session(&search, stdin, &mut out).await
        }
        CollectionKind::Orders => {
            let search = searcher::<Order>(&client, config, notifier);
            browse_session(&search, stdin, &mut out).await
        }
    }
}

fn searcher<T: Record>(
    client: &RestClient,
    config: &Config,
    notifier: Arc<dyn Notifier>,
) -> SearchController<T, crate::rest::RestCollection<T>> {
    let list = ListController::new(
        Arc::new(client.collection::<T>()),
        notifier,
        config.paging.page_size,
    );
    SearchController::new(list, config.search.debounce())
}

/// Drive a search controller from line-oriented input.
///
/// Starts with the unfiltered first page. Each input line is a search
/// term; `:more` (`:m`) loads the next page and `:quit` (`:q`) ends the
/// session. Fetch failures are reported through the controller's notifier
/// and the session continues.
pub async fn browse_session<T, C, R, W>(
    search: &SearchController<T, C>,
    input: R,
    out: &mut W,
) -> Result<()>
where
    T: Record + Row,
    C: Collection<T> + 'static,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    search.input("");
    search.settle().await;
    write_rows(out, &search.list().snapshot())?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":quit" | ":q" => break,
            ":more" | ":m" => match search.load_more().await {
                Ok(Some(_)) => write_rows(out, &search.list().snapshot())?,
                Ok(None) => writeln!(out, "-- no more results")?,
                Err(_) => {}
            },
            term => {
                search.input(term);
                search.settle().await;
                write_rows(out, &search.list().snapshot())?;
            }
        }
        out.flush()?;
    }
    Ok(())
}
