//! # Bizdesk CLI (`bizdesk`)
//!
//! Terminal front-end for the Bizdesk controllers.
//!
//! ## Usage
//!
//! ```bash
//! bizdesk --config ./config/bizdesk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bizdesk list <collection>` | Page through customers, products, services, or orders |
//! | `bizdesk browse <collection>` | Interactive debounced search over a collection |
//! | `bizdesk order create` | Build an order from catalog records and create it |
//! | `bizdesk invoice <order-id>` | Render an order as an HTML invoice |
//! | `bizdesk completions <shell>` | Print a shell completion script |
//!
//! ## Logging
//!
//! Diagnostics go to stderr through `tracing`. `BIZDESK_LOG` takes an
//! `EnvFilter` directive (default `bizdesk=info,warn`); `BIZDESK_LOG_FORMAT=json`
//! switches to JSON lines.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bizdesk::config;
use bizdesk::invoice;
use bizdesk::listing::{self, CollectionKind};
use bizdesk::notify::{Notifier, NotifyMode};
use bizdesk::orders::{self, ItemSpec, OrderRequest, PriceOverride};

/// Bizdesk CLI: headless client for customers, products, services,
/// orders, and invoices.
///
/// All commands except `completions` read a TOML configuration file
/// given by `--config`.
#[derive(Parser)]
#[command(
    name = "bizdesk",
    about = "Headless small-business client for lists, search, orders, and invoices",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/bizdesk.toml")]
    config: PathBuf,

    /// How user-facing notices are printed on stderr.
    ///
    /// Defaults to `human` on a terminal and `json` otherwise.
    #[arg(long, global = true, value_enum)]
    notices: Option<NoticeFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NoticeFormat {
    Human,
    Json,
    Off,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Page through a collection and print the accumulated list.
    List {
        collection: CollectionKind,

        /// Only records matching this term.
        #[arg(long)]
        search: Option<String>,

        /// Number of pages to load (stops early when the collection is exhausted).
        #[arg(long, default_value_t = 1)]
        pages: u32,

        /// Print the list state as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Search a collection interactively.
    ///
    /// Each line read from stdin is a search term, debounced like a search
    /// box. `:more` loads the next page, `:quit` exits.
    Browse { collection: CollectionKind },

    /// Work with orders.
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },

    /// Render an order as an HTML invoice.
    Invoice {
        /// Order id.
        order_id: String,

        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print a shell completion script.
    Completions { shell: clap_complete::Shell },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Build an order from catalog records and create it.
    ///
    /// Quantities, prices, and the discount are read as form text:
    /// `--price p1="R$ 12,50"`. Malformed values count as zero and are
    /// reported as warnings.
    Create {
        /// Customer id.
        #[arg(long)]
        customer: String,

        /// Line item: `product:ID[=QTY]` or `service:ID[=QTY]`. Repeatable.
        #[arg(long = "item", required = true)]
        items: Vec<ItemSpec>,

        /// Unit price override: `[KIND:]ID=PRICE`. Repeatable.
        #[arg(long = "price")]
        prices: Vec<PriceOverride>,

        /// Discount amount, e.g. `"R$ 5,00"`.
        #[arg(long)]
        discount: Option<String>,

        /// Free-text notes printed on the invoice.
        #[arg(long)]
        notes: Option<String>,

        /// Show the computed order without creating it.
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("BIZDESK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "bizdesk=debug,bizdesk_core=debug,info"
        } else {
            "bizdesk=info,warn"
        })
    });

    let format = env::var("BIZDESK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn notifier(format: Option<NoticeFormat>) -> Arc<dyn Notifier> {
    let mode = match format {
        Some(NoticeFormat::Human) => NotifyMode::Human,
        Some(NoticeFormat::Json) => NotifyMode::Json,
        Some(NoticeFormat::Off) => NotifyMode::Off,
        None => NotifyMode::default_for_tty(),
    };
    Arc::from(mode.notifier())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "bizdesk", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;
    let notifier = notifier(cli.notices);

    match cli.command {
        Commands::List {
            collection,
            search,
            pages,
            json,
        } => {
            listing::run_list(&cfg, collection, search, pages, json, notifier).await?;
        }
        Commands::Browse { collection } => {
            listing::run_browse(&cfg, collection, notifier).await?;
        }
        Commands::Order { action } => match action {
            OrderAction::Create {
                customer,
                items,
                prices,
                discount,
                notes,
                dry_run,
            } => {
                let req = OrderRequest {
                    customer_id: customer,
                    items,
                    prices,
                    discount,
                    notes,
                };
                orders::run_order_create(&cfg, req, dry_run, notifier).await?;
            }
        },
        Commands::Invoice { order_id, out } => {
            invoice::run_invoice(&cfg, &order_id, out.as_deref()).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
