//! QKart CLI - a terminal storefront.
//!
//! # Usage
//!
//! ```bash
//! # Browse and search
//! qkart products
//! qkart search "tan leather"
//! qkart browse                  # type queries line by line, results are debounced
//!
//! # Account
//! qkart register crio.do --password learnbydoing
//! qkart login crio.do --password learnbydoing
//! qkart whoami
//!
//! # Cart
//! qkart cart add BW0jAAeDJmlZCF8i --qty 2
//! qkart cart inc BW0jAAeDJmlZCF8i
//! qkart cart show
//!
//! # Checkout
//! qkart address add "221B Baker Street, London NW1 6XE"
//! qkart checkout <address-id>
//! ```
//!
//! # Environment Variables
//!
//! - `QKART_API_ENDPOINT` - backend base URL, e.g. `http://localhost:8082/api/v1`
//! - `QKART_STATE_PATH` - where the session is stored (default `.qkart/state.json`)
//! - `SENTRY_DSN` - enables error reporting

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use qkart_client::ClientConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "qkart")]
#[command(author, version, about = "QKart terminal storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every product
    Products,
    /// Search products by name or category
    Search {
        /// Search text; empty lists everything
        #[arg(default_value = "")]
        text: String,
    },
    /// Interactive search: each line read from stdin is a keystroke
    Browse,
    /// Create an account
    Register {
        /// Username (at least 6 characters)
        username: String,
        /// Password (at least 6 characters)
        #[arg(short, long)]
        password: String,
        /// Password confirmation; defaults to `--password`
        #[arg(short, long)]
        confirm: Option<String>,
    },
    /// Log in and load the cart
    Login {
        /// Username
        username: String,
        /// Password
        #[arg(short, long)]
        password: String,
    },
    /// Log out and clear local state
    Logout,
    /// Show the logged-in user and wallet balance
    Whoami,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage delivery addresses
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
    /// Place an order for the whole cart
    Checkout {
        /// Delivery address id (see `qkart address list`)
        address_id: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents and totals
    Show,
    /// Add a product that is not in the cart yet
    Add {
        /// Product id
        product_id: String,
        /// Quantity
        #[arg(short, long, default_value_t = 1)]
        qty: u32,
    },
    /// Set the quantity of a product; 0 removes it
    Set {
        /// Product id
        product_id: String,
        /// New quantity
        #[arg(allow_negative_numbers = true)]
        qty: i64,
    },
    /// Add one unit
    Inc {
        /// Product id
        product_id: String,
    },
    /// Remove one unit
    Dec {
        /// Product id
        product_id: String,
    },
}

#[derive(Subcommand)]
enum AddressAction {
    /// List saved addresses
    List,
    /// Save a new address
    Add {
        /// Full address (at least 20 characters)
        address: String,
    },
    /// Delete a saved address
    Delete {
        /// Address id
        address_id: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Errors become Sentry events, everything down to debug a breadcrumb.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO | tracing::Level::DEBUG => {
            sentry_tracing::EventFilter::Breadcrumb
        }
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => commands::fail(&e),
    };

    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays pipeable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "qkart_client=warn,qkart_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        commands::fail(&e);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), commands::CommandError> {
    let shop = commands::open(config)?;

    match cli.command {
        Commands::Products => commands::catalog::products(&shop).await?,
        Commands::Search { text } => commands::catalog::search(&shop, &text).await,
        Commands::Browse => commands::catalog::browse(&shop).await?,
        Commands::Register {
            username,
            password,
            confirm,
        } => {
            let confirm = confirm.as_deref().unwrap_or(&password);
            commands::auth::register(&shop, &username, &password, confirm).await?;
        }
        Commands::Login { username, password } => {
            commands::auth::login(&shop, &username, &password).await?;
        }
        Commands::Logout => commands::auth::logout(&shop)?,
        Commands::Whoami => commands::auth::whoami(&shop),
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&shop).await?,
            CartAction::Add { product_id, qty } => {
                commands::cart::add(&shop, &product_id.into(), qty).await?;
            }
            CartAction::Set { product_id, qty } => {
                commands::cart::set(&shop, &product_id.into(), qty).await?;
            }
            CartAction::Inc { product_id } => {
                commands::cart::increment(&shop, &product_id.into()).await?;
            }
            CartAction::Dec { product_id } => {
                commands::cart::decrement(&shop, &product_id.into()).await?;
            }
        },
        Commands::Address { action } => match action {
            AddressAction::List => commands::checkout::list_addresses(&shop).await?,
            AddressAction::Add { address } => {
                commands::checkout::add_address(&shop, &address).await?;
            }
            AddressAction::Delete { address_id } => {
                commands::checkout::delete_address(&shop, &address_id.into()).await?;
            }
        },
        Commands::Checkout { address_id } => {
            commands::checkout::checkout(&shop, &address_id.into()).await?;
        }
    }
    Ok(())
}
