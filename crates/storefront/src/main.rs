//! Saffron CLI - storefront client front end.
//!
//! A thin presentation layer over the client library: renders store state
//! and dispatches store/checkout actions. No business logic lives here.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! saffron products
//!
//! # Sign in / out
//! saffron login -e priya@example.com -p secret
//! saffron logout
//!
//! # Order history, newest first
//! saffron orders --status completed --sort amount
//!
//! # Buy one unit of a product
//! saffron buy 66a1f0 --card-number 4242424242424242 \
//!     --exp-month 12 --exp-year 2030 --cvc 123
//! ```
//!
//! # Environment Variables
//!
//! See [`saffron_storefront::config::StorefrontConfig`].

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use saffron_core::{Email, OrderStatus, ProductId};
use saffron_storefront::api::BackendClient;
use saffron_storefront::checkout::{CheckoutOrchestrator, CheckoutState};
use saffron_storefront::config::StorefrontConfig;
use saffron_storefront::payments::{CardDetails, StripeGateway};
use saffron_storefront::stores::orders::{SortDirection, SortKey, StatusFilter};
use saffron_storefront::stores::session::{Credentials, Registration};
use saffron_storefront::stores::{CatalogStore, OrderHistory, SessionStore};

#[derive(Parser)]
#[command(name = "saffron")]
#[command(author, version, about = "Saffron storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the product catalog
    Products,
    /// Sign in
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show your orders
    Orders {
        /// Only show orders in this status (`pending`, `completed`,
        /// `cancelled`, `failed`)
        #[arg(long)]
        status: Option<String>,

        /// Sort by `date` or `amount`
        #[arg(long, default_value = "date")]
        sort: String,

        /// Sort ascending instead of newest/largest first
        #[arg(long)]
        ascending: bool,
    },
    /// Buy a product
    Buy {
        /// Product id from the catalog
        product_id: String,

        /// Units to buy
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Card number
        #[arg(long)]
        card_number: String,

        /// Card expiry month (1-12)
        #[arg(long)]
        exp_month: u32,

        /// Card expiry year (four digits)
        #[arg(long)]
        exp_year: u32,

        /// Card verification code
        #[arg(long)]
        cvc: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    let backend = BackendClient::new(&config.backend);
    let mut session = SessionStore::open(&config.state_dir).await;

    match cli.command {
        Commands::Products => {
            let mut catalog = CatalogStore::new();
            catalog.refresh(&backend).await?;
            for product in catalog.products() {
                tracing::info!(
                    id = %product.id,
                    price = %product.price,
                    stock = product.stock,
                    "{}",
                    product.name
                );
            }
        }
        Commands::Login { email, password } => {
            let credentials = Credentials::new(Email::parse(&email)?, password);
            let signed_in = session.login(&backend, &credentials).await?;
            tracing::info!(
                name = %signed_in.identity.name,
                role = %signed_in.identity.role,
                "signed in"
            );
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            let registration = Registration::new(name, Email::parse(&email)?, password);
            let signed_in = session.register(&backend, &registration).await?;
            tracing::info!(name = %signed_in.identity.name, "account created and signed in");
        }
        Commands::Logout => {
            session.logout(&backend).await;
            tracing::info!("signed out");
        }
        Commands::Orders {
            status,
            sort,
            ascending,
        } => {
            let filter = match status.as_deref() {
                None => StatusFilter::All,
                Some(s) => StatusFilter::Only(s.parse::<OrderStatus>()?),
            };
            let key = match sort.as_str() {
                "date" => SortKey::Date,
                "amount" => SortKey::Amount,
                other => return Err(format!("invalid sort key: {other}").into()),
            };
            let direction = if ascending {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };

            let mut history = OrderHistory::new();
            history.refresh(&backend, &session).await?;
            for order in history.view(filter, key, direction) {
                tracing::info!(
                    id = %order.id,
                    status = %order.status,
                    total = %order.total_amount,
                    placed = %order.created_at.format("%Y-%m-%d"),
                    "order"
                );
            }
        }
        Commands::Buy {
            product_id,
            quantity,
            card_number,
            exp_month,
            exp_year,
            cvc,
        } => {
            let gateway = StripeGateway::new(&config.stripe);
            let mut checkout = CheckoutOrchestrator::new(&backend, &gateway, &session);

            checkout.begin(&ProductId::new(product_id), quantity).await?;
            if let CheckoutState::AwaitingCardConfirmation { amount, .. } = checkout.state() {
                tracing::info!(%amount, "payment intent created; confirming card");
            }

            let card = CardDetails {
                number: card_number,
                exp_month,
                exp_year,
                cvc,
            };
            checkout.submit_card(&card).await?;

            if let Some(receipt) = checkout.receipt() {
                tracing::info!(
                    order_id = %receipt.order_id,
                    amount = %receipt.amount,
                    payment_reference = %receipt.payment_reference,
                    "purchase completed"
                );
            }
        }
    }
    Ok(())
}
