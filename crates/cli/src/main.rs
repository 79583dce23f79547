//! Marketplace CLI - Inspect and edit the persisted cart.
//!
//! # Usage
//!
//! ```bash
//! # Show the current cart
//! mp-cart show
//!
//! # Add an item (exit status 2 if the cart belongs to another store)
//! mp-cart add -p p1 -s s1 -n Acme --price 100
//!
//! # Change a quantity, remove a line, empty the cart
//! mp-cart update -p p1 -q 3
//! mp-cart remove -p p1
//! mp-cart clear
//!
//! # Delete the stored cart altogether
//! mp-cart reset
//! ```
//!
//! # Commands
//!
//! - `show` - Print the cart (`--json` for the stored JSON shape)
//! - `add` / `force-add` - Add a line, or replace the cart with one line
//! - `remove` / `update` - Edit a line
//! - `fulfillment` - Choose delivery or pickup
//! - `clear` - Empty the cart
//! - `reset` - Delete the stored cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use marketplace_cart::{AddOutcome, CartConfig};
use marketplace_core::FulfillmentMode;

mod commands;

use commands::cart::{self, Candidate};

/// Exit status when `add` hits another store's cart.
const EXIT_CONFLICT: u8 = 2;

/// Exit status when `add` would put the cart out of range.
const EXIT_REJECTED: u8 = 3;

#[derive(Parser)]
#[command(name = "mp-cart")]
#[command(author, version, about = "Marketplace cart tools")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cart
    Show {
        /// Print the cart as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an item to the cart
    Add(ItemArgs),
    /// Replace the cart with a single item, discarding other stores' items
    ForceAdd(ItemArgs),
    /// Remove a line from the cart
    Remove(LineArgs),
    /// Set the quantity of a line
    Update {
        #[command(flatten)]
        line: LineArgs,

        /// New quantity (at least 1; use `remove` to delete a line)
        #[arg(short, long)]
        quantity: u32,
    },
    /// Choose how the order is fulfilled
    Fulfillment {
        /// `delivery` or `pickup`
        mode: FulfillmentMode,
    },
    /// Empty the cart
    Clear,
    /// Delete the stored cart
    Reset,
}

#[derive(Args)]
struct ItemArgs {
    /// Product ID
    #[arg(short, long)]
    product: String,

    /// Store ID
    #[arg(short, long)]
    store: String,

    /// Store display name
    #[arg(short = 'n', long)]
    store_name: String,

    /// Unit price
    #[arg(long)]
    price: Decimal,

    /// Variant (size, colour)
    #[arg(short, long)]
    variant: Option<String>,

    /// Quantity
    #[arg(short, long, default_value_t = 1)]
    quantity: u32,
}

impl From<ItemArgs> for Candidate {
    fn from(args: ItemArgs) -> Self {
        Self {
            product: args.product,
            store: args.store,
            store_name: args.store_name,
            price: args.price,
            variant: args.variant,
            quantity: args.quantity,
        }
    }
}

#[derive(Args)]
struct LineArgs {
    /// Product ID
    #[arg(short, long)]
    product: String,

    /// Variant (size, colour)
    #[arg(short, long)]
    variant: Option<String>,
}

fn init_tracing(json: bool) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketplace_cart=info,marketplace_cli=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::print_stdout)]
fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = CartConfig::from_env()?;
    if matches!(cli.command, Commands::Reset) {
        cart::reset(&config)?;
        println!("Stored cart deleted.");
        return Ok(ExitCode::SUCCESS);
    }

    let mut store = cart::open(&config);

    match cli.command {
        Commands::Show { json } => {
            if json {
                println!("{}", cart::render_json(store.state())?);
                return Ok(ExitCode::SUCCESS);
            }
        }
        Commands::Add(args) => match cart::add(&mut store, args.into())? {
            AddOutcome::Added => {}
            AddOutcome::Conflict => {
                println!(
                    "Your cart has items from {}. Use `mp-cart force-add` to start a new cart.",
                    store.state().store_name().unwrap_or("another store")
                );
                return Ok(ExitCode::from(EXIT_CONFLICT));
            }
            AddOutcome::Rejected => {
                println!("That quantity or price is too large for the cart.");
                return Ok(ExitCode::from(EXIT_REJECTED));
            }
        },
        Commands::ForceAdd(args) => cart::force_add(&mut store, args.into())?,
        Commands::Remove(line) => cart::remove(&mut store, &line.product, line.variant.as_deref()),
        Commands::Update { line, quantity } => {
            if !cart::update(&mut store, &line.product, line.variant.as_deref(), quantity) {
                println!("Quantity must be at least 1. Use `mp-cart remove` to delete a line.");
            }
        }
        Commands::Fulfillment { mode } => cart::set_fulfillment(&mut store, mode),
        Commands::Clear => cart::clear(&mut store),
        Commands::Reset => {}
    }

    println!("{}", cart::render(store.state()));
    Ok(ExitCode::SUCCESS)
}
