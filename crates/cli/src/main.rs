//! Tiffin CLI - menu feed and checkout tooling.
//!
//! # Usage
//!
//! ```bash
//! # Preview the lunch schedule a customer would see right now
//! tiffin-cli menu preview --source "$MENU_CSV_URL" --meal lunch
//!
//! # Preview as of a given instant, from a local export
//! tiffin-cli menu preview --source menu.csv --meal snacks --at 2026-10-19T20:59:00+05:30
//!
//! # Report problems in the feed
//! tiffin-cli menu check --source menu.csv
//!
//! # Sign a test gateway payment (uses RAZORPAY_KEY_SECRET)
//! tiffin-cli payment sign --order-id order_abc --payment-id pay_xyz
//! ```
//!
//! # Commands
//!
//! - `menu preview` - Print delivery days and cutoffs for a meal
//! - `menu check` - Validate feed rows
//! - `payment sign` - Compute a gateway payment signature

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use tiffin_core::types::MealCategory;

mod commands;

#[derive(Parser)]
#[command(name = "tiffin-cli")]
#[command(author, version, about = "Tiffin storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the menu feed
    Menu {
        #[command(subcommand)]
        action: MenuAction,
    },
    /// Gateway payment helpers
    Payment {
        #[command(subcommand)]
        action: PaymentAction,
    },
}

#[derive(Subcommand)]
enum MenuAction {
    /// Print the delivery schedule for a meal
    Preview {
        /// Feed URL or path to a CSV file
        #[arg(short, long, env = "MENU_CSV_URL")]
        source: String,

        /// Meal category (`breakfast`, `lunch`, `dinner`, `snacks`)
        #[arg(short, long, default_value = "lunch")]
        meal: MealCategory,

        /// Evaluate cutoffs at this RFC 3339 instant instead of now
        #[arg(long)]
        at: Option<String>,
    },
    /// Validate feed rows and report problems
    Check {
        /// Feed URL or path to a CSV file
        #[arg(short, long, env = "MENU_CSV_URL")]
        source: String,
    },
}

#[derive(Subcommand)]
enum PaymentAction {
    /// Compute the signature the gateway would send for a payment
    Sign {
        /// Gateway order ID
        #[arg(short, long)]
        order_id: String,

        /// Gateway payment ID
        #[arg(short, long)]
        payment_id: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Menu { action } => match action {
            MenuAction::Preview { source, meal, at } => {
                commands::menu::preview(&source, meal, at.as_deref()).await?;
            }
            MenuAction::Check { source } => commands::menu::check(&source).await?,
        },
        Commands::Payment { action } => match action {
            PaymentAction::Sign {
                order_id,
                payment_id,
            } => commands::payment::sign(&order_id, &payment_id)?,
        },
    }
    Ok(())
}
