//! Shopfront CLI - catalog and cart maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # List products, optionally searched and filtered
//! shopfront-cli products list --search lamp --category Home
//!
//! # Create products from a YAML file
//! shopfront-cli products import catalog.yaml
//!
//! # Delete a product
//! shopfront-cli products delete 42
//!
//! # Inspect stored carts
//! shopfront-cli cart show --store data/carts.json
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_API_BASE_URL` - Products backend base URL (default: http://localhost:8080/api)
//! - `STOREFRONT_API_TIMEOUT_SECS` - Backend request timeout (default: 10)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shopfront-cli")]
#[command(author, version, about = "Shopfront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage catalog products through the backend
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Inspect stored carts
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List {
        /// Search keyword
        #[arg(short, long)]
        search: Option<String>,

        /// Only show this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Create products from a YAML file
    Import {
        /// Path to the YAML product list
        file: PathBuf,
    },
    /// Delete a product by id
    Delete {
        /// Product id
        id: i32,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print stored carts with their totals
    Show {
        /// Cart store file
        #[arg(short, long, default_value = "data/carts.json")]
        store: PathBuf,

        /// Only show the cart with this token
        #[arg(short, long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Products { action } => match action {
            ProductsAction::List { search, category } => {
                commands::products::list(search.as_deref(), category.as_deref()).await?;
            }
            ProductsAction::Import { file } => {
                commands::products::import(&file).await?;
            }
            ProductsAction::Delete { id } => commands::products::delete(id).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show { store, token } => {
                commands::cart::show(&store, token.as_deref()).await?;
            }
        },
    }
    Ok(())
}
