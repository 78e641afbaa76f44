//! # Seed Data Generator
//!
//! Populates the database with a demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default) plus the service list
//! cargo run -p tally-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tally-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! Each product has a unique SKU `{CATEGORY}-{ABC}-{NNN}`, a price between
//! 1.99 and 9.99 plus a size addon, a cost basis of 60-80% of the price and
//! an opening stock of 0-100. Opening stock is catalog data, not a ledger
//! movement.

use std::env;
use tally_core::{Product, Service};
use tally_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Product categories for realistic demo data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "BEV",
        &[
            "Coca-Cola",
            "Pepsi",
            "Sprite",
            "Mineral Water",
            "Orange Juice",
            "Mango Juice",
            "Iced Tea",
            "Green Tea",
        ],
    ),
    (
        "SNK",
        &["Potato Chips", "Nimko Mix", "Chocolate Bar", "Biscuits", "Cookies", "Peanuts"],
    ),
    (
        "DRY",
        &["Whole Milk", "Yogurt", "Butter", "Cheddar Cheese", "Cream", "Eggs Dozen"],
    ),
    (
        "GRC",
        &["Basmati Rice", "Wheat Flour", "Lentils", "Cooking Oil", "Sugar", "Tea Leaves", "Salt"],
    ),
    (
        "HOM",
        &["Dish Soap", "Laundry Powder", "Tissue Roll", "Hand Wash", "Floor Cleaner"],
    ),
];

/// Size variants with their price addon in cents
const SIZES: &[(&str, i64)] = &[("Small", 0), ("Regular", 100), ("Large", 250), ("Family", 500)];

/// Inventory-inert line items
const SERVICES: &[(&str, i64)] = &[
    ("Home Delivery", 300),
    ("Gift Wrapping", 150),
    ("Bulk Packing", 500),
    ("Installation", 2500),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, count, "Seeding demo catalog");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut seed = 0usize;

    'outer: for (category_code, names) in CATEGORIES {
        for name in names.iter() {
            for (size_name, price_addon) in SIZES {
                if generated >= count {
                    break 'outer;
                }

                let product = generate_product(category_code, name, size_name, *price_addon, seed);
                seed += 1;

                if let Err(e) = db.products().insert(&product).await {
                    warn!(sku = %product.sku, error = %e, "Failed to insert product");
                    continue;
                }
                generated += 1;
            }
        }
    }

    for (name, price_cents) in SERVICES {
        db.catalog().insert_service(&Service::new(*name, *price_cents)).await?;
    }

    info!(
        products = generated,
        services = SERVICES.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Seed complete"
    );

    Ok(())
}

/// Generates a single product with deterministic demo data.
fn generate_product(category: &str, name: &str, size: &str, price_addon: i64, seed: usize) -> Product {
    let prefix: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    let sku = format!("{}-{}-{:03}", category, prefix, seed);

    // base 1.99 - 9.99, plus size addon
    let price_cents = 199 + ((seed * 17) % 800) as i64 + price_addon;

    // 60-80% of price
    let cost_cents = price_cents * (60 + (seed % 20) as i64) / 100;

    let stock = (seed % 101) as i64;

    Product::new(sku, format!("{} {}", name, size), price_cents, cost_cents, stock)
}
