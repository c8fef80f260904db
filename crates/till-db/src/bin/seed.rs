//! # Seed Data Generator
//!
//! Populates the database with test items for development.
//!
//! ## Usage
//! ```bash
//! # Generate 500 items (default)
//! cargo run -p till-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p till-db --bin seed -- --count 2000
//!
//! # Specify database path
//! cargo run -p till-db --bin seed -- --db ./data/till.db
//! ```
//!
//! Each item has a unique SKU (`{CATEGORY}-{NAME}-{INDEX}`), a price between
//! roughly 0.99 and 12.99, and a stock level between 0 and 100.

use chrono::Utc;
use std::env;
use till_core::{Item, DEFAULT_BUSINESS_ID};
use till_db::{Database, DbConfig};
use uuid::Uuid;

/// Item categories for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "BEV",
        &[
            "Cola", "Lemon Soda", "Orange Soda", "Energy Drink", "Mineral Water",
            "Apple Juice", "Mango Juice", "Iced Tea", "Cold Coffee", "Milk",
        ],
    ),
    (
        "SNK",
        &[
            "Salted Chips", "Cheese Puffs", "Chocolate Bar", "Wafer Biscuits",
            "Cookies", "Peanuts", "Popcorn", "Gummy Candy", "Crackers", "Pretzels",
        ],
    ),
    (
        "GRO",
        &[
            "White Bread", "Eggs Dozen", "Rice 1kg", "Flour 1kg", "Sugar 1kg",
            "Cooking Oil", "Tea Bags", "Canned Beans", "Pasta", "Salt",
        ],
    ),
];

/// Size variants with a price addon in cents
const SIZES: &[(&str, i64)] = &[
    ("Small", 0),
    ("Regular", 50),
    ("Large", 120),
    ("Family Pack", 300),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut db_path = String::from("./till_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(500);
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
                println!("Till Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of items to generate (default: 500)");
                println!("  -d, --db <PATH>    Database file path (default: ./till_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Till Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!("Items: {}", count);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing items
    let existing = db.items().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating items...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (category_idx, (category_code, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size_name, price_addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let item = generate_item(
                    category_code,
                    name,
                    size_name,
                    *price_addon,
                    category_idx * 1000 + name_idx * 10 + size_idx,
                );

                if let Err(e) = db.items().insert(&item).await {
                    eprintln!("Failed to insert {}: {}", item.sku, e);
                    continue;
                }

                generated += 1;

                if generated % 100 == 0 {
                    println!("  Generated {} items...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} items in {:?}", generated, elapsed);

    // Verify search works over the seeded catalog
    println!();
    println!("Verifying catalog search...");
    let search_results = db.items().search("cola", 10).await?;
    println!("  Search 'cola': {} results", search_results.len());

    let search_results = db.items().search("BEV", 10).await?;
    println!("  Search 'BEV': {} results", search_results.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single item with predictable pseudo-random data.
fn generate_item(category: &str, name: &str, size: &str, price_addon: i64, seed: usize) -> Item {
    let now = Utc::now();

    let compact: String = name.chars().filter(|c| c.is_alphanumeric()).collect();
    let prefix: String = compact.to_uppercase().chars().take(4).collect();
    let sku = format!("{}-{}-{:03}", category, prefix, seed);

    // Base price 0.99 - 8.99, plus the size addon
    let price_cents = 99 + ((seed * 17) % 800) as i64 + price_addon;

    let quantity = (seed % 101) as i64;

    Item {
        id: Uuid::new_v4().to_string(),
        business_id: DEFAULT_BUSINESS_ID.to_string(),
        sku,
        name: format!("{} {}", name, size),
        price_cents,
        quantity,
        image_url: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
