//! # Seed Data Generator
//!
//! Populates a development database with categories, items, units and a
//! few staff accounts.
//!
//! ## Usage
//! ```bash
//! cargo run -p rental-db --bin seed
//!
//! # Specify database path
//! cargo run -p rental-db --bin seed -- --db ./data/rental.db
//! ```
//!
//! Every seeded account has the password `rental-dev-password`.

use std::env;

use rental_core::input::{NewCategory, NewItem, NewUnit, NewUser};
use rental_core::UserRole;
use rental_db::{Database, DbConfig};

/// (category, [(item name, quantity, unit code prefix)])
const CATALOG: &[(&str, &[(&str, i64, &str)])] = &[
    (
        "Cameras",
        &[
            ("Sony A7 III", 4, "A7"),
            ("Canon EOS R6", 3, "R6"),
            ("Fujifilm X-T4", 2, "XT4"),
        ],
    ),
    (
        "Lenses",
        &[
            ("Sigma 24-70mm f/2.8", 3, "SIG2470"),
            ("Sony 85mm f/1.8", 2, "SON85"),
        ],
    ),
    (
        "Audio",
        &[
            ("Rode VideoMic Pro", 5, "RVM"),
            ("Zoom H6 Recorder", 2, "H6"),
            ("Sennheiser EW 112P", 3, "EW112"),
        ],
    ),
    (
        "Lighting",
        &[
            ("Aputure 300d II", 2, "AP300"),
            ("Godox SL-60W", 4, "SL60"),
        ],
    ),
    (
        "Support",
        &[
            ("Manfrotto 055 Tripod", 6, "MF055"),
            ("DJI RS 3 Gimbal", 2, "RS3"),
        ],
    ),
];

const STAFF: &[(&str, &str, UserRole)] = &[
    ("Admin", "admin@rental.test", UserRole::Admin),
    ("Front Desk", "desk@rental.test", UserRole::Staff),
    ("Workshop", "workshop@rental.test", UserRole::Technician),
];

const DEV_PASSWORD: &str = "rental-dev-password";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./rental_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Rental Desk Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./rental_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Rental Desk Seed Data Generator");
    println!("==================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.categories().list().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} categories", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut items = 0;
    let mut units = 0;

    for (category_name, catalog) in CATALOG {
        let category = db
            .categories()
            .create(&NewCategory {
                name: category_name.to_string(),
                description: None,
            })
            .await?;

        for (name, quantity, prefix) in catalog.iter() {
            let item = db
                .items()
                .create(&NewItem {
                    category_id: category.id.clone(),
                    name: name.to_string(),
                    description: None,
                    quantity: *quantity,
                })
                .await?;
            items += 1;

            for n in 1..=*quantity {
                let input = NewUnit {
                    unit_code: format!("{}-{:03}", prefix, n),
                    notes: None,
                };
                if let Err(e) = db.units().create(&item.id, &input).await {
                    eprintln!("Failed to insert unit {}: {}", input.unit_code, e);
                    continue;
                }
                units += 1;
            }
        }
    }

    println!("✓ Seeded {} categories, {} items, {} units", CATALOG.len(), items, units);

    for (name, email, role) in STAFF {
        db.users()
            .create(&NewUser {
                name: name.to_string(),
                email: email.to_string(),
                phone: None,
                role: *role,
                password: DEV_PASSWORD.to_string(),
            })
            .await?;
    }

    println!("✓ Seeded {} staff accounts (password: {})", STAFF.len(), DEV_PASSWORD);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
