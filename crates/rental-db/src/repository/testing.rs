//! Fixtures shared by the repository tests.

use chrono::NaiveDate;
use rental_core::input::{NewCategory, NewItem, NewLoan, NewReport, NewUnit, NewUser};
use rental_core::{Item, ItemUnit, Loan, UnitStatus, User, UserRole};
use uuid::Uuid;

use crate::{Database, DbConfig};

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

pub(crate) async fn db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Creates an item (in a fresh category) with `quantity` in stock.
pub(crate) async fn item(db: &Database, quantity: i64) -> Item {
    let category = db
        .categories()
        .create(&NewCategory {
            name: format!("Category {}", suffix()),
            description: None,
        })
        .await
        .unwrap();

    db.items()
        .create(&NewItem {
            category_id: category.id,
            name: format!("Tripod {}", suffix()),
            description: None,
            quantity,
        })
        .await
        .unwrap()
}

pub(crate) async fn reload(db: &Database, item_id: &str) -> Item {
    db.items().get_by_id(item_id).await.unwrap().unwrap()
}

pub(crate) async fn unit(db: &Database, item_id: &str, code: &str) -> ItemUnit {
    db.units()
        .create(
            item_id,
            &NewUnit {
                unit_code: code.to_string(),
                notes: None,
            },
        )
        .await
        .unwrap()
}

pub(crate) async fn unit_status(db: &Database, unit_id: &str) -> UnitStatus {
    db.units().get_by_id(unit_id).await.unwrap().unwrap().status
}

pub(crate) async fn user(db: &Database, role: UserRole) -> User {
    db.users()
        .create(&NewUser {
            name: format!("{role:?} {}", suffix()),
            email: format!("{}@rental.test", suffix()),
            phone: None,
            role,
            password: "correct horse battery".to_string(),
        })
        .await
        .unwrap()
}

pub(crate) fn new_loan(item_id: &str) -> NewLoan {
    NewLoan {
        renter_name: "Dewi Lestari".to_string(),
        renter_phone: "+62 812 5555 0101".to_string(),
        item_id: item_id.to_string(),
        item_unit_id: None,
        rental_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        return_deadline: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
        notes: None,
    }
}

pub(crate) async fn loan_unit(db: &Database, item_id: &str, unit_id: &str) -> Loan {
    db.loans()
        .create(&NewLoan {
            item_unit_id: Some(unit_id.to_string()),
            ..new_loan(item_id)
        })
        .await
        .unwrap()
}

pub(crate) fn new_report(item_id: &str, reporter_id: &str) -> NewReport {
    NewReport {
        item_id: item_id.to_string(),
        item_unit_id: None,
        reporter_id: reporter_id.to_string(),
        description: "Cracked leg clamp".to_string(),
        proof_image_path: Some("uploads/reports/clamp.jpg".to_string()),
    }
}
