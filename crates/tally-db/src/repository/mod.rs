//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Inside an atomic scope (engine writes)                                │
//! │       SaleRepository::update_with(&mut tx, &current, &payload)         │
//! │       ProductRepository::apply_stock_delta(&mut tx, id, -3, false)     │
//! │       LedgerRepository::append(&mut tx, &entry)                        │
//! │       → associated functions taking &mut SqliteConnection              │
//! │                                                                         │
//! │  Outside any scope (reads, seeding, outbox workers)                    │
//! │       db.sales().get_with_items(id)                                    │
//! │       db.ledger().for_product(id, 50)                                  │
//! │       → methods on a repository holding the pool                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Products and the stock column
//! - [`catalog::CatalogRepository`] - Services and item classification
//! - [`sale::SaleRepository`] - Sales and sale items
//! - [`purchase::PurchaseRepository`] - Purchases and purchase items
//! - [`ledger::LedgerRepository`] - Append-only stock ledger
//! - [`financial::FinancialOutboxRepository`] - Financial adjustment queue

pub mod catalog;
pub mod financial;
pub mod items;
pub mod ledger;
pub mod product;
pub mod purchase;
pub mod sale;

use chrono::Utc;
use uuid::Uuid;

/// Generates a human-readable document number.
///
/// Format: `{PREFIX}-YYYYMMDD-{DD}-{XXXXXXXX}` where `DD` is the last two
/// characters of the device id and `X` is random hex.
pub(crate) fn document_number(prefix: &str, device_id: &str) -> String {
    let date_part = Utc::now().format("%Y%m%d");

    let chars: Vec<char> = device_id.chars().collect();
    let device_code: String = if chars.len() < 2 {
        "00".to_string()
    } else {
        chars[chars.len() - 2..].iter().collect()
    };

    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();

    format!("{}-{}-{}-{}", prefix, date_part, device_code, suffix.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_number_format() {
        let number = document_number("INV", "till-07");
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts[0], "INV");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2], "07");
        assert_eq!(parts[3].len(), 8);

        assert!(document_number("PO", "x").contains("-00-"));
        assert_ne!(document_number("INV", "d1"), document_number("INV", "d1"));
    }
}
