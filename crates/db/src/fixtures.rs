use rust_decimal::Decimal;

use tably_core::domain::menu::MenuItem;

use crate::repositories::{MenuRepository, RepositoryError};

struct SeedItem {
    id: &'static str,
    name: &'static str,
    category: &'static str,
    price_cents: i64,
}

/// Deterministic demo menu used by `seed`, `smoke`, and the tests.
const SEED_MENU: &[SeedItem] = &[
    SeedItem { id: "item-samosa", name: "Vegetable Samosa", category: "Appetizers", price_cents: 499 },
    SeedItem { id: "item-paneer-tikka", name: "Paneer Tikka", category: "Appetizers", price_cents: 799 },
    SeedItem { id: "item-burger", name: "Burger", category: "Main Course", price_cents: 500 },
    SeedItem { id: "item-butter-chicken", name: "Butter Chicken", category: "Main Course", price_cents: 1399 },
    SeedItem { id: "item-biryani", name: "Chicken Biryani", category: "Main Course", price_cents: 1299 },
    SeedItem { id: "item-dal-makhani", name: "Dal Makhani", category: "Main Course", price_cents: 1099 },
    SeedItem { id: "item-palak-paneer", name: "Palak Paneer", category: "Main Course", price_cents: 1199 },
    SeedItem { id: "item-tandoori", name: "Tandoori Chicken", category: "Main Course", price_cents: 1499 },
    SeedItem { id: "item-naan", name: "Garlic Naan", category: "Breads", price_cents: 349 },
    SeedItem { id: "item-lemonade", name: "Lemonade", category: "Beverages", price_cents: 299 },
    SeedItem { id: "item-lassi", name: "Mango Lassi", category: "Beverages", price_cents: 449 },
    SeedItem { id: "item-gulab-jamun", name: "Gulab Jamun", category: "Desserts", price_cents: 549 },
];

pub fn demo_menu() -> Vec<MenuItem> {
    SEED_MENU
        .iter()
        .map(|seed| MenuItem::new(seed.id, seed.name, seed.category, Decimal::new(seed.price_cents, 2)))
        .collect()
}

/// Upserts the demo menu; safe to run repeatedly.
pub async fn seed_demo_menu<R>(repository: &R) -> Result<usize, RepositoryError>
where
    R: MenuRepository + ?Sized,
{
    let items = demo_menu();
    let count = items.len();
    for item in items {
        repository.save(item).await?;
    }
    Ok(count)
}
