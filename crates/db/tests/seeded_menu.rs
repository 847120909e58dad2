//! End-to-end checks of the demo seed against a real SQLite database:
//! migrate, seed, and read back through the repository layer.

use rust_decimal::Decimal;

use tably_core::domain::menu::{self, MenuItemId};
use tably_db::fixtures::{demo_menu, seed_demo_menu};
use tably_db::repositories::{MenuRepository, SqlMenuRepository};
use tably_db::{connect, migrations};

async fn seeded_repo() -> SqlMenuRepository {
    let pool = connect("sqlite::memory:?cache=shared").await.expect("pool");
    migrations::run_pending(&pool).await.expect("migrations");
    let repo = SqlMenuRepository::new(pool);
    seed_demo_menu(&repo).await.expect("seed");
    repo
}

#[tokio::test]
async fn seed_round_trips_every_demo_item() {
    let repo = seeded_repo().await;
    let expected = demo_menu();

    let listed = repo.list_available().await.expect("list");
    assert_eq!(listed.len(), expected.len());

    for item in &expected {
        let found = repo
            .find_by_id(&item.id)
            .await
            .expect("lookup")
            .unwrap_or_else(|| panic!("seeded item {} should exist", item.id.0));
        assert_eq!(found.name, item.name);
        assert_eq!(found.category, item.category);
        assert_eq!(found.price, item.price);
        assert!(found.available);
    }
}

#[tokio::test]
async fn seed_is_idempotent_and_preserves_operator_edits() {
    let repo = seeded_repo().await;
    let baseline = repo.list_available().await.expect("list").len();

    let burger = MenuItemId("item-burger".to_string());
    repo.set_availability(&burger, false).await.expect("toggle");
    assert_eq!(repo.list_available().await.expect("list").len(), baseline - 1);

    // Re-seeding upserts the canonical rows, which restores availability
    // without duplicating anything.
    seed_demo_menu(&repo).await.expect("reseed");
    let listed = repo.list_available().await.expect("list");
    assert_eq!(listed.len(), baseline);
    assert!(listed.iter().any(|item| item.id == burger));
}

#[tokio::test]
async fn seeded_listing_is_ordered_and_spans_the_spoken_categories() {
    let repo = seeded_repo().await;
    let listed = repo.list_available().await.expect("list");

    let keys: Vec<(&str, &str)> =
        listed.iter().map(|item| (item.category.as_str(), item.name.as_str())).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted, "listing should be ordered by category then name");

    let categories = menu::categories(&listed);
    for expected in ["Appetizers", "Main Course", "Breads", "Beverages", "Desserts"] {
        assert!(categories.iter().any(|category| category == expected));
    }

    let lemonade = listed
        .iter()
        .find(|item| item.id.0 == "item-lemonade")
        .expect("lemonade is part of the demo menu");
    assert_eq!(lemonade.price, Decimal::new(299, 2));
}
