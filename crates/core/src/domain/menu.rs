use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MenuItemId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub available: bool,
}

impl MenuItem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        price: Decimal,
    ) -> Self {
        Self {
            id: MenuItemId(id.into()),
            name: name.into(),
            category: category.into(),
            price,
            available: true,
        }
    }
}

/// Distinct categories in first-seen order, for spoken menu overviews.
pub fn categories(items: &[MenuItem]) -> Vec<String> {
    let mut seen = Vec::new();
    for item in items {
        if !seen.contains(&item.category) {
            seen.push(item.category.clone());
        }
    }
    seen
}

/// Items belonging to one category, preserving catalog order.
pub fn items_in_category<'a>(items: &'a [MenuItem], category: &str) -> Vec<&'a MenuItem> {
    items.iter().filter(|item| item.category.eq_ignore_ascii_case(category)).collect()
}
