use serde::{Deserialize, Serialize};

/// Closed set of caller intents produced by the classifier adapter.
///
/// The dialogue engine matches exhaustively on this enum, so adding a
/// variant forces every dispatch site to handle it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    MenuInquiry,
    CategoryInquiry,
    ItemInquiry,
    OrderItem,
    ProvideInfo,
    ConfirmOrder,
    GeneralQuestion,
    OrderStatus,
    AngryComplaint,
}

impl Intent {
    pub const ALL: [Intent; 9] = [
        Intent::MenuInquiry,
        Intent::CategoryInquiry,
        Intent::ItemInquiry,
        Intent::OrderItem,
        Intent::ProvideInfo,
        Intent::ConfirmOrder,
        Intent::GeneralQuestion,
        Intent::OrderStatus,
        Intent::AngryComplaint,
    ];

    pub fn as_label(&self) -> &'static str {
        match self {
            Intent::MenuInquiry => "menu_inquiry",
            Intent::CategoryInquiry => "category_inquiry",
            Intent::ItemInquiry => "item_inquiry",
            Intent::OrderItem => "order_item",
            Intent::ProvideInfo => "provide_info",
            Intent::ConfirmOrder => "confirm_order",
            Intent::GeneralQuestion => "general_question",
            Intent::OrderStatus => "order_status",
            Intent::AngryComplaint => "angry_complaint",
        }
    }

    pub fn parse_label(label: &str) -> Option<Intent> {
        Intent::ALL.iter().copied().find(|intent| intent.as_label() == label.trim())
    }

    /// Classifier failures must still yield a valid label.
    pub fn from_label_or_default(label: &str) -> Intent {
        Intent::parse_label(label).unwrap_or(Intent::GeneralQuestion)
    }
}
