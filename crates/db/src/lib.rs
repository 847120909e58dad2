pub mod catalog;
pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use catalog::MenuCatalogCache;
pub use connection::{connect, connect_with_settings, DbPool, PoolSettings};
pub use repositories::{
    ConversationRepository, MenuRepository, OrderRepository, RepositoryError, TranscriptTurn,
};
