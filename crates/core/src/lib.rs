//! Domain core for the Tably phone-ordering assistant: the per-call
//! session state machine, the fuzzy menu resolver, the quantity and
//! correction grammar, and commit-time cart validation. Everything in
//! this crate is pure and synchronous; adapters and persistence live in
//! the surrounding crates.

pub mod audit;
pub mod commit;
pub mod config;
pub mod dialogue;
pub mod domain;
pub mod errors;
pub mod parser;
pub mod resolver;

pub use commit::{generate_order_id, validate_cart, CommitValidationError, ValidatedCart};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use dialogue::{DialogueEngine, TurnEffect, TurnInput, TurnOutcome};
pub use domain::intent::Intent;
pub use domain::menu::{MenuItem, MenuItemId};
pub use domain::order::{Order, OrderId, OrderLine, OrderStatus};
pub use domain::session::{CallId, CartLine, CustomerInfo, PendingOffer, Session, SessionStatus};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use resolver::{MenuResolver, Resolution, ResolutionAction, ResolverThresholds};
