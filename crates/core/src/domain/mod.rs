pub mod intent;
pub mod menu;
pub mod order;
pub mod session;
