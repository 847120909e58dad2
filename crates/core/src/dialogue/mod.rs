pub mod engine;
pub mod prompts;

pub use engine::{DialogueEngine, TurnEffect, TurnInput, TurnOutcome};
