//! Call orchestration for the ordering assistant: turn classification,
//! customer-info extraction, the per-call session store, and the commit
//! coordinator, tied together by the voice runtime.

pub mod classifier;
pub mod commit;
pub mod extractor;
pub mod llm;
pub mod runtime;
pub mod session;

pub use classifier::{HeuristicIntentClassifier, IntentClassifier, LlmIntentClassifier};
pub use commit::{CommitCoordinator, CommitError};
pub use extractor::{
    CustomerInfoExtractor, HeuristicCustomerInfoExtractor, LlmCustomerInfoExtractor,
};
pub use llm::{client_from_config, LlmClient, OpenAiCompatibleClient};
pub use runtime::{RuntimeServices, TurnRequest, TurnResponse, VoiceRuntime};
pub use session::{SessionHandle, SessionStore};
