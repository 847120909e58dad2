//! Telephony-facing seam. A provider integration only needs to turn
//! its webhook or media stream into [`TurnRequest`]s and speak the
//! [`TurnResponse`] back; everything else lives behind [`TurnHandler`].

pub mod simulator;

use async_trait::async_trait;

use tably_agent::{TurnRequest, TurnResponse, VoiceRuntime};

pub use simulator::{CallSimulator, ScriptedExchange};

#[async_trait]
pub trait TurnHandler: Send + Sync {
    async fn handle_turn(&self, request: TurnRequest) -> TurnResponse;
}

#[async_trait]
impl TurnHandler for VoiceRuntime {
    async fn handle_turn(&self, request: TurnRequest) -> TurnResponse {
        self.process_turn(request).await
    }
}
