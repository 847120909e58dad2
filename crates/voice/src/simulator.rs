//! Scripted call playback against a live turn handler. Used by the
//! `smoke` command and the integration tests; no audio or telephony
//! involved, just the turn loop.

use std::sync::Arc;

use tably_agent::TurnRequest;

use crate::TurnHandler;

#[derive(Clone, Debug)]
pub struct ScriptedExchange {
    pub caller: String,
    pub assistant: String,
    pub ended: bool,
}

pub struct CallSimulator {
    handler: Arc<dyn TurnHandler>,
}

impl CallSimulator {
    pub fn new(handler: Arc<dyn TurnHandler>) -> Self {
        Self { handler }
    }

    /// Plays a call: a blank pickup turn first, then each scripted
    /// utterance in order. Playback stops as soon as the handler ends
    /// the call, so trailing script lines go unspoken.
    pub async fn run_call(
        &self,
        call_id: &str,
        caller_phone: Option<&str>,
        script: &[&str],
    ) -> Vec<ScriptedExchange> {
        let mut exchanges = Vec::with_capacity(script.len() + 1);

        let pickup = self.turn(call_id, caller_phone, "").await;
        let ended = pickup.ended;
        exchanges.push(pickup);
        if ended {
            return exchanges;
        }

        for utterance in script {
            let exchange = self.turn(call_id, caller_phone, utterance).await;
            let ended = exchange.ended;
            exchanges.push(exchange);
            if ended {
                break;
            }
        }

        exchanges
    }

    async fn turn(
        &self,
        call_id: &str,
        caller_phone: Option<&str>,
        utterance: &str,
    ) -> ScriptedExchange {
        let response = self
            .handler
            .handle_turn(TurnRequest {
                call_id: call_id.to_string(),
                utterance: utterance.to_string(),
                caller_phone: caller_phone.map(str::to_string),
            })
            .await;
        tracing::debug!(call_id, caller = utterance, assistant = %response.say, "simulated turn");
        ScriptedExchange {
            caller: utterance.to_string(),
            assistant: response.say,
            ended: response.end_call,
        }
    }
}
