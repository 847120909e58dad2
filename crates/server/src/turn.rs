//! HTTP turn surface. A telephony provider (or the dashboard's test
//! console) posts each transcribed utterance here and speaks the reply.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use tably_agent::{TurnRequest, VoiceRuntime};

#[derive(Clone, Debug, Deserialize)]
pub struct TurnBody {
    pub call_id: String,
    #[serde(default)]
    pub utterance: String,
    #[serde(default)]
    pub caller_phone: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TurnReply {
    pub say: String,
    pub end_call: bool,
}

pub fn router(runtime: Arc<VoiceRuntime>) -> Router {
    Router::new().route("/call/turn", post(handle_turn)).with_state(runtime)
}

pub async fn handle_turn(
    State(runtime): State<Arc<VoiceRuntime>>,
    Json(body): Json<TurnBody>,
) -> Json<TurnReply> {
    let response = runtime
        .process_turn(TurnRequest {
            call_id: body.call_id,
            utterance: body.utterance,
            caller_phone: body.caller_phone,
        })
        .await;
    Json(TurnReply { say: response.say, end_call: response.end_call })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, Json};

    use tably_core::config::{ConfigOverrides, LlmProvider, LoadOptions};
    use tably_db::fixtures::seed_demo_menu;
    use tably_db::repositories::SqlMenuRepository;

    use crate::bootstrap::bootstrap;

    use super::{handle_turn, TurnBody};

    #[tokio::test]
    async fn posting_a_turn_returns_the_spoken_reply() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                llm_provider: Some(LlmProvider::Heuristic),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap");
        seed_demo_menu(&SqlMenuRepository::new(app.db_pool.clone())).await.expect("seed");

        let Json(reply) = handle_turn(
            State(Arc::clone(&app.runtime)),
            Json(TurnBody {
                call_id: "CA-http-1".to_string(),
                utterance: "I want two burgers".to_string(),
                caller_phone: None,
            }),
        )
        .await;

        assert_eq!(reply.say, "Got it, 2 Burger. Anything else?");
        assert!(!reply.end_call);
    }
}
