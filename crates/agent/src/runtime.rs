//! Per-turn orchestration: classify, extract, dispatch, then run
//! whatever side work the engine requested. Everything that can fail
//! off-path degrades to a spoken reply; a caller turn never surfaces an
//! error object.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;

use tably_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use tably_core::commit::CommitValidationError;
use tably_core::dialogue::prompts;
use tably_core::domain::intent::Intent;
use tably_core::domain::order::OrderId;
use tably_core::domain::session::{CallId, Session, SessionStatus, TurnRole};
use tably_core::{DialogueEngine, TurnEffect, TurnInput};
use tably_db::catalog::MenuCatalogCache;
use tably_db::repositories::{
    ConversationRepository, MenuRepository, OrderRepository, TranscriptTurn,
};

use crate::classifier::IntentClassifier;
use crate::commit::{CommitCoordinator, CommitError};
use crate::extractor::CustomerInfoExtractor;
use crate::session::SessionStore;

const ACTOR: &str = "voice-runtime";

/// One inbound caller turn as the telephony layer hands it over. An
/// empty utterance marks call pickup or an unintelligible stretch.
#[derive(Clone, Debug)]
pub struct TurnRequest {
    pub call_id: String,
    pub utterance: String,
    pub caller_phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnResponse {
    pub say: String,
    pub end_call: bool,
}

/// External collaborators the runtime is wired with at bootstrap.
pub struct RuntimeServices {
    pub classifier: Arc<dyn IntentClassifier>,
    pub extractor: Arc<dyn CustomerInfoExtractor>,
    pub menu: Arc<dyn MenuRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub audit: Arc<dyn AuditSink>,
}

enum TranscriptCommand {
    Start { call_id: CallId, caller_phone: Option<String> },
    Turn(TranscriptTurn),
    End { call_id: CallId, order_id: Option<OrderId> },
}

pub struct VoiceRuntime {
    engine: DialogueEngine,
    classifier: Arc<dyn IntentClassifier>,
    extractor: Arc<dyn CustomerInfoExtractor>,
    sessions: Arc<SessionStore>,
    catalog: Arc<MenuCatalogCache>,
    commit: CommitCoordinator,
    orders: Arc<dyn OrderRepository>,
    audit: Arc<dyn AuditSink>,
    transcripts: mpsc::UnboundedSender<TranscriptCommand>,
    turn_seq: AtomicU64,
}

impl VoiceRuntime {
    /// Wires the runtime and spawns the transcript writer. Transcript
    /// persistence runs off the response path; a slow or failing store
    /// never delays what the caller hears.
    pub fn new(engine: DialogueEngine, services: RuntimeServices, catalog_ttl: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_transcripts(rx, services.conversations));

        Self {
            engine,
            classifier: services.classifier,
            extractor: services.extractor,
            sessions: Arc::new(SessionStore::default()),
            catalog: Arc::new(MenuCatalogCache::new(services.menu.clone(), catalog_ttl)),
            commit: CommitCoordinator::new(services.menu, services.orders.clone()),
            orders: services.orders,
            audit: services.audit,
            transcripts: tx,
            turn_seq: AtomicU64::new(0),
        }
    }

    pub fn sessions(&self) -> Arc<SessionStore> {
        self.sessions.clone()
    }

    pub fn catalog(&self) -> Arc<MenuCatalogCache> {
        self.catalog.clone()
    }

    pub async fn process_turn(&self, request: TurnRequest) -> TurnResponse {
        let call_id = CallId(request.call_id.clone());
        let correlation =
            format!("{}-turn-{}", call_id.0, self.turn_seq.fetch_add(1, Ordering::Relaxed));

        let (handle, created) =
            self.sessions.acquire(&call_id, request.caller_phone.as_deref()).await;
        if created {
            let _ = self.transcripts.send(TranscriptCommand::Start {
                call_id: call_id.clone(),
                caller_phone: request.caller_phone.clone(),
            });
            self.audit.emit(AuditEvent::new(
                Some(call_id.clone()),
                None,
                correlation.clone(),
                "call.started",
                AuditCategory::Ingress,
                ACTOR,
                AuditOutcome::Success,
            ));
        }

        let utterance = request.utterance.trim();
        if utterance.is_empty() {
            let mut session = handle.lock().await;
            let reply = if session.turns.is_empty() {
                self.engine.greeting()
            } else {
                prompts::did_not_catch()
            };
            let reply = prompts::vary(reply, session.last_reply.as_deref());
            session.record_assistant_turn(reply.clone());
            self.send_turn(&call_id, TurnRole::Assistant, &reply, None);
            return TurnResponse { say: reply, end_call: false };
        }

        let mut intent = match self.classifier.classify(utterance).await {
            Ok(intent) => intent,
            Err(error) => {
                tracing::warn!(call_id = %call_id.0, %error, "intent classification failed");
                Intent::GeneralQuestion
            }
        };

        // While collecting contact details, an unrecognized turn is far
        // more likely a spoken name than small talk.
        {
            let session = handle.lock().await;
            if session.status == SessionStatus::CollectingInfo
                && intent == Intent::GeneralQuestion
            {
                intent = Intent::ProvideInfo;
            }
        }

        let extracted = if intent == Intent::ProvideInfo {
            match self.extractor.extract(utterance).await {
                Ok(info) => Some(info),
                Err(error) => {
                    tracing::warn!(call_id = %call_id.0, %error, "customer info extraction failed");
                    None
                }
            }
        } else {
            None
        };

        let catalog = self.catalog.items().await;
        let mut session = handle.lock().await;
        session.record_caller_turn(utterance, Some(intent));
        self.send_turn(&call_id, TurnRole::Caller, utterance, Some(intent));

        let outcome =
            self.engine.dispatch(&mut session, TurnInput { intent, utterance, extracted }, &catalog);
        tracing::info!(
            call_id = %call_id.0,
            intent = intent.as_label(),
            status = ?session.status,
            "turn dispatched"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(call_id.clone()),
                None,
                correlation.clone(),
                "dialogue.turn",
                AuditCategory::Dialogue,
                ACTOR,
                AuditOutcome::Success,
            )
            .with_metadata("intent", intent.as_label()),
        );

        let mut say = outcome.reply;
        let mut end_call = false;

        match outcome.effect {
            TurnEffect::None => {}
            TurnEffect::RequestCommit => {
                (say, end_call) =
                    self.run_commit(&mut session, &call_id, &correlation).await;
            }
            TurnEffect::LookupOrderStatus => {
                if let Some(found) = self.lookup_order_status(utterance).await {
                    say = found;
                }
            }
        }

        let say = prompts::vary(say, session.last_reply.as_deref());
        session.record_assistant_turn(say.clone());
        self.send_turn(&call_id, TurnRole::Assistant, &say, None);
        drop(session);

        if end_call {
            self.sessions.remove(&call_id).await;
        }

        TurnResponse { say, end_call }
    }

    /// Evicts sessions idle past the window, closing their transcripts.
    pub async fn evict_idle(&self, idle_window: chrono::Duration) -> usize {
        let evicted = self.sessions.evict_idle(Utc::now(), idle_window).await;
        for call_id in &evicted {
            let _ = self
                .transcripts
                .send(TranscriptCommand::End { call_id: call_id.clone(), order_id: None });
            self.audit.emit(AuditEvent::new(
                Some(call_id.clone()),
                None,
                format!("{}-evicted", call_id.0),
                "call.evicted",
                AuditCategory::System,
                ACTOR,
                AuditOutcome::Success,
            ));
        }
        evicted.len()
    }

    async fn run_commit(
        &self,
        session: &mut Session,
        call_id: &CallId,
        correlation: &str,
    ) -> (String, bool) {
        match self.commit.commit(session).await {
            Ok(order) => {
                self.audit.emit(
                    AuditEvent::new(
                        Some(call_id.clone()),
                        Some(order.id.0.clone()),
                        correlation,
                        "commit.order_created",
                        AuditCategory::Commit,
                        ACTOR,
                        AuditOutcome::Success,
                    )
                    .with_metadata("total", order.total.to_string())
                    .with_metadata("line_count", order.lines.len().to_string()),
                );
                let _ = self.transcripts.send(TranscriptCommand::End {
                    call_id: call_id.clone(),
                    order_id: Some(order.id.clone()),
                });
                (prompts::order_placed(&order), true)
            }
            Err(CommitError::Validation(CommitValidationError::EmptyCart)) => {
                session.reopen_for_items();
                self.emit_commit_failure(call_id, correlation, AuditOutcome::Rejected, "empty cart");
                (prompts::what_would_you_like(), false)
            }
            Err(CommitError::Validation(CommitValidationError::UnavailableItems(names))) => {
                session.reopen_for_items();
                self.emit_commit_failure(
                    call_id,
                    correlation,
                    AuditOutcome::Rejected,
                    &names.join(", "),
                );
                (prompts::unavailable_items(&names), false)
            }
            Err(CommitError::Store(error)) => {
                // The session stays in PLACING_ORDER; another confirm
                // retries the commit.
                tracing::error!(call_id = %call_id.0, %error, "order store failure during commit");
                self.emit_commit_failure(call_id, correlation, AuditOutcome::Failed, "store");
                (prompts::store_trouble(), false)
            }
        }
    }

    fn emit_commit_failure(
        &self,
        call_id: &CallId,
        correlation: &str,
        outcome: AuditOutcome,
        reason: &str,
    ) {
        self.audit.emit(
            AuditEvent::new(
                Some(call_id.clone()),
                None,
                correlation,
                "commit.failed",
                AuditCategory::Commit,
                ACTOR,
                outcome,
            )
            .with_metadata("reason", reason),
        );
    }

    async fn lookup_order_status(&self, utterance: &str) -> Option<String> {
        let order_id = extract_order_id(utterance)?;
        match self.orders.find_by_id(&order_id).await {
            Ok(Some(order)) => Some(prompts::order_status_found(&order)),
            Ok(None) => Some(prompts::order_status_not_found()),
            Err(error) => {
                tracing::warn!(%error, order_id = %order_id.0, "order status lookup failed");
                Some(prompts::store_trouble())
            }
        }
    }

    fn send_turn(&self, call_id: &CallId, role: TurnRole, text: &str, intent: Option<Intent>) {
        let _ = self.transcripts.send(TranscriptCommand::Turn(TranscriptTurn {
            call_id: call_id.clone(),
            role,
            text: text.to_string(),
            intent,
            occurred_at: Utc::now(),
        }));
    }
}

async fn write_transcripts(
    mut rx: mpsc::UnboundedReceiver<TranscriptCommand>,
    conversations: Arc<dyn ConversationRepository>,
) {
    while let Some(command) = rx.recv().await {
        let result = match command {
            TranscriptCommand::Start { call_id, caller_phone } => {
                conversations.start_conversation(&call_id, caller_phone.as_deref()).await
            }
            TranscriptCommand::Turn(turn) => conversations.append_turn(turn).await,
            TranscriptCommand::End { call_id, order_id } => {
                conversations.end_conversation(&call_id, order_id.as_ref()).await
            }
        };
        if let Err(error) = result {
            tracing::warn!(%error, "transcript write failed");
        }
    }
}

/// Finds a spoken or read-back order number in the utterance. Spaces
/// are dropped first so "O R D - 1 2" reads the same as "ORD-12".
fn extract_order_id(utterance: &str) -> Option<OrderId> {
    let condensed: String =
        utterance.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase();
    let start = condensed.find("ORD-")?;
    let id: String = condensed[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let id = id.trim_end_matches('-').to_string();
    if id.len() > "ORD-".len() {
        Some(OrderId(id))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use tably_core::audit::{AuditCategory, InMemoryAuditSink};
    use tably_core::domain::menu::MenuItemId;
    use tably_core::domain::order::{Order, OrderId, OrderLine, OrderStatus};
    use tably_core::domain::session::CallId;
    use tably_core::DialogueEngine;
    use tably_db::fixtures::demo_menu;
    use tably_db::repositories::{
        InMemoryConversationRepository, InMemoryMenuRepository, InMemoryOrderRepository,
        MenuRepository, OrderRepository,
    };

    use crate::classifier::HeuristicIntentClassifier;
    use crate::extractor::HeuristicCustomerInfoExtractor;

    use super::{extract_order_id, RuntimeServices, TurnRequest, VoiceRuntime};

    struct Harness {
        runtime: VoiceRuntime,
        menu: Arc<InMemoryMenuRepository>,
        orders: Arc<InMemoryOrderRepository>,
        conversations: Arc<InMemoryConversationRepository>,
        audit: InMemoryAuditSink,
    }

    async fn harness() -> Harness {
        let menu = Arc::new(InMemoryMenuRepository::with_items(demo_menu()).await);
        let orders = Arc::new(InMemoryOrderRepository::default());
        let conversations = Arc::new(InMemoryConversationRepository::default());
        let audit = InMemoryAuditSink::default();

        let runtime = VoiceRuntime::new(
            DialogueEngine::default(),
            RuntimeServices {
                classifier: Arc::new(HeuristicIntentClassifier),
                extractor: Arc::new(HeuristicCustomerInfoExtractor),
                menu: menu.clone(),
                orders: orders.clone(),
                conversations: conversations.clone(),
                audit: Arc::new(audit.clone()),
            },
            Duration::from_secs(300),
        );

        Harness { runtime, menu, orders, conversations, audit }
    }

    async fn say(harness: &Harness, call_id: &str, utterance: &str) -> super::TurnResponse {
        harness
            .runtime
            .process_turn(TurnRequest {
                call_id: call_id.to_string(),
                utterance: utterance.to_string(),
                caller_phone: None,
            })
            .await
    }

    #[tokio::test]
    async fn a_full_call_places_an_order_and_hangs_up() {
        let harness = harness().await;

        let pickup = say(&harness, "CA-1", "").await;
        assert!(pickup.say.contains("Thanks for calling"));

        let reply = say(&harness, "CA-1", "I want two burgers").await;
        assert_eq!(reply.say, "Got it, 2 Burger. Anything else?");

        let reply = say(&harness, "CA-1", "can I get a lemonade").await;
        assert_eq!(reply.say, "Got it, 1 Lemonade. Anything else?");

        let reply = say(&harness, "CA-1", "No, that's all").await;
        assert!(reply.say.contains("your name"));

        let reply = say(&harness, "CA-1", "My name is John").await;
        assert!(reply.say.contains("John"));
        assert!(reply.say.contains("phone"));

        let reply = say(&harness, "CA-1", "555-123-4567").await;
        assert_eq!(reply.say, "So your order is: 2 Burger, 1 Lemonade. Is that correct?");

        let reply = say(&harness, "CA-1", "Yes").await;
        assert!(reply.say.contains("Your order is placed!"));
        assert!(reply.say.contains("$12.99"));
        assert!(reply.end_call);

        assert_eq!(harness.orders.count().await, 1);
        let placed = &harness.orders.list(None).await.expect("list")[0];
        assert_eq!(placed.customer_name, "John");
        assert_eq!(placed.customer_phone.as_deref(), Some("5551234567"));
        assert_eq!(placed.total, Decimal::new(1299, 2));

        // The session is gone once the order is placed.
        assert!(harness.runtime.sessions().is_empty().await);

        let commits: Vec<_> = harness
            .audit
            .events()
            .into_iter()
            .filter(|event| event.category == AuditCategory::Commit)
            .collect();
        assert_eq!(commits.len(), 1);
        assert!(commits[0].order_id.is_some());
    }

    #[tokio::test]
    async fn a_store_failure_keeps_the_session_alive_for_a_retry() {
        let harness = harness().await;

        say(&harness, "CA-2", "I want two burgers").await;
        say(&harness, "CA-2", "no that's all").await;
        say(&harness, "CA-2", "My name is Ada").await;
        say(&harness, "CA-2", "555-123-4567").await;

        harness.orders.fail_next_create();
        let reply = say(&harness, "CA-2", "yes").await;
        assert!(reply.say.contains("trouble placing the order"));
        assert!(!reply.end_call);
        assert_eq!(harness.orders.count().await, 0);

        let reply = say(&harness, "CA-2", "yes").await;
        assert!(reply.say.contains("Your order is placed!"));
        assert!(reply.end_call);
        assert_eq!(harness.orders.count().await, 1);
    }

    #[tokio::test]
    async fn an_item_gone_unavailable_reopens_the_cart() {
        let harness = harness().await;

        say(&harness, "CA-3", "I want two burgers").await;
        say(&harness, "CA-3", "no that's all").await;
        say(&harness, "CA-3", "My name is Ada").await;
        say(&harness, "CA-3", "555-123-4567").await;

        harness
            .menu
            .set_availability(&MenuItemId("item-burger".to_string()), false)
            .await
            .expect("86 the burger");

        let reply = say(&harness, "CA-3", "yes").await;
        assert!(reply.say.contains("Burger"));
        assert!(reply.say.contains("not available"));
        assert!(!reply.end_call);
        assert_eq!(harness.orders.count().await, 0);

        // The cart reopened; a substitution flows straight through.
        let reply = say(&harness, "CA-3", "can I get a garlic naan").await;
        assert_eq!(reply.say, "Got it, 1 Garlic Naan. Anything else?");
    }

    #[tokio::test]
    async fn blank_audio_mid_call_asks_for_a_repeat() {
        let harness = harness().await;

        say(&harness, "CA-4", "").await;
        let reply = say(&harness, "CA-4", "").await;
        assert!(reply.say.contains("didn't catch"));
    }

    #[tokio::test]
    async fn order_status_is_answered_from_the_store() {
        let harness = harness().await;
        harness
            .orders
            .create(Order {
                id: OrderId("ORD-17".to_string()),
                customer_name: "Ada".to_string(),
                customer_phone: None,
                lines: vec![OrderLine {
                    menu_item_id: MenuItemId("item-burger".to_string()),
                    menu_item_name: "Burger".to_string(),
                    quantity: 1,
                    unit_price: Decimal::new(500, 2),
                    special_instructions: None,
                }],
                total: Decimal::new(500, 2),
                status: OrderStatus::Preparing,
                created_at: Utc::now(),
            })
            .await
            .expect("seed order");

        let reply = say(&harness, "CA-5", "can you check on my order ORD-17").await;
        assert!(reply.say.contains("O R D - 1 7"));
        assert!(reply.say.contains("preparing"));

        let reply = say(&harness, "CA-5", "where is my order ORD-99").await;
        assert!(reply.say.contains("couldn't find an order"));
    }

    #[tokio::test]
    async fn transcripts_are_written_off_the_response_path() {
        let harness = harness().await;
        say(&harness, "CA-6", "I want two burgers").await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        let turns = harness.conversations.turns_for(&CallId("CA-6".to_string())).await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text, "I want two burgers");
        assert_eq!(turns[1].text, "Got it, 2 Burger. Anything else?");
    }

    #[tokio::test]
    async fn concurrent_calls_stay_isolated() {
        let harness = harness().await;

        let first = say(&harness, "CA-7", "I want two burgers").await;
        let second = say(&harness, "CA-8", "can I get a lemonade").await;
        assert_eq!(first.say, "Got it, 2 Burger. Anything else?");
        assert_eq!(second.say, "Got it, 1 Lemonade. Anything else?");
        assert_eq!(harness.runtime.sessions().len().await, 2);
    }

    #[tokio::test]
    async fn idle_eviction_removes_only_stale_calls() {
        let harness = harness().await;
        say(&harness, "CA-9", "I want two burgers").await;
        say(&harness, "CA-10", "can I get a lemonade").await;

        let store = harness.runtime.sessions();
        let handle = store.get(&CallId("CA-9".to_string())).await.expect("live session");
        handle.lock().await.updated_at = Utc::now() - chrono::Duration::seconds(700);

        let evicted = harness.runtime.evict_idle(chrono::Duration::seconds(600)).await;
        assert_eq!(evicted, 1);
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn order_ids_are_found_in_spoken_and_written_forms() {
        assert_eq!(extract_order_id("it's ORD-1756-4821"), Some(OrderId("ORD-1756-4821".into())));
        assert_eq!(extract_order_id("o r d - 1 2"), Some(OrderId("ORD-12".into())));
        assert_eq!(extract_order_id("no number here"), None);
        assert_eq!(extract_order_id("ord-"), None);
    }

    #[tokio::test]
    async fn unavailable_menu_rows_never_reach_the_resolver() {
        let harness = harness().await;
        harness
            .menu
            .set_availability(&MenuItemId("item-lemonade".to_string()), false)
            .await
            .expect("86 the lemonade");

        let reply = say(&harness, "CA-11", "can I get a lemonade").await;
        assert!(!reply.say.starts_with("Got it"));
    }
}
