use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use tably_agent::{
    client_from_config, HeuristicCustomerInfoExtractor, HeuristicIntentClassifier,
    LlmCustomerInfoExtractor, LlmIntentClassifier, RuntimeServices, VoiceRuntime,
};
use tably_core::audit::{AuditEvent, AuditSink};
use tably_core::config::{AppConfig, ConfigError};
use tably_core::{DialogueEngine, MenuResolver};
use tably_db::repositories::{
    SqlConversationRepository, SqlMenuRepository, SqlOrderRepository,
};
use tably_db::{connect_with_settings, migrations, DbPool, PoolSettings};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: Arc<VoiceRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    Llm(#[source] anyhow::Error),
}

/// Audit events land in the structured log stream; the runtime treats
/// the sink as fire-and-forget.
struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        info!(
            event_name = %event.event_type,
            category = ?event.category,
            outcome = ?event.outcome,
            call_id = event.call_id.as_ref().map(|id| id.0.as_str()).unwrap_or("unknown"),
            order_id = event.order_id.as_deref().unwrap_or("unknown"),
            correlation_id = %event.correlation_id,
            metadata = ?event.metadata,
            "audit event"
        );
    }
}

/// One-step load-and-bootstrap for test harnesses. The binary keeps the
/// two phases separate so logging is initialized between them.
#[cfg(test)]
pub(crate) async fn bootstrap(
    options: tably_core::config::LoadOptions,
) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(provider = ?config.llm.provider, "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        PoolSettings {
            max_connections: config.database.max_connections,
            acquire_timeout_secs: config.database.timeout_secs,
        },
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!("database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!("database migrations applied");

    let menu = Arc::new(SqlMenuRepository::new(db_pool.clone()));
    let orders = Arc::new(SqlOrderRepository::new(db_pool.clone()));
    let conversations = Arc::new(SqlConversationRepository::new(db_pool.clone()));

    let services = match client_from_config(&config.llm).map_err(BootstrapError::Llm)? {
        Some(client) => RuntimeServices {
            classifier: Arc::new(LlmIntentClassifier::new(client.clone())),
            extractor: Arc::new(LlmCustomerInfoExtractor::new(client)),
            menu,
            orders,
            conversations,
            audit: Arc::new(TracingAuditSink),
        },
        None => RuntimeServices {
            classifier: Arc::new(HeuristicIntentClassifier),
            extractor: Arc::new(HeuristicCustomerInfoExtractor),
            menu,
            orders,
            conversations,
            audit: Arc::new(TracingAuditSink),
        },
    };

    let resolver =
        MenuResolver::new(config.resolver.thresholds(), config.resolver.synonym_table());
    let runtime = Arc::new(VoiceRuntime::new(
        DialogueEngine::new(resolver),
        services,
        Duration::from_secs(config.catalog.refresh_secs),
    ));

    Ok(Application { config, db_pool, runtime })
}

/// Idle-call eviction and proactive catalog refresh. Both loops are
/// best-effort; the turn path works without them, just less promptly.
pub fn spawn_background_tasks(app: &Application) {
    let idle_window = chrono::Duration::seconds(app.config.session.idle_timeout_secs as i64);
    let runtime = app.runtime.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let evicted = runtime.evict_idle(idle_window).await;
            if evicted > 0 {
                info!(evicted, "idle sessions evicted");
            }
        }
    });

    let catalog = app.runtime.catalog();
    let refresh = Duration::from_secs(app.config.catalog.refresh_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(refresh);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(error) = catalog.refresh_now().await {
                tracing::warn!(%error, "menu catalog refresh failed");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use tably_core::config::{ConfigOverrides, LlmProvider, LoadOptions};
    use tably_db::fixtures::seed_demo_menu;
    use tably_db::repositories::SqlMenuRepository;
    use tably_voice::CallSimulator;

    use super::bootstrap;

    fn memory_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                llm_provider: Some(LlmProvider::Heuristic),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_when_openai_has_no_key() {
        std::env::remove_var("TABLY_LLM_API_KEY");
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                llm_provider: Some(LlmProvider::OpenAi),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("openai without a key is invalid").to_string();
        assert!(message.contains("api_key"));
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_serves_a_full_call() {
        let app = bootstrap(memory_options()).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('menu_items', 'orders', 'order_lines', 'conversations')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema query");
        assert_eq!(table_count, 4);

        let menu = SqlMenuRepository::new(app.db_pool.clone());
        seed_demo_menu(&menu).await.expect("seed");

        let simulator = CallSimulator::new(app.runtime.clone());
        let exchanges = simulator
            .run_call(
                "CA-bootstrap",
                None,
                &[
                    "I want two burgers",
                    "no that's all",
                    "My name is Ada",
                    "555-123-4567",
                    "yes",
                ],
            )
            .await;
        assert!(exchanges.last().expect("turns").ended);

        let (order_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(&app.db_pool)
            .await
            .expect("order count");
        assert_eq!(order_count, 1);
    }
}
