//! End-to-end readiness checks: config, database, migrations, and a
//! scripted call played against the in-memory stack with the demo menu.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use tably_agent::{
    HeuristicCustomerInfoExtractor, HeuristicIntentClassifier, RuntimeServices, VoiceRuntime,
};
use tably_core::audit::InMemoryAuditSink;
use tably_core::config::{AppConfig, LoadOptions};
use tably_core::DialogueEngine;
use tably_db::fixtures::demo_menu;
use tably_db::repositories::{
    InMemoryConversationRepository, InMemoryMenuRepository, InMemoryOrderRepository,
};
use tably_db::{connect_with_settings, migrations, PoolSettings};
use tably_voice::CallSimulator;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config_started = Instant::now();
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Pass,
                elapsed_ms: elapsed_ms(config_started),
                message: "configuration loaded and validated".to_string(),
            });
            config
        }
        Err(error) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Fail,
                elapsed_ms: elapsed_ms(config_started),
                message: error.to_string(),
            });
            checks.push(skipped("db_connectivity"));
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("dialogue_flow"));
            return finalize_report(checks, elapsed_ms(started));
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Fail,
                elapsed_ms: 0,
                message: format!("failed to initialize async runtime: {error}"),
            });
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("dialogue_flow"));
            return finalize_report(checks, elapsed_ms(started));
        }
    };

    let db_started = Instant::now();
    let pool = match runtime.block_on(connect_with_settings(
        &config.database.url,
        PoolSettings {
            max_connections: config.database.max_connections,
            acquire_timeout_secs: config.database.timeout_secs,
        },
    )) {
        Ok(pool) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Pass,
                elapsed_ms: elapsed_ms(db_started),
                message: "database connection succeeded".to_string(),
            });
            Some(pool)
        }
        Err(error) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Fail,
                elapsed_ms: elapsed_ms(db_started),
                message: error.to_string(),
            });
            checks.push(skipped("migration_visibility"));
            None
        }
    };

    if let Some(pool) = pool {
        let migrate_started = Instant::now();
        match runtime.block_on(migrations::run_pending(&pool)) {
            Ok(()) => checks.push(SmokeCheck {
                name: "migration_visibility",
                status: SmokeStatus::Pass,
                elapsed_ms: elapsed_ms(migrate_started),
                message: "migrations are applied and visible".to_string(),
            }),
            Err(error) => checks.push(SmokeCheck {
                name: "migration_visibility",
                status: SmokeStatus::Fail,
                elapsed_ms: elapsed_ms(migrate_started),
                message: error.to_string(),
            }),
        }
        runtime.block_on(pool.close());
    }

    let flow_started = Instant::now();
    let flow = runtime.block_on(scripted_call());
    checks.push(SmokeCheck {
        name: "dialogue_flow",
        status: if flow.is_ok() { SmokeStatus::Pass } else { SmokeStatus::Fail },
        elapsed_ms: elapsed_ms(flow_started),
        message: match flow {
            Ok(message) => message,
            Err(message) => message,
        },
    });

    finalize_report(checks, elapsed_ms(started))
}

/// The canonical two-burgers-and-a-lemonade call against in-memory
/// repositories; passes only when the call ends with a placed order.
async fn scripted_call() -> Result<String, String> {
    let menu = Arc::new(InMemoryMenuRepository::with_items(demo_menu()).await);
    let orders = Arc::new(InMemoryOrderRepository::default());
    let runtime = VoiceRuntime::new(
        DialogueEngine::default(),
        RuntimeServices {
            classifier: Arc::new(HeuristicIntentClassifier),
            extractor: Arc::new(HeuristicCustomerInfoExtractor),
            menu,
            orders: orders.clone(),
            conversations: Arc::new(InMemoryConversationRepository::default()),
            audit: Arc::new(InMemoryAuditSink::default()),
        },
        Duration::from_secs(300),
    );

    let simulator = CallSimulator::new(Arc::new(runtime));
    let exchanges = simulator
        .run_call(
            "CA-smoke",
            None,
            &[
                "I want two burgers",
                "can I get a lemonade",
                "no that's all",
                "My name is Smoke Test",
                "555-123-4567",
                "yes",
            ],
        )
        .await;

    let last = exchanges.last().ok_or_else(|| "no turns were played".to_string())?;
    if !last.ended {
        return Err(format!("call did not end; last reply was {:?}", last.assistant));
    }
    if orders.count().await != 1 {
        return Err("call ended without exactly one placed order".to_string());
    }
    Ok(format!("scripted call placed an order in {} turns", exchanges.len()))
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped because an earlier check failed".to_string(),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);
    let status = if failed { SmokeStatus::Fail } else { SmokeStatus::Pass };
    let summary = if failed {
        "smoke: one or more checks failed".to_string()
    } else {
        "smoke: all checks passed".to_string()
    };

    let report = SmokeReport { command: "smoke", status, summary, total_elapsed_ms, checks };
    let output = serde_json::to_string_pretty(&report)
        .unwrap_or_else(|error| format!("{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed: {error}\"}}"));

    CommandResult { exit_code: if failed { 1 } else { 0 }, output }
}
