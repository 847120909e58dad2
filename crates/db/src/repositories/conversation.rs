use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use tably_core::domain::intent::Intent;
use tably_core::domain::order::OrderId;
use tably_core::domain::session::{CallId, TurnRole};

use super::{ConversationRepository, RepositoryError, TranscriptTurn};
use crate::DbPool;

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn role_label(role: TurnRole) -> &'static str {
    match role {
        TurnRole::Caller => "caller",
        TurnRole::Assistant => "assistant",
    }
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn start_conversation(
        &self,
        call_id: &CallId,
        caller_phone: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO conversations (call_id, caller_phone, started_at)
             VALUES (?, ?, ?)
             ON CONFLICT(call_id) DO NOTHING",
        )
        .bind(&call_id.0)
        .bind(caller_phone)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_turn(&self, turn: TranscriptTurn) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO conversation_turns (call_id, role, text, intent, occurred_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&turn.call_id.0)
        .bind(role_label(turn.role))
        .bind(&turn.text)
        .bind(turn.intent.map(|intent| intent.as_label()))
        .bind(turn.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn end_conversation(
        &self,
        call_id: &CallId,
        order_id: Option<&OrderId>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE conversations SET ended_at = ?, order_id = ? WHERE call_id = ?")
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(order_id.map(|id| id.0.as_str()))
            .bind(&call_id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_by_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<TranscriptTurn>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT t.call_id, t.role, t.text, t.intent, t.occurred_at
             FROM conversation_turns t
             JOIN conversations c ON c.call_id = t.call_id
             WHERE c.order_id = ?
             ORDER BY t.id ASC",
        )
        .bind(&order_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(turn_from_row).collect()
    }
}

fn turn_from_row(row: SqliteRow) -> Result<TranscriptTurn, RepositoryError> {
    let role_raw: String = row.get("role");
    let role = match role_raw.as_str() {
        "caller" => TurnRole::Caller,
        "assistant" => TurnRole::Assistant,
        other => return Err(RepositoryError::Decode(format!("unknown turn role `{other}`"))),
    };

    let occurred_at_raw: String = row.get("occurred_at");
    let occurred_at = DateTime::parse_from_rfc3339(&occurred_at_raw)
        .map_err(|err| RepositoryError::Decode(format!("bad occurred_at timestamp: {err}")))?
        .with_timezone(&Utc);

    Ok(TranscriptTurn {
        call_id: CallId(row.get("call_id")),
        role,
        text: row.get("text"),
        intent: row.get::<Option<String>, _>("intent").and_then(|label| Intent::parse_label(&label)),
        occurred_at,
    })
}
