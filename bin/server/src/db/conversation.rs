//! SQLite repository for chat sessions and messages.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, SqliteConnection};
use std::str::FromStr;
use support_relay_conversation::{
    ChatSession, ConversationStore, Message, MessageId, MessageRole, NewMessage, RecordedTurn,
    StoreError, TurnRecord,
};
use support_relay_core::ChatSessionId;
use tracing::instrument;

/// Row type for session queries.
#[derive(FromRow)]
struct ChatSessionRow {
    id: String,
    created_at: String,
    escalated: bool,
}

impl ChatSessionRow {
    fn try_into_session(self) -> Result<ChatSession, sqlx::Error> {
        let id = ChatSessionId::from_str(&self.id)
            .map_err(|e| decode_error(format!("invalid session id '{}': {}", self.id, e)))?;

        Ok(ChatSession {
            id,
            created_at: decode_timestamp(&self.created_at)?,
            escalated: self.escalated,
        })
    }
}

/// Row type for message queries.
#[derive(FromRow)]
struct MessageRow {
    id: i64,
    session_id: String,
    role: String,
    text: String,
    created_at: String,
}

impl MessageRow {
    fn try_into_message(self) -> Result<Message, sqlx::Error> {
        let session_id = ChatSessionId::from_str(&self.session_id).map_err(|e| {
            decode_error(format!("invalid session id '{}': {}", self.session_id, e))
        })?;
        let role = MessageRole::from_str_value(&self.role)
            .ok_or_else(|| decode_error(format!("invalid message role '{}'", self.role)))?;

        Ok(Message {
            id: MessageId::new(self.id),
            session_id,
            role,
            text: self.text,
            created_at: decode_timestamp(&self.created_at)?,
        })
    }
}

/// [`ConversationStore`] backed by a SQLite database.
///
/// Timestamps are stored as fixed-width RFC 3339 text with microsecond
/// precision, so ordering by the text column is chronological.
#[derive(Debug, Clone)]
pub struct SqliteConversationStore {
    pool: SqlitePool,
}

impl SqliteConversationStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the URL is invalid or the
    /// database cannot be opened.
    pub async fn connect(database_url: &str) -> support_relay_core::Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::Unavailable {
                reason: format!("invalid database url: {e}"),
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable {
                reason: format!("failed to open database: {e}"),
            })?;

        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if a migration fails.
    pub async fn migrate(&self) -> support_relay_core::Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable {
                reason: format!("failed to run migrations: {e}"),
            })?;
        Ok(())
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    #[instrument(skip(self))]
    async fn create_session(&self) -> Result<ChatSession, StoreError> {
        let mut session = ChatSession::new();
        session.created_at = session.created_at.trunc_subsecs(6);

        sqlx::query(
            r#"
            INSERT INTO chat_session (id, created_at, escalated)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(session.id.to_string())
        .bind(encode_timestamp(session.created_at))
        .bind(session.escalated)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(session)
    }

    #[instrument(skip(self), fields(session_id = %id))]
    async fn get_session(&self, id: ChatSessionId) -> Result<Option<ChatSession>, StoreError> {
        let row: Option<ChatSessionRow> = sqlx::query_as(
            r#"
            SELECT id, created_at, escalated
            FROM chat_session
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        match row {
            Some(r) => Ok(Some(r.try_into_session().map_err(store_error)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, message), fields(session_id = %session_id, role = message.role.as_str()))]
    async fn append_message(
        &self,
        session_id: ChatSessionId,
        message: NewMessage,
    ) -> Result<Message, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM chat_session WHERE id = ?")
            .bind(session_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_error)?;
        if exists.is_none() {
            return Err(StoreError::SessionNotFound { id: session_id });
        }

        let stored = insert_message(&mut tx, session_id, message)
            .await
            .map_err(store_error)?;
        tx.commit().await.map_err(store_error)?;

        Ok(stored)
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    async fn recent_messages(
        &self,
        session_id: ChatSessionId,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, session_id, role, text, created_at
            FROM message
            WHERE session_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(session_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter()
            .map(|r| r.try_into_message().map_err(store_error))
            .collect()
    }

    #[instrument(skip(self, turn), fields(session_id = %turn.session_id, escalate = turn.escalate))]
    async fn record_turn(&self, turn: TurnRecord) -> Result<RecordedTurn, StoreError> {
        let session_key = turn.session_id.to_string();
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        // Takes the write lock up front. MAX never lowers the flag.
        let updated = sqlx::query(
            r#"
            UPDATE chat_session
            SET escalated = MAX(escalated, ?)
            WHERE id = ?
            "#,
        )
        .bind(turn.escalate)
        .bind(&session_key)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::SessionNotFound {
                id: turn.session_id,
            });
        }

        let user = insert_message(&mut tx, turn.session_id, turn.user)
            .await
            .map_err(store_error)?;
        let bot = insert_message(&mut tx, turn.session_id, turn.bot)
            .await
            .map_err(store_error)?;

        let session: ChatSessionRow = sqlx::query_as(
            r#"
            SELECT id, created_at, escalated
            FROM chat_session
            WHERE id = ?
            "#,
        )
        .bind(&session_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_error)?;
        let session = session.try_into_session().map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;

        Ok(RecordedTurn { user, bot, session })
    }
}

async fn insert_message(
    conn: &mut SqliteConnection,
    session_id: ChatSessionId,
    message: NewMessage,
) -> Result<Message, sqlx::Error> {
    let created_at = message.created_at.trunc_subsecs(6);

    let result = sqlx::query(
        r#"
        INSERT INTO message (session_id, role, text, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(session_id.to_string())
    .bind(message.role.as_str())
    .bind(&message.text)
    .bind(encode_timestamp(created_at))
    .execute(conn)
    .await?;

    Ok(Message {
        id: MessageId::new(result.last_insert_rowid()),
        session_id,
        role: message.role,
        text: message.text,
        created_at,
    })
}

fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(value: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| decode_error(format!("invalid timestamp '{value}': {e}")))
}

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    )))
}

fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Decode(source) | sqlx::Error::ColumnDecode { source, .. } => {
            StoreError::CorruptRecord {
                reason: source.to_string(),
            }
        }
        other => StoreError::Unavailable {
            reason: other.to_string(),
        },
    }
}
