use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::models::interview::{Message, Session, STATUS_COMPLETED, STATUS_IN_PROGRESS};
use crate::transcript::{no_messages, sort_messages, NewMessage, StoreError, TranscriptStore};

const ORDERED_MESSAGES: &str = r#"
    SELECT id, interview_id, role, text, created_at
    FROM interview_messages
    WHERE interview_id = $1
    ORDER BY created_at ASC, id ASC
"#;

const UNORDERED_MESSAGES: &str = r#"
    SELECT id, interview_id, role, text, created_at
    FROM interview_messages
    WHERE interview_id = $1
"#;

/// Postgres-backed transcript store. Tables are created by the migrations in `migrations/`.
#[derive(Clone)]
pub struct PgTranscriptStore {
    pool: PgPool,
}

impl PgTranscriptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TranscriptStore for PgTranscriptStore {
    async fn append(&self, message: NewMessage) -> Result<Message, StoreError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query(
            "INSERT INTO interviews (id, status) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
        )
        .bind(&message.session_id)
        .bind(STATUS_IN_PROGRESS)
        .execute(&mut *tx)
        .await?;
        if created.rows_affected() > 0 {
            debug!("Creating interview {} on first message", message.session_id);
        }

        let stored = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO interview_messages (interview_id, role, text)
            VALUES ($1, $2, $3)
            RETURNING id, interview_id, role, text, created_at
            "#,
        )
        .bind(&message.session_id)
        .bind(&message.role)
        .bind(&message.text)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, StoreError> {
        let ordered = sqlx::query_as::<_, Message>(ORDERED_MESSAGES)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await;

        let mut messages = match ordered {
            Ok(rows) => rows,
            Err(sqlx::Error::Database(e)) => {
                warn!("Ordered message fetch failed ({e}); fetching unordered");
                sqlx::query_as::<_, Message>(UNORDERED_MESSAGES)
                    .bind(session_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            Err(e) => return Err(e.into()),
        };

        if messages.is_empty() {
            return Err(no_messages(session_id));
        }
        sort_messages(&mut messages);
        Ok(messages)
    }

    async fn set_feedback(&self, session_id: &str, feedback: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO interviews (id, status, feedback, feedback_generated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                feedback = EXCLUDED.feedback,
                feedback_generated_at = EXCLUDED.feedback_generated_at
            "#,
        )
        .bind(session_id)
        .bind(STATUS_COMPLETED)
        .bind(feedback)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        Ok(sqlx::query_as::<_, Session>(
            "SELECT id, status, created_at, feedback, feedback_generated_at FROM interviews WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use crate::db::create_pool;

    async fn store() -> PgTranscriptStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for Postgres tests");
        PgTranscriptStore::new(create_pool(&url).await.unwrap())
    }

    fn session_id() -> String {
        format!("pg-test-{}", Uuid::new_v4())
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_append_creates_session_and_lists_in_order() {
        let store = store().await;
        let id = session_id();
        assert!(store.get_session(&id).await.unwrap().is_none());

        for (role, text) in [("user", "I have 5 years experience"), ("assistant", "Tell me about a project")] {
            store
                .append(NewMessage::new(&id, Some(role), text).unwrap())
                .await
                .unwrap();
        }

        let session = store.get_session(&id).await.unwrap().unwrap();
        assert_eq!(session.status, STATUS_IN_PROGRESS);

        let messages = store.list_messages(&id).await.unwrap();
        let texts: Vec<_> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["I have 5 years experience", "Tell me about a project"]);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_list_sorts_by_timestamp_not_insertion() {
        let store = store().await;
        let id = session_id();
        store
            .append(NewMessage::new(&id, Some("user"), "first saved").unwrap())
            .await
            .unwrap();

        // A row that arrived later but was spoken earlier.
        sqlx::query(
            "INSERT INTO interview_messages (interview_id, role, text, created_at) VALUES ($1, 'assistant', 'spoken earlier', $2)",
        )
        .bind(&id)
        .bind(Utc::now() - Duration::minutes(5))
        .execute(&store.pool)
        .await
        .unwrap();

        let messages = store.list_messages(&id).await.unwrap();
        assert_eq!(messages[0].text, "spoken earlier");
        assert_eq!(messages[1].text, "first saved");
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_list_unknown_session_is_not_found() {
        let err = store().await.list_messages(&session_id()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_set_feedback_upserts_and_overwrites() {
        let store = store().await;
        let id = session_id();

        store.set_feedback(&id, "first").await.unwrap();
        store.set_feedback(&id, "second").await.unwrap();

        let session = store.get_session(&id).await.unwrap().unwrap();
        assert_eq!(session.feedback.as_deref(), Some("second"));
        assert_eq!(session.status, STATUS_COMPLETED);
        assert!(session.feedback_generated_at.is_some());
    }
}
