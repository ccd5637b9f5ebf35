//! Per-interview turn lock: at most one answer submission in flight per interview.
//!
//! The store's expected-round-count append still guards the write if a lock
//! expires mid-turn.
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;

/// Longer than a full turn (upload, transcription, two model calls).
pub const TURN_LOCK_TTL: Duration = Duration::from_secs(600);

/// Proof of holding the lock; only the holder's token can release it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnToken(String);

impl TurnToken {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[async_trait]
pub trait TurnLock: Send + Sync {
    /// `None` when another turn already holds the lock.
    async fn try_acquire(&self, interview_id: Uuid) -> Result<Option<TurnToken>, AppError>;

    async fn release(&self, interview_id: Uuid, token: TurnToken) -> Result<(), AppError>;
}

fn turn_key(interview_id: Uuid) -> String {
    format!("interview:{interview_id}:turn")
}

// ────────────────────────────────────────────────────────────────────────────
// Redis
// ────────────────────────────────────────────────────────────────────────────

static RELEASE_SCRIPT: LazyLock<redis::Script> = LazyLock::new(|| {
    redis::Script::new(
        r#"
        if redis.call("GET", KEYS[1]) == ARGV[1] then
            return redis.call("DEL", KEYS[1])
        end
        return 0
        "#,
    )
});

pub struct RedisTurnLock {
    client: redis::Client,
    ttl: Duration,
}

impl RedisTurnLock {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            ttl: TURN_LOCK_TTL,
        }
    }
}

#[async_trait]
impl TurnLock for RedisTurnLock {
    async fn try_acquire(&self, interview_id: Uuid) -> Result<Option<TurnToken>, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let token = TurnToken::generate();
        let reply: Option<String> = redis::cmd("SET")
            .arg(turn_key(interview_id))
            .arg(&token.0)
            .arg("NX")
            .arg("PX")
            .arg(self.ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;

        if reply.is_some() {
            debug!("Acquired turn lock for interview {interview_id}");
            Ok(Some(token))
        } else {
            Ok(None)
        }
    }

    async fn release(&self, interview_id: Uuid, token: TurnToken) -> Result<(), AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let deleted: i32 = RELEASE_SCRIPT
            .key(turn_key(interview_id))
            .arg(&token.0)
            .invoke_async(&mut conn)
            .await?;
        if deleted == 0 {
            warn!("Turn lock for interview {interview_id} expired before release");
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-process
// ────────────────────────────────────────────────────────────────────────────

/// Single-node lock used when no Redis is configured.
#[derive(Default)]
pub struct LocalTurnLock {
    held: Mutex<HashMap<Uuid, TurnToken>>,
}

#[async_trait]
impl TurnLock for LocalTurnLock {
    async fn try_acquire(&self, interview_id: Uuid) -> Result<Option<TurnToken>, AppError> {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        if held.contains_key(&interview_id) {
            return Ok(None);
        }
        let token = TurnToken::generate();
        held.insert(interview_id, token.clone());
        Ok(Some(token))
    }

    async fn release(&self, interview_id: Uuid, token: TurnToken) -> Result<(), AppError> {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        if held.get(&interview_id) == Some(&token) {
            held.remove(&interview_id);
        }
        Ok(())
    }
}
