use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::user::User;

/// Resolves the opaque owner id a client sends to a known account.
/// Accounts are provisioned outside this service; an unknown id is `NotFound`.
#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    async fn find_owner(&self, owner_id: &str) -> Result<Option<User>, AppError>;
}

pub struct PgOwnerDirectory {
    pool: PgPool,
}

impl PgOwnerDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OwnerDirectory for PgOwnerDirectory {
    async fn find_owner(&self, owner_id: &str) -> Result<Option<User>, AppError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = $1")
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }
}
