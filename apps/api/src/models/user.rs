use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered candidate. `external_id` is the identity provider's subject and is
/// the opaque owner key interviews are filed under.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub tier: String,
    pub created_at: DateTime<Utc>,
}
