use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A principal tokens can be issued to. Only ever looked up by `uname`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub uname: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(uname: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            uname: uname.into(),
            created_at: Utc::now(),
        }
    }
}
