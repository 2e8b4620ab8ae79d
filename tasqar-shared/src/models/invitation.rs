/// Invitation model and database operations
///
/// Invitations let a user bring in someone who has no account yet. Only the
/// SHA-256 hash of the invitation token is stored; the plaintext token
/// exists only in the emailed link.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE invitations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     inviter_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     email CITEXT NOT NULL,
///     token_hash VARCHAR(64) NOT NULL UNIQUE,
///     expires_at TIMESTAMPTZ NOT NULL,
///     accepted_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const INVITATION_COLUMNS: &str =
    "id, inviter_id, email::TEXT AS email, token_hash, expires_at, accepted_at, created_at";

/// Invitation model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub inviter_id: Uuid,
    pub email: String,

    #[serde(skip_serializing, default)]
    pub token_hash: String,

    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    /// Whether the invitation can still be used at `now`
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.accepted_at.is_none() && self.expires_at > now
    }
}

/// Input for creating an invitation
#[derive(Debug, Clone)]
pub struct CreateInvitation {
    pub inviter_id: Uuid,
    pub email: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    /// Creates an invitation
    pub async fn create(pool: &PgPool, data: CreateInvitation) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Invitation>(&format!(
            r#"
            INSERT INTO invitations (inviter_id, email, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {INVITATION_COLUMNS}
            "#
        ))
        .bind(data.inviter_id)
        .bind(data.email)
        .bind(data.token_hash)
        .bind(data.expires_at)
        .fetch_one(pool)
        .await
    }

    /// Finds an invitation by the hash of its token
    pub async fn find_by_token_hash<'e, E>(
        executor: E,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(executor)
        .await
    }

    /// Lists invitations sent by `inviter_id` that are neither accepted nor expired
    pub async fn list_pending(pool: &PgPool, inviter_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invitation>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS} FROM invitations
            WHERE inviter_id = $1 AND accepted_at IS NULL AND expires_at > NOW()
            ORDER BY created_at DESC
            "#
        ))
        .bind(inviter_id)
        .fetch_all(pool)
        .await
    }

    /// Marks an invitation accepted
    ///
    /// Returns false if it was already accepted.
    pub async fn mark_accepted<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE invitations SET accepted_at = NOW() WHERE id = $1 AND accepted_at IS NULL",
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invitation(expires_in: Duration, accepted: bool) -> Invitation {
        let now = Utc::now();
        Invitation {
            id: Uuid::new_v4(),
            inviter_id: Uuid::new_v4(),
            email: "friend@example.com".to_string(),
            token_hash: "ab".repeat(32),
            expires_at: now + expires_in,
            accepted_at: accepted.then_some(now),
            created_at: now,
        }
    }

    #[test]
    fn test_is_usable() {
        let now = Utc::now();
        assert!(invitation(Duration::hours(1), false).is_usable(now));
        assert!(!invitation(Duration::hours(-1), false).is_usable(now));
        assert!(!invitation(Duration::hours(1), true).is_usable(now));
    }

    #[test]
    fn test_token_hash_not_serialized() {
        let json = serde_json::to_string(&invitation(Duration::hours(1), false)).unwrap();
        assert!(!json.contains("token_hash"));
    }
}
