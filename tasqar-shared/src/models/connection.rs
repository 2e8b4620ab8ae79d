/// User connection model and database operations
///
/// A connection links two users. It starts PENDING when the sender asks and
/// becomes ACCEPTED once the receiver agrees. Only accepted connections may
/// be assigned each other's tasks.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE connection_status AS ENUM ('PENDING', 'ACCEPTED');
///
/// CREATE TABLE user_connections (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     sender_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     receiver_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     status connection_status NOT NULL DEFAULT 'PENDING',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CHECK (sender_id <> receiver_id)
/// );
///
/// CREATE UNIQUE INDEX idx_user_connections_pair
///     ON user_connections (LEAST(sender_id, receiver_id), GREATEST(sender_id, receiver_id));
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::user::PublicUser;

const CONNECTION_COLUMNS: &str = "id, sender_id, receiver_id, status, created_at, updated_at";

/// State of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "connection_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
}

/// Connection model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserConnection {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserConnection {
    /// Whether `user_id` is one of the two parties
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }

    /// The party that isn't `user_id`
    pub fn other_party(&self, user_id: Uuid) -> Uuid {
        if self.sender_id == user_id {
            self.receiver_id
        } else {
            self.sender_id
        }
    }
}

/// A connection as seen by one party, with the other party's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionWithUser {
    pub id: Uuid,
    pub status: ConnectionStatus,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user: PublicUser,
}

#[derive(sqlx::FromRow)]
struct ConnectionRow {
    id: Uuid,
    status: ConnectionStatus,
    sender_id: Uuid,
    receiver_id: Uuid,
    created_at: DateTime<Utc>,
    user_id: Uuid,
    user_email: String,
    user_name: Option<String>,
    user_avatar_url: Option<String>,
}

impl From<ConnectionRow> for ConnectionWithUser {
    fn from(row: ConnectionRow) -> Self {
        Self {
            id: row.id,
            status: row.status,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            created_at: row.created_at,
            user: PublicUser {
                id: row.user_id,
                email: row.user_email,
                name: row.user_name,
                avatar_url: row.user_avatar_url,
            },
        }
    }
}

/// A user's connections split the way the connections page shows them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionList {
    /// Accepted connections, either direction
    pub accepted: Vec<ConnectionWithUser>,

    /// Pending requests waiting for this user's answer
    pub incoming: Vec<ConnectionWithUser>,

    /// Pending requests this user sent
    pub outgoing: Vec<ConnectionWithUser>,
}

impl ConnectionList {
    /// Splits connections of `user_id` into accepted/incoming/outgoing
    pub fn partition(user_id: Uuid, connections: Vec<ConnectionWithUser>) -> Self {
        let mut list = Self::default();
        for connection in connections {
            match connection.status {
                ConnectionStatus::Accepted => list.accepted.push(connection),
                ConnectionStatus::Pending if connection.receiver_id == user_id => {
                    list.incoming.push(connection)
                }
                ConnectionStatus::Pending => list.outgoing.push(connection),
            }
        }
        list
    }
}

impl UserConnection {
    /// Creates a connection with the given status
    ///
    /// # Errors
    ///
    /// Fails with a unique violation when the pair is already connected in
    /// either direction.
    pub async fn create<'e, E>(
        executor: E,
        sender_id: Uuid,
        receiver_id: Uuid,
        status: ConnectionStatus,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, UserConnection>(&format!(
            r#"
            INSERT INTO user_connections (sender_id, receiver_id, status)
            VALUES ($1, $2, $3)
            RETURNING {CONNECTION_COLUMNS}
            "#
        ))
        .bind(sender_id)
        .bind(receiver_id)
        .bind(status)
        .fetch_one(executor)
        .await
    }

    /// Finds a connection by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserConnection>(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM user_connections WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds the connection between two users, in either direction
    pub async fn find_between(
        pool: &PgPool,
        a: Uuid,
        b: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserConnection>(&format!(
            r#"
            SELECT {CONNECTION_COLUMNS} FROM user_connections
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            "#
        ))
        .bind(a)
        .bind(b)
        .fetch_optional(pool)
        .await
    }

    /// Whether two users have an accepted connection
    pub async fn are_connected(pool: &PgPool, a: Uuid, b: Uuid) -> Result<bool, sqlx::Error> {
        let connected: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_connections
                WHERE status = 'ACCEPTED'
                  AND ((sender_id = $1 AND receiver_id = $2)
                    OR (sender_id = $2 AND receiver_id = $1))
            )
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_one(pool)
        .await?;

        Ok(connected)
    }

    /// Lists every connection involving `user_id` with the other party's profile
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<ConnectionList, sqlx::Error> {
        let rows = sqlx::query_as::<_, ConnectionRow>(
            r#"
            SELECT c.id, c.status, c.sender_id, c.receiver_id, c.created_at,
                   u.id AS user_id, u.email::TEXT AS user_email,
                   u.name AS user_name, u.avatar_url AS user_avatar_url
            FROM user_connections c
            JOIN users u
              ON u.id = CASE WHEN c.sender_id = $1 THEN c.receiver_id ELSE c.sender_id END
            WHERE c.sender_id = $1 OR c.receiver_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(ConnectionList::partition(
            user_id,
            rows.into_iter().map(Into::into).collect(),
        ))
    }

    /// Marks a pending connection accepted
    ///
    /// Only the receiver can accept; returns None if the connection doesn't
    /// exist, isn't addressed to `receiver_id`, or isn't pending.
    pub async fn accept<'e, E>(
        executor: E,
        id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, UserConnection>(&format!(
            r#"
            UPDATE user_connections
            SET status = 'ACCEPTED', updated_at = NOW()
            WHERE id = $1 AND receiver_id = $2 AND status = 'PENDING'
            RETURNING {CONNECTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(receiver_id)
        .fetch_optional(executor)
        .await
    }

    /// Deletes a connection if `user_id` is one of its parties
    pub async fn delete_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_connections WHERE id = $1 AND (sender_id = $2 OR receiver_id = $2)",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(status: ConnectionStatus, sender_id: Uuid, receiver_id: Uuid) -> ConnectionWithUser {
        ConnectionWithUser {
            id: Uuid::new_v4(),
            status,
            sender_id,
            receiver_id,
            created_at: Utc::now(),
            user: PublicUser {
                id: Uuid::new_v4(),
                email: "peer@example.com".to_string(),
                name: None,
                avatar_url: None,
            },
        }
    }

    #[test]
    fn test_partition() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        let list = ConnectionList::partition(
            me,
            vec![
                view(ConnectionStatus::Accepted, me, other),
                view(ConnectionStatus::Accepted, other, me),
                view(ConnectionStatus::Pending, other, me),
                view(ConnectionStatus::Pending, me, other),
            ],
        );

        assert_eq!(list.accepted.len(), 2);
        assert_eq!(list.incoming.len(), 1);
        assert_eq!(list.incoming[0].receiver_id, me);
        assert_eq!(list.outgoing.len(), 1);
        assert_eq!(list.outgoing[0].sender_id, me);
    }

    #[test]
    fn test_other_party() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let connection = UserConnection {
            id: Uuid::new_v4(),
            sender_id: a,
            receiver_id: b,
            status: ConnectionStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(connection.other_party(a), b);
        assert_eq!(connection.other_party(b), a);
        assert!(connection.involves(a));
        assert!(!connection.involves(Uuid::new_v4()));
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&ConnectionStatus::Accepted).unwrap(),
            "\"ACCEPTED\""
        );
    }
}
