/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the password policy
/// - [`jwt`]: Access/refresh token issuing and validation
/// - [`invitation_token`]: Random invitation tokens and their SHA-256 hashes
/// - [`middleware`]: Axum middleware that turns a bearer token into an [`middleware::AuthContext`]
///
/// # Example
///
/// ```no_run
/// use tasqar_shared::auth::password::{hash_password, verify_password};
/// use tasqar_shared::auth::jwt::issue_token_pair;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user password 1")?;
/// assert!(verify_password("user password 1", &hash)?);
///
/// let tokens = issue_token_pair(Uuid::new_v4(), "jane@example.com", "a-secret-of-at-least-thirty-two-bytes!")?;
/// assert!(!tokens.access_token.is_empty());
/// # Ok(())
/// # }
/// ```

pub mod invitation_token;
pub mod jwt;
pub mod middleware;
pub mod password;
