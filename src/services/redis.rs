//! Redis service for single-use account tokens (email confirmation, password reset)

use redis::{AsyncCommands, Client};

use crate::error::{AppError, AppResult};

/// Purpose of a stored token; each kind lives in its own key space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EmailConfirmation,
    PasswordReset,
}

impl TokenKind {
    fn prefix(&self) -> &'static str {
        match self {
            TokenKind::EmailConfirmation => "confirm_email",
            TokenKind::PasswordReset => "reset_password",
        }
    }
}

fn token_key(kind: TokenKind, token_hash: &str) -> String {
    format!("{}:{}", kind.prefix(), token_hash)
}

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a Redis service. No connection is made until first use.
    pub fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }

    /// Check that the server answers
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;
        Ok(())
    }

    /// Store a hashed token pointing at a user, expiring after `ttl_seconds`
    pub async fn store_token(&self, kind: TokenKind, token_hash: &str, user_id: i32, ttl_seconds: u64) -> AppResult<()> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(token_key(kind, token_hash), user_id, ttl_seconds)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store token in Redis: {}", e)))?;
        Ok(())
    }

    /// Fetch and delete a token in one step. Returns the user id it was issued for.
    pub async fn consume_token(&self, kind: TokenKind, token_hash: &str) -> AppResult<Option<i32>> {
        let mut conn = self.connection().await?;
        let key = token_key(kind, token_hash);

        let (user_id, _deleted): (Option<i32>, i32) = redis::pipe()
            .atomic()
            .get(&key)
            .del(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read token from Redis: {}", e)))?;

        Ok(user_id)
    }
}
