//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        ChangePassword, LoginResponse, PageQuery, RegisterUser, ResetPassword, UpdateProfile, User, UserClaims, UserQuery,
        UserRole, UserShort,
    },
    repository::Repository,
    services::{
        email::{self, EmailService},
        redis::{RedisService, TokenKind},
    },
};

/// Random token handed out in emails (hex, 64 chars)
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Only hashes of emailed tokens are stored
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.trim().as_bytes()))
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
    redis: RedisService,
    email: EmailService,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig, redis: RedisService, email: EmailService) -> Self {
        Self {
            repository,
            config,
            redis,
            email,
        }
    }

    /// Register a new account and send the confirmation email
    pub async fn register(&self, request: RegisterUser) -> AppResult<User> {
        request.validate()?;

        if self.repository.users.username_exists(request.username.trim(), None).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        if self.repository.users.email_exists(request.email.trim(), None).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let hash = self.hash_password(&request.password)?;
        let user = self.repository.users.create(&request, &hash).await?;
        tracing::info!(user_id = user.id, username = %user.username, role = %user.role, "User registered");

        if let Err(e) = self.send_confirmation(&user).await {
            tracing::warn!(user_id = user.id, error = %e, "Failed to send confirmation email");
        }

        Ok(user)
    }

    async fn send_confirmation(&self, user: &User) -> AppResult<()> {
        let token = generate_token();
        self.redis
            .store_token(
                TokenKind::EmailConfirmation,
                &hash_token(&token),
                user.id,
                self.config.email_token_ttl_minutes * 60,
            )
            .await?;

        let link = format!("{}/confirm-email?token={}", self.config.frontend_url.trim_end_matches('/'), token);
        self.email
            .send(&user.email, &email::confirmation_email(&user.username, &link))
            .await
    }

    /// Mark the email address behind a confirmation token as confirmed
    pub async fn confirm_email(&self, token: &str) -> AppResult<()> {
        let user_id = self
            .redis
            .consume_token(TokenKind::EmailConfirmation, &hash_token(token))
            .await?
            .ok_or_else(|| AppError::Validation("Invalid or expired confirmation token".to_string()))?;

        self.repository.users.confirm_email(user_id).await?;
        tracing::info!(user_id, "Email confirmed");
        Ok(())
    }

    /// Authenticate by username or email and return a bearer token
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<LoginResponse> {
        let user = self
            .repository
            .users
            .get_by_login(login.trim())
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid login or password".to_string()))?;

        let now = Utc::now();
        if user.is_locked(now) {
            tracing::warn!(user_id = user.id, "Login attempt on locked account");
            return Err(AppError::Authentication("Account is locked".to_string()));
        }

        if !self.verify_password(&user, password)? {
            let lockout = self
                .repository
                .users
                .record_failed_login(user.id, self.config.max_failed_logins, self.config.lockout_minutes)
                .await?;
            if let Some(until) = lockout {
                tracing::warn!(user_id = user.id, until = %until, "Account locked after repeated failed logins");
            }
            return Err(AppError::Authentication("Invalid login or password".to_string()));
        }

        if self.config.require_confirmed_email && !user.email_confirmed {
            return Err(AppError::Authentication("Email address has not been confirmed".to_string()));
        }

        // Concurrent failures may have locked the account while the hash was checked
        if !self.repository.users.clear_failed_logins(user.id).await? {
            tracing::warn!(user_id = user.id, "Login attempt on locked account");
            return Err(AppError::Authentication("Account is locked".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!(user_id = user.id, "User logged in");

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.jwt_expiration_hours as i64 * 3600,
            user,
        })
    }

    /// Send a reset link when the address is known. Never reveals whether it is.
    pub async fn forgot_password(&self, email_address: &str) -> AppResult<()> {
        let user = match self.repository.users.get_by_email(email_address.trim()).await? {
            Some(user) => user,
            None => {
                tracing::debug!("Password reset requested for unknown address");
                return Ok(());
            }
        };

        let token = generate_token();
        self.redis
            .store_token(
                TokenKind::PasswordReset,
                &hash_token(&token),
                user.id,
                self.config.password_reset_ttl_minutes * 60,
            )
            .await?;

        let link = format!("{}/reset-password?token={}", self.config.frontend_url.trim_end_matches('/'), token);
        let mail = email::password_reset_email(&user.username, &link, self.config.password_reset_ttl_minutes);
        if let Err(e) = self.email.send(&user.email, &mail).await {
            tracing::warn!(user_id = user.id, error = %e, "Failed to send password reset email");
        }
        Ok(())
    }

    /// Set a new password from a reset token. Clears any lockout.
    pub async fn reset_password(&self, request: ResetPassword) -> AppResult<()> {
        request.validate()?;

        let user_id = self
            .redis
            .consume_token(TokenKind::PasswordReset, &hash_token(&request.token))
            .await?
            .ok_or_else(|| AppError::Validation("Invalid or expired reset token".to_string()))?;

        let hash = self.hash_password(&request.new_password)?;
        self.repository.users.update_password(user_id, &hash).await?;
        tracing::info!(user_id, "Password reset");
        Ok(())
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash =
            PasswordHash::new(&user.password).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Search users by name, for borrower and member pickers
    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<UserShort>, i64)> {
        self.repository.users.search(query).await
    }

    /// Update own profile
    pub async fn update_profile(&self, user_id: i32, profile: UpdateProfile) -> AppResult<User> {
        profile.validate()?;

        if let Some(ref username) = profile.username {
            if self.repository.users.username_exists(username.trim(), Some(user_id)).await? {
                return Err(AppError::Conflict("Username already exists".to_string()));
            }
        }

        self.repository.users.update_profile(user_id, &profile).await
    }

    /// Change own password after checking the current one
    pub async fn change_password(&self, user_id: i32, request: ChangePassword) -> AppResult<()> {
        request.validate()?;

        let user = self.repository.users.get_by_id(user_id).await?;
        if !self.verify_password(&user, &request.current_password)? {
            return Err(AppError::Authentication("Current password is incorrect".to_string()));
        }

        let hash = self.hash_password(&request.new_password)?;
        self.repository.users.update_password(user_id, &hash).await?;
        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    /// Full user list (admin)
    pub async fn list_users(&self, query: &PageQuery) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.list(query.page(), query.per_page()).await
    }

    /// Change a user's role (admin). The last administrator cannot be demoted.
    pub async fn update_role(&self, actor: &UserClaims, user_id: i32, role: UserRole) -> AppResult<User> {
        let user = self.repository.users.get_by_id(user_id).await?;

        if user.role == UserRole::Admin && role != UserRole::Admin && self.repository.users.count_admins().await? <= 1 {
            return Err(AppError::BusinessRule("Cannot demote the last administrator".to_string()));
        }

        let updated = self.repository.users.set_role(user_id, role).await?;
        tracing::info!(actor_id = actor.user_id, user_id, role = %role, "User role changed");
        Ok(updated)
    }

    /// Lift a lockout (admin)
    pub async fn unlock(&self, actor: &UserClaims, user_id: i32) -> AppResult<()> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.users.reset_login_failures(user_id).await?;
        tracing::info!(actor_id = actor.user_id, user_id, "User unlocked");
        Ok(())
    }

    /// Delete a user and everything they own (admin)
    pub async fn delete_user(&self, actor: &UserClaims, user_id: i32) -> AppResult<()> {
        if actor.user_id == user_id {
            return Err(AppError::BusinessRule("Administrators cannot delete their own account".to_string()));
        }
        self.repository.users.delete(user_id).await?;
        tracing::info!(actor_id = actor.user_id, user_id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_random_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_hash_is_stable() {
        let token = generate_token();
        assert_eq!(hash_token(&token), hash_token(&format!(" {} ", token)));
        assert_ne!(hash_token(&token), token);
        assert_eq!(hash_token("abc").len(), 64);
    }
}
