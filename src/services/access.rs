//! Ownership checks shared by the resource services

use crate::{
    error::{AppError, AppResult},
    models::user::UserClaims,
};

/// Allow the owner of a resource, or an administrator
pub fn ensure_owner_or_admin(claims: &UserClaims, owner_id: i32, resource: &str) -> AppResult<()> {
    if claims.user_id == owner_id || claims.is_admin() {
        Ok(())
    } else {
        Err(AppError::Authorization(format!("You are not allowed to modify this {}", resource)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    fn claims(user_id: i32, role: UserRole) -> UserClaims {
        UserClaims {
            sub: "someone".to_string(),
            user_id,
            role,
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn test_owner_and_admin_pass() {
        assert!(ensure_owner_or_admin(&claims(3, UserRole::User), 3, "item").is_ok());
        assert!(ensure_owner_or_admin(&claims(1, UserRole::Admin), 3, "item").is_ok());
    }

    #[test]
    fn test_other_user_is_forbidden() {
        let err = ensure_owner_or_admin(&claims(4, UserRole::User), 3, "location").unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }
}
