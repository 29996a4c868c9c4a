//! Registration, login and own-account endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::user::{
        ChangePassword, ConfirmEmail, ForgotPassword, LoginRequest, LoginResponse, RegisterUser, ResetPassword,
        UpdateProfile, User,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Create an account; a confirmation link is emailed
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Confirm an email address with the emailed token
#[utoipa::path(
    post,
    path = "/auth/confirm-email",
    tag = "auth",
    request_body = ConfirmEmail,
    responses(
        (status = 204, description = "Email confirmed"),
        (status = 400, description = "Invalid or expired token")
    )
)]
pub async fn confirm_email(
    State(state): State<AppState>,
    Json(request): Json<ConfirmEmail>,
) -> AppResult<StatusCode> {
    state.services.users.confirm_email(&request.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Log in with username or email
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials, locked or unconfirmed account")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state
        .services
        .users
        .authenticate(&request.login, &request.password)
        .await?;
    Ok(Json(response))
}

/// Request a password reset link. Always accepted.
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    tag = "auth",
    request_body = ForgotPassword,
    responses(
        (status = 202, description = "Request accepted")
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPassword>,
) -> StatusCode {
    if let Err(e) = state.services.users.forgot_password(&request.email).await {
        tracing::error!(error = %e, "Password reset request failed");
    }
    StatusCode::ACCEPTED
}

/// Choose a new password with a reset token
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    tag = "auth",
    request_body = ResetPassword,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Invalid or expired token")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPassword>,
) -> AppResult<StatusCode> {
    state.services.users.reset_password(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current user
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<User>> {
    let user = state.services.users.get_by_id(claims.user_id).await?;
    Ok(Json(user))
}

/// Update own profile
#[utoipa::path(
    put,
    path = "/auth/profile",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(profile): Json<UpdateProfile>,
) -> AppResult<Json<User>> {
    let user = state.services.users.update_profile(claims.user_id, profile).await?;
    Ok(Json(user))
}

/// Change own password
#[utoipa::path(
    put,
    path = "/auth/password",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = ChangePassword,
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Current password is incorrect")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<ChangePassword>,
) -> AppResult<StatusCode> {
    state.services.users.change_password(claims.user_id, request).await?;
    Ok(StatusCode::NO_CONTENT)
}
