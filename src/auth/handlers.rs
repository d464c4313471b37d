use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AuthResponse, CreateUserRequest, ListUsersParams, LoginRequest, PublicUser,
            RegisterRequest, RegisterResponse, VerifyOtpRequest,
        },
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
        repo::{Role, User},
        services::is_valid_email,
    },
    error::ApiError,
    otp::{self, OtpCheck},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/me", get(me))
        .route("/auth/users", post(create_user).get(list_users))
        .route("/auth/users/:id", delete(delete_user))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    let name = payload.name.trim().to_string();

    if name.is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "please provide name, email and password".into(),
        ));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("invalid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    if payload.role.is_some_and(|r| r != Role::Participant) {
        return Err(ApiError::Validation(
            "only the Participant role is allowed for public registration; \
             admins and team heads are added by administrators"
                .into(),
        ));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        &name,
        &payload.email,
        &hash,
        Role::Participant,
        false,
    )
    .await?;

    let code = otp::generate_code();
    state
        .otp
        .put(
            &user.email,
            code.clone(),
            Duration::minutes(state.config.otp_ttl_minutes),
        )
        .await;

    // An unverifiable account is useless, so a failed verification dispatch
    // is the one side effect that rolls the mutation back.
    if let Err(e) = state
        .notifier
        .send_verification_code(&user.email, &user.name, &code)
        .await
    {
        error!(error = %e, email = %user.email, "verification dispatch failed; rolling back registration");
        state.otp.remove(&user.email).await;
        User::delete(&state.db, user.id).await?;
        return Err(ApiError::Internal(anyhow::anyhow!(
            "failed to send verification email; please try again"
        )));
    }

    info!(user_id = %user.id, email = %user.email, "user registered, verification pending");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            email: user.email,
            requires_verification: true,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(mut payload): Json<VerifyOtpRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    if payload.email.is_empty() || payload.otp.is_empty() {
        return Err(ApiError::Validation("please provide email and OTP".into()));
    }

    match state.otp.check(&payload.email, &payload.otp).await {
        OtpCheck::Valid => {}
        OtpCheck::Expired => return Err(ApiError::Validation("OTP has expired".into())),
        OtpCheck::Mismatch => return Err(ApiError::Validation("invalid OTP".into())),
        OtpCheck::Missing => {
            return Err(ApiError::Validation("OTP not found or expired".into()))
        }
    }

    let mut user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    User::mark_verified(&state.db, user.id).await?;
    user.is_verified = true;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, user.role)?;

    info!(user_id = %user.id, email = %user.email, "email verified");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "please provide email and password".into(),
        ));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::Unauthorized("invalid credentials".into())
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("invalid credentials".into()));
    }

    if !user.is_verified {
        return Err(ApiError::Forbidden(
            "please verify your email first; check your inbox for the OTP".into(),
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, user.role)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find(&state.db, actor.id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(mut payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    actor.require(&[Role::Admin])?;

    payload.email = payload.email.trim().to_lowercase();
    let name = payload.name.trim().to_string();

    if name.is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "please provide name, email, password and role".into(),
        ));
    }
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("invalid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    if payload.role == Role::Participant {
        return Err(ApiError::Validation(
            "only Admin and Team_Head accounts can be created through this endpoint".into(),
        ));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        return Err(ApiError::Conflict("email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    // Added by an admin, so the account starts out verified.
    let user = User::create(&state.db, &name, &payload.email, &hash, payload.role, true).await?;

    info!(user_id = %user.id, role = %user.role, created_by = %actor.id, "staff account created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    actor.require(&[Role::Admin])?;
    let users = User::list_staff(&state.db, params.role).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    actor.require(&[Role::Admin])?;

    let user = User::find(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    if user.id == actor.id {
        return Err(ApiError::Validation(
            "you cannot delete your own account".into(),
        ));
    }
    if user.role == Role::Participant {
        return Err(ApiError::Validation(
            "only Admin and Team_Head accounts can be deleted through this endpoint".into(),
        ));
    }

    match User::delete_guarded(&state.db, id).await? {
        Some(role) => {
            info!(user_id = %id, role = %role, deleted_by = %actor.id, "user deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        // The guard refused: either the row vanished concurrently or it was
        // the last remaining admin.
        None => match User::find(&state.db, id).await? {
            Some(_) => Err(ApiError::Validation(
                "cannot delete the last remaining admin".into(),
            )),
            None => Err(ApiError::NotFound("user")),
        },
    }
}
