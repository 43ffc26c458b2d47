//! Account actions: createUser, updateUser, searchUsers, getUser, login.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::wire::{
    CreateUserRequest, GetUserRequest, LoginRequest, SearchResponse, SearchUsersRequest, UpdateUserRequest,
    UserPayload, UserResponse, UserView,
};
use crate::clients::{AccountUpdate, NewAccount};
use crate::domain::{AccountFilter, UserAccount};
use crate::error::AppError;
use crate::state::AppState;

/// Creates an account, or replaces one when `user.id` names an existing
/// record (the console saves edits through this action).
///
/// The idempotency key is the `Idempotency-Key` header, else the body's
/// `idempotencyKey`, else the provisional id.
#[instrument(skip_all)]
pub async fn create_user(state: &AppState, body: Value, header_key: Option<String>) -> Result<Response, AppError> {
    let request: CreateUserRequest = serde_json::from_value(body)?;
    let user = request.user;
    let provisional_id = user.id.as_deref().map(str::trim).filter(|id| !id.is_empty()).map(str::to_string);

    if let Some(id) = &provisional_id {
        if state.accounts().get_account(id.clone()).await?.is_some() {
            info!(id = %id, "createUser names an existing account, replacing it");
            return replace(state, user, id.clone()).await;
        }
    }

    let password = user
        .password
        .ok_or_else(|| AppError::Validation("password is required".to_string()))?;
    let new_account = NewAccount {
        name: user.name.unwrap_or_default(),
        email: user.email.unwrap_or_default(),
        phone: user.phone.unwrap_or_default(),
        password,
    };
    let key = header_key.or(request.idempotency_key).or(provisional_id);

    let created = state.accounts().create_account(new_account, key).await?;
    let account = fetch(state, &created.id).await?;

    let (status, message) = if created.replayed {
        (StatusCode::OK, "User already created")
    } else {
        (StatusCode::CREATED, "User created")
    };
    Ok(user_response(status, &account, created.replayed, message))
}

#[instrument(skip_all)]
pub async fn update_user(state: &AppState, body: Value) -> Result<Response, AppError> {
    let request: UpdateUserRequest = serde_json::from_value(body)?;
    let id = request
        .user
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("id is required".to_string()))?;
    replace(state, request.user, id).await
}

#[instrument(skip_all)]
pub async fn search_users(state: &AppState, body: Value) -> Result<Response, AppError> {
    let request: SearchUsersRequest = serde_json::from_value(body)?;
    let filter = AccountFilter::new(
        request.name.as_deref(),
        request.email.as_deref(),
        request.phone.as_deref(),
    );

    let users: Vec<UserView> = state
        .accounts()
        .search_accounts(filter)
        .await?
        .iter()
        .map(UserView::from)
        .collect();

    let message = match users.len() {
        0 => "No matching users".to_string(),
        1 => "1 user found".to_string(),
        n => format!("{n} users found"),
    };
    let count = users.len();
    Ok(Json(SearchResponse {
        ok: true,
        users,
        count,
        message,
    })
    .into_response())
}

#[instrument(skip_all)]
pub async fn get_user(state: &AppState, body: Value) -> Result<Response, AppError> {
    let request: GetUserRequest = serde_json::from_value(body)?;
    let account = fetch(state, request.id.trim()).await?;
    Ok(Json(json!({ "ok": true, "user": UserView::from(&account) })).into_response())
}

#[instrument(skip_all)]
pub async fn login(state: &AppState, body: Value) -> Result<Response, AppError> {
    let request: LoginRequest = serde_json::from_value(body)?;
    let password = request.password.ok_or(AppError::InvalidCredentials)?;
    let account = state.accounts().authenticate(&request.email, password).await?;
    Ok(Json(json!({
        "ok": true,
        "message": "Login succeeded",
        "user": UserView::from(&account),
    }))
    .into_response())
}

async fn replace(state: &AppState, user: UserPayload, id: String) -> Result<Response, AppError> {
    let update = AccountUpdate {
        id,
        name: user.name.unwrap_or_default(),
        email: user.email.unwrap_or_default(),
        phone: user.phone.unwrap_or_default(),
        password: user.password,
        expected_revision: user.revision,
    };
    let account = state.accounts().replace_account(update).await?;
    Ok(user_response(StatusCode::OK, &account, false, "User updated"))
}

async fn fetch(state: &AppState, id: &str) -> Result<UserAccount, AppError> {
    state
        .accounts()
        .get_account(id.to_string())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Account not found: {id}")))
}

fn user_response(status: StatusCode, account: &UserAccount, replayed: bool, message: &str) -> Response {
    let body = UserResponse {
        ok: true,
        id: account.id.clone(),
        revision: account.revision,
        replayed,
        message: message.to_string(),
        user: UserView::from(account),
    };
    (status, Json(body)).into_response()
}
