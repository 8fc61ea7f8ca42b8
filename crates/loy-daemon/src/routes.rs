//! User API route handlers.
//!
//! Status-code contract follows the original service:
//! - register: 200 ok, 409 login taken
//! - login: 200 ok, 401 bad credentials
//! - submit order: 202 accepted, 200 already submitted by this user,
//!   409 owned by another user, 422 bad checksum
//! - withdraw: 200 ok, 402 insufficient funds, 422 bad checksum/amount
//! - list endpoints: 200 with a body, 204 when empty
//!
//! Handlers stay thin: checksum validation happens before any storage call,
//! and every storage outcome is a [`RepoError`] mapped to a status here.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use loy_db::RepoError;
use tracing::warn;
use uuid::Uuid;

use crate::api_types::{
    BalanceView, Credentials, OrderView, SessionResponse, WithdrawRequest, WithdrawalView,
};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/user/register", post(register))
        .route("/api/user/login", post(login))
        .route("/api/user/orders", post(submit_order).get(list_orders))
        .route("/api/user/balance", get(balance))
        .route("/api/user/balance/withdraw", post(withdraw))
        .route("/api/user/withdrawals", get(withdrawals))
        .with_state(state)
}

/// Resolve the bearer session token to a user id, or 401.
async fn auth_user(state: &AppState, headers: &HeaderMap) -> Result<i64, StatusCode> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    state
        .session_user(token)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)
}

fn internal(e: RepoError) -> Response {
    warn!(error = %e, "storage failure surfaced to API");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    Json(&state.build).into_response()
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(creds): Json<Credentials>,
) -> Response {
    match state.repo.create_user(&creds.login, &creds.password).await {
        Ok(user) => {
            let token = state.issue_session(user.id).await;
            Json(SessionResponse {
                token: token.to_string(),
            })
            .into_response()
        }
        Err(RepoError::AlreadyExists) => {
            (StatusCode::CONFLICT, "login already exists").into_response()
        }
        Err(e) => internal(e),
    }
}

async fn login(State(state): State<Arc<AppState>>, Json(creds): Json<Credentials>) -> Response {
    match state.repo.user_by_login(&creds.login).await {
        // Credentials are opaque strings; no hashing scheme is prescribed.
        Ok(user) if user.password == creds.password => {
            let token = state.issue_session(user.id).await;
            Json(SessionResponse {
                token: token.to_string(),
            })
            .into_response()
        }
        Ok(_) | Err(RepoError::BadCredentials) => StatusCode::UNAUTHORIZED.into_response(),
        Err(e) => internal(e),
    }
}

async fn submit_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let user_id = match auth_user(&state, &headers).await {
        Ok(id) => id,
        Err(code) => return code.into_response(),
    };

    let number = body.trim();
    if !loy_luhn::is_valid(number) {
        return (StatusCode::UNPROCESSABLE_ENTITY, "bad order number").into_response();
    }

    match state.repo.create_order(user_id, number).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(RepoError::AlreadyExists) => StatusCode::OK.into_response(),
        Err(RepoError::Conflict) => {
            (StatusCode::CONFLICT, "order already loaded by another user").into_response()
        }
        Err(e) => internal(e),
    }
}

async fn list_orders(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let user_id = match auth_user(&state, &headers).await {
        Ok(id) => id,
        Err(code) => return code.into_response(),
    };

    match state.repo.orders_for_user(user_id).await {
        Ok(orders) if orders.is_empty() => StatusCode::NO_CONTENT.into_response(),
        Ok(orders) => {
            let views: Vec<OrderView> = orders.into_iter().map(Into::into).collect();
            Json(views).into_response()
        }
        Err(e) => internal(e),
    }
}

async fn balance(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let user_id = match auth_user(&state, &headers).await {
        Ok(id) => id,
        Err(code) => return code.into_response(),
    };

    match state.repo.balance_of(user_id).await {
        Ok(b) => Json(BalanceView::from(b)).into_response(),
        Err(e) => internal(e),
    }
}

async fn withdraw(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<WithdrawRequest>,
) -> Response {
    let user_id = match auth_user(&state, &headers).await {
        Ok(id) => id,
        Err(code) => return code.into_response(),
    };

    if !loy_luhn::is_valid(&req.order) {
        return (StatusCode::UNPROCESSABLE_ENTITY, "bad order number").into_response();
    }
    let amount = req.sum_cents();
    if !amount.is_positive() {
        return (StatusCode::UNPROCESSABLE_ENTITY, "bad amount").into_response();
    }

    match state.repo.debit_balance(user_id, &req.order, amount).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(RepoError::InsufficientFunds) => {
            (StatusCode::PAYMENT_REQUIRED, "not enough balance").into_response()
        }
        Err(e) => internal(e),
    }
}

async fn withdrawals(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let user_id = match auth_user(&state, &headers).await {
        Ok(id) => id,
        Err(code) => return code.into_response(),
    };

    match state.repo.withdrawals_for_user(user_id).await {
        Ok(bills) if bills.is_empty() => StatusCode::NO_CONTENT.into_response(),
        Ok(bills) => {
            let views: Vec<WithdrawalView> = bills.into_iter().map(Into::into).collect();
            Json(views).into_response()
        }
        Err(e) => internal(e),
    }
}
