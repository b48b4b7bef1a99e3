//! Account API handlers
//!
//! Handles endpoints related to account management:
//! - Create account
//! - Get account details
//! - Get account balances
//! - Deposit and withdraw funds

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::decimal::Amount;
use common::model::account::{Account, Balance};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::caller::{ApiJson, Caller};
use crate::api::response::{ApiListResponse, ApiResponse};
use crate::error::ApiResult;
use crate::AppState;

/// Deposit or withdrawal request
#[derive(Debug, Deserialize, ToSchema)]
pub struct FundsRequest {
    /// Asset symbol, e.g. "USDT"
    pub asset: String,
    /// Amount; for withdrawals this includes the asset's withdrawal fee
    pub amount: Amount,
}

/// Create a new account
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    responses(
        (status = 201, description = "Account successfully created", body = Account),
        (status = 500, description = "Internal server error")
    ),
    tag = "account"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
) -> ApiResult<(StatusCode, ApiResponse<Account>)> {
    let account = state.exchange.create_account().await?;
    Ok((StatusCode::CREATED, ApiResponse::new(account)))
}

/// Get an account by ID
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    params(
        ("id" = Uuid, Path, description = "Account ID"),
        ("x-user-id" = Uuid, Header, description = "Caller account ID")
    ),
    responses(
        (status = 200, description = "Account details retrieved successfully", body = Account),
        (status = 403, description = "Caller may not read this account"),
        (status = 404, description = "Account not found")
    ),
    tag = "account"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Account>> {
    caller.require_access(&state, id)?;
    Ok(ApiResponse::new(state.exchange.get_account(id).await?))
}

/// Get all balances for an account
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}/balances",
    params(
        ("id" = Uuid, Path, description = "Account ID"),
        ("x-user-id" = Uuid, Header, description = "Caller account ID")
    ),
    responses(
        (status = 200, description = "Balances retrieved successfully", body = [Balance]),
        (status = 403, description = "Caller may not read this account"),
        (status = 404, description = "Account not found")
    ),
    tag = "account"
)]
pub async fn get_balances(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiListResponse<Balance>> {
    caller.require_access(&state, id)?;
    Ok(ApiListResponse::new(state.exchange.balances(id).await?))
}

/// Deposit funds into an account
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{id}/deposit",
    params(
        ("id" = Uuid, Path, description = "Account ID"),
        ("x-user-id" = Uuid, Header, description = "Caller account ID")
    ),
    request_body = FundsRequest,
    responses(
        (status = 200, description = "Deposit credited", body = Balance),
        (status = 400, description = "Invalid amount or asset"),
        (status = 404, description = "Account not found")
    ),
    tag = "account"
)]
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<FundsRequest>,
) -> ApiResult<ApiResponse<Balance>> {
    caller.require_access(&state, id)?;
    let balance = state.exchange.deposit(id, &request.asset, request.amount).await?;
    Ok(ApiResponse::new(balance))
}

/// Withdraw funds from an account
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{id}/withdraw",
    params(
        ("id" = Uuid, Path, description = "Account ID"),
        ("x-user-id" = Uuid, Header, description = "Caller account ID")
    ),
    request_body = FundsRequest,
    responses(
        (status = 200, description = "Withdrawal debited", body = Balance),
        (status = 400, description = "Insufficient balance or invalid amount"),
        (status = 403, description = "Account is not KYC verified")
    ),
    tag = "account"
)]
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<FundsRequest>,
) -> ApiResult<ApiResponse<Balance>> {
    // Only the owner can move funds out
    if caller.0 != id {
        return Err(crate::error::ApiError::Forbidden(format!("No access to account {}", id)));
    }
    let balance = state.exchange.withdraw(id, &request.asset, request.amount).await?;
    Ok(ApiResponse::new(balance))
}
