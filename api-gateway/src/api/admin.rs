//! Admin console API handlers
//!
//! Plain resources (assets, fee configs, ads, insurance plans, lucky draws)
//! share one set of generic CRUD handlers; `resource_api!` gives each type a
//! documented module of routes over them. Markets go through the exchange so
//! their order books open and close with them.

use std::fmt::Debug;
use std::sync::Arc;

use admin_service::Resource;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use common::model::account::{Account, KycStatus};
use common::model::admin::{Ad, Asset, FeeConfig, InsurancePlan, LuckyDraw};
use common::model::audit::{AuditEntry, AuditFilter};
use common::model::market::Market;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::caller::{AdminCaller, ApiJson};
use crate::api::response::{ApiListResponse, ApiResponse};
use crate::error::ApiResult;
use crate::AppState;

async fn list_resources<T: Resource + Debug>(
    State(state): State<Arc<AppState>>,
    _admin: AdminCaller,
) -> ApiResult<ApiListResponse<T>> {
    Ok(ApiListResponse::new(state.exchange.admin().list::<T>()))
}

async fn get_resource<T: Resource + Debug>(
    State(state): State<Arc<AppState>>,
    _admin: AdminCaller,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<T>> {
    Ok(ApiResponse::new(state.exchange.admin().get::<T>(id)?))
}

async fn create_resource<T: Resource + Debug>(
    State(state): State<Arc<AppState>>,
    AdminCaller(actor): AdminCaller,
    ApiJson(item): ApiJson<T>,
) -> ApiResult<(StatusCode, ApiResponse<T>)> {
    let created = state.exchange.admin().create(actor, item).await?;
    Ok((StatusCode::CREATED, ApiResponse::new(created)))
}

async fn update_resource<T: Resource + Debug>(
    State(state): State<Arc<AppState>>,
    AdminCaller(actor): AdminCaller,
    Path(id): Path<Uuid>,
    ApiJson(item): ApiJson<T>,
) -> ApiResult<ApiResponse<T>> {
    Ok(ApiResponse::new(state.exchange.admin().update(actor, id, item).await?))
}

async fn delete_resource<T: Resource + Debug>(
    State(state): State<Arc<AppState>>,
    AdminCaller(actor): AdminCaller,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<T>> {
    Ok(ApiResponse::new(state.exchange.admin().delete::<T>(actor, id).await?))
}

/// CRUD routes for one resource type, each handler documented for OpenAPI.
/// Arguments: module, type, operation suffix, router paths, document paths.
macro_rules! resource_api {
    ($module:ident, $ty:ident, $name:tt, $route:tt, $item_route:tt, $path:tt, $item_path:tt) => {
        pub mod $module {
            use super::*;

            /// Add the list/create and get/update/delete routes
            pub fn routes(router: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
                router
                    .route($route, get(list).post(create))
                    .route($item_route, get(fetch).put(update).delete(remove))
            }

            #[utoipa::path(
                get,
                path = $path,
                operation_id = concat!("list_", $name),
                params(("x-user-id" = Uuid, Header, description = "Administrator account ID")),
                responses(
                    (status = 200, description = "Every record", body = [$ty]),
                    (status = 403, description = "Caller is not an administrator", body = ErrorResponse)
                ),
                tag = "admin"
            )]
            pub async fn list(state: State<Arc<AppState>>, admin: AdminCaller) -> ApiResult<ApiListResponse<$ty>> {
                list_resources::<$ty>(state, admin).await
            }

            #[utoipa::path(
                post,
                path = $path,
                operation_id = concat!("create_", $name),
                params(("x-user-id" = Uuid, Header, description = "Administrator account ID")),
                request_body = $ty,
                responses(
                    (status = 201, description = "Record created and audited", body = $ty),
                    (status = 400, description = "Invalid record", body = ErrorResponse),
                    (status = 403, description = "Caller is not an administrator", body = ErrorResponse)
                ),
                tag = "admin"
            )]
            pub async fn create(
                state: State<Arc<AppState>>,
                admin: AdminCaller,
                item: ApiJson<$ty>,
            ) -> ApiResult<(StatusCode, ApiResponse<$ty>)> {
                create_resource::<$ty>(state, admin, item).await
            }

            #[utoipa::path(
                get,
                path = $item_path,
                operation_id = concat!("get_", $name),
                params(
                    ("id" = Uuid, Path, description = "Record ID"),
                    ("x-user-id" = Uuid, Header, description = "Administrator account ID")
                ),
                responses(
                    (status = 200, description = "The record", body = $ty),
                    (status = 404, description = "No record with this ID", body = ErrorResponse)
                ),
                tag = "admin"
            )]
            pub async fn fetch(
                state: State<Arc<AppState>>,
                admin: AdminCaller,
                id: Path<Uuid>,
            ) -> ApiResult<ApiResponse<$ty>> {
                get_resource::<$ty>(state, admin, id).await
            }

            #[utoipa::path(
                put,
                path = $item_path,
                operation_id = concat!("update_", $name),
                params(
                    ("id" = Uuid, Path, description = "Record ID"),
                    ("x-user-id" = Uuid, Header, description = "Administrator account ID")
                ),
                request_body = $ty,
                responses(
                    (status = 200, description = "Record updated and audited", body = $ty),
                    (status = 400, description = "Invalid record", body = ErrorResponse),
                    (status = 404, description = "No record with this ID", body = ErrorResponse)
                ),
                tag = "admin"
            )]
            pub async fn update(
                state: State<Arc<AppState>>,
                admin: AdminCaller,
                id: Path<Uuid>,
                item: ApiJson<$ty>,
            ) -> ApiResult<ApiResponse<$ty>> {
                update_resource::<$ty>(state, admin, id, item).await
            }

            #[utoipa::path(
                delete,
                path = $item_path,
                operation_id = concat!("delete_", $name),
                params(
                    ("id" = Uuid, Path, description = "Record ID"),
                    ("x-user-id" = Uuid, Header, description = "Administrator account ID")
                ),
                responses(
                    (status = 200, description = "Record deleted and audited", body = $ty),
                    (status = 404, description = "No record with this ID", body = ErrorResponse)
                ),
                tag = "admin"
            )]
            pub async fn remove(
                state: State<Arc<AppState>>,
                admin: AdminCaller,
                id: Path<Uuid>,
            ) -> ApiResult<ApiResponse<$ty>> {
                delete_resource::<$ty>(state, admin, id).await
            }
        }
    };
}

resource_api!(assets, Asset, "asset", "/admin/assets", "/admin/assets/:id",
    "/api/v1/admin/assets", "/api/v1/admin/assets/{id}");
resource_api!(fee_configs, FeeConfig, "fee_config", "/admin/fee-configs", "/admin/fee-configs/:id",
    "/api/v1/admin/fee-configs", "/api/v1/admin/fee-configs/{id}");
resource_api!(ads, Ad, "ad", "/admin/ads", "/admin/ads/:id",
    "/api/v1/admin/ads", "/api/v1/admin/ads/{id}");
resource_api!(insurance_plans, InsurancePlan, "insurance_plan", "/admin/insurance-plans", "/admin/insurance-plans/:id",
    "/api/v1/admin/insurance-plans", "/api/v1/admin/insurance-plans/{id}");
resource_api!(lucky_draws, LuckyDraw, "lucky_draw", "/admin/lucky-draws", "/admin/lucky-draws/:id",
    "/api/v1/admin/lucky-draws", "/api/v1/admin/lucky-draws/{id}");

/// List every market
#[utoipa::path(
    get,
    path = "/api/v1/admin/markets",
    params(("x-user-id" = Uuid, Header, description = "Administrator account ID")),
    responses(
        (status = 200, description = "Every market, enabled or not", body = [Market]),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn list_markets(state: State<Arc<AppState>>, admin: AdminCaller) -> ApiResult<ApiListResponse<Market>> {
    list_resources::<Market>(state, admin).await
}

/// One market by ID
#[utoipa::path(
    get,
    path = "/api/v1/admin/markets/{id}",
    params(
        ("id" = Uuid, Path, description = "Market ID"),
        ("x-user-id" = Uuid, Header, description = "Administrator account ID")
    ),
    responses(
        (status = 200, description = "The market", body = Market),
        (status = 404, description = "Market not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn get_market(state: State<Arc<AppState>>, admin: AdminCaller, id: Path<Uuid>) -> ApiResult<ApiResponse<Market>> {
    get_resource::<Market>(state, admin, id).await
}

/// List a new market
#[utoipa::path(
    post,
    path = "/api/v1/admin/markets",
    params(("x-user-id" = Uuid, Header, description = "Administrator account ID")),
    request_body = Market,
    responses(
        (status = 201, description = "Market created and opened for trading", body = Market),
        (status = 400, description = "Invalid market or duplicate symbol", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn create_market(
    State(state): State<Arc<AppState>>,
    AdminCaller(actor): AdminCaller,
    ApiJson(market): ApiJson<Market>,
) -> ApiResult<(StatusCode, ApiResponse<Market>)> {
    let created = state.exchange.create_market(actor, market).await?;
    Ok((StatusCode::CREATED, ApiResponse::new(created)))
}

/// Change a market's trading parameters
#[utoipa::path(
    put,
    path = "/api/v1/admin/markets/{id}",
    params(
        ("id" = Uuid, Path, description = "Market ID"),
        ("x-user-id" = Uuid, Header, description = "Administrator account ID")
    ),
    request_body = Market,
    responses(
        (status = 200, description = "Market updated", body = Market),
        (status = 400, description = "Invalid market or symbol change", body = ErrorResponse),
        (status = 404, description = "Market not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn update_market(
    State(state): State<Arc<AppState>>,
    AdminCaller(actor): AdminCaller,
    Path(id): Path<Uuid>,
    ApiJson(market): ApiJson<Market>,
) -> ApiResult<ApiResponse<Market>> {
    Ok(ApiResponse::new(state.exchange.update_market(actor, id, market).await?))
}

/// Delist a market without open orders
#[utoipa::path(
    delete,
    path = "/api/v1/admin/markets/{id}",
    params(
        ("id" = Uuid, Path, description = "Market ID"),
        ("x-user-id" = Uuid, Header, description = "Administrator account ID")
    ),
    responses(
        (status = 200, description = "Market deleted", body = Market),
        (status = 400, description = "Market still has open orders", body = ErrorResponse),
        (status = 404, description = "Market not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn delete_market(
    State(state): State<Arc<AppState>>,
    AdminCaller(actor): AdminCaller,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Market>> {
    Ok(ApiResponse::new(state.exchange.delete_market(actor, id).await?))
}

/// KYC status change request
#[derive(Debug, Deserialize, ToSchema)]
pub struct KycRequest {
    pub status: KycStatus,
}

/// Set the KYC status of an account
#[utoipa::path(
    put,
    path = "/api/v1/admin/accounts/{id}/kyc",
    params(
        ("id" = Uuid, Path, description = "Account ID"),
        ("x-user-id" = Uuid, Header, description = "Administrator account ID")
    ),
    request_body = KycRequest,
    responses(
        (status = 200, description = "KYC status updated", body = Account),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn set_kyc_status(
    State(state): State<Arc<AppState>>,
    AdminCaller(actor): AdminCaller,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<KycRequest>,
) -> ApiResult<ApiResponse<Account>> {
    let account = state.exchange.set_kyc_status(actor, id, request.status).await?;
    Ok(ApiResponse::new(account))
}

/// Query the audit log, newest first
#[utoipa::path(
    get,
    path = "/api/v1/admin/audit-logs",
    params(
        ("resource_type" = Option<String>, Query, description = "e.g. market, asset, account"),
        ("resource_id" = Option<String>, Query, description = "ID of the changed resource"),
        ("actor_id" = Option<Uuid>, Query, description = "Administrator who made the change"),
        ("limit" = Option<usize>, Query, description = "Maximum number of entries"),
        ("x-user-id" = Uuid, Header, description = "Administrator account ID")
    ),
    responses(
        (status = 200, description = "Audit entries", body = [AuditEntry]),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn audit_logs(
    State(state): State<Arc<AppState>>,
    _admin: AdminCaller,
    Query(filter): Query<AuditFilter>,
) -> ApiResult<ApiListResponse<AuditEntry>> {
    Ok(ApiListResponse::new(state.exchange.admin().audit_logs(&filter).await?))
}
