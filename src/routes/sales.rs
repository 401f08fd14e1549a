use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::sales::{CreateSaleRequest, SaleList, UpdateSaleRequest},
    error::AppResult,
    models::SaleWithProduct,
    response::ApiResponse,
    routes::params::SaleListQuery,
    services::sale_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route(
            "/{id}",
            get(get_sale).put(update_sale).delete(delete_sale),
        )
}

#[utoipa::path(
    get,
    path = "/api/sales",
    params(SaleListQuery),
    responses(
        (status = 200, description = "List sales", body = ApiResponse<SaleList>),
        (status = 422, description = "Unknown status filter"),
    ),
    tag = "Sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<SaleListQuery>,
) -> AppResult<Json<ApiResponse<SaleList>>> {
    let resp = sale_service::list_sales(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/sales/{id}",
    params(
        ("id" = Uuid, Path, description = "Sale ID")
    ),
    responses(
        (status = 200, description = "Get sale", body = ApiResponse<SaleWithProduct>),
        (status = 404, description = "Sale not found"),
    ),
    tag = "Sales"
)]
pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SaleWithProduct>>> {
    let resp = sale_service::get_sale(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/sales",
    request_body = CreateSaleRequest,
    responses(
        (status = 201, description = "Sale recorded, stock reserved", body = ApiResponse<SaleWithProduct>),
        (status = 409, description = "Insufficient stock"),
        (status = 422, description = "Invalid data"),
    ),
    tag = "Sales"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    Json(payload): Json<CreateSaleRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<SaleWithProduct>>)> {
    let resp = sale_service::create_sale(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/sales/{id}",
    params(
        ("id" = Uuid, Path, description = "Sale ID")
    ),
    request_body = UpdateSaleRequest,
    responses(
        (status = 200, description = "Sale updated, stock adjusted", body = ApiResponse<SaleWithProduct>),
        (status = 404, description = "Sale not found"),
        (status = 409, description = "Insufficient stock"),
        (status = 422, description = "Invalid data"),
    ),
    tag = "Sales"
)]
pub async fn update_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSaleRequest>,
) -> AppResult<Json<ApiResponse<SaleWithProduct>>> {
    let resp = sale_service::update_sale(&state, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/sales/{id}",
    params(
        ("id" = Uuid, Path, description = "Sale ID")
    ),
    responses(
        (status = 200, description = "Sale deleted, held units released"),
        (status = 404, description = "Sale not found"),
    ),
    tag = "Sales"
)]
pub async fn delete_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = sale_service::delete_sale(&state, id).await?;
    Ok(Json(resp))
}
