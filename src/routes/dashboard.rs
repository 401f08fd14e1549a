use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    error::AppResult,
    response::ApiResponse,
    routes::params::{DashboardQuery, SummaryQuery},
    services::{
        dashboard_service,
        reporting::{Dashboard, SalesSummary},
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_dashboard))
        .route("/sales-summary", get(get_sales_summary))
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard payload", body = ApiResponse<Dashboard>)
    ),
    tag = "Dashboard"
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<ApiResponse<Dashboard>>> {
    let resp = dashboard_service::get_dashboard(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/sales-summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Sales summary for a period", body = ApiResponse<SalesSummary>)
    ),
    tag = "Dashboard"
)]
pub async fn get_sales_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<ApiResponse<SalesSummary>>> {
    let resp = dashboard_service::get_sales_summary(&state, query).await?;
    Ok(Json(resp))
}
