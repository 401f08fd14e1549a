use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
    models::{Period, SaleStatus},
    response::{ApiResponse, Meta},
    routes::params::{DashboardQuery, SummaryQuery},
    services::reporting::{
        self, CategoryCount, Dashboard, DashboardSnapshot, DayValue, LOW_STOCK_THRESHOLD,
        ProductUnits, RECENT_ACTIVITY_LIMIT, RecentSale, SalesSummary, SalesTotals, StatusTotals,
        StockCounts, TOP_SELLERS_LIMIT, TRAILING_DAYS,
    },
    state::AppState,
};

#[derive(Debug, sqlx::FromRow)]
struct TotalsRow {
    count: i64,
    value: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct RecentSaleRow {
    id: Uuid,
    product_name: String,
    client: String,
    total_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct StatusRow {
    status: String,
    count: i64,
    value: Decimal,
}

impl TryFrom<RecentSaleRow> for RecentSale {
    type Error = AppError;

    fn try_from(row: RecentSaleRow) -> Result<Self, Self::Error> {
        Ok(RecentSale {
            id: row.id,
            product_name: row.product_name,
            client: row.client,
            total_price: row.total_price,
            status: parse_status(&row.status)?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<StatusRow> for StatusTotals {
    type Error = AppError;

    fn try_from(row: StatusRow) -> Result<Self, Self::Error> {
        Ok(StatusTotals {
            status: parse_status(&row.status)?,
            count: row.count,
            value: row.value,
        })
    }
}

pub async fn get_dashboard(
    state: &AppState,
    query: DashboardQuery,
) -> AppResult<ApiResponse<Dashboard>> {
    let now = Utc::now();
    let pool = &state.pool;

    let (today_start, today_end) = reporting::period_window(Period::Today, now);
    let (month_start, month_end) = reporting::period_window(Period::ThisMonth, now);
    let snapshot = DashboardSnapshot {
        stock: stock_counts(pool).await?,
        category_count: category_count(pool).await?,
        today: live_totals(pool, today_start, today_end).await?,
        month: live_totals(pool, month_start, month_end).await?,
        recent: recent_sales(pool).await?,
        product_units: product_units(pool).await?,
        category_counts: category_counts(pool).await?,
        daily_values: daily_values(pool, reporting::trailing_start(now, TRAILING_DAYS)).await?,
    };

    tracing::debug!(
        today_sales = snapshot.today.count,
        month_sales = snapshot.month.count,
        "dashboard computed"
    );

    let dashboard = reporting::build_dashboard(
        snapshot,
        now,
        query.include_uncategorized.unwrap_or(false),
    );
    Ok(ApiResponse::success(
        "Dashboard",
        dashboard,
        Some(Meta::empty()),
    ))
}

pub async fn get_sales_summary(
    state: &AppState,
    query: SummaryQuery,
) -> AppResult<ApiResponse<SalesSummary>> {
    let window = query
        .period
        .map(|period| reporting::period_window(period, Utc::now()));

    let rows = sqlx::query_as::<_, StatusRow>(
        r#"
        SELECT status, count(*) AS count, coalesce(sum(total_price), 0) AS value
        FROM sales
        WHERE ($1::timestamptz IS NULL OR created_at >= $1)
          AND ($2::timestamptz IS NULL OR created_at < $2)
        GROUP BY status
        "#,
    )
    .bind(window.map(|(start, _)| start))
    .bind(window.map(|(_, end)| end))
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(StatusTotals::try_from)
    .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Sales summary",
        reporting::summarize(&rows),
        Some(Meta::empty()),
    ))
}

async fn stock_counts(pool: &DbPool) -> AppResult<StockCounts> {
    let (active_products, low_stock): (i64, i64) = sqlx::query_as(
        r#"
        SELECT count(*) FILTER (WHERE active),
               count(*) FILTER (WHERE active AND quantity < $1)
        FROM products
        "#,
    )
    .bind(LOW_STOCK_THRESHOLD)
    .fetch_one(pool)
    .await?;
    Ok(StockCounts {
        active_products,
        low_stock,
    })
}

async fn category_count(pool: &DbPool) -> AppResult<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM categories")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

async fn live_totals(
    pool: &DbPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<SalesTotals> {
    let row = sqlx::query_as::<_, TotalsRow>(
        r#"
        SELECT count(*) AS count, coalesce(sum(total_price), 0) AS value
        FROM sales
        WHERE status <> 'cancelled' AND created_at >= $1 AND created_at < $2
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;
    Ok(SalesTotals {
        count: row.count,
        value: row.value,
    })
}

async fn recent_sales(pool: &DbPool) -> AppResult<Vec<RecentSale>> {
    sqlx::query_as::<_, RecentSaleRow>(
        r#"
        SELECT s.id, p.name AS product_name, s.client, s.total_price, s.status, s.created_at
        FROM sales s
        JOIN products p ON p.id = s.product_id
        ORDER BY s.created_at DESC
        LIMIT $1
        "#,
    )
    .bind(RECENT_ACTIVITY_LIMIT as i64)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(RecentSale::try_from)
    .collect()
}

async fn product_units(pool: &DbPool) -> AppResult<Vec<ProductUnits>> {
    let rows: Vec<(Uuid, String, i64)> = sqlx::query_as(
        r#"
        SELECT p.id, p.name, sum(s.quantity)::bigint AS units
        FROM sales s
        JOIN products p ON p.id = s.product_id
        WHERE s.status <> 'cancelled'
        GROUP BY p.id, p.name
        ORDER BY units DESC, p.name ASC
        LIMIT $1
        "#,
    )
    .bind(TOP_SELLERS_LIMIT as i64)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(product_id, name, units)| ProductUnits {
            product_id,
            name,
            units,
        })
        .collect())
}

async fn category_counts(pool: &DbPool) -> AppResult<Vec<CategoryCount>> {
    let rows: Vec<(Option<String>, i64)> = sqlx::query_as(
        r#"
        SELECT c.name, count(*)
        FROM sales s
        JOIN products p ON p.id = s.product_id
        LEFT JOIN categories c ON c.id = p.category_id
        WHERE s.status <> 'cancelled'
        GROUP BY c.name
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(category, total)| CategoryCount { category, total })
        .collect())
}

async fn daily_values(pool: &DbPool, since: DateTime<Utc>) -> AppResult<Vec<DayValue>> {
    let rows: Vec<(NaiveDate, Decimal)> = sqlx::query_as(
        r#"
        SELECT (created_at AT TIME ZONE 'UTC')::date AS day, sum(total_price)
        FROM sales
        WHERE status <> 'cancelled' AND created_at >= $1 AND created_at < $2
        GROUP BY day
        "#,
    )
    .bind(since)
    .bind(since + Duration::days(TRAILING_DAYS))
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(date, value)| DayValue { date, value })
        .collect())
}

fn parse_status(raw: &str) -> AppResult<SaleStatus> {
    raw.parse::<SaleStatus>()
        .map_err(|err| AppError::Internal(err.into()))
}
