use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::LockType;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, DatabaseTransaction, EntityTrait, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::sales::{
        CreateSaleRequest, NewSale, SaleList, SalePatch, UpdateSaleRequest, sale_total,
    },
    entity::sales::{ActiveModel as SaleActive, Entity as Sales, Model as SaleModel},
    error::{AppError, AppResult},
    models::{Sale, SaleStatus, SaleWithProduct},
    response::{ApiResponse, Meta},
    routes::params::{SaleListQuery, SortOrder},
    services::{
        finish_transaction, product_service::category_name,
        stock_ledger::{self, Holding, find_product_for_update, transition_delta},
    },
    state::AppState,
};

const SALE_SELECT: &str = r#"
    SELECT s.id, s.product_id, s.client, s.quantity, s.unit_price, s.total_price,
           s.status, s.notes, s.created_at, s.updated_at,
           p.name AS product_name, c.name AS category_name
    FROM sales s
    JOIN products p ON p.id = s.product_id
    LEFT JOIN categories c ON c.id = p.category_id
"#;

const SALE_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR s.status = $1)
      AND ($2::date IS NULL OR (s.created_at AT TIME ZONE 'UTC')::date >= $2)
      AND ($3::date IS NULL OR (s.created_at AT TIME ZONE 'UTC')::date <= $3)
"#;

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: Uuid,
    product_id: Uuid,
    client: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    product_name: String,
    category_name: Option<String>,
}

impl TryFrom<SaleRow> for SaleWithProduct {
    type Error = AppError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        Ok(SaleWithProduct {
            sale: Sale {
                id: row.id,
                product_id: row.product_id,
                client: row.client,
                quantity: row.quantity,
                unit_price: row.unit_price,
                total_price: row.total_price,
                status: stored_status(&row.status)?,
                notes: row.notes,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            product_name: row.product_name,
            category_name: row.category_name,
        })
    }
}

pub async fn list_sales(
    state: &AppState,
    query: SaleListQuery,
) -> AppResult<ApiResponse<SaleList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let status = query.status_filter()?.map(|s| s.as_str());
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let sql = format!(
        "{SALE_SELECT} {SALE_FILTER} ORDER BY s.created_at {} LIMIT $4 OFFSET $5",
        sort_order.as_sql()
    );
    let rows = sqlx::query_as::<_, SaleRow>(&sql)
        .bind(status)
        .bind(query.from)
        .bind(query.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;

    let count_sql = format!("SELECT count(*) FROM sales s {SALE_FILTER}");
    let total: (i64,) = sqlx::query_as(&count_sql)
        .bind(status)
        .bind(query.from)
        .bind(query.to)
        .fetch_one(&state.pool)
        .await?;

    let items = rows
        .into_iter()
        .map(SaleWithProduct::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Sales", SaleList { items }, Some(meta)))
}

pub async fn get_sale(state: &AppState, id: Uuid) -> AppResult<ApiResponse<SaleWithProduct>> {
    let sql = format!("{SALE_SELECT} WHERE s.id = $1");
    let row = sqlx::query_as::<_, SaleRow>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let row = match row {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Sale", row.try_into()?, None))
}

pub async fn create_sale(
    state: &AppState,
    payload: CreateSaleRequest,
) -> AppResult<ApiResponse<SaleWithProduct>> {
    let cmd = payload.into_command()?;

    let txn = state.orm.begin().await.map_err(AppError::Transaction)?;
    let result = insert_sale(&txn, cmd).await;
    let created = finish_transaction(txn, result).await?;

    tracing::info!(
        sale_id = %created.sale.id,
        product_id = %created.sale.product_id,
        quantity = created.sale.quantity,
        status = %created.sale.status,
        "sale created"
    );

    Ok(ApiResponse::success(
        "Sale created",
        created,
        Some(Meta::empty()),
    ))
}

pub async fn update_sale(
    state: &AppState,
    id: Uuid,
    payload: UpdateSaleRequest,
) -> AppResult<ApiResponse<SaleWithProduct>> {
    let patch = payload.into_patch()?;

    let txn = state.orm.begin().await.map_err(AppError::Transaction)?;
    let result = apply_patch(&txn, id, patch).await;
    let updated = finish_transaction(txn, result).await?;

    tracing::info!(
        sale_id = %updated.sale.id,
        quantity = updated.sale.quantity,
        status = %updated.sale.status,
        "sale updated"
    );

    Ok(ApiResponse::success(
        "Sale updated",
        updated,
        Some(Meta::empty()),
    ))
}

pub async fn delete_sale(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await.map_err(AppError::Transaction)?;
    let result = remove_sale(&txn, id).await;
    let released = finish_transaction(txn, result).await?;

    tracing::info!(sale_id = %id, released, "sale deleted");

    Ok(ApiResponse::done("Deleted"))
}

async fn insert_sale(txn: &DatabaseTransaction, cmd: NewSale) -> AppResult<SaleWithProduct> {
    let total_price = sale_total(cmd.quantity, cmd.unit_price)?;
    let product = find_product_for_update(txn, cmd.product_id)
        .await?
        .ok_or_else(|| AppError::validation("product_id", "selected product does not exist"))?;
    if !product.active {
        return Err(AppError::validation("product_id", "selected product is inactive"));
    }
    if product.quantity < cmd.quantity {
        return Err(AppError::InsufficientStock {
            available: product.quantity,
        });
    }

    let product = if cmd.status.is_cancelled() {
        product
    } else {
        stock_ledger::reserve(txn, product, cmd.quantity).await?
    };

    let sale = SaleActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        client: Set(cmd.client),
        quantity: Set(cmd.quantity),
        unit_price: Set(cmd.unit_price),
        total_price: Set(total_price),
        status: Set(cmd.status.as_str().to_string()),
        notes: Set(cmd.notes),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(txn)
    .await?;

    let category_name = category_name(txn, product.category_id).await?;
    Ok(SaleWithProduct {
        sale: sale_from_entity(sale)?,
        product_name: product.name,
        category_name,
    })
}

async fn apply_patch(
    txn: &DatabaseTransaction,
    id: Uuid,
    patch: SalePatch,
) -> AppResult<SaleWithProduct> {
    let existing = lock_sale(txn, id).await?;

    let before = Holding::new(stored_status(&existing.status)?, existing.quantity);
    let after = Holding::new(
        patch.status.unwrap_or(before.status),
        patch.quantity.unwrap_or(before.quantity),
    );
    if before.status.is_cancelled() && !after.status.is_cancelled() {
        return Err(AppError::validation(
            "status",
            "a cancelled sale cannot be reopened",
        ));
    }

    // one factor may come from the patch and the other from the stored sale
    let unit_price = patch.unit_price.unwrap_or(existing.unit_price);
    let total_price = sale_total(after.quantity, unit_price)?;

    let product = find_product_for_update(txn, existing.product_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let delta = transition_delta(Some(before), Some(after));
    let product = stock_ledger::adjust(txn, product, delta).await?;

    let mut active: SaleActive = existing.into();
    if let Some(client) = patch.client {
        active.client = Set(client);
    }
    if let Some(notes) = patch.notes {
        active.notes = Set(notes);
    }
    active.quantity = Set(after.quantity);
    active.unit_price = Set(unit_price);
    active.total_price = Set(total_price);
    active.status = Set(after.status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let sale = active.update(txn).await?;

    let category_name = category_name(txn, product.category_id).await?;
    Ok(SaleWithProduct {
        sale: sale_from_entity(sale)?,
        product_name: product.name,
        category_name,
    })
}

/// Returns the number of units put back on the shelf.
async fn remove_sale(txn: &DatabaseTransaction, id: Uuid) -> AppResult<i32> {
    let existing = lock_sale(txn, id).await?;

    let before = Holding::new(stored_status(&existing.status)?, existing.quantity);
    let released = transition_delta(Some(before), None);
    if released > 0 {
        let product = find_product_for_update(txn, existing.product_id)
            .await?
            .ok_or(AppError::NotFound)?;
        stock_ledger::release(txn, product, released).await?;
    }

    Sales::delete_by_id(existing.id).exec(txn).await?;
    Ok(released)
}

async fn lock_sale(txn: &DatabaseTransaction, id: Uuid) -> AppResult<SaleModel> {
    let sale = Sales::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?;
    match sale {
        Some(s) => Ok(s),
        None => Err(AppError::NotFound),
    }
}

fn stored_status(raw: &str) -> AppResult<SaleStatus> {
    raw.parse::<SaleStatus>()
        .map_err(|err| AppError::Internal(err.into()))
}

fn sale_from_entity(model: SaleModel) -> AppResult<Sale> {
    Ok(Sale {
        id: model.id,
        product_id: model.product_id,
        client: model.client,
        quantity: model.quantity,
        unit_price: model.unit_price,
        total_price: model.total_price,
        status: stored_status(&model.status)?,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
