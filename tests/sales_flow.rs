use axum_inventory_api::{
    db::{create_pool, run_migrations},
    dto::{
        categories::CreateCategoryRequest,
        products::CreateProductRequest,
        sales::{CreateSaleRequest, UpdateSaleRequest},
    },
    error::AppError,
    models::{MAX_PRICE, SaleStatus, SaleWithProduct},
    services::{category_service, product_service, sale_service},
    state::AppState,
};
use rust_decimal::Decimal;
use uuid::Uuid;

// Stock follows each sale through create, cancel, edit and delete.
#[tokio::test]
async fn sale_lifecycle_keeps_stock_consistent() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let category = category_service::create_category(
        &state,
        CreateCategoryRequest {
            name: Some("Kitchen".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    let product_id = create_product(&state, "MUG-1", Some(category.id.to_string()), 20).await?;

    let sale = create_sale(&state, product_id, 5, "pending").await?;
    assert_eq!(sale.sale.total_price, Decimal::new(6250, 2));
    assert_eq!(sale.category_name.as_deref(), Some("Kitchen"));
    assert_eq!(stock(&state, product_id).await?, 15);

    let cancelled = sale_service::update_sale(
        &state,
        sale.sale.id,
        UpdateSaleRequest {
            status: Some("cancelled".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cancelled.sale.status, SaleStatus::Cancelled);
    assert_eq!(stock(&state, product_id).await?, 20);

    sale_service::delete_sale(&state, sale.sale.id).await?;
    assert_eq!(stock(&state, product_id).await?, 20);

    Ok(())
}

#[tokio::test]
async fn quantity_edit_moves_only_the_difference() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, "PEN-1", None, 10).await?;

    let sale = create_sale(&state, product_id, 3, "concluded").await?;
    assert_eq!(stock(&state, product_id).await?, 7);

    let updated = sale_service::update_sale(
        &state,
        sale.sale.id,
        UpdateSaleRequest {
            quantity: Some(5),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.sale.quantity, 5);
    assert_eq!(updated.sale.total_price, Decimal::new(6250, 2));
    assert_eq!(stock(&state, product_id).await?, 5);

    let err = sale_service::update_sale(
        &state,
        sale.sale.id,
        UpdateSaleRequest {
            quantity: Some(50),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { available: 5 }));
    assert_eq!(stock(&state, product_id).await?, 5);
    let kept = sale_service::get_sale(&state, sale.sale.id).await?.data.unwrap();
    assert_eq!(kept.sale.quantity, 5);
    assert_eq!(kept.sale.total_price, Decimal::new(6250, 2));

    sale_service::delete_sale(&state, sale.sale.id).await?;
    assert_eq!(stock(&state, product_id).await?, 10);

    Ok(())
}

#[tokio::test]
async fn rejected_sales_leave_no_trace() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, "CUP-1", None, 2).await?;

    let err = create_sale(&state, product_id, 3, "pending").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::InsufficientStock { available: 2 })
    ));
    assert_eq!(stock(&state, product_id).await?, 2);

    let sale = create_sale(&state, product_id, 1, "cancelled").await?;
    assert_eq!(stock(&state, product_id).await?, 2);

    let err = sale_service::update_sale(
        &state,
        sale.sale.id,
        UpdateSaleRequest {
            status: Some("pending".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    match err {
        AppError::Validation(fields) => assert!(fields.contains("status")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(stock(&state, product_id).await?, 2);

    let missing = sale_service::delete_sale(&state, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(missing, AppError::NotFound));

    Ok(())
}

// The sale row write fails after the ledger already moved stock.
#[tokio::test]
async fn failed_sale_write_rolls_back_stock() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, "BOWL-1", None, 10).await?;
    let sale = create_sale(&state, product_id, 2, "pending").await?;
    assert_eq!(stock(&state, product_id).await?, 8);

    // only rows with this client name trip the constraint
    let tag = Uuid::new_v4().simple().to_string();
    let blocked = format!("blocked-{tag}");
    sqlx::query(&format!(
        "ALTER TABLE sales ADD CONSTRAINT reject_{tag} CHECK (client <> '{blocked}')"
    ))
    .execute(&state.pool)
    .await?;

    let created = sale_service::create_sale(
        &state,
        CreateSaleRequest {
            product_id: Some(product_id.to_string()),
            client: Some(blocked.clone()),
            quantity: Some(3),
            unit_price: Some(Decimal::new(1250, 2)),
            status: None,
            notes: None,
        },
    )
    .await;
    let updated = sale_service::update_sale(
        &state,
        sale.sale.id,
        UpdateSaleRequest {
            client: Some(blocked.clone()),
            quantity: Some(6),
            ..Default::default()
        },
    )
    .await;

    sqlx::query(&format!("ALTER TABLE sales DROP CONSTRAINT reject_{tag}"))
        .execute(&state.pool)
        .await?;

    assert!(matches!(created, Err(AppError::Transaction(_))));
    assert!(matches!(updated, Err(AppError::Transaction(_))));
    assert_eq!(stock(&state, product_id).await?, 8);

    let (rows,): (i64,) = sqlx::query_as("SELECT count(*) FROM sales WHERE product_id = $1")
        .bind(product_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(rows, 1);

    let kept = sale_service::get_sale(&state, sale.sale.id).await?.data.unwrap();
    assert_eq!(kept.sale.client, "Ana");
    assert_eq!(kept.sale.quantity, 2);
    assert_eq!(kept.sale.total_price, Decimal::new(2500, 2));

    Ok(())
}

#[tokio::test]
async fn oversized_total_is_rejected_before_stock_moves() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let product_id = create_product(&state, "VASE-1", None, 2_000).await?;

    let sale = sale_service::create_sale(
        &state,
        CreateSaleRequest {
            product_id: Some(product_id.to_string()),
            client: Some("Ana".into()),
            quantity: Some(1),
            unit_price: Some(MAX_PRICE),
            status: None,
            notes: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(stock(&state, product_id).await?, 1_999);

    // the stored price times the new quantity no longer fits a sale total
    let err = sale_service::update_sale(
        &state,
        sale.sale.id,
        UpdateSaleRequest {
            quantity: Some(1_000),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    match err {
        AppError::Validation(fields) => assert!(fields.contains("unit_price")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(stock(&state, product_id).await?, 1_999);

    let kept = sale_service::get_sale(&state, sale.sale.id).await?.data.unwrap();
    assert_eq!(kept.sale.quantity, 1);
    assert_eq!(kept.sale.total_price, MAX_PRICE);

    Ok(())
}

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run sale flow tests.");
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url, 5).await?;
    run_migrations(&pool).await?;
    Ok(Some(AppState::new(pool)))
}

async fn create_product(
    state: &AppState,
    prefix: &str,
    category_id: Option<String>,
    quantity: i64,
) -> anyhow::Result<Uuid> {
    // codes are unique, and the tests share one database
    let code = format!("{prefix}-{}", Uuid::new_v4().simple());
    let product = product_service::create_product(
        state,
        CreateProductRequest {
            name: Some(format!("Product {prefix}")),
            code: Some(code),
            price: Some(Decimal::new(1250, 2)),
            quantity: Some(quantity),
            category_id,
            active: Some(true),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    Ok(product.product.id)
}

async fn create_sale(
    state: &AppState,
    product_id: Uuid,
    quantity: i64,
    status: &str,
) -> anyhow::Result<SaleWithProduct> {
    let sale = sale_service::create_sale(
        state,
        CreateSaleRequest {
            product_id: Some(product_id.to_string()),
            client: Some("Ana".into()),
            quantity: Some(quantity),
            unit_price: Some(Decimal::new(1250, 2)),
            status: Some(status.into()),
            notes: None,
        },
    )
    .await?
    .data
    .unwrap();
    Ok(sale)
}

async fn stock(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = product_service::get_product(state, product_id)
        .await?
        .data
        .unwrap();
    Ok(product.product.quantity)
}
