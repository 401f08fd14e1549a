use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::products::{
        CreateProductRequest, NewProduct, ProductList, ProductPatch, UpdateProductRequest,
    },
    entity::{
        categories::{Entity as Categories, Model as CategoryModel},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult, FieldErrors},
    models::{Product, ProductWithCategory},
    response::{ApiResponse, Meta},
    routes::params::CatalogQuery,
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: CatalogQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(pattern) = query.search_pattern() {
        condition = condition.add(
            Condition::any()
                .add(Expr::col((Products, Column::Name)).ilike(pattern.clone()))
                .add(Expr::col((Products, Column::Code)).ilike(pattern)),
        );
    }

    let total = Products::find()
        .filter(condition.clone())
        .count(&state.orm)
        .await? as i64;

    let items = Products::find()
        .find_also_related(Categories)
        .filter(condition)
        .order_by_asc(Column::Name)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(product, category)| with_category(product, category))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<ProductWithCategory>> {
    let result = Products::find_by_id(id)
        .find_also_related(Categories)
        .one(&state.orm)
        .await?;
    let (product, category) = match result {
        Some(found) => found,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success(
        "Product",
        with_category(product, category),
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<ProductWithCategory>> {
    let cmd: NewProduct = payload.into_command()?;
    check_references(state, None, cmd.code.as_deref(), cmd.category_id).await?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(cmd.name),
        description: Set(cmd.description),
        code: Set(cmd.code),
        price: Set(cmd.price),
        quantity: Set(cmd.quantity),
        category_id: Set(cmd.category_id),
        active: Set(cmd.active),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(product_id = %product.id, quantity = product.quantity, "product created");

    let category = load_category(&state.orm, product.category_id).await?;
    Ok(ApiResponse::success(
        "Product created",
        with_category(product, category),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<ProductWithCategory>> {
    let patch: ProductPatch = payload.into_patch()?;
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let code = patch.code.as_ref().and_then(|code| code.as_deref());
    let category_id = patch.category_id.flatten();
    check_references(state, Some(id), code, category_id).await?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = patch.name {
        active.name = Set(name);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }
    if let Some(code) = patch.code {
        active.code = Set(code);
    }
    if let Some(price) = patch.price {
        active.price = Set(price);
    }
    if let Some(quantity) = patch.quantity {
        // manual edits redefine the baseline
        active.quantity = Set(quantity);
    }
    if let Some(category_id) = patch.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(flag) = patch.active {
        active.active = Set(flag);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;
    let category = load_category(&state.orm, product.category_id).await?;

    Ok(ApiResponse::success(
        "Updated",
        with_category(product, category),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(product_id = %id, "product deleted");
    Ok(ApiResponse::done("Deleted"))
}

/// Name of the product's category, if it still has one.
pub(crate) async fn category_name<C: ConnectionTrait>(
    conn: &C,
    category_id: Option<Uuid>,
) -> AppResult<Option<String>> {
    Ok(load_category(conn, category_id).await?.map(|c| c.name))
}

async fn load_category<C: ConnectionTrait>(
    conn: &C,
    category_id: Option<Uuid>,
) -> AppResult<Option<CategoryModel>> {
    let Some(id) = category_id else {
        return Ok(None);
    };
    Ok(Categories::find_by_id(id).one(conn).await?)
}

/// Unique `code` and an existing `category_id`, both reported as field errors.
async fn check_references(
    state: &AppState,
    product_id: Option<Uuid>,
    code: Option<&str>,
    category_id: Option<Uuid>,
) -> AppResult<()> {
    let mut errors = FieldErrors::new();

    if let Some(code) = code {
        let mut condition = Condition::all().add(Column::Code.eq(code));
        if let Some(id) = product_id {
            condition = condition.add(Column::Id.ne(id));
        }
        let taken = Products::find().filter(condition).count(&state.orm).await?;
        if taken > 0 {
            errors.add("code", "has already been taken");
        }
    }

    if let Some(category_id) = category_id {
        if Categories::find_by_id(category_id)
            .one(&state.orm)
            .await?
            .is_none()
        {
            errors.add("category_id", "selected category does not exist");
        }
    }

    errors.finish(())
}

fn with_category(product: ProductModel, category: Option<CategoryModel>) -> ProductWithCategory {
    ProductWithCategory {
        product: product_from_entity(product),
        category_name: category.map(|c| c.name),
    }
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        code: model.code,
        price: model.price,
        quantity: model.quantity,
        category_id: model.category_id,
        active: model.active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
