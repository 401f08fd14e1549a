use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{categories, products, sales},
    error::FieldErrors,
    models::{
        Category, Period, Product, ProductWithCategory, Sale, SaleStatus, SaleWithProduct,
    },
    response::{ApiResponse, Meta},
    routes::{
        categories as category_routes, dashboard, health, params, products as product_routes,
        sales as sale_routes,
    },
    services::reporting,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        category_routes::list_categories,
        category_routes::get_category,
        category_routes::create_category,
        category_routes::update_category,
        category_routes::delete_category,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::delete_product,
        sale_routes::list_sales,
        sale_routes::get_sale,
        sale_routes::create_sale,
        sale_routes::update_sale,
        sale_routes::delete_sale,
        dashboard::get_dashboard,
        dashboard::get_sales_summary
    ),
    components(
        schemas(
            Category,
            Product,
            ProductWithCategory,
            Sale,
            SaleStatus,
            SaleWithProduct,
            Period,
            FieldErrors,
            categories::CreateCategoryRequest,
            categories::UpdateCategoryRequest,
            categories::CategoryList,
            products::CreateProductRequest,
            products::UpdateProductRequest,
            products::ProductList,
            sales::CreateSaleRequest,
            sales::UpdateSaleRequest,
            sales::SaleList,
            params::Pagination,
            params::SortOrder,
            reporting::Dashboard,
            reporting::DashboardStats,
            reporting::Activity,
            reporting::TopSeller,
            reporting::CategorySales,
            reporting::DailyTotal,
            reporting::SalesSummary,
            Meta,
            ApiResponse<Category>,
            ApiResponse<categories::CategoryList>,
            ApiResponse<ProductWithCategory>,
            ApiResponse<products::ProductList>,
            ApiResponse<SaleWithProduct>,
            ApiResponse<sales::SaleList>,
            ApiResponse<reporting::Dashboard>,
            ApiResponse<reporting::SalesSummary>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Products", description = "Product endpoints"),
        (name = "Sales", description = "Sale endpoints; every write moves product stock"),
        (name = "Dashboard", description = "Reporting endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
