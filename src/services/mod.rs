use sea_orm::DatabaseTransaction;

use crate::error::{AppError, AppResult};

pub mod category_service;
pub mod dashboard_service;
pub mod product_service;
pub mod reporting;
pub mod sale_service;
pub mod stock_ledger;

/// Commit when the unit of work succeeded, roll back otherwise.
pub(crate) async fn finish_transaction<T>(
    txn: DatabaseTransaction,
    result: AppResult<T>,
) -> AppResult<T> {
    match result {
        Ok(value) => {
            txn.commit().await.map_err(AppError::Transaction)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err.into_transaction())
        }
    }
}
