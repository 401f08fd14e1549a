//! Keeps `products.quantity` consistent with the sales recorded against it.
//!
//! A product's on-hand quantity is its baseline minus the quantity of every
//! sale on it that is not cancelled. Sale transitions never re-apply a full
//! quantity; they move stock by the difference between what the sale held
//! before and what it holds after.

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QuerySelect, Set};
use uuid::Uuid;

use crate::{
    entity::products::{ActiveModel as ProductActive, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    models::SaleStatus,
};

/// The part of a sale's state that matters to stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holding {
    pub status: SaleStatus,
    pub quantity: i32,
}

impl Holding {
    pub fn new(status: SaleStatus, quantity: i32) -> Self {
        Self { status, quantity }
    }

    /// Units this sale currently keeps off the shelf.
    pub fn held(&self) -> i32 {
        if self.status.is_cancelled() {
            0
        } else {
            self.quantity
        }
    }
}

/// Signed change to on-hand stock when a sale moves from `before` to `after`.
///
/// `None` stands for "no sale": creation has no `before`, deletion no `after`.
/// Positive values return units to stock, negative values take them.
pub fn transition_delta(before: Option<Holding>, after: Option<Holding>) -> i32 {
    let held_before = before.map_or(0, |h| h.held());
    let held_after = after.map_or(0, |h| h.held());
    held_before - held_after
}

/// New on-hand quantity after applying `delta`, refusing to go below zero.
pub fn apply_delta(on_hand: i32, delta: i32) -> AppResult<i32> {
    match on_hand.checked_add(delta) {
        Some(next) if next >= 0 => Ok(next),
        Some(_) => Err(AppError::InsufficientStock { available: on_hand }),
        None => Err(AppError::BadRequest("stock quantity out of range".into())),
    }
}

/// Load a product and lock its row for the rest of the transaction.
pub async fn find_product_for_update<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> AppResult<Option<ProductModel>> {
    let product = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(conn)
        .await?;
    Ok(product)
}

/// Take `qty` units off the shelf.
pub async fn reserve<C: ConnectionTrait>(
    conn: &C,
    product: ProductModel,
    qty: i32,
) -> AppResult<ProductModel> {
    adjust(conn, product, -qty).await
}

/// Put `qty` units back on the shelf.
pub async fn release<C: ConnectionTrait>(
    conn: &C,
    product: ProductModel,
    qty: i32,
) -> AppResult<ProductModel> {
    adjust(conn, product, qty).await
}

/// Apply a signed stock change and persist it. A zero delta writes nothing.
pub async fn adjust<C: ConnectionTrait>(
    conn: &C,
    product: ProductModel,
    delta: i32,
) -> AppResult<ProductModel> {
    if delta == 0 {
        return Ok(product);
    }

    let next = match apply_delta(product.quantity, delta) {
        Ok(next) => next,
        Err(err) => {
            tracing::warn!(
                product_id = %product.id,
                on_hand = product.quantity,
                delta,
                "stock check failed"
            );
            return Err(err);
        }
    };

    let product_id = product.id;
    let mut active: ProductActive = product.into();
    active.quantity = Set(next);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(conn).await?;

    tracing::debug!(%product_id, delta, quantity = updated.quantity, "stock adjusted");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(qty: i32) -> Option<Holding> {
        Some(Holding::new(SaleStatus::Pending, qty))
    }

    fn cancelled(qty: i32) -> Option<Holding> {
        Some(Holding::new(SaleStatus::Cancelled, qty))
    }

    #[test]
    fn creating_reserves_only_live_sales() {
        assert_eq!(transition_delta(None, pending(5)), -5);
        assert_eq!(
            transition_delta(None, Some(Holding::new(SaleStatus::Concluded, 2))),
            -2
        );
        assert_eq!(transition_delta(None, cancelled(5)), 0);
    }

    #[test]
    fn editing_quantity_moves_only_the_difference() {
        assert_eq!(transition_delta(pending(3), pending(5)), -2);
        assert_eq!(transition_delta(pending(5), pending(3)), 2);
        assert_eq!(transition_delta(pending(4), pending(4)), 0);
    }

    #[test]
    fn cancelling_releases_what_was_held() {
        assert_eq!(transition_delta(pending(5), cancelled(5)), 5);
        // quantity edited in the same update as the cancellation
        assert_eq!(transition_delta(pending(5), cancelled(8)), 5);
        assert_eq!(transition_delta(cancelled(5), cancelled(9)), 0);
    }

    #[test]
    fn deleting_releases_unless_already_cancelled() {
        assert_eq!(transition_delta(pending(7), None), 7);
        assert_eq!(transition_delta(cancelled(7), None), 0);
    }

    #[test]
    fn stock_never_goes_negative() {
        assert_eq!(apply_delta(10, -10).unwrap(), 0);
        assert_eq!(apply_delta(10, 4).unwrap(), 14);

        let err = apply_delta(3, -4).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { available: 3 }));
    }

    #[test]
    fn scenario_reserve_cancel_delete_restores_baseline() {
        let baseline = 20;
        let mut on_hand = baseline;

        let created = pending(5);
        on_hand = apply_delta(on_hand, transition_delta(None, created)).unwrap();
        assert_eq!(on_hand, 15);

        let cancelled_sale = cancelled(5);
        on_hand = apply_delta(on_hand, transition_delta(created, cancelled_sale)).unwrap();
        assert_eq!(on_hand, 20);

        on_hand = apply_delta(on_hand, transition_delta(cancelled_sale, None)).unwrap();
        assert_eq!(on_hand, baseline);
    }
}
