use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{deserialize_some, entity_reference, optional_text, required_text},
    error::{AppError, AppResult, FieldErrors},
    models::{MAX_PRICE, MAX_TOTAL, SaleStatus, SaleWithProduct, compute_total},
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateSaleRequest {
    pub product_id: Option<String>,
    pub client: Option<String>,
    pub quantity: Option<i64>,
    #[schema(value_type = Option<f64>)]
    pub unit_price: Option<Decimal>,
    /// `pending` (default), `concluded` or `cancelled`.
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSaleRequest {
    pub client: Option<String>,
    pub quantity: Option<i64>,
    #[schema(value_type = Option<f64>)]
    pub unit_price: Option<Decimal>,
    pub status: Option<String>,
    /// `null` or `""` clears the notes; absent leaves them untouched.
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

/// Validated input for a new sale.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSale {
    pub product_id: Uuid,
    pub client: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub status: SaleStatus,
    pub notes: Option<String>,
}

/// Validated partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalePatch {
    pub client: Option<String>,
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub status: Option<SaleStatus>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct SaleList {
    #[schema(value_type = Vec<SaleWithProduct>)]
    pub items: Vec<SaleWithProduct>,
}

impl CreateSaleRequest {
    pub fn into_command(self) -> AppResult<NewSale> {
        let mut errors = FieldErrors::new();
        let product_id = entity_reference(&mut errors, "product_id", self.product_id);
        let client = required_text(&mut errors, "client", self.client);
        let quantity = match self.quantity {
            Some(quantity) => sale_quantity(&mut errors, quantity),
            None => {
                errors.add("quantity", "is required");
                0
            }
        };
        let unit_price = match self.unit_price {
            Some(price) => checked_unit_price(&mut errors, price),
            None => {
                errors.add("unit_price", "is required");
                Decimal::ZERO
            }
        };
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => SaleStatus::default(),
            Some(raw) => sale_status(&mut errors, raw),
        };
        if errors.is_empty() && compute_total(quantity, unit_price).is_none() {
            errors.add("unit_price", total_too_large());
        }

        errors.finish(NewSale {
            product_id,
            client,
            quantity,
            unit_price,
            status,
            notes: optional_text(self.notes),
        })
    }
}

impl UpdateSaleRequest {
    pub fn into_patch(self) -> AppResult<SalePatch> {
        let mut errors = FieldErrors::new();
        let client = self
            .client
            .map(|client| required_text(&mut errors, "client", Some(client)));
        let quantity = self
            .quantity
            .map(|quantity| sale_quantity(&mut errors, quantity));
        let unit_price = self.unit_price.map(|price| checked_unit_price(&mut errors, price));
        let status = self
            .status
            .map(|raw| sale_status(&mut errors, raw.trim()));

        errors.finish(SalePatch {
            client,
            quantity,
            unit_price,
            status,
            notes: self.notes.map(optional_text),
        })
    }
}

fn sale_quantity(errors: &mut FieldErrors, quantity: i64) -> i32 {
    if quantity < 1 {
        errors.add("quantity", "must be at least 1");
        return 0;
    }
    i32::try_from(quantity).unwrap_or_else(|_| {
        errors.add("quantity", "is too large");
        0
    })
}

fn checked_unit_price(errors: &mut FieldErrors, price: Decimal) -> Decimal {
    let price = price.round_dp(2);
    if price < Decimal::ZERO {
        errors.add("unit_price", "must be at least 0");
    } else if price > MAX_PRICE {
        errors.add("unit_price", format!("must not exceed {MAX_PRICE}"));
    }
    price
}

fn total_too_large() -> String {
    format!("quantity times unit_price must not exceed {MAX_TOTAL}")
}

/// Total for a sale whose factors may come from different sources, e.g. a
/// patched quantity and a stored price.
pub(crate) fn sale_total(quantity: i32, unit_price: Decimal) -> AppResult<Decimal> {
    compute_total(quantity, unit_price)
        .ok_or_else(|| AppError::validation("unit_price", total_too_large()))
}

fn sale_status(errors: &mut FieldErrors, raw: &str) -> SaleStatus {
    raw.parse().unwrap_or_else(|_| {
        errors.add("status", "must be one of pending, concluded, cancelled");
        SaleStatus::default()
    })
}
