use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{bounded_optional_text, category_reference, deserialize_some, optional_text, required_text},
    error::{AppResult, FieldErrors},
    models::{MAX_PRICE, ProductWithCategory},
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub quantity: Option<i64>,
    /// Category id; `""` or `null` leaves the product uncategorized.
    pub category_id: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub code: Option<Option<String>>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub category_id: Option<Option<String>>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub code: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub category_id: Option<Uuid>,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub code: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub category_id: Option<Option<Uuid>>,
    pub active: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<ProductWithCategory>)]
    pub items: Vec<ProductWithCategory>,
}

impl CreateProductRequest {
    pub fn into_command(self) -> AppResult<NewProduct> {
        let mut errors = FieldErrors::new();
        let name = required_text(&mut errors, "name", self.name);
        let code = bounded_optional_text(&mut errors, "code", self.code);
        let price = match self.price {
            Some(price) => checked_price(&mut errors, price),
            None => {
                errors.add("price", "is required");
                Decimal::ZERO
            }
        };
        let quantity = match self.quantity {
            Some(quantity) => stock_quantity(&mut errors, quantity),
            None => {
                errors.add("quantity", "is required");
                0
            }
        };
        let category_id = category_reference(&mut errors, self.category_id);

        errors.finish(NewProduct {
            name,
            description: optional_text(self.description),
            code,
            price,
            quantity,
            category_id,
            active: self.active.unwrap_or(true),
        })
    }
}

impl UpdateProductRequest {
    pub fn into_patch(self) -> AppResult<ProductPatch> {
        let mut errors = FieldErrors::new();
        let name = self
            .name
            .map(|name| required_text(&mut errors, "name", Some(name)));
        let code = self
            .code
            .map(|code| bounded_optional_text(&mut errors, "code", code));
        let price = self.price.map(|price| checked_price(&mut errors, price));
        let quantity = self
            .quantity
            .map(|quantity| stock_quantity(&mut errors, quantity));
        let category_id = self
            .category_id
            .map(|raw| category_reference(&mut errors, raw));

        errors.finish(ProductPatch {
            name,
            description: self.description.map(optional_text),
            code,
            price,
            quantity,
            category_id,
            active: self.active,
        })
    }
}

fn checked_price(errors: &mut FieldErrors, price: Decimal) -> Decimal {
    let price = price.round_dp(2);
    if price < Decimal::ZERO {
        errors.add("price", "must be at least 0");
    } else if price > MAX_PRICE {
        errors.add("price", format!("must not exceed {MAX_PRICE}"));
    }
    price
}

fn stock_quantity(errors: &mut FieldErrors, quantity: i64) -> i32 {
    if quantity < 0 {
        errors.add("quantity", "must be at least 0");
        return 0;
    }
    i32::try_from(quantity).unwrap_or_else(|_| {
        errors.add("quantity", "is too large");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn empty_category_id_becomes_uncategorized() {
        let request: CreateProductRequest = serde_json::from_str(
            r#"{"name": "Ferris Mug", "price": 12, "quantity": 40, "category_id": ""}"#,
        )
        .unwrap();
        let cmd = request.into_command().unwrap();
        assert_eq!(cmd.category_id, None);
        assert_eq!(cmd.quantity, 40);
        assert!(cmd.active);
    }

    #[test]
    fn negative_price_and_stock_are_rejected() {
        let request: CreateProductRequest =
            serde_json::from_str(r#"{"name": "Mug", "price": -1, "quantity": -2}"#).unwrap();
        let Err(AppError::Validation(errors)) = request.into_command() else {
            panic!("expected validation error");
        };
        assert!(errors.contains("price"));
        assert!(errors.contains("quantity"));
    }

    #[test]
    fn price_must_fit_the_price_column() {
        let request: CreateProductRequest =
            serde_json::from_str(r#"{"name": "Mug", "price": 1e11, "quantity": 1}"#).unwrap();
        let Err(AppError::Validation(errors)) = request.into_command() else {
            panic!("expected validation error");
        };
        assert!(errors.contains("price"));

        let request: CreateProductRequest =
            serde_json::from_str(r#"{"name": "Mug", "price": 9999999999.99, "quantity": 1}"#)
                .unwrap();
        assert_eq!(request.into_command().unwrap().price, MAX_PRICE);
    }

    #[test]
    fn update_can_clear_category() {
        let request: UpdateProductRequest =
            serde_json::from_str(r#"{"category_id": null}"#).unwrap();
        assert_eq!(request.into_patch().unwrap().category_id, Some(None));

        let request: UpdateProductRequest = serde_json::from_str(r#"{"category_id": ""}"#).unwrap();
        assert_eq!(request.into_patch().unwrap().category_id, Some(None));

        let request: UpdateProductRequest = serde_json::from_str(r#"{"price": 3}"#).unwrap();
        assert_eq!(request.into_patch().unwrap().category_id, None);
    }
}
