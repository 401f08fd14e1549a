use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub code: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub category_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductWithCategory {
    pub product: Product,
    pub category_name: Option<String>,
}

/// Lifecycle state of a sale. Only non-cancelled sales hold stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    #[default]
    Pending,
    Concluded,
    Cancelled,
}

impl SaleStatus {
    pub const ALL: [SaleStatus; 3] = [
        SaleStatus::Pending,
        SaleStatus::Concluded,
        SaleStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Concluded => "concluded",
            SaleStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SaleStatus::Cancelled)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "⏳",
            SaleStatus::Concluded => "✅",
            SaleStatus::Cancelled => "❌",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sale status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for SaleStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SaleStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Sale {
    pub id: Uuid,
    pub product_id: Uuid,
    pub client: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub status: SaleStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaleWithProduct {
    pub sale: Sale,
    pub product_name: String,
    pub category_name: Option<String>,
}

/// Reporting window, always relative to the current date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Period {
    Today,
    ThisWeek,
    ThisMonth,
    ThisYear,
}

/// Largest value a `NUMERIC(12,2)` price column holds: 9_999_999_999.99.
pub const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Largest value a `NUMERIC(14,2)` sale total holds: 999_999_999_999.99.
pub const MAX_TOTAL: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, 2);

/// Total value of a sale line. Always derived, never taken from input.
///
/// `None` when the product does not fit a stored sale total.
pub fn compute_total(quantity: i32, unit_price: Decimal) -> Option<Decimal> {
    Decimal::from(quantity)
        .checked_mul(unit_price)
        .filter(|total| *total <= MAX_TOTAL)
}
