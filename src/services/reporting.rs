//! Dashboard figures assembled from pre-aggregated rows.
//!
//! The database does the counting and summing; this module only ranks,
//! labels and zero-fills. It never reads the clock: the caller passes `now`,
//! so every figure is reproducible in tests.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Period, SaleStatus};

pub const LOW_STOCK_THRESHOLD: i32 = 10;
pub const RECENT_ACTIVITY_LIMIT: usize = 10;
pub const TOP_SELLERS_LIMIT: usize = 5;
pub const TRAILING_DAYS: i64 = 7;
pub const UNCATEGORIZED_LABEL: &str = "No category";

/// Active and low-stock product counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockCounts {
    pub active_products: i64,
    pub low_stock: i64,
}

/// Count and summed value of the non-cancelled sales in some window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SalesTotals {
    pub count: i64,
    pub value: Decimal,
}

/// One of the latest sales, joined with its product name.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentSale {
    pub id: Uuid,
    pub product_name: String,
    pub client: String,
    pub total_price: Decimal,
    pub status: SaleStatus,
    pub created_at: DateTime<Utc>,
}

/// Units sold of one product over its non-cancelled sales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductUnits {
    pub product_id: Uuid,
    pub name: String,
    pub units: i64,
}

/// Non-cancelled sales per category; `None` for uncategorized products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: Option<String>,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayValue {
    pub date: NaiveDate,
    pub value: Decimal,
}

/// Count and value of the sales of one status in some window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTotals {
    pub status: SaleStatus,
    pub count: i64,
    pub value: Decimal,
}

/// Everything the dashboard is built from.
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub stock: StockCounts,
    pub category_count: i64,
    pub today: SalesTotals,
    pub month: SalesTotals,
    pub recent: Vec<RecentSale>,
    pub product_units: Vec<ProductUnits>,
    pub category_counts: Vec<CategoryCount>,
    pub daily_values: Vec<DayValue>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_products: i64,
    pub total_categories: i64,
    pub today_sales: i64,
    #[schema(value_type = f64)]
    pub today_value: Decimal,
    pub month_sales: i64,
    #[schema(value_type = f64)]
    pub month_value: Decimal,
    pub low_stock_products: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Activity {
    pub sale_id: Uuid,
    pub icon: String,
    pub status: SaleStatus,
    pub title: String,
    pub description: String,
    pub time: String,
    #[schema(value_type = f64)]
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopSeller {
    pub product_id: Uuid,
    pub name: String,
    pub sales: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CategorySales {
    pub category: String,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyTotal {
    pub date: NaiveDate,
    /// `dd/mm`
    pub label: String,
    #[schema(value_type = f64)]
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_activity: Vec<Activity>,
    pub top_sellers: Vec<TopSeller>,
    pub sales_by_category: Vec<CategorySales>,
    pub last_7_days: Vec<DailyTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SalesSummary {
    pub total: i64,
    #[schema(value_type = f64)]
    pub value: Decimal,
    pub pending_count: i64,
    pub concluded_count: i64,
    pub cancelled_count: i64,
    #[schema(value_type = f64)]
    pub average_value: Decimal,
}

pub fn build_dashboard(
    snapshot: DashboardSnapshot,
    now: DateTime<Utc>,
    include_uncategorized: bool,
) -> Dashboard {
    let stats = DashboardStats {
        total_products: snapshot.stock.active_products,
        total_categories: snapshot.category_count,
        today_sales: snapshot.today.count,
        today_value: snapshot.today.value,
        month_sales: snapshot.month.count,
        month_value: snapshot.month.value,
        low_stock_products: snapshot.stock.low_stock,
    };

    Dashboard {
        stats,
        recent_activity: recent_activity(snapshot.recent, now),
        top_sellers: top_sellers(snapshot.product_units),
        sales_by_category: sales_by_category(snapshot.category_counts, include_uncategorized),
        last_7_days: trailing_days(&snapshot.daily_values, now.date_naive(), TRAILING_DAYS),
    }
}

/// Latest sales first, whatever their status.
pub fn recent_activity(mut sales: Vec<RecentSale>, now: DateTime<Utc>) -> Vec<Activity> {
    sales.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sales.truncate(RECENT_ACTIVITY_LIMIT);
    sales
        .into_iter()
        .map(|sale| Activity {
            sale_id: sale.id,
            icon: sale.status.icon().to_string(),
            status: sale.status,
            title: format!("Sale: {}", sale.product_name),
            description: format!("Client: {}", sale.client),
            time: relative_time(sale.created_at, now),
            value: sale.total_price,
        })
        .collect()
}

/// Best selling products by units, scaled against the best seller.
pub fn top_sellers(mut ranked: Vec<ProductUnits>) -> Vec<TopSeller> {
    ranked.sort_by(|a, b| b.units.cmp(&a.units).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(TOP_SELLERS_LIMIT);

    let max_sales = ranked.first().map_or(0, |top| top.units);
    ranked
        .into_iter()
        .map(|row| TopSeller {
            percentage: if max_sales > 0 {
                row.units as f64 / max_sales as f64 * 100.0
            } else {
                0.0
            },
            product_id: row.product_id,
            name: row.name,
            sales: row.units,
        })
        .collect()
}

pub fn sales_by_category(
    counts: Vec<CategoryCount>,
    include_uncategorized: bool,
) -> Vec<CategorySales> {
    let mut grouped: Vec<CategorySales> = counts
        .into_iter()
        .filter_map(|row| match row.category {
            Some(category) => Some(CategorySales {
                category,
                total: row.total,
            }),
            None if include_uncategorized => Some(CategorySales {
                category: UNCATEGORIZED_LABEL.to_string(),
                total: row.total,
            }),
            None => None,
        })
        .collect();
    grouped.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    grouped
}

/// Value sold on each of the last `days` days, oldest first, zero-filled.
pub fn trailing_days(values: &[DayValue], today: NaiveDate, days: i64) -> Vec<DailyTotal> {
    (0..days)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let value = values
                .iter()
                .filter(|v| v.date == date)
                .map(|v| v.value)
                .sum();
            DailyTotal {
                date,
                label: date.format("%d/%m").to_string(),
                value,
            }
        })
        .collect()
}

/// Totals and averages count live sales; the status counts cover every sale.
pub fn summarize(rows: &[StatusTotals]) -> SalesSummary {
    let count_status = |status: SaleStatus| {
        rows.iter()
            .filter(|r| r.status == status)
            .map(|r| r.count)
            .sum::<i64>()
    };
    let (total, value) = rows
        .iter()
        .filter(|r| !r.status.is_cancelled())
        .fold((0, Decimal::ZERO), |(count, value), r| {
            (count + r.count, value + r.value)
        });
    let average_value = if total > 0 {
        (value / Decimal::from(total)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    SalesSummary {
        total,
        value,
        pending_count: count_status(SaleStatus::Pending),
        concluded_count: count_status(SaleStatus::Concluded),
        cancelled_count: count_status(SaleStatus::Cancelled),
        average_value,
    }
}

/// Half-open `[start, end)` UTC window covering `period` around `now`.
pub fn period_window(period: Period, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let (start, end) = match period {
        Period::Today => (today, today + Duration::days(1)),
        Period::ThisWeek => {
            let monday =
                today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
            (monday, monday + Duration::days(7))
        }
        Period::ThisMonth => {
            let first = today.with_day(1).unwrap_or(today);
            let next = if first.month() == 12 {
                NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
            };
            (first, next.unwrap_or(first + Duration::days(31)))
        }
        Period::ThisYear => {
            let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
            let next = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
                .unwrap_or(first + Duration::days(366));
            (first, next)
        }
    };
    (midnight(start), midnight(end))
}

/// Start of the oldest day in the trailing series ending today.
pub fn trailing_start(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    midnight(now.date_naive() - Duration::days(days - 1))
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Human phrasing of the distance between `then` and `now`, e.g. "3 hours ago".
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    let suffix = if seconds < 0 { "from now" } else { "ago" };
    let seconds = seconds.abs();
    if seconds < 1 {
        return "just now".to_string();
    }

    const UNITS: [(&str, i64); 7] = [
        ("year", 365 * 86_400),
        ("month", 30 * 86_400),
        ("week", 7 * 86_400),
        ("day", 86_400),
        ("hour", 3_600),
        ("minute", 60),
        ("second", 1),
    ];
    let (unit, size) = UNITS
        .into_iter()
        .find(|(_, size)| seconds >= *size)
        .unwrap_or(("second", 1));
    let amount = seconds / size;
    let plural = if amount == 1 { "" } else { "s" };
    format!("{amount} {unit}{plural} {suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn relative_time_picks_the_largest_unit() {
        let now = at(2025, 3, 10, 12);
        assert_eq!(relative_time(now, now), "just now");
        assert_eq!(relative_time(now - Duration::seconds(1), now), "1 second ago");
        assert_eq!(relative_time(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(relative_time(now - Duration::hours(1), now), "1 hour ago");
        assert_eq!(relative_time(now - Duration::days(2), now), "2 days ago");
        assert_eq!(relative_time(now - Duration::days(15), now), "2 weeks ago");
        assert_eq!(relative_time(now + Duration::hours(3), now), "3 hours from now");
    }

    #[test]
    fn week_runs_monday_to_sunday() {
        // 2025-03-12 is a Wednesday
        let (start, end) = period_window(Period::ThisWeek, at(2025, 3, 12, 9));
        assert_eq!(start, at(2025, 3, 10, 0));
        assert_eq!(end, at(2025, 3, 17, 0));
    }

    #[test]
    fn month_and_year_windows_follow_the_calendar() {
        assert_eq!(
            period_window(Period::ThisMonth, at(2025, 12, 31, 23)),
            (at(2025, 12, 1, 0), at(2026, 1, 1, 0))
        );
        assert_eq!(
            period_window(Period::ThisMonth, at(2024, 2, 29, 8)),
            (at(2024, 2, 1, 0), at(2024, 3, 1, 0))
        );
        assert_eq!(
            period_window(Period::ThisYear, at(2025, 6, 1, 0)),
            (at(2025, 1, 1, 0), at(2026, 1, 1, 0))
        );
        assert_eq!(
            period_window(Period::Today, at(2025, 3, 12, 9)),
            (at(2025, 3, 12, 0), at(2025, 3, 13, 0))
        );
    }

    #[test]
    fn trailing_days_on_empty_input_are_zero() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let days = trailing_days(&[], today, TRAILING_DAYS);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].label, "06/03");
        assert_eq!(days[6].date, today);
        assert!(days.iter().all(|d| d.value.is_zero()));
        assert_eq!(trailing_start(at(2025, 3, 12, 9), TRAILING_DAYS), at(2025, 3, 6, 0));
    }

    #[test]
    fn summary_of_nothing_is_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.average_value, Decimal::ZERO);
        assert!(top_sellers(Vec::new()).is_empty());
    }
}
