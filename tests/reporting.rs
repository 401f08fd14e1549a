use axum_inventory_api::{
    models::SaleStatus,
    services::reporting::{
        CategoryCount, DashboardSnapshot, DayValue, ProductUnits, RecentSale, SalesTotals,
        StatusTotals, StockCounts, UNCATEGORIZED_LABEL, build_dashboard, sales_by_category,
        summarize, top_sellers,
    },
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 12, 15, 0, 0).unwrap()
}

fn recent(total: i64, status: SaleStatus, created_at: DateTime<Utc>) -> RecentSale {
    RecentSale {
        id: Uuid::new_v4(),
        product_name: "Mug".to_string(),
        client: "Ana".to_string(),
        total_price: Decimal::from(total),
        status,
        created_at,
    }
}

fn units(name: &str, units: i64) -> ProductUnits {
    ProductUnits {
        product_id: Uuid::new_v4(),
        name: name.to_string(),
        units,
    }
}

#[test]
fn dashboard_carries_live_totals_and_all_recent_sales() {
    let snapshot = DashboardSnapshot {
        stock: StockCounts {
            active_products: 2,
            low_stock: 1,
        },
        category_count: 3,
        // two concluded sales of 100 and 50; the cancelled 30 is not counted
        today: SalesTotals {
            count: 2,
            value: Decimal::from(150),
        },
        month: SalesTotals {
            count: 2,
            value: Decimal::from(150),
        },
        recent: vec![
            recent(30, SaleStatus::Cancelled, now() - Duration::hours(3)),
            recent(100, SaleStatus::Concluded, now() - Duration::hours(1)),
            recent(50, SaleStatus::Concluded, now() - Duration::hours(2)),
        ],
        daily_values: vec![DayValue {
            date: now().date_naive(),
            value: Decimal::from(150),
        }],
        ..Default::default()
    };

    let dashboard = build_dashboard(snapshot, now(), false);

    assert_eq!(dashboard.stats.today_sales, 2);
    assert_eq!(dashboard.stats.today_value, Decimal::from(150));
    assert_eq!(dashboard.stats.total_products, 2);
    assert_eq!(dashboard.stats.total_categories, 3);
    assert_eq!(dashboard.stats.low_stock_products, 1);

    assert_eq!(dashboard.recent_activity.len(), 3);
    assert_eq!(dashboard.recent_activity[0].time, "1 hour ago");
    assert_eq!(dashboard.recent_activity[2].icon, "❌");

    assert_eq!(dashboard.last_7_days.len(), 7);
    let today = dashboard.last_7_days.last().unwrap();
    assert_eq!(today.value, Decimal::from(150));
    assert_eq!(today.label, "12/03");
    assert!(dashboard.last_7_days[..6].iter().all(|d| d.value.is_zero()));
}

#[test]
fn top_sellers_scale_against_the_leader() {
    let ranked = top_sellers(vec![
        units("Charlie", 5),
        units("Bravo", 10),
        units("Alpha", 10),
    ]);

    let names: Vec<&str> = ranked.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Alpha", "Bravo", "Charlie"]);
    let percentages: Vec<f64> = ranked.iter().map(|t| t.percentage).collect();
    assert_eq!(percentages, [100.0, 100.0, 50.0]);
}

#[test]
fn uncategorized_sales_are_grouped_only_on_request() {
    let counts = vec![
        CategoryCount {
            category: Some("Kitchen".into()),
            total: 1,
        },
        CategoryCount {
            category: None,
            total: 2,
        },
    ];

    let without = sales_by_category(counts.clone(), false);
    assert_eq!(without.len(), 1);
    assert_eq!(without[0].category, "Kitchen");

    let with = sales_by_category(counts, true);
    assert_eq!(with[0].category, UNCATEGORIZED_LABEL);
    assert_eq!(with[0].total, 2);
    assert_eq!(with[1].category, "Kitchen");
}

#[test]
fn summary_counts_statuses_but_values_only_live_sales() {
    let summary = summarize(&[
        StatusTotals {
            status: SaleStatus::Concluded,
            count: 1,
            value: Decimal::from(100),
        },
        StatusTotals {
            status: SaleStatus::Pending,
            count: 1,
            value: Decimal::from(50),
        },
        StatusTotals {
            status: SaleStatus::Cancelled,
            count: 1,
            value: Decimal::from(30),
        },
    ]);

    assert_eq!(summary.total, 2);
    assert_eq!(summary.value, Decimal::from(150));
    assert_eq!(summary.pending_count, 1);
    assert_eq!(summary.concluded_count, 1);
    assert_eq!(summary.cancelled_count, 1);
    assert_eq!(summary.average_value, Decimal::from(75));

    let uneven = summarize(&[StatusTotals {
        status: SaleStatus::Concluded,
        count: 3,
        value: Decimal::from(1149),
    }]);
    assert_eq!(uneven.average_value, Decimal::new(38300, 2));
}
