//! Expected delivery estimation.
//!
//! Metro addresses get the faster courier lane (7-10 business days); the
//! rest of the country gets 10-14.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};

const METRO_KEYWORDS: &[&str] = &[
    "delhi",
    "mumbai",
    "chennai",
    "kolkata",
    "bengaluru",
    "bangalore",
    "hyderabad",
    "pune",
    "ahmedabad",
];

/// Keyword match against the free-text shipping address.
pub fn is_metro_address(address: &str) -> bool {
    let lowered = address.to_lowercase();
    METRO_KEYWORDS.iter().any(|city| lowered.contains(city))
}

fn add_business_days(start: NaiveDate, days: u32) -> NaiveDate {
    let mut current = start;
    let mut added = 0;
    while added < days {
        current = current + Days::new(1);
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            added += 1;
        }
    }
    current
}

/// Earliest and latest expected delivery dates for an order placed at
/// `placed_at` shipping to `address`.
pub fn expected_delivery_range(placed_at: DateTime<Utc>, address: &str) -> (NaiveDate, NaiveDate) {
    let (start_days, end_days) = if is_metro_address(address) {
        (7, 10)
    } else {
        (10, 14)
    };

    let order_date = placed_at.date_naive();
    (
        add_business_days(order_date, start_days),
        add_business_days(order_date, end_days),
    )
}
