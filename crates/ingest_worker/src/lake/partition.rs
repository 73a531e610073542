use chrono::{Datelike, NaiveDate};

/// Relative partition path for a record date, in the lake's
/// `year=YYYY/month=MM/day=DD` layout
pub fn partition_key(date: NaiveDate) -> String {
    format!(
        "year={:04}/month={:02}/day={:02}",
        date.year(),
        date.month(),
        date.day()
    )
}
