//! Dates embedded in folder and file names.

use std::path::Path;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

/// Years outside this range are not taken as dates.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2100;

#[derive(Clone, Copy)]
enum Order {
    YearMonthDay,
    MonthDayYear,
}

/// Patterns in priority order. The first pattern whose first match is a real
/// calendar date wins.
static DATE_PATTERNS: LazyLock<Vec<(Regex, Order)>> = LazyLock::new(|| {
    [
        // 2024-12-25, 2024.12.25, 2024_12_25
        (r"(\d{4})[-._](\d{1,2})[-._](\d{1,2})", Order::YearMonthDay),
        // 20241225
        (r"(\d{4})(\d{2})(\d{2})", Order::YearMonthDay),
        // 2024年12月25日
        (r"(\d{4})年(\d{1,2})月(\d{1,2})日?", Order::YearMonthDay),
        // 12-25-2024
        (r"(\d{1,2})[-._](\d{1,2})[-._](\d{4})", Order::MonthDayYear),
    ]
    .into_iter()
    .map(|(pattern, order)| (Regex::new(pattern).expect("valid regex"), order))
    .collect()
});

/// Extract a date from the last component of `path`, at 12:00:00.
pub fn date_from_path(path: &Path) -> Option<NaiveDateTime> {
    let name = path.file_name()?.to_str()?;
    date_from_name(name)
}

/// Extract a date from a bare file or folder name, at 12:00:00.
pub fn date_from_name(name: &str) -> Option<NaiveDateTime> {
    DATE_PATTERNS.iter().find_map(|(re, order)| {
        let caps = re.captures(name)?;
        let fields: Vec<u32> = (1..=3)
            .map(|i| caps.get(i).and_then(|m| m.as_str().parse().ok()))
            .collect::<Option<_>>()?;
        let (year, month, day) = match order {
            Order::YearMonthDay => (fields[0], fields[1], fields[2]),
            Order::MonthDayYear => (fields[2], fields[0], fields[1]),
        };
        let year = i32::try_from(year).ok().filter(|y| YEAR_RANGE.contains(y))?;
        NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(12, 0, 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon(y: i32, m: u32, d: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(12, 0, 0))
    }

    #[test]
    fn test_separated_year_month_day() {
        assert_eq!(date_from_name("2024-12-25 Christmas"), noon(2024, 12, 25));
        assert_eq!(date_from_name("trip_2019.7.4"), noon(2019, 7, 4));
        assert_eq!(date_from_name("2021_03_09"), noon(2021, 3, 9));
    }

    #[test]
    fn test_compact_date() {
        assert_eq!(date_from_name("IMG_20240115_093012.jpg"), noon(2024, 1, 15));
    }

    #[test]
    fn test_cjk_date() {
        assert_eq!(date_from_name("2024年12月25日 聖誕"), noon(2024, 12, 25));
        assert_eq!(date_from_name("2023年5月1"), noon(2023, 5, 1));
    }

    #[test]
    fn test_month_day_year() {
        assert_eq!(date_from_name("party 12-25-2024"), noon(2024, 12, 25));
    }

    #[test]
    fn test_invalid_calendar_date_falls_through() {
        // 2024-02-30 is not a date; the compact pattern never matches here
        assert_eq!(date_from_name("2024-02-30"), None);
        // Invalid first pattern, valid month-day-year
        assert_eq!(date_from_name("9999-99-99 and 01-02-2003"), noon(2003, 1, 2));
    }

    #[test]
    fn test_year_out_of_range() {
        assert_eq!(date_from_name("1850-01-01"), None);
        assert_eq!(date_from_name("no date here"), None);
    }

    #[test]
    fn test_uses_last_path_component() {
        let path = Path::new("/photos/2020-01-01/holiday");
        assert_eq!(date_from_path(path), None);
        let path = Path::new("/photos/misc/2020-01-01");
        assert_eq!(date_from_path(path), noon(2020, 1, 1));
    }
}
