//! Text, money, and time normalizers shared by every source adapter.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

/// Pattern for a quantity baked into an item name, e.g. "Churros 12pcs".
static QTY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(.*?)(\d+)\s*(?:pcs|pc|pieces|piece|ct|count|pack)\b").unwrap()
});

/// Literal typo corrections applied after ASCII stripping and lowercasing.
/// Order matters: corrections may compose (a typo inside a larger typo'd
/// phrase is fixed by the earlier, longer entry first).
const TYPO_CORRECTIONS: &[(&str, &str)] = &[
    ("griled chiken", "grilled chicken"),
    ("griled chicken", "grilled chicken"),
    ("griled chicken sandwhich", "grilled chicken sandwich"),
    ("sandwhich", "sandwich"),
    ("expresso", "espresso"),
    ("coffe", "coffee"),
    ("appitizers", "appetizers"),
    ("hashbrowns", "hash browns"),
    ("churos", "churros"),
];

/// Clean free text: strip characters outside printable ASCII (drops emoji and
/// decorative glyphs), collapse whitespace, trim, lowercase, then apply the
/// ordered typo corrections. Blank input yields the literal token "unknown".
pub fn clean(text: &str) -> String {
    if text.trim().is_empty() {
        return "unknown".to_string();
    }

    let ascii: String = text
        .chars()
        .filter_map(|c| {
            if c.is_ascii_whitespace() {
                Some(' ')
            } else if (' '..='~').contains(&c) {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    let mut cleaned = ascii
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    for (typo, correction) in TYPO_CORRECTIONS {
        if cleaned.contains(typo) {
            cleaned = cleaned.replace(typo, correction);
        }
    }

    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// Extract a quantity baked into an item name.
/// "Churros 12pcs" with qty 1 becomes ("churros", 12); names without a baked
/// quantity come back cleaned with the original quantity unchanged.
pub fn extract_baked_quantity(raw_name: &str, original_qty: i64) -> (String, i64) {
    if let Some(caps) = QTY_PATTERN.captures(raw_name) {
        if let Ok(baked) = caps[2].parse::<i64>() {
            let name_part = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            return (clean(name_part), original_qty * baked);
        }
    }
    (clean(raw_name), original_qty)
}

/// Convert a currency value of whatever shape a source emits into integer
/// cents. Integers pass through (already minor units); floats are dollars,
/// scaled and rounded half-away-from-zero; strings are stripped to digits,
/// dot, and minus and treated as dollars when a decimal point survives, else
/// as cents. Null or unparseable input yields 0.
pub fn to_cents(value: &Value) -> i64 {
    match value {
        Value::Null => 0,
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else if let Some(f) = n.as_f64() {
                if f.is_nan() {
                    0
                } else {
                    (f * 100.0).round() as i64
                }
            } else {
                0
            }
        }
        Value::String(s) => {
            let stripped: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            if stripped.is_empty() {
                return 0;
            }
            if stripped.contains('.') {
                stripped
                    .parse::<f64>()
                    .map(|f| (f * 100.0).round() as i64)
                    .unwrap_or(0)
            } else {
                stripped.parse::<i64>().unwrap_or(0)
            }
        }
        _ => 0,
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a free-form timestamp string into a UTC instant. Naive timestamps
/// are assumed UTC. Empty or unparseable input falls back to "now", a known
/// data-quality compromise that is logged rather than propagated.
pub fn normalize_timestamp(raw: &str) -> DateTime<Utc> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        warn!("Empty timestamp, falling back to current time");
        return Utc::now();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return dt.with_timezone(&Utc);
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Utc.from_utc_datetime(&naive);
        }
    }

    if let Some(date) = parse_date(trimmed) {
        return Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap());
    }

    warn!(timestamp = trimmed, "Unparseable timestamp, falling back to current time");
    Utc::now()
}

/// Parse a bare calendar date in either dashed or compact form.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}

/// Business-date field as sources report it: a dashed or compact date string,
/// or a YYYYMMDD integer.
pub fn parse_business_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date(s.trim()),
        Value::Number(n) => n.as_i64().and_then(|i| parse_date(&i.to_string())),
        _ => None,
    }
}

/// An instant projected into a location's local civil calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub business_date: NaiveDate,
    /// 0-23
    pub hour_of_day: u32,
    /// 0=Sunday .. 6=Saturday
    pub day_of_week: u32,
}

/// Project a UTC instant into a location's local timezone. If the zone name
/// is invalid the instant's own UTC fields are used as local; the failure is
/// logged, never fatal.
pub fn project_local(instant: DateTime<Utc>, tz_name: &str) -> LocalTime {
    match tz_name.parse::<Tz>() {
        Ok(tz) => {
            let local = instant.with_timezone(&tz);
            LocalTime {
                business_date: local.date_naive(),
                hour_of_day: local.hour(),
                day_of_week: local.weekday().num_days_from_sunday(),
            }
        }
        Err(_) => {
            warn!(timezone = tz_name, "Invalid timezone, using UTC fields as local");
            LocalTime {
                business_date: instant.date_naive(),
                hour_of_day: instant.hour(),
                day_of_week: instant.weekday().num_days_from_sunday(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_strips_emoji_and_whitespace() {
        assert_eq!(clean("  Double   Cheeseburger 🍔 "), "double cheeseburger");
    }

    #[test]
    fn clean_applies_typo_corrections_in_order() {
        assert_eq!(clean("Griled Chiken Sandwhich"), "grilled chicken sandwich");
        assert_eq!(clean("Expresso"), "espresso");
        assert_eq!(clean("Hashbrowns"), "hash browns");
    }

    #[test]
    fn clean_blank_input_is_unknown() {
        assert_eq!(clean(""), "unknown");
        assert_eq!(clean("   "), "unknown");
    }

    #[test]
    fn clean_is_idempotent() {
        for input in ["Churos 6pc", "  BEER & WINE 🍺 ", "griled chiken", ""] {
            let once = clean(input);
            assert_eq!(clean(&once), once);
        }
    }

    #[test]
    fn baked_quantity_is_extracted_and_multiplied() {
        assert_eq!(extract_baked_quantity("Churros 12pcs", 1), ("churros".to_string(), 12));
        assert_eq!(extract_baked_quantity("Churros 6pc", 2), ("churros".to_string(), 12));
        assert_eq!(extract_baked_quantity("Wings 8 ct", 1), ("wings".to_string(), 8));
    }

    #[test]
    fn names_without_baked_quantity_pass_through() {
        assert_eq!(extract_baked_quantity("Plain Burger", 2), ("plain burger".to_string(), 2));
    }

    #[test]
    fn typo_correction_composes_with_quantity_extraction() {
        // "churos 6pc" -> quantity first splits off "churos", then cleaning fixes the typo
        assert_eq!(extract_baked_quantity("Churos 6pc", 1), ("churros".to_string(), 6));
    }

    #[test]
    fn to_cents_handles_all_source_shapes() {
        assert_eq!(to_cents(&json!(1250)), 1250);
        assert_eq!(to_cents(&json!(12.50)), 1250);
        assert_eq!(to_cents(&json!("$12.50")), 1250);
        assert_eq!(to_cents(&json!("1250")), 1250);
        assert_eq!(to_cents(&Value::Null), 0);
        assert_eq!(to_cents(&json!("not money")), 0);
    }

    #[test]
    fn to_cents_rounds_half_away_from_zero() {
        assert_eq!(to_cents(&json!(12.999)), 1300);
        assert_eq!(to_cents(&json!(0.005)), 1);
        assert_eq!(to_cents(&json!(-0.005)), -1);
        assert_eq!(to_cents(&json!("-3.50")), -350);
    }

    #[test]
    fn timestamps_parse_common_formats() {
        let ts = normalize_timestamp("2024-01-15T18:30:00Z");
        assert_eq!(ts.hour(), 18);
        let naive = normalize_timestamp("2024-01-15 18:30:00");
        assert_eq!(naive, ts);
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_now() {
        // Known data-quality compromise: garbage input yields "now", not an error.
        let before = Utc::now();
        let ts = normalize_timestamp("not a timestamp");
        assert!(ts >= before);
    }

    #[test]
    fn local_projection_shifts_date_and_remaps_weekday() {
        // 2024-01-15 is a Monday; 03:30 UTC is still Sunday evening in LA.
        let instant = normalize_timestamp("2024-01-15T03:30:00Z");
        let local = project_local(instant, "America/Los_Angeles");
        assert_eq!(local.business_date, NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
        assert_eq!(local.hour_of_day, 19);
        assert_eq!(local.day_of_week, 0); // Sunday
    }

    #[test]
    fn invalid_timezone_falls_back_to_utc_fields() {
        let instant = normalize_timestamp("2024-01-15T03:30:00Z");
        let local = project_local(instant, "Not/AZone");
        assert_eq!(local.business_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(local.hour_of_day, 3);
        assert_eq!(local.day_of_week, 1); // Monday
    }

    #[test]
    fn business_date_parses_string_and_integer_forms() {
        assert_eq!(
            parse_business_date(&json!("2024-01-15")),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            parse_business_date(&json!(20240115)),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(parse_business_date(&Value::Null), None);
    }
}
