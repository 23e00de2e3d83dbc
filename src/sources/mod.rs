//! Source adapters: one module per upstream export format.
//!
//! Each adapter reads its export payload(s), folds the source's category
//! vocabulary into the shared mapping, registers locations, and appends
//! unified orders and line items to the registry. Adapters never touch
//! products; those are materialized after entity resolution.

pub mod doordash;
pub mod square;
pub mod toast;

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::Result;

/// Read and parse one JSON export file.
pub fn read_json_file(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// String field lookup that treats missing, null, and non-string as absent.
pub(crate) fn get_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Like [`get_str`] but also treats the empty string as absent.
pub(crate) fn get_non_empty<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    get_str(value, key).filter(|s| !s.trim().is_empty())
}

pub(crate) fn get_array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Unit price derived from the charged line total. The total is ground truth;
/// the division floors, so `unit * quantity` may undershoot the total.
pub(crate) fn derive_unit_price(total_cents: i64, quantity: i64) -> i64 {
    if quantity > 0 {
        total_cents / quantity
    } else {
        total_cents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unit_price_floors_and_keeps_total_authoritative() {
        assert_eq!(derive_unit_price(900, 6), 150);
        assert_eq!(derive_unit_price(1000, 3), 333);
        assert_eq!(derive_unit_price(500, 0), 500);
    }

    #[test]
    fn field_helpers_tolerate_shape_drift() {
        let v = json!({"name": "Downtown", "empty": "", "num": 3});
        assert_eq!(get_str(&v, "name"), Some("Downtown"));
        assert_eq!(get_str(&v, "num"), None);
        assert_eq!(get_non_empty(&v, "empty"), None);
        assert!(get_array(&v, "missing").is_empty());
    }
}
