/// Source system name constants to ensure consistency across the codebase.

// User-facing source names (used in the CLI and logs)
pub const TOAST_SOURCE: &str = "toast";
pub const DOORDASH_SOURCE: &str = "doordash";
pub const SQUARE_SOURCE: &str = "square";

/// Timezone assumed for a location until a source reports one.
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Country assumed when a source omits it.
pub const DEFAULT_COUNTRY: &str = "US";

/// Known external location identifiers and the canonical names they map to.
/// Used when an order references a location that never appeared in the
/// source's own location/store records.
const LOCATION_ID_TABLE: &[(&str, &str)] = &[
    // Toast
    ("loc_downtown_001", "Downtown"),
    ("loc_airport_002", "Airport"),
    ("loc_mall_003", "Mall Location"),
    ("loc_univ_004", "University"),
    // DoorDash
    ("str_downtown_001", "Downtown"),
    ("str_airport_002", "Airport"),
    ("str_mall_003", "Mall Location"),
    ("str_university_004", "University"),
    // Square
    ("LCN001DOWNTOWN", "Downtown"),
    ("LCN002AIRPORT", "Airport"),
    ("LCN003MALL", "Mall Location"),
    ("LCN004UNIV", "University"),
];

/// Resolve an external location identifier to a canonical location name.
/// Falls back to pattern matching on the identifier, then to "Downtown".
pub fn fallback_location_name(location_id: &str) -> &'static str {
    for (id, name) in LOCATION_ID_TABLE {
        if *id == location_id {
            return name;
        }
    }

    let lower = location_id.to_lowercase();
    if lower.contains("downtown") {
        "Downtown"
    } else if lower.contains("airport") {
        "Airport"
    } else if lower.contains("mall") {
        "Mall Location"
    } else if lower.contains("univ") {
        "University"
    } else {
        "Downtown"
    }
}
