//! Country and US-state normalization.
//!
//! Unrecognized input passes through trimmed but otherwise unchanged.

const US_STATES: [(&str, &str); 51] = [
    ("alabama", "AL"),
    ("alaska", "AK"),
    ("arizona", "AZ"),
    ("arkansas", "AR"),
    ("california", "CA"),
    ("colorado", "CO"),
    ("connecticut", "CT"),
    ("delaware", "DE"),
    ("district of columbia", "DC"),
    ("florida", "FL"),
    ("georgia", "GA"),
    ("hawaii", "HI"),
    ("idaho", "ID"),
    ("illinois", "IL"),
    ("indiana", "IN"),
    ("iowa", "IA"),
    ("kansas", "KS"),
    ("kentucky", "KY"),
    ("louisiana", "LA"),
    ("maine", "ME"),
    ("maryland", "MD"),
    ("massachusetts", "MA"),
    ("michigan", "MI"),
    ("minnesota", "MN"),
    ("mississippi", "MS"),
    ("missouri", "MO"),
    ("montana", "MT"),
    ("nebraska", "NE"),
    ("nevada", "NV"),
    ("new hampshire", "NH"),
    ("new jersey", "NJ"),
    ("new mexico", "NM"),
    ("new york", "NY"),
    ("north carolina", "NC"),
    ("north dakota", "ND"),
    ("ohio", "OH"),
    ("oklahoma", "OK"),
    ("oregon", "OR"),
    ("pennsylvania", "PA"),
    ("rhode island", "RI"),
    ("south carolina", "SC"),
    ("south dakota", "SD"),
    ("tennessee", "TN"),
    ("texas", "TX"),
    ("utah", "UT"),
    ("vermont", "VT"),
    ("virginia", "VA"),
    ("washington", "WA"),
    ("west virginia", "WV"),
    ("wisconsin", "WI"),
    ("wyoming", "WY"),
];

const COUNTRIES: [(&str, &str); 14] = [
    ("united states", "USA"),
    ("united states of america", "USA"),
    ("us", "USA"),
    ("u.s.", "USA"),
    ("usa", "USA"),
    ("u.s.a.", "USA"),
    ("america", "USA"),
    ("united kingdom", "UK"),
    ("uk", "UK"),
    ("great britain", "UK"),
    ("england", "UK"),
    ("scotland", "UK"),
    ("wales", "UK"),
    ("northern ireland", "UK"),
];

/// Maps a US state name (or code, any case) to its postal code.
#[must_use]
pub fn normalize_state(raw: &str) -> String {
    let trimmed = raw.trim();
    let lowered = trimmed.to_lowercase();
    US_STATES
        .iter()
        .find(|(name, code)| *name == lowered || code.eq_ignore_ascii_case(trimmed))
        .map_or_else(|| trimmed.to_string(), |(_, code)| (*code).to_string())
}

/// Maps known country spellings to a fixed abbreviation.
#[must_use]
pub fn normalize_country(raw: &str) -> String {
    let trimmed = raw.trim();
    let lowered = trimmed.to_lowercase();
    COUNTRIES
        .iter()
        .find(|(name, _)| *name == lowered)
        .map_or_else(|| trimmed.to_string(), |(_, abbr)| (*abbr).to_string())
}
