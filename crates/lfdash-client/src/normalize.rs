//! Normalization from loosely-typed vendor JSON to `lfdash-core` types.
//!
//! Vendor records do not have a stable schema: the same field shows up under
//! different keys depending on the endpoint, numbers arrive as strings, and
//! list responses are either bare arrays or objects with the list under a
//! varying key. Every accessor here is total: missing or malformed input
//! yields the caller's fallback, never an error.

use serde_json::{Map, Value};

use lfdash_core::{Business, BusinessId, Location, PageVisit, RepUser, Visit, VisitId};

use crate::client::Payload;
use crate::dates::parse_vendor_datetime;
use crate::geo::{normalize_country, normalize_state};
use crate::heuristic;

// Field aliases, in priority order.
const BUSINESS_ID: &[&str] = &["BusinessID", "BusinessId", "businessId", "business_id", "ID", "Id", "id"];
const BUSINESS_NAME: &[&str] = &["Name", "BusinessName", "CompanyName", "Company", "name"];
const CITY: &[&str] = &["City", "Town", "Locality", "city"];
const STATE: &[&str] = &["Region", "State", "County", "StateName", "state"];
const COUNTRY: &[&str] = &["Country", "CountryName", "CountryCode", "country"];
const INDUSTRY: &[&str] = &["Industry", "IndustryName", "SICDescription", "Sector", "industry"];
const WEBSITE: &[&str] = &["Website", "WebAddress", "WebsiteURL", "URL", "Domain", "website"];
const PHONE: &[&str] = &["Telephone", "Phone", "PhoneNumber", "TelephoneNumber", "phone"];
const EMPLOYEES: &[&str] = &["Employees", "EmployeeCount", "NumberOfEmployees", "employees"];
const ADDRESS: &[&str] = &["Address", "Address1", "AddressLine1", "Street", "address"];
const VISIT_COUNT: &[&str] = &["NumberOfVisits", "VisitCount", "Visits", "TotalVisits", "visits"];
const PAGE_COUNT: &[&str] = &["NumberOfPages", "PagesViewed", "PageViews", "TotalPages", "PageCount", "pages"];
const LAST_VISIT: &[&str] = &["LastVisitDate", "LastVisited", "LastVisit", "LastVisitDateTime", "lastVisit"];
const FIRST_VISIT: &[&str] = &["FirstVisitDate", "FirstVisited", "FirstVisit", "DateCreated", "firstVisit"];
const IS_NEW: &[&str] = &["IsNew", "NewBusiness", "IsNewBusiness", "isNew"];

const VISIT_ID: &[&str] = &["VisitID", "VisitId", "visitId", "ID", "Id", "id"];
const VISIT_START: &[&str] = &["StartDateTime", "VisitStart", "StartDate", "DateTime", "VisitDate", "startDateTime"];
const VISIT_END: &[&str] = &["EndDateTime", "VisitEnd", "EndDate", "endDateTime"];
const VISIT_PAGES: &[&str] = &["NumberOfPages", "PageCount", "Pages", "PagesViewed", "pages"];
const REFERRER: &[&str] = &["Referrer", "ReferrerURL", "Referer", "Source", "referrer"];

const PAGE_URL: &[&str] = &["PageURL", "PageUrl", "URL", "Url", "Page", "url"];
const PAGE_TITLE: &[&str] = &["PageTitle", "Title", "title"];
const PAGE_TIME: &[&str] = &["DateTime", "VisitDateTime", "Timestamp", "Date", "ViewedAt", "dateTime"];

const USER_ID: &[&str] = &["AssignedToID", "AssignedToId", "UserID", "UserId", "LoginID", "ID", "Id", "id"];
const USER_NAME: &[&str] = &["AssignedToName", "Name", "FullName", "UserName", "DisplayName", "name"];
const USER_FIRST: &[&str] = &["FirstName", "Forename", "firstName"];
const USER_LAST: &[&str] = &["LastName", "Surname", "lastName"];
const USER_EMAIL: &[&str] = &["Email", "EmailAddress", "email"];

const META_PAGE_COUNT: &[&str] = &["PageCount", "TotalPages", "pageCount"];
const META_RECORD_COUNT: &[&str] = &["RecordCount", "TotalRecords", "TotalCount", "recordCount"];

/// Wrapper keys that hold a single record in detail responses.
const DETAIL_WRAPPERS: &[&str] = &["Business", "Visit", "Data", "Result", "Item"];

// ---------------------------------------------------------------------------
// Field access
// ---------------------------------------------------------------------------

/// Returns the first present, non-empty value among `aliases`.
///
/// Exact key matches are tried first, then a case-insensitive pass.
#[must_use]
pub fn pick_value<'a>(record: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    let map = record.as_object()?;
    aliases
        .iter()
        .find_map(|alias| map.get(*alias).filter(|v| !is_empty(v)))
        .or_else(|| {
            aliases.iter().find_map(|alias| {
                map.iter()
                    .find(|(k, v)| k.eq_ignore_ascii_case(alias) && !is_empty(v))
                    .map(|(_, v)| v)
            })
        })
}

/// String form of the first non-empty aliased field, or `fallback`.
#[must_use]
pub fn pick_str(record: &Value, aliases: &[&str], fallback: &str) -> String {
    pick_opt_str(record, aliases).unwrap_or_else(|| fallback.to_string())
}

#[must_use]
pub fn pick_opt_str(record: &Value, aliases: &[&str]) -> Option<String> {
    pick_value(record, aliases).and_then(scalar_to_string)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(_) => canonical_id(value),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numeric coercion that is total: unparsable, non-finite, or missing input is `0.0`.
#[must_use]
pub fn coerce_f64(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// Non-negative integer coercion; fractions are truncated, negatives clamp to 0.
#[must_use]
pub fn coerce_u64(value: &Value) -> u64 {
    if let Some(n) = value.as_u64() {
        return n;
    }
    if let Value::String(s) = value {
        if let Ok(n) = s.trim().replace(',', "").parse::<u64>() {
            return n;
        }
    }
    let f = coerce_f64(value);
    if f <= 0.0 {
        0
    } else {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = f.trunc() as u64;
        n
    }
}

/// Canonical string form of an id that may arrive as a string or a number.
///
/// `42`, `42.0`, and `" 42 "` all become `"42"`.
#[must_use]
pub fn canonical_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i.to_string());
            }
            if let Some(u) = n.as_u64() {
                return Some(u.to_string());
            }
            let f = n.as_f64()?;
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
                #[allow(clippy::cast_possible_truncation)]
                let i = f as i64;
                Some(i.to_string())
            } else {
                Some(n.to_string())
            }
        }
        _ => None,
    }
}

fn pick_id(record: &Value, aliases: &[&str]) -> Option<String> {
    pick_value(record, aliases).and_then(canonical_id)
}

fn pick_u64(record: &Value, aliases: &[&str]) -> u64 {
    pick_value(record, aliases).map_or(0, coerce_u64)
}

fn pick_datetime(record: &Value, aliases: &[&str]) -> Option<chrono::DateTime<chrono::Utc>> {
    pick_opt_str(record, aliases).and_then(|s| parse_vendor_datetime(&s))
}

fn pick_bool(record: &Value, aliases: &[&str]) -> Option<bool> {
    match pick_value(record, aliases)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// List shapes
// ---------------------------------------------------------------------------

/// Endpoint families with their known list-key aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEndpoint {
    AssignedTo,
    PortalLogins,
    Businesses,
    Visits,
    Pages,
}

impl ListEndpoint {
    #[must_use]
    pub fn list_keys(self) -> &'static [&'static str] {
        match self {
            ListEndpoint::AssignedTo => &["AssignedToList", "AssignedTo", "Users", "Items", "Data"],
            ListEndpoint::PortalLogins => &["ClientPortalLogins", "Logins", "Users", "Items", "Data"],
            ListEndpoint::Businesses => &[
                "SiteVisitorList",
                "Businesses",
                "BusinessList",
                "Items",
                "Data",
                "Results",
            ],
            ListEndpoint::Visits => &["VisitList", "Visits", "Items", "Data", "Results"],
            ListEndpoint::Pages => &["PageList", "Pages", "Items", "Data", "Results"],
        }
    }
}

/// How the record list was located inside a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListShape {
    /// The response itself was an array.
    Bare,
    /// Found under a known key for the endpoint.
    Keyed { key: String },
    /// Found under the first array-valued property; no known key matched.
    Guessed { key: String },
    /// No list anywhere. Treated as an empty page and logged.
    Unrecognized,
}

/// One page of normalized records plus whatever pagination metadata came with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub shape: ListShape,
    pub page_count: Option<u32>,
    pub record_count: Option<u64>,
}

impl<T> ListPage<T> {
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListPage<U> {
        ListPage {
            items: self.items.into_iter().map(f).collect(),
            shape: self.shape,
            page_count: self.page_count,
            record_count: self.record_count,
        }
    }
}

/// Locates the raw record list in a response.
#[must_use]
pub fn extract_list(endpoint: ListEndpoint, payload: &Payload) -> ListPage<Value> {
    let Some(value) = payload.as_json() else {
        tracing::warn!(?endpoint, "non-JSON response where a record list was expected");
        return unrecognized();
    };

    match value {
        Value::Array(items) => ListPage {
            items: items.clone(),
            shape: ListShape::Bare,
            page_count: None,
            record_count: None,
        },
        Value::Object(map) => {
            let page_count = pick_value(value, META_PAGE_COUNT)
                .map(coerce_u64)
                .and_then(|n| u32::try_from(n).ok());
            let record_count = pick_value(value, META_RECORD_COUNT).map(coerce_u64);

            let (shape, items) = if let Some((key, items)) = known_list(map, endpoint) {
                (ListShape::Keyed { key }, items)
            } else if let Some((key, items)) = first_list(map) {
                tracing::debug!(?endpoint, key = %key, "list found under an unrecognized key");
                (ListShape::Guessed { key }, items)
            } else {
                tracing::warn!(
                    ?endpoint,
                    keys = ?map.keys().collect::<Vec<_>>(),
                    "response has no record list"
                );
                (ListShape::Unrecognized, Vec::new())
            };

            ListPage {
                items,
                shape,
                page_count,
                record_count,
            }
        }
        _ => {
            tracing::warn!(?endpoint, "scalar response where a record list was expected");
            unrecognized()
        }
    }
}

fn unrecognized() -> ListPage<Value> {
    ListPage {
        items: Vec::new(),
        shape: ListShape::Unrecognized,
        page_count: None,
        record_count: None,
    }
}

fn known_list(map: &Map<String, Value>, endpoint: ListEndpoint) -> Option<(String, Vec<Value>)> {
    endpoint.list_keys().iter().find_map(|key| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(k, v)| v.as_array().map(|items| (k.clone(), items.clone())))
    })
}

fn first_list(map: &Map<String, Value>) -> Option<(String, Vec<Value>)> {
    map.iter()
        .find_map(|(k, v)| v.as_array().map(|items| (k.clone(), items.clone())))
}

/// Locates a single record in a detail response.
///
/// Accepts the record itself, a one-element array, or the record under a
/// wrapper key such as `Business`.
#[must_use]
pub fn extract_record(payload: &Payload) -> Option<Value> {
    let value = payload.as_json()?;
    match value {
        Value::Array(items) => items.iter().find(|v| v.is_object()).cloned(),
        Value::Object(map) => DETAIL_WRAPPERS
            .iter()
            .find_map(|key| map.get(*key).filter(|v| v.is_object()).cloned())
            .or_else(|| (!map.is_empty()).then(|| value.clone())),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[must_use]
pub fn normalize_business(raw: &Value) -> Business {
    let id = pick_id(raw, BUSINESS_ID).and_then(|s| BusinessId::new(&s));
    let name = pick_opt_str(raw, BUSINESS_NAME);
    let generic = name.is_none();
    let name = match (name, &id) {
        (Some(name), _) => name,
        (None, Some(id)) => Business::synthetic_name(id),
        (None, None) => "Unknown".to_string(),
    };

    Business {
        id,
        name,
        location: Location {
            city: pick_opt_str(raw, CITY),
            state: pick_opt_str(raw, STATE).map(|s| normalize_state(&s)),
            country: pick_opt_str(raw, COUNTRY).map(|s| normalize_country(&s)),
        },
        industry: pick_opt_str(raw, INDUSTRY),
        website: pick_opt_str(raw, WEBSITE),
        phone: pick_opt_str(raw, PHONE),
        employees: pick_value(raw, EMPLOYEES).map(coerce_u64).filter(|n| *n > 0),
        address: pick_opt_str(raw, ADDRESS),
        visits: pick_u64(raw, VISIT_COUNT),
        pages: pick_u64(raw, PAGE_COUNT),
        last_visit: pick_datetime(raw, LAST_VISIT),
        first_visit: pick_datetime(raw, FIRST_VISIT),
        is_new: pick_bool(raw, IS_NEW),
        generic,
    }
}

#[must_use]
pub fn normalize_visit(raw: &Value) -> Visit {
    // A bare `ID` on a visit record is the visit id, so the business id is
    // only taken from explicitly business-scoped keys.
    let business_id = pick_id(raw, &BUSINESS_ID[..4])
        .or_else(|| raw.get("Business").and_then(|b| pick_id(b, BUSINESS_ID)))
        .and_then(|s| BusinessId::new(&s));

    Visit {
        id: pick_id(raw, VISIT_ID).and_then(|s| VisitId::new(&s)),
        business_id,
        started_at: pick_datetime(raw, VISIT_START),
        ended_at: pick_datetime(raw, VISIT_END),
        pages: pick_u64(raw, VISIT_PAGES),
        ip: heuristic::extract_ip(raw, heuristic::DEFAULT_MAX_DEPTH),
        referrer: pick_opt_str(raw, REFERRER),
    }
}

#[must_use]
pub fn normalize_page_visit(raw: &Value) -> PageVisit {
    PageVisit {
        url: pick_str(raw, PAGE_URL, ""),
        title: pick_opt_str(raw, PAGE_TITLE),
        viewed_at: pick_datetime(raw, PAGE_TIME),
        duration_secs: None,
    }
}

/// Maps an assigned-to or portal-login record. Records without an id are dropped.
#[must_use]
pub fn normalize_rep_user(raw: &Value) -> Option<RepUser> {
    let id = pick_id(raw, USER_ID)?;
    let name = pick_opt_str(raw, USER_NAME).or_else(|| {
        let parts: Vec<String> = [pick_opt_str(raw, USER_FIRST), pick_opt_str(raw, USER_LAST)]
            .into_iter()
            .flatten()
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    })?;
    Some(RepUser {
        id,
        name,
        email: pick_opt_str(raw, USER_EMAIL),
    })
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
