use chrono::{TimeZone, Utc};
use serde_json::json;

use super::*;

fn json_payload(value: Value) -> Payload {
    Payload::Json(value)
}

#[test]
fn pick_value_prefers_earlier_alias_and_skips_blanks() {
    let record = json!({ "Name": "  ", "BusinessName": "Acme", "CompanyName": "Other" });
    assert_eq!(pick_str(&record, BUSINESS_NAME, "x"), "Acme");
}

#[test]
fn pick_value_falls_back_to_case_insensitive_match() {
    let record = json!({ "businessname": "Acme" });
    assert_eq!(pick_opt_str(&record, BUSINESS_NAME).as_deref(), Some("Acme"));
}

#[test]
fn pick_str_uses_fallback_when_absent() {
    assert_eq!(pick_str(&json!({}), BUSINESS_NAME, "Unknown"), "Unknown");
    assert_eq!(pick_str(&json!([1, 2]), BUSINESS_NAME, "Unknown"), "Unknown");
}

#[test]
fn numeric_coercion_is_total() {
    assert_eq!(coerce_u64(&json!("1,234")), 1234);
    assert_eq!(coerce_u64(&json!(" 7 ")), 7);
    assert_eq!(coerce_u64(&json!(3.9)), 3);
    assert_eq!(coerce_u64(&json!(-4)), 0);
    assert_eq!(coerce_u64(&json!("n/a")), 0);
    assert_eq!(coerce_u64(&Value::Null), 0);
    assert!(coerce_f64(&json!("NaN")).abs() < f64::EPSILON);
    assert!(coerce_f64(&json!("inf")).abs() < f64::EPSILON);
    assert!((coerce_f64(&json!("2.5")) - 2.5).abs() < f64::EPSILON);
}

#[test]
fn ids_are_canonical_across_representations() {
    assert_eq!(canonical_id(&json!(42)).as_deref(), Some("42"));
    assert_eq!(canonical_id(&json!(42.0)).as_deref(), Some("42"));
    assert_eq!(canonical_id(&json!(" 42 ")).as_deref(), Some("42"));
    assert_eq!(canonical_id(&json!("")), None);
    assert_eq!(canonical_id(&json!(null)), None);
}

#[test]
fn bare_array_list() {
    let page = extract_list(ListEndpoint::Businesses, &json_payload(json!([{ "ID": 1 }])));
    assert_eq!(page.shape, ListShape::Bare);
    assert_eq!(page.items.len(), 1);
}

#[test]
fn keyed_list_with_pagination_metadata() {
    let payload = json_payload(json!({
        "PageCount": "5",
        "RecordCount": 480,
        "SiteVisitorList": [{ "ID": 1 }, { "ID": 2 }]
    }));
    let page = extract_list(ListEndpoint::Businesses, &payload);
    assert_eq!(
        page.shape,
        ListShape::Keyed {
            key: "SiteVisitorList".into()
        }
    );
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.page_count, Some(5));
    assert_eq!(page.record_count, Some(480));
}

#[test]
fn unknown_key_is_guessed_from_first_array() {
    let payload = json_payload(json!({ "Total": 1, "Whatever": [{ "VisitID": 9 }] }));
    let page = extract_list(ListEndpoint::Visits, &payload);
    assert_eq!(
        page.shape,
        ListShape::Guessed {
            key: "Whatever".into()
        }
    );
    assert_eq!(page.items.len(), 1);
}

#[test]
fn listless_and_text_responses_are_empty() {
    let page = extract_list(ListEndpoint::Pages, &json_payload(json!({ "Message": "none" })));
    assert_eq!(page.shape, ListShape::Unrecognized);
    assert!(page.items.is_empty());

    let page = extract_list(ListEndpoint::Pages, &Payload::Text("<html>".into()));
    assert_eq!(page.shape, ListShape::Unrecognized);
    assert!(page.items.is_empty());
}

#[test]
fn detail_record_unwraps_known_shapes() {
    let plain = json!({ "BusinessID": 5, "Name": "Acme" });
    assert_eq!(extract_record(&json_payload(plain.clone())), Some(plain.clone()));
    assert_eq!(
        extract_record(&json_payload(json!({ "Business": plain.clone() }))),
        Some(plain.clone())
    );
    assert_eq!(
        extract_record(&json_payload(json!([plain.clone()]))),
        Some(plain)
    );
    assert_eq!(extract_record(&json_payload(json!({}))), None);
    assert_eq!(extract_record(&Payload::Text("oops".into())), None);
}

#[test]
fn business_record_is_normalized() {
    let raw = json!({
        "BusinessID": 1001,
        "Name": "Acme Bearings",
        "Town": "Austin",
        "Region": "Texas",
        "Country": "United States",
        "Industry": "Manufacturing",
        "NumberOfVisits": "3",
        "LastVisitDate": "09-01-2026 14:04:00",
        "IsNew": "false"
    });
    let b = normalize_business(&raw);
    assert_eq!(b.id.as_ref().map(BusinessId::as_str), Some("1001"));
    assert_eq!(b.name, "Acme Bearings");
    assert_eq!(b.location.city.as_deref(), Some("Austin"));
    assert_eq!(b.location.state.as_deref(), Some("TX"));
    assert_eq!(b.location.country.as_deref(), Some("USA"));
    assert_eq!(b.visits, 3);
    assert_eq!(
        b.last_visit,
        Some(Utc.with_ymd_and_hms(2026, 1, 9, 14, 4, 0).unwrap())
    );
    assert_eq!(b.is_new, Some(false));
    assert!(!b.generic);
}

#[test]
fn nameless_business_gets_synthetic_generic_name() {
    let b = normalize_business(&json!({ "BusinessID": "42" }));
    assert_eq!(b.name, "Business 42");
    assert!(b.is_generic());

    let b = normalize_business(&json!({}));
    assert_eq!(b.name, "Unknown");
    assert!(b.id.is_none());
}

#[test]
fn visit_record_is_normalized() {
    let raw = json!({
        "VisitID": 77,
        "BusinessID": "1001",
        "StartDateTime": "2026-01-09T14:04:00Z",
        "NumberOfPages": 4,
        "VisitorIP": "203.0.113.9",
        "Referrer": "https://www.google.com/"
    });
    let v = normalize_visit(&raw);
    assert_eq!(v.id.as_ref().map(VisitId::as_str), Some("77"));
    assert_eq!(v.business_id.as_ref().map(BusinessId::as_str), Some("1001"));
    assert_eq!(v.pages, 4);
    assert_eq!(v.ip.as_deref(), Some("203.0.113.9"));
    assert!(v.started_at.is_some());
}

#[test]
fn visit_bare_id_is_not_taken_as_business_id() {
    let v = normalize_visit(&json!({ "ID": 5 }));
    assert_eq!(v.id.as_ref().map(VisitId::as_str), Some("5"));
    assert!(v.business_id.is_none());
}

#[test]
fn visit_business_id_from_nested_business() {
    let v = normalize_visit(&json!({ "VisitID": 1, "Business": { "ID": 8 } }));
    assert_eq!(v.business_id.as_ref().map(BusinessId::as_str), Some("8"));
}

#[test]
fn rep_user_name_from_parts_and_missing_id_dropped() {
    let user = normalize_rep_user(&json!({ "UserID": 12, "FirstName": "Ada", "LastName": "Lovelace" }))
        .unwrap();
    assert_eq!(user.id, "12");
    assert_eq!(user.name, "Ada Lovelace");
    assert!(normalize_rep_user(&json!({ "Name": "No Id" })).is_none());
}

#[test]
fn page_visit_defaults() {
    let p = normalize_page_visit(&json!({ "PageURL": "/pricing", "DateTime": "bogus" }));
    assert_eq!(p.url, "/pricing");
    assert!(p.viewed_at.is_none());
    assert!(p.duration_secs.is_none());
}
