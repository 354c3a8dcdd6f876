use super::*;

fn test_client(base_url: &str) -> ProxyClient {
    ProxyClient::new(base_url, ClientSettings::default())
        .expect("client construction should not fail")
}

#[test]
fn build_url_joins_path_and_encodes_query() {
    let client = test_client("https://proxy.example.com");
    let request = ProxyRequest::new("/Visit/GetAllVisits")
        .param("datefrom", "01-01-2026 00:00:00")
        .param("pageno", "2");
    let url = client.build_url(&request).unwrap();
    assert_eq!(
        url.as_str(),
        "https://proxy.example.com/Visit/GetAllVisits?datefrom=01-01-2026+00%3A00%3A00&pageno=2"
    );
}

#[test]
fn build_url_keeps_base_path_prefix() {
    let client = test_client("https://worker.example.com/lf/");
    let url = client
        .build_url(&ProxyRequest::new("Business/GetBusiness").param("businessid", "42"))
        .unwrap();
    assert_eq!(
        url.as_str(),
        "https://worker.example.com/lf/Business/GetBusiness?businessid=42"
    );
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = ProxyClient::new("not a url", ClientSettings::default()).unwrap_err();
    assert!(matches!(err, ProxyError::InvalidBaseUrl { .. }));
}

#[test]
fn payload_parse_keeps_non_json_text() {
    assert_eq!(
        Payload::parse("<html>oops</html>".to_owned()),
        Payload::Text("<html>oops</html>".to_owned())
    );
    assert_eq!(
        Payload::parse("[1,2]".to_owned()).as_json(),
        Some(&serde_json::json!([1, 2]))
    );
}

#[test]
fn widened_gap_doubles_with_floor_and_cap() {
    assert_eq!(widened_gap(250), 1_000);
    assert_eq!(widened_gap(800), 1_600);
    assert_eq!(widened_gap(8_000), 10_000);
    assert_eq!(widened_gap(20_000), 20_000);
}
