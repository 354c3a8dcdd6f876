//! Aggregation, enrichment, and page-summary flows against wiremock.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use lfdash_client::pages::summarize_business_pages;
use lfdash_client::{
    aggregate_visits, enrich_businesses, hydrate_assigned, AggregateSettings, ClientSettings,
    ProxyClient,
};
use lfdash_core::{Business, BusinessId, DateRange, VisitStats};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn test_client(base_url: &str) -> ProxyClient {
    let settings = ClientSettings {
        request_gap_ms: 0,
        max_retries: 0,
        backoff_base_ms: 1,
        ..ClientSettings::default()
    };
    ProxyClient::new(base_url, settings).expect("client construction should not fail")
}

fn range() -> DateRange {
    DateRange {
        start: Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2026, 1, 9, 0, 0, 0).unwrap(),
    }
}

fn id(raw: &str) -> BusinessId {
    BusinessId::new(raw).expect("non-empty id")
}

/// Two visits per page: one for business `b{page}` and one shared by `shared`.
fn visit_page(page: u32, page_count: u32) -> Value {
    json!({
        "PageCount": page_count,
        "VisitList": [
            { "VisitID": page * 10, "BusinessID": format!("b{page}"), "StartDateTime": format!("0{page}-01-2026 10:00:00"), "NumberOfPages": 2 },
            { "VisitID": page * 10 + 1, "BusinessID": "shared", "StartDateTime": format!("0{page}-01-2026 11:00:00"), "NumberOfPages": 1, "IPAddress": "198.51.100.7" }
        ]
    })
}

async fn mount_visit_page(server: &MockServer, page: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/Visit/GetAllVisits"))
        .and(query_param("pageno", page.to_string()))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn failed_middle_page_is_counted_not_fatal() {
    let server = MockServer::start().await;
    for page in 1..=5 {
        let response = if page == 2 {
            ResponseTemplate::new(500).set_body_string("boom")
        } else {
            ResponseTemplate::new(200).set_body_json(visit_page(page, 5))
        };
        mount_visit_page(&server, page, response).await;
    }

    let client = test_client(&server.uri());
    let settings = AggregateSettings {
        page_size: 2,
        max_pages: 10,
        recent_sample_size: 3,
    };
    let agg = aggregate_visits(&client, &range(), settings)
        .await
        .expect("first page succeeded");

    assert!(!agg.capped);
    assert_eq!(agg.error_count, 1);
    assert_eq!(agg.pages_fetched, 4);
    assert_eq!(agg.total_pages, Some(5));
    assert!(agg.stats.get(&id("b2")).is_none());
    for page in [1, 3, 4, 5] {
        assert!(agg.stats.get(&id(&format!("b{page}"))).is_some());
    }
    assert_eq!(agg.stats.get(&id("shared")).map(|s| s.visits), Some(4));
    assert_eq!(agg.stats.total_visits(), agg.visits_counted);
    assert_eq!(agg.visits_counted, 8);
    assert_eq!(agg.recent.len(), 3);
    assert_eq!(agg.ip_harvest.len(), 4);
}

#[tokio::test]
async fn page_cap_flags_result_as_capped() {
    let server = MockServer::start().await;
    for page in 1..=3 {
        mount_visit_page(
            &server,
            page,
            ResponseTemplate::new(200).set_body_json(visit_page(page, 9)),
        )
        .await;
    }

    let client = test_client(&server.uri());
    let settings = AggregateSettings {
        page_size: 2,
        max_pages: 3,
        recent_sample_size: 10,
    };
    let agg = aggregate_visits(&client, &range(), settings)
        .await
        .expect("aggregation should succeed");

    assert!(agg.capped);
    assert_eq!(agg.pages_fetched, 3);
    assert_eq!(agg.error_count, 0);
}

#[tokio::test]
async fn short_page_ends_walk_when_total_is_unknown() {
    let server = MockServer::start().await;
    mount_visit_page(
        &server,
        1,
        ResponseTemplate::new(200).set_body_json(json!([
            { "VisitID": 1, "BusinessID": "a" },
            { "VisitID": 2, "BusinessID": "b" },
            { "VisitID": 3, "BusinessID": "c" }
        ])),
    )
    .await;
    mount_visit_page(
        &server,
        2,
        ResponseTemplate::new(200).set_body_json(json!([
            { "VisitID": 4, "BusinessID": "a" },
            { "VisitID": 5 }
        ])),
    )
    .await;

    let client = test_client(&server.uri());
    let settings = AggregateSettings {
        page_size: 3,
        max_pages: 10,
        recent_sample_size: 10,
    };
    let agg = aggregate_visits(&client, &range(), settings)
        .await
        .expect("aggregation should succeed");

    assert_eq!(agg.pages_fetched, 2);
    assert_eq!(agg.total_pages, None);
    assert!(!agg.capped);
    assert_eq!(agg.error_count, 0);
    assert_eq!(agg.visits_counted, 4);
    assert_eq!(agg.skipped, 1);
    assert_eq!(agg.stats.get(&id("a")).map(|s| s.visits), Some(2));
}

#[tokio::test]
async fn first_page_failure_propagates() {
    let server = MockServer::start().await;
    mount_visit_page(&server, 1, ResponseTemplate::new(503)).await;

    let client = test_client(&server.uri());
    let result = aggregate_visits(&client, &range(), AggregateSettings::default()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn enrichment_merges_stats_and_falls_back_to_placeholders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Business/GetBusiness"))
        .and(query_param("businessid", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "BusinessID": 1,
            "Name": "Acme",
            "Country": "United Kingdom",
            "NumberOfVisits": 99
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Business/GetBusiness"))
        .and(query_param("businessid", "2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Business/GetBusiness"))
        .and(query_param("businessid", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let stats = |visits| VisitStats {
        visits,
        pages: visits * 2,
        ..VisitStats::default()
    };
    let ordered = vec![(id("1"), stats(5)), (id("2"), stats(3)), (id("3"), stats(1))];

    let enrichment = enrich_businesses(&client, &ordered, 2).await;

    assert_eq!(enrichment.fallbacks, 2);
    let names: Vec<&str> = enrichment.businesses.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["Acme", "Business 2", "Business 3"]);
    let acme = &enrichment.businesses[0];
    assert_eq!(acme.visits, 5);
    assert_eq!(acme.pages, 10);
    assert_eq!(acme.location.country.as_deref(), Some("UK"));
    assert!(enrichment.businesses[1].is_generic());
}

/// Answers detail lookups slowly and records when each one arrived.
#[derive(Clone, Default)]
struct ArrivalLog(Arc<Mutex<Vec<(String, Instant)>>>);

const DETAIL_DELAY: Duration = Duration::from_millis(300);

impl Respond for ArrivalLog {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "businessid")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        self.0.lock().unwrap().push((id.clone(), Instant::now()));
        ResponseTemplate::new(200)
            .set_body_json(json!({ "Name": format!("Co {id}") }))
            .set_delay(DETAIL_DELAY)
    }
}

#[tokio::test]
async fn enrichment_batches_settle_before_the_next_starts() {
    let server = MockServer::start().await;
    let log = ArrivalLog::default();
    Mock::given(method("GET"))
        .and(path("/Business/GetBusiness"))
        .respond_with(log.clone())
        .expect(5)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let ordered: Vec<(BusinessId, VisitStats)> = (1..=5)
        .map(|n| {
            let stats = VisitStats {
                visits: 1,
                ..VisitStats::default()
            };
            (id(&n.to_string()), stats)
        })
        .collect();

    let enrichment = enrich_businesses(&client, &ordered, 2).await;
    assert_eq!(enrichment.fallbacks, 0);
    assert_eq!(enrichment.businesses.len(), 5);

    let mut arrivals = log.0.lock().unwrap().clone();
    arrivals.sort_by_key(|(_, at)| *at);

    // Lookups arriving within half a response delay of each other were in flight together.
    let mut waves: Vec<Vec<String>> = Vec::new();
    let mut previous: Option<Instant> = None;
    for (business_id, at) in arrivals {
        match previous {
            Some(prev) if at.duration_since(prev) < DETAIL_DELAY / 2 => {
                waves.last_mut().unwrap().push(business_id);
            }
            _ => waves.push(vec![business_id]),
        }
        previous = Some(at);
    }
    for wave in &mut waves {
        wave.sort();
    }
    assert_eq!(waves, [vec!["1", "2"], vec!["3", "4"], vec!["5"]]);
}

#[tokio::test]
async fn hydration_skips_businesses_with_native_activity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Visit/GetVisitsByBusiness"))
        .and(query_param("businessid", "quiet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "RecordCount": 2,
            "Visits": [
                { "VisitID": 1, "StartDateTime": "05-01-2026 09:00:00", "NumberOfPages": 3 },
                { "VisitID": 2, "StartDateTime": "06-01-2026 09:00:00", "NumberOfPages": 1 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Visit/GetVisitsByBusiness"))
        .and(query_param("businessid", "busy"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let mut businesses = vec![
        Business {
            id: Some(id("busy")),
            name: "Busy Co".into(),
            visits: 7,
            ..Business::default()
        },
        Business {
            id: Some(id("quiet")),
            name: "Quiet Co".into(),
            ..Business::default()
        },
    ];

    let hydrated = hydrate_assigned(&client, &mut businesses, &range(), 5).await;
    assert_eq!(hydrated, 1);
    assert_eq!(businesses[0].visits, 7);
    assert_eq!(businesses[1].visits, 2);
    assert_eq!(businesses[1].pages, 4);
    assert_eq!(
        businesses[1].last_visit,
        Some(Utc.with_ymd_and_hms(2026, 1, 6, 9, 0, 0).unwrap())
    );

    // Second pass finds nothing left to fetch.
    assert_eq!(hydrate_assigned(&client, &mut businesses, &range(), 5).await, 0);
}

#[tokio::test]
async fn business_pages_are_summarized_across_visits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Visit/GetVisitsByBusiness"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "VisitID": 10, "EndDateTime": "05-01-2026 09:05:00" },
            { "VisitID": 11 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Page/GetPagesByVisit"))
        .and(query_param("visitid", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Pages": [
            { "PageURL": "/pricing", "DateTime": "05-01-2026 09:00:00" },
            { "PageURL": "/contact", "DateTime": "05-01-2026 09:02:00" }
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Page/GetPagesByVisit"))
        .and(query_param("visitid", "11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "PageURL": "/pricing", "PageTitle": "Pricing", "DateTime": "06-01-2026 10:00:00" }
        ])))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let summary = summarize_business_pages(&client, &id("42"), &range(), 5)
        .await
        .expect("summary should succeed");

    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].url, "/pricing");
    assert_eq!(summary[0].views, 2);
    assert_eq!(summary[0].title.as_deref(), Some("Pricing"));
    assert_eq!(summary[0].avg_duration_secs, Some(120.0));
    assert_eq!(summary[1].url, "/contact");
    assert_eq!(summary[1].avg_duration_secs, Some(180.0));
}
