//! Integration tests for the ingestion pipeline
//!
//! These tests use wiremock to stand in for the external gateway and test
//! the discover, ingest, and price-refresh runs end-to-end against a real
//! SQLite database.

use catalog_sift::client::GatewayClient;
use catalog_sift::config::{
    Config, GatewayConfig, OutputConfig, PipelineConfig, SearchEntry, StagingConfig,
};
use catalog_sift::guard::{CandidateFields, FieldSet};
use catalog_sift::pipeline::{
    run_discover, run_ingest, run_price_refresh, DiscoverOptions, IngestOptions,
    PriceRefreshOptions,
};
use catalog_sift::state::StageStatus;
use catalog_sift::storage::{PriceSource, SourceType, SqliteStorage, Storage};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CATALOG_BASE: &str = "https://catalog.example.com";

/// Creates a test configuration pointed at the mock gateway
fn create_test_config(gateway_uri: &str, db_path: &str, search: Vec<SearchEntry>) -> Config {
    Config {
        gateway: GatewayConfig {
            api_key: "test-key".to_string(),
            base_url: gateway_uri.to_string(),
            catalog_base_url: CATALOG_BASE.to_string(),
            country_code: "us".to_string(),
        },
        pipeline: PipelineConfig {
            batch_size: 10,
            request_delay_ms: 0, // No pacing in tests
            max_retries: 0,
            base_backoff_ms: 1,
            max_backoff_ms: 1,
            ..Default::default()
        },
        staging: StagingConfig { max_attempts: 3 },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
        search,
    }
}

fn search_entry(keyword: &str) -> SearchEntry {
    SearchEntry {
        keyword: keyword.to_string(),
        pages: 1,
        priority: 0,
    }
}

/// Gateway target URL for a search page, as the client constructs it
fn search_target(keyword: &str, page: u32) -> String {
    format!("{}/s?k={}&page={}", CATALOG_BASE, keyword, page)
}

/// Gateway target URL for a detail call, as the client constructs it
fn detail_target(external_ref: &str) -> String {
    format!("{}/dp/{}", CATALOG_BASE, external_ref)
}

fn detail_payload(name: &str, price: &str) -> serde_json::Value {
    json!({
        "name": name,
        "brand": "SunCo",
        "pricing": price,
        "product_information": {
            "Product Dimensions": "45.67\"L x 17.71\"W x 1.18\"H",
            "Item Weight": "15.87 pounds",
            "Wattage": "100W",
            "Voltage": "12 Volts"
        }
    })
}

#[tokio::test]
async fn test_discover_then_ingest_flow() {
    let mock_server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("pipeline.db");
    let db_path_str = db_path.to_str().unwrap().to_string();

    // One search page listing two identifiers with prices
    Mock::given(method("GET"))
        .and(query_param("url", search_target("panel", 1)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"asin": "B0TEST00001", "price": {"value": 116.00, "currency": "USD"}},
                {"asin": "B0TEST00002", "price": "$44.98"}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Detail payloads for both identifiers
    Mock::given(method("GET"))
        .and(query_param("url", detail_target("B0TEST00001")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(detail_payload("Solar Panel 100W", "$116.00")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("url", detail_target("B0TEST00002")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(detail_payload("Compact Panel 50W", "$44.98")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &db_path_str, vec![search_entry("panel")]);
    let mut storage = SqliteStorage::new(&db_path).unwrap();
    let client = GatewayClient::new(&config.gateway, config.pipeline.price_tie_break).unwrap();

    // Discovery stages both identifiers
    let report = run_discover(&config, &mut storage, &client, &DiscoverOptions::default())
        .await
        .unwrap();
    assert!(!report.outcome.is_aborted());
    assert_eq!(report.total_staged(), 2);

    // Ingest resolves both into catalog items
    let report = run_ingest(&config, &mut storage, &client, &IngestOptions::default())
        .await
        .unwrap();
    assert!(!report.outcome.is_aborted());
    assert_eq!(report.processed, 2);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 0);

    let item = storage.get_item_by_ref("B0TEST00001").unwrap().unwrap();
    assert_eq!(item.name, "Solar Panel 100W");
    assert_eq!(item.length_cm, Some(116.00));
    assert_eq!(item.width_cm, Some(44.98));
    assert_eq!(item.weight_kg, Some(7.20));
    assert_eq!(item.power_w, Some(100));
    assert_eq!(item.price_usd, Some(116.00));

    let staged = storage.get_staged_by_ref("B0TEST00002").unwrap().unwrap();
    assert_eq!(staged.status, StageStatus::Completed);
    assert!(staged.item_id.is_some());

    // Both ingests priced their items on the detail path
    let observations = storage.recent_price_observations(10).unwrap();
    assert_eq!(observations.len(), 2);
    assert!(observations
        .iter()
        .all(|o| o.source == PriceSource::Detail && o.old_price.is_none()));
}

#[tokio::test]
async fn test_search_first_refresh_makes_no_detail_calls() {
    let mock_server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("pipeline.db");
    let db_path_str = db_path.to_str().unwrap().to_string();

    let mut storage = SqliteStorage::new(&db_path).unwrap();
    let fields = CandidateFields {
        name: Some("Solar Panel 100W".to_string()),
        price_usd: Some(99.99),
        ..Default::default()
    };
    storage
        .insert_item("B0TEST00001", &fields, &FieldSet::new())
        .unwrap();

    // The search page covers the item, so the detail endpoint must never
    // be hit
    Mock::given(method("GET"))
        .and(query_param("url", search_target("panel", 1)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"asin": "B0TEST00001", "price": {"value": 89.99}}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("url", detail_target("B0TEST00001")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &db_path_str, vec![search_entry("panel")]);
    let client = GatewayClient::new(&config.gateway, config.pipeline.price_tie_break).unwrap();

    let options = PriceRefreshOptions {
        refs: vec!["B0TEST00001".to_string()],
        ..Default::default()
    };
    let report = run_price_refresh(&config, &mut storage, &client, &options)
        .await
        .unwrap();

    assert!(!report.outcome.is_aborted());
    assert_eq!(report.examined, 1);
    assert_eq!(report.updated, 1);
    assert_eq!(report.failed, 0);

    let item = storage.get_item_by_ref("B0TEST00001").unwrap().unwrap();
    assert_eq!(item.price_usd, Some(89.99));

    let observations = storage.recent_price_observations(10).unwrap();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].old_price, Some(99.99));
    assert_eq!(observations[0].new_price, 89.99);
    assert_eq!(observations[0].source, PriceSource::Search);
}

#[tokio::test]
async fn test_ingest_aborts_on_access_denial_leaving_rest_pending() {
    let mock_server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("pipeline.db");
    let db_path_str = db_path.to_str().unwrap().to_string();

    let mut storage = SqliteStorage::new(&db_path).unwrap();

    // Ten staged identifiers with strictly descending priority so the
    // claim order is deterministic
    let refs: Vec<String> = (1..=10).map(|i| format!("B0TEST{:05}", i)).collect();
    for (index, external_ref) in refs.iter().enumerate() {
        storage
            .stage(external_ref, SourceType::Manual, None, 100 - index as i64)
            .unwrap();
    }

    // The first two detail calls succeed, the third is blocked
    for external_ref in &refs[..2] {
        Mock::given(method("GET"))
            .and(query_param("url", detail_target(external_ref)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(detail_payload("Solar Panel 100W", "$116.00")),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }
    Mock::given(method("GET"))
        .and(query_param("url", detail_target(&refs[2])))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &db_path_str, vec![]);
    let client = GatewayClient::new(&config.gateway, config.pipeline.price_tie_break).unwrap();

    let report = run_ingest(&config, &mut storage, &client, &IngestOptions::default())
        .await
        .unwrap();

    assert!(report.outcome.is_aborted());
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 0);

    // The blocked identifier and everything after it stay pending with
    // their attempt budget intact
    for external_ref in &refs[2..] {
        let staged = storage.get_staged_by_ref(external_ref).unwrap().unwrap();
        assert_eq!(staged.status, StageStatus::Pending, "{}", external_ref);
        assert_eq!(staged.attempts, 0, "{}", external_ref);
    }
    for external_ref in &refs[..2] {
        let staged = storage.get_staged_by_ref(external_ref).unwrap().unwrap();
        assert_eq!(staged.status, StageStatus::Completed, "{}", external_ref);
    }

    let stats = storage.staging_stats().unwrap();
    assert_eq!(stats.by_status.get(&StageStatus::Pending), Some(&8));
    assert_eq!(stats.by_status.get(&StageStatus::Completed), Some(&2));
}

#[tokio::test]
async fn test_ingest_skips_cataloged_identifier_without_a_call() {
    let mock_server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("pipeline.db");
    let db_path_str = db_path.to_str().unwrap().to_string();

    let mut storage = SqliteStorage::new(&db_path).unwrap();
    storage
        .stage("B0TEST00001", SourceType::Manual, None, 0)
        .unwrap();

    // The item lands in the catalog after staging (say, another run)
    let fields = CandidateFields {
        name: Some("Solar Panel 100W".to_string()),
        ..Default::default()
    };
    storage
        .insert_item("B0TEST00001", &fields, &FieldSet::new())
        .unwrap();

    // No gateway call is allowed
    Mock::given(method("GET"))
        .and(query_param("url", detail_target("B0TEST00001")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &db_path_str, vec![]);
    let client = GatewayClient::new(&config.gateway, config.pipeline.price_tie_break).unwrap();

    let report = run_ingest(&config, &mut storage, &client, &IngestOptions::default())
        .await
        .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.succeeded, 0);

    let staged = storage.get_staged_by_ref("B0TEST00001").unwrap().unwrap();
    assert_eq!(staged.status, StageStatus::Skipped);
}

#[tokio::test]
async fn test_refresh_rejects_zero_price_from_detail() {
    let mock_server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("pipeline.db");
    let db_path_str = db_path.to_str().unwrap().to_string();

    let mut storage = SqliteStorage::new(&db_path).unwrap();
    let fields = CandidateFields {
        name: Some("Gone Panel".to_string()),
        price_usd: Some(59.99),
        ..Default::default()
    };
    storage
        .insert_item("B0TEST00001", &fields, &FieldSet::new())
        .unwrap();

    // An unavailable item reports a zero price; the stored value must
    // survive
    Mock::given(method("GET"))
        .and(query_param("url", detail_target("B0TEST00001")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Gone Panel",
            "availability_status": "Currently unavailable"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &db_path_str, vec![]);
    let client = GatewayClient::new(&config.gateway, config.pipeline.price_tie_break).unwrap();

    let options = PriceRefreshOptions {
        refs: vec!["B0TEST00001".to_string()],
        detail_only: true,
        ..Default::default()
    };
    let report = run_price_refresh(&config, &mut storage, &client, &options)
        .await
        .unwrap();

    assert_eq!(report.rejected, 1);
    assert_eq!(report.updated, 0);

    let item = storage.get_item_by_ref("B0TEST00001").unwrap().unwrap();
    assert_eq!(item.price_usd, Some(59.99));
    assert!(storage.recent_price_observations(10).unwrap().is_empty());
}
