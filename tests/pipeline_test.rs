//! End-to-end pipeline tests over canned documents: extraction strategy
//! selection, normalization, dedup, and catalog recovery — everything short
//! of a live browser.

use solescout::extract::{extract_with_strategy, Strategy};
use solescout::normalize::normalize;
use solescout::store::{JsonFileStore, MemStore, ProductSink};
use solescout::{batch, ExtractionError, NormalizationError, ProductRecord};

/// Full product page the way the target site actually renders it: the state
/// payload inline in the data island script.
fn product_page() -> String {
    let payload = serde_json::json!({
        "props": { "pageProps": { "req": { "appContext": { "states": {
            "query": { "value": { "queries": [
                { "queryKey": ["GetRelatedProducts"], "state": { "data": {} } },
                { "queryKey": ["GetProduct"], "state": { "data": { "product": {
                    "id": "p1",
                    "title": "Shoe",
                    "brand": "Nike",
                    "styleId": "S1",
                    "variants": [
                        { "hidden": false, "traits": { "size": "10" } },
                        { "hidden": true,  "traits": { "size": "9" } }
                    ],
                    "media": { "imageUrl": "http://x/i.png" }
                }}}}
            ]}}
        }}}}}
    });
    format!(
        "<html><head><title>Shoe | Shop</title></head><body>\
         <div id=\"root\">…</div>\
         <script id=\"__NEXT_DATA__\" type=\"application/json\">{}</script>\
         </body></html>",
        payload
    )
}

#[test]
fn full_page_extracts_and_normalizes() {
    let html = product_page();
    let (payload, strategy) = extract_with_strategy(&html).unwrap();
    assert_eq!(strategy, Strategy::DataIsland);

    let record = normalize(&payload).unwrap();
    assert_eq!(record.id.as_deref(), Some("p1"));
    assert_eq!(record.title.as_deref(), Some("Shoe"));
    assert_eq!(record.brand.as_deref(), Some("Nike"));
    assert_eq!(record.style_id.as_deref(), Some("S1"));
    assert_eq!(record.sizes, vec!["10".to_string()]);
    assert_eq!(record.image_url.as_deref(), Some("http://x/i.png"));
}

#[test]
fn assignment_fallback_when_island_is_empty() {
    // Broken island plus an inline bootstrap assignment, as seen on partially
    // rendered pages.
    let html = "<html><body>\
        <script id=\"__NEXT_DATA__\" type=\"application/json\"></script>\
        <script>window.__NEXT_DATA__ = {\"props\":{\"x\":1}};</script>\
        </body></html>";
    let (payload, strategy) = extract_with_strategy(html).unwrap();
    assert_eq!(strategy, Strategy::GlobalAssignment);
    assert_eq!(payload["props"]["x"], 1);
}

#[test]
fn balanced_scan_handles_unterminated_assignment() {
    // No island, no trailing semicolon, nested braces in the payload.
    let html = "<html><body><script>\
        var key = \"GetProduct\"; window.__NEXT_DATA__ = {\"a\":{\"b\":{\"c\":3}},\"d\":4}\n\
        doSomethingElse();\
        </script></body></html>";
    let (payload, strategy) = extract_with_strategy(html).unwrap();
    assert_eq!(strategy, Strategy::BalancedScan);
    assert_eq!(payload["a"]["b"]["c"], 3);
    assert_eq!(payload["d"], 4);
}

#[test]
fn blocked_page_short_circuits_extraction() {
    let html = "<html><head><title>Access Denied</title></head>\
                <body>Access Denied: you don't have permission</body></html>";
    assert_eq!(
        extract_with_strategy(html).unwrap_err(),
        ExtractionError::Blocked
    );
}

#[test]
fn page_without_payload_is_not_found() {
    let html = "<html><body><p>plain page, no app state</p></body></html>";
    assert_eq!(
        extract_with_strategy(html).unwrap_err(),
        ExtractionError::NotFound
    );
}

#[test]
fn missing_product_query_is_reported() {
    let payload = serde_json::json!({
        "props": { "pageProps": { "req": { "appContext": { "states": {
            "query": { "value": { "queries": [
                { "queryKey": ["GetPrices"], "state": { "data": {} } }
            ]}}
        }}}}}
    });
    assert_eq!(
        normalize(&payload).unwrap_err(),
        NormalizationError::ProductQueryAbsent
    );
}

#[test]
fn fetched_page_becomes_timestamped_record() {
    let fetched = solescout::FetchResult {
        final_url: "https://shop.example/p/shoe".into(),
        html: product_page(),
        title: "Shoe | Shop".into(),
        was_blocked: false,
    };
    let record = batch::process_fetched(&fetched).unwrap();
    assert_eq!(record.id.as_deref(), Some("p1"));
    let stamp = record.scraped_at.expect("capture timestamp");
    assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
}

#[test]
fn mem_store_dedups_by_id() {
    let mut sink = MemStore::default();
    let record = ProductRecord {
        id: Some("p1".into()),
        ..Default::default()
    };
    assert!(!sink.contains_id("p1"));
    sink.save(record.clone()).unwrap();
    assert!(sink.contains_id("p1"));
    assert!(!sink.contains_id("p2"));
    assert_eq!(sink.len(), 1);
}

#[test]
fn catalog_survives_corruption_and_restarts() {
    let dir = std::env::temp_dir().join("solescout_pipeline_catalog");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("catalog.json");

    // Corrupt content must load as empty, not panic or error.
    std::fs::write(&path, "]]]]garbage").unwrap();
    let mut store = JsonFileStore::open(&path);
    assert!(store.is_empty());

    store
        .save(ProductRecord {
            id: Some("p1".into()),
            ..Default::default()
        })
        .unwrap();

    // A restart sees the repaired file.
    let reopened = JsonFileStore::open(&path);
    assert_eq!(reopened.len(), 1);
    assert!(reopened.contains_id("p1"));

    // A file with the wrong top-level shape also recovers.
    std::fs::write(&path, r#"{"items": []}"#).unwrap();
    assert!(JsonFileStore::open(&path).is_empty());
}
