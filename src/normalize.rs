//! Product normalization: walk the extracted payload down to the client-side
//! query cache, pick out the `GetProduct` entry, and project it into a
//! [`ProductRecord`].

use serde_json::Value;

use crate::core::error::NormalizationError;
use crate::core::types::ProductRecord;
use crate::extract::QUERY_MARKER;

/// Fixed descent path from the payload root to the query-cache list.
const CACHE_PATH: &[&str] = &[
    "props",
    "pageProps",
    "req",
    "appContext",
    "states",
    "query",
    "value",
    "queries",
];

/// Project the raw payload into a normalized record.
///
/// Any missing intermediate key on the descent path is a
/// [`NormalizationError::PathMissing`]; a cache without a usable
/// `GetProduct` entry is [`NormalizationError::ProductQueryAbsent`]. Missing
/// *leaf* fields on the product itself are tolerated — they project to
/// `None`, matching the loosely-shaped upstream data.
pub fn normalize(payload: &Value) -> Result<ProductRecord, NormalizationError> {
    let mut node = payload;
    for &key in CACHE_PATH {
        node = node
            .get(key)
            .ok_or(NormalizationError::PathMissing(key))?;
    }
    let queries = node
        .as_array()
        .ok_or(NormalizationError::PathMissing("queries"))?;

    let product = find_product_query(queries)?;

    Ok(ProductRecord {
        id: string_field(product, "id"),
        title: string_field(product, "title"),
        brand: string_field(product, "brand"),
        style_id: string_field(product, "styleId"),
        sizes: collect_sizes(product),
        image_url: product
            .get("media")
            .and_then(|m| m.get("imageUrl"))
            .and_then(Value::as_str)
            .map(str::to_string),
        scraped_at: None,
    })
}

/// First cache entry whose `queryKey[0]` equals the product discriminator.
/// Duplicate entries are possible upstream; first match wins.
fn find_product_query(queries: &[Value]) -> Result<&Value, NormalizationError> {
    queries
        .iter()
        .find(|q| {
            q.get("queryKey")
                .and_then(|k| k.get(0))
                .and_then(Value::as_str)
                == Some(QUERY_MARKER)
        })
        .and_then(|q| q.get("state")?.get("data")?.get("product"))
        .filter(|p| p.is_object())
        .ok_or(NormalizationError::ProductQueryAbsent)
}

fn string_field(product: &Value, key: &str) -> Option<String> {
    product.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Sizes of the variants not flagged hidden. Variants lacking the size trait
/// contribute nothing — absent, not an error.
fn collect_sizes(product: &Value) -> Vec<String> {
    product
        .get("variants")
        .and_then(Value::as_array)
        .map(|variants| {
            variants
                .iter()
                .filter(|v| !v.get("hidden").and_then(Value::as_bool).unwrap_or(false))
                .filter_map(|v| {
                    let size = v.get("traits")?.get("size")?;
                    match size {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload_with_queries(queries: Value) -> Value {
        json!({
            "props": { "pageProps": { "req": { "appContext": { "states": {
                "query": { "value": { "queries": queries } }
            }}}}}
        })
    }

    #[test]
    fn test_full_projection_excludes_hidden_variants() {
        let payload = payload_with_queries(json!([{
            "queryKey": ["GetProduct"],
            "state": { "data": { "product": {
                "id": "p1",
                "title": "Shoe",
                "brand": "Nike",
                "styleId": "S1",
                "variants": [
                    { "hidden": false, "traits": { "size": "10" } },
                    { "hidden": true,  "traits": { "size": "9" } }
                ],
                "media": { "imageUrl": "http://x/i.png" }
            }}}
        }]));

        let rec = normalize(&payload).unwrap();
        assert_eq!(rec.id.as_deref(), Some("p1"));
        assert_eq!(rec.title.as_deref(), Some("Shoe"));
        assert_eq!(rec.brand.as_deref(), Some("Nike"));
        assert_eq!(rec.style_id.as_deref(), Some("S1"));
        assert_eq!(rec.sizes, vec!["10".to_string()]);
        assert_eq!(rec.image_url.as_deref(), Some("http://x/i.png"));
    }

    #[test]
    fn test_variant_without_size_trait_is_dropped() {
        let payload = payload_with_queries(json!([{
            "queryKey": ["GetProduct"],
            "state": { "data": { "product": {
                "id": "p2",
                "variants": [
                    { "hidden": false, "traits": {} },
                    { "hidden": false },
                    { "hidden": false, "traits": { "size": "8.5" } }
                ]
            }}}
        }]));
        assert_eq!(normalize(&payload).unwrap().sizes, vec!["8.5".to_string()]);
    }

    #[test]
    fn test_missing_path_key_reports_which() {
        let payload = json!({ "props": { "pageProps": {} } });
        assert_eq!(
            normalize(&payload).unwrap_err(),
            NormalizationError::PathMissing("req")
        );
    }

    #[test]
    fn test_non_array_queries_is_path_missing() {
        let payload = payload_with_queries(json!("nope"));
        assert_eq!(
            normalize(&payload).unwrap_err(),
            NormalizationError::PathMissing("queries")
        );
    }

    #[test]
    fn test_absent_product_query() {
        let payload = payload_with_queries(json!([
            { "queryKey": ["GetRelatedProducts"], "state": { "data": {} } }
        ]));
        assert_eq!(
            normalize(&payload).unwrap_err(),
            NormalizationError::ProductQueryAbsent
        );
    }

    #[test]
    fn test_first_matching_entry_wins() {
        let payload = payload_with_queries(json!([
            { "queryKey": ["GetProduct"], "state": { "data": { "product": { "id": "first" } } } },
            { "queryKey": ["GetProduct"], "state": { "data": { "product": { "id": "second" } } } }
        ]));
        assert_eq!(normalize(&payload).unwrap().id.as_deref(), Some("first"));
    }

    #[test]
    fn test_entry_without_product_record_is_absent() {
        let payload = payload_with_queries(json!([
            { "queryKey": ["GetProduct"], "state": { "data": {} } }
        ]));
        assert_eq!(
            normalize(&payload).unwrap_err(),
            NormalizationError::ProductQueryAbsent
        );
    }

    #[test]
    fn test_numeric_size_traits_are_stringified() {
        let payload = payload_with_queries(json!([{
            "queryKey": ["GetProduct"],
            "state": { "data": { "product": {
                "id": "p3",
                "variants": [ { "traits": { "size": 11 } } ]
            }}}
        }]));
        assert_eq!(normalize(&payload).unwrap().sizes, vec!["11".to_string()]);
    }
}
