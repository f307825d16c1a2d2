//! Verify query construction against JSON test vectors stored in
//! `test-vectors/`.
//!
//! Each case gives a url, the arguments that follow it, and either the
//! resulting url or the expected error variant. Map cases hold at most one
//! key so the expected url does not depend on iteration order.

use ajax_core::{add_query_param_value, AjaxError};

#[test]
fn query_test_vectors() {
    let raw = include_str!("../../test-vectors/query.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let args = case["args"].as_array().unwrap();
        let result = add_query_param_value(&case["url"], args);

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            match expected_error.as_str().unwrap() {
                "InvalidArgument" => {
                    assert!(matches!(err, AjaxError::InvalidArgument(_)), "{name}: expected InvalidArgument")
                }
                other => panic!("{name}: unknown expected_error: {other}"),
            }
        } else {
            let url = result.unwrap_or_else(|e| panic!("{name}: {e}"));
            assert_eq!(url, case["expected"].as_str().unwrap(), "{name}");
        }
    }
}

#[test]
fn map_covers_every_key_exactly_once() {
    let args = [serde_json::json!({"a": "1", "b c": "x y", "d": 4, "e": true})];
    let url = add_query_param_value(&serde_json::json!("http://x/p"), &args).unwrap();

    let query = url.strip_prefix("http://x/p?").unwrap();
    assert!(!query.contains('?'));
    let mut pairs: Vec<&str> = query.split('&').collect();
    pairs.sort_unstable();
    assert_eq!(pairs, vec!["a=1", "b%20c=x%20y", "d=4", "e=true"]);
}
