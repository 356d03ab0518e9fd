use pretty_assertions::assert_eq;
use routewatch_core::{normalize, unwrap_payload, Normalizer, Shape};
use serde_json::{json, Value};

#[test]
fn arrays_pass_through_unchanged() {
    let input = json!([{"id": 1}, {"id": 2}, 3]);
    assert_eq!(normalize(&input), vec![json!({"id": 1}), json!({"id": 2}), json!(3)]);
}

#[test]
fn normalizing_a_normalized_sequence_is_idempotent() {
    let inputs = [
        json!({"success": true, "data": [{"id": "a"}, {"id": "b"}]}),
        json!({"results": [{"latitude": 1.0, "longitude": 2.0}]}),
        json!({"latitude": 10.5, "longitude": 76.1, "name": "Toll plaza"}),
        json!({}),
    ];
    for input in inputs {
        let once = normalize(&input);
        let twice = normalize(&Value::Array(once.clone()));
        assert_eq!(once, twice, "input {input}");
    }
}

#[test]
fn every_supported_shape_yields_a_sequence() {
    let cases = [
        (json!([{"id": 1}]), 1),
        (json!({"success": true, "data": [{"id": 1}, {"id": 2}]}), 2),
        (json!({"success": false, "data": [{"id": 1}]}), 0),
        (json!({"results": [{"id": 1}]}), 1),
        (json!({"items": [{"id": 1}, {"id": 2}, {"id": 3}]}), 3),
        (json!({"latitude": 12.9, "longitude": 77.5}), 1),
        (json!({}), 0),
        (Value::Null, 0),
        (json!("not a collection"), 0),
        (json!(42), 0),
    ];
    for (input, expected) in cases {
        assert_eq!(normalize(&input).len(), expected, "input {input}");
    }
}

#[test]
fn failed_envelope_wins_over_nested_data() {
    let input = json!({"success": false, "message": "route not found", "data": [{"id": 1}]});
    assert_eq!(Normalizer::default().detect(&input), Some(Shape::FailedEnvelope));
    assert!(normalize(&input).is_empty());
}

#[test]
fn nested_data_envelopes_are_unwrapped_recursively() {
    let input = json!({
        "success": true,
        "data": {"criticalPoints": [{"lat": 1.0, "lng": 2.0, "riskLevel": "high"}]}
    });
    assert_eq!(
        normalize(&input),
        vec![json!({"lat": 1.0, "lng": 2.0, "riskLevel": "high"})]
    );

    let doubly_nested = json!({"data": {"data": [{"id": "deep"}]}});
    assert_eq!(normalize(&doubly_nested), vec![json!({"id": "deep"})]);
}

#[test]
fn null_data_falls_through_to_other_shapes() {
    let input = json!({"data": null, "items": [{"id": 7}]});
    assert_eq!(normalize(&input), vec![json!({"id": 7})]);
}

#[test]
fn named_collections_follow_the_fixed_priority_list() {
    // Source order puts `items` first, but `sharpTurns` is earlier in the probe list.
    let input = json!({
        "items": [{"id": "generic"}],
        "sharpTurns": [{"id": "turn"}],
        "results": [{"id": "result"}]
    });
    assert_eq!(normalize(&input), vec![json!({"id": "turn"})]);
}

#[test]
fn named_collection_beats_single_record() {
    let input = json!({"latitude": 1.0, "longitude": 2.0, "points": [{"id": 1}]});
    assert_eq!(Normalizer::default().detect(&input), Some(Shape::NamedCollection));
    assert_eq!(normalize(&input), vec![json!({"id": 1})]);
}

#[test]
fn coordinate_bearing_objects_are_wrapped() {
    for input in [
        json!({"lat": 1.0, "lng": 2.0}),
        json!({"lat": 1.0, "lon": 2.0}),
        json!({"coordinates": [77.5, 12.9]}),
    ] {
        assert_eq!(normalize(&input), vec![input.clone()]);
    }
    // Half a coordinate pair is not a record.
    assert!(normalize(&json!({"latitude": 1.0, "name": "x"})).is_empty());
}

#[test]
fn fallback_scan_takes_the_first_array_in_source_order() {
    let input = json!({
        "summary": {"count": 2},
        "zeta": [{"id": "first"}],
        "alpha": [{"id": "second"}]
    });
    assert_eq!(Normalizer::default().detect(&input), Some(Shape::FallbackScan));
    assert_eq!(normalize(&input), vec![json!({"id": "first"})]);
}

#[test]
fn custom_collection_keys_replace_the_defaults() {
    let normalizer = Normalizer::new(["hazards"]);
    assert_eq!(normalizer.collection_keys(), ["hazards".to_string()]);
    // `routes` comes first in the source but is no longer probed.
    let input = json!({"routes": [{"id": 1}], "hazards": [{"id": 2}]});
    assert_eq!(normalizer.normalize(&input), vec![json!({"id": 2})]);

    let unknown = json!({"routes": [{"id": 1}]});
    assert_eq!(normalizer.detect(&unknown), Some(Shape::FallbackScan));
}

#[test]
fn unwrap_payload_strips_data_envelopes_but_not_status_objects() {
    let wrapped = json!({"success": true, "data": {"status": "processing", "totalRoutes": 4}});
    assert_eq!(
        unwrap_payload(&wrapped),
        &json!({"status": "processing", "totalRoutes": 4})
    );

    let status_with_data = json!({"status": "completed", "data": {"routes": []}});
    assert_eq!(unwrap_payload(&status_with_data), &status_with_data);

    let array = json!([1, 2]);
    assert_eq!(unwrap_payload(&array), &array);
}
