use pretty_assertions::assert_eq;
use routewatch_core::{
    AnalysisDepth, DataCollectionStats, JobDescriptor, JobProgress, JobStatus, ProcessingOptions,
    VisibilityStats, PLACEHOLDER_CURRENT_ROUTE, PLACEHOLDER_TIME_REMAINING,
};
use serde_json::json;

#[test]
fn partial_payload_defaults_every_missing_field() {
    let progress = JobProgress::from_payload(&json!({"status": "processing"}));

    assert_eq!(progress.status, JobStatus::Processing);
    assert_eq!(progress.total_routes, 0);
    assert_eq!(progress.completed_routes, 0);
    assert_eq!(progress.failed_routes, 0);
    assert_eq!(progress.current_route, PLACEHOLDER_CURRENT_ROUTE);
    assert_eq!(progress.estimated_time_remaining, PLACEHOLDER_TIME_REMAINING);
    assert_eq!(progress.visibility, VisibilityStats::default());
    assert_eq!(progress.data_collection, DataCollectionStats::default());
}

#[test]
fn full_payload_is_read_field_by_field() {
    let progress = JobProgress::from_payload(&json!({
        "status": "processing",
        "currentRoute": "Route 7: Pune -> Mumbai",
        "totalRoutes": 20,
        "completedRoutes": "5",
        "failedRoutes": 1,
        "estimatedTimeRemaining": {"minutes": 4, "seconds": 30},
        "visibilityAnalysis": {
            "attempted": 6,
            "successful": 5,
            "failed": 1,
            "totalSharpTurns": 12,
            "totalBlindSpots": 3
        },
        "enhancedDataCollection": {
            "totalDataPoints": 250,
            "weatherPoints": 40,
            "trafficPoints": 60,
            "emergencyServices": [{"id": 1}, {"id": 2}],
            "networkPoints": 8
        }
    }));

    assert_eq!(progress.current_route, "Route 7: Pune -> Mumbai");
    assert_eq!(progress.total_routes, 20);
    assert_eq!(progress.completed_routes, 5);
    assert_eq!(progress.failed_routes, 1);
    assert_eq!(progress.estimated_time_remaining, "4m 30s");
    assert_eq!(
        progress.visibility,
        VisibilityStats {
            attempted: 6,
            successful: 5,
            failed: 1,
            sharp_turns_found: 12,
            blind_spots_found: 3,
        }
    );
    assert_eq!(progress.data_collection.total_data_points, 250);
    assert_eq!(progress.data_collection.emergency_services, 2);
    assert_eq!(progress.percent_complete(), 30);
}

#[test]
fn unknown_and_missing_status_count_as_processing() {
    assert_eq!(JobStatus::from_server("queued"), JobStatus::Processing);
    assert_eq!(JobStatus::from_server(" Completed "), JobStatus::Completed);
    assert_eq!(JobStatus::from_server("canceled"), JobStatus::Cancelled);
    assert_eq!(
        JobProgress::from_payload(&json!({"totalRoutes": 3})).status,
        JobStatus::Processing
    );
    assert_eq!(
        JobProgress::from_payload(&json!(null)).status,
        JobStatus::Processing
    );
}

#[test]
fn negative_and_garbage_counts_become_zero() {
    let progress = JobProgress::from_payload(&json!({
        "totalRoutes": -4,
        "completedRoutes": "many",
        "failedRoutes": 2.9
    }));
    assert_eq!(progress.total_routes, 0);
    assert_eq!(progress.completed_routes, 0);
    assert_eq!(progress.failed_routes, 2);
    assert_eq!(progress.percent_complete(), 0);
}

#[test]
fn time_remaining_accepts_text_seconds_and_structures() {
    let eta = |value: serde_json::Value| {
        JobProgress::from_payload(&json!({ "estimatedTimeRemaining": value }))
            .estimated_time_remaining
    };
    assert_eq!(eta(json!("about 3 minutes")), "about 3 minutes");
    assert_eq!(eta(json!(45)), "45s");
    assert_eq!(eta(json!(3725)), "1h 2m");
    assert_eq!(eta(json!({"formatted": "2 min"})), "2 min");
    assert_eq!(eta(json!({"unrelated": true})), PLACEHOLDER_TIME_REMAINING);
    assert_eq!(eta(json!("")), PLACEHOLDER_TIME_REMAINING);
    assert_eq!(eta(json!({"minutes": 4, "seconds": 30})), "4m 30s");
}

#[test]
fn oversized_time_remaining_saturates() {
    let eta = |value: serde_json::Value| {
        let payload = json!({ "status": "processing", "estimatedTimeRemaining": value });
        JobProgress::from_payload(&payload).estimated_time_remaining
    };
    let longest = "5124095576030431h 0m";
    assert_eq!(eta(json!({"hours": 6_000_000_000_000_000u64})), longest);
    assert_eq!(eta(json!({"minutes": 1e300})), longest);
    assert_eq!(eta(json!({"hours": "1e30", "seconds": 59})), longest);
    assert_eq!(eta(json!({"hours": u64::MAX, "minutes": u64::MAX})), longest);
}

#[test]
fn counters_never_regress_while_running() {
    let previous = JobProgress {
        status: JobStatus::Processing,
        total_routes: 10,
        completed_routes: 6,
        failed_routes: 1,
        ..JobProgress::default()
    };
    let partial = JobProgress::from_payload(&json!({"status": "processing", "completedRoutes": 4}));
    let merged = partial.merge_monotonic(&previous);
    assert_eq!(merged.total_routes, 10);
    assert_eq!(merged.completed_routes, 6);
    assert_eq!(merged.failed_routes, 1);

    let terminal = JobProgress::from_payload(&json!({"status": "failed", "completedRoutes": 4}));
    assert_eq!(terminal.merge_monotonic(&previous).completed_routes, 4);
}

#[test]
fn form_fields_encode_options_as_strings() {
    let mut options = ProcessingOptions {
        concurrency: 40,
        data_collection_mode: AnalysisDepth::Basic,
        include_weather: false,
        ..ProcessingOptions::default()
    };
    options.visibility.enabled = false;

    let fields = options.form_fields();
    let field = |name: &str| {
        fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    };
    assert_eq!(field("processingMode"), Some("enhanced"));
    assert_eq!(field("concurrency"), Some("10"));
    assert_eq!(field("dataCollectionMode"), Some("basic"));
    assert_eq!(field("includeWeatherData"), Some("false"));
    assert_eq!(field("includeTrafficData"), Some("true"));
    assert_eq!(field("enableVisibilityAnalysis"), Some("false"));
    assert_eq!(field("analyzeSharpTurns"), Some("false"));
    assert_eq!(ProcessingOptions { concurrency: 0, ..options }.sanitized().concurrency, 1);
}

#[test]
fn descriptor_serializes_with_storage_field_names() {
    let descriptor = JobDescriptor::new("bulk_1_1", ProcessingOptions::default(), 1_700_000_000_000);
    let value = serde_json::to_value(&descriptor).unwrap();
    let object = value.as_object().unwrap();
    for key in ["processing", "progress", "processingId", "options", "timestamp"] {
        assert!(object.contains_key(key), "missing {key}");
    }
    assert_eq!(value["progress"]["status"], json!("starting"));

    let back: JobDescriptor = serde_json::from_value(value).unwrap();
    assert_eq!(back, descriptor);
}

#[test]
fn freshness_is_measured_from_the_last_update() {
    let descriptor = JobDescriptor::new("bulk_1_1", ProcessingOptions::default(), 1_000);
    assert!(descriptor.is_fresh(1_000 + 59_999, 60_000));
    assert!(!descriptor.is_fresh(1_000 + 60_000, 60_000));
    assert!(descriptor.is_in_progress());
}
