use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PLACEHOLDER_CURRENT_ROUTE: &str = "Initializing...";
pub const PLACEHOLDER_TIME_REMAINING: &str = "Calculating...";

/// Persisted descriptors older than this are treated as absent.
pub const FRESHNESS_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

pub const MIN_CONCURRENCY: u32 = 1;
pub const MAX_CONCURRENCY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Starting,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Parses a server-reported status. Unknown values count as `Processing`.
    pub fn from_server(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "starting" => JobStatus::Starting,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "cancelled" | "canceled" => JobStatus::Cancelled,
            _ => JobStatus::Processing,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Starting => "starting",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    #[default]
    Enhanced,
    Standard,
}

impl ProcessingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingMode::Enhanced => "enhanced",
            ProcessingMode::Standard => "standard",
        }
    }
}

/// Depth of data collection or visibility analysis on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    #[default]
    Comprehensive,
    Basic,
}

impl AnalysisDepth {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisDepth::Comprehensive => "comprehensive",
            AnalysisDepth::Basic => "basic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisibilityOptions {
    pub enabled: bool,
    pub analysis_type: AnalysisDepth,
    pub sharp_turns: bool,
    pub blind_spots: bool,
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            analysis_type: AnalysisDepth::Comprehensive,
            sharp_turns: true,
            blind_spots: true,
        }
    }
}

/// Configuration snapshot a job is started with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingOptions {
    pub processing_mode: ProcessingMode,
    pub concurrency: u32,
    pub data_collection_mode: AnalysisDepth,
    pub include_weather: bool,
    pub include_traffic: bool,
    pub include_emergency_services: bool,
    pub include_road_conditions: bool,
    pub include_accident_data: bool,
    pub include_network_coverage: bool,
    pub download_images: bool,
    pub generate_reports: bool,
    pub visibility: VisibilityOptions,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            processing_mode: ProcessingMode::Enhanced,
            concurrency: 2,
            data_collection_mode: AnalysisDepth::Comprehensive,
            include_weather: true,
            include_traffic: true,
            include_emergency_services: true,
            include_road_conditions: true,
            include_accident_data: true,
            include_network_coverage: true,
            download_images: false,
            generate_reports: true,
            visibility: VisibilityOptions::default(),
        }
    }
}

impl ProcessingOptions {
    /// Returns a copy with `concurrency` clamped to the accepted range.
    pub fn sanitized(mut self) -> Self {
        self.concurrency = self.concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        self
    }

    /// String-encoded multipart fields for the submission request.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let visibility = &self.visibility;
        let flag = |value: bool| value.to_string();
        vec![
            ("processingMode", self.processing_mode.as_str().to_owned()),
            (
                "concurrency",
                self.concurrency
                    .clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
                    .to_string(),
            ),
            (
                "dataCollectionMode",
                self.data_collection_mode.as_str().to_owned(),
            ),
            ("includeWeatherData", flag(self.include_weather)),
            ("includeTrafficData", flag(self.include_traffic)),
            (
                "includeEmergencyServices",
                flag(self.include_emergency_services),
            ),
            ("includeRoadConditions", flag(self.include_road_conditions)),
            ("includeAccidentData", flag(self.include_accident_data)),
            ("includeNetworkCoverage", flag(self.include_network_coverage)),
            ("downloadImages", flag(self.download_images)),
            ("generateReports", flag(self.generate_reports)),
            ("enableVisibilityAnalysis", flag(visibility.enabled)),
            (
                "visibilityAnalysisType",
                visibility.analysis_type.as_str().to_owned(),
            ),
            (
                "analyzeSharpTurns",
                flag(visibility.enabled && visibility.sharp_turns),
            ),
            (
                "analyzeBlindSpots",
                flag(visibility.enabled && visibility.blind_spots),
            ),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisibilityStats {
    pub attempted: u64,
    pub successful: u64,
    pub failed: u64,
    pub sharp_turns_found: u64,
    pub blind_spots_found: u64,
}

impl VisibilityStats {
    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            attempted: read_count(object, &["attempted", "routesAttempted"]),
            successful: read_count(object, &["successful", "routesSuccessful"]),
            failed: read_count(object, &["failed", "routesFailed"]),
            sharp_turns_found: read_count(
                object,
                &["sharpTurnsFound", "totalSharpTurns", "sharp_turns_found"],
            ),
            blind_spots_found: read_count(
                object,
                &["blindSpotsFound", "totalBlindSpots", "blind_spots_found"],
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataCollectionStats {
    pub total_data_points: u64,
    pub weather_points: u64,
    pub traffic_points: u64,
    pub emergency_services: u64,
    pub network_points: u64,
}

impl DataCollectionStats {
    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            total_data_points: read_count(object, &["totalDataPoints", "total_data_points"]),
            weather_points: read_count(object, &["weatherPoints", "weatherData"]),
            traffic_points: read_count(object, &["trafficPoints", "trafficData"]),
            emergency_services: read_count(object, &["emergencyServices"]),
            network_points: read_count(object, &["networkPoints", "networkCoverage"]),
        }
    }
}

/// Progress counters reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobProgress {
    pub status: JobStatus,
    pub current_route: String,
    pub total_routes: u64,
    pub completed_routes: u64,
    pub failed_routes: u64,
    pub estimated_time_remaining: String,
    pub visibility: VisibilityStats,
    pub data_collection: DataCollectionStats,
}

impl Default for JobProgress {
    fn default() -> Self {
        Self {
            status: JobStatus::Starting,
            current_route: PLACEHOLDER_CURRENT_ROUTE.to_owned(),
            total_routes: 0,
            completed_routes: 0,
            failed_routes: 0,
            estimated_time_remaining: PLACEHOLDER_TIME_REMAINING.to_owned(),
            visibility: VisibilityStats::default(),
            data_collection: DataCollectionStats::default(),
        }
    }
}

impl JobProgress {
    /// Builds progress from a status payload, defaulting every missing field.
    ///
    /// A missing `status` counts as `Processing`; missing counters are zero,
    /// missing text is a placeholder and missing stat blocks are zeroed.
    pub fn from_payload(payload: &Value) -> Self {
        let Some(object) = payload.as_object() else {
            return Self {
                status: JobStatus::Processing,
                ..Self::default()
            };
        };

        let status = object
            .get("status")
            .and_then(Value::as_str)
            .map_or(JobStatus::Processing, JobStatus::from_server);

        let current_route = read_text(object, &["currentRoute", "current_route"])
            .unwrap_or_else(|| PLACEHOLDER_CURRENT_ROUTE.to_owned());
        let estimated_time_remaining = object
            .get("estimatedTimeRemaining")
            .or_else(|| object.get("estimated_time_remaining"))
            .and_then(describe_duration)
            .unwrap_or_else(|| PLACEHOLDER_TIME_REMAINING.to_owned());

        let visibility = read_block(object, &["visibilityAnalysis", "visibility"])
            .map(VisibilityStats::from_object)
            .unwrap_or_default();
        let data_collection =
            read_block(object, &["enhancedDataCollection", "dataCollection"])
                .map(DataCollectionStats::from_object)
                .unwrap_or_default();

        Self {
            status,
            current_route,
            total_routes: read_count(object, &["totalRoutes", "total_routes"]),
            completed_routes: read_count(object, &["completedRoutes", "completed_routes"]),
            failed_routes: read_count(object, &["failedRoutes", "failed_routes"]),
            estimated_time_remaining,
            visibility,
            data_collection,
        }
    }

    /// Keeps route counters from regressing while the job is still running.
    pub fn merge_monotonic(mut self, previous: &JobProgress) -> Self {
        if !self.status.is_terminal() {
            self.total_routes = self.total_routes.max(previous.total_routes);
            self.completed_routes = self.completed_routes.max(previous.completed_routes);
            self.failed_routes = self.failed_routes.max(previous.failed_routes);
        }
        self
    }

    pub fn processed_routes(&self) -> u64 {
        self.completed_routes.saturating_add(self.failed_routes)
    }

    pub fn percent_complete(&self) -> u8 {
        if self.total_routes == 0 {
            return 0;
        }
        let percent = self.processed_routes().saturating_mul(100) / self.total_routes;
        percent.min(100) as u8
    }
}

/// One bulk-processing session, as tracked and persisted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub processing: bool,
    #[serde(default)]
    pub progress: JobProgress,
    pub processing_id: String,
    #[serde(default)]
    pub options: ProcessingOptions,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
}

impl JobDescriptor {
    pub fn new(processing_id: impl Into<String>, options: ProcessingOptions, now_ms: i64) -> Self {
        Self {
            processing: true,
            progress: JobProgress::default(),
            processing_id: processing_id.into(),
            options,
            timestamp_ms: now_ms,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.processing && !self.progress.status.is_terminal()
    }

    /// True while `now_ms` lies within `window_ms` of the last update.
    pub fn is_fresh(&self, now_ms: i64, window_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp_ms) < window_ms
    }
}

/// Client-side identifier for a submission; the server does not rely on it.
pub fn processing_id(now_ms: i64, submission: u64) -> String {
    format!("bulk_{now_ms}_{submission}")
}

/// Reads the first present text field, rendering scalars as text.
pub fn read_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Object(inner) => read_text(inner, &["message", "error", "description"]),
        _ => None,
    })
}

fn read_block<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Map<String, Value>> {
    keys.iter().find_map(|key| object.get(*key).and_then(Value::as_object))
}

fn read_count(object: &Map<String, Value>, keys: &[&str]) -> u64 {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(as_count))
        .unwrap_or(0)
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_i64().map(|signed| signed.max(0) as u64))
            .or_else(|| number.as_f64().and_then(float_count)),
        Value::String(text) => text.trim().parse::<f64>().ok().and_then(float_count),
        Value::Array(items) => Some(items.len() as u64),
        _ => None,
    }
}

fn float_count(value: f64) -> Option<u64> {
    value.is_finite().then(|| value.max(0.0) as u64)
}

/// Renders `estimatedTimeRemaining` for display.
///
/// Text passes through; a bare number is seconds; objects may carry
/// `hours`, `minutes` and `seconds`.
fn describe_duration(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(_) => as_count(value).map(format_seconds),
        Value::Object(object) => {
            if let Some(text) = read_text(object, &["formatted", "text"]) {
                return Some(text);
            }
            let hours = object.get("hours").and_then(as_count).unwrap_or(0);
            let minutes = object.get("minutes").and_then(as_count).unwrap_or(0);
            let seconds = object.get("seconds").and_then(as_count).unwrap_or(0);
            let total = hours
                .saturating_mul(3600)
                .saturating_add(minutes.saturating_mul(60))
                .saturating_add(seconds);
            let known = ["hours", "minutes", "seconds"]
                .iter()
                .any(|key| object.contains_key(*key));
            known.then(|| format_seconds(total))
        }
        _ => None,
    }
}

fn format_seconds(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
