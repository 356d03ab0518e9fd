//! Coercion of heterogeneous API payloads into an ordered record sequence.
//!
//! The backend delivers collections in several envelopes: bare arrays,
//! `{success, data: [...]}`, `{results: [...]}`, a named domain collection,
//! or a single coordinate-bearing object. [`Normalizer::normalize`] tries a
//! fixed list of [`Shape`]s in order and returns the first match. It has no
//! failure mode: when nothing usable is found the result is empty.

use serde_json::{Map, Value};

/// One element of a normalized sequence.
pub type Record = Value;

/// Domain collections, probed before the generic names.
const DOMAIN_COLLECTIONS: &[&str] = &[
    "routes",
    "criticalPoints",
    "sharpTurns",
    "blindSpots",
    "emergencyServices",
    "networkCoverage",
    "roadConditions",
    "weatherConditions",
    "trafficData",
    "accidentAreas",
];

const GENERIC_COLLECTIONS: &[&str] = &["results", "items", "points", "records", "list"];

const COORDINATE_PAIRS: &[(&str, &str)] = &[
    ("latitude", "longitude"),
    ("lat", "lng"),
    ("lat", "lon"),
];

/// Nesting limit for `data` envelopes.
const MAX_DEPTH: usize = 8;

/// Envelope shapes recognised by the normalizer, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Already an ordered sequence; returned unchanged.
    Sequence,
    /// `success: false`; a handled API error, yields nothing.
    FailedEnvelope,
    /// A non-null `data` field; normalized recursively.
    Nested,
    /// A known collection field holding an array.
    NamedCollection,
    /// A single coordinate-bearing object, wrapped as one element.
    SingleRecord,
    /// The first array-valued field of the object.
    FallbackScan,
}

impl Shape {
    /// Shapes in the order they are tried.
    pub const ORDER: [Shape; 6] = [
        Shape::Sequence,
        Shape::FailedEnvelope,
        Shape::Nested,
        Shape::NamedCollection,
        Shape::SingleRecord,
        Shape::FallbackScan,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    collection_keys: Vec<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DOMAIN_COLLECTIONS.iter().chain(GENERIC_COLLECTIONS))
    }
}

impl Normalizer {
    /// Builds a normalizer probing `collection_keys` in the given order.
    pub fn new<I, S>(collection_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            collection_keys: collection_keys
                .into_iter()
                .map(|key| key.as_ref().to_owned())
                .collect(),
        }
    }

    pub fn collection_keys(&self) -> &[String] {
        &self.collection_keys
    }

    /// Returns the records carried by `value`, or an empty sequence.
    pub fn normalize(&self, value: &Value) -> Vec<Record> {
        self.normalize_at(value, 0)
    }

    /// Reports which shape `value` matched at the top level.
    pub fn detect(&self, value: &Value) -> Option<Shape> {
        Shape::ORDER
            .into_iter()
            .find(|shape| self.try_shape(*shape, value, 0).is_some())
    }

    fn normalize_at(&self, value: &Value, depth: usize) -> Vec<Record> {
        if depth > MAX_DEPTH {
            return Vec::new();
        }
        Shape::ORDER
            .into_iter()
            .find_map(|shape| self.try_shape(shape, value, depth))
            .unwrap_or_default()
    }

    fn try_shape(&self, shape: Shape, value: &Value, depth: usize) -> Option<Vec<Record>> {
        match shape {
            Shape::Sequence => value.as_array().cloned(),
            Shape::FailedEnvelope => match value.get("success") {
                Some(Value::Bool(false)) => Some(Vec::new()),
                _ => None,
            },
            Shape::Nested => {
                let inner = value.get("data").filter(|inner| !inner.is_null())?;
                Some(self.normalize_at(inner, depth + 1))
            }
            Shape::NamedCollection => {
                let object = value.as_object()?;
                self.collection_keys
                    .iter()
                    .find_map(|key| object.get(key).and_then(Value::as_array))
                    .cloned()
            }
            Shape::SingleRecord => {
                let object = value.as_object()?;
                is_single_record(object).then(|| vec![value.clone()])
            }
            Shape::FallbackScan => value.as_object()?.values().find_map(Value::as_array).cloned(),
        }
    }
}

/// Normalizes with the default collection list.
pub fn normalize(value: &Value) -> Vec<Record> {
    Normalizer::default().normalize(value)
}

/// Strips `{data: {...}}` envelopes around a single-object payload.
///
/// Stops at the first object carrying a `status` field, so a status payload
/// with its own `data` member is left intact.
pub fn unwrap_payload(value: &Value) -> &Value {
    let mut current = value;
    for _ in 0..MAX_DEPTH {
        if current.get("status").is_some() {
            break;
        }
        match current.get("data") {
            Some(inner) if inner.is_object() => current = inner,
            _ => break,
        }
    }
    current
}

fn is_single_record(object: &Map<String, Value>) -> bool {
    let has_pair = COORDINATE_PAIRS
        .iter()
        .any(|(lat, lng)| is_present(object, lat) && is_present(object, lng));
    has_pair || is_present(object, "coordinates")
}

fn is_present(object: &Map<String, Value>, key: &str) -> bool {
    object.get(key).is_some_and(|value| !value.is_null())
}
