//! Backup document codec.
//!
//! Decoding walks a `serde_json::Value` by hand so each failure can be
//! classified and located; encoding goes through borrowed serde records.

use super::{BackupDecodeError, BackupError, BackupResult};
use crate::model::page::{Feature, Page, DEFAULT_HUB};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Unix timestamp of 2001-01-01T00:00:00Z, the origin of legacy `date`.
pub const REFERENCE_EPOCH_UNIX_SECONDS: i64 = 978_307_200;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

#[derive(Serialize)]
struct PageRecord<'a> {
    id: Uuid,
    name: &'a str,
    hub: &'a str,
    notes: &'a str,
    count: u32,
    #[serde(rename = "isChallenge")]
    is_challenge: bool,
    features: Vec<FeatureRecord<'a>>,
}

#[derive(Serialize)]
struct FeatureRecord<'a> {
    id: Uuid,
    #[serde(rename = "dateV2")]
    date_v2: String,
    raw: bool,
    notes: &'a str,
}

/// Encodes pages as a pretty-printed backup document.
pub fn encode_backup(pages: &[Page]) -> BackupResult<String> {
    let records: Vec<PageRecord<'_>> = pages
        .iter()
        .map(|page| PageRecord {
            id: page.id,
            name: &page.name,
            hub: &page.hub,
            notes: &page.notes,
            count: page.count,
            is_challenge: page.is_challenge,
            features: page
                .features
                .iter()
                .map(|feature| FeatureRecord {
                    id: feature.id,
                    // AutoSi keeps sub-second digits so dates compare equal after decode.
                    date_v2: feature.date.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                    raw: feature.raw,
                    notes: &feature.notes,
                })
                .collect(),
        })
        .collect();

    serde_json::to_string_pretty(&records).map_err(BackupError::Encode)
}

/// Decodes a backup document into pages, input order preserved.
pub fn decode_backup(input: &str) -> Result<Vec<Page>, BackupDecodeError> {
    let root: Value =
        serde_json::from_str(input).map_err(|err| BackupDecodeError::CorruptedPayload {
            path: "$".to_string(),
            message: err.to_string(),
        })?;

    let entries = root.as_array().ok_or_else(|| mismatch("$", "array", &root))?;
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| decode_page(entry, format!("[{index}]")))
        .collect()
}

fn decode_page(value: &Value, path: String) -> Result<Page, BackupDecodeError> {
    let fields = Fields::new(value, path)?;

    let id = parse_uuid(fields.string("id")?, &fields.child("id"))?;
    let hub = match fields.optional("hub") {
        Some(value) => expect_str(value, &fields.child("hub"))?.to_string(),
        None => DEFAULT_HUB.to_string(),
    };
    let is_challenge = match fields.optional("isChallenge") {
        Some(value) => expect_bool(value, &fields.child("isChallenge"))?,
        None => false,
    };

    let features_path = fields.child("features");
    let features = fields
        .array("features")?
        .iter()
        .enumerate()
        .map(|(index, entry)| decode_feature(entry, format!("{features_path}[{index}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        id,
        name: fields.string("name")?.to_string(),
        hub,
        notes: fields.string("notes")?.to_string(),
        count: decode_count(fields.required("count")?, &fields.child("count"))?,
        is_challenge,
        features,
    })
}

fn decode_feature(value: &Value, path: String) -> Result<Feature, BackupDecodeError> {
    let fields = Fields::new(value, path)?;

    let id = parse_uuid(fields.string("id")?, &fields.child("id"))?;
    let date = decode_feature_date(&fields)?;

    Ok(Feature {
        id,
        date,
        raw: fields.bool("raw")?,
        notes: fields.string("notes")?.to_string(),
    })
}

/// Prefers `dateV2`; falls back to legacy reference-epoch seconds in `date`.
fn decode_feature_date(fields: &Fields<'_>) -> Result<DateTime<Utc>, BackupDecodeError> {
    if let Some(value) = fields.optional("dateV2") {
        let path = fields.child("dateV2");
        let text = expect_str(value, &path)?;
        return DateTime::parse_from_rfc3339(text)
            .map(|date| date.with_timezone(&Utc))
            .map_err(|err| BackupDecodeError::CorruptedPayload {
                path,
                message: format!("invalid ISO-8601 date `{text}`: {err}"),
            });
    }

    if !fields.contains("date") {
        // A present-but-null `dateV2` is a missing value, not a missing key.
        return Err(if fields.contains("dateV2") {
            fields.missing_value("dateV2")
        } else {
            fields.missing_key("dateV2")
        });
    }

    let path = fields.child("date");
    let value = fields.required("date")?;
    let seconds = value
        .as_f64()
        .ok_or_else(|| mismatch(&path, "number", value))?;
    from_reference_seconds(seconds).ok_or_else(|| BackupDecodeError::CorruptedPayload {
        path,
        message: format!("legacy date `{seconds}` is out of range"),
    })
}

fn from_reference_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let mut whole = seconds.floor();
    let mut nanos = ((seconds - whole) * NANOS_PER_SECOND).round();
    if nanos >= NANOS_PER_SECOND {
        whole += 1.0;
        nanos = 0.0;
    }
    if whole.abs() >= i64::MAX as f64 {
        return None;
    }
    let unix = (whole as i64).checked_add(REFERENCE_EPOCH_UNIX_SECONDS)?;
    DateTime::from_timestamp(unix, nanos as u32)
}

fn decode_count(value: &Value, path: &str) -> Result<u32, BackupDecodeError> {
    if let Some(count) = value.as_u64() {
        return match u32::try_from(count) {
            Ok(0) | Err(_) => Err(BackupDecodeError::CorruptedPayload {
                path: path.to_string(),
                message: format!("count `{count}` must be between 1 and {}", u32::MAX),
            }),
            Ok(count) => Ok(count),
        };
    }
    if let Some(count) = value.as_i64() {
        return Err(BackupDecodeError::CorruptedPayload {
            path: path.to_string(),
            message: format!("count `{count}` must be positive"),
        });
    }
    Err(mismatch(path, "integer", value))
}

fn parse_uuid(text: &str, path: &str) -> Result<Uuid, BackupDecodeError> {
    Uuid::parse_str(text).map_err(|err| BackupDecodeError::CorruptedPayload {
        path: path.to_string(),
        message: format!("invalid uuid `{text}`: {err}"),
    })
}

/// Object view that knows its own coding path.
struct Fields<'a> {
    object: &'a Map<String, Value>,
    path: String,
}

impl<'a> Fields<'a> {
    fn new(value: &'a Value, path: String) -> Result<Self, BackupDecodeError> {
        match value.as_object() {
            Some(object) => Ok(Self { object, path }),
            None => Err(mismatch(&path, "object", value)),
        }
    }

    fn child(&self, key: &str) -> String {
        format!("{}.{key}", self.path)
    }

    fn contains(&self, key: &str) -> bool {
        self.object.contains_key(key)
    }

    /// Absent and `null` both read as `None`.
    fn optional(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|value| !value.is_null())
    }

    fn required(&self, key: &str) -> Result<&'a Value, BackupDecodeError> {
        match self.object.get(key) {
            None => Err(self.missing_key(key)),
            Some(Value::Null) => Err(self.missing_value(key)),
            Some(value) => Ok(value),
        }
    }

    fn string(&self, key: &str) -> Result<&'a str, BackupDecodeError> {
        expect_str(self.required(key)?, &self.child(key))
    }

    fn bool(&self, key: &str) -> Result<bool, BackupDecodeError> {
        expect_bool(self.required(key)?, &self.child(key))
    }

    fn array(&self, key: &str) -> Result<&'a Vec<Value>, BackupDecodeError> {
        let value = self.required(key)?;
        value
            .as_array()
            .ok_or_else(|| mismatch(&self.child(key), "array", value))
    }

    fn missing_key(&self, key: &str) -> BackupDecodeError {
        BackupDecodeError::MissingKey {
            path: self.path.clone(),
            key: key.to_string(),
        }
    }

    fn missing_value(&self, key: &str) -> BackupDecodeError {
        BackupDecodeError::MissingValue {
            path: self.path.clone(),
            key: key.to_string(),
        }
    }
}

fn expect_str<'a>(value: &'a Value, path: &str) -> Result<&'a str, BackupDecodeError> {
    value.as_str().ok_or_else(|| mismatch(path, "string", value))
}

fn expect_bool(value: &Value, path: &str) -> Result<bool, BackupDecodeError> {
    value.as_bool().ok_or_else(|| mismatch(path, "bool", value))
}

fn mismatch(path: &str, expected: &'static str, found: &Value) -> BackupDecodeError {
    BackupDecodeError::TypeMismatch {
        path: path.to_string(),
        expected,
        found: json_type_name(found),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
