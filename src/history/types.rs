// src/history/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::diagnosis::Diagnosis;

/// Encoding tag for `remedies`: JSON text of the value the client submitted.
pub const REMEDIES_ENCODING_V1: i64 = 1;

const HEALTHY_SENTINEL: &str = "healthy";

fn default_remedies_encoding() -> i64 {
    REMEDIES_ENCODING_V1
}

/// One persisted scan. Rows are immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScanRecord {
    pub id: i64,
    pub plant_name: Option<String>,
    pub disease_name: Option<String>,
    pub confidence: Option<f64>,
    pub image_url: Option<String>,
    /// Stored JSON text, returned as-is
    pub remedies: Option<String>,
    #[serde(skip_serializing, default = "default_remedies_encoding")]
    pub remedies_encoding: i64,
    pub created_at: DateTime<Utc>,
}

impl ScanRecord {
    pub fn health_status(&self) -> HealthStatus {
        HealthStatus::classify(self.disease_name.as_deref())
    }

    /// Decode the stored remedies blob into a typed diagnosis, if it holds one
    pub fn diagnosis(&self) -> Option<Diagnosis> {
        if self.remedies_encoding != REMEDIES_ENCODING_V1 {
            return None;
        }
        let raw = self.remedies.as_deref()?;
        serde_json::from_str(raw).ok()
    }
}

/// Healthy vs diseased, derived from the disease name on every read.
///
/// A name counts as healthy when it contains "healthy" in any ASCII case,
/// the same rule SQLite's `LIKE '%healthy%'` applies in `ScanStore::stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Diseased,
}

impl HealthStatus {
    pub fn classify(disease_name: Option<&str>) -> Self {
        match disease_name {
            Some(name) if name.to_ascii_lowercase().contains(HEALTHY_SENTINEL) => Self::Healthy,
            _ => Self::Diseased,
        }
    }

    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Aggregate counts. `diseased_plants` is always derived from the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub total_scans: i64,
    pub healthy_plants: i64,
    pub diseased_plants: i64,
}

impl ScanStats {
    pub fn from_counts(total_scans: i64, healthy_plants: i64) -> Self {
        Self {
            total_scans,
            healthy_plants,
            diseased_plants: total_scans - healthy_plants,
        }
    }

    /// Same numbers computed in-process, used to cross-check the SQL aggregate
    pub fn from_records(records: &[ScanRecord]) -> Self {
        let healthy = records.iter().filter(|r| r.health_status().is_healthy()).count();
        Self::from_counts(records.len() as i64, healthy as i64)
    }
}

/// Response body of a successful create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedScan {
    pub id: i64,
}

/// A scan ready to insert
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewScan {
    pub plant_name: Option<String>,
    pub disease_name: Option<String>,
    pub confidence: Option<f64>,
    pub image_url: Option<String>,
    pub remedies: Option<Value>,
}

/// POST /api/history body. Every field is optional at the wire level;
/// `validate` decides what is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateScanRequest {
    #[serde(default)]
    pub plant_name: Option<String>,
    #[serde(default)]
    pub disease_name: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// `None` when the key is absent; an explicit `null` is kept as
    /// `Some(Value::Null)` and stored as the JSON text `null`.
    #[serde(default, deserialize_with = "present_value")]
    pub remedies: Option<Value>,
}

fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self { field, reason: reason.into() }
    }
}

/// How strictly create requests are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Required fields and confidence range are enforced
    #[default]
    Strict,
    /// Store whatever arrives; missing fields become NULL
    Lenient,
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown validation mode '{other}' (expected strict or lenient)")),
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lenient => write!(f, "lenient"),
        }
    }
}

impl CreateScanRequest {
    pub fn validate(self, mode: ValidationMode) -> Result<NewScan, ValidationError> {
        if mode == ValidationMode::Strict {
            if self.plant_name.is_none() {
                return Err(ValidationError::new("plant_name", "is required"));
            }
            match self.disease_name.as_deref() {
                None => return Err(ValidationError::new("disease_name", "is required")),
                Some(name) if name.trim().is_empty() => {
                    return Err(ValidationError::new("disease_name", "must not be empty"));
                }
                _ => {}
            }
            match self.confidence {
                None => return Err(ValidationError::new("confidence", "is required")),
                Some(c) if !c.is_finite() || !(0.0..=100.0).contains(&c) => {
                    return Err(ValidationError::new("confidence", format!("{c} is outside 0-100")));
                }
                _ => {}
            }
            match self.image_url.as_deref() {
                None => return Err(ValidationError::new("image_url", "is required")),
                Some(url) if url.is_empty() => {
                    return Err(ValidationError::new("image_url", "must not be empty"));
                }
                _ => {}
            }
            if matches!(self.remedies, None | Some(Value::Null)) {
                return Err(ValidationError::new("remedies", "is required"));
            }
        }

        Ok(NewScan {
            plant_name: self.plant_name,
            disease_name: self.disease_name,
            confidence: self.confidence,
            image_url: self.image_url,
            remedies: self.remedies,
        })
    }
}
