use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `type` query value for the national electricity mix
pub const TYPE_ELECTRICITY_MIX: u32 = 27;

/// `activity` query value for "providing"
pub const ACTIVITY_PROVIDING: u32 = 1;

/// JSON-LD key holding the collection rows
pub const HYDRA_MEMBER: &str = "hydra:member";

/// Realised vs predicted data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Current,
    Forecast,
}

impl Classification {
    /// Value of the `classification` query parameter
    pub fn code(self) -> u8 {
        match self {
            Self::Forecast => 1,
            Self::Current => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Forecast => "forecast",
        }
    }
}

/// One slot as returned by the API
///
/// Timestamps are kept verbatim and parsed on demand, so a row with a bad
/// timestamp can be skipped without losing the rest of the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlotRecord {
    pub validfrom: String,
    pub validto: String,
    /// kg CO2-eq per kWh
    pub emissionfactor: Option<f64>,
    pub classification: Classification,
}

impl TimeSlotRecord {
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.validfrom)
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.validto)
    }

    /// Both bounds parse and the interval is non-empty
    pub fn interval(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let from = self.starts_at()?;
        let to = self.ends_at()?;
        (from < to).then_some((from, to))
    }
}

/// Window and timezone the rows were requested with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchMeta {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// `utc` or `local`
    pub timezone_mode: String,
    pub fetched_at: DateTime<Utc>,
}

/// Result of one successful poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub current: Vec<TimeSlotRecord>,
    pub forecast: Vec<TimeSlotRecord>,
    pub meta: FetchMeta,
}

/// Parse an ISO-8601 timestamp into UTC
///
/// Zone-qualified values are converted; naive values are taken as UTC.
/// Empty strings and the `unknown` / `unavailable` placeholders yield `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("unknown") || s.eq_ignore_ascii_case("unavailable")
    {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Extract the rows of a JSON-LD collection
///
/// A missing or non-array member list is an empty collection. Members that
/// are not objects are dropped; absent fields become empty strings / `None`.
pub fn parse_collection(body: &Value, classification: Classification) -> Vec<TimeSlotRecord> {
    body.get(HYDRA_MEMBER)
        .and_then(|m| m.as_array())
        .map(|members| {
            members
                .iter()
                .filter(|m| m.is_object())
                .map(|m| TimeSlotRecord {
                    validfrom: string_field(m, "validfrom"),
                    validto: string_field(m, "validto"),
                    emissionfactor: m.get("emissionfactor").and_then(number_value),
                    classification,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn string_field(member: &Value, key: &str) -> String {
    member
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn number_value(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
}
