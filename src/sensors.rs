//! Published sensor values
//!
//! Four values are derived from the latest `FetchResult`: the emission factor
//! of the slot covering "now", the minimum forecast emission factor, and the
//! bounds of that minimum slot. Derivation only needs an `EmissionDataSource`,
//! so anything that can hand out the last-known-good result can back sensors.

use crate::coordinator::CoordinatorState;
use crate::ned::{FetchResult, match_current, min_emission_slot, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DEVICE_NAME: &str = "NED CO2";
pub const DEVICE_MANUFACTURER: &str = "NED";
pub const DEVICE_MODEL: &str = "Electricity Mix (Type 27)";

/// Unit of both emission-factor sensors
pub const EMISSION_FACTOR_UNIT: &str = "kg/kWh";

pub const ATTR_SLOT_START_UTC: &str = "slot_start_utc";
pub const ATTR_SLOT_END_UTC: &str = "slot_end_utc";

/// Read side of a coordinator as seen by sensors
///
/// Both reads must come from the same cycle, so implement this on a snapshot
/// such as `CoordinatorState`, not on a live handle.
pub trait EmissionDataSource {
    /// Last-known-good result, if any refresh ever succeeded
    fn latest(&self) -> Option<Arc<FetchResult>>;

    /// Whether the most recent refresh cycle succeeded
    fn last_update_success(&self) -> bool;
}

impl EmissionDataSource for CoordinatorState {
    fn latest(&self) -> Option<Arc<FetchResult>> {
        self.data.clone()
    }

    fn last_update_success(&self) -> bool {
        self.last_update_success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    CurrentSlot,
    ForecastMin,
    ForecastBestStart,
    ForecastBestEnd,
}

impl SensorKind {
    pub const ALL: [SensorKind; 4] = [
        SensorKind::CurrentSlot,
        SensorKind::ForecastMin,
        SensorKind::ForecastBestStart,
        SensorKind::ForecastBestEnd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CurrentSlot => "NED EF (current slot)",
            Self::ForecastMin => "NED EF (forecast min)",
            Self::ForecastBestStart => "NED EF forecast best start",
            Self::ForecastBestEnd => "NED EF forecast best end",
        }
    }

    pub fn unique_suffix(self) -> &'static str {
        match self {
            Self::CurrentSlot => "current_slot",
            Self::ForecastMin => "forecast_min",
            Self::ForecastBestStart => "forecast_best_start",
            Self::ForecastBestEnd => "forecast_best_end",
        }
    }

    /// Suggested object id
    pub fn object_id(self) -> &'static str {
        match self {
            Self::CurrentSlot => "ned_ef_current_slot",
            Self::ForecastMin => "ned_ef_forecast_min",
            Self::ForecastBestStart => "ned_ef_forecast_best_start",
            Self::ForecastBestEnd => "ned_ef_forecast_best_end",
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            Self::CurrentSlot | Self::ForecastMin => Some(EMISSION_FACTOR_UNIT),
            Self::ForecastBestStart | Self::ForecastBestEnd => None,
        }
    }

    pub fn device_class(self) -> Option<&'static str> {
        match self {
            Self::CurrentSlot | Self::ForecastMin => None,
            Self::ForecastBestStart | Self::ForecastBestEnd => Some("timestamp"),
        }
    }

    pub fn state_class(self) -> Option<&'static str> {
        match self {
            Self::CurrentSlot | Self::ForecastMin => Some("measurement"),
            Self::ForecastBestStart | Self::ForecastBestEnd => None,
        }
    }

    /// `<entry_id>_<suffix>`
    pub fn unique_id(self, entry_id: &str) -> String {
        format!("{}_{}", entry_id, self.unique_suffix())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    EmissionFactor(f64),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: &'static str,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

impl DeviceInfo {
    pub fn for_entry(entry_id: &str) -> Self {
        Self {
            identifier: entry_id.to_string(),
            name: DEVICE_NAME,
            manufacturer: DEVICE_MANUFACTURER,
            model: DEVICE_MODEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub kind: SensorKind,
    pub name: &'static str,
    pub unique_id: String,
    pub object_id: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<&'static str>,
    pub available: bool,
    pub value: Option<SensorValue>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

/// Derive one sensor from the source's latest data
pub fn derive_sensor<S: EmissionDataSource + ?Sized>(
    source: &S,
    kind: SensorKind,
    entry_id: &str,
    now: DateTime<Utc>,
) -> SensorState {
    let data = source.latest();
    let (value, attributes) = match data.as_deref() {
        Some(result) => sensor_value(result, kind, now),
        None => (None, BTreeMap::new()),
    };

    SensorState {
        kind,
        name: kind.name(),
        unique_id: kind.unique_id(entry_id),
        object_id: kind.object_id(),
        unit: kind.unit(),
        device_class: kind.device_class(),
        state_class: kind.state_class(),
        available: source.last_update_success(),
        value,
        attributes,
    }
}

/// All four sensors in display order
pub fn derive_sensors<S: EmissionDataSource + ?Sized>(
    source: &S,
    entry_id: &str,
    now: DateTime<Utc>,
) -> Vec<SensorState> {
    SensorKind::ALL
        .iter()
        .map(|kind| derive_sensor(source, *kind, entry_id, now))
        .collect()
}

fn sensor_value(
    result: &FetchResult,
    kind: SensorKind,
    now: DateTime<Utc>,
) -> (Option<SensorValue>, BTreeMap<String, String>) {
    let mut attributes = BTreeMap::new();
    let value = match kind {
        SensorKind::CurrentSlot => match_current(&result.current, now).and_then(|row| {
            attributes.insert(ATTR_SLOT_START_UTC.to_string(), row.validfrom.clone());
            attributes.insert(ATTR_SLOT_END_UTC.to_string(), row.validto.clone());
            row.emissionfactor.map(SensorValue::EmissionFactor)
        }),
        SensorKind::ForecastMin => min_emission_slot(&result.forecast)
            .and_then(|row| row.emissionfactor)
            .map(SensorValue::EmissionFactor),
        SensorKind::ForecastBestStart => min_emission_slot(&result.forecast)
            .and_then(|row| parse_timestamp(&row.validfrom))
            .map(SensorValue::Timestamp),
        SensorKind::ForecastBestEnd => min_emission_slot(&result.forecast)
            .and_then(|row| parse_timestamp(&row.validto))
            .map(SensorValue::Timestamp),
    };
    (value, attributes)
}
