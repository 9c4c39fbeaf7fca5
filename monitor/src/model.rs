use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Timestamp format used in the persisted log tables (local wall clock,
/// second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One physical sensor module on the serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorGroup {
    /// CO2 / temperature / humidity module
    Scd41,
    /// eCO2 / TVOC module
    Ccs811,
    /// Particulate matter module
    Sps30,
}

impl SensorGroup {
    pub const ALL: [SensorGroup; 3] = [SensorGroup::Scd41, SensorGroup::Ccs811, SensorGroup::Sps30];

    pub fn as_str(self) -> &'static str {
        match self {
            SensorGroup::Scd41 => "scd41",
            SensorGroup::Ccs811 => "ccs811",
            SensorGroup::Sps30 => "sps30",
        }
    }

    pub fn from_wire(name: &str) -> Option<SensorGroup> {
        match name {
            "scd41" => Some(SensorGroup::Scd41),
            "ccs811" => Some(SensorGroup::Ccs811),
            "sps30" => Some(SensorGroup::Sps30),
            _ => None,
        }
    }

    /// Fixed column set of this group's log table, in persisted order.
    pub fn columns(self) -> &'static [Column] {
        match self {
            SensorGroup::Scd41 => &[Column::Co2, Column::Temperature, Column::Humidity],
            SensorGroup::Ccs811 => &[Column::Eco2, Column::Tvoc],
            SensorGroup::Sps30 => &[Column::Pm1, Column::Pm25, Column::Pm10],
        }
    }
}

/// Every metric column the system tracks, across all sensor groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Co2,
    Temperature,
    Humidity,
    Eco2,
    Tvoc,
    Pm1,
    Pm25,
    Pm10,
}

impl Column {
    pub const COUNT: usize = 8;

    pub const ALL: [Column; Column::COUNT] = [
        Column::Co2,
        Column::Temperature,
        Column::Humidity,
        Column::Eco2,
        Column::Tvoc,
        Column::Pm1,
        Column::Pm25,
        Column::Pm10,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Header cell used in the persisted log tables.
    pub fn header(self) -> &'static str {
        match self {
            Column::Co2 => "CO2 (ppm)",
            Column::Temperature => "Temperature (°C)",
            Column::Humidity => "Humidity (%)",
            Column::Eco2 => "eCO2 (ppm)",
            Column::Tvoc => "TVOC (ppb)",
            Column::Pm1 => "PM1.0 (µg/m³)",
            Column::Pm25 => "PM2.5 (µg/m³)",
            Column::Pm10 => "PM10.0 (µg/m³)",
        }
    }

    /// Key used inside a frame's "data" object.
    pub fn wire_key(self) -> &'static str {
        match self {
            Column::Co2 => "CO2",
            Column::Temperature => "Temperature",
            Column::Humidity => "Humidity",
            Column::Eco2 => "eCO2",
            Column::Tvoc => "TVOC",
            Column::Pm1 => "PM1.0",
            Column::Pm25 => "PM2.5",
            Column::Pm10 => "PM10.0",
        }
    }

    /// Key used in JSON query responses.
    pub fn json_key(self) -> &'static str {
        match self {
            Column::Co2 => "co2",
            Column::Temperature => "temperature",
            Column::Humidity => "humidity",
            Column::Eco2 => "eco2",
            Column::Tvoc => "tvoc",
            Column::Pm1 => "pm1",
            Column::Pm25 => "pm25",
            Column::Pm10 => "pm10",
        }
    }
}

/// One parsed sensor frame. `values` is aligned with `group.columns()`;
/// a metric the frame did not carry stays `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub group: SensorGroup,
    pub values: Vec<Option<f64>>,
}

/// One persisted row of a group's log table.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub timestamp: NaiveDateTime,
    pub values: Vec<Option<f64>>,
}

/// Raw shape of one line on the serial link.
#[derive(Debug, Deserialize)]
pub struct WireFrame {
    #[serde(default)]
    pub sensor: Option<String>,
    #[serde(default)]
    pub data: Option<HashMap<String, f64>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connected => "Connected",
        }
    }
}

/// Current best-known value per metric plus freshness metadata.
/// Returned by copy from the shared state store, so a caller never sees a
/// half-applied update.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub values: [Option<f64>; Column::COUNT],
    pub timestamp: Option<NaiveDateTime>,
    pub last_update: Option<NaiveDateTime>,
    pub last_update_co2: Option<NaiveDateTime>,
    pub last_update_pm: Option<NaiveDateTime>,
    pub connection_status: ConnectionStatus,
}

impl Snapshot {
    pub fn get(&self, column: Column) -> Option<f64> {
        self.values[column.index()]
    }

    /// True until the first reading of any group arrives.
    pub fn all_missing(&self) -> bool {
        self.values.iter().all(|v| v.is_none())
    }
}

/// Current local wall-clock time truncated to whole seconds, the precision
/// the log tables persist.
pub fn now_local() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
