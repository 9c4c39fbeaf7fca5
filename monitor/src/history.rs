use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::classify::{band, Band, MONITORED};
use crate::errors::{Error, Result};
use crate::logstore::LogStore;
use crate::model::{Column, LogRow, SensorGroup};

/// One row of the three log tables outer-joined on timestamp. `values` is
/// indexed by `Column::index`; a cell is `None` until that column's first
/// observed value (and, before forward-fill, whenever its group had no row
/// at this timestamp).
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub timestamp: NaiveDateTime,
    pub values: [Option<f64>; Column::COUNT],
}

/// One resampled output row: hour-truncated timestamp and per-column mean
/// over the rows that fell in that hour. Hours with no rows do not appear
/// here; the charting layer fills those gaps with zero placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyBucket {
    pub hour: NaiveDateTime,
    pub means: [Option<f64>; Column::COUNT],
}

/// Hourly chart series for the query surface. A zero means "no data in this
/// bucket", not a measured zero.
#[derive(Debug, Serialize)]
pub struct HourlySeries {
    pub timestamps: Vec<String>,
    pub co2: Vec<f64>,
    pub tvoc: Vec<f64>,
    pub eco2: Vec<f64>,
    pub pm1: Vec<f64>,
    pub pm25: Vec<f64>,
    pub pm10: Vec<f64>,
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
}

/// Per-metric summary over the whole recorded series.
#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    pub max: String,
    pub max_time: String,
    pub min: String,
    pub min_time: String,
    pub avg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_low: Option<f64>,
    pub threshold_exceeded: usize,
}

/// Outer-join the per-group tables on exact timestamp equality. Rows come
/// back sorted ascending; within one timestamp, later table rows win
/// column-wise.
pub fn merge_tables(tables: &[(SensorGroup, Vec<LogRow>)]) -> Vec<MergedRow> {
    let mut by_ts: BTreeMap<NaiveDateTime, [Option<f64>; Column::COUNT]> = BTreeMap::new();

    for (group, rows) in tables {
        for row in rows {
            let cells = by_ts.entry(row.timestamp).or_insert([None; Column::COUNT]);
            for (col, value) in group.columns().iter().zip(&row.values) {
                if value.is_some() {
                    cells[col.index()] = *value;
                }
            }
        }
    }

    by_ts
        .into_iter()
        .map(|(timestamp, values)| MergedRow { timestamp, values })
        .collect()
}

/// Propagate each column's last seen value into later rows. Leading gaps
/// stay `None`; nothing is ever filled backward.
pub fn forward_fill(rows: &mut [MergedRow]) {
    let mut last = [None; Column::COUNT];
    for row in rows.iter_mut() {
        for i in 0..Column::COUNT {
            match row.values[i] {
                Some(v) => last[i] = Some(v),
                None => row.values[i] = last[i],
            }
        }
    }
}

fn truncate_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date().and_hms_opt(ts.hour(), 0, 0).unwrap_or(ts)
}

/// Group rows into 1-hour buckets keyed by truncated timestamp and average
/// each column over the rows that have a value there.
pub fn resample_hourly(rows: &[MergedRow]) -> Vec<HourlyBucket> {
    let mut buckets: BTreeMap<NaiveDateTime, ([f64; Column::COUNT], [u32; Column::COUNT])> =
        BTreeMap::new();

    for row in rows {
        let hour = truncate_to_hour(row.timestamp);
        let (sums, counts) = buckets
            .entry(hour)
            .or_insert(([0.0; Column::COUNT], [0; Column::COUNT]));
        for i in 0..Column::COUNT {
            if let Some(v) = row.values[i] {
                sums[i] += v;
                counts[i] += 1;
            }
        }
    }

    buckets
        .into_iter()
        .map(|(hour, (sums, counts))| {
            let mut means = [None; Column::COUNT];
            for i in 0..Column::COUNT {
                if counts[i] > 0 {
                    means[i] = Some(sums[i] / counts[i] as f64);
                }
            }
            HourlyBucket { hour, means }
        })
        .collect()
}

/// Read all three tables, merge, and forward-fill. Any unreadable table
/// propagates as an error the caller turns into the no-data marker.
fn load_merged(log: &dyn LogStore) -> Result<Vec<MergedRow>> {
    let mut tables = Vec::with_capacity(SensorGroup::ALL.len());
    for group in SensorGroup::ALL {
        tables.push((group, log.read_all(group)?));
    }
    let mut merged = merge_tables(&tables);
    forward_fill(&mut merged);
    Ok(merged)
}

/// Chart series: the continuous hour range from the first bucket to the
/// last, missing means rendered as 0.
pub fn hourly_series(log: &dyn LogStore) -> Result<HourlySeries> {
    let merged = load_merged(log)?;
    if merged.is_empty() {
        return Err(Error::NoData);
    }

    let buckets = resample_hourly(&merged);
    let first = buckets[0].hour;
    let last = buckets[buckets.len() - 1].hour;

    let mut series = HourlySeries {
        timestamps: Vec::new(),
        co2: Vec::new(),
        tvoc: Vec::new(),
        eco2: Vec::new(),
        pm1: Vec::new(),
        pm25: Vec::new(),
        pm10: Vec::new(),
        temperature: Vec::new(),
        humidity: Vec::new(),
    };

    let mut next_bucket = buckets.iter().peekable();
    let mut hour = first;
    while hour <= last {
        let means = match next_bucket.peek() {
            Some(bucket) if bucket.hour == hour => {
                let bucket = next_bucket.next().map(|b| b.means);
                bucket.unwrap_or([None; Column::COUNT])
            }
            _ => [None; Column::COUNT],
        };

        series.timestamps.push(hour.format("%H:%M").to_string());
        series.co2.push(means[Column::Co2.index()].unwrap_or(0.0));
        series.tvoc.push(means[Column::Tvoc.index()].unwrap_or(0.0));
        series.eco2.push(means[Column::Eco2.index()].unwrap_or(0.0));
        series.pm1.push(means[Column::Pm1.index()].unwrap_or(0.0));
        series.pm25.push(means[Column::Pm25.index()].unwrap_or(0.0));
        series.pm10.push(means[Column::Pm10.index()].unwrap_or(0.0));
        series
            .temperature
            .push(means[Column::Temperature.index()].unwrap_or(0.0));
        series
            .humidity
            .push(means[Column::Humidity.index()].unwrap_or(0.0));

        hour = hour + Duration::hours(1);
    }

    Ok(series)
}

/// Per-metric summaries over the raw (non-bucketed, forward-filled) series.
/// A metric whose column never saw a value is omitted entirely.
pub fn insights(log: &dyn LogStore) -> Result<BTreeMap<&'static str, Insight>> {
    let merged = load_merged(log)?;
    if merged.is_empty() {
        return Err(Error::NoData);
    }

    let mut result = BTreeMap::new();
    for column in MONITORED {
        if let Some(insight) = summarize_column(&merged, column) {
            result.insert(column.json_key(), insight);
        }
    }
    Ok(result)
}

fn summarize_column(rows: &[MergedRow], column: Column) -> Option<Insight> {
    let idx = column.index();
    let band_def = band(column)?;

    let mut max: Option<(f64, NaiveDateTime)> = None;
    let mut min: Option<(f64, NaiveDateTime)> = None;
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut exceeded = 0usize;

    for row in rows {
        let Some(v) = row.values[idx] else { continue };
        // First occurrence wins on ties, matching idxmax/idxmin.
        if max.map_or(true, |(m, _)| v > m) {
            max = Some((v, row.timestamp));
        }
        if min.map_or(true, |(m, _)| v < m) {
            min = Some((v, row.timestamp));
        }
        sum += v;
        count += 1;
        if band_def.exceeds_bad(v) {
            exceeded += 1;
        }
    }

    let (max_value, max_at) = max?;
    let (min_value, min_at) = min?;
    let avg = sum / count as f64;

    let (threshold, threshold_high, threshold_low) = match band_def {
        Band::Upper { bad, .. } => (Some(bad), None, None),
        Band::Range { bad, .. } => (None, Some(bad.1), Some(bad.0)),
    };

    Some(Insight {
        max: format_value(column, max_value),
        max_time: max_at.format("%H:%M").to_string(),
        min: format_value(column, min_value),
        min_time: min_at.format("%H:%M").to_string(),
        avg: format_value(column, avg),
        threshold,
        threshold_high,
        threshold_low,
        threshold_exceeded: exceeded,
    })
}

fn format_value(column: Column, value: f64) -> String {
    match column {
        Column::Co2 | Column::Eco2 => format!("{:.0} ppm", value),
        Column::Tvoc => format!("{:.0} ppb", value),
        Column::Pm1 | Column::Pm25 | Column::Pm10 => format!("{:.1} µg/m³", value),
        Column::Temperature => format!("{:.1} °C", value),
        Column::Humidity => format!("{:.1} %", value),
    }
}
