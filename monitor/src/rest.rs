use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::{Serialize, Serializer};
use tracing::warn;

use crate::classify::{classify, recommend, AirQuality};
use crate::history::{self, HourlySeries, Insight};
use crate::logstore::LogStore;
use crate::model::{Column, Snapshot};
use crate::state::SharedState;

#[derive(Clone)]
struct AppState {
    state: Arc<SharedState>,
    log: Arc<dyn LogStore>,
}

pub fn create_router(state: Arc<SharedState>, log: Arc<dyn LogStore>) -> Router {
    Router::new()
        .route("/api/current-data", get(current_data))
        .route("/api/historical-data", get(historical_data))
        .route("/api/insights", get(insights))
        .with_state(AppState { state, log })
}

/// Serialize a metric as its number, or the `"-"` placeholder while unknown.
fn dash<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_str("-"),
    }
}

#[derive(Debug, Serialize)]
struct CurrentDataResponse {
    #[serde(serialize_with = "dash")]
    co2: Option<f64>,
    #[serde(serialize_with = "dash")]
    tvoc: Option<f64>,
    #[serde(serialize_with = "dash")]
    eco2: Option<f64>,
    #[serde(serialize_with = "dash")]
    pm1: Option<f64>,
    #[serde(serialize_with = "dash")]
    pm25: Option<f64>,
    #[serde(serialize_with = "dash")]
    pm10: Option<f64>,
    #[serde(serialize_with = "dash")]
    temperature: Option<f64>,
    #[serde(serialize_with = "dash")]
    humidity: Option<f64>,
    timestamp: Option<String>,
    last_update: Option<String>,
    last_update_co2: Option<String>,
    last_update_pm: Option<String>,
    connection_status: &'static str,
    air_quality_status: AirQuality,
    recommendations: Vec<&'static str>,
}

fn build_current_data(snapshot: &Snapshot) -> CurrentDataResponse {
    let (air_quality_status, recommendations) = if snapshot.all_missing() {
        (AirQuality::unavailable(), vec!["-"])
    } else {
        (classify(snapshot), recommend(snapshot))
    };

    CurrentDataResponse {
        co2: snapshot.get(Column::Co2),
        tvoc: snapshot.get(Column::Tvoc),
        eco2: snapshot.get(Column::Eco2),
        pm1: snapshot.get(Column::Pm1),
        pm25: snapshot.get(Column::Pm25),
        pm10: snapshot.get(Column::Pm10),
        temperature: snapshot.get(Column::Temperature),
        humidity: snapshot.get(Column::Humidity),
        timestamp: snapshot
            .timestamp
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string()),
        last_update: snapshot.last_update.map(|t| t.format("%H:%M:%S").to_string()),
        last_update_co2: snapshot
            .last_update_co2
            .map(|t| t.format("%H:%M:%S").to_string()),
        last_update_pm: snapshot
            .last_update_pm
            .map(|t| t.format("%H:%M:%S").to_string()),
        connection_status: snapshot.connection_status.as_str(),
        air_quality_status,
        recommendations,
    }
}

async fn current_data(State(app): State<AppState>) -> Json<CurrentDataResponse> {
    let snapshot = app.state.snapshot();
    Json(build_current_data(&snapshot))
}

/// Either a payload or the structured no-data marker, both served as 200
/// so the dashboard can poll without special-casing status codes.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiResult<T> {
    Data(T),
    NoData { error: &'static str },
}

const NO_DATA: &str = "No data available";

async fn historical_data(State(app): State<AppState>) -> Json<ApiResult<HourlySeries>> {
    match history::hourly_series(app.log.as_ref()) {
        Ok(series) => Json(ApiResult::Data(series)),
        Err(e) => {
            warn!("Historical data unavailable: {}", e);
            Json(ApiResult::NoData { error: NO_DATA })
        }
    }
}

async fn insights(
    State(app): State<AppState>,
) -> Json<ApiResult<BTreeMap<&'static str, Insight>>> {
    match history::insights(app.log.as_ref()) {
        Ok(summaries) => Json(ApiResult::Data(summaries)),
        Err(e) => {
            warn!("Insights unavailable: {}", e);
            Json(ApiResult::NoData { error: NO_DATA })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SensorGroup;
    use crate::state::SharedState;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_current_data_placeholder_before_any_reading() {
        let state = SharedState::new();
        let response = build_current_data(&state.snapshot());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["co2"], "-");
        assert_eq!(json["humidity"], "-");
        assert_eq!(json["timestamp"], serde_json::Value::Null);
        assert_eq!(json["connection_status"], "Disconnected");
        assert_eq!(json["air_quality_status"]["status"], "-");
        assert_eq!(json["recommendations"], serde_json::json!(["-"]));
    }

    #[test]
    fn test_current_data_with_readings() {
        let state = SharedState::new();
        state.update(
            SensorGroup::Scd41,
            &[Some(1200.0), Some(22.0), Some(50.0)],
            at(10, 15, 30),
        );
        let response = build_current_data(&state.snapshot());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["co2"], 1200.0);
        assert_eq!(json["tvoc"], "-");
        assert_eq!(json["last_update"], "10:15:30");
        assert_eq!(json["last_update_co2"], "10:15:30");
        assert_eq!(json["last_update_pm"], serde_json::Value::Null);
        assert_eq!(json["connection_status"], "Connected");
        assert_eq!(json["air_quality_status"]["status"], "Bad");
    }

    #[test]
    fn test_no_data_marker_shape() {
        let marker: ApiResult<HourlySeries> = ApiResult::NoData { error: NO_DATA };
        let json = serde_json::to_value(&marker).unwrap();
        assert_eq!(json, serde_json::json!({"error": "No data available"}));
    }
}
