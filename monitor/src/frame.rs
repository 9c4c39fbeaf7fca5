use crate::errors::{Error, Result};
use crate::model::{Reading, SensorGroup, WireFrame};

/// Outcome of decoding one line from the sensor link. Parsing failures are
/// data, not program faults: the caller gets a classified result either way.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// A well-formed reading from one sensor group.
    Reading(Reading),
    /// The firmware reported an error instead of data.
    DeviceError(String),
    /// Blank line, nothing to do.
    Empty,
}

/// Decode one raw line. Empty/whitespace-only lines are skipped silently;
/// anything else must be a JSON object carrying either `sensor`+`data` or
/// `error`.
pub fn parse_line(line: &str) -> Result<FrameOutcome> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(FrameOutcome::Empty);
    }

    let frame: WireFrame =
        serde_json::from_str(line).map_err(|e| Error::Parse(format!("invalid JSON: {}", e)))?;

    if let Some(message) = frame.error {
        return Ok(FrameOutcome::DeviceError(message));
    }

    match (frame.sensor, frame.data) {
        (Some(sensor), Some(data)) => {
            let group = SensorGroup::from_wire(&sensor)
                .ok_or_else(|| Error::Parse(format!("unknown sensor {:?}", sensor)))?;
            let values = group
                .columns()
                .iter()
                .map(|col| data.get(col.wire_key()).copied())
                .collect();
            Ok(FrameOutcome::Reading(Reading { group, values }))
        }
        _ => Err(Error::Parse("frame missing sensor/data fields".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;

    #[test]
    fn test_parse_scd41_frame() {
        let line = r#"{"sensor": "scd41", "data": {"CO2": 612, "Temperature": 21.4, "Humidity": 48.2}}"#;
        match parse_line(line).unwrap() {
            FrameOutcome::Reading(reading) => {
                assert_eq!(reading.group, SensorGroup::Scd41);
                assert_eq!(reading.values, vec![Some(612.0), Some(21.4), Some(48.2)]);
            }
            other => panic!("expected reading, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_sps30_frame_with_missing_metric() {
        let line = r#"{"sensor": "sps30", "data": {"PM1.0": 4.1, "PM10.0": 9.9}}"#;
        match parse_line(line).unwrap() {
            FrameOutcome::Reading(reading) => {
                assert_eq!(reading.group, SensorGroup::Sps30);
                // PM2.5 absent from the frame stays unknown
                assert_eq!(reading.values, vec![Some(4.1), None, Some(9.9)]);
                assert_eq!(reading.group.columns()[1], Column::Pm25);
            }
            other => panic!("expected reading, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_device_error_frame() {
        let line = r#"{"error": "CCS811 not ready"}"#;
        assert_eq!(
            parse_line(line).unwrap(),
            FrameOutcome::DeviceError("CCS811 not ready".to_string())
        );
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        assert_eq!(parse_line("").unwrap(), FrameOutcome::Empty);
        assert_eq!(parse_line("   \t").unwrap(), FrameOutcome::Empty);
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        assert!(parse_line("not json at all").is_err());
        assert!(parse_line("{\"sensor\": ").is_err());
    }

    #[test]
    fn test_unknown_sensor_is_a_parse_error() {
        let line = r#"{"sensor": "bme280", "data": {"Pressure": 1013.0}}"#;
        assert!(parse_line(line).is_err());
    }

    #[test]
    fn test_missing_data_field_is_a_parse_error() {
        assert!(parse_line(r#"{"sensor": "scd41"}"#).is_err());
        assert!(parse_line(r#"{"data": {"CO2": 400}}"#).is_err());
    }

    #[test]
    fn test_extra_data_keys_are_ignored() {
        let line = r#"{"sensor": "ccs811", "data": {"eCO2": 400, "TVOC": 12, "Baseline": 33000}}"#;
        match parse_line(line).unwrap() {
            FrameOutcome::Reading(reading) => {
                assert_eq!(reading.values, vec![Some(400.0), Some(12.0)]);
            }
            other => panic!("expected reading, got {:?}", other),
        }
    }
}
