use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;

/// One line on the wire: a sensor reading frame.
#[derive(Debug, Serialize)]
pub struct SensorFrame {
    pub sensor: &'static str,
    pub data: BTreeMap<&'static str, f64>,
}

/// One line on the wire: a firmware error frame.
#[derive(Debug, Serialize)]
pub struct ErrorFrame {
    pub error: String,
}

/// Random-walk environment model so consecutive frames look like a real
/// room instead of white noise.
#[derive(Debug)]
pub struct Environment {
    co2: f64,
    temperature: f64,
    humidity: f64,
    eco2: f64,
    tvoc: f64,
    pm1: f64,
    pm25: f64,
    pm10: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            co2: 650.0,
            temperature: 22.0,
            humidity: 45.0,
            eco2: 480.0,
            tvoc: 120.0,
            pm1: 4.0,
            pm25: 7.0,
            pm10: 15.0,
        }
    }
}

fn drift(rng: &mut impl Rng, value: &mut f64, step: f64, min: f64, max: f64) {
    *value = (*value + rng.gen_range(-step..step)).clamp(min, max);
}

impl Environment {
    /// Advance every metric one step. Occasionally jumps CO2 or particulates
    /// to exercise the caution/bad thresholds downstream.
    pub fn step(&mut self, rng: &mut impl Rng) {
        drift(rng, &mut self.co2, 25.0, 400.0, 2000.0);
        drift(rng, &mut self.temperature, 0.2, 12.0, 32.0);
        drift(rng, &mut self.humidity, 0.8, 20.0, 80.0);
        drift(rng, &mut self.eco2, 20.0, 400.0, 1800.0);
        drift(rng, &mut self.tvoc, 15.0, 0.0, 900.0);
        drift(rng, &mut self.pm1, 0.4, 0.0, 40.0);
        drift(rng, &mut self.pm25, 0.6, 0.0, 60.0);
        drift(rng, &mut self.pm10, 1.0, 0.0, 150.0);

        if rng.gen_bool(0.02) {
            self.co2 = rng.gen_range(900.0..1600.0); // someone closed the door
        }
        if rng.gen_bool(0.01) {
            self.pm25 = rng.gen_range(25.0..55.0); // cooking spike
        }
    }

    pub fn scd41_frame(&self) -> SensorFrame {
        let mut data = BTreeMap::new();
        data.insert("CO2", self.co2.round());
        data.insert("Temperature", round1(self.temperature));
        data.insert("Humidity", round1(self.humidity));
        SensorFrame { sensor: "scd41", data }
    }

    pub fn ccs811_frame(&self) -> SensorFrame {
        let mut data = BTreeMap::new();
        data.insert("eCO2", self.eco2.round());
        data.insert("TVOC", self.tvoc.round());
        SensorFrame { sensor: "ccs811", data }
    }

    pub fn sps30_frame(&self) -> SensorFrame {
        let mut data = BTreeMap::new();
        data.insert("PM1.0", round1(self.pm1));
        data.insert("PM2.5", round1(self.pm25));
        data.insert("PM10.0", round1(self.pm10));
        SensorFrame { sensor: "sps30", data }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_frames_serialize_to_the_wire_shape() {
        let env = Environment::default();
        let json = serde_json::to_string(&env.scd41_frame()).unwrap();
        assert!(json.contains("\"sensor\":\"scd41\""));
        assert!(json.contains("\"CO2\""));

        let json = serde_json::to_string(&env.sps30_frame()).unwrap();
        assert!(json.contains("\"PM2.5\""));
    }

    #[test]
    fn test_step_keeps_values_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut env = Environment::default();
        for _ in 0..1000 {
            env.step(&mut rng);
            assert!(env.co2 >= 400.0 && env.co2 <= 2000.0);
            assert!(env.humidity >= 20.0 && env.humidity <= 80.0);
            assert!(env.pm25 >= 0.0);
        }
    }
}
