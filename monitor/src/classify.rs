use serde::Serialize;

use crate::model::{Column, Snapshot};

/// Overall severity. Ordering matters: once a metric pushes the status to
/// Bad, no healthier metric may downgrade it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Good,
    Normal,
    Bad,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Good => "Good",
            Status::Normal => "Normal",
            Status::Bad => "Bad",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Status::Good => "good",
            Status::Normal => "moderate",
            Status::Bad => "unhealthy",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            Status::Good => "✅",
            Status::Normal => "⚠️",
            Status::Bad => "❌",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Status::Good => "Safe for everyone, No action needed",
            Status::Normal => "Some groups may be affected",
            Status::Bad => "Health risks present",
        }
    }
}

/// Two-level threshold for one metric: a tighter caution bound and a worse
/// bad bound.
#[derive(Debug, Clone, Copy)]
pub enum Band {
    /// Exceeding the bound upward is a breach.
    Upper { caution: f64, bad: f64 },
    /// Leaving the (low, high) band on either side is a breach.
    Range { caution: (f64, f64), bad: (f64, f64) },
}

impl Band {
    /// True when `value` is strictly beyond the bad bound(s).
    pub fn exceeds_bad(&self, value: f64) -> bool {
        match self {
            Band::Upper { bad, .. } => value > *bad,
            Band::Range { bad, .. } => value < bad.0 || value > bad.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Breach {
    None,
    Caution,
    Bad,
}

fn breach(band: Band, value: f64) -> Breach {
    match band {
        Band::Upper { caution, bad } => {
            if value > bad {
                Breach::Bad
            } else if value > caution {
                Breach::Caution
            } else {
                Breach::None
            }
        }
        Band::Range { caution, bad } => {
            if value < bad.0 || value > bad.1 {
                Breach::Bad
            } else if value < caution.0 || value > caution.1 {
                Breach::Caution
            } else {
                Breach::None
            }
        }
    }
}

/// Metrics with thresholds, in evaluation order. This order fixes the order
/// of affected-group messages and recommendations and must stay stable.
pub const MONITORED: [Column; 7] = [
    Column::Co2,
    Column::Pm1,
    Column::Pm25,
    Column::Pm10,
    Column::Tvoc,
    Column::Temperature,
    Column::Humidity,
];

/// Threshold band per metric. eCO2 is recorded but carries no thresholds.
pub fn band(column: Column) -> Option<Band> {
    match column {
        Column::Co2 => Some(Band::Upper { caution: 800.0, bad: 1000.0 }),
        Column::Pm1 => Some(Band::Upper { caution: 10.0, bad: 25.0 }),
        Column::Pm25 => Some(Band::Upper { caution: 25.0, bad: 35.0 }),
        Column::Pm10 => Some(Band::Upper { caution: 45.0, bad: 100.0 }),
        Column::Tvoc => Some(Band::Upper { caution: 250.0, bad: 500.0 }),
        Column::Temperature => Some(Band::Range { caution: (19.0, 25.0), bad: (16.0, 28.0) }),
        Column::Humidity => Some(Band::Range { caution: (30.0, 60.0), bad: (25.0, 70.0) }),
        Column::Eco2 => None,
    }
}

/// (everyone-affected, sensitive-groups) messages per metric.
fn affected_messages(column: Column) -> (&'static str, &'static str) {
    match column {
        Column::Co2 => (
            "Everyone – may cause drowsiness, reduced focus",
            "Sensitive groups (e.g., elderly, children) may feel discomfort",
        ),
        Column::Pm1 => (
            "Everyone – particles can reach deep lungs",
            "Sensitive groups (e.g., asthmatics) may be at risk",
        ),
        Column::Pm25 => (
            "Everyone – especially asthmatics and elderly",
            "Sensitive groups may feel slight respiratory irritation",
        ),
        Column::Pm10 => (
            "Everyone – lung irritation and allergy risks",
            "Sensitive individuals may develop allergy-like symptoms",
        ),
        Column::Tvoc => (
            "Everyone – may cause headaches or nausea",
            "Chemically sensitive people may feel irritation",
        ),
        Column::Temperature => (
            "Everyone may feel heat/cold stress",
            "Discomfort for sensitive groups",
        ),
        Column::Humidity => (
            "Everyone – discomfort or health issues likely",
            "Dry skin or mold risk for sensitive groups",
        ),
        Column::Eco2 => ("", ""),
    }
}

/// (bad-level, caution-level) action texts per metric.
fn recommendation_messages(column: Column) -> (&'static str, &'static str) {
    match column {
        Column::Co2 => (
            "🌬️ CO₂ > 1000 ppm: Open windows, increase ventilation or use air exchanger",
            "💨 CO₂ 801-1000 ppm: Consider opening windows for ventilation",
        ),
        Column::Pm1 => (
            "😷 PM1.0 > 25 µg/m³: Use HEPA filter, close windows",
            "🔧 PM1.0 11-25 µg/m³: Improve filtration, monitor",
        ),
        Column::Pm25 => (
            "😷 PM2.5 > 35 µg/m³: Use air purifier, close windows, avoid physical activity",
            "🔧 PM2.5 26-35 µg/m³: Limit outdoor air entry, monitor levels",
        ),
        Column::Pm10 => (
            "🌪️ PM10 > 100 µg/m³: Use air purifier, avoid exposure",
            "🔧 PM10 46-100 µg/m³: Reduce dust-generating activities",
        ),
        Column::Tvoc => (
            "🧪 TVOC > 500 ppb: Ventilate room, avoid cleaning agents, use air purifier",
            "🧪 TVOC 251-500 ppb: Avoid scented sprays and synthetic chemicals",
        ),
        Column::Temperature => (
            "🌡️ Temperature < 16°C or > 28°C: Maintain temperature with AC or heater",
            "🌡️ Temperature outside 19-25°C: Adjust heater or fan as needed",
        ),
        Column::Humidity => (
            "💧 Humidity < 25% or > 70%: Control humidity, ventilate, use dryer/dehumidifier",
            "💧 Humidity outside 30-60%: Use humidifier or ventilate",
        ),
        Column::Eco2 => ("", ""),
    }
}

const ALL_CLEAR: [&str; 2] = [
    "✅ All parameters are within safe ranges",
    "🌱 Maintain good ventilation for optimal air quality",
];

/// Overall air-quality verdict for the live dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct AirQuality {
    pub status: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub affected_groups: Vec<&'static str>,
}

impl AirQuality {
    /// Placeholder verdict used before any reading has arrived.
    pub fn unavailable() -> Self {
        Self {
            status: "-",
            color: "",
            icon: "-",
            description: "-",
            affected_groups: Vec::new(),
        }
    }
}

/// Classify a snapshot. A metric still unknown compares as numeric zero,
/// matching the behavior the dashboard has always had.
pub fn classify(snapshot: &Snapshot) -> AirQuality {
    let mut status = Status::Good;
    let mut affected = Vec::new();

    for column in MONITORED {
        let Some(band_def) = band(column) else { continue };
        let value = snapshot.get(column).unwrap_or(0.0);
        match breach(band_def, value) {
            Breach::Bad => {
                status = Status::Bad;
                affected.push(affected_messages(column).0);
            }
            Breach::Caution => {
                if status == Status::Good {
                    status = Status::Normal;
                }
                affected.push(affected_messages(column).1);
            }
            Breach::None => {}
        }
    }

    AirQuality {
        status: status.as_str(),
        color: status.color(),
        icon: status.icon(),
        description: status.description(),
        affected_groups: affected,
    }
}

/// One action string per exceeded threshold, in the same metric order as
/// `classify`; two fixed all-clear lines when nothing is exceeded.
pub fn recommend(snapshot: &Snapshot) -> Vec<&'static str> {
    let mut recommendations = Vec::new();

    for column in MONITORED {
        let Some(band_def) = band(column) else { continue };
        let value = snapshot.get(column).unwrap_or(0.0);
        match breach(band_def, value) {
            Breach::Bad => recommendations.push(recommendation_messages(column).0),
            Breach::Caution => recommendations.push(recommendation_messages(column).1),
            Breach::None => {}
        }
    }

    if recommendations.is_empty() {
        recommendations.extend(ALL_CLEAR);
    }
    recommendations
}
