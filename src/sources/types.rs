use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub temperature: f64,
    pub apparent_temperature: f64,
    pub wind_speed: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitArrival {
    pub line: Option<String>,
    pub status: ArrivalStatus,
}

impl TransitArrival {
    pub fn sentinel(status: ArrivalStatus) -> Self {
        Self { line: None, status }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalStatus {
    Minutes(i64),
    Unknown,
    NoService,
    Error,
}

impl fmt::Display for ArrivalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrivalStatus::Minutes(m) => write!(f, "{} min", m),
            ArrivalStatus::Unknown => write!(f, "? min"),
            ArrivalStatus::NoService => write!(f, "no service"),
            ArrivalStatus::Error => write!(f, "error"),
        }
    }
}

/// One hour of electricity pricing, stamped in the market's local time.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectricityPricePoint {
    pub timestamp: NaiveDateTime,
    pub price: f64,
}

// Upstream payloads

#[derive(Debug, Deserialize)]
pub(crate) struct OpenMeteoResponse {
    pub current: Option<OpenMeteoCurrent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenMeteoCurrent {
    pub temperature_2m: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub wind_speed_10m: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StopDisplayResponse {
    // Upstream sends an explicit null on an idle display.
    #[serde(default)]
    pub next_stop_visits: Option<Vec<NextStopVisit>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NextStopVisit {
    #[serde(default)]
    pub stop_visits: Option<Vec<StopVisit>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StopVisit {
    pub estimated_minutes_until_departure: Option<serde_json::Value>,
    #[serde(alias = "lineRef")]
    pub line_short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotPriceResponse {
    #[serde(rename = "PriceWithTax")]
    pub price_with_tax: Option<f64>,
    #[serde(rename = "DateTime")]
    pub date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SeriesPoint {
    pub aikaleima_suomi: Option<String>,
    pub hinta: Option<serde_json::Value>,
}
