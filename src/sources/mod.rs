pub mod electricity;
pub mod http;
pub mod transit;
pub mod types;
pub mod weather;

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::config::Config;
use self::http::UpstreamClient;
use self::types::*;

/// Identifies one upstream data source. Doubles as the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKey {
    Weather,
    Transit,
    Electricity,
    ElectricitySeries,
}

impl SourceKey {
    pub const CACHED: [SourceKey; 3] = [
        SourceKey::Weather,
        SourceKey::Electricity,
        SourceKey::ElectricitySeries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKey::Weather => "weather",
            SourceKey::Transit => "transit",
            SourceKey::Electricity => "electricity",
            SourceKey::ElectricitySeries => "electricity_series",
        }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("{upstream} fetch failed")]
pub struct FetchError {
    pub upstream: SourceKey,
    #[source]
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(upstream: SourceKey, cause: FetchCause) -> Self {
        Self { upstream, cause }
    }
}

#[derive(Error, Debug)]
pub enum FetchCause {
    #[error("request timed out")]
    Timeout,
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("JSON parsing failed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid field {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// The upstreams the dashboard reads from.
#[async_trait]
pub trait DashboardSources: Send + Sync {
    async fn weather(&self) -> Result<WeatherReading, FetchError>;

    async fn transit(&self) -> Result<Vec<TransitArrival>, FetchError>;

    async fn current_price(&self, now: DateTime<Tz>) -> Result<ElectricityPricePoint, FetchError>;

    async fn price_series(
        &self,
        now: DateTime<Tz>,
        window_hours: u32,
        horizon_hours: u32,
    ) -> Result<Vec<ElectricityPricePoint>, FetchError>;
}

/// Live HTTP implementation backed by the configured endpoints.
pub struct HttpSources {
    client: UpstreamClient,
    config: Config,
}

impl HttpSources {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let client = UpstreamClient::new(config.http_timeout)?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl DashboardSources for HttpSources {
    async fn weather(&self) -> Result<WeatherReading, FetchError> {
        weather::fetch(
            &self.client,
            &self.config.weather_url,
            self.config.latitude,
            self.config.longitude,
        )
        .await
    }

    async fn transit(&self) -> Result<Vec<TransitArrival>, FetchError> {
        transit::fetch(&self.client, &self.config.transit_url).await
    }

    async fn current_price(&self, now: DateTime<Tz>) -> Result<ElectricityPricePoint, FetchError> {
        electricity::fetch_current(&self.client, &self.config.electricity_now_url, now).await
    }

    async fn price_series(
        &self,
        now: DateTime<Tz>,
        window_hours: u32,
        horizon_hours: u32,
    ) -> Result<Vec<ElectricityPricePoint>, FetchError> {
        electricity::fetch_series(
            &self.client,
            &self.config.electricity_series_url,
            now,
            window_hours,
            horizon_hours,
        )
        .await
    }
}
