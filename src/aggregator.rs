//! Builds one dashboard view from the three upstreams.
//!
//! Weather is the only source allowed to fail the whole view; transit and both
//! electricity lookups fall back to sentinels and keep going.

use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::cache::{Clock, TtlCache};
use crate::config::Config;
use crate::pricing::cheapest_window;
use crate::sources::transit::MAX_ARRIVALS;
use crate::sources::types::{ArrivalStatus, ElectricityPricePoint, TransitArrival, WeatherReading};
use crate::sources::{DashboardSources, FetchError, SourceKey};

pub const UNKNOWN_PRICE: &str = "unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub temperature: i64,
    pub feels_like: i64,
    pub wind_speed: i64,
    pub arrivals: Vec<TransitArrival>,
    pub electricity_price: String,
    pub cheapest_window: String,
}

pub struct Aggregator {
    sources: Arc<dyn DashboardSources>,
    clock: Arc<dyn Clock>,
    config: Config,
    weather: TtlCache<SourceKey, WeatherReading>,
    current_price: TtlCache<SourceKey, ElectricityPricePoint>,
    price_series: TtlCache<SourceKey, Vec<ElectricityPricePoint>>,
}

impl Aggregator {
    pub fn new(sources: Arc<dyn DashboardSources>, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            sources,
            clock,
            config,
            weather: TtlCache::new(),
            current_price: TtlCache::new(),
            price_series: TtlCache::new(),
        }
    }

    /// Resolves every source for one page view. Only a weather failure is fatal.
    pub async fn build_view(&self) -> Result<ViewModel, FetchError> {
        let now_utc = self.clock.now();
        let now = now_utc.with_timezone(&self.config.timezone);

        let weather = self
            .weather
            .get_or_fetch(
                SourceKey::Weather,
                now_utc,
                self.config.ttl_for(SourceKey::Weather),
                || self.sources.weather(),
            )
            .await?;

        let arrivals = self.resolve_transit().await;
        let electricity_price = self.resolve_current_price(now).await;
        let cheapest_window = self.resolve_cheapest_window(now).await;

        Ok(ViewModel {
            temperature: round_ties_even(weather.temperature),
            feels_like: round_ties_even(weather.apparent_temperature),
            wind_speed: round_ties_even(weather.wind_speed),
            arrivals,
            electricity_price,
            cheapest_window,
        })
    }

    /// Last successful fetch per cached source.
    pub async fn cache_status(&self) -> Vec<(SourceKey, Option<DateTime<chrono::Utc>>)> {
        let mut status = Vec::with_capacity(SourceKey::CACHED.len());
        for key in SourceKey::CACHED {
            let fetched_at = match key {
                SourceKey::Weather => self.weather.fetched_at(key).await,
                SourceKey::Electricity => self.current_price.fetched_at(key).await,
                SourceKey::ElectricitySeries => self.price_series.fetched_at(key).await,
                SourceKey::Transit => None,
            };
            status.push((key, fetched_at));
        }
        status
    }

    // Transit goes straight to upstream; stale arrival estimates are worse than none.
    async fn resolve_transit(&self) -> Vec<TransitArrival> {
        match self.sources.transit().await {
            Ok(mut arrivals) if !arrivals.is_empty() => {
                arrivals.truncate(MAX_ARRIVALS);
                arrivals
            }
            Ok(_) => vec![TransitArrival::sentinel(ArrivalStatus::NoService)],
            Err(e) => {
                tracing::warn!("Transit unavailable: {:#}", anyhow::Error::new(e));
                vec![TransitArrival::sentinel(ArrivalStatus::Error)]
            }
        }
    }

    async fn resolve_current_price(&self, now: DateTime<Tz>) -> String {
        let result = self
            .current_price
            .get_or_fetch(
                SourceKey::Electricity,
                now.with_timezone(&chrono::Utc),
                self.config.ttl_for(SourceKey::Electricity),
                || self.sources.current_price(now),
            )
            .await;

        match result {
            Ok(point) => format_price(point.price),
            Err(e) => {
                tracing::warn!("Electricity price unavailable: {:#}", anyhow::Error::new(e));
                UNKNOWN_PRICE.to_string()
            }
        }
    }

    async fn resolve_cheapest_window(&self, now: DateTime<Tz>) -> String {
        let window_hours = self.config.cheapest_window_hours;
        let series = self
            .price_series
            .get_or_fetch(
                SourceKey::ElectricitySeries,
                now.with_timezone(&chrono::Utc),
                self.config.ttl_for(SourceKey::ElectricitySeries),
                || {
                    self.sources
                        .price_series(now, window_hours, self.config.price_horizon_hours)
                },
            )
            .await;

        let series = match series {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!("Price series unavailable: {:#}", anyhow::Error::new(e));
                return String::new();
            }
        };

        match cheapest_window(&series, window_hours as usize, now.hour()) {
            Ok(window) => window.summary(window_hours),
            Err(e) => {
                tracing::warn!("Cheapest window not computed: {}", e);
                String::new()
            }
        }
    }
}

/// Cents per kWh with one decimal; upstream quotes euros.
pub fn format_price(price_per_kwh: f64) -> String {
    format!("{:.1}", price_per_kwh * 100.0)
}

/// Ties go to the even neighbour, so -0.5 reads as 0 rather than -1.
fn round_ties_even(value: f64) -> i64 {
    value.round_ties_even() as i64
}
