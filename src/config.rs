use anyhow::Context;
use chrono_tz::Tz;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::sources::SourceKey;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub latitude: f64,
    pub longitude: f64,
    pub weather_url: String,
    pub transit_url: String,
    pub electricity_now_url: String,
    pub electricity_series_url: String,
    pub timezone: Tz,
    pub http_timeout: Duration,
    pub weather_ttl: Duration,
    pub electricity_ttl: Duration,
    pub electricity_series_ttl: Duration,
    pub cheapest_window_hours: u32,
    pub price_horizon_hours: u32,
    pub page_refresh_secs: u32,
    pub transit_label: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0:8080".to_string(),
            // Tampere
            latitude: 61.4991,
            longitude: 23.7871,
            weather_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            transit_url: "https://lissu.tampere.fi/timetable/rest/stopdisplays/0870".to_string(),
            electricity_now_url: "https://api.spot-hinta.fi/JustNow".to_string(),
            electricity_series_url: "https://www.sahkohinta-api.fi/api/v1/halpa".to_string(),
            timezone: chrono_tz::Europe::Helsinki,
            http_timeout: Duration::from_secs(10),
            weather_ttl: Duration::from_secs(300),
            electricity_ttl: Duration::from_secs(300),
            electricity_series_ttl: Duration::from_secs(300),
            cheapest_window_hours: 2,
            price_horizon_hours: 12,
            page_refresh_secs: 60,
            transit_label: "Tram".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        let timezone = match env::var("APP_TIMEZONE") {
            Ok(name) => name
                .parse::<Tz>()
                .map_err(|_| anyhow::anyhow!("APP_TIMEZONE is not a valid time zone: {}", name))?,
            Err(_) => defaults.timezone,
        };

        let config = Config {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            latitude: parse_var("DASHBOARD_LAT", defaults.latitude)?,
            longitude: parse_var("DASHBOARD_LON", defaults.longitude)?,
            weather_url: env::var("WEATHER_URL").unwrap_or(defaults.weather_url),
            transit_url: env::var("TRANSIT_URL").unwrap_or(defaults.transit_url),
            electricity_now_url: env::var("ELECTRICITY_NOW_URL")
                .unwrap_or(defaults.electricity_now_url),
            electricity_series_url: env::var("ELECTRICITY_SERIES_URL")
                .unwrap_or(defaults.electricity_series_url),
            timezone,
            http_timeout: secs_var("HTTP_TIMEOUT_SECS", defaults.http_timeout)?,
            weather_ttl: secs_var("WEATHER_TTL_SECS", defaults.weather_ttl)?,
            electricity_ttl: secs_var("ELECTRICITY_TTL_SECS", defaults.electricity_ttl)?,
            electricity_series_ttl: secs_var(
                "ELECTRICITY_SERIES_TTL_SECS",
                defaults.electricity_series_ttl,
            )?,
            cheapest_window_hours: parse_var("CHEAPEST_WINDOW_HOURS", defaults.cheapest_window_hours)?,
            price_horizon_hours: parse_var("PRICE_HORIZON_HOURS", defaults.price_horizon_hours)?,
            page_refresh_secs: parse_var("PAGE_REFRESH_SECS", defaults.page_refresh_secs)?,
            transit_label: env::var("TRANSIT_LABEL").unwrap_or(defaults.transit_label),
        };

        if !(-90.0..=90.0).contains(&config.latitude) || !(-180.0..=180.0).contains(&config.longitude) {
            anyhow::bail!(
                "Invalid coordinates: {}, {}",
                config.latitude,
                config.longitude
            );
        }
        if config.cheapest_window_hours == 0 {
            anyhow::bail!("CHEAPEST_WINDOW_HOURS must be at least 1");
        }

        Ok(config)
    }

    /// Freshness bound for a source. Transit is always fetched live.
    pub fn ttl_for(&self, key: SourceKey) -> Duration {
        match key {
            SourceKey::Weather => self.weather_ttl,
            SourceKey::Transit => Duration::ZERO,
            SourceKey::Electricity => self.electricity_ttl,
            SourceKey::ElectricitySeries => self.electricity_series_ttl,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

fn secs_var(name: &str, default: Duration) -> anyhow::Result<Duration> {
    parse_var(name, default.as_secs()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttls_are_five_minutes() {
        let config = Config::default();
        assert_eq!(config.ttl_for(SourceKey::Weather), Duration::from_secs(300));
        assert_eq!(config.ttl_for(SourceKey::Electricity), Duration::from_secs(300));
        assert_eq!(config.ttl_for(SourceKey::ElectricitySeries), Duration::from_secs(300));
        assert_eq!(config.ttl_for(SourceKey::Transit), Duration::ZERO);
    }

    #[test]
    fn test_ttl_is_configurable_per_key() {
        let config = Config {
            weather_ttl: Duration::from_secs(60),
            electricity_series_ttl: Duration::from_secs(900),
            ..Config::default()
        };
        assert_eq!(config.ttl_for(SourceKey::Weather), Duration::from_secs(60));
        assert_eq!(config.ttl_for(SourceKey::Electricity), Duration::from_secs(300));
        assert_eq!(config.ttl_for(SourceKey::ElectricitySeries), Duration::from_secs(900));
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        // Name chosen so no real environment collides with it.
        std::env::set_var("STATUS_DASHBOARD_TEST_NUMBER", "twelve");
        let parsed: anyhow::Result<u32> = parse_var("STATUS_DASHBOARD_TEST_NUMBER", 12);
        assert!(parsed.is_err());
        std::env::remove_var("STATUS_DASHBOARD_TEST_NUMBER");

        let fallback: u32 = parse_var("STATUS_DASHBOARD_TEST_UNSET", 12).unwrap();
        assert_eq!(fallback, 12);
    }
}
