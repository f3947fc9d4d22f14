//! Open-Meteo current conditions.

use super::http::UpstreamClient;
use super::types::{OpenMeteoResponse, WeatherReading};
use super::{FetchCause, FetchError, SourceKey};

const CURRENT_FIELDS: &str = "temperature_2m,apparent_temperature,wind_speed_10m";

pub async fn fetch(
    client: &UpstreamClient,
    url: &str,
    lat: f64,
    lon: f64,
) -> Result<WeatherReading, FetchError> {
    let response: OpenMeteoResponse = client
        .get_json(
            SourceKey::Weather,
            url,
            &[
                ("latitude", &lat.to_string()),
                ("longitude", &lon.to_string()),
                ("current", CURRENT_FIELDS),
                ("wind_speed_unit", "ms"),
            ],
        )
        .await?;

    parse(response).map_err(|cause| FetchError::new(SourceKey::Weather, cause))
}

pub(crate) fn parse(response: OpenMeteoResponse) -> Result<WeatherReading, FetchCause> {
    let current = response.current.ok_or(FetchCause::MissingField("current"))?;

    Ok(WeatherReading {
        temperature: current
            .temperature_2m
            .ok_or(FetchCause::MissingField("temperature_2m"))?,
        apparent_temperature: current
            .apparent_temperature
            .ok_or(FetchCause::MissingField("apparent_temperature"))?,
        wind_speed: current
            .wind_speed_10m
            .ok_or(FetchCause::MissingField("wind_speed_10m"))?,
    })
}
