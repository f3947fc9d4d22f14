//! Spot price endpoints: the price right now and the cheapest run ahead.

use chrono::{DateTime, Duration, NaiveDateTime, Timelike};
use chrono_tz::Tz;
use serde_json::Value;

use super::http::UpstreamClient;
use super::types::{ElectricityPricePoint, SeriesPoint, SpotPriceResponse};
use super::{FetchCause, FetchError, SourceKey};

const RANGE_FORMAT: &str = "%Y-%m-%dT%H:00";

pub async fn fetch_current(
    client: &UpstreamClient,
    url: &str,
    now: DateTime<Tz>,
) -> Result<ElectricityPricePoint, FetchError> {
    let response: SpotPriceResponse = client.get_json(SourceKey::Electricity, url, &[]).await?;
    parse_current(response, now).map_err(|cause| FetchError::new(SourceKey::Electricity, cause))
}

pub async fn fetch_series(
    client: &UpstreamClient,
    url: &str,
    now: DateTime<Tz>,
    window_hours: u32,
    horizon_hours: u32,
) -> Result<Vec<ElectricityPricePoint>, FetchError> {
    let range = time_range(now, horizon_hours);
    let response: Vec<SeriesPoint> = client
        .get_json(
            SourceKey::ElectricitySeries,
            url,
            &[
                ("tunnit", &window_hours.to_string()),
                ("tulos", "sarja"),
                ("aikaraja", &range),
            ],
        )
        .await?;

    parse_series(response).map_err(|cause| FetchError::new(SourceKey::ElectricitySeries, cause))
}

/// `start_end` query value covering the current local hour to `horizon_hours` ahead.
pub(crate) fn time_range(now: DateTime<Tz>, horizon_hours: u32) -> String {
    let end = now + Duration::hours(i64::from(horizon_hours));
    format!("{}_{}", now.format(RANGE_FORMAT), end.format(RANGE_FORMAT))
}

pub(crate) fn parse_current(
    response: SpotPriceResponse,
    now: DateTime<Tz>,
) -> Result<ElectricityPricePoint, FetchCause> {
    let price = response
        .price_with_tax
        .ok_or(FetchCause::MissingField("PriceWithTax"))?;

    let timestamp = match response.date_time {
        Some(raw) => parse_timestamp("DateTime", &raw)?,
        None => truncate_to_hour(now.naive_local()),
    };

    Ok(ElectricityPricePoint { timestamp, price })
}

pub(crate) fn parse_series(points: Vec<SeriesPoint>) -> Result<Vec<ElectricityPricePoint>, FetchCause> {
    let mut parsed = points
        .into_iter()
        .map(|point| -> Result<ElectricityPricePoint, FetchCause> {
            let raw_ts = point
                .aikaleima_suomi
                .ok_or(FetchCause::MissingField("aikaleima_suomi"))?;
            let timestamp = parse_timestamp("aikaleima_suomi", &raw_ts)?;
            let price = parse_price(point.hinta.ok_or(FetchCause::MissingField("hinta"))?)?;
            Ok(ElectricityPricePoint { timestamp, price })
        })
        .collect::<Result<Vec<_>, FetchCause>>()?;

    parsed.sort_by_key(|p| p.timestamp);
    Ok(parsed)
}

/// Local wall-clock time. Offsets, when present, are dropped rather than converted.
fn parse_timestamp(field: &'static str, raw: &str) -> Result<NaiveDateTime, FetchCause> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| FetchCause::InvalidField {
            field,
            value: raw.to_string(),
        })
}

fn parse_price(value: Value) -> Result<f64, FetchCause> {
    let price = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };

    price
        .filter(|p| p.is_finite())
        .ok_or_else(|| FetchCause::InvalidField {
            field: "hinta",
            value: value.to_string(),
        })
}

fn truncate_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}
