use serde_json::Value;

use super::http::UpstreamClient;
use super::types::{ArrivalStatus, StopDisplayResponse, StopVisit, TransitArrival};
use super::{FetchError, SourceKey};

/// Arrivals shown on the dashboard.
pub const MAX_ARRIVALS: usize = 2;

/// Next departures from the stop display, nearest first as upstream orders them.
/// An empty list means upstream had nothing to show; the caller picks the fallback.
pub async fn fetch(client: &UpstreamClient, url: &str) -> Result<Vec<TransitArrival>, FetchError> {
    let response: StopDisplayResponse = client.get_json(SourceKey::Transit, url, &[]).await?;
    Ok(parse(response))
}

pub(crate) fn parse(response: StopDisplayResponse) -> Vec<TransitArrival> {
    let Some(first) = response.next_stop_visits.unwrap_or_default().into_iter().next() else {
        return Vec::new();
    };

    first
        .stop_visits
        .unwrap_or_default()
        .into_iter()
        .take(MAX_ARRIVALS)
        .map(arrival_from_visit)
        .collect()
}

fn arrival_from_visit(visit: StopVisit) -> TransitArrival {
    let status = match visit.estimated_minutes_until_departure {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .map(ArrivalStatus::Minutes)
            .unwrap_or(ArrivalStatus::Unknown),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(ArrivalStatus::Minutes)
            .unwrap_or(ArrivalStatus::Unknown),
        _ => ArrivalStatus::Unknown,
    };

    TransitArrival {
        line: visit.line_short_name.filter(|l| !l.trim().is_empty()),
        status,
    }
}
