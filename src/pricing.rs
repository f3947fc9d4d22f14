use chrono::Timelike;
use thiserror::Error;

use crate::sources::types::ElectricityPricePoint;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PricingError {
    #[error("insufficient data: price series is empty")]
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheapestWindow {
    pub start_hour: u32,
    /// Exclusive; wraps past midnight.
    pub end_hour: u32,
    pub average_price: f64,
    pub currently_inside: bool,
}

impl CheapestWindow {
    pub fn summary(&self, window_hours: u32) -> String {
        let mut text = format!(
            "Cheapest {}h: {:02}-{:02} ({:.1} c)",
            window_hours, self.start_hour, self.end_hour, self.average_price
        );
        if self.currently_inside {
            text.push_str(" now!");
        }
        text
    }
}

/// Derives the cheapest window from an ascending price series.
///
/// Upstream normally returns exactly the winning `window_size` hours. If it
/// sends a longer series, the contiguous run of `window_size` points with the
/// lowest mean is picked first, earliest run winning ties.
pub fn cheapest_window(
    points: &[ElectricityPricePoint],
    window_size: usize,
    current_hour: u32,
) -> Result<CheapestWindow, PricingError> {
    let run = cheapest_run(points, window_size);
    let (first, last) = match (run.first(), run.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(PricingError::InsufficientData),
    };

    let start_hour = first.timestamp.hour();
    let end_hour = (last.timestamp.hour() + 1) % 24;
    let average_price = mean(run);

    Ok(CheapestWindow {
        start_hour,
        end_hour,
        average_price,
        currently_inside: hour_in_window(start_hour, end_hour, current_hour),
    })
}

/// `start == end` takes the wrapping branch, so such a window covers every hour.
pub fn hour_in_window(start_hour: u32, end_hour: u32, hour: u32) -> bool {
    if start_hour < end_hour {
        start_hour <= hour && hour < end_hour
    } else {
        hour >= start_hour || hour < end_hour
    }
}

fn cheapest_run(points: &[ElectricityPricePoint], window_size: usize) -> &[ElectricityPricePoint] {
    if window_size == 0 || points.len() <= window_size {
        return points;
    }

    let mut best = &points[..window_size];
    let mut best_avg = mean(best);
    for run in points.windows(window_size).skip(1) {
        let avg = mean(run);
        if avg < best_avg {
            best = run;
            best_avg = avg;
        }
    }
    best
}

fn mean(points: &[ElectricityPricePoint]) -> f64 {
    points.iter().map(|p| p.price).sum::<f64>() / points.len() as f64
}
