//! State behind the detail view's 24-hour history panel and chart.

use chrono::{Local, TimeZone};

use crate::accuweather::WeatherProvider;
use crate::error::{Result, WxError};
use crate::weather::{Conditions, Units};

pub const EMPTY_MESSAGE: &str = "No historical data available.";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum HistoryState {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<Conditions>),
    Error(String),
}

/// Points for the temperature line, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureChart {
    pub points: Vec<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_labels: Vec<String>,
    pub y_labels: Vec<String>,
}

impl TemperatureChart {
    /// `None` when no reading carries a temperature.
    pub fn from_history(history: &[Conditions], units: Units) -> Option<Self> {
        // provider delivers newest first
        let points: Vec<(f64, f64)> = history
            .iter()
            .rev()
            .filter_map(|h| units.temperature(h).map(|t| (h.epoch_time as f64, t)))
            .collect();

        let first = points.first()?;
        let last = points.last()?;
        let (lo, hi) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, t)| {
                (lo.min(t), hi.max(t))
            });

        let x_bounds = if last.0 > first.0 {
            [first.0, last.0]
        } else {
            [first.0 - 1800.0, first.0 + 1800.0]
        };
        let y_bounds = [(lo - 1.0).floor(), (hi + 1.0).ceil()];

        Some(Self {
            x_labels: vec![axis_time(x_bounds[0]), axis_time(x_bounds[1])],
            y_labels: vec![
                format!("{:.0}", y_bounds[0]),
                format!("{:.0}", (y_bounds[0] + y_bounds[1]) / 2.0),
                format!("{:.0}", y_bounds[1]),
            ],
            points,
            x_bounds,
            y_bounds,
        })
    }
}

fn axis_time(epoch: f64) -> String {
    match Local.timestamp_opt(epoch as i64, 0).single() {
        Some(t) => t.format("%d %b %H:%M").to_string(),
        None => String::new(),
    }
}

/// Inline error text for a failed fetch.
pub fn error_text(err: &WxError) -> String {
    match err {
        WxError::Status { status, .. } => format!("HTTP {status}"),
        other => other.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct HistoryView {
    state: HistoryState,
    chart: Option<TemperatureChart>,
}

impl HistoryView {
    pub fn state(&self) -> &HistoryState {
        &self.state
    }

    pub fn chart(&self) -> Option<&TemperatureChart> {
        self.chart.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.state == HistoryState::Loading
    }

    /// Mark a fetch as started. Refused while one is already in flight.
    pub fn begin(&mut self) -> bool {
        if self.is_loading() {
            return false;
        }
        self.state = HistoryState::Loading;
        true
    }

    /// Install a fetch result. The previous chart is always dropped first.
    pub fn finish(&mut self, result: Result<Vec<Conditions>>, units: Units) {
        self.chart = None;
        self.state = match result {
            Ok(history) => {
                self.chart = TemperatureChart::from_history(&history, units);
                HistoryState::Loaded(history)
            }
            Err(err) => {
                tracing::warn!("historical fetch failed: {}", err);
                HistoryState::Error(error_text(&err))
            }
        };
    }

    /// Fetch the trailing 24 hours for `key`, never from cache.
    pub fn load(&mut self, provider: &dyn WeatherProvider, key: &str, units: Units) {
        self.begin();
        self.finish(provider.historical(key), units);
    }

    pub fn reset(&mut self) {
        self.state = HistoryState::Idle;
        self.chart = None;
    }
}
