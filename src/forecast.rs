//! Forecasting strategies over growth-rate series
//!
//! All strategies consume a chronological rate series and produce one point
//! forecast for a horizon expressed in hours. They are interchangeable
//! behind [`ForecastStrategy`]; the runtime picks one by name from
//! configuration.

/// A point forecast over a rate series
pub trait ForecastStrategy: Send + Sync {
    /// Name used in logs and configuration
    fn name(&self) -> &'static str;

    /// Forecast the rate `horizon_hours` ahead.
    ///
    /// Returns `None` for an empty series; there is nothing to project.
    fn forecast(&self, rates: &[f64], horizon_hours: f64) -> Option<f64>;
}

/// Second-order (Holt) exponential smoothing
///
/// Level and trend recurrences:
/// - `level[i] = alpha * r[i] + (1 - alpha) * (level[i-1] + trend[i-1])`
/// - `trend[i] = beta * (level[i] - level[i-1]) + (1 - beta) * trend[i-1]`
///
/// seeded with `level[0] = r[0]` and `trend[0] = r[1] - r[0]`. A
/// single-element series has level `r[0]` and zero trend, so the forecast
/// is flat. The forecast is `level[last] + trend[last] * horizon`.
pub struct DoubleExponentialSmoothing {
    pub alpha: f64,
    pub beta: f64,
}

impl ForecastStrategy for DoubleExponentialSmoothing {
    fn name(&self) -> &'static str {
        "double_exponential"
    }

    fn forecast(&self, rates: &[f64], horizon_hours: f64) -> Option<f64> {
        if rates.is_empty() {
            return None;
        }
        if rates.len() == 1 {
            return Some(rates[0]);
        }

        let mut level = rates[0];
        let mut trend = rates[1] - rates[0];

        for &rate in &rates[1..] {
            let prev_level = level;
            level = self.alpha * rate + (1.0 - self.alpha) * (level + trend);
            trend = self.beta * (level - prev_level) + (1.0 - self.beta) * trend;
        }

        Some(level + trend * horizon_hours)
    }
}

/// Single exponential smoothing
///
/// No trend term, so the forecast is the last smoothed value regardless
/// of horizon.
pub struct SingleExponentialSmoothing {
    pub alpha: f64,
}

impl ForecastStrategy for SingleExponentialSmoothing {
    fn name(&self) -> &'static str {
        "single_exponential"
    }

    fn forecast(&self, rates: &[f64], _horizon_hours: f64) -> Option<f64> {
        let mut iter = rates.iter();
        let mut smoothed = *iter.next()?;
        for &rate in iter {
            smoothed = self.alpha * rate + (1.0 - self.alpha) * smoothed;
        }
        Some(smoothed)
    }
}

/// Trailing rolling average
///
/// Mean of the last `window` rates, or of the whole series when it is
/// shorter than the window. Horizon-independent like the single smoother.
pub struct RollingAverage {
    pub window: usize,
}

impl ForecastStrategy for RollingAverage {
    fn name(&self) -> &'static str {
        "rolling_average"
    }

    fn forecast(&self, rates: &[f64], _horizon_hours: f64) -> Option<f64> {
        if rates.is_empty() || self.window == 0 {
            return None;
        }
        let start = rates.len().saturating_sub(self.window);
        let tail = &rates[start..];
        Some(tail.iter().sum::<f64>() / tail.len() as f64)
    }
}

/// Build the strategy named in configuration.
///
/// Unknown names fall back to double exponential smoothing, the variant
/// the pipeline has always run with.
pub fn select_strategy(
    name: &str,
    alpha: f64,
    beta: f64,
    window: usize,
) -> Box<dyn ForecastStrategy> {
    match name {
        "double" => Box::new(DoubleExponentialSmoothing { alpha, beta }),
        "single" => Box::new(SingleExponentialSmoothing { alpha }),
        "rolling" => Box::new(RollingAverage { window }),
        other => {
            log::warn!(
                "⚠️  Unknown forecast strategy '{}', falling back to double exponential",
                other
            );
            Box::new(DoubleExponentialSmoothing { alpha, beta })
        }
    }
}
