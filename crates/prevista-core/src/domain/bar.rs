use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Ticker, ValidationError};

/// One stored daily bar for a ticker, as persisted in `historico_acoes`.
///
/// Prices and volume are nullable: the provider occasionally omits a field
/// for a trading day and the row is kept rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBar {
    pub date: Date,
    pub ticker: Ticker,
    pub open: Option<f64>,
    pub close: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub volume: Option<f64>,
}

impl HistoricalBar {
    pub fn from_provider(ticker: Ticker, bar: &ProviderBar) -> Self {
        Self {
            date: bar.date,
            ticker,
            open: bar.open,
            close: bar.close,
            high: bar.high,
            low: bar.low,
            volume: bar.volume,
        }
    }
}

/// One normalized row returned by a market-data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderBar {
    pub date: Date,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl ProviderBar {
    /// Build a bar, coercing non-finite numbers to missing values.
    pub fn new(
        date: Date,
        open: Option<f64>,
        high: Option<f64>,
        low: Option<f64>,
        close: Option<f64>,
        volume: Option<f64>,
    ) -> Self {
        Self {
            date,
            open: finite_or_none(open),
            high: finite_or_none(high),
            low: finite_or_none(low),
            close: finite_or_none(close),
            volume: finite_or_none(volume),
        }
    }

    /// Strict variant used where a missing value is acceptable but NaN/inf is a bug.
    pub fn validated(self) -> Result<Self, ValidationError> {
        validate_optional_finite("open", self.open)?;
        validate_optional_finite("high", self.high)?;
        validate_optional_finite("low", self.low)?;
        validate_optional_finite("close", self.close)?;
        validate_optional_finite("volume", self.volume)?;
        Ok(self)
    }
}

fn finite_or_none(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn validate_optional_finite(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn non_finite_provider_values_become_missing() {
        let bar = ProviderBar::new(
            date!(2024 - 03 - 01),
            Some(f64::NAN),
            Some(10.0),
            Some(9.0),
            Some(f64::INFINITY),
            None,
        );
        assert_eq!(bar.open, None);
        assert_eq!(bar.high, Some(10.0));
        assert_eq!(bar.close, None);
        assert!(bar.validated().is_ok());
    }

    #[test]
    fn validated_rejects_nan_built_directly() {
        let bar = ProviderBar {
            date: date!(2024 - 03 - 01),
            open: Some(f64::NAN),
            high: None,
            low: None,
            close: None,
            volume: None,
        };
        let err = bar.validated().expect_err("must fail");
        assert!(matches!(err, ValidationError::NonFiniteValue { field: "open" }));
    }
}
