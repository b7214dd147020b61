use crate::error::{Result, WardrobeError};
use crate::store::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of a conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// Both rates were known
    Exact(f64),
    /// At least one code was unknown and assumed to be at par with the base
    DefaultRate(f64),
}

impl Conversion {
    pub fn value(&self) -> f64 {
        match self {
            Conversion::Exact(v) | Conversion::DefaultRate(v) => *v,
        }
    }

    pub fn is_approximate(&self) -> bool {
        matches!(self, Conversion::DefaultRate(_))
    }
}

/// Supplies a rate table relative to a base currency
pub trait RateSource {
    /// `None` on any failure; callers keep what they have
    fn fetch(&self, base: &str) -> Option<BTreeMap<String, f64>>;
}

/// Rates where "1 unit of base = rate units of the currency"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyConverter {
    base: String,
    rates: BTreeMap<String, f64>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

impl CurrencyConverter {
    /// Built-in table for the TWD base
    pub fn with_defaults() -> Self {
        let rates = [
            ("TWD", 1.0),
            ("USD", 1.0 / 32.5),
            ("CNY", 1.0 / 4.5),
            ("EUR", 1.0 / 35.0),
            ("JPY", 1.0 / 0.22),
            ("KRW", 1.0 / 0.024),
        ]
        .into_iter()
        .map(|(code, rate)| (code.to_string(), rate))
        .collect();

        Self::new("TWD", rates)
    }

    pub fn new(base: impl Into<String>, rates: BTreeMap<String, f64>) -> Self {
        Self {
            base: base.into(),
            rates,
            last_updated: None,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn rates(&self) -> &BTreeMap<String, f64> {
        &self.rates
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn rate(&self, code: &str) -> Option<f64> {
        self.rates
            .get(code)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
    }

    /// Convert `amount` from one currency to another through the base
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Conversion {
        if from == to {
            return Conversion::Exact(amount);
        }

        let rate_from = self.rate(from);
        let rate_to = self.rate(to);
        let value = amount / rate_from.unwrap_or(1.0) * rate_to.unwrap_or(1.0);

        if rate_from.is_some() && rate_to.is_some() {
            Conversion::Exact(value)
        } else {
            Conversion::DefaultRate(value)
        }
    }

    /// Replace the table from `source`; on failure the current table stays
    pub fn refresh(&mut self, source: &dyn RateSource) -> bool {
        match source.fetch(&self.base) {
            Some(rates) if !rates.is_empty() => {
                info!("Currency rates updated: {} codes", rates.len());
                self.rates = rates;
                self.last_updated = Some(Utc::now());
                true
            }
            _ => {
                warn!("Currency rate refresh failed, keeping previous rates");
                false
            }
        }
    }

    /// Load a cached table, falling back to the defaults
    pub fn load_cached(path: &Path) -> Self {
        if !path.exists() {
            return Self::with_defaults();
        }
        match fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str::<Self>(&content).ok())
        {
            Some(cached) => cached,
            None => {
                warn!("Ignoring unreadable rate cache {}", path.display());
                Self::with_defaults()
            }
        }
    }

    /// Write the table to the cache file
    pub fn save_cache(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes())
    }
}

// =============================================================================
// JSON file source
// =============================================================================

#[derive(Deserialize)]
struct RateDocument {
    #[serde(default)]
    base_code: Option<String>,
    rates: BTreeMap<String, f64>,
}

/// Reads a `{"base_code": "...", "rates": {...}}` document from disk
pub struct JsonFileRateSource {
    path: PathBuf,
}

impl JsonFileRateSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<RateDocument> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| WardrobeError::persistence(&self.path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl RateSource for JsonFileRateSource {
    fn fetch(&self, base: &str) -> Option<BTreeMap<String, f64>> {
        let doc = match self.read() {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Failed to read rates from {}: {}", self.path.display(), e);
                return None;
            }
        };

        if let Some(code) = doc.base_code.as_deref() {
            if code != base {
                warn!("Rate file is based on {}, expected {}", code, base);
                return None;
            }
        }
        Some(doc.rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Failing;

    impl RateSource for Failing {
        fn fetch(&self, _base: &str) -> Option<BTreeMap<String, f64>> {
            None
        }
    }

    #[test]
    fn test_identity_is_exact() {
        let converter = CurrencyConverter::with_defaults();
        assert_eq!(converter.convert(100.0, "USD", "USD"), Conversion::Exact(100.0));
        assert_eq!(converter.convert(0.1, "XYZ", "XYZ"), Conversion::Exact(0.1));
    }

    #[test]
    fn test_convert_through_base() {
        let rates = [("TWD".to_string(), 1.0), ("USD".to_string(), 0.03125)]
            .into_iter()
            .collect();
        let converter = CurrencyConverter::new("TWD", rates);
        assert_eq!(converter.convert(100.0, "USD", "TWD"), Conversion::Exact(3200.0));
        assert_eq!(converter.convert(3200.0, "TWD", "USD"), Conversion::Exact(100.0));
    }

    #[test]
    fn test_unknown_code_uses_default_rate() {
        let converter = CurrencyConverter::with_defaults();
        let result = converter.convert(50.0, "XYZ", "TWD");
        assert!(result.is_approximate());
        assert_eq!(result.value(), 50.0);
    }

    #[test]
    fn test_zero_rate_is_treated_as_unknown() {
        let rates = [("TWD".to_string(), 1.0), ("BAD".to_string(), 0.0)]
            .into_iter()
            .collect();
        let converter = CurrencyConverter::new("TWD", rates);
        let result = converter.convert(10.0, "BAD", "TWD");
        assert_eq!(result, Conversion::DefaultRate(10.0));
    }

    #[test]
    fn test_failed_refresh_keeps_rates() {
        let mut converter = CurrencyConverter::with_defaults();
        let before = converter.clone();
        assert!(!converter.refresh(&Failing));
        assert_eq!(converter, before);
    }

    #[test]
    fn test_refresh_from_file_and_cache() {
        let dir = TempDir::new().unwrap();
        let source_path = dir.path().join("latest.json");
        fs::write(
            &source_path,
            r#"{"result": "success", "base_code": "TWD", "rates": {"TWD": 1, "USD": 0.031}}"#,
        )
        .unwrap();

        let mut converter = CurrencyConverter::with_defaults();
        assert!(converter.refresh(&JsonFileRateSource::new(&source_path)));
        assert_eq!(converter.rates().get("USD"), Some(&0.031));
        assert!(converter.last_updated().is_some());

        let cache = dir.path().join("rates.json");
        converter.save_cache(&cache).unwrap();
        assert_eq!(CurrencyConverter::load_cached(&cache), converter);
    }

    #[test]
    fn test_file_with_other_base_is_rejected() {
        let dir = TempDir::new().unwrap();
        let source_path = dir.path().join("latest.json");
        fs::write(&source_path, r#"{"base_code": "USD", "rates": {"TWD": 32.0}}"#).unwrap();

        let mut converter = CurrencyConverter::with_defaults();
        assert!(!converter.refresh(&JsonFileRateSource::new(&source_path)));
        assert_eq!(converter.rates().get("TWD"), Some(&1.0));
    }

    #[test]
    fn test_missing_cache_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let converter = CurrencyConverter::load_cached(&dir.path().join("none.json"));
        assert_eq!(converter.base(), "TWD");
    }
}
