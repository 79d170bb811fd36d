//! Raw upstream JSON -> typed records.
//!
//! Converts one upstream payload into [`CurrencyDescriptor`] and
//! [`NetworkStatusSample`] sequences.
//!
//! Numeric coercion is null-preserving: a field that is JSON `null`, absent,
//! or an empty string becomes `None`. It never becomes zero. A coin that
//! reported `0` and one that reported nothing stay distinguishable all the way
//! into storage.
//!
//! It does **not**:
//! - fetch data (see `coinchoose.rs`)
//! - write to the database
//! - deduplicate or reconcile (that is `ccs-reconcile`)

use std::fmt;
use std::str::FromStr;

use ccs_schemas::{CurrencyDescriptor, NetworkMetrics, NetworkStatusSample};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced while normalizing an upstream payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Body is not valid JSON, or an element has the wrong shape.
    Malformed(String),
    /// Top-level JSON value is not an array.
    NotAnArray,
    /// A required field is absent or null.
    MissingField { index: usize, field: &'static str },
    /// A numeric field is present but cannot be coerced.
    InvalidNumber {
        symbol: String,
        field: &'static str,
        raw: String,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Malformed(msg) => write!(f, "malformed upstream payload: {msg}"),
            ParseError::NotAnArray => write!(f, "malformed upstream payload: expected a JSON array"),
            ParseError::MissingField { index, field } => {
                write!(f, "record {index} is missing required field '{field}'")
            }
            ParseError::InvalidNumber { symbol, field, raw } => {
                write!(f, "{symbol}: field '{field}' is not a valid number: '{raw}'")
            }
        }
    }
}

impl std::error::Error for ParseError {}

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

/// One element of the upstream array. Every field is optional on the wire;
/// requiredness is enforced after decode so errors can name the field.
#[derive(Debug, Clone, Deserialize)]
struct RawCoin {
    symbol: Option<String>,
    name: Option<String>,
    algo: Option<String>,
    #[serde(rename = "currentBlocks")]
    current_blocks: Option<Value>,
    difficulty: Option<Value>,
    reward: Option<Value>,
    networkhashrate: Option<Value>,
    #[serde(rename = "avgHash")]
    avg_hash: Option<Value>,
}

fn parse_payload(raw_json: &str) -> Result<Vec<RawCoin>, ParseError> {
    let top: Value =
        serde_json::from_str(raw_json).map_err(|e| ParseError::Malformed(e.to_string()))?;
    let items = match top {
        Value::Array(items) => items,
        _ => return Err(ParseError::NotAnArray),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<RawCoin>(item)
                .map_err(|e| ParseError::Malformed(format!("record {index}: {e}")))
        })
        .collect()
}

fn required(value: Option<String>, index: usize, field: &'static str) -> Result<String, ParseError> {
    value.ok_or(ParseError::MissingField { index, field })
}

// ---------------------------------------------------------------------------
// Null-preserving numeric coercion
// ---------------------------------------------------------------------------

/// Text form of a numeric wire value, or `None` for null / absent / blank.
fn numeric_text(value: Option<&Value>) -> Result<Option<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let t = s.trim();
            if t.is_empty() {
                Ok(None)
            } else {
                Ok(Some(t.to_string()))
            }
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(other.to_string()),
    }
}

fn parse_decimal_text(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn coerce_decimal(
    symbol: &str,
    field: &'static str,
    value: Option<&Value>,
) -> Result<Option<Decimal>, ParseError> {
    let invalid = |raw: String| ParseError::InvalidNumber {
        symbol: symbol.to_string(),
        field,
        raw,
    };
    match numeric_text(value).map_err(invalid)? {
        None => Ok(None),
        Some(text) => parse_decimal_text(&text)
            .map(Some)
            .ok_or_else(|| invalid(text)),
    }
}

/// Integer fields accept integral decimals (`"655258.0"`) and reject fractions.
fn coerce_integer(
    symbol: &str,
    field: &'static str,
    value: Option<&Value>,
) -> Result<Option<i64>, ParseError> {
    let invalid = |raw: String| ParseError::InvalidNumber {
        symbol: symbol.to_string(),
        field,
        raw,
    };
    let text = match numeric_text(value).map_err(invalid)? {
        None => return Ok(None),
        Some(t) => t,
    };
    if let Ok(v) = text.parse::<i64>() {
        return Ok(Some(v));
    }
    match parse_decimal_text(&text) {
        Some(d) if d.fract().is_zero() => d.to_i64().map(Some).ok_or_else(|| invalid(text)),
        _ => Err(invalid(text)),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse the currency list from one upstream payload.
pub fn normalize_currencies(raw_json: &str) -> Result<Vec<CurrencyDescriptor>, ParseError> {
    parse_payload(raw_json)?
        .into_iter()
        .enumerate()
        .map(|(index, coin)| {
            Ok(CurrencyDescriptor {
                symbol: required(coin.symbol, index, "symbol")?,
                name: required(coin.name, index, "name")?,
                algo: required(coin.algo, index, "algo")?,
            })
        })
        .collect()
}

/// Parse per-symbol network status from one upstream payload.
///
/// Every sample is stamped with `scrape_time`.
pub fn normalize_network_status(
    raw_json: &str,
    scrape_time: DateTime<Utc>,
) -> Result<Vec<NetworkStatusSample>, ParseError> {
    parse_payload(raw_json)?
        .into_iter()
        .enumerate()
        .map(|(index, coin)| {
            let symbol = required(coin.symbol, index, "symbol")?;
            let metrics = NetworkMetrics {
                current_blocks: coerce_integer(
                    &symbol,
                    "currentBlocks",
                    coin.current_blocks.as_ref(),
                )?,
                difficulty: coerce_decimal(&symbol, "difficulty", coin.difficulty.as_ref())?,
                reward: coerce_decimal(&symbol, "reward", coin.reward.as_ref())?,
                hash_rate: coerce_integer(
                    &symbol,
                    "networkhashrate",
                    coin.networkhashrate.as_ref(),
                )?,
                avg_hash_rate: coerce_decimal(&symbol, "avgHash", coin.avg_hash.as_ref())?,
            };
            Ok(NetworkStatusSample {
                symbol,
                scrape_time,
                metrics,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 1, 12, 8, 0, 0).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn string_numbers_parse_exactly() {
        let raw = r#"[{"symbol":"ALF","name":"Alphacoin","algo":"scrypt",
            "currentBlocks":"655258","difficulty":"1.52109832","reward":"50",
            "networkhashrate":"10308452","avgHash":"10308452.0000"}]"#;
        let out = normalize_network_status(raw, ts()).unwrap();
        assert_eq!(out.len(), 1);
        let m = &out[0].metrics;
        assert_eq!(m.current_blocks, Some(655_258));
        assert_eq!(m.difficulty, Some(dec("1.52109832")));
        assert_eq!(m.reward, Some(dec("50")));
        assert_eq!(m.hash_rate, Some(10_308_452));
        assert_eq!(m.avg_hash_rate, Some(dec("10308452")));
        assert_eq!(out[0].scrape_time, ts());
    }

    #[test]
    fn json_numbers_are_accepted() {
        let raw = r#"[{"symbol":"GLC","currentBlocks":300011,"difficulty":0.768,
            "reward":100,"networkhashrate":0,"avgHash":0}]"#;
        let out = normalize_network_status(raw, ts()).unwrap();
        let m = &out[0].metrics;
        assert_eq!(m.current_blocks, Some(300_011));
        assert_eq!(m.difficulty, Some(dec("0.768")));
        assert_eq!(m.hash_rate, Some(0));
        assert_eq!(m.avg_hash_rate, Some(Decimal::ZERO));
    }

    #[test]
    fn null_absent_and_blank_become_none_not_zero() {
        let raw = r#"[{"symbol":"NUL","currentBlocks":null,"difficulty":"  ",
            "reward":null}]"#;
        let out = normalize_network_status(raw, ts()).unwrap();
        assert_eq!(out[0].metrics, NetworkMetrics::default());
    }

    #[test]
    fn integral_decimal_is_accepted_for_integer_field() {
        let raw = r#"[{"symbol":"INT","currentBlocks":"655258.0"}]"#;
        let out = normalize_network_status(raw, ts()).unwrap();
        assert_eq!(out[0].metrics.current_blocks, Some(655_258));
    }

    #[test]
    fn fractional_value_for_integer_field_is_rejected() {
        let raw = r#"[{"symbol":"FRC","networkhashrate":"12.5"}]"#;
        let err = normalize_network_status(raw, ts()).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidNumber {
                symbol: "FRC".to_string(),
                field: "networkhashrate",
                raw: "12.5".to_string(),
            }
        );
    }

    #[test]
    fn garbage_number_is_rejected() {
        let raw = r#"[{"symbol":"BAD","difficulty":"n/a"}]"#;
        let err = normalize_network_status(raw, ts()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { field: "difficulty", .. }));
    }

    #[test]
    fn missing_symbol_is_a_parse_error() {
        let raw = r#"[{"symbol":"OK","name":"Ok","algo":"x"},{"name":"NoSym","algo":"x"}]"#;
        assert_eq!(
            normalize_currencies(raw).unwrap_err(),
            ParseError::MissingField {
                index: 1,
                field: "symbol"
            }
        );
        assert_eq!(
            normalize_network_status(raw, ts()).unwrap_err(),
            ParseError::MissingField {
                index: 1,
                field: "symbol"
            }
        );
    }

    #[test]
    fn currency_requires_name_and_algo() {
        let raw = r#"[{"symbol":"ALF","name":"Alphacoin"}]"#;
        assert_eq!(
            normalize_currencies(raw).unwrap_err(),
            ParseError::MissingField {
                index: 0,
                field: "algo"
            }
        );
    }

    #[test]
    fn malformed_json_and_non_array() {
        assert!(matches!(
            normalize_currencies("[{").unwrap_err(),
            ParseError::Malformed(_)
        ));
        assert_eq!(
            normalize_currencies(r#"{"symbol":"ALF"}"#).unwrap_err(),
            ParseError::NotAnArray
        );
    }

    #[test]
    fn order_follows_upstream_array() {
        let raw = r#"[{"symbol":"B","name":"b","algo":"x"},{"symbol":"A","name":"a","algo":"y"}]"#;
        let out = normalize_currencies(raw).unwrap();
        let symbols: Vec<&str> = out.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["B", "A"]);
    }
}
