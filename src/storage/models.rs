use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::renewal::stage::RenewalStage;

/// Submission state of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DocStatus {
    #[default]
    Draft,
    Submitted,
    Cancelled,
}

impl DocStatus {
    pub fn code(&self) -> i64 {
        match self {
            DocStatus::Draft => 0,
            DocStatus::Submitted => 1,
            DocStatus::Cancelled => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(DocStatus::Draft),
            1 => Some(DocStatus::Submitted),
            2 => Some(DocStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for DocStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocStatus::Draft => write!(f, "Draft"),
            DocStatus::Submitted => write!(f, "Submitted"),
            DocStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewalRecord {
    pub name: String,
    pub company: String,
    pub currency: String,
    pub exchange_rate: Option<Decimal>,
    pub license_start: Option<NaiveDate>,
    pub license_end: Option<NaiveDate>,
    pub renewal_stage: Option<RenewalStage>,
    pub days_remaining: Option<i64>,
    pub items: Vec<LineItem>,
    pub net_total: Decimal,
    pub net_total_base: Decimal,
    pub docstatus: DocStatus,
    pub modified: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    pub item_code: String,
    pub item_name: String,
    pub description: String,
    pub brand: String,
    pub item_group: String,
    pub uom: String,
    #[serde(deserialize_with = "lenient_decimal")]
    pub qty: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub rate: Decimal,
    pub amount: Decimal,
    pub base_rate: Decimal,
    pub base_amount: Decimal,
}

impl LineItem {
    pub fn new(item_code: &str, qty: Decimal, rate: Decimal) -> Self {
        Self {
            item_code: item_code.to_string(),
            item_name: item_code.to_string(),
            qty,
            rate,
            ..Default::default()
        }
    }
}

/// Row shape for record listings
#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub name: String,
    pub company: String,
    pub currency: String,
    pub license_start: Option<NaiveDate>,
    pub license_end: Option<NaiveDate>,
    pub renewal_stage: Option<RenewalStage>,
    pub days_remaining: Option<i64>,
    pub net_total_base: Decimal,
    pub docstatus: DocStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageCount {
    pub stage: Option<RenewalStage>,
    pub count: usize,
}

/// Accepts a JSON number or numeric string; anything else, or a negative
/// value, becomes zero.
fn lenient_decimal<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(coerce_decimal).unwrap_or_default())
}

pub fn coerce_decimal(value: &Value) -> Decimal {
    let parsed = match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(&s.trim().replace(',', "")),
        _ => None,
    };
    parsed.unwrap_or_default().max(Decimal::ZERO)
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    s.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_coerce_decimal() {
        assert_eq!(coerce_decimal(&json!(3)), dec!(3));
        assert_eq!(coerce_decimal(&json!(2.5)), dec!(2.5));
        assert_eq!(coerce_decimal(&json!("1,250.75")), dec!(1250.75));
        assert_eq!(coerce_decimal(&json!("abc")), Decimal::ZERO);
        assert_eq!(coerce_decimal(&json!(null)), Decimal::ZERO);
        assert_eq!(coerce_decimal(&json!(-4)), Decimal::ZERO);
    }

    #[test]
    fn test_record_from_partial_json() {
        let record: RenewalRecord = serde_json::from_value(json!({
            "company": "Ostec Ltd",
            "currency": "USD",
            "license_start": "2025-01-01",
            "license_end": "2025-12-31",
            "items": [
                { "item_code": "FW-100", "qty": "2", "rate": 150 },
                { "item_code": "AV-20", "qty": "n/a" }
            ]
        }))
        .unwrap();

        assert_eq!(record.docstatus, DocStatus::Draft);
        assert_eq!(record.exchange_rate, None);
        assert_eq!(record.items.len(), 2);
        assert_eq!(record.items[0].qty, dec!(2));
        assert_eq!(record.items[0].rate, dec!(150));
        assert_eq!(record.items[1].qty, Decimal::ZERO);
        assert_eq!(record.items[1].rate, Decimal::ZERO);
    }

    #[test]
    fn test_docstatus_codes() {
        for status in [DocStatus::Draft, DocStatus::Submitted, DocStatus::Cancelled] {
            assert_eq!(DocStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(DocStatus::from_code(7), None);
    }
}
