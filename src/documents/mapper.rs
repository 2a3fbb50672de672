use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    config::DocumentConfig,
    storage::models::{LineItem, RenewalRecord},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestForQuotation {
    pub renewal_tracking: String,
    pub company: String,
    pub transaction_date: NaiveDate,
    pub status: String,
    pub items: Vec<RfqItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfqItem {
    pub item_code: String,
    pub item_name: String,
    pub description: String,
    pub qty: Decimal,
    pub uom: String,
    pub brand: String,
    pub schedule_date: NaiveDate,
}

/// Shared shape of supplier and customer quotations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quotation {
    pub renewal_tracking: String,
    pub company: String,
    pub currency: String,
    pub conversion_rate: Option<Decimal>,
    pub transaction_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_till: Option<NaiveDate>,
    pub items: Vec<QuotationItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotationItem {
    pub item_code: String,
    pub item_name: String,
    pub description: String,
    pub qty: Decimal,
    pub uom: String,
    pub rate: Decimal,
    pub amount: Decimal,
    pub brand: String,
}

impl From<&LineItem> for QuotationItem {
    fn from(item: &LineItem) -> Self {
        Self {
            item_code: item.item_code.clone(),
            item_name: item.item_name.clone(),
            description: item.description.clone(),
            qty: item.qty,
            uom: item.uom.clone(),
            rate: item.rate,
            amount: item.amount,
            brand: item.brand.clone(),
        }
    }
}

/// Builds downstream commercial documents from a renewal record
pub struct DocumentMapper {
    config: DocumentConfig,
}

impl DocumentMapper {
    pub fn new(config: DocumentConfig) -> Self {
        Self { config }
    }

    pub fn request_for_quotation(&self, source: &RenewalRecord, today: NaiveDate) -> RequestForQuotation {
        let schedule_date = today + Duration::days(self.config.rfq_schedule_days);

        RequestForQuotation {
            renewal_tracking: source.name.clone(),
            company: source.company.clone(),
            transaction_date: today,
            status: "Draft".to_string(),
            items: source
                .items
                .iter()
                .map(|item| RfqItem {
                    item_code: item.item_code.clone(),
                    item_name: item.item_name.clone(),
                    description: item.description.clone(),
                    qty: item.qty,
                    uom: item.uom.clone(),
                    brand: item.brand.clone(),
                    schedule_date,
                })
                .collect(),
        }
    }

    pub fn supplier_quotation(&self, source: &RenewalRecord, today: NaiveDate) -> Quotation {
        Self::quotation(source, today, None)
    }

    /// Customer quotation, valid for the configured number of days
    pub fn customer_quotation(&self, source: &RenewalRecord, today: NaiveDate) -> Quotation {
        let valid_till = today + Duration::days(self.config.quotation_validity_days);
        Self::quotation(source, today, Some(valid_till))
    }

    fn quotation(source: &RenewalRecord, today: NaiveDate, valid_till: Option<NaiveDate>) -> Quotation {
        Quotation {
            renewal_tracking: source.name.clone(),
            company: source.company.clone(),
            currency: source.currency.clone(),
            conversion_rate: source.exchange_rate,
            transaction_date: today,
            valid_till,
            items: source.items.iter().map(QuotationItem::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn source() -> RenewalRecord {
        let mut item = LineItem::new("FW-100", dec!(2), dec!(150));
        item.item_name = "Firewall licence".to_string();
        item.uom = "Nos".to_string();
        item.brand = "Fortinet".to_string();
        item.amount = dec!(300);

        RenewalRecord {
            name: "RT-2025-00007".to_string(),
            company: "Ostec Ltd".to_string(),
            currency: "USD".to_string(),
            exchange_rate: Some(dec!(15.5)),
            items: vec![item],
            ..Default::default()
        }
    }

    #[test]
    fn test_request_for_quotation_mapping() {
        let mapper = DocumentMapper::new(DocumentConfig::default());
        let rfq = mapper.request_for_quotation(&source(), date("2025-10-15"));

        assert_eq!(rfq.renewal_tracking, "RT-2025-00007");
        assert_eq!(rfq.company, "Ostec Ltd");
        assert_eq!(rfq.status, "Draft");
        assert_eq!(rfq.transaction_date, date("2025-10-15"));
        assert_eq!(rfq.items[0].uom, "Nos");
        assert_eq!(rfq.items[0].schedule_date, date("2025-10-22"));
    }

    #[test]
    fn test_supplier_quotation_carries_rates() {
        let mapper = DocumentMapper::new(DocumentConfig::default());
        let quotation = mapper.supplier_quotation(&source(), date("2025-10-15"));

        assert_eq!(quotation.currency, "USD");
        assert_eq!(quotation.conversion_rate, Some(dec!(15.5)));
        assert_eq!(quotation.valid_till, None);
        assert_eq!(quotation.items[0].rate, dec!(150));
        assert_eq!(quotation.items[0].amount, dec!(300));
        assert_eq!(quotation.items[0].brand, "Fortinet");

        let json = serde_json::to_value(&quotation).unwrap();
        assert!(json.get("valid_till").is_none());
    }

    #[test]
    fn test_customer_quotation_validity_window() {
        let mapper = DocumentMapper::new(DocumentConfig {
            rfq_schedule_days: 7,
            quotation_validity_days: 14,
        });
        let quotation = mapper.customer_quotation(&source(), date("2025-12-25"));

        assert_eq!(quotation.transaction_date, date("2025-12-25"));
        assert_eq!(quotation.valid_till, Some(date("2026-01-08")));
    }
}
