use chrono::{Local, NaiveDate};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Params, Row};
use rust_decimal::Decimal;
use tracing::debug;

use crate::{
    error::{Result, TrackerError},
    renewal::{exchange::RateSource, stage::RenewalStage, sweep::RecordStore},
    storage::models::{DocStatus, LineItem, RecordSummary, RenewalRecord, StageCount},
};

const NAME_PREFIX: &str = "RT";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS company (
                name TEXT PRIMARY KEY,
                default_currency TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS currency_exchange (
                from_currency TEXT NOT NULL,
                to_currency TEXT NOT NULL,
                exchange_rate TEXT NOT NULL,
                PRIMARY KEY (from_currency, to_currency)
            );

            CREATE TABLE IF NOT EXISTS renewal_tracking (
                name TEXT PRIMARY KEY,
                company TEXT NOT NULL,
                currency TEXT NOT NULL,
                exchange_rate TEXT,
                license_start TEXT,
                license_end TEXT,
                renewal_stage TEXT,
                days_remaining INTEGER,
                net_total TEXT NOT NULL,
                net_total_base TEXT NOT NULL,
                docstatus INTEGER NOT NULL DEFAULT 0,
                modified TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS renewal_tracking_item (
                parent TEXT NOT NULL,
                idx INTEGER NOT NULL,
                item_code TEXT NOT NULL,
                item_name TEXT NOT NULL,
                description TEXT NOT NULL,
                brand TEXT NOT NULL,
                item_group TEXT NOT NULL,
                uom TEXT NOT NULL,
                qty TEXT NOT NULL,
                rate TEXT NOT NULL,
                amount TEXT NOT NULL,
                base_rate TEXT NOT NULL,
                base_amount TEXT NOT NULL,
                PRIMARY KEY (parent, idx)
            );

            CREATE INDEX IF NOT EXISTS idx_renewal_docstatus ON renewal_tracking(docstatus);
            CREATE INDEX IF NOT EXISTS idx_renewal_stage ON renewal_tracking(renewal_stage);",
        )?;

        Ok(())
    }

    pub fn upsert_company(&self, name: &str, default_currency: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO company (name, default_currency) VALUES (?1, ?2)",
            params![name, default_currency],
        )?;
        Ok(())
    }

    pub fn upsert_exchange_rate(&self, from: &str, to: &str, rate: Decimal) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO currency_exchange (from_currency, to_currency, exchange_rate)
             VALUES (?1, ?2, ?3)",
            params![from, to, rate.to_string()],
        )?;
        Ok(())
    }

    /// Next free name of the form `RT-<year>-00001`
    pub fn next_name(&self, year: i32) -> Result<String> {
        let prefix = format!("{}-{}-", NAME_PREFIX, year);
        let last: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM renewal_tracking WHERE name LIKE ?1 ORDER BY name DESC LIMIT 1",
                [format!("{}%", prefix)],
                |row| row.get(0),
            )
            .optional()?;

        let next = last
            .and_then(|name| name.strip_prefix(&prefix).and_then(|n| n.parse::<u32>().ok()))
            .unwrap_or(0)
            + 1;

        Ok(format!("{}{:05}", prefix, next))
    }

    /// Persist header and items, replacing any existing lines, and stamp `modified`
    pub fn save_record(&self, record: &mut RenewalRecord) -> Result<()> {
        let modified = Local::now().naive_local();
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT OR REPLACE INTO renewal_tracking
             (name, company, currency, exchange_rate, license_start, license_end,
              renewal_stage, days_remaining, net_total, net_total_base, docstatus, modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.name,
                record.company,
                record.currency,
                record.exchange_rate.map(|r| r.to_string()),
                record.license_start,
                record.license_end,
                record.renewal_stage,
                record.days_remaining,
                record.net_total.to_string(),
                record.net_total_base.to_string(),
                record.docstatus,
                modified,
            ],
        )?;

        tx.execute("DELETE FROM renewal_tracking_item WHERE parent = ?1", [&record.name])?;

        for (idx, item) in record.items.iter().enumerate() {
            tx.execute(
                "INSERT INTO renewal_tracking_item
                 (parent, idx, item_code, item_name, description, brand, item_group, uom,
                  qty, rate, amount, base_rate, base_amount)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    record.name,
                    idx as i64 + 1,
                    item.item_code,
                    item.item_name,
                    item.description,
                    item.brand,
                    item.item_group,
                    item.uom,
                    item.qty.to_string(),
                    item.rate.to_string(),
                    item.amount.to_string(),
                    item.base_rate.to_string(),
                    item.base_amount.to_string(),
                ],
            )?;
        }

        tx.commit()?;
        record.modified = Some(modified);
        debug!("Saved {} with {} items", record.name, record.items.len());
        Ok(())
    }

    pub fn get_record(&self, name: &str) -> Result<RenewalRecord> {
        let record = self
            .conn
            .query_row(
                "SELECT name, company, currency, exchange_rate, license_start, license_end,
                        renewal_stage, days_remaining, net_total, net_total_base, docstatus, modified
                 FROM renewal_tracking
                 WHERE name = ?1",
                [name],
                |row| {
                    Ok(RenewalRecord {
                        name: row.get(0)?,
                        company: row.get(1)?,
                        currency: row.get(2)?,
                        exchange_rate: optional_decimal_at(row, 3)?,
                        license_start: row.get(4)?,
                        license_end: row.get(5)?,
                        renewal_stage: row.get(6)?,
                        days_remaining: row.get(7)?,
                        net_total: decimal_at(row, 8)?,
                        net_total_base: decimal_at(row, 9)?,
                        docstatus: row.get(10)?,
                        modified: row.get(11)?,
                        items: Vec::new(),
                    })
                },
            )
            .optional()?;

        let mut record = record.ok_or_else(|| TrackerError::RecordNotFound(name.to_string()))?;
        record.items = self.get_items(name)?;
        Ok(record)
    }

    fn get_items(&self, parent: &str) -> Result<Vec<LineItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_code, item_name, description, brand, item_group, uom,
                    qty, rate, amount, base_rate, base_amount
             FROM renewal_tracking_item
             WHERE parent = ?1
             ORDER BY idx",
        )?;

        let items = stmt
            .query_map([parent], |row| {
                Ok(LineItem {
                    item_code: row.get(0)?,
                    item_name: row.get(1)?,
                    description: row.get(2)?,
                    brand: row.get(3)?,
                    item_group: row.get(4)?,
                    uom: row.get(5)?,
                    qty: decimal_at(row, 6)?,
                    rate: decimal_at(row, 7)?,
                    amount: decimal_at(row, 8)?,
                    base_rate: decimal_at(row, 9)?,
                    base_amount: decimal_at(row, 10)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Update only the derived stage fields; `modified` is left alone
    pub fn update_stage(
        &self,
        name: &str,
        stage: Option<RenewalStage>,
        days_remaining: Option<i64>,
    ) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE renewal_tracking SET renewal_stage = ?1, days_remaining = ?2 WHERE name = ?3",
            params![stage, days_remaining, name],
        )?;

        if updated == 0 {
            return Err(TrackerError::RecordNotFound(name.to_string()));
        }
        Ok(())
    }

    pub fn list_records(
        &self,
        stage: Option<RenewalStage>,
        status: Option<DocStatus>,
    ) -> Result<Vec<RecordSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, company, currency, license_start, license_end,
                    renewal_stage, days_remaining, net_total_base, docstatus
             FROM renewal_tracking
             WHERE (?1 IS NULL OR renewal_stage = ?1)
               AND (?2 IS NULL OR docstatus = ?2)
             ORDER BY license_end IS NULL, license_end, name",
        )?;

        let records = stmt
            .query_map(params![stage, status], |row| {
                Ok(RecordSummary {
                    name: row.get(0)?,
                    company: row.get(1)?,
                    currency: row.get(2)?,
                    license_start: row.get(3)?,
                    license_end: row.get(4)?,
                    renewal_stage: row.get(5)?,
                    days_remaining: row.get(6)?,
                    net_total_base: decimal_at(row, 7)?,
                    docstatus: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Submitted records per stage, unclassified ones under `None`
    pub fn stage_counts(&self) -> Result<Vec<StageCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT renewal_stage, COUNT(*)
             FROM renewal_tracking
             WHERE docstatus = 1
             GROUP BY renewal_stage
             ORDER BY renewal_stage",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok(StageCount {
                    stage: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(counts)
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    fn query_names<P: Params>(&self, sql: &str, params: P) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let names = stmt
            .query_map(params, |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

const SUBMITTED_WITH_DATES: &str = "SELECT name FROM renewal_tracking
     WHERE docstatus = 1 AND license_start IS NOT NULL AND license_end IS NOT NULL";

impl RecordStore for Database {
    fn submitted_with_dates(&self) -> Result<Vec<String>> {
        self.query_names(&format!("{} ORDER BY name", SUBMITTED_WITH_DATES), [])
    }

    fn submitted_modified_on(&self, day: NaiveDate) -> Result<Vec<String>> {
        self.query_names(
            &format!("{} AND date(modified) = ?1 ORDER BY name", SUBMITTED_WITH_DATES),
            [day],
        )
    }

    fn submitted_ending_by(&self, cutoff: NaiveDate) -> Result<Vec<String>> {
        self.query_names(
            &format!("{} AND license_end <= ?1 ORDER BY name", SUBMITTED_WITH_DATES),
            [cutoff],
        )
    }

    fn submitted_in_stages(&self, stages: &[RenewalStage]) -> Result<Vec<String>> {
        if stages.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; stages.len()].join(", ");
        self.query_names(
            &format!(
                "{} AND renewal_stage IN ({}) ORDER BY name",
                SUBMITTED_WITH_DATES, placeholders
            ),
            params_from_iter(stages.iter()),
        )
    }

    fn load_record(&self, name: &str) -> Result<RenewalRecord> {
        self.get_record(name)
    }

    fn write_stage(
        &self,
        name: &str,
        stage: Option<RenewalStage>,
        days_remaining: Option<i64>,
    ) -> Result<()> {
        self.update_stage(name, stage, days_remaining)
    }

    fn begin(&self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

impl RateSource for Database {
    fn company_currency(&self, company: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT default_currency FROM company WHERE name = ?1",
                [company],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn exchange_rate(&self, from: &str, to: &str) -> Result<Option<Decimal>> {
        let rate = self
            .conn
            .query_row(
                "SELECT exchange_rate FROM currency_exchange
                 WHERE from_currency = ?1 AND to_currency = ?2",
                [from, to],
                |row| decimal_at(row, 0),
            )
            .optional()?;
        Ok(rate)
    }
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        t.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

impl ToSql for RenewalStage {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.label()))
    }
}

impl FromSql for RenewalStage {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: TrackerError| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for DocStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for DocStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        DocStatus::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}
