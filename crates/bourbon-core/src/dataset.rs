use std::cmp::Ordering;
use std::io;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::query::{self, Predicate};

pub const BOTTLE_COLUMN: &str = "Bottle";
pub const AVERAGE_COLUMN: &str = "Average";

/// Errors caused by caller-supplied query parameters.
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("asking price must be a positive number, got {0}")]
    InvalidAskingPrice(f64),
}

/// A single typed CSV cell.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl CellValue {
    fn guess(raw: &str) -> Self {
        if raw.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = raw.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return CellValue::Float(f);
            }
        }
        if raw == "true" || raw == "false" {
            return CellValue::Bool(raw == "true");
        }
        CellValue::String(raw.to_string())
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::String(s) => f.write_str(s),
        }
    }
}

/// One row of the price dataset. Every source column is kept, in header
/// order; `bottle` and `average` are lifted out for filtering and sorting.
#[derive(Clone, Debug)]
pub struct BottleRecord {
    pub bottle: String,
    pub average: Option<f64>,
    columns: Arc<[String]>,
    values: Vec<CellValue>,
}

impl BottleRecord {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|index| self.values.get(index))
    }
}

impl Serialize for BottleRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Where an asking price sits relative to the recorded average.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PricePosition {
    #[serde(rename = "above average")]
    Above,
    #[serde(rename = "below average")]
    Below,
}

impl PricePosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricePosition::Above => "above average",
            PricePosition::Below => "below average",
        }
    }
}

/// A search result annotated against an asking price.
#[derive(Clone, Debug, Serialize)]
pub struct PriceCheck {
    #[serde(flatten)]
    pub record: BottleRecord,
    /// `((asking - average) / asking) * 100`, rounded to two decimals.
    #[serde(rename = "Percentage Difference")]
    pub percentage_difference: Option<f64>,
    #[serde(rename = "Price Position")]
    pub position: Option<PricePosition>,
}

impl PriceCheck {
    fn new(record: BottleRecord, asking_price: f64) -> Self {
        let difference = record
            .average
            .map(|average| ((asking_price - average) / asking_price) * 100.0);
        // A positive difference means the asking price exceeds the average.
        let position = difference.map(|value| {
            if value > 0.0 {
                PricePosition::Above
            } else {
                PricePosition::Below
            }
        });
        Self {
            record,
            percentage_difference: difference.map(round_two),
            position,
        }
    }
}

/// The full bottle price table.
#[derive(Clone, Debug)]
pub struct Dataset {
    records: Vec<BottleRecord>,
}

impl Dataset {
    pub fn from_csv(text: &str) -> Result<Self> {
        Self::from_reader(text.as_bytes())
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns: Arc<[String]> = reader
            .headers()
            .context("reading CSV headers")?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let bottle_idx = column_index(&columns, BOTTLE_COLUMN)?;
        let average_idx = column_index(&columns, AVERAGE_COLUMN)?;

        let mut records = Vec::new();
        for (row_no, result) in reader.records().enumerate() {
            let row = result.with_context(|| format!("CSV row {row_no}"))?;
            let values: Vec<CellValue> = (0..columns.len())
                .map(|idx| CellValue::guess(row.get(idx).unwrap_or("")))
                .collect();
            records.push(BottleRecord {
                bottle: row.get(bottle_idx).unwrap_or("").to_string(),
                average: row.get(average_idx).and_then(parse_price),
                columns: columns.clone(),
                values,
            });
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[BottleRecord] {
        &self.records
    }

    /// Every bottle, most expensive first.
    pub fn all(&self) -> Vec<BottleRecord> {
        self.select(&Predicate::All, |_| true)
    }

    /// Bottles whose name matches the translated search, most expensive
    /// first.
    pub fn search(&self, search: &str) -> Vec<BottleRecord> {
        let translated = query::translate(search);
        tracing::debug!(search, filter = %translated.predicate, "translated search");
        self.select(&translated.predicate, |_| true)
    }

    /// Bottles whose average lies in `[low, high]`, optionally narrowed by a
    /// search.
    pub fn budget(&self, low: f64, high: f64, search: Option<&str>) -> Vec<BottleRecord> {
        let predicate = search
            .filter(|s| !s.trim().is_empty())
            .map(|s| query::translate(s).predicate)
            .unwrap_or(Predicate::All);
        self.select(&predicate, |record| {
            record
                .average
                .is_some_and(|average| average >= low && average <= high)
        })
    }

    /// Search results annotated with how far `asking_price` is from each
    /// bottle's average.
    pub fn price_check(
        &self,
        search: &str,
        asking_price: f64,
    ) -> Result<Vec<PriceCheck>, QueryError> {
        if !asking_price.is_finite() || asking_price <= 0.0 {
            return Err(QueryError::InvalidAskingPrice(asking_price));
        }
        Ok(self
            .search(search)
            .into_iter()
            .map(|record| PriceCheck::new(record, asking_price))
            .collect())
    }

    fn select<F>(&self, predicate: &Predicate, keep: F) -> Vec<BottleRecord>
    where
        F: Fn(&BottleRecord) -> bool,
    {
        let mut selected: Vec<BottleRecord> = self
            .records
            .iter()
            .filter(|record| keep(record) && predicate.matches(&record.bottle))
            .cloned()
            .collect();
        sort_by_average_desc(&mut selected);
        selected
    }
}

fn column_index(columns: &[String], name: &str) -> Result<usize> {
    match columns.iter().position(|c| c.eq_ignore_ascii_case(name)) {
        Some(index) => Ok(index),
        None => bail!("dataset is missing the '{name}' column"),
    }
}

/// Parse a price cell, tolerating a currency sign and thousands separators.
fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Stable sort, highest average first; rows without an average go last.
fn sort_by_average_desc(records: &mut [BottleRecord]) {
    records.sort_by(|a, b| match (a.average, b.average) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
