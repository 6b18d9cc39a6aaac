//! Spreadsheet row normalization.
//!
//! Maps rows with loosely named headers onto the canonical [`Coin`] shape
//! through a fixed alias dictionary (see [`config::column_aliases`]).
//! Unknown headers are dropped, missing fields get defaults, and numeric
//! fields never fail to parse. The mapping itself is pure: the record id
//! and creation timestamp come in through an [`Identity`].

use std::collections::HashMap;

use serde_json::Value;

use crate::config;
use crate::error::{NumismaError, Result};
use crate::models::{self, Certification, Coin};

/// One externally sourced row: header -> scalar cell value.
pub type RawRow = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The identity fields stamped onto a freshly normalized coin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub date_added: String,
}

impl Identity {
    /// Random v4 id and the current timestamp.
    pub fn fresh() -> Self {
        Self {
            id: models::new_id(),
            date_added: models::timestamp_now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Header-alias driven row normalizer.
#[derive(Debug, Clone)]
pub struct Normalizer {
    aliases: HashMap<&'static str, &'static str>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            aliases: config::column_aliases(),
        }
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical field name for a header, if the dictionary knows it.
    pub fn field_for(&self, header: &str) -> Option<&'static str> {
        self.aliases.get(header.trim()).copied()
    }

    /// Reduce a row to canonical field names, keeping the original cell
    /// values.
    ///
    /// When several non-empty cells alias the same field, the best ranked
    /// header wins (see [`config::alias_rank`]): a canonical name beats an
    /// export header, which beats a loose alias. Equal ranks keep the
    /// header that sorts first.
    pub fn map_fragment(&self, row: &RawRow) -> RawRow {
        let mut best: HashMap<&'static str, (u8, &Value)> = HashMap::new();
        for (header, value) in row {
            let Some(field) = self.field_for(header) else {
                continue;
            };
            if cell_text(value).is_none() {
                continue;
            }
            let rank = config::alias_rank(header.trim());
            match best.get(field) {
                Some((held, _)) if *held <= rank => {}
                _ => {
                    best.insert(field, (rank, value));
                }
            }
        }
        best.into_iter()
            .map(|(field, (_, value))| (field.to_string(), value.clone()))
            .collect()
    }

    /// A row is broken when it carries neither a year nor a denomination.
    ///
    /// Broken rows are set aside for manual fix-up rather than imported.
    pub fn is_broken(&self, row: &RawRow) -> bool {
        let fragment = self.map_fragment(row);
        !fragment.contains_key("year") && !fragment.contains_key("denomination")
    }

    /// Split rows into `(importable, broken)`, preserving order.
    pub fn partition(&self, rows: Vec<RawRow>) -> (Vec<RawRow>, Vec<RawRow>) {
        rows.into_iter().partition(|row| !self.is_broken(row))
    }

    /// Fill in the year and denomination of a broken row.
    ///
    /// Both values are required; the row is left untouched otherwise.
    pub fn fix_row(&self, row: &mut RawRow, year: &str, denomination: &str) -> Result<()> {
        if year.trim().is_empty() || denomination.trim().is_empty() {
            return Err(NumismaError::InvalidArgument(
                "a fixed row needs both a year and a denomination".into(),
            ));
        }
        row.insert("year".into(), Value::String(year.trim().to_string()));
        row.insert(
            "denomination".into(),
            Value::String(denomination.trim().to_string()),
        );
        Ok(())
    }

    /// Build a complete coin from a row with a fresh identity.
    pub fn normalize_row(&self, row: &RawRow) -> Coin {
        self.complete(row, Identity::fresh())
    }

    /// Build a complete coin from a row (or a canonical fragment).
    ///
    /// Deterministic for a given row and identity.
    pub fn complete(&self, row: &RawRow, identity: Identity) -> Coin {
        let fragment = self.map_fragment(row);
        let text = |field: &str| fragment.get(field).and_then(cell_text);
        let number = |field: &str| fragment.get(field).map(coerce_number);

        let condition = text("condition").unwrap_or_else(|| config::DEFAULT_CONDITION.to_string());
        let cert_service = text("certService");
        let cert_serial = text("certSerial");
        let certification = if cert_service.is_some() || cert_serial.is_some() {
            Some(Certification {
                service: cert_service.unwrap_or_default(),
                serial_number: cert_serial.unwrap_or_default(),
                grade: text("certGrade").unwrap_or_else(|| condition.clone()),
            })
        } else {
            None
        };

        let quantity = number("quantity")
            .filter(|q| *q >= 1.0)
            .map(|q| q.min(u32::MAX as f64).floor() as u32)
            .unwrap_or(1);

        Coin {
            id: identity.id,
            date_added: identity.date_added,
            currency: config::DEFAULT_CURRENCY.to_string(),
            country: text("country").unwrap_or_else(|| config::DEFAULT_COUNTRY.to_string()),
            year: text("year").unwrap_or_else(|| config::UNKNOWN_YEAR.to_string()),
            mint_mark: text("mintMark"),
            denomination: text("denomination").unwrap_or_default(),
            quantity,
            series: text("series"),
            theme: text("theme"),
            condition,
            surface_quality: text("surfaceQuality"),
            certification,
            purchase_cost: Some(number("purchaseCost").unwrap_or(0.0)),
            date_purchased: text("datePurchased"),
            retailer: text("retailer"),
            retailer_item_no: text("retailerItemNo"),
            retailer_invoice_no: text("retailerInvoiceNo"),
            metal_content: text("metalContent"),
            melt_value: number("meltValue"),
            personal_notes: text("personalNotes"),
            personal_ref_no: text("personalRefNo"),
            storage_location: text("storageLocation"),
            variety_legacy: text("varietyLegacy"),
            notes_legacy: text("notesLegacy"),
            ..Coin::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Cell helpers
// ---------------------------------------------------------------------------

/// Text content of a scalar cell; `None` for blanks, nulls and containers.
///
/// Whole floats print without a fraction so a year read as `1964.0`
/// becomes `"1964"`.
pub fn cell_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parse a numeric cell, tolerating `$` signs and thousands separators.
/// Anything unparseable yields `0.0`.
pub fn coerce_number(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.filter(|f| f.is_finite()).unwrap_or(0.0)
}

/// Parse numeric text with `$` signs and thousands separators stripped.
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
}
