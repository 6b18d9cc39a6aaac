use serde::{Deserialize, Deserializer, Serialize};

use crate::config;
use crate::normalize;

use super::valuation::{Source, Valuation};

// ---------------------------------------------------------------------------
// Certification — third-party grading slab details
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Certification {
    pub service: String,
    pub serial_number: String,
    pub grade: String,
}

// ---------------------------------------------------------------------------
// InventoryStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryStatus {
    Accounted,
    Missing,
    Unchecked,
}

// ---------------------------------------------------------------------------
// Coin — One physical item or lot in the collection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Coin {
    // -- Identity --
    pub id: String,
    pub country: String,
    #[serde(deserialize_with = "string_or_number")]
    pub year: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint_mark: Option<String>,
    pub denomination: String,
    #[serde(deserialize_with = "lenient_quantity")]
    pub quantity: u32,

    // -- Classification --
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    pub condition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface_quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certification: Option<Certification>,

    // -- Acquisition --
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_amount")]
    pub purchase_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_purchased: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retailer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retailer_item_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retailer_invoice_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metal_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_amount")]
    pub melt_value: Option<f64>,

    // -- Personal / logistics --
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_ref_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variety_legacy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_legacy: Option<String>,

    // -- Provenance --
    pub date_added: String,
    pub currency: String,

    // -- Valuation (written by the enrichment pipeline only) --
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_amount")]
    pub estimated_value_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_amount")]
    pub estimated_value_max: Option<f64>,
    #[serde(
        rename = "faceValueUSD",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_amount"
    )]
    pub face_value_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valuation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valuation_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,

    // -- Inventory --
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_inventoried: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_status: Option<InventoryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_notes: Option<String>,

    // -- Tech specs --
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_amount")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_amount")]
    pub diameter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_amount")]
    pub thickness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design: Option<String>,

    /// Fields this version does not model, kept so records survive a
    /// load/save cycle unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Coin {
    fn default() -> Self {
        Self {
            id: String::new(),
            country: String::new(),
            year: String::new(),
            mint_mark: None,
            denomination: String::new(),
            quantity: 1,
            series: None,
            theme: None,
            condition: String::new(),
            surface_quality: None,
            certification: None,
            purchase_cost: None,
            date_purchased: None,
            retailer: None,
            retailer_item_no: None,
            retailer_invoice_no: None,
            metal_content: None,
            melt_value: None,
            personal_notes: None,
            personal_ref_no: None,
            storage_location: None,
            variety_legacy: None,
            notes_legacy: None,
            date_added: String::new(),
            currency: config::DEFAULT_CURRENCY.to_string(),
            estimated_value_min: None,
            estimated_value_max: None,
            face_value_usd: None,
            valuation_date: None,
            valuation_notes: None,
            sources: None,
            analysis: None,
            last_inventoried: None,
            inventory_status: None,
            inventory_notes: None,
            weight: None,
            diameter: None,
            thickness: None,
            purity: None,
            design: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl Coin {
    /// Grade shown to the user: the slab grade when certified, else the
    /// raw condition string.
    pub fn display_grade(&self) -> &str {
        match &self.certification {
            Some(cert) if !cert.grade.is_empty() => &cert.grade,
            _ => &self.condition,
        }
    }

    /// True until the enrichment pipeline has stored a maximum estimate.
    pub fn is_pending_valuation(&self) -> bool {
        self.estimated_value_max.is_none()
    }

    /// Short human label, e.g. `"1964 United States Quarter"`.
    pub fn title(&self) -> String {
        format!("{} {} {}", self.year, self.country, self.denomination)
    }

    /// Copy a valuation result onto this coin, stamping `valuation_date`.
    ///
    /// Negative amounts are clamped to zero.
    pub fn apply_valuation(&mut self, valuation: &Valuation, now: &str) {
        self.estimated_value_min = Some(valuation.min.max(0.0));
        self.estimated_value_max = Some(valuation.max.max(0.0));
        self.face_value_usd = valuation.face_value.map(|v| v.max(0.0));
        self.valuation_notes = Some(valuation.notes.clone());
        self.valuation_date = Some(now.to_string());
        self.sources = Some(valuation.sources.clone());
    }
}

/// Accept `"1964"` or `1964` for text fields that older exports stored as
/// numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Quantity as written by hand-edited records: blanks, text and values
/// below one read as `1`.
fn lenient_quantity<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let quantity = match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => normalize::parse_amount(s),
        _ => None,
    };
    Ok(quantity
        .filter(|q| *q >= 1.0)
        .map(|q| q.min(u32::MAX as f64).floor() as u32)
        .unwrap_or(1))
}

/// Money and measurement fields: numbers or numeric text (`"$1,250"`).
/// Nulls and anything unparseable read as absent.
pub(crate) fn lenient_amount<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => normalize::parse_amount(s),
        _ => None,
    })
}
